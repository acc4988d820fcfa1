use foundation::math::{TILE_SIZE_PX, TileCoord, lat_lon_to_world_px};

use crate::viewport::MapViewport;

/// An XYZ tile service addressed by a URL template with `{z}`, `{x}`, `{y}`
/// and optionally `{s}` (subdomain) placeholders.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TileSource {
    pub template: String,
    pub subdomains: Vec<String>,
    pub min_zoom: u8,
    pub max_zoom: u8,
}

impl TileSource {
    pub fn new(template: impl Into<String>) -> Self {
        Self {
            template: template.into(),
            subdomains: vec!["a".to_string(), "b".to_string(), "c".to_string()],
            min_zoom: 0,
            max_zoom: 19,
        }
    }

    /// Subdomains as single letters, `"abc"` style.
    pub fn with_subdomains(mut self, letters: &str) -> Self {
        self.subdomains = letters.chars().map(String::from).collect();
        self
    }

    pub fn with_max_zoom(mut self, max_zoom: u8) -> Self {
        self.max_zoom = max_zoom;
        self
    }

    pub fn url_for(&self, tile: TileCoord) -> String {
        let mut url = self
            .template
            .replace("{z}", &tile.z.to_string())
            .replace("{x}", &tile.x.to_string())
            .replace("{y}", &tile.y.to_string());
        if url.contains("{s}") {
            // Spread requests the same way for every client so caches agree.
            let sub = if self.subdomains.is_empty() {
                ""
            } else {
                let i = (tile.x as usize + tile.y as usize) % self.subdomains.len();
                self.subdomains[i].as_str()
            };
            url = url.replace("{s}", sub);
        }
        url
    }
}

/// A tile placed on the canvas. `coord.x` is wrapped into range; `screen_*`
/// is where the unwrapped copy lands.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlacedTile {
    pub coord: TileCoord,
    pub screen_x: f64,
    pub screen_y: f64,
    pub size_px: f64,
}

/// Tiles covering the viewport at the source's best zoom, nearest to the
/// canvas center first. Off-world rows are skipped; columns wrap around
/// the antimeridian.
pub fn visible_tiles(viewport: &MapViewport, source: &TileSource) -> Vec<PlacedTile> {
    let z = viewport
        .tile_zoom()
        .clamp(source.min_zoom, source.max_zoom.max(source.min_zoom));
    let scale = 2f64.powf(viewport.zoom() - z as f64);
    let size_px = TILE_SIZE_PX * scale;

    // Top-left of the canvas in tile-zoom world pixels.
    let (cx, cy) = lat_lon_to_world_px(viewport.center(), z as f64);
    let left = cx - viewport.width_px / 2.0 / scale;
    let top = cy - viewport.height_px / 2.0 / scale;
    let right = cx + viewport.width_px / 2.0 / scale;
    let bottom = cy + viewport.height_px / 2.0 / scale;

    let n = 1i64 << z;
    let x0 = (left / TILE_SIZE_PX).floor() as i64;
    let x1 = (right / TILE_SIZE_PX).ceil() as i64;
    let y0 = ((top / TILE_SIZE_PX).floor() as i64).max(0);
    let y1 = ((bottom / TILE_SIZE_PX).ceil() as i64).min(n);

    let mut out = Vec::new();
    for ty in y0..y1 {
        for tx in x0..x1 {
            let screen_x = (tx as f64 * TILE_SIZE_PX - left) * scale;
            let screen_y = (ty as f64 * TILE_SIZE_PX - top) * scale;
            out.push(PlacedTile {
                coord: TileCoord::new(z, tx.rem_euclid(n) as u32, ty as u32),
                screen_x,
                screen_y,
                size_px,
            });
        }
    }

    let (mx, my) = (viewport.width_px / 2.0, viewport.height_px / 2.0);
    out.sort_by(|a, b| {
        let da = (a.screen_x + a.size_px / 2.0 - mx).powi(2) + (a.screen_y + a.size_px / 2.0 - my).powi(2);
        let db = (b.screen_x + b.size_px / 2.0 - mx).powi(2) + (b.screen_y + b.size_px / 2.0 - my).powi(2);
        da.total_cmp(&db)
    });
    out
}

#[cfg(test)]
mod tests {
    use super::{TileSource, visible_tiles};
    use crate::viewport::MapViewport;
    use foundation::math::{LatLon, TileCoord};

    #[test]
    fn url_template_substitution() {
        let osm = TileSource::new("https://{s}.tile.openstreetmap.org/{z}/{x}/{y}.png");
        assert_eq!(
            osm.url_for(TileCoord::new(3, 4, 2)),
            "https://a.tile.openstreetmap.org/3/4/2.png"
        );
        assert_eq!(
            osm.url_for(TileCoord::new(3, 4, 3)),
            "https://b.tile.openstreetmap.org/3/4/3.png"
        );

        let esri = TileSource::new("https://tiles.example.org/{z}/{y}/{x}").with_subdomains("");
        assert_eq!(
            esri.url_for(TileCoord::new(1, 0, 1)),
            "https://tiles.example.org/1/1/0"
        );
    }

    #[test]
    fn whole_world_at_zoom_zero() {
        let vp = MapViewport::new(LatLon::new(0.0, 0.0), 0.0, 256.0, 256.0);
        let tiles = visible_tiles(&vp, &TileSource::new("{z}/{x}/{y}"));
        assert_eq!(tiles.len(), 1);
        assert_eq!(tiles[0].coord, TileCoord::new(0, 0, 0));
        assert_eq!(tiles[0].screen_x, 0.0);
        assert_eq!(tiles[0].size_px, 256.0);
    }

    #[test]
    fn covers_canvas_and_wraps_columns() {
        // Centered on the antimeridian: columns on both sides wrap into range.
        let vp = MapViewport::new(LatLon::new(0.0, 180.0), 2.0, 512.0, 256.0);
        let tiles = visible_tiles(&vp, &TileSource::new("{z}/{x}/{y}"));
        assert!(tiles.iter().all(|t| t.coord.x < 4 && t.coord.y < 4));
        let mut xs: Vec<u32> = tiles.iter().map(|t| t.coord.x).collect();
        xs.sort();
        xs.dedup();
        assert_eq!(xs, vec![0, 3]);
        assert_eq!(tiles.len(), 4);

        // Closest to the middle comes first.
        let first = tiles[0];
        assert!(first.screen_x <= 256.0 && first.screen_x + first.size_px >= 256.0);
    }

    #[test]
    fn zoom_is_capped_by_source_and_tiles_scale() {
        let vp = MapViewport::new(LatLon::new(51.5, -0.12), 21.0, 400.0, 300.0);
        let source = TileSource::new("{z}/{x}/{y}").with_max_zoom(19);
        let tiles = visible_tiles(&vp, &source);
        assert!(tiles.iter().all(|t| t.coord.z == 19));
        assert_eq!(tiles[0].size_px, 1024.0);
    }
}
