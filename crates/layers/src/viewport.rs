use foundation::bounds::Aabb2;
use foundation::math::{
    LatLon, MERCATOR_MAX_LAT_DEG, Vec2, clamp_lat_deg, lat_lon_to_world_px, world_px_to_lat_lon,
    world_size_px, wrap_lon_deg,
};

pub const MIN_ZOOM: f64 = 0.0;
pub const MAX_ZOOM: f64 = 22.0;

/// A slippy-map camera: Web Mercator center and fractional zoom over a
/// canvas of `width_px` x `height_px`. Screen origin is the top-left corner.
#[derive(Debug, Clone, PartialEq)]
pub struct MapViewport {
    center: LatLon,
    zoom: f64,
    pub width_px: f64,
    pub height_px: f64,
    pub min_zoom: f64,
    pub max_zoom: f64,
}

impl MapViewport {
    pub fn new(center: LatLon, zoom: f64, width_px: f64, height_px: f64) -> Self {
        let mut vp = Self {
            center: LatLon::new(0.0, 0.0),
            zoom: MIN_ZOOM,
            width_px: width_px.max(1.0),
            height_px: height_px.max(1.0),
            min_zoom: MIN_ZOOM,
            max_zoom: MAX_ZOOM,
        };
        vp.set_center(center);
        vp.set_zoom(zoom);
        vp
    }

    pub fn center(&self) -> LatLon {
        self.center
    }

    pub fn zoom(&self) -> f64 {
        self.zoom
    }

    pub fn set_center(&mut self, center: LatLon) {
        self.center = LatLon::new(clamp_lat_deg(center.lat_deg), wrap_lon_deg(center.lon_deg));
    }

    pub fn set_zoom(&mut self, zoom: f64) {
        let zoom = if zoom.is_finite() { zoom } else { self.min_zoom };
        self.zoom = zoom.clamp(self.min_zoom, self.max_zoom);
    }

    pub fn set_size(&mut self, width_px: f64, height_px: f64) {
        self.width_px = width_px.max(1.0);
        self.height_px = height_px.max(1.0);
    }

    /// Integer zoom used to pick tiles.
    pub fn tile_zoom(&self) -> u8 {
        self.zoom.round().clamp(0.0, MAX_ZOOM) as u8
    }

    fn center_world_px(&self) -> (f64, f64) {
        lat_lon_to_world_px(self.center, self.zoom)
    }

    /// Screen position of a geographic point.
    pub fn project(&self, p: LatLon) -> Vec2 {
        let (cx, cy) = self.center_world_px();
        let (x, y) = lat_lon_to_world_px(p, self.zoom);
        Vec2::new(
            x - cx + self.width_px / 2.0,
            y - cy + self.height_px / 2.0,
        )
    }

    pub fn unproject(&self, screen: Vec2) -> LatLon {
        let (cx, cy) = self.center_world_px();
        let x = cx + screen.x - self.width_px / 2.0;
        let y = cy + screen.y - self.height_px / 2.0;
        world_px_to_lat_lon(x, y, self.zoom)
    }

    /// Drags the map by a screen delta: content follows the pointer.
    pub fn pan_by(&mut self, dx: f64, dy: f64) {
        let (cx, cy) = self.center_world_px();
        let size = world_size_px(self.zoom);
        let y = (cy - dy).clamp(0.0, size);
        let next = world_px_to_lat_lon(cx - dx, y, self.zoom);
        self.set_center(next);
    }

    /// Zooms by `delta` levels keeping the point under `anchor` fixed.
    pub fn zoom_at(&mut self, anchor: Vec2, delta: f64) {
        let before = self.unproject(anchor);
        self.set_zoom(self.zoom + delta);
        let after = self.project(before);
        self.pan_by(anchor.x - after.x, anchor.y - after.y);
    }

    /// Centers on `bounds` at the highest zoom (capped at `max_zoom`) that
    /// fits it inside the canvas minus `padding_px` on every side.
    pub fn fit_bounds(&mut self, bounds: &Aabb2, padding_px: f64) {
        if bounds.is_empty() {
            return;
        }
        let avail_w = (self.width_px - 2.0 * padding_px).max(1.0);
        let avail_h = (self.height_px - 2.0 * padding_px).max(1.0);

        // Pixel extent at zoom 0, then scale up by powers of two.
        let (x0, y0) = lat_lon_to_world_px(bounds.south_west(), 0.0);
        let (x1, y1) = lat_lon_to_world_px(bounds.north_east(), 0.0);
        let w0 = (x1 - x0).abs();
        let h0 = (y1 - y0).abs();

        let zoom_w = if w0 > 0.0 { (avail_w / w0).log2() } else { self.max_zoom };
        let zoom_h = if h0 > 0.0 { (avail_h / h0).log2() } else { self.max_zoom };

        self.set_zoom(zoom_w.min(zoom_h));
        // Midpoint in projected space, so the padding is even on both sides.
        self.set_center(world_px_to_lat_lon((x0 + x1) / 2.0, (y0 + y1) / 2.0, 0.0));
    }

    /// Geographic extent of the canvas (latitudes clamped to the Mercator limit).
    pub fn visible_bounds(&self) -> Aabb2 {
        let nw = self.unproject(Vec2::new(0.0, 0.0));
        let se = self.unproject(Vec2::new(self.width_px, self.height_px));
        let mut b = Aabb2::empty();
        b.extend_lon_lat(nw.lon_deg, nw.lat_deg.min(MERCATOR_MAX_LAT_DEG));
        b.extend_lon_lat(se.lon_deg, se.lat_deg.max(-MERCATOR_MAX_LAT_DEG));
        b
    }
}

#[cfg(test)]
mod tests {
    use super::MapViewport;
    use foundation::bounds::Aabb2;
    use foundation::math::{LatLon, Vec2};

    fn assert_close(a: f64, b: f64, eps: f64) {
        let diff = (a - b).abs();
        assert!(diff <= eps, "expected {a} ~= {b} (diff {diff})");
    }

    #[test]
    fn center_projects_to_canvas_middle() {
        let vp = MapViewport::new(LatLon::new(51.5, -0.12), 15.0, 800.0, 600.0);
        let p = vp.project(LatLon::new(51.5, -0.12));
        assert_close(p.x, 400.0, 1e-6);
        assert_close(p.y, 300.0, 1e-6);

        let back = vp.unproject(Vec2::new(123.0, 456.0));
        let again = vp.project(back);
        assert_close(again.x, 123.0, 1e-6);
        assert_close(again.y, 456.0, 1e-6);
    }

    #[test]
    fn pan_moves_content_with_pointer() {
        let mut vp = MapViewport::new(LatLon::new(10.0, 10.0), 10.0, 400.0, 400.0);
        let target = LatLon::new(10.0, 10.0);
        vp.pan_by(50.0, -20.0);
        let p = vp.project(target);
        assert_close(p.x, 250.0, 1e-6);
        assert_close(p.y, 180.0, 1e-6);
    }

    #[test]
    fn zoom_at_keeps_anchor_fixed() {
        let mut vp = MapViewport::new(LatLon::new(47.6, -122.3), 12.0, 1024.0, 768.0);
        let anchor = Vec2::new(100.0, 650.0);
        let under = vp.unproject(anchor);
        vp.zoom_at(anchor, 1.5);
        assert_close(vp.zoom(), 13.5, 1e-12);
        let p = vp.project(under);
        assert_close(p.x, anchor.x, 1e-6);
        assert_close(p.y, anchor.y, 1e-6);
    }

    #[test]
    fn zoom_is_clamped() {
        let mut vp = MapViewport::new(LatLon::new(0.0, 0.0), 40.0, 256.0, 256.0);
        assert_eq!(vp.zoom(), super::MAX_ZOOM);
        vp.set_zoom(-3.0);
        assert_eq!(vp.zoom(), 0.0);
        vp.set_zoom(f64::NAN);
        assert_eq!(vp.zoom(), 0.0);
    }

    #[test]
    fn fit_bounds_contains_both_corners() {
        let mut vp = MapViewport::new(LatLon::new(0.0, 0.0), 2.0, 800.0, 600.0);
        let bounds = Aabb2::new([-122.45, 37.74], [-122.38, 37.80]);
        vp.fit_bounds(&bounds, 20.0);

        for corner in [bounds.south_west(), bounds.north_east()] {
            let p = vp.project(corner);
            assert!(p.x >= 19.9 && p.x <= 780.1, "x {}", p.x);
            assert!(p.y >= 19.9 && p.y <= 580.1, "y {}", p.y);
        }
        let visible = vp.visible_bounds();
        assert!(visible.min[0] <= -122.45 && visible.max[0] >= -122.38);
    }

    #[test]
    fn fit_single_point_uses_max_zoom() {
        let mut vp = MapViewport::new(LatLon::new(0.0, 0.0), 2.0, 800.0, 600.0);
        let mut b = Aabb2::empty();
        b.extend_lon_lat(5.0, 6.0);
        vp.fit_bounds(&b, 0.0);
        assert_eq!(vp.zoom(), vp.max_zoom);
        assert_close(vp.center().lat_deg, 6.0, 1e-9);
        assert_close(vp.center().lon_deg, 5.0, 1e-9);

        // Empty bounds change nothing.
        let before = vp.center();
        vp.fit_bounds(&Aabb2::empty(), 0.0);
        assert_eq!(vp.center(), before);
    }
}
