//! Spherical Web Mercator (EPSG:3857) and XYZ tile addressing.
//!
//! Pixel coordinates use the usual slippy-map convention: at zoom `z` the
//! world is `256 * 2^z` pixels wide, origin at the north-west corner.

use std::f64::consts::PI;

/// Earth radius used by Web Mercator (meters).
pub const MERCATOR_RADIUS_M: f64 = 6_378_137.0;
/// Latitude limit of the square Web Mercator world.
pub const MERCATOR_MAX_LAT_DEG: f64 = 85.051_128_779_806_59;
pub const TILE_SIZE_PX: f64 = 256.0;

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct LatLon {
    pub lat_deg: f64,
    pub lon_deg: f64,
}

impl LatLon {
    pub const fn new(lat_deg: f64, lon_deg: f64) -> Self {
        Self { lat_deg, lon_deg }
    }

    pub fn is_valid(&self) -> bool {
        self.lat_deg.is_finite()
            && self.lon_deg.is_finite()
            && (-90.0..=90.0).contains(&self.lat_deg)
            && (-180.0..=180.0).contains(&self.lon_deg)
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TileCoord {
    pub z: u8,
    pub x: u32,
    pub y: u32,
}

impl TileCoord {
    pub fn new(z: u8, x: u32, y: u32) -> Self {
        Self { z, x, y }
    }
}

pub fn clamp_lat_deg(lat_deg: f64) -> f64 {
    lat_deg.clamp(-MERCATOR_MAX_LAT_DEG, MERCATOR_MAX_LAT_DEG)
}

pub fn wrap_lon_deg(mut lon: f64) -> f64 {
    if !lon.is_finite() {
        return 0.0;
    }
    lon = (lon + 180.0).rem_euclid(360.0) - 180.0;
    lon
}

pub fn mercator_x_m(lon_deg: f64) -> f64 {
    MERCATOR_RADIUS_M * lon_deg.to_radians()
}

pub fn mercator_y_m(lat_deg: f64) -> f64 {
    let lat = clamp_lat_deg(lat_deg).to_radians();
    MERCATOR_RADIUS_M * (PI / 4.0 + lat / 2.0).tan().ln()
}

pub fn inverse_mercator_lon_deg(x_m: f64) -> f64 {
    (x_m / MERCATOR_RADIUS_M).to_degrees()
}

pub fn inverse_mercator_lat_deg(y_m: f64) -> f64 {
    (2.0 * (y_m / MERCATOR_RADIUS_M).exp().atan() - PI / 2.0).to_degrees()
}

/// Size of the whole world in pixels at a (possibly fractional) zoom.
pub fn world_size_px(zoom: f64) -> f64 {
    TILE_SIZE_PX * 2f64.powf(zoom)
}

/// Projects to global pixel coordinates at `zoom`.
pub fn lat_lon_to_world_px(p: LatLon, zoom: f64) -> (f64, f64) {
    let size = world_size_px(zoom);
    let x = (p.lon_deg + 180.0) / 360.0 * size;
    let lat = clamp_lat_deg(p.lat_deg).to_radians();
    let y = (1.0 - (lat.tan() + 1.0 / lat.cos()).ln() / PI) / 2.0 * size;
    (x, y)
}

pub fn world_px_to_lat_lon(x: f64, y: f64, zoom: f64) -> LatLon {
    let size = world_size_px(zoom);
    let lon = x / size * 360.0 - 180.0;
    let n = PI - 2.0 * PI * y / size;
    let lat = n.sinh().atan().to_degrees();
    LatLon::new(lat, lon)
}

/// Tile containing `p` at integer zoom `z`.
pub fn tile_for_lat_lon(p: LatLon, z: u8) -> TileCoord {
    let (x, y) = lat_lon_to_world_px(p, z as f64);
    let n = 1u32 << z;
    let tx = ((x / TILE_SIZE_PX).floor().max(0.0) as u32).min(n - 1);
    let ty = ((y / TILE_SIZE_PX).floor().max(0.0) as u32).min(n - 1);
    TileCoord::new(z, tx, ty)
}

/// North-west corner of a tile.
pub fn tile_origin(tile: TileCoord) -> LatLon {
    world_px_to_lat_lon(
        tile.x as f64 * TILE_SIZE_PX,
        tile.y as f64 * TILE_SIZE_PX,
        tile.z as f64,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(a: f64, b: f64, eps: f64) {
        let diff = (a - b).abs();
        assert!(diff <= eps, "expected {a} ~= {b} (diff {diff})");
    }

    #[test]
    fn mercator_round_trip() {
        for lat in [-80.0, -45.5, 0.0, 12.25, 60.0] {
            assert_close(inverse_mercator_lat_deg(mercator_y_m(lat)), lat, 1e-9);
        }
        assert_close(inverse_mercator_lon_deg(mercator_x_m(-122.4)), -122.4, 1e-9);
    }

    #[test]
    fn world_px_round_trip() {
        let p = LatLon::new(47.6062, -122.3321);
        let (x, y) = lat_lon_to_world_px(p, 14.5);
        let back = world_px_to_lat_lon(x, y, 14.5);
        assert_close(back.lat_deg, p.lat_deg, 1e-9);
        assert_close(back.lon_deg, p.lon_deg, 1e-9);
    }

    #[test]
    fn null_island_is_center_of_world() {
        let (x, y) = lat_lon_to_world_px(LatLon::new(0.0, 0.0), 0.0);
        assert_close(x, 128.0, 1e-9);
        assert_close(y, 128.0, 1e-9);
    }

    #[test]
    fn tile_lookup_matches_slippy_convention() {
        // Zoom 1 splits the world into four quadrants.
        assert_eq!(tile_for_lat_lon(LatLon::new(10.0, -10.0), 1), TileCoord::new(1, 0, 0));
        assert_eq!(tile_for_lat_lon(LatLon::new(-10.0, 10.0), 1), TileCoord::new(1, 1, 1));
        // The east edge clamps into the last column.
        assert_eq!(tile_for_lat_lon(LatLon::new(0.0, 180.0), 2).x, 3);
    }

    #[test]
    fn tile_origin_of_zero_tile_is_north_west() {
        let o = tile_origin(TileCoord::new(0, 0, 0));
        assert_close(o.lon_deg, -180.0, 1e-9);
        assert_close(o.lat_deg, MERCATOR_MAX_LAT_DEG, 1e-6);
    }

    #[test]
    fn wrap_lon_keeps_range() {
        assert_close(wrap_lon_deg(190.0), -170.0, 1e-9);
        assert_close(wrap_lon_deg(-190.0), 170.0, 1e-9);
        assert_close(wrap_lon_deg(45.0), 45.0, 1e-9);
    }

    #[test]
    fn lat_lon_validity() {
        assert!(LatLon::new(45.0, 10.0).is_valid());
        assert!(!LatLon::new(95.0, 10.0).is_valid());
        assert!(!LatLon::new(f64::NAN, 10.0).is_valid());
    }
}
