use crate::math::{LatLon, Vec3};

/// Geographic bounding box in degrees.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Aabb2 {
    pub min: [f64; 2],
    pub max: [f64; 2],
}

/// Axis-aligned box in model space. An "empty" box has `min > max`.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Aabb3 {
    pub min: [f64; 3],
    pub max: [f64; 3],
}

impl Aabb2 {
    pub fn new(min: [f64; 2], max: [f64; 2]) -> Self {
        Aabb2 { min, max }
    }

    pub fn empty() -> Self {
        Aabb2 {
            min: [f64::INFINITY; 2],
            max: [f64::NEG_INFINITY; 2],
        }
    }

    pub fn is_empty(&self) -> bool {
        self.min[0] > self.max[0] || self.min[1] > self.max[1]
    }

    /// `[lon, lat]` ordering, matching GeoJSON positions.
    pub fn extend_lon_lat(&mut self, lon_deg: f64, lat_deg: f64) {
        self.min[0] = self.min[0].min(lon_deg);
        self.min[1] = self.min[1].min(lat_deg);
        self.max[0] = self.max[0].max(lon_deg);
        self.max[1] = self.max[1].max(lat_deg);
    }

    pub fn union(&self, other: &Aabb2) -> Aabb2 {
        Aabb2 {
            min: [self.min[0].min(other.min[0]), self.min[1].min(other.min[1])],
            max: [self.max[0].max(other.max[0]), self.max[1].max(other.max[1])],
        }
    }

    pub fn center(&self) -> Option<LatLon> {
        if self.is_empty() {
            return None;
        }
        Some(LatLon::new(
            0.5 * (self.min[1] + self.max[1]),
            0.5 * (self.min[0] + self.max[0]),
        ))
    }

    pub fn south_west(&self) -> LatLon {
        LatLon::new(self.min[1], self.min[0])
    }

    pub fn north_east(&self) -> LatLon {
        LatLon::new(self.max[1], self.max[0])
    }
}

impl Aabb3 {
    pub fn new(min: [f64; 3], max: [f64; 3]) -> Self {
        Aabb3 { min, max }
    }

    pub fn empty() -> Self {
        Aabb3 {
            min: [f64::INFINITY; 3],
            max: [f64::NEG_INFINITY; 3],
        }
    }

    pub fn from_points<'a>(points: impl IntoIterator<Item = &'a [f32; 3]>) -> Self {
        let mut b = Aabb3::empty();
        for p in points {
            b.extend([p[0] as f64, p[1] as f64, p[2] as f64]);
        }
        b
    }

    pub fn is_empty(&self) -> bool {
        (0..3).any(|i| self.min[i] > self.max[i])
    }

    pub fn extend(&mut self, p: [f64; 3]) {
        for i in 0..3 {
            self.min[i] = self.min[i].min(p[i]);
            self.max[i] = self.max[i].max(p[i]);
        }
    }

    pub fn center(&self) -> Vec3 {
        if self.is_empty() {
            return Vec3::ZERO;
        }
        Vec3::new(
            0.5 * (self.min[0] + self.max[0]),
            0.5 * (self.min[1] + self.max[1]),
            0.5 * (self.min[2] + self.max[2]),
        )
    }

    pub fn size(&self) -> Vec3 {
        if self.is_empty() {
            return Vec3::ZERO;
        }
        Vec3::new(
            self.max[0] - self.min[0],
            self.max[1] - self.min[1],
            self.max[2] - self.min[2],
        )
    }

    /// Radius of the bounding sphere around `center()`.
    pub fn radius(&self) -> f64 {
        0.5 * self.size().length()
    }
}
