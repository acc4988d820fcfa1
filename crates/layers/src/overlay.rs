use formats::geojson::{FeatureCollection, GeoPoint, Geometry};
use foundation::bounds::Aabb2;
use foundation::math::{LatLon, Vec2};

use crate::symbology::OverlayStyle;
use crate::viewport::MapViewport;

/// Consecutive vertices closer than this on screen are merged.
const MIN_SEGMENT_PX: f64 = 0.5;

/// Screen-space drawing produced from an overlay for one viewport.
#[derive(Debug, Clone, PartialEq)]
pub enum DrawCommand {
    Point {
        at: Vec2,
        radius_px: f64,
        label: Option<String>,
    },
    Line {
        points: Vec<Vec2>,
    },
    /// Outer ring first, then holes; fill with the even-odd rule.
    Polygon {
        rings: Vec<Vec<Vec2>>,
    },
}

/// A GeoJSON document drawn over the base map.
#[derive(Debug, Clone, PartialEq)]
pub struct GeoJsonOverlay {
    pub collection: FeatureCollection,
    pub style: OverlayStyle,
}

impl GeoJsonOverlay {
    pub fn new(collection: FeatureCollection) -> Self {
        Self {
            collection,
            style: OverlayStyle::default(),
        }
    }

    pub fn with_style(mut self, style: OverlayStyle) -> Self {
        self.style = style;
        self
    }

    pub fn bounds(&self) -> Aabb2 {
        self.collection.bounds()
    }

    /// Commands for features whose extent touches the canvas.
    pub fn draw_commands(&self, viewport: &MapViewport) -> Vec<DrawCommand> {
        let radius_px = self.style.point_radius_px as f64;
        let mut out = Vec::new();
        for feature in &self.collection.features {
            if !touches_canvas(&feature.geometry, viewport, radius_px) {
                continue;
            }
            let label = feature.label().map(str::to_string);
            match &feature.geometry {
                Geometry::Point(p) => out.push(DrawCommand::Point {
                    at: project(viewport, p),
                    radius_px,
                    label,
                }),
                Geometry::MultiPoint(points) => {
                    out.extend(points.iter().map(|p| DrawCommand::Point {
                        at: project(viewport, p),
                        radius_px,
                        label: label.clone(),
                    }))
                }
                Geometry::LineString(line) => push_line(&mut out, viewport, line),
                Geometry::MultiLineString(lines) => {
                    for line in lines {
                        push_line(&mut out, viewport, line);
                    }
                }
                Geometry::Polygon(rings) => push_polygon(&mut out, viewport, rings),
                Geometry::MultiPolygon(polygons) => {
                    for rings in polygons {
                        push_polygon(&mut out, viewport, rings);
                    }
                }
            }
        }
        out
    }
}

fn project(viewport: &MapViewport, p: &GeoPoint) -> Vec2 {
    viewport.project(LatLon::new(p.lat_deg, p.lon_deg))
}

fn project_path(viewport: &MapViewport, points: &[GeoPoint]) -> Vec<Vec2> {
    let mut out: Vec<Vec2> = Vec::with_capacity(points.len());
    for p in points {
        let s = project(viewport, p);
        let merged = out
            .last()
            .is_some_and(|last| (s - *last).length() < MIN_SEGMENT_PX);
        if !merged {
            out.push(s);
        }
    }
    out
}

fn push_line(out: &mut Vec<DrawCommand>, viewport: &MapViewport, line: &[GeoPoint]) {
    let points = project_path(viewport, line);
    if points.len() >= 2 {
        out.push(DrawCommand::Line { points });
    }
}

fn push_polygon(out: &mut Vec<DrawCommand>, viewport: &MapViewport, rings: &[Vec<GeoPoint>]) {
    let rings: Vec<Vec<Vec2>> = rings
        .iter()
        .map(|ring| project_path(viewport, ring))
        .filter(|ring| ring.len() >= 3)
        .collect();
    if !rings.is_empty() {
        out.push(DrawCommand::Polygon { rings });
    }
}

fn touches_canvas(geometry: &Geometry, viewport: &MapViewport, margin_px: f64) -> bool {
    let mut min = Vec2::new(f64::INFINITY, f64::INFINITY);
    let mut max = Vec2::new(f64::NEG_INFINITY, f64::NEG_INFINITY);
    geometry.for_each_point(|p| {
        let s = project(viewport, p);
        min = Vec2::new(min.x.min(s.x), min.y.min(s.y));
        max = Vec2::new(max.x.max(s.x), max.y.max(s.y));
    });
    if min.x > max.x {
        return false;
    }
    max.x >= -margin_px
        && max.y >= -margin_px
        && min.x <= viewport.width_px + margin_px
        && min.y <= viewport.height_px + margin_px
}
