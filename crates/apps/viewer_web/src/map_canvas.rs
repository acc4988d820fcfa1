use std::collections::{BTreeMap, HashMap, HashSet};
use std::f64::consts::TAU;

use catalog::Theme;
use foundation::math::{LatLon, Vec2};
use layers::{
    DrawCommand, GeoJsonOverlay, MapView, MapViewport, TileCache, TileKey, TileSource, TileState,
    css_rgba, visible_tiles,
};
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::JsValue;
use web_sys::{CanvasRenderingContext2d, CanvasWindingRule, HtmlCanvasElement, HtmlImageElement};

use crate::dom::{self, ctx_set_fill_style, ctx_set_stroke_style};
use crate::theme;

const TILE_CACHE_ENTRIES: usize = 512;
const MARKER_RADIUS_PX: f64 = 7.0;

pub enum MapLayer {
    Tiles {
        source: TileSource,
        attribution: Option<String>,
    },
    /// `None` until the file has been fetched and parsed.
    GeoJson(Option<GeoJsonOverlay>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct MapMarker {
    pub position: LatLon,
    pub name: String,
    pub description: Option<String>,
}

/// The 2D map surface: a Canvas 2D context drawing XYZ tiles, GeoJSON
/// overlays and annotation markers over a [`MapViewport`]. Handles are the
/// ids the layers and markers were inserted under.
pub struct CanvasMap {
    pub viewport: MapViewport,
    layers: BTreeMap<String, MapLayer>,
    layer_order: Vec<String>,
    visible_layers: HashSet<String>,
    markers: BTreeMap<String, MapMarker>,
    marker_order: Vec<String>,
    visible_markers: HashSet<String>,
    tiles: TileCache<HtmlImageElement>,
    pending: HashMap<TileKey, HtmlImageElement>,
    canvas: Option<(HtmlCanvasElement, CanvasRenderingContext2d)>,
}

impl CanvasMap {
    pub fn new(viewport: MapViewport) -> Self {
        Self {
            viewport,
            layers: BTreeMap::new(),
            layer_order: Vec::new(),
            visible_layers: HashSet::new(),
            markers: BTreeMap::new(),
            marker_order: Vec::new(),
            visible_markers: HashSet::new(),
            tiles: TileCache::new(TILE_CACHE_ENTRIES),
            pending: HashMap::new(),
            canvas: None,
        }
    }

    /// Binds to `<canvas id=canvas_id>` and sizes the viewport to it.
    pub fn attach(&mut self, canvas_id: &str) -> Result<(), JsValue> {
        let canvas = dom::element(canvas_id)?.dyn_into::<HtmlCanvasElement>()?;
        let ctx = canvas
            .get_context("2d")?
            .ok_or_else(|| JsValue::from_str("2d context unavailable"))?
            .dyn_into::<CanvasRenderingContext2d>()?;
        self.viewport
            .set_size(canvas.width() as f64, canvas.height() as f64);
        self.canvas = Some((canvas, ctx));
        Ok(())
    }

    pub fn resize(&mut self, width: f64, height: f64) {
        if let Some((canvas, _)) = &self.canvas {
            canvas.set_width(width.max(1.0) as u32);
            canvas.set_height(height.max(1.0) as u32);
        }
        self.viewport.set_size(width, height);
    }

    /// Stores drawable data under `id`; replaces earlier data with that id.
    pub fn insert_layer(&mut self, id: &str, layer: MapLayer) {
        if self.layers.insert(id.to_string(), layer).is_none() {
            self.layer_order.push(id.to_string());
        } else {
            self.tiles.remove_layer(id);
            self.pending.retain(|k, _| k.layer_id != id);
        }
    }

    pub fn remove_layer(&mut self, id: &str) {
        self.layers.remove(id);
        self.layer_order.retain(|l| l != id);
        self.visible_layers.remove(id);
        self.tiles.remove_layer(id);
        self.pending.retain(|k, _| k.layer_id != id);
    }

    /// Fills in an overlay whose file finished loading. Returns `false` when
    /// the layer is gone (the project changed meanwhile).
    pub fn set_overlay(&mut self, id: &str, overlay: GeoJsonOverlay) -> bool {
        match self.layers.get_mut(id) {
            Some(MapLayer::GeoJson(slot)) => {
                *slot = Some(overlay);
                true
            }
            _ => false,
        }
    }

    pub fn insert_marker(&mut self, id: &str, marker: MapMarker) {
        if self.markers.insert(id.to_string(), marker).is_none() {
            self.marker_order.push(id.to_string());
        }
    }

    pub fn is_layer_visible(&self, id: &str) -> bool {
        self.visible_layers.contains(id)
    }

    pub fn is_marker_visible(&self, id: &str) -> bool {
        self.visible_markers.contains(id)
    }

    pub fn marker(&self, id: &str) -> Option<&MapMarker> {
        self.markers.get(id)
    }

    /// Topmost visible marker within reach of a screen point.
    pub fn marker_at(&self, screen: Vec2) -> Option<&str> {
        self.marker_order
            .iter()
            .rev()
            .filter(|id| self.visible_markers.contains(*id))
            .find(|id| {
                self.markers.get(*id).is_some_and(|m| {
                    (self.viewport.project(m.position) - screen).length() <= MARKER_RADIUS_PX + 3.0
                })
            })
            .map(String::as_str)
    }

    /// Attribution of the visible base layers, for the corner label.
    pub fn attribution(&self) -> Option<String> {
        let parts: Vec<&str> = self
            .layer_order
            .iter()
            .filter(|id| self.visible_layers.contains(*id))
            .filter_map(|id| match self.layers.get(id) {
                Some(MapLayer::Tiles { attribution, .. }) => attribution.as_deref(),
                _ => None,
            })
            .collect();
        (!parts.is_empty()).then(|| parts.join(" | "))
    }

    /// Draws one frame. Returns `true` while tiles are still arriving, so
    /// the page knows to draw again.
    pub fn render(&mut self, theme: Theme) -> Result<bool, JsValue> {
        let Some((_, ctx)) = self.canvas.clone() else {
            return Ok(false);
        };
        self.poll_pending();

        let (w, h) = (self.viewport.width_px, self.viewport.height_px);
        ctx_set_fill_style(&ctx, theme::map_background(theme));
        ctx.fill_rect(0.0, 0.0, w, h);

        for id in self.layer_order.clone() {
            if !self.visible_layers.contains(&id) {
                continue;
            }
            match self.layers.get(&id) {
                Some(MapLayer::Tiles { source, .. }) => {
                    let source = source.clone();
                    self.draw_tiles(&ctx, &id, &source)?;
                }
                Some(MapLayer::GeoJson(Some(overlay))) => draw_overlay(&ctx, &self.viewport, overlay, theme)?,
                _ => {}
            }
        }

        for id in &self.marker_order {
            if !self.visible_markers.contains(id) {
                continue;
            }
            if let Some(marker) = self.markers.get(id) {
                draw_marker(&ctx, self.viewport.project(marker.position), &marker.name, theme)?;
            }
        }

        if let Some(text) = self.attribution() {
            ctx.set_font("11px sans-serif");
            ctx.set_text_align("right");
            ctx_set_fill_style(&ctx, theme::label_color(theme));
            ctx.fill_text(&text, w - 6.0, h - 6.0)?;
            ctx.set_text_align("start");
        }

        Ok(!self.pending.is_empty())
    }

    fn draw_tiles(
        &mut self,
        ctx: &CanvasRenderingContext2d,
        layer_id: &str,
        source: &TileSource,
    ) -> Result<(), JsValue> {
        for placed in visible_tiles(&self.viewport, source) {
            let key = TileKey::new(layer_id, placed.coord);
            if self.tiles.request(&key) {
                let img = HtmlImageElement::new()?;
                img.set_cross_origin(Some("anonymous"));
                img.set_src(&source.url_for(placed.coord));
                self.pending.insert(key.clone(), img);
            }
            if let Some(TileState::Ready(img)) = self.tiles.get(&key) {
                ctx.draw_image_with_html_image_element_and_dw_and_dh(
                    img,
                    placed.screen_x,
                    placed.screen_y,
                    placed.size_px,
                    placed.size_px,
                )?;
            }
        }
        Ok(())
    }

    /// Moves finished image loads into the cache.
    fn poll_pending(&mut self) {
        let done: Vec<TileKey> = self
            .pending
            .iter()
            .filter(|(_, img)| img.complete())
            .map(|(k, _)| k.clone())
            .collect();
        for key in done {
            let Some(img) = self.pending.remove(&key) else {
                continue;
            };
            let evicted = if img.natural_width() > 0 {
                self.tiles.mark_ready(&key, img)
            } else {
                self.tiles.mark_failed(&key)
            };
            for old in evicted {
                self.pending.remove(&old);
            }
        }
    }
}

impl MapView for CanvasMap {
    type Layer = String;
    type Marker = String;

    fn show_layer(&mut self, layer: &String) {
        self.visible_layers.insert(layer.clone());
    }

    fn hide_layer(&mut self, layer: &String) {
        self.visible_layers.remove(layer);
    }

    fn show_marker(&mut self, marker: &String) {
        self.visible_markers.insert(marker.clone());
    }

    fn hide_marker(&mut self, marker: &String) {
        self.visible_markers.remove(marker);
    }
}

fn draw_overlay(
    ctx: &CanvasRenderingContext2d,
    viewport: &MapViewport,
    overlay: &GeoJsonOverlay,
    theme: Theme,
) -> Result<(), JsValue> {
    let stroke = css_rgba(overlay.style.stroke_color);
    let fill = css_rgba(overlay.style.fill_color);
    ctx.set_line_width(overlay.style.stroke_width_px as f64);
    ctx_set_stroke_style(ctx, &stroke);
    ctx_set_fill_style(ctx, &fill);

    for command in overlay.draw_commands(viewport) {
        match command {
            DrawCommand::Point {
                at,
                radius_px,
                label,
            } => {
                ctx.begin_path();
                ctx.arc(at.x, at.y, radius_px, 0.0, TAU)?;
                ctx_set_fill_style(ctx, &stroke);
                ctx.fill();
                if let Some(label) = label {
                    ctx_set_fill_style(ctx, theme::label_color(theme));
                    ctx.set_font("12px sans-serif");
                    ctx.fill_text(&label, at.x + radius_px + 3.0, at.y + 4.0)?;
                }
                ctx_set_fill_style(ctx, &fill);
            }
            DrawCommand::Line { points } => {
                trace_path(ctx, &points, false);
                ctx.stroke();
            }
            DrawCommand::Polygon { rings } => {
                ctx.begin_path();
                for ring in &rings {
                    append_path(ctx, ring, true);
                }
                ctx.fill_with_canvas_winding_rule(CanvasWindingRule::Evenodd);
                ctx.stroke();
            }
        }
    }
    Ok(())
}

fn trace_path(ctx: &CanvasRenderingContext2d, points: &[Vec2], closed: bool) {
    ctx.begin_path();
    append_path(ctx, points, closed);
}

fn append_path(ctx: &CanvasRenderingContext2d, points: &[Vec2], closed: bool) {
    let mut iter = points.iter();
    if let Some(first) = iter.next() {
        ctx.move_to(first.x, first.y);
        for p in iter {
            ctx.line_to(p.x, p.y);
        }
        if closed {
            ctx.close_path();
        }
    }
}

fn draw_marker(
    ctx: &CanvasRenderingContext2d,
    at: Vec2,
    name: &str,
    theme: Theme,
) -> Result<(), JsValue> {
    ctx.begin_path();
    ctx.arc(at.x, at.y, MARKER_RADIUS_PX, 0.0, TAU)?;
    ctx_set_fill_style(ctx, "rgba(220, 53, 69, 0.95)");
    ctx.fill();
    ctx.set_line_width(2.0);
    ctx_set_stroke_style(ctx, "rgba(255, 255, 255, 0.95)");
    ctx.stroke();

    ctx.set_font("12px sans-serif");
    ctx_set_fill_style(ctx, theme::label_color(theme));
    ctx.fill_text(name, at.x + MARKER_RADIUS_PX + 4.0, at.y + 4.0)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{CanvasMap, MapLayer, MapMarker};
    use foundation::math::{LatLon, Vec2};
    use layers::{LayerKind, MapViewer, MapViewport, NoControls, TileSource};

    fn viewer() -> MapViewer<CanvasMap, NoControls> {
        let vp = MapViewport::new(LatLon::new(51.5, -0.12), 14.0, 800.0, 600.0);
        let mut viewer = MapViewer::new(CanvasMap::new(vp), NoControls);
        viewer.view_mut().insert_layer(
            "osm",
            MapLayer::Tiles {
                source: TileSource::new("https://{s}.tile.example.org/{z}/{x}/{y}.png"),
                attribution: Some("© OpenStreetMap".to_string()),
            },
        );
        viewer.add_layer("osm", "osm".to_string(), "Streets", LayerKind::Base, true);
        viewer.view_mut().insert_layer("plots", MapLayer::GeoJson(None));
        viewer.add_layer("plots", "plots".to_string(), "Plots", LayerKind::Overlay, true);
        viewer.view_mut().insert_marker(
            "gate",
            MapMarker {
                position: LatLon::new(51.5, -0.12),
                name: "Gate".to_string(),
                description: None,
            },
        );
        viewer.add_annotation("gate", "gate".to_string(), "Gate", true);
        viewer
    }

    #[test]
    fn registry_drives_canvas_visibility() {
        let mut viewer = viewer();
        assert!(viewer.view().is_layer_visible("plots"));
        assert_eq!(viewer.toggle_layer("plots", None), Some(false));
        assert!(!viewer.view().is_layer_visible("plots"));
        assert_eq!(viewer.toggle_layer("plots", None), Some(true));
        assert!(viewer.view().is_layer_visible("plots"));

        viewer.toggle_annotation("gate", Some(false));
        assert!(!viewer.view().is_marker_visible("gate"));
    }

    #[test]
    fn markers_are_hit_near_their_position() {
        let viewer = viewer();
        assert_eq!(viewer.view().marker_at(Vec2::new(402.0, 298.0)), Some("gate"));
        assert_eq!(viewer.view().marker_at(Vec2::new(450.0, 300.0)), None);
    }

    #[test]
    fn attribution_follows_visible_base_layers() {
        let mut viewer = viewer();
        assert_eq!(viewer.view().attribution().as_deref(), Some("© OpenStreetMap"));
        viewer.toggle_layer("osm", Some(false));
        assert_eq!(viewer.view().attribution(), None);
    }

    #[test]
    fn overlays_fill_in_only_for_known_layers() {
        let mut viewer = viewer();
        let overlay = layers::GeoJsonOverlay::new(formats::FeatureCollection::default());
        assert!(viewer.view_mut().set_overlay("plots", overlay.clone()));
        assert!(!viewer.view_mut().set_overlay("osm", overlay.clone()));
        viewer.view_mut().remove_layer("plots");
        assert!(!viewer.view_mut().set_overlay("plots", overlay));
    }
}
