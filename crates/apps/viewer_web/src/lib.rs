//! Browser front end: the project list page and the project viewer page
//! (2D map, 3D model, info tab). The host page owns the event listeners and
//! the `requestAnimationFrame` loop and calls the exported functions below.

use std::cell::RefCell;

use catalog::{
    LayerSource, LayerSpec, Project, SiteConfig, Theme, discover_projects, load_project,
    navigation_target, query_param,
};
use catalog::discovery::is_valid_folder_name;
use console_error_panic_hook::set_once;
use foundation::math::Vec2;
use layers::{ControlGroup, GeoJsonOverlay, LayerKind, MapViewer, MapViewport, TileSource};
use scene::{LoadTicket, ModelRequest, ModelViewer, NoDraco, load_model};
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::spawn_local;

mod browser_fetch;
mod controller;
mod controls;
mod dom;
mod draco;
mod map_canvas;
mod model_view;
mod project_list;
mod theme;

use browser_fetch::GlooFetch;
use controller::{Tab, ViewerShell};
use controls::{DomControls, parse_group};
use draco::JsDraco;
use map_canvas::{CanvasMap, MapLayer, MapMarker};
use model_view::{MeshRenderer, Overlay};
use project_list::ProjectCard;
use theme::PageTheme;

type SiteMap = MapViewer<CanvasMap, DomControls>;

/// Zoom used when a project has a center but no zoom.
const PROJECT_ZOOM: f64 = 16.0;
const FIT_PADDING_PX: f64 = 24.0;

#[derive(Default)]
struct AppState {
    config: Option<SiteConfig>,
    theme: Option<PageTheme>,
    shell: ViewerShell,
    project: Option<Project>,
    map: Option<SiteMap>,
    map_dirty: bool,
    model: ModelViewer,
    renderer: Option<MeshRenderer>,
    mesh_dirty: bool,
}

impl AppState {
    fn theme(&self) -> Theme {
        self.theme.as_ref().map(PageTheme::current).unwrap_or_default()
    }

    fn project_id(&self) -> Option<&str> {
        self.project.as_ref().map(|p| p.id.as_str())
    }

    fn sync_model_overlay(&self) {
        Overlay::for_viewer(&self.model).apply();
        dom::set_text("model-caption", model_view::caption(&self.model));
    }

    /// Everything a spawned load needs once it has a ticket.
    fn load_job(&self, ticket: LoadTicket) -> Option<LoadJob> {
        let request = self.model.request()?.clone();
        let draco_path = request
            .draco_decoder_path
            .clone()
            .or_else(|| self.config.as_ref().map(|c| c.draco_decoder_path.clone()))
            .unwrap_or_default();
        Some(LoadJob {
            ticket,
            request,
            draco_path,
        })
    }

    fn advance(&mut self, dt_s: f64) -> Result<(), JsValue> {
        self.model.tick(dt_s);
        match self.shell.active_tab() {
            Tab::Map => {
                let theme = self.theme();
                if let Some(map) = self.map.as_mut().filter(|_| self.map_dirty) {
                    // Keep drawing while tiles arrive.
                    self.map_dirty = map.view_mut().render(theme)?;
                }
            }
            Tab::Model => {
                let clear = model_view::clear_color(&self.model, self.theme());
                if let Some(renderer) = self.renderer.as_mut() {
                    if self.mesh_dirty {
                        renderer.upload(self.model.mesh());
                        self.mesh_dirty = false;
                    }
                    let (w, h) = renderer.size();
                    let view_proj = self.model.camera().view_proj(w as f64, h as f64);
                    renderer.render(view_proj, self.model.model_matrix(), clear)?;
                }
            }
            Tab::Info => {}
        }
        Ok(())
    }
}

struct LoadJob {
    ticket: LoadTicket,
    request: ModelRequest,
    draco_path: String,
}

thread_local! {
    static STATE: RefCell<AppState> = RefCell::new(AppState::default());
}

fn with_state<R>(f: impl FnOnce(&mut AppState) -> R) -> Result<R, JsValue> {
    STATE
        .try_with(|state| f(&mut state.borrow_mut()))
        .map_err(|_| JsValue::from_str("viewer state unavailable"))
}

#[wasm_bindgen(start)]
pub fn start() -> Result<(), JsValue> {
    set_once();
    let page_theme = theme::load();
    theme::apply(page_theme.current())?;
    with_state(|s| s.theme = Some(page_theme))
}

#[wasm_bindgen]
pub fn current_theme() -> Result<String, JsValue> {
    with_state(|s| s.theme().as_str().to_string())
}

/// Flips light/dark and stores the choice. Storage failures keep the new
/// theme for this page.
#[wasm_bindgen]
pub fn toggle_theme() -> Result<String, JsValue> {
    let next = with_state(|s| {
        s.map_dirty = true;
        let page_theme = s.theme.get_or_insert_with(theme::load);
        match page_theme.toggle() {
            Ok(theme) => theme,
            Err(err) => {
                dom::warn(&format!("theme not saved: {err}"));
                page_theme.current()
            }
        }
    })?;
    theme::apply(next)?;
    Ok(next.as_str().to_string())
}

async fn site_config() -> SiteConfig {
    if let Ok(Some(config)) = with_state(|s| s.config.clone()) {
        return config;
    }
    let config = SiteConfig::load(&GlooFetch).await;
    let _ = with_state(|s| s.config = Some(config.clone()));
    config
}

/// Discovers the published projects and renders one card each into
/// `#<container_id>`.
#[wasm_bindgen]
pub fn load_project_list(container_id: String) {
    spawn_local(async move {
        if let Err(err) = load_project_list_inner(&container_id).await {
            dom::warn(&format!("project list failed: {err:?}"));
        }
    });
}

async fn load_project_list_inner(container_id: &str) -> Result<(), JsValue> {
    let config = site_config().await;
    let projects = discover_projects(&GlooFetch, &config).await;
    let mut cards = Vec::with_capacity(projects.len());
    for project in &projects {
        let href = navigation_target(&GlooFetch, &config, &project.id).await;
        cards.push(ProjectCard::new(project, href));
    }
    project_list::render(container_id, &cards)
}

/// Opens the project named by `?project=` on the viewer page: fills the
/// info tab, builds the map on `map_canvas_id` and starts the model load on
/// `model_canvas_id` when the project has one.
#[wasm_bindgen]
pub fn open_project(map_canvas_id: String, model_canvas_id: String) {
    spawn_local(async move {
        if let Err(err) = open_project_inner(&map_canvas_id, &model_canvas_id).await {
            dom::warn(&format!("could not open project: {err:?}"));
            dom::set_text("project-title", "Project not found");
        }
    });
}

async fn open_project_inner(map_canvas_id: &str, model_canvas_id: &str) -> Result<(), JsValue> {
    let window = web_sys::window().ok_or_else(|| JsValue::from_str("no window"))?;
    let search = window.location().search()?;
    let id = query_param(&search, "project")
        .filter(|id| is_valid_folder_name(id))
        .ok_or_else(|| JsValue::from_str("missing or invalid ?project="))?;

    let config = site_config().await;
    let project = load_project(&GlooFetch, &config, &id).await;
    show_project_info(&project)?;

    let map = build_map(&config, &project, map_canvas_id)?;
    let overlays: Vec<(String, String)> = config
        .base_layers
        .iter()
        .chain(&project.layers)
        .filter(|spec| spec.source == LayerSource::GeoJson)
        .map(|spec| (spec.id.clone(), spec.url.clone()))
        .collect();
    let request = project
        .model
        .as_ref()
        .and_then(ModelRequest::from_settings);

    let job = with_state(|s| {
        s.shell = ViewerShell::new(request.is_some());
        s.map = Some(map);
        s.map_dirty = true;
        s.model.reset();
        s.mesh_dirty = true;
        s.project = Some(project);
        let job = request
            .and_then(|r| s.model.begin_load(r))
            .and_then(|ticket| s.load_job(ticket));
        s.sync_model_overlay();
        job
    })?;
    with_state(|s| s.shell.apply())??;

    for (layer_id, url) in overlays {
        spawn_local(load_overlay(id.clone(), layer_id, url));
    }

    if with_state(|s| s.shell.has_model())? {
        match MeshRenderer::from_canvas_id(model_canvas_id).await {
            Ok(renderer) => with_state(|s| {
                s.renderer = Some(renderer);
                s.mesh_dirty = true;
            })?,
            Err(err) => dom::warn(&format!("3D view unavailable: {err:?}")),
        }
    }
    if let Some(job) = job {
        spawn_local(run_model_load(job));
    }
    Ok(())
}

fn show_project_info(project: &Project) -> Result<(), JsValue> {
    dom::document()?.set_title(&project.title);
    dom::set_text("project-title", &project.title);
    dom::set_text("project-description", &project.description);
    let meta = [project.date.as_deref(), project.location.as_deref()]
        .into_iter()
        .flatten()
        .collect::<Vec<_>>()
        .join(" · ");
    dom::set_text("project-meta", &meta);
    Ok(())
}

fn build_map(config: &SiteConfig, project: &Project, canvas_id: &str) -> Result<SiteMap, JsValue> {
    let (center, zoom) = match project.center {
        Some(center) => (center, project.zoom.unwrap_or(PROJECT_ZOOM)),
        None => (
            config.default_center(),
            project.zoom.unwrap_or(config.default_zoom),
        ),
    };
    let mut canvas = CanvasMap::new(MapViewport::new(center, zoom, 800.0, 600.0));
    canvas.attach(canvas_id)?;

    let mut map = MapViewer::new(canvas, DomControls);
    for spec in config.base_layers.iter().chain(&project.layers) {
        add_layer(&mut map, spec);
    }
    for (i, annotation) in project.annotations.iter().enumerate() {
        let id = annotation
            .id
            .clone()
            .unwrap_or_else(|| format!("annotation-{}", i + 1));
        map.view_mut().insert_marker(
            &id,
            MapMarker {
                position: annotation.position(),
                name: annotation.name.clone(),
                description: annotation.description.clone(),
            },
        );
        map.add_annotation(
            id.clone(),
            id,
            annotation.name.clone(),
            annotation.visible.unwrap_or(true),
        );
    }
    Ok(map)
}

fn add_layer(map: &mut SiteMap, spec: &LayerSpec) {
    let layer = match spec.source {
        LayerSource::Tile => {
            let mut source = TileSource::new(spec.url.clone());
            if let Some(letters) = &spec.subdomains {
                source = source.with_subdomains(letters);
            }
            if let Some(max_zoom) = spec.max_zoom {
                source = source.with_max_zoom(max_zoom);
            }
            MapLayer::Tiles {
                source,
                attribution: spec.attribution.clone(),
            }
        }
        LayerSource::GeoJson => MapLayer::GeoJson(None),
    };
    let kind = if spec.base {
        LayerKind::Base
    } else {
        LayerKind::Overlay
    };
    map.view_mut().insert_layer(&spec.id, layer);
    map.add_layer(
        spec.id.clone(),
        spec.id.clone(),
        spec.display_name(),
        kind,
        spec.initially_visible(),
    );
}

/// Fetches one GeoJSON overlay. A project switch in the meantime drops it.
async fn load_overlay(project_id: String, layer_id: String, url: String) {
    use fetch::Fetch;

    let collection = match GlooFetch.get_text(&url).await {
        Ok(raw) => formats::FeatureCollection::from_str(&raw).map_err(|e| e.to_string()),
        Err(err) => Err(err.to_string()),
    };
    let collection = match collection {
        Ok(c) => c,
        Err(err) => {
            dom::warn(&format!("overlay {layer_id} ({url}) failed: {err}"));
            return;
        }
    };
    let _ = with_state(|s| {
        if s.project_id() != Some(project_id.as_str()) {
            return;
        }
        let without_center = s.project.as_ref().is_some_and(|p| p.center.is_none());
        let Some(map) = s.map.as_mut() else {
            return;
        };
        let overlay = GeoJsonOverlay::new(collection);
        let bounds = overlay.bounds();
        if map.view_mut().set_overlay(&layer_id, overlay) {
            if without_center {
                map.view_mut().viewport.fit_bounds(&bounds, FIT_PADDING_PX);
            }
            s.map_dirty = true;
        }
    });
}

async fn run_model_load(job: LoadJob) {
    let LoadJob {
        ticket,
        request,
        draco_path,
    } = job;
    let mut on_progress = |loaded: u64, total: Option<u64>| {
        let _ = with_state(|s| {
            if s.model.report_progress(ticket, loaded, total) {
                s.sync_model_overlay();
            }
        });
    };
    let result = if request.use_draco {
        load_model(&GlooFetch, &JsDraco::new(draco_path), &request, &mut on_progress).await
    } else {
        load_model(&GlooFetch, &NoDraco, &request, &mut on_progress).await
    };
    let _ = with_state(|s| {
        if s.model.finish_load(ticket, result) {
            s.mesh_dirty = true;
            s.sync_model_overlay();
        }
    });
}

/// Error panel "Retry" button.
#[wasm_bindgen]
pub fn model_retry() -> Result<bool, JsValue> {
    let job = with_state(|s| {
        let job = s.model.retry().and_then(|ticket| s.load_job(ticket));
        s.sync_model_overlay();
        job
    })?;
    let started = job.is_some();
    if let Some(job) = job {
        spawn_local(run_model_load(job));
    }
    Ok(started)
}

/// Error panel "Show demo" button.
#[wasm_bindgen]
pub fn model_show_demo() -> Result<bool, JsValue> {
    with_state(|s| {
        let shown = s.model.show_demo();
        if shown {
            s.mesh_dirty = true;
        }
        s.sync_model_overlay();
        shown
    })
}

/// Pointer drag on the 3D canvas.
#[wasm_bindgen]
pub fn model_orbit(delta_x_px: f64, delta_y_px: f64) -> Result<(), JsValue> {
    with_state(|s| s.model.camera_mut().orbit(delta_x_px, delta_y_px))
}

/// Secondary-button drag on the 3D canvas.
#[wasm_bindgen]
pub fn model_pan(delta_x_px: f64, delta_y_px: f64) -> Result<(), JsValue> {
    with_state(|s| s.model.camera_mut().pan(delta_x_px, delta_y_px))
}

/// Wheel `deltaY` on the 3D canvas.
#[wasm_bindgen]
pub fn model_zoom(wheel_delta_y: f64) -> Result<(), JsValue> {
    with_state(|s| s.model.camera_mut().zoom(wheel_delta_y))
}

#[wasm_bindgen]
pub fn model_resize(width: f64, height: f64) -> Result<(), JsValue> {
    with_state(|s| {
        if let Some(renderer) = s.renderer.as_mut() {
            renderer.resize(width as u32, height as u32);
        }
    })
}

/// Drag on the map canvas.
#[wasm_bindgen]
pub fn map_pan(delta_x_px: f64, delta_y_px: f64) -> Result<(), JsValue> {
    with_state(|s| {
        if let Some(map) = s.map.as_mut() {
            map.view_mut().viewport.pan_by(delta_x_px, delta_y_px);
            s.map_dirty = true;
        }
    })
}

/// Wheel over the map: zooms around the cursor.
#[wasm_bindgen]
pub fn map_zoom(x_px: f64, y_px: f64, wheel_delta_y: f64) -> Result<(), JsValue> {
    with_state(|s| {
        if let Some(map) = s.map.as_mut() {
            map.view_mut()
                .viewport
                .zoom_at(Vec2::new(x_px, y_px), -wheel_delta_y / 200.0);
            s.map_dirty = true;
        }
    })
}

#[wasm_bindgen]
pub fn map_resize(width: f64, height: f64) -> Result<(), JsValue> {
    with_state(|s| {
        if let Some(map) = s.map.as_mut() {
            map.view_mut().resize(width, height);
            s.map_dirty = true;
        }
    })
}

/// The annotation under a click, as `{"id", "name", "description"}` JSON.
#[wasm_bindgen]
pub fn map_annotation_at(x_px: f64, y_px: f64) -> Result<Option<String>, JsValue> {
    with_state(|s| {
        let view = s.map.as_ref()?.view();
        let id = view.marker_at(Vec2::new(x_px, y_px))?;
        let marker = view.marker(id)?;
        Some(
            serde_json::json!({
                "id": id,
                "name": marker.name,
                "description": marker.description,
            })
            .to_string(),
        )
    })
}

#[wasm_bindgen]
pub fn toggle_layer(id: &str) -> Result<Option<bool>, JsValue> {
    with_state(|s| {
        s.map_dirty = true;
        s.map.as_mut()?.toggle_layer(id, None)
    })
}

#[wasm_bindgen]
pub fn show_base_layer(id: &str) -> Result<bool, JsValue> {
    with_state(|s| {
        s.map_dirty = true;
        s.map.as_mut().is_some_and(|m| m.show_base_layer(id))
    })
}

#[wasm_bindgen]
pub fn toggle_annotation(id: &str) -> Result<Option<bool>, JsValue> {
    with_state(|s| {
        s.map_dirty = true;
        s.map.as_mut()?.toggle_annotation(id, None)
    })
}

/// "Show all" / "Hide all" for annotations; returns how many changed.
#[wasm_bindgen]
pub fn show_all_annotations(visible: bool) -> Result<u32, JsValue> {
    with_state(|s| {
        s.map_dirty = true;
        s.map
            .as_mut()
            .map_or(0, |m| m.set_all_annotations(visible) as u32)
    })
}

/// `change` on a sidebar input with `data-group` / `data-id`.
#[wasm_bindgen]
pub fn on_control_change(group: &str, id: &str, checked: bool) -> Result<(), JsValue> {
    let Some(group) = parse_group(group) else {
        dom::warn(&format!("unknown control group {group:?}"));
        return Ok(());
    };
    with_state(|s| {
        let Some(map) = s.map.as_mut() else {
            return;
        };
        s.map_dirty = true;
        match group {
            ControlGroup::Layers => {
                let is_base = map.layer(id).is_some_and(|e| e.kind == LayerKind::Base);
                if is_base && checked {
                    map.show_base_layer(id);
                } else {
                    map.toggle_layer(id, Some(checked));
                }
            }
            ControlGroup::Annotations => {
                map.toggle_annotation(id, Some(checked));
            }
        }
    })
}

#[wasm_bindgen]
pub fn switch_tab(name: &str) -> Result<bool, JsValue> {
    let Some(tab) = Tab::parse(name) else {
        return Ok(false);
    };
    let changed = with_state(|s| {
        let changed = s.shell.switch_tab(tab);
        // Canvases were hidden; draw them fresh.
        s.map_dirty = true;
        changed
    })?;
    with_state(|s| s.shell.apply())??;
    Ok(changed)
}

#[wasm_bindgen]
pub fn toggle_sidebar() -> Result<bool, JsValue> {
    let open = with_state(|s| s.shell.toggle_sidebar())?;
    with_state(|s| s.shell.apply())??;
    Ok(open)
}

#[wasm_bindgen]
pub fn toggle_fullscreen() -> Result<bool, JsValue> {
    let on = with_state(|s| s.shell.toggle_fullscreen())?;
    with_state(|s| s.shell.apply())??;
    Ok(on)
}

/// `fullscreenchange` from the page, e.g. after Escape.
#[wasm_bindgen]
pub fn fullscreen_changed(on: bool) -> Result<(), JsValue> {
    with_state(|s| {
        s.shell.set_fullscreen(on);
        s.map_dirty = true;
    })?;
    with_state(|s| s.shell.apply())?
}

/// One animation frame: advances the model animation by `dt_s` seconds and
/// redraws the visible viewer.
#[wasm_bindgen]
pub fn advance_frame(dt_s: f64) -> Result<(), JsValue> {
    with_state(|s| s.advance(dt_s))?
}
