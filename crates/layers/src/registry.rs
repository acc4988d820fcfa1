use crate::layer::{ControlGroup, ControlItem, ControlKind, LayerControls, LayerKind, MapView};

#[derive(Debug, Clone, PartialEq)]
pub struct LayerEntry<H> {
    pub id: String,
    pub handle: H,
    pub visible: bool,
    pub name: String,
    pub kind: LayerKind,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AnnotationEntry<H> {
    pub id: String,
    pub handle: H,
    pub visible: bool,
    pub name: String,
}

/// Visibility registry for one map: layers and annotations by id, kept in
/// insertion order, with the map surface and the checkbox lists kept in
/// step on every change.
///
/// Single-threaded; the last write wins.
pub struct MapViewer<V: MapView, C: LayerControls> {
    view: V,
    controls: C,
    layers: Vec<LayerEntry<V::Layer>>,
    annotations: Vec<AnnotationEntry<V::Marker>>,
}

impl<V: MapView, C: LayerControls> MapViewer<V, C> {
    pub fn new(view: V, controls: C) -> Self {
        Self {
            view,
            controls,
            layers: Vec::new(),
            annotations: Vec::new(),
        }
    }

    pub fn view(&self) -> &V {
        &self.view
    }

    pub fn view_mut(&mut self) -> &mut V {
        &mut self.view
    }

    pub fn controls(&self) -> &C {
        &self.controls
    }

    pub fn controls_mut(&mut self) -> &mut C {
        &mut self.controls
    }

    pub fn layers(&self) -> &[LayerEntry<V::Layer>] {
        &self.layers
    }

    pub fn annotations(&self) -> &[AnnotationEntry<V::Marker>] {
        &self.annotations
    }

    pub fn layer(&self, id: &str) -> Option<&LayerEntry<V::Layer>> {
        self.layers.iter().find(|e| e.id == id)
    }

    pub fn annotation(&self, id: &str) -> Option<&AnnotationEntry<V::Marker>> {
        self.annotations.iter().find(|e| e.id == id)
    }

    pub fn layer_visible(&self, id: &str) -> Option<bool> {
        self.layer(id).map(|e| e.visible)
    }

    pub fn annotation_visible(&self, id: &str) -> Option<bool> {
        self.annotation(id).map(|e| e.visible)
    }

    /// Registers a layer. An existing layer with the same id is taken off
    /// the map first and replaced in place. A visible base layer hides the
    /// other base layers.
    pub fn add_layer(
        &mut self,
        id: impl Into<String>,
        handle: V::Layer,
        name: impl Into<String>,
        kind: LayerKind,
        visible: bool,
    ) {
        let entry = LayerEntry {
            id: id.into(),
            handle,
            visible,
            name: name.into(),
            kind,
        };

        let slot = self.layers.iter().position(|e| e.id == entry.id);
        if let Some(idx) = slot {
            let old = &self.layers[idx];
            if old.visible {
                self.view.hide_layer(&old.handle);
            }
        }

        if visible && kind == LayerKind::Base {
            for other in self
                .layers
                .iter_mut()
                .filter(|e| e.kind == LayerKind::Base && e.visible && e.id != entry.id)
            {
                self.view.hide_layer(&other.handle);
                other.visible = false;
            }
        }

        if entry.visible {
            self.view.show_layer(&entry.handle);
        }
        match slot {
            Some(idx) => self.layers[idx] = entry,
            None => self.layers.push(entry),
        }
        self.render_layers();
    }

    /// Takes a layer off the map and forgets it; returns its handle.
    pub fn remove_layer(&mut self, id: &str) -> Option<V::Layer> {
        let idx = self.layers.iter().position(|e| e.id == id)?;
        let entry = self.layers.remove(idx);
        if entry.visible {
            self.view.hide_layer(&entry.handle);
        }
        self.render_layers();
        Some(entry.handle)
    }

    /// Flips visibility, or sets it when `desired` is given. The map and the
    /// checkbox are both updated. Returns the new state, `None` for an
    /// unknown id.
    pub fn toggle_layer(&mut self, id: &str, desired: Option<bool>) -> Option<bool> {
        let Some(entry) = self.layers.iter_mut().find(|e| e.id == id) else {
            tracing::debug!(layer = id, "toggle for unknown layer");
            return None;
        };
        let next = desired.unwrap_or(!entry.visible);
        if next != entry.visible {
            if next {
                self.view.show_layer(&entry.handle);
            } else {
                self.view.hide_layer(&entry.handle);
            }
            entry.visible = next;
        }
        // The checkbox may have been clicked already; syncing is idempotent.
        self.controls.set_checked(ControlGroup::Layers, id, next);
        Some(next)
    }

    /// Makes `id` the only visible base layer. Returns `false` when `id` is
    /// not a registered base layer; nothing changes then.
    pub fn show_base_layer(&mut self, id: &str) -> bool {
        if !self
            .layers
            .iter()
            .any(|e| e.id == id && e.kind == LayerKind::Base)
        {
            return false;
        }
        for entry in self.layers.iter_mut().filter(|e| e.kind == LayerKind::Base) {
            let next = entry.id == id;
            if next != entry.visible {
                if next {
                    self.view.show_layer(&entry.handle);
                } else {
                    self.view.hide_layer(&entry.handle);
                }
                entry.visible = next;
            }
            self.controls
                .set_checked(ControlGroup::Layers, &entry.id, next);
        }
        true
    }

    pub fn add_annotation(
        &mut self,
        id: impl Into<String>,
        handle: V::Marker,
        name: impl Into<String>,
        visible: bool,
    ) {
        let entry = AnnotationEntry {
            id: id.into(),
            handle,
            visible,
            name: name.into(),
        };

        let slot = self.annotations.iter().position(|e| e.id == entry.id);
        if let Some(idx) = slot {
            let old = &self.annotations[idx];
            if old.visible {
                self.view.hide_marker(&old.handle);
            }
        }
        if entry.visible {
            self.view.show_marker(&entry.handle);
        }
        match slot {
            Some(idx) => self.annotations[idx] = entry,
            None => self.annotations.push(entry),
        }
        self.render_annotations();
    }

    pub fn remove_annotation(&mut self, id: &str) -> Option<V::Marker> {
        let idx = self.annotations.iter().position(|e| e.id == id)?;
        let entry = self.annotations.remove(idx);
        if entry.visible {
            self.view.hide_marker(&entry.handle);
        }
        self.render_annotations();
        Some(entry.handle)
    }

    pub fn toggle_annotation(&mut self, id: &str, desired: Option<bool>) -> Option<bool> {
        let Some(entry) = self.annotations.iter_mut().find(|e| e.id == id) else {
            tracing::debug!(annotation = id, "toggle for unknown annotation");
            return None;
        };
        let next = desired.unwrap_or(!entry.visible);
        if next != entry.visible {
            if next {
                self.view.show_marker(&entry.handle);
            } else {
                self.view.hide_marker(&entry.handle);
            }
            entry.visible = next;
        }
        self.controls
            .set_checked(ControlGroup::Annotations, id, next);
        Some(next)
    }

    /// Shows or hides every annotation; returns how many changed.
    pub fn set_all_annotations(&mut self, visible: bool) -> usize {
        let mut changed = 0;
        for entry in &mut self.annotations {
            if entry.visible != visible {
                if visible {
                    self.view.show_marker(&entry.handle);
                } else {
                    self.view.hide_marker(&entry.handle);
                }
                entry.visible = visible;
                changed += 1;
            }
            self.controls
                .set_checked(ControlGroup::Annotations, &entry.id, visible);
        }
        changed
    }

    pub fn layer_controls(&self) -> Vec<ControlItem> {
        self.layers
            .iter()
            .map(|e| ControlItem {
                id: e.id.clone(),
                name: e.name.clone(),
                checked: e.visible,
                kind: e.kind.into(),
            })
            .collect()
    }

    pub fn annotation_controls(&self) -> Vec<ControlItem> {
        self.annotations
            .iter()
            .map(|e| ControlItem {
                id: e.id.clone(),
                name: e.name.clone(),
                checked: e.visible,
                kind: ControlKind::Annotation,
            })
            .collect()
    }

    /// Takes everything off the map and empties both lists.
    pub fn clear(&mut self) {
        for entry in self.layers.drain(..) {
            if entry.visible {
                self.view.hide_layer(&entry.handle);
            }
        }
        for entry in self.annotations.drain(..) {
            if entry.visible {
                self.view.hide_marker(&entry.handle);
            }
        }
        self.render_layers();
        self.render_annotations();
    }

    fn render_layers(&mut self) {
        let items = self.layer_controls();
        self.controls.render(ControlGroup::Layers, &items);
    }

    fn render_annotations(&mut self) {
        let items = self.annotation_controls();
        self.controls.render(ControlGroup::Annotations, &items);
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::collections::BTreeMap;

    use super::MapViewer;
    use crate::layer::{
        ControlGroup, ControlItem, ControlKind, LayerControls, LayerKind, MapView,
    };

    /// Records what is on the map and every call made.
    #[derive(Debug, Default)]
    pub(crate) struct RecordingView {
        pub on_map: Vec<String>,
        pub calls: Vec<String>,
    }

    impl MapView for RecordingView {
        type Layer = String;
        type Marker = String;

        fn show_layer(&mut self, layer: &String) {
            self.calls.push(format!("show {layer}"));
            self.on_map.push(layer.clone());
        }

        fn hide_layer(&mut self, layer: &String) {
            self.calls.push(format!("hide {layer}"));
            self.on_map.retain(|l| l != layer);
        }

        fn show_marker(&mut self, marker: &String) {
            self.show_layer(marker);
        }

        fn hide_marker(&mut self, marker: &String) {
            self.hide_layer(marker);
        }
    }

    /// A checkbox DOM stand-in.
    #[derive(Debug, Default)]
    pub(crate) struct Checkboxes {
        pub boxes: BTreeMap<(String, String), bool>,
        pub renders: usize,
    }

    fn group_key(group: ControlGroup) -> String {
        format!("{group:?}")
    }

    impl LayerControls for Checkboxes {
        fn render(&mut self, group: ControlGroup, items: &[ControlItem]) {
            self.renders += 1;
            let g = group_key(group);
            self.boxes.retain(|(bg, _), _| *bg != g);
            for item in items {
                self.boxes.insert((g.clone(), item.id.clone()), item.checked);
            }
        }

        fn set_checked(&mut self, group: ControlGroup, id: &str, checked: bool) {
            if let Some(b) = self.boxes.get_mut(&(group_key(group), id.to_string())) {
                *b = checked;
            }
        }
    }

    fn checkbox(viewer: &MapViewer<RecordingView, Checkboxes>, group: ControlGroup, id: &str) -> Option<bool> {
        viewer
            .controls()
            .boxes
            .get(&(group_key(group), id.to_string()))
            .copied()
    }

    fn viewer() -> MapViewer<RecordingView, Checkboxes> {
        MapViewer::new(RecordingView::default(), Checkboxes::default())
    }

    #[test]
    fn toggling_twice_restores_visibility() {
        let mut v = viewer();
        v.add_layer("ortho", "ortho-tiles".to_string(), "Orthomosaic", LayerKind::Overlay, true);

        assert_eq!(v.toggle_layer("ortho", None), Some(false));
        assert!(v.view().on_map.is_empty());
        assert_eq!(checkbox(&v, ControlGroup::Layers, "ortho"), Some(false));

        assert_eq!(v.toggle_layer("ortho", None), Some(true));
        assert_eq!(v.view().on_map, vec!["ortho-tiles"]);
        assert_eq!(checkbox(&v, ControlGroup::Layers, "ortho"), Some(true));
    }

    #[test]
    fn explicit_toggle_is_idempotent() {
        let mut v = viewer();
        v.add_layer("dsm", "dsm".to_string(), "Surface model", LayerKind::Overlay, false);
        assert_eq!(v.toggle_layer("dsm", Some(false)), Some(false));
        assert!(v.view().calls.is_empty());
        assert_eq!(v.toggle_layer("dsm", Some(true)), Some(true));
        assert_eq!(v.toggle_layer("dsm", Some(true)), Some(true));
        assert_eq!(v.view().calls, vec!["show dsm"]);
    }

    #[test]
    fn unknown_ids_are_ignored() {
        let mut v = viewer();
        assert_eq!(v.toggle_layer("nope", None), None);
        assert_eq!(v.toggle_annotation("nope", Some(true)), None);
        assert_eq!(v.remove_layer("nope"), None);
        assert!(!v.show_base_layer("nope"));
    }

    #[test]
    fn replacing_a_layer_removes_the_old_handle_first() {
        let mut v = viewer();
        v.add_layer("ortho", "v1".to_string(), "Ortho", LayerKind::Overlay, true);
        v.add_layer("ortho", "v2".to_string(), "Ortho (new)", LayerKind::Overlay, true);

        assert_eq!(v.view().calls, vec!["show v1", "hide v1", "show v2"]);
        assert_eq!(v.view().on_map, vec!["v2"]);
        assert_eq!(v.layers().len(), 1);
        assert_eq!(v.layer_controls()[0].name, "Ortho (new)");
    }

    #[test]
    fn base_layers_are_exclusive() {
        let mut v = viewer();
        v.add_layer("osm", "osm".to_string(), "Streets", LayerKind::Base, true);
        v.add_layer("sat", "sat".to_string(), "Satellite", LayerKind::Base, false);
        v.add_layer("ortho", "ortho".to_string(), "Ortho", LayerKind::Overlay, true);

        assert!(v.show_base_layer("sat"));
        assert_eq!(v.layer_visible("osm"), Some(false));
        assert_eq!(v.layer_visible("sat"), Some(true));
        assert_eq!(v.layer_visible("ortho"), Some(true));
        assert_eq!(checkbox(&v, ControlGroup::Layers, "osm"), Some(false));
        assert!(!v.show_base_layer("ortho"));

        // Adding another visible base layer takes over as well.
        v.add_layer("topo", "topo".to_string(), "Topo", LayerKind::Base, true);
        assert_eq!(v.layer_visible("sat"), Some(false));
        let mut on_map = v.view().on_map.clone();
        on_map.sort();
        assert_eq!(on_map, vec!["ortho", "topo"]);
    }

    #[test]
    fn controls_follow_insertion_order() {
        let mut v = viewer();
        v.add_layer("b", "b".to_string(), "B", LayerKind::Overlay, true);
        v.add_layer("a", "a".to_string(), "A", LayerKind::Base, false);
        assert_eq!(
            v.layer_controls(),
            vec![
                ControlItem {
                    id: "b".to_string(),
                    name: "B".to_string(),
                    checked: true,
                    kind: ControlKind::Overlay
                },
                ControlItem {
                    id: "a".to_string(),
                    name: "A".to_string(),
                    checked: false,
                    kind: ControlKind::Base
                },
            ]
        );
    }

    #[test]
    fn annotations_toggle_individually_and_together() {
        let mut v = viewer();
        v.add_annotation("gate", "m-gate".to_string(), "Main gate", true);
        v.add_annotation("ditch", "m-ditch".to_string(), "Ditch", false);

        assert_eq!(v.set_all_annotations(true), 1);
        assert_eq!(checkbox(&v, ControlGroup::Annotations, "ditch"), Some(true));
        assert_eq!(v.set_all_annotations(false), 2);
        assert!(v.view().on_map.is_empty());

        assert_eq!(v.toggle_annotation("gate", None), Some(true));
        assert_eq!(v.annotation_visible("gate"), Some(true));
        assert_eq!(v.annotation_controls()[0].kind, ControlKind::Annotation);

        assert_eq!(v.remove_annotation("gate"), Some("m-gate".to_string()));
        assert!(v.view().on_map.is_empty());
        assert_eq!(checkbox(&v, ControlGroup::Annotations, "gate"), None);
    }

    #[test]
    fn clear_takes_everything_off_the_map() {
        let mut v = viewer();
        v.add_layer("a", "a".to_string(), "A", LayerKind::Overlay, true);
        v.add_annotation("m", "m".to_string(), "M", true);
        v.clear();
        assert!(v.view().on_map.is_empty());
        assert!(v.layer_controls().is_empty());
        assert!(v.controls().boxes.is_empty());
    }
}
