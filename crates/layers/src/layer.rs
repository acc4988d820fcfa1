/// Base layers are exclusive backgrounds; overlays stack on top of them.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum LayerKind {
    Base,
    Overlay,
}

/// What a checkbox in the sidebar controls.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum ControlKind {
    Base,
    Overlay,
    Annotation,
}

impl From<LayerKind> for ControlKind {
    fn from(kind: LayerKind) -> Self {
        match kind {
            LayerKind::Base => ControlKind::Base,
            LayerKind::Overlay => ControlKind::Overlay,
        }
    }
}

/// One checkbox row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControlItem {
    pub id: String,
    pub name: String,
    pub checked: bool,
    pub kind: ControlKind,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum ControlGroup {
    Layers,
    Annotations,
}

/// The map surface a [`MapViewer`](crate::MapViewer) drives. Handles are
/// whatever the surface uses to address a drawable; the viewer only stores
/// them and hands them back.
pub trait MapView {
    type Layer;
    type Marker;

    fn show_layer(&mut self, layer: &Self::Layer);
    fn hide_layer(&mut self, layer: &Self::Layer);
    fn show_marker(&mut self, marker: &Self::Marker);
    fn hide_marker(&mut self, marker: &Self::Marker);
}

/// The checkbox lists mirroring viewer state.
pub trait LayerControls {
    /// Rebuilds a whole list (after adds and removes).
    fn render(&mut self, group: ControlGroup, items: &[ControlItem]);
    /// Updates one checkbox in place (after toggles).
    fn set_checked(&mut self, group: ControlGroup, id: &str, checked: bool);
}

/// Controls that render nowhere, for views without a sidebar.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoControls;

impl LayerControls for NoControls {
    fn render(&mut self, _group: ControlGroup, _items: &[ControlItem]) {}
    fn set_checked(&mut self, _group: ControlGroup, _id: &str, _checked: bool) {}
}
