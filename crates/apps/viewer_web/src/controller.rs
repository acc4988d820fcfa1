use wasm_bindgen::prelude::JsValue;

use crate::dom;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Tab {
    Map,
    Model,
    Info,
}

impl Tab {
    pub const ALL: [Tab; 3] = [Tab::Map, Tab::Model, Tab::Info];

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "map" | "2d" => Some(Tab::Map),
            "model" | "3d" => Some(Tab::Model),
            "info" | "details" => Some(Tab::Info),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Tab::Map => "map",
            Tab::Model => "model",
            Tab::Info => "info",
        }
    }
}

/// Page chrome around the viewers: which tab is showing, whether the
/// sidebar is open and whether the viewer fills the screen.
#[derive(Debug, Clone, PartialEq)]
pub struct ViewerShell {
    active: Tab,
    sidebar_open: bool,
    fullscreen: bool,
    has_model: bool,
}

impl Default for ViewerShell {
    fn default() -> Self {
        Self::new(false)
    }
}

impl ViewerShell {
    pub fn new(has_model: bool) -> Self {
        Self {
            active: Tab::Map,
            sidebar_open: true,
            fullscreen: false,
            has_model,
        }
    }

    pub fn active_tab(&self) -> Tab {
        self.active
    }

    pub fn sidebar_open(&self) -> bool {
        self.sidebar_open
    }

    pub fn is_fullscreen(&self) -> bool {
        self.fullscreen
    }

    pub fn has_model(&self) -> bool {
        self.has_model
    }

    /// The model tab exists only for projects with a model. Returns whether
    /// the active tab changed.
    pub fn switch_tab(&mut self, tab: Tab) -> bool {
        if tab == Tab::Model && !self.has_model {
            return false;
        }
        let changed = self.active != tab;
        self.active = tab;
        changed
    }

    pub fn toggle_sidebar(&mut self) -> bool {
        self.sidebar_open = !self.sidebar_open;
        self.sidebar_open
    }

    pub fn toggle_fullscreen(&mut self) -> bool {
        self.fullscreen = !self.fullscreen;
        self.fullscreen
    }

    /// Follows the browser when fullscreen is left with Escape.
    pub fn set_fullscreen(&mut self, on: bool) {
        self.fullscreen = on;
    }

    /// Mirrors the state onto `#tab-<name>` buttons, `#panel-<name>`
    /// panels, `#sidebar` and `#viewer`.
    pub fn apply(&self) -> Result<(), JsValue> {
        for tab in Tab::ALL {
            if let Some(button) = dom::find(&format!("tab-{}", tab.as_str())) {
                dom::set_class(&button, "active", tab == self.active);
                if tab == Tab::Model {
                    dom::set_class(&button, "disabled", !self.has_model);
                }
            }
            dom::set_hidden(&format!("panel-{}", tab.as_str()), tab != self.active);
        }
        if let Some(sidebar) = dom::find("sidebar") {
            dom::set_class(&sidebar, "collapsed", !self.sidebar_open);
        }

        let document = dom::document()?;
        let viewer = dom::element("viewer")?;
        dom::set_class(&viewer, "fullscreen", self.fullscreen);
        let browser_fullscreen = document.fullscreen_element().is_some();
        if self.fullscreen && !browser_fullscreen {
            // Not all browsers allow it (iframes, iOS); the CSS class still applies.
            if let Err(err) = viewer.request_fullscreen() {
                dom::warn(&format!("fullscreen refused: {err:?}"));
            }
        } else if !self.fullscreen && browser_fullscreen {
            document.exit_fullscreen();
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::{Tab, ViewerShell};

    #[test]
    fn tabs_parse_names_and_aliases() {
        assert_eq!(Tab::parse("Map"), Some(Tab::Map));
        assert_eq!(Tab::parse("3d"), Some(Tab::Model));
        assert_eq!(Tab::parse(" details "), Some(Tab::Info));
        assert_eq!(Tab::parse("photos"), None);
    }

    #[test]
    fn model_tab_needs_a_model() {
        let mut shell = ViewerShell::new(false);
        assert!(!shell.switch_tab(Tab::Model));
        assert_eq!(shell.active_tab(), Tab::Map);

        let mut shell = ViewerShell::new(true);
        assert!(shell.switch_tab(Tab::Model));
        assert!(!shell.switch_tab(Tab::Model));
        assert_eq!(shell.active_tab(), Tab::Model);
    }

    #[test]
    fn sidebar_and_fullscreen_toggle() {
        let mut shell = ViewerShell::default();
        assert!(shell.sidebar_open());
        assert!(!shell.toggle_sidebar());
        assert!(shell.toggle_sidebar());

        assert!(shell.toggle_fullscreen());
        shell.set_fullscreen(false);
        assert!(!shell.is_fullscreen());
    }
}
