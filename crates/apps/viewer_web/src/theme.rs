use catalog::{
    InMemoryThemeStore, LocalStorageThemeStore, Theme, ThemeError, ThemeState, ThemeStore,
};
use wasm_bindgen::prelude::JsValue;

use crate::dom;

/// Local storage when the browser allows it (private modes may not), else
/// a session-only store so the toggle still works.
#[derive(Debug)]
pub enum PageThemeStore {
    Local(LocalStorageThemeStore),
    Session(InMemoryThemeStore),
}

impl PageThemeStore {
    pub fn open() -> Self {
        match LocalStorageThemeStore::new() {
            Ok(store) => PageThemeStore::Local(store),
            Err(err) => {
                dom::warn(&format!("theme will not persist: {err}"));
                PageThemeStore::Session(InMemoryThemeStore::new())
            }
        }
    }
}

impl ThemeStore for PageThemeStore {
    fn load(&self) -> Result<Option<Theme>, ThemeError> {
        match self {
            PageThemeStore::Local(s) => s.load(),
            PageThemeStore::Session(s) => s.load(),
        }
    }

    fn save(&mut self, theme: Theme) -> Result<(), ThemeError> {
        match self {
            PageThemeStore::Local(s) => s.save(theme),
            PageThemeStore::Session(s) => s.save(theme),
        }
    }
}

pub type PageTheme = ThemeState<PageThemeStore>;

pub fn prefers_dark() -> bool {
    web_sys::window()
        .and_then(|w| w.match_media("(prefers-color-scheme: dark)").ok().flatten())
        .is_some_and(|m| m.matches())
}

pub fn load() -> PageTheme {
    ThemeState::new(PageThemeStore::open(), prefers_dark())
}

/// Sets `data-theme` on `<html>` and relabels `#theme-toggle`.
pub fn apply(theme: Theme) -> Result<(), JsValue> {
    let root = dom::document()?
        .document_element()
        .ok_or_else(|| JsValue::from_str("no document element"))?;
    root.set_attribute("data-theme", theme.as_str())?;
    if let Some(button) = dom::find("theme-toggle") {
        let label = match theme {
            Theme::Light => "Dark mode",
            Theme::Dark => "Light mode",
        };
        button.set_text_content(Some(label));
        button.set_attribute("aria-pressed", if theme == Theme::Dark { "true" } else { "false" })?;
    }
    Ok(())
}

/// Canvas colors that follow the page theme.
pub fn map_background(theme: Theme) -> &'static str {
    match theme {
        Theme::Light => "#e8eef2",
        Theme::Dark => "#1b1f24",
    }
}

pub fn label_color(theme: Theme) -> &'static str {
    match theme {
        Theme::Light => "rgba(20, 24, 28, 0.92)",
        Theme::Dark => "rgba(255, 255, 255, 0.92)",
    }
}
