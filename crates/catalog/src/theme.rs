/// Local-storage key holding the theme preference.
pub const THEME_KEY: &str = "theme";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

impl Theme {
    pub fn as_str(self) -> &'static str {
        match self {
            Theme::Light => "light",
            Theme::Dark => "dark",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim() {
            "light" => Some(Theme::Light),
            "dark" => Some(Theme::Dark),
            _ => None,
        }
    }

    pub fn toggled(self) -> Self {
        match self {
            Theme::Light => Theme::Dark,
            Theme::Dark => Theme::Light,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ThemeError {
    StorageUnavailable,
    Io(String),
}

impl std::fmt::Display for ThemeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ThemeError::StorageUnavailable => write!(f, "browser storage unavailable"),
            ThemeError::Io(msg) => write!(f, "theme storage error: {msg}"),
        }
    }
}

impl std::error::Error for ThemeError {}

/// Where the preference lives between page loads.
pub trait ThemeStore {
    /// `Ok(None)` when nothing (or something unrecognized) is stored.
    fn load(&self) -> Result<Option<Theme>, ThemeError>;
    fn save(&mut self, theme: Theme) -> Result<(), ThemeError>;
}

#[derive(Debug, Default)]
pub struct InMemoryThemeStore {
    raw: Option<String>,
}

impl InMemoryThemeStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store that already holds `raw`, as if written by an earlier visit.
    pub fn with_raw(raw: impl Into<String>) -> Self {
        Self {
            raw: Some(raw.into()),
        }
    }

    pub fn raw(&self) -> Option<&str> {
        self.raw.as_deref()
    }
}

impl ThemeStore for InMemoryThemeStore {
    fn load(&self) -> Result<Option<Theme>, ThemeError> {
        Ok(self.raw.as_deref().and_then(Theme::parse))
    }

    fn save(&mut self, theme: Theme) -> Result<(), ThemeError> {
        self.raw = Some(theme.as_str().to_string());
        Ok(())
    }
}

/// Current theme plus its store. The stored value wins over the system
/// preference; nothing is written until the user toggles.
#[derive(Debug)]
pub struct ThemeState<S: ThemeStore> {
    store: S,
    current: Theme,
}

impl<S: ThemeStore> ThemeState<S> {
    pub fn new(store: S, prefers_dark: bool) -> Self {
        let fallback = if prefers_dark { Theme::Dark } else { Theme::Light };
        let current = match store.load() {
            Ok(Some(theme)) => theme,
            Ok(None) => fallback,
            Err(err) => {
                tracing::warn!("theme preference unreadable: {err}");
                fallback
            }
        };
        Self { store, current }
    }

    pub fn current(&self) -> Theme {
        self.current
    }

    /// Switches theme and persists it. The in-memory theme changes even
    /// when saving fails.
    pub fn toggle(&mut self) -> Result<Theme, ThemeError> {
        self.set(self.current.toggled())
    }

    pub fn set(&mut self, theme: Theme) -> Result<Theme, ThemeError> {
        self.current = theme;
        self.store.save(theme)?;
        Ok(theme)
    }

    pub fn into_store(self) -> S {
        self.store
    }
}

#[cfg(target_arch = "wasm32")]
mod wasm_storage {
    use super::{THEME_KEY, Theme, ThemeError, ThemeStore};

    #[derive(Debug)]
    pub struct LocalStorageThemeStore {
        key: String,
    }

    impl LocalStorageThemeStore {
        pub fn new() -> Result<Self, ThemeError> {
            Self::with_key(THEME_KEY)
        }

        pub fn with_key(key: impl Into<String>) -> Result<Self, ThemeError> {
            // Fail early so callers can fall back to an in-memory store.
            window_local_storage()?;
            Ok(Self { key: key.into() })
        }
    }

    impl ThemeStore for LocalStorageThemeStore {
        fn load(&self) -> Result<Option<Theme>, ThemeError> {
            let storage = window_local_storage()?;
            let raw = storage
                .get_item(&self.key)
                .map_err(|e| ThemeError::Io(format!("get_item({}) failed: {:?}", self.key, e)))?;
            Ok(raw.as_deref().and_then(Theme::parse))
        }

        fn save(&mut self, theme: Theme) -> Result<(), ThemeError> {
            let storage = window_local_storage()?;
            storage
                .set_item(&self.key, theme.as_str())
                .map_err(|e| ThemeError::Io(format!("set_item({}) failed: {:?}", self.key, e)))
        }
    }

    fn window_local_storage() -> Result<web_sys::Storage, ThemeError> {
        let win = web_sys::window().ok_or(ThemeError::StorageUnavailable)?;
        win.local_storage()
            .map_err(|e| ThemeError::Io(format!("localStorage error: {:?}", e)))?
            .ok_or(ThemeError::StorageUnavailable)
    }
}

#[cfg(target_arch = "wasm32")]
pub use wasm_storage::LocalStorageThemeStore;

#[cfg(not(target_arch = "wasm32"))]
#[derive(Debug)]
pub struct LocalStorageThemeStore;

#[cfg(not(target_arch = "wasm32"))]
impl LocalStorageThemeStore {
    pub fn new() -> Result<Self, ThemeError> {
        Err(ThemeError::StorageUnavailable)
    }

    pub fn with_key(_key: impl Into<String>) -> Result<Self, ThemeError> {
        Err(ThemeError::StorageUnavailable)
    }
}

#[cfg(not(target_arch = "wasm32"))]
impl ThemeStore for LocalStorageThemeStore {
    fn load(&self) -> Result<Option<Theme>, ThemeError> {
        Err(ThemeError::StorageUnavailable)
    }

    fn save(&mut self, _theme: Theme) -> Result<(), ThemeError> {
        Err(ThemeError::StorageUnavailable)
    }
}

#[cfg(test)]
mod tests {
    use super::{InMemoryThemeStore, LocalStorageThemeStore, Theme, ThemeError, ThemeState, ThemeStore};

    #[test]
    fn toggle_persists_across_reload() {
        let mut page = ThemeState::new(InMemoryThemeStore::new(), false);
        assert_eq!(page.current(), Theme::Light);
        assert_eq!(page.toggle(), Ok(Theme::Dark));

        // Reload: a fresh state over the same storage.
        let store = page.into_store();
        assert_eq!(store.raw(), Some("dark"));
        let reloaded = ThemeState::new(store, false);
        assert_eq!(reloaded.current(), Theme::Dark);
    }

    #[test]
    fn stored_value_beats_system_preference() {
        let state = ThemeState::new(InMemoryThemeStore::with_raw("light"), true);
        assert_eq!(state.current(), Theme::Light);

        let state = ThemeState::new(InMemoryThemeStore::with_raw("sepia"), true);
        assert_eq!(state.current(), Theme::Dark);
    }

    #[test]
    fn nothing_is_written_until_toggled() {
        let state = ThemeState::new(InMemoryThemeStore::new(), true);
        assert_eq!(state.into_store().raw(), None);
    }

    struct BrokenStore;

    impl ThemeStore for BrokenStore {
        fn load(&self) -> Result<Option<Theme>, ThemeError> {
            Err(ThemeError::Io("quota".to_string()))
        }

        fn save(&mut self, _theme: Theme) -> Result<(), ThemeError> {
            Err(ThemeError::Io("quota".to_string()))
        }
    }

    #[test]
    fn save_failure_still_switches_theme() {
        let mut state = ThemeState::new(BrokenStore, false);
        assert!(state.toggle().is_err());
        assert_eq!(state.current(), Theme::Dark);
    }

    #[test]
    fn local_storage_is_unavailable_natively() {
        assert_eq!(
            LocalStorageThemeStore::new().unwrap_err(),
            ThemeError::StorageUnavailable
        );
    }
}
