use std::path::PathBuf;

use async_trait::async_trait;
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use tokio::fs;

pub const THEME_STORAGE_KEY: &str = "mytodo-theme";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    Light,
    Dark,
    #[default]
    Auto,
}

impl Theme {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim() {
            "light" => Some(Theme::Light),
            "dark" => Some(Theme::Dark),
            "auto" => Some(Theme::Auto),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Theme::Light => "light",
            Theme::Dark => "dark",
            Theme::Auto => "auto",
        }
    }
}

/// What the host OS currently prefers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Appearance {
    Light,
    Dark,
}

impl Appearance {
    fn opposite(self) -> Self {
        match self {
            Appearance::Light => Appearance::Dark,
            Appearance::Dark => Appearance::Light,
        }
    }
}

/// Storage port for the theme preference.
#[async_trait]
pub trait ThemeStore: Send + Sync {
    async fn load(&self, key: &str) -> Option<String>;
    async fn save(&self, key: &str, value: &str) -> Result<(), String>;
}

/// Stores preferences as a flat JSON object in one file.
pub struct JsonFileThemeStore {
    path: PathBuf,
}

impl JsonFileThemeStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    async fn read_all(&self) -> serde_json::Map<String, serde_json::Value> {
        fs::read_to_string(&self.path)
            .await
            .ok()
            .and_then(|raw| serde_json::from_str(&raw).ok())
            .unwrap_or_default()
    }
}

#[async_trait]
impl ThemeStore for JsonFileThemeStore {
    async fn load(&self, key: &str) -> Option<String> {
        self.read_all()
            .await
            .get(key)
            .and_then(|value| value.as_str())
            .map(str::to_string)
    }

    async fn save(&self, key: &str, value: &str) -> Result<(), String> {
        let mut all = self.read_all().await;
        all.insert(key.to_string(), serde_json::Value::String(value.to_string()));
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|err| format!("failed to create theme directory: {err}"))?;
        }
        let serialized = serde_json::to_string_pretty(&all)
            .map_err(|err| format!("failed to serialize theme: {err}"))?;
        fs::write(&self.path, serialized)
            .await
            .map_err(|err| format!("failed to write theme: {err}"))
    }
}

/// Theme preference plus the resolved appearance. Constructed explicitly and
/// passed to whoever needs it.
pub struct ThemeState {
    store: Box<dyn ThemeStore>,
    theme: Theme,
    is_dark: bool,
}

impl ThemeState {
    /// Unknown or missing stored values fall back to `Auto`.
    pub async fn load(store: Box<dyn ThemeStore>, system: Appearance) -> Self {
        let theme = match store.load(THEME_STORAGE_KEY).await {
            Some(raw) => Theme::parse(&raw).unwrap_or_else(|| {
                warn!("ignoring unknown stored theme '{raw}'");
                Theme::Auto
            }),
            None => Theme::Auto,
        };
        let mut state = Self {
            store,
            theme,
            is_dark: false,
        };
        state.refresh(system);
        state
    }

    pub fn theme(&self) -> Theme {
        self.theme
    }

    pub fn is_dark(&self) -> bool {
        self.is_dark
    }

    pub async fn set_theme(&mut self, theme: Theme, system: Appearance) {
        self.theme = theme;
        if let Err(err) = self.store.save(THEME_STORAGE_KEY, theme.as_str()).await {
            warn!("failed to persist theme: {err}");
        }
        self.refresh(system);
    }

    /// From `Auto`, switch to the opposite of the system appearance;
    /// otherwise flip between light and dark.
    pub async fn toggle(&mut self, system: Appearance) {
        let next = match self.theme {
            Theme::Auto => match system.opposite() {
                Appearance::Light => Theme::Light,
                Appearance::Dark => Theme::Dark,
            },
            Theme::Dark => Theme::Light,
            Theme::Light => Theme::Dark,
        };
        self.set_theme(next, system).await;
    }

    /// Re-resolve the appearance, e.g. after the system preference changed.
    pub fn refresh(&mut self, system: Appearance) {
        let target = match self.theme {
            Theme::Light => Appearance::Light,
            Theme::Dark => Appearance::Dark,
            Theme::Auto => system,
        };
        self.is_dark = target == Appearance::Dark;
        debug!("theme {} resolved to dark={}", self.theme.as_str(), self.is_dark);
    }
}
