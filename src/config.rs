use std::path::{Path, PathBuf};

use log::{debug, info, warn};
use tokio::fs;

use crate::models::{AppConfig, CURRENT_CONFIG_VERSION};

const APP_DIR_NAME: &str = "mytodo-notifier";
const CONFIG_FILE_NAME: &str = "settings.json";
const CONFIG_PATH_ENV: &str = "MYTODO_NOTIFIER_CONFIG";
const BRIDGE_URL_ENV: &str = "MYTODO_BRIDGE_URL";

/// Bridge URLs must be http(s).
fn is_valid_url(url: &str) -> bool {
    url.starts_with("https://") || url.starts_with("http://")
}

/// Clamp, trim, and sanitise every field so the rest of the app can trust it.
pub fn validate(mut cfg: AppConfig) -> AppConfig {
    let bridge_url = cfg.bridge_url.trim().trim_end_matches('/').to_string();
    if bridge_url.is_empty() || !is_valid_url(&bridge_url) {
        warn!(
            "config: invalid bridge_url '{}', resetting to default",
            cfg.bridge_url
        );
        cfg.bridge_url = AppConfig::default().bridge_url;
    } else {
        cfg.bridge_url = bridge_url;
    }

    cfg.log_directory = cfg.log_directory.and_then(|path| {
        let trimmed = path.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    });

    // -- interval bounds (min 1, max 1440 = 24 h) --
    cfg.poll_interval_minutes = cfg.poll_interval_minutes.clamp(1, 1_440);
    cfg.connect_timeout_secs = cfg.connect_timeout_secs.clamp(1, 60);
    cfg.request_timeout_secs = cfg.request_timeout_secs.clamp(1, 300);
    cfg.max_log_days = cfg.max_log_days.clamp(1, 365);

    // stamp current version
    cfg.config_version = CURRENT_CONFIG_VERSION;
    cfg
}

/// Environment overrides win over the file.
fn apply_env_overrides(mut cfg: AppConfig) -> AppConfig {
    if let Ok(url) = std::env::var(BRIDGE_URL_ENV) {
        if !url.trim().is_empty() {
            info!("bridge url overridden by {BRIDGE_URL_ENV}");
            cfg.bridge_url = url;
        }
    }
    cfg
}

pub fn config_path() -> Result<PathBuf, String> {
    if let Ok(path) = std::env::var(CONFIG_PATH_ENV) {
        if !path.trim().is_empty() {
            return Ok(PathBuf::from(path.trim()));
        }
    }

    let mut base = dirs::config_dir().ok_or_else(|| "failed to resolve config dir".to_string())?;
    base.push(APP_DIR_NAME);
    base.push(CONFIG_FILE_NAME);
    Ok(base)
}

pub async fn load_config(path: &Path) -> Result<AppConfig, String> {
    if !path.exists() {
        info!("no config file at {}, using defaults", path.display());
        return Ok(validate(apply_env_overrides(AppConfig::default())));
    }

    debug!("loading config from {}", path.display());

    let content = fs::read_to_string(path)
        .await
        .map_err(|err| format!("failed to read config: {err}"))?;

    let parsed: AppConfig =
        serde_json::from_str(&content).map_err(|err| format!("invalid config JSON: {err}"))?;
    let from = parsed.config_version;
    let validated = validate(parsed);

    // persist after load so the file reflects the latest schema
    if from != validated.config_version {
        info!("config stamped v{from} → v{}", validated.config_version);
    }
    let serialized = serde_json::to_string_pretty(&validated)
        .map_err(|err| format!("failed to serialize config: {err}"))?;
    if let Err(err) = fs::write(path, serialized).await {
        warn!("failed to re-save config: {err}");
    }

    Ok(validate(apply_env_overrides(validated)))
}

pub async fn save_config(path: &Path, input: AppConfig) -> Result<AppConfig, String> {
    let validated = validate(input);

    info!("saving config to {}", path.display());

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .await
            .map_err(|err| format!("failed to create config directory: {err}"))?;
    }

    let serialized = serde_json::to_string_pretty(&validated)
        .map_err(|err| format!("failed to serialize config: {err}"))?;

    fs::write(path, serialized)
        .await
        .map_err(|err| format!("failed to write config: {err}"))?;

    Ok(validated)
}
