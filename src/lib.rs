pub mod alerts;
pub mod bridge;
pub mod config;
pub mod error;
pub mod file_logger;
pub mod models;
pub mod ports;
pub mod scheduler;
pub mod task_actions;
pub mod theme;

#[cfg(test)]
mod test_support;

use std::sync::Arc;

use log::{error, info};
use tokio::time::Duration;

use bridge::BridgeClient;
use models::AppConfig;
use scheduler::NotificationScheduler;

/// Loads config, starts the notification scheduler against the backend
/// bridge and runs until Ctrl-C.
pub async fn run() -> Result<(), String> {
    let _ = env_logger::builder().is_test(false).try_init();

    let path = config::config_path()?;
    let cfg = match config::load_config(&path).await {
        Ok(cfg) => cfg,
        Err(err) => {
            error!("failed to load persisted config, using defaults: {}", err);
            config::validate(AppConfig::default())
        }
    };

    // Clean up old log files
    file_logger::cleanup_old_logs(&file_logger::JournalConfig::from_app_config(&cfg)).await;

    let client = BridgeClient::new(&cfg).map_err(|err| err.to_string())?;
    info!("using task bridge at {}", cfg.bridge_url);

    let mut scheduler = NotificationScheduler::new(Arc::new(client.clone()), Arc::new(client))
        .with_poll_interval(Duration::from_secs(cfg.poll_interval_minutes * 60));
    scheduler.set_enabled(cfg.notifications_enabled);
    scheduler.start();

    if let Err(err) = tokio::signal::ctrl_c().await {
        error!("failed to listen for shutdown signal: {}", err);
    }

    info!("shutting down");
    scheduler.stop().await;
    Ok(())
}
