use chrono::{Local, NaiveDateTime, TimeZone};
use log::info;
use serde::Serialize;
use serde_json::Value;
use std::path::PathBuf;
use tokio::fs;
use tokio::io::AsyncWriteExt;

use crate::models::AppConfig;

/// Default number of days to keep log files.
const DEFAULT_MAX_LOG_DAYS: i64 = 7;
const APP_DIR_NAME: &str = "mytodo-notifier";

#[derive(Debug, Clone)]
pub struct JournalConfig {
    pub dir: PathBuf,
    pub max_days: i64,
}

impl JournalConfig {
    /// Effective journal location using user overrides from config.
    pub fn from_app_config(cfg: &AppConfig) -> Self {
        let mut dir = cfg
            .log_directory
            .as_ref()
            .map(|path| path.trim())
            .filter(|path| !path.is_empty())
            .map(PathBuf::from)
            .or_else(|| dirs::data_local_dir().map(|base| base.join(APP_DIR_NAME)))
            .unwrap_or_else(|| PathBuf::from("."));

        let max_days = if cfg.max_log_days > 0 {
            cfg.max_log_days as i64
        } else {
            DEFAULT_MAX_LOG_DAYS
        };

        dir.push("logs");
        Self { dir, max_days }
    }
}

/// A single JSONL entry written to the daily log file.
#[derive(Debug, Serialize)]
pub struct LogEntry {
    pub ts: String,
    pub command: String,
    pub method: String,
    pub url: String,
    pub flow_id: String,
    pub phase: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_body: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_body: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,
}

/// Deletes log files older than configured retention.
pub async fn cleanup_old_logs(config: &JournalConfig) {
    if config.max_days <= 0 {
        return;
    }

    let mut entries = match fs::read_dir(&config.dir).await {
        Ok(e) => e,
        Err(_) => return,
    };

    let cutoff = Local::now() - chrono::Duration::days(config.max_days);

    while let Ok(Some(entry)) = entries.next_entry().await {
        let path = entry.path();
        if !path.extension().map_or(false, |ext| ext == "jsonl") {
            continue;
        }
        let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
            continue;
        };
        let Ok(naive) =
            NaiveDateTime::parse_from_str(&format!("{stem} 00:00:00"), "%Y-%m-%d %H:%M:%S")
        else {
            continue;
        };
        if let Some(file_date) = Local.from_local_datetime(&naive).single() {
            if file_date < cutoff {
                match fs::remove_file(&path).await {
                    Ok(()) => info!("deleted old log file: {}", path.display()),
                    Err(e) => info!("failed to delete old log {}: {}", path.display(), e),
                }
            }
        }
    }
}

/// Appends a `LogEntry` as one JSONL line to `logs/YYYY-MM-DD.jsonl`.
pub async fn append(config: &JournalConfig, entry: LogEntry) -> Result<(), String> {
    fs::create_dir_all(&config.dir)
        .await
        .map_err(|e| format!("create log dir: {e}"))?;

    let date = Local::now().format("%Y-%m-%d").to_string();
    let path = config.dir.join(format!("{date}.jsonl"));

    let mut line =
        serde_json::to_string(&entry).map_err(|e| format!("serialize log entry: {e}"))?;
    line.push('\n');

    let mut file = fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .await
        .map_err(|e| format!("open log file: {e}"))?;

    file.write_all(line.as_bytes())
        .await
        .map_err(|e| format!("write log entry: {e}"))?;

    Ok(())
}

fn entry(command: &str, url: &str, flow_id: &str, phase: &str) -> LogEntry {
    LogEntry {
        ts: Local::now().to_rfc3339(),
        command: command.to_string(),
        method: "POST".to_string(),
        url: url.to_string(),
        flow_id: flow_id.to_string(),
        phase: phase.to_string(),
        request_body: None,
        status: None,
        response_body: None,
        error: None,
        duration_ms: None,
    }
}

/// Convenience: build a LogEntry for an outgoing remote call.
pub fn request_entry(command: &str, url: &str, flow_id: &str, body: Value) -> LogEntry {
    LogEntry {
        request_body: Some(body),
        ..entry(command, url, flow_id, "request")
    }
}

/// Convenience: build a LogEntry for a response with timing metadata.
pub fn response_entry(
    command: &str,
    url: &str,
    flow_id: &str,
    status: u16,
    body: Option<Value>,
    duration_ms: u64,
) -> LogEntry {
    LogEntry {
        status: Some(status),
        response_body: body,
        duration_ms: Some(duration_ms),
        ..entry(command, url, flow_id, "response")
    }
}

/// Convenience: build a LogEntry for a failed call.
pub fn error_entry(command: &str, url: &str, flow_id: &str, error: &str) -> LogEntry {
    LogEntry {
        error: Some(error.to_string()),
        ..entry(command, url, flow_id, "error")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn journal_in(dir: &tempfile::TempDir) -> JournalConfig {
        JournalConfig {
            dir: dir.path().join("logs"),
            max_days: 7,
        }
    }

    #[test]
    fn log_directory_override_is_used() {
        let cfg = AppConfig {
            log_directory: Some("  /tmp/mytodo  ".into()),
            max_log_days: 3,
            ..AppConfig::default()
        };
        let journal = JournalConfig::from_app_config(&cfg);
        assert_eq!(journal.dir, PathBuf::from("/tmp/mytodo/logs"));
        assert_eq!(journal.max_days, 3);
    }

    #[tokio::test]
    async fn append_writes_one_line_per_entry() {
        let tmp = tempfile::tempdir().unwrap();
        let journal = journal_in(&tmp);

        append(&journal, request_entry("get_app_settings", "http://x/invoke/get_app_settings", "f1", json!({})))
            .await
            .unwrap();
        append(&journal, error_entry("get_app_settings", "http://x/invoke/get_app_settings", "f1", "boom"))
            .await
            .unwrap();

        let date = Local::now().format("%Y-%m-%d").to_string();
        let content = std::fs::read_to_string(journal.dir.join(format!("{date}.jsonl"))).unwrap();
        let lines: Vec<Value> = content
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0]["phase"], "request");
        assert_eq!(lines[1]["phase"], "error");
        assert_eq!(lines[1]["error"], "boom");
        assert!(lines[1].get("status").is_none());
    }

    #[tokio::test]
    async fn cleanup_removes_only_expired_journals() {
        let tmp = tempfile::tempdir().unwrap();
        let journal = journal_in(&tmp);
        std::fs::create_dir_all(&journal.dir).unwrap();

        let today = Local::now().format("%Y-%m-%d").to_string();
        std::fs::write(journal.dir.join("2001-01-01.jsonl"), "{}\n").unwrap();
        std::fs::write(journal.dir.join(format!("{today}.jsonl")), "{}\n").unwrap();
        std::fs::write(journal.dir.join("notes.txt"), "keep").unwrap();

        cleanup_old_logs(&journal).await;

        assert!(!journal.dir.join("2001-01-01.jsonl").exists());
        assert!(journal.dir.join(format!("{today}.jsonl")).exists());
        assert!(journal.dir.join("notes.txt").exists());
    }
}
