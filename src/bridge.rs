use async_trait::async_trait;
use chrono::Local;
use log::{debug, warn};
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use crate::error::BridgeError;
use crate::file_logger::{self, JournalConfig};
use crate::models::{AppConfig, AppSettings, Task, UpdateTaskRequest};
use crate::ports::{Notifier, TaskSource, TaskStore};

static FLOW_SEQUENCE: AtomicU64 = AtomicU64::new(1);

/// Remote-call client for the task backend.
///
/// Every command is sent as `POST {bridge_url}/invoke/{command}` with a JSON
/// object of arguments, and answers with the JSON-encoded result.
#[derive(Clone)]
pub struct BridgeClient {
    client: reqwest::Client,
    base_url: String,
    journal: Option<JournalConfig>,
}

impl BridgeClient {
    pub fn new(cfg: &AppConfig) -> Result<Self, BridgeError> {
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(cfg.connect_timeout_secs))
            .timeout(Duration::from_secs(cfg.request_timeout_secs))
            .build()
            .map_err(|err| BridgeError::Client(err.to_string()))?;

        let journal = cfg.logging.then(|| JournalConfig::from_app_config(cfg));

        Ok(Self {
            client,
            base_url: cfg.bridge_url.trim_end_matches('/').to_string(),
            journal,
        })
    }

    fn command_url(&self, command: &str) -> String {
        format!("{}/invoke/{}", self.base_url, command)
    }

    fn next_flow_id(&self, command: &str) -> String {
        let seq = FLOW_SEQUENCE.fetch_add(1, Ordering::SeqCst);
        let ts = Local::now().timestamp_millis();
        format!("{ts}_{command}_{seq}")
    }

    /// Write to the JSONL journal if logging is enabled.
    async fn log(&self, entry: file_logger::LogEntry) {
        if let Some(journal) = &self.journal {
            if let Err(err) = file_logger::append(journal, entry).await {
                debug!("journal write failed: {err}");
            }
        }
    }

    async fn fail(&self, url: &str, flow_id: &str, err: BridgeError) -> BridgeError {
        self.log(file_logger::error_entry(
            err.command().unwrap_or_default(),
            url,
            flow_id,
            &err.to_string(),
        ))
        .await;
        err
    }

    pub async fn invoke<T: DeserializeOwned>(
        &self,
        command: &str,
        args: Value,
    ) -> Result<T, BridgeError> {
        let url = self.command_url(command);
        let flow_id = self.next_flow_id(command);

        debug!("invoking {command} at {url}");
        self.log(file_logger::request_entry(command, &url, &flow_id, args.clone()))
            .await;
        let start = Instant::now();

        let response = match self
            .client
            .post(&url)
            .header(ACCEPT, "application/json")
            .header(CONTENT_TYPE, "application/json")
            .json(&args)
            .send()
            .await
        {
            Ok(response) => response,
            Err(source) => {
                let err = BridgeError::Transport {
                    command: command.to_string(),
                    source,
                };
                return Err(self.fail(&url, &flow_id, err).await);
            }
        };

        let status = response.status();
        let raw_text = match response.text().await {
            Ok(text) => text,
            Err(source) => {
                let err = BridgeError::Transport {
                    command: command.to_string(),
                    source,
                };
                return Err(self.fail(&url, &flow_id, err).await);
            }
        };

        let resp_json: Option<Value> = serde_json::from_str(&raw_text).ok();
        let elapsed = start.elapsed().as_millis() as u64;
        self.log(file_logger::response_entry(
            command,
            &url,
            &flow_id,
            status.as_u16(),
            resp_json.clone(),
            elapsed,
        ))
        .await;

        if !status.is_success() {
            let err = BridgeError::Rejected {
                command: command.to_string(),
                status: status.as_u16(),
                message: rejection_message(resp_json.as_ref(), &raw_text),
            };
            warn!("{err}");
            return Err(self.fail(&url, &flow_id, err).await);
        }

        let body = if raw_text.trim().is_empty() {
            "null"
        } else {
            raw_text.as_str()
        };

        match serde_json::from_str(body) {
            Ok(payload) => Ok(payload),
            Err(source) => {
                let err = BridgeError::Decode {
                    command: command.to_string(),
                    source,
                };
                Err(self.fail(&url, &flow_id, err).await)
            }
        }
    }
}

/// Backend errors come back either as `{"error": "..."}` or as plain text.
fn rejection_message(body: Option<&Value>, raw_text: &str) -> String {
    match body {
        Some(Value::Object(map)) => match map.get("error") {
            Some(Value::String(message)) => message.clone(),
            _ => raw_text.trim().to_string(),
        },
        Some(Value::String(message)) => message.clone(),
        _ => raw_text.trim().to_string(),
    }
}

#[async_trait]
impl TaskSource for BridgeClient {
    async fn get_settings(&self) -> Result<AppSettings, BridgeError> {
        self.invoke("get_app_settings", json!({})).await
    }

    async fn get_overdue_tasks(&self) -> Result<Vec<Task>, BridgeError> {
        self.invoke("check_overdue_tasks", json!({})).await
    }

    async fn get_upcoming_tasks(&self, minutes_ahead: i32) -> Result<Vec<Task>, BridgeError> {
        self.invoke("get_upcoming_tasks", json!({ "minutesAhead": minutes_ahead }))
            .await
    }
}

#[async_trait]
impl Notifier for BridgeClient {
    async fn deliver(&self, title: &str, body: &str) -> Result<(), BridgeError> {
        self.invoke("send_notification", json!({ "title": title, "body": body }))
            .await
    }
}

#[async_trait]
impl TaskStore for BridgeClient {
    async fn get_all_tasks(&self) -> Result<Vec<Task>, BridgeError> {
        self.invoke("get_all_tasks", json!({})).await
    }

    async fn update_task(&self, request: UpdateTaskRequest) -> Result<Task, BridgeError> {
        self.invoke("update_task", json!({ "request": request })).await
    }

    async fn delete_task(&self, id: i64) -> Result<(), BridgeError> {
        self.invoke("delete_task", json!({ "id": id })).await
    }

    async fn toggle_task_completion(&self, id: i64) -> Result<Task, BridgeError> {
        self.invoke("toggle_task_completion", json!({ "id": id })).await
    }

    async fn import_tasks_from_json(&self, json_data: &str) -> Result<usize, BridgeError> {
        self.invoke("import_tasks_from_json", json!({ "jsonData": json_data }))
            .await
    }

    async fn clear_all_tasks(&self) -> Result<(), BridgeError> {
        self.invoke("clear_all_tasks", json!({})).await
    }
}
