use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const CURRENT_CONFIG_VERSION: u32 = 1;

fn default_bridge_url() -> String {
    "http://127.0.0.1:1430".to_string()
}

fn default_poll_interval_minutes() -> u64 {
    5
}

fn default_connect_timeout_secs() -> u64 {
    5
}

fn default_request_timeout_secs() -> u64 {
    15
}

fn default_max_log_days() -> u64 {
    7
}

fn default_notification_time_before() -> i32 {
    15
}

fn default_true() -> bool {
    true
}

// ---- Backend data ----

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    #[serde(default)]
    pub id: Option<i64>,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub due_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub priority: TaskPriority,
    #[serde(default)]
    pub is_completed: bool,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub sort_order: i64,
}

impl Task {
    /// Saved task with the fields the scheduler looks at; everything else defaulted.
    pub fn new(id: i64, title: impl Into<String>, due_date: Option<DateTime<Utc>>) -> Self {
        Self {
            id: Some(id),
            title: title.into(),
            description: String::new(),
            due_date,
            priority: TaskPriority::default(),
            is_completed: false,
            created_at: None,
            tags: Vec::new(),
            sort_order: 0,
        }
    }
}

/// Wire format is the bare integer (0, 1, 2).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TaskPriority {
    Low = 0,
    #[default]
    Medium = 1,
    High = 2,
}

impl From<i64> for TaskPriority {
    fn from(value: i64) -> Self {
        match value {
            0 => TaskPriority::Low,
            2 => TaskPriority::High,
            _ => TaskPriority::Medium,
        }
    }
}

impl Serialize for TaskPriority {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_u8(*self as u8)
    }
}

impl<'de> Deserialize<'de> for TaskPriority {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let value = i64::deserialize(deserializer)?;
        Ok(TaskPriority::from(value))
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateTaskRequest {
    pub id: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub due_date: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<TaskPriority>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_completed: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
}

impl UpdateTaskRequest {
    /// True when the edit can change whether the task is overdue or upcoming.
    pub fn touches_schedule(&self) -> bool {
        self.due_date.is_some() || self.is_completed.is_some()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CloseBehavior {
    Exit,
    Minimize,
    #[default]
    Ask,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StartupBehavior {
    #[default]
    Normal,
    Minimized,
}

/// User settings as persisted by the backend. Read fresh on every poll.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppSettings {
    #[serde(default)]
    pub close_behavior: CloseBehavior,
    #[serde(default = "default_true")]
    pub notifications_enabled: bool,
    /// Lookahead window for "due soon" alerts, in minutes.
    #[serde(default = "default_notification_time_before")]
    pub notification_time_before: i32,
    #[serde(default)]
    pub startup_behavior: StartupBehavior,
    #[serde(default)]
    pub theme: String,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            close_behavior: CloseBehavior::Ask,
            notifications_enabled: true,
            notification_time_before: default_notification_time_before(),
            startup_behavior: StartupBehavior::Normal,
            theme: "auto".to_string(),
        }
    }
}

// ---- Local configuration ----

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    #[serde(default = "default_bridge_url")]
    pub bridge_url: String,
    #[serde(default = "default_poll_interval_minutes")]
    pub poll_interval_minutes: u64,
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    /// Local kill switch, independent of the backend's `notifications_enabled`.
    #[serde(default = "default_true")]
    pub notifications_enabled: bool,
    pub logging: bool,
    pub log_directory: Option<String>,
    #[serde(default = "default_max_log_days")]
    pub max_log_days: u64,
    pub config_version: u32,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            bridge_url: default_bridge_url(),
            poll_interval_minutes: default_poll_interval_minutes(),
            connect_timeout_secs: default_connect_timeout_secs(),
            request_timeout_secs: default_request_timeout_secs(),
            notifications_enabled: true,
            logging: false,
            log_directory: None,
            max_log_days: default_max_log_days(),
            config_version: CURRENT_CONFIG_VERSION,
        }
    }
}
