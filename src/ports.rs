use async_trait::async_trait;

use crate::error::BridgeError;
use crate::models::{AppSettings, Task, UpdateTaskRequest};

/// Read side of the task backend used by the notification scheduler.
///
/// Returned lists exclude completed tasks and tasks without a due date.
/// "Overdue" means due strictly before now; "upcoming" means due within
/// `[now, now + minutes_ahead]`.
#[async_trait]
pub trait TaskSource: Send + Sync {
    async fn get_settings(&self) -> Result<AppSettings, BridgeError>;

    async fn get_overdue_tasks(&self) -> Result<Vec<Task>, BridgeError>;

    async fn get_upcoming_tasks(&self, minutes_ahead: i32) -> Result<Vec<Task>, BridgeError>;
}

/// Single alert-delivery primitive.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn deliver(&self, title: &str, body: &str) -> Result<(), BridgeError>;
}

/// Mutating task calls used by the editing flows.
#[async_trait]
pub trait TaskStore: Send + Sync {
    async fn get_all_tasks(&self) -> Result<Vec<Task>, BridgeError>;

    async fn update_task(&self, request: UpdateTaskRequest) -> Result<Task, BridgeError>;

    async fn delete_task(&self, id: i64) -> Result<(), BridgeError>;

    async fn toggle_task_completion(&self, id: i64) -> Result<Task, BridgeError>;

    async fn import_tasks_from_json(&self, json_data: &str) -> Result<usize, BridgeError>;

    async fn clear_all_tasks(&self) -> Result<(), BridgeError>;
}
