use std::sync::Arc;

use log::info;

use crate::error::BridgeError;
use crate::models::{Task, UpdateTaskRequest};
use crate::ports::TaskStore;
use crate::scheduler::NotificationHandle;

/// Task-editing flows. Each one calls the backend and then invalidates the
/// scheduler's dedup state, so every mutation path keeps the
/// "alert again after a change" contract.
#[derive(Clone)]
pub struct TaskActions {
    store: Arc<dyn TaskStore>,
    notifications: NotificationHandle,
}

impl TaskActions {
    pub fn new(store: Arc<dyn TaskStore>, notifications: NotificationHandle) -> Self {
        Self {
            store,
            notifications,
        }
    }

    /// Full reload from storage. Ids may have been reused or changed out of band.
    pub async fn reload(&self) -> Result<Vec<Task>, BridgeError> {
        let tasks = self.store.get_all_tasks().await?;
        self.notifications.reset_notifications();
        info!("reloaded {} task(s)", tasks.len());
        Ok(tasks)
    }

    pub async fn update(&self, request: UpdateTaskRequest) -> Result<Task, BridgeError> {
        let id = request.id;
        let touches_schedule = request.touches_schedule();
        let task = self.store.update_task(request).await?;
        if touches_schedule {
            self.notifications.clear_notification(id);
        }
        Ok(task)
    }

    pub async fn delete(&self, id: i64) -> Result<(), BridgeError> {
        self.store.delete_task(id).await?;
        self.notifications.clear_notification(id);
        Ok(())
    }

    pub async fn toggle_completion(&self, id: i64) -> Result<Task, BridgeError> {
        let task = self.store.toggle_task_completion(id).await?;
        self.notifications.clear_notification(id);
        if task.is_completed {
            self.notifications.notify_completed(&task).await;
        }
        Ok(task)
    }

    pub async fn import(&self, json_data: &str) -> Result<usize, BridgeError> {
        let count = self.store.import_tasks_from_json(json_data).await?;
        self.notifications.reset_notifications();
        info!("imported {count} task(s)");
        Ok(count)
    }

    pub async fn clear_all(&self) -> Result<(), BridgeError> {
        self.store.clear_all_tasks().await?;
        self.notifications.reset_notifications();
        Ok(())
    }
}
