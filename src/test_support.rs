//! In-memory fakes for the backend ports.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;

use crate::error::BridgeError;
use crate::models::{AppSettings, Task, UpdateTaskRequest};
use crate::ports::{Notifier, TaskSource, TaskStore};
use crate::scheduler::Clock;

pub fn fixed_clock(now: DateTime<Utc>) -> Clock {
    Arc::new(move || now)
}

fn rejected(command: &str) -> BridgeError {
    BridgeError::Rejected {
        command: command.to_string(),
        status: 500,
        message: "backend unavailable".to_string(),
    }
}

#[derive(Default)]
pub struct FakeSource {
    settings: Mutex<AppSettings>,
    overdue: Mutex<Vec<Task>>,
    upcoming: Mutex<Vec<Task>>,
    upcoming_windows: Mutex<Vec<i32>>,
    overdue_calls: AtomicUsize,
    fail_settings: AtomicBool,
    fail_overdue: AtomicBool,
    delay: Mutex<Option<Duration>>,
}

impl FakeSource {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn set_notifications_enabled(&self, enabled: bool) {
        self.settings.lock().notifications_enabled = enabled;
    }

    pub fn set_overdue(&self, tasks: Vec<Task>) {
        *self.overdue.lock() = tasks;
    }

    pub fn set_upcoming(&self, tasks: Vec<Task>) {
        *self.upcoming.lock() = tasks;
    }

    pub fn fail_settings(&self, fail: bool) {
        self.fail_settings.store(fail, Ordering::SeqCst);
    }

    /// Only the overdue list lookup fails; settings and upcoming still answer.
    pub fn fail_overdue(&self, fail: bool) {
        self.fail_overdue.store(fail, Ordering::SeqCst);
    }

    /// Every settings lookup sleeps this long first.
    pub fn set_delay(&self, delay: Duration) {
        *self.delay.lock() = Some(delay);
    }

    pub fn overdue_calls(&self) -> usize {
        self.overdue_calls.load(Ordering::SeqCst)
    }

    pub fn upcoming_windows(&self) -> Vec<i32> {
        self.upcoming_windows.lock().clone()
    }
}

#[async_trait]
impl TaskSource for FakeSource {
    async fn get_settings(&self) -> Result<AppSettings, BridgeError> {
        let delay = *self.delay.lock();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail_settings.load(Ordering::SeqCst) {
            return Err(rejected("get_app_settings"));
        }
        Ok(self.settings.lock().clone())
    }

    async fn get_overdue_tasks(&self) -> Result<Vec<Task>, BridgeError> {
        self.overdue_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_overdue.load(Ordering::SeqCst) {
            return Err(rejected("check_overdue_tasks"));
        }
        Ok(self.overdue.lock().clone())
    }

    async fn get_upcoming_tasks(&self, minutes_ahead: i32) -> Result<Vec<Task>, BridgeError> {
        self.upcoming_windows.lock().push(minutes_ahead);
        Ok(self.upcoming.lock().clone())
    }
}

#[derive(Default)]
pub struct RecordingNotifier {
    delivered: Mutex<Vec<(String, String)>>,
    failures_left: AtomicUsize,
}

impl RecordingNotifier {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// The next `count` deliveries fail.
    pub fn fail_next(&self, count: usize) {
        self.failures_left.store(count, Ordering::SeqCst);
    }

    /// Successful deliveries, in order.
    pub fn delivered(&self) -> Vec<(String, String)> {
        self.delivered.lock().clone()
    }

    pub fn bodies(&self) -> Vec<String> {
        self.delivered().into_iter().map(|(_, body)| body).collect()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn deliver(&self, title: &str, body: &str) -> Result<(), BridgeError> {
        let failing = self
            .failures_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| left.checked_sub(1))
            .is_ok();
        if failing {
            return Err(rejected("send_notification"));
        }
        self.delivered
            .lock()
            .push((title.to_string(), body.to_string()));
        Ok(())
    }
}

/// Task store keeping tasks in memory, keyed by id.
#[derive(Default)]
pub struct MemoryStore {
    tasks: Mutex<Vec<Task>>,
    fail: AtomicBool,
}

impl MemoryStore {
    pub fn with_tasks(tasks: Vec<Task>) -> Arc<Self> {
        Arc::new(Self {
            tasks: Mutex::new(tasks),
            fail: AtomicBool::new(false),
        })
    }

    pub fn fail_all(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    pub fn len(&self) -> usize {
        self.tasks.lock().len()
    }

    fn check(&self, command: &str) -> Result<(), BridgeError> {
        if self.fail.load(Ordering::SeqCst) {
            Err(rejected(command))
        } else {
            Ok(())
        }
    }

    fn find(&self, command: &str, id: i64) -> Result<Task, BridgeError> {
        self.tasks
            .lock()
            .iter()
            .find(|task| task.id == Some(id))
            .cloned()
            .ok_or_else(|| BridgeError::Rejected {
                command: command.to_string(),
                status: 404,
                message: format!("task {id} not found"),
            })
    }

    fn replace(&self, task: Task) {
        let mut tasks = self.tasks.lock();
        if let Some(slot) = tasks.iter_mut().find(|t| t.id == task.id) {
            *slot = task;
        }
    }
}

#[async_trait]
impl TaskStore for MemoryStore {
    async fn get_all_tasks(&self) -> Result<Vec<Task>, BridgeError> {
        self.check("get_all_tasks")?;
        Ok(self.tasks.lock().clone())
    }

    async fn update_task(&self, request: UpdateTaskRequest) -> Result<Task, BridgeError> {
        self.check("update_task")?;
        let mut task = self.find("update_task", request.id)?;
        if let Some(title) = request.title {
            task.title = title;
        }
        if let Some(description) = request.description {
            task.description = description;
        }
        if let Some(due_date) = request.due_date {
            task.due_date = Some(due_date);
        }
        if let Some(priority) = request.priority {
            task.priority = priority;
        }
        if let Some(is_completed) = request.is_completed {
            task.is_completed = is_completed;
        }
        if let Some(tags) = request.tags {
            task.tags = tags;
        }
        self.replace(task.clone());
        Ok(task)
    }

    async fn delete_task(&self, id: i64) -> Result<(), BridgeError> {
        self.check("delete_task")?;
        self.tasks.lock().retain(|task| task.id != Some(id));
        Ok(())
    }

    async fn toggle_task_completion(&self, id: i64) -> Result<Task, BridgeError> {
        self.check("toggle_task_completion")?;
        let mut task = self.find("toggle_task_completion", id)?;
        task.is_completed = !task.is_completed;
        self.replace(task.clone());
        Ok(task)
    }

    async fn import_tasks_from_json(&self, json_data: &str) -> Result<usize, BridgeError> {
        self.check("import_tasks_from_json")?;
        let imported: Vec<Task> =
            serde_json::from_str(json_data).map_err(|source| BridgeError::Decode {
                command: "import_tasks_from_json".to_string(),
                source,
            })?;
        let count = imported.len();
        self.tasks.lock().extend(imported);
        Ok(count)
    }

    async fn clear_all_tasks(&self) -> Result<(), BridgeError> {
        self.check("clear_all_tasks")?;
        self.tasks.lock().clear();
        Ok(())
    }
}
