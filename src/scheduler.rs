use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use log::{debug, error, info, warn};
use parking_lot::Mutex;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{self, Duration, MissedTickBehavior};

use crate::alerts::{self, Alert};
use crate::error::BridgeError;
use crate::models::Task;
use crate::ports::{Notifier, TaskSource};

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5 * 60);

pub type Clock = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Delivery {
    Delivered,
    Suppressed,
    Failed,
}

/// State shared between the scheduler, its poller task and any handles.
struct SchedulerCore {
    source: Arc<dyn TaskSource>,
    notifier: Arc<dyn Notifier>,
    enabled: AtomicBool,
    notified: Mutex<HashSet<i64>>,
    cycle_in_progress: AtomicBool,
    clock: Clock,
}

/// Resets the in-progress flag when a cycle ends, however it ends.
struct CycleGuard<'a>(&'a AtomicBool);

impl<'a> CycleGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for CycleGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl SchedulerCore {
    async fn run_cycle(&self) {
        let Some(_guard) = CycleGuard::acquire(&self.cycle_in_progress) else {
            warn!("previous notification check still running, skipping this cycle");
            return;
        };

        self.poll_overdue().await;
        self.poll_upcoming().await;
    }

    async fn poll_overdue(&self) {
        match self.check_overdue().await {
            Ok(0) => debug!("overdue check: nothing new to report"),
            Ok(count) => info!("overdue check: delivered {count} alert(s)"),
            Err(err) => error!("overdue check failed: {err}"),
        }
    }

    async fn poll_upcoming(&self) {
        match self.check_upcoming().await {
            Ok(0) => debug!("upcoming check: nothing new to report"),
            Ok(count) => info!("upcoming check: delivered {count} alert(s)"),
            Err(err) => error!("upcoming check failed: {err}"),
        }
    }

    async fn check_overdue(&self) -> Result<usize, BridgeError> {
        let settings = self.source.get_settings().await?;
        if !settings.notifications_enabled {
            debug!("notifications disabled in settings, skipping overdue check");
            return Ok(0);
        }

        let tasks = self.source.get_overdue_tasks().await?;
        let mut delivered = 0;
        for task in &tasks {
            if self.alert_once(task, Alert::overdue).await {
                delivered += 1;
            }
        }
        Ok(delivered)
    }

    async fn check_upcoming(&self) -> Result<usize, BridgeError> {
        let settings = self.source.get_settings().await?;
        if !settings.notifications_enabled {
            debug!("notifications disabled in settings, skipping upcoming check");
            return Ok(0);
        }

        let tasks = self
            .source
            .get_upcoming_tasks(settings.notification_time_before)
            .await?;
        let mut delivered = 0;
        for task in &tasks {
            let build = |task: &Task| {
                let minutes_left = alerts::minutes_until_due(task, (self.clock)());
                Alert::upcoming(task, minutes_left)
            };
            if self.alert_once(task, build).await {
                delivered += 1;
            }
        }
        Ok(delivered)
    }

    /// Deliver `build(task)` unless the task was already alerted. The id is
    /// recorded whatever the delivery outcome; only a clear or reset lets the
    /// task alert again.
    async fn alert_once<F>(&self, task: &Task, build: F) -> bool
    where
        F: FnOnce(&Task) -> Alert,
    {
        let Some(id) = task.id else {
            return false;
        };
        if !self.notified.lock().insert(id) {
            return false;
        }
        debug!("task {id} marked as notified");

        let alert = build(task);
        self.deliver(&alert).await == Delivery::Delivered
    }

    async fn deliver(&self, alert: &Alert) -> Delivery {
        if !self.enabled.load(Ordering::SeqCst) {
            debug!("scheduler disabled, suppressing '{}'", alert.title);
            return Delivery::Suppressed;
        }

        match self.notifier.deliver(&alert.title, &alert.body).await {
            Ok(()) => Delivery::Delivered,
            Err(err) => {
                warn!("failed to deliver notification '{}': {}", alert.title, err);
                Delivery::Failed
            }
        }
    }

    async fn notify_completed(&self, task: &Task) {
        let settings = match self.source.get_settings().await {
            Ok(settings) => settings,
            Err(err) => {
                error!("completion notification failed: {err}");
                return;
            }
        };
        if !settings.notifications_enabled {
            return;
        }
        self.deliver(&Alert::completed(task)).await;
    }

    fn clear_notification(&self, task_id: i64) {
        if self.notified.lock().remove(&task_id) {
            debug!("cleared notification state for task {task_id}");
        }
    }

    fn reset_notifications(&self) {
        let mut notified = self.notified.lock();
        debug!("resetting notification state ({} task(s))", notified.len());
        notified.clear();
    }
}

/// Controls for the running poller task.
struct PollTaskControl {
    stop_tx: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

/// Periodically checks for overdue and upcoming tasks and alerts the user
/// once per task until the task's notification state is cleared.
pub struct NotificationScheduler {
    core: Arc<SchedulerCore>,
    poll_interval: Duration,
    poll_task: Option<PollTaskControl>,
}

impl NotificationScheduler {
    pub fn new(source: Arc<dyn TaskSource>, notifier: Arc<dyn Notifier>) -> Self {
        Self::new_with_clock(source, notifier, Arc::new(Utc::now))
    }

    /// Like `new`, with the wall clock used for "minutes left" in due-soon
    /// alerts supplied by the caller.
    pub fn new_with_clock(
        source: Arc<dyn TaskSource>,
        notifier: Arc<dyn Notifier>,
        clock: Clock,
    ) -> Self {
        Self {
            core: Arc::new(SchedulerCore {
                source,
                notifier,
                enabled: AtomicBool::new(true),
                notified: Mutex::new(HashSet::new()),
                cycle_in_progress: AtomicBool::new(false),
                clock,
            }),
            poll_interval: DEFAULT_POLL_INTERVAL,
            poll_task: None,
        }
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval.max(Duration::from_secs(1));
        self
    }

    pub fn handle(&self) -> NotificationHandle {
        NotificationHandle {
            core: self.core.clone(),
        }
    }

    pub fn is_running(&self) -> bool {
        self.poll_task.is_some()
    }

    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    /// Polls immediately, then every poll interval. Requires a tokio runtime.
    pub fn start(&mut self) {
        if self.is_running() {
            warn!("notification scheduler already running, ignoring start");
            return;
        }

        info!(
            "notification scheduler starting (every {}s)",
            self.poll_interval.as_secs()
        );
        let (stop_tx, stop_rx) = watch::channel(false);
        let handle = tokio::spawn(Self::poll_loop(
            self.core.clone(),
            self.poll_interval,
            stop_rx,
        ));
        self.poll_task = Some(PollTaskControl { stop_tx, handle });
    }

    /// Cancels the timer and waits for an in-flight cycle to finish.
    pub async fn stop(&mut self) {
        let Some(task) = self.poll_task.take() else {
            return;
        };

        info!("notification scheduler stopping");
        let _ = task.stop_tx.send(true);
        if let Err(err) = task.handle.await {
            error!("notification poller ended abnormally: {err}");
        }
        info!("notification scheduler stopped");
    }

    async fn poll_loop(
        core: Arc<SchedulerCore>,
        period: Duration,
        mut stop_rx: watch::Receiver<bool>,
    ) {
        info!("notification poller started");

        // First tick completes immediately.
        let mut ticker = time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            if *stop_rx.borrow() {
                break;
            }

            tokio::select! {
                biased;
                changed = stop_rx.changed() => {
                    if changed.is_err() || *stop_rx.borrow() {
                        break;
                    }
                }
                _ = ticker.tick() => {
                    core.run_cycle().await;
                }
            }
        }

        info!("notification poller stopped");
    }

    pub fn set_enabled(&self, enabled: bool) {
        self.handle().set_enabled(enabled);
    }

    pub fn is_enabled(&self) -> bool {
        self.handle().is_enabled()
    }

    pub async fn run_cycle(&self) {
        self.core.run_cycle().await;
    }

    pub async fn poll_overdue(&self) {
        self.core.poll_overdue().await;
    }

    pub async fn poll_upcoming(&self) {
        self.core.poll_upcoming().await;
    }

    pub async fn notify_completed(&self, task: &Task) {
        self.core.notify_completed(task).await;
    }

    pub fn clear_notification(&self, task_id: i64) {
        self.core.clear_notification(task_id);
    }

    pub fn reset_notifications(&self) {
        self.core.reset_notifications();
    }

    pub fn is_notified(&self, task_id: i64) -> bool {
        self.handle().is_notified(task_id)
    }

    pub fn notified_count(&self) -> usize {
        self.handle().notified_count()
    }
}

/// Cheap clonable access to the scheduler's alerting and dedup state, for the
/// task-editing flows that must invalidate it.
#[derive(Clone)]
pub struct NotificationHandle {
    core: Arc<SchedulerCore>,
}

impl NotificationHandle {
    pub fn set_enabled(&self, enabled: bool) {
        self.core.enabled.store(enabled, Ordering::SeqCst);
        info!(
            "notification delivery {}",
            if enabled { "enabled" } else { "disabled" }
        );
    }

    pub fn is_enabled(&self) -> bool {
        self.core.enabled.load(Ordering::SeqCst)
    }

    pub async fn notify_completed(&self, task: &Task) {
        self.core.notify_completed(task).await;
    }

    pub fn clear_notification(&self, task_id: i64) {
        self.core.clear_notification(task_id);
    }

    pub fn reset_notifications(&self) {
        self.core.reset_notifications();
    }

    pub fn is_notified(&self, task_id: i64) -> bool {
        self.core.notified.lock().contains(&task_id)
    }

    pub fn notified_count(&self) -> usize {
        self.core.notified.lock().len()
    }
}
