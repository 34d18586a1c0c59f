//! External task-runner / broker port (spec §6):
//!
//! - `submit_delayed(task_name, args, countdown_seconds) -> external_task_id`
//! - `is_aborted(task_instance) -> bool`
//! - `report_progress(task_instance, {current, total, percent, status, message})`
//!
//! The broker itself (Celery-equivalent) is explicitly out of scope (spec
//! §1); this models only the narrow seam the core calls through, grounded
//! on the `watch`/`broadcast` channel wiring the teacher uses to bridge a
//! running job's status to its handle in
//! `core-new/src/infrastructure/jobs/manager.rs::dispatch_with_priority`.

use async_trait::async_trait;
use serde_json::Value as JsonValue;
use tokio::sync::watch;
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct ProgressReport {
    pub current: u64,
    pub total: u64,
    pub percent: f32,
    pub status: String,
    pub message: String,
}

/// A handle to the in-flight invocation of the current task, used to poll
/// for cancellation. Cheap to clone; backed by a `watch` channel so
/// `is_aborted` never blocks.
#[derive(Clone)]
pub struct TaskInstance {
    aborted: watch::Receiver<bool>,
}

impl TaskInstance {
    pub fn new(aborted: watch::Receiver<bool>) -> Self {
        Self { aborted }
    }

    /// A handle that is never aborted — convenient for call sites that
    /// run outside of any broker-managed task (e.g. direct CLI use).
    pub fn never_aborted() -> Self {
        let (_tx, rx) = watch::channel(false);
        Self { aborted: rx }
    }
}

#[async_trait]
pub trait TaskRunner: Send + Sync {
    async fn submit_delayed(
        &self,
        task_name: &str,
        args: JsonValue,
        countdown_seconds: i64,
    ) -> String;

    fn is_aborted(&self, task_instance: &TaskInstance) -> bool;

    async fn report_progress(&self, task_instance: &TaskInstance, report: ProgressReport);
}

/// Production implementation. Delayed-job re-invocation for this core is
/// actually driven by the Retry Monitor's DB sweep (spec §4.7.3), so
/// `submit_delayed` only needs to hand back a stable external id; nothing
/// here is executed until the monitor observes `scheduled_for <= now`.
#[derive(Default)]
pub struct TokioTaskRunner;

#[async_trait]
impl TaskRunner for TokioTaskRunner {
    async fn submit_delayed(
        &self,
        _task_name: &str,
        _args: JsonValue,
        _countdown_seconds: i64,
    ) -> String {
        Uuid::new_v4().to_string()
    }

    fn is_aborted(&self, task_instance: &TaskInstance) -> bool {
        *task_instance.aborted.borrow()
    }

    async fn report_progress(&self, _task_instance: &TaskInstance, _report: ProgressReport) {
        // No-op by default; callers observe progress through the Session
        // Service's persisted stats instead (spec §4.6).
    }
}

/// Deterministic fake for tests: records every call, and `is_aborted`
/// reads from a caller-controlled flag instead of a real broker.
#[derive(Default)]
pub struct FakeTaskRunner {
    pub submissions: std::sync::Mutex<Vec<(String, JsonValue, i64)>>,
    pub aborted: std::sync::atomic::AtomicBool,
    pub reports: std::sync::Mutex<Vec<ProgressReport>>,
}

#[async_trait]
impl TaskRunner for FakeTaskRunner {
    async fn submit_delayed(
        &self,
        task_name: &str,
        args: JsonValue,
        countdown_seconds: i64,
    ) -> String {
        self.submissions
            .lock()
            .unwrap()
            .push((task_name.to_string(), args, countdown_seconds));
        Uuid::new_v4().to_string()
    }

    fn is_aborted(&self, _task_instance: &TaskInstance) -> bool {
        self.aborted.load(std::sync::atomic::Ordering::SeqCst)
    }

    async fn report_progress(&self, _task_instance: &TaskInstance, report: ProgressReport) {
        self.reports.lock().unwrap().push(report);
    }
}
