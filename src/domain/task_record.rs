//! Generic task-tracking row used by the Retry Scheduler and future
//! background jobs (spec §3, `CeleryTaskRecord`).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskRecordStatus {
    Scheduled,
    Queued,
    Running,
    Success,
    Failed,
    Canceled,
}

impl TaskRecordStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskRecordStatus::Scheduled => "scheduled",
            TaskRecordStatus::Queued => "queued",
            TaskRecordStatus::Running => "running",
            TaskRecordStatus::Success => "success",
            TaskRecordStatus::Failed => "failed",
            TaskRecordStatus::Canceled => "canceled",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Some(match s {
            "scheduled" => TaskRecordStatus::Scheduled,
            "queued" => TaskRecordStatus::Queued,
            "running" => TaskRecordStatus::Running,
            "success" => TaskRecordStatus::Success,
            "failed" => TaskRecordStatus::Failed,
            "canceled" => TaskRecordStatus::Canceled,
            _ => return None,
        })
    }
}

#[derive(Debug, Clone)]
pub struct TaskRecord {
    pub id: i64,
    pub task_name: String,
    pub object_type: Option<String>,
    pub object_id: Option<String>,
    pub external_task_id: Option<String>,
    pub status: TaskRecordStatus,
    pub scheduled_for: Option<DateTime<Utc>>,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
    pub payload: JsonValue,
    pub result: JsonValue,
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Payload shape for `task_name = "thumbnail.retry"` (spec §6).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ThumbnailRetryPayload {
    pub force: bool,
    pub attempts: u32,
    pub blockers: JsonValue,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub retry_disabled: bool,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub monitor_reported: bool,
}

pub const THUMBNAIL_RETRY_TASK_NAME: &str = "thumbnail.retry";
pub const THUMBNAIL_RETRY_MAX_ATTEMPTS: u32 = 5;
pub const THUMBNAIL_RETRY_COUNTDOWN_SECS: i64 = 300;
pub const PLAYBACK_NOT_READY_NOTE: &str = "playback not ready";
