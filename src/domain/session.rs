//! `PickerSession` / `PickerSelection` domain types (spec §3, §6).
//!
//! The stats blob is free-form JSON on the wire (the UI adds keys this
//! core doesn't know about) but the core itself only ever reads/writes a
//! fixed set of known keys. Per spec §9 ("typed known-keys struct for
//! reads and writes... serialize through an unknown-keys-preserved
//! round-trip"), `SessionStats` flattens unrecognized keys into `extra`
//! so a write never drops UI-only extensions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Pending,
    Expanding,
    Processing,
    Importing,
    Imported,
    Error,
    Canceled,
    Expired,
    Failed,
    Ready,
}

impl SessionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionStatus::Pending => "pending",
            SessionStatus::Expanding => "expanding",
            SessionStatus::Processing => "processing",
            SessionStatus::Importing => "importing",
            SessionStatus::Imported => "imported",
            SessionStatus::Error => "error",
            SessionStatus::Canceled => "canceled",
            SessionStatus::Expired => "expired",
            SessionStatus::Failed => "failed",
            SessionStatus::Ready => "ready",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Some(match s {
            "pending" => SessionStatus::Pending,
            "expanding" => SessionStatus::Expanding,
            "processing" => SessionStatus::Processing,
            "importing" => SessionStatus::Importing,
            "imported" => SessionStatus::Imported,
            "error" => SessionStatus::Error,
            "canceled" => SessionStatus::Canceled,
            "expired" => SessionStatus::Expired,
            "failed" => SessionStatus::Failed,
            "ready" => SessionStatus::Ready,
            _ => return None,
        })
    }

    /// Terminal statuses never re-enter a non-terminal one within a single
    /// Use Case execution (spec §8, P7).
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            SessionStatus::Imported
                | SessionStatus::Error
                | SessionStatus::Canceled
                | SessionStatus::Expired
                | SessionStatus::Failed
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectionStatus {
    Pending,
    Enqueued,
    Running,
    Imported,
    Dup,
    Failed,
    Skipped,
    Expired,
    Canceled,
}

impl SelectionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SelectionStatus::Pending => "pending",
            SelectionStatus::Enqueued => "enqueued",
            SelectionStatus::Running => "running",
            SelectionStatus::Imported => "imported",
            SelectionStatus::Dup => "dup",
            SelectionStatus::Failed => "failed",
            SelectionStatus::Skipped => "skipped",
            SelectionStatus::Expired => "expired",
            SelectionStatus::Canceled => "canceled",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Some(match s {
            "pending" => SelectionStatus::Pending,
            "enqueued" => SelectionStatus::Enqueued,
            "running" => SelectionStatus::Running,
            "imported" => SelectionStatus::Imported,
            "dup" => SelectionStatus::Dup,
            "failed" => SelectionStatus::Failed,
            "skipped" => SelectionStatus::Skipped,
            "expired" => SelectionStatus::Expired,
            "canceled" => SelectionStatus::Canceled,
            _ => return None,
        })
    }

    /// Terminal per-file lifecycle states (spec §3 invariant).
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            SelectionStatus::Imported
                | SelectionStatus::Dup
                | SelectionStatus::Failed
                | SelectionStatus::Skipped
                | SelectionStatus::Expired
                | SelectionStatus::Canceled
        )
    }
}

/// One entry of `stats.tasks[]` (spec §6).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskSummary {
    pub key: String,
    pub label: String,
    pub status: String,
    pub counts: TaskCounts,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entries: Option<JsonValue>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TaskCounts {
    pub total: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub success: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed: Option<u64>,
    pub skipped: u64,
    pub failed: u64,
    pub pending: u64,
}

/// Known-keys view of the session `stats` blob (spec §6). Unknown keys
/// round-trip through `extra`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SessionStats {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stage: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub success: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skipped: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failed: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pending: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(default, skip_serializing_if = "is_false")]
    pub cancel_requested: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub canceled_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub celery_task_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tasks: Option<Vec<TaskSummary>>,
    #[serde(flatten)]
    pub extra: Map<String, JsonValue>,
}

fn is_false(b: &bool) -> bool {
    !*b
}

impl SessionStats {
    /// Merge `updates` into `self`, preserving `extra` keys that `updates`
    /// doesn't touch (spec §4.10: `set_progress(... stats_updates?)`
    /// applies all mutations; spec §9: unknown keys survive a write).
    pub fn merge(&mut self, updates: SessionStats) {
        if updates.stage.is_some() {
            self.stage = updates.stage;
        }
        if updates.total.is_some() {
            self.total = updates.total;
        }
        if updates.success.is_some() {
            self.success = updates.success;
        }
        if updates.skipped.is_some() {
            self.skipped = updates.skipped;
        }
        if updates.failed.is_some() {
            self.failed = updates.failed;
        }
        if updates.pending.is_some() {
            self.pending = updates.pending;
        }
        if updates.reason.is_some() {
            self.reason = updates.reason;
        }
        self.cancel_requested = updates.cancel_requested || self.cancel_requested;
        if updates.canceled_at.is_some() {
            self.canceled_at = updates.canceled_at;
        }
        if updates.celery_task_id.is_some() {
            self.celery_task_id = updates.celery_task_id;
        }
        if updates.tasks.is_some() {
            self.tasks = updates.tasks;
        }
        for (k, v) in updates.extra {
            self.extra.insert(k, v);
        }
    }

    pub fn to_json(&self) -> JsonValue {
        serde_json::to_value(self).unwrap_or(JsonValue::Object(Map::new()))
    }

    pub fn from_json(value: &JsonValue) -> Self {
        serde_json::from_value(value.clone()).unwrap_or_default()
    }
}

#[derive(Debug, Clone)]
pub struct PickerSessionRecord {
    pub id: i64,
    pub session_id: String,
    pub status: SessionStatus,
    pub account_id: Option<String>,
    pub selected_count: i64,
    pub last_progress_at: Option<DateTime<Utc>>,
    pub last_polled_at: Option<DateTime<Utc>>,
    pub stats: SessionStats,
}

#[derive(Debug, Clone)]
pub struct PickerSelectionRecord {
    pub id: i64,
    pub session_id: i64,
    pub google_media_id: Option<String>,
    pub local_file_path: Option<String>,
    pub local_filename: Option<String>,
    pub status: SelectionStatus,
    pub attempts: i32,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
    pub enqueued_at: Option<DateTime<Utc>>,
    pub error: Option<String>,
    pub media_id: Option<i64>,
    pub locked_by: Option<String>,
    pub lock_heartbeat_at: Option<DateTime<Utc>>,
}
