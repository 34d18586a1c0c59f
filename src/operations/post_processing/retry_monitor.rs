//! Retry Monitor (spec §4.7.3 second half): the sweep that re-invokes the
//! Thumbnail Worker for every `thumbnail.retry` task record whose
//! `scheduled_for` has elapsed, and applies the same schedule-or-disable
//! decision the Retry Scheduler uses when first queuing a record.

use serde::Serialize;

use super::retry_scheduler;
use super::thumbnail::{self, PLAYBACK_NOT_READY_NOTE};
use crate::context::IngestContext;
use crate::domain::task_record::{TaskRecordStatus, ThumbnailRetryPayload, THUMBNAIL_RETRY_TASK_NAME};
use crate::infrastructure::database::task_record_repo::TaskRecordRepo;
use crate::shared::error::CoreResult;

#[derive(Debug, Clone, Default, Serialize)]
pub struct MonitorOutcome {
    pub recovered: u64,
    pub rescheduled: u64,
    pub disabled: u64,
    pub skipped: u64,
}

pub async fn sweep(ctx: &IngestContext) -> CoreResult<MonitorOutcome> {
    let repo = TaskRecordRepo::new(ctx.db.as_ref().clone());
    let now = ctx.clock.now();
    let due = repo.due_for_attempt(now).await?;

    let mut outcome = MonitorOutcome::default();

    for record in due {
        if record.task_name != THUMBNAIL_RETRY_TASK_NAME {
            continue;
        }
        let Some(media_id) = record.object_id.as_deref().and_then(|s| s.parse::<i64>().ok()) else {
            outcome.skipped += 1;
            continue;
        };

        let payload: ThumbnailRetryPayload = serde_json::from_value(record.payload.clone()).unwrap_or_default();
        repo.mark_running(record.id, now).await?;

        let thumb_outcome = thumbnail::generate(ctx, media_id, payload.force).await?;

        if thumb_outcome.notes.as_deref() == Some(PLAYBACK_NOT_READY_NOTE) {
            let blockers = thumb_outcome
                .retry_blockers
                .clone()
                .unwrap_or_else(|| serde_json::json!({}));
            let schedule_outcome = retry_scheduler::schedule(ctx, media_id, payload.force, blockers).await?;

            if schedule_outcome.scheduled {
                outcome.rescheduled += 1;
            } else {
                outcome.disabled += 1;
                if !payload.monitor_reported {
                    ctx.events.warn(
                        "retry_monitor_blocked",
                        None,
                        &[
                            ("media_id", &media_id),
                            ("attempts", &schedule_outcome.attempts),
                            ("blockers", &schedule_outcome.blockers.to_string()),
                        ],
                    );
                    mark_reported(&repo, record.id, &schedule_outcome, now).await?;
                }
            }
        } else if thumb_outcome.ok {
            repo.mark_finished(
                record.id,
                TaskRecordStatus::Success,
                serde_json::to_value(&thumb_outcome)?,
                None,
                now,
            )
            .await?;
            outcome.recovered += 1;
        } else {
            repo.mark_finished(
                record.id,
                TaskRecordStatus::Failed,
                serde_json::to_value(&thumb_outcome)?,
                thumb_outcome.notes.clone(),
                now,
            )
            .await?;
            outcome.disabled += 1;
        }
    }

    Ok(outcome)
}

/// Persists `monitor_reported = true` on an already-disabled record so the
/// warning above is emitted at most once per record (spec §4.7.3).
async fn mark_reported(
    repo: &TaskRecordRepo,
    record_id: i64,
    schedule_outcome: &retry_scheduler::ScheduleOutcome,
    now: chrono::DateTime<chrono::Utc>,
) -> CoreResult<()> {
    let payload = ThumbnailRetryPayload {
        force: false,
        attempts: schedule_outcome.attempts,
        blockers: schedule_outcome.blockers.clone(),
        retry_disabled: true,
        monitor_reported: true,
    };
    repo.mark_finished(
        record_id,
        TaskRecordStatus::Failed,
        serde_json::to_value(&payload)?,
        Some("max_attempts".to_string()),
        now,
    )
    .await
}
