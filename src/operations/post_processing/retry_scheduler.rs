//! Retry Scheduler (spec §4.7.3): decides whether to schedule another
//! thumbnail generation attempt under a max-attempts policy, persisting
//! state in the generic `task_records` table.

use chrono::Duration as ChronoDuration;
use serde::Serialize;
use serde_json::Value as JsonValue;

use crate::context::IngestContext;
use crate::domain::task_record::{
    TaskRecordStatus, ThumbnailRetryPayload, THUMBNAIL_RETRY_COUNTDOWN_SECS,
    THUMBNAIL_RETRY_MAX_ATTEMPTS, THUMBNAIL_RETRY_TASK_NAME,
};
use crate::infrastructure::database::task_record_repo::TaskRecordRepo;
use crate::shared::error::CoreResult;

#[derive(Debug, Clone, Serialize)]
pub struct ScheduleOutcome {
    pub scheduled: bool,
    pub reason: Option<String>,
    pub attempts: u32,
    pub max_attempts: u32,
    pub countdown: Option<i64>,
    pub celery_task_id: Option<String>,
    pub blockers: JsonValue,
}

/// Consults (or creates) the `thumbnail.retry` task record for `media_id`
/// and either schedules another attempt or gives up permanently (spec §8
/// P4: the number of `SCHEDULED` records ever reached is ≤ `MAX_ATTEMPTS`).
pub async fn schedule(
    ctx: &IngestContext,
    media_id: i64,
    force: bool,
    blockers: JsonValue,
) -> CoreResult<ScheduleOutcome> {
    let repo = TaskRecordRepo::new(ctx.db.as_ref().clone());
    let now = ctx.clock.now();
    let object_id = media_id.to_string();

    let initial_payload = serde_json::to_value(ThumbnailRetryPayload {
        force,
        attempts: 0,
        blockers: blockers.clone(),
        ..Default::default()
    })?;

    let record = repo
        .get_or_create(
            THUMBNAIL_RETRY_TASK_NAME,
            Some("media"),
            Some(&object_id),
            None,
            initial_payload,
            now,
        )
        .await?;

    let mut payload: ThumbnailRetryPayload =
        serde_json::from_value(record.payload.clone()).unwrap_or_default();

    if payload.attempts >= THUMBNAIL_RETRY_MAX_ATTEMPTS {
        payload.retry_disabled = true;
        payload.blockers = blockers.clone();
        repo.mark_finished(
            record.id,
            TaskRecordStatus::Failed,
            serde_json::to_value(&payload)?,
            Some("max_attempts".to_string()),
            now,
        )
        .await?;
        return Ok(ScheduleOutcome {
            scheduled: false,
            reason: Some("max_attempts".to_string()),
            attempts: payload.attempts,
            max_attempts: THUMBNAIL_RETRY_MAX_ATTEMPTS,
            countdown: None,
            celery_task_id: None,
            blockers,
        });
    }

    payload.attempts += 1;
    payload.force = force;
    payload.blockers = blockers.clone();

    let args = serde_json::json!({"media_id": media_id, "force": force});
    let celery_task_id = ctx
        .task_runner
        .submit_delayed(THUMBNAIL_RETRY_TASK_NAME, args, THUMBNAIL_RETRY_COUNTDOWN_SECS)
        .await;

    let scheduled_for = now + ChronoDuration::seconds(THUMBNAIL_RETRY_COUNTDOWN_SECS);
    repo.reschedule(record.id, scheduled_for, serde_json::to_value(&payload)?, now)
        .await?;

    Ok(ScheduleOutcome {
        scheduled: true,
        reason: None,
        attempts: payload.attempts,
        max_attempts: THUMBNAIL_RETRY_MAX_ATTEMPTS,
        countdown: Some(THUMBNAIL_RETRY_COUNTDOWN_SECS),
        celery_task_id: Some(celery_task_id),
        blockers,
    })
}
