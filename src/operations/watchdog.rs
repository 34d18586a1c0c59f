//! `SelectionWatchdog` (spec §5, §3 invariant on `PickerSelection.locked_by`):
//! reclaims selections whose soft lock has gone stale and re-publishes
//! selections that have sat `enqueued` too long.

use chrono::Duration as ChronoDuration;
use sea_orm::{ActiveModelTrait, ActiveValue::Set, ColumnTrait, EntityTrait, QueryFilter};
use serde::Serialize;

use crate::context::IngestContext;
use crate::infrastructure::database::entities::picker_selection;
use crate::shared::error::CoreResult;

#[derive(Debug, Clone, Default, Serialize)]
pub struct WatchdogOutcome {
    pub reclaimed: u64,
    pub failed: u64,
    pub republished: u64,
}

pub async fn sweep(ctx: &IngestContext) -> CoreResult<WatchdogOutcome> {
    let now = ctx.clock.now();
    let mut outcome = WatchdogOutcome::default();

    let heartbeat_deadline = now - ChronoDuration::seconds(ctx.config.watchdog.lock_heartbeat_timeout_secs);
    let stuck = picker_selection::Entity::find()
        .filter(picker_selection::Column::Status.eq("running"))
        .filter(picker_selection::Column::LockedBy.is_not_null())
        .filter(picker_selection::Column::LockHeartbeatAt.lt(heartbeat_deadline))
        .all(ctx.db.as_ref())
        .await?;

    for selection in stuck {
        let mut active: picker_selection::ActiveModel = selection.clone().into();
        active.locked_by = Set(None);
        active.lock_heartbeat_at = Set(None);

        if selection.attempts + 1 >= ctx.config.watchdog.lock_max_attempts as i32 {
            active.status = Set("failed".to_string());
            active.error = Set(Some("watchdog_timeout".to_string()));
            active.finished_at = Set(Some(now));
            outcome.failed += 1;
        } else {
            active.status = Set("enqueued".to_string());
            active.attempts = Set(selection.attempts + 1);
            active.enqueued_at = Set(Some(now));
            outcome.reclaimed += 1;
        }
        active.update(ctx.db.as_ref()).await?;
    }

    let stalled_deadline = now - ChronoDuration::seconds(ctx.config.watchdog.stalled_enqueued_timeout_secs);
    let stalled = picker_selection::Entity::find()
        .filter(picker_selection::Column::Status.eq("enqueued"))
        .filter(picker_selection::Column::EnqueuedAt.lt(stalled_deadline))
        .all(ctx.db.as_ref())
        .await?;

    for selection in stalled {
        let mut active: picker_selection::ActiveModel = selection.into();
        active.enqueued_at = Set(Some(now));
        active.update(ctx.db.as_ref()).await?;
        outcome.republished += 1;
    }

    Ok(outcome)
}
