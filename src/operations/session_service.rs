//! Session Service (spec §4.10): owns every mutation of the `PickerSession`
//! row. The ingestion pipeline shares a long-lived DB connection across
//! many steps, so an intermediate failure can leave a transaction
//! "pending rollback" — `set_progress` retries once through a fresh
//! transaction so a single file's failure never permanently blocks
//! progress commits (spec's Rationale).

use sea_orm::{ActiveModelTrait, ActiveValue::Set, DbErr, EntityTrait, TransactionTrait};

use crate::context::IngestContext;
use crate::domain::session::SessionStats;
use crate::infrastructure::database::entities::picker_session;
use crate::infrastructure::task_runner::TaskInstance;
use crate::shared::error::CoreResult;

pub async fn set_progress(
    ctx: &IngestContext,
    session: &picker_session::Model,
    status: Option<&str>,
    stage: Option<&str>,
    external_task_id: Option<&str>,
    stats_updates: Option<SessionStats>,
) -> CoreResult<picker_session::Model> {
    let mut stats = SessionStats::from_json(&session.stats);
    if let Some(updates) = stats_updates {
        stats.merge(updates);
    }
    if let Some(stage) = stage {
        stats.stage = Some(stage.to_string());
    }
    if let Some(task_id) = external_task_id {
        stats.celery_task_id = Some(task_id.to_string());
    }
    let now = ctx.clock.now();

    let build = || {
        let mut active: picker_session::ActiveModel = session.clone().into();
        if let Some(status) = status {
            active.status = Set(status.to_string());
        }
        active.last_progress_at = Set(Some(now));
        active.updated_at = Set(now);
        active.stats = Set(stats.to_json());
        active
    };

    match build().update(ctx.db.as_ref()).await {
        Ok(updated) => Ok(updated),
        Err(e) if is_pending_rollback(&e) => {
            ctx.events.warn(
                "session.set_progress_retry",
                Some(&session.session_id),
                &[("error", &e.to_string())],
            );
            let txn = ctx.db.begin().await?;
            let _ = txn.rollback().await;
            match build().update(ctx.db.as_ref()).await {
                Ok(updated) => Ok(updated),
                Err(e2) => {
                    ctx.events.error(
                        "session.set_progress_failed",
                        Some(&session.session_id),
                        &[("error", &e2.to_string())],
                    );
                    Err(e2.into())
                }
            }
        }
        Err(e) => Err(e.into()),
    }
}

/// True if `task_instance` reports an abort, or a fresh read of the
/// Session row shows `status == "canceled"` or `stats.cancel_requested`.
pub async fn cancel_requested(
    ctx: &IngestContext,
    session: &picker_session::Model,
    task_instance: Option<&TaskInstance>,
) -> CoreResult<bool> {
    if let Some(instance) = task_instance {
        if ctx.task_runner.is_aborted(instance) {
            return Ok(true);
        }
    }

    let fresh = match picker_session::Entity::find_by_id(session.id).one(ctx.db.as_ref()).await {
        Ok(row) => row,
        Err(_) => {
            let txn = ctx.db.begin().await?;
            let _ = txn.rollback().await;
            picker_session::Entity::find_by_id(session.id)
                .one(ctx.db.as_ref())
                .await?
        }
    };

    let Some(fresh) = fresh else {
        return Ok(false);
    };
    if fresh.status == "canceled" {
        return Ok(true);
    }
    Ok(SessionStats::from_json(&fresh.stats).cancel_requested)
}

fn is_pending_rollback(e: &DbErr) -> bool {
    let msg = e.to_string().to_ascii_lowercase();
    msg.contains("pending rollback") || msg.contains("current transaction is aborted")
}
