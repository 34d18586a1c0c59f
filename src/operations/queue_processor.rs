//! Queue Processor (spec §4.6): iterates a Session's non-terminal
//! selections in ascending id order, invoking the File Importer per file
//! and reporting progress. No parallelism within a Session (spec §5).

use sea_orm::{ActiveModelTrait, ActiveValue::Set, ColumnTrait, EntityTrait, Order, QueryFilter, QueryOrder};
use serde::Serialize;
use std::future::Future;

use crate::context::IngestContext;
use crate::infrastructure::database::entities::{picker_selection, picker_session};
use crate::infrastructure::task_runner::{ProgressReport, TaskInstance};
use crate::operations::importer;
use crate::shared::error::CoreResult;

#[derive(Debug, Clone, Default, Serialize)]
pub struct QueueOutcome {
    pub total: u64,
    pub success: u64,
    pub dup: u64,
    pub skipped: u64,
    pub failed: u64,
    pub canceled: bool,
    pub entries: Vec<serde_json::Value>,
}

/// Processes every `{pending, enqueued, running}` selection of `session`.
/// `cancel_requested` is polled before each iteration; when it resolves
/// `true` the Session is marked `canceled` and processing stops.
pub async fn process<F, Fut>(
    ctx: &IngestContext,
    session: &picker_session::Model,
    task_instance: &TaskInstance,
    mut cancel_requested: F,
) -> CoreResult<QueueOutcome>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    let selections = picker_selection::Entity::find()
        .filter(picker_selection::Column::SessionId.eq(session.id))
        .filter(picker_selection::Column::Status.is_in(["pending", "enqueued", "running"]))
        .order_by(picker_selection::Column::Id, Order::Asc)
        .all(ctx.db.as_ref())
        .await?;

    let total = selections.len() as u64;
    let mut outcome = QueueOutcome {
        total,
        ..Default::default()
    };

    for (idx, selection) in selections.into_iter().enumerate() {
        if cancel_requested().await {
            let mut active: picker_session::ActiveModel = session.clone().into();
            active.status = Set("canceled".to_string());
            active.updated_at = Set(ctx.clock.now());
            active.update(ctx.db.as_ref()).await?;
            outcome.canceled = true;
            break;
        }

        let now = ctx.clock.now();
        let mut running: picker_selection::ActiveModel = selection.clone().into();
        running.status = Set("running".to_string());
        running.started_at = Set(Some(now));
        if let Err(e) = running.update(ctx.db.as_ref()).await {
            ctx.events.warn(
                "local_import.selection.running_commit_failed",
                Some(&session.session_id),
                &[("selection_id", &selection.id), ("error", &e.to_string())],
            );
        }

        let Some(path) = selection.local_file_path.as_deref() else {
            mark_terminal(ctx, &selection, "skipped", None, None, None, "missing local_file_path").await?;
            outcome.skipped += 1;
            report(ctx, task_instance, idx as u64 + 1, total, "skipped").await;
            continue;
        };

        let result = importer::import_file(ctx, std::path::Path::new(path), Some(&session.session_id), None).await;

        let (status, error) = match result.status.as_str() {
            "success" => ("imported", None),
            "duplicate" | "duplicate_refreshed" => ("dup", None),
            "missing" | "unsupported" | "skipped" => ("skipped", None),
            _ => ("failed", Some(result.reason.clone())),
        };

        match status {
            "imported" => outcome.success += 1,
            "dup" => outcome.dup += 1,
            "skipped" => outcome.skipped += 1,
            _ => outcome.failed += 1,
        }

        mark_terminal(
            ctx,
            &selection,
            status,
            result.media_id,
            result.media_google_id.as_deref(),
            error.as_deref(),
            &result.reason,
        )
        .await?;

        outcome.entries.push(serde_json::json!({
            "file": path,
            "status": status,
            "reason": result.reason,
            "media_id": result.media_id,
            "thumbnails": result.post_process,
        }));

        report(ctx, task_instance, idx as u64 + 1, total, status).await;
    }

    Ok(outcome)
}

async fn mark_terminal(
    ctx: &IngestContext,
    selection: &picker_selection::Model,
    status: &str,
    media_id: Option<i64>,
    google_media_id: Option<&str>,
    error: Option<&str>,
    _reason: &str,
) -> CoreResult<()> {
    let mut active: picker_selection::ActiveModel = selection.clone().into();
    active.status = Set(status.to_string());
    active.finished_at = Set(Some(ctx.clock.now()));
    active.attempts = Set(selection.attempts + 1);
    if let Some(media_id) = media_id {
        active.media_id = Set(Some(media_id));
    }
    if let Some(google_media_id) = google_media_id {
        active.google_media_id = Set(Some(google_media_id.to_string()));
    }
    active.error = Set(error.map(str::to_string));
    active.update(ctx.db.as_ref()).await?;
    Ok(())
}

async fn report(ctx: &IngestContext, task_instance: &TaskInstance, current: u64, total: u64, message: &str) {
    let percent = if total == 0 { 100.0 } else { (current as f32 / total as f32) * 100.0 };
    ctx.task_runner
        .report_progress(
            task_instance,
            ProgressReport {
                current,
                total,
                percent,
                status: "processing".to_string(),
                message: message.to_string(),
            },
        )
        .await;
}
