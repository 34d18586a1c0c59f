//! Local-Import Use Case (spec §4.9): the top-level orchestration that
//! attaches a `PickerSession`, expands its import directory, enqueues every
//! file found as a `PickerSelection`, delegates to the Queue Processor, and
//! always finalizes the Session's status/stats before returning — even if
//! scanning or processing aborts partway through (spec's "finally" framing).

use std::path::Path;

use sea_orm::{ActiveModelTrait, ActiveValue::Set, ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter};
use uuid::Uuid;

use crate::context::IngestContext;
use crate::domain::session::{SessionStats, TaskCounts, TaskSummary};
use crate::infrastructure::database::entities::{media, picker_selection, picker_session, task_record};
use crate::infrastructure::task_runner::TaskInstance;
use crate::operations::{queue_processor, scanner::DirectoryScanner, session_service};
use crate::shared::error::CoreResult;

/// Attaches or creates the Session, runs the pipeline, and always returns
/// the Session's final row. Only a failure to create the Session row at
/// all escapes as an `Err`; every later failure is folded into the
/// Session's own `status`/`stats` instead of propagating.
pub async fn run(
    ctx: &IngestContext,
    session_id: Option<&str>,
    import_dir: &Path,
    task_instance: &TaskInstance,
) -> CoreResult<picker_session::Model> {
    let mut session = attach_or_create(ctx, session_id).await?;
    let mut scanner = DirectoryScanner::new();

    let outcome = run_inner(ctx, &mut session, import_dir, &mut scanner, task_instance).await;
    scanner.cleanup();

    match finalize(ctx, &session, outcome).await {
        Ok(updated) => Ok(updated),
        Err(e) => {
            ctx.events.error(
                "local_import.finalize_failed",
                Some(&session.session_id),
                &[("error", &e.to_string())],
            );
            Ok(session)
        }
    }
}

/// What happened before finalization, used to pick the terminal status.
enum StepOutcome {
    DirMissing(&'static str),
    NoFilesFound,
    Processed(queue_processor::QueueOutcome),
}

async fn run_inner(
    ctx: &IngestContext,
    session: &mut picker_session::Model,
    import_dir: &Path,
    scanner: &mut DirectoryScanner,
    task_instance: &TaskInstance,
) -> CoreResult<StepOutcome> {
    *session = session_service::set_progress(
        ctx,
        session,
        None,
        Some("expanding"),
        None,
        Some(SessionStats {
            total: Some(0),
            success: Some(0),
            skipped: Some(0),
            failed: Some(0),
            pending: Some(0),
            ..Default::default()
        }),
    )
    .await?;

    if !import_dir.is_dir() {
        return Ok(StepOutcome::DirMissing("import_dir_missing"));
    }
    if !ctx.config.roots.originals.is_dir() {
        return Ok(StepOutcome::DirMissing("destination_dir_missing"));
    }

    let found = scanner.scan(import_dir);
    if found.is_empty() {
        return Ok(StepOutcome::NoFilesFound);
    }

    enqueue(ctx, session, &found).await?;

    let pending_total = picker_selection::Entity::find()
        .filter(picker_selection::Column::SessionId.eq(session.id))
        .filter(picker_selection::Column::Status.is_in(["pending", "enqueued", "running"]))
        .count(ctx.db.as_ref())
        .await?;

    *session = session_service::set_progress(
        ctx,
        session,
        Some("processing"),
        Some("progress"),
        None,
        Some(SessionStats {
            total: Some(pending_total),
            ..Default::default()
        }),
    )
    .await?;

    let session_ref: &picker_session::Model = &*session;
    let cancel = move || async move {
        session_service::cancel_requested(ctx, session_ref, Some(task_instance))
            .await
            .unwrap_or(false)
    };
    let queue_outcome = queue_processor::process(ctx, session_ref, task_instance, cancel).await?;
    Ok(StepOutcome::Processed(queue_outcome))
}

/// Upserts a `PickerSelection` per scanned path, keyed by
/// `(session_id, local_file_path)`. A selection already in a terminal
/// `imported`/`dup` state is left alone; anything else is reset to
/// `enqueued` so a re-scan retries it (spec §4.9 step 4).
async fn enqueue(ctx: &IngestContext, session: &picker_session::Model, paths: &[std::path::PathBuf]) -> CoreResult<()> {
    for path in paths {
        let path_str = path.to_string_lossy().to_string();
        let filename = path.file_name().map(|f| f.to_string_lossy().to_string());

        let existing = picker_selection::Entity::find()
            .filter(picker_selection::Column::SessionId.eq(session.id))
            .filter(picker_selection::Column::LocalFilePath.eq(path_str.clone()))
            .one(ctx.db.as_ref())
            .await?;

        match existing {
            Some(row) if row.status == "imported" || row.status == "dup" => continue,
            Some(row) => {
                let mut active: picker_selection::ActiveModel = row.into();
                active.status = Set("enqueued".to_string());
                active.local_filename = Set(filename);
                active.enqueued_at = Set(Some(ctx.clock.now()));
                active.error = Set(None);
                active.update(ctx.db.as_ref()).await?;
            }
            None => {
                let active = picker_selection::ActiveModel {
                    session_id: Set(session.id),
                    google_media_id: Set(None),
                    local_file_path: Set(Some(path_str)),
                    local_filename: Set(filename),
                    status: Set("enqueued".to_string()),
                    attempts: Set(0),
                    enqueued_at: Set(Some(ctx.clock.now())),
                    ..Default::default()
                };
                active.insert(ctx.db.as_ref()).await?;
            }
        }
    }
    Ok(())
}

/// Recomputes final counts, decides the terminal Session status, builds
/// `stats.tasks`, and commits through the Session Service (spec §4.9
/// step 7). Runs regardless of how `run_inner` concluded.
async fn finalize(
    ctx: &IngestContext,
    session: &picker_session::Model,
    outcome: CoreResult<StepOutcome>,
) -> CoreResult<picker_session::Model> {
    match outcome {
        Err(e) => {
            ctx.events.error(
                "local_import.pipeline_failed",
                Some(&session.session_id),
                &[("error", &e.to_string())],
            );
            session_service::set_progress(
                ctx,
                session,
                Some("error"),
                None,
                None,
                Some(SessionStats {
                    reason: Some(e.to_string()),
                    ..Default::default()
                }),
            )
            .await
        }
        Ok(StepOutcome::DirMissing(reason)) => {
            session_service::set_progress(
                ctx,
                session,
                Some("error"),
                None,
                None,
                Some(SessionStats {
                    reason: Some(reason.to_string()),
                    ..Default::default()
                }),
            )
            .await
        }
        Ok(StepOutcome::NoFilesFound) => {
            session_service::set_progress(
                ctx,
                session,
                Some("error"),
                None,
                None,
                Some(SessionStats {
                    reason: Some("no_files_found".to_string()),
                    ..Default::default()
                }),
            )
            .await
        }
        Ok(StepOutcome::Processed(queue_outcome)) => finalize_processed(ctx, session, queue_outcome).await,
    }
}

async fn finalize_processed(
    ctx: &IngestContext,
    session: &picker_session::Model,
    queue_outcome: queue_processor::QueueOutcome,
) -> CoreResult<picker_session::Model> {
    let selections = picker_selection::Entity::find()
        .filter(picker_selection::Column::SessionId.eq(session.id))
        .all(ctx.db.as_ref())
        .await?;

    let mut success = 0u64;
    let mut skipped = 0u64;
    let mut failed = 0u64;
    let mut dup = 0u64;
    let mut pending_remaining = 0u64;
    let mut imported_media_ids = Vec::new();

    for s in &selections {
        match s.status.as_str() {
            "imported" => {
                success += 1;
                if let Some(media_id) = s.media_id {
                    imported_media_ids.push(media_id);
                }
            }
            "dup" => dup += 1,
            "skipped" => skipped += 1,
            "failed" => failed += 1,
            "pending" | "enqueued" | "running" => pending_remaining += 1,
            _ => {}
        }
    }
    let processed = success + skipped + failed + dup;

    let thumbnail_task = thumbnail_snapshot(ctx, &imported_media_ids).await?;
    let thumb_status = thumbnail_task.as_ref().map(|t| t.status.as_str()).unwrap_or("completed");

    let final_status = if queue_outcome.canceled {
        "canceled"
    } else if pending_remaining > 0 || thumb_status == "progress" {
        "processing"
    } else if failed > 0 {
        "error"
    } else if thumb_status == "error" {
        "imported"
    } else if success > 0 || skipped > 0 || dup > 0 {
        "imported"
    } else {
        "ready"
    };

    let import_task = TaskSummary {
        key: "import".to_string(),
        label: "Import files".to_string(),
        status: if pending_remaining > 0 { "progress".to_string() } else { "completed".to_string() },
        counts: TaskCounts {
            total: selections.len() as u64,
            success: Some(success + dup),
            completed: None,
            skipped,
            failed,
            pending: pending_remaining,
        },
        entries: Some(serde_json::Value::Array(queue_outcome.entries.clone())),
    };
    let mut tasks = vec![import_task];
    if let Some(thumbs) = thumbnail_task {
        tasks.push(thumbs);
    }

    session_service::set_progress(
        ctx,
        session,
        Some(final_status),
        Some("done"),
        None,
        Some(SessionStats {
            total: Some(selections.len() as u64),
            success: Some(success + dup),
            skipped: Some(skipped),
            failed: Some(failed),
            pending: Some(pending_remaining),
            tasks: Some(tasks),
            ..Default::default()
        }),
    )
    .await
}

/// Joins each imported selection's `media_id` against `Media` and the
/// latest `thumbnail.retry` task record to report an aggregate thumbnail
/// progress snapshot (spec §4.9 step 7, §4.7.3).
async fn thumbnail_snapshot(ctx: &IngestContext, media_ids: &[i64]) -> CoreResult<Option<TaskSummary>> {
    if media_ids.is_empty() {
        return Ok(None);
    }

    let mut completed = 0u64;
    let mut progress = 0u64;
    let mut error = 0u64;

    for &media_id in media_ids {
        let Some(media_row) = media::Entity::find_by_id(media_id).one(ctx.db.as_ref()).await? else {
            continue;
        };
        if media_row.thumbnail_rel_path.is_some() {
            completed += 1;
            continue;
        }

        let latest_retry = task_record::Entity::find()
            .filter(task_record::Column::TaskName.eq("thumbnail.retry"))
            .filter(task_record::Column::ObjectType.eq("media"))
            .filter(task_record::Column::ObjectId.eq(media_id.to_string()))
            .one(ctx.db.as_ref())
            .await?;

        match latest_retry.map(|r| r.status) {
            Some(status) if status == "failed" || status == "canceled" => error += 1,
            _ => progress += 1,
        }
    }

    let total = media_ids.len() as u64;
    let status = if progress > 0 {
        "progress"
    } else if error > 0 {
        "error"
    } else {
        "completed"
    };

    Ok(Some(TaskSummary {
        key: "thumbnails".to_string(),
        label: "Generate thumbnails".to_string(),
        status: status.to_string(),
        counts: TaskCounts {
            total,
            success: None,
            completed: Some(completed),
            skipped: 0,
            failed: error,
            pending: progress,
        },
        entries: None,
    }))
}

async fn attach_or_create(ctx: &IngestContext, session_id: Option<&str>) -> CoreResult<picker_session::Model> {
    if let Some(sid) = session_id {
        if let Some(existing) = picker_session::Entity::find()
            .filter(picker_session::Column::SessionId.eq(sid))
            .one(ctx.db.as_ref())
            .await?
        {
            return Ok(existing);
        }
    }

    let sid = session_id.map(str::to_string).unwrap_or_else(|| format!("local-{}", Uuid::new_v4()));
    let now = ctx.clock.now();
    let active = picker_session::ActiveModel {
        session_id: Set(sid),
        status: Set("pending".to_string()),
        account_id: Set(None),
        selected_count: Set(0),
        stats: Set(serde_json::json!({})),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    };
    Ok(active.insert(ctx.db.as_ref()).await?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn task_summary_serializes_without_success_when_absent() {
        let summary = TaskSummary {
            key: "thumbnails".to_string(),
            label: "Generate thumbnails".to_string(),
            status: "progress".to_string(),
            counts: TaskCounts {
                total: 2,
                success: None,
                completed: Some(1),
                skipped: 0,
                failed: 0,
                pending: 1,
            },
            entries: None,
        };
        let json = serde_json::to_value(&summary).unwrap();
        assert!(json["counts"].get("success").is_none());
        assert_eq!(json["counts"]["completed"], 1);
    }
}
