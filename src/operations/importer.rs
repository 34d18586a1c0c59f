//! File Importer (spec §4.5): the central single-file use case tying the
//! Analyzer, Duplicate Checker, Metadata Refresher, and post-processing
//! pipeline together. Never propagates an error to its caller: any
//! failure is caught and reported as `status = "failed"` (step 7).

use std::path::Path;

use sea_orm::{ActiveModelTrait, EntityTrait, TransactionTrait, ActiveValue::Set};
use serde::Serialize;
use uuid::Uuid;

use crate::context::IngestContext;
use crate::domain::analysis::MediaFileAnalysis;
use crate::domain::media::{is_supported_extension, MediaKind, PhotoMetadata, VideoMetadata};
use crate::infrastructure::database::entities::{exif, media, media_item};
use crate::operations::post_processing::{playback, thumbnail};
use crate::shared::error::{CoreError, CoreResult};

#[derive(Debug, Clone, Default, Serialize)]
pub struct ImportResult {
    pub success: bool,
    pub status: String,
    pub reason: String,
    pub media_id: Option<i64>,
    pub media_google_id: Option<String>,
    pub metadata_refreshed: bool,
    pub imported_filename: Option<String>,
    pub imported_path: Option<String>,
    pub relative_path: Option<String>,
    pub post_process: Option<serde_json::Value>,
    pub warnings: Vec<String>,
}

impl ImportResult {
    fn short_circuit(status: &str, reason: &str) -> Self {
        Self {
            status: status.to_string(),
            reason: reason.to_string(),
            ..Default::default()
        }
    }
}

pub async fn import_file(
    ctx: &IngestContext,
    file_path: &Path,
    session_id: Option<&str>,
    duplicate_regeneration: Option<&str>,
) -> ImportResult {
    if !file_path.exists() {
        return ImportResult::short_circuit("missing", "file does not exist");
    }
    let extension = file_path
        .extension()
        .map(|e| format!(".{}", e.to_string_lossy().to_ascii_lowercase()))
        .unwrap_or_default();
    if extension == ".zip" || !is_supported_extension(&extension) {
        return ImportResult::short_circuit("unsupported", "extension not supported");
    }
    let size = tokio::fs::metadata(file_path).await.map(|m| m.len()).unwrap_or(0);
    if size == 0 {
        return ImportResult::short_circuit("skipped", "empty file");
    }

    match try_import(ctx, file_path, session_id, duplicate_regeneration).await {
        Ok(result) => result,
        Err(e) => {
            ctx.events.error(
                "local_import.file.failed",
                session_id,
                &[("path", &file_path.display()), ("error", &e.to_string())],
            );
            ImportResult {
                status: "failed".to_string(),
                reason: e.to_string(),
                ..Default::default()
            }
        }
    }
}

async fn try_import(
    ctx: &IngestContext,
    file_path: &Path,
    session_id: Option<&str>,
    duplicate_regeneration: Option<&str>,
) -> CoreResult<ImportResult> {
    let analysis = super::analyzer::analyze(ctx, file_path, None).await?;

    let existing = super::duplicate::find_duplicate(ctx.db.as_ref(), &analysis.file_hash, analysis.file_size).await?;

    match existing {
        Some(existing) => handle_duplicate(ctx, existing, file_path, session_id, duplicate_regeneration).await,
        None => handle_new_media(ctx, file_path, &analysis, session_id).await,
    }
}

async fn handle_duplicate(
    ctx: &IngestContext,
    existing: media::Model,
    file_path: &Path,
    session_id: Option<&str>,
    duplicate_regeneration: Option<&str>,
) -> CoreResult<ImportResult> {
    let mut result = ImportResult {
        success: true,
        status: "duplicate".to_string(),
        reason: "content already archived".to_string(),
        media_id: Some(existing.id),
        media_google_id: Some(existing.google_media_id.clone()),
        imported_path: Some(existing.local_rel_path.clone()),
        ..Default::default()
    };

    let changed = super::refresher::refresh(ctx, &existing, file_path, session_id).await;
    result.metadata_refreshed = changed;
    if changed {
        result.status = "duplicate_refreshed".to_string();
    }

    if let Err(e) = tokio::fs::remove_file(file_path).await {
        ctx.events.warn(
            "local_import.file.duplicate_source_remove_failed",
            session_id,
            &[("path", &file_path.display()), ("error", &e.to_string())],
        );
        result.warnings.push(format!("could not remove source file: {e}"));
    }

    if changed && existing.is_video && duplicate_regeneration != Some("skip") {
        let thumb_outcome = thumbnail::generate(ctx, existing.id, true).await?;
        result.post_process = Some(serde_json::json!({ "thumbnails": thumb_outcome }));
    }

    Ok(result)
}

async fn handle_new_media(
    ctx: &IngestContext,
    file_path: &Path,
    analysis: &MediaFileAnalysis,
    session_id: Option<&str>,
) -> CoreResult<ImportResult> {
    let dest_abs = ctx.config.roots.originals.join(&analysis.relative_path);
    if let Some(parent) = dest_abs.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::copy(file_path, &dest_abs).await?;

    match insert_and_postprocess(ctx, analysis, session_id).await {
        Ok(mut result) => {
            if let Err(e) = tokio::fs::remove_file(file_path).await {
                result.warnings.push(format!("could not remove source file: {e}"));
            }
            Ok(result)
        }
        Err(e) => {
            let _ = tokio::fs::remove_file(&dest_abs).await;
            Err(e)
        }
    }
}

/// Creates the `MediaItem`/`Media`/`Exif` rows in one transaction, then
/// runs post-processing. For videos, an unready playback with no
/// recoverable note rolls back the just-inserted rows and fails the
/// branch (spec §4.5 step 5).
async fn insert_and_postprocess(
    ctx: &IngestContext,
    analysis: &MediaFileAnalysis,
    session_id: Option<&str>,
) -> CoreResult<ImportResult> {
    let google_media_id = format!("local-{}", Uuid::new_v4());
    let now = ctx.clock.now();

    let kind = if analysis.is_video {
        MediaKind::Video(VideoMetadata {
            fps: analysis.video_metadata.get("fps").and_then(|v| v.as_f64()),
            processing_status: analysis
                .video_metadata
                .get("processing_status")
                .and_then(|v| v.as_str())
                .unwrap_or("probed")
                .to_string(),
        })
    } else {
        MediaKind::Photo(PhotoMetadata {
            camera_make: analysis.camera_make.clone(),
            camera_model: analysis.camera_model.clone(),
            ..Default::default()
        })
    };

    let txn = ctx.db.begin().await?;

    let item_active = media_item::ActiveModel {
        id: Set(google_media_id.clone()),
        google_media_id: Set(google_media_id.clone()),
        kind: Set(kind.type_str().to_string()),
        mime_type: Set(analysis.mime_type.clone()),
        filename: Set(analysis.destination_filename.clone()),
        width: Set(analysis.width.unwrap_or(0) as i32),
        height: Set(analysis.height.unwrap_or(0) as i32),
        photo_metadata: Set((!analysis.is_video)
            .then(|| serde_json::to_value(&analysis.exif_data).unwrap_or_default())),
        video_metadata: Set(analysis
            .is_video
            .then(|| serde_json::to_value(&analysis.video_metadata).unwrap_or_default())),
    };
    item_active.insert(&txn).await?;

    let media_active = media::ActiveModel {
        google_media_id: Set(google_media_id.clone()),
        account_id: Set(None),
        local_rel_path: Set(analysis.relative_path.clone()),
        filename: Set(analysis.destination_filename.clone()),
        hash_sha256: Set(analysis.file_hash.clone()),
        bytes: Set(analysis.file_size as i64),
        mime_type: Set(analysis.mime_type.clone()),
        width: Set(analysis.width.unwrap_or(0) as i32),
        height: Set(analysis.height.unwrap_or(0) as i32),
        duration_ms: Set(analysis.duration_ms),
        shot_at: Set(analysis.shot_at),
        imported_at: Set(now),
        orientation: Set(analysis.orientation),
        is_video: Set(analysis.is_video),
        is_deleted: Set(false),
        has_playback: Set(false),
        thumbnail_rel_path: Set(None),
        camera_make: Set(analysis.camera_make.clone()),
        camera_model: Set(analysis.camera_model.clone()),
        ..Default::default()
    };
    let media_row = media_active.insert(&txn).await?;

    if !analysis.exif_data.is_empty() {
        let exif_active = exif::ActiveModel {
            media_id: Set(media_row.id),
            raw: Set(Some(serde_json::to_value(&analysis.exif_data).unwrap_or_default())),
            parsed: Set(None),
            ..Default::default()
        };
        exif_active.insert(&txn).await?;
    }

    txn.commit().await?;

    let mut result = ImportResult {
        success: true,
        status: "success".to_string(),
        reason: "imported".to_string(),
        media_id: Some(media_row.id),
        media_google_id: Some(google_media_id),
        imported_filename: Some(analysis.destination_filename.clone()),
        imported_path: Some(analysis.relative_path.clone()),
        relative_path: Some(analysis.relative_path.clone()),
        ..Default::default()
    };

    let outcome = playback::prepare(ctx, &media_row, false).await?;
    result.post_process = Some(serde_json::to_value(&outcome)?);

    if analysis.is_video {
        let ready = outcome.ok
            && matches!(outcome.note.as_deref(), Some("transcoded") | Some("passthrough") | Some("already_done"));
        let recoverable_note = outcome
            .note
            .as_deref()
            .map(|note| note.starts_with("ffmpeg_") || note == "playback_skipped")
            .unwrap_or(false);

        if !ready {
            if session_id.is_some() && recoverable_note {
                result
                    .warnings
                    .push(format!("playback_skipped:{}", outcome.note.unwrap_or_default()));
            } else {
                rollback_new_media(ctx, &media_row).await?;
                return Err(CoreError::InvalidState(format!(
                    "playback not ready: {}",
                    outcome.note.unwrap_or_else(|| "unknown".to_string())
                )));
            }
        }
    }

    Ok(result)
}

/// Compensating delete for a `PlaybackError` abort: the Media row was
/// already committed so post-processing could see it, so undoing it here
/// is an explicit delete rather than a transaction rollback. Cascades
/// remove the paired `Exif`/`MediaPlayback` rows; `MediaItem` has no FK
/// and is deleted separately.
async fn rollback_new_media(ctx: &IngestContext, media_row: &media::Model) -> CoreResult<()> {
    media_item::Entity::delete_by_id(media_row.google_media_id.clone())
        .exec(ctx.db.as_ref())
        .await?;
    media::Entity::delete_by_id(media_row.id).exec(ctx.db.as_ref()).await?;
    Ok(())
}
