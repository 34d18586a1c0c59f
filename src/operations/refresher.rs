//! Metadata Refresher (spec §4.3): re-applies analysis to an existing
//! `Media` on duplicate re-import, optionally relocating the original
//! and its playback derivatives to the canonical path for the refreshed
//! `shot_at`.

use std::path::Path;

use sea_orm::{ActiveModelTrait, ActiveValue::Set, ColumnTrait, EntityTrait, QueryFilter, TransactionTrait};

use crate::context::IngestContext;
use crate::domain::analysis::MediaFileAnalysis;
use crate::infrastructure::database::entities::{exif, media, media_item, media_playback};
use crate::shared::paths;

/// Returns `true` iff the refresh actually committed changes. Never
/// propagates an error to the caller: failures are logged as
/// `duplicate_refresh_failed` and reported as "no refresh happened"
/// (spec §4.3: "never throws out of the importer").
pub async fn refresh(
    ctx: &IngestContext,
    existing: &media::Model,
    inbound_path: &Path,
    session_id: Option<&str>,
) -> bool {
    match try_refresh(ctx, existing, inbound_path).await {
        Ok(changed) => changed,
        Err(e) => {
            ctx.events.warn(
                "local_import.file.duplicate_refresh_failed",
                session_id,
                &[("media_id", &existing.id), ("error", &e.to_string())],
            );
            false
        }
    }
}

async fn try_refresh(
    ctx: &IngestContext,
    existing: &media::Model,
    inbound_path: &Path,
) -> Result<bool, crate::shared::error::CoreError> {
    let archive_path = ctx.config.roots.originals.join(&existing.local_rel_path);
    let source_for_analysis = if archive_path.exists() {
        archive_path.as_path()
    } else {
        inbound_path
    };

    let analysis = super::analyzer::analyze(
        ctx,
        source_for_analysis,
        Some(existing.local_rel_path.as_str()),
    )
    .await?;

    let new_relative_path = if analysis.relative_path == existing.local_rel_path {
        existing.local_rel_path.clone()
    } else {
        relocate_original(ctx, &existing.local_rel_path, &analysis)?
    };

    rebase_playback(ctx, existing.id, &existing.local_rel_path, &new_relative_path).await?;

    let txn = ctx.db.begin().await?;

    let mut active: media::ActiveModel = existing.clone().into();
    active.local_rel_path = Set(new_relative_path.clone());
    active.filename = Set(analysis.destination_filename.clone());
    active.hash_sha256 = Set(analysis.file_hash.clone());
    active.bytes = Set(analysis.file_size as i64);
    active.mime_type = Set(analysis.mime_type.clone());
    active.width = Set(analysis.width.unwrap_or(existing.width as u32) as i32);
    active.height = Set(analysis.height.unwrap_or(existing.height as u32) as i32);
    active.duration_ms = Set(analysis.duration_ms.or(existing.duration_ms));
    active.shot_at = Set(analysis.shot_at.or(existing.shot_at));
    active.orientation = Set(analysis.orientation.or(existing.orientation));
    active.camera_make = Set(analysis.camera_make.clone().or_else(|| existing.camera_make.clone()));
    active.camera_model = Set(analysis.camera_model.clone().or_else(|| existing.camera_model.clone()));
    active.update(&txn).await?;

    let existing_exif = exif::Entity::find()
        .filter(exif::Column::MediaId.eq(existing.id))
        .one(&txn)
        .await?;
    let raw = serde_json::to_value(&analysis.exif_data).unwrap_or(serde_json::Value::Null);
    match existing_exif {
        Some(row) => {
            let mut active_exif: exif::ActiveModel = row.into();
            active_exif.raw = Set(Some(raw));
            active_exif.update(&txn).await?;
        }
        None => {
            let active_exif = exif::ActiveModel {
                media_id: Set(existing.id),
                raw: Set(Some(raw)),
                parsed: Set(None),
                ..Default::default()
            };
            active_exif.insert(&txn).await?;
        }
    }

    if let Some(item) = media_item::Entity::find()
        .filter(media_item::Column::GoogleMediaId.eq(&existing.google_media_id))
        .one(&txn)
        .await?
    {
        let mut active_item: media_item::ActiveModel = item.into();
        active_item.width = Set(analysis.width.unwrap_or_default() as i32);
        active_item.height = Set(analysis.height.unwrap_or_default() as i32);
        if analysis.is_video {
            active_item.video_metadata = Set(Some(serde_json::to_value(&analysis.video_metadata).unwrap_or_default()));
        } else {
            active_item.photo_metadata = Set(Some(serde_json::to_value(&analysis.exif_data).unwrap_or_default()));
        }
        active_item.update(&txn).await?;
    }

    txn.commit().await?;
    Ok(true)
}

/// Moves (or copies+removes) the original file into its new partition,
/// returning the new relative path (spec §4.3, §8 P5).
fn relocate_original(
    ctx: &IngestContext,
    old_relative_path: &str,
    analysis: &MediaFileAnalysis,
) -> Result<String, crate::shared::error::CoreError> {
    let old_abs = ctx.config.roots.originals.join(old_relative_path);
    let new_relative_path = analysis.relative_path.clone();
    let new_abs = ctx.config.roots.originals.join(&new_relative_path);

    if new_abs.exists() && new_abs != old_abs {
        ctx.events.warn(
            "local_import.file.duplicate_refresh_collision",
            None,
            &[("destination", &new_abs.display())],
        );
        return Ok(old_relative_path.to_string());
    }

    if let Some(parent) = new_abs.parent() {
        std::fs::create_dir_all(parent)?;
    }
    if old_abs.exists() && old_abs != new_abs {
        if std::fs::rename(&old_abs, &new_abs).is_err() {
            std::fs::copy(&old_abs, &new_abs)?;
            std::fs::remove_file(&old_abs)?;
        }
    }
    Ok(new_relative_path)
}

/// Rebases every `MediaPlayback` row's `rel_path`/`poster_rel_path` under
/// the new partition, physically moving files in the playback store
/// (spec §4.3, §8 P5d).
async fn rebase_playback(
    ctx: &IngestContext,
    media_id: i64,
    old_relative_path: &str,
    new_relative_path: &str,
) -> Result<(), crate::shared::error::CoreError> {
    if old_relative_path == new_relative_path {
        return Ok(());
    }

    let rows = media_playback::Entity::find()
        .filter(media_playback::Column::MediaId.eq(media_id))
        .all(ctx.db.as_ref())
        .await?;

    for row in rows {
        let mut active: media_playback::ActiveModel = row.clone().into();
        let mut changed = false;

        if let Some(rel_path) = &row.rel_path {
            let new_sibling = paths::normalize_slashes(&paths::rebase_sibling(rel_path, new_relative_path));
            move_if_exists(&ctx.config.roots.playback, rel_path, &new_sibling)?;
            active.rel_path = Set(Some(new_sibling));
            changed = true;
        }
        if let Some(poster) = &row.poster_rel_path {
            let new_sibling = paths::normalize_slashes(&paths::rebase_sibling(poster, new_relative_path));
            move_if_exists(&ctx.config.roots.playback, poster, &new_sibling)?;
            active.poster_rel_path = Set(Some(new_sibling));
            changed = true;
        }

        if changed {
            active.update(ctx.db.as_ref()).await?;
        }
    }
    Ok(())
}

fn move_if_exists(root: &Path, old_relative: &str, new_relative: &str) -> std::io::Result<()> {
    let old_abs = root.join(old_relative);
    let new_abs = root.join(new_relative);
    if !old_abs.exists() || old_abs == new_abs {
        return Ok(());
    }
    if let Some(parent) = new_abs.parent() {
        std::fs::create_dir_all(parent)?;
    }
    if std::fs::rename(&old_abs, &new_abs).is_err() {
        std::fs::copy(&old_abs, &new_abs)?;
        std::fs::remove_file(&old_abs)?;
    }
    Ok(())
}
