//! Thumbnail Worker (spec §4.7.2). Grounded on
//! `core-new/src/operations/media_processing/thumbnail/generator.rs`'s
//! use of the `image` crate for resize/format decisions, adapted to the
//! fixed size set and path scheme this spec requires.

use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use image::imageops::FilterType;
use image::ImageFormat;
use sea_orm::{ActiveModelTrait, ActiveValue::Set, ColumnTrait, EntityTrait, QueryFilter};
use serde::Serialize;

use crate::context::IngestContext;
use crate::domain::media::THUMBNAIL_SIZES;
use crate::infrastructure::database::entities::{media, media_playback};
use crate::shared::error::CoreResult;
use crate::shared::paths;

/// Sentinel returned when a video has no `done` playback row and no frame
/// extractor could produce one (spec §4.7.2, §4.7.3, §9).
pub const PLAYBACK_NOT_READY_NOTE: &str = "playback not ready";

#[derive(Debug, Clone, Serialize)]
pub struct ThumbnailOutcome {
    pub ok: bool,
    pub generated: Vec<u32>,
    pub skipped: Vec<u32>,
    pub notes: Option<String>,
    pub paths: HashMap<u32, String>,
    pub retry_blockers: Option<serde_json::Value>,
}

impl ThumbnailOutcome {
    fn no_op_skip_all() -> Self {
        Self {
            ok: true,
            generated: Vec::new(),
            skipped: THUMBNAIL_SIZES.to_vec(),
            notes: None,
            paths: HashMap::new(),
            retry_blockers: None,
        }
    }
}

/// Generates thumbnails at the fixed size set for `media_id`. Idempotent:
/// re-running with `force = false` only fills in gaps (spec §8 P3).
pub async fn generate(ctx: &IngestContext, media_id: i64, force: bool) -> CoreResult<ThumbnailOutcome> {
    let Some(row) = media::Entity::find_by_id(media_id).one(ctx.db.as_ref()).await? else {
        return Ok(ThumbnailOutcome::no_op_skip_all());
    };
    if row.is_deleted {
        return Ok(ThumbnailOutcome::no_op_skip_all());
    }

    let source = match resolve_source(ctx, &row).await? {
        Some(path) => path,
        None => {
            return Ok(ThumbnailOutcome {
                ok: true,
                generated: Vec::new(),
                skipped: Vec::new(),
                notes: Some(PLAYBACK_NOT_READY_NOTE.to_string()),
                paths: HashMap::new(),
                retry_blockers: Some(serde_json::json!({"reason": "completed playback missing"})),
            });
        }
    };

    let decoded = image::open(&source).ok();
    let Some(mut img) = decoded else {
        return Ok(ThumbnailOutcome {
            ok: false,
            generated: Vec::new(),
            skipped: Vec::new(),
            notes: Some("decode_failed".to_string()),
            paths: HashMap::new(),
            retry_blockers: None,
        });
    };

    if !row.is_video {
        img = apply_orientation(img, row.orientation);
    }
    let has_alpha = img.color().has_alpha();
    let (format, ext) = if has_alpha {
        (ImageFormat::Png, "png")
    } else {
        (ImageFormat::Jpeg, "jpg")
    };

    let long_side = img.width().max(img.height());
    let base_relative = replace_thumbnail_suffix(&row.local_rel_path, ext);

    let mut generated = Vec::new();
    let mut skipped = Vec::new();
    let mut paths_out = HashMap::new();
    let mut new_thumb_rel_path = None;

    for &size in THUMBNAIL_SIZES.iter() {
        let dest_rel = format!("{size}/{base_relative}");
        let dest_abs = ctx.config.roots.thumbnails.join(&dest_rel);

        if dest_abs.exists() && !force {
            skipped.push(size);
            paths_out.insert(size, dest_rel);
            continue;
        }
        if long_side < size {
            skipped.push(size);
            continue;
        }

        let resized = img.resize(size, size, FilterType::Lanczos3);
        if let Some(parent) = dest_abs.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let tmp_path = dest_abs.with_extension(format!("{ext}.tmp"));
        resized.save_with_format(&tmp_path, format)?;
        std::fs::rename(&tmp_path, &dest_abs)?;

        generated.push(size);
        paths_out.insert(size, dest_rel.clone());
        new_thumb_rel_path = Some(dest_rel);
    }

    if let Some(new_path) = new_thumb_rel_path {
        if row.thumbnail_rel_path.as_deref() != Some(new_path.as_str()) {
            let mut active: media::ActiveModel = row.clone().into();
            active.thumbnail_rel_path = Set(Some(new_path));
            active.update(ctx.db.as_ref()).await?;
        }
    }

    Ok(ThumbnailOutcome {
        ok: true,
        generated,
        skipped,
        notes: None,
        paths: paths_out,
        retry_blockers: None,
    })
}

async fn resolve_source(ctx: &IngestContext, row: &media::Model) -> CoreResult<Option<PathBuf>> {
    if !row.is_video {
        return Ok(Some(ctx.config.roots.originals.join(&row.local_rel_path)));
    }

    let playback = media_playback::Entity::find()
        .filter(media_playback::Column::MediaId.eq(row.id))
        .filter(media_playback::Column::Preset.eq("std1080p"))
        .one(ctx.db.as_ref())
        .await?;

    let Some(playback) = playback else {
        return Ok(None);
    };
    if playback.status != "done" {
        return Ok(None);
    }

    if let Some(poster) = &playback.poster_rel_path {
        let poster_abs = ctx.config.roots.playback.join(poster);
        if poster_abs.exists() {
            return Ok(Some(poster_abs));
        }
    }

    let Some(rel_path) = &playback.rel_path else {
        return Ok(None);
    };
    let video_abs = ctx.config.roots.playback.join(rel_path);
    if !video_abs.exists() {
        return Ok(None);
    }

    let frame_path = ctx.config.roots.temp.join(format!("thumb-frame-{}.jpg", row.id));
    match ctx
        .transcoder
        .extract_frame(&video_abs, &frame_path, Duration::from_secs(1))
        .await
    {
        Ok(()) => Ok(Some(frame_path)),
        Err(_) => Ok(None),
    }
}

fn replace_thumbnail_suffix(local_rel_path: &str, ext: &str) -> String {
    paths::normalize_slashes(&paths::replace_suffix(local_rel_path, ext))
}

/// EXIF orientation values 1-8 (spec §4.7.2: "honor EXIF orientation via
/// explicit transpose").
fn apply_orientation(img: image::DynamicImage, orientation: Option<i32>) -> image::DynamicImage {
    match orientation {
        Some(2) => img.fliph(),
        Some(3) => img.rotate180(),
        Some(4) => img.flipv(),
        Some(5) => img.rotate90().fliph(),
        Some(6) => img.rotate90(),
        Some(7) => img.rotate270().fliph(),
        Some(8) => img.rotate270(),
        _ => img,
    }
}
