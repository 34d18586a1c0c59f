//! Playback preparation (spec §4.7.1): the entry point post-processing
//! calls for every imported/duplicate-refreshed `Media`. For photos this
//! only runs the Thumbnail Worker; for videos it first ensures a
//! `std1080p` `MediaPlayback` exists and is `done`.

use sea_orm::{ActiveModelTrait, ActiveValue::Set, ColumnTrait, EntityTrait, QueryFilter};
use serde::Serialize;

use super::retry_scheduler::{self, ScheduleOutcome};
use super::thumbnail::{self, ThumbnailOutcome, PLAYBACK_NOT_READY_NOTE};
use crate::context::IngestContext;
use crate::infrastructure::database::entities::{media, media_playback};
use crate::operations::transcode::worker as transcode_worker;
use crate::shared::error::CoreResult;
use crate::shared::paths;

#[derive(Debug, Clone, Serialize)]
pub struct PlaybackOutcome {
    pub ok: bool,
    pub note: Option<String>,
    pub error: Option<String>,
    pub thumbnails: Option<ThumbnailOutcome>,
    pub retry: Option<ScheduleOutcome>,
}

pub async fn prepare(
    ctx: &IngestContext,
    media_row: &media::Model,
    force_regenerate: bool,
) -> CoreResult<PlaybackOutcome> {
    if !media_row.is_video {
        let (thumbnails, retry) = run_thumbnails_with_retry(ctx, media_row.id, false).await?;
        return Ok(PlaybackOutcome {
            ok: true,
            note: None,
            error: None,
            thumbnails: Some(thumbnails),
            retry,
        });
    }

    let existing = media_playback::Entity::find()
        .filter(media_playback::Column::MediaId.eq(media_row.id))
        .filter(media_playback::Column::Preset.eq("std1080p"))
        .one(ctx.db.as_ref())
        .await?;

    let playback_row = match existing {
        Some(row) => row,
        None => {
            let now = ctx.clock.now();
            let rel_path = paths::normalize_slashes(&paths::replace_suffix(&media_row.local_rel_path, "mp4"));
            let active = media_playback::ActiveModel {
                media_id: Set(media_row.id),
                preset: Set("std1080p".to_string()),
                rel_path: Set(Some(rel_path)),
                poster_rel_path: Set(None),
                width: Set(0),
                height: Set(0),
                video_codec: Set(None),
                audio_codec: Set(None),
                bitrate: Set(None),
                duration_ms: Set(0),
                status: Set("pending".to_string()),
                error_msg: Set(None),
                created_at: Set(now),
                updated_at: Set(now),
                ..Default::default()
            };
            active.insert(ctx.db.as_ref()).await?
        }
    };

    let already_done = playback_row.status == "done"
        && playback_row
            .rel_path
            .as_ref()
            .map(|p| ctx.config.roots.playback.join(p).exists())
            .unwrap_or(false);

    if already_done && !force_regenerate {
        let thumbnails = if media_row.thumbnail_rel_path.is_none() && playback_row.poster_rel_path.is_some() {
            let (outcome, retry) = run_thumbnails_with_retry(ctx, media_row.id, false).await?;
            return Ok(PlaybackOutcome {
                ok: true,
                note: Some("already_done".to_string()),
                error: None,
                thumbnails: Some(outcome),
                retry,
            });
        } else {
            None
        };
        return Ok(PlaybackOutcome {
            ok: true,
            note: Some("already_done".to_string()),
            error: None,
            thumbnails,
            retry: None,
        });
    }

    let worker_outcome = transcode_worker::run(ctx, playback_row.id).await?;
    if !worker_outcome.ok {
        return Ok(PlaybackOutcome {
            ok: false,
            note: Some(worker_outcome.note),
            error: worker_outcome.error,
            thumbnails: None,
            retry: None,
        });
    }

    let (thumbnails, retry) = run_thumbnails_with_retry(ctx, media_row.id, force_regenerate).await?;
    Ok(PlaybackOutcome {
        ok: true,
        note: Some(worker_outcome.note),
        error: None,
        thumbnails: Some(thumbnails),
        retry,
    })
}

/// Runs the Thumbnail Worker and, if it reports the "playback not ready"
/// sentinel, consults the Retry Scheduler (spec §4.7.3).
async fn run_thumbnails_with_retry(
    ctx: &IngestContext,
    media_id: i64,
    force: bool,
) -> CoreResult<(ThumbnailOutcome, Option<ScheduleOutcome>)> {
    let outcome = thumbnail::generate(ctx, media_id, force).await?;
    if outcome.notes.as_deref() == Some(PLAYBACK_NOT_READY_NOTE) {
        let blockers = outcome
            .retry_blockers
            .clone()
            .unwrap_or_else(|| serde_json::json!({}));
        let retry = retry_scheduler::schedule(ctx, media_id, force, blockers).await?;
        Ok((outcome, Some(retry)))
    } else {
        Ok((outcome, None))
    }
}

/// Reads back a `Media` row's thumbnail-backfill-relevant fields without
/// requiring callers to hold a full `media::Model`.
pub async fn reload_media(ctx: &IngestContext, media_id: i64) -> CoreResult<Option<media::Model>> {
    Ok(media::Entity::find_by_id(media_id).one(ctx.db.as_ref()).await?)
}
