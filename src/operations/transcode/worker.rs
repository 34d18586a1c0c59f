//! Transcode Worker (spec §4.8 steps 1-8). The worker's move from
//! `pending` to `processing` is the concurrency gate that prevents two
//! scanner/worker invocations from both advancing the same row to `done`
//! (spec §5, §8 P6).

use std::time::Duration;

use sea_orm::{ActiveModelTrait, ActiveValue::Set, EntityTrait};
use serde::Serialize;

use crate::context::IngestContext;
use crate::infrastructure::database::entities::{media, media_playback};
use crate::infrastructure::transcoder::TranscodeError;
use crate::shared::error::CoreResult;
use crate::shared::paths;

/// Offset into the transcoded output used to extract the poster frame
/// (spec §4.8 step 7: "at a known offset").
const POSTER_OFFSET: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, Serialize)]
pub struct WorkerOutcome {
    pub ok: bool,
    pub note: String,
    pub error: Option<String>,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub duration_ms: Option<i64>,
}

pub async fn run(ctx: &IngestContext, media_playback_id: i64) -> CoreResult<WorkerOutcome> {
    let Some(playback) = media_playback::Entity::find_by_id(media_playback_id)
        .one(ctx.db.as_ref())
        .await?
    else {
        return Ok(not_found());
    };

    if playback.status == "done" {
        return Ok(WorkerOutcome {
            ok: true,
            note: "already_done".to_string(),
            error: None,
            width: Some(playback.width as u32),
            height: Some(playback.height as u32),
            duration_ms: Some(playback.duration_ms),
        });
    }
    if playback.status == "processing" {
        return Ok(WorkerOutcome {
            ok: false,
            note: "already_running".to_string(),
            error: None,
            width: None,
            height: None,
            duration_ms: None,
        });
    }

    let Some(media_row) = media::Entity::find_by_id(playback.media_id)
        .one(ctx.db.as_ref())
        .await?
    else {
        return Ok(not_found());
    };
    let source = ctx.config.roots.originals.join(&media_row.local_rel_path);
    if !source.exists() {
        mark_error(ctx, &playback, "missing_input").await?;
        return Ok(WorkerOutcome {
            ok: false,
            note: "missing_input".to_string(),
            error: Some("missing_input".to_string()),
            width: None,
            height: None,
            duration_ms: None,
        });
    }

    mark_processing(ctx, &playback).await?;

    let rel_path = playback
        .rel_path
        .clone()
        .unwrap_or_else(|| paths::replace_suffix(&media_row.local_rel_path, "mp4"));
    let final_abs = ctx.config.roots.playback.join(&rel_path);
    let temp_abs = ctx
        .config
        .roots
        .temp
        .join(format!("transcode-{media_playback_id}.mp4"));

    if is_passthrough_candidate(ctx, &source).await {
        if let Some(parent) = final_abs.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::copy(&source, &final_abs).await?;
        let probe = ctx.transcoder.probe(&final_abs).await?;
        return finish_success(ctx, &playback, &rel_path, probe, "passthrough").await;
    }

    match ctx
        .transcoder
        .transcode(&source, &temp_abs, &ctx.config.transcode)
        .await
    {
        Ok(outcome) => {
            if let Some(parent) = final_abs.parent() {
                tokio::fs::create_dir_all(parent).await?;
            }
            tokio::fs::rename(&temp_abs, &final_abs).await.or_else(|_| {
                std::fs::copy(&temp_abs, &final_abs).map(|_| ())
            })?;

            let poster_rel = paths::replace_suffix(&rel_path, "jpg");
            let poster_abs = ctx.config.roots.playback.join(&poster_rel);
            let poster_ok = ctx
                .transcoder
                .extract_frame(&final_abs, &poster_abs, POSTER_OFFSET)
                .await
                .is_ok();

            let mut active: media_playback::ActiveModel = playback.clone().into();
            active.rel_path = Set(Some(paths::normalize_slashes(&rel_path)));
            active.poster_rel_path = Set(if poster_ok {
                Some(paths::normalize_slashes(&poster_rel))
            } else {
                None
            });
            active.width = Set(outcome.width as i32);
            active.height = Set(outcome.height as i32);
            active.video_codec = Set(Some(outcome.video_codec.clone()));
            active.audio_codec = Set(Some(outcome.audio_codec.clone()));
            active.bitrate = Set(Some(outcome.bitrate));
            active.duration_ms = Set(outcome.duration_ms);
            active.status = Set("done".to_string());
            active.error_msg = Set(None);
            active.updated_at = Set(ctx.clock.now());
            active.update(ctx.db.as_ref()).await?;

            let mut media_active: media::ActiveModel = media_row.into();
            media_active.has_playback = Set(true);
            media_active.update(ctx.db.as_ref()).await?;

            Ok(WorkerOutcome {
                ok: true,
                note: "transcoded".to_string(),
                error: None,
                width: Some(outcome.width),
                height: Some(outcome.height),
                duration_ms: Some(outcome.duration_ms),
            })
        }
        Err(e) => {
            let note = e.note();
            let error_msg = match &e {
                TranscodeError::MissingStream => "missing_stream".to_string(),
                other => other.to_string(),
            };
            mark_error(ctx, &playback, &error_msg).await?;
            let _ = tokio::fs::remove_file(&temp_abs).await;
            Ok(WorkerOutcome {
                ok: false,
                note: note.to_string(),
                error: Some(error_msg),
                width: None,
                height: None,
                duration_ms: None,
            })
        }
    }
}

fn not_found() -> WorkerOutcome {
    WorkerOutcome {
        ok: false,
        note: "not_found".to_string(),
        error: None,
        width: None,
        height: None,
        duration_ms: None,
    }
}

/// A passthrough candidate is an MP4 already at or under the target
/// resolution with both streams present (spec §4.8 step 4).
async fn is_passthrough_candidate(ctx: &IngestContext, source: &std::path::Path) -> bool {
    let is_mp4 = source
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.eq_ignore_ascii_case("mp4"))
        .unwrap_or(false);
    if !is_mp4 {
        return false;
    }
    match ctx.transcoder.probe(source).await {
        Ok(probe) => {
            probe.has_video_stream
                && probe.has_audio_stream
                && probe.width.unwrap_or(u32::MAX) <= ctx.config.transcode.max_width
                && probe.height.unwrap_or(u32::MAX) <= ctx.config.transcode.max_height
        }
        Err(_) => false,
    }
}

async fn finish_success(
    ctx: &IngestContext,
    playback: &media_playback::Model,
    rel_path: &str,
    probe: crate::infrastructure::transcoder::MediaProbe,
    note: &str,
) -> CoreResult<WorkerOutcome> {
    let mut active: media_playback::ActiveModel = playback.clone().into();
    active.rel_path = Set(Some(paths::normalize_slashes(rel_path)));
    active.width = Set(probe.width.unwrap_or(0) as i32);
    active.height = Set(probe.height.unwrap_or(0) as i32);
    active.video_codec = Set(probe.video_codec.clone());
    active.audio_codec = Set(probe.audio_codec.clone());
    active.bitrate = Set(probe.bitrate);
    active.duration_ms = Set(probe.duration_ms.unwrap_or(0));
    active.status = Set("done".to_string());
    active.error_msg = Set(None);
    active.updated_at = Set(ctx.clock.now());
    active.update(ctx.db.as_ref()).await?;

    let media_row = media::Entity::find_by_id(playback.media_id).one(ctx.db.as_ref()).await?;
    if let Some(media_row) = media_row {
        let mut media_active: media::ActiveModel = media_row.into();
        media_active.has_playback = Set(true);
        media_active.update(ctx.db.as_ref()).await?;
    }

    Ok(WorkerOutcome {
        ok: true,
        note: note.to_string(),
        error: None,
        width: probe.width,
        height: probe.height,
        duration_ms: probe.duration_ms,
    })
}

async fn mark_processing(ctx: &IngestContext, playback: &media_playback::Model) -> CoreResult<()> {
    let mut active: media_playback::ActiveModel = playback.clone().into();
    active.status = Set("processing".to_string());
    active.updated_at = Set(ctx.clock.now());
    active.update(ctx.db.as_ref()).await?;
    Ok(())
}

async fn mark_error(ctx: &IngestContext, playback: &media_playback::Model, error_msg: &str) -> CoreResult<()> {
    let mut active: media_playback::ActiveModel = playback.clone().into();
    active.status = Set("error".to_string());
    active.error_msg = Set(Some(error_msg.to_string()));
    active.updated_at = Set(ctx.clock.now());
    active.update(ctx.db.as_ref()).await?;
    Ok(())
}
