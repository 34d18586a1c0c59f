//! Transcode Scanner (spec §4.8 "Scanner"): finds videos lacking a
//! completed `std1080p` playback and enqueues a playback row.

use sea_orm::{ActiveModelTrait, ActiveValue::Set, ColumnTrait, EntityTrait, Order, QueryFilter, QueryOrder};
use serde::Serialize;

use crate::context::IngestContext;
use crate::infrastructure::database::entities::{media, media_playback};
use crate::shared::error::CoreResult;
use crate::shared::paths;

#[derive(Debug, Clone, Default, Serialize)]
pub struct ScanOutcome {
    pub queued: u64,
    pub skipped: u64,
}

pub async fn scan(ctx: &IngestContext) -> CoreResult<ScanOutcome> {
    let candidates = media::Entity::find()
        .filter(media::Column::IsVideo.eq(true))
        .filter(media::Column::HasPlayback.eq(false))
        .filter(media::Column::IsDeleted.eq(false))
        .order_by(media::Column::Id, Order::Desc)
        .all(ctx.db.as_ref())
        .await?;

    let mut outcome = ScanOutcome::default();

    for row in candidates {
        let source = ctx.config.roots.originals.join(&row.local_rel_path);
        if !source.exists() {
            outcome.skipped += 1;
            continue;
        }

        let existing = media_playback::Entity::find()
            .filter(media_playback::Column::MediaId.eq(row.id))
            .filter(media_playback::Column::Preset.eq("std1080p"))
            .one(ctx.db.as_ref())
            .await?;

        match existing {
            Some(existing) if matches!(existing.status.as_str(), "pending" | "processing" | "done") => {
                outcome.skipped += 1;
            }
            Some(existing) => {
                let mut active: media_playback::ActiveModel = existing.into();
                active.status = Set("pending".to_string());
                active.error_msg = Set(None);
                active.updated_at = Set(ctx.clock.now());
                active.update(ctx.db.as_ref()).await?;
                outcome.queued += 1;
            }
            None => {
                let now = ctx.clock.now();
                let rel_path = paths::normalize_slashes(&paths::replace_suffix(&row.local_rel_path, "mp4"));
                let active = media_playback::ActiveModel {
                    media_id: Set(row.id),
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
                active.insert(ctx.db.as_ref()).await?;
                outcome.queued += 1;
            }
        }
    }

    Ok(outcome)
}
