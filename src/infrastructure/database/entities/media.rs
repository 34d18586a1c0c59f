//! `Media` entity (spec §3).

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "media")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    #[sea_orm(unique_key = "google_media_id_unique")]
    pub google_media_id: String,
    pub account_id: Option<String>,
    pub local_rel_path: String,
    pub filename: String,
    pub hash_sha256: String,
    pub bytes: i64,
    pub mime_type: String,
    pub width: i32,
    pub height: i32,
    pub duration_ms: Option<i64>,
    pub shot_at: Option<DateTimeUtc>,
    pub imported_at: DateTimeUtc,
    pub orientation: Option<i32>,
    pub is_video: bool,
    pub is_deleted: bool,
    pub has_playback: bool,
    pub thumbnail_rel_path: Option<String>,
    pub camera_make: Option<String>,
    pub camera_model: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_one = "super::exif::Entity")]
    Exif,
    #[sea_orm(has_many = "super::media_playback::Entity")]
    MediaPlayback,
}

impl Related<super::exif::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Exif.def()
    }
}

impl Related<super::media_playback::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::MediaPlayback.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
