//! `MediaItem` entity (spec §3). `kind` is the persisted tag for
//! `domain::media::MediaKind` (spec §9 REDESIGN FLAG).

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "media_items")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    #[sea_orm(unique_key = "media_item_google_id_unique")]
    pub google_media_id: String,
    pub kind: String, // "PHOTO" | "VIDEO" | "TYPE_UNSPECIFIED"
    pub mime_type: String,
    pub filename: String,
    pub width: i32,
    pub height: i32,
    pub photo_metadata: Option<Json>,
    pub video_metadata: Option<Json>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
