//! `PickerSelection` entity: one file/item within a Session (spec §3).

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "picker_selections")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub session_id: i64,
    pub google_media_id: Option<String>,
    pub local_file_path: Option<String>,
    pub local_filename: Option<String>,
    pub status: String,
    pub attempts: i32,
    pub enqueued_at: Option<DateTimeUtc>,
    pub started_at: Option<DateTimeUtc>,
    pub finished_at: Option<DateTimeUtc>,
    pub error: Option<String>,
    pub media_id: Option<i64>,
    pub locked_by: Option<String>,
    pub lock_heartbeat_at: Option<DateTimeUtc>,
    pub base_url: Option<String>,
    pub base_url_valid_until: Option<DateTimeUtc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::picker_session::Entity",
        from = "Column::SessionId",
        to = "super::picker_session::Column::Id"
    )]
    PickerSession,
    #[sea_orm(
        belongs_to = "super::media::Entity",
        from = "Column::MediaId",
        to = "super::media::Column::Id"
    )]
    Media,
}

impl Related<super::picker_session::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::PickerSession.def()
    }
}

impl Related<super::media::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Media.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
