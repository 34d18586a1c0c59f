//! `PickerSession` entity: the user-visible ingestion job (spec §3).

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "picker_sessions")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    #[sea_orm(unique_key = "picker_session_id_unique")]
    pub session_id: String,
    pub status: String,
    pub account_id: Option<String>,
    pub selected_count: i64,
    pub last_progress_at: Option<DateTimeUtc>,
    pub last_polled_at: Option<DateTimeUtc>,
    pub stats: Json,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::picker_selection::Entity")]
    PickerSelection,
}

impl Related<super::picker_selection::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::PickerSelection.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
