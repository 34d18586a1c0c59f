//! `CeleryTaskRecord` entity (spec §3): the generic task-tracking row
//! shared by the Retry Scheduler and any other background job. Grounded
//! on `core-new/src/infrastructure/jobs/database.rs`'s `jobs::Model`.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "task_records")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub task_name: String,
    pub object_type: Option<String>,
    pub object_id: Option<String>,
    #[sea_orm(unique_key = "task_record_external_id_unique")]
    pub external_task_id: Option<String>,
    pub status: String,
    pub scheduled_for: Option<DateTimeUtc>,
    pub started_at: Option<DateTimeUtc>,
    pub finished_at: Option<DateTimeUtc>,
    pub payload: Json,
    pub result: Json,
    pub error_message: Option<String>,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
