//! Repository for the `task_records` table (spec §4.12 Retry Scheduler).
//! Grounded on `core-new/src/infrastructure/jobs/database.rs`'s `JobDb`:
//! a thin struct wrapping a `DatabaseConnection` with one method per query
//! the domain logic actually needs.

use chrono::{DateTime, Utc};
use sea_orm::{ActiveModelTrait, ActiveValue::Set, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter};
use serde_json::Value as JsonValue;

use super::entities::task_record::{self, Entity as TaskRecordEntity};
use crate::domain::task_record::{TaskRecord, TaskRecordStatus};
use crate::shared::error::CoreResult;

pub struct TaskRecordRepo {
    conn: DatabaseConnection,
}

impl TaskRecordRepo {
    pub fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    /// Finds the row for `(task_name, object_type, object_id)`, or creates
    /// one in `scheduled` status with the given payload (spec §4.12: the
    /// scheduler must not create duplicate records for the same object).
    pub async fn get_or_create(
        &self,
        task_name: &str,
        object_type: Option<&str>,
        object_id: Option<&str>,
        external_task_id: Option<&str>,
        payload: JsonValue,
        now: DateTime<Utc>,
    ) -> CoreResult<TaskRecord> {
        let mut query = TaskRecordEntity::find().filter(task_record::Column::TaskName.eq(task_name));
        if let (Some(ot), Some(oid)) = (object_type, object_id) {
            query = query
                .filter(task_record::Column::ObjectType.eq(ot))
                .filter(task_record::Column::ObjectId.eq(oid));
        }
        if let Some(existing) = query.one(&self.conn).await? {
            return Ok(to_domain(existing));
        }

        let model = task_record::ActiveModel {
            task_name: Set(task_name.to_string()),
            object_type: Set(object_type.map(str::to_string)),
            object_id: Set(object_id.map(str::to_string)),
            external_task_id: Set(external_task_id.map(str::to_string)),
            status: Set(TaskRecordStatus::Scheduled.as_str().to_string()),
            scheduled_for: Set(Some(now)),
            payload: Set(payload),
            result: Set(JsonValue::Null),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        };
        let inserted = model.insert(&self.conn).await?;
        Ok(to_domain(inserted))
    }

    pub async fn find_by_id(&self, id: i64) -> CoreResult<Option<TaskRecord>> {
        Ok(TaskRecordEntity::find_by_id(id).one(&self.conn).await?.map(to_domain))
    }

    pub async fn due_for_attempt(&self, now: DateTime<Utc>) -> CoreResult<Vec<TaskRecord>> {
        let rows = TaskRecordEntity::find()
            .filter(task_record::Column::Status.eq(TaskRecordStatus::Scheduled.as_str()))
            .filter(task_record::Column::ScheduledFor.lte(now))
            .all(&self.conn)
            .await?;
        Ok(rows.into_iter().map(to_domain).collect())
    }

    pub async fn mark_running(&self, id: i64, now: DateTime<Utc>) -> CoreResult<()> {
        let model = task_record::ActiveModel {
            id: Set(id),
            status: Set(TaskRecordStatus::Running.as_str().to_string()),
            started_at: Set(Some(now)),
            updated_at: Set(now),
            ..Default::default()
        };
        model.update(&self.conn).await?;
        Ok(())
    }

    pub async fn mark_finished(
        &self,
        id: i64,
        status: TaskRecordStatus,
        result: JsonValue,
        error_message: Option<String>,
        now: DateTime<Utc>,
    ) -> CoreResult<()> {
        let model = task_record::ActiveModel {
            id: Set(id),
            status: Set(status.as_str().to_string()),
            finished_at: Set(Some(now)),
            result: Set(result),
            error_message: Set(error_message),
            updated_at: Set(now),
            ..Default::default()
        };
        model.update(&self.conn).await?;
        Ok(())
    }

    /// Reschedules a record for another attempt, updating its payload
    /// (spec §4.12: the payload carries the running `attempts` counter and
    /// the accumulated `blockers`).
    pub async fn reschedule(
        &self,
        id: i64,
        scheduled_for: DateTime<Utc>,
        payload: JsonValue,
        now: DateTime<Utc>,
    ) -> CoreResult<()> {
        let model = task_record::ActiveModel {
            id: Set(id),
            status: Set(TaskRecordStatus::Scheduled.as_str().to_string()),
            scheduled_for: Set(Some(scheduled_for)),
            payload: Set(payload),
            updated_at: Set(now),
            ..Default::default()
        };
        model.update(&self.conn).await?;
        Ok(())
    }
}

fn to_domain(row: task_record::Model) -> TaskRecord {
    TaskRecord {
        id: row.id,
        task_name: row.task_name,
        object_type: row.object_type,
        object_id: row.object_id,
        external_task_id: row.external_task_id,
        status: TaskRecordStatus::parse(&row.status).unwrap_or(TaskRecordStatus::Failed),
        scheduled_for: row.scheduled_for,
        started_at: row.started_at,
        finished_at: row.finished_at,
        payload: row.payload,
        result: row.result,
        error_message: row.error_message,
        created_at: row.created_at,
        updated_at: row.updated_at,
    }
}
