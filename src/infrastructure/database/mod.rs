//! Persistence layer: SeaORM entities + migrations, grounded on
//! `core-new/src/infrastructure/database/entities/*` (plain
//! `DeriveEntityModel` structs with `EnumIter, DeriveRelation` relations)
//! and `core-new/src/infrastructure/jobs/database.rs` (`init_database`,
//! schema-creation-from-entity pattern).

pub mod entities;
pub mod migration;
pub mod task_record_repo;

use sea_orm::{Database, DatabaseConnection, DbErr};
use sea_orm_migration::MigratorTrait;

/// Open (creating if necessary) a SQLite database at `path` and run all
/// pending migrations.
pub async fn connect_and_migrate(url: &str) -> Result<DatabaseConnection, DbErr> {
    let conn = Database::connect(url).await?;
    migration::Migrator::up(&conn, None).await?;
    Ok(conn)
}
