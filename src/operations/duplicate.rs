//! Duplicate Checker (spec §4.2): identity is `(hash_sha256, bytes)`
//! among non-deleted `Media` rows.

use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter};

use crate::infrastructure::database::entities::media::{self, Entity as MediaEntity};
use crate::shared::error::CoreResult;

/// Returns the non-deleted `Media` whose `(hash_sha256, bytes)` matches,
/// or `None`. Deleted media are ignored so a re-import after deletion
/// always creates a fresh row (spec §8 P2).
pub async fn find_duplicate(
    db: &DatabaseConnection,
    file_hash: &str,
    file_size: u64,
) -> CoreResult<Option<media::Model>> {
    let found = MediaEntity::find()
        .filter(media::Column::HashSha256.eq(file_hash))
        .filter(media::Column::Bytes.eq(file_size as i64))
        .filter(media::Column::IsDeleted.eq(false))
        .one(db)
        .await?;
    Ok(found)
}
