//! Importing byte-identical content twice across two Sessions is detected
//! as a duplicate on the second pass (spec §4.4: exact match on full-file
//! SHA-256 + size) instead of creating a second `Media` row.

mod common;

use mediavault_core::infrastructure::task_runner::TaskInstance;
use mediavault_core::operations::local_import;
use sea_orm::EntityTrait;

#[tokio::test]
async fn second_import_of_identical_bytes_is_marked_duplicate() {
    let harness = common::Harness::new().await;
    let import_dir = harness.import_dir();
    let task_instance = TaskInstance::never_aborted();

    common::write_test_photo(&import_dir.join("first.png"));
    let first_session = local_import::run(&harness.ctx, None, &import_dir, &task_instance)
        .await
        .expect("first import runs");
    assert_eq!(first_session.status, "imported");
    assert_eq!(first_session.stats["success"], 1);

    common::write_test_photo(&import_dir.join("second.png"));
    let second_session = local_import::run(&harness.ctx, None, &import_dir, &task_instance)
        .await
        .expect("second import runs");
    assert_eq!(second_session.status, "imported");
    assert_eq!(second_session.stats["success"], 1);

    let media_rows = mediavault_core::infrastructure::database::entities::media::Entity::find()
        .all(harness.ctx.db.as_ref())
        .await
        .unwrap();
    assert_eq!(media_rows.len(), 1, "duplicate content must not create a second Media row");

    let selections = mediavault_core::infrastructure::database::entities::picker_selection::Entity::find()
        .all(harness.ctx.db.as_ref())
        .await
        .unwrap();
    let dup_count = selections.iter().filter(|s| s.status == "dup").count();
    assert_eq!(dup_count, 1, "the second selection must land in the dup terminal state");
}
