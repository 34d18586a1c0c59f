//! End-to-end coverage of the Local-Import Use Case (spec §4.9) against a
//! single real photo: Session reaches a terminal `imported` status, a
//! `Media` row is created with a derived hash, and a thumbnail is written.

mod common;

use mediavault_core::infrastructure::task_runner::TaskInstance;
use mediavault_core::operations::local_import;
use sea_orm::EntityTrait;

#[tokio::test]
async fn imports_a_single_photo_end_to_end() {
    let harness = common::Harness::new().await;
    let import_dir = harness.import_dir();
    common::write_test_photo(&import_dir.join("beach.png"));

    let task_instance = TaskInstance::never_aborted();
    let session = local_import::run(&harness.ctx, None, &import_dir, &task_instance)
        .await
        .expect("local import runs");

    assert_eq!(session.status, "imported");
    assert_eq!(session.stats["total"], 1);
    assert_eq!(session.stats["success"], 1);
    assert_eq!(session.stats["failed"], 0);

    let media_rows = mediavault_core::infrastructure::database::entities::media::Entity::find()
        .all(harness.ctx.db.as_ref())
        .await
        .unwrap();
    assert_eq!(media_rows.len(), 1);
    let media = &media_rows[0];
    assert!(!media.is_video);
    assert!(!media.hash_sha256.is_empty());
    assert_eq!(media.width, 8);
    assert_eq!(media.height, 8);
    assert!(media.thumbnail_rel_path.is_some());
}

#[tokio::test]
async fn reports_error_status_when_import_directory_is_empty() {
    let harness = common::Harness::new().await;
    let import_dir = harness.import_dir();

    let task_instance = TaskInstance::never_aborted();
    let session = local_import::run(&harness.ctx, None, &import_dir, &task_instance)
        .await
        .expect("local import runs");

    assert_eq!(session.status, "error");
    assert_eq!(session.stats["reason"], "no_files_found");
}
