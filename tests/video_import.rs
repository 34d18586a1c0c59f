//! End-to-end coverage of importing a video through the `FakeTranscoder`
//! (spec §4.8): a `MediaPlayback` row reaches `done` via the non-passthrough
//! transcode branch and `Media.has_playback` flips to true.

mod common;

use mediavault_core::infrastructure::database::entities::media_playback;
use mediavault_core::infrastructure::task_runner::TaskInstance;
use mediavault_core::operations::local_import;
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter};

#[tokio::test]
async fn imports_a_video_and_produces_a_done_playback_row() {
    let harness = common::Harness::new().await;
    let import_dir = harness.import_dir();
    common::write_test_video(&import_dir.join("clip.mp4"));

    let task_instance = TaskInstance::never_aborted();
    let session = local_import::run(&harness.ctx, None, &import_dir, &task_instance)
        .await
        .expect("local import runs");

    assert_eq!(session.status, "imported");
    assert_eq!(session.stats["success"], 1);

    let media_rows = mediavault_core::infrastructure::database::entities::media::Entity::find()
        .all(harness.ctx.db.as_ref())
        .await
        .unwrap();
    assert_eq!(media_rows.len(), 1);
    let media = &media_rows[0];
    assert!(media.is_video);
    assert!(media.has_playback);

    let playback_rows = media_playback::Entity::find()
        .filter(media_playback::Column::MediaId.eq(media.id))
        .all(harness.ctx.db.as_ref())
        .await
        .unwrap();
    assert_eq!(playback_rows.len(), 1);
    assert_eq!(playback_rows[0].status, "done");
    assert_eq!(playback_rows[0].preset, "std1080p");
}
