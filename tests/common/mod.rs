//! Shared integration-test harness: a real (file-backed) SQLite database
//! under a fresh temp directory, with every `IngestContext` collaborator
//! swapped for its deterministic fake (spec §9: "tests substitute a
//! deterministic fake").

use std::path::{Path, PathBuf};
use std::sync::Arc;

use image::{DynamicImage, RgbImage};
use mediavault_core::config::Config;
use mediavault_core::infrastructure::clock::FakeClock;
use mediavault_core::infrastructure::database::connect_and_migrate;
use mediavault_core::infrastructure::logging::RecordingEventLog;
use mediavault_core::infrastructure::task_runner::FakeTaskRunner;
use mediavault_core::infrastructure::transcoder::FakeTranscoder;
use mediavault_core::IngestContext;

pub struct Harness {
    pub ctx: IngestContext,
    pub events: Arc<RecordingEventLog>,
    pub task_runner: Arc<FakeTaskRunner>,
    pub transcoder: Arc<FakeTranscoder>,
    pub clock: Arc<FakeClock>,
    _data_dir: tempfile::TempDir,
}

impl Harness {
    pub async fn new() -> Self {
        let data_dir = tempfile::tempdir().expect("tempdir");
        let config = Config::default_with_dir(data_dir.path().to_path_buf());
        config.ensure_directories().expect("create archive roots");

        let db = connect_and_migrate(&config.database_url)
            .await
            .expect("connect + migrate");

        let events = Arc::new(RecordingEventLog::default());
        let task_runner = Arc::new(FakeTaskRunner::default());
        let transcoder = Arc::new(FakeTranscoder::default());
        let clock = Arc::new(FakeClock::new(chrono::Utc::now()));

        let ctx = IngestContext::new(
            Arc::new(db),
            clock.clone(),
            task_runner.clone(),
            events.clone(),
            transcoder.clone(),
            config,
        );

        Self {
            ctx,
            events,
            task_runner,
            transcoder,
            clock,
            _data_dir: data_dir,
        }
    }

    pub fn import_dir(&self) -> PathBuf {
        self.ctx.config.roots.import.clone()
    }
}

/// Writes a tiny but genuinely-decodable image to `path`, so the Analyzer
/// and Thumbnail Worker's `image::open` calls succeed the way they would
/// against a real photo.
pub fn write_test_photo(path: &Path) {
    let img = DynamicImage::ImageRgb8(RgbImage::new(8, 8));
    img.save(path).expect("write test photo");
}

/// Writes a file with a video extension but no real container bytes — the
/// `FakeTranscoder` never actually parses them, so this is enough to drive
/// the video branch of the pipeline deterministically.
pub fn write_test_video(path: &Path) {
    std::fs::write(path, b"not-a-real-mp4-container").expect("write test video");
}
