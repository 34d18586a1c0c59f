//! Post-processing (spec §4.7): thumbnail generation, playback
//! preparation, and the retry machinery that keeps nudging a video's
//! thumbnails forward once its transcode finishes.

pub mod playback;
pub mod retry_monitor;
pub mod retry_scheduler;
pub mod thumbnail;
