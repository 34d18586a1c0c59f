//! Media ingestion and post-processing core for a self-hosted photo/video
//! library: scanning, deduplication, archival, and derivative-asset
//! generation (thumbnails, transcoded playback renditions).

pub mod config;
pub mod context;
pub mod domain;
pub mod infrastructure;
pub mod operations;
pub mod shared;

pub use config::Config;
pub use context::IngestContext;
