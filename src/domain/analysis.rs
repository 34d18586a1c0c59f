//! The immutable result of probing one file (spec §4.1).

use chrono::{DateTime, Utc};
use serde_json::Value as JsonValue;
use std::collections::HashMap;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Clone)]
pub struct MediaFileAnalysis {
    pub source_path: PathBuf,
    pub basename: String,
    pub file_hash: String,
    pub file_size: u64,
    pub mime_type: String,
    pub is_video: bool,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub orientation: Option<i32>,
    pub duration_ms: Option<i64>,
    pub shot_at: Option<DateTime<Utc>>,
    pub exif_data: HashMap<String, JsonValue>,
    pub video_metadata: HashMap<String, JsonValue>,
    pub destination_filename: String,
    pub relative_path: String,
    pub camera_make: Option<String>,
    pub camera_model: Option<String>,
}

#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("cannot open file: {0}")]
    Io(#[from] std::io::Error),

    #[error("unable to probe file contents: {0}")]
    ProbeFailed(String),
}
