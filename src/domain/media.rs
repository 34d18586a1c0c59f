//! Domain types for the Media / MediaItem / MediaPlayback aggregate
//! (spec §3). Persistence mapping lives in
//! `infrastructure::database::entities`; these types are what the
//! operations layer actually reasons about.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The four fixed thumbnail sizes, long-side pixels (spec §4.7.2).
pub const THUMBNAIL_SIZES: [u32; 4] = [256, 512, 1024, 2048];

/// Closed set of ingestible extensions (spec §6). `.zip` is expanded by
/// the Directory Scanner and never reaches the File Importer directly.
pub const SUPPORTED_EXTENSIONS: &[&str] = &[
    ".jpg", ".jpeg", ".png", ".gif", ".bmp", ".tif", ".tiff", ".webp", ".heic", ".heif", ".mp4",
    ".mov", ".avi", ".mkv", ".webm", ".m4v", ".3gp", ".zip",
];

const VIDEO_EXTENSIONS: &[&str] = &[
    ".mp4", ".mov", ".avi", ".mkv", ".webm", ".m4v", ".3gp",
];

/// True when `ext` (lowercased, with leading dot) names a video container.
pub fn is_video_extension(ext: &str) -> bool {
    VIDEO_EXTENSIONS.contains(&ext)
}

/// True when `ext` is in the closed supported-extension set.
pub fn is_supported_extension(ext: &str) -> bool {
    SUPPORTED_EXTENSIONS.contains(&ext)
}

/// Transcoding presets. `Std1080p` is the only one this core schedules
/// (spec §3, Preset); the others are modeled because `MediaPlayback` rows
/// for them may already exist in a catalog produced by an external
/// collaborator, and the core must not choke on reading them back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Preset {
    Original,
    Preview,
    Mobile,
    Std1080p,
}

impl Preset {
    pub fn as_str(&self) -> &'static str {
        match self {
            Preset::Original => "original",
            Preset::Preview => "preview",
            Preset::Mobile => "mobile",
            Preset::Std1080p => "std1080p",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "original" => Some(Preset::Original),
            "preview" => Some(Preset::Preview),
            "mobile" => Some(Preset::Mobile),
            "std1080p" => Some(Preset::Std1080p),
            _ => None,
        }
    }
}

/// `MediaPlayback.status` (spec §3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlaybackStatus {
    Pending,
    Processing,
    Done,
    Error,
}

impl PlaybackStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PlaybackStatus::Pending => "pending",
            PlaybackStatus::Processing => "processing",
            PlaybackStatus::Done => "done",
            PlaybackStatus::Error => "error",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(PlaybackStatus::Pending),
            "processing" => Some(PlaybackStatus::Processing),
            "done" => Some(PlaybackStatus::Done),
            "error" => Some(PlaybackStatus::Error),
            _ => None,
        }
    }
}

/// Tagged union over `{PhotoMetadata, VideoMetadata}` (spec §9 REDESIGN
/// FLAG: "polymorphism over PhotoMetadata/VideoMetadata ... is best
/// expressed as a tagged variant held by MediaItem"). The `type` column on
/// the persisted `media_items` row is derived from the variant tag.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum MediaKind {
    Photo(PhotoMetadata),
    Video(VideoMetadata),
    Unspecified,
}

impl MediaKind {
    pub fn type_str(&self) -> &'static str {
        match self {
            MediaKind::Photo(_) => "PHOTO",
            MediaKind::Video(_) => "VIDEO",
            MediaKind::Unspecified => "TYPE_UNSPECIFIED",
        }
    }

    pub fn is_video(&self) -> bool {
        matches!(self, MediaKind::Video(_))
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PhotoMetadata {
    pub camera_make: Option<String>,
    pub camera_model: Option<String>,
    pub iso: Option<i32>,
    pub aperture_f_number: Option<f64>,
    pub exposure_time_seconds: Option<f64>,
    pub focal_length_mm: Option<f64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VideoMetadata {
    pub fps: Option<f64>,
    pub processing_status: String,
}

/// In-memory view of a `Media` row plus its owned `MediaItem`/`Exif`
/// siblings, as read back by the repository layer (spec §3 ownership
/// summary: "Media exclusively owns its Exif, MediaPlayback rows, and (via
/// google_media_id) its MediaItem tree").
#[derive(Debug, Clone)]
pub struct MediaRecord {
    pub id: i64,
    pub google_media_id: String,
    pub account_id: Option<String>,
    pub local_rel_path: String,
    pub filename: String,
    pub hash_sha256: String,
    pub bytes: i64,
    pub mime_type: String,
    pub width: i32,
    pub height: i32,
    pub duration_ms: Option<i64>,
    pub shot_at: Option<DateTime<Utc>>,
    pub imported_at: DateTime<Utc>,
    pub orientation: Option<i32>,
    pub is_video: bool,
    pub is_deleted: bool,
    pub has_playback: bool,
    pub thumbnail_rel_path: Option<String>,
    pub camera_make: Option<String>,
    pub camera_model: Option<String>,
}
