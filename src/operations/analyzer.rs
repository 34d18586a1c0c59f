//! Media Analyzer (spec §4.1): probes one file and returns an immutable
//! `MediaFileAnalysis`. Hashing is full-file streaming SHA-256 rather than
//! the teacher's sampled `ContentHashGenerator` (see DESIGN.md) — spec §8
//! P1/P2 require exact `(sha256, bytes)` content identity, which a
//! sampled hash cannot guarantee.

use std::collections::HashMap;
use std::path::Path;

use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};
use tokio::io::AsyncReadExt;

use crate::context::IngestContext;
use crate::domain::analysis::{AnalysisError, MediaFileAnalysis};
use crate::domain::media::is_video_extension;
use crate::shared::paths;

/// Hashes and probes `path`, deriving the canonical archive-relative
/// destination. Disambiguates against whatever already occupies that
/// destination under `ctx.config.roots.originals` so two distinct analyses
/// never collide within the same day's partition (spec §4.1). The Queue
/// Processor runs one selection at a time to completion, so every file
/// already imported earlier in the same run is already on disk by the time
/// the next file is analyzed — filesystem existence is a true record of
/// what's claimed without threading a set across calls.
/// `exclude_relative_path` lets the Metadata Refresher analyze a file at
/// its own existing archive location without that location disambiguating
/// against itself.
pub async fn analyze(
    ctx: &IngestContext,
    path: &Path,
    exclude_relative_path: Option<&str>,
) -> Result<MediaFileAnalysis, AnalysisError> {
    let basename = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| "file".to_string());
    let extension = path
        .extension()
        .map(|e| format!(".{}", e.to_string_lossy().to_ascii_lowercase()))
        .unwrap_or_default();
    let is_video = is_video_extension(&extension);

    let (file_hash, file_size) = hash_file(path).await?;
    let mime_type = mime_guess::from_path(path)
        .first_or_octet_stream()
        .essence_str()
        .to_string();

    let mut exif_data = HashMap::new();
    let mut video_metadata = HashMap::new();
    let mut width = None;
    let mut height = None;
    let mut orientation = None;
    let mut duration_ms = None;
    let mut shot_at = None;
    let mut camera_make = None;
    let mut camera_model = None;

    if is_video {
        match ctx.transcoder.probe(path).await {
            Ok(probe) => {
                width = probe.width;
                height = probe.height;
                duration_ms = probe.duration_ms;
                shot_at = probe.creation_time;
                video_metadata.insert(
                    "fps".to_string(),
                    serde_json::json!(probe.fps.unwrap_or(0.0)),
                );
                video_metadata.insert(
                    "processing_status".to_string(),
                    serde_json::json!("probed"),
                );
            }
            Err(_) => {
                video_metadata.insert(
                    "processing_status".to_string(),
                    serde_json::json!("probe_failed"),
                );
            }
        }
    } else {
        let (w, h, exif_map, exif_orientation, exif_shot_at, make, model) = analyze_image(path)?;
        width = w;
        height = h;
        orientation = exif_orientation;
        shot_at = exif_shot_at;
        exif_data = exif_map;
        camera_make = make;
        camera_model = model;
    }

    let stem = Path::new(&basename)
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| basename.clone());
    let originals_root = &ctx.config.roots.originals;
    let relative_path = paths::relative_path_for(shot_at, &stem, &extension, &|candidate| {
        exclude_relative_path != Some(candidate) && originals_root.join(candidate).exists()
    });
    let destination_filename = relative_path
        .rsplit_once('/')
        .map(|(_, f)| f.to_string())
        .unwrap_or_else(|| relative_path.clone());

    Ok(MediaFileAnalysis {
        source_path: path.to_path_buf(),
        basename,
        file_hash,
        file_size,
        mime_type,
        is_video,
        width,
        height,
        orientation,
        duration_ms,
        shot_at,
        exif_data,
        video_metadata,
        destination_filename,
        relative_path,
        camera_make,
        camera_model,
    })
}

async fn hash_file(path: &Path) -> Result<(String, u64), AnalysisError> {
    let mut file = tokio::fs::File::open(path).await?;
    let mut hasher = Sha256::new();
    let mut buf = vec![0u8; 1 << 16];
    let mut total = 0u64;
    loop {
        let n = file.read(&mut buf).await?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
        total += n as u64;
    }
    Ok((hex::encode(hasher.finalize()), total))
}

type ImageProbe = (
    Option<u32>,
    Option<u32>,
    HashMap<String, serde_json::Value>,
    Option<i32>,
    Option<DateTime<Utc>>,
    Option<String>,
    Option<String>,
);

/// Decodes dimensions (falling back to a secondary probe when the primary
/// decoder fails, per spec §4.1 HEIC rule) and extracts EXIF. EXIF failures
/// never raise: an unreadable EXIF block yields an empty mapping.
fn analyze_image(path: &Path) -> Result<ImageProbe, AnalysisError> {
    let dims = image::image_dimensions(path)
        .ok()
        .or_else(|| probe_dimensions_via_heif(path));
    let (width, height) = match dims {
        Some((w, h)) => (Some(w), Some(h)),
        None => (None, None),
    };

    let mut exif_data = HashMap::new();
    let mut orientation = None;
    let mut shot_at = None;
    let mut camera_make = None;
    let mut camera_model = None;

    if let Ok(file) = std::fs::File::open(path) {
        let mut buf_reader = std::io::BufReader::new(file);
        if let Ok(exif) = exif::Reader::new().read_from_container(&mut buf_reader) {
            for field in exif.fields() {
                let key = field.tag.to_string();
                let value = field.display_value().with_unit(&exif).to_string();
                exif_data.insert(key, serde_json::json!(value));
            }
            orientation = exif
                .get_field(exif::Tag::Orientation, exif::In::PRIMARY)
                .and_then(|f| f.value.get_uint(0))
                .map(|v| v as i32);
            camera_make = exif
                .get_field(exif::Tag::Make, exif::In::PRIMARY)
                .map(|f| f.display_value().to_string().trim_matches('"').to_string());
            camera_model = exif
                .get_field(exif::Tag::Model, exif::In::PRIMARY)
                .map(|f| f.display_value().to_string().trim_matches('"').to_string());
            shot_at = shot_at_from_exif(&exif);
        }
    }

    Ok((
        width,
        height,
        exif_data,
        orientation,
        shot_at,
        camera_make,
        camera_model,
    ))
}

/// `DateTimeOriginal` combined with `OffsetTimeOriginal` when present, else
/// `DateTimeOriginal` in UTC (spec §4.1: "else from EXIF in default TZ").
fn shot_at_from_exif(exif: &exif::Exif) -> Option<DateTime<Utc>> {
    let dt_field = exif.get_field(exif::Tag::DateTimeOriginal, exif::In::PRIMARY)?;
    let dt_str = dt_field.display_value().to_string();
    let naive = chrono::NaiveDateTime::parse_from_str(&dt_str, "%Y-%m-%d %H:%M:%S").ok()?;

    let offset_str = exif
        .get_field(exif::Tag::OffsetTimeOriginal, exif::In::PRIMARY)
        .map(|f| f.display_value().to_string().trim_matches('"').to_string());

    match offset_str {
        Some(offset) => {
            let parsed = chrono::DateTime::parse_from_str(
                &format!("{dt_str}{offset}"),
                "%Y-%m-%d %H:%M:%S%:z",
            )
            .ok()?;
            Some(parsed.with_timezone(&Utc))
        }
        None => Some(DateTime::from_naive_utc_and_offset(naive, Utc)),
    }
}

#[cfg(feature = "heif")]
fn probe_dimensions_via_heif(path: &Path) -> Option<(u32, u32)> {
    let ctx = libheif_rs::HeifContext::read_from_file(path.to_str()?).ok()?;
    let handle = ctx.primary_image_handle().ok()?;
    Some((handle.width(), handle.height()))
}

#[cfg(not(feature = "heif"))]
fn probe_dimensions_via_heif(_path: &Path) -> Option<(u32, u32)> {
    None
}
