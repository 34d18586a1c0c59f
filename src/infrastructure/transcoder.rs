//! `Transcoder` port (spec §9 REDESIGN FLAG): "the transcode worker's
//! coupling to external binaries (ffmpeg/ffprobe) must be behind a
//! Transcoder port with methods probe(path) -> MediaProbe and
//! transcode(source, dest, params) -> Result<TranscodeOutcome,
//! TranscodeError>. Tests substitute a deterministic fake."
//!
//! The production implementation shells out to the `ffprobe`/`ffmpeg`
//! binaries via `tokio::process::Command` rather than binding against
//! `ffmpeg-sys-next` FFI: the spec explicitly treats ffmpeg/ffprobe as
//! external binaries (spec §1, §6), and this crate has no buildable
//! source for the teacher's FFI-based `sd-ffmpeg` sub-crate to adapt (see
//! DESIGN.md). Process invocation is a well attested idiom elsewhere in
//! the retrieval pack (e.g. `muyuanjin-ffui`'s `ffui_core::ffprobe`).

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::process::Stdio;
use std::time::Duration;
use thiserror::Error;
use tokio::process::Command;

#[derive(Debug, Clone, Default)]
pub struct MediaProbe {
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub duration_ms: Option<i64>,
    pub video_codec: Option<String>,
    pub audio_codec: Option<String>,
    pub bitrate: Option<i64>,
    pub has_video_stream: bool,
    pub has_audio_stream: bool,
    pub creation_time: Option<chrono::DateTime<chrono::Utc>>,
    pub fps: Option<f64>,
    pub is_faststart_mp4: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscodeParams {
    pub max_width: u32,
    pub max_height: u32,
    pub crf: u32,
    pub preset: String,
    pub audio_bitrate_kbps: u32,
}

impl Default for TranscodeParams {
    fn default() -> Self {
        Self {
            max_width: 1920,
            max_height: 1080,
            crf: 20,
            preset: "veryfast".to_string(),
            audio_bitrate_kbps: 128,
        }
    }
}

#[derive(Debug, Clone)]
pub struct TranscodeOutcome {
    pub width: u32,
    pub height: u32,
    pub duration_ms: i64,
    pub video_codec: String,
    pub audio_codec: String,
    pub bitrate: i64,
}

#[derive(Debug, Error)]
pub enum TranscodeError {
    #[error("ffmpeg_missing")]
    FfmpegMissing,

    #[error("missing_stream")]
    MissingStream,

    #[error("ffmpeg_error: {0}")]
    FfmpegFailed(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl TranscodeError {
    /// The `note` string the playback preparation step records (spec §4.8
    /// step 8, §7 error kind 7).
    pub fn note(&self) -> &'static str {
        match self {
            TranscodeError::FfmpegMissing => "ffmpeg_missing",
            TranscodeError::MissingStream => "missing_stream",
            TranscodeError::FfmpegFailed(_) => "ffmpeg_error",
            TranscodeError::Io(_) => "ffmpeg_error",
        }
    }

    /// Whether the Retry Scheduler should schedule another attempt
    /// (spec §4.12, §7). A missing stream means the source has no playable
    /// video track yet (common right after a picker download lands) and is
    /// worth retrying; a missing binary or malformed input is not.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, TranscodeError::MissingStream | TranscodeError::Io(_))
    }
}

#[async_trait]
pub trait Transcoder: Send + Sync {
    async fn probe(&self, path: &Path) -> Result<MediaProbe, TranscodeError>;

    async fn transcode(
        &self,
        source: &Path,
        dest: &Path,
        params: &TranscodeParams,
    ) -> Result<TranscodeOutcome, TranscodeError>;

    /// Extract a single frame near `offset` into `dest` as a JPEG, used
    /// both for posters (spec §4.8 step 7) and as the thumbnail fallback
    /// frame extractor (spec §4.7.2).
    async fn extract_frame(
        &self,
        source: &Path,
        dest: &Path,
        offset: Duration,
    ) -> Result<(), TranscodeError>;
}

#[derive(Deserialize)]
struct FfprobeOutput {
    streams: Vec<FfprobeStream>,
    format: FfprobeFormat,
}

#[derive(Deserialize)]
struct FfprobeStream {
    codec_type: String,
    codec_name: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
    r_frame_rate: Option<String>,
    bit_rate: Option<String>,
    tags: Option<std::collections::HashMap<String, String>>,
}

#[derive(Deserialize)]
struct FfprobeFormat {
    duration: Option<String>,
    bit_rate: Option<String>,
    tags: Option<std::collections::HashMap<String, String>>,
}

/// Production `Transcoder`: invokes the `ffprobe`/`ffmpeg` binaries on
/// `$PATH` (spec §6 archive roots / external binaries).
#[derive(Debug, Clone)]
pub struct ProcessTranscoder {
    pub ffmpeg_bin: String,
    pub ffprobe_bin: String,
}

impl Default for ProcessTranscoder {
    fn default() -> Self {
        Self {
            ffmpeg_bin: "ffmpeg".to_string(),
            ffprobe_bin: "ffprobe".to_string(),
        }
    }
}

fn is_not_found(e: &std::io::Error) -> bool {
    e.kind() == std::io::ErrorKind::NotFound
}

/// Bound the size of stderr kept around for error summaries (spec §4.8
/// step 8: "truncate stderr to a bounded size").
const MAX_STDERR_BYTES: usize = 4096;

fn summarize_stderr(stderr: &str) -> String {
    let preferred = stderr
        .lines()
        .find(|l| l.contains("width") || l.contains("height") || l.contains("not divisible"));
    let chosen = preferred.unwrap_or_else(|| stderr.lines().last().unwrap_or(""));
    chosen.chars().take(MAX_STDERR_BYTES).collect()
}

#[async_trait]
impl Transcoder for ProcessTranscoder {
    async fn probe(&self, path: &Path) -> Result<MediaProbe, TranscodeError> {
        let output = Command::new(&self.ffprobe_bin)
            .args([
                "-v",
                "error",
                "-print_format",
                "json",
                "-show_streams",
                "-show_format",
            ])
            .arg(path)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|e| {
                if is_not_found(&e) {
                    TranscodeError::FfmpegMissing
                } else {
                    TranscodeError::Io(e)
                }
            })?;

        if !output.status.success() {
            return Err(TranscodeError::FfmpegFailed(summarize_stderr(
                &String::from_utf8_lossy(&output.stderr),
            )));
        }

        let parsed: FfprobeOutput = serde_json::from_slice(&output.stdout)
            .map_err(|e| TranscodeError::FfmpegFailed(format!("invalid ffprobe json: {e}")))?;

        let mut probe = MediaProbe::default();
        for stream in &parsed.streams {
            match stream.codec_type.as_str() {
                "video" => {
                    probe.has_video_stream = true;
                    probe.width = stream.width;
                    probe.height = stream.height;
                    probe.video_codec = stream.codec_name.clone();
                    probe.fps = stream
                        .r_frame_rate
                        .as_ref()
                        .and_then(|r| parse_frame_rate(r));
                    if let Some(tags) = &stream.tags {
                        probe.creation_time = tags
                            .get("creation_time")
                            .and_then(|s| chrono::DateTime::parse_from_rfc3339(s).ok())
                            .map(|dt| dt.with_timezone(&chrono::Utc));
                    }
                }
                "audio" => {
                    probe.has_audio_stream = true;
                    probe.audio_codec = stream.codec_name.clone();
                }
                _ => {}
            }
        }

        if let Some(duration) = &parsed.format.duration {
            if let Ok(seconds) = duration.parse::<f64>() {
                probe.duration_ms = Some((seconds * 1000.0).round() as i64);
            }
        }
        if let Some(bitrate) = &parsed.format.bit_rate {
            probe.bitrate = bitrate.parse::<i64>().ok();
        }
        if probe.creation_time.is_none() {
            if let Some(tags) = &parsed.format.tags {
                probe.creation_time = tags
                    .get("creation_time")
                    .and_then(|s| chrono::DateTime::parse_from_rfc3339(s).ok())
                    .map(|dt| dt.with_timezone(&chrono::Utc));
            }
        }
        probe.is_faststart_mp4 = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.eq_ignore_ascii_case("mp4"))
            .unwrap_or(false);

        Ok(probe)
    }

    async fn transcode(
        &self,
        source: &Path,
        dest: &Path,
        params: &TranscodeParams,
    ) -> Result<TranscodeOutcome, TranscodeError> {
        if let Some(parent) = dest.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let scale_filter = format!(
            "scale='min({},iw)':'min({},ih)':force_original_aspect_ratio=decrease",
            params.max_width, params.max_height
        );

        let output = Command::new(&self.ffmpeg_bin)
            .args(["-y", "-i"])
            .arg(source)
            .args(["-vf", &scale_filter])
            .args(["-c:v", "libx264"])
            .args(["-crf", &params.crf.to_string()])
            .args(["-preset", &params.preset])
            .args(["-c:a", "aac"])
            .args(["-b:a", &format!("{}k", params.audio_bitrate_kbps)])
            .args(["-ac", "2"])
            .args(["-movflags", "+faststart"])
            .arg(dest)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|e| {
                if is_not_found(&e) {
                    TranscodeError::FfmpegMissing
                } else {
                    TranscodeError::Io(e)
                }
            })?;

        if !output.status.success() {
            let _ = tokio::fs::remove_file(dest).await;
            return Err(TranscodeError::FfmpegFailed(summarize_stderr(
                &String::from_utf8_lossy(&output.stderr),
            )));
        }

        let probe = self.probe(dest).await?;
        if !probe.has_video_stream || !probe.has_audio_stream {
            let _ = tokio::fs::remove_file(dest).await;
            return Err(TranscodeError::MissingStream);
        }

        Ok(TranscodeOutcome {
            width: probe.width.unwrap_or(0),
            height: probe.height.unwrap_or(0),
            duration_ms: probe.duration_ms.unwrap_or(0),
            video_codec: probe.video_codec.unwrap_or_default(),
            audio_codec: probe.audio_codec.unwrap_or_default(),
            bitrate: probe.bitrate.unwrap_or(0),
        })
    }

    async fn extract_frame(
        &self,
        source: &Path,
        dest: &Path,
        offset: Duration,
    ) -> Result<(), TranscodeError> {
        if let Some(parent) = dest.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let output = Command::new(&self.ffmpeg_bin)
            .args(["-y", "-ss", &format!("{:.3}", offset.as_secs_f64()), "-i"])
            .arg(source)
            .args(["-frames:v", "1", "-q:v", "2"])
            .arg(dest)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|e| {
                if is_not_found(&e) {
                    TranscodeError::FfmpegMissing
                } else {
                    TranscodeError::Io(e)
                }
            })?;

        if !output.status.success() {
            return Err(TranscodeError::FfmpegFailed(summarize_stderr(
                &String::from_utf8_lossy(&output.stderr),
            )));
        }
        Ok(())
    }
}

fn parse_frame_rate(raw: &str) -> Option<f64> {
    let (num, den) = raw.split_once('/')?;
    let num: f64 = num.parse().ok()?;
    let den: f64 = den.parse().ok()?;
    if den == 0.0 {
        None
    } else {
        Some(num / den)
    }
}

/// Deterministic fake for tests (spec §9: "tests substitute a
/// deterministic fake").
pub struct FakeTranscoder {
    pub probes: std::sync::Mutex<std::collections::HashMap<String, MediaProbe>>,
    pub fail_with: std::sync::Mutex<Option<TranscodeError>>,
}

impl Default for FakeTranscoder {
    fn default() -> Self {
        Self {
            probes: std::sync::Mutex::new(std::collections::HashMap::new()),
            fail_with: std::sync::Mutex::new(None),
        }
    }
}

impl FakeTranscoder {
    pub fn set_probe(&self, path: &Path, probe: MediaProbe) {
        self.probes
            .lock()
            .unwrap()
            .insert(path.to_string_lossy().to_string(), probe);
    }

    pub fn fail_next_with(&self, err: TranscodeError) {
        *self.fail_with.lock().unwrap() = Some(err);
    }
}

fn clone_err(e: &TranscodeError) -> TranscodeError {
    match e {
        TranscodeError::FfmpegMissing => TranscodeError::FfmpegMissing,
        TranscodeError::MissingStream => TranscodeError::MissingStream,
        TranscodeError::FfmpegFailed(s) => TranscodeError::FfmpegFailed(s.clone()),
        TranscodeError::Io(e) => TranscodeError::Io(std::io::Error::new(e.kind(), e.to_string())),
    }
}

#[async_trait]
impl Transcoder for FakeTranscoder {
    async fn probe(&self, path: &Path) -> Result<MediaProbe, TranscodeError> {
        if let Some(err) = self.fail_with.lock().unwrap().take() {
            return Err(err);
        }
        Ok(self
            .probes
            .lock()
            .unwrap()
            .get(&path.to_string_lossy().to_string())
            .cloned()
            .unwrap_or_default())
    }

    async fn transcode(
        &self,
        source: &Path,
        dest: &Path,
        _params: &TranscodeParams,
    ) -> Result<TranscodeOutcome, TranscodeError> {
        if let Some(err) = self.fail_with.lock().unwrap().take() {
            return Err(clone_err(&err));
        }
        if let Some(parent) = dest.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(dest, b"fake-mp4-bytes").await?;
        let probe = self.probe(source).await.unwrap_or_default();
        Ok(TranscodeOutcome {
            width: probe.width.unwrap_or(1920),
            height: probe.height.unwrap_or(1080),
            duration_ms: probe.duration_ms.unwrap_or(2000),
            video_codec: "h264".to_string(),
            audio_codec: "aac".to_string(),
            bitrate: 4_000_000,
        })
    }

    async fn extract_frame(
        &self,
        _source: &Path,
        dest: &Path,
        _offset: Duration,
    ) -> Result<(), TranscodeError> {
        if let Some(parent) = dest.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(dest, b"fake-jpeg-bytes").await?;
        Ok(())
    }
}
