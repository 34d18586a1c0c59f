//! Application configuration, grounded on
//! `core-new/src/config/app_config.rs`'s `AppConfig::load_from`/`save`
//! pattern (serde struct, versionless here since this core has no
//! migration history yet, loaded from/saved to a single file on disk).

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::infrastructure::transcoder::TranscodeParams;
use crate::shared::error::{CoreError, CoreResult};

/// The five archive roots named in spec §6.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Roots {
    pub originals: PathBuf,
    pub playback: PathBuf,
    pub thumbnails: PathBuf,
    pub temp: PathBuf,
    pub import: PathBuf,
}

impl Roots {
    fn under(data_dir: &Path) -> Self {
        Self {
            originals: data_dir.join("originals"),
            playback: data_dir.join("playback"),
            thumbnails: data_dir.join("thumbnails"),
            temp: data_dir.join("temp"),
            import: data_dir.join("import"),
        }
    }

    fn all(&self) -> [&PathBuf; 5] {
        [
            &self.originals,
            &self.playback,
            &self.thumbnails,
            &self.temp,
            &self.import,
        ]
    }
}

/// Retry Scheduler constants (spec §4.12).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub countdown_secs: i64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: crate::domain::task_record::THUMBNAIL_RETRY_MAX_ATTEMPTS,
            countdown_secs: crate::domain::task_record::THUMBNAIL_RETRY_COUNTDOWN_SECS,
        }
    }
}

/// Soft-lock / watchdog thresholds for stalled selections (spec §5).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WatchdogConfig {
    pub lock_heartbeat_timeout_secs: i64,
    pub lock_max_attempts: u32,
    pub stalled_enqueued_timeout_secs: i64,
}

impl Default for WatchdogConfig {
    fn default() -> Self {
        Self {
            lock_heartbeat_timeout_secs: 120,
            lock_max_attempts: 5,
            stalled_enqueued_timeout_secs: 300,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub data_dir: PathBuf,
    pub database_url: String,
    pub log_level: String,
    pub roots: Roots,
    pub thumbnail_sizes: Vec<u32>,
    pub transcode: TranscodeParams,
    pub retry: RetryConfig,
    pub watchdog: WatchdogConfig,
}

impl Config {
    pub fn default_with_dir(data_dir: PathBuf) -> Self {
        let database_url = format!("sqlite://{}/mediavault.db?mode=rwc", data_dir.display());
        Self {
            roots: Roots::under(&data_dir),
            data_dir,
            database_url,
            log_level: "info".to_string(),
            thumbnail_sizes: crate::domain::media::THUMBNAIL_SIZES.to_vec(),
            transcode: TranscodeParams::default(),
            retry: RetryConfig::default(),
            watchdog: WatchdogConfig::default(),
        }
    }

    fn config_path(data_dir: &Path) -> PathBuf {
        data_dir.join("mediavault.toml")
    }

    /// Loads config from `data_dir/mediavault.toml`, writing a fresh
    /// default file if none exists yet.
    pub fn load_or_create(data_dir: &Path) -> CoreResult<Self> {
        let path = Self::config_path(data_dir);
        if path.exists() {
            let text = fs::read_to_string(&path).map_err(CoreError::Io)?;
            let config: Config =
                toml::from_str(&text).map_err(|e| CoreError::Config(e.to_string()))?;
            Ok(config)
        } else {
            let config = Self::default_with_dir(data_dir.to_path_buf());
            config.save()?;
            Ok(config)
        }
    }

    pub fn save(&self) -> CoreResult<()> {
        fs::create_dir_all(&self.data_dir).map_err(CoreError::Io)?;
        let text = toml::to_string_pretty(self).map_err(|e| CoreError::Config(e.to_string()))?;
        fs::write(Self::config_path(&self.data_dir), text).map_err(CoreError::Io)?;
        Ok(())
    }

    /// Creates all five archive roots, matching `AppConfig::ensure_directories`.
    pub fn ensure_directories(&self) -> CoreResult<()> {
        fs::create_dir_all(&self.data_dir).map_err(CoreError::Io)?;
        for root in self.roots.all() {
            fs::create_dir_all(root).map_err(CoreError::Io)?;
        }
        Ok(())
    }
}
