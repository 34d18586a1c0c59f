//! Crate-wide error type. Library code returns `CoreError`; `anyhow` is
//! reserved for the CLI binary and tests (spec §7).

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("analysis error: {0}")]
    Analysis(#[from] crate::domain::analysis::AnalysisError),

    #[error("transcode error: {0}")]
    Transcode(#[from] crate::infrastructure::transcoder::TranscodeError),

    #[error("invalid state: {0}")]
    InvalidState(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("zip archive error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("config error: {0}")]
    Config(String),
}

impl CoreError {
    /// Whether retrying the same operation later stands a chance of
    /// succeeding. Mirrors the Retry Scheduler's recoverable/non-recoverable
    /// split (spec §7).
    pub fn is_recoverable(&self) -> bool {
        match self {
            CoreError::Database(_) => true,
            CoreError::Io(_) => true,
            CoreError::Transcode(e) => e.is_recoverable(),
            CoreError::Analysis(_) => false,
            CoreError::InvalidState(_) => false,
            CoreError::NotFound(_) => false,
            CoreError::Json(_) => false,
            CoreError::Zip(_) => false,
            CoreError::Image(_) => false,
            CoreError::Config(_) => false,
        }
    }
}

pub type CoreResult<T> = Result<T, CoreError>;
