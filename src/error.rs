//! Error types for loading, searching and scanning

use thiserror::Error;

/// Errors produced by the lookup core
#[derive(Error, Debug)]
pub enum LookupError {
    #[error("No rows to load")]
    EmptyInput,

    #[error("CSV file is empty")]
    EmptyFile,

    #[error("Failed to parse row {line}: {source}")]
    Parse {
        line: u64,
        #[source]
        source: csv::Error,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Unsupported file format: {0}")]
    UnsupportedFormat(String),

    #[error("Camera access failed: {0}")]
    CameraAccess(String),

    #[error("Frame analysis failed: {0}")]
    FrameAnalysis(String),

    #[error("Barcode scanning is not supported on this device")]
    ScanUnsupported,

    #[error("Scanner is already running")]
    ScanAlreadyRunning,
}

/// Result type alias for lookup operations
pub type Result<T> = std::result::Result<T, LookupError>;

impl LookupError {
    /// Whether the error should be shown to the user rather than only logged
    pub fn is_user_visible(&self) -> bool {
        !matches!(self, LookupError::FrameAnalysis(_))
    }

    pub(crate) fn parse(err: csv::Error) -> Self {
        let line = err.position().map(|p| p.line()).unwrap_or(0);
        LookupError::Parse { line, source: err }
    }
}
