//! Configuration handling for scanfind

use std::path::PathBuf;
use std::time::Duration;

use crate::scan::BarcodeFormat;

/// Output format for search results
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutputFormat {
    #[default]
    Terminal,
    Json,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "terminal" => Ok(OutputFormat::Terminal),
            "json" => Ok(OutputFormat::Json),
            _ => Err(format!("Unknown output format: {}", s)),
        }
    }
}

/// What happens to already loaded data when a new load fails
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum IngestPolicy {
    /// Clear the store before parsing; a failed load leaves it empty
    #[default]
    ClearFirst,
    /// Keep the previous dataset until the new one parsed successfully
    PreserveOnFailure,
}

impl std::str::FromStr for IngestPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "clear-first" | "clear" => Ok(IngestPolicy::ClearFirst),
            "preserve" | "preserve-on-failure" => Ok(IngestPolicy::PreserveOnFailure),
            _ => Err(format!("Unknown ingest policy: {}", s)),
        }
    }
}

/// Configuration for lookup sessions
#[derive(Debug, Clone)]
pub struct Config {
    /// Path to the delimited data file
    pub file: PathBuf,
    /// Maximum number of matches returned for a typed query
    pub result_limit: usize,
    /// Typed queries shorter than this reset the results instead of searching
    pub min_query_len: usize,
    /// Quiet period before a typed query is searched
    pub debounce: Duration,
    /// How long the "barcode detected" indicator stays lit
    pub detection_flash: Duration,
    /// Behaviour of a failed load towards previously loaded data
    pub ingest_policy: IngestPolicy,
    /// Output format
    pub output_format: OutputFormat,
    /// Symbologies the detector looks for
    pub barcode_formats: Vec<BarcodeFormat>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            file: PathBuf::new(),
            result_limit: 10,
            min_query_len: 3,
            debounce: Duration::from_millis(300),
            detection_flash: Duration::from_secs(2),
            ingest_policy: IngestPolicy::default(),
            output_format: OutputFormat::default(),
            barcode_formats: BarcodeFormat::defaults(),
        }
    }
}

impl Config {
    /// Create a new Config for a data file
    pub fn new(file: PathBuf) -> Self {
        Self {
            file,
            ..Default::default()
        }
    }

    /// Set the result limit for typed queries
    pub fn with_result_limit(mut self, limit: usize) -> Self {
        self.result_limit = limit;
        self
    }

    /// Set the minimum typed query length
    pub fn with_min_query_len(mut self, len: usize) -> Self {
        self.min_query_len = len;
        self
    }

    /// Set the typed input quiet period
    pub fn with_debounce(mut self, debounce: Duration) -> Self {
        self.debounce = debounce;
        self
    }

    /// Set how long a detection stays flagged
    pub fn with_detection_flash(mut self, flash: Duration) -> Self {
        self.detection_flash = flash;
        self
    }

    /// Set the ingest policy
    pub fn with_ingest_policy(mut self, policy: IngestPolicy) -> Self {
        self.ingest_policy = policy;
        self
    }

    /// Set output format
    pub fn with_output_format(mut self, format: OutputFormat) -> Self {
        self.output_format = format;
        self
    }

    /// Set the barcode symbologies to detect
    pub fn with_barcode_formats(mut self, formats: Vec<BarcodeFormat>) -> Self {
        self.barcode_formats = formats;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.result_limit, 10);
        assert_eq!(config.min_query_len, 3);
        assert_eq!(config.debounce, Duration::from_millis(300));
        assert_eq!(config.detection_flash, Duration::from_secs(2));
        assert_eq!(config.ingest_policy, IngestPolicy::ClearFirst);
        assert_eq!(config.barcode_formats.len(), 7);
    }

    #[test]
    fn test_parse_enums() {
        assert_eq!("JSON".parse::<OutputFormat>(), Ok(OutputFormat::Json));
        assert!("html".parse::<OutputFormat>().is_err());
        assert_eq!(
            "preserve".parse::<IngestPolicy>(),
            Ok(IngestPolicy::PreserveOnFailure)
        );
    }
}
