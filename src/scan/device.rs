//! Camera and detector seams used by the scan loop

use std::ops::{Deref, DerefMut};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Barcode symbologies a detector can be asked to recognize
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BarcodeFormat {
    #[serde(rename = "code_39")]
    Code39,
    #[serde(rename = "code_128")]
    Code128,
    #[serde(rename = "ean_13")]
    Ean13,
    #[serde(rename = "ean_8")]
    Ean8,
    #[serde(rename = "upc_a")]
    UpcA,
    #[serde(rename = "upc_e")]
    UpcE,
    #[serde(rename = "qr_code")]
    QrCode,
}

impl BarcodeFormat {
    /// Formats enabled when nothing else is configured
    pub fn defaults() -> Vec<BarcodeFormat> {
        vec![
            BarcodeFormat::Code39,
            BarcodeFormat::Code128,
            BarcodeFormat::Ean13,
            BarcodeFormat::Ean8,
            BarcodeFormat::UpcA,
            BarcodeFormat::UpcE,
            BarcodeFormat::QrCode,
        ]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            BarcodeFormat::Code39 => "code_39",
            BarcodeFormat::Code128 => "code_128",
            BarcodeFormat::Ean13 => "ean_13",
            BarcodeFormat::Ean8 => "ean_8",
            BarcodeFormat::UpcA => "upc_a",
            BarcodeFormat::UpcE => "upc_e",
            BarcodeFormat::QrCode => "qr_code",
        }
    }
}

impl std::fmt::Display for BarcodeFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for BarcodeFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase().replace('-', "_");
        BarcodeFormat::defaults()
            .into_iter()
            .find(|f| f.as_str() == normalized)
            .ok_or_else(|| format!("Unknown barcode format: {}", s))
    }
}

/// Which way the camera should face
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Facing {
    /// Back camera
    #[default]
    Environment,
    /// Front camera
    User,
}

/// The surface a capture session renders into, plus its constraints
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureTarget {
    pub label: String,
    pub facing: Facing,
    pub ideal_width: u32,
    pub ideal_height: u32,
}

impl Default for CaptureTarget {
    fn default() -> Self {
        Self {
            label: "preview".to_string(),
            facing: Facing::Environment,
            ideal_width: 1280,
            ideal_height: 720,
        }
    }
}

impl CaptureTarget {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            ..Default::default()
        }
    }
}

/// One captured frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Position in the capture session, starting at 0
    pub sequence: u64,
    pub data: Vec<u8>,
}

impl Frame {
    pub fn new(sequence: u64, data: impl Into<Vec<u8>>) -> Self {
        Self {
            sequence,
            data: data.into(),
        }
    }
}

/// A code recognized in a frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetectedCode {
    pub raw_value: String,
    pub format: Option<BarcodeFormat>,
}

impl DetectedCode {
    pub fn new(raw_value: impl Into<String>) -> Self {
        Self {
            raw_value: raw_value.into(),
            format: None,
        }
    }
}

/// A capture device
#[async_trait]
pub trait Camera: Send + Sync {
    /// Whether the device can be opened at all
    fn is_available(&self) -> bool;

    /// Acquire the device; fails with `CameraAccess`
    async fn open(&self, target: &CaptureTarget) -> Result<Box<dyn FrameSource>>;
}

/// An acquired capture stream
#[async_trait]
pub trait FrameSource: Send {
    /// Wait for the next frame; `None` once the source has run out
    ///
    /// An error ends the capture session as a failure.
    async fn next_frame(&mut self) -> Result<Option<Frame>>;

    /// Release the underlying device
    fn release(&mut self);
}

/// Recognizes codes in frames
#[async_trait]
pub trait Detector: Send + Sync {
    /// Formats this detector recognizes
    fn formats(&self) -> Vec<BarcodeFormat>;

    /// Analyze one frame; errors are transient and per frame
    async fn detect(&self, frame: &Frame) -> Result<Vec<DetectedCode>>;
}

/// Owns an acquired source and releases it when dropped
pub(crate) struct SourceGuard(Box<dyn FrameSource>);

impl SourceGuard {
    pub(crate) fn new(source: Box<dyn FrameSource>) -> Self {
        Self(source)
    }
}

impl Deref for SourceGuard {
    type Target = dyn FrameSource;

    fn deref(&self) -> &Self::Target {
        self.0.as_ref()
    }
}

impl DerefMut for SourceGuard {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.0.as_mut()
    }
}

impl Drop for SourceGuard {
    fn drop(&mut self) {
        self.0.release();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_names() {
        assert_eq!(BarcodeFormat::Ean13.to_string(), "ean_13");
        assert_eq!("QR-CODE".parse::<BarcodeFormat>(), Ok(BarcodeFormat::QrCode));
        assert_eq!("upc_e".parse::<BarcodeFormat>(), Ok(BarcodeFormat::UpcE));
        assert!("aztec".parse::<BarcodeFormat>().is_err());
    }

    #[test]
    fn test_format_serde() {
        let json = serde_json::to_string(&BarcodeFormat::Code128).unwrap();
        assert_eq!(json, "\"code_128\"");
    }

    #[test]
    fn test_default_target_prefers_back_camera() {
        let target = CaptureTarget::default();
        assert_eq!(target.facing, Facing::Environment);
        assert_eq!((target.ideal_width, target.ideal_height), (1280, 720));
    }
}
