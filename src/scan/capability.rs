//! Process-wide scanner capability, probed once at startup

use once_cell::sync::OnceCell;
use tracing::info;

use super::device::{BarcodeFormat, Camera, Detector};

static CAPABILITY: OnceCell<ScanCapability> = OnceCell::new();

/// What the scanner backend can do on this machine
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanCapability {
    pub supported: bool,
    pub formats: Vec<BarcodeFormat>,
}

impl ScanCapability {
    /// Inspect a camera/detector pair without caching the answer
    pub fn inspect(camera: &dyn Camera, detector: &dyn Detector) -> Self {
        let formats = detector.formats();
        Self {
            supported: camera.is_available() && !formats.is_empty(),
            formats,
        }
    }

    pub fn unsupported() -> Self {
        Self {
            supported: false,
            formats: Vec::new(),
        }
    }
}

/// Probe the backend on first call and cache the result
///
/// Later calls return the cached value and ignore their arguments.
pub fn probe(camera: &dyn Camera, detector: &dyn Detector) -> &'static ScanCapability {
    CAPABILITY.get_or_init(|| {
        let capability = ScanCapability::inspect(camera, detector);
        info!(
            supported = capability.supported,
            formats = capability.formats.len(),
            "probed barcode scanner"
        );
        capability
    })
}

/// Whether a probed scanner is usable; false before the first probe
pub fn is_supported() -> bool {
    CAPABILITY.get().map(|c| c.supported).unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Result;
    use crate::scan::device::{CaptureTarget, DetectedCode, Frame, FrameSource};
    use async_trait::async_trait;

    struct NoCamera;

    #[async_trait]
    impl Camera for NoCamera {
        fn is_available(&self) -> bool {
            false
        }

        async fn open(&self, _target: &CaptureTarget) -> Result<Box<dyn FrameSource>> {
            Err(crate::LookupError::CameraAccess("no device".into()))
        }
    }

    struct AllFormats;

    #[async_trait]
    impl Detector for AllFormats {
        fn formats(&self) -> Vec<BarcodeFormat> {
            BarcodeFormat::defaults()
        }

        async fn detect(&self, _frame: &Frame) -> Result<Vec<DetectedCode>> {
            Ok(Vec::new())
        }
    }

    #[test]
    fn test_inspect_requires_camera() {
        let capability = ScanCapability::inspect(&NoCamera, &AllFormats);
        assert!(!capability.supported);
        assert_eq!(capability.formats.len(), 7);
    }

    #[test]
    fn test_probe_is_cached() {
        let first = probe(&NoCamera, &AllFormats);
        let second = probe(&NoCamera, &AllFormats);
        assert!(std::ptr::eq(first, second));
        assert!(!is_supported());
    }
}
