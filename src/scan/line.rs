//! Line-based scanner backend
//!
//! Hand-held USB and Bluetooth barcode scanners type the decoded value
//! followed by Enter. This backend treats each line of a reader as one
//! frame, and a non-blank line as one detected code.

use std::io::Cursor;
use std::path::PathBuf;

use async_trait::async_trait;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader, Lines};
use tracing::debug;

use crate::error::{LookupError, Result};

use super::device::{BarcodeFormat, Camera, CaptureTarget, DetectedCode, Detector, Frame, FrameSource};

/// Where scanned lines come from
#[derive(Debug, Clone)]
enum LineInput {
    Stdin,
    File(PathBuf),
    Bytes(Vec<u8>),
}

/// A "camera" reading one frame per input line
#[derive(Debug, Clone)]
pub struct LineCamera {
    input: LineInput,
}

impl LineCamera {
    /// Read scanned lines from standard input
    pub fn stdin() -> Self {
        Self {
            input: LineInput::Stdin,
        }
    }

    /// Replay scanned lines from a file
    pub fn file(path: impl Into<PathBuf>) -> Self {
        Self {
            input: LineInput::File(path.into()),
        }
    }

    /// Replay scanned lines from memory
    pub fn from_bytes(bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            input: LineInput::Bytes(bytes.into()),
        }
    }
}

#[async_trait]
impl Camera for LineCamera {
    fn is_available(&self) -> bool {
        match &self.input {
            LineInput::File(path) => path.is_file(),
            LineInput::Stdin | LineInput::Bytes(_) => true,
        }
    }

    async fn open(&self, target: &CaptureTarget) -> Result<Box<dyn FrameSource>> {
        debug!(target = %target.label, "opening line scanner");
        let source: Box<dyn FrameSource> = match &self.input {
            LineInput::Stdin => Box::new(LineFrames::new(BufReader::new(tokio::io::stdin()))),
            LineInput::File(path) => {
                let file = tokio::fs::File::open(path).await.map_err(|e| {
                    LookupError::CameraAccess(format!("{}: {}", path.display(), e))
                })?;
                Box::new(LineFrames::new(BufReader::new(file)))
            }
            LineInput::Bytes(bytes) => Box::new(LineFrames::new(Cursor::new(bytes.clone()))),
        };
        Ok(source)
    }
}

/// Frames read line by line from an async reader
pub struct LineFrames<R> {
    lines: Lines<R>,
    sequence: u64,
    released: bool,
}

impl<R: AsyncBufRead + Unpin> LineFrames<R> {
    pub fn new(reader: R) -> Self {
        Self {
            lines: reader.lines(),
            sequence: 0,
            released: false,
        }
    }
}

#[async_trait]
impl<R: AsyncBufRead + Unpin + Send> FrameSource for LineFrames<R> {
    async fn next_frame(&mut self) -> Result<Option<Frame>> {
        if self.released {
            return Err(LookupError::CameraAccess("scanner released".to_string()));
        }
        let line = self
            .lines
            .next_line()
            .await
            .map_err(|e| LookupError::CameraAccess(e.to_string()))?;

        Ok(line.map(|line| {
            let frame = Frame::new(self.sequence, line);
            self.sequence += 1;
            frame
        }))
    }

    fn release(&mut self) {
        self.released = true;
    }
}

/// Decodes a frame's text as a single code
pub struct LineDetector {
    formats: Vec<BarcodeFormat>,
}

impl LineDetector {
    pub fn new(formats: Vec<BarcodeFormat>) -> Self {
        Self { formats }
    }
}

impl Default for LineDetector {
    fn default() -> Self {
        Self::new(BarcodeFormat::defaults())
    }
}

#[async_trait]
impl Detector for LineDetector {
    fn formats(&self) -> Vec<BarcodeFormat> {
        self.formats.clone()
    }

    async fn detect(&self, frame: &Frame) -> Result<Vec<DetectedCode>> {
        let text = std::str::from_utf8(&frame.data).map_err(|e| {
            LookupError::FrameAnalysis(format!("frame {} is not text: {}", frame.sequence, e))
        })?;
        let value = text.trim();
        if value.is_empty() {
            return Ok(Vec::new());
        }
        Ok(vec![DetectedCode::new(value)])
    }
}
