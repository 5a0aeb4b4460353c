//! Camera-driven scan loop feeding detected codes into the query path
//!
//! A session moves `Idle -> Starting -> Active -> Idle`, or straight back to
//! `Idle` when the camera cannot be acquired. While active, every decoded
//! code is published as a [`ScanEvent::Detected`] and forwarded as an exact
//! query; the loop keeps running until [`ScanLoop::stop`] is called or the
//! capture source runs out or fails. Only a failure publishes
//! [`ScanEvent::Failed`]; errors analysing a single frame are logged and
//! skipped.

pub mod capability;
mod device;
mod flash;
mod line;

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::{broadcast, mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::error::{LookupError, Result};
use crate::search::QueryRequest;

pub use capability::ScanCapability;
pub use device::{
    BarcodeFormat, Camera, CaptureTarget, DetectedCode, Detector, Facing, Frame, FrameSource,
};
pub use flash::DetectionFlash;
pub use line::{LineCamera, LineDetector, LineFrames};

use device::SourceGuard;

const EVENT_CAPACITY: usize = 64;

/// Lifecycle of the scan loop
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ScanState {
    #[default]
    Idle,
    Starting,
    Active,
}

/// A decoded value published by the scan loop
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Detection {
    pub value: String,
    pub format: Option<BarcodeFormat>,
    /// Sequence number of the frame the code was found in
    pub frame: u64,
    pub detected_at: DateTime<Utc>,
}

/// Notifications from the scan loop
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanEvent {
    Detected(Detection),
    /// Camera acquisition or capture failed; the loop is idle again
    Failed(String),
}

/// Start/stop controller around one camera and one detector
///
/// Cheap to clone; clones control the same loop.
#[derive(Clone)]
pub struct ScanLoop {
    inner: Arc<ScanInner>,
}

struct ScanInner {
    camera: Arc<dyn Camera>,
    detector: Arc<dyn Detector>,
    capability: ScanCapability,
    state_tx: watch::Sender<ScanState>,
    event_tx: broadcast::Sender<ScanEvent>,
    flash: DetectionFlash,
    session: Mutex<Session>,
}

#[derive(Default)]
struct Session {
    /// Bumped on every start and stop; a task only acts for its own epoch
    epoch: u64,
    task: Option<JoinHandle<()>>,
    query_sink: Option<mpsc::UnboundedSender<QueryRequest>>,
}

impl ScanLoop {
    pub fn new(
        camera: Arc<dyn Camera>,
        detector: Arc<dyn Detector>,
        capability: ScanCapability,
        flash_window: Duration,
    ) -> Self {
        let (state_tx, _) = watch::channel(ScanState::Idle);
        let (event_tx, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            inner: Arc::new(ScanInner {
                camera,
                detector,
                capability,
                state_tx,
                event_tx,
                flash: DetectionFlash::new(flash_window),
                session: Mutex::new(Session::default()),
            }),
        }
    }

    /// Forward every detection as an exact query into `sink`
    pub fn connect_queries(&self, sink: mpsc::UnboundedSender<QueryRequest>) {
        self.inner.lock_session().query_sink = Some(sink);
    }

    pub fn disconnect_queries(&self) {
        self.inner.lock_session().query_sink = None;
    }

    pub fn is_supported(&self) -> bool {
        self.inner.capability.supported
    }

    pub fn capability(&self) -> &ScanCapability {
        &self.inner.capability
    }

    pub fn state(&self) -> ScanState {
        *self.inner.state_tx.borrow()
    }

    pub fn is_active(&self) -> bool {
        self.state() == ScanState::Active
    }

    /// Watch state transitions
    pub fn state_stream(&self) -> watch::Receiver<ScanState> {
        self.inner.state_tx.subscribe()
    }

    /// Subscribe to detections and failures; drop the receiver to unsubscribe
    pub fn subscribe(&self) -> broadcast::Receiver<ScanEvent> {
        self.inner.event_tx.subscribe()
    }

    /// Watch the "barcode detected" indicator
    pub fn flash_stream(&self) -> watch::Receiver<bool> {
        self.inner.flash.subscribe()
    }

    /// Start a capture session from `Idle`
    ///
    /// Returns as soon as the session is `Starting`; acquisition failures
    /// arrive as [`ScanEvent::Failed`]. Must run inside a tokio runtime.
    pub fn start(&self, target: CaptureTarget) -> Result<()> {
        if !self.inner.capability.supported {
            return Err(LookupError::ScanUnsupported);
        }

        let mut session = self.inner.lock_session();
        if *self.inner.state_tx.borrow() != ScanState::Idle {
            return Err(LookupError::ScanAlreadyRunning);
        }

        session.epoch += 1;
        let epoch = session.epoch;
        self.inner.state_tx.send_replace(ScanState::Starting);
        self.inner.flash.clear();

        let inner = Arc::clone(&self.inner);
        session.task = Some(tokio::spawn(run_session(inner, epoch, target)));
        info!(epoch, "scanner starting");
        Ok(())
    }

    /// Stop scanning and release the camera; a no-op when already idle
    ///
    /// Once this returns no further detection from the stopped session is
    /// published or forwarded.
    pub async fn stop(&self) {
        let task = {
            let mut session = self.inner.lock_session();
            session.epoch += 1;
            self.inner.state_tx.send_if_modified(|state| {
                std::mem::replace(state, ScanState::Idle) != ScanState::Idle
            });
            session.task.take()
        };
        self.inner.flash.clear();

        if let Some(task) = task {
            task.abort();
            // Wait for the aborted task so the frame source is dropped and released
            let _ = task.await;
            info!("scanner stopped");
        }
    }
}

impl ScanInner {
    fn lock_session(&self) -> MutexGuard<'_, Session> {
        self.session.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Move a live session to `state`; false if the session was stopped
    fn advance(&self, epoch: u64, state: ScanState) -> bool {
        let session = self.lock_session();
        if session.epoch != epoch {
            return false;
        }
        self.state_tx.send_replace(state);
        true
    }

    /// End a session from inside its own task, reporting `failure` if any
    fn end(&self, epoch: u64, failure: Option<&LookupError>) {
        let mut session = self.lock_session();
        if session.epoch != epoch {
            return;
        }
        session.task = None;
        self.state_tx.send_replace(ScanState::Idle);
        self.flash.clear();
        if let Some(err) = failure {
            let _ = self.event_tx.send(ScanEvent::Failed(err.to_string()));
        }
    }

    /// Publish a detection and forward it as a query, unless the session ended
    fn emit(&self, epoch: u64, frame: u64, code: DetectedCode) -> bool {
        let session = self.lock_session();
        if session.epoch != epoch {
            return false;
        }

        info!(value = %code.raw_value, frame, "barcode detected");
        self.flash.trigger();
        if let Some(sink) = &session.query_sink {
            if sink.send(QueryRequest::scanned(code.raw_value.clone())).is_err() {
                warn!("query path closed, dropping scanned value");
            }
        }
        let _ = self.event_tx.send(ScanEvent::Detected(Detection {
            value: code.raw_value,
            format: code.format,
            frame,
            detected_at: Utc::now(),
        }));
        true
    }
}

async fn run_session(inner: Arc<ScanInner>, epoch: u64, target: CaptureTarget) {
    let source = match inner.camera.open(&target).await {
        Ok(source) => source,
        Err(err) => {
            error!(%err, "camera access failed");
            inner.end(epoch, Some(&err));
            return;
        }
    };
    let mut source = SourceGuard::new(source);

    if !inner.advance(epoch, ScanState::Active) {
        return;
    }
    info!(target = %target.label, "scanner active");

    loop {
        let next = source.next_frame().await;
        let frame = match next {
            Ok(Some(frame)) => frame,
            Ok(None) => {
                info!("scanner input ended");
                drop(source);
                inner.end(epoch, None);
                return;
            }
            Err(err) => {
                error!(%err, "capture failed, stopping scanner");
                drop(source);
                inner.end(epoch, Some(&err));
                return;
            }
        };

        match inner.detector.detect(&frame).await {
            Ok(codes) => {
                if let Some(code) = codes.into_iter().next() {
                    if !inner.emit(epoch, frame.sequence, code) {
                        return;
                    }
                }
            }
            Err(err) => warn!(%err, frame = frame.sequence, "barcode detection error"),
        }

        let live = inner.lock_session().epoch == epoch;
        if !live {
            return;
        }
        tokio::task::yield_now().await;
    }
}
