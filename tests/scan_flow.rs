use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{broadcast, Notify};
use tokio::time::timeout;

use scanfind::scan::{
    BarcodeFormat, Camera, CaptureTarget, DetectedCode, Detector, Frame, FrameSource, ScanCapability,
    ScanEvent, ScanLoop, ScanState,
};
use scanfind::{Config, LookupError, LookupService, SearchOutcome, Session};

const WAIT: Duration = Duration::from_secs(5);

/// Plays back a fixed list of frames, then waits forever or runs out
struct FakeCamera {
    frames: Vec<&'static str>,
    fail_open: bool,
    runs_out: bool,
    released: Arc<AtomicBool>,
}

impl FakeCamera {
    fn new(frames: Vec<&'static str>) -> Self {
        Self {
            frames,
            fail_open: false,
            runs_out: false,
            released: Arc::new(AtomicBool::new(false)),
        }
    }

    fn finite(frames: Vec<&'static str>) -> Self {
        Self {
            runs_out: true,
            ..Self::new(frames)
        }
    }

    fn denied() -> Self {
        Self {
            fail_open: true,
            ..Self::new(Vec::new())
        }
    }
}

#[async_trait]
impl Camera for FakeCamera {
    fn is_available(&self) -> bool {
        true
    }

    async fn open(&self, _target: &CaptureTarget) -> scanfind::Result<Box<dyn FrameSource>> {
        if self.fail_open {
            return Err(LookupError::CameraAccess("permission denied".into()));
        }
        Ok(Box::new(FakeFrames {
            frames: self.frames.iter().copied().collect(),
            runs_out: self.runs_out,
            sequence: 0,
            released: Arc::clone(&self.released),
        }))
    }
}

struct FakeFrames {
    frames: VecDeque<&'static str>,
    runs_out: bool,
    sequence: u64,
    released: Arc<AtomicBool>,
}

#[async_trait]
impl FrameSource for FakeFrames {
    async fn next_frame(&mut self) -> scanfind::Result<Option<Frame>> {
        match self.frames.pop_front() {
            Some(data) => {
                self.sequence += 1;
                Ok(Some(Frame::new(self.sequence, data)))
            }
            None if self.runs_out => Ok(None),
            None => std::future::pending().await,
        }
    }

    fn release(&mut self) {
        self.released.store(true, Ordering::SeqCst);
    }
}

/// Frame text is the code; "blur" and "glitch" fail, "hold" blocks until aborted
#[derive(Default)]
struct FakeDetector {
    entered_hold: Notify,
}

#[async_trait]
impl Detector for FakeDetector {
    fn formats(&self) -> Vec<BarcodeFormat> {
        BarcodeFormat::defaults()
    }

    async fn detect(&self, frame: &Frame) -> scanfind::Result<Vec<DetectedCode>> {
        let text = String::from_utf8_lossy(&frame.data).to_string();
        match text.as_str() {
            "" => Ok(Vec::new()),
            "blur" => Err(LookupError::FrameAnalysis("image too blurry".into())),
            "glitch" => Err(LookupError::Io(std::io::Error::other("decoder hiccup"))),
            "hold" => {
                self.entered_hold.notify_one();
                std::future::pending().await
            }
            _ => Ok(vec![DetectedCode::new(text), DetectedCode::new("ignored")]),
        }
    }
}

fn supported() -> ScanCapability {
    ScanCapability {
        supported: true,
        formats: BarcodeFormat::defaults(),
    }
}

fn scan_loop(camera: FakeCamera, detector: Arc<FakeDetector>) -> ScanLoop {
    ScanLoop::new(Arc::new(camera), detector, supported(), Duration::from_secs(2))
}

fn service() -> LookupService {
    let service = LookupService::default();
    service
        .load(b"id,Name,Price\n001,Widget,9.99\n0011,Widget XL,12.00\n002,Gadget,14.50\n")
        .unwrap();
    service
}

async fn next_event(events: &mut broadcast::Receiver<ScanEvent>) -> ScanEvent {
    timeout(WAIT, events.recv()).await.unwrap().unwrap()
}

async fn wait_for_state(scanner: &ScanLoop, wanted: ScanState) {
    let mut states = scanner.state_stream();
    timeout(WAIT, states.wait_for(|state| *state == wanted))
        .await
        .unwrap()
        .unwrap();
}

#[tokio::test]
async fn detection_runs_exact_query() {
    let scanner = scan_loop(FakeCamera::new(vec!["", "001"]), Arc::default());
    let session = Session::start(service(), &Config::default(), Some(scanner.clone()));
    let mut outcomes = session.outcomes();
    let mut events = session.detections().unwrap();

    session.scan_start(CaptureTarget::default()).unwrap();

    match next_event(&mut events).await {
        ScanEvent::Detected(detection) => {
            assert_eq!(detection.value, "001");
            assert_eq!(detection.frame, 2);
        }
        other => panic!("unexpected event {other:?}"),
    }

    match timeout(WAIT, outcomes.recv()).await.unwrap().unwrap() {
        SearchOutcome::Results { result, .. } => {
            assert_eq!(result.ids().collect::<Vec<_>>(), vec!["001"]);
        }
        other => panic!("unexpected outcome {other:?}"),
    }

    assert!(*scanner.flash_stream().borrow());
    assert_eq!(scanner.state(), ScanState::Active);
    session.shutdown().await;
    assert_eq!(scanner.state(), ScanState::Idle);
}

#[tokio::test]
async fn only_first_code_per_frame_is_used() {
    let scanner = scan_loop(FakeCamera::new(vec!["002"]), Arc::default());
    let mut events = scanner.subscribe();
    scanner.start(CaptureTarget::default()).unwrap();

    assert!(matches!(
        next_event(&mut events).await,
        ScanEvent::Detected(d) if d.value == "002"
    ));
    wait_for_state(&scanner, ScanState::Active).await;
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(events.try_recv().is_err());
    scanner.stop().await;
}

#[tokio::test]
async fn analysis_error_keeps_scanning() {
    let scanner = scan_loop(FakeCamera::new(vec!["blur", "002"]), Arc::default());
    let mut events = scanner.subscribe();
    scanner.start(CaptureTarget::default()).unwrap();

    assert!(matches!(
        next_event(&mut events).await,
        ScanEvent::Detected(d) if d.value == "002"
    ));
    assert_eq!(scanner.state(), ScanState::Active);
    scanner.stop().await;
}

#[tokio::test]
async fn any_detector_error_skips_only_that_frame() {
    let scanner = scan_loop(FakeCamera::new(vec!["glitch", "002"]), Arc::default());
    let mut events = scanner.subscribe();
    scanner.start(CaptureTarget::default()).unwrap();

    match next_event(&mut events).await {
        ScanEvent::Detected(detection) => {
            assert_eq!(detection.value, "002");
            assert_eq!(detection.frame, 2);
        }
        other => panic!("unexpected event {other:?}"),
    }
    assert_eq!(scanner.state(), ScanState::Active);
    scanner.stop().await;
}

#[tokio::test]
async fn end_of_input_stops_without_failure() {
    let camera = FakeCamera::finite(vec!["001"]);
    let released = Arc::clone(&camera.released);
    let scanner = scan_loop(camera, Arc::default());
    let mut events = scanner.subscribe();
    scanner.start(CaptureTarget::default()).unwrap();

    assert!(matches!(
        next_event(&mut events).await,
        ScanEvent::Detected(d) if d.value == "001"
    ));
    wait_for_state(&scanner, ScanState::Idle).await;
    assert!(released.load(Ordering::SeqCst));
    assert!(matches!(
        events.try_recv(),
        Err(broadcast::error::TryRecvError::Empty)
    ));

    // The scanner can be started again afterwards
    scanner.start(CaptureTarget::default()).unwrap();
    scanner.stop().await;
}

#[tokio::test]
async fn camera_failure_returns_to_idle() {
    let scanner = scan_loop(FakeCamera::denied(), Arc::default());
    let mut events = scanner.subscribe();
    scanner.start(CaptureTarget::default()).unwrap();

    match next_event(&mut events).await {
        ScanEvent::Failed(message) => assert!(message.contains("permission denied")),
        other => panic!("unexpected event {other:?}"),
    }
    assert_eq!(scanner.state(), ScanState::Idle);

    // A failed session can be retried
    scanner.start(CaptureTarget::default()).unwrap();
    assert!(matches!(next_event(&mut events).await, ScanEvent::Failed(_)));
}

#[tokio::test]
async fn stop_during_analysis_emits_nothing() {
    let camera = FakeCamera::new(vec!["hold"]);
    let released = Arc::clone(&camera.released);
    let detector = Arc::new(FakeDetector::default());
    let scanner = scan_loop(camera, Arc::clone(&detector));
    let mut events = scanner.subscribe();

    scanner.start(CaptureTarget::default()).unwrap();
    timeout(WAIT, detector.entered_hold.notified()).await.unwrap();

    scanner.stop().await;
    assert_eq!(scanner.state(), ScanState::Idle);
    assert!(released.load(Ordering::SeqCst));
    assert!(!*scanner.flash_stream().borrow());
    assert!(matches!(
        events.try_recv(),
        Err(broadcast::error::TryRecvError::Empty)
    ));
}

#[tokio::test]
async fn start_while_active_is_rejected() {
    let scanner = scan_loop(FakeCamera::new(Vec::new()), Arc::default());
    scanner.start(CaptureTarget::default()).unwrap();
    wait_for_state(&scanner, ScanState::Active).await;

    assert!(matches!(
        scanner.start(CaptureTarget::default()),
        Err(LookupError::ScanAlreadyRunning)
    ));
    assert_eq!(scanner.state(), ScanState::Active);
    scanner.stop().await;
}

#[tokio::test]
async fn unsubscribed_receiver_does_not_block_scanning() {
    let scanner = scan_loop(FakeCamera::new(vec!["001", "002"]), Arc::default());
    let dropped = scanner.subscribe();
    drop(dropped);
    let mut events = scanner.subscribe();
    scanner.start(CaptureTarget::default()).unwrap();

    assert!(matches!(next_event(&mut events).await, ScanEvent::Detected(d) if d.value == "001"));
    assert!(matches!(next_event(&mut events).await, ScanEvent::Detected(d) if d.value == "002"));
    scanner.stop().await;
}
