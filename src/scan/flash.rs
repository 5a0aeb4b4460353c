//! "Barcode detected" indicator with a reset timer

use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;

/// Lit on a detection, dark again once `window` passes without another one
///
/// Repeated detections inside the window re-arm the timer but do not
/// publish again.
pub struct DetectionFlash {
    window: Duration,
    lit_tx: watch::Sender<bool>,
    reset: Mutex<Option<JoinHandle<()>>>,
}

impl DetectionFlash {
    pub fn new(window: Duration) -> Self {
        let (lit_tx, _) = watch::channel(false);
        Self {
            window,
            lit_tx,
            reset: Mutex::new(None),
        }
    }

    /// Light the indicator and restart the reset timer
    ///
    /// Returns true when the indicator was dark before. Must run inside a
    /// tokio runtime.
    pub fn trigger(&self) -> bool {
        let newly_lit = self.lit_tx.send_if_modified(|lit| {
            if *lit {
                false
            } else {
                *lit = true;
                true
            }
        });

        let lit_tx = self.lit_tx.clone();
        let window = self.window;
        let timer = tokio::spawn(async move {
            tokio::time::sleep(window).await;
            lit_tx.send_replace(false);
        });

        let mut reset = self.reset.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(previous) = reset.replace(timer) {
            previous.abort();
        }
        newly_lit
    }

    /// Turn the indicator off and cancel a pending reset
    pub fn clear(&self) {
        let mut reset = self.reset.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(timer) = reset.take() {
            timer.abort();
        }
        self.lit_tx.send_if_modified(|lit| std::mem::replace(lit, false));
    }

    pub fn is_lit(&self) -> bool {
        *self.lit_tx.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.lit_tx.subscribe()
    }
}

impl Drop for DetectionFlash {
    fn drop(&mut self) {
        if let Some(timer) = self.reset.get_mut().ok().and_then(Option::take) {
            timer.abort();
        }
    }
}
