//! Coalescing of rapid input values

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant};
use tracing::trace;

/// Forwards only the latest value after `delay` of quiet
///
/// Every new value restarts the timer. When the input side closes, a value
/// still waiting is flushed immediately.
pub struct Debouncer<T> {
    input_tx: mpsc::UnboundedSender<T>,
    task: JoinHandle<()>,
}

impl<T: Send + 'static> Debouncer<T> {
    /// Spawn the debounce loop; must run inside a tokio runtime
    pub fn spawn(delay: Duration, output: mpsc::UnboundedSender<T>) -> Self {
        let (input_tx, input_rx) = mpsc::unbounded_channel();
        let task = tokio::spawn(debounce_loop(delay, input_rx, output));
        Self { input_tx, task }
    }

    /// Offer a new value; false once the loop has exited
    pub fn push(&self, value: T) -> bool {
        self.input_tx.send(value).is_ok()
    }

    /// Close the input, flush any pending value and wait for the loop
    pub async fn finish(self) {
        drop(self.input_tx);
        let _ = self.task.await;
    }
}

struct DebounceState<T> {
    delay: Duration,
    pending: Option<T>,
    deadline: Option<Instant>,
}

impl<T> DebounceState<T> {
    fn new(delay: Duration) -> Self {
        Self {
            delay,
            pending: None,
            deadline: None,
        }
    }

    fn record(&mut self, value: T) {
        self.pending = Some(value);
        self.deadline = Some(Instant::now() + self.delay);
    }

    fn take(&mut self) -> Option<T> {
        self.deadline = None;
        self.pending.take()
    }
}

async fn debounce_loop<T>(
    delay: Duration,
    mut input_rx: mpsc::UnboundedReceiver<T>,
    output: mpsc::UnboundedSender<T>,
) {
    let mut state = DebounceState::new(delay);

    loop {
        let deadline = state.deadline;

        tokio::select! {
            received = input_rx.recv() => match received {
                Some(value) => {
                    trace!("input received, timer restarted");
                    state.record(value);
                }
                None => {
                    if let Some(value) = state.take() {
                        let _ = output.send(value);
                    }
                    break;
                }
            },
            () = async {
                if let Some(deadline) = deadline {
                    time::sleep_until(deadline).await;
                }
            }, if deadline.is_some() => {
                if let Some(value) = state.take() {
                    if output.send(value).is_err() {
                        break;
                    }
                }
            }
        }
    }
}
