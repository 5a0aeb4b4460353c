//! Interactive lookup session
//!
//! Typed text, picked identifiers and scanned codes all end up as
//! [`QueryRequest`]s on one channel. A single pump task evaluates them in
//! arrival order and broadcasts the outcomes.

use tokio::sync::{broadcast, mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::config::Config;
use crate::error::{LookupError, Result};
use crate::input::Debouncer;
use crate::scan::{CaptureTarget, ScanEvent, ScanLoop, ScanState};
use crate::search::QueryRequest;
use crate::service::{LookupService, SearchOutcome};

const OUTCOME_CAPACITY: usize = 32;

pub struct Session {
    service: LookupService,
    query_tx: mpsc::UnboundedSender<QueryRequest>,
    debouncer: Debouncer<QueryRequest>,
    outcome_tx: broadcast::Sender<SearchOutcome>,
    pump: JoinHandle<()>,
    scanner: Option<ScanLoop>,
}

impl Session {
    /// Wire up input, scanner and search; must run inside a tokio runtime
    pub fn start(service: LookupService, config: &Config, scanner: Option<ScanLoop>) -> Self {
        let (query_tx, query_rx) = mpsc::unbounded_channel();
        let (outcome_tx, _) = broadcast::channel(OUTCOME_CAPACITY);

        let debouncer = Debouncer::spawn(config.debounce, query_tx.clone());
        if let Some(scanner) = &scanner {
            scanner.connect_queries(query_tx.clone());
        }

        let pump = tokio::spawn(pump_queries(
            service.clone(),
            query_rx,
            outcome_tx.clone(),
            config.result_limit,
            config.min_query_len,
        ));

        Self {
            service,
            query_tx,
            debouncer,
            outcome_tx,
            pump,
            scanner,
        }
    }

    pub fn service(&self) -> &LookupService {
        &self.service
    }

    /// Feed the current contents of the search field
    pub fn type_text(&self, text: impl Into<String>) {
        self.debouncer.push(QueryRequest::typed(text));
    }

    /// Show the details of an identifier picked from a result list
    pub fn select(&self, id: impl Into<String>) {
        let _ = self.query_tx.send(QueryRequest::selected(id));
    }

    /// Receive search outcomes from now on
    pub fn outcomes(&self) -> broadcast::Receiver<SearchOutcome> {
        self.outcome_tx.subscribe()
    }

    /// Receive scanner events, if a scanner is attached
    pub fn detections(&self) -> Option<broadcast::Receiver<ScanEvent>> {
        self.scanner.as_ref().map(ScanLoop::subscribe)
    }

    pub fn scan_state(&self) -> Option<watch::Receiver<ScanState>> {
        self.scanner.as_ref().map(ScanLoop::state_stream)
    }

    pub fn scan_start(&self, target: CaptureTarget) -> Result<()> {
        match &self.scanner {
            Some(scanner) => scanner.start(target),
            None => Err(LookupError::ScanUnsupported),
        }
    }

    pub async fn scan_stop(&self) {
        if let Some(scanner) = &self.scanner {
            scanner.stop().await;
        }
    }

    /// Stop scanning, flush pending input and wait until every queued query
    /// has been evaluated
    pub async fn shutdown(self) {
        if let Some(scanner) = &self.scanner {
            scanner.stop().await;
            scanner.disconnect_queries();
        }
        self.debouncer.finish().await;
        drop(self.query_tx);
        let _ = self.pump.await;
        info!("session closed");
    }
}

async fn pump_queries(
    service: LookupService,
    mut query_rx: mpsc::UnboundedReceiver<QueryRequest>,
    outcome_tx: broadcast::Sender<SearchOutcome>,
    limit: usize,
    min_query_len: usize,
) {
    while let Some(request) = query_rx.recv().await {
        debug!(query = %request.text, origin = ?request.origin, "evaluating query");
        let outcome = service.evaluate(&request, limit, min_query_len);
        let _ = outcome_tx.send(outcome);
    }
}
