//! Core MockWebServer struct and implementation.
//!
//! The server owns the journal (response queue, request ledger and the
//! listener failure log) behind one mutex, the request broadcaster, and the
//! lifecycle state of the listener task.

use super::broadcast::{RequestBroadcaster, RequestSubscription};
use super::dispatcher::dispatch;
use super::listener::serve;
use super::queue::{RequestLedger, ResponseQueue};
use super::types::{
    CapturedRequest, MockResponse, MockServerError, QueueItem, RequestHeaders, Result,
};
use crate::config::ServerConfig;
use parking_lot::Mutex;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Everything that must be mutated under the single ordering lock
#[derive(Debug, Default)]
struct Journal {
    queue: ResponseQueue,
    ledger: RequestLedger,
    failures: Vec<MockServerError>,
}

/// State shared between the listener task and the test-facing API
#[derive(Debug)]
pub struct SharedState {
    journal: Mutex<Journal>,
    broadcaster: RequestBroadcaster,
}

impl SharedState {
    pub(super) fn new(broadcast_capacity: usize) -> Self {
        Self {
            journal: Mutex::new(Journal::default()),
            broadcaster: RequestBroadcaster::new(broadcast_capacity),
        }
    }

    pub(super) fn capture(&self, request: CapturedRequest) {
        self.journal.lock().ledger.append(request);
    }

    pub(super) fn pop_response(&self) -> Result<QueueItem> {
        self.journal.lock().queue.pop_next()
    }

    pub(super) fn record_failure(&self, error: MockServerError) {
        self.journal.lock().failures.push(error);
    }

    pub(super) fn broadcaster(&self) -> &RequestBroadcaster {
        &self.broadcaster
    }

    fn reset(&self) {
        let mut journal = self.journal.lock();
        journal.queue.clear();
        journal.ledger.clear();
        journal.failures.clear();
    }
}

/// Handle to a running listener task
struct RunningListener {
    addr: SocketAddr,
    shutdown_tx: broadcast::Sender<()>,
    handle: JoinHandle<()>,
}

enum Lifecycle {
    Stopped,
    Running(RunningListener),
}

/// Scriptable HTTP test double.
///
/// Responses are served in the order they were enqueued; every request that
/// reaches the listener is recorded and published before its response is
/// produced.
pub struct MockWebServer {
    config: ServerConfig,
    state: Arc<SharedState>,
    lifecycle: Mutex<Lifecycle>,
}

impl MockWebServer {
    /// Create a stopped server with the default configuration
    pub fn new() -> Self {
        Self::with_config(ServerConfig::default())
    }

    pub fn with_config(config: ServerConfig) -> Self {
        let state = Arc::new(SharedState::new(config.broadcast_capacity));
        Self {
            config,
            state,
            lifecycle: Mutex::new(Lifecycle::Stopped),
        }
    }

    // ------------------------------------------------------------------
    // Lifecycle
    // ------------------------------------------------------------------

    /// Bind and start serving.
    ///
    /// `port` overrides the configured port; `None` or `Some(0)` with no
    /// configured port binds an ephemeral one. Returns the bound port.
    pub async fn start(&self, port: Option<u16>) -> Result<u16> {
        if let Some(bound) = self.port() {
            return Err(MockServerError::AlreadyRunning(bound));
        }

        let port = port.or(self.config.port).unwrap_or(0);
        let bind_addr = SocketAddr::new(self.config.host, port);
        let listener = TcpListener::bind(bind_addr)
            .await
            .map_err(|e| MockServerError::BindError(bind_addr.to_string(), e.to_string()))?;
        let addr = listener
            .local_addr()
            .map_err(|e| MockServerError::BindError(bind_addr.to_string(), e.to_string()))?;

        let (shutdown_tx, shutdown_rx) = broadcast::channel(1);

        let mut lifecycle = self.lifecycle.lock();
        if let Lifecycle::Running(ref running) = *lifecycle {
            // Lost a race with a concurrent start; our listener is dropped unused
            return Err(MockServerError::AlreadyRunning(running.addr.port()));
        }

        for item in &self.config.responses {
            self.enqueue_item(item.clone());
        }

        let handle = tokio::spawn(serve(listener, Arc::clone(&self.state), shutdown_rx));
        *lifecycle = Lifecycle::Running(RunningListener {
            addr,
            shutdown_tx,
            handle,
        });

        info!("Mock server listening on http://{}", addr);
        Ok(addr.port())
    }

    /// Stop serving and reset all state.
    ///
    /// Open connections are closed immediately rather than drained. The
    /// response queue, request ledger and failure log are cleared even when
    /// the server was not running.
    pub async fn shutdown(&self) {
        let previous = std::mem::replace(&mut *self.lifecycle.lock(), Lifecycle::Stopped);
        if let Lifecycle::Running(running) = previous {
            let _ = running.shutdown_tx.send(());
            if let Err(e) = running.handle.await {
                warn!("Listener task on {} ended abnormally: {}", running.addr, e);
            }
            info!("Mock server on {} stopped", running.addr);
        }
        self.state.reset();
    }

    #[cfg(test)]
    pub(super) fn shared_state(&self) -> Arc<SharedState> {
        Arc::clone(&self.state)
    }

    pub fn is_running(&self) -> bool {
        matches!(*self.lifecycle.lock(), Lifecycle::Running(_))
    }

    /// Bound port, or `None` while stopped
    pub fn port(&self) -> Option<u16> {
        self.local_addr().map(|addr| addr.port())
    }

    fn local_addr(&self) -> Option<SocketAddr> {
        match *self.lifecycle.lock() {
            Lifecycle::Running(ref running) => Some(running.addr),
            Lifecycle::Stopped => None,
        }
    }

    /// Base URL clients should use, e.g. `http://127.0.0.1:49152`
    pub fn url(&self) -> Option<String> {
        let addr = self.local_addr()?;
        let host = if addr.ip().is_unspecified() {
            IpAddr::V4(Ipv4Addr::LOCALHOST)
        } else {
            addr.ip()
        };
        Some(format!("http://{}", SocketAddr::new(host, addr.port())))
    }

    /// Base URL joined with `path`
    pub fn url_for(&self, path: &str) -> Option<String> {
        let base = self.url()?;
        if path.starts_with('/') {
            Some(format!("{base}{path}"))
        } else {
            Some(format!("{base}/{path}"))
        }
    }

    // ------------------------------------------------------------------
    // Scripting responses
    // ------------------------------------------------------------------

    /// Queue a response with the default `application/json` content type
    pub fn enqueue(&self, status_code: u16, body: impl Into<String>) {
        self.enqueue_item(QueueItem::new(status_code, body));
    }

    pub fn enqueue_with_content_type(
        &self,
        status_code: u16,
        body: impl Into<String>,
        content_type: impl Into<String>,
    ) {
        self.enqueue_item(QueueItem::new(status_code, body).with_content_type(content_type));
    }

    pub fn enqueue_item(&self, item: QueueItem) {
        debug!("Enqueued {} response", item.status_code);
        self.state.journal.lock().queue.enqueue(item);
    }

    /// Responses still waiting to be served
    pub fn queued_responses(&self) -> usize {
        self.state.journal.lock().queue.len()
    }

    /// Answer `request` from the queue without touching the network.
    pub fn dispatch_request(&self, request: CapturedRequest) -> Result<MockResponse> {
        dispatch(&self.state, request)
    }

    // ------------------------------------------------------------------
    // Captured requests
    // ------------------------------------------------------------------

    pub fn take_request(&self) -> Result<CapturedRequest> {
        self.state.journal.lock().ledger.take_next()
    }

    pub fn take_request_headers(&self) -> Result<RequestHeaders> {
        self.state.journal.lock().ledger.take_next_headers()
    }

    /// Requests captured and not yet taken
    pub fn request_count(&self) -> usize {
        self.state.journal.lock().ledger.count()
    }

    /// Subscribe to requests observed from now on.
    pub fn request_stream(&self) -> RequestSubscription {
        self.state.broadcaster.subscribe()
    }

    /// Drain failures the listener hit while answering requests.
    pub fn take_listener_failures(&self) -> Vec<MockServerError> {
        std::mem::take(&mut self.state.journal.lock().failures)
    }

    // ------------------------------------------------------------------
    // Verification
    // ------------------------------------------------------------------

    /// Fail unless exactly `expected` requests are in the ledger. Does not
    /// consume anything.
    pub fn verify_request_count(&self, expected: usize) -> Result<()> {
        let actual = self.request_count();
        if actual != expected {
            return Err(MockServerError::RequestCountMismatch { expected, actual });
        }
        Ok(())
    }

    /// Fail if any captured request is left, removing and reporting the
    /// oldest one.
    pub fn verify_no_more_requests(&self) -> Result<()> {
        let mut journal = self.state.journal.lock();
        let remaining = journal.ledger.count();
        match journal.ledger.take_next() {
            Ok(request) => Err(MockServerError::UnconsumedRequests {
                method: request.method,
                uri: request.uri,
                remaining,
            }),
            Err(_) => Ok(()),
        }
    }
}

impl Default for MockWebServer {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for MockWebServer {
    fn drop(&mut self) {
        if let Lifecycle::Running(ref running) = *self.lifecycle.get_mut() {
            let _ = running.shutdown_tx.send(());
            running.handle.abort();
        }
    }
}
