//! Live fan-out of observed requests.
//!
//! Every subscriber sees every request published after it subscribed, in
//! publish order. There is no replay: late subscribers miss earlier events.

use super::types::CapturedRequest;
use futures::Stream;
use tokio::sync::broadcast;
use tracing::{debug, warn};

/// Default number of undelivered events kept per subscriber
pub const DEFAULT_BROADCAST_CAPACITY: usize = 256;

/// Publish side of the request stream.
#[derive(Debug, Clone)]
pub struct RequestBroadcaster {
    tx: broadcast::Sender<CapturedRequest>,
}

impl RequestBroadcaster {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    /// Publish to current subscribers. Never blocks; with no subscribers the
    /// event is dropped.
    pub fn publish(&self, request: CapturedRequest) {
        match self.tx.send(request) {
            Ok(n) => debug!("Published request to {} subscriber(s)", n),
            Err(_) => debug!("No request subscribers, event dropped"),
        }
    }

    pub fn subscribe(&self) -> RequestSubscription {
        RequestSubscription {
            rx: self.tx.subscribe(),
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for RequestBroadcaster {
    fn default() -> Self {
        Self::new(DEFAULT_BROADCAST_CAPACITY)
    }
}

/// Receiving side handed to tests.
#[derive(Debug)]
pub struct RequestSubscription {
    rx: broadcast::Receiver<CapturedRequest>,
}

impl RequestSubscription {
    /// Wait for the next published request.
    ///
    /// Returns `None` once the broadcaster is gone. A subscriber that fell
    /// behind skips the overwritten events.
    pub async fn recv(&mut self) -> Option<CapturedRequest> {
        loop {
            match self.rx.recv().await {
                Ok(request) => return Some(request),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!("Request subscriber lagged, skipped {} event(s)", skipped);
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }

    /// Next request if one is already waiting.
    pub fn try_recv(&mut self) -> Option<CapturedRequest> {
        loop {
            match self.rx.try_recv() {
                Ok(request) => return Some(request),
                Err(broadcast::error::TryRecvError::Lagged(skipped)) => {
                    warn!("Request subscriber lagged, skipped {} event(s)", skipped);
                }
                Err(_) => return None,
            }
        }
    }

    pub fn into_stream(self) -> impl Stream<Item = CapturedRequest> + Send + 'static {
        futures::stream::unfold(self, |mut sub| async move {
            let next = sub.recv().await?;
            Some((next, sub))
        })
    }
}
