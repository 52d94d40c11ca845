//! FIFO stores backing the server: scripted responses and captured requests.
//!
//! Neither type locks on its own. Both live inside the server's single
//! journal mutex so that appends and pops are ordered with respect to each
//! other.

use super::types::{CapturedRequest, MockServerError, QueueItem, RequestHeaders, Result};
use std::collections::VecDeque;

/// Ordered queue of scripted responses.
#[derive(Debug, Default)]
pub struct ResponseQueue {
    items: VecDeque<QueueItem>,
}

impl ResponseQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append to the tail. Status codes are not validated here.
    pub fn enqueue(&mut self, item: QueueItem) {
        self.items.push_back(item);
    }

    /// Remove and return the head, failing instead of waiting when empty.
    pub fn pop_next(&mut self) -> Result<QueueItem> {
        self.items
            .pop_front()
            .ok_or(MockServerError::EmptyResponseQueue)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }
}

/// Ordered record of captured requests.
///
/// Requests and their header sets are popped through separate cursors:
/// taking a request does not consume its headers and vice versa.
#[derive(Debug, Default)]
pub struct RequestLedger {
    requests: VecDeque<CapturedRequest>,
    headers: VecDeque<RequestHeaders>,
}

impl RequestLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, request: CapturedRequest) {
        self.headers.push_back(request.headers.clone());
        self.requests.push_back(request);
    }

    pub fn take_next(&mut self) -> Result<CapturedRequest> {
        self.requests
            .pop_front()
            .ok_or(MockServerError::EmptyRequestLedger)
    }

    pub fn take_next_headers(&mut self) -> Result<RequestHeaders> {
        self.headers
            .pop_front()
            .ok_or(MockServerError::EmptyRequestHeaders)
    }

    /// Number of requests not yet taken
    pub fn count(&self) -> usize {
        self.requests.len()
    }

    /// Method and target of the oldest untaken request.
    pub fn peek_head_method_and_uri(&self) -> Option<(&str, &str)> {
        self.requests
            .front()
            .map(|r| (r.method.as_str(), r.uri.as_str()))
    }

    pub fn clear(&mut self) {
        self.requests.clear();
        self.headers.clear();
    }
}
