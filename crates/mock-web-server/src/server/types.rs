//! Type definitions for the mock web server.
//!
//! This module contains the value types that flow through the engine
//! (scripted responses, captured requests, dispatched responses) and the
//! error enum shared by every operation.

use chrono::{DateTime, Utc};
use hyper::HeaderMap;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;

/// Content type used when a response is enqueued without one.
pub const DEFAULT_CONTENT_TYPE: &str = "application/json";

/// Compatibility header carrying the same value as `Content-Type`.
pub const COMPAT_CONTENT_TYPE_HEADER: &str = "x-mockwebserver-content-type";

// ============================================================================
// Scripted Responses
// ============================================================================

/// A scripted response waiting in the queue.
///
/// Consumed exactly once, either by the listener or by the dispatcher.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueItem {
    pub status_code: u16,
    #[serde(default)]
    pub body: String,
    #[serde(default = "default_content_type")]
    pub content_type: String,
}

fn default_content_type() -> String {
    DEFAULT_CONTENT_TYPE.to_string()
}

impl QueueItem {
    /// Create a response with the default `application/json` content type
    pub fn new(status_code: u16, body: impl Into<String>) -> Self {
        Self {
            status_code,
            body: body.into(),
            content_type: default_content_type(),
        }
    }

    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = content_type.into();
        self
    }

    /// The two content-type headers written with every response.
    pub fn response_headers(&self) -> [(&'static str, &str); 2] {
        [
            ("content-type", self.content_type.as_str()),
            (COMPAT_CONTENT_TYPE_HEADER, self.content_type.as_str()),
        ]
    }
}

// ============================================================================
// Captured Requests
// ============================================================================

/// Ordered header multimap.
///
/// Names are stored lowercased in first-seen order; each name keeps all of
/// its values in arrival order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestHeaders {
    entries: Vec<(String, Vec<String>)>,
}

impl RequestHeaders {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a value under `name`, keeping earlier values.
    pub fn append(&mut self, name: impl AsRef<str>, value: impl Into<String>) {
        let name = name.as_ref().to_ascii_lowercase();
        match self.entries.iter_mut().find(|(k, _)| *k == name) {
            Some((_, values)) => values.push(value.into()),
            None => self.entries.push((name, vec![value.into()])),
        }
    }

    /// First value for `name`, case-insensitive.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.get_all(name).first().map(String::as_str)
    }

    pub fn get_all(&self, name: &str) -> &[String] {
        self.entries
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, values)| values.as_slice())
            .unwrap_or(&[])
    }

    pub fn contains(&self, name: &str) -> bool {
        !self.get_all(name).is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.entries
            .iter()
            .map(|(k, values)| (k.as_str(), values.as_slice()))
    }

    /// Number of distinct header names
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl From<&HeaderMap> for RequestHeaders {
    fn from(map: &HeaderMap) -> Self {
        let mut headers = RequestHeaders::new();
        for name in map.keys() {
            for value in map.get_all(name) {
                headers.append(name.as_str(), String::from_utf8_lossy(value.as_bytes()));
            }
        }
        headers
    }
}

impl<K: AsRef<str>, V: Into<String>> FromIterator<(K, V)> for RequestHeaders {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut headers = RequestHeaders::new();
        for (k, v) in iter {
            headers.append(k, v);
        }
        headers
    }
}

/// Immutable record of one inbound request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CapturedRequest {
    pub method: String,
    /// Request target as sent by the client (path and query)
    pub uri: String,
    pub headers: RequestHeaders,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remote_addr: Option<SocketAddr>,
    pub received_at: DateTime<Utc>,
}

impl CapturedRequest {
    /// Build a request value by hand, e.g. for the dispatcher.
    pub fn new(method: impl Into<String>, uri: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            uri: uri.into(),
            headers: RequestHeaders::new(),
            remote_addr: None,
            received_at: Utc::now(),
        }
    }

    pub fn with_header(mut self, name: impl AsRef<str>, value: impl Into<String>) -> Self {
        self.headers.append(name, value);
        self
    }

    /// Capture method, target and headers from an incoming request head.
    pub fn from_parts(parts: &hyper::http::request::Parts, remote_addr: Option<SocketAddr>) -> Self {
        let uri = parts
            .uri
            .path_and_query()
            .map(|pq| pq.as_str().to_string())
            .unwrap_or_else(|| parts.uri.to_string());
        Self {
            method: parts.method.to_string(),
            uri,
            headers: RequestHeaders::from(&parts.headers),
            remote_addr,
            received_at: Utc::now(),
        }
    }

    /// Path component of the target, without the query string.
    pub fn path(&self) -> &str {
        self.uri.split('?').next().unwrap_or("")
    }
}

// ============================================================================
// Dispatched Responses
// ============================================================================

/// Response produced by the dispatcher, tied to the request it answers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MockResponse {
    pub request: CapturedRequest,
    pub status_code: u16,
    pub headers: RequestHeaders,
    pub body: String,
}

impl MockResponse {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name)
    }
}

// ============================================================================
// Errors
// ============================================================================

/// Errors raised by the mock web server
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MockServerError {
    #[error("No response queued; enqueue a response before issuing the request")]
    EmptyResponseQueue,
    #[error("No captured request to take")]
    EmptyRequestLedger,
    #[error("No captured request headers to take")]
    EmptyRequestHeaders,
    #[error("Expected {expected} captured requests but found {actual}")]
    RequestCountMismatch { expected: usize, actual: usize },
    #[error("Expected no more requests but found {method} {uri} ({remaining} unconsumed)")]
    UnconsumedRequests {
        method: String,
        uri: String,
        remaining: usize,
    },
    #[error("Status code {0} cannot be written on the wire")]
    InvalidStatusCode(u16),
    #[error("Content type {0:?} is not a valid header value")]
    InvalidContentType(String),
    #[error("Server is already running on port {0}")]
    AlreadyRunning(u16),
    #[error("Failed to bind {0}: {1}")]
    BindError(String, String),
}

pub type Result<T> = std::result::Result<T, MockServerError>;
