//! Request/response orchestration for the mock web server.
//!
//! This module provides:
//! - `MockWebServer`: lifecycle, response scripting and request verification
//! - `ResponseQueue` / `RequestLedger`: the FIFO stores behind it
//! - `RequestBroadcaster`: live fan-out of observed requests
//!
//! ## Module Structure
//!
//! - `types`: Value types and the error enum
//! - `queue`: Response queue and request ledger
//! - `broadcast`: Request publish/subscribe
//! - `response`: Response building shared by listener and dispatcher
//! - `handler`: Per-request listener sequence
//! - `listener`: Accept loop and forced shutdown
//! - `dispatcher`: Answering requests without a socket
//! - `core`: `MockWebServer` itself

mod broadcast;
mod core;
mod dispatcher;
mod handler;
mod listener;
mod queue;
mod response;
mod types;


pub use broadcast::{RequestBroadcaster, RequestSubscription, DEFAULT_BROADCAST_CAPACITY};
pub use core::MockWebServer;
pub use queue::{RequestLedger, ResponseQueue};
pub use response::{build_http_response, build_mock_response};
pub use types::{
    CapturedRequest, MockResponse, MockServerError, QueueItem, RequestHeaders, Result,
    COMPAT_CONTENT_TYPE_HEADER, DEFAULT_CONTENT_TYPE,
};
