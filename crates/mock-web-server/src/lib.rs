//! In-process HTTP test double.
//!
//! Start a [`MockWebServer`], enqueue the responses the code under test
//! should receive, drive that code, then assert on what the server saw.

pub mod config;
pub mod metrics;
pub mod server;

pub use config::ServerConfig;
pub use server::{
    CapturedRequest, MockResponse, MockServerError, MockWebServer, QueueItem, RequestHeaders,
    RequestSubscription, Result,
};
