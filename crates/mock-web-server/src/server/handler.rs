//! Request handling logic for the listener.
//!
//! Each inbound request runs the same sequence: capture into the ledger,
//! drain the body, publish to subscribers, pop the next scripted response
//! and write it back. An empty queue aborts the connection instead of
//! answering with a default.

use super::core::SharedState;
use super::response::build_http_response;
use super::types::{CapturedRequest, Result};
use crate::metrics;
use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::body::Body;
use hyper::{Request, Response};
use std::fmt::Display;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{debug, error};

/// Handle a request to the mock server
pub async fn handle_mock_request<B>(
    req: Request<B>,
    state: Arc<SharedState>,
    client_addr: SocketAddr,
) -> Result<Response<Full<Bytes>>>
where
    B: Body,
    B::Error: Display,
{
    let (parts, body) = req.into_parts();
    let captured = CapturedRequest::from_parts(&parts, Some(client_addr));
    debug!(
        "Captured {} {} from {}",
        captured.method, captured.uri, client_addr
    );
    metrics::record_request(&captured.method);

    // Recorded before anything can fail so tests still see the request
    state.capture(captured.clone());

    // Content is discarded; some clients wait for it to be read
    if let Err(e) = body.collect().await {
        debug!(
            "Failed to drain body of {} {}: {}",
            captured.method, captured.uri, e
        );
    }

    let (method, uri) = (captured.method.clone(), captured.uri.clone());
    state.broadcaster().publish(captured);

    let item = state.pop_response().inspect_err(|e| {
        metrics::record_empty_queue();
        error!("{} {} arrived with no response queued: {}", method, uri, e);
        state.record_failure(e.clone());
    })?;

    let response = build_http_response(&item).inspect_err(|e| {
        error!("Cannot write scripted response for {} {}: {}", method, uri, e);
        state.record_failure(e.clone());
    })?;

    metrics::record_response(item.status_code);
    debug!("Responding {} to {} {}", item.status_code, method, uri);
    Ok(response)
}
