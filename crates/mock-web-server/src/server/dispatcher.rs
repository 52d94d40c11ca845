//! Non-network dispatch.
//!
//! Answers a caller-built request straight from the response queue, with
//! the same response shape the listener writes. The request is neither
//! captured nor published.

use super::core::SharedState;
use super::response::build_mock_response;
use super::types::{CapturedRequest, MockResponse, Result};
use crate::metrics;
use tracing::debug;

pub(super) fn dispatch(state: &SharedState, request: CapturedRequest) -> Result<MockResponse> {
    let item = state.pop_response()?;
    debug!(
        "Dispatched {} to {} {}",
        item.status_code, request.method, request.uri
    );
    metrics::record_dispatch();
    Ok(build_mock_response(item, request))
}
