//! Accept loop for a running server.
//!
//! Connections are served with hyper's HTTP/1 connection builder, one task
//! per connection. All connection tasks live in a `JoinSet` owned by the
//! loop so that shutdown can drop them at once instead of draining.

use super::core::SharedState;
use super::handler::handle_mock_request;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::TokioIo;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tokio::task::JoinSet;
use tracing::{debug, error, info};

/// Serve connections until the shutdown signal fires.
pub(super) async fn serve(
    listener: TcpListener,
    state: Arc<SharedState>,
    mut shutdown_rx: broadcast::Receiver<()>,
) {
    let port = listener.local_addr().map(|a| a.port()).unwrap_or(0);
    let mut connections = JoinSet::new();

    loop {
        tokio::select! {
            result = listener.accept() => {
                match result {
                    Ok((stream, addr)) => {
                        debug!("Accepted connection from {} on port {}", addr, port);
                        let state = Arc::clone(&state);
                        connections.spawn(async move {
                            let io = TokioIo::new(stream);
                            let service = service_fn(move |req| {
                                let state = Arc::clone(&state);
                                async move { handle_mock_request(req, state, addr).await }
                            });
                            if let Err(e) = http1::Builder::new()
                                .serve_connection(io, service)
                                .await
                            {
                                debug!("Connection error on port {}: {}", port, e);
                            }
                        });
                    }
                    Err(e) => {
                        error!("Accept error on port {}: {}", port, e);
                    }
                }
            }
            Some(_) = connections.join_next(), if !connections.is_empty() => {}
            _ = shutdown_rx.recv() => {
                info!("Mock server on port {} shutting down", port);
                break;
            }
        }
    }

    // Forced close: in-flight and keep-alive connections are dropped.
    connections.abort_all();
    while connections.join_next().await.is_some() {}
    drop(listener);
}
