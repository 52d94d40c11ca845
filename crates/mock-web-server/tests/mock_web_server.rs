//! Integration tests for the mock web server over real sockets.
//!
//! Each test binds an ephemeral loopback port and drives it with `reqwest`.

use mock_web_server::{CapturedRequest, MockServerError, MockWebServer};
use reqwest::Client;
use std::time::Duration;
use tokio::time::timeout;

const TEST_TIMEOUT: Duration = Duration::from_secs(10);

async fn started_server() -> MockWebServer {
    let server = MockWebServer::new();
    server.start(None).await.expect("Failed to start mock server");
    server
}

fn client() -> Client {
    Client::builder()
        .timeout(TEST_TIMEOUT)
        .build()
        .expect("Failed to build client")
}

// =============================================================================
// Response scripting
// =============================================================================

#[tokio::test]
async fn test_get_receives_queued_json() {
    let server = started_server().await;
    server.enqueue(200, r#"{"name":"John"}"#);

    let response = client()
        .get(server.url_for("/user").unwrap())
        .send()
        .await
        .expect("Request failed");

    assert_eq!(response.status(), 200);
    assert_eq!(response.headers()["content-type"], "application/json");
    assert_eq!(
        response.headers()["x-mockwebserver-content-type"],
        "application/json"
    );
    assert_eq!(response.text().await.unwrap(), r#"{"name":"John"}"#);

    server.shutdown().await;
}

#[tokio::test]
async fn test_responses_are_served_in_enqueue_order() {
    let server = started_server().await;
    let client = client();
    server.enqueue(200, "one");
    server.enqueue_with_content_type(404, "two", "text/plain");
    server.enqueue(500, "three");

    let mut seen = Vec::new();
    for _ in 0..3 {
        let response = client.get(server.url().unwrap()).send().await.unwrap();
        let status = response.status().as_u16();
        let content_type = response.headers()["content-type"].to_str().unwrap().to_string();
        seen.push((status, content_type, response.text().await.unwrap()));
    }

    assert_eq!(
        seen,
        vec![
            (200, "application/json".to_string(), "one".to_string()),
            (404, "text/plain".to_string(), "two".to_string()),
            (500, "application/json".to_string(), "three".to_string()),
        ]
    );
    server.shutdown().await;
}

#[tokio::test]
async fn test_empty_queue_fails_loudly() {
    let server = started_server().await;
    let client = client();
    server.enqueue(200, "");
    server.enqueue(201, "");

    let first = client.get(server.url_for("/a").unwrap()).send().await.unwrap();
    assert_eq!(first.status(), 200);
    let second = client
        .post(server.url_for("/b").unwrap())
        .body("payload")
        .send()
        .await
        .unwrap();
    assert_eq!(second.status(), 201);
    assert!(server.verify_request_count(2).is_ok());

    // No default response: the connection is aborted instead
    let third = client.get(server.url_for("/c").unwrap()).send().await;
    assert!(third.is_err());
    assert!(server
        .take_listener_failures()
        .contains(&MockServerError::EmptyResponseQueue));

    let captured = server.take_request().unwrap();
    assert_eq!((captured.method.as_str(), captured.uri.as_str()), ("GET", "/a"));
    let captured = server.take_request().unwrap();
    assert_eq!((captured.method.as_str(), captured.uri.as_str()), ("POST", "/b"));
    assert_eq!(server.take_request().unwrap().uri, "/c");

    server.shutdown().await;
}

// =============================================================================
// Request capture
// =============================================================================

#[tokio::test]
async fn test_request_headers_are_captured() {
    let server = started_server().await;
    server.enqueue(200, "");

    client()
        .get(server.url().unwrap())
        .header("user-agent", "Dart")
        .send()
        .await
        .unwrap();

    let headers = server.take_request_headers().unwrap();
    assert_eq!(headers.get("user-agent"), Some("Dart"));
    assert!(headers.contains("host"));

    server.shutdown().await;
}

#[tokio::test]
async fn test_take_request_then_no_more_requests() {
    let server = started_server().await;
    server.enqueue(200, "");

    client()
        .get(server.url_for("/items?page=2").unwrap())
        .send()
        .await
        .unwrap();

    let request = server.take_request().unwrap();
    assert_eq!(request.method, "GET");
    assert_eq!(request.uri, "/items?page=2");
    assert!(request.remote_addr.is_some());
    assert!(server.verify_no_more_requests().is_ok());

    server.shutdown().await;
}

#[tokio::test]
async fn test_request_stream_observes_before_response() {
    let server = started_server().await;
    let mut first = server.request_stream();
    let mut second = server.request_stream();
    server.enqueue(200, "");
    server.enqueue(200, "");

    let client = client();
    client.get(server.url_for("/one").unwrap()).send().await.unwrap();
    // Published before the response was written, so already waiting
    assert_eq!(first.try_recv().unwrap().uri, "/one");

    client.delete(server.url_for("/two").unwrap()).send().await.unwrap();
    let next = timeout(TEST_TIMEOUT, first.recv()).await.unwrap().unwrap();
    assert_eq!(next.method, "DELETE");

    let seen: Vec<String> = [
        timeout(TEST_TIMEOUT, second.recv()).await.unwrap().unwrap(),
        timeout(TEST_TIMEOUT, second.recv()).await.unwrap().unwrap(),
    ]
    .into_iter()
    .map(|r| r.uri)
    .collect();
    assert_eq!(seen, ["/one", "/two"]);

    // Streams are independent of the ledger
    assert!(server.verify_request_count(2).is_ok());
    server.shutdown().await;
}

// =============================================================================
// Lifecycle
// =============================================================================

#[tokio::test]
async fn test_shutdown_closes_keep_alive_connections() {
    let server = started_server().await;
    let client = client();
    server.enqueue(200, "");
    let url = server.url().unwrap();

    client.get(&url).send().await.unwrap();

    // The pooled connection is still open; shutdown must not wait for it
    timeout(Duration::from_secs(2), server.shutdown())
        .await
        .expect("Shutdown hung on an open connection");

    assert_eq!(server.port(), None);
    assert!(client
        .get(&url)
        .timeout(Duration::from_secs(2))
        .send()
        .await
        .is_err());
}

#[tokio::test]
async fn test_restart_begins_clean() {
    let server = started_server().await;
    server.enqueue(200, "");
    server.enqueue(200, "stale");
    client().get(server.url().unwrap()).send().await.unwrap();

    server.shutdown().await;
    assert_eq!(server.port(), None);
    assert_eq!(server.request_count(), 0);
    assert_eq!(server.queued_responses(), 0);

    server.start(None).await.unwrap();
    assert!(server.verify_request_count(0).is_ok());
    assert_eq!(
        server.dispatch_request(CapturedRequest::new("GET", "/")),
        Err(MockServerError::EmptyResponseQueue)
    );
    server.shutdown().await;
}

#[tokio::test]
async fn test_start_on_requested_port() {
    // Grab a free port from the OS, release it, then ask for it explicitly
    let port = {
        let probe = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        probe.local_addr().unwrap().port()
    };

    let server = MockWebServer::new();
    assert_eq!(server.start(Some(port)).await.unwrap(), port);
    assert_eq!(server.url(), Some(format!("http://127.0.0.1:{port}")));

    let other = MockWebServer::new();
    assert!(matches!(
        other.start(Some(port)).await,
        Err(MockServerError::BindError(_, _))
    ));

    server.shutdown().await;
}
