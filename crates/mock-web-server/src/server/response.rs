//! Response building shared by the listener and the dispatcher.
//!
//! Both paths write the same shape: the queued status, `Content-Type`, the
//! compatibility content-type header, and the body verbatim.

use super::types::{
    CapturedRequest, MockResponse, MockServerError, QueueItem, RequestHeaders, Result,
    DEFAULT_CONTENT_TYPE,
};
use bytes::Bytes;
use http_body_util::Full;
use hyper::header::{HeaderName, HeaderValue};
use hyper::{Response, StatusCode};

/// Build the wire response for a scripted item.
///
/// Fails for status codes hyper cannot encode (outside 100..=999) and for
/// content types that are not valid header values.
pub fn build_http_response(item: &QueueItem) -> Result<Response<Full<Bytes>>> {
    let status = StatusCode::from_u16(item.status_code)
        .map_err(|_| MockServerError::InvalidStatusCode(item.status_code))?;
    let content_type = HeaderValue::from_str(&item.content_type)
        .map_err(|_| MockServerError::InvalidContentType(item.content_type.clone()))?;

    let mut response = Response::new(Full::new(Bytes::from(item.body.clone())));
    *response.status_mut() = status;
    for (name, _) in item.response_headers() {
        response
            .headers_mut()
            .insert(HeaderName::from_static(name), content_type.clone());
    }
    Ok(response)
}

/// Build the in-memory response value returned by the dispatcher.
pub fn build_mock_response(item: QueueItem, request: CapturedRequest) -> MockResponse {
    let headers: RequestHeaders = item.response_headers().into_iter().collect();
    MockResponse {
        request,
        status_code: item.status_code,
        headers,
        body: item.body,
    }
}

impl MockResponse {
    /// Convert into a hyper response with the same wire shape the listener
    /// writes.
    pub fn into_http(self) -> Result<Response<Full<Bytes>>> {
        let content_type = self
            .header("content-type")
            .unwrap_or(DEFAULT_CONTENT_TYPE)
            .to_string();
        build_http_response(&QueueItem {
            status_code: self.status_code,
            body: self.body,
            content_type,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;

    #[tokio::test]
    async fn test_build_http_response_shape() {
        let item = QueueItem::new(201, r#"{"id":7}"#);
        let response = build_http_response(&item).unwrap();

        assert_eq!(response.status(), StatusCode::CREATED);
        assert_eq!(response.headers()["content-type"], "application/json");
        assert_eq!(
            response.headers()["x-mockwebserver-content-type"],
            "application/json"
        );

        let body = response.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(&body[..], br#"{"id":7}"#);
    }

    #[test]
    fn test_build_http_response_rejects_unencodable_status() {
        let err = build_http_response(&QueueItem::new(42, "")).unwrap_err();
        assert_eq!(err, MockServerError::InvalidStatusCode(42));
    }

    #[test]
    fn test_build_http_response_rejects_bad_content_type() {
        let item = QueueItem::new(200, "").with_content_type("text/plain\r\nx: y");
        assert!(matches!(
            build_http_response(&item),
            Err(MockServerError::InvalidContentType(_))
        ));
    }

    #[test]
    fn test_build_mock_response_keeps_request() {
        let request = CapturedRequest::new("GET", "/users/1");
        let item = QueueItem::new(404, "missing").with_content_type("text/plain");
        let response = build_mock_response(item, request.clone());

        assert_eq!(response.request, request);
        assert_eq!(response.status_code, 404);
        assert_eq!(response.body, "missing");
        assert_eq!(response.header("Content-Type"), Some("text/plain"));
        assert_eq!(
            response.header("X-MockWebServer-Content-Type"),
            Some("text/plain")
        );
    }
}
