use http::{HeaderMap, HeaderValue, StatusCode};
use reqwest::Response as ReqwestResponse;
use tracing::trace;

use crate::error::{Error, Result};

/// HTTP response metadata
///
/// Holds everything a caller can learn about a response without its body.
/// The body stream is owned until [`Response::read_body`] drains it, and is
/// released as soon as that read finishes, whatever its outcome.
#[derive(Debug)]
pub struct Response {
    status: StatusCode,
    headers: HeaderMap,
    url: url::Url,
    version: http::Version,
    content_length: Option<u64>,
    inner: Option<ReqwestResponse>,
}

impl Response {
    /// Create a response from a reqwest response
    pub fn from_reqwest_response(reqwest_response: ReqwestResponse) -> Self {
        Self {
            status: reqwest_response.status(),
            headers: reqwest_response.headers().clone(),
            url: reqwest_response.url().clone(),
            version: reqwest_response.version(),
            content_length: reqwest_response.content_length(),
            inner: Some(reqwest_response),
        }
    }

    /// Get the HTTP status code
    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// Get the HTTP version
    pub fn version(&self) -> http::Version {
        self.version
    }

    /// Get the response headers
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Get a specific header value
    pub fn header(&self, name: &str) -> Option<&HeaderValue> {
        self.headers.get(name)
    }

    /// Get the content length reported by the transport
    pub fn content_length(&self) -> Option<u64> {
        self.content_length
    }

    /// Get the final URL (after redirects)
    pub fn url(&self) -> &url::Url {
        &self.url
    }

    /// Check if the response is successful (2xx status code)
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    /// Check whether the body is still waiting to be read
    pub fn has_body(&self) -> bool {
        self.inner.is_some()
    }

    /// Read the whole body into memory.
    ///
    /// The body can be read once; later calls return an empty buffer.
    pub async fn read_body(&mut self) -> Result<Vec<u8>> {
        let Some(mut inner) = self.inner.take() else {
            return Ok(Vec::new());
        };

        let mut body = match self.content_length {
            Some(len) => Vec::with_capacity(len.min(1 << 20) as usize),
            None => Vec::new(),
        };
        while let Some(chunk) = inner.chunk().await.map_err(Error::body_read)? {
            body.extend_from_slice(&chunk);
        }
        trace!(url = %self.url, bytes = body.len(), "response body read");
        Ok(body)
    }
}

/// Outcome of the most recent fully successful execution
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    status: Option<StatusCode>,
    headers: HeaderMap,
    body: Vec<u8>,
    content_length: Option<u64>,
}

impl Snapshot {
    pub(crate) fn capture(response: &Response, body: Vec<u8>) -> Self {
        Self {
            status: Some(response.status()),
            headers: response.headers().clone(),
            body,
            content_length: response.content_length(),
        }
    }

    /// Status code, `None` before the first successful execution
    pub fn status(&self) -> Option<StatusCode> {
        self.status
    }

    /// Get the response headers
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Get the response body
    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// Get the content length, `None` when unknown
    pub fn content_length(&self) -> Option<u64> {
        self.content_length
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::stream;
    use std::io;

    fn reqwest_response(status: u16, body: impl Into<reqwest::Body>) -> ReqwestResponse {
        http::Response::builder()
            .status(status)
            .header("content-type", "text/plain")
            .body(body)
            .unwrap()
            .into()
    }

    #[tokio::test]
    async fn test_read_body_once() {
        let mut response = Response::from_reqwest_response(reqwest_response(200, "hello"));
        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.has_body());

        assert_eq!(response.read_body().await.unwrap(), b"hello");
        assert!(!response.has_body());
        assert!(response.read_body().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_read_body_failure_keeps_metadata() {
        let chunks: Vec<std::result::Result<Vec<u8>, io::Error>> = vec![
            Ok(b"par".to_vec()),
            Err(io::Error::new(io::ErrorKind::ConnectionReset, "reset")),
        ];
        let body = reqwest::Body::wrap_stream(stream::iter(chunks));
        let mut response = Response::from_reqwest_response(reqwest_response(502, body));

        let err = response.read_body().await.unwrap_err();
        assert!(err.is_body_read());
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        assert_eq!(response.header("content-type").unwrap(), "text/plain");
        assert!(!response.has_body());
    }

    #[test]
    fn test_snapshot_default_is_empty() {
        let snapshot = Snapshot::default();
        assert!(snapshot.status().is_none());
        assert!(snapshot.headers().is_empty());
        assert!(snapshot.body().is_empty());
        assert!(snapshot.content_length().is_none());
    }
}
