//! Network capability: perform one HTTP request and return a trace of the exchange.

use async_trait::async_trait;
use std::time::{Duration, Instant};

/// Request description built by an adapter; the transport does the I/O.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpRequest {
    pub method: String,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl HttpRequest {
    pub fn post(url: impl Into<String>) -> Self {
        Self {
            method: "POST".to_string(),
            url: url.into(),
            headers: Vec::new(),
            body: String::new(),
        }
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn body(mut self, body: impl Into<String>) -> Self {
        self.body = body.into();
        self
    }

    /// Raw-ish dump of the request for channel logs.
    pub fn trace(&self) -> String {
        let mut out = format!("{} {}\r\n", self.method, self.url);
        for (k, v) in &self.headers {
            out.push_str(&format!("{}: {}\r\n", k, v));
        }
        out.push_str("\r\n");
        out.push_str(&self.body);
        out
    }
}

/// What was sent and received during one request.
#[derive(Debug, Clone, Default)]
pub struct HttpTrace {
    pub method: String,
    pub url: String,
    pub status_code: Option<u16>,
    pub request: String,
    pub response: String,
    pub elapsed_ms: u64,
}

impl HttpTrace {
    pub fn for_request(req: &HttpRequest) -> Self {
        Self {
            method: req.method.clone(),
            url: req.url.clone(),
            request: req.trace(),
            ..Self::default()
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("invalid request: {0}")]
    Build(String),
    #[error("request failed: {0}")]
    Request(String),
    #[error("received non 200 response: {0}")]
    Status(u16),
}

/// A failed request together with whatever trace was captured before it failed.
#[derive(Debug, thiserror::Error)]
#[error("{error}")]
pub struct TransportFailure {
    pub trace: HttpTrace,
    pub error: TransportError,
}

impl TransportFailure {
    pub fn new(trace: HttpTrace, error: TransportError) -> Self {
        Self { trace, error }
    }
}

/// Performs HTTP requests for adapters. Timeouts are the implementation's concern and
/// surface as errors.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send `req`. Non-2xx responses are failures; the trace still holds the response.
    async fn perform(&self, req: &HttpRequest) -> Result<HttpTrace, TransportFailure>;
}

/// reqwest-backed transport used by the gateway and CLI.
#[derive(Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new(timeout: Duration) -> Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| TransportError::Build(e.to_string()))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn perform(&self, req: &HttpRequest) -> Result<HttpTrace, TransportFailure> {
        let mut trace = HttpTrace::for_request(req);
        let method = match reqwest::Method::from_bytes(req.method.as_bytes()) {
            Ok(m) => m,
            Err(e) => return Err(TransportFailure::new(trace, TransportError::Build(e.to_string()))),
        };
        let mut builder = self.client.request(method, &req.url);
        for (k, v) in &req.headers {
            builder = builder.header(k.as_str(), v.as_str());
        }
        let started = Instant::now();
        let res = builder.body(req.body.clone()).send().await;
        let res = match res {
            Ok(r) => r,
            Err(e) => {
                trace.elapsed_ms = started.elapsed().as_millis() as u64;
                return Err(TransportFailure::new(trace, TransportError::Request(e.to_string())));
            }
        };
        let status = res.status();
        trace.status_code = Some(status.as_u16());
        let body = res.text().await;
        trace.elapsed_ms = started.elapsed().as_millis() as u64;
        trace.response = match body {
            Ok(body) => body,
            Err(e) => {
                return Err(TransportFailure::new(
                    trace,
                    TransportError::Request(format!("reading response body: {}", e)),
                ));
            }
        };
        if !status.is_success() {
            return Err(TransportFailure::new(trace, TransportError::Status(status.as_u16())));
        }
        Ok(trace)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trace_includes_headers_and_body() {
        let req = HttpRequest::post("https://example.test/send")
            .header("Content-Type", "application/json")
            .body("{}");
        let t = req.trace();
        assert!(t.starts_with("POST https://example.test/send\r\n"));
        assert!(t.contains("Content-Type: application/json\r\n"));
        assert!(t.ends_with("\r\n\r\n{}"));
    }

    #[test]
    fn failure_displays_inner_error() {
        let f = TransportFailure::new(HttpTrace::default(), TransportError::Status(500));
        assert_eq!(f.to_string(), "received non 200 response: 500");
    }

    #[tokio::test]
    async fn truncated_body_is_request_error() {
        use std::io::{Read, Write};

        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        // announces 100 bytes, sends 7, then closes
        let server = std::thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            let mut seen = Vec::new();
            let mut chunk = [0u8; 1024];
            while !seen.ends_with(b"\r\n\r\nx") {
                let n = stream.read(&mut chunk).unwrap();
                if n == 0 {
                    break;
                }
                seen.extend_from_slice(&chunk[..n]);
            }
            stream
                .write_all(b"HTTP/1.1 200 OK\r\nContent-Length: 100\r\n\r\npartial")
                .unwrap();
        });

        let transport = ReqwestTransport::new(Duration::from_secs(5)).unwrap();
        let req = HttpRequest::post(format!("http://{}/send", addr)).body("x");
        let failure = transport.perform(&req).await.unwrap_err();
        assert!(matches!(failure.error, TransportError::Request(_)));
        assert_eq!(failure.trace.status_code, Some(200));
        server.join().unwrap();
    }

    #[tokio::test]
    async fn unreachable_host_is_request_error() {
        let transport = ReqwestTransport::new(Duration::from_secs(2)).unwrap();
        let req = HttpRequest::post("http://127.0.0.1:9/unreachable").body("x");
        let failure = transport.perform(&req).await.unwrap_err();
        assert!(matches!(failure.error, TransportError::Request(_)));
        assert_eq!(failure.trace.url, "http://127.0.0.1:9/unreachable");
        assert_eq!(failure.trace.status_code, None);
    }
}
