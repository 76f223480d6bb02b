//! The I/O boundary.
//!
//! # Design
//! `Transport` turns one `WireRequest` into one `RawResponse`. The send
//! future owns the connection: dropping it before it completes (deadline or
//! cancellation in the runner) closes the socket. `HttpTransport` is the
//! real HTTP(S) implementation; tests substitute canned transports.

use std::time::Duration;

use async_trait::async_trait;

use crate::error::ContractError;
use crate::http::{HttpMethod, RawResponse, WireRequest};

#[async_trait]
pub trait Transport: Send + Sync + 'static {
    async fn send(&self, request: &WireRequest) -> Result<RawResponse, ContractError>;
}

/// HTTP/1.1 transport backed by a reqwest client. TLS follows the URL
/// scheme (rustls).
///
/// Non-2xx statuses are returned as data. The client carries the config
/// timeout as well, covering connect through the last body byte.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new(timeout: Duration) -> Result<Self, ContractError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ContractError::Transport(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, request: &WireRequest) -> Result<RawResponse, ContractError> {
        let mut builder = self.client.request(method(request.method), request.url.as_str());
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        // GET and DELETE go out without a body.
        let sends_body = !matches!(request.method, HttpMethod::Get | HttpMethod::Delete);
        if let Some(body) = request.body.as_ref().filter(|_| sends_body) {
            builder = builder.body(body.clone());
        }

        let response = builder.send().await.map_err(map_error)?;
        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .map(|(name, value)| {
                (
                    name.as_str().to_string(),
                    String::from_utf8_lossy(value.as_bytes()).into_owned(),
                )
            })
            .collect();
        let body = response.bytes().await.map_err(map_error)?.to_vec();

        Ok(RawResponse {
            status,
            headers,
            body,
        })
    }
}

fn method(method: HttpMethod) -> reqwest::Method {
    match method {
        HttpMethod::Get => reqwest::Method::GET,
        HttpMethod::Put => reqwest::Method::PUT,
        HttpMethod::Patch => reqwest::Method::PATCH,
        HttpMethod::Post => reqwest::Method::POST,
        HttpMethod::Delete => reqwest::Method::DELETE,
    }
}

fn map_error(err: reqwest::Error) -> ContractError {
    if err.is_timeout() {
        ContractError::Timeout(error_chain(&err))
    } else {
        ContractError::Transport(error_chain(&err))
    }
}

// reqwest's top-level message hides the cause ("error sending request").
fn error_chain(err: &reqwest::Error) -> String {
    let mut message = err.to_string();
    let mut source = std::error::Error::source(err);
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn refused_connection_is_a_transport_error() {
        // Bind then drop to get a port nobody listens on.
        let port = std::net::TcpListener::bind("127.0.0.1:0")
            .unwrap()
            .local_addr()
            .unwrap()
            .port();
        let transport = HttpTransport::new(Duration::from_secs(2)).unwrap();
        let err = transport
            .send(&WireRequest {
                method: HttpMethod::Get,
                url: format!("http://127.0.0.1:{port}/rest/product/1/reviews"),
                headers: Vec::new(),
                body: None,
            })
            .await
            .unwrap_err();
        assert!(err.is_network(), "unexpected error: {err}");
    }

    #[test]
    fn every_method_maps_to_its_verb() {
        assert_eq!(method(HttpMethod::Patch), reqwest::Method::PATCH);
        assert_eq!(method(HttpMethod::Delete).as_str(), HttpMethod::Delete.as_str());
    }
}
