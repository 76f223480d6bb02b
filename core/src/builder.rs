//! Fluent construction of `HttpRequest` values.
//!
//! # Design
//! The builder is consumed by `build()`, which yields an immutable request.
//! Body serialization errors and malformed headers are deferred to
//! `build()` so the chain stays fluent. Nothing here touches the network.

use serde::Serialize;
use serde_json::Value;

use crate::error::ContractError;
use crate::http::{HttpMethod, HttpRequest};

#[derive(Debug, Clone)]
pub struct RequestBuilder {
    method: HttpMethod,
    url: String,
    headers: Vec<(String, String)>,
    body: Option<Result<Value, String>>,
    requires_auth: bool,
}

impl RequestBuilder {
    pub fn new(method: HttpMethod, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            headers: Vec::new(),
            body: None,
            requires_auth: false,
        }
    }

    pub fn get(url: impl Into<String>) -> Self {
        Self::new(HttpMethod::Get, url)
    }

    pub fn put(url: impl Into<String>) -> Self {
        Self::new(HttpMethod::Put, url)
    }

    pub fn patch(url: impl Into<String>) -> Self {
        Self::new(HttpMethod::Patch, url)
    }

    pub fn post(url: impl Into<String>) -> Self {
        Self::new(HttpMethod::Post, url)
    }

    pub fn delete(url: impl Into<String>) -> Self {
        Self::new(HttpMethod::Delete, url)
    }

    /// Add a header. Repeated names are kept in insertion order.
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn headers<I, K, V>(mut self, headers: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.headers
            .extend(headers.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    /// Set a JSON body from anything serializable.
    pub fn json<T: Serialize + ?Sized>(mut self, body: &T) -> Self {
        self.body = Some(serde_json::to_value(body).map_err(|e| e.to_string()));
        self
    }

    /// Declare that the request needs a bearer token at dispatch.
    pub fn authenticated(mut self) -> Self {
        self.requires_auth = true;
        self
    }

    pub fn build(self) -> Result<HttpRequest, ContractError> {
        if self.url.trim().is_empty() {
            return Err(ContractError::InvalidRequest("url must not be empty".to_string()));
        }

        for (name, value) in &self.headers {
            http::HeaderName::from_bytes(name.as_bytes())
                .map_err(|_| ContractError::InvalidRequest(format!("invalid header name `{name}`")))?;
            http::HeaderValue::from_str(value).map_err(|_| {
                ContractError::InvalidRequest(format!("invalid value for header `{name}`"))
            })?;
        }

        let body = self
            .body
            .transpose()
            .map_err(|e| ContractError::InvalidRequest(format!("body is not JSON-serializable: {e}")))?;

        let mut headers = self.headers;
        let has_content_type = headers
            .iter()
            .any(|(k, _)| k.eq_ignore_ascii_case("content-type"));
        if body.is_some() && !has_content_type {
            headers.push(("content-type".to_string(), "application/json".to_string()));
        }

        Ok(HttpRequest {
            method: self.method,
            url: self.url,
            headers,
            body,
            requires_auth: self.requires_auth,
        })
    }
}
