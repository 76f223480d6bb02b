//! HTTP exchange types for the contract engine.
//!
//! # Design
//! Requests and responses are plain data. `HttpRequest` is what test code
//! declares; `WireRequest` is what the runner hands to a `Transport` after
//! resolving the URL, serializing the body, and attaching credentials.
//! `RawResponse` comes back from the transport and is captured exactly once
//! into an `HttpResponse`, whose body is already decoded. Expectation
//! evaluation only ever sees the materialized `HttpResponse`.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// HTTP method for a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    Get,
    Put,
    Patch,
    Post,
    Delete,
}

impl HttpMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Put => "PUT",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Post => "POST",
            HttpMethod::Delete => "DELETE",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A declared request. Built by `RequestBuilder`, never mutated afterwards.
///
/// `url` may be absolute or relative; relative URLs are resolved against the
/// runner's base URL at dispatch time.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpRequest {
    pub method: HttpMethod,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<Value>,
    /// Attach `Authorization: Bearer <token>` from the runner's credential
    /// provider when dispatching.
    pub requires_auth: bool,
}

impl HttpRequest {
    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        find_header(&self.headers, name)
    }
}

/// A request ready for the wire: absolute URL, final headers, encoded body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WireRequest {
    pub method: HttpMethod,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<Vec<u8>>,
}

/// Status, headers and body bytes as returned by a `Transport`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

/// Response body after capture.
#[derive(Debug, Clone, PartialEq)]
pub enum ResponseBody {
    /// `content-type` was JSON and the bytes parsed.
    Json(Value),
    /// `content-type` was not JSON; bytes kept untouched.
    Raw(Vec<u8>),
    /// `content-type` claimed JSON but the bytes did not parse.
    Malformed { raw: Vec<u8>, error: String },
}

/// The body could not be read as JSON.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodeError(pub String);

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "decode error: {}", self.0)
    }
}

/// A fully materialized response.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: ResponseBody,
}

impl HttpResponse {
    /// Capture a raw transport response, decoding the body as JSON when the
    /// `content-type` header says so.
    pub fn capture(raw: RawResponse) -> Self {
        let is_json = find_header(&raw.headers, "content-type")
            .map(is_json_content_type)
            .unwrap_or(false);

        let body = if !is_json {
            ResponseBody::Raw(raw.body)
        } else {
            match serde_json::from_slice(&raw.body) {
                Ok(value) => ResponseBody::Json(value),
                Err(e) => ResponseBody::Malformed {
                    raw: raw.body,
                    error: e.to_string(),
                },
            }
        };

        Self {
            status: raw.status,
            headers: raw.headers,
            body,
        }
    }

    /// Case-insensitive header lookup. Returns the first value on repeats.
    pub fn header(&self, name: &str) -> Option<&str> {
        find_header(&self.headers, name)
    }

    /// The decoded JSON body, or why there is none.
    pub fn json(&self) -> Result<&Value, DecodeError> {
        match &self.body {
            ResponseBody::Json(value) => Ok(value),
            ResponseBody::Raw(_) => Err(DecodeError(format!(
                "body is not JSON (content-type: {})",
                self.header("content-type").unwrap_or("<none>")
            ))),
            ResponseBody::Malformed { error, .. } => {
                Err(DecodeError(format!("malformed JSON body: {error}")))
            }
        }
    }
}

fn find_header<'a>(headers: &'a [(String, String)], name: &str) -> Option<&'a str> {
    headers
        .iter()
        .find(|(k, _)| k.eq_ignore_ascii_case(name))
        .map(|(_, v)| v.as_str())
}

fn is_json_content_type(value: &str) -> bool {
    value.to_ascii_lowercase().contains("application/json")
}
