//! Error types for the contract engine.
//!
//! # Design
//! Only failures that leave nothing to evaluate are errors: a request that
//! cannot be built or dispatched, a transport failure, or no response in
//! time. Expectation mismatches and undecodable bodies are data and live in
//! `expectation::Outcome` instead.

use thiserror::Error;

/// Errors that abort a single `ContractRunner::run` call.
#[derive(Debug, Error)]
pub enum ContractError {
    /// The request could not be built or encoded.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Connection refused, DNS failure, TLS failure, broken stream.
    #[error("transport error: {0}")]
    Transport(String),

    /// No complete response before the deadline or cancellation.
    #[error("timed out: {0}")]
    Timeout(String),

    /// The request declares an auth requirement but the runner has no
    /// credential provider.
    #[error("request requires authorization but no credential provider is configured")]
    MissingCredentials,

    /// A scenario file could not be read or resolved.
    #[error("scenario error: {0}")]
    Scenario(String),
}

impl ContractError {
    /// True for the two failure kinds where the server never produced a
    /// usable response.
    pub fn is_network(&self) -> bool {
        matches!(self, ContractError::Transport(_) | ContractError::Timeout(_))
    }
}
