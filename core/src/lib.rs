//! Declarative HTTP contract testing.
//!
//! # Overview
//! Describe a request with `RequestBuilder`, declare what the response must
//! look like as a list of `Expectation`s, and let `ContractRunner` dispatch
//! it and evaluate every expectation.
//!
//! # Design
//! - Requests, responses and expectations are plain immutable data.
//! - The network sits behind the `Transport` trait; `HttpTransport` is the
//!   real one, tests plug in canned transports.
//! - Only transport failures and timeouts are errors. Content mismatches and
//!   undecodable bodies are reported per expectation, never short-circuited.
//! - Configuration (`ContractConfig`) and credentials are passed in, so
//!   runners for several environments can run side by side.

pub mod auth;
pub mod builder;
pub mod config;
pub mod error;
pub mod expectation;
pub mod http;
pub mod runner;
pub mod scenario;
pub mod shape;
pub mod transport;

pub use auth::{AuthorizationHeaderProvider, StaticToken};
pub use builder::RequestBuilder;
pub use config::ContractConfig;
pub use error::ContractError;
pub use expectation::{Expectation, ExpectationResult, Outcome};
pub use http::{HttpMethod, HttpRequest, HttpResponse, RawResponse, ResponseBody, WireRequest};
pub use runner::{evaluate, ContractResult, ContractRunner};
pub use scenario::{run_scenarios, Scenario, ScenarioFile, ScenarioReport};
pub use shape::{validate, JsonKind, Mismatch, Shape, TypeDeclaration};
pub use transport::{HttpTransport, Transport};

/// Install a `tracing` subscriber. `RUST_LOG` wins over `level`.
pub fn init_logging(level: &str) {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("contract_core={level}")));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();
}
