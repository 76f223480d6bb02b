//! Dispatching requests and evaluating expectations.
//!
//! # Design
//! `ContractRunner` owns only immutable, shared pieces (config, transport,
//! credential provider), so one runner can serve any number of concurrent
//! `run` calls. Each call has a single suspension point: awaiting the
//! transport under the configured deadline. Losing that race to the
//! deadline or to cancellation drops the send future, which closes the
//! connection. Once a response is captured, evaluation is synchronous and
//! visits every expectation in declaration order.

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::auth::AuthorizationHeaderProvider;
use crate::config::ContractConfig;
use crate::error::ContractError;
use crate::expectation::{evaluate_all, Expectation, ExpectationResult};
use crate::http::{HttpRequest, HttpResponse, WireRequest};
use crate::transport::{HttpTransport, Transport};

/// Outcome of one `run`: the captured response and every evaluated
/// expectation, in declaration order.
#[derive(Debug, Clone, PartialEq)]
pub struct ContractResult {
    pub response: HttpResponse,
    pub entries: Vec<ExpectationResult>,
}

impl ContractResult {
    /// True when every expectation passed.
    pub fn passed(&self) -> bool {
        self.entries.iter().all(ExpectationResult::passed)
    }

    pub fn failures(&self) -> impl Iterator<Item = &ExpectationResult> {
        self.entries.iter().filter(|e| !e.passed())
    }
}

impl fmt::Display for ContractResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for entry in &self.entries {
            writeln!(f, "  {entry}")?;
        }
        Ok(())
    }
}

/// Evaluate expectations against an already captured response.
pub fn evaluate(response: HttpResponse, expectations: &[Expectation]) -> ContractResult {
    let entries = evaluate_all(&response, expectations);
    ContractResult { response, entries }
}

#[derive(Clone)]
pub struct ContractRunner {
    config: ContractConfig,
    transport: Arc<dyn Transport>,
    credentials: Option<Arc<dyn AuthorizationHeaderProvider>>,
}

impl ContractRunner {
    /// A runner using the reqwest transport with the config's timeout.
    pub fn new(config: ContractConfig) -> Result<Self, ContractError> {
        let transport = HttpTransport::new(config.timeout)?;
        Ok(Self::with_transport(config, transport))
    }

    pub fn with_transport(config: ContractConfig, transport: impl Transport) -> Self {
        Self {
            config,
            transport: Arc::new(transport),
            credentials: None,
        }
    }

    pub fn with_credentials(mut self, provider: impl AuthorizationHeaderProvider + 'static) -> Self {
        self.credentials = Some(Arc::new(provider));
        self
    }

    pub fn config(&self) -> &ContractConfig {
        &self.config
    }

    /// Resolve the URL, attach credentials and encode the body.
    pub fn prepare(&self, request: &HttpRequest) -> Result<WireRequest, ContractError> {
        let url = self.config.resolve(&request.url)?;
        let mut headers = request.headers.clone();

        if request.requires_auth && request.header("authorization").is_none() {
            let provider = self
                .credentials
                .as_ref()
                .ok_or(ContractError::MissingCredentials)?;
            headers.push(("authorization".to_string(), provider.authorization_header()));
        }

        let body = request
            .body
            .as_ref()
            .map(serde_json::to_vec)
            .transpose()
            .map_err(|e| ContractError::InvalidRequest(format!("failed to encode body: {e}")))?;

        Ok(WireRequest {
            method: request.method,
            url,
            headers,
            body,
        })
    }

    /// Send `request` and evaluate `expectations` against the response.
    pub async fn run(
        &self,
        request: &HttpRequest,
        expectations: &[Expectation],
    ) -> Result<ContractResult, ContractError> {
        self.run_until(request, expectations, std::future::pending()).await
    }

    /// Like `run`, but gives up with `ContractError::Timeout` as soon as
    /// `cancel` completes. The in-flight connection is closed and no
    /// expectations are evaluated in that case.
    pub async fn run_until<F>(
        &self,
        request: &HttpRequest,
        expectations: &[Expectation],
        cancel: F,
    ) -> Result<ContractResult, ContractError>
    where
        F: Future<Output = ()>,
    {
        let wire = self.prepare(request)?;
        let method = wire.method;
        let url = wire.url.clone();
        debug!(%method, %url, "dispatching request");

        let deadline = self.config.timeout;
        let sent = tokio::select! {
            sent = tokio::time::timeout(deadline, self.transport.send(&wire)) => sent
                .unwrap_or_else(|_| Err(ContractError::Timeout(format!("no response within {deadline:?}")))),
            () = cancel => Err(ContractError::Timeout(
                "cancelled before a response arrived".to_string(),
            )),
        };
        let raw = sent.inspect_err(|e| warn!(%method, %url, error = %e, "request failed"))?;

        let result = evaluate(HttpResponse::capture(raw), expectations);
        let failed = result.failures().count();
        if failed == 0 {
            info!(%method, %url, status = result.response.status, "contract passed");
        } else {
            warn!(%method, %url, status = result.response.status, failed, "contract failed");
        }
        Ok(result)
    }

    /// Run independent request/expectation pairs concurrently. Results come
    /// back in input order; no ordering holds between the dispatches.
    pub async fn run_concurrently(
        &self,
        batch: Vec<(HttpRequest, Vec<Expectation>)>,
    ) -> Vec<Result<ContractResult, ContractError>> {
        let handles: Vec<_> = batch
            .into_iter()
            .map(|(request, expectations)| {
                let runner = self.clone();
                tokio::spawn(async move { runner.run(&request, &expectations).await })
            })
            .collect();

        let mut results = Vec::with_capacity(handles.len());
        for handle in handles {
            results.push(handle.await.unwrap_or_else(|e| {
                Err(ContractError::Transport(format!("scenario task failed: {e}")))
            }));
        }
        results
    }
}
