//! Scenario files for the `contract-runner` binary.
//!
//! # Design
//! A scenario file lists request/expectation pairs in JSON. Scenarios run in
//! file order, which is how dependent steps are sequenced: a scenario may
//! `capture` values from its response by JSON pointer, and later scenarios
//! reference them as `{{name}}` in their url or body strings.
//!
//! ```json
//! {"scenarios": [{
//!   "name": "list reviews",
//!   "method": "GET",
//!   "url": "/product/1/reviews",
//!   "capture": {"review_id": "/data/0/_id"},
//!   "expect": [{"status_equals": 200}]
//! }]}
//! ```

use std::collections::BTreeMap;
use std::ops::Range;
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

use crate::builder::RequestBuilder;
use crate::error::ContractError;
use crate::expectation::Expectation;
use crate::http::{HttpMethod, HttpRequest, HttpResponse};
use crate::runner::{ContractResult, ContractRunner};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioFile {
    pub scenarios: Vec<Scenario>,
}

impl ScenarioFile {
    pub fn load(path: &Path) -> Result<Self, ContractError> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| ContractError::Scenario(format!("cannot read {}: {e}", path.display())))?;
        Self::from_json(&raw)
    }

    pub fn from_json(raw: &str) -> Result<Self, ContractError> {
        serde_json::from_str(raw).map_err(|e| ContractError::Scenario(format!("invalid scenario file: {e}")))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scenario {
    pub name: String,
    pub method: HttpMethod,
    pub url: String,
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
    #[serde(default)]
    pub body: Option<Value>,
    /// Send `Authorization: Bearer <token>`.
    #[serde(default)]
    pub auth: bool,
    /// Variable name to JSON pointer into the response body.
    #[serde(default)]
    pub capture: BTreeMap<String, String>,
    #[serde(default)]
    pub expect: Vec<Expectation>,
}

impl Scenario {
    /// Build the request, substituting captured variables.
    pub fn to_request(&self, vars: &Variables) -> Result<HttpRequest, ContractError> {
        let mut builder = RequestBuilder::new(self.method, vars.substitute_str(&self.url)?)
            .headers(self.headers.clone());
        if let Some(body) = &self.body {
            builder = builder.json(&vars.substitute_value(body)?);
        }
        if self.auth {
            builder = builder.authenticated();
        }
        builder.build()
    }
}

/// Values captured from earlier responses.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Variables(BTreeMap<String, Value>);

/// Byte ranges and names of the `{{ name }}` placeholders in `text`.
fn placeholders(text: &str) -> Vec<(Range<usize>, &str)> {
    let mut found = Vec::new();
    let mut cursor = 0;
    while let Some(start) = text[cursor..].find("{{").map(|i| cursor + i) {
        let Some(end) = text[start + 2..].find("}}").map(|i| start + 2 + i) else {
            break;
        };
        let name = text[start + 2..end].trim();
        if !name.is_empty() && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
            found.push((start..end + 2, name));
        }
        cursor = end + 2;
    }
    found
}

fn unknown(name: &str) -> ContractError {
    ContractError::Scenario(format!("unknown variable `{name}`"))
}

impl Variables {
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0.get(name)
    }

    pub fn set(&mut self, name: impl Into<String>, value: Value) {
        self.0.insert(name.into(), value);
    }

    /// Record the scenario's captures from `response`. Pointers that do not
    /// resolve are reported and skipped.
    pub fn record(&mut self, scenario: &Scenario, response: &HttpResponse) {
        if scenario.capture.is_empty() {
            return;
        }
        let body = match response.json() {
            Ok(body) => body,
            Err(e) => {
                warn!(scenario = %scenario.name, error = %e, "cannot capture from response");
                return;
            }
        };
        for (name, pointer) in &scenario.capture {
            match body.pointer(pointer) {
                Some(value) => self.set(name.clone(), value.clone()),
                None => warn!(scenario = %scenario.name, %name, %pointer, "capture pointer did not resolve"),
            }
        }
    }

    /// Replace every `{{name}}` in `text`. Unknown names are an error.
    pub fn substitute_str(&self, text: &str) -> Result<String, ContractError> {
        let mut out = String::with_capacity(text.len());
        let mut last = 0;
        for (range, name) in placeholders(text) {
            let value = self.0.get(name).ok_or_else(|| unknown(name))?;
            out.push_str(&text[last..range.start]);
            match value {
                Value::String(s) => out.push_str(s),
                other => out.push_str(&other.to_string()),
            }
            last = range.end;
        }
        out.push_str(&text[last..]);
        Ok(out)
    }

    /// Substitute inside a JSON body. A string that is exactly one
    /// placeholder takes the captured value with its JSON type.
    pub fn substitute_value(&self, value: &Value) -> Result<Value, ContractError> {
        match value {
            Value::String(s) => {
                if let [(range, name)] = placeholders(s).as_slice() {
                    if range.start == 0 && range.end == s.len() {
                        return self.0.get(*name).cloned().ok_or_else(|| unknown(name));
                    }
                }
                Ok(Value::String(self.substitute_str(s)?))
            }
            Value::Array(items) => items
                .iter()
                .map(|item| self.substitute_value(item))
                .collect::<Result<Vec<_>, _>>()
                .map(Value::Array),
            Value::Object(map) => map
                .iter()
                .map(|(k, v)| Ok((k.clone(), self.substitute_value(v)?)))
                .collect::<Result<serde_json::Map<_, _>, ContractError>>()
                .map(Value::Object),
            other => Ok(other.clone()),
        }
    }
}

/// What happened to one scenario.
#[derive(Debug)]
pub struct ScenarioReport {
    pub name: String,
    pub outcome: Result<ContractResult, ContractError>,
}

impl ScenarioReport {
    pub fn passed(&self) -> bool {
        matches!(&self.outcome, Ok(result) if result.passed())
    }
}

/// Run every scenario in file order, threading captures forward.
pub async fn run_scenarios(runner: &ContractRunner, file: &ScenarioFile) -> Vec<ScenarioReport> {
    let mut vars = Variables::default();
    let mut reports = Vec::with_capacity(file.scenarios.len());

    for scenario in &file.scenarios {
        let outcome = match scenario.to_request(&vars) {
            Ok(request) => runner.run(&request, &scenario.expect).await,
            Err(e) => Err(e),
        };
        if let Ok(result) = &outcome {
            vars.record(scenario, &result.response);
        }
        reports.push(ScenarioReport {
            name: scenario.name.clone(),
            outcome,
        });
    }
    reports
}
