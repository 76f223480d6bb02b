//! Declarative assertions about a captured response.
//!
//! # Design
//! Each `Expectation` is pure: evaluating it twice against the same
//! `HttpResponse` yields the same `ExpectationResult`. A failed expectation
//! is a value (`Outcome::Mismatch`), and a body that cannot be read as JSON
//! only affects the JSON expectations (`Outcome::DecodeError`), so a batch
//! always produces a complete diagnostic.

use std::fmt;

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Number, Value};

use crate::http::HttpResponse;
use crate::shape::{self, Shape};

/// A single assertion about an HTTP response.
///
/// Serialized externally tagged, e.g. `{"status_equals": 200}` or
/// `{"header_matches": {"name": "content-type", "pattern": "json"}}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Expectation {
    StatusEquals(u16),
    /// Header lookup is case-insensitive; `pattern` is a regular expression.
    HeaderMatches { name: String, pattern: String },
    /// Field types of the body, or of the first item of `body.data` for
    /// list endpoints shaped `{"data": [...]}`.
    JsonTypesMatch(Shape),
    /// Subset equality: only fields present in the expected value count.
    JsonDeepEquals(Value),
}

impl Expectation {
    pub fn status(expected: u16) -> Self {
        Expectation::StatusEquals(expected)
    }

    pub fn header(name: impl Into<String>, pattern: impl Into<String>) -> Self {
        Expectation::HeaderMatches {
            name: name.into(),
            pattern: pattern.into(),
        }
    }

    pub fn json_types(shape: Shape) -> Self {
        Expectation::JsonTypesMatch(shape)
    }

    pub fn json(expected: Value) -> Self {
        Expectation::JsonDeepEquals(expected)
    }

    /// Evaluate against a captured response.
    pub fn evaluate(&self, response: &HttpResponse) -> ExpectationResult {
        let outcome = match self {
            Expectation::StatusEquals(expected) => {
                if response.status == *expected {
                    Outcome::Passed
                } else {
                    Outcome::Mismatch(format!("expected {expected}, got {}", response.status))
                }
            }
            Expectation::HeaderMatches { name, pattern } => header_outcome(response, name, pattern),
            Expectation::JsonTypesMatch(shape) => match response.json() {
                Ok(body) => types_outcome(body, shape),
                Err(e) => Outcome::DecodeError(e.0),
            },
            Expectation::JsonDeepEquals(expected) => match response.json() {
                Ok(body) => {
                    let mut diffs = Vec::new();
                    subset_diff(expected, body, "", &mut diffs);
                    Outcome::from_details(diffs)
                }
                Err(e) => Outcome::DecodeError(e.0),
            },
        };

        ExpectationResult {
            expectation: self.clone(),
            outcome,
        }
    }
}

impl fmt::Display for Expectation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expectation::StatusEquals(status) => write!(f, "status equals {status}"),
            Expectation::HeaderMatches { name, pattern } => {
                write!(f, "header `{name}` matches /{pattern}/")
            }
            Expectation::JsonTypesMatch(shape) => {
                let fields: Vec<String> = shape
                    .fields()
                    .map(|(name, decl)| format!("{name}: {}", decl.describe()))
                    .collect();
                write!(f, "json types match {{{}}}", fields.join(", "))
            }
            Expectation::JsonDeepEquals(value) => write!(f, "json contains {value}"),
        }
    }
}

/// How one expectation fared.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Passed,
    Mismatch(String),
    DecodeError(String),
}

impl Outcome {
    fn from_details(details: Vec<String>) -> Self {
        if details.is_empty() {
            Outcome::Passed
        } else {
            Outcome::Mismatch(details.join("; "))
        }
    }
}

/// An expectation paired with its outcome.
#[derive(Debug, Clone, PartialEq)]
pub struct ExpectationResult {
    pub expectation: Expectation,
    pub outcome: Outcome,
}

impl ExpectationResult {
    pub fn passed(&self) -> bool {
        self.outcome == Outcome::Passed
    }

    pub fn detail(&self) -> Option<&str> {
        match &self.outcome {
            Outcome::Passed => None,
            Outcome::Mismatch(detail) | Outcome::DecodeError(detail) => Some(detail),
        }
    }
}

impl fmt::Display for ExpectationResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.outcome {
            Outcome::Passed => write!(f, "PASS {}", self.expectation),
            Outcome::Mismatch(detail) => write!(f, "FAIL {}: {detail}", self.expectation),
            Outcome::DecodeError(detail) => {
                write!(f, "FAIL {}: decode error: {detail}", self.expectation)
            }
        }
    }
}

/// Evaluate every expectation in order. Never stops early.
pub fn evaluate_all(response: &HttpResponse, expectations: &[Expectation]) -> Vec<ExpectationResult> {
    expectations.iter().map(|e| e.evaluate(response)).collect()
}

fn header_outcome(response: &HttpResponse, name: &str, pattern: &str) -> Outcome {
    let re = match Regex::new(pattern) {
        Ok(re) => re,
        Err(e) => return Outcome::Mismatch(format!("invalid pattern /{pattern}/: {e}")),
    };
    match response.header(name) {
        None => Outcome::Mismatch(format!("missing header `{name}`")),
        Some(value) if re.is_match(value) => Outcome::Passed,
        Some(value) => Outcome::Mismatch(format!(
            "header `{name}` value `{value}` does not match /{pattern}/"
        )),
    }
}

fn types_outcome(body: &Value, shape: &Shape) -> Outcome {
    // List endpoints wrap their items as {"data": [...]}.
    if let Some(items) = body.get("data").and_then(Value::as_array) {
        if !shape.declares("data") {
            return match items.first() {
                None => Outcome::Passed,
                Some(first) => Outcome::from_details(
                    shape::validate(first, shape)
                        .iter()
                        .map(|m| format!("data[0]: {m}"))
                        .collect(),
                ),
            };
        }
    }
    Outcome::from_details(shape::validate(body, shape).iter().map(ToString::to_string).collect())
}

fn subset_diff(expected: &Value, actual: &Value, path: &str, out: &mut Vec<String>) {
    match (expected, actual) {
        (Value::Object(exp), Value::Object(act)) => {
            for (key, exp_value) in exp {
                let field_path = if path.is_empty() {
                    key.clone()
                } else {
                    format!("{path}.{key}")
                };
                match act.get(key) {
                    Some(act_value) => subset_diff(exp_value, act_value, &field_path, out),
                    None => out.push(format!("missing field `{field_path}`")),
                }
            }
        }
        (Value::Array(exp), Value::Array(act)) => {
            if exp.len() != act.len() {
                out.push(format!(
                    "`{}`: expected {} elements, got {}",
                    display_path(path),
                    exp.len(),
                    act.len()
                ));
                return;
            }
            for (i, (e, a)) in exp.iter().zip(act).enumerate() {
                subset_diff(e, a, &format!("{path}[{i}]"), out);
            }
        }
        (Value::Number(e), Value::Number(a)) if numbers_equal(e, a) => {}
        (e, a) if e == a => {}
        (e, a) => out.push(format!("`{}`: expected {e}, got {a}", display_path(path))),
    }
}

/// Integers compare exactly; the float path only runs when one side is a
/// float, so `5` equals `5.0` but `2^53 + 1` never equals `2^53`.
fn numbers_equal(a: &Number, b: &Number) -> bool {
    if a.is_f64() || b.is_f64() {
        return matches!((a.as_f64(), b.as_f64()), (Some(x), Some(y)) if x == y);
    }
    match (a.as_i64(), b.as_i64()) {
        (Some(x), Some(y)) => x == y,
        _ => a.as_u64().is_some() && a.as_u64() == b.as_u64(),
    }
}

fn display_path(path: &str) -> &str {
    if path.is_empty() {
        "<root>"
    } else {
        path
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::RawResponse;
    use crate::shape::TypeDeclaration;
    use serde_json::json;

    fn json_response(status: u16, body: Value) -> HttpResponse {
        HttpResponse::capture(RawResponse {
            status,
            headers: vec![(
                "content-type".to_string(),
                "application/json; charset=utf-8".to_string(),
            )],
            body: body.to_string().into_bytes(),
        })
    }

    fn review_shape() -> Shape {
        Shape::new()
            .field("id", TypeDeclaration::Number)
            .field("product", TypeDeclaration::Number)
            .field("message", TypeDeclaration::String)
            .field("author", TypeDeclaration::String)
    }

    #[test]
    fn status_mismatch_detail_names_both_codes() {
        let resp = json_response(401, json!({"error": "unauthorized"}));
        assert!(Expectation::status(401).evaluate(&resp).passed());
        let result = Expectation::status(200).evaluate(&resp);
        assert!(!result.passed());
        assert_eq!(result.detail(), Some("expected 200, got 401"));
    }

    #[test]
    fn header_matches_case_insensitively_with_regex() {
        let resp = json_response(200, json!({}));
        assert!(Expectation::header("Content-Type", r"application/json").evaluate(&resp).passed());
        let result = Expectation::header("content-type", "^text/").evaluate(&resp);
        assert!(result.detail().unwrap().contains("does not match"));
    }

    #[test]
    fn missing_header_is_named() {
        let resp = json_response(200, json!({}));
        let result = Expectation::header("x-request-id", ".*").evaluate(&resp);
        assert_eq!(result.detail(), Some("missing header `x-request-id`"));
    }

    #[test]
    fn invalid_pattern_is_a_mismatch_not_a_panic() {
        let resp = json_response(200, json!({}));
        let result = Expectation::header("content-type", "(").evaluate(&resp);
        assert!(result.detail().unwrap().starts_with("invalid pattern"));
    }

    #[test]
    fn list_body_is_checked_through_first_data_item() {
        let resp = json_response(
            200,
            json!({"data": [{"id": 1, "product": 1, "message": "ok", "author": "bob"}]}),
        );
        let result = Expectation::json_types(review_shape()).evaluate(&resp);
        assert!(result.passed(), "{result}");
    }

    #[test]
    fn list_item_mismatch_is_prefixed() {
        let resp = json_response(200, json!({"data": [{"id": 1, "product": 1, "message": "ok"}]}));
        let result = Expectation::json_types(review_shape()).evaluate(&resp);
        assert_eq!(result.detail(), Some("data[0]: missing field `author`"));
    }

    #[test]
    fn empty_list_passes() {
        let resp = json_response(200, json!({"status": "success", "data": []}));
        assert!(Expectation::json_types(review_shape()).evaluate(&resp).passed());
    }

    #[test]
    fn shape_declaring_data_checks_the_body_itself() {
        let shape = Shape::new().field("data", TypeDeclaration::array());
        let resp = json_response(200, json!({"data": [1, 2]}));
        assert!(Expectation::json_types(shape).evaluate(&resp).passed());
    }

    #[test]
    fn deep_equals_is_a_subset_match() {
        let expect = Expectation::json(json!({"modified": 5}));
        let ok = json_response(200, json!({"modified": 5, "original": [], "updated": []}));
        let bad = json_response(200, json!({"modified": 4, "original": [], "updated": []}));
        assert!(expect.evaluate(&ok).passed());
        assert_eq!(expect.evaluate(&bad).detail(), Some("`modified`: expected 5, got 4"));
    }

    #[test]
    fn deep_equals_recurses_into_objects_and_arrays() {
        let resp = json_response(
            200,
            json!({"review": {"author": "bob", "likedBy": ["a", "b"], "likesCount": 2.0}}),
        );
        assert!(Expectation::json(json!({"review": {"likesCount": 2, "likedBy": ["a", "b"]}}))
            .evaluate(&resp)
            .passed());
        let result = Expectation::json(json!({"review": {"likedBy": ["a"], "missing": 1}})).evaluate(&resp);
        assert_eq!(
            result.detail(),
            Some("`review.likedBy`: expected 1 elements, got 2; missing field `review.missing`")
        );
    }

    #[test]
    fn deep_equals_compares_large_integers_exactly() {
        let resp = json_response(
            200,
            json!({"id": 9_007_199_254_740_993_u64, "big": u64::MAX, "neg": -9_007_199_254_740_993_i64}),
        );

        let result = Expectation::json(json!({"id": 9_007_199_254_740_992_u64})).evaluate(&resp);
        assert_eq!(
            result.detail(),
            Some("`id`: expected 9007199254740992, got 9007199254740993")
        );
        assert!(!Expectation::json(json!({"big": u64::MAX - 1})).evaluate(&resp).passed());
        assert!(!Expectation::json(json!({"neg": -9_007_199_254_740_992_i64})).evaluate(&resp).passed());
        assert!(Expectation::json(json!({"id": 9_007_199_254_740_993_u64, "big": u64::MAX}))
            .evaluate(&resp)
            .passed());
    }

    #[test]
    fn non_json_body_is_a_decode_error_for_json_expectations_only() {
        let resp = HttpResponse::capture(RawResponse {
            status: 200,
            headers: vec![("content-type".to_string(), "application/json".to_string())],
            body: b"not json".to_vec(),
        });
        let results = evaluate_all(
            &resp,
            &[
                Expectation::status(200),
                Expectation::json_types(review_shape()),
                Expectation::json(json!({"modified": 1})),
            ],
        );
        assert!(results[0].passed());
        assert!(matches!(results[1].outcome, Outcome::DecodeError(_)));
        assert!(matches!(results[2].outcome, Outcome::DecodeError(_)));
    }

    #[test]
    fn evaluation_is_idempotent() {
        let resp = json_response(200, json!({"modified": 3}));
        let expectations = [Expectation::status(201), Expectation::json(json!({"modified": 3}))];
        assert_eq!(evaluate_all(&resp, &expectations), evaluate_all(&resp, &expectations));
    }

    #[test]
    fn expectations_deserialize_from_scenario_json() {
        let parsed: Vec<Expectation> = serde_json::from_value(json!([
            {"status_equals": 200},
            {"header_matches": {"name": "content-type", "pattern": "application/json"}},
            {"json_types_match": {"modified": "number"}},
            {"json_deep_equals": {"modified": 2}}
        ]))
        .unwrap();
        assert_eq!(
            parsed,
            vec![
                Expectation::status(200),
                Expectation::header("content-type", "application/json"),
                Expectation::json_types(Shape::new().field("modified", TypeDeclaration::Number)),
                Expectation::json(json!({"modified": 2})),
            ]
        );
    }
}
