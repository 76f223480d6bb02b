//! Verify expectation evaluation and shape validation against JSON test
//! vectors stored in `test-vectors/`.
//!
//! Each expectation vector describes a captured response, the expectations
//! declared against it and the per-expectation verdicts. Shape vectors pair
//! a declaration and a value with the rendered mismatch list.

use contract_core::{evaluate, validate, Expectation, HttpResponse, RawResponse, Shape};
use serde_json::Value;

fn response_from(vector: &Value) -> HttpResponse {
    let headers = vector["headers"]
        .as_array()
        .unwrap()
        .iter()
        .map(|h| {
            let pair = h.as_array().unwrap();
            (pair[0].as_str().unwrap().to_string(), pair[1].as_str().unwrap().to_string())
        })
        .collect();
    HttpResponse::capture(RawResponse {
        status: vector["status"].as_u64().unwrap() as u16,
        headers,
        body: vector["body"].as_str().unwrap().as_bytes().to_vec(),
    })
}

// ---------------------------------------------------------------------------
// Expectations
// ---------------------------------------------------------------------------

#[test]
fn expectation_test_vectors() {
    let raw = include_str!("../../test-vectors/expectations.json");
    let vectors: Value = serde_json::from_str(raw).unwrap();

    for case in vectors["cases"].as_array().unwrap() {
        let name = case["name"].as_str().unwrap();
        let response = response_from(&case["response"]);
        let expectations: Vec<Expectation> = serde_json::from_value(case["expectations"].clone()).unwrap();
        let expected = case["expected"].as_array().unwrap();

        let result = evaluate(response, &expectations);
        assert_eq!(result.entries.len(), expected.len(), "{name}: entry count");

        for (i, (entry, want)) in result.entries.iter().zip(expected).enumerate() {
            assert_eq!(entry.expectation, expectations[i], "{name}[{i}]: order");
            assert_eq!(entry.passed(), want["passed"].as_bool().unwrap(), "{name}[{i}]: {entry}");
            if let Some(detail) = want.get("detail") {
                assert_eq!(entry.detail(), detail.as_str(), "{name}[{i}]: detail");
            }
        }

        let all_passed = expected.iter().all(|w| w["passed"].as_bool().unwrap());
        assert_eq!(result.passed(), all_passed, "{name}: overall");
    }
}

// ---------------------------------------------------------------------------
// Shapes
// ---------------------------------------------------------------------------

#[test]
fn shape_test_vectors() {
    let raw = include_str!("../../test-vectors/shapes.json");
    let vectors: Value = serde_json::from_str(raw).unwrap();

    for case in vectors["cases"].as_array().unwrap() {
        let name = case["name"].as_str().unwrap();
        let shape: Shape = serde_json::from_value(case["shape"].clone()).unwrap();

        let rendered: Vec<String> = validate(&case["value"], &shape)
            .iter()
            .map(ToString::to_string)
            .collect();
        let expected: Vec<String> = serde_json::from_value(case["mismatches"].clone()).unwrap();
        assert_eq!(rendered, expected, "{name}: mismatches");
    }
}
