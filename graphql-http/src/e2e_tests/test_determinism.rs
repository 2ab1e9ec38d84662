//! Test that the same sequence of requests produces identical responses.

use axum::http::{Method, StatusCode};
use serde_json::json;

use crate::e2e_tests::helpers::*;

fn run_sequence() -> Vec<(StatusCode, String)> {
    let test = TestClient::with_options(|options| options.pretty(true));
    let responses = [
        test.post_json(&json!({ "query": "{ hello echo fail }", "variables": { "who": "x" } })),
        test.get(&format!("/graphql?query={}", encode("{ hello }"))),
        test.get(&format!("/graphql?query={}", encode("mutation { doThing }"))),
        test.post_json(&json!({ "query": "{ a b c }" })),
        test.post_json(&json!({ "query": "{ boom }" })),
        test.send(request(Method::DELETE, "/graphql", &[], "")),
    ];
    responses
        .into_iter()
        .map(|response| (response.status, response.body))
        .collect()
}

#[test]
fn test_deterministic_sequence() {
    let run1 = run_sequence();
    let run2 = run_sequence();

    assert_eq!(run1.len(), run2.len());
    for (i, (r1, r2)) in run1.iter().zip(run2.iter()).enumerate() {
        assert_eq!(r1.0, r2.0, "status mismatch at {i}");
        assert_eq!(r1.1, r2.1, "body mismatch at {i}");
    }
}

#[test]
fn test_repeated_request_on_one_handler() {
    let test = TestClient::new();
    let body = json!({ "query": "{ echo hello }", "variables": { "who": "same" } });
    let first = test.post_json(&body);
    for _ in 0..10 {
        let again = test.post_json(&body);
        assert_eq!(again.status, first.status);
        assert_eq!(again.body, first.body);
    }
}
