//! Queries over GET.

use axum::http::StatusCode;
use serde_json::json;

use crate::e2e_tests::helpers::*;

#[test]
fn test_query_in_url() {
    let test = TestClient::new();
    let response = test.get(&format!("/graphql?query={}", encode("{ hello }")));

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body, r#"{"data":{"hello":"world"}}"#);
}

#[test]
fn test_url_wins_over_body() {
    let test = TestClient::new();
    let response = test.send(request(
        axum::http::Method::POST,
        &format!("/graphql?query={}", encode("{ echo }")),
        &[("content-type", "application/json")],
        json!({ "query": "{ hello }", "variables": { "who": "body" } }).to_string(),
    ));

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.json(), json!({ "data": { "echo": "body" } }));
}

#[test]
fn test_query_operation_among_mutations() {
    let test = TestClient::new();
    let query = encode("query Read { hello } mutation Write { doThing }");
    let response = test.get(&format!("/graphql?query={query}&operationName=Read"));

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.json(), json!({ "data": { "hello": "world" } }));
}
