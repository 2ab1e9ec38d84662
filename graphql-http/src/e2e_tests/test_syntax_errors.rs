//! Documents that fail to parse.

use axum::http::StatusCode;
use serde_json::json;

use crate::e2e_tests::helpers::*;

#[test]
fn test_syntax_error_is_400_with_location() {
    let test = TestClient::new();
    let response = test.post_json(&json!({ "query": "{ hello" }));

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(
        response.json(),
        json!({
            "errors": [{
                "message": "Syntax Error: Unexpected <EOF>.",
                "locations": [{ "line": 1, "column": 8 }],
            }]
        })
    );
}

#[test]
fn test_syntax_error_over_get() {
    let test = TestClient::new();
    let response = test.get(&format!("/graphql?query={}", encode("{ he$llo }")));

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.error_messages(), ["Syntax Error: Unexpected character \"$\"."]);
    assert!(response.json().get("data").is_none());
}
