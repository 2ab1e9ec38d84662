//! Extraction of GraphQL parameters from a request.
//!
//! Parameters can arrive in the URL query string, in the decoded body, or
//! both. For each parameter the URL wins: a value set explicitly on the
//! request line overrides whatever the payload carries.

use std::collections::HashMap;

use axum::http::Uri;
use serde_json::{Map, Value};

use crate::body::DecodedBody;
use crate::error::RequestError;

/// The GraphQL parameters of one request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryParams {
    pub query: Option<String>,
    pub variables: Option<Map<String, Value>>,
    pub operation_name: Option<String>,
    /// Set when the client asked for JSON regardless of its `Accept` header.
    pub raw: bool,
}

/// Parameters from the URL query string.
#[derive(Debug, Clone, Default)]
pub struct UrlParams {
    values: HashMap<String, String>,
}

impl UrlParams {
    /// Parse the query string of `uri`. Malformed input yields no parameters.
    #[must_use]
    pub fn from_uri(uri: &Uri) -> Self {
        let Some(query) = uri.query() else {
            return Self::default();
        };
        match serde_urlencoded::from_str::<Vec<(String, String)>>(query) {
            Ok(pairs) => Self {
                values: pairs.into_iter().collect(),
            },
            Err(err) => {
                tracing::debug!("ignoring malformed query string: {err}");
                Self::default()
            }
        }
    }

    /// The value of `name`, if present and non-empty.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.values
            .get(name)
            .map(String::as_str)
            .filter(|value| !value.is_empty())
    }

    /// Whether `name` appears at all, with or without a value.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }
}

/// Combine URL and body parameters.
///
/// # Errors
///
/// Returns `RequestError::InvalidVariables` if `variables` is a string that is
/// not a JSON object, or is neither a string, an object nor null.
pub fn extract(url: &UrlParams, body: &DecodedBody) -> Result<QueryParams, RequestError> {
    let query = url
        .get("query")
        .map(str::to_owned)
        .or_else(|| body_string(body, "query"));
    let operation_name = url
        .get("operationName")
        .map(str::to_owned)
        .or_else(|| body_string(body, "operationName"));

    let variables = match url.get("variables") {
        Some(text) => parse_variables(text)?,
        None => match body.get("variables") {
            None | Some(Value::Null) => None,
            Some(Value::String(text)) if text.is_empty() => None,
            Some(Value::String(text)) => parse_variables(text)?,
            Some(Value::Object(map)) => Some(map.clone()),
            Some(_) => return Err(RequestError::InvalidVariables),
        },
    };

    Ok(QueryParams {
        query,
        variables,
        operation_name,
        raw: url.contains("raw") || body.contains_key("raw"),
    })
}

fn body_string(body: &DecodedBody, name: &str) -> Option<String> {
    match body.get(name) {
        Some(Value::String(value)) if !value.is_empty() => Some(value.clone()),
        _ => None,
    }
}

fn parse_variables(text: &str) -> Result<Option<Map<String, Value>>, RequestError> {
    match serde_json::from_str::<Value>(text) {
        Ok(Value::Object(map)) => Ok(Some(map)),
        Ok(Value::Null) => Ok(None),
        Ok(_) | Err(_) => Err(RequestError::InvalidVariables),
    }
}
