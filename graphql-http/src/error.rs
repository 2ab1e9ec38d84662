//! Error types shared by the request pipeline.
//!
//! There are two layers of errors:
//!
//! - [`GraphQlError`] is what collaborators (the engine, the pipeline) produce
//!   internally. It may carry an arbitrary source error.
//! - [`ErrorEntry`] is what clients see. Every `GraphQlError` passes through an
//!   [`ErrorFormatter`] before it is written into a response.
//!
//! [`RequestError`] classifies the ways a request can end early and knows the
//! HTTP status each of them maps to.
//!
//! # Invariants
//!
//! - No `GraphQlError` is serialized directly; only `ErrorEntry` is.
//! - `RequestError::status()` is the single place status codes are assigned
//!   to terminal failures.

use std::sync::Arc;

use axum::http::StatusCode;
use serde::Serialize;
use serde_json::{Map, Value};

use crate::body::BodyDecodeError;
use crate::engine::OperationKind;

/// A position in the query source, 1-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SourceLocation {
    pub line: usize,
    pub column: usize,
}

/// One segment of the response path an execution error belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum PathSegment {
    Field(String),
    Index(usize),
}

impl From<&str> for PathSegment {
    fn from(field: &str) -> Self {
        Self::Field(field.to_owned())
    }
}

impl From<usize> for PathSegment {
    fn from(index: usize) -> Self {
        Self::Index(index)
    }
}

/// An error raised while handling a GraphQL request.
#[derive(Debug, Clone)]
pub struct GraphQlError {
    /// Human readable description.
    pub message: String,
    /// Source positions the error refers to. Empty when not tied to the source.
    pub locations: Vec<SourceLocation>,
    /// Response path of the field that failed. Empty outside execution.
    pub path: Vec<PathSegment>,
    /// Additional machine readable details.
    pub extensions: Option<Map<String, Value>>,
    /// The underlying cause, if any. Never sent to clients.
    pub source: Option<Arc<dyn std::error::Error + Send + Sync>>,
}

impl GraphQlError {
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            locations: Vec::new(),
            path: Vec::new(),
            extensions: None,
            source: None,
        }
    }

    #[must_use]
    pub fn with_location(mut self, line: usize, column: usize) -> Self {
        self.locations.push(SourceLocation { line, column });
        self
    }

    #[must_use]
    pub fn with_path(mut self, path: Vec<PathSegment>) -> Self {
        self.path = path;
        self
    }

    #[must_use]
    pub fn with_extensions(mut self, extensions: Map<String, Value>) -> Self {
        self.extensions = Some(extensions);
        self
    }

    #[must_use]
    pub fn with_source(mut self, source: impl std::error::Error + Send + Sync + 'static) -> Self {
        self.source = Some(Arc::new(source));
        self
    }
}

impl std::fmt::Display for GraphQlError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)?;
        if let Some(location) = self.locations.first() {
            write!(f, " ({}:{})", location.line, location.column)?;
        }
        Ok(())
    }
}

impl std::error::Error for GraphQlError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_deref()
            .map(|source| source as &(dyn std::error::Error + 'static))
    }
}

/// An error as it appears in the `errors` array of a response.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorEntry {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub locations: Option<Vec<SourceLocation>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<Vec<PathSegment>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extensions: Option<Map<String, Value>>,
    /// The error this entry was formatted from.
    #[serde(skip)]
    pub raw: Option<GraphQlError>,
}

/// Turns internal errors into client-facing entries.
///
/// Implemented for any `Fn(GraphQlError) -> ErrorEntry`, so a closure can be
/// passed wherever a formatter is expected.
pub trait ErrorFormatter: Send + Sync {
    fn format(&self, error: GraphQlError) -> ErrorEntry;
}

impl<F> ErrorFormatter for F
where
    F: Fn(GraphQlError) -> ErrorEntry + Send + Sync,
{
    fn format(&self, error: GraphQlError) -> ErrorEntry {
        self(error)
    }
}

/// Copies message, locations, path and extensions; omits empty lists.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultErrorFormatter;

impl ErrorFormatter for DefaultErrorFormatter {
    fn format(&self, error: GraphQlError) -> ErrorEntry {
        let locations = (!error.locations.is_empty()).then(|| error.locations.clone());
        let path = (!error.path.is_empty()).then(|| error.path.clone());
        ErrorEntry {
            message: error.message.clone(),
            locations,
            path,
            extensions: error.extensions.clone(),
            raw: Some(error),
        }
    }
}

/// Reasons a request ends before (or instead of) producing execution data.
#[derive(Debug)]
pub enum RequestError {
    /// The HTTP method is neither GET nor POST.
    MethodNotAllowed,
    /// The body decoder rejected the request body.
    BodyDecode(BodyDecodeError),
    /// `variables` was supplied but is not a JSON object.
    InvalidVariables,
    /// No query was supplied.
    MissingQuery,
    /// The query source failed to parse.
    Syntax(GraphQlError),
    /// The parsed document failed validation.
    Validation(Vec<GraphQlError>),
    /// A non-query operation was requested over GET.
    OperationNotAllowedOnGet(OperationKind),
    /// The executor could not set up execution (unknown operation name, bad
    /// variable values and the like).
    ExecutionContext(GraphQlError),
    /// Anything else. Carries its own status when it knows one.
    Unclassified {
        status: Option<StatusCode>,
        message: String,
    },
}

impl RequestError {
    /// The status code the response must carry.
    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            Self::MethodNotAllowed | Self::OperationNotAllowedOnGet(_) => {
                StatusCode::METHOD_NOT_ALLOWED
            }
            Self::BodyDecode(err) => err.status.unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
            Self::InvalidVariables
            | Self::MissingQuery
            | Self::Syntax(_)
            | Self::Validation(_)
            | Self::ExecutionContext(_) => StatusCode::BAD_REQUEST,
            Self::Unclassified { status, .. } => {
                status.unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
            }
        }
    }

    /// Value of the `Allow` header for 405 responses.
    #[must_use]
    pub const fn allow(&self) -> Option<&'static str> {
        match self {
            Self::MethodNotAllowed => Some("GET, POST"),
            Self::OperationNotAllowedOnGet(_) => Some("POST"),
            _ => None,
        }
    }

    /// The errors to report to the client, in order.
    #[must_use]
    pub fn into_errors(self) -> Vec<GraphQlError> {
        match self {
            Self::Syntax(err) | Self::ExecutionContext(err) => vec![err],
            Self::Validation(errors) => errors,
            Self::BodyDecode(err) => {
                let message = err.message.clone();
                vec![GraphQlError::new(message).with_source(err)]
            }
            other => vec![GraphQlError::new(other.to_string())],
        }
    }
}

impl std::fmt::Display for RequestError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MethodNotAllowed => write!(f, "GraphQL only supports GET and POST requests."),
            Self::BodyDecode(err) => write!(f, "{err}"),
            Self::InvalidVariables => write!(f, "Variables are invalid JSON."),
            Self::MissingQuery => write!(f, "Must provide query string."),
            Self::Syntax(err) | Self::ExecutionContext(err) => write!(f, "{err}"),
            Self::Validation(errors) => {
                write!(f, "query failed validation with {} error(s)", errors.len())
            }
            Self::OperationNotAllowedOnGet(kind) => {
                write!(f, "Can only perform a {kind} operation from a POST request.")
            }
            Self::Unclassified { message, .. } => write!(f, "{message}"),
        }
    }
}

impl std::error::Error for RequestError {}
