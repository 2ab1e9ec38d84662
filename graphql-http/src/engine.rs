//! The interface to the query engine.
//!
//! The adapter never parses or executes GraphQL itself. It drives an engine
//! through four steps, in order: `parse`, `validate`, `operation_kind` (GET
//! requests only) and `execute`. Each step failing maps to a distinct HTTP
//! status, so engines must report failures from the step that detects them.

use std::any::Any;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::error::GraphQlError;

/// An opaque value handed through to the engine untouched.
///
/// Used for the root value and the per-request context.
pub type Opaque = Arc<dyn Any + Send + Sync>;

/// The kind of an operation within a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationKind {
    Query,
    Mutation,
    Subscription,
}

impl OperationKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Query => "query",
            Self::Mutation => "mutation",
            Self::Subscription => "subscription",
        }
    }

    /// Only queries may be served over GET.
    #[must_use]
    pub const fn is_read_only(self) -> bool {
        matches!(self, Self::Query)
    }
}

impl std::fmt::Display for OperationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Everything the executor needs for one execution.
#[derive(Debug)]
pub struct ExecutionRequest<'a, D> {
    pub document: &'a D,
    pub root_value: Option<&'a Opaque>,
    pub context: Option<&'a Opaque>,
    pub variables: Option<&'a Map<String, Value>>,
    pub operation_name: Option<&'a str>,
}

/// The outcome of a completed execution.
///
/// `data` may be partial, in which case `errors` explains the missing parts.
/// A `None` or `null` `data` means execution produced nothing.
#[derive(Debug, Clone, Default)]
pub struct ExecutionResult {
    pub data: Option<Value>,
    pub errors: Vec<GraphQlError>,
}

impl ExecutionResult {
    #[must_use]
    pub const fn new(data: Value) -> Self {
        Self {
            data: Some(data),
            errors: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_errors(mut self, errors: Vec<GraphQlError>) -> Self {
        self.errors = errors;
        self
    }

    /// Whether execution produced any data at all.
    #[must_use]
    pub fn has_data(&self) -> bool {
        self.data.as_ref().is_some_and(|data| !data.is_null())
    }
}

/// A schema together with the parser, validator and executor that serve it.
///
/// Implementations are shared across concurrent requests and must not keep
/// per-request state.
#[async_trait]
pub trait GraphQlEngine: Send + Sync + 'static {
    /// The parsed form of a query source.
    type Document: Send + Sync;

    /// Parses `source`. A syntax error is reported as the single returned error.
    fn parse(&self, source: &str) -> Result<Self::Document, GraphQlError>;

    /// Validates a parsed document against the schema. Empty means valid.
    fn validate(&self, document: &Self::Document) -> Vec<GraphQlError>;

    /// The kind of the operation `operation_name` selects, or `None` when the
    /// selection is ambiguous or names no operation.
    fn operation_kind(
        &self,
        document: &Self::Document,
        operation_name: Option<&str>,
    ) -> Option<OperationKind>;

    /// Executes a validated document.
    ///
    /// # Errors
    ///
    /// Returns an error when execution cannot start, e.g. the operation name
    /// selects nothing or variable values cannot be coerced. Field errors are
    /// reported inside the `ExecutionResult` instead.
    async fn execute(
        &self,
        request: ExecutionRequest<'_, Self::Document>,
    ) -> Result<ExecutionResult, GraphQlError>;
}
