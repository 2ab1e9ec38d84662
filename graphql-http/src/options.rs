//! Per-request options and how they are resolved.
//!
//! Options are either fixed when the handler is built ([`OptionsSource::Static`])
//! or computed from each incoming request ([`OptionsSource::Computed`]). Both
//! resolve to a fresh [`Options`] value per request; the shared parts (schema,
//! root value, hooks) are reference counted and never mutated.

use std::any::Any;
use std::sync::Arc;

use axum::http::request::Parts;
use serde_json::{Map, Value};

use crate::config::{ConfigError, Settings};
use crate::engine::{ExecutionResult, GraphQlEngine, Opaque};
use crate::error::ErrorFormatter;

/// What the extensions hook sees after a successful execution.
#[derive(Debug)]
pub struct ExtensionsInfo<'a> {
    pub query: &'a str,
    pub variables: Option<&'a Map<String, Value>>,
    pub operation_name: Option<&'a str>,
    pub result: &'a ExecutionResult,
    pub context: Option<&'a Opaque>,
}

/// Computes the `extensions` member of a response.
pub type ExtensionsHook =
    Arc<dyn Fn(&ExtensionsInfo<'_>) -> Option<Map<String, Value>> + Send + Sync>;

/// Computes options from the request head.
pub type OptionsFn<E> = Arc<dyn Fn(&Parts) -> Result<Options<E>, ConfigError> + Send + Sync>;

/// Options used to serve a single request.
pub struct Options<E: GraphQlEngine> {
    /// The engine serving the schema.
    pub schema: Arc<E>,
    /// Passed to the executor as the root value.
    pub root_value: Option<Opaque>,
    /// Passed to the executor as the request context.
    pub context: Option<Opaque>,
    /// Indent JSON responses.
    pub pretty: bool,
    /// Allow the interactive page for clients that prefer HTML.
    pub graphiql: bool,
    /// Replaces the default error formatting.
    pub format_error: Option<Arc<dyn ErrorFormatter>>,
    /// Adds an `extensions` member to successful responses.
    pub extensions: Option<ExtensionsHook>,
}

impl<E: GraphQlEngine> Options<E> {
    #[must_use]
    pub fn builder() -> OptionsBuilder<E> {
        OptionsBuilder::default()
    }
}

impl<E: GraphQlEngine> Clone for Options<E> {
    fn clone(&self) -> Self {
        Self {
            schema: Arc::clone(&self.schema),
            root_value: self.root_value.as_ref().map(Arc::clone),
            context: self.context.as_ref().map(Arc::clone),
            pretty: self.pretty,
            graphiql: self.graphiql,
            format_error: self.format_error.as_ref().map(Arc::clone),
            extensions: self.extensions.as_ref().map(Arc::clone),
        }
    }
}

impl<E: GraphQlEngine> std::fmt::Debug for Options<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Options")
            .field("root_value", &self.root_value.is_some())
            .field("context", &self.context.is_some())
            .field("pretty", &self.pretty)
            .field("graphiql", &self.graphiql)
            .field("format_error", &self.format_error.is_some())
            .field("extensions", &self.extensions.is_some())
            .finish_non_exhaustive()
    }
}

/// Builds [`Options`], checking that a schema was supplied.
pub struct OptionsBuilder<E: GraphQlEngine> {
    schema: Option<Arc<E>>,
    root_value: Option<Opaque>,
    context: Option<Opaque>,
    pretty: bool,
    graphiql: bool,
    format_error: Option<Arc<dyn ErrorFormatter>>,
    extensions: Option<ExtensionsHook>,
}

impl<E: GraphQlEngine> Default for OptionsBuilder<E> {
    fn default() -> Self {
        Self {
            schema: None,
            root_value: None,
            context: None,
            pretty: false,
            graphiql: false,
            format_error: None,
            extensions: None,
        }
    }
}

impl<E: GraphQlEngine> OptionsBuilder<E> {
    #[must_use]
    pub fn schema(mut self, schema: Arc<E>) -> Self {
        self.schema = Some(schema);
        self
    }

    #[must_use]
    pub fn root_value<T: Any + Send + Sync>(mut self, root_value: T) -> Self {
        self.root_value = Some(Arc::new(root_value));
        self
    }

    #[must_use]
    pub fn context<T: Any + Send + Sync>(mut self, context: T) -> Self {
        self.context = Some(Arc::new(context));
        self
    }

    #[must_use]
    pub const fn pretty(mut self, pretty: bool) -> Self {
        self.pretty = pretty;
        self
    }

    #[must_use]
    pub const fn graphiql(mut self, graphiql: bool) -> Self {
        self.graphiql = graphiql;
        self
    }

    /// Take `pretty` and `graphiql` from process-wide settings.
    #[must_use]
    pub const fn settings(self, settings: &Settings) -> Self {
        self.pretty(settings.pretty).graphiql(settings.graphiql)
    }

    #[must_use]
    pub fn format_error(mut self, formatter: impl ErrorFormatter + 'static) -> Self {
        self.format_error = Some(Arc::new(formatter));
        self
    }

    #[must_use]
    pub fn extensions<F>(mut self, hook: F) -> Self
    where
        F: Fn(&ExtensionsInfo<'_>) -> Option<Map<String, Value>> + Send + Sync + 'static,
    {
        self.extensions = Some(Arc::new(hook));
        self
    }

    /// # Errors
    ///
    /// Returns `ConfigError::MissingSchema` if no schema was set.
    pub fn build(self) -> Result<Options<E>, ConfigError> {
        let schema = self.schema.ok_or(ConfigError::MissingSchema)?;
        Ok(Options {
            schema,
            root_value: self.root_value,
            context: self.context,
            pretty: self.pretty,
            graphiql: self.graphiql,
            format_error: self.format_error,
            extensions: self.extensions,
        })
    }
}

/// Where per-request options come from.
pub enum OptionsSource<E: GraphQlEngine> {
    /// The same options for every request.
    Static(Options<E>),
    /// Options computed from each request.
    Computed(OptionsFn<E>),
}

impl<E: GraphQlEngine> OptionsSource<E> {
    /// Wrap a function computing options per request.
    pub fn computed<F>(f: F) -> Self
    where
        F: Fn(&Parts) -> Result<Options<E>, ConfigError> + Send + Sync + 'static,
    {
        Self::Computed(Arc::new(f))
    }

    /// Resolve the options for one request.
    ///
    /// # Errors
    ///
    /// Returns whatever error a computed source produces. Static sources
    /// always succeed.
    pub fn resolve(&self, parts: &Parts) -> Result<Options<E>, ConfigError> {
        match self {
            Self::Static(options) => Ok(options.clone()),
            Self::Computed(compute) => compute(parts),
        }
    }
}

impl<E: GraphQlEngine> From<Options<E>> for OptionsSource<E> {
    fn from(options: Options<E>) -> Self {
        Self::Static(options)
    }
}
