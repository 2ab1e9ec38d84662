//! Handler configuration.
//!
//! Per-request options (schema, root value, ...) live in [`crate::options`].
//! This module holds the process-wide defaults an operator usually sets once,
//! loadable from environment variables.
//!
//! # Environment Variables
//!
//! - `GRAPHQL_PRETTY`: Indent JSON responses (default: `false`)
//! - `GRAPHQL_GRAPHIQL`: Serve the GraphiQL page to browsers (default: `false`)
//! - `GRAPHQL_BODY_LIMIT`: Maximum request body size in bytes (default: `102400`)
//!
//! # Invariants
//!
//! - `body_limit` is never zero

/// Process-wide handler defaults.
///
/// # Post-conditions
///
/// When constructed via `from_env()`, every field holds either the parsed
/// environment value or its default.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Settings {
    /// Indent JSON responses with two spaces.
    pub pretty: bool,
    /// Allow the interactive page for clients that prefer HTML.
    pub graphiql: bool,
    /// Maximum accepted request body size, in bytes, after decompression.
    pub body_limit: usize,
}

/// Error returned when configuration is invalid.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// Options were built without a schema.
    MissingSchema,
    /// An environment variable has an invalid value.
    InvalidValue { name: String, message: String },
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingSchema => {
                write!(f, "GraphQL middleware options must contain a schema.")
            }
            Self::InvalidValue { name, message } => {
                write!(f, "invalid value for {name}: {message}")
            }
        }
    }
}

impl std::error::Error for ConfigError {}

impl Default for Settings {
    fn default() -> Self {
        Self {
            pretty: false,
            graphiql: false,
            body_limit: Self::DEFAULT_BODY_LIMIT,
        }
    }
}

impl Settings {
    /// Default maximum body size: 100 KiB.
    pub const DEFAULT_BODY_LIMIT: usize = 100 * 1024;

    /// Load settings from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if a variable is set to a value that cannot be parsed.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load settings through an arbitrary variable lookup.
    ///
    /// # Errors
    ///
    /// Returns an error if a variable is set to a value that cannot be parsed.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let pretty = match lookup("GRAPHQL_PRETTY") {
            Some(value) => parse_flag("GRAPHQL_PRETTY", &value)?,
            None => defaults.pretty,
        };
        let graphiql = match lookup("GRAPHQL_GRAPHIQL") {
            Some(value) => parse_flag("GRAPHQL_GRAPHIQL", &value)?,
            None => defaults.graphiql,
        };
        let body_limit = match lookup("GRAPHQL_BODY_LIMIT") {
            Some(value) => parse_limit(&value)?,
            None => defaults.body_limit,
        };

        Ok(Self {
            pretty,
            graphiql,
            body_limit,
        })
    }
}

fn parse_flag(name: &str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" => Ok(true),
        "0" | "false" => Ok(false),
        _ => Err(ConfigError::InvalidValue {
            name: name.to_owned(),
            message: format!("'{value}' is not a boolean (expected true, false, 1 or 0)"),
        }),
    }
}

fn parse_limit(value: &str) -> Result<usize, ConfigError> {
    match value.trim().parse::<usize>() {
        Ok(limit) if limit > 0 => Ok(limit),
        _ => Err(ConfigError::InvalidValue {
            name: "GRAPHQL_BODY_LIMIT".to_owned(),
            message: format!("'{value}' is not a positive number of bytes"),
        }),
    }
}
