//! Turning a pipeline result into an HTTP response.

use std::sync::Arc;

use axum::http::{HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::{ErrorEntry, ErrorFormatter};
use crate::graphiql::{PageData, PageRenderer};
use crate::params::QueryParams;
use crate::pipeline::PipelineResult;

pub const JSON_CONTENT_TYPE: &str = "application/json";
pub const HTML_CONTENT_TYPE: &str = "text/html; charset=utf-8";

/// The JSON document sent to clients.
#[derive(Debug, Clone, Default, Serialize)]
pub struct GraphQlResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<ErrorEntry>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extensions: Option<Map<String, Value>>,
}

/// A fully formatted response, before it is handed to axum.
#[derive(Debug, Clone)]
pub struct FormattedResponse {
    pub status: StatusCode,
    pub allow: Option<&'static str>,
    pub content_type: &'static str,
    pub body: String,
}

impl IntoResponse for FormattedResponse {
    fn into_response(self) -> Response {
        let mut response = (self.status, self.body).into_response();
        let headers = response.headers_mut();
        headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static(self.content_type),
        );
        if let Some(allow) = self.allow {
            headers.insert(header::ALLOW, HeaderValue::from_static(allow));
        }
        response
    }
}

/// Writes results either as JSON or as the interactive page.
pub struct ResponseFormatter {
    pub renderer: Arc<dyn PageRenderer>,
    pub pretty: bool,
}

impl ResponseFormatter {
    /// Format `result`, passing every error through `format_error`.
    ///
    /// # Post-conditions
    ///
    /// - The status and `Allow` header are exactly those of `result`.
    /// - A deferred result renders the page with no embedded result.
    #[must_use]
    pub fn format(
        &self,
        result: PipelineResult,
        params: &QueryParams,
        format_error: &dyn ErrorFormatter,
    ) -> FormattedResponse {
        let status = result.status;
        let allow = result.allow;
        let show_interactive_page = result.show_interactive_page;
        let deferred = result.is_deferred();

        let response = GraphQlResponse {
            data: result.data,
            errors: result
                .errors
                .into_iter()
                .map(|error| format_error.format(error))
                .collect(),
            extensions: result.extensions,
        };

        if show_interactive_page {
            let body = self.renderer.render(&PageData {
                query: params.query.as_deref(),
                variables: params.variables.as_ref(),
                operation_name: params.operation_name.as_deref(),
                result: (!deferred).then_some(&response),
            });
            return FormattedResponse {
                status,
                allow,
                content_type: HTML_CONTENT_TYPE,
                body,
            };
        }

        FormattedResponse {
            status,
            allow,
            content_type: JSON_CONTENT_TYPE,
            body: self.to_json(&response),
        }
    }

    fn to_json(&self, response: &GraphQlResponse) -> String {
        let encoded = if self.pretty {
            serde_json::to_string_pretty(response)
        } else {
            serde_json::to_string(response)
        };
        encoded.unwrap_or_else(|err| {
            tracing::error!("failed to serialize response: {err}");
            r#"{"errors":[{"message":"Failed to serialize response."}]}"#.to_owned()
        })
    }
}
