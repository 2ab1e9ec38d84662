//! The request pipeline.
//!
//! A request moves through a fixed sequence of stages. Every stage either
//! hands a value to the next one ([`Stage::Continue`]) or ends the request
//! with a result ([`Stage::Terminal`]):
//!
//! 1. Method check (GET and POST only)
//! 2. Body decode
//! 3. Negotiation: may the interactive page be shown?
//! 4. Parameter extraction
//! 5. Missing-query check
//! 6. Parse
//! 7. Validate
//! 8. GET operation-kind check
//! 9. Execute
//!
//! Panics raised by the engine while running stages 6-9 are caught and
//! reported as unclassified failures.
//!
//! # Invariants
//!
//! - The status of a result is decided by the stage that produces it and is
//!   never changed afterwards.
//! - Stages of one request run strictly in order; nothing is shared between
//!   requests except the read-only `Options`.

use std::any::Any;
use std::panic::AssertUnwindSafe;

use axum::body::Body;
use axum::http::request::Parts;
use axum::http::{Method, StatusCode};
use futures::FutureExt;
use serde_json::{Map, Value};

use crate::body::{BodyDecoder, DecodedBody};
use crate::engine::{ExecutionRequest, ExecutionResult, GraphQlEngine};
use crate::error::{GraphQlError, RequestError};
use crate::negotiation::may_show_interactive_page;
use crate::options::{ExtensionsInfo, Options};
use crate::params::{self, QueryParams, UrlParams};

/// The outcome of one pipeline stage.
#[derive(Debug)]
pub enum Stage<T> {
    /// Hand `T` to the next stage.
    Continue(T),
    /// Stop here and respond with this result.
    Terminal(PipelineResult),
}

impl<T> From<PipelineResult> for Stage<T> {
    fn from(result: PipelineResult) -> Self {
        Self::Terminal(result)
    }
}

/// Unwrap a `Continue` value or return the terminal result from the caller.
macro_rules! proceed {
    ($stage:expr) => {
        match $stage {
            Stage::Continue(value) => value,
            Stage::Terminal(result) => return result.into(),
        }
    };
}

/// What a request ends with, ready to be formatted.
#[derive(Debug)]
pub struct PipelineResult {
    /// Execution data. `None` when execution never ran.
    pub data: Option<Value>,
    /// Unformatted errors, in the order they were raised.
    pub errors: Vec<GraphQlError>,
    pub extensions: Option<Map<String, Value>>,
    pub status: StatusCode,
    /// Value of the `Allow` header, for 405 responses.
    pub allow: Option<&'static str>,
    pub show_interactive_page: bool,
}

impl PipelineResult {
    /// Nothing to report: the interactive page takes over with an empty result.
    #[must_use]
    pub const fn deferred(show_interactive_page: bool) -> Self {
        Self {
            data: None,
            errors: Vec::new(),
            extensions: None,
            status: StatusCode::OK,
            allow: None,
            show_interactive_page,
        }
    }

    /// A request that ended with `error`.
    #[must_use]
    pub fn failure(error: RequestError, show_interactive_page: bool) -> Self {
        let status = error.status();
        if matches!(error, RequestError::Unclassified { .. }) {
            tracing::warn!("request failed unexpectedly with {status}: {error}");
        } else {
            tracing::debug!("request rejected with {status}: {error}");
        }
        Self {
            data: None,
            allow: error.allow(),
            errors: error.into_errors(),
            extensions: None,
            status,
            show_interactive_page,
        }
    }

    /// A completed execution. A result without data is reported as a 500.
    #[must_use]
    pub fn executed(
        result: ExecutionResult,
        extensions: Option<Map<String, Value>>,
        show_interactive_page: bool,
    ) -> Self {
        let status = if result.has_data() {
            StatusCode::OK
        } else {
            tracing::debug!(
                "execution produced no data ({} error(s))",
                result.errors.len()
            );
            StatusCode::INTERNAL_SERVER_ERROR
        };
        Self {
            data: result.data,
            errors: result.errors,
            extensions,
            status,
            allow: None,
            show_interactive_page,
        }
    }

    /// Whether the pipeline stopped without anything to show.
    #[must_use]
    pub fn is_deferred(&self) -> bool {
        self.status == StatusCode::OK && self.data.is_none() && self.errors.is_empty()
    }
}

/// Read-only view of the request, shared by every stage.
#[derive(Debug)]
pub struct RequestContext<'a> {
    pub parts: &'a Parts,
    pub url: UrlParams,
    pub body: DecodedBody,
}

/// A request that made it through decoding and parameter extraction.
#[derive(Debug)]
pub struct PreparedRequest<'a> {
    pub context: RequestContext<'a>,
    pub show_interactive_page: bool,
    pub params: QueryParams,
}

/// The pipeline result together with the parameters it was computed for.
#[derive(Debug)]
pub struct Outcome {
    pub result: PipelineResult,
    /// Empty when the request ended before extraction.
    pub params: QueryParams,
}

/// Run the whole pipeline for one request.
pub async fn run<E: GraphQlEngine>(
    options: &Options<E>,
    decoder: &dyn BodyDecoder,
    parts: &Parts,
    body: Body,
) -> Outcome {
    let request = match prepare(options, decoder, parts, body).await {
        Stage::Continue(request) => request,
        Stage::Terminal(result) => {
            return Outcome {
                result,
                params: QueryParams::default(),
            };
        }
    };

    let result = match AssertUnwindSafe(respond(options, &request)).catch_unwind().await {
        Ok(result) => result,
        Err(panic) => PipelineResult::failure(
            RequestError::Unclassified {
                status: None,
                message: panic_message(panic.as_ref()),
            },
            request.show_interactive_page,
        ),
    };

    Outcome {
        result,
        params: request.params,
    }
}

/// Stages 1-4.
async fn prepare<'a, E: GraphQlEngine>(
    options: &Options<E>,
    decoder: &dyn BodyDecoder,
    parts: &'a Parts,
    body: Body,
) -> Stage<PreparedRequest<'a>> {
    proceed!(check_method(&parts.method));
    let body = proceed!(decode_body(decoder, parts, body).await);
    let context = RequestContext {
        parts,
        url: UrlParams::from_uri(&parts.uri),
        body,
    };
    let show_interactive_page = negotiate(&context, options.graphiql);
    let params = proceed!(extract_params(&context, show_interactive_page));

    Stage::Continue(PreparedRequest {
        context,
        show_interactive_page,
        params,
    })
}

/// Stages 5-9.
async fn respond<E: GraphQlEngine>(
    options: &Options<E>,
    request: &PreparedRequest<'_>,
) -> PipelineResult {
    let show = request.show_interactive_page;
    let engine = options.schema.as_ref();
    let operation_name = request.params.operation_name.as_deref();

    let query = proceed!(require_query(&request.params, show));
    let document = proceed!(parse(engine, query, show));
    proceed!(validate(engine, &document, show));
    proceed!(check_get_operation(
        engine,
        &request.context.parts.method,
        &document,
        operation_name,
        show
    ));
    execute(options, request, query, &document).await
}

fn check_method(method: &Method) -> Stage<()> {
    if *method == Method::GET || *method == Method::POST {
        Stage::Continue(())
    } else {
        fail(RequestError::MethodNotAllowed, false)
    }
}

async fn decode_body(decoder: &dyn BodyDecoder, parts: &Parts, body: Body) -> Stage<DecodedBody> {
    match decoder.decode(parts, body).await {
        Ok(body) => Stage::Continue(body),
        Err(err) => fail(RequestError::BodyDecode(err), false),
    }
}

fn negotiate(context: &RequestContext<'_>, graphiql: bool) -> bool {
    may_show_interactive_page(&context.parts.headers, &context.url, &context.body, graphiql)
}

fn extract_params(context: &RequestContext<'_>, show: bool) -> Stage<QueryParams> {
    match params::extract(&context.url, &context.body) {
        Ok(params) => Stage::Continue(params),
        Err(err) => fail(err, show),
    }
}

fn require_query(params: &QueryParams, show: bool) -> Stage<&str> {
    match params.query.as_deref() {
        Some(query) if !query.is_empty() => Stage::Continue(query),
        _ if show => Stage::Terminal(PipelineResult::deferred(show)),
        _ => fail(RequestError::MissingQuery, show),
    }
}

fn parse<E: GraphQlEngine>(engine: &E, query: &str, show: bool) -> Stage<E::Document> {
    match engine.parse(query) {
        Ok(document) => Stage::Continue(document),
        Err(err) => fail(RequestError::Syntax(err), show),
    }
}

fn validate<E: GraphQlEngine>(engine: &E, document: &E::Document, show: bool) -> Stage<()> {
    let errors = engine.validate(document);
    if errors.is_empty() {
        Stage::Continue(())
    } else {
        fail(RequestError::Validation(errors), show)
    }
}

/// Only queries may run over GET; anything else is refused or left to the page.
fn check_get_operation<E: GraphQlEngine>(
    engine: &E,
    method: &Method,
    document: &E::Document,
    operation_name: Option<&str>,
    show: bool,
) -> Stage<()> {
    if *method != Method::GET {
        return Stage::Continue(());
    }
    match engine.operation_kind(document, operation_name) {
        Some(kind) if !kind.is_read_only() => {
            if show {
                Stage::Terminal(PipelineResult::deferred(show))
            } else {
                fail(RequestError::OperationNotAllowedOnGet(kind), show)
            }
        }
        _ => Stage::Continue(()),
    }
}

async fn execute<E: GraphQlEngine>(
    options: &Options<E>,
    request: &PreparedRequest<'_>,
    query: &str,
    document: &E::Document,
) -> PipelineResult {
    let show = request.show_interactive_page;
    let params = &request.params;
    let execution = options
        .schema
        .execute(ExecutionRequest {
            document,
            root_value: options.root_value.as_ref(),
            context: options.context.as_ref(),
            variables: params.variables.as_ref(),
            operation_name: params.operation_name.as_deref(),
        })
        .await;

    match execution {
        Ok(result) => {
            let extensions = options.extensions.as_ref().and_then(|hook| {
                hook(&ExtensionsInfo {
                    query,
                    variables: params.variables.as_ref(),
                    operation_name: params.operation_name.as_deref(),
                    result: &result,
                    context: options.context.as_ref(),
                })
            });
            PipelineResult::executed(result, extensions, show)
        }
        Err(err) => PipelineResult::failure(RequestError::ExecutionContext(err), show),
    }
}

fn fail<T>(error: RequestError, show: bool) -> Stage<T> {
    Stage::Terminal(PipelineResult::failure(error, show))
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|message| (*message).to_owned())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "Unexpected error.".to_owned())
}
