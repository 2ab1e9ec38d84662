//! The HTTP entry point.
//!
//! [`GraphQlHandler`] ties the pieces together: it resolves options, runs the
//! pipeline and formats the result. It can be called directly with a request
//! or mounted on an axum [`Router`].

use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::extract::State;
use axum::http::Request;
use axum::response::{IntoResponse, Response};
use axum::routing::any;

use crate::body::{BodyDecoder, StandardBodyDecoder};
use crate::engine::GraphQlEngine;
use crate::error::{DefaultErrorFormatter, ErrorFormatter, RequestError};
use crate::graphiql::{GraphiQlRenderer, PageRenderer};
use crate::options::OptionsSource;
use crate::params::QueryParams;
use crate::pipeline::{self, PipelineResult};
use crate::response::ResponseFormatter;

/// Serves GraphQL over HTTP for one schema.
///
/// # Invariants
///
/// - The handler holds no per-request state; any number of requests may be
///   served concurrently through a shared reference.
pub struct GraphQlHandler<E: GraphQlEngine> {
    options: OptionsSource<E>,
    decoder: Arc<dyn BodyDecoder>,
    renderer: Arc<dyn PageRenderer>,
}

impl<E: GraphQlEngine> GraphQlHandler<E> {
    /// A handler using the standard body decoder and the GraphiQL page.
    pub fn new(options: impl Into<OptionsSource<E>>) -> Self {
        Self {
            options: options.into(),
            decoder: Arc::new(StandardBodyDecoder::default()),
            renderer: Arc::new(GraphiQlRenderer::default()),
        }
    }

    /// Replace the body decoder.
    #[must_use]
    pub fn with_body_decoder(mut self, decoder: impl BodyDecoder + 'static) -> Self {
        self.decoder = Arc::new(decoder);
        self
    }

    /// Replace the interactive page.
    #[must_use]
    pub fn with_page_renderer(mut self, renderer: impl PageRenderer + 'static) -> Self {
        self.renderer = Arc::new(renderer);
        self
    }

    /// Handle one request.
    ///
    /// Never fails: every outcome, including a panic inside the engine, is
    /// turned into a response.
    pub async fn handle(&self, request: Request<Body>) -> Response {
        let (parts, body) = request.into_parts();
        tracing::debug!("{} {}", parts.method, parts.uri);

        let options = match self.options.resolve(&parts) {
            Ok(options) => options,
            Err(err) => {
                tracing::error!("failed to resolve GraphQL options: {err}");
                let result = PipelineResult::failure(
                    RequestError::Unclassified {
                        status: None,
                        message: err.to_string(),
                    },
                    false,
                );
                let formatter = ResponseFormatter {
                    renderer: Arc::clone(&self.renderer),
                    pretty: false,
                };
                return formatter
                    .format(result, &QueryParams::default(), &DefaultErrorFormatter)
                    .into_response();
            }
        };

        let outcome = pipeline::run(&options, self.decoder.as_ref(), &parts, body).await;

        let formatter = ResponseFormatter {
            renderer: Arc::clone(&self.renderer),
            pretty: options.pretty,
        };
        let format_error: &dyn ErrorFormatter = match &options.format_error {
            Some(custom) => custom.as_ref(),
            None => &DefaultErrorFormatter,
        };
        formatter
            .format(outcome.result, &outcome.params, format_error)
            .into_response()
    }

    /// A router serving this handler at `path` for every method.
    ///
    /// Methods other than GET and POST reach the handler and are refused there
    /// with a GraphQL error body.
    pub fn into_router(self, path: &str) -> Router {
        Router::new()
            .route(path, any(serve::<E>))
            .with_state(Arc::new(self))
    }
}

async fn serve<E: GraphQlEngine>(
    State(handler): State<Arc<GraphQlHandler<E>>>,
    request: Request<Body>,
) -> Response {
    handler.handle(request).await
}
