// Life of a request:
// 1. Request comes in (any method, any path the router mounts us on)
// 2. Resolve options: static, or computed from the request head
// 3. Pipeline:
//     - Method check
//     - Decode body
//     - Decide whether the GraphiQL page may be shown
//     - Extract query / variables / operationName
//     - Parse, validate, check GET operation kind
//     - Execute
//    Any stage can end the request early with a status and errors.
// 4. Format errors, then respond with JSON or the GraphiQL page
//
// System components:
//  - GraphQL engine (parser, validator, executor), supplied by the caller
//  - Body decoder
//  - Page renderer
//  - Error formatter

pub mod body;
pub mod config;
pub mod engine;
pub mod error;
pub mod graphiql;
pub mod handler;
pub mod negotiation;
pub mod options;
pub mod params;
pub mod pipeline;
pub mod response;

#[cfg(test)]
mod testing;

pub use body::{BodyDecodeError, BodyDecoder, DecodedBody, StandardBodyDecoder};
pub use config::{ConfigError, Settings};
pub use engine::{ExecutionRequest, ExecutionResult, GraphQlEngine, Opaque, OperationKind};
pub use error::{
    DefaultErrorFormatter, ErrorEntry, ErrorFormatter, GraphQlError, PathSegment, RequestError,
    SourceLocation,
};
pub use graphiql::{GraphiQlRenderer, PageData, PageRenderer};
pub use handler::GraphQlHandler;
pub use options::{ExtensionsHook, ExtensionsInfo, Options, OptionsBuilder, OptionsSource};
pub use params::QueryParams;
pub use response::GraphQlResponse;
