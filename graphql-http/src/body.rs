//! Request body decoding.
//!
//! The pipeline only needs the body as a JSON object; how it gets there is up
//! to a [`BodyDecoder`]. [`StandardBodyDecoder`] understands the encodings
//! GraphQL clients send:
//!
//! | Content-Type | Result |
//! |--------------|--------|
//! | `application/json` | the JSON object |
//! | `application/x-www-form-urlencoded` | one string field per pair |
//! | `application/graphql` | `{ "query": <body> }` |
//! | anything else, or none | `{}` |
//!
//! Bodies may be gzip or deflate compressed. The size limit applies to the
//! decompressed body as well as to the bytes on the wire.

use std::io::Read;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::request::Parts;
use axum::http::{HeaderMap, StatusCode, header};
use flate2::read::{GzDecoder, ZlibDecoder};
use http_body_util::{BodyExt, LengthLimitError, Limited};
use serde_json::{Map, Value};

use crate::config::Settings;

/// The decoded request body.
pub type DecodedBody = Map<String, Value>;

/// Error returned when the request body cannot be decoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BodyDecodeError {
    /// The status to respond with; `None` means 500.
    pub status: Option<StatusCode>,
    pub message: String,
}

impl BodyDecodeError {
    #[must_use]
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status: Some(status),
            message: message.into(),
        }
    }

    fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    fn too_large() -> Self {
        Self::new(
            StatusCode::PAYLOAD_TOO_LARGE,
            "Invalid body: request entity too large.",
        )
    }
}

impl std::fmt::Display for BodyDecodeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for BodyDecodeError {}

/// Reads a request body into a JSON object.
#[async_trait]
pub trait BodyDecoder: Send + Sync {
    async fn decode(&self, parts: &Parts, body: Body) -> Result<DecodedBody, BodyDecodeError>;
}

/// The decoder used unless the handler is given another one.
#[derive(Debug, Clone, Copy)]
pub struct StandardBodyDecoder {
    limit: usize,
}

impl Default for StandardBodyDecoder {
    fn default() -> Self {
        Self::with_limit(Settings::DEFAULT_BODY_LIMIT)
    }
}

impl StandardBodyDecoder {
    #[must_use]
    pub const fn with_limit(limit: usize) -> Self {
        Self { limit }
    }

    #[must_use]
    pub const fn from_settings(settings: &Settings) -> Self {
        Self::with_limit(settings.body_limit)
    }

    /// Read the whole body, undoing any content encoding.
    async fn read(&self, headers: &HeaderMap, body: Body) -> Result<Vec<u8>, BodyDecodeError> {
        let encoding = headers
            .get(header::CONTENT_ENCODING)
            .and_then(|value| value.to_str().ok())
            .map_or_else(|| "identity".to_owned(), str::to_ascii_lowercase);
        if !matches!(encoding.as_str(), "identity" | "gzip" | "deflate") {
            return Err(BodyDecodeError::new(
                StatusCode::UNSUPPORTED_MEDIA_TYPE,
                format!("Unsupported content-encoding \"{encoding}\"."),
            ));
        }

        let bytes = match Limited::new(body, self.limit).collect().await {
            Ok(collected) => collected.to_bytes(),
            Err(err) if err.is::<LengthLimitError>() => return Err(BodyDecodeError::too_large()),
            Err(err) => return Err(BodyDecodeError::bad_request(format!("Invalid body: {err}."))),
        };

        match encoding.as_str() {
            "gzip" => self.inflate(GzDecoder::new(bytes.as_ref())),
            "deflate" => self.inflate(ZlibDecoder::new(bytes.as_ref())),
            _ => Ok(bytes.to_vec()),
        }
    }

    fn inflate(&self, decoder: impl Read) -> Result<Vec<u8>, BodyDecodeError> {
        let mut out = Vec::new();
        let max = u64::try_from(self.limit).unwrap_or(u64::MAX).saturating_add(1);
        decoder
            .take(max)
            .read_to_end(&mut out)
            .map_err(|err| BodyDecodeError::bad_request(format!("Invalid body: {err}.")))?;
        if out.len() > self.limit {
            return Err(BodyDecodeError::too_large());
        }
        Ok(out)
    }
}

#[async_trait]
impl BodyDecoder for StandardBodyDecoder {
    async fn decode(&self, parts: &Parts, body: Body) -> Result<DecodedBody, BodyDecodeError> {
        let Some(content_type) = parts
            .headers
            .get(header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
        else {
            return Ok(DecodedBody::new());
        };
        let media = MediaType::parse(content_type);

        let kind = match media.essence.as_str() {
            "application/graphql" => BodyKind::GraphQl,
            "application/json" => BodyKind::Json,
            "application/x-www-form-urlencoded" => BodyKind::Form,
            _ => return Ok(DecodedBody::new()),
        };

        let charset = media.charset.as_deref().unwrap_or("utf-8");
        if !matches!(charset, "utf-8" | "utf8") {
            return Err(BodyDecodeError::new(
                StatusCode::UNSUPPORTED_MEDIA_TYPE,
                format!("Unsupported charset \"{}\".", charset.to_ascii_uppercase()),
            ));
        }

        let bytes = self.read(&parts.headers, body).await?;
        match kind {
            BodyKind::GraphQl => {
                let query = String::from_utf8(bytes)
                    .map_err(|err| BodyDecodeError::bad_request(format!("Invalid body: {err}.")))?;
                let mut decoded = DecodedBody::new();
                decoded.insert("query".to_owned(), Value::String(query));
                Ok(decoded)
            }
            BodyKind::Json => parse_json_object(&bytes),
            BodyKind::Form => {
                let pairs: Vec<(String, String)> = serde_urlencoded::from_bytes(&bytes)
                    .map_err(|err| BodyDecodeError::bad_request(format!("Invalid body: {err}.")))?;
                Ok(pairs
                    .into_iter()
                    .map(|(key, value)| (key, Value::String(value)))
                    .collect())
            }
        }
    }
}

enum BodyKind {
    GraphQl,
    Json,
    Form,
}

/// A parsed `Content-Type` value.
struct MediaType {
    /// `type/subtype`, lowercased.
    essence: String,
    /// The `charset` parameter, lowercased.
    charset: Option<String>,
}

impl MediaType {
    fn parse(value: &str) -> Self {
        let mut pieces = value.split(';');
        let essence = pieces.next().unwrap_or_default().trim().to_ascii_lowercase();
        let charset = pieces.find_map(|param| {
            let (name, value) = param.split_once('=')?;
            name.trim()
                .eq_ignore_ascii_case("charset")
                .then(|| value.trim().trim_matches('"').to_ascii_lowercase())
        });
        Self { essence, charset }
    }
}

/// Only objects are accepted: `[]`, `"x"` and friends are rejected up front.
fn parse_json_object(bytes: &[u8]) -> Result<DecodedBody, BodyDecodeError> {
    let invalid = || BodyDecodeError::bad_request("POST body sent invalid JSON.");
    let starts_with_brace = bytes
        .iter()
        .find(|byte| !matches!(byte, b' ' | b'\t' | b'\n' | b'\r'))
        .is_some_and(|byte| *byte == b'{');
    if !starts_with_brace {
        return Err(invalid());
    }
    serde_json::from_slice(bytes).map_err(|_| invalid())
}
