//! Validator contracts consumed by the pipeline.
//!
//! # Responsibilities
//! - Define the two-variant result discipline shared by every stage
//! - Define the contracts external validation libraries implement
//! - Parse raw query strings for validators that want a key/value map
//!
//! # Design Decisions
//! - Every stage reports `Result<T, ValidationError>` so adapters branch once
//! - Body validation is the only asynchronous contract
//! - Body and context failures carry extra variants (content type, protocol
//!   override) that must stay distinguishable from plain data errors

use std::any::Any;
use std::collections::BTreeMap;
use std::fmt;

use bytes::Bytes;
use futures_util::future::BoxFuture;
use futures_util::stream::BoxStream;
use http::{HeaderMap, StatusCode};
use serde::Serialize;
use thiserror::Error;

/// A decoded value whose concrete type is known only to the endpoint that
/// declared the validator.
pub type Decoded = Box<dyn Any + Send + Sync>;

/// Error raised while reading the request body stream.
pub type BodyError = Box<dyn std::error::Error + Send + Sync>;

/// Streamed request body handed to body validators.
pub type BodyStream = BoxStream<'static, Result<Bytes, BodyError>>;

/// Validator-specific description of why data was rejected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationError {
    /// Location of the offending value, when the validator knows it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    /// Human-readable reason.
    pub message: String,
}

impl ValidationError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            path: None,
            message: message.into(),
        }
    }

    /// Create an error pinned to a location inside the input.
    pub fn at(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: Some(path.into()),
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.path {
            Some(path) => write!(f, "{}: {}", path, self.message),
            None => f.write_str(&self.message),
        }
    }
}

impl std::error::Error for ValidationError {}

/// Validates one string (a URL parameter or a whole raw query string).
pub trait StringValidator: Send + Sync + 'static {
    type Output: Send + Sync + 'static;

    fn validate(&self, raw: &str) -> Result<Self::Output, ValidationError>;
}

impl<F, T> StringValidator for F
where
    F: Fn(&str) -> Result<T, ValidationError> + Send + Sync + 'static,
    T: Send + Sync + 'static,
{
    type Output = T;

    fn validate(&self, raw: &str) -> Result<T, ValidationError> {
        self(raw)
    }
}

/// One query entry: repeated keys collapse into `Multiple`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum QueryValue {
    Single(String),
    Multiple(Vec<String>),
}

/// Pre-parsed query string.
pub type QueryMap = BTreeMap<String, QueryValue>;

/// Parse a raw (percent-encoded) query string into a [`QueryMap`].
pub fn parse_query(raw: &str) -> QueryMap {
    let mut map = QueryMap::new();
    for (key, value) in url::form_urlencoded::parse(raw.as_bytes()) {
        let value = value.into_owned();
        match map.remove(key.as_ref()) {
            None => {
                map.insert(key.into_owned(), QueryValue::Single(value));
            }
            Some(QueryValue::Single(first)) => {
                map.insert(key.into_owned(), QueryValue::Multiple(vec![first, value]));
            }
            Some(QueryValue::Multiple(mut all)) => {
                all.push(value);
                map.insert(key.into_owned(), QueryValue::Multiple(all));
            }
        }
    }
    map
}

/// Validates a pre-parsed query map.
pub trait QueryMapValidator: Send + Sync + 'static {
    type Output: Send + Sync + 'static;

    fn validate(&self, query: &QueryMap) -> Result<Self::Output, ValidationError>;
}

impl<F, T> QueryMapValidator for F
where
    F: Fn(&QueryMap) -> Result<T, ValidationError> + Send + Sync + 'static,
    T: Send + Sync + 'static,
{
    type Output = T;

    fn validate(&self, query: &QueryMap) -> Result<T, ValidationError> {
        self(query)
    }
}

/// Failure reported by a body validator.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BodyValidationError {
    /// The validator does not accept this content type at all.
    #[error("unsupported content type `{0}`")]
    UnsupportedContentType(String),

    /// The body was read but its contents were rejected.
    #[error("invalid body: {0}")]
    Invalid(ValidationError),
}

/// Asynchronously reads and decodes a request body.
///
/// The validator owns the decision on which content types it accepts.
/// Dropping the returned future abandons the read; implementations must not
/// rely on being polled to completion.
pub trait BodyValidator: Send + Sync + 'static {
    type Output: Send + Sync + 'static;

    fn validate(
        &self,
        content_type: String,
        body: BodyStream,
    ) -> BoxFuture<'static, Result<Self::Output, BodyValidationError>>;
}

/// Failure reported by a context validator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContextError {
    /// The context did not have the expected shape.
    Invalid(ValidationError),

    /// An intentional rejection (e.g. missing credentials) answered with an
    /// explicit status. Not a validation bug, so not reported as one.
    Protocol {
        status: Option<StatusCode>,
        body: Option<String>,
    },
}

impl ContextError {
    pub fn protocol(status: StatusCode) -> Self {
        ContextError::Protocol {
            status: Some(status),
            body: None,
        }
    }
}

/// Checks the server-specific context and derives the request state.
pub trait ContextValidator<C>: Send + Sync + 'static {
    type State: Send + Sync + 'static;

    fn validate(&self, context: &C) -> Result<Self::State, ContextError>;
}

impl<C, F, S> ContextValidator<C> for F
where
    F: Fn(&C) -> Result<S, ContextError> + Send + Sync + 'static,
    S: Send + Sync + 'static,
{
    type State = S;

    fn validate(&self, context: &C) -> Result<S, ContextError> {
        self(context)
    }
}

/// Serialized handler result ready to be written by an adapter.
#[derive(Debug, Clone, Default)]
pub struct EncodedOutput {
    pub content_type: String,
    /// `None` means the response carries no body.
    pub body: Option<Bytes>,
    pub headers: HeaderMap,
}

/// Encodes (and thereby validates) a handler's return value.
pub trait OutputValidator<O>: Send + Sync + 'static {
    fn encode(&self, output: O) -> Result<EncodedOutput, ValidationError>;
}

impl<O, F> OutputValidator<O> for F
where
    F: Fn(O) -> Result<EncodedOutput, ValidationError> + Send + Sync + 'static,
{
    fn encode(&self, output: O) -> Result<EncodedOutput, ValidationError> {
        self(output)
    }
}
