//! Individual validation stages.
//!
//! Each function runs one stage against a resolved static handler and
//! reports a plain `Result`; the engine decides which event to emit and
//! which outcome to return.

use std::sync::Arc;

use serde::Serialize;

use crate::pipeline::handler::{Invocation, QueryValidation, SharedState, StaticHandler, UrlParameters};
use crate::pipeline::validation::{
    parse_query, BodyStream, BodyValidationError, ContextError, Decoded, EncodedOutput, ValidationError,
};
use crate::routing::table::MatchedGroups;

/// A URL parameter rejected by its validator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UrlParameterError {
    pub name: String,
    pub error: ValidationError,
}

/// Validate the context and derive the handler state.
pub fn check_context<C>(handler: &StaticHandler<C>, context: &C) -> Result<SharedState, ContextError> {
    handler.validate_context(context)
}

/// Validate every declared URL parameter.
///
/// All parameters are checked even after one fails, so the caller can report
/// every problem at once.
pub fn check_url_parameters<C>(
    handler: &StaticHandler<C>,
    groups: &MatchedGroups<'_>,
    url_groups: &[String],
) -> Result<UrlParameters, Vec<UrlParameterError>> {
    let mut decoded = UrlParameters::default();
    let mut errors = Vec::new();

    for (parameter, group) in handler.url_parameters().iter().zip(url_groups) {
        let raw = groups.get(group).unwrap_or_default();
        match parameter.validate(raw) {
            Ok(value) => decoded.push(parameter.name(), value),
            Err(error) => errors.push(UrlParameterError {
                name: parameter.name().to_string(),
                error,
            }),
        }
    }

    if errors.is_empty() {
        Ok(decoded)
    } else {
        Err(errors)
    }
}

/// Validate the query string.
///
/// Without a query validator only an empty query is accepted.
pub fn check_query<C>(handler: &StaticHandler<C>, raw: &str) -> Result<Option<Decoded>, ValidationError> {
    match &handler.query {
        None if raw.is_empty() => Ok(None),
        None => Err(ValidationError::new("this endpoint accepts no query parameters")),
        Some(QueryValidation::Raw(validate)) => validate(raw).map(Some),
        Some(QueryValidation::Parsed(validate)) => validate(&parse_query(raw)).map(Some),
    }
}

/// Read and validate the body, if the handler declares a body validator.
///
/// Without one the stream is dropped unread.
pub async fn check_body<C>(
    handler: &StaticHandler<C>,
    content_type: Option<String>,
    body: BodyStream,
) -> Result<Option<Decoded>, BodyValidationError> {
    match handler.validate_body(content_type.unwrap_or_default(), body) {
        Some(pending) => pending.await.map(Some),
        None => Ok(None),
    }
}

/// Run the handler and encode its result.
pub async fn invoke<C>(
    handler: &StaticHandler<C>,
    context: Arc<C>,
    state: SharedState,
    url: UrlParameters,
    query: Option<Decoded>,
    body: Option<Decoded>,
) -> Result<EncodedOutput, ValidationError> {
    handler
        .invoke(Invocation {
            context,
            state,
            url,
            query,
            body,
        })
        .await
}
