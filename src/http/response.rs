//! Response translation.
//!
//! # Responsibilities
//! - Map each pipeline outcome to a status code
//! - Add `Allow` for method failures, answer OPTIONS when configured
//! - Write handler output (content type, headers, body)
//!
//! # Design Decisions
//! - Status codes come from `StatusConfig`, never hard-coded here
//! - Client errors carry the validator's details as JSON
//! - Server faults (invalid context, invalid output) carry no details

use axum::body::Body;
use axum::http::{header, HeaderValue, Method, Response, StatusCode};
use serde_json::json;

use crate::config::schema::StatusConfig;
use crate::observability::metrics;
use crate::pipeline::engine::Outcome;

fn code(code: u16) -> StatusCode {
    StatusCode::from_u16(code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
}

impl Outcome {
    /// Status code this outcome is answered with.
    pub fn status(&self, statuses: &StatusConfig) -> StatusCode {
        match self {
            Outcome::InvalidUrl => code(statuses.invalid_url),
            Outcome::InvalidMethod { .. } => code(statuses.invalid_method),
            Outcome::ContextRejected { status, .. } => status.unwrap_or_else(|| code(statuses.context_default)),
            Outcome::InvalidContext(_) => code(statuses.context_default),
            Outcome::InvalidUrlParameters(_) => code(statuses.invalid_url_parameters),
            Outcome::InvalidQuery(_) => code(statuses.invalid_query),
            Outcome::UnsupportedContentType(_) => code(statuses.invalid_content_type),
            Outcome::InvalidBody(_) => code(statuses.invalid_body),
            Outcome::InvalidOutput(_) => code(statuses.invalid_output),
            Outcome::Success(output) if output.body.is_none() => StatusCode::NO_CONTENT,
            Outcome::Success(_) => StatusCode::OK,
        }
    }
}

fn allow_header(allowed: &[Method]) -> Option<HeaderValue> {
    let joined = allowed
        .iter()
        .map(Method::as_str)
        .collect::<Vec<_>>()
        .join(", ");
    HeaderValue::from_str(&joined).ok()
}

fn json_body(value: serde_json::Value) -> (Option<HeaderValue>, Body) {
    (
        Some(HeaderValue::from_static("application/json")),
        Body::from(value.to_string()),
    )
}

/// Whether an unregistered `method` is answered with the allowed methods
/// instead of a method failure.
fn lists_allowed(method: &Method, statuses: &StatusConfig) -> bool {
    method == Method::OPTIONS && statuses.options_lists_allowed
}

/// Metrics label for the response to `outcome`.
fn response_label(outcome: &Outcome, method: &Method, statuses: &StatusConfig) -> &'static str {
    match outcome {
        Outcome::InvalidMethod { .. } if lists_allowed(method, statuses) => "options",
        other => other.label(),
    }
}

/// Build the response for `outcome` to a request made with `method`.
pub fn into_response(outcome: Outcome, method: &Method, statuses: &StatusConfig) -> Response<Body> {
    let mut status = outcome.status(statuses);
    let label = response_label(&outcome, method, statuses);
    let mut response = Response::new(Body::empty());

    let (content_type, body) = match outcome {
        Outcome::InvalidMethod { allowed } => {
            if let Some(value) = allow_header(&allowed) {
                response.headers_mut().insert(header::ALLOW, value);
            }
            if lists_allowed(method, statuses) {
                status = StatusCode::OK;
            }
            (None, Body::empty())
        }
        Outcome::ContextRejected { body, .. } => match body {
            Some(text) => (Some(HeaderValue::from_static("text/plain; charset=utf-8")), Body::from(text)),
            None => (None, Body::empty()),
        },
        Outcome::InvalidUrlParameters(errors) => {
            json_body(json!({ "error": "invalid URL parameters", "details": errors }))
        }
        Outcome::InvalidQuery(error) => json_body(json!({ "error": "invalid query", "details": error })),
        Outcome::UnsupportedContentType(content_type) => json_body(json!({
            "error": "unsupported content type",
            "content_type": content_type,
        })),
        Outcome::InvalidBody(error) => json_body(json!({ "error": "invalid body", "details": error })),
        Outcome::InvalidUrl | Outcome::InvalidContext(_) | Outcome::InvalidOutput(_) => (None, Body::empty()),
        Outcome::Success(output) => {
            response.headers_mut().extend(output.headers);
            let content_type = (!output.content_type.is_empty())
                .then(|| HeaderValue::from_str(&output.content_type).ok())
                .flatten();
            (content_type, output.body.map(Body::from).unwrap_or_else(Body::empty))
        }
    };

    if let Some(value) = content_type {
        response.headers_mut().insert(header::CONTENT_TYPE, value);
    }
    *response.body_mut() = body;
    *response.status_mut() = status;

    metrics::record_response(label, status.as_u16());
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::validation::{EncodedOutput, ValidationError};

    #[test]
    fn test_default_status_mapping() {
        let statuses = StatusConfig::default();
        let cases = [
            (Outcome::InvalidUrl, 404),
            (Outcome::InvalidMethod { allowed: vec![] }, 405),
            (Outcome::ContextRejected { status: None, body: None }, 500),
            (
                Outcome::ContextRejected {
                    status: Some(StatusCode::FORBIDDEN),
                    body: None,
                },
                403,
            ),
            (Outcome::InvalidContext(ValidationError::new("x")), 500),
            (Outcome::InvalidUrlParameters(vec![]), 400),
            (Outcome::InvalidQuery(ValidationError::new("x")), 400),
            (Outcome::UnsupportedContentType("text/plain".into()), 415),
            (Outcome::InvalidBody(ValidationError::new("x")), 422),
            (Outcome::InvalidOutput(ValidationError::new("x")), 500),
            (Outcome::Success(EncodedOutput::default()), 204),
        ];
        for (outcome, expected) in cases {
            assert_eq!(outcome.status(&statuses).as_u16(), expected, "{}", outcome.label());
        }
    }

    #[test]
    fn test_method_failure_sets_allow() {
        let statuses = StatusConfig::default();
        let outcome = Outcome::InvalidMethod {
            allowed: vec![Method::POST, Method::GET],
        };
        let response = into_response(outcome, &Method::PUT, &statuses);
        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(response.headers()[header::ALLOW], "POST, GET");
    }

    #[test]
    fn test_options_lists_allowed() {
        let mut statuses = StatusConfig::default();
        let allowed = || Outcome::InvalidMethod {
            allowed: vec![Method::GET],
        };

        let response = into_response(allowed(), &Method::OPTIONS, &statuses);
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::ALLOW], "GET");

        statuses.options_lists_allowed = false;
        let response = into_response(allowed(), &Method::OPTIONS, &statuses);
        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
    }

    #[test]
    fn test_only_options_lists_allowed() {
        let mut statuses = StatusConfig::default();
        assert!(lists_allowed(&Method::OPTIONS, &statuses));
        assert!(!lists_allowed(&Method::PUT, &statuses));
        statuses.options_lists_allowed = false;
        assert!(!lists_allowed(&Method::OPTIONS, &statuses));
    }

    #[test]
    fn test_answered_options_is_not_labelled_a_failure() {
        let mut statuses = StatusConfig::default();
        let outcome = Outcome::InvalidMethod {
            allowed: vec![Method::GET],
        };
        assert_eq!(response_label(&outcome, &Method::OPTIONS, &statuses), "options");
        assert_eq!(response_label(&outcome, &Method::PUT, &statuses), "invalid_method");
        statuses.options_lists_allowed = false;
        assert_eq!(response_label(&outcome, &Method::OPTIONS, &statuses), "invalid_method");
    }

    #[test]
    fn test_success_writes_output() {
        let outcome = Outcome::Success(EncodedOutput {
            content_type: "application/json".into(),
            body: Some("[]".into()),
            ..Default::default()
        });
        let response = into_response(outcome, &Method::GET, &StatusConfig::default());
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::CONTENT_TYPE], "application/json");
    }

    #[test]
    fn test_output_fault_hides_details() {
        let outcome = Outcome::InvalidOutput(ValidationError::new("secret detail"));
        let response = into_response(outcome, &Method::GET, &StatusConfig::default());
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(response.headers().get(header::CONTENT_TYPE).is_none());
    }
}
