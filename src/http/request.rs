//! Request translation.
//!
//! # Responsibilities
//! - Split an axum request into the pipeline's context and body stream
//! - Extract path, raw query and content type
//!
//! # Design Decisions
//! - The context is the request head; validators read headers, URI and
//!   extensions from it
//! - The body stays a stream; only a body validator ever reads it

use axum::body::Body;
use axum::http::{header, request::Parts, Request};
use futures_util::stream::{StreamExt, TryStreamExt};

use crate::pipeline::engine::PipelineRequest;
use crate::pipeline::validation::BodyError;

/// Context handed to context validators by the HTTP adapter.
pub type RequestContext = Parts;

/// Convert a native request into a pipeline request.
pub fn into_pipeline_request(request: Request<Body>) -> PipelineRequest<RequestContext> {
    let (parts, body) = request.into_parts();
    let content_type = parts
        .headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);

    PipelineRequest {
        method: parts.method.clone(),
        path: parts.uri.path().to_string(),
        query: parts.uri.query().unwrap_or_default().to_string(),
        content_type,
        body: body
            .into_data_stream()
            .map_err(|e| Box::new(e) as BodyError)
            .boxed(),
        context: parts,
    }
}
