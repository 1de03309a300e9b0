//! Request pipeline driver.
//!
//! # Responsibilities
//! - Run URL match, method dispatch and the validation stages in order
//! - Emit exactly one event per failure, plus handler start and end events
//! - Return a definitive [`Outcome`] for the adapter to translate
//!
//! # Design Decisions
//! - Stage order is fixed: context, URL parameters, query, body
//! - Data errors are outcomes, never `Err`; the adapter branches once
//! - Only the body stage and the handler suspend; dropping the future at any
//!   point releases the body stream with it
//! - No retries; every failed stage is terminal for the request

use std::sync::Arc;
use std::time::Instant;

use http::{Method, StatusCode};

use crate::pipeline::events::{EventArgs, EventListener, NoopListener};
use crate::pipeline::stages::{self, UrlParameterError};
use crate::pipeline::validation::{BodyStream, BodyValidationError, ContextError, EncodedOutput, ValidationError};
use crate::routing::dispatch::Dispatch;
use crate::routing::table::RouteTable;

/// Server-agnostic view of one incoming request.
pub struct PipelineRequest<C> {
    /// Opaque, server-specific context handed to the context validator.
    pub context: C,
    pub method: Method,
    pub path: String,
    /// Raw query string without the leading `?`.
    pub query: String,
    pub content_type: Option<String>,
    pub body: BodyStream,
}

/// Terminal result of processing one request.
#[derive(Debug)]
pub enum Outcome {
    /// No endpoint matched the path.
    InvalidUrl,
    /// The path matched but not the method.
    InvalidMethod { allowed: Vec<Method> },
    /// The context validator rejected the request on purpose.
    ContextRejected {
        status: Option<StatusCode>,
        body: Option<String>,
    },
    InvalidContext(ValidationError),
    InvalidUrlParameters(Vec<UrlParameterError>),
    InvalidQuery(ValidationError),
    UnsupportedContentType(String),
    InvalidBody(ValidationError),
    /// The handler's result failed output validation. A server fault.
    InvalidOutput(ValidationError),
    Success(EncodedOutput),
}

impl Outcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Success(_))
    }

    /// Short stable label, used for logs and metrics.
    pub fn label(&self) -> &'static str {
        match self {
            Outcome::InvalidUrl => "invalid_url",
            Outcome::InvalidMethod { .. } => "invalid_method",
            Outcome::ContextRejected { .. } => "context_rejected",
            Outcome::InvalidContext(_) => "invalid_context",
            Outcome::InvalidUrlParameters(_) => "invalid_url_parameters",
            Outcome::InvalidQuery(_) => "invalid_query",
            Outcome::UnsupportedContentType(_) => "invalid_content_type",
            Outcome::InvalidBody(_) => "invalid_body",
            Outcome::InvalidOutput(_) => "invalid_output",
            Outcome::Success(_) => "success",
        }
    }
}

/// Drives requests through a shared, immutable route table.
pub struct Pipeline<C> {
    table: Arc<RouteTable<C>>,
    listener: Arc<dyn EventListener<C>>,
}

impl<C> Clone for Pipeline<C> {
    fn clone(&self) -> Self {
        Self {
            table: Arc::clone(&self.table),
            listener: Arc::clone(&self.listener),
        }
    }
}

impl<C: Send + Sync + 'static> Pipeline<C> {
    pub fn new(table: Arc<RouteTable<C>>) -> Self {
        Self {
            table,
            listener: Arc::new(NoopListener),
        }
    }

    /// Replace the event listener. Use [`Listeners`](super::Listeners) to
    /// attach several.
    pub fn with_listener(mut self, listener: Arc<dyn EventListener<C>>) -> Self {
        self.listener = listener;
        self
    }

    /// Process one request to completion.
    pub async fn process(&self, request: PipelineRequest<C>) -> Outcome {
        let PipelineRequest {
            context,
            method,
            path,
            query,
            content_type,
            body,
        } = request;
        let context = Arc::new(context);
        let listener = self.listener.as_ref();
        let mut args = EventArgs::new(context.as_ref(), &method, &path, &query, self.table.matcher());

        // 1. URL match
        let Some(groups) = self.table.find(&path) else {
            listener.on_invalid_url(&args);
            return Outcome::InvalidUrl;
        };
        args.groups = Some(&groups);

        // 2. Method
        let (handler, url_groups) = match self.table.resolve(&groups, &method) {
            Dispatch::Handler { handler, url_groups } => (handler, url_groups),
            Dispatch::InvalidMethod { allowed } => {
                listener.on_invalid_method(&args, &allowed);
                return Outcome::InvalidMethod { allowed };
            }
        };

        // 3. Context
        let state = match stages::check_context(handler, &context) {
            Ok(state) => state,
            Err(ContextError::Protocol { status, body }) => {
                tracing::trace!(path = %path, status = ?status, "Context rejected by protocol");
                return Outcome::ContextRejected { status, body };
            }
            Err(ContextError::Invalid(error)) => {
                listener.on_invalid_context(&args, &error);
                return Outcome::InvalidContext(error);
            }
        };
        args.state = Some(state.as_ref());

        // 4. URL parameters
        let url = match stages::check_url_parameters(handler, &groups, url_groups) {
            Ok(url) => url,
            Err(errors) => {
                listener.on_invalid_url_parameters(&args, &errors);
                return Outcome::InvalidUrlParameters(errors);
            }
        };

        // 5. Query
        let query = match stages::check_query(handler, &query) {
            Ok(query) => query,
            Err(error) => {
                listener.on_invalid_query(&args, &error);
                return Outcome::InvalidQuery(error);
            }
        };

        // 6. Body
        let body = match stages::check_body(handler, content_type, body).await {
            Ok(body) => body,
            Err(BodyValidationError::UnsupportedContentType(content_type)) => {
                listener.on_invalid_content_type(&args, &content_type);
                return Outcome::UnsupportedContentType(content_type);
            }
            Err(BodyValidationError::Invalid(error)) => {
                listener.on_invalid_body(&args, &error);
                return Outcome::InvalidBody(error);
            }
        };

        // 7. Handler + output
        listener.on_handler_start(&args);
        let started = Instant::now();
        let result = stages::invoke(handler, Arc::clone(&context), Arc::clone(&state), url, query, body).await;
        listener.on_handler_end(&args, started.elapsed());

        match result {
            Ok(output) => Outcome::Success(output),
            Err(error) => {
                listener.on_invalid_response(&args, &error);
                Outcome::InvalidOutput(error)
            }
        }
    }
}
