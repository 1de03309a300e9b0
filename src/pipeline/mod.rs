//! Request validation pipeline.
//!
//! # Data Flow
//! ```text
//! PipelineRequest (context, method, path, query, content type, body)
//!     → engine.rs: RouteTable::find      → InvalidUrl
//!     → engine.rs: RouteTable::resolve   → InvalidMethod (allowed methods)
//!     → stages.rs: context               → ContextRejected | InvalidContext
//!     → stages.rs: URL parameters        → InvalidUrlParameters (all of them)
//!     → stages.rs: query                 → InvalidQuery
//!     → stages.rs: body (async)          → UnsupportedContentType | InvalidBody
//!     → handler.rs: handler + output     → InvalidOutput | Success
//! ```
//!
//! Every arrow that fails also reports through `events.rs`, except the
//! intentional protocol rejection of a context.

pub mod engine;
pub mod events;
pub mod handler;
pub mod stages;
pub mod validation;

pub use engine::{Outcome, Pipeline, PipelineRequest};
pub use events::{EventArgs, EventListener, Listeners, NoopListener};
pub use handler::{HandlerArgs, MethodBuilder, QueryShape, SharedState, StaticHandler, UrlParameters};
pub use stages::UrlParameterError;
pub use validation::{
    BodyError, BodyStream, BodyValidationError, BodyValidator, ContextError, ContextValidator, Decoded,
    EncodedOutput, OutputValidator, QueryMap, QueryMapValidator, QueryValue, StringValidator, ValidationError,
};
