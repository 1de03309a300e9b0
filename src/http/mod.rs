//! Reference HTTP adapter on axum.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (axum setup, tower-http layers)
//!     → request.rs (native request → PipelineRequest)
//!     → pipeline (match, dispatch, validate, handle)
//!     → response.rs (Outcome → status, headers, body)
//!     → Send to client
//! ```

pub mod request;
pub mod response;
pub mod server;

pub use request::{into_pipeline_request, RequestContext};
pub use response::into_response;
pub use server::HttpServer;
