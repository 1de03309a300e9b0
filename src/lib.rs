//! Framework-agnostic endpoint engine.
//!
//! Endpoint trees compile once into a single anchored matcher; each request
//! then runs through a fixed sequence of validation stages before its
//! handler executes.

pub mod config;
pub mod http;
pub mod metadata;
pub mod observability;
pub mod pipeline;
pub mod routing;
pub mod validation;

pub use config::schema::EngineConfig;
pub use http::HttpServer;
pub use pipeline::{MethodBuilder, Outcome, Pipeline, PipelineRequest};
pub use routing::{prefix, RouteTable, UrlEndpoint, UrlTemplate};
