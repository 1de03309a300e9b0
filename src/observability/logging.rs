//! Structured logging.
//!
//! # Responsibilities
//! - Initialize logging subsystem
//! - Log every pipeline decision point with structured fields
//!
//! # Design Decisions
//! - Uses tracing crate for structured logging
//! - Log level configurable via config, overridden by `RUST_LOG`
//! - Intentional context rejections never reach the listener, so they are
//!   not logged as failures

use std::time::Duration;

use http::Method;
use tracing_subscriber::util::TryInitError;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::pipeline::events::{EventArgs, EventListener};
use crate::pipeline::stages::UrlParameterError;
use crate::pipeline::validation::ValidationError;

/// Install the global subscriber. `RUST_LOG` wins over `level`.
pub fn init_logging(level: &str) -> Result<(), TryInitError> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("endpoint_engine={level},tower_http={level}")));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .try_init()
}

/// Event listener writing one log event per decision point.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingListener;

impl<C> EventListener<C> for TracingListener {
    fn on_invalid_url(&self, args: &EventArgs<'_, C>) {
        tracing::debug!(method = %args.method, path = %args.path, "No endpoint matched");
    }

    fn on_invalid_method(&self, args: &EventArgs<'_, C>, allowed: &[Method]) {
        tracing::debug!(
            method = %args.method,
            path = %args.path,
            allowed = ?allowed,
            "Method not registered"
        );
    }

    fn on_invalid_context(&self, args: &EventArgs<'_, C>, error: &ValidationError) {
        tracing::warn!(
            method = %args.method,
            path = %args.path,
            error = %error,
            "Context validation failed"
        );
    }

    fn on_invalid_url_parameters(&self, args: &EventArgs<'_, C>, errors: &[UrlParameterError]) {
        let names: Vec<&str> = errors.iter().map(|e| e.name.as_str()).collect();
        tracing::debug!(
            method = %args.method,
            path = %args.path,
            parameters = ?names,
            "URL parameters rejected"
        );
    }

    fn on_invalid_query(&self, args: &EventArgs<'_, C>, error: &ValidationError) {
        tracing::debug!(
            method = %args.method,
            path = %args.path,
            query = %args.query,
            error = %error,
            "Query rejected"
        );
    }

    fn on_invalid_content_type(&self, args: &EventArgs<'_, C>, content_type: &str) {
        tracing::debug!(
            method = %args.method,
            path = %args.path,
            content_type = %content_type,
            "Unsupported content type"
        );
    }

    fn on_invalid_body(&self, args: &EventArgs<'_, C>, error: &ValidationError) {
        tracing::debug!(
            method = %args.method,
            path = %args.path,
            error = %error,
            "Body rejected"
        );
    }

    fn on_handler_start(&self, args: &EventArgs<'_, C>) {
        tracing::trace!(method = %args.method, path = %args.path, "Handler starting");
    }

    fn on_handler_end(&self, args: &EventArgs<'_, C>, elapsed: Duration) {
        tracing::trace!(
            method = %args.method,
            path = %args.path,
            elapsed_ms = elapsed.as_millis() as u64,
            "Handler finished"
        );
    }

    fn on_invalid_response(&self, args: &EventArgs<'_, C>, error: &ValidationError) {
        tracing::warn!(
            method = %args.method,
            path = %args.path,
            error = %error,
            "Handler output failed validation"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use regex::Regex;

    #[test]
    fn test_subscriber_installs_once() {
        let _ = init_logging("debug");
        assert!(init_logging("debug").is_err());
    }

    #[test]
    fn test_listener_accepts_any_context() {
        let re = Regex::new("^/x$").unwrap();
        let method = Method::POST;
        let context = String::from("opaque");
        let args = EventArgs::new(&context, &method, "/x", "a=1", &re);
        TracingListener.on_invalid_query(&args, &ValidationError::new("unexpected"));
        TracingListener.on_handler_end(&args, Duration::from_millis(2));
    }
}
