//! Metrics collection and exposition.
//!
//! # Responsibilities
//! - Count pipeline events by kind
//! - Record handler latency and response status
//! - Expose Prometheus-compatible metrics endpoint
//!
//! # Metrics
//! - `endpoint_pipeline_events_total` (counter): events by `event`
//! - `endpoint_handler_duration_seconds` (histogram): handler latency
//! - `endpoint_responses_total` (counter): responses by `outcome`, `status`
//!
//! # Design Decisions
//! - Low-overhead metric updates (atomic operations)
//! - Labels are static strings; paths are never used as labels

use std::net::SocketAddr;
use std::time::Duration;

use http::Method;
use metrics::{counter, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

use crate::pipeline::events::{EventArgs, EventListener};
use crate::pipeline::stages::UrlParameterError;
use crate::pipeline::validation::ValidationError;

pub const PIPELINE_EVENTS: &str = "endpoint_pipeline_events_total";
pub const HANDLER_DURATION: &str = "endpoint_handler_duration_seconds";
pub const RESPONSES: &str = "endpoint_responses_total";

/// Start the Prometheus exporter on `addr`. Must run inside a Tokio runtime.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics exporter listening");
    Ok(())
}

/// Count one response written by an adapter.
pub fn record_response(outcome: &'static str, status: u16) {
    counter!(RESPONSES, "outcome" => outcome, "status" => status.to_string()).increment(1);
}

fn record_event(event: &'static str) {
    counter!(PIPELINE_EVENTS, "event" => event).increment(1);
}

/// Event listener feeding the metrics registry.
#[derive(Debug, Clone, Copy, Default)]
pub struct MetricsListener;

impl<C> EventListener<C> for MetricsListener {
    fn on_invalid_url(&self, _args: &EventArgs<'_, C>) {
        record_event("invalid_url");
    }

    fn on_invalid_method(&self, _args: &EventArgs<'_, C>, _allowed: &[Method]) {
        record_event("invalid_method");
    }

    fn on_invalid_context(&self, _args: &EventArgs<'_, C>, _error: &ValidationError) {
        record_event("invalid_context");
    }

    fn on_invalid_url_parameters(&self, _args: &EventArgs<'_, C>, _errors: &[UrlParameterError]) {
        record_event("invalid_url_parameters");
    }

    fn on_invalid_query(&self, _args: &EventArgs<'_, C>, _error: &ValidationError) {
        record_event("invalid_query");
    }

    fn on_invalid_content_type(&self, _args: &EventArgs<'_, C>, _content_type: &str) {
        record_event("invalid_content_type");
    }

    fn on_invalid_body(&self, _args: &EventArgs<'_, C>, _error: &ValidationError) {
        record_event("invalid_body");
    }

    fn on_handler_start(&self, _args: &EventArgs<'_, C>) {
        record_event("handler_start");
    }

    fn on_handler_end(&self, _args: &EventArgs<'_, C>, elapsed: Duration) {
        record_event("handler_end");
        histogram!(HANDLER_DURATION).record(elapsed.as_secs_f64());
    }

    fn on_invalid_response(&self, _args: &EventArgs<'_, C>, _error: &ValidationError) {
        record_event("invalid_response");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use regex::Regex;

    #[test]
    fn test_recording_without_exporter_is_a_noop() {
        let re = Regex::new("^/x$").unwrap();
        let method = Method::GET;
        let args = EventArgs::new(&(), &method, "/x", "", &re);
        MetricsListener.on_invalid_url(&args);
        MetricsListener.on_handler_end(&args, Duration::from_millis(5));
        record_response("success", 200);
    }
}
