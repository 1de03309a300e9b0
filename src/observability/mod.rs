//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Pipeline decision points (EventListener callbacks):
//!     → logging.rs (TracingListener: structured log events)
//!     → metrics.rs (MetricsListener: counters, handler latency)
//!
//! HTTP adapter:
//!     → metrics.rs (responses by outcome and status)
//!
//! Consumers:
//!     → Log aggregation (stdout)
//!     → Metrics endpoint (Prometheus scrape)
//! ```
//!
//! # Design Decisions
//! - Structured fields on every event for machine parsing
//! - Faults log at `warn`, client mistakes at `debug`
//! - Metrics are cheap (atomic increments)

pub mod logging;
pub mod metrics;

pub use logging::{init_logging, TracingListener};
pub use metrics::{init_metrics, MetricsListener};
