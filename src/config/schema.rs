//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the engine
//! and its reference HTTP adapter. All types derive Serde traits for
//! deserialization from config files.

use serde::{Deserialize, Serialize};

/// Root configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq)]
#[serde(default)]
pub struct EngineConfig {
    /// Listener configuration (bind address, body limit).
    pub listener: ListenerConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Status code answered for each pipeline outcome.
    pub statuses: StatusConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,

    /// Largest request body accepted, in bytes.
    pub max_body_size: usize,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
            max_body_size: 1024 * 1024,
        }
    }
}

/// Timeout configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Request timeout (total time for request/response) in seconds.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self { request_secs: 30 }
    }
}

/// Outcome → status code mapping used by the HTTP adapter.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct StatusConfig {
    /// No endpoint matched the path.
    pub invalid_url: u16,

    /// The path matched but the method is not registered.
    pub invalid_method: u16,

    /// Context validation failed, or a protocol rejection named no status.
    pub context_default: u16,

    pub invalid_url_parameters: u16,

    pub invalid_query: u16,

    /// The body validator does not accept the content type.
    pub invalid_content_type: u16,

    pub invalid_body: u16,

    /// The handler's output failed validation.
    pub invalid_output: u16,

    /// Answer an unregistered OPTIONS request with 200 and `Allow`.
    pub options_lists_allowed: bool,
}

impl Default for StatusConfig {
    fn default() -> Self {
        Self {
            invalid_url: 404,
            invalid_method: 405,
            context_default: 500,
            invalid_url_parameters: 400,
            invalid_query: 400,
            invalid_content_type: 415,
            invalid_body: 422,
            invalid_output: 500,
            options_lists_allowed: true,
        }
    }
}

impl StatusConfig {
    /// Every configured code with the name of its field.
    pub fn codes(&self) -> [(&'static str, u16); 8] {
        [
            ("invalid_url", self.invalid_url),
            ("invalid_method", self.invalid_method),
            ("context_default", self.context_default),
            ("invalid_url_parameters", self.invalid_url_parameters),
            ("invalid_query", self.invalid_query),
            ("invalid_content_type", self.invalid_content_type),
            ("invalid_body", self.invalid_body),
            ("invalid_output", self.invalid_output),
        ]
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: true,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}
