//! Endpoint metadata providers.
//!
//! # Responsibilities
//! - Define the capability a metadata provider implements
//! - Describe each leaf endpoint (URL template + methods) to every provider
//! - Merge per-endpoint descriptions into one keyed collection
//!
//! # Design Decisions
//! - Providers are explicit trait objects passed in by the caller; nothing
//!   is discovered at runtime
//! - Per-method arguments live on the static handler, keyed by provider id
//! - Output order follows declaration order of the endpoint tree

use std::collections::BTreeMap;

use http::Method;
use serde::Serialize;
use serde_json::{json, Value};

use crate::pipeline::handler::{QueryShape, StaticHandler};
use crate::routing::url::UrlTemplate;

/// Descriptions keyed by provider id, one entry per leaf endpoint.
pub type Metadata = BTreeMap<String, Vec<Value>>;

/// One URL parameter as seen by a provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParameterDescription {
    pub name: String,
    pub pattern: String,
}

/// A leaf endpoint URL with its full prefix applied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UrlDescription {
    /// Rendered template, e.g. `/api/thing/{id}`.
    pub template: String,
    pub parameters: Vec<ParameterDescription>,
}

impl UrlDescription {
    pub fn new(url: &UrlTemplate, url_prefix: &str) -> Self {
        Self {
            template: url.render(url_prefix),
            parameters: url
                .parameters()
                .iter()
                .map(|p| ParameterDescription {
                    name: p.name().to_string(),
                    pattern: p.pattern().to_string(),
                })
                .collect(),
        }
    }
}

/// One method of a leaf endpoint as seen by a provider.
#[derive(Debug, Clone, Copy)]
pub struct MethodDescription<'a> {
    pub method: &'a Method,
    pub query: QueryShape,
    pub has_body: bool,
    /// Metadata arguments recorded on the handler, keyed by provider id.
    pub args: &'a BTreeMap<String, Value>,
}

impl<'a> MethodDescription<'a> {
    pub fn from_handler<C>(handler: &'a StaticHandler<C>) -> Self {
        Self {
            method: handler.method(),
            query: handler.query_shape(),
            has_body: handler.has_body(),
            args: handler.metadata_args(),
        }
    }

    /// Arguments recorded for the provider `id`, if any.
    pub fn args_for(&self, id: &str) -> Option<&'a Value> {
        self.args.get(id)
    }
}

/// Builds one description per leaf endpoint.
pub trait MetadataProvider: Send + Sync {
    /// Key under which this provider's descriptions are collected.
    fn id(&self) -> &str;

    fn describe(&self, url: &UrlDescription, methods: &[MethodDescription<'_>]) -> Value;
}

/// Append every description of `other` after those already in `into`.
pub fn merge_into(into: &mut Metadata, other: Metadata) {
    for (id, mut descriptions) in other {
        into.entry(id).or_default().append(&mut descriptions);
    }
}

/// Built-in provider listing paths, parameters and methods.
///
/// Per-method arguments recorded under `routes` are copied into the
/// `details` map, keyed by method.
#[derive(Debug, Clone, Copy, Default)]
pub struct RouteSummary;

impl RouteSummary {
    pub const ID: &'static str = "routes";
}

impl MetadataProvider for RouteSummary {
    fn id(&self) -> &str {
        Self::ID
    }

    fn describe(&self, url: &UrlDescription, methods: &[MethodDescription<'_>]) -> Value {
        let names: Vec<&str> = methods.iter().map(|m| m.method.as_str()).collect();
        let details: BTreeMap<&str, &Value> = methods
            .iter()
            .filter_map(|m| m.args_for(Self::ID).map(|args| (m.method.as_str(), args)))
            .collect();

        let mut description = json!({
            "path": url.template,
            "parameters": url.parameters,
            "methods": names,
        });
        if !details.is_empty() {
            description["details"] = json!(details);
        }
        description
    }
}
