//! Endpoint capability and the leaf endpoint.
//!
//! # Responsibilities
//! - Define what any endpoint (leaf or combined) must be able to do
//! - Compile a leaf's URL template under a caller-chosen group prefix
//! - Resolve the static handler for a method once a URL has matched
//! - Describe itself to metadata providers
//!
//! # Design Decisions
//! - Endpoints are immutable; compiling never mutates them
//! - Compiled resolvers share handler tables through `Arc`, so a compiled
//!   tree does not borrow the endpoint tree it came from

use std::sync::Arc;

use http::Method;

use crate::metadata::{Metadata, MetadataProvider, MethodDescription, UrlDescription};
use crate::pipeline::handler::StaticHandler;
use crate::routing::dispatch::{Dispatch, MethodTable};
use crate::routing::pattern;
use crate::routing::table::MatchedGroups;
use crate::routing::types::BuildResult;
use crate::routing::url::UrlTemplate;

/// A unit that compiles to a matcher plus per-method handlers.
pub trait Endpoint<C>: Send + Sync {
    /// Compile under `group_prefix`; every capture group this endpoint emits
    /// starts with that prefix.
    fn compile(&self, group_prefix: &str) -> BuildResult<CompiledEndpoint<C>>;

    /// Describe this endpoint to each provider, with URLs under `url_prefix`.
    fn metadata(&self, url_prefix: &str, providers: &[&dyn MetadataProvider]) -> Metadata;
}

/// Picks the static handler once the combined matcher has matched.
pub trait HandlerResolver<C>: Send + Sync {
    fn resolve<'a>(&'a self, method: &Method, groups: &MatchedGroups<'_>) -> Dispatch<'a, C>;
}

/// Unanchored regex source plus the resolver for it.
pub struct CompiledEndpoint<C> {
    pub pattern: String,
    pub resolver: Box<dyn HandlerResolver<C>>,
}

/// Endpoint at one URL template with one static handler per method.
pub struct UrlEndpoint<C> {
    url: UrlTemplate,
    methods: Arc<MethodTable<C>>,
}

impl<C> UrlEndpoint<C> {
    /// Register `handlers` at `url`. Each method may appear once.
    pub fn new(url: UrlTemplate, handlers: Vec<StaticHandler<C>>) -> BuildResult<Self> {
        let handlers = handlers
            .into_iter()
            .map(|h| Arc::new(h.with_url_parameters(Arc::clone(url.parameters()))))
            .collect();
        Ok(Self {
            methods: Arc::new(MethodTable::new(handlers)?),
            url,
        })
    }
}

struct LeafResolver<C> {
    methods: Arc<MethodTable<C>>,
    url_groups: Vec<String>,
}

impl<C> HandlerResolver<C> for LeafResolver<C> {
    fn resolve<'a>(&'a self, method: &Method, _groups: &MatchedGroups<'_>) -> Dispatch<'a, C> {
        match self.methods.dispatch(method) {
            Ok(handler) => Dispatch::Handler {
                handler,
                url_groups: &self.url_groups,
            },
            Err(allowed) => Dispatch::InvalidMethod { allowed },
        }
    }
}

impl<C: 'static> Endpoint<C> for UrlEndpoint<C> {
    fn compile(&self, group_prefix: &str) -> BuildResult<CompiledEndpoint<C>> {
        let pattern = self.url.compile(group_prefix)?;
        let url_groups = self
            .url
            .parameters()
            .iter()
            .map(|p| pattern::group_name(group_prefix, p.name()))
            .collect();
        Ok(CompiledEndpoint {
            pattern,
            resolver: Box::new(LeafResolver {
                methods: Arc::clone(&self.methods),
                url_groups,
            }),
        })
    }

    fn metadata(&self, url_prefix: &str, providers: &[&dyn MetadataProvider]) -> Metadata {
        let url = UrlDescription::new(&self.url, url_prefix);
        let methods: Vec<MethodDescription<'_>> = self
            .methods
            .handlers()
            .map(MethodDescription::from_handler)
            .collect();

        providers
            .iter()
            .map(|provider| (provider.id().to_string(), vec![provider.describe(&url, &methods)]))
            .collect()
    }
}
