//! Endpoint combinator: many endpoints under one literal prefix.
//!
//! # Responsibilities
//! - Merge child matchers into one alternation with a group per child
//! - Resolve which child matched by inspecting its named group
//! - Merge child metadata under the combined URL prefix
//!
//! # Design Decisions
//! - Child `i` gets group `{prefix}{i}` and compiles under `{prefix}{i}_`,
//!   so names are unique and the same tree always compiles the same way
//! - Each alternative is `(?<group>child$)`: a child must consume the rest of
//!   the path, a partial prefix match never counts
//! - First match wins, in declaration order. Siblings with overlapping
//!   patterns are disambiguated by ordering alone
//! - The combinator itself adds no anchor at the start; `RouteTable` does

use http::Method;

use crate::metadata::{self, Metadata, MetadataProvider};
use crate::routing::dispatch::Dispatch;
use crate::routing::endpoint::{CompiledEndpoint, Endpoint, HandlerResolver};
use crate::routing::table::MatchedGroups;
use crate::routing::types::{BuildError, BuildResult};

/// Endpoints combined under a shared literal prefix.
pub struct PrefixedEndpoints<C> {
    prefix: String,
    endpoints: Vec<Box<dyn Endpoint<C>>>,
}

/// Combine `endpoints` under the literal `prefix`.
///
/// The result is itself an [`Endpoint`], so combinators nest.
pub fn prefix<C>(prefix: impl Into<String>, endpoints: Vec<Box<dyn Endpoint<C>>>) -> PrefixedEndpoints<C> {
    PrefixedEndpoints {
        prefix: prefix.into(),
        endpoints,
    }
}

impl<C> PrefixedEndpoints<C> {
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn len(&self) -> usize {
        self.endpoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.endpoints.is_empty()
    }
}

struct PrefixResolver<C> {
    children: Vec<(String, Box<dyn HandlerResolver<C>>)>,
}

impl<C> HandlerResolver<C> for PrefixResolver<C> {
    fn resolve<'a>(&'a self, method: &Method, groups: &MatchedGroups<'_>) -> Dispatch<'a, C> {
        match self
            .children
            .iter()
            .find(|(group, _)| groups.is_set(group))
        {
            Some((_, resolver)) => resolver.resolve(method, groups),
            None => Dispatch::InvalidMethod {
                allowed: Vec::new(),
            },
        }
    }
}

impl<C: 'static> Endpoint<C> for PrefixedEndpoints<C> {
    fn compile(&self, group_prefix: &str) -> BuildResult<CompiledEndpoint<C>> {
        if self.endpoints.is_empty() {
            return Err(BuildError::EmptyCombination(self.prefix.clone()));
        }

        let mut alternatives = Vec::with_capacity(self.endpoints.len());
        let mut children = Vec::with_capacity(self.endpoints.len());
        for (index, endpoint) in self.endpoints.iter().enumerate() {
            let group = format!("{group_prefix}{index}");
            let compiled = endpoint.compile(&format!("{group}_"))?;
            alternatives.push(format!("(?<{group}>{}$)", compiled.pattern));
            children.push((group, compiled.resolver));
        }

        Ok(CompiledEndpoint {
            pattern: format!("{}(?:{})", regex::escape(&self.prefix), alternatives.join("|")),
            resolver: Box::new(PrefixResolver { children }),
        })
    }

    fn metadata(&self, url_prefix: &str, providers: &[&dyn MetadataProvider]) -> Metadata {
        let url_prefix = format!("{url_prefix}{}", self.prefix);
        let mut merged = Metadata::new();
        for endpoint in &self.endpoints {
            metadata::merge_into(&mut merged, endpoint.metadata(&url_prefix, providers));
        }
        merged
    }
}
