//! Top-level route table.
//!
//! # Responsibilities
//! - Combine the top-level endpoints under group prefix `e_`
//! - Anchor the combined pattern at the start and compile it once
//! - Expose the captured groups of a match to resolvers and event listeners
//!
//! # Design Decisions
//! - Built once at startup, immutable at runtime, shared behind `Arc`
//! - Deterministic: the same tree always compiles to the same pattern
//! - One regex evaluation per request; resolution only reads group presence

use http::Method;
use regex::{Captures, Regex};

use crate::metadata::{Metadata, MetadataProvider};
use crate::routing::dispatch::Dispatch;
use crate::routing::endpoint::{Endpoint, HandlerResolver};
use crate::routing::prefix::{self, PrefixedEndpoints};
use crate::routing::types::{BuildError, BuildResult};

/// Group prefix used for the top-level combination.
pub const ROOT_GROUP_PREFIX: &str = "e_";

/// Named groups captured by one successful match.
pub struct MatchedGroups<'a> {
    captures: Captures<'a>,
    regex: &'a Regex,
}

impl<'a> MatchedGroups<'a> {
    pub fn new(captures: Captures<'a>, regex: &'a Regex) -> Self {
        Self { captures, regex }
    }

    /// Whether the named group took part in the match.
    pub fn is_set(&self, name: &str) -> bool {
        self.captures.name(name).is_some()
    }

    /// Text captured by the named group.
    pub fn get(&self, name: &str) -> Option<&'a str> {
        self.captures.name(name).map(|m| m.as_str())
    }

    /// Every named group that took part in the match, in pattern order.
    pub fn iter(&self) -> impl Iterator<Item = (&'a str, &'a str)> + '_ {
        self.regex
            .capture_names()
            .flatten()
            .filter_map(|name| self.get(name).map(|value| (name, value)))
    }

    /// The matcher that produced these groups.
    pub fn matcher(&self) -> &'a Regex {
        self.regex
    }
}

impl std::fmt::Debug for MatchedGroups<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

/// Immutable, start-anchored matcher over a whole endpoint tree.
pub struct RouteTable<C> {
    regex: Regex,
    resolver: Box<dyn HandlerResolver<C>>,
    root: PrefixedEndpoints<C>,
}

impl<C: 'static> RouteTable<C> {
    /// Compile `endpoints` as the top-level combination.
    pub fn build(endpoints: Vec<Box<dyn Endpoint<C>>>) -> BuildResult<Self> {
        let root = prefix::prefix("", endpoints);
        let compiled = root.compile(ROOT_GROUP_PREFIX)?;
        let source = format!("^(?:{})", compiled.pattern);
        let regex = Regex::new(&source).map_err(|e| BuildError::Regex {
            pattern: source.clone(),
            reason: e.to_string(),
        })?;

        tracing::debug!(
            endpoints = root.len(),
            groups = regex.captures_len(),
            pattern = %regex.as_str(),
            "Route table compiled"
        );

        Ok(Self {
            regex,
            resolver: compiled.resolver,
            root,
        })
    }

    /// The compiled, anchored matcher.
    pub fn matcher(&self) -> &Regex {
        &self.regex
    }

    /// Match `path` against the whole tree.
    pub fn find<'a>(&'a self, path: &'a str) -> Option<MatchedGroups<'a>> {
        self.regex
            .captures(path)
            .map(|captures| MatchedGroups::new(captures, &self.regex))
    }

    /// Pick the static handler for `method` on a matched URL.
    pub fn resolve<'a>(&'a self, groups: &MatchedGroups<'_>, method: &Method) -> Dispatch<'a, C> {
        self.resolver.resolve(method, groups)
    }

    /// Collect every provider's description of every endpoint.
    pub fn metadata(&self, providers: &[&dyn MetadataProvider]) -> Metadata {
        self.root.metadata("", providers)
    }
}

impl<C> std::fmt::Debug for RouteTable<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RouteTable")
            .field("pattern", &self.regex.as_str())
            .finish_non_exhaustive()
    }
}
