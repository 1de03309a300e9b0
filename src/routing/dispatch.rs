//! Method dispatch for one matched URL.
//!
//! # Responsibilities
//! - Look up the static handler registered for a method
//! - Report the methods a URL does support when the lookup fails
//!
//! # Design Decisions
//! - Pure lookup, no side effects
//! - Allowed methods keep registration order (they feed the `Allow` header)
//! - Linear scan: a URL rarely carries more than a handful of methods

use std::sync::Arc;

use http::Method;

use crate::pipeline::handler::StaticHandler;
use crate::routing::types::{BuildError, BuildResult};

/// Result of resolving a matched URL + method.
#[derive(Debug)]
pub enum Dispatch<'a, C> {
    /// A handler exists for this method.
    Handler {
        handler: &'a StaticHandler<C>,
        /// Capture group holding each URL parameter, in parameter order.
        url_groups: &'a [String],
    },
    /// The URL matched but the method is not registered on it.
    InvalidMethod { allowed: Vec<Method> },
}

/// Static handlers of one URL, in registration order.
#[derive(Debug)]
pub struct MethodTable<C> {
    handlers: Vec<Arc<StaticHandler<C>>>,
}

impl<C> MethodTable<C> {
    pub fn new(handlers: Vec<Arc<StaticHandler<C>>>) -> BuildResult<Self> {
        for (i, handler) in handlers.iter().enumerate() {
            if handlers[..i].iter().any(|h| h.method() == handler.method()) {
                return Err(BuildError::DuplicateMethod(handler.method().to_string()));
            }
        }
        Ok(Self { handlers })
    }

    /// Find the handler for `method`, or list every registered method.
    pub fn dispatch(&self, method: &Method) -> Result<&StaticHandler<C>, Vec<Method>> {
        self.handlers
            .iter()
            .find(|h| h.method() == method)
            .map(|h| h.as_ref())
            .ok_or_else(|| self.allowed_methods())
    }

    pub fn allowed_methods(&self) -> Vec<Method> {
        self.handlers.iter().map(|h| h.method().clone()).collect()
    }

    pub fn handlers(&self) -> impl Iterator<Item = &StaticHandler<C>> {
        self.handlers.iter().map(|h| h.as_ref())
    }
}
