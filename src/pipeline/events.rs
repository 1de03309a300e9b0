//! Pipeline event hooks.
//!
//! # Responsibilities
//! - Describe every decision point of the pipeline with structured arguments
//! - Fan events out to any number of listeners
//!
//! # Design Decisions
//! - Listeners observe only; they receive shared references and return
//!   nothing, so they cannot alter control flow
//! - Every callback has a no-op default; a listener overrides only what it
//!   cares about
//! - Arguments accumulate as the request advances: groups after the URL
//!   matched, state after the context validated

use std::any::Any;
use std::sync::Arc;
use std::time::Duration;

use http::Method;
use regex::Regex;

use crate::pipeline::stages::UrlParameterError;
use crate::pipeline::validation::ValidationError;
use crate::routing::table::MatchedGroups;

/// Accumulated view of one request, handed to every callback.
pub struct EventArgs<'a, C> {
    pub context: &'a C,
    pub method: &'a Method,
    pub path: &'a str,
    /// Raw query string, possibly empty.
    pub query: &'a str,
    pub matcher: &'a Regex,
    /// Set once the URL matched.
    pub groups: Option<&'a MatchedGroups<'a>>,
    /// Set once the context validated.
    pub state: Option<&'a (dyn Any + Send + Sync)>,
}

impl<'a, C> EventArgs<'a, C> {
    pub fn new(
        context: &'a C,
        method: &'a Method,
        path: &'a str,
        query: &'a str,
        matcher: &'a Regex,
    ) -> Self {
        Self {
            context,
            method,
            path,
            query,
            matcher,
            groups: None,
            state: None,
        }
    }

    /// The validated state, if it is a `T`.
    pub fn state<T: 'static>(&self) -> Option<&'a T> {
        self.state.and_then(|state| state.downcast_ref::<T>())
    }
}

impl<C> Clone for EventArgs<'_, C> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<C> Copy for EventArgs<'_, C> {}

/// Observer of pipeline decision points.
pub trait EventListener<C>: Send + Sync {
    /// No endpoint matched the path.
    fn on_invalid_url(&self, _args: &EventArgs<'_, C>) {}

    /// The URL matched but the method is not registered on it.
    ///
    /// Also fires for an unregistered `OPTIONS`, which an adapter may still
    /// answer successfully with the allowed methods.
    fn on_invalid_method(&self, _args: &EventArgs<'_, C>, _allowed: &[Method]) {}

    /// The context validator reported a data error. Protocol rejections are
    /// intentional and do not reach this callback.
    fn on_invalid_context(&self, _args: &EventArgs<'_, C>, _error: &ValidationError) {}

    /// One or more URL parameters failed validation.
    fn on_invalid_url_parameters(&self, _args: &EventArgs<'_, C>, _errors: &[UrlParameterError]) {}

    fn on_invalid_query(&self, _args: &EventArgs<'_, C>, _error: &ValidationError) {}

    /// The body validator does not accept this content type.
    fn on_invalid_content_type(&self, _args: &EventArgs<'_, C>, _content_type: &str) {}

    fn on_invalid_body(&self, _args: &EventArgs<'_, C>, _error: &ValidationError) {}

    /// Every input stage passed; the handler is about to run.
    fn on_handler_start(&self, _args: &EventArgs<'_, C>) {}

    /// The handler returned, before its output is encoded.
    fn on_handler_end(&self, _args: &EventArgs<'_, C>, _elapsed: Duration) {}

    /// The output validator rejected the handler's result.
    fn on_invalid_response(&self, _args: &EventArgs<'_, C>, _error: &ValidationError) {}
}

/// Listener that ignores everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopListener;

impl<C> EventListener<C> for NoopListener {}

/// Forwards every event to each listener in registration order.
pub struct Listeners<C> {
    listeners: Vec<Arc<dyn EventListener<C>>>,
}

impl<C> Default for Listeners<C> {
    fn default() -> Self {
        Self {
            listeners: Vec::new(),
        }
    }
}

impl<C> Listeners<C> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, listener: impl EventListener<C> + 'static) -> Self {
        self.listeners.push(Arc::new(listener));
        self
    }

    pub fn push(&mut self, listener: Arc<dyn EventListener<C>>) {
        self.listeners.push(listener);
    }

    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }
}

impl<C> EventListener<C> for Listeners<C> {
    fn on_invalid_url(&self, args: &EventArgs<'_, C>) {
        self.listeners.iter().for_each(|l| l.on_invalid_url(args));
    }

    fn on_invalid_method(&self, args: &EventArgs<'_, C>, allowed: &[Method]) {
        self.listeners
            .iter()
            .for_each(|l| l.on_invalid_method(args, allowed));
    }

    fn on_invalid_context(&self, args: &EventArgs<'_, C>, error: &ValidationError) {
        self.listeners
            .iter()
            .for_each(|l| l.on_invalid_context(args, error));
    }

    fn on_invalid_url_parameters(&self, args: &EventArgs<'_, C>, errors: &[UrlParameterError]) {
        self.listeners
            .iter()
            .for_each(|l| l.on_invalid_url_parameters(args, errors));
    }

    fn on_invalid_query(&self, args: &EventArgs<'_, C>, error: &ValidationError) {
        self.listeners
            .iter()
            .for_each(|l| l.on_invalid_query(args, error));
    }

    fn on_invalid_content_type(&self, args: &EventArgs<'_, C>, content_type: &str) {
        self.listeners
            .iter()
            .for_each(|l| l.on_invalid_content_type(args, content_type));
    }

    fn on_invalid_body(&self, args: &EventArgs<'_, C>, error: &ValidationError) {
        self.listeners
            .iter()
            .for_each(|l| l.on_invalid_body(args, error));
    }

    fn on_handler_start(&self, args: &EventArgs<'_, C>) {
        self.listeners.iter().for_each(|l| l.on_handler_start(args));
    }

    fn on_handler_end(&self, args: &EventArgs<'_, C>, elapsed: Duration) {
        self.listeners
            .iter()
            .for_each(|l| l.on_handler_end(args, elapsed));
    }

    fn on_invalid_response(&self, args: &EventArgs<'_, C>, error: &ValidationError) {
        self.listeners
            .iter()
            .for_each(|l| l.on_invalid_response(args, error));
    }
}
