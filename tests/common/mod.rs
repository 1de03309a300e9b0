//! Shared sample API and helpers for integration tests.

#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::task::Poll;
use std::time::Duration;

use axum::http::{Method, StatusCode};
use bytes::Bytes;
use futures_util::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};

use endpoint_engine::pipeline::{
    BodyError, BodyStream, ContextError, EventArgs, EventListener, HandlerArgs, MethodBuilder, Pipeline, PipelineRequest,
    UrlParameterError, ValidationError,
};
use endpoint_engine::routing::{prefix, Endpoint, RouteTable, UrlEndpoint, UrlTemplate};
use endpoint_engine::validation::{FromStrValidator, Json, JsonBody, NoContent};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewThing {
    pub name: String,
}

/// Records the name of every event it receives.
#[derive(Default)]
pub struct Recorder {
    events: Mutex<Vec<String>>,
}

impl Recorder {
    pub fn events(&self) -> Vec<String> {
        self.events.lock().unwrap().clone()
    }

    fn push(&self, event: impl Into<String>) {
        self.events.lock().unwrap().push(event.into());
    }
}

impl<C> EventListener<C> for Recorder {
    fn on_invalid_url(&self, _: &EventArgs<'_, C>) {
        self.push("invalid_url");
    }
    fn on_invalid_method(&self, _: &EventArgs<'_, C>, _: &[Method]) {
        self.push("invalid_method");
    }
    fn on_invalid_context(&self, _: &EventArgs<'_, C>, _: &ValidationError) {
        self.push("invalid_context");
    }
    fn on_invalid_url_parameters(&self, _: &EventArgs<'_, C>, errors: &[UrlParameterError]) {
        for error in errors {
            self.push(format!("invalid_url_parameter:{}", error.name));
        }
    }
    fn on_invalid_query(&self, _: &EventArgs<'_, C>, _: &ValidationError) {
        self.push("invalid_query");
    }
    fn on_invalid_content_type(&self, _: &EventArgs<'_, C>, content_type: &str) {
        self.push(format!("invalid_content_type:{content_type}"));
    }
    fn on_invalid_body(&self, _: &EventArgs<'_, C>, _: &ValidationError) {
        self.push("invalid_body");
    }
    fn on_handler_start(&self, _: &EventArgs<'_, C>) {
        self.push("handler_start");
    }
    fn on_handler_end(&self, _: &EventArgs<'_, C>, _: Duration) {
        self.push("handler_end");
    }
    fn on_invalid_response(&self, _: &EventArgs<'_, C>, _: &ValidationError) {
        self.push("invalid_response");
    }
}

fn strictly_positive(raw: &str) -> Result<u64, ValidationError> {
    match raw.parse::<u64>() {
        Ok(n) if n > 0 => Ok(n),
        _ => Err(ValidationError::new("expected a positive integer")),
    }
}

/// Sample tree:
///
/// ```text
/// /api/thing              POST (JSON body), GET (empty list)
/// /api/thing/{id:[0-9]+}  GET
/// /api/item/{slug}/{n}    GET, both parameters must be positive integers
/// /api/secret             POST, requires `authorize`, JSON body
/// /api/profile            POST, context is invalid without `authorize`
/// /api/broken             GET, output always fails validation
/// ```
pub fn sample_api<C, A>(authorize: A) -> Vec<Box<dyn Endpoint<C>>>
where
    C: Send + Sync + 'static,
    A: Fn(&C) -> bool + Send + Sync + 'static,
{
    let create = MethodBuilder::<C>::new(Method::POST).body(JsonBody::<NewThing>::new()).handle(
        |args: HandlerArgs<C, (), (), NewThing>| async move { args.body },
        Json,
    );
    let list = MethodBuilder::<C>::new(Method::GET)
        .handle(|_: HandlerArgs<C, (), (), ()>| async { Vec::<NewThing>::new() }, Json);

    let by_id = UrlTemplate::builder()
        .literal("/")
        .param("id", "[0-9]+", FromStrValidator::<u64>::new())
        .build();
    let get = MethodBuilder::<C>::new(Method::GET).handle(
        |args: HandlerArgs<C, (), (), ()>| async move { args.url.get::<u64>("id").copied() },
        Json,
    );

    let item = UrlTemplate::builder()
        .literal("/item/")
        .param("slug", "[^/]+", strictly_positive)
        .literal("/")
        .param("n", "[^/]+", strictly_positive)
        .build();
    let get_item = MethodBuilder::<C>::new(Method::GET).handle(
        |args: HandlerArgs<C, (), (), ()>| async move {
            args.url.get::<u64>("slug").copied().unwrap_or_default() + args.url.get::<u64>("n").copied().unwrap_or_default()
        },
        Json,
    );

    let authorize = Arc::new(authorize);
    let authorize_profile = Arc::clone(&authorize);
    let secret = MethodBuilder::<C>::new(Method::POST)
        .context(move |context: &C| {
            if authorize(context) {
                Ok("admin")
            } else {
                Err(ContextError::protocol(StatusCode::FORBIDDEN))
            }
        })
        .body(JsonBody::<NewThing>::new())
        .handle(
            |args: HandlerArgs<C, &'static str, (), NewThing>| async move {
                format!("{} stored {}", args.state, args.body.name)
            },
            Json,
        );

    let profile = MethodBuilder::<C>::new(Method::POST)
        .context(move |context: &C| {
            if authorize_profile(context) {
                Ok("member")
            } else {
                Err(ContextError::Invalid(ValidationError::new("no session attached")))
            }
        })
        .body(JsonBody::<NewThing>::new())
        .handle(
            |args: HandlerArgs<C, &'static str, (), NewThing>| async move { args.body },
            Json,
        );

    let broken = MethodBuilder::<C>::new(Method::GET).handle(
        |_: HandlerArgs<C, (), (), ()>| async {},
        |_: ()| Err::<endpoint_engine::pipeline::EncodedOutput, _>(ValidationError::new("never valid")),
    );
    let delete = MethodBuilder::<C>::new(Method::DELETE).handle(|_: HandlerArgs<C, (), (), ()>| async {}, NoContent);

    let things: Vec<Box<dyn Endpoint<C>>> = vec![
        Box::new(UrlEndpoint::new(UrlTemplate::literal(""), vec![create, list]).unwrap()),
        Box::new(UrlEndpoint::new(by_id, vec![get, delete]).unwrap()),
    ];
    let api: Vec<Box<dyn Endpoint<C>>> = vec![
        Box::new(prefix("/thing", things)),
        Box::new(UrlEndpoint::new(item, vec![get_item]).unwrap()),
        Box::new(UrlEndpoint::new(UrlTemplate::literal("/secret"), vec![secret]).unwrap()),
        Box::new(UrlEndpoint::new(UrlTemplate::literal("/profile"), vec![profile]).unwrap()),
        Box::new(UrlEndpoint::new(UrlTemplate::literal("/broken"), vec![broken]).unwrap()),
    ];
    let root: Box<dyn Endpoint<C>> = Box::new(prefix("/api", api));
    vec![root]
}

pub fn sample_table<C, A>(authorize: A) -> Arc<RouteTable<C>>
where
    C: Send + Sync + 'static,
    A: Fn(&C) -> bool + Send + Sync + 'static,
{
    Arc::new(RouteTable::build(sample_api(authorize)).unwrap())
}

pub fn sample_pipeline<C, A>(authorize: A, recorder: Arc<Recorder>) -> Pipeline<C>
where
    C: Send + Sync + 'static,
    A: Fn(&C) -> bool + Send + Sync + 'static,
{
    Pipeline::new(sample_table(authorize)).with_listener(recorder)
}

/// A body stream that flags `read` the first time it is polled.
pub fn tracked_body(read: Arc<AtomicBool>, content: &'static [u8]) -> BodyStream {
    let mut pending = Some(Bytes::from_static(content));
    stream::poll_fn(move |_| {
        read.store(true, Ordering::SeqCst);
        Poll::Ready(pending.take().map(Ok))
    })
    .boxed()
}

/// Marks `dropped` when released.
struct DropFlag(Arc<AtomicBool>);

impl Drop for DropFlag {
    fn drop(&mut self) {
        self.0.store(true, Ordering::SeqCst);
    }
}

/// A body stream that never yields and flags `dropped` once released.
pub fn stalled_body(dropped: Arc<AtomicBool>) -> BodyStream {
    let flag = DropFlag(dropped);
    stream::poll_fn(move |_| {
        let _held = &flag;
        Poll::<Option<Result<Bytes, BodyError>>>::Pending
    })
    .boxed()
}

pub fn empty_body() -> BodyStream {
    stream::empty().boxed()
}

pub fn request<C>(context: C, method: Method, path: &str, query: &str) -> PipelineRequest<C> {
    PipelineRequest {
        context,
        method,
        path: path.to_string(),
        query: query.to_string(),
        content_type: None,
        body: empty_body(),
    }
}
