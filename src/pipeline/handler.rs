//! Static handlers: the per-endpoint, per-method validator + handler bundle.
//!
//! # Responsibilities
//! - Hold every validator one endpoint method needs, already type-erased
//! - Offer a typed builder so handler code sees concrete types
//! - Keep metadata-building arguments next to the handler they describe
//!
//! # Design Decisions
//! - Built once at startup, immutable afterwards, shared read-only
//! - Erasure happens once in [`MethodBuilder::handle`]; the decoded values
//!   are recovered there, so a type mismatch is unrepresentable from the
//!   public API and reported as an output fault if it ever happens
//! - Context and state reach the handler behind `Arc` so events emitted after
//!   the handler still see them

use std::any::Any;
use std::collections::BTreeMap;
use std::fmt;
use std::future::Future;
use std::marker::PhantomData;
use std::sync::Arc;

use futures_util::future::{self, BoxFuture, FutureExt};
use http::Method;
use serde_json::Value;

use crate::pipeline::validation::{
    BodyStream, BodyValidationError, BodyValidator, ContextError, ContextValidator, Decoded,
    EncodedOutput, OutputValidator, QueryMap, QueryMapValidator, StringValidator, ValidationError,
};
use crate::routing::url::UrlParameter;

/// Shared, type-erased request state produced by the context validator.
pub type SharedState = Arc<dyn Any + Send + Sync>;

type ErasedContext<C> = Box<dyn Fn(&C) -> Result<SharedState, ContextError> + Send + Sync>;
type ErasedRawQuery = Box<dyn Fn(&str) -> Result<Decoded, ValidationError> + Send + Sync>;
type ErasedParsedQuery = Box<dyn Fn(&QueryMap) -> Result<Decoded, ValidationError> + Send + Sync>;
type ErasedBody = Box<
    dyn Fn(String, BodyStream) -> BoxFuture<'static, Result<Decoded, BodyValidationError>>
        + Send
        + Sync,
>;
type ErasedHandler<C> = Box<
    dyn Fn(Invocation<C>) -> BoxFuture<'static, Result<EncodedOutput, ValidationError>>
        + Send
        + Sync,
>;

/// The two supported query validator shapes.
pub(crate) enum QueryValidation {
    /// Consumes the raw query string verbatim.
    Raw(ErasedRawQuery),
    /// Consumes the pre-parsed key/value map.
    Parsed(ErasedParsedQuery),
}

/// Query shape declared by a method, as seen by metadata providers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryShape {
    None,
    Raw,
    Parsed,
}

/// Decoded URL parameters, in declaration order.
#[derive(Default)]
pub struct UrlParameters {
    values: Vec<(String, Decoded)>,
}

impl UrlParameters {
    pub(crate) fn push(&mut self, name: &str, value: Decoded) {
        self.values.push((name.to_string(), value));
    }

    /// Borrow a parameter decoded as `T`.
    pub fn get<T: 'static>(&self, name: &str) -> Option<&T> {
        self.values
            .iter()
            .find(|(n, _)| n == name)
            .and_then(|(_, v)| v.downcast_ref::<T>())
    }

    /// Take ownership of a parameter decoded as `T`.
    pub fn take<T: 'static>(&mut self, name: &str) -> Option<T> {
        let index = self
            .values
            .iter()
            .position(|(n, v)| n == name && v.is::<T>())?;
        let (_, value) = self.values.remove(index);
        value.downcast::<T>().ok().map(|b| *b)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.values.iter().map(|(n, _)| n.as_str())
    }
}

impl fmt::Debug for UrlParameters {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.names()).finish()
    }
}

/// Everything the pipeline validated, handed to the erased handler.
pub(crate) struct Invocation<C> {
    pub context: Arc<C>,
    pub state: SharedState,
    pub url: UrlParameters,
    pub query: Option<Decoded>,
    pub body: Option<Decoded>,
}

/// Typed arguments received by user handler functions.
///
/// `Q` and `B` are `()` when the method declares no query or body validator.
pub struct HandlerArgs<C, S, Q, B> {
    pub context: Arc<C>,
    pub state: Arc<S>,
    pub url: UrlParameters,
    pub query: Q,
    pub body: B,
}

fn recover<T: 'static>(value: Option<Decoded>, what: &str) -> Result<T, ValidationError> {
    value
        .unwrap_or_else(|| Box::new(()) as Decoded)
        .downcast::<T>()
        .map(|b| *b)
        .map_err(|_| ValidationError::new(format!("decoded {what} has an unexpected type")))
}

impl<C> Invocation<C> {
    fn into_typed<S, Q, B>(self) -> Result<HandlerArgs<C, S, Q, B>, ValidationError>
    where
        S: Send + Sync + 'static,
        Q: 'static,
        B: 'static,
    {
        let state = self
            .state
            .downcast::<S>()
            .map_err(|_| ValidationError::new("decoded state has an unexpected type"))?;
        Ok(HandlerArgs {
            context: self.context,
            state,
            url: self.url,
            query: recover(self.query, "query")?,
            body: recover(self.body, "body")?,
        })
    }
}

/// Compiled bundle for one endpoint + method pair.
pub struct StaticHandler<C> {
    method: Method,
    context: ErasedContext<C>,
    pub(crate) url: Option<Arc<[UrlParameter]>>,
    pub(crate) query: Option<QueryValidation>,
    pub(crate) body: Option<ErasedBody>,
    handler: ErasedHandler<C>,
    metadata: BTreeMap<String, Value>,
}

impl<C> StaticHandler<C> {
    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn query_shape(&self) -> QueryShape {
        match self.query {
            None => QueryShape::None,
            Some(QueryValidation::Raw(_)) => QueryShape::Raw,
            Some(QueryValidation::Parsed(_)) => QueryShape::Parsed,
        }
    }

    pub fn has_body(&self) -> bool {
        self.body.is_some()
    }

    /// URL parameters validated before this handler runs.
    pub fn url_parameters(&self) -> &[UrlParameter] {
        self.url.as_deref().unwrap_or(&[])
    }

    /// Metadata-building arguments, keyed by provider id.
    pub fn metadata_args(&self) -> &BTreeMap<String, Value> {
        &self.metadata
    }

    /// Attach the owning endpoint's URL parameters.
    pub(crate) fn with_url_parameters(mut self, parameters: Arc<[UrlParameter]>) -> Self {
        self.url = if parameters.is_empty() {
            None
        } else {
            Some(parameters)
        };
        self
    }

    pub(crate) fn validate_context(&self, context: &C) -> Result<SharedState, ContextError> {
        (self.context)(context)
    }

    pub(crate) fn validate_body(
        &self,
        content_type: String,
        body: BodyStream,
    ) -> Option<BoxFuture<'static, Result<Decoded, BodyValidationError>>> {
        self.body
            .as_ref()
            .map(|validate| validate(content_type, body))
    }

    pub(crate) fn invoke(
        &self,
        invocation: Invocation<C>,
    ) -> BoxFuture<'static, Result<EncodedOutput, ValidationError>> {
        (self.handler)(invocation)
    }
}

impl<C> fmt::Debug for StaticHandler<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StaticHandler")
            .field("method", &self.method)
            .field("url", &self.url_parameters())
            .field("query", &self.query_shape())
            .field("body", &self.has_body())
            .finish_non_exhaustive()
    }
}

/// Typed builder producing a [`StaticHandler`].
///
/// ```ignore
/// let get = MethodBuilder::new(Method::GET)
///     .query_map(QueryStruct::<Paging>::new())
///     .handle(|args| async move { list(args.query) }, Json);
/// ```
pub struct MethodBuilder<C, S = (), Q = (), B = ()> {
    method: Method,
    context: ErasedContext<C>,
    query: Option<QueryValidation>,
    body: Option<ErasedBody>,
    metadata: BTreeMap<String, Value>,
    _types: PhantomData<fn() -> (S, Q, B)>,
}

impl<C: 'static> MethodBuilder<C> {
    /// Start a method whose context is accepted as-is with `()` state.
    pub fn new(method: Method) -> Self {
        Self {
            method,
            context: Box::new(|_: &C| Ok(Arc::new(()) as SharedState)),
            query: None,
            body: None,
            metadata: BTreeMap::new(),
            _types: PhantomData,
        }
    }
}

impl<C, S, Q, B> MethodBuilder<C, S, Q, B>
where
    C: Send + Sync + 'static,
    S: Send + Sync + 'static,
    Q: Send + 'static,
    B: Send + 'static,
{
    fn retype<S2, Q2, B2>(self) -> MethodBuilder<C, S2, Q2, B2> {
        MethodBuilder {
            method: self.method,
            context: self.context,
            query: self.query,
            body: self.body,
            metadata: self.metadata,
            _types: PhantomData,
        }
    }

    /// Validate the context and derive the handler state from it.
    pub fn context<V>(mut self, validator: V) -> MethodBuilder<C, V::State, Q, B>
    where
        V: ContextValidator<C>,
    {
        self.context = Box::new(move |ctx: &C| {
            validator
                .validate(ctx)
                .map(|state| Arc::new(state) as SharedState)
        });
        self.retype()
    }

    /// Validate the raw query string verbatim.
    pub fn query<V>(mut self, validator: V) -> MethodBuilder<C, S, V::Output, B>
    where
        V: StringValidator,
    {
        self.query = Some(QueryValidation::Raw(Box::new(move |raw: &str| {
            validator.validate(raw).map(|q| Box::new(q) as Decoded)
        })));
        self.retype()
    }

    /// Validate the query after parsing it into a key/value map.
    pub fn query_map<V>(mut self, validator: V) -> MethodBuilder<C, S, V::Output, B>
    where
        V: QueryMapValidator,
    {
        self.query = Some(QueryValidation::Parsed(Box::new(move |map: &QueryMap| {
            validator.validate(map).map(|q| Box::new(q) as Decoded)
        })));
        self.retype()
    }

    /// Read and validate the request body.
    pub fn body<V>(mut self, validator: V) -> MethodBuilder<C, S, Q, V::Output>
    where
        V: BodyValidator,
    {
        self.body = Some(Box::new(move |content_type: String, stream: BodyStream| {
            validator
                .validate(content_type, stream)
                .map(|res| res.map(|b| Box::new(b) as Decoded))
                .boxed()
        }));
        self.retype()
    }

    /// Record arguments for the metadata provider identified by `provider`.
    pub fn metadata(mut self, provider: impl Into<String>, args: Value) -> Self {
        self.metadata.insert(provider.into(), args);
        self
    }

    /// Finish with the handler function and the encoder for its result.
    pub fn handle<F, Fut, O, E>(self, handler: F, output: E) -> StaticHandler<C>
    where
        F: Fn(HandlerArgs<C, S, Q, B>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = O> + Send + 'static,
        O: Send + 'static,
        E: OutputValidator<O>,
    {
        let output = Arc::new(output);
        let erased: ErasedHandler<C> = Box::new(move |invocation: Invocation<C>| {
            let args = match invocation.into_typed::<S, Q, B>() {
                Ok(args) => args,
                Err(e) => return future::ready(Err(e)).boxed(),
            };
            let pending = handler(args);
            let output = Arc::clone(&output);
            async move { output.encode(pending.await) }.boxed()
        });

        StaticHandler {
            method: self.method,
            context: self.context,
            url: None,
            query: self.query,
            body: self.body,
            handler: erased,
            metadata: self.metadata,
        }
    }
}
