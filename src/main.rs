//! Endpoint engine demo server.
//!
//! Serves a small in-memory `thing` API through the reference axum adapter:
//!
//! ```text
//! GET    /api/thing          list things (optional ?tag=)
//! POST   /api/thing          create a thing from a JSON body
//! GET    /api/thing/{id}     fetch one thing (`null` when absent)
//! DELETE /api/thing/{id}     delete one thing (requires `x-api-key`)
//! GET    /meta/routes        describe every endpoint
//! ```

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::{Arc, Mutex};

use axum::http::{Method, StatusCode};
use serde::{Deserialize, Serialize};
use tokio::net::TcpListener;

use endpoint_engine::config::{load_config, EngineConfig};
use endpoint_engine::http::{HttpServer, RequestContext};
use endpoint_engine::metadata::{MetadataProvider, RouteSummary};
use endpoint_engine::observability::{init_logging, init_metrics, MetricsListener, TracingListener};
use endpoint_engine::pipeline::{ContextError, HandlerArgs, Listeners, MethodBuilder, OutputValidator, Pipeline};
use endpoint_engine::routing::{prefix, Endpoint, RouteTable, UrlEndpoint, UrlTemplate};
use endpoint_engine::validation::{FromStrValidator, Json, JsonBody, NoContent, QueryStruct};

const CONFIG_ENV: &str = "ENDPOINT_ENGINE_CONFIG";

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Thing {
    #[serde(default)]
    id: u64,
    name: String,
    #[serde(default)]
    tags: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct ListQuery {
    tag: Option<String>,
}

#[derive(Default)]
struct Store {
    next_id: u64,
    things: BTreeMap<u64, Thing>,
}

type SharedStore = Arc<Mutex<Store>>;

fn require_api_key(context: &RequestContext) -> Result<(), ContextError> {
    match context.headers.get("x-api-key") {
        Some(_) => Ok(()),
        None => Err(ContextError::protocol(StatusCode::FORBIDDEN)),
    }
}

fn thing_api(store: SharedStore) -> Result<Vec<Box<dyn Endpoint<RequestContext>>>, Box<dyn std::error::Error>> {
    let list = {
        let store = Arc::clone(&store);
        MethodBuilder::<RequestContext>::new(Method::GET)
            .query_map(QueryStruct::<ListQuery>::new())
            .metadata(RouteSummary::ID, serde_json::json!({ "summary": "List things" }))
            .handle(
                move |args: HandlerArgs<RequestContext, (), ListQuery, ()>| {
                    let store = Arc::clone(&store);
                    async move {
                        let store = store.lock().unwrap_or_else(|e| e.into_inner());
                        let things: Vec<Thing> = store
                            .things
                            .values()
                            .filter(|t| args.query.tag.as_ref().map_or(true, |tag| t.tags.contains(tag)))
                            .cloned()
                            .collect();
                        things
                    }
                },
                Json,
            )
    };

    let create = {
        let store = Arc::clone(&store);
        MethodBuilder::<RequestContext>::new(Method::POST)
            .body(JsonBody::<Thing>::new())
            .handle(
                move |args: HandlerArgs<RequestContext, (), (), Thing>| {
                    let store = Arc::clone(&store);
                    async move {
                        let mut store = store.lock().unwrap_or_else(|e| e.into_inner());
                        store.next_id += 1;
                        let thing = Thing {
                            id: store.next_id,
                            ..args.body
                        };
                        store.things.insert(thing.id, thing.clone());
                        thing
                    }
                },
                Json,
            )
    };

    let by_id = UrlTemplate::builder()
        .literal("/")
        .param("id", "[0-9]+", FromStrValidator::<u64>::new())
        .build();

    let get = {
        let store = Arc::clone(&store);
        MethodBuilder::<RequestContext>::new(Method::GET).handle(
            move |mut args: HandlerArgs<RequestContext, (), (), ()>| {
                let store = Arc::clone(&store);
                async move {
                    let id = args.url.take::<u64>("id").unwrap_or_default();
                    let store = store.lock().unwrap_or_else(|e| e.into_inner());
                    let found = store.things.get(&id).cloned();
                    found
                }
            },
            Json,
        )
    };

    let delete = {
        let store = Arc::clone(&store);
        MethodBuilder::<RequestContext>::new(Method::DELETE)
            .context(require_api_key)
            .handle(
                move |mut args: HandlerArgs<RequestContext, (), (), ()>| {
                    let store = Arc::clone(&store);
                    async move {
                        let id = args.url.take::<u64>("id").unwrap_or_default();
                        store.lock().unwrap_or_else(|e| e.into_inner()).things.remove(&id);
                    }
                },
                NoContent,
            )
    };

    let collection: Box<dyn Endpoint<RequestContext>> =
        Box::new(UrlEndpoint::new(UrlTemplate::literal(""), vec![create, list])?);
    let item: Box<dyn Endpoint<RequestContext>> = Box::new(UrlEndpoint::new(by_id, vec![get, delete])?);
    let things: Box<dyn Endpoint<RequestContext>> = Box::new(prefix("/thing", vec![collection, item]));
    Ok(vec![things])
}

fn meta_api(metadata: serde_json::Value) -> Result<Box<dyn Endpoint<RequestContext>>, Box<dyn std::error::Error>> {
    let metadata = Arc::new(metadata);
    let routes = MethodBuilder::<RequestContext>::new(Method::GET).handle(
        move |_: HandlerArgs<RequestContext, (), (), ()>| {
            let metadata = Arc::clone(&metadata);
            async move { metadata }
        },
        |value: Arc<serde_json::Value>| Json.encode(value.as_ref()),
    );
    Ok(Box::new(UrlEndpoint::new(UrlTemplate::literal("/meta/routes"), vec![routes])?))
}

fn load() -> Result<EngineConfig, Box<dyn std::error::Error>> {
    match std::env::var(CONFIG_ENV) {
        Ok(path) => Ok(load_config(Path::new(&path))?),
        Err(_) => Ok(EngineConfig::default()),
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = load()?;
    init_logging(&config.observability.log_level)?;

    tracing::info!("endpoint-engine v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        bind_address = %config.listener.bind_address,
        max_body_size = config.listener.max_body_size,
        request_timeout_secs = config.timeouts.request_secs,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => init_metrics(addr)?,
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    // The metadata endpoint describes the API tree, so describe it first.
    let store = SharedStore::default();
    let api = prefix("/api", thing_api(Arc::clone(&store))?);
    let providers: [&dyn MetadataProvider; 1] = [&RouteSummary];
    let metadata = serde_json::to_value(api.metadata("", &providers))?;

    let api: Box<dyn Endpoint<RequestContext>> = Box::new(api);
    let table = RouteTable::build(vec![api, meta_api(metadata)?])?;
    let listeners = Listeners::<RequestContext>::new().with(TracingListener).with(MetricsListener);
    let pipeline = Pipeline::new(Arc::new(table)).with_listener(Arc::new(listeners));

    let server = HttpServer::new(config, pipeline);
    let listener = TcpListener::bind(&server.config().listener.bind_address).await?;
    tracing::info!(
        address = %listener.local_addr()?,
        "Listening for connections"
    );

    server.run(listener).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
