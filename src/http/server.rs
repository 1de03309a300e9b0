//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create the axum Router that hands every request to the pipeline
//! - Wire up middleware (tracing, timeout, body limit, panic recovery)
//! - Bind server to listener and shut down gracefully
//!
//! # Design Decisions
//! - One fallback handler: routing belongs to the route table, not axum
//! - A panic inside a validator or handler becomes a 500, never a dropped
//!   connection

use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    extract::{Request, State},
    http::{Response, StatusCode},
    Router,
};
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{
    catch_panic::CatchPanicLayer,
    limit::RequestBodyLimitLayer,
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::schema::{EngineConfig, StatusConfig};
use crate::http::request::{into_pipeline_request, RequestContext};
use crate::http::response::into_response;
use crate::pipeline::engine::Pipeline;

/// Application state injected into the handler.
#[derive(Clone)]
pub struct AppState {
    pub pipeline: Pipeline<RequestContext>,
    pub statuses: Arc<StatusConfig>,
}

/// HTTP server driving one pipeline.
pub struct HttpServer {
    router: Router,
    config: EngineConfig,
}

impl HttpServer {
    /// Create a new HTTP server with the given configuration.
    pub fn new(config: EngineConfig, pipeline: Pipeline<RequestContext>) -> Self {
        let state = AppState {
            pipeline,
            statuses: Arc::new(config.statuses.clone()),
        };
        let router = Self::build_router(&config, state);
        Self { router, config }
    }

    /// Build the axum router with all middleware layers.
    ///
    /// The timeout sits inside the body limit; it needs a `Default` response body.
    fn build_router(config: &EngineConfig, state: AppState) -> Router {
        Router::new().fallback(dispatch).with_state(state).layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(RequestBodyLimitLayer::new(config.listener.max_body_size))
                .layer(TimeoutLayer::with_status_code(
                    StatusCode::REQUEST_TIMEOUT,
                    Duration::from_secs(config.timeouts.request_secs),
                ))
                .layer(CatchPanicLayer::new()),
        )
    }

    /// The fully layered router, for in-process use.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Run the server, accepting connections on the given listener.
    pub async fn run(self, listener: TcpListener) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            "HTTP server starting"
        );

        axum::serve(listener, self.router)
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    /// Get a reference to the config.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }
}

/// Run one request through the pipeline.
async fn dispatch(State(state): State<AppState>, request: Request) -> Response<Body> {
    let method = request.method().clone();
    let outcome = state.pipeline.process(into_pipeline_request(request)).await;
    into_response(outcome, &method, &state.statuses)
}

/// Wait for shutdown signal (Ctrl+C).
async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => tracing::info!("Shutdown signal received"),
        Err(e) => {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    }
}
