//! HTTP server setup

use std::future::Future;
use std::sync::Arc;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::app::options::ServerOptions;
use crate::authn::require_signature;
use crate::errors::HookError;
use crate::server::handlers::{
    deploy_handler, health_handler, projects_handler, reload_config_handler, status_handler,
};
use crate::server::state::ServerState;

/// Build the application router.
///
/// The signature guard wraps every state-mutating or
/// information-disclosing route; the health check and the read-only
/// status endpoint stay open.
pub fn router(state: Arc<ServerState>) -> Router {
    let signed = Router::new()
        .route("/projects", get(projects_handler))
        .route("/deploy", post(deploy_handler))
        .route("/reload-config", post(reload_config_handler))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            require_signature,
        ));

    Router::new()
        .route("/health", get(health_handler))
        .route("/status", get(status_handler))
        .merge(signed)
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

/// Start the HTTP server
pub async fn serve(
    options: &ServerOptions,
    state: Arc<ServerState>,
    shutdown_signal: impl Future<Output = ()> + Send + 'static,
) -> Result<JoinHandle<Result<(), HookError>>, HookError> {
    let app = router(state);

    let addr = format!("{}:{}", options.host, options.port);
    info!("Starting HTTP server on {}", addr);

    let listener = TcpListener::bind(&addr)
        .await
        .map_err(|e| HookError::ServerError(e.to_string()))?;

    let handle = tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal)
            .await
            .map_err(|e| HookError::ServerError(e.to_string()))
    });

    Ok(handle)
}
