//! REST API server module
//!
//! Exposes submission, progress polling and file download over HTTP, plus an
//! OpenAPI description of the same endpoints.

use crate::{AudioConverter, Config, Result};
use axum::{
    Router,
    http::HeaderValue,
    routing::{get, post},
};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

pub mod error_response;
pub mod openapi;
pub mod routes;
pub mod state;

pub use openapi::ApiDoc;
pub use state::AppState;

/// Create the API router with all route definitions
///
/// # Routes
///
/// ## Tasks
/// - `POST /api/download` - Submit a URL (`{url, is_playlist}`)
/// - `GET /api/progress/:task_id` - Poll one task
/// - `GET /api/tasks` - List all tasks
///
/// ## Files
/// - `GET /downloads/*filename` - Download a produced file as an attachment
///
/// ## System
/// - `GET /api/capabilities` - Active engine and its capabilities
/// - `GET /api/health` - Health check
/// - `GET /api/openapi.json` - OpenAPI specification
/// - `GET /swagger-ui` - Interactive Swagger UI documentation (if enabled)
/// - `GET /api/events` - Server-sent events stream
pub fn create_router(converter: Arc<AudioConverter>, config: Arc<Config>) -> Router {
    let state = AppState::new(converter, config.clone());

    let router = Router::new()
        // Tasks
        .route("/api/download", post(routes::submit_task))
        .route("/api/progress/:task_id", get(routes::get_progress))
        .route("/api/tasks", get(routes::list_tasks))
        // Files
        .route("/downloads/*filename", get(routes::download_file))
        // System
        .route("/api/capabilities", get(routes::get_capabilities))
        .route("/api/health", get(routes::health_check))
        .route("/api/openapi.json", get(routes::openapi_spec))
        .route("/api/events", get(routes::event_stream));

    // Merge Swagger UI routes if enabled in config (before applying state)
    let router = if config.server.api.swagger_ui {
        router.merge(SwaggerUi::new("/swagger-ui").url("/api/openapi.json", ApiDoc::openapi()))
    } else {
        router
    };

    let router = router.with_state(state).layer(TraceLayer::new_for_http());

    if config.server.api.cors_enabled {
        let cors = build_cors_layer(&config.server.api.cors_origins);
        router.layer(cors)
    } else {
        router
    }
}

/// Build a CORS layer based on configured origins ("*" allows any origin)
fn build_cors_layer(origins: &[String]) -> CorsLayer {
    let allow_any = origins.iter().any(|o| o == "*");

    if allow_any || origins.is_empty() {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        let allowed: Vec<HeaderValue> = origins.iter().filter_map(|o| o.parse().ok()).collect();

        CorsLayer::new()
            .allow_origin(AllowOrigin::list(allowed))
            .allow_methods(Any)
            .allow_headers(Any)
    }
}

/// Start the API server on the configured bind address.
///
/// Runs until the server stops.
///
/// # Example
///
/// ```no_run
/// use anymusic_dl::{AudioConverter, Config};
/// use std::sync::Arc;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let config = Arc::new(Config::default());
/// let converter = Arc::new(AudioConverter::new((*config).clone()).await?);
///
/// // Start API server (blocks until shutdown)
/// anymusic_dl::api::start_api_server(converter, config).await?;
/// # Ok(())
/// # }
/// ```
pub async fn start_api_server(converter: Arc<AudioConverter>, config: Arc<Config>) -> Result<()> {
    let bind_address = config.server.api.bind_address;

    tracing::info!(address = %bind_address, "Starting API server");

    let app = create_router(converter, config);

    let listener = TcpListener::bind(bind_address)
        .await
        .map_err(crate::error::Error::Io)?;

    tracing::info!(address = %bind_address, "API server listening");

    axum::serve(listener, app)
        .await
        .map_err(|e| crate::error::Error::ApiServerError(e.to_string()))?;

    tracing::info!("API server stopped");
    Ok(())
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests;
