//! OpenAPI documentation and schema generation

use utoipa::OpenApi;

/// OpenAPI documentation for the anymusic-dl REST API
///
/// The spec can be accessed via:
/// - `/api/openapi.json` - JSON format OpenAPI specification
/// - `/swagger-ui` - Interactive Swagger UI documentation
#[derive(OpenApi)]
#[openapi(
    info(
        title = "anymusic-dl REST API",
        version = "0.1.0",
        description = "Submit media URLs for background conversion to audio files and poll their progress",
        license(
            name = "MIT OR Apache-2.0"
        )
    ),
    servers(
        (url = "http://localhost:5000", description = "Local server")
    ),
    paths(
        // Tasks
        crate::api::routes::submit_task,
        crate::api::routes::get_progress,
        crate::api::routes::list_tasks,

        // Files
        crate::api::routes::download_file,

        // System
        crate::api::routes::get_capabilities,
        crate::api::routes::health_check,
        crate::api::routes::openapi_spec,
        crate::api::routes::event_stream,
    ),
    components(
        schemas(
            // Core types
            crate::types::TaskId,
            crate::types::TaskStatus,
            crate::types::TaskState,
            crate::types::Event,
            crate::types::Capabilities,
            crate::error::FailureKind,

            // Request/response types
            crate::api::routes::SubmitRequest,
            crate::api::routes::SubmitResponse,
            crate::api::routes::NotFoundResponse,

            // Error types
            crate::error::ApiError,
            crate::error::ErrorDetail,

            // Configuration
            crate::config::Config,
            crate::config::DownloadConfig,
            crate::config::EngineConfig,
            crate::config::RetentionConfig,
            crate::config::ServerIntegrationConfig,
            crate::config::ApiConfig,
        )
    ),
    tags(
        (name = "tasks", description = "Submit URLs and poll conversion progress"),
        (name = "files", description = "Download produced audio files"),
        (name = "system", description = "Health, capabilities, events and API documentation")
    )
)]
pub struct ApiDoc;
