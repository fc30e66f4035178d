//! REST API server example
//!
//! Runs anymusic-dl with the REST API enabled.
//!
//! ```text
//! cargo run --example rest_api_server [config.json]
//! ```
//!
//! After starting, you can:
//! - View Swagger UI at http://localhost:5000/swagger-ui
//! - Submit a URL via POST http://localhost:5000/api/download
//! - Poll a task via GET http://localhost:5000/api/progress/{task_id}
//! - Fetch a produced file via GET http://localhost:5000/downloads/{filename}
//! - Stream events via GET http://localhost:5000/api/events

use anymusic_dl::{AudioConverter, Config, run_with_shutdown};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // Optional JSON config file as the first argument
    let config = match std::env::args().nth(1) {
        Some(path) => Config::from_json_file(path)?,
        None => Config::default(),
    };
    let bind_address = config.server.api.bind_address;

    let converter = Arc::new(AudioConverter::new(config).await?);
    let caps = converter.capabilities();

    println!("Starting anymusic-dl REST API server (engine: {})", caps.engine);
    println!("Swagger UI: http://{}/swagger-ui", bind_address);
    println!();
    println!("Example commands:");
    println!("  curl -X POST http://{}/api/download \\", bind_address);
    println!("    -H 'Content-Type: application/json' \\");
    println!("    -d '{{\"url\": \"https://www.youtube.com/watch?v=dQw4w9WgXcQ\"}}'");
    println!();
    println!("  curl http://{}/api/progress/<task_id>", bind_address);
    println!("  curl -N http://{}/api/events", bind_address);
    println!();

    let api_handle = converter.spawn_api_server();

    tokio::select! {
        result = api_handle => {
            result??;
        }
        result = run_with_shutdown(&converter) => {
            result?;
        }
    }

    Ok(())
}
