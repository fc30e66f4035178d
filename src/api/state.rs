//! Application state for the API server

use crate::{AudioConverter, Config};
use std::sync::Arc;

/// Shared application state accessible to all route handlers
///
/// Cloned for each request (cheap Arc clone).
#[derive(Clone)]
pub struct AppState {
    /// The converter handling submissions and polls
    pub converter: Arc<AudioConverter>,

    /// Configuration (read-only)
    pub config: Arc<Config>,
}

impl AppState {
    /// Create a new AppState
    pub fn new(converter: Arc<AudioConverter>, config: Arc<Config>) -> Self {
        Self { converter, config }
    }
}
