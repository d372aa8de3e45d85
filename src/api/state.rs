//! Application state for the API server

use std::sync::Arc;

use crate::pipeline::Pipeline;

/// Shared application state accessible to all route handlers.
///
/// Cloned for each request (cheap Arc clone).
#[derive(Debug, Clone)]
pub struct AppState {
    /// The pipeline every search request runs through.
    pub pipeline: Arc<Pipeline>,
}

impl AppState {
    /// Create a new AppState
    #[must_use]
    pub fn new(pipeline: Arc<Pipeline>) -> Self {
        Self { pipeline }
    }
}
