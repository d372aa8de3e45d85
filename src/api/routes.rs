//! Route handlers.

use axum::{
    Json,
    extract::{RawQuery, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use tracing::info;

use super::AppState;
use crate::pipeline::PipelineResult;

/// Body of `GET /`.
pub const LIVENESS_MESSAGE: &str = "Catalog export API...";

/// Query string of `GET /api/csv/search`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchParams {
    /// Part number to search for.
    pub query: Option<String>,
}

impl SearchParams {
    /// Reads the parameters from a raw query string.
    ///
    /// Decoding is lossy and never fails. When `query` is repeated the first
    /// value wins; other keys are ignored.
    #[must_use]
    pub fn from_raw(raw: Option<&str>) -> Self {
        let query = raw.and_then(|raw| {
            url::form_urlencoded::parse(raw.as_bytes())
                .find(|(key, _)| key == "query")
                .map(|(_, value)| value.into_owned())
        });
        Self { query }
    }
}

/// GET / - Liveness check
pub async fn index() -> &'static str {
    info!("liveness check");
    LIVENESS_MESSAGE
}

/// GET /api/csv/search - Run the export pipeline for one part number
pub async fn search(State(state): State<AppState>, RawQuery(raw): RawQuery) -> PipelineResult {
    let params = SearchParams::from_raw(raw.as_deref());
    state.pipeline.run(params.query.as_deref()).await
}

impl IntoResponse for PipelineResult {
    fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(self.http_code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(self)).into_response()
    }
}
