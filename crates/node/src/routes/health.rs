//! Health check endpoint.

use axum::Json;
use serde::Serialize;

use crate::{COMPENSATION_ENDPOINT, SEARCH_ENDPOINT};

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub endpoints: [&'static str; 2],
}

/// GET /health: reports liveness and the receive endpoints this node runs.
pub async fn check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        endpoints: [SEARCH_ENDPOINT, COMPENSATION_ENDPOINT],
    })
}
