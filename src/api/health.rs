// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{extract::State, http::StatusCode, Json};

use crate::models::HealthResponse;
use crate::state::AppState;

/// Health check endpoint handler.
///
/// Returns 200 if the record store answers, 503 otherwise.
#[utoipa::path(
    get,
    path = "/health",
    tag = "Health",
    responses(
        (status = 200, description = "Service is healthy", body = HealthResponse),
        (status = 503, description = "Record store unavailable", body = HealthResponse)
    )
)]
pub async fn health(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    let store_ok = match state.store.health_check() {
        Ok(()) => true,
        Err(e) => {
            tracing::warn!(error = %e, "Record store health check failed");
            false
        }
    };

    let response = HealthResponse {
        status: if store_ok { "ok" } else { "degraded" }.to_string(),
        chain_id: state.config.chain_id.clone(),
        store: if store_ok { "ok" } else { "unavailable" }.to_string(),
    };

    let status = if store_ok {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (status, Json(response))
}
