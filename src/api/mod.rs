// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{
    http::HeaderName,
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::CorsLayer,
    decompression::RequestDecompressionLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::{
    error::JsonRpcError,
    models::{HealthResponse, JsonRpcRequest, JsonRpcResponse},
    state::AppState,
};

pub mod health;
pub mod rpc;
pub mod theta;

const REQUEST_ID_HEADER: &str = "x-request-id";

pub fn router(state: AppState) -> Router {
    let request_id = HeaderName::from_static(REQUEST_ID_HEADER);

    let routes = Router::new()
        .route("/rpc", post(rpc::rpc))
        .route("/health", get(health::health))
        .with_state(state);

    Router::new()
        .merge(routes)
        .merge(SwaggerUi::new("/docs").url("/api-doc/openapi.json", ApiDoc::openapi()))
        .layer(RequestDecompressionLayer::new())
        .layer(CorsLayer::permissive())
        .layer(PropagateRequestIdLayer::new(request_id.clone()))
        .layer(TraceLayer::new_for_http())
        .layer(SetRequestIdLayer::new(request_id, MakeRequestUuid))
}

#[derive(OpenApi)]
#[openapi(
    paths(rpc::rpc, health::health),
    components(schemas(JsonRpcRequest, JsonRpcResponse, JsonRpcError, HealthResponse)),
    tags(
        (name = "RPC", description = "theta.* JSON-RPC methods"),
        (name = "Health", description = "Service health")
    )
)]
struct ApiDoc;
