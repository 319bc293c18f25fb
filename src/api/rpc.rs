// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! JSON-RPC 2.0 endpoint.
//!
//! Every outcome, including malformed requests, is an HTTP 200 carrying a
//! JSON-RPC response object. `params` may be the argument object itself or
//! a one-element array wrapping it.

use axum::{body::Bytes, extract::State, Json};
use serde_json::{json, Value};

use super::theta;
use crate::auth::Caller;
use crate::error::{JsonRpcError, INVALID_REQUEST, PARSE_ERROR};
use crate::models::{JsonRpcRequest, JsonRpcResponse};
use crate::state::AppState;

/// Handle one JSON-RPC call.
#[utoipa::path(
    post,
    path = "/rpc",
    tag = "RPC",
    request_body = JsonRpcRequest,
    params(
        ("X-Auth-User" = Option<String>, Header, description = "Caller user id, set by the authenticating proxy"),
        ("X-Scope" = Option<String>, Header, description = "Caller scope; `sliver_internal` unlocks internal methods")
    ),
    responses(
        (status = 200, description = "JSON-RPC result or error object", body = JsonRpcResponse)
    )
)]
pub async fn rpc(
    State(state): State<AppState>,
    caller: Caller,
    body: Bytes,
) -> Json<JsonRpcResponse> {
    let value: Value = match serde_json::from_slice(&body) {
        Ok(value) => value,
        Err(e) => {
            return Json(JsonRpcResponse::failure(
                Value::Null,
                JsonRpcError::new(PARSE_ERROR, format!("Parse error: {e}")),
            ))
        }
    };

    let id = value.get("id").cloned().unwrap_or(Value::Null);
    let request: JsonRpcRequest = match serde_json::from_value(value) {
        Ok(request) => request,
        Err(e) => {
            return Json(JsonRpcResponse::failure(
                id,
                JsonRpcError::new(INVALID_REQUEST, format!("Invalid request: {e}")),
            ))
        }
    };

    tracing::debug!(
        method = %request.method,
        user_id = caller.user_id.as_deref().unwrap_or("-"),
        "RPC call"
    );

    let params = normalize_params(request.params);
    let response = match theta::dispatch(&state, &caller, &request.method, params).await {
        Ok(result) => JsonRpcResponse::success(request.id, result),
        Err(error) => JsonRpcResponse::failure(request.id, error),
    };
    Json(response)
}

fn normalize_params(params: Value) -> Value {
    match params {
        Value::Array(mut items) if !items.is_empty() => items.swap_remove(0),
        Value::Array(_) | Value::Null => json!({}),
        other => other,
    }
}
