// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! JSON-RPC client for the Theta node.
//!
//! The node speaks JSON-RPC 2.0 over HTTP POST and expects `params` as a
//! one-element array holding the argument object. Everything the vault
//! needs from the chain goes through [`ChainRpc::call`]; the typed helpers
//! at the bottom wrap the two methods used by the signing pipeline.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::types::{dec_str, Address, Coins};

/// JSON-RPC code reported when the node could not be reached at all.
pub const TRANSPORT_ERROR_CODE: i64 = -32000;

#[derive(Debug, thiserror::Error)]
pub enum RpcClientError {
    #[error("Invalid RPC URL: {0}")]
    InvalidRpcUrl(String),

    #[error("Node unreachable: {0}")]
    Transport(String),

    /// Error object returned by the node, kept verbatim.
    #[error("Node error {code}: {message}")]
    Node { code: i64, message: String },

    #[error("Malformed node response: {0}")]
    MalformedResponse(String),
}

impl RpcClientError {
    /// The node's code, or [`TRANSPORT_ERROR_CODE`] for local failures.
    pub fn code(&self) -> i64 {
        match self {
            RpcClientError::Node { code, .. } => *code,
            _ => TRANSPORT_ERROR_CODE,
        }
    }

    /// The node's message, or this error's rendering for local failures.
    pub fn message(&self) -> String {
        match self {
            RpcClientError::Node { message, .. } => message.clone(),
            other => other.to_string(),
        }
    }

    /// True when the node reports that an address has no account yet.
    pub fn is_account_not_found(&self) -> bool {
        matches!(self, RpcClientError::Node { message, .. }
            if message.to_ascii_lowercase().contains("not found"))
    }
}

/// The blockchain node as seen by the vault.
#[async_trait]
pub trait ChainRpc: Send + Sync {
    /// Invoke `method` with a single argument object and return `result`.
    async fn call(&self, method: &str, params: Value) -> Result<Value, RpcClientError>;
}

/// HTTP JSON-RPC 2.0 client.
pub struct HttpChainRpc {
    endpoint: url::Url,
    http: reqwest::Client,
    next_id: AtomicU64,
}

impl HttpChainRpc {
    pub fn new(endpoint: &str, timeout: Duration) -> Result<Self, RpcClientError> {
        let endpoint: url::Url = endpoint
            .parse()
            .map_err(|e: url::ParseError| RpcClientError::InvalidRpcUrl(e.to_string()))?;

        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| RpcClientError::Transport(e.to_string()))?;

        Ok(Self {
            endpoint,
            http,
            next_id: AtomicU64::new(1),
        })
    }

    pub fn endpoint(&self) -> &url::Url {
        &self.endpoint
    }
}

#[derive(Deserialize)]
struct RpcResponse {
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<RpcErrorObject>,
}

#[derive(Deserialize)]
struct RpcErrorObject {
    code: i64,
    message: String,
    #[serde(default)]
    data: Option<Value>,
}

#[async_trait]
impl ChainRpc for HttpChainRpc {
    async fn call(&self, method: &str, params: Value) -> Result<Value, RpcClientError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let envelope = json!({
            "jsonrpc": "2.0",
            "method": method,
            "params": [params],
            "id": id,
        });

        tracing::debug!(method, id, "Calling node");

        let response = self
            .http
            .post(self.endpoint.clone())
            .json(&envelope)
            .send()
            .await
            .map_err(|e| RpcClientError::Transport(e.to_string()))?;

        let body: RpcResponse = response
            .json()
            .await
            .map_err(|e| RpcClientError::MalformedResponse(e.to_string()))?;

        if let Some(err) = body.error {
            let message = match err.data {
                Some(Value::String(data)) if !data.is_empty() => {
                    format!("{}: {}", err.message, data)
                }
                _ => err.message,
            };
            return Err(RpcClientError::Node {
                code: err.code,
                message,
            });
        }

        body.result
            .ok_or_else(|| RpcClientError::MalformedResponse("missing result".to_string()))
    }
}

// =============================================================================
// Typed helpers
// =============================================================================

/// On-chain account state as returned by `theta.GetAccount`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NodeAccount {
    #[serde(with = "dec_str::u64", default)]
    pub sequence: u64,
    #[serde(default)]
    pub coins: Coins,
    #[serde(default)]
    pub reserved_funds: Vec<Value>,
    #[serde(with = "dec_str::u64", default)]
    pub last_updated_block_height: u64,
    #[serde(default)]
    pub root: String,
    #[serde(default)]
    pub code: String,
}

/// Result of `theta.BroadcastRawTransaction`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BroadcastResult {
    pub hash: String,
    #[serde(default)]
    pub block: Value,
}

/// Fetch account state; `None` when the node has never seen the address.
pub async fn get_account(
    rpc: &dyn ChainRpc,
    address: &Address,
) -> Result<Option<NodeAccount>, RpcClientError> {
    match rpc
        .call("theta.GetAccount", json!({ "address": address.to_hex() }))
        .await
    {
        Ok(value) => serde_json::from_value(value)
            .map(Some)
            .map_err(|e| RpcClientError::MalformedResponse(e.to_string())),
        Err(e) if e.is_account_not_found() => Ok(None),
        Err(e) => Err(e),
    }
}

/// Current sequence of `address`. Unknown accounts are an error, passed
/// through exactly as the node reported it.
pub async fn get_sequence(rpc: &dyn ChainRpc, address: &Address) -> Result<u64, RpcClientError> {
    let value = rpc
        .call("theta.GetAccount", json!({ "address": address.to_hex() }))
        .await?;
    let account: NodeAccount = serde_json::from_value(value)
        .map_err(|e| RpcClientError::MalformedResponse(e.to_string()))?;
    Ok(account.sequence)
}

/// Submit hex-encoded signed transaction bytes.
pub async fn broadcast_raw_transaction(
    rpc: &dyn ChainRpc,
    tx_hex: &str,
) -> Result<BroadcastResult, RpcClientError> {
    let value = rpc
        .call(
            "theta.BroadcastRawTransaction",
            json!({ "tx_bytes": tx_hex }),
        )
        .await?;
    serde_json::from_value(value).map_err(|e| RpcClientError::MalformedResponse(e.to_string()))
}
