// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Error taxonomy of the gateway and its JSON-RPC rendering.
//!
//! Lower layers keep their own `thiserror` enums; everything that reaches a
//! caller is folded into one [`VaultError`] kind so handlers can branch on
//! the kind instead of message text.

use serde::{Deserialize, Serialize};

use crate::blockchain::client::RpcClientError;
use crate::blockchain::codec::{CodecError, VerifyError};
use crate::blockchain::keys::KeyError;
use crate::storage::StoreError;

/// JSON-RPC 2.0 reserved codes used by the endpoint itself.
pub const PARSE_ERROR: i64 = -32700;
pub const INVALID_REQUEST: i64 = -32600;
pub const METHOD_NOT_FOUND: i64 = -32601;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum VaultError {
    #[error("Unauthorized: {0}")]
    Auth(String),

    #[error("Key store error: {0}")]
    KeyStore(String),

    #[error("Invalid argument: {0}")]
    Validation(String),

    #[error("Encoding error: {0}")]
    Encoding(String),

    #[error("Signing error: {0}")]
    Signing(String),

    /// The node's error, code and message untouched.
    #[error("{message}")]
    UpstreamRpc { code: i64, message: String },
}

/// `error` member of a JSON-RPC response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct JsonRpcError {
    pub code: i64,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<String>,
}

impl JsonRpcError {
    pub fn new(code: i64, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            data: None,
        }
    }
}

impl VaultError {
    pub fn auth(message: impl Into<String>) -> Self {
        Self::Auth(message.into())
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn encoding(message: impl Into<String>) -> Self {
        Self::Encoding(message.into())
    }

    /// Stable machine-readable kind.
    pub fn error_code(&self) -> &'static str {
        match self {
            VaultError::Auth(_) => "AUTH_ERROR",
            VaultError::KeyStore(_) => "KEY_STORE_ERROR",
            VaultError::Validation(_) => "VALIDATION_ERROR",
            VaultError::Encoding(_) => "ENCODING_ERROR",
            VaultError::Signing(_) => "SIGNING_ERROR",
            VaultError::UpstreamRpc { .. } => "UPSTREAM_RPC_ERROR",
        }
    }

    pub fn rpc_code(&self) -> i64 {
        match self {
            VaultError::Auth(_) => -32001,
            VaultError::KeyStore(_) => -32002,
            VaultError::Validation(_) => -32602,
            VaultError::Encoding(_) => -32003,
            VaultError::Signing(_) => -32004,
            VaultError::UpstreamRpc { code, .. } => *code,
        }
    }

    pub fn to_rpc_error(&self) -> JsonRpcError {
        JsonRpcError {
            code: self.rpc_code(),
            message: self.to_string(),
            data: Some(self.error_code().to_string()),
        }
    }
}

impl From<StoreError> for VaultError {
    fn from(err: StoreError) -> Self {
        VaultError::KeyStore(err.to_string())
    }
}

impl From<CodecError> for VaultError {
    fn from(err: CodecError) -> Self {
        VaultError::Encoding(err.to_string())
    }
}

impl From<KeyError> for VaultError {
    fn from(err: KeyError) -> Self {
        VaultError::Signing(err.to_string())
    }
}

impl From<RpcClientError> for VaultError {
    fn from(err: RpcClientError) -> Self {
        VaultError::UpstreamRpc {
            code: err.code(),
            message: err.message(),
        }
    }
}

impl From<VerifyError> for VaultError {
    fn from(err: VerifyError) -> Self {
        match err {
            VerifyError::Codec(e) => e.into(),
            other => VaultError::Validation(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_map_to_distinct_rpc_codes() {
        let errors = [
            VaultError::auth("no user"),
            VaultError::KeyStore("db down".into()),
            VaultError::validation("bad"),
            VaultError::encoding("hex"),
            VaultError::Signing("key".into()),
        ];
        let mut codes: Vec<i64> = errors.iter().map(VaultError::rpc_code).collect();
        codes.sort();
        codes.dedup();
        assert_eq!(codes.len(), errors.len());
        assert_eq!(VaultError::validation("x").rpc_code(), -32602);
    }

    #[test]
    fn upstream_errors_pass_through_verbatim() {
        let err: VaultError = RpcClientError::Node {
            code: -32000,
            message: "Account with address 0x01 is not found".into(),
        }
        .into();
        let rpc = err.to_rpc_error();
        assert_eq!(rpc.code, -32000);
        assert_eq!(rpc.message, "Account with address 0x01 is not found");
        assert_eq!(rpc.data.as_deref(), Some("UPSTREAM_RPC_ERROR"));
    }

    #[test]
    fn verify_codec_failures_stay_encoding_errors() {
        let err: VaultError = VerifyError::Codec(CodecError::Hex("odd length".into())).into();
        assert_eq!(err.error_code(), "ENCODING_ERROR");

        let err: VaultError = VerifyError::MissingSignature("target").into();
        assert_eq!(err, VaultError::validation("target signature missing"));
    }

    #[test]
    fn rpc_error_omits_empty_data() {
        let json = serde_json::to_string(&JsonRpcError::new(METHOD_NOT_FOUND, "nope")).unwrap();
        assert_eq!(json, r#"{"code":-32601,"message":"nope"}"#);
    }
}
