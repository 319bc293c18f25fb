// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # RPC Data Models
//!
//! Argument and result objects of the `theta.*` JSON-RPC methods, plus the
//! JSON-RPC 2.0 envelope and the health response.
//!
//! Amounts and sequence numbers accept either JSON numbers or decimal
//! strings and are written back as decimal strings, the convention of the
//! node behind the gateway. An absent or zero `fee`/`gas` means "use the
//! protocol minimum"; an absent or zero `sequence` is rejected wherever a
//! sequence is required.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::ToSchema;

use crate::blockchain::client::{BroadcastResult, NodeAccount};
use crate::blockchain::types::{dec_str, Address, Coins};
use crate::error::JsonRpcError;

// =============================================================================
// JSON-RPC envelope
// =============================================================================

/// Incoming JSON-RPC 2.0 request.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct JsonRpcRequest {
    #[serde(default)]
    pub jsonrpc: Option<String>,
    pub method: String,
    /// Either the argument object or a one-element array holding it.
    #[serde(default)]
    #[schema(value_type = Object)]
    pub params: Value,
    #[serde(default)]
    #[schema(value_type = Object)]
    pub id: Value,
}

/// Outgoing JSON-RPC 2.0 response; exactly one of `result`/`error` is set.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct JsonRpcResponse {
    pub jsonrpc: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Object)]
    pub result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,
    #[schema(value_type = Object)]
    pub id: Value,
}

impl JsonRpcResponse {
    pub fn success(id: Value, result: Value) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            result: Some(result),
            error: None,
            id,
        }
    }

    pub fn failure(id: Value, error: JsonRpcError) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            result: None,
            error: Some(error),
            id,
        }
    }
}

// =============================================================================
// theta.GetAccount
// =============================================================================

/// On-chain state of one custodied account.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountView {
    pub address: Address,
    #[serde(flatten)]
    pub state: NodeAccount,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GetAccountResult {
    pub user_id: String,
    pub send_account: AccountView,
    pub recv_account: AccountView,
}

// =============================================================================
// theta.Send / theta.BroadcastRawTransaction
// =============================================================================

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SendArgs {
    pub to: Address,
    #[serde(default)]
    pub amount: Coins,
    #[serde(default, with = "dec_str::option_u128")]
    pub fee: Option<u128>,
    #[serde(default, with = "dec_str::option_u64")]
    pub gas: Option<u64>,
    #[serde(default, with = "dec_str::u64")]
    pub sequence: u64,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct BroadcastRawTransactionArgs {
    pub tx_bytes: String,
}

// =============================================================================
// Escrow: reserve / release / service payments
// =============================================================================

#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
pub struct ReserveFundArgs {
    #[serde(default, with = "dec_str::option_u128")]
    pub fee: Option<u128>,
    #[serde(default, with = "dec_str::option_u64")]
    pub gas: Option<u64>,
    /// TFuel wei locked as collateral.
    #[serde(default, with = "dec_str::option_u128")]
    pub collateral: Option<u128>,
    /// TFuel wei reserved for service payments.
    #[serde(default, with = "dec_str::option_u128")]
    pub fund: Option<u128>,
    #[serde(default)]
    pub resource_ids: Vec<String>,
    #[serde(default, with = "dec_str::option_u64")]
    pub duration: Option<u64>,
    #[serde(default, with = "dec_str::u64")]
    pub sequence: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReserveFundResult {
    #[serde(flatten)]
    pub broadcast: BroadcastResult,
    #[serde(with = "dec_str::u64")]
    pub reserve_sequence: u64,
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
pub struct ReleaseFundArgs {
    #[serde(default, with = "dec_str::option_u128")]
    pub fee: Option<u128>,
    #[serde(default, with = "dec_str::option_u64")]
    pub gas: Option<u64>,
    #[serde(default, with = "dec_str::u64")]
    pub sequence: u64,
    #[serde(default, with = "dec_str::u64")]
    pub reserve_sequence: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReleaseFundResult {
    #[serde(flatten)]
    pub broadcast: BroadcastResult,
    #[serde(with = "dec_str::u64")]
    pub reserve_sequence: u64,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CreateServicePaymentArgs {
    pub to: Address,
    /// TFuel wei paid out of the reservation.
    #[serde(default, with = "dec_str::option_u128")]
    pub amount: Option<u128>,
    #[serde(default)]
    pub resource_id: String,
    #[serde(default, with = "dec_str::u64")]
    pub payment_sequence: u64,
    #[serde(default, with = "dec_str::u64")]
    pub reserve_sequence: u64,
}

/// `payment` is the hex half-signed stub, or empty for a self-payment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateServicePaymentResult {
    pub payment: String,
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
pub struct SubmitServicePaymentArgs {
    #[serde(default, with = "dec_str::option_u128")]
    pub fee: Option<u128>,
    #[serde(default, with = "dec_str::option_u64")]
    pub gas: Option<u64>,
    #[serde(default)]
    pub payment: String,
    #[serde(default, with = "dec_str::u64")]
    pub sequence: u64,
}

// =============================================================================
// theta.InstantiateSplitContract
// =============================================================================

#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
pub struct InstantiateSplitContractArgs {
    #[serde(default, with = "dec_str::option_u128")]
    pub fee: Option<u128>,
    #[serde(default, with = "dec_str::option_u64")]
    pub gas: Option<u64>,
    #[serde(default)]
    pub resource_id: String,
    /// User id whose send account initiates and pays for the contract.
    #[serde(default)]
    pub initiator: String,
    /// User ids; each share goes to that user's receive account.
    #[serde(default)]
    pub participants: Vec<String>,
    #[serde(default)]
    pub percentages: Vec<u32>,
    #[serde(default, with = "dec_str::option_u64")]
    pub duration: Option<u64>,
    /// When given, must match the sequence derived from the chain.
    #[serde(default, with = "dec_str::option_u64")]
    pub sequence: Option<u64>,
}

// =============================================================================
// Health
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct HealthResponse {
    /// `ok` or `degraded`
    pub status: String,
    pub chain_id: String,
    pub store: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn amounts_accept_numbers_strings_and_null() {
        let args: ReserveFundArgs = serde_json::from_value(json!({
            "fee": null,
            "collateral": "1001",
            "fund": 1000,
            "resource_ids": ["rid1"],
            "sequence": "3"
        }))
        .unwrap();
        assert_eq!(args.fee, None);
        assert_eq!(args.collateral, Some(1001));
        assert_eq!(args.fund, Some(1000));
        assert_eq!(args.duration, None);
        assert_eq!(args.sequence, 3);
    }

    #[test]
    fn amounts_above_u64_are_accepted_as_numbers() {
        let value: Value = serde_json::from_str(
            r#"{"collateral": 20000000000000000001, "fund": 20000000000000000000, "sequence": 3}"#,
        )
        .unwrap();
        let args: ReserveFundArgs = serde_json::from_value(value).unwrap();
        assert_eq!(args.fund, Some(20_000_000_000_000_000_000));
        assert_eq!(args.collateral, Some(20_000_000_000_000_000_001));
    }

    #[test]
    fn send_args_require_a_valid_recipient() {
        assert!(serde_json::from_value::<SendArgs>(json!({"to": "0x12", "sequence": 1})).is_err());

        let args: SendArgs = serde_json::from_value(json!({
            "to": "0x2b5ad5c4795c026514f8317c7a215e218dccd6cf",
            "amount": {"thetawei": "0", "tfuelwei": "10"},
            "sequence": 2
        }))
        .unwrap();
        assert_eq!(args.amount.tfuel_wei, 10);
        assert_eq!(args.gas, None);
    }

    #[test]
    fn reserve_result_flattens_broadcast_fields() {
        let result = ReserveFundResult {
            broadcast: BroadcastResult {
                hash: "0xabc".into(),
                block: Value::Null,
            },
            reserve_sequence: 7,
        };
        let json = serde_json::to_value(result).unwrap();
        assert_eq!(json["hash"], "0xabc");
        assert_eq!(json["reserve_sequence"], "7");
    }

    #[test]
    fn response_carries_either_result_or_error() {
        let ok = serde_json::to_value(JsonRpcResponse::success(json!(1), json!({"a": 1}))).unwrap();
        assert!(ok.get("error").is_none());
        let err = serde_json::to_value(JsonRpcResponse::failure(
            json!(1),
            JsonRpcError::new(-32601, "no such method"),
        ))
        .unwrap();
        assert!(err.get("result").is_none());
        assert_eq!(err["error"]["code"], -32601);
    }
}
