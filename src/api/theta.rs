// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! `theta.*` method handlers.
//!
//! Each handler resolves the caller's record (creating it on first use),
//! hands the arguments to the signer or the escrow protocol, and relays
//! the result. Errors are returned as [`VaultError`] and rendered by the
//! JSON-RPC layer.

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::auth::Caller;
use crate::blockchain::client::{self, BroadcastResult};
use crate::blockchain::transactions::{self, validate_split_args};
use crate::blockchain::types::Address;
use crate::config::INTERNAL_SCOPE;
use crate::error::{JsonRpcError, VaultError, METHOD_NOT_FOUND};
use crate::models::{
    AccountView, BroadcastRawTransactionArgs, CreateServicePaymentArgs,
    CreateServicePaymentResult, GetAccountResult, InstantiateSplitContractArgs, ReleaseFundArgs,
    ReleaseFundResult, ReserveFundArgs, ReserveFundResult, SendArgs, SubmitServicePaymentArgs,
};
use crate::state::AppState;
use crate::storage::Record;

/// Method names served by the endpoint.
pub const METHODS: &[&str] = &[
    "theta.GetAccount",
    "theta.Send",
    "theta.BroadcastRawTransaction",
    "theta.ReserveFund",
    "theta.ReleaseFund",
    "theta.CreateServicePayment",
    "theta.SubmitServicePayment",
    "theta.InstantiateSplitContract",
];

/// Route one call to its handler and serialize the result.
pub async fn dispatch(
    state: &AppState,
    caller: &Caller,
    method: &str,
    params: Value,
) -> Result<Value, JsonRpcError> {
    let result = match method {
        "theta.GetAccount" => to_json(get_account(state, caller).await),
        "theta.Send" => to_json(send(state, caller, params).await),
        "theta.BroadcastRawTransaction" => to_json(broadcast_raw_transaction(state, params).await),
        "theta.ReserveFund" => to_json(reserve_fund(state, caller, params).await),
        "theta.ReleaseFund" => to_json(release_fund(state, caller, params).await),
        "theta.CreateServicePayment" => to_json(create_service_payment(state, caller, params)),
        "theta.SubmitServicePayment" => to_json(submit_service_payment(state, caller, params).await),
        "theta.InstantiateSplitContract" => {
            to_json(instantiate_split_contract(state, caller, params).await)
        }
        _ => {
            return Err(JsonRpcError::new(
                METHOD_NOT_FOUND,
                format!("method {method} not found"),
            ))
        }
    };

    result.map_err(|e| {
        tracing::warn!(
            method,
            user_id = caller.user_id.as_deref().unwrap_or("-"),
            error_code = e.error_code(),
            error = %e,
            "RPC call failed"
        );
        e.to_rpc_error()
    })
}

fn to_json<T: Serialize>(result: Result<T, VaultError>) -> Result<Value, VaultError> {
    result.and_then(|value| {
        serde_json::to_value(value).map_err(|e| VaultError::encoding(e.to_string()))
    })
}

fn parse_args<T: DeserializeOwned>(params: Value) -> Result<T, VaultError> {
    serde_json::from_value(params).map_err(|e| VaultError::validation(e.to_string()))
}

fn caller_record(state: &AppState, caller: &Caller) -> Result<Record, VaultError> {
    state.custodian.get_or_create(caller.require_user()?)
}

async fn account_view(state: &AppState, address: Address) -> Result<AccountView, VaultError> {
    let account = client::get_account(state.chain.as_ref(), &address).await?;
    Ok(AccountView {
        address,
        state: account.unwrap_or_default(),
    })
}

async fn get_account(state: &AppState, caller: &Caller) -> Result<GetAccountResult, VaultError> {
    let record = caller_record(state, caller)?;
    Ok(GetAccountResult {
        send_account: account_view(state, record.send_account.address()).await?,
        recv_account: account_view(state, record.receive_account.address()).await?,
        user_id: record.user_id,
    })
}

async fn send(state: &AppState, caller: &Caller, params: Value) -> Result<BroadcastResult, VaultError> {
    let user_id = caller.require_user()?;
    let args: SendArgs = parse_args(params)?;
    let record = state.custodian.get_or_create(user_id)?;
    let signed = state.signer.prepare_send_tx(&args, &record)?;
    transactions::broadcast(state.chain.as_ref(), &signed).await
}

async fn broadcast_raw_transaction(
    state: &AppState,
    params: Value,
) -> Result<BroadcastResult, VaultError> {
    let args: BroadcastRawTransactionArgs = parse_args(params)?;
    if args.tx_bytes.trim().is_empty() {
        return Err(VaultError::validation("tx_bytes is empty"));
    }
    Ok(client::broadcast_raw_transaction(state.chain.as_ref(), &args.tx_bytes).await?)
}

async fn reserve_fund(
    state: &AppState,
    caller: &Caller,
    params: Value,
) -> Result<ReserveFundResult, VaultError> {
    let user_id = caller.require_user()?;
    let args: ReserveFundArgs = parse_args(params)?;
    let record = state.custodian.get_or_create(user_id)?;
    state.escrow.reserve(&args, &record).await
}

async fn release_fund(
    state: &AppState,
    caller: &Caller,
    params: Value,
) -> Result<ReleaseFundResult, VaultError> {
    let user_id = caller.require_user()?;
    let args: ReleaseFundArgs = parse_args(params)?;
    let record = state.custodian.get_or_create(user_id)?;
    state.escrow.release(&args, &record).await
}

fn create_service_payment(
    state: &AppState,
    caller: &Caller,
    params: Value,
) -> Result<CreateServicePaymentResult, VaultError> {
    let user_id = caller.require_user()?;
    let args: CreateServicePaymentArgs = parse_args(params)?;
    let record = state.custodian.get_or_create(user_id)?;
    state.escrow.create_payment(&args, &record)
}

async fn submit_service_payment(
    state: &AppState,
    caller: &Caller,
    params: Value,
) -> Result<BroadcastResult, VaultError> {
    let user_id = caller.require_user()?;
    let args: SubmitServicePaymentArgs = parse_args(params)?;
    let record = state.custodian.get_or_create(user_id)?;
    state.escrow.submit_payment(&args, &record).await
}

async fn instantiate_split_contract(
    state: &AppState,
    caller: &Caller,
    params: Value,
) -> Result<BroadcastResult, VaultError> {
    if state.config.require_internal_scope {
        caller.require_scope(INTERNAL_SCOPE)?;
    }
    let args: InstantiateSplitContractArgs = parse_args(params)?;
    validate_split_args(&args)?;

    let initiator = state.custodian.get_or_create(&args.initiator)?;
    let participants = args
        .participants
        .iter()
        .map(|user_id| state.custodian.get_or_create(user_id))
        .collect::<Result<Vec<_>, _>>()?;

    let sequence =
        client::get_sequence(state.chain.as_ref(), &initiator.send_account.address()).await?;
    let signed = state
        .signer
        .prepare_split_contract_tx(&args, &initiator, sequence, &participants)?;
    transactions::broadcast(state.chain.as_ref(), &signed).await
}
