// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Theta chain integration.
//!
//! This module provides functionality for:
//! - Ledger types and their wire encoding
//! - secp256k1 account keys and recoverable signatures
//! - Building and signing every supported transaction kind
//! - Talking to the Theta node over JSON-RPC

pub mod client;
pub mod codec;
pub mod keys;
pub mod transactions;
pub mod types;

pub use client::{ChainRpc, HttpChainRpc, RpcClientError};
pub use codec::SignedTx;
pub use keys::AccountKeys;
pub use transactions::TxSigner;
pub use types::*;
