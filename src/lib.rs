// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Theta Vault - Custodial Transaction-Signing Gateway
//!
//! Custodies a send and a receive keypair per user, builds and signs Theta
//! transactions on the user's behalf, and relays them to a Theta node over
//! JSON-RPC. A background faucet grants starting funds to new accounts.
//!
//! ## Modules
//!
//! - `api` - JSON-RPC endpoint and health check (Axum)
//! - `auth` - Caller identity supplied by the fronting proxy
//! - `blockchain` - Theta wire types, signing and the node client
//! - `custody` - Get-or-create of per-user key records
//! - `escrow` - Reserve / service payment / release protocol
//! - `faucet` - Rate-limited initial funding
//! - `storage` - Durable key records (redb)

pub mod api;
pub mod auth;
pub mod blockchain;
pub mod config;
pub mod custody;
pub mod error;
pub mod escrow;
pub mod faucet;
pub mod models;
pub mod state;
pub mod storage;

#[cfg(test)]
pub(crate) mod testing;
