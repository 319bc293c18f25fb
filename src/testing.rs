// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! In-memory doubles shared by the unit tests.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

use alloy::primitives::keccak256;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::{json, Value};

use crate::blockchain::client::{ChainRpc, RpcClientError, TRANSPORT_ERROR_CODE};
use crate::blockchain::codec;
use crate::blockchain::keys::fixed_keys;
use crate::blockchain::types::{Address, Coins};
use crate::faucet::{DisburseError, Disburser};
use crate::storage::{Record, RecordStore, StoreError, StoreResult};

/// A record with deterministic keys and creation time.
pub(crate) fn fixed_record(user_id: &str, send_seed: u8, recv_seed: u8) -> Record {
    Record {
        user_id: user_id.to_string(),
        send_account: fixed_keys(send_seed),
        receive_account: fixed_keys(recv_seed),
        created_at: DateTime::<Utc>::from_timestamp(1_700_000_000, 0).unwrap(),
        faucet_funded: false,
    }
}

// =============================================================================
// Node
// =============================================================================

/// Scripted stand-in for a Theta node.
///
/// `theta.GetAccount` answers with a zeroed account and
/// `theta.BroadcastRawTransaction` with the keccak hash of the bytes. In
/// verifying mode broadcasts are decoded and every signature checked, the
/// way a node would reject a badly signed transaction.
#[derive(Default)]
pub(crate) struct MockChainRpc {
    verify_chain_id: Option<String>,
    failures: Mutex<Vec<(String, RpcClientError)>>,
    calls: Mutex<Vec<(String, Value)>>,
}

impl MockChainRpc {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn verifying(chain_id: &str) -> Self {
        Self {
            verify_chain_id: Some(chain_id.to_string()),
            ..Self::default()
        }
    }

    /// Fail the next call to `method` with a node error.
    pub(crate) fn fail_next(&self, method: &str, code: i64, message: &str) {
        self.failures.lock().unwrap().push((
            method.to_string(),
            RpcClientError::Node {
                code,
                message: message.to_string(),
            },
        ));
    }

    pub(crate) fn calls(&self) -> Vec<(String, Value)> {
        self.calls.lock().unwrap().clone()
    }

    fn take_failure(&self, method: &str) -> Option<RpcClientError> {
        let mut failures = self.failures.lock().unwrap();
        let index = failures.iter().position(|(m, _)| m == method)?;
        Some(failures.remove(index).1)
    }

    fn broadcast(&self, params: &Value) -> Result<Value, RpcClientError> {
        let hex = params["tx_bytes"].as_str().unwrap_or_default();
        let rejected = |message: String| RpcClientError::Node {
            code: TRANSPORT_ERROR_CODE,
            message,
        };

        let hash = match &self.verify_chain_id {
            Some(chain_id) => {
                let bytes = codec::decode_hex(hex).map_err(|e| rejected(e.to_string()))?;
                let tx = codec::tx_from_bytes(&bytes).map_err(|e| rejected(e.to_string()))?;
                tx.verify(chain_id).map_err(|e| rejected(e.to_string()))?;
                keccak256(&bytes)
            }
            None => keccak256(hex.as_bytes()),
        };

        Ok(json!({ "hash": hash.to_string(), "block": {"Height": "1"} }))
    }
}

#[async_trait]
impl ChainRpc for MockChainRpc {
    async fn call(&self, method: &str, params: Value) -> Result<Value, RpcClientError> {
        self.calls
            .lock()
            .unwrap()
            .push((method.to_string(), params.clone()));

        if let Some(err) = self.take_failure(method) {
            return Err(err);
        }

        match method {
            "theta.GetAccount" => Ok(json!({
                "sequence": "0",
                "coins": {"thetawei": "0", "tfuelwei": "0"},
                "reserved_funds": [],
                "last_updated_block_height": "0"
            })),
            "theta.BroadcastRawTransaction" => self.broadcast(&params),
            other => Err(RpcClientError::Node {
                code: -32601,
                message: format!("method {other} not found"),
            }),
        }
    }
}

// =============================================================================
// Record store
// =============================================================================

#[derive(Default)]
pub(crate) struct MemoryRecordStore {
    records: Mutex<Vec<Record>>,
    hidden: Mutex<HashMap<String, Record>>,
    create_calls: AtomicUsize,
    fail_reads: AtomicBool,
    fail_marks: AtomicBool,
}

impl MemoryRecordStore {
    pub(crate) fn create_calls(&self) -> usize {
        self.create_calls.load(Ordering::SeqCst)
    }

    /// Simulate a concurrent writer: `user_id` reads as absent until the
    /// next `create`, which then loses to `record`.
    pub(crate) fn hide_until_create(&self, user_id: &str, record: Record) {
        self.hidden
            .lock()
            .unwrap()
            .insert(user_id.to_string(), record);
    }

    pub(crate) fn fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    pub(crate) fn fail_marks(&self, fail: bool) {
        self.fail_marks.store(fail, Ordering::SeqCst);
    }

    fn check_reads(&self) -> StoreResult<()> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(StoreError::Corrupt("injected read failure".into()));
        }
        Ok(())
    }
}

impl RecordStore for MemoryRecordStore {
    fn find_by_user_id(&self, user_id: &str) -> StoreResult<Option<Record>> {
        self.check_reads()?;
        Ok(self
            .records
            .lock()
            .unwrap()
            .iter()
            .find(|r| r.user_id == user_id)
            .cloned())
    }

    fn create(&self, record: &Record) -> StoreResult<()> {
        self.create_calls.fetch_add(1, Ordering::SeqCst);
        let mut records = self.records.lock().unwrap();

        if let Some(winner) = self.hidden.lock().unwrap().remove(&record.user_id) {
            records.push(winner);
            return Err(StoreError::AlreadyExists(record.user_id.clone()));
        }
        if records.iter().any(|r| r.user_id == record.user_id) {
            return Err(StoreError::AlreadyExists(record.user_id.clone()));
        }
        records.push(record.clone());
        Ok(())
    }

    fn find_unfunded_users(&self, limit: usize) -> StoreResult<Vec<Record>> {
        self.check_reads()?;
        let mut unfunded: Vec<Record> = self
            .records
            .lock()
            .unwrap()
            .iter()
            .filter(|r| !r.faucet_funded)
            .cloned()
            .collect();
        unfunded.sort_by_key(|r| r.created_at);
        unfunded.truncate(limit);
        Ok(unfunded)
    }

    fn mark_user_funded(&self, address: &Address) -> StoreResult<()> {
        if self.fail_marks.load(Ordering::SeqCst) {
            return Err(StoreError::Corrupt("injected write failure".into()));
        }
        let mut records = self.records.lock().unwrap();
        let record = records
            .iter_mut()
            .find(|r| r.send_account.address() == *address)
            .ok_or_else(|| StoreError::NotFound(address.to_string()))?;
        record.faucet_funded = true;
        Ok(())
    }

    fn health_check(&self) -> StoreResult<()> {
        self.check_reads()
    }
}

// =============================================================================
// Faucet
// =============================================================================

/// Records every grant attempt, failing for chosen addresses.
#[derive(Default)]
pub(crate) struct RecordingDisburser {
    attempts: Mutex<Vec<Address>>,
    failing: Mutex<HashSet<Address>>,
}

impl RecordingDisburser {
    pub(crate) fn fail_for(&self, address: Address) {
        self.failing.lock().unwrap().insert(address);
    }

    pub(crate) fn addresses(&self) -> Vec<Address> {
        self.attempts.lock().unwrap().clone()
    }
}

#[async_trait]
impl Disburser for RecordingDisburser {
    async fn disburse(&self, address: &Address, _grant: &Coins) -> Result<(), DisburseError> {
        self.attempts.lock().unwrap().push(*address);
        if self.failing.lock().unwrap().contains(address) {
            return Err(DisburseError::Command(format!("refused {address}")));
        }
        Ok(())
    }
}
