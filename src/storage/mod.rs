// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Record Storage
//!
//! One [`Record`] per user: the custodied send and receive keypairs plus
//! faucet bookkeeping. The rest of the crate only sees the [`RecordStore`]
//! capability; [`RedbRecordStore`] is the production backend.
//!
//! ## Storage Format
//!
//! Records are persisted as [`StoredRecord`] JSON with private keys in
//! PKCS#8 PEM. Loading a record re-derives each address from its key and
//! refuses records whose stored address disagrees.
//!
//! ## Important Notes
//!
//! - `create` never overwrites: a second create for the same user id fails
//!   with [`StoreError::AlreadyExists`]
//! - Private keys never leave this module except inside [`AccountKeys`]

pub mod record_db;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::blockchain::keys::AccountKeys;
use crate::blockchain::types::Address;

pub use record_db::RedbRecordStore;

// =============================================================================
// Error Type
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("redb error: {0}")]
    Redb(#[from] redb::Error),

    #[error("redb database error: {0}")]
    RedbDatabase(#[from] redb::DatabaseError),

    #[error("redb transaction error: {0}")]
    RedbTransaction(#[from] redb::TransactionError),

    #[error("redb table error: {0}")]
    RedbTable(#[from] redb::TableError),

    #[error("redb storage error: {0}")]
    RedbStorage(#[from] redb::StorageError),

    #[error("redb commit error: {0}")]
    RedbCommit(#[from] redb::CommitError),

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("already exists: {0}")]
    AlreadyExists(String),

    #[error("corrupt record: {0}")]
    Corrupt(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

// =============================================================================
// Record
// =============================================================================

/// A user's custodied accounts.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    pub user_id: String,
    /// Funds outbound payments, reservations and fees.
    pub send_account: AccountKeys,
    /// Receives transfers and settled service payments.
    pub receive_account: AccountKeys,
    pub created_at: DateTime<Utc>,
    pub faucet_funded: bool,
}

impl Record {
    /// A record with two freshly generated keypairs.
    pub fn generate(user_id: &str) -> Self {
        Self {
            user_id: user_id.to_string(),
            send_account: AccountKeys::generate(),
            receive_account: AccountKeys::generate(),
            created_at: Utc::now(),
            faucet_funded: false,
        }
    }

    /// True when `address` is one of this user's own accounts.
    pub fn owns(&self, address: &Address) -> bool {
        self.send_account.address() == *address || self.receive_account.address() == *address
    }
}

/// On-disk form of a [`Record`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredRecord {
    pub user_id: String,
    pub send_address: Address,
    pub send_private_key_pem: String,
    pub recv_address: Address,
    pub recv_private_key_pem: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub faucet_funded: bool,
}

impl StoredRecord {
    pub fn from_record(record: &Record) -> StoreResult<Self> {
        let encode = |keys: &AccountKeys| {
            keys.to_pem()
                .map_err(|e| StoreError::Corrupt(format!("{}: {}", record.user_id, e)))
        };
        Ok(Self {
            user_id: record.user_id.clone(),
            send_address: record.send_account.address(),
            send_private_key_pem: encode(&record.send_account)?,
            recv_address: record.receive_account.address(),
            recv_private_key_pem: encode(&record.receive_account)?,
            created_at: record.created_at,
            faucet_funded: record.faucet_funded,
        })
    }

    pub fn into_record(self) -> StoreResult<Record> {
        let send_account = load_keys(&self.user_id, &self.send_private_key_pem, &self.send_address)?;
        let receive_account =
            load_keys(&self.user_id, &self.recv_private_key_pem, &self.recv_address)?;
        Ok(Record {
            user_id: self.user_id,
            send_account,
            receive_account,
            created_at: self.created_at,
            faucet_funded: self.faucet_funded,
        })
    }
}

fn load_keys(user_id: &str, pem: &str, expected: &Address) -> StoreResult<AccountKeys> {
    let keys = AccountKeys::from_pem(pem)
        .map_err(|e| StoreError::Corrupt(format!("{user_id}: {e}")))?;
    if keys.address() != *expected {
        return Err(StoreError::Corrupt(format!(
            "{user_id}: key derives {} but record says {}",
            keys.address(),
            expected
        )));
    }
    Ok(keys)
}

// =============================================================================
// RecordStore
// =============================================================================

/// Persistence capability consumed by the custodian, the handlers and the
/// faucet. Implementations must be safe for concurrent use.
pub trait RecordStore: Send + Sync {
    fn find_by_user_id(&self, user_id: &str) -> StoreResult<Option<Record>>;

    /// Insert a new record; fails with `AlreadyExists` if the user id is taken.
    fn create(&self, record: &Record) -> StoreResult<()>;

    /// Up to `limit` unfunded records, oldest first.
    fn find_unfunded_users(&self, limit: usize) -> StoreResult<Vec<Record>>;

    /// Flag the record whose send account is `address` as funded.
    fn mark_user_funded(&self, address: &Address) -> StoreResult<()>;

    fn health_check(&self) -> StoreResult<()>;

    /// Flush and release resources. Further calls may fail.
    fn close(&self) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stored_record_round_trips_keys() {
        let record = Record::generate("alice");
        let stored = StoredRecord::from_record(&record).unwrap();
        assert!(stored.send_private_key_pem.contains("BEGIN PRIVATE KEY"));

        let json = serde_json::to_string(&stored).unwrap();
        let restored: StoredRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(restored.into_record().unwrap(), record);
    }

    #[test]
    fn mismatched_address_is_corrupt() {
        let record = Record::generate("bob");
        let mut stored = StoredRecord::from_record(&record).unwrap();
        stored.send_address = record.receive_account.address();
        assert!(matches!(stored.into_record(), Err(StoreError::Corrupt(_))));
    }

    #[test]
    fn generated_accounts_are_distinct_and_unfunded() {
        let record = Record::generate("carol");
        assert_ne!(record.send_account.address(), record.receive_account.address());
        assert!(record.owns(&record.send_account.address()));
        assert!(record.owns(&record.receive_account.address()));
        assert!(!record.owns(&Address::default()));
        assert!(!record.faucet_funded);
    }
}
