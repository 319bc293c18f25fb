// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Embedded record store backed by redb (pure Rust, ACID).
//!
//! ## Table Layout
//!
//! - `records`: user_id → serialized StoredRecord
//! - `unfunded_queue`: composite key (created_at_be|user_id) → user_id
//! - `address_index`: lowercase send address → user_id

use std::path::Path;

use redb::{Database, ReadableDatabase, ReadableTable, TableDefinition};

use super::{Record, RecordStore, StoreError, StoreResult, StoredRecord};
use crate::blockchain::types::Address;

// =============================================================================
// Table Definitions
// =============================================================================

/// Primary table: user_id → serialized StoredRecord (JSON bytes).
const RECORDS: TableDefinition<&str, &[u8]> = TableDefinition::new("records");

/// Faucet queue: composite key → user_id. Holds only unfunded records.
/// Key format: `created_at_micros_be | user_id` so a forward scan is FIFO.
const UNFUNDED_QUEUE: TableDefinition<&[u8], &str> = TableDefinition::new("unfunded_queue");

/// Map: lowercase send address → user_id.
const ADDRESS_INDEX: TableDefinition<&str, &str> = TableDefinition::new("address_index");

/// Build the unfunded_queue key for a record.
fn make_queue_key(record: &StoredRecord) -> Vec<u8> {
    // Clamp pre-epoch timestamps to the front of the queue.
    let micros = record.created_at.timestamp_micros().max(0) as u64;
    let mut key = Vec::with_capacity(8 + record.user_id.len());
    key.extend_from_slice(&micros.to_be_bytes());
    key.extend_from_slice(record.user_id.as_bytes());
    key
}

fn address_key(address: &Address) -> String {
    address.to_hex().to_lowercase()
}

// =============================================================================
// RedbRecordStore
// =============================================================================

pub struct RedbRecordStore {
    db: Database,
}

impl RedbRecordStore {
    /// Open (or create) the database at the given path.
    pub fn open(path: &Path) -> StoreResult<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let db = Database::create(path)?;

        // Pre-create all tables so later read transactions don't fail
        let write_txn = db.begin_write()?;
        {
            let _ = write_txn.open_table(RECORDS)?;
            let _ = write_txn.open_table(UNFUNDED_QUEUE)?;
            let _ = write_txn.open_table(ADDRESS_INDEX)?;
        }
        write_txn.commit()?;

        tracing::info!(path = %path.display(), "Record store opened");
        Ok(Self { db })
    }

    fn read_stored(&self, user_id: &str) -> StoreResult<Option<StoredRecord>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(RECORDS)?;
        match table.get(user_id)? {
            Some(value) => Ok(Some(serde_json::from_slice(value.value())?)),
            None => Ok(None),
        }
    }
}

impl RecordStore for RedbRecordStore {
    fn find_by_user_id(&self, user_id: &str) -> StoreResult<Option<Record>> {
        self.read_stored(user_id)?
            .map(StoredRecord::into_record)
            .transpose()
    }

    fn create(&self, record: &Record) -> StoreResult<()> {
        let stored = StoredRecord::from_record(record)?;
        let json = serde_json::to_vec(&stored)?;

        let write_txn = self.db.begin_write()?;
        {
            let mut records = write_txn.open_table(RECORDS)?;
            if records.get(stored.user_id.as_str())?.is_some() {
                return Err(StoreError::AlreadyExists(format!("Record {}", stored.user_id)));
            }
            records.insert(stored.user_id.as_str(), json.as_slice())?;

            let mut index = write_txn.open_table(ADDRESS_INDEX)?;
            index.insert(address_key(&stored.send_address).as_str(), stored.user_id.as_str())?;

            if !stored.faucet_funded {
                let mut queue = write_txn.open_table(UNFUNDED_QUEUE)?;
                queue.insert(make_queue_key(&stored).as_slice(), stored.user_id.as_str())?;
            }
        }
        write_txn.commit()?;
        Ok(())
    }

    fn find_unfunded_users(&self, limit: usize) -> StoreResult<Vec<Record>> {
        let read_txn = self.db.begin_read()?;
        let queue = read_txn.open_table(UNFUNDED_QUEUE)?;
        let records = read_txn.open_table(RECORDS)?;

        let mut results = Vec::with_capacity(limit);
        for entry in queue.iter()? {
            if results.len() >= limit {
                break;
            }
            let (_, user_id) = entry?;
            let user_id = user_id.value().to_string();
            let value = records
                .get(user_id.as_str())?
                .ok_or_else(|| StoreError::Corrupt(format!("queued user {user_id} has no record")))?;
            let stored: StoredRecord = serde_json::from_slice(value.value())?;
            results.push(stored.into_record()?);
        }
        Ok(results)
    }

    fn mark_user_funded(&self, address: &Address) -> StoreResult<()> {
        let write_txn = self.db.begin_write()?;
        {
            let index = write_txn.open_table(ADDRESS_INDEX)?;
            let user_id = index
                .get(address_key(address).as_str())?
                .map(|v| v.value().to_string())
                .ok_or_else(|| StoreError::NotFound(format!("Address {address}")))?;

            let mut records = write_txn.open_table(RECORDS)?;
            // Read existing value and deserialize before mutating
            let existing_bytes = {
                let existing = records
                    .get(user_id.as_str())?
                    .ok_or_else(|| StoreError::NotFound(format!("Record {user_id}")))?;
                existing.value().to_vec()
            };
            let mut stored: StoredRecord = serde_json::from_slice(&existing_bytes)?;

            let mut queue = write_txn.open_table(UNFUNDED_QUEUE)?;
            queue.remove(make_queue_key(&stored).as_slice())?;

            stored.faucet_funded = true;
            let json = serde_json::to_vec(&stored)?;
            records.insert(user_id.as_str(), json.as_slice())?;
        }
        write_txn.commit()?;
        Ok(())
    }

    fn health_check(&self) -> StoreResult<()> {
        let read_txn = self.db.begin_read()?;
        let _ = read_txn.open_table(RECORDS)?;
        Ok(())
    }
}
