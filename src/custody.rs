// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Per-user key custody.
//!
//! [`KeyCustodian::get_or_create`] is the only path that generates keys.
//! Creation relies on the store's uniqueness constraint: when two requests
//! race on a brand-new user id, the loser's insert fails with
//! `AlreadyExists` and it returns the winner's record instead, so every
//! caller ends up with the same keypairs.

use std::sync::Arc;

use crate::error::VaultError;
use crate::storage::{Record, RecordStore, StoreError};

pub struct KeyCustodian {
    store: Arc<dyn RecordStore>,
}

impl KeyCustodian {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self { store }
    }

    /// Existing record for `user_id`, without creating one.
    pub fn find(&self, user_id: &str) -> Result<Option<Record>, VaultError> {
        self.store.find_by_user_id(user_id).map_err(|e| {
            tracing::error!(user_id, error = %e, "Failed to load record");
            VaultError::KeyStore(format!("Failed to find userid {user_id}: {e}"))
        })
    }

    /// Record for `user_id`, generating and persisting fresh keypairs on
    /// first access.
    pub fn get_or_create(&self, user_id: &str) -> Result<Record, VaultError> {
        if user_id.is_empty() {
            return Err(VaultError::validation("No userid is passed in"));
        }

        if let Some(record) = self.find(user_id)? {
            return Ok(record);
        }

        let record = Record::generate(user_id);
        match self.store.create(&record) {
            Ok(()) => {
                tracing::info!(
                    user_id,
                    send_address = %record.send_account.address(),
                    recv_address = %record.receive_account.address(),
                    "Provisioned custodial accounts"
                );
                Ok(record)
            }
            Err(StoreError::AlreadyExists(_)) => {
                tracing::debug!(user_id, "Lost creation race; using stored record");
                self.find(user_id)?.ok_or_else(|| {
                    VaultError::KeyStore(format!("Record for {user_id} vanished after conflict"))
                })
            }
            Err(e) => {
                tracing::error!(user_id, error = %e, "Failed to persist new record");
                Err(VaultError::KeyStore(format!(
                    "Failed to create record for {user_id}: {e}"
                )))
            }
        }
    }
}
