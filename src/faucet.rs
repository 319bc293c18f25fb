// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Faucet
//!
//! Background task granting starting funds to newly provisioned accounts,
//! rate-limited per batch window.
//!
//! ## Strategy
//!
//! Two timers drive one loop:
//! 1. Every `wakeup_period` the scheduler pulls up to the remaining batch
//!    capacity of unfunded records, oldest first, and disburses each.
//! 2. Every `batch_period` the batch counter goes back to zero.
//!
//! Every attempted grant counts against the batch, failed or not. A record
//! is marked funded *before* the funding command runs, so a failed grant is
//! never retried and nobody is funded twice.
//!
//! ## Shutdown
//!
//! Uses `tokio_util::sync::CancellationToken` for graceful shutdown.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::blockchain::types::{Address, Coins};
use crate::config::FaucetConfig;
use crate::storage::{Record, RecordStore, StoreError};

#[derive(Debug, thiserror::Error)]
pub enum DisburseError {
    #[error("failed to mark record funded: {0}")]
    Store(#[from] StoreError),

    #[error("failed to start funding command: {0}")]
    Spawn(#[from] std::io::Error),

    #[error("funding command failed: {0}")]
    Command(String),
}

/// The external funding action.
#[async_trait]
pub trait Disburser: Send + Sync {
    async fn disburse(&self, address: &Address, grant: &Coins) -> Result<(), DisburseError>;
}

/// Runs `<command> <address> <theta_wei> <tfuel_wei>`; non-zero exit is a failure.
pub struct CommandDisburser {
    command: String,
}

impl CommandDisburser {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
        }
    }
}

#[async_trait]
impl Disburser for CommandDisburser {
    async fn disburse(&self, address: &Address, grant: &Coins) -> Result<(), DisburseError> {
        let output = tokio::process::Command::new(&self.command)
            .arg(alloy::hex::encode(address.as_bytes()))
            .arg(grant.theta_wei.to_string())
            .arg(grant.tfuel_wei.to_string())
            .kill_on_drop(true)
            .output()
            .await?;

        if output.status.success() {
            Ok(())
        } else {
            let stderr = String::from_utf8_lossy(&output.stderr);
            Err(DisburseError::Command(format!(
                "{} exited with {}: {}",
                self.command,
                output.status,
                stderr.trim()
            )))
        }
    }
}

/// Grants handed out in the current batch window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FaucetBatchWindow {
    processed_in_batch: usize,
    capacity: usize,
}

impl FaucetBatchWindow {
    pub fn new(capacity: usize) -> Self {
        Self {
            processed_in_batch: 0,
            capacity,
        }
    }

    pub fn processed(&self) -> usize {
        self.processed_in_batch
    }

    pub fn remaining(&self) -> usize {
        self.capacity.saturating_sub(self.processed_in_batch)
    }

    pub fn is_full(&self) -> bool {
        self.remaining() == 0
    }

    fn record(&mut self, attempted: usize) {
        self.processed_in_batch = (self.processed_in_batch + attempted).min(self.capacity);
    }

    fn reset(&mut self) {
        self.processed_in_batch = 0;
    }
}

/// Outcome of one wakeup tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickReport {
    pub attempted: usize,
    pub failed: usize,
}

pub struct FaucetBatchScheduler {
    store: Arc<dyn RecordStore>,
    disburser: Arc<dyn Disburser>,
    window: FaucetBatchWindow,
    grant: Coins,
    batch_period: Duration,
    wakeup_period: Duration,
}

impl FaucetBatchScheduler {
    pub fn new(
        config: &FaucetConfig,
        store: Arc<dyn RecordStore>,
        disburser: Arc<dyn Disburser>,
    ) -> Self {
        Self {
            store,
            disburser,
            window: FaucetBatchWindow::new(config.grants_per_batch),
            grant: Coins {
                theta_wei: config.theta_amount,
                tfuel_wei: config.tfuel_amount,
            },
            batch_period: config.batch_period,
            wakeup_period: config.wakeup_period,
        }
    }

    pub fn window(&self) -> &FaucetBatchWindow {
        &self.window
    }

    /// Run until `shutdown` is cancelled. A due reset is always handled
    /// before a due wakeup.
    pub async fn run(mut self, shutdown: CancellationToken) {
        info!(
            capacity = self.window.capacity,
            batch_secs = self.batch_period.as_secs(),
            wakeup_secs = self.wakeup_period.as_secs(),
            "Faucet starting"
        );

        let start = Instant::now();
        let mut reset = interval_at(start + self.batch_period, self.batch_period);
        let mut wakeup = interval_at(start + self.wakeup_period, self.wakeup_period);
        reset.set_missed_tick_behavior(MissedTickBehavior::Delay);
        wakeup.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                _ = shutdown.cancelled() => {
                    info!("Faucet shutting down");
                    return;
                }
                _ = reset.tick() => self.reset_batch(),
                _ = wakeup.tick() => {
                    self.wakeup_tick().await;
                }
            }
        }
    }

    pub fn reset_batch(&mut self) {
        info!(processed = self.window.processed(), "Resetting faucet batch count");
        self.window.reset();
    }

    /// Disburse to as many queued records as the batch still allows.
    pub async fn wakeup_tick(&mut self) -> TickReport {
        if self.window.is_full() {
            info!(capacity = self.window.capacity, "Batch cap reached; not granting funds");
            return TickReport::default();
        }

        let limit = self.window.remaining();
        let records = match self.store.find_unfunded_users(limit) {
            Ok(records) => records,
            Err(e) => {
                error!(error = %e, "Failed to fetch unfunded users; skipping tick");
                return TickReport::default();
            }
        };
        if records.is_empty() {
            return TickReport::default();
        }

        let mut report = TickReport::default();
        for record in &records {
            report.attempted += 1;
            if let Err(e) = self.disburse(record).await {
                report.failed += 1;
                warn!(
                    user_id = %record.user_id,
                    address = %record.send_account.address(),
                    error = %e,
                    "Faucet grant failed"
                );
            }
        }

        self.window.record(report.attempted);
        info!(
            attempted = report.attempted,
            failed = report.failed,
            processed_in_batch = self.window.processed(),
            "Faucet tick complete"
        );
        report
    }

    async fn disburse(&self, record: &Record) -> Result<(), DisburseError> {
        let address = record.send_account.address();
        self.store.mark_user_funded(&address)?;

        if self.grant.is_zero() {
            return Ok(());
        }

        self.disburser.disburse(&address, &self.grant).await?;
        info!(user_id = %record.user_id, %address, "Granted initial funds");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{MemoryRecordStore, RecordingDisburser};
    use chrono::Utc;

    fn config(capacity: usize, tfuel: u128) -> FaucetConfig {
        FaucetConfig {
            grants_per_batch: capacity,
            tfuel_amount: tfuel,
            batch_period: Duration::from_secs(100),
            wakeup_period: Duration::from_secs(10),
            ..FaucetConfig::default()
        }
    }

    fn seeded_store(count: usize) -> (Arc<MemoryRecordStore>, Vec<Record>) {
        let store = Arc::new(MemoryRecordStore::default());
        let now = Utc::now();
        let records: Vec<Record> = (0..count)
            .map(|i| {
                let mut record = Record::generate(&format!("user{i}"));
                record.created_at = now - chrono::Duration::minutes((count - i) as i64);
                store.create(&record).unwrap();
                record
            })
            .collect();
        (store, records)
    }

    fn scheduler(
        capacity: usize,
        tfuel: u128,
        store: Arc<MemoryRecordStore>,
        disburser: Arc<RecordingDisburser>,
    ) -> FaucetBatchScheduler {
        FaucetBatchScheduler::new(&config(capacity, tfuel), store, disburser)
    }

    #[test]
    fn window_never_exceeds_capacity() {
        let mut window = FaucetBatchWindow::new(5);
        window.record(3);
        assert_eq!(window.remaining(), 2);
        window.record(4);
        assert_eq!(window.processed(), 5);
        assert!(window.is_full());
        window.reset();
        assert_eq!(window.remaining(), 5);
    }

    #[tokio::test]
    async fn tick_respects_batch_cap_oldest_first() {
        let (store, records) = seeded_store(10);
        let disburser = Arc::new(RecordingDisburser::default());
        let mut faucet = scheduler(5, 10, store.clone(), disburser.clone());

        let report = faucet.wakeup_tick().await;
        assert_eq!(report, TickReport { attempted: 5, failed: 0 });
        let expected: Vec<Address> = records[..5].iter().map(|r| r.send_account.address()).collect();
        assert_eq!(disburser.addresses(), expected);
        assert_eq!(store.find_unfunded_users(100).unwrap().len(), 5);

        // Cap reached: nothing more until the batch resets.
        assert_eq!(faucet.wakeup_tick().await, TickReport::default());
        assert_eq!(disburser.addresses().len(), 5);

        faucet.reset_batch();
        let report = faucet.wakeup_tick().await;
        assert_eq!(report.attempted, 5);
        assert!(store.find_unfunded_users(100).unwrap().is_empty());
    }

    #[tokio::test]
    async fn one_failure_does_not_block_the_rest() {
        let (store, records) = seeded_store(4);
        let disburser = Arc::new(RecordingDisburser::default());
        disburser.fail_for(records[1].send_account.address());
        let mut faucet = scheduler(10, 10, store.clone(), disburser.clone());

        let report = faucet.wakeup_tick().await;
        assert_eq!(report, TickReport { attempted: 4, failed: 1 });
        assert_eq!(faucet.window().processed(), 4);
        assert_eq!(disburser.addresses().len(), 4);
        // At-most-once: the failed grant stays marked funded.
        assert!(store.find_unfunded_users(10).unwrap().is_empty());
    }

    #[tokio::test]
    async fn zero_grant_marks_funded_without_running_command() {
        let (store, _) = seeded_store(3);
        let disburser = Arc::new(RecordingDisburser::default());
        let mut faucet = scheduler(10, 0, store.clone(), disburser.clone());

        let report = faucet.wakeup_tick().await;
        assert_eq!(report, TickReport { attempted: 3, failed: 0 });
        assert!(disburser.addresses().is_empty());
        assert!(store.find_unfunded_users(10).unwrap().is_empty());
    }

    #[tokio::test]
    async fn store_failure_skips_tick_without_counting() {
        let (store, _) = seeded_store(3);
        store.fail_reads(true);
        let disburser = Arc::new(RecordingDisburser::default());
        let mut faucet = scheduler(10, 10, store.clone(), disburser.clone());

        assert_eq!(faucet.wakeup_tick().await, TickReport::default());
        assert_eq!(faucet.window().processed(), 0);

        store.fail_reads(false);
        assert_eq!(faucet.wakeup_tick().await.attempted, 3);
    }

    #[tokio::test]
    async fn mark_failure_skips_disbursement() {
        let (store, _) = seeded_store(2);
        store.fail_marks(true);
        let disburser = Arc::new(RecordingDisburser::default());
        let mut faucet = scheduler(10, 10, store, disburser.clone());

        let report = faucet.wakeup_tick().await;
        assert_eq!(report, TickReport { attempted: 2, failed: 2 });
        assert!(disburser.addresses().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn run_loop_resets_batches_and_stops_on_shutdown() {
        let (store, _) = seeded_store(6);
        let disburser = Arc::new(RecordingDisburser::default());
        let faucet = scheduler(2, 10, store.clone(), disburser.clone());

        let shutdown = CancellationToken::new();
        let handle = tokio::spawn(faucet.run(shutdown.clone()));

        // Three wakeups inside the first batch window: capped at 2 grants.
        tokio::time::sleep(Duration::from_secs(35)).await;
        assert_eq!(disburser.addresses().len(), 2);

        // Reset and wakeup both fire at t=100; the reset goes first, so the
        // wakeup grants 2 more.
        tokio::time::sleep(Duration::from_secs(70)).await;
        assert_eq!(disburser.addresses().len(), 4);

        shutdown.cancel();
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn command_disburser_reports_exit_status() {
        let ok = CommandDisburser::new("true");
        ok.disburse(&Address::default(), &Coins::tfuel(1)).await.unwrap();

        let failing = CommandDisburser::new("false");
        assert!(matches!(
            failing.disburse(&Address::default(), &Coins::tfuel(1)).await,
            Err(DisburseError::Command(_))
        ));

        let missing = CommandDisburser::new("/nonexistent/add_fund.sh");
        assert!(matches!(
            missing.disburse(&Address::default(), &Coins::tfuel(1)).await,
            Err(DisburseError::Spawn(_))
        ));
    }
}
