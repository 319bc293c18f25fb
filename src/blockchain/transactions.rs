// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Transaction preparation and signing.
//!
//! Every `prepare_*` method follows the same steps: validate arguments and
//! fill fee/gas/duration defaults, assemble the inputs, compute the
//! sign-bytes for the signer's domain, sign, attach the signature and
//! encode the wire bytes. Nothing here touches the network or the store;
//! callers pass in the records (and, for split contracts, the chain
//! sequence) the transaction is built from.

use super::client::{self, BroadcastResult, ChainRpc};
use super::codec::{self, SignDomain, SignedTx};
use super::keys::AccountKeys;
use super::types::{
    Coins, ReleaseFundTx, ReserveFundTx, SendTx, ServicePaymentTx, Split, SplitRuleTx,
    Transaction, TxInput, TxOutput,
};
use crate::config::ChainConfig;
use crate::error::VaultError;
use crate::models::{
    CreateServicePaymentArgs, InstantiateSplitContractArgs, ReleaseFundArgs, ReserveFundArgs,
    SendArgs, SubmitServicePaymentArgs,
};
use crate::storage::Record;

/// Builds and signs transactions for one chain.
#[derive(Debug, Clone)]
pub struct TxSigner {
    chain_id: String,
    min_fee: u128,
    min_gas: u64,
    default_reserve_duration: u64,
    default_split_duration: u64,
}

impl TxSigner {
    pub fn new(config: &ChainConfig) -> Self {
        Self {
            chain_id: config.chain_id.clone(),
            min_fee: config.min_fee,
            min_gas: config.min_gas,
            default_reserve_duration: config.default_reserve_duration,
            default_split_duration: config.default_split_duration,
        }
    }

    pub fn chain_id(&self) -> &str {
        &self.chain_id
    }

    /// Requested fee, or the protocol minimum when absent or zero.
    fn fee(&self, requested: Option<u128>) -> Coins {
        Coins::tfuel(requested.filter(|f| *f > 0).unwrap_or(self.min_fee))
    }

    fn gas(&self, requested: Option<u64>) -> u64 {
        requested.filter(|g| *g > 0).unwrap_or(self.min_gas)
    }

    fn sign_and_encode(
        &self,
        mut tx: Transaction,
        keys: &AccountKeys,
    ) -> Result<SignedTx, VaultError> {
        let kind = tx.kind();
        let payload = codec::sign_bytes(&tx, &self.chain_id, SignDomain::Transaction)?;
        let signature = keys.sign(&payload)?;
        let address = keys.address();

        let slot = match &mut tx {
            Transaction::Send(send) => send.inputs.iter_mut().find(|i| i.address == address),
            Transaction::ReserveFund(reserve) => Some(&mut reserve.source),
            Transaction::ReleaseFund(release) => Some(&mut release.source),
            Transaction::SplitRule(split) => Some(&mut split.initiator),
            Transaction::ServicePayment(_) => None,
        };
        match slot {
            Some(input) if input.address == address => input.signature = signature,
            _ => {
                return Err(VaultError::Signing(format!(
                    "{} has no input for signer {}",
                    kind,
                    address
                )))
            }
        }

        Ok(SignedTx::new(tx)?)
    }

    /// Transfer `amount` from the caller's send account to `to`.
    pub fn prepare_send_tx(&self, args: &SendArgs, record: &Record) -> Result<SignedTx, VaultError> {
        require_sequence(args.sequence, "sequence")?;
        if args.amount.is_zero() {
            return Err(VaultError::validation("amount must be greater than zero"));
        }

        let fee = self.fee(args.fee);
        let spend = args
            .amount
            .checked_add(&fee)
            .ok_or_else(|| VaultError::validation("amount plus fee overflows"))?;

        let payer = &record.send_account;
        let tx = Transaction::Send(SendTx {
            fee,
            gas: self.gas(args.gas),
            inputs: vec![TxInput::new(payer.address(), spend, args.sequence, payer.public_key())],
            outputs: vec![TxOutput {
                address: args.to,
                coins: args.amount,
            }],
        });

        self.sign_and_encode(tx, payer)
    }

    /// Escrow `fund` (plus `collateral`) out of the send account.
    pub fn prepare_reserve_fund_tx(
        &self,
        args: &ReserveFundArgs,
        record: &Record,
    ) -> Result<SignedTx, VaultError> {
        require_sequence(args.sequence, "sequence")?;
        let fund = args
            .fund
            .ok_or_else(|| VaultError::validation("fund is required"))?;
        let collateral = args
            .collateral
            .ok_or_else(|| VaultError::validation("collateral is required"))?;

        let payer = &record.send_account;
        let tx = Transaction::ReserveFund(ReserveFundTx {
            fee: self.fee(args.fee),
            gas: self.gas(args.gas),
            source: TxInput::new(
                payer.address(),
                Coins::tfuel(fund),
                args.sequence,
                payer.public_key(),
            ),
            collateral: Coins::tfuel(collateral),
            resource_ids: args.resource_ids.clone(),
            duration: args
                .duration
                .filter(|d| *d > 0)
                .unwrap_or(self.default_reserve_duration),
        });

        self.sign_and_encode(tx, payer)
    }

    /// Return the unused part of reservation `reserve_sequence`.
    pub fn prepare_release_fund_tx(
        &self,
        args: &ReleaseFundArgs,
        record: &Record,
    ) -> Result<SignedTx, VaultError> {
        require_sequence(args.sequence, "sequence")?;
        require_sequence(args.reserve_sequence, "reserve_sequence")?;

        let payer = &record.send_account;
        let tx = Transaction::ReleaseFund(ReleaseFundTx {
            fee: self.fee(args.fee),
            gas: self.gas(args.gas),
            source: TxInput::new(payer.address(), Coins::zero(), args.sequence, payer.public_key()),
            reserve_sequence: args.reserve_sequence,
        });

        self.sign_and_encode(tx, payer)
    }

    /// Half-sign a service payment from the caller's reservation to `to`.
    ///
    /// Returns `None` when `to` is one of the caller's own accounts: paying
    /// yourself is a no-op, not an error.
    pub fn prepare_create_service_payment_tx(
        &self,
        args: &CreateServicePaymentArgs,
        record: &Record,
    ) -> Result<Option<SignedTx>, VaultError> {
        if args.resource_id.is_empty() {
            return Err(VaultError::validation("No resource_id is provided"));
        }
        if record.owns(&args.to) {
            tracing::debug!(user_id = %record.user_id, to = %args.to, "Skipping self-payment");
            return Ok(None);
        }
        require_sequence(args.reserve_sequence, "reserve_sequence")?;

        let amount = args
            .amount
            .ok_or_else(|| VaultError::validation("amount is required"))?;

        let payer = &record.send_account;
        let mut source = TxInput::address_only(payer.address());
        source.coins = Coins::tfuel(amount);

        let mut tx = Transaction::ServicePayment(ServicePaymentTx {
            fee: Coins::zero(),
            gas: 0,
            source,
            target: TxInput::address_only(args.to),
            payment_sequence: args.payment_sequence,
            reserve_sequence: args.reserve_sequence,
            resource_id: args.resource_id.clone(),
        });

        let payload = codec::sign_bytes(&tx, &self.chain_id, SignDomain::PaymentSource)?;
        let signature = payer.sign(&payload)?;
        if let Transaction::ServicePayment(payment) = &mut tx {
            payment.source.signature = signature;
        }

        Ok(Some(SignedTx::new(tx)?))
    }

    /// Counter-sign a payer's stub with the caller's receive account.
    ///
    /// The stub must be a source-signed service payment addressed to the
    /// caller's receive account. Only the target input, fee and gas are
    /// filled in; everything the payer signed is left untouched.
    pub fn prepare_submit_service_payment_tx(
        &self,
        args: &SubmitServicePaymentArgs,
        record: &Record,
    ) -> Result<SignedTx, VaultError> {
        if args.payment.is_empty() {
            return Err(VaultError::validation("Payment is empty"));
        }
        require_sequence(args.sequence, "sequence")?;

        let mut tx = codec::tx_from_hex(&args.payment)?;
        let payee = &record.receive_account;
        {
            let Transaction::ServicePayment(payment) = &tx else {
                return Err(VaultError::validation(format!(
                    "payment stub is a {} transaction, not a service payment",
                    tx.kind()
                )));
            };
            if payment.target.address != payee.address() {
                return Err(VaultError::validation(format!(
                    "payment is addressed to {}, not to {}",
                    payment.target.address,
                    payee.address()
                )));
            }
        }
        tx.verify_payment_source(&self.chain_id)?;

        if let Transaction::ServicePayment(payment) = &mut tx {
            payment.target = TxInput::new(payee.address(), Coins::zero(), args.sequence, payee.public_key());
            payment.fee = self.fee(args.fee);
            payment.gas = self.gas(args.gas);
        }

        let payload = codec::sign_bytes(&tx, &self.chain_id, SignDomain::PaymentTarget)?;
        let signature = payee.sign(&payload)?;
        if let Transaction::ServicePayment(payment) = &mut tx {
            payment.target.signature = signature;
        }

        Ok(SignedTx::new(tx)?)
    }

    /// Install a split rule paid for by the initiator's send account.
    ///
    /// `initiator_sequence` is the initiator's current on-chain sequence;
    /// the transaction uses the next one. `participants` must line up with
    /// `args.percentages`.
    pub fn prepare_split_contract_tx(
        &self,
        args: &InstantiateSplitContractArgs,
        initiator: &Record,
        initiator_sequence: u64,
        participants: &[Record],
    ) -> Result<SignedTx, VaultError> {
        validate_split_args(args)?;
        if participants.len() != args.percentages.len() {
            return Err(VaultError::validation(
                "Length of participants doesn't match with length of percentages",
            ));
        }

        let sequence = initiator_sequence
            .checked_add(1)
            .ok_or_else(|| VaultError::validation("initiator sequence overflows"))?;
        if let Some(expected) = args.sequence.filter(|s| *s > 0) {
            if expected != sequence {
                return Err(VaultError::validation(format!(
                    "sequence {expected} does not match next chain sequence {sequence}"
                )));
            }
        }

        let splits = participants
            .iter()
            .zip(&args.percentages)
            .map(|(record, percentage)| Split {
                address: record.receive_account.address(),
                percentage: *percentage,
            })
            .collect();

        let payer = &initiator.send_account;
        let tx = Transaction::SplitRule(SplitRuleTx {
            fee: self.fee(args.fee),
            gas: self.gas(args.gas),
            resource_id: args.resource_id.clone(),
            initiator: TxInput::new(payer.address(), Coins::zero(), sequence, payer.public_key()),
            splits,
            duration: args
                .duration
                .filter(|d| *d > 0)
                .unwrap_or(self.default_split_duration),
        });

        self.sign_and_encode(tx, payer)
    }
}

/// Argument checks that need no store or chain access.
pub fn validate_split_args(args: &InstantiateSplitContractArgs) -> Result<(), VaultError> {
    if args.initiator.is_empty() {
        return Err(VaultError::validation("No initiator is passed in"));
    }
    if args.resource_id.is_empty() {
        return Err(VaultError::validation("No resource_id is passed in"));
    }
    if args.participants.len() != args.percentages.len() {
        return Err(VaultError::validation(
            "Length of participants doesn't match with length of percentages",
        ));
    }
    Ok(())
}

fn require_sequence(value: u64, name: &str) -> Result<(), VaultError> {
    if value == 0 {
        return Err(VaultError::validation(format!("{name} is required")));
    }
    Ok(())
}

/// Broadcast a signed transaction, passing node errors through verbatim.
pub async fn broadcast(rpc: &dyn ChainRpc, tx: &SignedTx) -> Result<BroadcastResult, VaultError> {
    let result = client::broadcast_raw_transaction(rpc, &tx.to_hex()).await?;
    tracing::info!(kind = tx.tx.kind(), hash = %result.hash, "Transaction broadcast");
    Ok(result)
}
