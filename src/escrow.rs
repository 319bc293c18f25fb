// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Reserve → pay → settle → release.
//!
//! ```text
//! [none] --reserve--> RESERVED(seq) --create_payment--> HALF_SIGNED(stub)
//!                         |                                 |
//!                         |                          submit_payment
//!                      release                              v
//!                         v                              SETTLED
//!                     RELEASED
//! ```
//!
//! The chain owns the escrow balance, expiry and payment-sequence ordering.
//! This layer signs each transition and correlates them through the
//! reservation's sequence number, which callers carry explicitly.

use std::sync::Arc;

use crate::blockchain::client::{BroadcastResult, ChainRpc};
use crate::blockchain::transactions::{self, TxSigner};
use crate::error::VaultError;
use crate::models::{
    CreateServicePaymentArgs, CreateServicePaymentResult, ReleaseFundArgs, ReleaseFundResult,
    ReserveFundArgs, ReserveFundResult, SubmitServicePaymentArgs,
};
use crate::storage::Record;

pub struct PaymentEscrow {
    chain: Arc<dyn ChainRpc>,
    signer: Arc<TxSigner>,
}

impl PaymentEscrow {
    pub fn new(chain: Arc<dyn ChainRpc>, signer: Arc<TxSigner>) -> Self {
        Self { chain, signer }
    }

    /// Lock funds for later payments. The reservation is identified by the
    /// sequence of this transaction.
    pub async fn reserve(
        &self,
        args: &ReserveFundArgs,
        record: &Record,
    ) -> Result<ReserveFundResult, VaultError> {
        let signed = self.signer.prepare_reserve_fund_tx(args, record)?;
        let broadcast = transactions::broadcast(self.chain.as_ref(), &signed).await?;
        tracing::info!(
            user_id = %record.user_id,
            reserve_sequence = args.sequence,
            "Funds reserved"
        );
        Ok(ReserveFundResult {
            broadcast,
            reserve_sequence: args.sequence,
        })
    }

    /// Half-signed payment stub against a reservation; nothing is broadcast.
    pub fn create_payment(
        &self,
        args: &CreateServicePaymentArgs,
        record: &Record,
    ) -> Result<CreateServicePaymentResult, VaultError> {
        let payment = self
            .signer
            .prepare_create_service_payment_tx(args, record)?
            .map(|signed| signed.to_hex())
            .unwrap_or_default();
        Ok(CreateServicePaymentResult { payment })
    }

    /// Counter-sign a stub as the payee and settle it on chain.
    pub async fn submit_payment(
        &self,
        args: &SubmitServicePaymentArgs,
        record: &Record,
    ) -> Result<BroadcastResult, VaultError> {
        let signed = self.signer.prepare_submit_service_payment_tx(args, record)?;
        transactions::broadcast(self.chain.as_ref(), &signed).await
    }

    /// Return what is left of a reservation.
    pub async fn release(
        &self,
        args: &ReleaseFundArgs,
        record: &Record,
    ) -> Result<ReleaseFundResult, VaultError> {
        let signed = self.signer.prepare_release_fund_tx(args, record)?;
        let broadcast = transactions::broadcast(self.chain.as_ref(), &signed).await?;
        Ok(ReleaseFundResult {
            broadcast,
            reserve_sequence: args.reserve_sequence,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blockchain::codec;
    use crate::blockchain::types::Transaction;
    use crate::config::ChainConfig;
    use crate::testing::{fixed_record, MockChainRpc};

    fn escrow(chain: Arc<MockChainRpc>) -> PaymentEscrow {
        PaymentEscrow::new(chain, Arc::new(TxSigner::new(&ChainConfig::default())))
    }

    fn broadcast_tx(chain: &MockChainRpc, index: usize) -> Transaction {
        let calls = chain.calls();
        let hex = calls[index].1["tx_bytes"].as_str().unwrap().to_string();
        codec::tx_from_hex(&hex).unwrap()
    }

    #[tokio::test]
    async fn full_lifecycle_correlates_reserve_sequence() {
        let chain = Arc::new(MockChainRpc::verifying("test_chain_id"));
        let escrow = escrow(chain.clone());
        let alice = fixed_record("alice", 1, 2);
        let bob = fixed_record("bob", 3, 4);

        let reserved = escrow
            .reserve(
                &ReserveFundArgs {
                    collateral: Some(1_001),
                    fund: Some(1_000),
                    resource_ids: vec!["rid1000001".into()],
                    sequence: 4,
                    ..Default::default()
                },
                &alice,
            )
            .await
            .unwrap();
        assert_eq!(reserved.reserve_sequence, 4);

        let stub = escrow
            .create_payment(
                &CreateServicePaymentArgs {
                    to: bob.receive_account.address(),
                    amount: Some(100),
                    resource_id: "rid1000001".into(),
                    payment_sequence: 1,
                    reserve_sequence: reserved.reserve_sequence,
                },
                &alice,
            )
            .unwrap();
        assert!(!stub.payment.is_empty());
        // Creating a stub never touches the chain.
        assert_eq!(chain.calls().len(), 1);

        escrow
            .submit_payment(
                &SubmitServicePaymentArgs {
                    payment: stub.payment,
                    sequence: 1,
                    ..Default::default()
                },
                &bob,
            )
            .await
            .unwrap();
        let Transaction::ServicePayment(settled) = broadcast_tx(&chain, 1) else {
            panic!("expected service payment broadcast");
        };
        assert_eq!(settled.reserve_sequence, 4);

        let released = escrow
            .release(
                &ReleaseFundArgs {
                    sequence: 5,
                    reserve_sequence: 4,
                    ..Default::default()
                },
                &alice,
            )
            .await
            .unwrap();
        assert_eq!(released.reserve_sequence, 4);
        assert_eq!(chain.calls().len(), 3);
    }

    #[tokio::test]
    async fn self_payment_returns_empty_stub() {
        let chain = Arc::new(MockChainRpc::new());
        let alice = fixed_record("alice", 1, 2);
        let result = escrow(chain.clone())
            .create_payment(
                &CreateServicePaymentArgs {
                    to: alice.receive_account.address(),
                    amount: Some(100),
                    resource_id: "rid".into(),
                    payment_sequence: 1,
                    reserve_sequence: 2,
                },
                &alice,
            )
            .unwrap();
        assert_eq!(result.payment, "");
        assert!(chain.calls().is_empty());
    }

    #[tokio::test]
    async fn node_rejection_is_returned_verbatim() {
        let chain = Arc::new(MockChainRpc::new());
        chain.fail_next(
            "theta.BroadcastRawTransaction",
            -32000,
            "ValidateInputAdvanced: Got 3, expected 5",
        );
        let alice = fixed_record("alice", 1, 2);
        let err = escrow(chain)
            .release(
                &ReleaseFundArgs {
                    sequence: 3,
                    reserve_sequence: 2,
                    ..Default::default()
                },
                &alice,
            )
            .await
            .unwrap_err();
        assert_eq!(
            err,
            VaultError::UpstreamRpc {
                code: -32000,
                message: "ValidateInputAdvanced: Got 3, expected 5".into(),
            }
        );
    }

    #[tokio::test]
    async fn invalid_arguments_never_reach_the_chain() {
        let chain = Arc::new(MockChainRpc::new());
        let alice = fixed_record("alice", 1, 2);
        let err = escrow(chain.clone())
            .reserve(&ReserveFundArgs::default(), &alice)
            .await
            .unwrap_err();
        assert_eq!(err.error_code(), "VALIDATION_ERROR");
        assert!(chain.calls().is_empty());
    }
}
