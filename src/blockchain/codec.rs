// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Wire encoding and signature payloads.
//!
//! Transactions travel as bincode bytes, hex-encoded at the RPC boundary.
//! What a party signs is never the wire bytes themselves but a `SignDoc`:
//! the transaction with signature slots blanked, tagged with the chain id
//! and a signature domain. Service payments have two domains so the payer
//! and the payee sign different payloads:
//!
//! | Domain | Signer | Payload |
//! |---|---|---|
//! | `Transaction` | every input | all signatures blank |
//! | `PaymentSource` | payer | target reduced to its address, fee and gas zero, signatures blank |
//! | `PaymentTarget` | payee | target signature blank, payer signature kept |

use serde::Serialize;

use super::keys::{self, KeyError};
use super::types::{Address, Signature, Transaction, TxInput};

#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    #[error("Invalid hex: {0}")]
    Hex(String),

    #[error("Failed to decode transaction: {0}")]
    Decode(String),

    #[error("Failed to encode transaction: {0}")]
    Encode(String),
}

/// Reasons a transaction is not fully and correctly signed.
#[derive(Debug, thiserror::Error)]
pub enum VerifyError {
    #[error("{0} signature missing")]
    MissingSignature(&'static str),

    #[error("{role} signature recovers to {recovered}, expected {expected}")]
    WrongSigner {
        role: &'static str,
        expected: Address,
        recovered: Address,
    },

    #[error("{role} public key does not match address {address}")]
    PublicKeyMismatch {
        role: &'static str,
        address: Address,
    },

    #[error("expected a service payment, got {0}")]
    NotServicePayment(&'static str),

    #[error("transaction has no inputs")]
    NoInputs,

    #[error(transparent)]
    Key(#[from] KeyError),

    #[error(transparent)]
    Codec(#[from] CodecError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SignDomain {
    Transaction,
    PaymentSource,
    PaymentTarget,
}

#[derive(Serialize)]
struct SignDoc<'a> {
    domain: SignDomain,
    chain_id: &'a str,
    tx: &'a Transaction,
}

/// A signed transaction together with its wire bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedTx {
    pub tx: Transaction,
    pub bytes: Vec<u8>,
}

impl SignedTx {
    pub fn new(tx: Transaction) -> Result<Self, CodecError> {
        let bytes = tx_to_bytes(&tx)?;
        Ok(Self { tx, bytes })
    }

    /// Hex form accepted by `BroadcastRawTransaction`.
    pub fn to_hex(&self) -> String {
        encode_hex(&self.bytes)
    }
}

pub fn tx_to_bytes(tx: &Transaction) -> Result<Vec<u8>, CodecError> {
    bincode::serialize(tx).map_err(|e| CodecError::Encode(e.to_string()))
}

pub fn tx_from_bytes(bytes: &[u8]) -> Result<Transaction, CodecError> {
    bincode::deserialize(bytes).map_err(|e| CodecError::Decode(e.to_string()))
}

pub fn encode_hex(bytes: &[u8]) -> String {
    alloy::hex::encode(bytes)
}

/// Decode hex with or without a `0x` prefix.
pub fn decode_hex(s: &str) -> Result<Vec<u8>, CodecError> {
    let trimmed = s.trim();
    let raw = trimmed.strip_prefix("0x").unwrap_or(trimmed);
    alloy::hex::decode(raw).map_err(|e| CodecError::Hex(e.to_string()))
}

/// Hex-encoded wire bytes back into a transaction.
pub fn tx_from_hex(s: &str) -> Result<Transaction, CodecError> {
    tx_from_bytes(&decode_hex(s)?)
}

/// Bytes a signer of `domain` signs for `tx` on chain `chain_id`.
pub fn sign_bytes(
    tx: &Transaction,
    chain_id: &str,
    domain: SignDomain,
) -> Result<Vec<u8>, CodecError> {
    let mut doc_tx = tx.clone();
    match (domain, &mut doc_tx) {
        (SignDomain::PaymentSource, Transaction::ServicePayment(payment)) => {
            payment.source.signature = Signature::default();
            payment.target = TxInput::address_only(payment.target.address);
            payment.fee = Default::default();
            payment.gas = 0;
        }
        (SignDomain::PaymentTarget, Transaction::ServicePayment(payment)) => {
            payment.target.signature = Signature::default();
        }
        (_, tx) => clear_signatures(tx),
    }

    bincode::serialize(&SignDoc {
        domain,
        chain_id,
        tx: &doc_tx,
    })
    .map_err(|e| CodecError::Encode(e.to_string()))
}

fn clear_signatures(tx: &mut Transaction) {
    for input in inputs_mut(tx) {
        input.signature = Signature::default();
    }
}

fn inputs_mut(tx: &mut Transaction) -> Vec<&mut TxInput> {
    match tx {
        Transaction::Send(send) => send.inputs.iter_mut().collect(),
        Transaction::ReserveFund(reserve) => vec![&mut reserve.source],
        Transaction::ReleaseFund(release) => vec![&mut release.source],
        Transaction::ServicePayment(payment) => vec![&mut payment.source, &mut payment.target],
        Transaction::SplitRule(split) => vec![&mut split.initiator],
    }
}

impl Transaction {
    /// Check every signature slot: each must be present, recover to its
    /// input's address over the right sign-bytes, and agree with any
    /// attached public key.
    pub fn verify(&self, chain_id: &str) -> Result<(), VerifyError> {
        match self {
            Transaction::Send(send) => {
                if send.inputs.is_empty() {
                    return Err(VerifyError::NoInputs);
                }
                let payload = sign_bytes(self, chain_id, SignDomain::Transaction)?;
                for input in &send.inputs {
                    verify_input("input", input, &payload)?;
                }
                Ok(())
            }
            Transaction::ReserveFund(reserve) => {
                let payload = sign_bytes(self, chain_id, SignDomain::Transaction)?;
                verify_input("source", &reserve.source, &payload)
            }
            Transaction::ReleaseFund(release) => {
                let payload = sign_bytes(self, chain_id, SignDomain::Transaction)?;
                verify_input("source", &release.source, &payload)
            }
            Transaction::SplitRule(split) => {
                let payload = sign_bytes(self, chain_id, SignDomain::Transaction)?;
                verify_input("initiator", &split.initiator, &payload)
            }
            Transaction::ServicePayment(payment) => {
                self.verify_payment_source(chain_id)?;
                let payload = sign_bytes(self, chain_id, SignDomain::PaymentTarget)?;
                verify_input("target", &payment.target, &payload)
            }
        }
    }

    /// Verify only the payer's half of a service payment.
    pub fn verify_payment_source(&self, chain_id: &str) -> Result<(), VerifyError> {
        match self {
            Transaction::ServicePayment(payment) => {
                let payload = sign_bytes(self, chain_id, SignDomain::PaymentSource)?;
                verify_input("source", &payment.source, &payload)
            }
            other => Err(VerifyError::NotServicePayment(other.kind())),
        }
    }
}

fn verify_input(role: &'static str, input: &TxInput, payload: &[u8]) -> Result<(), VerifyError> {
    if input.signature.is_empty() {
        return Err(VerifyError::MissingSignature(role));
    }

    let recovered = keys::recover_signer(payload, &input.signature)?;
    if recovered != input.address {
        return Err(VerifyError::WrongSigner {
            role,
            expected: input.address,
            recovered,
        });
    }

    if let Some(pub_key) = &input.pub_key {
        if keys::address_of_public_key(pub_key)? != input.address {
            return Err(VerifyError::PublicKeyMismatch {
                role,
                address: input.address,
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blockchain::keys::fixed_keys;
    use crate::blockchain::types::{Coins, ServicePaymentTx, SendTx, TxOutput};

    fn sample_send() -> Transaction {
        let keys = fixed_keys(1);
        Transaction::Send(SendTx {
            fee: Coins::tfuel(1_000_000_000_000),
            gas: 1,
            inputs: vec![TxInput::new(keys.address(), Coins::tfuel(10), 1, keys.public_key())],
            outputs: vec![TxOutput {
                address: fixed_keys(2).address(),
                coins: Coins::tfuel(10),
            }],
        })
    }

    fn sample_payment() -> Transaction {
        Transaction::ServicePayment(ServicePaymentTx {
            fee: Coins::tfuel(5),
            gas: 3,
            source: TxInput::new(fixed_keys(1).address(), Coins::tfuel(10), 0, fixed_keys(1).public_key()),
            target: TxInput::new(fixed_keys(2).address(), Coins::zero(), 4, fixed_keys(2).public_key()),
            payment_sequence: 1,
            reserve_sequence: 9,
            resource_id: "rid".into(),
        })
    }

    #[test]
    fn wire_bytes_survive_hex_round_trip() {
        let tx = sample_send();
        let signed = SignedTx::new(tx.clone()).unwrap();
        assert_eq!(tx_from_hex(&signed.to_hex()).unwrap(), tx);
        assert_eq!(tx_from_hex(&format!("0x{}", signed.to_hex())).unwrap(), tx);
    }

    #[test]
    fn malformed_hex_and_bytes_are_rejected() {
        assert!(matches!(decode_hex("0xzz"), Err(CodecError::Hex(_))));
        assert!(matches!(tx_from_bytes(&[0xff, 0x01]), Err(CodecError::Decode(_))));
    }

    #[test]
    fn sign_bytes_ignore_existing_signatures() {
        let mut tx = sample_send();
        let before = sign_bytes(&tx, "test_chain_id", SignDomain::Transaction).unwrap();
        if let Transaction::Send(send) = &mut tx {
            send.inputs[0].signature = Signature(vec![1; 65]);
        }
        let after = sign_bytes(&tx, "test_chain_id", SignDomain::Transaction).unwrap();
        assert_eq!(before, after);
    }

    #[test]
    fn sign_bytes_bind_chain_id() {
        let tx = sample_send();
        assert_ne!(
            sign_bytes(&tx, "test_chain_id", SignDomain::Transaction).unwrap(),
            sign_bytes(&tx, "mainnet", SignDomain::Transaction).unwrap()
        );
    }

    #[test]
    fn payment_domains_are_disjoint() {
        let tx = sample_payment();
        let source = sign_bytes(&tx, "c", SignDomain::PaymentSource).unwrap();
        let target = sign_bytes(&tx, "c", SignDomain::PaymentTarget).unwrap();
        assert_ne!(source, target);
    }

    #[test]
    fn payer_payload_ignores_target_fields() {
        let tx = sample_payment();
        let mut changed = tx.clone();
        if let Transaction::ServicePayment(payment) = &mut changed {
            payment.target.sequence = 77;
            payment.fee = Coins::tfuel(99);
        }
        assert_eq!(
            sign_bytes(&tx, "c", SignDomain::PaymentSource).unwrap(),
            sign_bytes(&changed, "c", SignDomain::PaymentSource).unwrap()
        );
    }

    #[test]
    fn verify_reports_missing_and_foreign_signatures() {
        let mut tx = sample_send();
        assert!(matches!(
            tx.verify("c"),
            Err(VerifyError::MissingSignature("input"))
        ));

        let payload = sign_bytes(&tx, "c", SignDomain::Transaction).unwrap();
        let wrong = fixed_keys(2).sign(&payload).unwrap();
        if let Transaction::Send(send) = &mut tx {
            send.inputs[0].signature = wrong;
        }
        assert!(matches!(tx.verify("c"), Err(VerifyError::WrongSigner { .. })));

        let right = fixed_keys(1).sign(&payload).unwrap();
        if let Transaction::Send(send) = &mut tx {
            send.inputs[0].signature = right;
        }
        tx.verify("c").unwrap();
        assert!(tx.verify("another_chain").is_err());
    }
}
