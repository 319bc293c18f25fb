// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::sync::Arc;

use crate::blockchain::{ChainRpc, TxSigner};
use crate::config::ChainConfig;
use crate::custody::KeyCustodian;
use crate::escrow::PaymentEscrow;
use crate::storage::RecordStore;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn RecordStore>,
    pub custodian: Arc<KeyCustodian>,
    pub chain: Arc<dyn ChainRpc>,
    pub signer: Arc<TxSigner>,
    pub escrow: Arc<PaymentEscrow>,
    pub config: Arc<ChainConfig>,
}

impl AppState {
    pub fn new(store: Arc<dyn RecordStore>, chain: Arc<dyn ChainRpc>, config: ChainConfig) -> Self {
        let signer = Arc::new(TxSigner::new(&config));
        Self {
            custodian: Arc::new(KeyCustodian::new(store.clone())),
            escrow: Arc::new(PaymentEscrow::new(chain.clone(), signer.clone())),
            store,
            chain,
            signer,
            config: Arc::new(config),
        }
    }
}
