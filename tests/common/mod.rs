#![allow(dead_code)]

use std::{
    collections::{HashMap, VecDeque},
    sync::Mutex,
};

use alloy::primitives::{Address, TxHash, U256};
use async_trait::async_trait;
use fanout::{
    ChainClient, ChainError, DispatchConfig, ErrorKind, RetryPolicy, SignedTransfer,
    TransferTerms,
};

pub fn config() -> DispatchConfig {
    DispatchConfig {
        terms: TransferTerms {
            value: U256::from(427_596u64),
            gas_limit: 22_000,
            gas_price: 900_000,
            chain_id: 88_817,
        },
        retry: RetryPolicy::default(),
        explorer_url: "https://explorer.test".into(),
        symbol: "TEST".into(),
    }
}

pub fn rpc_err(kind: ErrorKind, message: &str) -> ChainError {
    ChainError::new(kind, message)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attempt {
    pub from: Address,
    pub nonce: u64,
    pub to: Address,
    pub hash: TxHash,
}

/// In-memory chain that accepts broadcasts unless a scripted error is queued.
#[derive(Default)]
pub struct ScriptedChain {
    nonces: Mutex<HashMap<Address, u64>>,
    nonce_errors: Mutex<VecDeque<ChainError>>,
    /// `None` accepts the broadcast, `Some` rejects it.
    broadcasts: Mutex<VecDeque<Option<ChainError>>>,
    attempts: Mutex<Vec<Attempt>>,
    accepted: Mutex<Vec<Attempt>>,
    nonce_calls: Mutex<usize>,
    pub balance: U256,
}

impl ScriptedChain {
    pub fn new() -> Self {
        Self {
            balance: U256::from(10u64).pow(U256::from(18u64)),
            ..Default::default()
        }
    }

    pub fn with_nonce(self, address: Address, nonce: u64) -> Self {
        self.nonces.lock().unwrap().insert(address, nonce);
        self
    }

    pub fn fail_nonce(self, err: ChainError) -> Self {
        self.nonce_errors.lock().unwrap().push_back(err);
        self
    }

    pub fn accept(self) -> Self {
        self.broadcasts.lock().unwrap().push_back(None);
        self
    }

    pub fn reject(self, err: ChainError) -> Self {
        self.broadcasts.lock().unwrap().push_back(Some(err));
        self
    }

    /// Another sender consumed `address`'s next nonce behind our back.
    pub fn bump_nonce(&self, address: Address) {
        *self.nonces.lock().unwrap().entry(address).or_default() += 1;
    }

    pub fn accepted(&self) -> Vec<Attempt> {
        self.accepted.lock().unwrap().clone()
    }

    pub fn attempts(&self) -> Vec<Attempt> {
        self.attempts.lock().unwrap().clone()
    }

    pub fn nonce_calls(&self) -> usize {
        *self.nonce_calls.lock().unwrap()
    }
}

#[async_trait]
impl ChainClient for ScriptedChain {
    async fn balance(&self, _address: Address) -> Result<U256, ChainError> {
        Ok(self.balance)
    }

    async fn pending_nonce(&self, address: Address) -> Result<u64, ChainError> {
        *self.nonce_calls.lock().unwrap() += 1;
        if let Some(err) = self.nonce_errors.lock().unwrap().pop_front() {
            return Err(err);
        }
        Ok(self
            .nonces
            .lock()
            .unwrap()
            .get(&address)
            .copied()
            .unwrap_or_default())
    }

    async fn broadcast(&self, tx: &SignedTransfer) -> Result<TxHash, ChainError> {
        let signed = tx.signed();
        let from = signed
            .signature()
            .recover_address_from_prehash(&signed.signature_hash())
            .expect("scripted chain only sees valid signatures");
        let attempt = Attempt {
            from,
            nonce: tx.nonce(),
            to: tx.to(),
            hash: tx.hash(),
        };
        self.attempts.lock().unwrap().push(attempt.clone());

        if let Some(Some(err)) = self.broadcasts.lock().unwrap().pop_front() {
            return Err(err);
        }

        let mut nonces = self.nonces.lock().unwrap();
        let pending = nonces.entry(from).or_default();
        if tx.nonce() < *pending {
            return Err(rpc_err(ErrorKind::NonceConflict, "nonce too low"));
        }
        *pending = tx.nonce() + 1;
        self.accepted.lock().unwrap().push(attempt);
        Ok(tx.hash())
    }
}
