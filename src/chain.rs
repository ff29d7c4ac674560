use std::marker::PhantomData;

use alloy::{
    network::Ethereum,
    primitives::{Address, TxHash, U256},
    providers::Provider,
    transports::Transport,
};
use async_trait::async_trait;

use crate::{error::ChainError, transfer::SignedTransfer};

/// The three RPC calls the dispatch loop needs.
///
/// Implementations classify failures but never retry; retry policy
/// belongs to the caller.
#[async_trait]
pub trait ChainClient: Send + Sync {
    async fn balance(&self, address: Address) -> Result<U256, ChainError>;

    /// Next nonce counting transactions still in the pending pool.
    async fn pending_nonce(&self, address: Address) -> Result<u64, ChainError>;

    async fn broadcast(&self, tx: &SignedTransfer) -> Result<TxHash, ChainError>;
}

/// [`ChainClient`] over an alloy provider.
pub struct RpcClient<P, T> {
    provider: P,
    _phantom: PhantomData<T>,
}

impl<P, T> RpcClient<P, T>
where
    P: Provider<T, Ethereum>,
    T: Transport + Clone,
{
    pub fn new(provider: P) -> Self {
        Self {
            provider,
            _phantom: PhantomData,
        }
    }
}

#[async_trait]
impl<P, T> ChainClient for RpcClient<P, T>
where
    P: Provider<T, Ethereum>,
    T: Transport + Clone,
{
    async fn balance(&self, address: Address) -> Result<U256, ChainError> {
        Ok(self.provider.get_balance(address).await?)
    }

    async fn pending_nonce(&self, address: Address) -> Result<u64, ChainError> {
        Ok(self
            .provider
            .get_transaction_count(address)
            .pending()
            .await?)
    }

    async fn broadcast(&self, tx: &SignedTransfer) -> Result<TxHash, ChainError> {
        let pending = self.provider.send_raw_transaction(&tx.encoded()).await?;
        Ok(*pending.tx_hash())
    }
}
