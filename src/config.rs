use std::{path::PathBuf, time::Duration};

use alloy::primitives::U256;
use clap::Parser;
use thiserror::Error;

use crate::transfer::TransferTerms;

/// Intrinsic gas of a plain value transfer.
pub const MIN_TRANSFER_GAS: u64 = 21_000;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("gas limit {0} is below the {MIN_TRANSFER_GAS} needed for a transfer")]
    GasLimitTooLow(u64),
    #[error("max nonce retries must be at least 1")]
    NoNonceAttempts,
}

#[derive(Debug, Parser)]
#[command(version, about = "Fan native-token transfers out to fresh wallets", long_about = None)]
pub struct Args {
    #[arg(long, env = "FANOUT_RPC_URL", default_value = "https://rpc-testnet.unit0.dev")]
    pub rpc_url: String,
    #[arg(long, env = "FANOUT_CHAIN_ID", default_value_t = 88_817)]
    pub chain_id: u64,
    #[arg(
        long,
        env = "FANOUT_EXPLORER_URL",
        default_value = "https://explorer-testnet.unit0.dev"
    )]
    pub explorer_url: String,
    #[arg(long, env = "FANOUT_SYMBOL", default_value = "UNIT0")]
    pub symbol: String,
    /// File with one hex private key per line.
    #[arg(short, long, env = "FANOUT_KEYS", default_value = "pk.txt")]
    pub keys: PathBuf,
    /// Amount sent to each destination, in wei.
    #[arg(long, env = "FANOUT_VALUE", default_value_t = 427_596)]
    pub value: u128,
    #[arg(long, env = "FANOUT_GAS_LIMIT", default_value_t = 22_000)]
    pub gas_limit: u64,
    /// Legacy gas price, in wei.
    #[arg(long, env = "FANOUT_GAS_PRICE", default_value_t = 900_000)]
    pub gas_price: u128,
    /// Wallets per funding account. Prompts for each account when unset.
    #[arg(short, long, env = "FANOUT_COUNT")]
    pub count: Option<usize>,
    #[arg(long, default_value_t = 5)]
    pub max_nonce_retries: u32,
    #[arg(long, default_value_t = 10)]
    pub max_broadcast_retries: u32,
    #[arg(long, default_value_t = 5)]
    pub nonce_retry_delay_secs: u64,
    #[arg(long, default_value_t = 3)]
    pub broadcast_retry_delay_secs: u64,
}

/// Retry bounds and delays for one iteration of the dispatch loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Attempts per nonce acquisition, including the first.
    pub max_nonce_retries: u32,
    /// Failed broadcasts tolerated within one iteration.
    pub max_broadcast_retries: u32,
    pub nonce_retry_delay: Duration,
    pub broadcast_retry_delay: Duration,
}

impl RetryPolicy {
    /// Delay before the retry following the `k`-th underpriced rejection: 2^k seconds.
    pub fn underpriced_backoff(&self, k: u32) -> Duration {
        Duration::from_secs(1u64.checked_shl(k).unwrap_or(u64::MAX))
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_nonce_retries: 5,
            max_broadcast_retries: 10,
            nonce_retry_delay: Duration::from_secs(5),
            broadcast_retry_delay: Duration::from_secs(3),
        }
    }
}

/// Everything fixed for the duration of a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchConfig {
    pub terms: TransferTerms,
    pub retry: RetryPolicy,
    pub explorer_url: String,
    pub symbol: String,
}

impl DispatchConfig {
    pub fn tx_link(&self, hash: impl std::fmt::Display) -> String {
        format!("{}/tx/{hash}", self.explorer_url.trim_end_matches('/'))
    }
}

impl TryFrom<&Args> for DispatchConfig {
    type Error = ConfigError;

    fn try_from(args: &Args) -> Result<Self, Self::Error> {
        if args.gas_limit < MIN_TRANSFER_GAS {
            return Err(ConfigError::GasLimitTooLow(args.gas_limit));
        }
        if args.max_nonce_retries == 0 {
            return Err(ConfigError::NoNonceAttempts);
        }

        Ok(Self {
            terms: TransferTerms {
                value: U256::from(args.value),
                gas_limit: args.gas_limit,
                gas_price: args.gas_price,
                chain_id: args.chain_id,
            },
            retry: RetryPolicy {
                max_nonce_retries: args.max_nonce_retries,
                max_broadcast_retries: args.max_broadcast_retries,
                nonce_retry_delay: Duration::from_secs(args.nonce_retry_delay_secs),
                broadcast_retry_delay: Duration::from_secs(args.broadcast_retry_delay_secs),
            },
            explorer_url: args.explorer_url.clone(),
            symbol: args.symbol.clone(),
        })
    }
}
