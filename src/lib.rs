pub mod chain;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod keys;
pub mod prompt;
pub mod runner;
pub mod transfer;

pub use chain::{ChainClient, RpcClient};
pub use config::{Args, DispatchConfig, RetryPolicy};
pub use dispatch::{BatchReport, DispatchLoop, DispatchOutcome, RetryReason, SentTransfer};
pub use error::{ChainError, DispatchError, ErrorKind};
pub use keys::Account;
pub use runner::Runner;
pub use transfer::{SignedTransfer, TransferIntent, TransferTerms};
