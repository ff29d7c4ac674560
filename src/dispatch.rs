//! The per-account transfer loop.
//!
//! Each iteration walks `AcquireNonce -> BuildAndSign -> Broadcast -> Done`.
//! Broadcast failures are routed by [`ErrorKind`]: some go back to nonce
//! acquisition, some rebroadcast the same signed transaction, one skips the
//! iteration, and the rest end the run.

use alloy::primitives::{Address, TxHash};
use tracing::{info, warn};

use crate::{
    chain::ChainClient,
    config::DispatchConfig,
    error::{ChainError, DispatchError, ErrorKind},
    keys::{self, Account},
    transfer::{self, SignedTransfer},
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentTransfer {
    /// Zero-based position in the batch.
    pub index: usize,
    pub destination: Address,
    pub nonce: u64,
    pub tx_hash: TxHash,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryReason {
    /// Pending nonce lookup hit a gateway fault.
    NonceUnavailable,
    Underpriced,
    NonceTooLow,
    /// Broadcast hit a gateway fault.
    Unavailable,
    AlreadyKnown,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    Sent(SentTransfer),
    Retried { index: usize, reason: RetryReason },
    Skipped { index: usize, reason: ChainError },
}

/// Everything that happened while dispatching one funding account's batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchReport {
    pub from: Address,
    pub requested: usize,
    pub outcomes: Vec<DispatchOutcome>,
}

impl BatchReport {
    fn new(from: Address, requested: usize) -> Self {
        Self {
            from,
            requested,
            outcomes: Vec::new(),
        }
    }

    pub fn sent(&self) -> impl Iterator<Item = &SentTransfer> {
        self.outcomes.iter().filter_map(|outcome| match outcome {
            DispatchOutcome::Sent(sent) => Some(sent),
            _ => None,
        })
    }

    pub fn skipped(&self) -> impl Iterator<Item = usize> + '_ {
        self.outcomes.iter().filter_map(|outcome| match outcome {
            DispatchOutcome::Skipped { index, .. } => Some(*index),
            _ => None,
        })
    }

    pub fn retries(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|outcome| matches!(outcome, DispatchOutcome::Retried { .. }))
            .count()
    }
}

/// Retry bookkeeping for a single iteration, reset for every destination.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RetryState {
    /// Attempts in the current nonce acquisition.
    pub nonce_attempts: u32,
    /// Retryable broadcast failures so far.
    pub broadcast_failures: u32,
    /// Underpriced rejections so far; the exponent for the next backoff.
    pub underpriced: u32,
}

enum Step {
    AcquireNonce,
    Broadcast(SignedTransfer),
}

pub struct DispatchLoop<'a, C> {
    client: &'a C,
    config: &'a DispatchConfig,
}

impl<'a, C> DispatchLoop<'a, C>
where
    C: ChainClient,
{
    pub fn new(client: &'a C, config: &'a DispatchConfig) -> Self {
        Self { client, config }
    }

    /// Sends `count` transfers from `from`, each to a freshly generated wallet.
    pub async fn run(&self, from: &Account, count: usize) -> Result<BatchReport, DispatchError> {
        let mut report = BatchReport::new(from.address(), count);
        for index in 0..count {
            let destination = keys::generate_destination().address();
            self.dispatch_one(index, from, destination, &mut report)
                .await?;
        }

        info!(
            from = %report.from,
            sent = report.sent().count(),
            skipped = report.skipped().count(),
            retries = report.retries(),
            "batch complete"
        );
        Ok(report)
    }

    /// Drives one iteration to a terminal outcome: sent, skipped, or a fatal error.
    pub async fn dispatch_one(
        &self,
        index: usize,
        from: &Account,
        destination: Address,
        report: &mut BatchReport,
    ) -> Result<(), DispatchError> {
        let policy = &self.config.retry;
        let mut retry = RetryState::default();
        let mut step = Step::AcquireNonce;

        loop {
            step = match step {
                Step::AcquireNonce => {
                    let nonce = self
                        .acquire_nonce(index, from.address(), &mut retry, report)
                        .await?;
                    let tx = transfer::build(nonce, destination, self.config.terms, &from.signer)?;
                    Step::Broadcast(tx)
                }
                Step::Broadcast(tx) => {
                    let err = match self.client.broadcast(&tx).await {
                        Ok(tx_hash) => {
                            let sent = SentTransfer {
                                index,
                                destination,
                                nonce: tx.nonce(),
                                tx_hash,
                            };
                            println!(
                                "Transaction {} sent to {} , tx link : {}",
                                index + 1,
                                destination,
                                self.config.tx_link(tx_hash)
                            );
                            report.outcomes.push(DispatchOutcome::Sent(sent));
                            return Ok(());
                        }
                        Err(err) => err,
                    };

                    match err.kind {
                        ErrorKind::InsufficientFunds => {
                            warn!(from = %from.address(), index, error = %err, "low balance, skipping transfer");
                            report
                                .outcomes
                                .push(DispatchOutcome::Skipped { index, reason: err });
                            return Ok(());
                        }
                        ErrorKind::Fatal => return Err(DispatchError::Broadcast(err)),
                        _ => {}
                    }

                    retry.broadcast_failures += 1;
                    if retry.broadcast_failures > policy.max_broadcast_retries {
                        return Err(DispatchError::BroadcastRetriesExhausted {
                            attempts: retry.broadcast_failures,
                            last: err,
                        });
                    }

                    let nonce = tx.nonce();
                    let (reason, next) = match err.kind {
                        ErrorKind::Underpriced => {
                            let delay = policy.underpriced_backoff(retry.underpriced);
                            retry.underpriced += 1;
                            warn!(nonce, ?delay, error = %err.message, "underpriced, backing off");
                            tokio::time::sleep(delay).await;
                            (RetryReason::Underpriced, Step::AcquireNonce)
                        }
                        ErrorKind::NonceConflict => {
                            warn!(nonce, "nonce too low, retrying with new nonce");
                            (RetryReason::NonceTooLow, Step::AcquireNonce)
                        }
                        ErrorKind::Duplicate => {
                            let delay = policy.broadcast_retry_delay;
                            warn!(nonce, ?delay, "transaction already known, rebroadcasting");
                            tokio::time::sleep(delay).await;
                            (RetryReason::AlreadyKnown, Step::Broadcast(tx))
                        }
                        _ => {
                            let delay = policy.broadcast_retry_delay;
                            warn!(nonce, ?delay, error = %err.message, "node unavailable, rebroadcasting");
                            tokio::time::sleep(delay).await;
                            (RetryReason::Unavailable, Step::Broadcast(tx))
                        }
                    };
                    report
                        .outcomes
                        .push(DispatchOutcome::Retried { index, reason });
                    next
                }
            };
        }
    }

    async fn acquire_nonce(
        &self,
        index: usize,
        from: Address,
        retry: &mut RetryState,
        report: &mut BatchReport,
    ) -> Result<u64, DispatchError> {
        let policy = &self.config.retry;
        retry.nonce_attempts = 0;

        loop {
            retry.nonce_attempts += 1;
            match self.client.pending_nonce(from).await {
                Ok(nonce) => return Ok(nonce),
                Err(err) if err.is_transient() => {
                    if retry.nonce_attempts >= policy.max_nonce_retries {
                        return Err(DispatchError::NonceRetriesExhausted {
                            attempts: retry.nonce_attempts,
                            last: err,
                        });
                    }
                    warn!(
                        %from,
                        attempt = retry.nonce_attempts,
                        delay = ?policy.nonce_retry_delay,
                        error = %err.message,
                        "nonce lookup failed, retrying"
                    );
                    report.outcomes.push(DispatchOutcome::Retried {
                        index,
                        reason: RetryReason::NonceUnavailable,
                    });
                    tokio::time::sleep(policy.nonce_retry_delay).await;
                }
                Err(err) => return Err(DispatchError::Nonce(err)),
            }
        }
    }
}
