use std::{error::Error as StdError, fmt, io};

use alloy::transports::{http::reqwest, RpcError, TransportErrorKind};
use thiserror::Error;

use crate::transfer::TransferError;

/// How the dispatch loop should react to a failed RPC call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Gateway or availability fault (502/503/504, dropped connection).
    Transient,
    /// The submitted nonce was already consumed.
    NonceConflict,
    /// Fee too low, or a conflicting transaction with the same nonce is pending.
    Underpriced,
    /// The funding account cannot cover value + gas.
    InsufficientFunds,
    /// The node already has this exact transaction.
    Duplicate,
    Fatal,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::Transient => "transient",
            ErrorKind::NonceConflict => "nonce conflict",
            ErrorKind::Underpriced => "underpriced",
            ErrorKind::InsufficientFunds => "insufficient funds",
            ErrorKind::Duplicate => "duplicate",
            ErrorKind::Fatal => "fatal",
        };
        f.write_str(name)
    }
}

const TRANSIENT: &[&str] = &[
    "bad gateway",
    "service unavailable",
    "gateway timeout",
    "connection reset",
    "connection refused",
    "timed out",
];
const NONCE_CONFLICT: &[&str] = &["nonce too low"];
const UNDERPRICED: &[&str] = &["underpriced"];
const INSUFFICIENT_FUNDS: &[&str] = &["upfront cost exceeds account balance", "insufficient funds"];
const DUPLICATE: &[&str] = &["known transaction", "already known"];

/// Maps the text of a node's error response onto an [`ErrorKind`].
///
/// Matching is case-insensitive; nodes disagree on capitalization
/// ("Nonce too low" vs "nonce too low").
pub fn classify_message(message: &str) -> ErrorKind {
    let m = message.to_ascii_lowercase();
    let matches = |needles: &[&str]| needles.iter().any(|needle| m.contains(needle));

    if matches(NONCE_CONFLICT) {
        ErrorKind::NonceConflict
    } else if matches(UNDERPRICED) {
        ErrorKind::Underpriced
    } else if matches(INSUFFICIENT_FUNDS) {
        ErrorKind::InsufficientFunds
    } else if matches(DUPLICATE) {
        ErrorKind::Duplicate
    } else if matches(TRANSIENT) {
        ErrorKind::Transient
    } else {
        ErrorKind::Fatal
    }
}

fn is_gateway_status(status: u16) -> bool {
    matches!(status, 429 | 502 | 503 | 504)
}

/// An RPC failure, already classified, with the node's wording kept verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind} rpc error: {message}")]
pub struct ChainError {
    pub kind: ErrorKind,
    pub message: String,
}

impl ChainError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn is_transient(&self) -> bool {
        self.kind == ErrorKind::Transient
    }
}

/// Whether any cause in the chain is a dropped or refused connection or a timeout.
///
/// reqwest only prints "error sending request for url (..)", so the cause
/// has to be inspected rather than the rendered text.
fn is_connection_fault(err: &(dyn StdError + 'static)) -> bool {
    let mut cause = Some(err);
    while let Some(err) = cause {
        if let Some(err) = err.downcast_ref::<reqwest::Error>() {
            if err.is_connect() || err.is_timeout() || err.is_request() {
                return true;
            }
        }
        if let Some(err) = err.downcast_ref::<io::Error>() {
            if matches!(
                err.kind(),
                io::ErrorKind::ConnectionRefused
                    | io::ErrorKind::ConnectionReset
                    | io::ErrorKind::ConnectionAborted
                    | io::ErrorKind::NotConnected
                    | io::ErrorKind::BrokenPipe
                    | io::ErrorKind::TimedOut
                    | io::ErrorKind::UnexpectedEof
            ) {
                return true;
            }
        }
        if classify_message(&err.to_string()) == ErrorKind::Transient {
            return true;
        }
        cause = err.source();
    }
    false
}

impl From<RpcError<TransportErrorKind>> for ChainError {
    fn from(err: RpcError<TransportErrorKind>) -> Self {
        let kind = match &err {
            RpcError::ErrorResp(payload) => classify_message(&payload.message),
            RpcError::Transport(TransportErrorKind::HttpError(http)) => {
                if is_gateway_status(http.status) {
                    ErrorKind::Transient
                } else {
                    ErrorKind::Fatal
                }
            }
            RpcError::Transport(TransportErrorKind::Custom(inner)) => {
                if is_connection_fault(inner.as_ref()) {
                    ErrorKind::Transient
                } else {
                    ErrorKind::Fatal
                }
            }
            RpcError::Transport(kind) if kind.is_retry_err() => ErrorKind::Transient,
            RpcError::Transport(TransportErrorKind::BackendGone) => ErrorKind::Transient,
            // Gateways in front of the node answer with HTML, which surfaces
            // as a deserialization failure carrying the raw body.
            _ => match classify_message(&err.to_string()) {
                ErrorKind::Transient => ErrorKind::Transient,
                _ => ErrorKind::Fatal,
            },
        };
        Self::new(kind, err.to_string())
    }
}

/// Errors that end the whole run.
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("failed to build transfer")]
    Transfer(#[from] TransferError),
    #[error("failed to get balance of {address}: {source}")]
    Balance {
        address: String,
        source: ChainError,
    },
    #[error("failed to get the nonce: {0}")]
    Nonce(ChainError),
    #[error("max retries exceeded for fetching nonce ({attempts} attempts): {last}")]
    NonceRetriesExhausted { attempts: u32, last: ChainError },
    #[error("failed to send the transaction: {0}")]
    Broadcast(ChainError),
    #[error("max retries exceeded for broadcast ({attempts} attempts): {last}")]
    BroadcastRetriesExhausted { attempts: u32, last: ChainError },
    #[error("invalid number of wallets: {0:?}")]
    InvalidCount(String),
    #[error("failed to read from stdin")]
    Prompt(#[from] std::io::Error),
}
