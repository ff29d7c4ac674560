use std::{fs, path::Path, str::FromStr};

use alloy::{primitives::Address, signers::local::PrivateKeySigner};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum KeyError {
    #[error("failed to read {path}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to load private key on line {line}")]
    Malformed {
        line: usize,
        #[source]
        source: alloy::signers::local::LocalSignerError,
    },
}

/// A signing key and the address derived from it.
#[derive(Debug, Clone)]
pub struct Account {
    pub signer: PrivateKeySigner,
}

impl Account {
    pub fn address(&self) -> Address {
        self.signer.address()
    }
}

impl From<PrivateKeySigner> for Account {
    fn from(signer: PrivateKeySigner) -> Self {
        Self { signer }
    }
}

/// Parses one hex private key per line, skipping blank lines.
///
/// Any malformed key fails the whole batch.
pub fn parse_funding_accounts(contents: &str) -> Result<Vec<Account>, KeyError> {
    contents
        .lines()
        .enumerate()
        .map(|(idx, line)| (idx + 1, line.replace('\r', "")))
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(line, key)| {
            PrivateKeySigner::from_str(key.trim())
                .map(Account::from)
                .map_err(|source| KeyError::Malformed { line, source })
        })
        .collect()
}

pub fn load_funding_accounts(path: impl AsRef<Path>) -> Result<Vec<Account>, KeyError> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path).map_err(|source| KeyError::Read {
        path: path.display().to_string(),
        source,
    })?;
    parse_funding_accounts(&contents)
}

/// Mints a throwaway destination from the thread-local CSPRNG.
pub fn generate_destination() -> Account {
    PrivateKeySigner::random().into()
}
