use std::io::{self, BufRead, Write};

use crate::{error::DispatchError, keys::Account};

/// Decides how many destination wallets to fund from an account.
pub trait WalletCount {
    fn wallet_count(&mut self, account: &Account) -> Result<usize, DispatchError>;
}

impl<T: WalletCount + ?Sized> WalletCount for &mut T {
    fn wallet_count(&mut self, account: &Account) -> Result<usize, DispatchError> {
        (**self).wallet_count(account)
    }
}

/// Same count for every account.
#[derive(Debug, Clone, Copy)]
pub struct FixedCount(pub usize);

impl WalletCount for FixedCount {
    fn wallet_count(&mut self, _account: &Account) -> Result<usize, DispatchError> {
        Ok(self.0)
    }
}

/// Asks on `output` and reads one line from `input` per account.
pub struct LinePrompt<R, W> {
    input: R,
    output: W,
}

impl<R: BufRead, W: Write> LinePrompt<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }
}

impl LinePrompt<io::StdinLock<'static>, io::Stdout> {
    pub fn stdio() -> Self {
        Self::new(io::stdin().lock(), io::stdout())
    }
}

impl<R: BufRead, W: Write> WalletCount for LinePrompt<R, W> {
    fn wallet_count(&mut self, _account: &Account) -> Result<usize, DispatchError> {
        write!(self.output, "How many wallets do you want to generate: ")?;
        self.output.flush()?;

        let mut line = String::new();
        self.input.read_line(&mut line)?;
        parse_count(&line)
    }
}

pub fn parse_count(input: &str) -> Result<usize, DispatchError> {
    let input = input.trim();
    input
        .parse()
        .map_err(|_| DispatchError::InvalidCount(input.to_string()))
}
