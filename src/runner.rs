use alloy::primitives::{utils::format_ether, Address, U256};
use tracing::warn;

use crate::{
    chain::ChainClient,
    config::DispatchConfig,
    dispatch::{BatchReport, DispatchLoop},
    error::DispatchError,
    keys::Account,
    prompt::WalletCount,
};

pub const SEPARATOR: &str = "========================================";

/// Processes funding accounts one after another, in the order given.
pub struct Runner<'a, C, P> {
    client: &'a C,
    config: &'a DispatchConfig,
    prompt: P,
}

impl<'a, C, P> Runner<'a, C, P>
where
    C: ChainClient,
    P: WalletCount,
{
    pub fn new(client: &'a C, config: &'a DispatchConfig, prompt: P) -> Self {
        Self {
            client,
            config,
            prompt,
        }
    }

    pub async fn run(&mut self, accounts: &[Account]) -> Result<Vec<BatchReport>, DispatchError> {
        let mut reports = Vec::with_capacity(accounts.len());
        for account in accounts {
            reports.push(self.run_account(account).await?);
        }
        Ok(reports)
    }

    pub async fn run_account(&mut self, account: &Account) -> Result<BatchReport, DispatchError> {
        let address = account.address();
        let balance = self.balance(address).await?;
        println!(
            "Balance wallet {address} : {} {}",
            format_ether(balance),
            self.config.symbol
        );

        let count = self.prompt.wallet_count(account)?;
        let report = DispatchLoop::new(self.client, self.config)
            .run(account, count)
            .await?;
        println!("{SEPARATOR}");
        Ok(report)
    }

    async fn balance(&self, address: Address) -> Result<U256, DispatchError> {
        let policy = &self.config.retry;
        let mut attempts = 0;
        loop {
            attempts += 1;
            match self.client.balance(address).await {
                Ok(balance) => return Ok(balance),
                Err(err) if err.is_transient() && attempts < policy.max_nonce_retries => {
                    warn!(%address, attempts, error = %err.message, "balance lookup failed, retrying");
                    tokio::time::sleep(policy.nonce_retry_delay).await;
                }
                Err(source) => {
                    return Err(DispatchError::Balance {
                        address: address.to_string(),
                        source,
                    })
                }
            }
        }
    }
}
