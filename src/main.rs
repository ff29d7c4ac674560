use alloy::{
    providers::ProviderBuilder,
    transports::http::{reqwest::Url, Client, Http},
};
use clap::Parser;
use eyre::WrapErr;
use fanout::{
    keys,
    prompt::{FixedCount, LinePrompt},
    Args, DispatchConfig, RpcClient, Runner,
};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> eyre::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let config = DispatchConfig::try_from(&args)?;

    let accounts = keys::load_funding_accounts(&args.keys)
        .wrap_err_with(|| format!("while loading keys from {}", args.keys.display()))?;
    info!(accounts = accounts.len(), chain_id = config.terms.chain_id, "loaded funding accounts");

    let rpc_url: Url = args.rpc_url.parse().wrap_err("while parsing rpc url")?;
    let provider = ProviderBuilder::new().on_http(rpc_url);
    let client: RpcClient<_, Http<Client>> = RpcClient::new(provider);

    let result = match args.count {
        Some(count) => {
            Runner::new(&client, &config, FixedCount(count))
                .run(&accounts)
                .await
        }
        None => {
            Runner::new(&client, &config, LinePrompt::stdio())
                .run(&accounts)
                .await
        }
    };

    result.wrap_err("aborting run")?;
    Ok(())
}
