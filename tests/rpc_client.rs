use alloy::{
    primitives::Address,
    providers::{ProviderBuilder, RootProvider},
    transports::http::{Client, Http},
};
use fanout::{ChainClient, ErrorKind, RpcClient};

fn unreachable_node() -> RpcClient<RootProvider<Http<Client>>, Http<Client>> {
    // nothing listens on port 1
    let provider = ProviderBuilder::new().on_http("http://127.0.0.1:1".parse().unwrap());
    RpcClient::new(provider)
}

#[tokio::test]
async fn refused_connection_on_nonce_lookup_is_transient() {
    let err = unreachable_node()
        .pending_nonce(Address::ZERO)
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::Transient, "{err}");
}

#[tokio::test]
async fn refused_connection_on_balance_lookup_is_transient() {
    let err = unreachable_node().balance(Address::ZERO).await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::Transient, "{err}");
}
