use std::sync::Arc;

use dapp_core::connectors::metamask::GET_METAMASK_LINK;
use dapp_core::connectors::{ConnectMode, Connector, ConnectorError, MetamaskConnector};
use dapp_core::providers::{Eip1193Provider, ProviderEvent, StaticHost};

mod common;
use common::mock_wallet::MockWallet;
use common::{init_test_logging, quick_detect, Recorder};

fn installed(wallet: &Arc<MockWallet>) -> Arc<StaticHost> {
    let raw: Arc<dyn Eip1193Provider> = wallet.clone();
    Arc::new(StaticHost::with_ethereum(raw))
}

#[tokio::test]
async fn activate_emits_one_update_with_normalised_chain_id() {
    init_test_logging();
    let wallet = Arc::new(MockWallet::metamask().chain("0x1").granting(&["0xabc"]));
    let mut connector = MetamaskConnector::new(installed(&wallet));

    let updates = Recorder::new();
    let _sub = connector.update().subscribe(updates.listener());

    connector.activate().await.expect("activation should succeed");

    let seen = updates.items();
    assert_eq!(seen.len(), 1, "exactly one combined update");
    assert_eq!(seen[0].chain_id, Some(1), "\"0x1\" must surface as 1");
    assert_eq!(seen[0].accounts.as_deref(), Some(&["0xabc".to_string()][..]));
    assert!(seen[0].error.is_none());
    assert_eq!(wallet.calls(), vec!["eth_chainId", "eth_requestAccounts"]);
}

#[tokio::test]
async fn eager_connect_without_wallet_is_a_silent_no_op() {
    init_test_logging();
    let host = Arc::new(StaticHost::empty());
    let mut connector = MetamaskConnector::with_detect_options(host.clone(), quick_detect());

    let updates = Recorder::new();
    let _sub = connector.update().subscribe(updates.listener());

    let outcome = connector.connect(ConnectMode::Eager).await;
    assert!(matches!(outcome, Err(ConnectorError::NotInstalled { .. })));
    connector.connect_eagerly().await;

    assert_eq!(updates.len(), 0);
    assert!(host.opened_urls().is_empty(), "eager path must not send the user anywhere");
}

#[tokio::test]
async fn eager_connect_without_prior_authorization_emits_nothing() {
    init_test_logging();
    let wallet = Arc::new(MockWallet::metamask());
    let mut connector = MetamaskConnector::new(installed(&wallet));

    let updates = Recorder::new();
    let _sub = connector.update().subscribe(updates.listener());

    connector.connect_eagerly().await;

    assert_eq!(updates.len(), 0);
    assert_eq!(
        wallet.calls(),
        vec!["eth_chainId", "eth_accounts"],
        "eager path must never call the prompting method"
    );
}

#[tokio::test]
async fn eager_connect_restores_authorized_session() {
    init_test_logging();
    let wallet = Arc::new(
        MockWallet::metamask()
            .chain("0x89")
            .granting(&["0xabc"])
            .already_authorized(),
    );
    let mut connector = MetamaskConnector::new(installed(&wallet));

    let updates = Recorder::new();
    let _sub = connector.update().subscribe(updates.listener());

    connector.connect_eagerly().await;

    let seen = updates.items();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].chain_id, Some(137));
    assert_eq!(seen[0].accounts.as_ref().map(Vec::len), Some(1));
}

#[tokio::test]
async fn eager_connect_swallows_transport_errors() {
    init_test_logging();
    let wallet = Arc::new(MockWallet::metamask().unreachable());
    let mut connector = MetamaskConnector::new(installed(&wallet));

    let updates = Recorder::new();
    let _sub = connector.update().subscribe(updates.listener());

    let outcome = connector.connect(ConnectMode::Eager).await;
    assert!(matches!(outcome, Err(ConnectorError::Rpc { .. })));
    connector.connect_eagerly().await;
    assert_eq!(updates.len(), 0);
}

#[tokio::test]
async fn activate_without_wallet_points_to_install_page() {
    init_test_logging();
    let host = Arc::new(StaticHost::empty());
    let mut connector = MetamaskConnector::with_detect_options(host.clone(), quick_detect());

    let updates = Recorder::new();
    let _sub = connector.update().subscribe(updates.listener());

    let err = connector.activate().await.expect_err("no wallet, no activation");

    assert!(matches!(err, ConnectorError::NotInstalled { .. }));
    assert_eq!(err.install_url(), Some(GET_METAMASK_LINK));
    assert_eq!(host.opened_urls(), vec![GET_METAMASK_LINK.to_string()]);
    assert_eq!(updates.len(), 0);
}

#[tokio::test]
async fn user_rejection_is_wrapped_and_emits_nothing() {
    init_test_logging();
    let wallet = Arc::new(MockWallet::metamask().rejecting());
    let mut connector = MetamaskConnector::new(installed(&wallet));

    let updates = Recorder::new();
    let _sub = connector.update().subscribe(updates.listener());

    let err = connector.activate().await.expect_err("user said no");

    assert!(matches!(
        err,
        ConnectorError::Rejected { ref connector, .. } if connector == "Metamask"
    ));
    assert!(
        err.to_string().starts_with("Could not activate connector"),
        "unexpected message: {err}"
    );
    assert_eq!(updates.len(), 0);
}

#[tokio::test]
async fn transport_failure_is_surfaced_on_activate() {
    init_test_logging();
    let wallet = Arc::new(MockWallet::metamask().unreachable());
    let mut connector = MetamaskConnector::new(installed(&wallet));

    let err = connector.activate().await.expect_err("wallet unreachable");
    assert!(matches!(err, ConnectorError::Rpc { .. }));
    assert_eq!(wallet.calls(), vec!["eth_chainId"], "accounts are never requested");
}

#[tokio::test]
async fn aggregator_host_prefers_the_metamask_candidate() {
    init_test_logging();
    let other = Arc::new(MockWallet::other().chain("0x38"));
    let metamask = Arc::new(MockWallet::metamask().chain("0x1"));
    let candidates: Vec<Arc<dyn Eip1193Provider>> = vec![other.clone(), metamask.clone()];
    let host = Arc::new(StaticHost::with_providers(candidates));
    let mut connector = MetamaskConnector::new(host);

    let updates = Recorder::new();
    let _sub = connector.update().subscribe(updates.listener());

    connector.activate().await.expect("metamask candidate should connect");

    assert_eq!(updates.items()[0].chain_id, Some(1));
    assert!(other.calls().is_empty(), "the non-MetaMask wallet is left alone");
}

#[tokio::test]
async fn wallet_events_are_forwarded_until_deactivation() {
    init_test_logging();
    let wallet = Arc::new(MockWallet::metamask());
    let mut connector = MetamaskConnector::new(installed(&wallet));

    let updates = Recorder::new();
    let _sub = connector.update().subscribe(updates.listener());

    connector.activate().await.expect("activation should succeed");
    assert_eq!(wallet.event_listeners(), 1);

    wallet.emit(ProviderEvent::ChainChanged("0x89".into()));
    wallet.emit(ProviderEvent::AccountsChanged(vec!["0xdef".into()]));
    wallet.emit(ProviderEvent::Disconnect {
        code: 4900,
        message: "Disconnected".into(),
    });

    let seen = updates.items();
    assert_eq!(seen.len(), 4);
    assert_eq!(seen[1].chain_id, Some(137));
    assert!(seen[1].accounts.is_none(), "a chain switch leaves accounts unchanged");
    assert_eq!(seen[2].accounts.as_deref(), Some(&["0xdef".to_string()][..]));
    assert!(seen[2].chain_id.is_none());
    let error = seen[3].error.as_ref().expect("disconnect becomes an error update");
    assert!(matches!(**error, ConnectorError::Disconnected { code: 4900, .. }));
    assert!(seen[3].chain_id.is_none() && seen[3].accounts.is_none());

    connector.deactivate().await;
    assert_eq!(wallet.event_listeners(), 0);
    assert!(connector.provider().is_none());

    wallet.emit(ProviderEvent::ChainChanged("0x1".into()));
    assert_eq!(updates.len(), 4, "no updates after deactivation");

    // idempotent
    connector.deactivate().await;
}
