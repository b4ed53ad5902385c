//! A scripted, in‑process stand‑in for a browser wallet.
//!
//! * Answers `eth_chainId`, `eth_accounts` and `eth_requestAccounts`.
//! * Records every method it was asked for, so tests can assert that a
//!   code path never reached the wallet.
//! * Pushes wallet‑originated events via [`MockWallet::emit`].

use std::sync::Mutex;

use async_trait::async_trait;
use dapp_core::event::Event;
use dapp_core::providers::{Eip1193Provider, ProviderEvent, RpcError};
use serde_json::{json, Value};

#[derive(Debug)]
pub struct MockWallet {
    metamask: bool,
    chain_id: Mutex<Result<Value, RpcError>>,
    /// What `eth_requestAccounts` hands out; `None` means the user rejects.
    grant: Mutex<Option<Vec<String>>>,
    /// What `eth_accounts` returns: accounts already authorized.
    authorized: Mutex<Vec<String>>,
    calls: Mutex<Vec<String>>,
    events: Event<ProviderEvent>,
}

impl MockWallet {
    /// A MetaMask on chain `0x1` that grants one account when asked.
    pub fn metamask() -> Self {
        Self::new(true)
    }

    /// Some other injected wallet, same defaults.
    pub fn other() -> Self {
        Self::new(false)
    }

    fn new(metamask: bool) -> Self {
        Self {
            metamask,
            chain_id: Mutex::new(Ok(json!("0x1"))),
            grant: Mutex::new(Some(vec![
                "0x8ba1f109551bD432803012645Ac136ddd64DBA72".to_string(),
            ])),
            authorized: Mutex::new(Vec::new()),
            calls: Mutex::new(Vec::new()),
            events: Event::new(),
        }
    }

    pub fn chain(self, raw: &str) -> Self {
        *self.chain_id.lock().unwrap() = Ok(json!(raw));
        self
    }

    pub fn granting(self, accounts: &[&str]) -> Self {
        *self.grant.lock().unwrap() = Some(accounts.iter().map(|a| a.to_string()).collect());
        self
    }

    /// Every `eth_requestAccounts` is declined by the user.
    pub fn rejecting(self) -> Self {
        *self.grant.lock().unwrap() = None;
        self
    }

    /// The granted accounts are already authorized for `eth_accounts`.
    pub fn already_authorized(self) -> Self {
        let granted = self.grant.lock().unwrap().clone().unwrap_or_default();
        *self.authorized.lock().unwrap() = granted;
        self
    }

    /// `eth_chainId` fails at the transport level.
    pub fn unreachable(self) -> Self {
        *self.chain_id.lock().unwrap() = Err(RpcError::Transport("connection refused".into()));
        self
    }

    pub fn set_grant(&self, accounts: &[&str]) {
        *self.grant.lock().unwrap() = Some(accounts.iter().map(|a| a.to_string()).collect());
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn emit(&self, event: ProviderEvent) {
        self.events.emit(&event);
    }

    pub fn event_listeners(&self) -> usize {
        self.events.listener_count()
    }
}

#[async_trait]
impl Eip1193Provider for MockWallet {
    async fn request(&self, method: &str, _params: Value) -> Result<Value, RpcError> {
        self.calls.lock().unwrap().push(method.to_string());
        match method {
            "eth_chainId" => self.chain_id.lock().unwrap().clone(),
            "eth_accounts" => Ok(json!(*self.authorized.lock().unwrap())),
            "eth_requestAccounts" => {
                let grant = self.grant.lock().unwrap().clone();
                match grant {
                    Some(accounts) => {
                        *self.authorized.lock().unwrap() = accounts.clone();
                        Ok(json!(accounts))
                    }
                    None => Err(RpcError::user_rejected()),
                }
            }
            other => Err(RpcError::rpc(-32601, format!("method {other} not found"))),
        }
    }

    fn is_metamask(&self) -> bool {
        self.metamask
    }

    fn events(&self) -> Option<Event<ProviderEvent>> {
        Some(self.events.clone())
    }
}
