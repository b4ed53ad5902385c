//! Locating an injected wallet in the client environment.

use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use log::{debug, info};
use tokio::time::{sleep, Instant};

use super::Eip1193Provider;

/// The environment a wallet injects itself into.
///
/// In a browser this is `window`: `ethereum()` is `window.ethereum` and
/// `providers()` is the candidate list some aggregators expose when several
/// extensions are installed side by side.
pub trait InjectionHost: Send + Sync + fmt::Debug {
    fn ethereum(&self) -> Option<Arc<dyn Eip1193Provider>>;

    fn providers(&self) -> Vec<Arc<dyn Eip1193Provider>> {
        Vec::new()
    }

    /// Send the user somewhere, e.g. a wallet download page.
    fn open_url(&self, url: &str) {
        info!("Open {url} to continue.");
    }
}

#[derive(Debug, Clone, Copy)]
pub struct DetectOptions {
    /// Upper bound on how long to wait for a late injection.
    pub timeout: Duration,
    pub poll_interval: Duration,
    pub must_be_metamask: bool,
}

impl Default for DetectOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_millis(3000),
            poll_interval: Duration::from_millis(50),
            must_be_metamask: false,
        }
    }
}

/// Wait up to `options.timeout` for the host to expose a provider.
///
/// Returns `None` when nothing shows up in time, or when a provider shows up
/// but `must_be_metamask` is set and it is not MetaMask.
pub async fn detect_ethereum_provider(
    host: &dyn InjectionHost,
    options: DetectOptions,
) -> Option<Arc<dyn Eip1193Provider>> {
    let deadline = Instant::now() + options.timeout;
    loop {
        if let Some(provider) = host.ethereum() {
            if options.must_be_metamask && !provider.is_metamask() {
                debug!("Non-MetaMask injected provider detected.");
                return None;
            }
            return Some(provider);
        }
        let now = Instant::now();
        if now >= deadline {
            debug!("Unable to detect an injected provider.");
            return None;
        }
        sleep(options.poll_interval.min(deadline - now)).await;
    }
}

/// In-memory host. The CLI builds one from its settings; tests use it to
/// simulate installed, missing and late-injected wallets.
#[derive(Debug, Default)]
pub struct StaticHost {
    ethereum: Mutex<Option<Arc<dyn Eip1193Provider>>>,
    providers: Vec<Arc<dyn Eip1193Provider>>,
    opened: Mutex<Vec<String>>,
}

impl StaticHost {
    /// A host with no wallet installed.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn with_ethereum(provider: Arc<dyn Eip1193Provider>) -> Self {
        Self {
            ethereum: Mutex::new(Some(provider)),
            ..Self::default()
        }
    }

    /// An aggregator host: `ethereum()` is the first candidate.
    pub fn with_providers(providers: Vec<Arc<dyn Eip1193Provider>>) -> Self {
        Self {
            ethereum: Mutex::new(providers.first().cloned()),
            providers,
            opened: Mutex::new(Vec::new()),
        }
    }

    /// Make a provider appear after construction.
    pub fn inject(&self, provider: Arc<dyn Eip1193Provider>) {
        *self.ethereum.lock().unwrap_or_else(PoisonError::into_inner) = Some(provider);
    }

    /// Every URL passed to [`InjectionHost::open_url`], oldest first.
    pub fn opened_urls(&self) -> Vec<String> {
        self.opened
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl InjectionHost for StaticHost {
    fn ethereum(&self) -> Option<Arc<dyn Eip1193Provider>> {
        self.ethereum
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn providers(&self) -> Vec<Arc<dyn Eip1193Provider>> {
        self.providers.clone()
    }

    fn open_url(&self, url: &str) {
        info!("Open {url} to continue.");
        self.opened
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(url.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::RpcError;
    use async_trait::async_trait;
    use serde_json::Value;

    #[derive(Debug)]
    struct Bare {
        metamask: bool,
    }

    #[async_trait]
    impl Eip1193Provider for Bare {
        async fn request(&self, _method: &str, _params: Value) -> Result<Value, RpcError> {
            Ok(Value::Null)
        }

        fn is_metamask(&self) -> bool {
            self.metamask
        }
    }

    fn quick() -> DetectOptions {
        DetectOptions {
            timeout: Duration::from_millis(100),
            poll_interval: Duration::from_millis(5),
            must_be_metamask: false,
        }
    }

    #[tokio::test]
    async fn gives_up_after_timeout() {
        let host = StaticHost::empty();
        assert!(detect_ethereum_provider(&host, quick()).await.is_none());
    }

    #[tokio::test]
    async fn picks_up_late_injection() {
        let host = Arc::new(StaticHost::empty());
        let later = Arc::clone(&host);
        tokio::spawn(async move {
            sleep(Duration::from_millis(20)).await;
            later.inject(Arc::new(Bare { metamask: true }));
        });

        let found = detect_ethereum_provider(host.as_ref(), quick()).await;
        assert!(found.is_some_and(|p| p.is_metamask()));
    }

    #[tokio::test]
    async fn must_be_metamask_rejects_other_wallets() {
        let host = StaticHost::with_ethereum(Arc::new(Bare { metamask: false }));
        let options = DetectOptions {
            must_be_metamask: true,
            ..quick()
        };
        assert!(detect_ethereum_provider(&host, options).await.is_none());
    }
}
