//! On-disk settings, turned into a [`Config`].
//!
//! ```json
//! {
//!   "auto_connect": true,
//!   "networks": [1, 11155111],
//!   "host": { "rpc_url": "http://127.0.0.1:1248", "metamask": true },
//!   "connectors": {
//!     "metamask": { "kind": "metamask" },
//!     "frame":    { "kind": "injected", "rpc_url": "http://127.0.0.1:1248" }
//!   }
//! }
//! ```

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use std::{fs, io};

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use super::config::{Config, ConnectorRegistry};
use crate::connectors::{Connector, ConnectorError, InjectedConnector, MetamaskConnector};
use crate::providers::{DetectOptions, Eip1193Provider, HttpProvider, InjectionHost, StaticHost};

/// How to build one configured connector.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ConnectorSettings {
    /// Detect MetaMask in the injection host.
    Metamask {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        detect_timeout_ms: Option<u64>,
    },
    /// Talk to a fixed EIP-1193 endpoint, no detection.
    Injected { rpc_url: String },
}

/// Where the "injected" wallet lives when there is no browser window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostSettings {
    pub rpc_url: String,
    /// Whether the wallet behind `rpc_url` should be treated as MetaMask.
    #[serde(default)]
    pub metamask: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub auto_connect: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub networks: Option<Vec<u64>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host: Option<HostSettings>,
    #[serde(default)]
    pub connectors: BTreeMap<String, ConnectorSettings>,
}

impl Settings {
    /// `~/.config/dapp_connect/settings.json` on Linux,
    /// `%APPDATA%\dapp_connect\settings.json` on Windows, etc.
    pub fn default_path() -> io::Result<PathBuf> {
        let proj = ProjectDirs::from("", "", "dapp_connect")
            .ok_or_else(|| io::Error::new(io::ErrorKind::Other, "Unable to locate config dir"))?;
        Ok(proj.config_dir().join("settings.json"))
    }

    pub fn load(path: &Path) -> Result<Self, ConnectorError> {
        let file = fs::File::open(path)?;
        Ok(serde_json::from_reader(io::BufReader::new(file))?)
    }

    /// Like [`load`](Self::load), but a missing file yields defaults.
    pub fn load_or_default(path: &Path) -> Result<Self, ConnectorError> {
        match Self::load(path) {
            Err(ConnectorError::Io(e)) if e.kind() == io::ErrorKind::NotFound => {
                Ok(Self::default())
            }
            other => other,
        }
    }

    /// The injection host described by `host`, or an empty one.
    pub fn build_host(&self) -> StaticHost {
        match &self.host {
            Some(host) => {
                let provider = HttpProvider::new(host.rpc_url.clone()).flag_metamask(host.metamask);
                StaticHost::with_ethereum(Arc::new(provider))
            }
            None => StaticHost::empty(),
        }
    }

    pub fn into_config(self, host: Arc<dyn InjectionHost>) -> Result<Config, ConnectorError> {
        let mut registry = ConnectorRegistry::new();
        for (tag, connector) in self.connectors {
            match connector {
                ConnectorSettings::Metamask { detect_timeout_ms } => {
                    let mut detect = DetectOptions::default();
                    if let Some(ms) = detect_timeout_ms {
                        detect.timeout = Duration::from_millis(ms);
                    }
                    let host = Arc::clone(&host);
                    registry.register(tag, move || -> Box<dyn Connector> {
                        Box::new(MetamaskConnector::with_detect_options(Arc::clone(&host), detect))
                    })?;
                }
                ConnectorSettings::Injected { rpc_url } => {
                    if rpc_url.trim().is_empty() {
                        return Err(ConnectorError::Config(format!(
                            "connector {tag} has an empty rpc_url"
                        )));
                    }
                    registry.register(tag, move || -> Box<dyn Connector> {
                        let raw: Arc<dyn Eip1193Provider> =
                            Arc::new(HttpProvider::new(rpc_url.clone()));
                        Box::new(InjectedConnector::new(raw))
                    })?;
                }
            }
        }
        Ok(Config {
            connectors: registry,
            auto_connect: self.auto_connect,
            networks: self.networks,
        })
    }
}
