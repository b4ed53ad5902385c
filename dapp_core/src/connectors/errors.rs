use crate::providers::RpcError;

/// A central error enum for connector and controller errors.
#[derive(Debug, thiserror::Error)]
pub enum ConnectorError {
    /// Detection found no wallet. Interactive activation surfaces this so
    /// the caller can point the user at `install_url`.
    #[error("Could not activate connector: {connector} is not installed")]
    NotInstalled {
        connector: String,
        install_url: Option<String>,
    },

    /// The user declined the permission prompt.
    #[error("Could not activate connector {connector}: {source}")]
    Rejected {
        connector: String,
        #[source]
        source: RpcError,
    },

    #[error("Could not activate connector {connector}: {source}")]
    Rpc {
        connector: String,
        #[source]
        source: RpcError,
    },

    #[error("Could not activate connector {connector}: the wallet returned no accounts")]
    NoAccounts { connector: String },

    /// The connector released its provider and cannot connect again.
    #[error("Connector {connector} is inactive")]
    Inactive { connector: String },

    #[error("Invalid chain id: {0}")]
    InvalidChainId(String),

    #[error("ChainId {0} is not supported")]
    UnsupportedChain(u64),

    /// The wallet dropped the connection on its own.
    #[error("Wallet {connector} disconnected ({code}): {message}")]
    Disconnected {
        connector: String,
        code: i64,
        message: String,
    },

    #[error("Connector {0} is not configured")]
    NotConfigured(String),

    #[error("Connector {0} is configured twice")]
    DuplicateTag(String),

    #[error("Config error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{0}")]
    Other(String),
}

impl ConnectorError {
    /// Wrap a failed wallet call with the name of the connector that made it.
    pub fn rpc(connector: impl Into<String>, source: RpcError) -> Self {
        let connector = connector.into();
        if source.is_user_rejection() {
            ConnectorError::Rejected { connector, source }
        } else {
            ConnectorError::Rpc { connector, source }
        }
    }

    /// Where the user can install the missing wallet, if that is the problem.
    pub fn install_url(&self) -> Option<&str> {
        match self {
            ConnectorError::NotInstalled { install_url, .. } => install_url.as_deref(),
            _ => None,
        }
    }
}
