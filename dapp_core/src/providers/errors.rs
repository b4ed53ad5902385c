use serde_json::Value;

/// EIP-1193 "User Rejected Request".
pub const USER_REJECTED: i64 = 4001;
/// EIP-1193 "Unauthorized".
pub const UNAUTHORIZED: i64 = 4100;

/// Failure of a single wallet RPC call.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RpcError {
    /// The wallet answered with a JSON-RPC error object.
    #[error("RPC error {code}: {message}")]
    Rpc {
        code: i64,
        message: String,
        data: Option<Value>,
    },
    /// The request never got a well-formed answer.
    #[error("Transport error: {0}")]
    Transport(String),
    /// The answer did not have the expected shape.
    #[error("Unexpected response to {method}: {reason}")]
    Decode { method: String, reason: String },
}

impl RpcError {
    pub fn rpc(code: i64, message: impl Into<String>) -> Self {
        RpcError::Rpc {
            code,
            message: message.into(),
            data: None,
        }
    }

    pub fn user_rejected() -> Self {
        Self::rpc(USER_REJECTED, "User rejected the request.")
    }

    pub fn code(&self) -> Option<i64> {
        match self {
            RpcError::Rpc { code, .. } => Some(*code),
            _ => None,
        }
    }

    /// The user declined the prompt or the origin is not authorized.
    pub fn is_user_rejection(&self) -> bool {
        matches!(self.code(), Some(USER_REJECTED | UNAUTHORIZED))
    }
}

impl From<reqwest::Error> for RpcError {
    fn from(err: reqwest::Error) -> Self {
        RpcError::Transport(err.to_string())
    }
}
