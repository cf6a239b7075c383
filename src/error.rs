use thiserror::Error;

/// Error code a wallet returns when asked to switch to a chain it has never been told about.
pub const UNRECOGNIZED_CHAIN_CODE: i64 = 4902;

/// Unified error type for wallet, aggregator and action failures.
#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid credential: {0}")]
    InvalidCredential(String),

    #[error("wallet not connected")]
    WalletNotConnected,

    #[error("unsupported chain: {0}")]
    UnsupportedChain(String),

    #[error("no routes found")]
    NoRouteFound,

    #[error("transaction failed: {0}")]
    TransactionFailed(String),

    #[error("network error: {0}")]
    Network(String),

    /// The signing client refused a chain switch.
    #[error("chain switch rejected (code {code}): {message}")]
    SwitchRejected { code: i64, message: String },

    #[error("invalid parameters: {0}")]
    InvalidParams(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("Transfer failed: {reason}")]
    TransferFailed { reason: String },

    #[error("Swap failed: {reason}")]
    SwapFailed { reason: String },

    #[error("Bridge failed: {reason}")]
    BridgeFailed { reason: String },
}

impl Error {
    /// Whether this is the wallet's "unknown chain" answer to a switch request.
    pub fn is_unrecognized_chain(&self) -> bool {
        matches!(self, Error::SwitchRejected { code, .. } if *code == UNRECOGNIZED_CHAIN_CODE)
    }
}

impl From<alloy::transports::TransportError> for Error {
    fn from(err: alloy::transports::TransportError) -> Self {
        Error::Network(err.to_string())
    }
}

impl From<alloy::contract::Error> for Error {
    fn from(err: alloy::contract::Error) -> Self {
        Error::Network(err.to_string())
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        Error::Network(err.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Network(format!("malformed response: {err}"))
    }
}

pub type Result<T> = std::result::Result<T, Error>;
