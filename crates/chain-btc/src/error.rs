use thiserror::Error;

/// Bitcoin chain operation errors.
#[derive(Debug, Error)]
pub enum BtcError {
    #[error("invalid private key: {0}")]
    InvalidPrivateKey(String),

    #[error("invalid public key: {0}")]
    InvalidPublicKey(String),

    #[error("invalid address: {0}")]
    InvalidAddress(String),

    /// Transport failure or timeout talking to the chain data provider.
    #[error("network error: {0}")]
    Network(String),

    /// The provider answered with a non-success HTTP status.
    #[error("unexpected HTTP status {status}: {body}")]
    HttpStatus { status: u16, body: String },

    #[error("decode error: {0}")]
    Decode(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("insufficient funds: have {available_sat} sat, need more than {required_sat} sat")]
    InsufficientFunds {
        available_sat: u64,
        required_sat: u64,
    },

    #[error("transaction build error: {0}")]
    TransactionBuildError(String),

    #[error("signing error: {0}")]
    SigningError(String),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("invalid network: {0}")]
    InvalidNetwork(String),
}

impl BtcError {
    /// Whether retrying the same request could succeed.
    ///
    /// Only transport failures, server-side errors and rate limiting qualify.
    /// Decode, not-found and client errors are final.
    pub fn is_transient(&self) -> bool {
        match self {
            BtcError::Network(_) => true,
            BtcError::HttpStatus { status, .. } => *status >= 500 || *status == 429,
            _ => false,
        }
    }
}
