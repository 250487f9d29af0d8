use chain_btc::error::BtcError;
use thiserror::Error;

/// Pipeline step a chain-level failure happened in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    ListUtxos,
    FeeRate,
    Select,
    Assemble,
    Sign,
    Serialize,
    Broadcast,
}

impl Stage {
    /// Adapter for `map_err` that tags a chain error with this stage.
    pub(crate) fn wrap(self) -> impl FnOnce(BtcError) -> WalletError {
        move |source| WalletError::Stage { stage: self, source }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Stage::ListUtxos => "UTXO listing",
            Stage::FeeRate => "fee rate lookup",
            Stage::Select => "coin selection",
            Stage::Assemble => "transaction assembly",
            Stage::Sign => "signing",
            Stage::Serialize => "serialization",
            Stage::Broadcast => "broadcast",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Error)]
pub enum WalletError {
    #[error("Invalid mnemonic: {0}")]
    InvalidMnemonic(String),

    #[error("Key derivation failed: {0}")]
    DerivationFailed(String),

    #[error("Invalid private key: {0}")]
    InvalidPrivateKey(String),

    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    #[error("{stage} failed: {source}")]
    Stage {
        stage: Stage,
        #[source]
        source: BtcError,
    },
}

impl WalletError {
    pub fn stage(&self) -> Option<Stage> {
        match self {
            WalletError::Stage { stage, .. } => Some(*stage),
            _ => None,
        }
    }

    /// The chain-level error behind a stage failure.
    pub fn chain_error(&self) -> Option<&BtcError> {
        match self {
            WalletError::Stage { source, .. } => Some(source),
            _ => None,
        }
    }

    pub fn is_insufficient_funds(&self) -> bool {
        matches!(self.chain_error(), Some(BtcError::InsufficientFunds { .. }))
    }
}
