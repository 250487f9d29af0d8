//! Bitcoin wallet on top of `chain-btc`: mnemonic handling, BIP-32 key
//! derivation and the send pipeline.

pub mod error;
pub mod hd_derivation;
pub mod mnemonic;
pub mod types;
pub mod wallet;

pub use error::{Stage, WalletError};
pub use types::{AddressType, DerivationPolicy};
pub use wallet::{BuiltTransaction, SendReceipt, Wallet};
