//! Bitcoin chain support for the send pipeline.
//!
//! Provides Esplora chain data access, largest-first UTXO selection, static
//! fee estimation, transaction assembly, P2WPKH/P2PKH signing behind a
//! pluggable signature provider, and consensus serialization.

pub mod address;
pub mod client;
pub mod error;
pub mod fee;
pub mod network;
pub mod serialize;
pub mod signer;
pub mod transaction;
pub mod utxo;

pub use error::BtcError;
