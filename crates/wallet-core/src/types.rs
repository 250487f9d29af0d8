use chain_btc::network::BtcNetwork;
use serde::{Deserialize, Serialize};

use crate::error::WalletError;

/// BIP-44 purpose for legacy P2PKH accounts.
pub const PURPOSE_BIP44: u32 = 44;
/// BIP-84 purpose for native SegWit P2WPKH accounts.
pub const PURPOSE_BIP84: u32 = 84;

/// Address/script type a derivation policy produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AddressType {
    /// Native SegWit, bech32 `bc1q...` / `tb1q...`
    P2wpkh,
    /// Legacy base58 `1...` / `m...` / `n...`
    P2pkh,
}

/// Which key of the HD tree a wallet uses.
///
/// Path layout: `m/purpose'/coin_type'/account'/change/address_index`.
/// The default is `m/84'/0'/0'/0/0` regardless of network.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DerivationPolicy {
    pub purpose: u32,
    pub coin_type: u32,
    pub account: u32,
    pub change: u32,
    pub index: u32,
}

impl Default for DerivationPolicy {
    fn default() -> Self {
        Self {
            purpose: PURPOSE_BIP84,
            coin_type: 0,
            account: 0,
            change: 0,
            index: 0,
        }
    }
}

impl DerivationPolicy {
    /// BIP-84 first receive key with the network's SLIP-44 coin type.
    pub fn bip84(network: BtcNetwork) -> Self {
        Self {
            coin_type: network.coin_type(),
            ..Self::default()
        }
    }

    /// BIP-44 first receive key with the network's SLIP-44 coin type.
    pub fn bip44(network: BtcNetwork) -> Self {
        Self {
            purpose: PURPOSE_BIP44,
            coin_type: network.coin_type(),
            ..Self::default()
        }
    }

    pub fn path(&self) -> String {
        format!(
            "m/{}'/{}'/{}'/{}/{}",
            self.purpose, self.coin_type, self.account, self.change, self.index
        )
    }

    pub fn address_type(&self) -> Result<AddressType, WalletError> {
        match self.purpose {
            PURPOSE_BIP84 => Ok(AddressType::P2wpkh),
            PURPOSE_BIP44 => Ok(AddressType::P2pkh),
            other => Err(WalletError::DerivationFailed(format!(
                "unsupported purpose {other}, expected 44 or 84"
            ))),
        }
    }
}
