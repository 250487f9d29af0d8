use bip32::{DerivationPath, XPrv};
use chain_btc::address::{pubkey_to_p2pkh_address, pubkey_to_p2wpkh_address};
use chain_btc::network::BtcNetwork;
use k256::ecdsa::SigningKey;
use tracing::info;
use zeroize::{Zeroize, Zeroizing};

use crate::error::WalletError;
use crate::mnemonic::{mnemonic_to_seed, validate_mnemonic};
use crate::types::{AddressType, DerivationPolicy};

/// Derive a secp256k1 private key from seed using BIP-32
pub fn derive_secp256k1_key(
    seed: &[u8],
    policy: &DerivationPolicy,
) -> Result<DerivedKey, WalletError> {
    let path_str = policy.path();

    let path: DerivationPath = path_str
        .parse()
        .map_err(|e: bip32::Error| WalletError::DerivationFailed(e.to_string()))?;

    let xprv = XPrv::derive_from_path(seed, &path)
        .map_err(|e| WalletError::DerivationFailed(e.to_string()))?;

    let private_key_bytes: [u8; 32] = xprv.to_bytes().into();
    let signing_key = SigningKey::from_bytes(&private_key_bytes.into())
        .map_err(|e| WalletError::DerivationFailed(e.to_string()))?;

    let public_key_compressed: [u8; 33] = signing_key
        .verifying_key()
        .to_sec1_bytes()
        .as_ref()
        .try_into()
        .map_err(|_| WalletError::DerivationFailed("Invalid public key length".into()))?;

    Ok(DerivedKey {
        private_key: private_key_bytes,
        public_key_compressed,
        derivation_path: path_str,
    })
}

/// Derived secp256k1 key pair
pub struct DerivedKey {
    pub private_key: [u8; 32],
    pub public_key_compressed: [u8; 33],
    pub derivation_path: String,
}

impl Drop for DerivedKey {
    fn drop(&mut self) {
        self.private_key.zeroize();
    }
}

/// A derived key together with its receiving address.
pub struct DerivedAccount {
    pub key: DerivedKey,
    pub address: String,
    pub address_type: AddressType,
}

/// Mnemonic to key and address along `policy`.
///
/// The checksum is checked before any seed work; an invalid phrase never
/// reaches PBKDF2. The seed is wiped once the key has been derived.
pub fn derive(
    mnemonic: &str,
    passphrase: &str,
    policy: &DerivationPolicy,
    network: BtcNetwork,
) -> Result<DerivedAccount, WalletError> {
    if !validate_mnemonic(mnemonic)? {
        return Err(WalletError::InvalidMnemonic(
            "phrase failed BIP-39 word list or checksum validation".into(),
        ));
    }
    let address_type = policy.address_type()?;

    let seed = Zeroizing::new(mnemonic_to_seed(mnemonic, passphrase)?);
    let key = derive_secp256k1_key(&seed, policy)?;

    let address = match address_type {
        AddressType::P2wpkh => pubkey_to_p2wpkh_address(&key.public_key_compressed, network),
        AddressType::P2pkh => pubkey_to_p2pkh_address(&key.public_key_compressed, network),
    }
    .map_err(|e| WalletError::DerivationFailed(e.to_string()))?;

    info!(path = %key.derivation_path, %address, %network, "derived wallet address");

    Ok(DerivedAccount {
        key,
        address,
        address_type,
    })
}
