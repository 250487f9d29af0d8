use bitcoin::address::{Address, NetworkUnchecked};
use bitcoin::script::{Script, ScriptBuf};
use bitcoin::CompressedPublicKey;

use crate::error::BtcError;
use crate::network::BtcNetwork;

/// Locking script shapes the wallet knows how to tell apart.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScriptKind {
    /// `OP_0 <20-byte key hash>`
    P2wpkh,
    /// `OP_0 <32-byte script hash>`
    P2wsh,
    /// `OP_DUP OP_HASH160 <20-byte key hash> OP_EQUALVERIFY OP_CHECKSIG`
    P2pkh,
    Other,
}

impl ScriptKind {
    pub fn classify(script: &Script) -> Self {
        if script.is_p2wpkh() {
            ScriptKind::P2wpkh
        } else if script.is_p2wsh() {
            ScriptKind::P2wsh
        } else if script.is_p2pkh() {
            ScriptKind::P2pkh
        } else {
            ScriptKind::Other
        }
    }
}

/// Derive a P2WPKH (native SegWit bech32) address from a compressed public key.
///
/// Takes a 33-byte compressed secp256k1 public key and returns a bech32 address
/// string: `bc1...` for mainnet, `tb1...` for testnet/signet.
pub fn pubkey_to_p2wpkh_address(
    pubkey_bytes: &[u8; 33],
    network: BtcNetwork,
) -> Result<String, BtcError> {
    let compressed_pk = parse_compressed(pubkey_bytes)?;
    let address = Address::p2wpkh(&compressed_pk, network.to_bitcoin_network());
    Ok(address.to_string())
}

/// Derive a legacy P2PKH (base58) address from a compressed public key.
pub fn pubkey_to_p2pkh_address(
    pubkey_bytes: &[u8; 33],
    network: BtcNetwork,
) -> Result<String, BtcError> {
    let compressed_pk = parse_compressed(pubkey_bytes)?;
    let address = Address::p2pkh(compressed_pk.pubkey_hash(), network.to_bitcoin_network());
    Ok(address.to_string())
}

fn parse_compressed(pubkey_bytes: &[u8; 33]) -> Result<CompressedPublicKey, BtcError> {
    CompressedPublicKey::from_slice(pubkey_bytes).map_err(|e| {
        BtcError::InvalidPublicKey(format!("failed to parse compressed public key: {e}"))
    })
}

/// Parse an address string and check it belongs to `network`.
pub fn parse_address(address: &str, network: BtcNetwork) -> Result<Address, BtcError> {
    address
        .parse::<Address<NetworkUnchecked>>()
        .map_err(|e| BtcError::InvalidAddress(format!("failed to parse {address}: {e}")))?
        .require_network(network.to_bitcoin_network())
        .map_err(|e| BtcError::InvalidAddress(format!("{address} is not a {network} address: {e}")))
}

/// Decode an address into the locking script that pays to it.
pub fn address_to_script_pubkey(address: &str, network: BtcNetwork) -> Result<ScriptBuf, BtcError> {
    Ok(parse_address(address, network)?.script_pubkey())
}
