//! Per-input signing of assembled transactions.
//!
//! Signing is split in two: [`sign_transaction`] knows which digest each input
//! needs and how to place the result (witness or script_sig), while a
//! [`SignatureProvider`] only answers "sign this 32-byte digest under your key".
//! A local secret key is one provider; a threshold signing session can be
//! another without touching assembly or serialization.

use bitcoin::hashes::Hash;
use bitcoin::script::{Builder, PushBytesBuf, ScriptBuf};
use bitcoin::secp256k1::{self, All, Message, Secp256k1, SecretKey};
use bitcoin::sighash::{EcdsaSighashType, SighashCache};
use bitcoin::{CompressedPublicKey, PublicKey, Transaction, Witness};
use tracing::debug;

use crate::address::ScriptKind;
use crate::error::BtcError;
use crate::transaction::UnsignedBtcTx;

/// Something that can produce ECDSA signatures over precomputed digests.
pub trait SignatureProvider {
    /// Public key the signatures verify under; identifies the signing key.
    fn public_key(&self) -> CompressedPublicKey;

    /// Sign a 32-byte digest.
    fn sign_digest(&self, digest: [u8; 32]) -> Result<secp256k1::ecdsa::Signature, BtcError>;
}

/// Signs with a secp256k1 secret key held in process memory.
pub struct LocalKeySigner {
    secp: Secp256k1<All>,
    secret_key: SecretKey,
    public_key: CompressedPublicKey,
}

impl LocalKeySigner {
    /// The private key must be a 32-byte secp256k1 scalar.
    pub fn from_bytes(private_key: &[u8; 32]) -> Result<Self, BtcError> {
        let secp = Secp256k1::new();
        let secret_key = SecretKey::from_slice(private_key)
            .map_err(|e| BtcError::InvalidPrivateKey(format!("invalid secret key: {e}")))?;
        let public_key = CompressedPublicKey(secp256k1::PublicKey::from_secret_key(&secp, &secret_key));
        Ok(Self {
            secp,
            secret_key,
            public_key,
        })
    }
}

impl SignatureProvider for LocalKeySigner {
    fn public_key(&self) -> CompressedPublicKey {
        self.public_key
    }

    fn sign_digest(&self, digest: [u8; 32]) -> Result<secp256k1::ecdsa::Signature, BtcError> {
        let msg = Message::from_digest(digest);
        Ok(self.secp.sign_ecdsa(&msg, &self.secret_key))
    }
}

impl Drop for LocalKeySigner {
    fn drop(&mut self) {
        self.secret_key.non_secure_erase();
    }
}

/// Sign every input of `unsigned` with `signer`.
///
/// Each input is matched to the output it spends by outpoint, never by
/// position. P2WPKH inputs get a BIP-143 `SIGHASH_ALL` signature in a
/// `[signature, pubkey]` witness; P2PKH inputs get a legacy `SIGHASH_ALL`
/// signature in a `<signature> <pubkey>` script_sig. Any other script, or one
/// not paying to the signer's key, fails the whole call. The input transaction
/// is never modified; on error nothing signed escapes.
pub fn sign_transaction(
    unsigned: &UnsignedBtcTx,
    signer: &dyn SignatureProvider,
) -> Result<Transaction, BtcError> {
    let compressed_pk = signer.public_key();
    let own_p2wpkh = ScriptBuf::new_p2wpkh(&compressed_pk.wpubkey_hash());
    let own_p2pkh = ScriptBuf::new_p2pkh(&compressed_pk.pubkey_hash());

    let mut signed_tx = unsigned.tx.clone();
    let mut sighash_cache = SighashCache::new(&unsigned.tx);

    for (input_index, input) in unsigned.tx.input.iter().enumerate() {
        let outpoint = input.previous_output;
        let spent = unsigned.prevouts.get(&outpoint).ok_or_else(|| {
            BtcError::SigningError(format!("no spent output recorded for input {input_index} ({outpoint})"))
        })?;
        let script_pubkey = &spent.script_pubkey;

        match ScriptKind::classify(script_pubkey) {
            ScriptKind::P2wpkh => {
                if *script_pubkey != own_p2wpkh {
                    return Err(not_our_key(input_index, script_pubkey));
                }
                let sighash = sighash_cache
                    .p2wpkh_signature_hash(input_index, script_pubkey, spent.value, EcdsaSighashType::All)
                    .map_err(|e| {
                        BtcError::SigningError(format!("sighash computation failed for input {input_index}: {e}"))
                    })?;
                let sig_bytes = sign_all(signer, sighash.to_byte_array())?;

                // Witness: [signature, pubkey].
                let mut witness = Witness::new();
                witness.push(&sig_bytes);
                witness.push(compressed_pk.to_bytes());
                debug!(input_index, %outpoint, "signed P2WPKH input");
                signed_tx.input[input_index].script_sig = ScriptBuf::new();
                signed_tx.input[input_index].witness = witness;
            }
            ScriptKind::P2pkh => {
                if *script_pubkey != own_p2pkh {
                    return Err(not_our_key(input_index, script_pubkey));
                }
                let sighash = sighash_cache
                    .legacy_signature_hash(input_index, script_pubkey, EcdsaSighashType::All.to_u32())
                    .map_err(|e| {
                        BtcError::SigningError(format!("sighash computation failed for input {input_index}: {e}"))
                    })?;
                let sig_bytes = sign_all(signer, sighash.to_byte_array())?;
                let sig_push = PushBytesBuf::try_from(sig_bytes)
                    .map_err(|e| BtcError::SigningError(format!("signature push failed: {e}")))?;

                let script_sig = Builder::new()
                    .push_slice(sig_push)
                    .push_key(&PublicKey::new(compressed_pk.0))
                    .into_script();
                debug!(input_index, %outpoint, "signed P2PKH input");
                signed_tx.input[input_index].script_sig = script_sig;
                signed_tx.input[input_index].witness = Witness::default();
            }
            kind => {
                return Err(BtcError::SigningError(format!(
                    "input {input_index} spends unsupported script type {kind:?}"
                )));
            }
        }
    }

    Ok(signed_tx)
}

/// DER signature followed by the `SIGHASH_ALL` byte.
fn sign_all(signer: &dyn SignatureProvider, digest: [u8; 32]) -> Result<Vec<u8>, BtcError> {
    let signature = signer.sign_digest(digest)?;
    let mut sig_bytes = signature.serialize_der().to_vec();
    sig_bytes.push(EcdsaSighashType::All as u8);
    Ok(sig_bytes)
}

fn not_our_key(input_index: usize, script_pubkey: &ScriptBuf) -> BtcError {
    BtcError::SigningError(format!(
        "input {input_index} script {} does not pay to the signing key",
        script_pubkey.to_hex_string()
    ))
}
