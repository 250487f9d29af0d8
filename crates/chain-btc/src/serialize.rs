use bitcoin::consensus::encode;
use bitcoin::Transaction;

use crate::error::BtcError;

/// Consensus-encode a fully signed transaction.
///
/// Witness-bearing transactions get the `0x00 0x01` marker/flag after the
/// version and their witness stacks after the outputs. An input with neither
/// script_sig nor witness is refused: the network would reject it anyway.
pub fn serialize_signed(tx: &Transaction) -> Result<Vec<u8>, BtcError> {
    if tx.input.is_empty() {
        return Err(BtcError::Serialization("transaction has no inputs".into()));
    }
    if let Some(index) = tx
        .input
        .iter()
        .position(|input| input.script_sig.is_empty() && input.witness.is_empty())
    {
        return Err(BtcError::Serialization(format!("input {index} is unsigned")));
    }
    Ok(encode::serialize(tx))
}

/// Hex form submitted to the broadcast endpoint.
pub fn serialize_signed_hex(tx: &Transaction) -> Result<String, BtcError> {
    Ok(hex::encode(serialize_signed(tx)?))
}

/// Decode consensus bytes back into a transaction.
pub fn deserialize_transaction(bytes: &[u8]) -> Result<Transaction, BtcError> {
    encode::deserialize(bytes).map_err(|e| BtcError::Serialization(format!("invalid transaction bytes: {e}")))
}
