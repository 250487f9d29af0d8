use std::collections::BTreeMap;

use bitcoin::absolute::LockTime;
use bitcoin::script::ScriptBuf;
use bitcoin::transaction::Version;
use bitcoin::{Amount, OutPoint, Sequence, Transaction, TxIn, TxOut, Witness};
use tracing::debug;

use crate::address::address_to_script_pubkey;
use crate::error::BtcError;
use crate::network::BtcNetwork;
use crate::utxo::UtxoSelection;

/// Smallest change output that standard relay policy accepts.
pub const DUST_THRESHOLD_SAT: u64 = 546;

/// An unsigned Bitcoin transaction ready for signing.
#[derive(Debug, Clone)]
pub struct UnsignedBtcTx {
    /// Payment output first, change output second; inputs carry no unlocking data yet.
    pub tx: Transaction,
    /// The outputs being spent, keyed by the outpoint each input references.
    /// Needed for computing sighashes during signing.
    pub prevouts: BTreeMap<OutPoint, TxOut>,
    /// Absolute fee: total input value minus total output value.
    pub fee_sat: u64,
}

impl UnsignedBtcTx {
    pub fn total_input_sat(&self) -> u64 {
        self.prevouts.values().map(|o| o.value.to_sat()).sum()
    }

    pub fn total_output_sat(&self) -> u64 {
        self.tx.output.iter().map(|o| o.value.to_sat()).sum()
    }

    /// Value of the change output.
    pub fn change_sat(&self) -> u64 {
        self.tx.output.get(1).map_or(0, |o| o.value.to_sat())
    }
}

/// Build the unsigned skeleton of a single-recipient payment.
///
/// Output 0 pays `amount_sat` to `payee`; one input is added per selected UTXO;
/// output 1 returns `total - amount - fee` to `change_address`. Change below
/// [`DUST_THRESHOLD_SAT`] (zero and negative included) is rejected as
/// insufficient funds, so every transaction carries a relayable change output.
pub fn assemble_transaction(
    payee: &str,
    amount_sat: u64,
    selection: &UtxoSelection,
    fee_sat: u64,
    change_address: &str,
    network: BtcNetwork,
) -> Result<UnsignedBtcTx, BtcError> {
    if amount_sat == 0 {
        return Err(BtcError::TransactionBuildError(
            "payment amount must be positive".into(),
        ));
    }

    let payee_script = address_to_script_pubkey(payee, network)?;
    let mut outputs = vec![TxOut {
        value: Amount::from_sat(amount_sat),
        script_pubkey: payee_script,
    }];

    let mut inputs = Vec::with_capacity(selection.selected.len());
    let mut prevouts = BTreeMap::new();

    for utxo in &selection.selected {
        let spent = TxOut {
            value: Amount::from_sat(utxo.amount_sat),
            script_pubkey: utxo.script_pubkey.clone(),
        };
        if prevouts.insert(utxo.outpoint, spent).is_some() {
            return Err(BtcError::TransactionBuildError(format!(
                "outpoint {} selected twice",
                utxo.outpoint
            )));
        }

        debug!(outpoint = %utxo.outpoint, kind = ?utxo.script_kind(), "adding input");
        inputs.push(TxIn {
            previous_output: utxo.outpoint,
            script_sig: ScriptBuf::new(),
            sequence: Sequence::MAX,
            witness: Witness::default(),
        });
    }

    let change = i128::from(selection.total_sat) - i128::from(amount_sat) - i128::from(fee_sat);
    if change < i128::from(DUST_THRESHOLD_SAT) {
        return Err(BtcError::InsufficientFunds {
            available_sat: selection.total_sat,
            required_sat: amount_sat
                .saturating_add(fee_sat)
                .saturating_add(DUST_THRESHOLD_SAT - 1),
        });
    }
    // change < total_sat, so it fits in a u64.
    let change_sat = change as u64;

    let change_script = address_to_script_pubkey(change_address, network)?;
    outputs.push(TxOut {
        value: Amount::from_sat(change_sat),
        script_pubkey: change_script,
    });

    let tx = Transaction {
        version: Version::TWO,
        lock_time: LockTime::ZERO,
        input: inputs,
        output: outputs,
    };

    Ok(UnsignedBtcTx { tx, prevouts, fee_sat })
}
