use bitcoin::script::Script;

use crate::address::ScriptKind;

/// Fixed transaction overhead (in vbytes): version + locktime + input/output counts.
const TX_OVERHEAD_VBYTES: u64 = 10;

/// Estimated virtual size of a P2WPKH input (in vbytes).
/// Breakdown: 41 bytes non-witness + ~107 witness bytes / 4 = ~68 vbytes per input.
const P2WPKH_INPUT_VBYTES: u64 = 68;

/// Upper bound for a P2PKH input with a low-S signature and compressed key:
/// outpoint 36 + script length 1 + `<sig> <pubkey>` 107 + sequence 4.
const P2PKH_INPUT_VBYTES: u64 = 148;

/// Estimated virtual size of a P2WPKH output (in vbytes).
const OUTPUT_VBYTES: u64 = 31;

/// Added on top of the rate product so truncation never underpays.
const ROUNDING_MARGIN_SAT: u64 = 1;

/// Estimated virtual size of a transaction with the given shape.
pub fn estimate_vsize(num_inputs: usize, num_outputs: usize) -> u64 {
    TX_OVERHEAD_VBYTES
        + (num_inputs as u64 * P2WPKH_INPUT_VBYTES)
        + (num_outputs as u64 * OUTPUT_VBYTES)
}

/// Virtual size an input spending `kind` adds once signed.
///
/// Kinds the signer cannot satisfy are priced as P2WPKH; they never reach
/// broadcast.
pub fn input_vbytes(kind: ScriptKind) -> u64 {
    match kind {
        ScriptKind::P2pkh => P2PKH_INPUT_VBYTES,
        ScriptKind::P2wpkh | ScriptKind::P2wsh | ScriptKind::Other => P2WPKH_INPUT_VBYTES,
    }
}

/// Exact size of an output: value 8 + script length prefix + script.
pub fn output_vbytes(script_pubkey: &Script) -> u64 {
    let len = script_pubkey.len() as u64;
    let prefix = match len {
        0..=0xfc => 1,
        0xfd..=0xffff => 3,
        _ => 5,
    };
    8 + prefix + len
}

/// Virtual size for inputs of the given kinds paying to the given scripts.
///
/// With P2WPKH inputs and P2WPKH outputs this equals [`estimate_vsize`].
pub fn estimate_vsize_for<S: AsRef<Script>>(inputs: &[ScriptKind], outputs: &[S]) -> u64 {
    TX_OVERHEAD_VBYTES
        + inputs.iter().map(|k| input_vbytes(*k)).sum::<u64>()
        + outputs.iter().map(|s| output_vbytes(s.as_ref())).sum::<u64>()
}

/// Estimate the absolute fee in satoshis.
///
/// Static size model: `vsize * fee_rate`, truncated, plus one satoshi of margin.
/// Negative or NaN rates count as zero.
pub fn estimate_fee(num_inputs: usize, num_outputs: usize, fee_rate_sat_vbyte: f64) -> u64 {
    fee_for_vsize(estimate_vsize(num_inputs, num_outputs), fee_rate_sat_vbyte)
}

/// [`estimate_fee`] over [`estimate_vsize_for`].
pub fn estimate_fee_for<S: AsRef<Script>>(
    inputs: &[ScriptKind],
    outputs: &[S],
    fee_rate_sat_vbyte: f64,
) -> u64 {
    fee_for_vsize(estimate_vsize_for(inputs, outputs), fee_rate_sat_vbyte)
}

fn fee_for_vsize(vsize: u64, fee_rate_sat_vbyte: f64) -> u64 {
    let rate = if fee_rate_sat_vbyte.is_nan() {
        0.0
    } else {
        fee_rate_sat_vbyte.max(0.0)
    };
    // `as` saturates for out-of-range floats.
    let base = (vsize as f64 * rate).floor() as u64;
    base.saturating_add(ROUNDING_MARGIN_SAT)
}
