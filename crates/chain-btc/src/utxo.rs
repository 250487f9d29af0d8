use bitcoin::script::ScriptBuf;
use bitcoin::{OutPoint, Txid};

use crate::address::ScriptKind;
use crate::error::BtcError;
use crate::fee::estimate_fee_for;
use crate::transaction::DUST_THRESHOLD_SAT;

/// A single unspent transaction output (UTXO).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Utxo {
    /// Identity of the output: funding txid and output index.
    pub outpoint: OutPoint,
    /// Value in satoshis.
    pub amount_sat: u64,
    /// The locking script (scriptPubKey).
    pub script_pubkey: ScriptBuf,
}

impl Utxo {
    /// Build a UTXO from a display-order txid hex string.
    pub fn from_parts(
        txid: &str,
        vout: u32,
        amount_sat: u64,
        script_pubkey: ScriptBuf,
    ) -> Result<Self, BtcError> {
        let txid: Txid = txid
            .parse()
            .map_err(|e| BtcError::Decode(format!("invalid txid {txid}: {e}")))?;
        Ok(Self {
            outpoint: OutPoint::new(txid, vout),
            amount_sat,
            script_pubkey,
        })
    }

    pub fn script_kind(&self) -> ScriptKind {
        ScriptKind::classify(&self.script_pubkey)
    }
}

/// Result of UTXO selection: the chosen UTXOs and their aggregate value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UtxoSelection {
    /// The selected UTXOs, largest first.
    pub selected: Vec<Utxo>,
    /// Total value of the selected UTXOs in satoshis.
    pub total_sat: u64,
}

impl UtxoSelection {
    pub fn is_empty(&self) -> bool {
        self.selected.is_empty()
    }
}

/// Select UTXOs until their total reaches `target_sat`.
///
/// Largest-first greedy selection: UTXOs are sorted by descending value (ties
/// broken by outpoint, so the input order never matters) and accumulated until
/// the target is met or the set runs out. A short selection is returned as-is;
/// callers detect the shortfall when computing change.
pub fn select_utxos(utxos: &[Utxo], target_sat: u64) -> UtxoSelection {
    let mut sorted: Vec<&Utxo> = utxos.iter().collect();
    sorted.sort_by(|a, b| {
        b.amount_sat
            .cmp(&a.amount_sat)
            .then_with(|| a.outpoint.cmp(&b.outpoint))
    });

    let mut selection = UtxoSelection::default();
    for utxo in sorted {
        if selection.total_sat >= target_sat {
            break;
        }
        selection.selected.push(utxo.clone());
        selection.total_sat = selection.total_sat.saturating_add(utxo.amount_sat);
    }
    selection
}

/// Select UTXOs covering `amount_sat`, the fee, and a change output above dust.
///
/// The fee depends on which UTXOs get picked, so selection is repeated with a
/// rising target until change of at least [`DUST_THRESHOLD_SAT`] is possible or
/// every UTXO is in. `outputs` are the locking scripts of the payment and
/// change outputs; the fee is priced from them and from each selected input's
/// script kind. Returns the selection and the fee estimated for it.
pub fn select_utxos_for_payment(
    utxos: &[Utxo],
    amount_sat: u64,
    fee_rate_sat_vbyte: f64,
    outputs: &[ScriptBuf],
) -> (UtxoSelection, u64) {
    let mut target = amount_sat.saturating_add(DUST_THRESHOLD_SAT);
    loop {
        let selection = select_utxos(utxos, target);
        let kinds: Vec<ScriptKind> = selection.selected.iter().map(Utxo::script_kind).collect();
        let fee = estimate_fee_for(&kinds, outputs, fee_rate_sat_vbyte);
        let needed = amount_sat
            .saturating_add(fee)
            .saturating_add(DUST_THRESHOLD_SAT);
        if selection.total_sat >= needed || selection.selected.len() == utxos.len() {
            return (selection, fee);
        }
        // total < needed = new target, so the next round picks at least one more.
        target = needed;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fee::estimate_fee;
    use bitcoin::hashes::Hash;

    fn p2wpkh_outputs() -> Vec<ScriptBuf> {
        let script = ScriptBuf::from_bytes(vec![0x00, 0x14].into_iter().chain([0xbb; 20]).collect());
        vec![script.clone(), script]
    }

    fn make_p2pkh_utxo(tag: u8, amount_sat: u64) -> Utxo {
        let script = [0x76, 0xa9, 0x14]
            .into_iter()
            .chain([0xcc; 20])
            .chain([0x88, 0xac])
            .collect();
        Utxo {
            outpoint: OutPoint::new(Txid::from_byte_array([tag; 32]), 0),
            amount_sat,
            script_pubkey: ScriptBuf::from_bytes(script),
        }
    }

    fn make_utxo(tag: u8, vout: u32, amount_sat: u64) -> Utxo {
        Utxo {
            outpoint: OutPoint::new(Txid::from_byte_array([tag; 32]), vout),
            amount_sat,
            script_pubkey: ScriptBuf::from_bytes(vec![0x00, 0x14].into_iter().chain([0xaa; 20]).collect()),
        }
    }

    #[test]
    fn from_parts_parses_display_txid() {
        let txid = "ab".repeat(32);
        let utxo = Utxo::from_parts(&txid, 3, 5_000, ScriptBuf::new()).unwrap();
        assert_eq!(utxo.outpoint.txid.to_string(), txid);
        assert_eq!(utxo.outpoint.vout, 3);
    }

    #[test]
    fn from_parts_rejects_bad_txid() {
        let result = Utxo::from_parts("zz", 0, 1, ScriptBuf::new());
        assert!(matches!(result, Err(BtcError::Decode(_))));
    }

    #[test]
    fn selects_single_large_utxo() {
        let utxos = vec![make_utxo(1, 0, 100_000), make_utxo(2, 0, 50_000)];
        let selection = select_utxos(&utxos, 40_000);
        assert_eq!(selection.selected.len(), 1);
        assert_eq!(selection.total_sat, 100_000);
    }

    #[test]
    fn selects_multiple_utxos_when_needed() {
        let utxos = vec![
            make_utxo(1, 0, 30_000),
            make_utxo(2, 0, 30_000),
            make_utxo(3, 0, 30_000),
        ];
        let selection = select_utxos(&utxos, 55_000);
        assert_eq!(selection.selected.len(), 2);
        assert_eq!(selection.total_sat, 60_000);
    }

    #[test]
    fn exact_target_stops_immediately() {
        let utxos = vec![make_utxo(1, 0, 10_000), make_utxo(2, 0, 5_000)];
        let selection = select_utxos(&utxos, 10_000);
        assert_eq!(selection.selected.len(), 1);
    }

    #[test]
    fn shortfall_returns_everything() {
        let utxos = vec![make_utxo(1, 0, 1_000), make_utxo(2, 0, 2_000)];
        let selection = select_utxos(&utxos, 500_000);
        assert_eq!(selection.selected.len(), 2);
        assert_eq!(selection.total_sat, 3_000);
    }

    #[test]
    fn empty_utxos_returns_empty_selection() {
        let selection = select_utxos(&[], 1_000);
        assert!(selection.is_empty());
        assert_eq!(selection.total_sat, 0);
    }

    #[test]
    fn largest_first_ordering() {
        let utxos = vec![
            make_utxo(1, 0, 1_000),
            make_utxo(2, 0, 100_000),
            make_utxo(3, 0, 50_000),
        ];
        let selection = select_utxos(&utxos, 120_000);
        let amounts: Vec<u64> = selection.selected.iter().map(|u| u.amount_sat).collect();
        assert_eq!(amounts, vec![100_000, 50_000]);
    }

    #[test]
    fn selection_ignores_input_order() {
        let utxos = vec![
            make_utxo(4, 1, 7_000),
            make_utxo(1, 0, 7_000),
            make_utxo(3, 2, 12_000),
            make_utxo(2, 0, 3_000),
        ];
        let mut reversed = utxos.clone();
        reversed.reverse();
        let mut rotated = utxos.clone();
        rotated.rotate_left(2);

        let expected = select_utxos(&utxos, 20_000);
        assert_eq!(select_utxos(&reversed, 20_000), expected);
        assert_eq!(select_utxos(&rotated, 20_000), expected);
    }

    #[test]
    fn feasible_target_is_always_covered() {
        let utxos: Vec<Utxo> = (1..=8u8).map(|i| make_utxo(i, 0, u64::from(i) * 1_000)).collect();
        let available: u64 = utxos.iter().map(|u| u.amount_sat).sum();
        for target in (0..=available).step_by(777) {
            let selection = select_utxos(&utxos, target);
            assert!(selection.total_sat >= target, "target {target} not covered");
        }
    }

    #[test]
    fn payment_selection_adds_inputs_to_cover_fee() {
        // 10_000 alone covers the amount but not amount + fee at 10 sat/vB.
        let utxos = vec![make_utxo(1, 0, 10_000), make_utxo(2, 0, 5_000)];
        let plain = select_utxos(&utxos, 9_500);
        assert_eq!(plain.selected.len(), 1);

        let (selection, fee) = select_utxos_for_payment(&utxos, 9_500, 10.0, &p2wpkh_outputs());
        assert_eq!(selection.selected.len(), 2);
        assert_eq!(fee, estimate_fee(2, 2, 10.0));
        assert!(selection.total_sat >= 9_500 + fee + DUST_THRESHOLD_SAT);
    }

    #[test]
    fn payment_selection_keeps_single_input_when_enough() {
        let utxos = vec![make_utxo(1, 0, 10_000), make_utxo(2, 0, 5_000)];
        let (selection, fee) = select_utxos_for_payment(&utxos, 1_200, 2.0, &p2wpkh_outputs());
        assert_eq!(selection.selected.len(), 1);
        assert_eq!(fee, estimate_fee(1, 2, 2.0));
    }

    #[test]
    fn payment_selection_exhausts_on_shortfall() {
        let utxos = vec![make_utxo(1, 0, 1_000), make_utxo(2, 0, 500)];
        let (selection, _fee) = select_utxos_for_payment(&utxos, 1_400, 1.0, &p2wpkh_outputs());
        assert_eq!(selection.selected.len(), 2);
        assert_eq!(selection.total_sat, 1_500);
    }

    #[test]
    fn payment_selection_on_empty_set() {
        let (selection, _fee) = select_utxos_for_payment(&[], 1_000, 1.0, &p2wpkh_outputs());
        assert!(selection.is_empty());
    }

    #[test]
    fn payment_selection_prices_legacy_inputs() {
        let utxos: Vec<Utxo> = (1..=3u8).map(|tag| make_p2pkh_utxo(tag, 4_000)).collect();
        let (selection, fee) = select_utxos_for_payment(&utxos, 10_000, 1.0, &p2wpkh_outputs());
        assert_eq!(selection.selected.len(), 3);
        // 10 + 3 * 148 + 2 * 31 vbytes, plus margin.
        assert_eq!(fee, 517);
        assert!(fee > estimate_fee(3, 2, 1.0));
    }

    #[test]
    fn payment_selection_avoids_dust_change() {
        // The first UTXO alone would leave 100 sat of change.
        let utxos = vec![make_utxo(1, 0, 10_000), make_utxo(2, 0, 2_000)];
        let fee_one = estimate_fee(1, 2, 1.0);
        let amount = 10_000 - fee_one - 100;

        let (selection, fee) = select_utxos_for_payment(&utxos, amount, 1.0, &p2wpkh_outputs());
        assert_eq!(selection.selected.len(), 2);
        assert!(selection.total_sat - amount - fee >= DUST_THRESHOLD_SAT);
    }
}
