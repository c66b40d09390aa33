use crate::indicators::FeatureRow;
use crate::models::Signal;

/// A feature row paired with the signal to act on at that row
///
/// The signal was computed from the *previous* row, so it only reflects
/// data that had fully closed by the time this row opened.
#[derive(Debug, Clone, PartialEq)]
pub struct SignalRow {
    pub row: FeatureRow,
    pub signal: Signal,
}

/// Shift raw signals forward by one row and drop the leading row
///
/// `out[k].signal == raw[k]` and `out[k].row == rows[k + 1]`.
pub fn shift_signals(rows: &[FeatureRow], raw: &[Signal]) -> Vec<SignalRow> {
    rows.iter()
        .skip(1)
        .zip(raw.iter())
        .map(|(row, &signal)| SignalRow {
            row: row.clone(),
            signal,
        })
        .collect()
}
