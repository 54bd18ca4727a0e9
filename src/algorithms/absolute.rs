use crate::algorithms::redistribute;
use crate::mask::SelectionMask;
use crate::matrix::WeightMatrix;
use crate::tolerance::{clamp01, DEFAULT_AUTO_PRUNE, EPS_MASS};

/// Set every editable cell to `value`, blend by the soft-selection falloff,
/// then close each touched row back to 1.0 through its remaining cells.
///
/// Pure: returns the full new value array, the matrix is untouched.
pub fn absolute_set(matrix: &WeightMatrix, mask: &SelectionMask, value: f64) -> Vec<f64> {
    let mut new_values = matrix.values().to_vec();
    let columns = matrix.column_count();
    let value = clamp01(value);
    for row in 0..matrix.row_count() {
        if !mask.row_has_editable(row) {
            continue;
        }
        let falloff = if matrix.soft_on() { matrix.row_weight(row) } else { 1.0 };
        for col in 0..columns {
            if mask.editable(row, col) {
                let orig = matrix.value(row, col);
                new_values[row * columns + col] = value * falloff + orig * (1.0 - falloff);
            }
        }
    }
    redistribute::close_rows(matrix, mask, &mut new_values);
    new_values
}

#[derive(Clone, Copy, Debug)]
pub struct AddOptions {
    /// Relative mode: `new = old * (1 + delta)` instead of `old + delta`.
    pub percent: bool,
    /// Snap post-add values below `auto_prune_value` to zero before
    /// redistribution.
    pub auto_prune: bool,
    pub auto_prune_value: f64,
    /// Blend every editable cell toward the selection mean by `delta`
    /// instead of adding.
    pub average: bool,
}

impl Default for AddOptions {
    fn default() -> Self {
        AddOptions {
            percent: false,
            auto_prune: false,
            auto_prune_value: DEFAULT_AUTO_PRUNE,
            average: false,
        }
    }
}

/// Additive edit over the editable cells, clamped to [0, 1], followed by the
/// same remaining-cell redistribution as `absolute_set`.
///
/// Negative deltas only draw from rows that still have remaining mass: a row
/// whose remaining cells sum to zero is excluded from the edit outright,
/// since lowering its selection could never be paid back.
pub fn additive_set(
    matrix: &WeightMatrix,
    mask: &SelectionMask,
    delta: f64,
    options: &AddOptions,
) -> Vec<f64> {
    if options.average {
        return average_set(matrix, mask, delta);
    }

    let mut new_values = matrix.values().to_vec();
    let columns = matrix.column_count();
    for row in 0..matrix.row_count() {
        if !mask.row_has_editable(row) {
            continue;
        }
        if delta < 0.0 && remaining_sum(matrix, mask, row) <= EPS_MASS {
            continue;
        }
        let falloff = if matrix.soft_on() { matrix.row_weight(row) } else { 1.0 };
        for col in 0..columns {
            if !mask.editable(row, col) {
                continue;
            }
            let orig = matrix.value(row, col);
            let mut v = if options.percent {
                orig * (1.0 + delta)
            } else {
                orig + delta
            };
            v = clamp01(v);
            if options.auto_prune && v < options.auto_prune_value {
                v = 0.0;
            }
            new_values[row * columns + col] = v * falloff + orig * (1.0 - falloff);
        }
    }
    redistribute::close_rows(matrix, mask, &mut new_values);
    new_values
}

/// Blend every editable cell toward the mean of the selection's current
/// values, `blend` in [0, 1] being the mix factor (the "Average" button).
fn average_set(matrix: &WeightMatrix, mask: &SelectionMask, blend: f64) -> Vec<f64> {
    let columns = matrix.column_count();
    let mut sum = 0.0;
    let mut count = 0usize;
    for row in 0..matrix.row_count() {
        for col in 0..columns {
            if mask.editable(row, col) {
                sum += matrix.value(row, col);
                count += 1;
            }
        }
    }
    let mut new_values = matrix.values().to_vec();
    if count == 0 {
        return new_values;
    }
    let mean = sum / count as f64;
    let blend = clamp01(blend);
    for row in 0..matrix.row_count() {
        if !mask.row_has_editable(row) {
            continue;
        }
        let falloff = if matrix.soft_on() { matrix.row_weight(row) } else { 1.0 };
        for col in 0..columns {
            if mask.editable(row, col) {
                let orig = matrix.value(row, col);
                let blended = mean * blend + orig * (1.0 - blend);
                new_values[row * columns + col] = blended * falloff + orig * (1.0 - falloff);
            }
        }
    }
    redistribute::close_rows(matrix, mask, &mut new_values);
    new_values
}

fn remaining_sum(matrix: &WeightMatrix, mask: &SelectionMask, row: usize) -> f64 {
    (0..matrix.column_count())
        .filter(|&col| mask.remaining(row, col))
        .map(|col| matrix.value(row, col))
        .sum()
}
