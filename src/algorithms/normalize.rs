use crate::mask::SelectionMask;
use crate::matrix::WeightMatrix;
use crate::tolerance::EPS_MASS;

/// Result of a normalize pass. `not_normalizable` lists rows whose editable
/// mass was zero: they are left unchanged (an all-zero selection cannot be
/// rescaled) and the UI surfaces them as a warning, not an error.
#[derive(Clone, Debug)]
pub struct NormalizeOutcome {
    pub values: Vec<f64>,
    pub not_normalizable: Vec<usize>,
}

/// For each row with any editable cell, rescale its editable cells so the
/// row sums to exactly 1.0. Cells outside the selection and locked cells
/// keep their values; the editable cells absorb the difference
/// proportionally (`v *= target / current_sum`).
pub fn normalize(matrix: &WeightMatrix, mask: &SelectionMask) -> NormalizeOutcome {
    let columns = matrix.column_count();
    let mut values = matrix.values().to_vec();
    let mut not_normalizable = Vec::new();

    for row in 0..matrix.row_count() {
        if !mask.row_has_editable(row) {
            continue;
        }
        let base = row * columns;
        let mut editable_sum = 0.0;
        let mut other_sum = 0.0;
        for col in 0..columns {
            if mask.editable(row, col) {
                editable_sum += values[base + col];
            } else {
                other_sum += values[base + col];
            }
        }
        if editable_sum <= EPS_MASS {
            not_normalizable.push(row);
            continue;
        }
        let target = (1.0 - other_sum).max(0.0);
        let scale = target / editable_sum;
        for col in 0..columns {
            if mask.editable(row, col) {
                values[base + col] *= scale;
            }
        }
    }

    NormalizeOutcome {
        values,
        not_normalizable,
    }
}
