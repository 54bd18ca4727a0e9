use crate::mask::SelectionMask;
use crate::matrix::WeightMatrix;
use crate::tolerance::EPS_MASS;

/// Close every edited row back to a sum of 1.0 by scaling its `remaining`
/// cells proportionally to their current value.
///
/// Rows with no remaining unlocked mass are skipped: there is nowhere to
/// take weight from or give it to, and producing negative values would be
/// worse than a transiently unnormalized row (the caller follows up with
/// `normalize` when strict sums are required).
///
/// When the edited cells alone overshoot the available mass, the remaining
/// cells go to zero and the edited cells are scaled down so the row stays
/// inside [0, 1].
pub fn close_rows(matrix: &WeightMatrix, mask: &SelectionMask, values: &mut [f64]) {
    let columns = matrix.column_count();
    for row in 0..matrix.row_count() {
        if !mask.row_has_editable(row) {
            continue;
        }
        close_row(matrix, mask, values, row, columns);
    }
}

fn close_row(
    matrix: &WeightMatrix,
    mask: &SelectionMask,
    values: &mut [f64],
    row: usize,
    columns: usize,
) {
    let base = row * columns;
    let mut remaining_sum = 0.0;
    let mut edited_sum = 0.0;
    let mut locked_sum = 0.0;
    for col in 0..columns {
        let v = values[base + col];
        if mask.remaining(row, col) {
            remaining_sum += v;
        } else if mask.editable(row, col) {
            edited_sum += v;
        } else {
            locked_sum += v;
        }
    }

    if remaining_sum <= EPS_MASS {
        return;
    }

    let target = 1.0 - locked_sum - edited_sum;
    if target >= 0.0 {
        let scale = target / remaining_sum;
        for col in 0..columns {
            if mask.remaining(row, col) {
                values[base + col] *= scale;
            }
        }
    } else {
        // Edited cells overfill the row: zero the remaining cells and pull
        // the edited cells down to the unlocked budget.
        let available = (1.0 - locked_sum).max(0.0);
        let edit_scale = if edited_sum > EPS_MASS {
            available / edited_sum
        } else {
            0.0
        };
        for col in 0..columns {
            if mask.remaining(row, col) {
                values[base + col] = 0.0;
            } else if mask.editable(row, col) {
                values[base + col] *= edit_scale;
            }
        }
    }
}
