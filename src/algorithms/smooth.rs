use crate::adjacency::VertexAdjacency;
use crate::mask::SelectionMask;
use crate::matrix::WeightMatrix;
use crate::tolerance::{clamp01, EPS_MASS, EPS_WEIGHT};
use std::collections::HashMap;

/// Iterative neighbor-mean smoothing over the editable cells.
///
/// Column-independent, row-adjacency-dependent: each iteration replaces an
/// editable cell with the mean of its topological neighbors' values for the
/// same influence, reading from the pre-iteration snapshot so the pass has
/// no in-place ordering races. Neighbors not loaded in the matrix are masked
/// out of the mean, not zero-padded. `percent_mvt` blends the final smoothed
/// value with the original.
///
/// Row sums are allowed to drift here; callers wanting strict sums follow up
/// with `normalize`.
pub fn smooth(
    matrix: &WeightMatrix,
    mask: &SelectionMask,
    adjacency: &VertexAdjacency,
    repeat: usize,
    percent_mvt: f64,
) -> Vec<f64> {
    let columns = matrix.column_count();
    let mut new_values = matrix.values().to_vec();
    if repeat == 0 {
        return new_values;
    }

    let row_of: HashMap<u32, usize> = matrix
        .vertices()
        .iter()
        .enumerate()
        .map(|(row, &v)| (v, row))
        .collect();
    let edited_columns = mask.edited_columns();
    let edited_rows = mask.edited_rows();
    let mut buffer: Vec<f64> = Vec::with_capacity(adjacency.max_degree());

    for _ in 0..repeat {
        let snapshot = new_values.clone();
        for &col in &edited_columns {
            for &row in &edited_rows {
                if !mask.editable(row, col) {
                    continue;
                }
                buffer.clear();
                for &n in adjacency.neighbors(matrix.vertex_at(row)) {
                    if let Some(&nrow) = row_of.get(&n) {
                        buffer.push(snapshot[nrow * columns + col]);
                    }
                }
                if buffer.is_empty() {
                    continue;
                }
                new_values[row * columns + col] =
                    buffer.iter().sum::<f64>() / buffer.len() as f64;
            }
        }
    }

    let percent_mvt = clamp01(percent_mvt);
    if percent_mvt < 1.0 {
        for &col in &edited_columns {
            for &row in &edited_rows {
                if !mask.editable(row, col) {
                    continue;
                }
                let i = row * columns + col;
                let orig = matrix.value(row, col);
                new_values[i] = new_values[i] * percent_mvt + orig * (1.0 - percent_mvt);
            }
        }
    }
    new_values
}

/// Move each editable cell's weight entirely onto its topological neighbors'
/// existing nonzero weight for the same influence, proportionally. Used to
/// dissolve isolated or erroneous influence assignments.
///
/// Recipients are unlocked neighbor cells outside the edit selection; a cell
/// with no eligible recipient is left unchanged. Donor rows end up short of
/// 1.0 by design, same contract as `prune`: follow up with `normalize`.
pub fn reassign_locally(
    matrix: &WeightMatrix,
    mask: &SelectionMask,
    adjacency: &VertexAdjacency,
) -> Vec<f64> {
    let columns = matrix.column_count();
    let mut new_values = matrix.values().to_vec();
    let row_of: HashMap<u32, usize> = matrix
        .vertices()
        .iter()
        .enumerate()
        .map(|(row, &v)| (v, row))
        .collect();

    for row in 0..matrix.row_count() {
        if !mask.row_has_editable(row) {
            continue;
        }
        for col in 0..columns {
            if !mask.editable(row, col) {
                continue;
            }
            let donor = matrix.value(row, col);
            if donor <= EPS_WEIGHT {
                continue;
            }
            // Proportions come from the pre-edit snapshot so the result does
            // not depend on cell visit order.
            let mut recipients: Vec<(usize, f64)> = Vec::new();
            let mut total = 0.0;
            for &n in adjacency.neighbors(matrix.vertex_at(row)) {
                if let Some(&nrow) = row_of.get(&n) {
                    if mask.editable(nrow, col) || matrix.is_locked(nrow, col) {
                        continue;
                    }
                    let w = matrix.value(nrow, col);
                    if w > EPS_WEIGHT {
                        recipients.push((nrow, w));
                        total += w;
                    }
                }
            }
            if total <= EPS_MASS {
                continue;
            }
            new_values[row * columns + col] = 0.0;
            for (nrow, w) in recipients {
                let i = nrow * columns + col;
                // receiving cells stay inside [0, 1]; any overflow is left
                // for the follow-up normalize
                new_values[i] = clamp01(new_values[i] + donor * (w / total));
            }
        }
    }
    new_values
}

/// Vertices holding a weight for some influence that none of their neighbors
/// shares within `tolerance` — isolated assignments worth reassigning.
pub fn fix_around_vertices(
    matrix: &WeightMatrix,
    adjacency: &VertexAdjacency,
    tolerance: f64,
) -> Vec<u32> {
    let row_of: HashMap<u32, usize> = matrix
        .vertices()
        .iter()
        .enumerate()
        .map(|(row, &v)| (v, row))
        .collect();
    let mut out = Vec::new();
    'rows: for row in 0..matrix.row_count() {
        let vertex = matrix.vertex_at(row);
        let neighbor_rows: Vec<usize> = adjacency
            .neighbors(vertex)
            .iter()
            .filter_map(|n| row_of.get(n).copied())
            .collect();
        if neighbor_rows.is_empty() {
            continue;
        }
        for col in 0..matrix.column_count() {
            let v = matrix.value(row, col);
            if v <= EPS_WEIGHT {
                continue;
            }
            let isolated = neighbor_rows
                .iter()
                .all(|&nrow| (matrix.value(nrow, col) - v).abs() > tolerance);
            if isolated {
                out.push(vertex);
                continue 'rows;
            }
        }
    }
    out
}
