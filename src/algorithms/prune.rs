use crate::matrix::WeightMatrix;

/// Zero every unlocked cell below `threshold`. No renormalization happens
/// here; prune is expected to be followed by `normalize`.
pub fn prune(matrix: &WeightMatrix, threshold: f64) -> Vec<f64> {
    let columns = matrix.column_count();
    let mut new_values = matrix.values().to_vec();
    for row in 0..matrix.row_count() {
        for col in 0..columns {
            if matrix.is_locked(row, col) {
                continue;
            }
            let i = row * columns + col;
            if new_values[i] < threshold {
                new_values[i] = 0.0;
            }
        }
    }
    new_values
}
