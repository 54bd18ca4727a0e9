use crate::mask::SelectionError;
use crate::model::{Influence, Rect};
use crate::tolerance::EPS_WEIGHT;

/// Dense per-vertex per-influence weight table.
///
/// Rows are vertices (stable mesh indices, possibly a soft-selection subset),
/// columns are influences. The backing store is the source of truth; this is
/// a read-modify-write cache rebuilt on selection change or refresh.
#[derive(Clone, Debug)]
pub struct WeightMatrix {
    vertices: Vec<u32>,
    influences: Vec<Influence>,
    values: Vec<f64>, // row-major, rows * columns
    row_weight: Vec<f64>, // soft-selection falloff, 1.0 when soft is off
    locked_row: Vec<bool>,
    locked_column: Vec<bool>,
    soft_on: bool,
}

impl WeightMatrix {
    /// `None` when `values` does not have `vertices.len() * influences.len()`
    /// entries.
    pub fn new(vertices: Vec<u32>, influences: Vec<Influence>, values: Vec<f64>) -> Option<Self> {
        if values.len() != vertices.len() * influences.len() {
            return None;
        }
        let rows = vertices.len();
        let columns = influences.len();
        Some(WeightMatrix {
            vertices,
            influences,
            values,
            row_weight: vec![1.0; rows],
            locked_row: vec![false; rows],
            locked_column: vec![false; columns],
            soft_on: false,
        })
    }

    pub fn row_count(&self) -> usize {
        self.vertices.len()
    }

    pub fn column_count(&self) -> usize {
        self.influences.len()
    }

    pub fn vertices(&self) -> &[u32] {
        &self.vertices
    }

    pub fn vertex_at(&self, row: usize) -> u32 {
        self.vertices[row]
    }

    /// Row index for a mesh vertex id, if it is loaded.
    pub fn row_of(&self, vertex: u32) -> Option<usize> {
        self.vertices.iter().position(|&v| v == vertex)
    }

    pub fn influences(&self) -> &[Influence] {
        &self.influences
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    #[inline]
    pub(crate) fn index(&self, row: usize, column: usize) -> usize {
        row * self.influences.len() + column
    }

    pub fn value(&self, row: usize, column: usize) -> f64 {
        self.values[self.index(row, column)]
    }

    pub fn set_value(&mut self, row: usize, column: usize, value: f64) {
        let i = self.index(row, column);
        self.values[i] = value;
    }

    /// Replace the whole value array. Length must match the current shape.
    pub fn set_values(&mut self, values: Vec<f64>) -> bool {
        if values.len() != self.values.len() {
            return false;
        }
        self.values = values;
        true
    }

    /// Write a rows×columns block of `new_values` (row-major, rect-shaped)
    /// into the matrix. Rejected before any write when the rect is out of
    /// bounds or the value count does not match the rect.
    pub fn set_submatrix(&mut self, rect: Rect, new_values: &[f64]) -> Result<(), SelectionError> {
        if !rect.fits(self.row_count(), self.column_count()) {
            return Err(SelectionError::OutOfBounds {
                rect,
                rows: self.row_count(),
                columns: self.column_count(),
            });
        }
        let w = rect.right - rect.left + 1;
        let h = rect.bottom - rect.top + 1;
        if new_values.len() != w * h {
            return Err(SelectionError::ShapeMismatch {
                expected: w * h,
                got: new_values.len(),
            });
        }
        for r in 0..h {
            for c in 0..w {
                let i = self.index(rect.top + r, rect.left + c);
                self.values[i] = new_values[r * w + c];
            }
        }
        Ok(())
    }

    pub fn row_sum(&self, row: usize) -> f64 {
        let start = row * self.influences.len();
        self.values[start..start + self.influences.len()].iter().sum()
    }

    pub fn is_row_locked(&self, row: usize) -> bool {
        self.locked_row[row]
    }

    pub fn is_column_locked(&self, column: usize) -> bool {
        self.locked_column[column]
    }

    pub fn is_locked(&self, row: usize, column: usize) -> bool {
        self.locked_row[row] || self.locked_column[column]
    }

    pub fn lock_rows(&mut self, rows: &[usize], locked: bool) {
        for &r in rows {
            if r < self.locked_row.len() {
                self.locked_row[r] = locked;
            }
        }
    }

    pub fn lock_columns(&mut self, columns: &[usize], locked: bool) {
        for &c in columns {
            if c < self.locked_column.len() {
                self.locked_column[c] = locked;
            }
        }
    }

    pub fn locked_rows(&self) -> &[bool] {
        &self.locked_row
    }

    pub fn set_locked_rows(&mut self, flags: Vec<bool>) -> bool {
        if flags.len() != self.locked_row.len() {
            return false;
        }
        self.locked_row = flags;
        true
    }

    pub fn soft_on(&self) -> bool {
        self.soft_on
    }

    pub fn row_weight(&self, row: usize) -> f64 {
        self.row_weight[row]
    }

    /// Install soft-selection falloff weights. Vertices absent from `weights`
    /// keep 1.0 (fully selected).
    pub fn set_soft_selection(&mut self, weights: &[(u32, f64)]) {
        self.row_weight = vec![1.0; self.vertices.len()];
        for &(vertex, w) in weights {
            if let Some(row) = self.row_of(vertex) {
                self.row_weight[row] = w.max(0.0).min(1.0);
            }
        }
        self.soft_on = true;
    }

    pub fn clear_soft_selection(&mut self) {
        self.row_weight.iter_mut().for_each(|w| *w = 1.0);
        self.soft_on = false;
    }

    /// Rows whose values in `columns` are all (near) zero. Used by the UI to
    /// find vertices untouched by a set of influences.
    pub fn zero_rows(&self, columns: &[usize]) -> Vec<usize> {
        (0..self.row_count())
            .filter(|&row| {
                columns
                    .iter()
                    .all(|&c| c >= self.column_count() || self.value(row, c).abs() <= EPS_WEIGHT)
            })
            .collect()
    }
}
