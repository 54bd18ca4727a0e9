use crate::matrix::WeightMatrix;
use crate::model::Rect;
use std::fmt;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SelectionError {
    /// Rectangle malformed or outside the matrix. Checked before any
    /// mutation is applied.
    OutOfBounds {
        rect: Rect,
        rows: usize,
        columns: usize,
    },
    /// Value block does not match the rectangle it targets.
    ShapeMismatch { expected: usize, got: usize },
}

impl fmt::Display for SelectionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SelectionError::OutOfBounds { rect, rows, columns } => write!(
                f,
                "selection rows {}..={} cols {}..={} outside {}x{} matrix",
                rect.top, rect.bottom, rect.left, rect.right, rows, columns
            ),
            SelectionError::ShapeMismatch { expected, got } => {
                write!(f, "expected {} values, got {}", expected, got)
            }
        }
    }
}

impl std::error::Error for SelectionError {}

/// Boolean edit masks derived from a set of selection rectangles and the
/// current lock state. `editable` marks cells the pending operation may
/// write; `remaining` marks unlocked cells outside the selection that absorb
/// the redistribution keeping row sums at 1.0. Locked cells are in neither.
///
/// Ephemeral: recomputed per edit, never persisted.
#[derive(Clone, Debug)]
pub struct SelectionMask {
    rows: usize,
    columns: usize,
    editable: Vec<bool>,
    remaining: Vec<bool>,
    settable_per_row: Vec<usize>,
}

impl SelectionMask {
    pub fn compute(rects: &[Rect], matrix: &WeightMatrix) -> Result<SelectionMask, SelectionError> {
        let rows = matrix.row_count();
        let columns = matrix.column_count();
        for rect in rects {
            if !rect.fits(rows, columns) {
                return Err(SelectionError::OutOfBounds {
                    rect: *rect,
                    rows,
                    columns,
                });
            }
        }

        let mut in_union = vec![false; rows * columns];
        for rect in rects {
            for row in rect.top..=rect.bottom {
                for col in rect.left..=rect.right {
                    in_union[row * columns + col] = true;
                }
            }
        }

        let mut editable = vec![false; rows * columns];
        let mut remaining = vec![false; rows * columns];
        let mut settable_per_row = vec![0usize; rows];
        for row in 0..rows {
            for col in 0..columns {
                if matrix.is_locked(row, col) {
                    continue;
                }
                let i = row * columns + col;
                if in_union[i] {
                    editable[i] = true;
                    settable_per_row[row] += 1;
                } else {
                    remaining[i] = true;
                }
            }
        }

        Ok(SelectionMask {
            rows,
            columns,
            editable,
            remaining,
            settable_per_row,
        })
    }

    pub fn row_count(&self) -> usize {
        self.rows
    }

    pub fn column_count(&self) -> usize {
        self.columns
    }

    #[inline]
    pub fn editable(&self, row: usize, column: usize) -> bool {
        self.editable[row * self.columns + column]
    }

    #[inline]
    pub fn remaining(&self, row: usize, column: usize) -> bool {
        self.remaining[row * self.columns + column]
    }

    pub fn row_has_editable(&self, row: usize) -> bool {
        self.settable_per_row[row] > 0
    }

    /// Number of cells the pending operation may write in `row`.
    pub fn settable_in_row(&self, row: usize) -> usize {
        self.settable_per_row[row]
    }

    pub fn edited_rows(&self) -> Vec<usize> {
        (0..self.rows).filter(|&r| self.settable_per_row[r] > 0).collect()
    }

    pub fn edited_columns(&self) -> Vec<usize> {
        (0..self.columns)
            .filter(|&c| (0..self.rows).any(|r| self.editable[r * self.columns + c]))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Influence;

    fn matrix(rows: usize, cols: usize) -> WeightMatrix {
        let influences = (0..cols)
            .map(|i| Influence::new(format!("joint{}", i), format!("skin.w{}", i)))
            .collect();
        let per = 1.0 / cols as f64;
        WeightMatrix::new(
            (0..rows as u32).collect(),
            influences,
            vec![per; rows * cols],
        )
        .unwrap()
    }

    #[test]
    fn overlapping_rects_union() {
        let m = matrix(4, 3);
        let mask = SelectionMask::compute(
            &[Rect::new(0, 1, 0, 1), Rect::new(1, 2, 1, 2)],
            &m,
        )
        .unwrap();
        assert!(mask.editable(0, 0));
        assert!(mask.editable(1, 1)); // in both rects, counted once
        assert!(mask.editable(2, 2));
        assert!(!mask.editable(3, 0));
        assert!(mask.remaining(0, 2));
        assert!(mask.remaining(3, 1));
        assert_eq!(mask.settable_in_row(1), 3);
    }

    #[test]
    fn locks_belong_to_neither_mask() {
        let mut m = matrix(3, 3);
        m.lock_rows(&[1], true);
        m.lock_columns(&[2], true);
        let mask = SelectionMask::compute(&[Rect::new(0, 2, 0, 2)], &m).unwrap();
        for col in 0..3 {
            assert!(!mask.editable(1, col));
            assert!(!mask.remaining(1, col));
        }
        for row in 0..3 {
            assert!(!mask.editable(row, 2));
            assert!(!mask.remaining(row, 2));
        }
        assert!(!mask.row_has_editable(1));
        assert!(mask.row_has_editable(0));
    }

    #[test]
    fn out_of_bounds_rejected() {
        let m = matrix(2, 2);
        let err = SelectionMask::compute(&[Rect::new(0, 2, 0, 1)], &m).unwrap_err();
        assert!(matches!(err, SelectionError::OutOfBounds { .. }));
        // inverted rect is malformed too
        let err = SelectionMask::compute(&[Rect::new(1, 0, 0, 1)], &m).unwrap_err();
        assert!(matches!(err, SelectionError::OutOfBounds { .. }));
    }
}
