use serde::{Deserialize, Serialize};

/// Inclusive rectangular cell selection: rows `top..=bottom`, columns
/// `left..=right`. Matches how the table UI reports selected chunks.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rect {
    pub top: usize,
    pub bottom: usize,
    pub left: usize,
    pub right: usize,
}

impl Rect {
    pub fn new(top: usize, bottom: usize, left: usize, right: usize) -> Rect {
        Rect {
            top,
            bottom,
            left,
            right,
        }
    }

    /// Whole-matrix selection. `None` when the matrix is empty.
    pub fn full(rows: usize, columns: usize) -> Option<Rect> {
        if rows == 0 || columns == 0 {
            return None;
        }
        Some(Rect {
            top: 0,
            bottom: rows - 1,
            left: 0,
            right: columns - 1,
        })
    }

    pub fn contains(&self, row: usize, column: usize) -> bool {
        row >= self.top && row <= self.bottom && column >= self.left && column <= self.right
    }

    /// Well-formed and inside a rows×columns matrix.
    pub fn fits(&self, rows: usize, columns: usize) -> bool {
        self.top <= self.bottom
            && self.left <= self.right
            && self.bottom < rows
            && self.right < columns
    }
}

/// One influence column: display name plus the backing attribute its
/// weights are written to (one array attribute per influence on the host).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Influence {
    pub name: String,
    pub attribute: String,
}

impl Influence {
    pub fn new(name: impl Into<String>, attribute: impl Into<String>) -> Influence {
        Influence {
            name: name.into(),
            attribute: attribute.into(),
        }
    }
}
