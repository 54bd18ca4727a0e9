use crate::model::Influence;
use std::collections::HashMap;
use std::fmt;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UndoError {
    /// `undo()` called twice without an intervening `redo()`, or with
    /// nothing left to undo.
    DoubleUndo,
    /// `redo()` called out of sequence.
    DoubleRedo,
    /// Undo/redo requested while an edit capture is open, or `begin_edit`
    /// called twice. The two states are mutually exclusive.
    EditInProgress,
    /// A write or commit arrived with no open capture.
    NoOpenEdit,
}

impl fmt::Display for UndoError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let msg = match self {
            UndoError::DoubleUndo => "nothing to undo (double undo)",
            UndoError::DoubleRedo => "nothing to redo (double redo)",
            UndoError::EditInProgress => "an edit capture is open",
            UndoError::NoOpenEdit => "no edit capture is open",
        };
        f.write_str(msg)
    }
}

impl std::error::Error for UndoError {}

/// One batch of per-vertex writes against a single backing attribute.
/// The grouping mirrors how the host applies values attribute-by-attribute;
/// semantically the delta is still one flat list of cells.
#[derive(Clone, Debug, PartialEq)]
pub struct DeltaGroup {
    pub attribute: String,
    pub column: usize,
    /// (vertex, old value, new value)
    pub cells: Vec<(u32, f64, f64)>,
}

/// One side of a delta, ready to write: the attribute and its per-vertex
/// values, plus the matrix column for mirroring the write in memory.
#[derive(Clone, Debug, PartialEq)]
pub struct WriteBatch {
    pub column: usize,
    pub attribute: String,
    pub values: Vec<(u32, f64)>,
}

/// Immutable committed edit. `undo()`/`redo()` return the write batches to
/// apply (old side / new side) and track application state so out-of-order
/// calls fail without touching anything.
#[derive(Clone, Debug)]
pub struct CommitDelta {
    groups: Vec<DeltaGroup>,
    applied: bool,
}

impl CommitDelta {
    pub fn groups(&self) -> &[DeltaGroup] {
        &self.groups
    }

    pub fn is_applied(&self) -> bool {
        self.applied
    }

    /// Write batches carrying the old values. Errors with `DoubleUndo` when
    /// the delta is already undone.
    pub fn undo(&mut self) -> Result<Vec<WriteBatch>, UndoError> {
        if !self.applied {
            return Err(UndoError::DoubleUndo);
        }
        self.applied = false;
        Ok(self.old_batches())
    }

    /// The old-value side without flipping state.
    pub fn old_batches(&self) -> Vec<WriteBatch> {
        self.batches(|&(vertex, old, _)| (vertex, old))
    }

    /// Write batches carrying the new values.
    pub fn redo(&mut self) -> Result<Vec<WriteBatch>, UndoError> {
        if self.applied {
            return Err(UndoError::DoubleRedo);
        }
        self.applied = true;
        Ok(self.batches(|&(vertex, _, new)| (vertex, new)))
    }

    /// The new-value side without flipping state, for the initial commit
    /// write.
    pub fn apply_batches(&self) -> Vec<WriteBatch> {
        self.batches(|&(vertex, _, new)| (vertex, new))
    }

    fn batches<F>(&self, pick: F) -> Vec<WriteBatch>
    where
        F: Fn(&(u32, f64, f64)) -> (u32, f64),
    {
        self.groups
            .iter()
            .map(|g| WriteBatch {
                column: g.column,
                attribute: g.attribute.clone(),
                values: g.cells.iter().map(&pick).collect(),
            })
            .collect()
    }
}

/// Open capture session. Every write routed through the session records a
/// (column, vertex, old, new) cell; the first write per cell wins for the
/// old value, later writes keep updating the new value.
#[derive(Debug, Default)]
pub struct EditCapture {
    cells: HashMap<(usize, u32), (f64, f64)>,
    order: Vec<(usize, u32)>,
}

impl EditCapture {
    pub fn record(&mut self, column: usize, vertex: u32, old: f64, new: f64) {
        match self.cells.get_mut(&(column, vertex)) {
            Some(cell) => cell.1 = new,
            None => {
                self.cells.insert((column, vertex), (old, new));
                self.order.push((column, vertex));
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Cells recorded so far with their pre-edit values, for rolling the
    /// in-memory matrix back when a commit fails.
    pub fn originals(&self) -> Vec<(usize, u32, f64)> {
        self.order
            .iter()
            .map(|key| {
                let (old, _) = self.cells[key];
                (key.0, key.1, old)
            })
            .collect()
    }

    /// Finalize into an immutable, already-applied delta, grouped by the
    /// backing attribute of each touched column.
    pub fn into_delta(self, influences: &[Influence]) -> CommitDelta {
        let mut groups: Vec<DeltaGroup> = Vec::new();
        let mut group_of: HashMap<usize, usize> = HashMap::new();
        for (column, vertex) in self.order {
            let (old, new) = self.cells[&(column, vertex)];
            let gi = *group_of.entry(column).or_insert_with(|| {
                let attribute = influences
                    .get(column)
                    .map(|i| i.attribute.clone())
                    .unwrap_or_default();
                groups.push(DeltaGroup {
                    attribute,
                    column,
                    cells: Vec::new(),
                });
                groups.len() - 1
            });
            groups[gi].cells.push((vertex, old, new));
        }
        CommitDelta {
            groups,
            applied: true,
        }
    }
}

/// Linear history of committed deltas plus the at-most-one open capture.
/// Committing after undos truncates the redo branch.
#[derive(Debug, Default)]
pub struct CommitLog {
    deltas: Vec<CommitDelta>,
    cursor: usize, // deltas[..cursor] are applied
    capture: Option<EditCapture>,
}

impl CommitLog {
    pub fn new() -> CommitLog {
        CommitLog::default()
    }

    pub fn begin_edit(&mut self) -> Result<(), UndoError> {
        if self.capture.is_some() {
            return Err(UndoError::EditInProgress);
        }
        self.capture = Some(EditCapture::default());
        Ok(())
    }

    pub fn edit_open(&self) -> bool {
        self.capture.is_some()
    }

    pub fn record(&mut self, column: usize, vertex: u32, old: f64, new: f64) -> Result<(), UndoError> {
        match self.capture.as_mut() {
            Some(capture) => {
                capture.record(column, vertex, old, new);
                Ok(())
            }
            None => Err(UndoError::NoOpenEdit),
        }
    }

    /// Close the capture without finalizing (store failure, user abort).
    /// Returns the pre-edit cell values for the caller to restore.
    pub fn abort_edit(&mut self) -> Vec<(usize, u32, f64)> {
        self.capture.take().map(|c| c.originals()).unwrap_or_default()
    }

    /// Finalize the open capture into a delta. The caller applies the new
    /// values to the backing store first and only then `push`es the delta;
    /// on store failure the delta is simply dropped.
    pub fn take_capture(&mut self) -> Result<EditCapture, UndoError> {
        self.capture.take().ok_or(UndoError::NoOpenEdit)
    }

    pub fn push(&mut self, delta: CommitDelta) {
        self.deltas.truncate(self.cursor);
        self.deltas.push(delta);
        self.cursor += 1;
    }

    /// Old-side batches for the next undo, leaving the log untouched. The
    /// caller writes them to the backing store and calls `finish_undo` only
    /// once the writes land, so a transient store failure leaves the undo
    /// retryable instead of stranding the cursor.
    pub fn stage_undo(&self) -> Result<Vec<WriteBatch>, UndoError> {
        if self.capture.is_some() {
            return Err(UndoError::EditInProgress);
        }
        if self.cursor == 0 {
            return Err(UndoError::DoubleUndo);
        }
        Ok(self.deltas[self.cursor - 1].old_batches())
    }

    /// Second half of a staged undo: flip the delta and move the cursor.
    pub fn finish_undo(&mut self) {
        if self.cursor > 0 && self.deltas[self.cursor - 1].applied {
            self.deltas[self.cursor - 1].applied = false;
            self.cursor -= 1;
        }
    }

    /// New-side batches for the next redo; pairs with `finish_redo`.
    pub fn stage_redo(&self) -> Result<Vec<WriteBatch>, UndoError> {
        if self.capture.is_some() {
            return Err(UndoError::EditInProgress);
        }
        if self.cursor == self.deltas.len() {
            return Err(UndoError::DoubleRedo);
        }
        Ok(self.deltas[self.cursor].apply_batches())
    }

    pub fn finish_redo(&mut self) {
        if self.cursor < self.deltas.len() && !self.deltas[self.cursor].applied {
            self.deltas[self.cursor].applied = true;
            self.cursor += 1;
        }
    }

    /// One-shot undo for callers with no fallible store in the loop.
    pub fn undo(&mut self) -> Result<Vec<WriteBatch>, UndoError> {
        let batches = self.stage_undo()?;
        self.finish_undo();
        Ok(batches)
    }

    pub fn redo(&mut self) -> Result<Vec<WriteBatch>, UndoError> {
        let batches = self.stage_redo()?;
        self.finish_redo();
        Ok(batches)
    }

    pub fn depth(&self) -> usize {
        self.cursor
    }

    pub fn len(&self) -> usize {
        self.deltas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.deltas.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn influences() -> Vec<Influence> {
        vec![
            Influence::new("jointA", "skin.w0"),
            Influence::new("jointB", "skin.w1"),
        ]
    }

    #[test]
    fn first_write_wins_for_old_value() {
        let mut capture = EditCapture::default();
        capture.record(0, 5, 0.4, 0.6);
        capture.record(0, 5, 0.6, 0.9);
        let delta = capture.into_delta(&influences());
        assert_eq!(delta.groups().len(), 1);
        assert_eq!(delta.groups()[0].cells, vec![(5, 0.4, 0.9)]);
    }

    #[test]
    fn cells_grouped_by_attribute() {
        let mut capture = EditCapture::default();
        capture.record(1, 0, 0.0, 0.2);
        capture.record(0, 0, 1.0, 0.8);
        capture.record(1, 2, 0.5, 0.3);
        let delta = capture.into_delta(&influences());
        assert_eq!(delta.groups().len(), 2);
        assert_eq!(delta.groups()[0].attribute, "skin.w1");
        assert_eq!(delta.groups()[0].cells.len(), 2);
        assert_eq!(delta.groups()[1].attribute, "skin.w0");
    }

    #[test]
    fn double_undo_rejected() {
        let mut log = CommitLog::new();
        log.begin_edit().unwrap();
        log.record(0, 0, 0.1, 0.9).unwrap();
        let delta = log.take_capture().unwrap().into_delta(&influences());
        log.push(delta);
        assert!(log.undo().is_ok());
        assert_eq!(log.undo(), Err(UndoError::DoubleUndo));
        assert!(log.redo().is_ok());
        assert_eq!(log.redo(), Err(UndoError::DoubleRedo));
    }

    #[test]
    fn undo_excluded_while_capture_open() {
        let mut log = CommitLog::new();
        log.begin_edit().unwrap();
        log.record(0, 0, 0.1, 0.9).unwrap();
        let delta = log.take_capture().unwrap().into_delta(&influences());
        log.push(delta);
        log.begin_edit().unwrap();
        assert_eq!(log.undo(), Err(UndoError::EditInProgress));
        assert_eq!(log.begin_edit(), Err(UndoError::EditInProgress));
        log.abort_edit();
        assert!(log.undo().is_ok());
    }

    #[test]
    fn staged_undo_moves_nothing_until_finished() {
        let mut log = CommitLog::new();
        log.begin_edit().unwrap();
        log.record(0, 0, 0.1, 0.9).unwrap();
        let delta = log.take_capture().unwrap().into_delta(&influences());
        log.push(delta);

        let batches = log.stage_undo().unwrap();
        assert_eq!(batches[0].values, vec![(0, 0.1)]);
        // staging alone is retryable: the cursor has not moved
        assert_eq!(log.depth(), 1);
        assert!(log.stage_undo().is_ok());

        log.finish_undo();
        assert_eq!(log.depth(), 0);
        assert_eq!(log.stage_undo(), Err(UndoError::DoubleUndo));

        assert_eq!(log.stage_redo().unwrap()[0].values, vec![(0, 0.9)]);
        assert_eq!(log.depth(), 0);
        log.finish_redo();
        assert_eq!(log.depth(), 1);
    }

    #[test]
    fn commit_truncates_redo_branch() {
        let mut log = CommitLog::new();
        for new in [0.2, 0.4] {
            log.begin_edit().unwrap();
            log.record(0, 0, 0.0, new).unwrap();
            let delta = log.take_capture().unwrap().into_delta(&influences());
            log.push(delta);
        }
        log.undo().unwrap();
        log.begin_edit().unwrap();
        log.record(0, 0, 0.2, 0.7).unwrap();
        let delta = log.take_capture().unwrap().into_delta(&influences());
        log.push(delta);
        assert_eq!(log.len(), 2);
        assert_eq!(log.redo(), Err(UndoError::DoubleRedo));
    }
}
