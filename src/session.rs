use crate::adjacency::VertexAdjacency;
use crate::algorithms::{absolute, normalize, prune, smooth};
use crate::commit::{CommitLog, UndoError, WriteBatch};
use crate::maps::{self, MapError, WeightMap};
use crate::mask::{SelectionError, SelectionMask};
use crate::matrix::WeightMatrix;
use crate::model::{Influence, Rect};
use crate::store::{StoreError, WeightStore};
use std::collections::HashMap;
use std::fmt;

pub use crate::algorithms::absolute::AddOptions;

#[derive(Debug)]
pub enum SessionError {
    Selection(SelectionError),
    Undo(UndoError),
    Store(StoreError),
    Map(MapError),
    /// An operation needing a prepared selection ran before `prepare`.
    NoSelection,
    /// The store returned a snapshot whose shape does not match what it
    /// advertised (vertex or influence count).
    BadSnapshot,
}

impl fmt::Display for SessionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionError::Selection(e) => write!(f, "selection: {}", e),
            SessionError::Undo(e) => write!(f, "undo: {}", e),
            SessionError::Store(e) => write!(f, "store: {}", e),
            SessionError::Map(e) => write!(f, "weight map: {}", e),
            SessionError::NoSelection => f.write_str("no selection prepared"),
            SessionError::BadSnapshot => f.write_str("backing snapshot shape mismatch"),
        }
    }
}

impl std::error::Error for SessionError {}

impl From<SelectionError> for SessionError {
    fn from(e: SelectionError) -> Self {
        SessionError::Selection(e)
    }
}

impl From<UndoError> for SessionError {
    fn from(e: UndoError) -> Self {
        SessionError::Undo(e)
    }
}

impl From<StoreError> for SessionError {
    fn from(e: StoreError) -> Self {
        SessionError::Store(e)
    }
}

impl From<MapError> for SessionError {
    fn from(e: MapError) -> Self {
        SessionError::Map(e)
    }
}

/// One editing session over one deformer: the loaded weight matrix, the
/// pending selection mask, the commit log, and the cached adjacency. The
/// session exclusively owns its matrix; the host UI guarantees at most one
/// live session per deformer.
///
/// Nothing reaches the backing store before a commit succeeds; a store
/// failure aborts the pending edit and leaves the matrix in its pre-edit
/// state.
pub struct EditorSession<S: WeightStore> {
    name: String,
    store: S,
    matrix: WeightMatrix,
    mask: Option<SelectionMask>,
    log: CommitLog,
    adjacency: Option<(u64, VertexAdjacency)>,
}

impl<S: WeightStore> EditorSession<S> {
    /// Load weights and lock flags for `vertices` (the current selection,
    /// possibly the full mesh) from the store.
    pub fn open(name: impl Into<String>, store: S, vertices: Vec<u32>) -> Result<Self, SessionError> {
        let mut session = EditorSession {
            name: name.into(),
            store,
            matrix: WeightMatrix::new(Vec::new(), Vec::new(), Vec::new())
                .ok_or(SessionError::BadSnapshot)?,
            mask: None,
            log: CommitLog::new(),
            adjacency: None,
        };
        session.load(vertices)?;
        Ok(session)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn matrix(&self) -> &WeightMatrix {
        &self.matrix
    }

    pub fn mask(&self) -> Option<&SelectionMask> {
        self.mask.as_ref()
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    fn load(&mut self, vertices: Vec<u32>) -> Result<(), SessionError> {
        let influences: Vec<Influence> = self
            .store
            .influences()?
            .into_iter()
            .map(|(name, attribute)| Influence::new(name, attribute))
            .collect();
        let attributes: Vec<String> = influences.iter().map(|i| i.attribute.clone()).collect();
        let values = self.store.read_weights(&vertices, &attributes)?;
        let locks = self.store.read_lock_flags(&vertices)?;
        let soft = (self.matrix.soft_on()).then(|| {
            vertices
                .iter()
                .filter_map(|&v| self.matrix.row_of(v).map(|r| (v, self.matrix.row_weight(r))))
                .collect::<Vec<_>>()
        });
        let mut matrix =
            WeightMatrix::new(vertices, influences, values).ok_or(SessionError::BadSnapshot)?;
        if !matrix.set_locked_rows(locks) {
            return Err(SessionError::BadSnapshot);
        }
        if let Some(soft) = soft {
            matrix.set_soft_selection(&soft);
        }
        self.matrix = matrix;
        self.mask = None;
        Ok(())
    }

    /// Re-read the snapshot. A store reporting a different influence set
    /// than the loaded one triggers a full reload rather than a partial
    /// patch.
    pub fn refresh(&mut self) -> Result<(), SessionError> {
        let current: Vec<(String, String)> = self
            .matrix
            .influences()
            .iter()
            .map(|i| (i.name.clone(), i.attribute.clone()))
            .collect();
        let fresh = self.store.influences()?;
        let vertices = self.matrix.vertices().to_vec();
        if fresh != current {
            return self.load(vertices);
        }
        let attributes: Vec<String> = current.into_iter().map(|(_, a)| a).collect();
        let values = self.store.read_weights(&vertices, &attributes)?;
        let locks = self.store.read_lock_flags(&vertices)?;
        if !self.matrix.set_values(values) || !self.matrix.set_locked_rows(locks) {
            return Err(SessionError::BadSnapshot);
        }
        // the re-read lock flags may differ from what the mask was built on
        self.mask = None;
        Ok(())
    }

    /// Derive the edit masks for the coming operation. An empty rect list
    /// means the whole matrix, matching the editor's select-all fallback.
    pub fn prepare(&mut self, rects: &[Rect]) -> Result<(), SessionError> {
        let rects: Vec<Rect> = if rects.is_empty() {
            Rect::full(self.matrix.row_count(), self.matrix.column_count())
                .into_iter()
                .collect()
        } else {
            rects.to_vec()
        };
        self.mask = Some(SelectionMask::compute(&rects, &self.matrix)?);
        Ok(())
    }

    pub fn set_soft_selection(&mut self, weights: &[(u32, f64)]) {
        self.matrix.set_soft_selection(weights);
    }

    pub fn clear_soft_selection(&mut self) {
        self.matrix.clear_soft_selection();
    }

    /// Persist per-vertex lock flags to the store and mirror them locally.
    /// Any prepared mask is dropped; the next operation re-derives it against
    /// the new lock state.
    pub fn lock_rows(&mut self, rows: &[usize], locked: bool) -> Result<(), SessionError> {
        let vertices: Vec<u32> = rows
            .iter()
            .filter(|&&r| r < self.matrix.row_count())
            .map(|&r| self.matrix.vertex_at(r))
            .collect();
        let flags = vec![locked; vertices.len()];
        self.store.write_lock_flags(&vertices, &flags)?;
        self.matrix.lock_rows(rows, locked);
        self.mask = None;
        Ok(())
    }

    /// Influence locks are editor state, not persisted on the host. Drops
    /// any prepared mask, same as `lock_rows`.
    pub fn lock_columns(&mut self, columns: &[usize], locked: bool) {
        self.matrix.lock_columns(columns, locked);
        self.mask = None;
    }

    // ---- operations ----------------------------------------------------

    pub fn absolute_set(&mut self, value: f64) -> Result<(), SessionError> {
        let mask = self.mask.as_ref().ok_or(SessionError::NoSelection)?;
        let new_values = absolute::absolute_set(&self.matrix, mask, value);
        self.apply(new_values)
    }

    pub fn additive_set(&mut self, delta: f64, options: &AddOptions) -> Result<(), SessionError> {
        let mask = self.mask.as_ref().ok_or(SessionError::NoSelection)?;
        let new_values = absolute::additive_set(&self.matrix, mask, delta, options);
        self.apply(new_values)
    }

    /// Blend the selection toward its mean (the "Average" button).
    pub fn average(&mut self, blend: f64) -> Result<(), SessionError> {
        self.additive_set(
            blend,
            &AddOptions {
                average: true,
                ..AddOptions::default()
            },
        )
    }

    pub fn prune(&mut self, threshold: f64) -> Result<(), SessionError> {
        let new_values = prune::prune(&self.matrix, threshold);
        self.apply(new_values)
    }

    /// Returns the rows that could not be normalized (zero editable mass),
    /// for the UI to surface as a warning.
    pub fn normalize(&mut self) -> Result<Vec<usize>, SessionError> {
        let mask = self.mask.as_ref().ok_or(SessionError::NoSelection)?;
        let outcome = normalize::normalize(&self.matrix, mask);
        self.apply(outcome.values)?;
        Ok(outcome.not_normalizable)
    }

    pub fn smooth(&mut self, repeat: usize, percent_mvt: f64) -> Result<(), SessionError> {
        self.refresh_adjacency()?;
        let mask = self.mask.as_ref().ok_or(SessionError::NoSelection)?;
        let new_values = smooth::smooth(
            &self.matrix,
            mask,
            cached_adjacency(&self.adjacency),
            repeat,
            percent_mvt,
        );
        self.apply(new_values)
    }

    pub fn reassign_locally(&mut self) -> Result<(), SessionError> {
        self.refresh_adjacency()?;
        let mask = self.mask.as_ref().ok_or(SessionError::NoSelection)?;
        let new_values =
            smooth::reassign_locally(&self.matrix, mask, cached_adjacency(&self.adjacency));
        self.apply(new_values)
    }

    /// Vertices whose weight for some influence is isolated from all their
    /// neighbors by more than `tolerance`.
    pub fn problem_vertices(&mut self, tolerance: f64) -> Result<Vec<u32>, SessionError> {
        self.refresh_adjacency()?;
        Ok(smooth::fix_around_vertices(
            &self.matrix,
            cached_adjacency(&self.adjacency),
            tolerance,
        ))
    }

    pub fn export_map(&self, column: usize) -> Result<WeightMap, SessionError> {
        Ok(maps::export_column(&self.matrix, &self.name, column)?)
    }

    pub fn import_map(&mut self, map: &WeightMap, column: usize) -> Result<(), SessionError> {
        let new_values = maps::import_column(&self.matrix, map, column)?;
        self.apply(new_values)
    }

    // ---- interactive edit capture --------------------------------------

    /// Open a capture session for incremental writes (a brush drag). All
    /// writes until `commit_edit` accumulate into one delta.
    pub fn begin_edit(&mut self) -> Result<(), SessionError> {
        self.log.begin_edit()?;
        Ok(())
    }

    /// Write one cell inside an open capture. The matrix reflects the
    /// in-progress value immediately; the store is untouched until commit.
    /// Locked cells are skipped, the same soft veto the batch operations
    /// apply.
    pub fn set_cell(&mut self, row: usize, column: usize, value: f64) -> Result<(), SessionError> {
        if self.matrix.is_locked(row, column) {
            return Ok(());
        }
        let old = self.matrix.value(row, column);
        self.log
            .record(column, self.matrix.vertex_at(row), old, value)?;
        self.matrix.set_value(row, column, value);
        Ok(())
    }

    /// Finalize the capture: push the new values to the store inside one
    /// host undo chunk, then log the delta. On store failure the in-memory
    /// matrix is rolled back and nothing is logged.
    pub fn commit_edit(&mut self) -> Result<(), SessionError> {
        let capture = self.log.take_capture()?;
        if capture.is_empty() {
            return Ok(());
        }
        let originals = capture.originals();
        let delta = capture.into_delta(self.matrix.influences());

        self.store.begin_undo_chunk();
        let result = self.write_batches_to_store(&delta.apply_batches());
        self.store.end_undo_chunk();

        match result {
            Ok(()) => {
                self.log.push(delta);
                Ok(())
            }
            Err(e) => {
                for (column, vertex, old) in originals {
                    if let Some(row) = self.matrix.row_of(vertex) {
                        self.matrix.set_value(row, column, old);
                    }
                }
                Err(SessionError::Store(e))
            }
        }
    }

    /// Drop the open capture and restore the matrix to its pre-edit state.
    pub fn abort_edit(&mut self) {
        for (column, vertex, old) in self.log.abort_edit() {
            if let Some(row) = self.matrix.row_of(vertex) {
                self.matrix.set_value(row, column, old);
            }
        }
    }

    // ---- undo / redo ---------------------------------------------------

    pub fn undo(&mut self) -> Result<(), SessionError> {
        let batches = self.log.stage_undo()?;
        self.apply_batches(&batches)?;
        self.log.finish_undo();
        Ok(())
    }

    pub fn redo(&mut self) -> Result<(), SessionError> {
        let batches = self.log.stage_redo()?;
        self.apply_batches(&batches)?;
        self.log.finish_redo();
        Ok(())
    }

    pub fn undo_depth(&self) -> usize {
        self.log.depth()
    }

    // ---- internals -----------------------------------------------------

    /// Diff `new_values` against the matrix and commit the difference as
    /// one delta.
    fn apply(&mut self, new_values: Vec<f64>) -> Result<(), SessionError> {
        self.begin_edit()?;
        let columns = self.matrix.column_count();
        for row in 0..self.matrix.row_count() {
            for col in 0..columns {
                let new = new_values[row * columns + col];
                if new != self.matrix.value(row, col) {
                    self.set_cell(row, col, new)?;
                }
            }
        }
        self.commit_edit()
    }

    fn write_batches_to_store(&mut self, batches: &[WriteBatch]) -> Result<(), StoreError> {
        for batch in batches {
            self.store
                .write_weights_batch(&batch.attribute, &batch.values)?;
        }
        Ok(())
    }

    fn apply_batches(&mut self, batches: &[WriteBatch]) -> Result<(), SessionError> {
        self.store.begin_undo_chunk();
        let result = self.write_batches_to_store(batches);
        self.store.end_undo_chunk();
        result?;
        for batch in batches {
            for &(vertex, value) in &batch.values {
                if let Some(row) = self.matrix.row_of(vertex) {
                    self.matrix.set_value(row, batch.column, value);
                }
            }
        }
        Ok(())
    }

    fn refresh_adjacency(&mut self) -> Result<(), SessionError> {
        let version = self.store.topology_version();
        let fresh = matches!(&self.adjacency, Some((v, _)) if *v == version);
        if !fresh {
            let topology = self.store.read_adjacency_source()?;
            let adjacency = VertexAdjacency::build(
                topology.vertex_count,
                &topology.face_counts,
                &topology.face_vertices,
            );
            self.adjacency = Some((version, adjacency));
        }
        Ok(())
    }
}

fn cached_adjacency(slot: &Option<(u64, VertexAdjacency)>) -> &VertexAdjacency {
    match slot {
        Some((_, adjacency)) => adjacency,
        None => unreachable!("adjacency refreshed before use"),
    }
}

/// Sessions live in a registry keyed by deformer name; callers find or
/// create rather than reaching for a process-wide global.
pub struct SessionRegistry<S: WeightStore> {
    sessions: HashMap<String, EditorSession<S>>,
}

impl<S: WeightStore> Default for SessionRegistry<S> {
    fn default() -> Self {
        SessionRegistry {
            sessions: HashMap::new(),
        }
    }
}

impl<S: WeightStore> SessionRegistry<S> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Find the session for `name` or create it from `create`'s store and
    /// vertex selection.
    pub fn acquire<F>(&mut self, name: &str, create: F) -> Result<&mut EditorSession<S>, SessionError>
    where
        F: FnOnce() -> (S, Vec<u32>),
    {
        if !self.sessions.contains_key(name) {
            let (store, vertices) = create();
            let session = EditorSession::open(name, store, vertices)?;
            self.sessions.insert(name.to_string(), session);
        }
        match self.sessions.get_mut(name) {
            Some(session) => Ok(session),
            None => unreachable!("session inserted above"),
        }
    }

    pub fn get(&self, name: &str) -> Option<&EditorSession<S>> {
        self.sessions.get(name)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut EditorSession<S>> {
        self.sessions.get_mut(name)
    }

    pub fn release(&mut self, name: &str) -> bool {
        self.sessions.remove(name).is_some()
    }

    /// Smallest free "{prefix}{n}" starting at 1, for hosts that want
    /// auto-numbered session names.
    pub fn next_name(&self, prefix: &str) -> String {
        let mut n = 1usize;
        loop {
            let candidate = format!("{}{}", prefix, n);
            if !self.sessions.contains_key(&candidate) {
                return candidate;
            }
            n += 1;
        }
    }

    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.sessions.keys().map(|s| s.as_str()).collect();
        names.sort_unstable();
        names
    }
}
