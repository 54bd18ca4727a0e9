use std::collections::HashMap;
use std::fmt;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StoreError {
    /// The backing node vanished mid-session (deleted, scene closed).
    Unavailable(String),
    UnknownAttribute(String),
    UnknownVertex(u32),
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::Unavailable(what) => write!(f, "backing store unavailable: {}", what),
            StoreError::UnknownAttribute(attr) => write!(f, "unknown attribute '{}'", attr),
            StoreError::UnknownVertex(v) => write!(f, "unknown vertex {}", v),
        }
    }
}

impl std::error::Error for StoreError {}

/// Face topology as the host mesh API reports it: per-face vertex counts
/// plus the concatenated per-face vertex index lists.
#[derive(Clone, Debug, Default)]
pub struct FaceTopology {
    pub vertex_count: usize,
    pub face_counts: Vec<u32>,
    pub face_vertices: Vec<u32>,
}

/// The engine's only external boundary: the host scene holding the real
/// weights. Reads and writes are synchronous and blocking; the engine calls
/// out only at load/commit time, never inside an edit operation.
pub trait WeightStore {
    /// Influence columns in host order, with their backing attribute keys.
    fn influences(&self) -> Result<Vec<(String, String)>, StoreError>;

    /// Bulk read, row-major over `vertices` × `attributes`.
    fn read_weights(&self, vertices: &[u32], attributes: &[String]) -> Result<Vec<f64>, StoreError>;

    fn write_weight(&mut self, attribute: &str, vertex: u32, value: f64) -> Result<(), StoreError>;

    /// Batched write against one (array or scalar) attribute. Hosts with a
    /// cheaper bulk path override this.
    fn write_weights_batch(
        &mut self,
        attribute: &str,
        values: &[(u32, f64)],
    ) -> Result<(), StoreError> {
        for &(vertex, value) in values {
            self.write_weight(attribute, vertex, value)?;
        }
        Ok(())
    }

    fn read_lock_flags(&self, vertices: &[u32]) -> Result<Vec<bool>, StoreError>;

    fn write_lock_flags(&mut self, vertices: &[u32], flags: &[bool]) -> Result<(), StoreError>;

    fn read_adjacency_source(&self) -> Result<FaceTopology, StoreError>;

    /// Bumped by the host whenever vertex/face topology changes. Weight
    /// edits do not bump it.
    fn topology_version(&self) -> u64;

    /// Bracket one user-visible action in a single host-level undo
    /// transaction. Default is a no-op for hosts without an undo stack.
    fn begin_undo_chunk(&mut self) {}
    fn end_undo_chunk(&mut self) {}
}

/// In-memory store: the test double standing in for the host scene.
/// Weights live in per-attribute column arrays indexed by vertex, matching
/// how the real host lays out one array attribute per influence.
#[derive(Clone, Debug, Default)]
pub struct MemoryStore {
    influences: Vec<(String, String)>, // (name, attribute)
    columns: HashMap<String, Vec<f64>>,
    locks: Vec<bool>,
    topology: FaceTopology,
    topology_version: u64,
    open_chunks: u32,
    /// Simulate the backing node disappearing mid-session.
    pub fail_writes: bool,
}

impl MemoryStore {
    /// `weights` is row-major vertices × influences.
    pub fn new(influence_names: &[&str], vertex_count: usize, weights: &[f64]) -> MemoryStore {
        let influences: Vec<(String, String)> = influence_names
            .iter()
            .map(|n| ((*n).to_string(), format!("skin.weights[{}]", n)))
            .collect();
        let mut columns = HashMap::new();
        for (col, (_, attribute)) in influences.iter().enumerate() {
            let column: Vec<f64> = (0..vertex_count)
                .map(|v| weights[v * influences.len() + col])
                .collect();
            columns.insert(attribute.clone(), column);
        }
        MemoryStore {
            influences,
            columns,
            locks: vec![false; vertex_count],
            topology: FaceTopology {
                vertex_count,
                ..Default::default()
            },
            topology_version: 1,
            open_chunks: 0,
            fail_writes: false,
        }
    }

    pub fn set_topology(&mut self, face_counts: Vec<u32>, face_vertices: Vec<u32>) {
        self.topology.face_counts = face_counts;
        self.topology.face_vertices = face_vertices;
        self.topology_version += 1;
    }

    /// Replace the influence set wholesale (a joint added or removed on the
    /// host side); existing columns for surviving influences are kept.
    pub fn reset_influences(&mut self, influence_names: &[&str]) {
        self.influences = influence_names
            .iter()
            .map(|n| ((*n).to_string(), format!("skin.weights[{}]", n)))
            .collect();
        let vertex_count = self.locks.len();
        for (_, attribute) in &self.influences {
            self.columns
                .entry(attribute.clone())
                .or_insert_with(|| vec![0.0; vertex_count]);
        }
    }

    pub fn chunk_balanced(&self) -> bool {
        self.open_chunks == 0
    }

    fn column(&self, attribute: &str) -> Result<&Vec<f64>, StoreError> {
        self.columns
            .get(attribute)
            .ok_or_else(|| StoreError::UnknownAttribute(attribute.to_string()))
    }
}

impl WeightStore for MemoryStore {
    fn influences(&self) -> Result<Vec<(String, String)>, StoreError> {
        Ok(self.influences.clone())
    }

    fn read_weights(&self, vertices: &[u32], attributes: &[String]) -> Result<Vec<f64>, StoreError> {
        let mut out = Vec::with_capacity(vertices.len() * attributes.len());
        for &vertex in vertices {
            for attribute in attributes {
                let column = self.column(attribute)?;
                let value = column
                    .get(vertex as usize)
                    .copied()
                    .ok_or(StoreError::UnknownVertex(vertex))?;
                out.push(value);
            }
        }
        Ok(out)
    }

    fn write_weight(&mut self, attribute: &str, vertex: u32, value: f64) -> Result<(), StoreError> {
        if self.fail_writes {
            return Err(StoreError::Unavailable("node deleted".to_string()));
        }
        let column = self
            .columns
            .get_mut(attribute)
            .ok_or_else(|| StoreError::UnknownAttribute(attribute.to_string()))?;
        let slot = column
            .get_mut(vertex as usize)
            .ok_or(StoreError::UnknownVertex(vertex))?;
        *slot = value;
        Ok(())
    }

    fn read_lock_flags(&self, vertices: &[u32]) -> Result<Vec<bool>, StoreError> {
        vertices
            .iter()
            .map(|&v| {
                self.locks
                    .get(v as usize)
                    .copied()
                    .ok_or(StoreError::UnknownVertex(v))
            })
            .collect()
    }

    fn write_lock_flags(&mut self, vertices: &[u32], flags: &[bool]) -> Result<(), StoreError> {
        if self.fail_writes {
            return Err(StoreError::Unavailable("node deleted".to_string()));
        }
        for (&v, &flag) in vertices.iter().zip(flags) {
            let slot = self
                .locks
                .get_mut(v as usize)
                .ok_or(StoreError::UnknownVertex(v))?;
            *slot = flag;
        }
        Ok(())
    }

    fn read_adjacency_source(&self) -> Result<FaceTopology, StoreError> {
        Ok(self.topology.clone())
    }

    fn topology_version(&self) -> u64 {
        self.topology_version
    }

    fn begin_undo_chunk(&mut self) {
        self.open_chunks += 1;
    }

    fn end_undo_chunk(&mut self) {
        self.open_chunks = self.open_chunks.saturating_sub(1);
    }
}
