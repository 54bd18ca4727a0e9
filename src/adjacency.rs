/// Mesh vertex adjacency from face topology. Two vertices are neighbors iff
/// they co-occur on at least one face.
///
/// Built once per topology change; weight edits never invalidate it. Using a
/// stale adjacency after the face or vertex count changed is the caller's
/// bug, guarded by a topology-version check at the call site.
#[derive(Clone, Debug)]
pub struct VertexAdjacency {
    offsets: Vec<usize>, // vertex -> start of its slice in `neighbors`
    neighbors: Vec<u32>,
    max_degree: usize,
}

impl VertexAdjacency {
    /// `face_counts[f]` is the vertex count of face `f`; `face_vertices` is
    /// the concatenated per-face vertex index lists (the host mesh API
    /// shape). Indices >= `vertex_count` are ignored.
    pub fn build(vertex_count: usize, face_counts: &[u32], face_vertices: &[u32]) -> VertexAdjacency {
        let mut per_vertex: Vec<Vec<u32>> = vec![Vec::new(); vertex_count];
        let mut cursor = 0usize;
        for &count in face_counts {
            let count = count as usize;
            if cursor + count > face_vertices.len() {
                break;
            }
            let face = &face_vertices[cursor..cursor + count];
            for (i, &v) in face.iter().enumerate() {
                if (v as usize) >= vertex_count {
                    continue;
                }
                for (j, &w) in face.iter().enumerate() {
                    if i != j && (w as usize) < vertex_count {
                        per_vertex[v as usize].push(w);
                    }
                }
            }
            cursor += count;
        }

        let mut offsets = Vec::with_capacity(vertex_count + 1);
        let mut neighbors = Vec::new();
        let mut max_degree = 0usize;
        offsets.push(0);
        for list in per_vertex.iter_mut() {
            list.sort_unstable();
            list.dedup();
            max_degree = max_degree.max(list.len());
            neighbors.extend_from_slice(list);
            offsets.push(neighbors.len());
        }

        VertexAdjacency {
            offsets,
            neighbors,
            max_degree,
        }
    }

    pub fn vertex_count(&self) -> usize {
        self.offsets.len().saturating_sub(1)
    }

    pub fn neighbors(&self, vertex: u32) -> &[u32] {
        let v = vertex as usize;
        if v + 1 >= self.offsets.len() {
            return &[];
        }
        &self.neighbors[self.offsets[v]..self.offsets[v + 1]]
    }

    pub fn degree(&self, vertex: u32) -> usize {
        self.neighbors(vertex).len()
    }

    /// Maximum neighbor count across all vertices; sizes the fixed-width
    /// working buffer the smoothing loop reuses.
    pub fn max_degree(&self) -> usize {
        self.max_degree
    }
}
