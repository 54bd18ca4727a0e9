pub mod model;
pub mod tolerance;
pub mod matrix;
pub mod mask;
pub mod adjacency;
pub mod algorithms {
    pub mod absolute;
    pub mod normalize;
    pub mod prune;
    pub mod redistribute;
    pub mod smooth;
}
pub mod commit;
pub mod maps;
pub mod session;
pub mod store;

pub use adjacency::VertexAdjacency;
pub use algorithms::absolute::AddOptions;
pub use algorithms::normalize::NormalizeOutcome;
pub use commit::{CommitDelta, CommitLog, UndoError};
pub use maps::WeightMap;
pub use mask::{SelectionError, SelectionMask};
pub use matrix::WeightMatrix;
pub use model::{Influence, Rect};
pub use session::{EditorSession, SessionError, SessionRegistry};
pub use store::{FaceTopology, MemoryStore, StoreError, WeightStore};
