use serde::{Deserialize, Serialize};

/// A stored chunk ranked against a query.
///
/// Returned from the public search API and serialized to JSON for HTTP
/// responses and logging.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    /// Row id in the `documents` table.
    pub id: i64,

    /// Chunk text.
    pub content: String,

    /// Cosine similarity in `[0, 1]`, higher is closer.
    pub similarity: f32,
}
