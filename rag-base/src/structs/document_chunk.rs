/// A chunk ready to be persisted: text plus its embedding.
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentChunk {
    pub content: String,
    pub embedding: Vec<f32>,
}

/// Outcome of ingesting one document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct IngestStats {
    /// Number of chunks produced and stored.
    pub chunks: usize,
    pub took_ms: u128,
}
