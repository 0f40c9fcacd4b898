use rag_base::structs::search_result::SearchResult;
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
pub struct SearchRequest {
    pub query: String,
    /// Top-K; configured default when absent.
    pub limit: Option<usize>,
    /// Minimum similarity (exclusive); configured default when absent.
    pub threshold: Option<f32>,
}

#[derive(Debug, Serialize)]
pub struct SearchResponse {
    pub results: Vec<SearchResult>,
}
