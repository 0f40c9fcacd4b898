//! Process-local vector store with brute-force cosine search.

use std::sync::atomic::{AtomicI64, Ordering};

use tokio::sync::RwLock;
use tracing::debug;

use crate::errors::rag_base_error::RagBaseError;
use crate::structs::document_chunk::DocumentChunk;
use crate::structs::search_result::SearchResult;
use crate::vector_db::{StoreFuture, VectorStore, check_dims};

struct StoredRow {
    id: i64,
    content: String,
    embedding: Vec<f32>,
}

/// [`VectorStore`] kept in memory; contents are lost on restart.
pub struct InMemoryVectorStore {
    rows: RwLock<Vec<StoredRow>>,
    next_id: AtomicI64,
    dim: usize,
}

impl InMemoryVectorStore {
    pub fn new(dim: usize) -> Self {
        Self {
            rows: RwLock::new(Vec::new()),
            next_id: AtomicI64::new(1),
            dim,
        }
    }

    pub async fn len(&self) -> usize {
        self.rows.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.rows.read().await.is_empty()
    }
}

/// Cosine similarity; zero vectors score 0.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let mut dot = 0.0f32;
    let mut na = 0.0f32;
    let mut nb = 0.0f32;
    for (x, y) in a.iter().zip(b) {
        dot += x * y;
        na += x * x;
        nb += y * y;
    }
    if na == 0.0 || nb == 0.0 {
        return 0.0;
    }
    dot / (na.sqrt() * nb.sqrt())
}

impl VectorStore for InMemoryVectorStore {
    fn insert_chunks<'a>(&'a self, chunks: &'a [DocumentChunk]) -> StoreFuture<'a, usize> {
        Box::pin(async move {
            check_dims(chunks, self.dim)?;
            let mut rows = self.rows.write().await;
            for chunk in chunks {
                rows.push(StoredRow {
                    id: self.next_id.fetch_add(1, Ordering::Relaxed),
                    content: chunk.content.clone(),
                    embedding: chunk.embedding.clone(),
                });
            }
            debug!(target: "rag_base::store", rows = chunks.len(), total = rows.len(), "inserted chunks (memory)");
            Ok(chunks.len())
        })
    }

    fn search_similar<'a>(
        &'a self,
        embedding: &'a [f32],
        limit: usize,
        threshold: f32,
    ) -> StoreFuture<'a, Vec<SearchResult>> {
        Box::pin(async move {
            if embedding.len() != self.dim {
                return Err(RagBaseError::EmbeddingFailed(format!(
                    "query embedding has dimension {}, expected {}",
                    embedding.len(),
                    self.dim
                )));
            }
            let rows = self.rows.read().await;
            let mut hits: Vec<SearchResult> = rows
                .iter()
                .map(|r| SearchResult {
                    id: r.id,
                    content: r.content.clone(),
                    similarity: cosine_similarity(&r.embedding, embedding),
                })
                .filter(|h| h.similarity > threshold)
                .collect();
            hits.sort_by(|a, b| b.similarity.total_cmp(&a.similarity));
            hits.truncate(limit);
            Ok(hits)
        })
    }

    fn ping(&self) -> StoreFuture<'_, ()> {
        Box::pin(async { Ok(()) })
    }

    fn backend(&self) -> &'static str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunk(content: &str, embedding: Vec<f32>) -> DocumentChunk {
        DocumentChunk {
            content: content.into(),
            embedding,
        }
    }

    #[test]
    fn cosine_basics() {
        assert!((cosine_similarity(&[1.0, 0.0], &[1.0, 0.0]) - 1.0).abs() < 1e-6);
        assert!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]).abs() < 1e-6);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 0.0]), 0.0);
    }

    #[tokio::test]
    async fn search_is_thresholded_sorted_and_limited() {
        let store = InMemoryVectorStore::new(2);
        store
            .insert_chunks(&[
                chunk("east", vec![1.0, 0.0]),
                chunk("north", vec![0.0, 1.0]),
                chunk("north-east", vec![1.0, 1.0]),
            ])
            .await
            .unwrap();
        assert_eq!(store.len().await, 3);

        let hits = store.search_similar(&[1.0, 0.1], 5, 0.5).await.unwrap();
        let names: Vec<&str> = hits.iter().map(|h| h.content.as_str()).collect();
        assert_eq!(names, vec!["east", "north-east"]);

        let hits = store.search_similar(&[1.0, 0.1], 1, 0.0).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, 1);
    }

    #[tokio::test]
    async fn wrong_dimension_is_not_stored() {
        let store = InMemoryVectorStore::new(3);
        assert!(store.insert_chunks(&[chunk("x", vec![1.0])]).await.is_err());
        assert!(store.is_empty().await);
    }
}
