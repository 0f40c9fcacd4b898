//! Search pipeline: embed the query, rank stored chunks by cosine similarity.

use tracing::{debug, info};

use crate::embedding::{EmbeddingsProvider, embed_texts};
use crate::errors::rag_base_error::RagBaseError;
use crate::structs::search_result::SearchResult;
use crate::vector_db::VectorStore;

/// Embeds `query` and returns the top `limit` chunks scoring above `threshold`.
///
/// The store does the ranking; results are then normalized by
/// [`finalize_results`] so every backend honours the same contract.
///
/// # Errors
/// - `Validation` for an empty query
/// - `EmbeddingFailed` / `StorageFailed` from the collaborators
pub async fn search_documents(
    embedder: &dyn EmbeddingsProvider,
    store: &dyn VectorStore,
    dim: usize,
    query: &str,
    limit: usize,
    threshold: f32,
) -> Result<Vec<SearchResult>, RagBaseError> {
    let query = query.trim();
    if query.is_empty() {
        return Err(RagBaseError::Validation("query must not be empty".into()));
    }
    if limit == 0 {
        debug!(target: "rag_base::search", "limit is 0, skipping search");
        return Ok(Vec::new());
    }

    info!(
        target: "rag_base::search",
        query_len = query.len(),
        limit,
        threshold,
        backend = store.backend(),
        "search_documents: start"
    );

    let query_vec = embed_texts(embedder, &[query.to_string()], dim)
        .await?
        .into_iter()
        .next()
        .ok_or_else(|| RagBaseError::EmbeddingFailed("empty embedding response".into()))?;

    let hits = store.search_similar(&query_vec, limit, threshold).await?;
    let results = finalize_results(hits, limit, threshold);

    info!(
        target: "rag_base::search",
        results = results.len(),
        top = results.first().map(|r| r.similarity).unwrap_or(0.0),
        "search_documents: finished"
    );
    Ok(results)
}

/// Clamps similarity into `[0, 1]`, keeps `> threshold`, sorts descending
/// (stable, so equal scores keep store order) and truncates to `limit`.
pub fn finalize_results(
    mut hits: Vec<SearchResult>,
    limit: usize,
    threshold: f32,
) -> Vec<SearchResult> {
    for h in hits.iter_mut() {
        h.similarity = if h.similarity.is_nan() {
            0.0
        } else {
            h.similarity.clamp(0.0, 1.0)
        };
    }
    hits.retain(|h| h.similarity > threshold);
    hits.sort_by(|a, b| b.similarity.total_cmp(&a.similarity));
    hits.truncate(limit);
    hits
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::tests::FakeEmbedder;
    use crate::inmemory::InMemoryVectorStore;
    use crate::structs::document_chunk::DocumentChunk;
    use proptest::prelude::*;

    const DIM: usize = 64;

    async fn seeded(texts: &[&str]) -> (FakeEmbedder, InMemoryVectorStore) {
        let embedder = FakeEmbedder::new(DIM);
        let store = InMemoryVectorStore::new(DIM);
        let owned: Vec<String> = texts.iter().map(|t| t.to_string()).collect();
        let vectors = embed_texts(&embedder, &owned, DIM).await.unwrap();
        let chunks: Vec<DocumentChunk> = owned
            .into_iter()
            .zip(vectors)
            .map(|(content, embedding)| DocumentChunk { content, embedding })
            .collect();
        store.insert_chunks(&chunks).await.unwrap();
        (embedder, store)
    }

    #[tokio::test]
    async fn return_policy_scenario() {
        let (embedder, store) = seeded(&["Our return policy allows 30 days."]).await;
        let results = search_documents(&embedder, &store, DIM, "What is the return policy?", 5, 0.4)
            .await
            .unwrap();
        assert!(!results.is_empty());
        assert!(results[0].content.contains("30 days"));
        assert!(results[0].similarity > 0.4);
    }

    #[tokio::test]
    async fn exact_chunk_text_ranks_first() {
        let (embedder, store) = seeded(&["alpha beta", "zzzz qqqq", "gamma delta"]).await;
        let results = search_documents(&embedder, &store, DIM, "zzzz qqqq", 3, 0.0)
            .await
            .unwrap();
        assert_eq!(results[0].content, "zzzz qqqq");
        assert!((results[0].similarity - 1.0).abs() < 1e-5);
    }

    #[tokio::test]
    async fn empty_query_and_zero_limit() {
        let (embedder, store) = seeded(&["x"]).await;
        let err = search_documents(&embedder, &store, DIM, "   ", 5, 0.4)
            .await
            .unwrap_err();
        assert!(matches!(err, RagBaseError::Validation(_)));

        let seen_before = embedder.seen.lock().unwrap().len();
        let out = search_documents(&embedder, &store, DIM, "x", 0, 0.4)
            .await
            .unwrap();
        assert!(out.is_empty());
        assert_eq!(embedder.seen.lock().unwrap().len(), seen_before);
    }

    #[tokio::test]
    async fn empty_store_yields_no_results() {
        let embedder = FakeEmbedder::new(DIM);
        let store = InMemoryVectorStore::new(DIM);
        let out = search_documents(&embedder, &store, DIM, "anything", 5, 0.4)
            .await
            .unwrap();
        assert!(out.is_empty());
    }

    #[test]
    fn finalize_clamps_and_orders() {
        let hits = vec![
            SearchResult { id: 1, content: "a".into(), similarity: 0.45 },
            SearchResult { id: 2, content: "b".into(), similarity: 1.0000001 },
            SearchResult { id: 3, content: "c".into(), similarity: 0.4 },
            SearchResult { id: 4, content: "d".into(), similarity: 0.45 },
        ];
        let out = finalize_results(hits, 10, 0.4);
        let ids: Vec<i64> = out.iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![2, 1, 4]);
        assert_eq!(out[0].similarity, 1.0);
    }

    proptest! {
        #[test]
        fn finalized_results_honour_contract(
            scores in proptest::collection::vec(-1.5f32..1.5, 0..40),
            limit in 0usize..20,
            threshold in -0.5f32..1.0,
        ) {
            let hits: Vec<SearchResult> = scores
                .iter()
                .enumerate()
                .map(|(i, s)| SearchResult { id: i as i64, content: String::new(), similarity: *s })
                .collect();
            let out = finalize_results(hits, limit, threshold);

            prop_assert!(out.len() <= limit);
            for r in &out {
                prop_assert!((0.0..=1.0).contains(&r.similarity));
                prop_assert!(r.similarity > threshold);
            }
            for w in out.windows(2) {
                prop_assert!(w[0].similarity >= w[1].similarity);
            }
        }
    }
}
