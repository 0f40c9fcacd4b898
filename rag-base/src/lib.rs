//! Retrieval core for the chat backend.
//!
//! Public API:
//! - [`RagService::ingest_text`]: chunk → embed (one batch) → insert (one transaction).
//! - [`RagService::search`]: embed the query → cosine top-K above a threshold.
//! - [`RagService::from_config`]: wire the configured store with an embedder.

pub mod chunker;
pub mod embedding;
pub mod errors;
pub mod inmemory;
pub mod search;
pub mod structs;
pub mod vector_db;

use std::sync::Arc;
use std::time::Instant;

use tracing::info;

use chunker::TextChunker;
use embedding::{EmbeddingsProvider, embed_texts};
use errors::rag_base_error::RagBaseError;
use inmemory::InMemoryVectorStore;
use structs::document_chunk::{DocumentChunk, IngestStats};
use structs::rag_base_config::{RagConfig, StoreBackend};
use structs::search_result::SearchResult;
use vector_db::{PgVectorStore, VectorStore};

/// Knowledge base: chunker, embedder and vector store behind one handle.
///
/// Construct once and share via `Arc`; all methods take `&self`.
pub struct RagService {
    cfg: RagConfig,
    chunker: TextChunker,
    embedder: Arc<dyn EmbeddingsProvider>,
    store: Arc<dyn VectorStore>,
}

impl RagService {
    /// Assembles a service from already-built parts.
    pub fn new(
        cfg: RagConfig,
        embedder: Arc<dyn EmbeddingsProvider>,
        store: Arc<dyn VectorStore>,
    ) -> Result<Self, RagBaseError> {
        let chunker = TextChunker::from_config(&cfg.chunk)?;
        Ok(Self {
            cfg,
            chunker,
            embedder,
            store,
        })
    }

    /// Builds the configured store (connecting and bootstrapping pgvector if selected).
    pub async fn from_config(
        cfg: RagConfig,
        embedder: Arc<dyn EmbeddingsProvider>,
    ) -> Result<Self, RagBaseError> {
        let store: Arc<dyn VectorStore> = match cfg.store.backend {
            StoreBackend::Pgvector => {
                let pg = PgVectorStore::connect(&cfg.store, cfg.embedding.dim).await?;
                if cfg.store.ensure_schema {
                    pg.ensure_schema().await?;
                }
                Arc::new(pg)
            }
            StoreBackend::Memory => Arc::new(InMemoryVectorStore::new(cfg.embedding.dim)),
        };

        info!(
            target: "rag_base::index",
            backend = store.backend(),
            dim = cfg.embedding.dim,
            chunk_size = cfg.chunk.size,
            chunk_overlap = cfg.chunk.overlap,
            "rag service ready"
        );
        Self::new(cfg, embedder, store)
    }

    pub fn config(&self) -> &RagConfig {
        &self.cfg
    }

    /// Chunks, embeds and stores `text` as one self-contained batch.
    ///
    /// # Errors
    /// - `NoExtractableText` when `text` is blank
    /// - `EmbeddingFailed` / `StorageFailed` from the collaborators
    pub async fn ingest_text(&self, text: &str) -> Result<IngestStats, RagBaseError> {
        let started = Instant::now();
        let chunks = self.chunker.split(text)?;

        info!(
            target: "rag_base::index",
            chars = text.chars().count(),
            chunks = chunks.len(),
            "ingest_text: start"
        );

        let vectors = embed_texts(self.embedder.as_ref(), &chunks, self.cfg.embedding.dim).await?;
        let rows: Vec<DocumentChunk> = chunks
            .into_iter()
            .zip(vectors)
            .map(|(content, embedding)| DocumentChunk { content, embedding })
            .collect();

        let written = self.store.insert_chunks(&rows).await?;
        let stats = IngestStats {
            chunks: written,
            took_ms: started.elapsed().as_millis(),
        };

        info!(
            target: "rag_base::index",
            chunks = stats.chunks,
            took_ms = stats.took_ms,
            "ingest_text: finished"
        );
        Ok(stats)
    }

    /// Similarity search; `None` falls back to the configured top-K / threshold.
    pub async fn search(
        &self,
        query: &str,
        limit: Option<usize>,
        threshold: Option<f32>,
    ) -> Result<Vec<SearchResult>, RagBaseError> {
        search::search_documents(
            self.embedder.as_ref(),
            self.store.as_ref(),
            self.cfg.embedding.dim,
            query,
            limit.unwrap_or(self.cfg.search.top_k),
            threshold.unwrap_or(self.cfg.search.min_similarity),
        )
        .await
    }

    /// Store liveness.
    pub async fn ping(&self) -> Result<(), RagBaseError> {
        self.store.ping().await
    }

    pub fn backend(&self) -> &'static str {
        self.store.backend()
    }
}
