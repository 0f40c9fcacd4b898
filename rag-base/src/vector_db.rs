//! pgvector (PostgreSQL) helpers: connection pool, schema bootstrap,
//! batched inserts and cosine top-K search.
//!
//! Table layout:
//! `documents(id BIGSERIAL, content TEXT, embedding vector(D), created_at TIMESTAMPTZ)`.
//!
//! Embeddings travel as pgvector text literals (`[0.1,0.2,...]`) cast with
//! `::vector`; similarity is `1 - (embedding <=> query)`.

use std::{future::Future, pin::Pin};

use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Postgres, QueryBuilder, Row};
use tracing::{debug, info};

use crate::errors::rag_base_error::RagBaseError;
use crate::structs::document_chunk::DocumentChunk;
use crate::structs::rag_base_config::StoreConfig;
use crate::structs::search_result::SearchResult;

/// Boxed future returned by [`VectorStore`] methods.
pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, RagBaseError>> + Send + 'a>>;

/// Storage backend for document chunks.
pub trait VectorStore: Send + Sync {
    /// Inserts all chunks as one batch; returns the number of rows written.
    fn insert_chunks<'a>(&'a self, chunks: &'a [DocumentChunk]) -> StoreFuture<'a, usize>;

    /// Rows with similarity strictly above `threshold`, most similar first, at most `limit`.
    fn search_similar<'a>(
        &'a self,
        embedding: &'a [f32],
        limit: usize,
        threshold: f32,
    ) -> StoreFuture<'a, Vec<SearchResult>>;

    /// Cheap liveness probe.
    fn ping(&self) -> StoreFuture<'_, ()>;

    /// Backend name for logs and health output.
    fn backend(&self) -> &'static str;
}

/// Rows per `INSERT` statement; keeps bind parameters under the Postgres limit.
const INSERT_ROWS_PER_STATEMENT: usize = 1000;

/// Rejects embeddings whose length differs from the table dimension.
pub(crate) fn check_dims(chunks: &[DocumentChunk], dim: usize) -> Result<(), RagBaseError> {
    match chunks.iter().position(|c| c.embedding.len() != dim) {
        Some(i) => Err(RagBaseError::EmbeddingFailed(format!(
            "chunk #{i} has dimension {}, expected {dim}",
            chunks[i].embedding.len()
        ))),
        None => Ok(()),
    }
}

/// Formats a vector as a pgvector literal.
pub fn vector_literal(v: &[f32]) -> String {
    let parts: Vec<String> = v.iter().map(|x| x.to_string()).collect();
    format!("[{}]", parts.join(","))
}

/// [`VectorStore`] backed by PostgreSQL with the pgvector extension.
pub struct PgVectorStore {
    pool: PgPool,
    dim: usize,
}

impl PgVectorStore {
    /// Opens a pool against `cfg.database_url`.
    ///
    /// # Errors
    /// `InvalidConfig` without a URL; `StorageFailed` if the pool cannot connect.
    pub async fn connect(cfg: &StoreConfig, dim: usize) -> Result<Self, RagBaseError> {
        let url = cfg
            .database_url
            .as_deref()
            .ok_or_else(|| RagBaseError::InvalidConfig("DATABASE_URL is not set".into()))?;

        let pool = PgPoolOptions::new()
            .max_connections(cfg.max_connections)
            .connect(url)
            .await?;

        info!(
            target: "rag_base::store",
            max_connections = cfg.max_connections,
            dim,
            "pgvector pool connected"
        );
        Ok(Self { pool, dim })
    }

    /// Creates the extension and the `documents` table if missing.
    pub async fn ensure_schema(&self) -> Result<(), RagBaseError> {
        sqlx::query("CREATE EXTENSION IF NOT EXISTS vector")
            .execute(&self.pool)
            .await?;

        let create_sql = format!(
            "CREATE TABLE IF NOT EXISTS documents (\
                id BIGSERIAL PRIMARY KEY, \
                content TEXT NOT NULL, \
                embedding vector({}) NOT NULL, \
                created_at TIMESTAMPTZ NOT NULL DEFAULT now()\
            )",
            self.dim
        );
        sqlx::query(&create_sql).execute(&self.pool).await?;

        info!(target: "rag_base::store", dim = self.dim, "schema ensured");
        Ok(())
    }

    async fn insert_all(&self, chunks: &[DocumentChunk]) -> Result<usize, RagBaseError> {
        if chunks.is_empty() {
            return Ok(0);
        }
        check_dims(chunks, self.dim)?;

        let mut tx = self.pool.begin().await?;
        for batch in chunks.chunks(INSERT_ROWS_PER_STATEMENT) {
            let mut qb: QueryBuilder<Postgres> =
                QueryBuilder::new("INSERT INTO documents (content, embedding) ");
            qb.push_values(batch, |mut row, chunk| {
                row.push_bind(chunk.content.as_str())
                    .push_bind(vector_literal(&chunk.embedding))
                    .push_unseparated("::vector");
            });
            qb.build().execute(&mut *tx).await?;
        }
        tx.commit().await?;

        debug!(target: "rag_base::store", rows = chunks.len(), "inserted chunks");
        Ok(chunks.len())
    }

    async fn search_rows(
        &self,
        embedding: &[f32],
        limit: usize,
        threshold: f32,
    ) -> Result<Vec<SearchResult>, RagBaseError> {
        if embedding.len() != self.dim {
            return Err(RagBaseError::EmbeddingFailed(format!(
                "query embedding has dimension {}, expected {}",
                embedding.len(),
                self.dim
            )));
        }

        let rows = sqlx::query(SEARCH_SQL)
        .bind(vector_literal(embedding))
        .bind(f64::from(threshold))
        .bind(i64::try_from(limit).unwrap_or(i64::MAX))
        .fetch_all(&self.pool)
        .await?;

        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            let similarity: f64 = row.try_get("similarity")?;
            out.push(SearchResult {
                id: row.try_get("id")?,
                content: row.try_get("content")?,
                similarity: similarity as f32,
            });
        }
        Ok(out)
    }
}

/// Cosine top-K above `$2`.
///
/// pgvector yields NaN distance for zero vectors and Postgres orders NaN
/// above every number, so those rows are excluded before `LIMIT`.
const SEARCH_SQL: &str = "SELECT id, content, \
        (1 - (embedding <=> $1::vector))::float8 AS similarity \
     FROM documents \
     WHERE (embedding <=> $1::vector) <> 'NaN'::float8 \
       AND 1 - (embedding <=> $1::vector) > $2 \
     ORDER BY similarity DESC \
     LIMIT $3";

impl VectorStore for PgVectorStore {
    fn insert_chunks<'a>(&'a self, chunks: &'a [DocumentChunk]) -> StoreFuture<'a, usize> {
        Box::pin(self.insert_all(chunks))
    }

    fn search_similar<'a>(
        &'a self,
        embedding: &'a [f32],
        limit: usize,
        threshold: f32,
    ) -> StoreFuture<'a, Vec<SearchResult>> {
        Box::pin(self.search_rows(embedding, limit, threshold))
    }

    fn ping(&self) -> StoreFuture<'_, ()> {
        Box::pin(async move {
            sqlx::query("SELECT 1").execute(&self.pool).await?;
            Ok(())
        })
    }

    fn backend(&self) -> &'static str {
        "pgvector"
    }
}
