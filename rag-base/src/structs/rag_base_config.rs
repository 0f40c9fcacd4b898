//! Configuration layer: reads runtime settings from environment variables
//! and exposes strongly typed configs for chunking, embeddings, the vector
//! store and search.

use serde::{Deserialize, Serialize};

use crate::errors::rag_base_error::RagBaseError;

/// Which vector store backs the knowledge base.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    /// PostgreSQL with the pgvector extension.
    Pgvector,
    /// Process-local brute-force store (tests, local runs).
    Memory,
}

impl StoreBackend {
    /// Parse from env string (case-insensitive). Defaults to pgvector.
    fn parse(key: &str, s: Option<String>) -> Result<Self, RagBaseError> {
        match s {
            None => Ok(StoreBackend::Pgvector),
            Some(v) => match v.trim().to_lowercase().as_str() {
                "pgvector" | "postgres" | "neon" => Ok(StoreBackend::Pgvector),
                "memory" | "inmemory" => Ok(StoreBackend::Memory),
                _ => Err(RagBaseError::EnvParse {
                    key: key.into(),
                    value: v,
                }),
            },
        }
    }
}

/// Fixed-size chunking parameters (in characters).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkConfig {
    pub size: usize,
    pub overlap: usize,
}

impl Default for ChunkConfig {
    fn default() -> Self {
        Self {
            size: 100,
            overlap: 20,
        }
    }
}

/// Embedding vector dimensionality expected from the provider and the table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    /// e.g. 768 for `thenlper/gte-base`.
    pub dim: usize,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self { dim: 768 }
    }
}

/// Vector store connectivity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreConfig {
    pub backend: StoreBackend,
    /// Postgres connection string; required for pgvector.
    #[serde(skip_serializing)]
    pub database_url: Option<String>,
    pub max_connections: u32,
    /// Run `CREATE EXTENSION` / `CREATE TABLE IF NOT EXISTS` at startup.
    pub ensure_schema: bool,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::Pgvector,
            database_url: None,
            max_connections: 5,
            ensure_schema: true,
        }
    }
}

/// Search defaults for the direct RAG path and the knowledge-base tool.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SearchConfig {
    pub top_k: usize,
    /// Results must score strictly above this.
    pub min_similarity: f32,
    pub tool_top_k: usize,
    pub tool_min_similarity: f32,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            top_k: 5,
            min_similarity: 0.4,
            tool_top_k: 3,
            tool_min_similarity: 0.5,
        }
    }
}

/// Top-level runtime configuration for the RAG module.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RagConfig {
    pub chunk: ChunkConfig,
    pub embedding: EmbeddingConfig,
    pub store: StoreConfig,
    pub search: SearchConfig,
}

impl RagConfig {
    /// Build configuration from process environment variables.
    ///
    /// Environment variables used:
    /// - `VECTOR_STORE` (`pgvector` | `memory`; default: `pgvector`)
    /// - `DATABASE_URL`, falling back to `NEON_DATABASE_URL` (required for pgvector)
    /// - `DB_MAX_CONNECTIONS` (default: 5)
    /// - `DB_ENSURE_SCHEMA` (default: true)
    /// - `EMBEDDING_DIM` (default: 768)
    /// - `RAG_CHUNK_SIZE` (default: 100)
    /// - `RAG_CHUNK_OVERLAP` (default: 20)
    /// - `RAG_TOP_K` (default: 5)
    /// - `RAG_MIN_SIMILARITY` (default: 0.4)
    /// - `RAG_TOOL_TOP_K` (default: 3)
    /// - `RAG_TOOL_MIN_SIMILARITY` (default: 0.5)
    pub fn from_env() -> Result<Self, RagBaseError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`RagConfig::from_env`], reading values through `get`.
    pub fn from_lookup<F>(get: F) -> Result<Self, RagBaseError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| get(key).filter(|v| !v.trim().is_empty());
        let defaults = RagConfig::default();

        let store = StoreConfig {
            backend: StoreBackend::parse("VECTOR_STORE", var("VECTOR_STORE"))?,
            database_url: var("DATABASE_URL").or_else(|| var("NEON_DATABASE_URL")),
            max_connections: parse_or(
                "DB_MAX_CONNECTIONS",
                var("DB_MAX_CONNECTIONS"),
                defaults.store.max_connections,
            )?,
            ensure_schema: parse_or(
                "DB_ENSURE_SCHEMA",
                var("DB_ENSURE_SCHEMA"),
                defaults.store.ensure_schema,
            )?,
        };

        let chunk = ChunkConfig {
            size: parse_or("RAG_CHUNK_SIZE", var("RAG_CHUNK_SIZE"), defaults.chunk.size)?,
            overlap: parse_or(
                "RAG_CHUNK_OVERLAP",
                var("RAG_CHUNK_OVERLAP"),
                defaults.chunk.overlap,
            )?,
        };

        let embedding = EmbeddingConfig {
            dim: parse_or("EMBEDDING_DIM", var("EMBEDDING_DIM"), defaults.embedding.dim)?,
        };

        let search = SearchConfig {
            top_k: parse_or("RAG_TOP_K", var("RAG_TOP_K"), defaults.search.top_k)?,
            min_similarity: parse_or(
                "RAG_MIN_SIMILARITY",
                var("RAG_MIN_SIMILARITY"),
                defaults.search.min_similarity,
            )?,
            tool_top_k: parse_or(
                "RAG_TOOL_TOP_K",
                var("RAG_TOOL_TOP_K"),
                defaults.search.tool_top_k,
            )?,
            tool_min_similarity: parse_or(
                "RAG_TOOL_MIN_SIMILARITY",
                var("RAG_TOOL_MIN_SIMILARITY"),
                defaults.search.tool_min_similarity,
            )?,
        };

        let cfg = Self {
            chunk,
            embedding,
            store,
            search,
        };
        cfg.validate()?;
        Ok(cfg)
    }

    /// Basic validations shared by every constructor path.
    pub fn validate(&self) -> Result<(), RagBaseError> {
        if self.embedding.dim == 0 {
            return Err(RagBaseError::InvalidConfig(
                "EMBEDDING_DIM must be > 0".into(),
            ));
        }
        if self.chunk.size == 0 || self.chunk.overlap >= self.chunk.size {
            return Err(RagBaseError::InvalidConfig(format!(
                "chunk overlap ({}) must be smaller than chunk size ({})",
                self.chunk.overlap, self.chunk.size
            )));
        }
        for (key, value) in [
            ("RAG_MIN_SIMILARITY", self.search.min_similarity),
            ("RAG_TOOL_MIN_SIMILARITY", self.search.tool_min_similarity),
        ] {
            if !value.is_finite() {
                return Err(RagBaseError::InvalidConfig(format!(
                    "{key} must be a finite number, got {value}"
                )));
            }
        }
        if self.store.backend == StoreBackend::Pgvector && self.store.database_url.is_none() {
            return Err(RagBaseError::EnvMissing {
                key: "DATABASE_URL".into(),
            });
        }
        Ok(())
    }
}

/// Parse `value` or fall back to `default` when unset.
fn parse_or<T: std::str::FromStr>(
    key: &str,
    value: Option<String>,
    default: T,
) -> Result<T, RagBaseError> {
    match value {
        None => Ok(default),
        Some(v) => v.trim().parse::<T>().map_err(|_| RagBaseError::EnvParse {
            key: key.into(),
            value: v,
        }),
    }
}
