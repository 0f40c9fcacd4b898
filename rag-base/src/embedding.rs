//! Embedding seam: provider trait, hosted implementation and batch validation.

use std::{future::Future, pin::Pin};

use ai_llm_service::service_profiles::LlmServiceProfiles;
use tracing::debug;

use crate::errors::rag_base_error::RagBaseError;

/// Provider interface for batched embedding generation.
///
/// Implement this trait to plug in another backend (or a fake in tests).
/// Output must be parallel to `inputs`.
pub trait EmbeddingsProvider: Send + Sync {
    fn embed_batch<'a>(
        &'a self,
        inputs: &'a [String],
    ) -> Pin<Box<dyn Future<Output = Result<Vec<Vec<f32>>, RagBaseError>> + Send + 'a>>;
}

impl EmbeddingsProvider for LlmServiceProfiles {
    fn embed_batch<'a>(
        &'a self,
        inputs: &'a [String],
    ) -> Pin<Box<dyn Future<Output = Result<Vec<Vec<f32>>, RagBaseError>> + Send + 'a>> {
        Box::pin(async move {
            LlmServiceProfiles::embed_batch(self, inputs)
                .await
                .map_err(|e| RagBaseError::EmbeddingFailed(e.to_string()))
        })
    }
}

/// Newlines hurt embedding quality for some models; collapse them to spaces.
pub fn prepare_embedding_input(text: &str) -> String {
    text.replace("\r\n", " ").replace(['\n', '\r'], " ")
}

/// Embeds `texts` and checks count and dimension.
///
/// Empty input returns empty output without calling the provider.
///
/// # Errors
/// `EmbeddingFailed` on provider failure, count mismatch or wrong dimension.
pub async fn embed_texts(
    provider: &dyn EmbeddingsProvider,
    texts: &[String],
    dim: usize,
) -> Result<Vec<Vec<f32>>, RagBaseError> {
    if texts.is_empty() {
        return Ok(Vec::new());
    }

    let inputs: Vec<String> = texts.iter().map(|t| prepare_embedding_input(t)).collect();
    let vectors = provider.embed_batch(&inputs).await?;

    if vectors.len() != texts.len() {
        return Err(RagBaseError::EmbeddingFailed(format!(
            "expected {} embeddings, got {}",
            texts.len(),
            vectors.len()
        )));
    }
    if let Some((i, v)) = vectors.iter().enumerate().find(|(_, v)| v.len() != dim) {
        return Err(RagBaseError::EmbeddingFailed(format!(
            "embedding #{i} has dimension {}, expected {dim}",
            v.len()
        )));
    }

    debug!(target: "rag_base::embedding", batch = texts.len(), dim, "embedded batch");
    Ok(vectors)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Deterministic fake: one dimension per letter bucket, counting inputs seen.
    pub(crate) struct FakeEmbedder {
        pub dim: usize,
        pub seen: Mutex<Vec<String>>,
    }

    impl FakeEmbedder {
        pub fn new(dim: usize) -> Self {
            Self {
                dim,
                seen: Mutex::new(Vec::new()),
            }
        }
    }

    impl EmbeddingsProvider for FakeEmbedder {
        fn embed_batch<'a>(
            &'a self,
            inputs: &'a [String],
        ) -> Pin<Box<dyn Future<Output = Result<Vec<Vec<f32>>, RagBaseError>> + Send + 'a>>
        {
            Box::pin(async move {
                self.seen.lock().unwrap().extend(inputs.iter().cloned());
                Ok(inputs
                    .iter()
                    .map(|t| {
                        let mut v = vec![0.0f32; self.dim];
                        for c in t.to_lowercase().chars().filter(|c| c.is_alphanumeric()) {
                            v[(c as usize) % self.dim] += 1.0;
                        }
                        v
                    })
                    .collect())
            })
        }
    }

    struct WrongDim;

    impl EmbeddingsProvider for WrongDim {
        fn embed_batch<'a>(
            &'a self,
            inputs: &'a [String],
        ) -> Pin<Box<dyn Future<Output = Result<Vec<Vec<f32>>, RagBaseError>> + Send + 'a>>
        {
            Box::pin(async move { Ok(inputs.iter().map(|_| vec![1.0, 2.0]).collect()) })
        }
    }

    #[test]
    fn newlines_become_spaces() {
        assert_eq!(prepare_embedding_input("a\nb\r\nc"), "a b c");
    }

    #[tokio::test]
    async fn output_is_parallel_and_sanitized() {
        let fake = FakeEmbedder::new(8);
        let texts = vec!["one\ntwo".to_string(), "three".to_string()];
        let out = embed_texts(&fake, &texts, 8).await.unwrap();
        assert_eq!(out.len(), 2);
        assert_eq!(fake.seen.lock().unwrap()[0], "one two");
    }

    #[tokio::test]
    async fn empty_batch_skips_provider() {
        let fake = FakeEmbedder::new(8);
        assert!(embed_texts(&fake, &[], 8).await.unwrap().is_empty());
        assert!(fake.seen.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn wrong_dimension_is_rejected() {
        let err = embed_texts(&WrongDim, &["x".to_string()], 768)
            .await
            .unwrap_err();
        assert!(matches!(err, RagBaseError::EmbeddingFailed(_)));
        assert!(err.to_string().starts_with("embedding generation failed"));
    }
}
