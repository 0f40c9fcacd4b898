//! Fixed-size character chunker with overlap.
//!
//! Windows are counted in Unicode scalar values, so a code point is never
//! split. Consecutive windows share `overlap` characters; only the last
//! window may be shorter than `size`.

use crate::errors::rag_base_error::RagBaseError;
use crate::structs::rag_base_config::ChunkConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextChunker {
    size: usize,
    overlap: usize,
}

impl TextChunker {
    /// # Errors
    /// `InvalidConfig` when `size == 0` or `overlap >= size`.
    pub fn new(size: usize, overlap: usize) -> Result<Self, RagBaseError> {
        if size == 0 {
            return Err(RagBaseError::InvalidConfig(
                "chunk size must be > 0".into(),
            ));
        }
        if overlap >= size {
            return Err(RagBaseError::InvalidConfig(format!(
                "chunk overlap ({overlap}) must be smaller than chunk size ({size})"
            )));
        }
        Ok(Self { size, overlap })
    }

    pub fn from_config(cfg: &ChunkConfig) -> Result<Self, RagBaseError> {
        Self::new(cfg.size, cfg.overlap)
    }

    /// Splits trimmed `text` into overlapping windows.
    ///
    /// # Errors
    /// `NoExtractableText` when `text` is empty or whitespace-only.
    pub fn split(&self, text: &str) -> Result<Vec<String>, RagBaseError> {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Err(RagBaseError::NoExtractableText);
        }

        // Byte offset of every char plus the end, so windows slice on boundaries.
        let bounds: Vec<usize> = trimmed
            .char_indices()
            .map(|(i, _)| i)
            .chain(std::iter::once(trimmed.len()))
            .collect();
        let n = bounds.len() - 1;
        let step = self.size - self.overlap;

        let mut out = Vec::with_capacity(n / step + 1);
        let mut start = 0usize;
        loop {
            let end = (start + self.size).min(n);
            out.push(trimmed[bounds[start]..bounds[end]].to_string());
            if end == n {
                break;
            }
            start += step;
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    /// Inverse of `split`: drop the shared prefix of every later chunk.
    fn rebuild(chunks: &[String], overlap: usize) -> String {
        let mut out = String::new();
        for (i, c) in chunks.iter().enumerate() {
            if i == 0 {
                out.push_str(c);
            } else {
                out.extend(c.chars().skip(overlap));
            }
        }
        out
    }

    #[test]
    fn rejects_bad_config() {
        assert!(TextChunker::new(0, 0).is_err());
        assert!(TextChunker::new(10, 10).is_err());
        assert!(TextChunker::new(10, 11).is_err());
        assert!(TextChunker::new(10, 9).is_ok());
    }

    #[test]
    fn whitespace_only_has_no_text() {
        let c = TextChunker::new(100, 20).unwrap();
        assert!(matches!(c.split("  \n\t "), Err(RagBaseError::NoExtractableText)));
        assert!(matches!(c.split(""), Err(RagBaseError::NoExtractableText)));
    }

    #[test]
    fn short_text_is_one_trimmed_chunk() {
        let c = TextChunker::new(100, 20).unwrap();
        let chunks = c.split("  Our return policy allows 30 days.  ").unwrap();
        assert_eq!(chunks, vec!["Our return policy allows 30 days.".to_string()]);
    }

    #[test]
    fn windows_advance_by_size_minus_overlap() {
        let c = TextChunker::new(4, 1).unwrap();
        let chunks = c.split("abcdefghij").unwrap();
        assert_eq!(chunks, vec!["abcd", "defg", "ghij"]);
    }

    #[test]
    fn no_tail_window_made_only_of_overlap() {
        // 8 chars, step 3: windows end at 5 then 8; a third window would be pure overlap.
        let c = TextChunker::new(5, 2).unwrap();
        let chunks = c.split("abcdefgh").unwrap();
        assert_eq!(chunks, vec!["abcde", "defgh"]);
    }

    #[test]
    fn multibyte_chars_are_not_split() {
        let c = TextChunker::new(3, 1).unwrap();
        let chunks = c.split("héllo wörld").unwrap();
        assert!(chunks.iter().all(|s| s.chars().count() <= 3));
        assert_eq!(rebuild(&chunks, 1), "héllo wörld");
    }

    proptest! {
        #[test]
        fn split_then_rebuild_is_identity(
            text in "\\PC{0,400}",
            size in 1usize..64,
            overlap_seed in 0usize..64,
        ) {
            let overlap = overlap_seed % size;
            let chunker = TextChunker::new(size, overlap).unwrap();
            let trimmed = text.trim();

            match chunker.split(&text) {
                Err(RagBaseError::NoExtractableText) => prop_assert!(trimmed.is_empty()),
                Err(e) => prop_assert!(false, "unexpected error: {e}"),
                Ok(chunks) => {
                    prop_assert!(!chunks.is_empty());
                    prop_assert!(chunks.iter().all(|c| c.chars().count() <= size));
                    for c in &chunks[..chunks.len() - 1] {
                        prop_assert_eq!(c.chars().count(), size);
                    }
                    for c in chunks.iter().skip(1) {
                        prop_assert!(c.chars().count() > overlap);
                    }
                    prop_assert_eq!(rebuild(&chunks, overlap), trimmed);
                }
            }
        }
    }
}
