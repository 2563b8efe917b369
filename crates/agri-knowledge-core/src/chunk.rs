//! Overlapping word-window text chunker.
//!
//! Splits normalized article text into windows of `chunk_size` words.
//! Consecutive windows share `overlap` words so that a sentence cut at a
//! window boundary still appears whole in one of the two neighbors.
//!
//! # Algorithm
//!
//! 1. Split the text on whitespace into words.
//! 2. No words: no chunks.
//! 3. At most `chunk_size` words: one chunk holding every word.
//! 4. Otherwise emit `words[start..start + chunk_size]`, advance `start`
//!    by `stride = chunk_size - overlap`, and stop after the window that
//!    reaches the last word.
//!
//! For `N > chunk_size` words this yields `ceil((N - overlap) / stride)`
//! chunks; every chunk but the last has exactly `chunk_size` words.
//!
//! # Example
//!
//! ```rust
//! use agri_knowledge_core::chunk::{ChunkConfig, Chunker};
//!
//! let chunker = Chunker::new(ChunkConfig::new(4, 1).unwrap());
//! let chunks = chunker.chunk("a b c d e f g");
//! assert_eq!(chunks, vec!["a b c d", "d e f g"]);
//! ```

use serde::{Deserialize, Serialize};

use crate::error::{KnowledgeError, Result};

/// Default window size in words.
pub const DEFAULT_CHUNK_SIZE: usize = 500;

/// Default number of words shared by consecutive windows.
pub const DEFAULT_OVERLAP: usize = 50;

/// Validated chunking parameters, both measured in words.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkConfig {
    chunk_size: usize,
    overlap: usize,
}

impl ChunkConfig {
    /// Validate and build a chunk configuration.
    ///
    /// # Errors
    ///
    /// Returns [`KnowledgeError::Config`] if `chunk_size == 0` or
    /// `overlap >= chunk_size` (the window would never advance).
    pub fn new(chunk_size: usize, overlap: usize) -> Result<Self> {
        if chunk_size == 0 {
            return Err(KnowledgeError::Config(
                "chunk_size must be greater than zero".to_string(),
            ));
        }
        if overlap >= chunk_size {
            return Err(KnowledgeError::Config(format!(
                "overlap ({}) must be less than chunk_size ({})",
                overlap, chunk_size
            )));
        }
        Ok(Self {
            chunk_size,
            overlap,
        })
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn overlap(&self) -> usize {
        self.overlap
    }

    /// Words the window advances between chunks. Always `>= 1`.
    pub fn stride(&self) -> usize {
        self.chunk_size - self.overlap
    }
}

impl Default for ChunkConfig {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            overlap: DEFAULT_OVERLAP,
        }
    }
}

/// Word-window chunker over a validated [`ChunkConfig`].
#[derive(Debug, Clone, Copy, Default)]
pub struct Chunker {
    config: ChunkConfig,
}

impl Chunker {
    pub fn new(config: ChunkConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> ChunkConfig {
        self.config
    }

    /// Split `text` into overlapping word windows, re-joined with single spaces.
    ///
    /// Returns an empty `Vec` for text with no words.
    pub fn chunk(&self, text: &str) -> Vec<String> {
        let words: Vec<&str> = text.split_whitespace().collect();
        if words.is_empty() {
            return Vec::new();
        }

        let size = self.config.chunk_size;
        if words.len() <= size {
            return vec![words.join(" ")];
        }

        let stride = self.config.stride();
        let mut chunks = Vec::new();
        let mut start = 0;

        while start < words.len() {
            let end = (start + size).min(words.len());
            chunks.push(words[start..end].join(" "));
            if end == words.len() {
                break;
            }
            start += stride;
        }

        chunks
    }
}

/// Chunk with explicit parameters, validating them first.
///
/// # Errors
///
/// Returns [`KnowledgeError::Config`] under the same conditions as
/// [`ChunkConfig::new`], before any chunk is produced.
pub fn chunk_words(text: &str, chunk_size: usize, overlap: usize) -> Result<Vec<String>> {
    let config = ChunkConfig::new(chunk_size, overlap)?;
    Ok(Chunker::new(config).chunk(text))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn words(n: usize) -> String {
        (0..n).map(|i| format!("w{}", i)).collect::<Vec<_>>().join(" ")
    }

    #[test]
    fn test_empty_text_no_chunks() {
        assert!(Chunker::default().chunk("").is_empty());
        assert!(Chunker::default().chunk("  \n\t ").is_empty());
    }

    #[test]
    fn test_short_text_single_chunk() {
        let chunks = Chunker::default().chunk("Rice  grows\nin paddies.");
        assert_eq!(chunks, vec!["Rice grows in paddies."]);
    }

    #[test]
    fn test_exactly_chunk_size_single_chunk() {
        let text = words(500);
        let chunks = Chunker::default().chunk(&text);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0], text);
    }

    #[test]
    fn test_650_words_two_chunks() {
        let chunks = Chunker::default().chunk(&words(650));
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].split_whitespace().count(), 500);
        assert_eq!(chunks[1].split_whitespace().count(), 200);
        assert!(chunks[1].starts_with("w450 "));
    }

    #[test]
    fn test_consecutive_chunks_share_overlap() {
        let chunker = Chunker::new(ChunkConfig::new(10, 3).unwrap());
        let chunks = chunker.chunk(&words(30));
        for pair in chunks.windows(2) {
            let prev: Vec<&str> = pair[0].split_whitespace().collect();
            let next: Vec<&str> = pair[1].split_whitespace().collect();
            assert_eq!(&prev[prev.len() - 3..], &next[..3]);
        }
    }

    #[test]
    fn test_no_trailing_overlap_only_chunk() {
        // 10 words, size 5, overlap 2: windows at 0 and 3 and 6 (6..10 reaches the end)
        let chunker = Chunker::new(ChunkConfig::new(5, 2).unwrap());
        let chunks = chunker.chunk(&words(10));
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[2], "w6 w7 w8 w9");
    }

    #[test]
    fn test_zero_overlap() {
        let chunks = chunk_words(&words(9), 3, 0).unwrap();
        assert_eq!(chunks, vec!["w0 w1 w2", "w3 w4 w5", "w6 w7 w8"]);
    }

    #[test]
    fn test_overlap_greater_than_size_rejected() {
        let err = chunk_words(&words(100), 10, 15).unwrap_err();
        assert!(matches!(err, KnowledgeError::Config(_)));
    }

    #[test]
    fn test_overlap_equal_to_size_rejected() {
        assert!(ChunkConfig::new(10, 10).is_err());
    }

    #[test]
    fn test_zero_size_rejected() {
        assert!(ChunkConfig::new(0, 0).is_err());
    }

    #[test]
    fn test_deterministic() {
        let text = words(1234);
        let chunker = Chunker::new(ChunkConfig::new(100, 10).unwrap());
        assert_eq!(chunker.chunk(&text), chunker.chunk(&text));
    }
}
