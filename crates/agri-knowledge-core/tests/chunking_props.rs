//! Property tests for word-window chunking.

use agri_knowledge_core::chunk::{ChunkConfig, Chunker};
use proptest::prelude::*;

/// A chunk config with `overlap < chunk_size`.
fn arb_config() -> impl Strategy<Value = ChunkConfig> {
    (1usize..40)
        .prop_flat_map(|size| (Just(size), 0..size))
        .prop_map(|(size, overlap)| ChunkConfig::new(size, overlap).unwrap())
}

fn arb_words() -> impl Strategy<Value = Vec<String>> {
    proptest::collection::vec("[a-z]{1,6}", 0..300)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    #[test]
    fn chunk_count_matches_formula(config in arb_config(), words in arb_words()) {
        let chunks = Chunker::new(config).chunk(&words.join(" "));
        let n = words.len();
        let size = config.chunk_size();
        let expected = if n == 0 {
            0
        } else if n <= size {
            1
        } else {
            (n - config.overlap()).div_ceil(config.stride())
        };
        prop_assert_eq!(chunks.len(), expected);
    }

    #[test]
    fn all_but_last_chunk_are_full(config in arb_config(), words in arb_words()) {
        let chunks = Chunker::new(config).chunk(&words.join(" "));
        if chunks.len() > 1 {
            for chunk in &chunks[..chunks.len() - 1] {
                prop_assert_eq!(chunk.split_whitespace().count(), config.chunk_size());
            }
            let last = chunks[chunks.len() - 1].split_whitespace().count();
            prop_assert_eq!(last, words.len() - (chunks.len() - 1) * config.stride());
        }
    }

    #[test]
    fn consecutive_chunks_share_overlap(config in arb_config(), words in arb_words()) {
        let chunks = Chunker::new(config).chunk(&words.join(" "));
        for pair in chunks.windows(2) {
            let prev: Vec<&str> = pair[0].split_whitespace().collect();
            let next: Vec<&str> = pair[1].split_whitespace().collect();
            let k = config.overlap();
            prop_assert_eq!(&prev[prev.len() - k..], &next[..k]);
        }
    }

    #[test]
    fn chunks_cover_every_word_in_order(config in arb_config(), words in arb_words()) {
        let chunks = Chunker::new(config).chunk(&words.join(" "));
        let mut rebuilt: Vec<String> = Vec::new();
        for (i, chunk) in chunks.iter().enumerate() {
            let skip = if i == 0 { 0 } else { config.overlap() };
            rebuilt.extend(chunk.split_whitespace().skip(skip).map(str::to_string));
        }
        prop_assert_eq!(rebuilt, words);
    }
}
