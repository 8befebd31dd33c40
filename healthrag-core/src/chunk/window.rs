//! Sliding word-window splitter

use std::ops::Range;

use crate::config::ChunkConfig;

/// Word ranges `[start, end)` covering `word_count` words.
///
/// Each window is `max_tokens` words except possibly the last; consecutive
/// windows share exactly `overlap` words. Zero words yield no windows.
pub fn window_spans(word_count: usize, config: &ChunkConfig) -> Vec<Range<usize>> {
    let mut spans = Vec::new();
    let mut start = 0;

    while start < word_count {
        let end = (start + config.max_tokens).min(word_count);
        spans.push(start..end);
        if end == word_count {
            break;
        }
        start = end - config.overlap;
    }

    spans
}

/// Split cleaned text into word windows joined by single spaces
pub fn chunk_words(text: &str, config: &ChunkConfig) -> Vec<String> {
    let words: Vec<&str> = text.split_whitespace().collect();
    window_spans(words.len(), config)
        .into_iter()
        .map(|span| words[span].join(" "))
        .collect()
}

/// Number of windows for `word_count` words, without materializing them
pub fn expected_chunk_count(word_count: usize, config: &ChunkConfig) -> usize {
    if word_count == 0 {
        0
    } else if word_count <= config.max_tokens {
        1
    } else {
        (word_count - config.max_tokens).div_ceil(config.stride()) + 1
    }
}
