// SPDX-FileCopyrightText: 2026 Rafiq Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Word-accumulating text chunker with token-window overlap.
//!
//! Token counts are estimated as `len / 4`, which tracks the tokenizer
//! closely enough for window sizing on mixed Arabic/English text.

/// Estimated token count for a text.
pub fn count_tokens(text: &str) -> usize {
    text.len() / 4
}

/// Splits text into chunks of roughly `max_tokens`, carrying
/// `overlap_tokens` of trailing words into the next chunk.
pub fn chunk_text(text: &str, max_tokens: usize, overlap_tokens: usize) -> Vec<String> {
    let words: Vec<&str> = text.split_whitespace().collect();
    if words.is_empty() {
        return Vec::new();
    }

    let mut chunks = Vec::new();
    let mut current: Vec<&str> = Vec::new();
    let mut current_tokens = 0usize;

    for word in words {
        let word_tokens = count_tokens(word) + 1;
        if current_tokens + word_tokens > max_tokens && !current.is_empty() {
            chunks.push(current.join(" "));
            // Keep the overlap tail.
            let mut overlap: Vec<&str> = Vec::new();
            let mut overlap_count = 0usize;
            for w in current.iter().rev() {
                let wt = count_tokens(w) + 1;
                if overlap_count + wt > overlap_tokens {
                    break;
                }
                overlap.insert(0, w);
                overlap_count += wt;
            }
            current = overlap;
            current_tokens = overlap_count;
        }
        current.push(word);
        current_tokens += word_tokens;
    }

    if !current.is_empty() {
        chunks.push(current.join(" "));
    }
    chunks
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_text_is_one_chunk() {
        let chunks = chunk_text("a short note about pumps", 1500, 150);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0], "a short note about pumps");
    }

    #[test]
    fn empty_text_yields_no_chunks() {
        assert!(chunk_text("", 1500, 150).is_empty());
        assert!(chunk_text("   \n  ", 1500, 150).is_empty());
    }

    #[test]
    fn long_text_splits_with_overlap() {
        // ~50 tokens per sentence; a 40-token window forces splits.
        let text = "irrigation pump maintenance schedule ".repeat(40);
        let chunks = chunk_text(&text, 40, 10);
        assert!(chunks.len() > 1, "expected multiple chunks");

        // Consecutive chunks share the overlap words.
        let tail: Vec<&str> = chunks[0].split_whitespace().rev().take(2).collect();
        for word in tail {
            assert!(chunks[1].contains(word));
        }
    }

    #[test]
    fn every_word_survives_chunking() {
        let text = (0..200).map(|i| format!("word{i}")).collect::<Vec<_>>().join(" ");
        let chunks = chunk_text(&text, 60, 10);
        let joined = chunks.join(" ");
        for i in 0..200 {
            assert!(joined.contains(&format!("word{i}")));
        }
    }
}
