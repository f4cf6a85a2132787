//! Token-window chunker.
//!
//! One token is one run of non-whitespace characters (a word). Chunks are
//! windows of `target_tokens` words that advance by `target_tokens - overlap_tokens`
//! words, so consecutive chunks share `overlap_tokens` words. Each chunk's text
//! is the exact source slice between its byte offsets.

use shopdesk_core::config::IngestConfig;
use shopdesk_core::error::{Result, ShopDeskError};
use shopdesk_core::types::Chunk;

/// Chunker configuration.
#[derive(Debug, Clone, Copy)]
pub struct ChunkerConfig {
    pub target_tokens: usize,
    pub overlap_tokens: usize,
}

impl Default for ChunkerConfig {
    fn default() -> Self {
        Self {
            target_tokens: 500,
            overlap_tokens: 50,
        }
    }
}

impl From<&IngestConfig> for ChunkerConfig {
    fn from(cfg: &IngestConfig) -> Self {
        Self {
            target_tokens: cfg.target_tokens,
            overlap_tokens: cfg.overlap_tokens,
        }
    }
}

impl ChunkerConfig {
    pub fn validate(&self) -> Result<()> {
        if self.target_tokens == 0 {
            return Err(ShopDeskError::Config("target_tokens must be > 0".into()));
        }
        Ok(())
    }

    /// Words the window advances by; never below one.
    pub fn stride(&self) -> usize {
        self.target_tokens
            .saturating_sub(self.overlap_tokens)
            .max(1)
    }

    pub fn chunk(&self, text: &str) -> Vec<Chunk> {
        chunk(text, self.target_tokens, self.overlap_tokens)
    }
}

/// Byte spans `[start, end)` of every word in `text`.
pub fn word_spans(text: &str) -> Vec<(usize, usize)> {
    let mut spans = Vec::new();
    let mut start = None;
    for (i, c) in text.char_indices() {
        match (c.is_whitespace(), start) {
            (true, Some(s)) => {
                spans.push((s, i));
                start = None;
            }
            (false, None) => start = Some(i),
            _ => {}
        }
    }
    if let Some(s) = start {
        spans.push((s, text.len()));
    }
    spans
}

/// Approximate token count (word count).
pub fn count_tokens(text: &str) -> usize {
    text.split_whitespace().count()
}

/// Split `text` into overlapping word windows.
///
/// `target_tokens == 0` yields no chunks; callers validate through [`ChunkerConfig`].
pub fn chunk(text: &str, target_tokens: usize, overlap_tokens: usize) -> Vec<Chunk> {
    let words = word_spans(text);
    if words.is_empty() || target_tokens == 0 {
        return vec![];
    }
    let stride = target_tokens.saturating_sub(overlap_tokens).max(1);

    let mut chunks = Vec::new();
    let mut first = 0;
    loop {
        let last = (first + target_tokens).min(words.len()) - 1;
        let (start, end) = (words[first].0, words[last].1);
        chunks.push(Chunk {
            text: text[start..end].to_string(),
            index: chunks.len(),
            start_offset: start,
            end_offset: end,
        });
        if last + 1 == words.len() {
            break;
        }
        first += stride;
    }
    chunks
}

#[cfg(test)]
mod tests {
    use super::*;

    fn words(n: usize) -> String {
        (0..n).map(|i| format!("w{i}")).collect::<Vec<_>>().join(" ")
    }

    #[test]
    fn test_empty_text() {
        assert!(chunk("", 500, 50).is_empty());
        assert!(chunk("   \n\t ", 500, 50).is_empty());
    }

    #[test]
    fn test_short_text_is_single_chunk() {
        let text = "  Returns are accepted within 30 days.  ";
        let chunks = chunk(text, 500, 50);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].text, "Returns are accepted within 30 days.");
        assert_eq!(chunks[0].index, 0);
        assert_eq!(&text[chunks[0].start_offset..chunks[0].end_offset], chunks[0].text);
    }

    #[test]
    fn test_ten_thousand_words() {
        let text = words(10_000);
        let chunks = chunk(&text, 500, 50);
        assert_eq!(chunks.len(), 23);
        for (i, c) in chunks.iter().enumerate() {
            assert_eq!(c.index, i);
            assert!(count_tokens(&c.text) <= 500);
        }
        assert!(chunks.last().unwrap().text.ends_with("w9999"));
    }

    #[test]
    fn test_overlap_shared_between_neighbours() {
        let text = words(30);
        let chunks = chunk(&text, 10, 3);
        // ceil((30 - 3) / 7) = 4
        assert_eq!(chunks.len(), 4);
        let first: Vec<&str> = chunks[0].text.split_whitespace().collect();
        let second: Vec<&str> = chunks[1].text.split_whitespace().collect();
        assert_eq!(&first[7..], &second[..3]);
        assert!(chunks[1].start_offset < chunks[0].end_offset);
    }

    #[test]
    fn test_no_gaps() {
        let text = words(1234);
        let chunks = chunk(&text, 100, 20);
        for pair in chunks.windows(2) {
            assert!(pair[1].start_offset <= pair[0].end_offset);
        }
        assert_eq!(chunks[0].start_offset, 0);
        assert_eq!(chunks.last().unwrap().end_offset, text.len());
    }

    #[test]
    fn test_overlap_clamped() {
        let text = words(5);
        let chunks = chunk(&text, 2, 5);
        // stride forced to 1
        assert_eq!(chunks.len(), 4);
    }

    #[test]
    fn test_multibyte_offsets() {
        let text = "trả hàng trong vòng 30 ngày";
        let chunks = chunk(text, 2, 0);
        assert_eq!(chunks[0].text, "trả hàng");
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks.last().unwrap().text, "30 ngày");
    }

    #[test]
    fn test_config_validate() {
        assert!(ChunkerConfig { target_tokens: 0, overlap_tokens: 0 }.validate().is_err());
        assert!(ChunkerConfig::default().validate().is_ok());
        assert_eq!(ChunkerConfig { target_tokens: 10, overlap_tokens: 20 }.stride(), 1);
    }
}
