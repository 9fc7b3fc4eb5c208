use crate::error::{DcprError, Result};
use std::collections::VecDeque;

/// Separators tried in order, coarsest first. The empty separator splits
/// between characters and always applies.
const SEPARATORS: [&str; 5] = ["\n\n", "\n", ". ", " ", ""];

/// Window configuration for splitting, lengths counted in characters
#[derive(Debug, Clone)]
pub struct SplitConfig {
    pub chunk_size: usize,
    pub chunk_overlap: usize,
}

impl Default for SplitConfig {
    fn default() -> Self {
        Self { chunk_size: 2000, chunk_overlap: 500 }
    }
}

/// Recursive character splitter producing overlapping windows
#[derive(Debug, Clone)]
pub struct TextSplitter {
    config: SplitConfig,
}

impl TextSplitter {
    pub fn new(config: SplitConfig) -> Result<Self> {
        if config.chunk_size == 0 {
            return Err(DcprError::ConfigInvalid {
                key: "chunk_size".to_string(),
                reason: "chunk_size must be greater than zero".to_string(),
            });
        }

        if config.chunk_overlap >= config.chunk_size {
            return Err(DcprError::ConfigInvalid {
                key: "chunk_overlap".to_string(),
                reason: format!(
                    "overlap ({}) must be less than chunk_size ({})",
                    config.chunk_overlap, config.chunk_size
                ),
            });
        }

        Ok(Self { config })
    }

    /// Split text into chunks of at most `chunk_size` characters
    pub fn split_text(&self, text: &str) -> Vec<String> {
        self.split_recursive(text, &SEPARATORS)
    }

    fn split_recursive(&self, text: &str, separators: &[&str]) -> Vec<String> {
        // First separator present in the text; "" always matches.
        let position = separators
            .iter()
            .position(|s| s.is_empty() || text.contains(s))
            .unwrap_or(separators.len().saturating_sub(1));
        let separator = separators.get(position).copied().unwrap_or("");
        let remaining = separators.get(position + 1..).unwrap_or(&[]);

        let splits: Vec<String> = if separator.is_empty() {
            text.chars().map(String::from).collect()
        } else {
            text.split(separator)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect()
        };

        let mut chunks = Vec::new();
        let mut pending = Vec::new();

        for split in splits {
            if char_len(&split) <= self.config.chunk_size {
                pending.push(split);
                continue;
            }

            if !pending.is_empty() {
                chunks.extend(self.merge_splits(&pending, separator));
                pending.clear();
            }

            if remaining.is_empty() {
                chunks.push(split);
            } else {
                chunks.extend(self.split_recursive(&split, remaining));
            }
        }

        if !pending.is_empty() {
            chunks.extend(self.merge_splits(&pending, separator));
        }

        chunks
    }

    /// Greedily merge small splits into windows, carrying up to
    /// `chunk_overlap` characters of trailing context into the next window.
    fn merge_splits(&self, splits: &[String], separator: &str) -> Vec<String> {
        let separator_len = char_len(separator);
        let size = self.config.chunk_size;
        let overlap = self.config.chunk_overlap;

        let mut chunks = Vec::new();
        let mut current: VecDeque<&str> = VecDeque::new();
        let mut total = 0usize;

        for split in splits {
            let len = char_len(split);
            let joiner = if current.is_empty() { 0 } else { separator_len };

            if total + len + joiner > size && !current.is_empty() {
                push_chunk(&mut chunks, &current, separator);

                while total > overlap
                    || (total > 0
                        && total + len + if current.is_empty() { 0 } else { separator_len } > size)
                {
                    let Some(front) = current.pop_front() else {
                        break;
                    };
                    total -= char_len(front);
                    if !current.is_empty() {
                        total -= separator_len;
                    }
                }
            }

            if !current.is_empty() {
                total += separator_len;
            }
            current.push_back(split);
            total += len;
        }

        push_chunk(&mut chunks, &current, separator);
        chunks
    }
}

fn push_chunk(chunks: &mut Vec<String>, parts: &VecDeque<&str>, separator: &str) {
    let joined = parts.iter().copied().collect::<Vec<_>>().join(separator);
    let trimmed = joined.trim();
    if !trimmed.is_empty() {
        chunks.push(trimmed.to_string());
    }
}

fn char_len(s: &str) -> usize {
    s.chars().count()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn splitter(chunk_size: usize, chunk_overlap: usize) -> TextSplitter {
        TextSplitter::new(SplitConfig { chunk_size, chunk_overlap }).unwrap()
    }

    #[test]
    fn test_short_text_is_single_chunk() {
        let chunks = splitter(100, 10).split_text("Short text.");
        assert_eq!(chunks, vec!["Short text."]);
    }

    #[test]
    fn test_empty_text_has_no_chunks() {
        assert!(splitter(100, 10).split_text("").is_empty());
        assert!(splitter(100, 10).split_text("   \n\n  ").is_empty());
    }

    #[test]
    fn test_chunks_respect_size_limit() {
        let text = "The quick brown fox jumps over the lazy dog. ".repeat(40);
        let chunks = splitter(120, 30).split_text(&text);

        assert!(chunks.len() > 1);
        for chunk in &chunks {
            assert!(chunk.chars().count() <= 120, "chunk too long: {}", chunk.len());
        }
    }

    #[test]
    fn test_consecutive_chunks_overlap() {
        let text = (0..60).map(|i| format!("word{}", i)).collect::<Vec<_>>().join(" ");
        let chunks = splitter(50, 20).split_text(&text);

        assert!(chunks.len() > 1);
        for pair in chunks.windows(2) {
            let last_word = pair[0].split(' ').last().unwrap();
            assert!(pair[1].contains(last_word), "{:?} does not overlap {:?}", pair[1], pair[0]);
        }
    }

    #[test]
    fn test_prefers_paragraph_boundaries() {
        let text = "First paragraph here.\n\nSecond paragraph here.\n\nThird paragraph.";
        let chunks = splitter(30, 0).split_text(text);

        assert_eq!(
            chunks,
            vec!["First paragraph here.", "Second paragraph here.", "Third paragraph."]
        );
    }

    #[test]
    fn test_multibyte_text_does_not_panic() {
        let text = "मुंबई विकास नियंत्रण ".repeat(30);
        let chunks = splitter(40, 10).split_text(&text);
        assert!(!chunks.is_empty());
        for chunk in &chunks {
            assert!(chunk.chars().count() <= 40);
        }
    }

    #[test]
    fn test_invalid_config() {
        assert!(TextSplitter::new(SplitConfig { chunk_size: 10, chunk_overlap: 10 }).is_err());
        assert!(TextSplitter::new(SplitConfig { chunk_size: 0, chunk_overlap: 0 }).is_err());
    }
}
