//! Fixed-size text chunking

/// Splits text into consecutive pieces of at most `max_chunk_size` characters
///
/// Boundaries fall on characters, never inside a multi-byte sequence. There is
/// no sentence or table awareness, so a row may straddle two chunks.
#[derive(Debug, Clone, Copy)]
pub struct ChunkSplitter {
    max_chunk_size: usize,
}

impl ChunkSplitter {
    /// Create a splitter; a size of zero is treated as one
    pub fn new(max_chunk_size: usize) -> Self {
        Self {
            max_chunk_size: max_chunk_size.max(1),
        }
    }

    /// Maximum characters per chunk
    pub fn max_chunk_size(&self) -> usize {
        self.max_chunk_size
    }

    /// Split `text`; the chunks concatenate back to `text` and empty text has none
    pub fn split(&self, text: &str) -> Vec<String> {
        let mut chunks = Vec::new();
        let mut start = 0;
        let mut count = 0;

        for (idx, _) in text.char_indices() {
            if count == self.max_chunk_size {
                chunks.push(text[start..idx].to_string());
                start = idx;
                count = 0;
            }
            count += 1;
        }
        if start < text.len() {
            chunks.push(text[start..].to_string());
        }
        chunks
    }
}
