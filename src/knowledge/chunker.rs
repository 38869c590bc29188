//! Document chunking.
//!
//! Splits a document's rendered text into overlapping windows sized for
//! embedding, preferring to cut at a paragraph break, then a sentence
//! ending, then a word boundary, before falling back to a hard cut at the
//! size limit. The produced chunks cover the text end-to-end: nothing is
//! dropped and nothing repeats beyond the declared overlap.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::loader::{DocMetadata, Document};

const SENTENCE_ENDINGS: [&str; 6] = [". ", "! ", "? ", ".\n", "!\n", "?\n"];

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkerConfig {
    /// Maximum chunk length in characters.
    pub chunk_size: usize,
    /// Characters shared between consecutive chunks.
    pub chunk_overlap: usize,
}

impl Default for ChunkerConfig {
    fn default() -> Self {
        Self {
            chunk_size: 1000,
            chunk_overlap: 200,
        }
    }
}

/// A contiguous slice of a document's text, the unit of embedding and
/// retrieval. Offsets are in characters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    pub id: String,
    pub text: String,
    pub metadata: DocMetadata,
    pub start_offset: usize,
    pub chunk_index: usize,
}

#[derive(Debug, Clone)]
pub struct TextChunker {
    config: ChunkerConfig,
}

impl TextChunker {
    pub fn new(mut config: ChunkerConfig) -> Self {
        // Overlap must leave room to move forward.
        if config.chunk_size == 0 {
            config.chunk_size = 1;
        }
        if config.chunk_overlap >= config.chunk_size {
            config.chunk_overlap = config.chunk_size - 1;
        }
        Self { config }
    }

    pub fn config(&self) -> &ChunkerConfig {
        &self.config
    }

    /// Lazy chunk sequence over one document. Calling this again restarts
    /// from the beginning.
    pub fn chunks<'a>(&self, document: &'a Document) -> ChunkIter<'a> {
        ChunkIter {
            chars: document.text.chars().collect(),
            metadata: &document.metadata,
            chunk_size: self.config.chunk_size,
            overlap: self.config.chunk_overlap,
            start: 0,
            chunk_index: 0,
            done: false,
        }
    }

    pub fn chunk_document(&self, document: &Document) -> Vec<Chunk> {
        self.chunks(document).collect()
    }
}

impl Default for TextChunker {
    fn default() -> Self {
        Self::new(ChunkerConfig::default())
    }
}

pub struct ChunkIter<'a> {
    chars: Vec<char>,
    metadata: &'a DocMetadata,
    chunk_size: usize,
    overlap: usize,
    start: usize,
    chunk_index: usize,
    done: bool,
}

impl ChunkIter<'_> {
    /// Pick the cut position for a window that does not reach the end of
    /// the text. Boundaries are only considered in the last fifth of the
    /// window so chunks stay near the target size.
    fn find_cut(&self, start: usize, end: usize) -> usize {
        let floor = start + (end - start) * 4 / 5;

        if let Some(pos) = self.rfind(floor, end, "\n\n") {
            return pos + 2;
        }

        let mut best = None;
        for ending in SENTENCE_ENDINGS {
            if let Some(pos) = self.rfind(floor, end, ending) {
                let cut = pos + ending.chars().count();
                best = Some(best.map_or(cut, |b: usize| b.max(cut)));
            }
        }
        if let Some(cut) = best {
            return cut;
        }

        for pos in (floor..end).rev() {
            if self.chars[pos] == ' ' || self.chars[pos] == '\n' {
                return pos + 1;
            }
        }

        end
    }

    /// Last full occurrence of `pattern` within `[floor, end)`, as a char
    /// index of the match start.
    fn rfind(&self, floor: usize, end: usize, pattern: &str) -> Option<usize> {
        let pat: Vec<char> = pattern.chars().collect();
        if pat.is_empty() || end < floor + pat.len() {
            return None;
        }
        for pos in (floor..=end - pat.len()).rev() {
            if self.chars[pos..pos + pat.len()] == pat[..] {
                return Some(pos);
            }
        }
        None
    }
}

impl Iterator for ChunkIter<'_> {
    type Item = Chunk;

    fn next(&mut self) -> Option<Chunk> {
        if self.done {
            return None;
        }

        let total = self.chars.len();
        let end = (self.start + self.chunk_size).min(total);
        let cut = if end < total {
            self.find_cut(self.start, end)
        } else {
            end
        };

        let chunk = Chunk {
            id: Uuid::new_v4().to_string(),
            text: self.chars[self.start..cut].iter().collect(),
            metadata: self.metadata.clone(),
            start_offset: self.start,
            chunk_index: self.chunk_index,
        };
        self.chunk_index += 1;

        if cut >= total {
            self.done = true;
        } else {
            self.start = cut.saturating_sub(self.overlap).max(self.start + 1);
        }

        Some(chunk)
    }
}
