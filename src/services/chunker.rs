//! Text chunking with a cascade of splitting strategies.
//!
//! Strategies are tried in priority order: semantic boundaries (headings,
//! section labels, captions), blank-line paragraphs, sentences, and finally a
//! fixed character window that always produces output for non-empty text.

use regex::Regex;

use crate::models::{ChunkingConfig, Document, DocumentChunk};
use crate::utils::{has_meaningful_content, trailing_overlap};

/// Structural markers that mark a semantic boundary when they start a line.
const BOUNDARY_PATTERNS: &[&str] = &[
    // Markdown headings
    r"^#{1,6}\s+\S",
    // Numbered section headings ("2. Results", "3.1 Method")
    r"^\d+(\.\d+)*\.?\s+\S",
    // Common section labels on a short line of their own
    r"(?i)^(abstract|introduction|background|methods?|results|discussion|conclusions?|references|appendix|summary)\b.{0,40}$",
    // Table and figure captions
    r"(?i)^(table|figure|fig\.)\s*\d+",
];

/// Text chunker that splits document text into ordered, overlapping chunks.
#[derive(Debug, Clone)]
pub struct TextChunker {
    /// Target chunk size in characters
    max_chunk_size: usize,
    /// Overlap carried between consecutive chunks, in characters
    overlap_size: usize,
    boundary_patterns: Vec<Regex>,
    paragraph_split: Regex,
}

impl TextChunker {
    pub fn new(config: &ChunkingConfig) -> Self {
        let boundary_patterns = BOUNDARY_PATTERNS
            .iter()
            .map(|p| Regex::new(p).expect("hardcoded boundary pattern"))
            .collect();
        Self {
            max_chunk_size: config.max_chunk_size.max(1),
            overlap_size: config.overlap_size,
            boundary_patterns,
            paragraph_split: Regex::new(r"\n[ \t]*\n").expect("hardcoded paragraph pattern"),
        }
    }

    pub fn with_defaults() -> Self {
        Self::new(&ChunkingConfig::default())
    }

    /// Split text into ordered chunks. Empty or whitespace-only input yields
    /// an empty list; anything else yields at least one chunk.
    pub fn chunk(&self, text: &str) -> Vec<String> {
        if !has_meaningful_content(text) {
            return Vec::new();
        }

        if let Some(chunks) = self.split_semantic(text)
            && !chunks.is_empty()
        {
            return chunks;
        }

        let paragraphs: Vec<&str> = self
            .paragraph_split
            .split(text)
            .filter(|p| has_meaningful_content(p))
            .collect();

        let total_len = text.chars().count();
        let mut chunks = if paragraphs.len() >= 3 {
            self.pack(&paragraphs, "\n\n")
        } else if total_len > self.max_chunk_size {
            let sentences = split_sentences(text);
            let refs: Vec<&str> = sentences.iter().map(String::as_str).collect();
            self.pack(&refs, " ")
        } else {
            Vec::new()
        };

        // Absolute fallback: a non-overlapping fixed window always produces
        // at least one chunk for non-empty text.
        if chunks.is_empty() {
            chunks = self.fixed_windows(text);
        }

        chunks
    }

    /// Chunk a document's text into [`DocumentChunk`] records, embeddings
    /// left empty for the embedding client to fill in.
    pub fn chunk_document(&self, document: &Document) -> Vec<DocumentChunk> {
        self.chunk(&document.content)
            .into_iter()
            .enumerate()
            .map(|(idx, content)| DocumentChunk::from_document(document, content, idx as u32))
            .collect()
    }

    /// Split at structural markers when the text carries between 2 and 19 of
    /// them. Returns None when the heuristic does not apply.
    fn split_semantic(&self, text: &str) -> Option<Vec<String>> {
        let mut boundaries: Vec<usize> = Vec::new();
        let mut offset = 0usize;

        for line in text.split('\n') {
            let trimmed = line.trim();
            if !trimmed.is_empty()
                && self
                    .boundary_patterns
                    .iter()
                    .any(|re| re.is_match(trimmed))
            {
                boundaries.push(offset);
            }
            offset += line.chars().count() + 1;
        }

        if !(2..=19).contains(&boundaries.len()) {
            return None;
        }

        let chars: Vec<char> = text.chars().collect();
        if boundaries.first() != Some(&0) {
            boundaries.insert(0, 0);
        }
        boundaries.push(chars.len());

        let mut chunks = Vec::new();
        for pair in boundaries.windows(2) {
            let segment: String = chars[pair[0]..pair[1].min(chars.len())].iter().collect();
            if segment.chars().count() > self.max_chunk_size {
                chunks.extend(self.window_with_overlap(&segment));
            } else if has_meaningful_content(&segment) {
                chunks.push(segment);
            }
        }
        Some(chunks)
    }

    /// Greedily pack units (paragraphs or sentences) into chunks up to
    /// `max_chunk_size`, carrying the trailing overlap into the next chunk.
    fn pack(&self, units: &[&str], separator: &str) -> Vec<String> {
        let mut chunks: Vec<String> = Vec::new();
        let mut current = String::new();

        for unit in units {
            if !has_meaningful_content(unit) {
                continue;
            }
            let unit_len = unit.chars().count();
            let current_len = current.chars().count();

            if current_len > 0 && current_len + unit_len > self.max_chunk_size {
                let carry = trailing_overlap(&current, self.overlap_size);
                chunks.push(std::mem::take(&mut current));
                current = carry;
            }
            if !current.is_empty() {
                current.push_str(separator);
            }
            current.push_str(unit);
        }
        if has_meaningful_content(&current) {
            chunks.push(current);
        }

        // A single oversized unit still has to respect the chunk size
        chunks
            .into_iter()
            .flat_map(|c| {
                if c.chars().count() > self.max_chunk_size {
                    self.window_with_overlap(&c)
                } else {
                    vec![c]
                }
            })
            .collect()
    }

    /// Slide a window of `max_chunk_size` with `overlap_size` overlap. The
    /// advance is clamped to at least one character so `overlap_size >=
    /// max_chunk_size` cannot loop forever.
    fn window_with_overlap(&self, text: &str) -> Vec<String> {
        let chars: Vec<char> = text.chars().collect();
        let n = chars.len();
        let mut chunks = Vec::new();
        let mut start = 0usize;

        while start < n {
            let end = (start + self.max_chunk_size).min(n);
            let window: String = chars[start..end].iter().collect();
            if has_meaningful_content(&window) {
                chunks.push(window);
            }
            if end >= n {
                break;
            }
            start = end.saturating_sub(self.overlap_size).max(start + 1);
        }
        chunks
    }

    /// Fixed windows with step `max_chunk_size`, no overlap.
    fn fixed_windows(&self, text: &str) -> Vec<String> {
        let chars: Vec<char> = text.chars().collect();
        chars
            .chunks(self.max_chunk_size)
            .map(|w| w.iter().collect::<String>())
            .filter(|w| has_meaningful_content(w))
            .collect()
    }
}

/// Split on sentence terminators followed by whitespace (or end of text).
fn split_sentences(text: &str) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    let mut sentences = Vec::new();
    let mut start = 0usize;

    for i in 0..chars.len() {
        if matches!(chars[i], '.' | '!' | '?')
            && chars.get(i + 1).is_none_or(|c| c.is_whitespace())
        {
            sentences.push(chars[start..=i].iter().collect());
            start = i + 1;
        }
    }
    if start < chars.len() {
        let tail: String = chars[start..].iter().collect();
        if has_meaningful_content(&tail) {
            sentences.push(tail);
        }
    }
    sentences
}
