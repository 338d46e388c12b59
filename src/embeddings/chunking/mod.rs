
use anyhow::Result;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::statement::RowDocument;

/// A chunk of statement text ready for embedding.
#[derive(Debug, Clone, PartialEq)]
pub struct StatementChunk {
    /// The chunk text
    pub content: String,
    /// Path of the statement file this chunk came from
    pub source: String,
    /// Zero-based row of the source statement file
    pub row_index: usize,
    /// The index of this chunk within the row document
    pub chunk_index: usize,
    /// Estimated token count
    pub token_count: usize,
}

/// Configuration for document chunking.
///
/// Statement rows are short and normally fit in a single chunk; the
/// splitter only engages for text past `max_chunk_size`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkingConfig {
    /// Maximum chunk size in characters before splitting
    pub max_chunk_size: usize,
    /// Overlap in characters carried from the previous chunk
    pub overlap_size: usize,
    /// Minimum chunk size in characters (smaller trailing pieces are merged)
    pub min_chunk_size: usize,
}

impl Default for ChunkingConfig {
    #[inline]
    fn default() -> Self {
        Self {
            max_chunk_size: 1000,
            overlap_size: 100,
            min_chunk_size: 50,
        }
    }
}

/// Chunk row documents into embedding-ready pieces. Every non-empty
/// document yields at least one chunk.
#[inline]
pub fn chunk_documents(
    documents: &[RowDocument],
    config: &ChunkingConfig,
) -> Result<Vec<StatementChunk>> {
    let mut chunks = Vec::with_capacity(documents.len());

    for document in documents {
        if document.content.trim().is_empty() {
            continue;
        }

        for (chunk_index, piece) in split_text(&document.content, config).into_iter().enumerate() {
            let token_count = estimate_token_count(&piece);
            chunks.push(StatementChunk {
                content: piece,
                source: document.source.clone(),
                row_index: document.row_index,
                chunk_index,
                token_count,
            });
        }
    }

    debug!(
        "Chunked {} documents into {} chunks",
        documents.len(),
        chunks.len()
    );

    Ok(chunks)
}

/// Split text into pieces no larger than `max_chunk_size` characters,
/// preferring paragraph boundaries, then lines, then words. Adjacent
/// pieces overlap by up to `overlap_size` characters.
#[inline]
pub fn split_text(text: &str, config: &ChunkingConfig) -> Vec<String> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Vec::new();
    }

    if trimmed.chars().count() <= config.max_chunk_size {
        return vec![trimmed.to_string()];
    }

    // Overlap counts against the chunk ceiling, so base pieces leave
    // room for the carried tail
    let budget = config
        .max_chunk_size
        .saturating_sub(config.overlap_size)
        .max(1);
    let pieces = split_with_separators(trimmed, &["\n\n", "\n", " "], budget);
    let merged = merge_small_pieces(pieces, config, budget);
    add_overlap(merged, config)
}

/// Greedily pack fragments split on the first workable separator into
/// pieces within the size budget, recursing to finer separators for
/// fragments that are still too large.
fn split_with_separators(text: &str, separators: &[&str], max_size: usize) -> Vec<String> {
    let Some((separator, rest)) = separators.split_first() else {
        return split_by_chars(text, max_size);
    };

    let mut pieces = Vec::new();
    let mut current = String::new();

    for fragment in text.split(separator) {
        if fragment.is_empty() {
            continue;
        }

        let fragments = if fragment.chars().count() > max_size {
            split_with_separators(fragment, rest, max_size)
        } else {
            vec![fragment.to_string()]
        };

        for piece in fragments {
            let projected = current.chars().count()
                + piece.chars().count()
                + if current.is_empty() {
                    0
                } else {
                    separator.chars().count()
                };

            if projected > max_size && !current.is_empty() {
                pieces.push(std::mem::take(&mut current));
            }
            if !current.is_empty() {
                current.push_str(separator);
            }
            current.push_str(&piece);
        }
    }

    if !current.is_empty() {
        pieces.push(current);
    }

    pieces
}

/// Hard character split, the last resort for unbroken runs.
fn split_by_chars(text: &str, max_size: usize) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    chars
        .chunks(max_size.max(1))
        .map(|c| c.iter().collect())
        .collect()
}

/// Merge a trailing piece below the minimum size into its predecessor,
/// as long as the merged piece still fits the base budget.
fn merge_small_pieces(
    mut pieces: Vec<String>,
    config: &ChunkingConfig,
    budget: usize,
) -> Vec<String> {
    if pieces.len() < 2 {
        return pieces;
    }

    let last = pieces.len() - 1;
    let tail_len = pieces[last].chars().count();
    if tail_len < config.min_chunk_size {
        let prev_len = pieces[last - 1].chars().count();
        if prev_len + 1 + tail_len <= budget {
            let tail = pieces.remove(last);
            if let Some(prev) = pieces.last_mut() {
                prev.push('\n');
                prev.push_str(&tail);
            }
        }
    }

    pieces
}

/// Prefix each piece after the first with the tail of its predecessor.
/// The joining newline counts toward the overlap allowance, keeping the
/// finished chunk within `max_chunk_size`.
fn add_overlap(pieces: Vec<String>, config: &ChunkingConfig) -> Vec<String> {
    if config.overlap_size == 0 || pieces.len() < 2 {
        return pieces;
    }

    let mut result = Vec::with_capacity(pieces.len());
    let mut previous_tail = String::new();

    for piece in pieces {
        let with_overlap = if previous_tail.is_empty() {
            piece.clone()
        } else {
            format!("{}\n{}", previous_tail, piece)
        };

        previous_tail = tail_chars(&piece, config.overlap_size.saturating_sub(1));
        result.push(with_overlap);
    }

    result
}

fn tail_chars(text: &str, count: usize) -> String {
    let chars: Vec<char> = text.chars().collect();
    let start = chars.len().saturating_sub(count);
    chars.get(start..).map(|c| c.iter().collect()).unwrap_or_default()
}

/// Estimate token count using a simple heuristic
/// This is a rough approximation - actual tokenization would be more accurate
#[inline]
pub fn estimate_token_count(text: &str) -> usize {
    // Rough heuristic: 1 token ≈ 0.75 words for English text
    // Add extra tokens for punctuation and special characters
    let word_count = text.split_whitespace().count();
    let punct_count = text.chars().filter(|c| c.is_ascii_punctuation()).count();

    (punct_count as f64).mul_add(0.1, word_count as f64 / 0.75) as usize
}
