//! Recursive text chunker
//!
//! Splits records into windows of at most `chunk_size` characters. Boundaries
//! are chosen from the coarsest separator that works (paragraph, line,
//! sentence, word) before falling back to raw character cuts. Every chunk is
//! an exact substring of its record, and consecutive chunks share at most
//! `chunk_overlap` characters with no gap between them.

use std::collections::VecDeque;
use std::ops::Range;

use vizrag_core::{TextChunk, TextRecord};

/// Separators tried in order, coarsest first
pub const DEFAULT_SEPARATORS: &[&str] = &["\n\n", "\n", ". ", "! ", "? ", " "];

/// A contiguous span of the record with its length in characters
#[derive(Debug, Clone, Copy)]
struct Piece {
    start: usize,
    end: usize,
    chars: usize,
}

#[derive(Debug, Clone)]
pub struct RecursiveChunker {
    chunk_size: usize,
    chunk_overlap: usize,
}

impl RecursiveChunker {
    /// `chunk_size` must be positive and `chunk_overlap` smaller than it;
    /// [`crate::RagConfig`] validates both before a chunker is built from it.
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Self {
        let chunk_size = chunk_size.max(1);
        Self {
            chunk_size,
            chunk_overlap: chunk_overlap.min(chunk_size - 1),
        }
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn chunk_overlap(&self) -> usize {
        self.chunk_overlap
    }

    /// Chunk every record, keeping each chunk's source and offset
    pub fn chunk_records(&self, records: &[TextRecord]) -> Vec<TextChunk> {
        let mut chunks = Vec::new();

        for (record_index, record) in records.iter().enumerate() {
            let source_digest = md5::compute(record.source.as_bytes());

            for (chunk_index, range) in self.split_text(&record.text).into_iter().enumerate() {
                chunks.push(TextChunk {
                    id: format!("{:x}-{}-{}", source_digest, record_index, chunk_index),
                    content: record.text[range.clone()].to_string(),
                    source: record.source.clone(),
                    row: record.row,
                    record_index,
                    chunk_index,
                    offset: range.start,
                });
            }
        }

        chunks
    }

    /// Byte ranges of the chunks of `text`, in order
    pub fn split_text(&self, text: &str) -> Vec<Range<usize>> {
        if text.is_empty() {
            return Vec::new();
        }

        let mut pieces = Vec::new();
        split_pieces(text, 0..text.len(), self.chunk_size, DEFAULT_SEPARATORS, &mut pieces);
        self.merge(pieces)
    }

    /// Greedily pack pieces into windows, restarting each window from the
    /// trailing pieces of the previous one that fit in the overlap.
    fn merge(&self, pieces: Vec<Piece>) -> Vec<Range<usize>> {
        let mut ranges = Vec::new();
        let mut window: VecDeque<Piece> = VecDeque::new();
        let mut window_chars = 0;

        for piece in pieces {
            if !window.is_empty() && window_chars + piece.chars > self.chunk_size {
                if let (Some(first), Some(last)) = (window.front(), window.back()) {
                    ranges.push(first.start..last.end);
                }

                while window_chars > self.chunk_overlap
                    || (window_chars > 0 && window_chars + piece.chars > self.chunk_size)
                {
                    match window.pop_front() {
                        Some(dropped) => window_chars -= dropped.chars,
                        None => break,
                    }
                }
            }

            window.push_back(piece);
            window_chars += piece.chars;
        }

        if let (Some(first), Some(last)) = (window.front(), window.back()) {
            ranges.push(first.start..last.end);
        }

        ranges
    }
}

/// Split `span` of `text` into pieces of at most `chunk_size` characters,
/// keeping each separator attached to the piece it ends.
fn split_pieces(
    text: &str,
    span: Range<usize>,
    chunk_size: usize,
    separators: &[&str],
    out: &mut Vec<Piece>,
) {
    let slice = &text[span.clone()];
    let chars = slice.chars().count();
    if chars <= chunk_size {
        out.push(Piece {
            start: span.start,
            end: span.end,
            chars,
        });
        return;
    }

    let Some((separator, remaining)) = separators.split_first() else {
        hard_cut(slice, span.start, chunk_size, out);
        return;
    };

    let mut segments = Vec::new();
    let mut segment_start = 0;
    for (pos, matched) in slice.match_indices(separator) {
        let segment_end = pos + matched.len();
        segments.push(span.start + segment_start..span.start + segment_end);
        segment_start = segment_end;
    }
    if segment_start < slice.len() {
        segments.push(span.start + segment_start..span.end);
    }

    if segments.len() <= 1 {
        split_pieces(text, span, chunk_size, remaining, out);
        return;
    }

    for segment in segments {
        split_pieces(text, segment, chunk_size, remaining, out);
    }
}

/// Last resort: cut every `chunk_size` characters
fn hard_cut(slice: &str, base: usize, chunk_size: usize, out: &mut Vec<Piece>) {
    let mut piece_start = 0;
    let mut count = 0;

    for (offset, _) in slice.char_indices() {
        if count == chunk_size {
            out.push(Piece {
                start: base + piece_start,
                end: base + offset,
                chars: count,
            });
            piece_start = offset;
            count = 0;
        }
        count += 1;
    }

    if count > 0 {
        out.push(Piece {
            start: base + piece_start,
            end: base + slice.len(),
            chars: count,
        });
    }
}
