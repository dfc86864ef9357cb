//! Fixed-size overlapping text chunker.
//!
//! Splits a loaded document (one or more ordered text segments, e.g. pages)
//! into windows of `chunk_size` characters stepping forward by
//! `chunk_size - overlap`, preserving order. Ordinal indices start at 0 and
//! run contiguously across segment boundaries, matching how chunk ids are
//! derived from `(mtime, size, index)`.
//!
//! The overlap is expected to be strictly smaller than the chunk size
//! (validated at config load); a degenerate overlap is clamped so every
//! window still makes forward progress.

/// A contiguous span of text with its ordinal position within the document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextSpan {
    pub index: i64,
    pub text: String,
}

/// Split ordered segments into overlapping character windows.
///
/// A segment shorter than one chunk yields exactly one span containing the
/// whole segment. Empty segments are skipped; an empty document yields an
/// empty sequence, not an error.
pub fn chunk_segments(segments: &[String], chunk_size: usize, overlap: usize) -> Vec<TextSpan> {
    let mut spans = Vec::new();
    let mut next_index: i64 = 0;

    for segment in segments {
        if segment.is_empty() {
            continue;
        }
        for piece in windows(segment, chunk_size, overlap) {
            spans.push(TextSpan {
                index: next_index,
                text: piece,
            });
            next_index += 1;
        }
    }

    spans
}

/// Overlapping windows over one segment, on char boundaries.
fn windows(text: &str, chunk_size: usize, overlap: usize) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    if chars.len() <= chunk_size {
        return vec![text.to_string()];
    }

    // overlap >= chunk_size would stall or underflow; clamp to a step of 1.
    let step = chunk_size.saturating_sub(overlap).max(1);
    let mut out = Vec::new();
    let mut start = 0usize;
    loop {
        let end = (start + chunk_size).min(chars.len());
        out.push(chars[start..end].iter().collect());
        if end == chars.len() {
            break;
        }
        start += step;
    }
    out
}
