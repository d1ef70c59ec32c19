//! Overlapping fixed-size text chunking.
//!
//! Splits extracted text into chunks of roughly `chunk_size` characters,
//! preferring paragraph, newline, and sentence boundaries near the target
//! size, with a configurable overlap between consecutive chunks.

/// One contiguous span of a document's text.
///
/// Offsets are character (not byte) positions into the extracted text, so
/// the original can be reconstructed from spans regardless of encoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkSpan {
    /// Position of this chunk within its document, starting at 0.
    pub seq: usize,
    pub text: String,
    /// Inclusive start char offset.
    pub start: usize,
    /// Exclusive end char offset.
    pub end: usize,
}

/// Split `text` into overlapping chunks.
///
/// Invariants: every chunk is at most `chunk_size` chars; consecutive
/// chunks overlap by up to `overlap` chars; concatenating the spans with
/// the overlap removed reconstructs `text` exactly. Text shorter than one
/// chunk yields exactly one chunk; empty text yields none.
pub fn split_text(text: &str, chunk_size: usize, overlap: usize) -> Vec<ChunkSpan> {
    debug_assert!(chunk_size > 0 && overlap < chunk_size);

    let chars: Vec<char> = text.chars().collect();
    let total = chars.len();
    if total == 0 {
        return Vec::new();
    }
    if total <= chunk_size {
        return vec![ChunkSpan {
            seq: 0,
            text: text.to_string(),
            start: 0,
            end: total,
        }];
    }

    let mut chunks = Vec::new();
    let mut start = 0usize;
    let mut seq = 0usize;

    while start < total {
        let target_end = (start + chunk_size).min(total);
        let end = if target_end < total {
            find_break_point(&chars, start, target_end)
        } else {
            total
        };

        chunks.push(ChunkSpan {
            seq,
            text: chars[start..end].iter().collect(),
            start,
            end,
        });
        seq += 1;

        if end >= total {
            break;
        }
        // Step back by the overlap, but always make forward progress.
        start = end.saturating_sub(overlap).max(start + 1);
    }

    chunks
}

/// Pick a cut position at or before `target_end`, searching the trailing
/// fifth of the window for a paragraph break, then a newline, then a
/// sentence end. Falls back to the hard cut.
fn find_break_point(chars: &[char], start: usize, target_end: usize) -> usize {
    let window = (target_end - start) / 5;
    let search_start = target_end.saturating_sub(window).max(start + 1);

    for i in (search_start..target_end).rev() {
        if chars[i] == '\n' && chars[i - 1] == '\n' {
            return i + 1;
        }
    }
    for i in (search_start..target_end).rev() {
        if chars[i] == '\n' {
            return i + 1;
        }
    }
    for i in (search_start..target_end).rev() {
        if matches!(chars[i], '.' | '!' | '?')
            && chars.get(i + 1).is_some_and(|c| c.is_whitespace())
        {
            return i + 1;
        }
    }

    target_end
}
