//! Overlapping boundary-seeking text splitter.
//!
//! Windows of at most `chunk_size` characters are cut preferentially at a
//! paragraph break, then a line break, then a sentence end, then a word
//! boundary, and only as a last resort mid-word. Consecutive windows overlap
//! by `chunk_overlap` characters so context at chunk edges is not lost.

/// A boundary is only honored when it lands in the back half of the window,
/// otherwise chunks collapse toward the separator density of the input.
const MIN_BOUNDARY_FRACTION: usize = 2;

pub fn split_text(text: &str, chunk_size: usize, chunk_overlap: usize) -> Vec<String> {
    debug_assert!(chunk_size > 0);
    debug_assert!(chunk_overlap < chunk_size);

    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Vec::new();
    }
    if trimmed.len() <= chunk_size {
        return vec![trimmed.to_string()];
    }

    let mut chunks = Vec::new();
    let mut start = 0usize;

    while start < trimmed.len() {
        let hard_end = snap_to_char_boundary(trimmed, (start + chunk_size).min(trimmed.len()));
        let end = if hard_end < trimmed.len() {
            seek_boundary(trimmed, start, hard_end)
        } else {
            hard_end
        };

        let piece = trimmed[start..end].trim();
        if !piece.is_empty() {
            chunks.push(piece.to_string());
        }

        if end >= trimmed.len() {
            break;
        }

        let mut next = end.saturating_sub(chunk_overlap);
        next = snap_to_char_boundary(trimmed, next.max(start + 1));
        start = next;
    }

    chunks
}

/// Find the best cut point in `text[start..hard_end]`, preferring the most
/// semantically meaningful separator that still leaves a reasonably full
/// window.
fn seek_boundary(text: &str, start: usize, hard_end: usize) -> usize {
    let window = &text[start..hard_end];
    let min_cut = window.len() / MIN_BOUNDARY_FRACTION;

    for separator in ["\n\n", "\n", ". ", "! ", "? ", " "] {
        if let Some(pos) = window.rfind(separator) {
            let cut = pos + separator.len();
            if cut > min_cut {
                return start + cut;
            }
        }
    }

    hard_end
}

/// Snap `index` forward to the nearest UTF-8 character boundary.
fn snap_to_char_boundary(text: &str, mut index: usize) -> usize {
    while index < text.len() && !text.is_char_boundary(index) {
        index += 1;
    }
    index
}
