//! Overlapping window splitter for extracted page text.
//!
//! Each window ends at the best natural boundary it can find, in order of
//! preference:
//! 1. Paragraph break (blank line)
//! 2. Line break
//! 3. Sentence end (`.`, `!`, `?` followed by whitespace)
//! 4. Word boundary (any whitespace)
//! 5. Last resort: hard cut at the size limit
//!
//! The next window always starts exactly `overlap` characters before the
//! previous one ended, so dropping the first `overlap` characters of every
//! window after the first and concatenating gives back the input.

use super::ChunkerConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Boundary {
    Paragraph,
    Line,
    Sentence,
    Word,
}

const PREFERENCE: [Boundary; 4] = [
    Boundary::Paragraph,
    Boundary::Line,
    Boundary::Sentence,
    Boundary::Word,
];

/// Split `text` into windows of at most `chunk_size` characters.
pub fn split_text(text: &str, config: &ChunkerConfig) -> Vec<String> {
    if text.trim().is_empty() {
        return Vec::new();
    }

    let chars: Vec<char> = text.chars().collect();
    if chars.len() <= config.chunk_size() {
        return vec![text.to_string()];
    }

    let overlap = config.chunk_overlap();
    let mut windows = Vec::new();
    let mut start = 0usize;

    loop {
        let hard_end = start + config.chunk_size();
        if hard_end >= chars.len() {
            windows.push(chars[start..].iter().collect());
            break;
        }

        // end > start + overlap keeps the next start strictly ahead of this one
        let end = find_break(&chars, start + overlap + 1, hard_end);
        windows.push(chars[start..end].iter().collect());
        start = end - overlap;
    }

    windows
}

/// Pick the window end in `lo..=hi` (exclusive end positions).
fn find_break(chars: &[char], lo: usize, hi: usize) -> usize {
    for boundary in PREFERENCE {
        if let Some(pos) = (lo..=hi).rev().find(|&p| is_boundary(chars, p, boundary)) {
            return pos;
        }
    }
    hi
}

/// Whether a cut right before `chars[pos]` lands on the given boundary kind.
fn is_boundary(chars: &[char], pos: usize, boundary: Boundary) -> bool {
    if pos == 0 || pos > chars.len() {
        return false;
    }
    let last = chars[pos - 1];
    let before = pos.checked_sub(2).map(|i| chars[i]);

    match boundary {
        Boundary::Paragraph => last == '\n' && before == Some('\n'),
        Boundary::Line => last == '\n',
        Boundary::Sentence => {
            matches!(last, '。' | '！' | '？')
                || (last.is_whitespace() && matches!(before, Some('.' | '!' | '?')))
        }
        Boundary::Word => last.is_whitespace(),
    }
}
