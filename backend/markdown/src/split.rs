//! Splitting outgoing text into messages under the platform length limit.

use crate::code_block::{FENCE, block_at, fenced_blocks};

/// Reference message length limit, in characters.
pub const MESSAGE_LIMIT: usize = 2000;

/// Smallest limit that still leaves room to close and reopen a block.
const MIN_LIMIT: usize = 16;

/// Characters reserved for the synthetic "\n```" terminator.
const CLOSE_RESERVE: usize = FENCE.len() + 1;

/// Byte offset of the `n`th character, or the text length.
fn char_offset(text: &str, n: usize) -> usize {
    text.char_indices().nth(n).map_or(text.len(), |(i, _)| i)
}

/// Preferred cut in `(lo, hi]`: the last newline, else the last space, else
/// `hi`. Returns the cut and how many separator bytes to drop after it.
fn pick_break(text: &str, lo: usize, hi: usize) -> (usize, usize) {
    let window = &text[lo..hi];
    if let Some(i) = window.rfind('\n').filter(|&i| i > 0) {
        return (lo + i, 1);
    }
    if let Some(i) = window.rfind(' ').filter(|&i| i > 0) {
        return (lo + i, 1);
    }
    (hi, 0)
}

/// Split `text` into chunks of at most `limit` characters.
///
/// Breaks prefer newlines, then spaces. A break inside a fenced block closes
/// the block at the end of the chunk and reopens it, language tag included,
/// at the start of the next one. A break that would land in the opening
/// line of a block moves in front of the block instead.
pub fn split_message(text: &str, limit: usize) -> Vec<String> {
    let limit = limit.max(MIN_LIMIT);
    let mut chunks = Vec::new();
    let mut rest = text.to_string();
    let mut reopen: Option<String> = None;

    loop {
        let current = match reopen.take() {
            Some(opener) => format!("{opener}\n{rest}"),
            None => rest,
        };
        if current.chars().count() <= limit {
            if !current.is_empty() || chunks.is_empty() {
                chunks.push(current);
            }
            break;
        }

        let blocks = fenced_blocks(&current);
        let hard = char_offset(&current, limit);
        let (mut cut, mut skip) = pick_break(&current, 0, hard);

        match block_at(&blocks, cut) {
            None => {}
            Some(block) if block.start > 0 && cut <= block.body_start => {
                cut = block.start;
                skip = 0;
            }
            Some(block) => {
                let budget = char_offset(&current, limit - CLOSE_RESERVE);
                if block.body_start < budget {
                    let (c, s) = pick_break(&current, block.body_start, budget);
                    let head = current[..c].trim_end_matches('\n');
                    chunks.push(format!("{head}\n{FENCE}"));
                    rest = current[c + s..].to_string();
                    reopen = Some(block.opener.clone());
                    continue;
                } else if block.start > 0 {
                    cut = block.start;
                    skip = 0;
                } else {
                    // Opener longer than a page: nothing sensible to reopen.
                    cut = hard;
                    skip = 0;
                }
            }
        }

        chunks.push(current[..cut].trim_end_matches('\n').to_string());
        rest = current[cut + skip..].to_string();
    }

    chunks
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_within(chunks: &[String], limit: usize) {
        for chunk in chunks {
            assert!(chunk.chars().count() <= limit, "chunk over limit: {chunk:?}");
        }
    }

    #[test]
    fn test_short_text_is_one_chunk() {
        assert_eq!(split_message("hello", 2000), vec!["hello".to_string()]);
        assert_eq!(split_message("", 2000), vec![String::new()]);
    }

    #[test]
    fn test_prefers_newline_then_space() {
        let text = "aaaa aaaa\nbbbb bbbb cccc";
        let chunks = split_message(text, 16);
        assert_eq!(chunks[0], "aaaa aaaa");
        assert_eq!(chunks[1], "bbbb bbbb cccc");
    }

    #[test]
    fn test_hard_cut_without_separators() {
        let text = "x".repeat(40);
        let chunks = split_message(&text, 16);
        assert_eq!(chunks.len(), 3);
        assert_within(&chunks, 16);
        assert_eq!(chunks.concat(), text);
    }

    #[test]
    fn test_block_is_closed_and_reopened() {
        let body: Vec<String> = (0..30).map(|i| format!("line {i:02}")).collect();
        let text = format!("```py\n{}\n```", body.join("\n"));
        let chunks = split_message(&text, 60);

        assert!(chunks.len() > 1);
        assert_within(&chunks, 60);
        for chunk in &chunks {
            assert!(chunk.starts_with("```py\n"), "missing opener: {chunk:?}");
            assert!(chunk.ends_with("```"), "missing terminator: {chunk:?}");
        }
        let lines: Vec<&str> = chunks
            .iter()
            .flat_map(|c| c.lines())
            .filter(|l| l.starts_with("line"))
            .collect();
        assert_eq!(lines.len(), 30);
    }

    #[test]
    fn test_break_in_opener_line_moves_before_block() {
        let text = format!("{}\n```rust\nfn main() {{}}\n```", "word ".repeat(3).trim_end());
        let chunks = split_message(&text, 20);
        assert_eq!(chunks[0], "word word word");
        assert!(chunks[1].starts_with("```rust"));
    }

    #[test]
    fn test_multibyte_text_respects_char_limit() {
        let text = "é".repeat(50);
        let chunks = split_message(&text, 20);
        assert_within(&chunks, 20);
        assert_eq!(chunks.concat(), text);
    }
}
