//! Fenced code block scanning for chat-flavoured markdown.
//!
//! Chat clients open a block with three backticks anywhere on a line,
//! optionally followed by a language tag, and close it at the next three
//! backticks. Blocks never nest.

pub const FENCE: &str = "```";

/// Byte span of one fenced block within a text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FencedBlock {
    /// Offset of the opening fence.
    pub start: usize,
    /// Offset of the first body byte, past the opener line.
    pub body_start: usize,
    /// Offset one past the closing fence, or the text length if unclosed.
    pub end: usize,
    /// Opening fence including its language tag, e.g. "```py".
    pub opener: String,
    pub closed: bool,
}

impl FencedBlock {
    /// Whether a cut at `offset` would land inside this block.
    pub fn contains(&self, offset: usize) -> bool {
        self.start < offset && offset < self.end
    }

    pub fn lang(&self) -> &str {
        &self.opener[FENCE.len()..]
    }
}

/// Scan `text` for fenced blocks in order of appearance.
pub fn fenced_blocks(text: &str) -> Vec<FencedBlock> {
    let mut blocks = Vec::new();
    let mut pos = 0;

    while let Some(found) = text[pos..].find(FENCE) {
        let start = pos + found;
        let after_fence = start + FENCE.len();

        // A language tag is a single word running up to the end of the line.
        let line_end = text[after_fence..]
            .find('\n')
            .map_or(text.len(), |i| after_fence + i);
        let tag = &text[after_fence..line_end];
        let is_tag = !tag.is_empty()
            && line_end < text.len()
            && tag.chars().all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '_' | '#'));

        let (opener, body_start) = if is_tag {
            (format!("{FENCE}{tag}"), line_end + 1)
        } else if text[after_fence..].starts_with('\n') {
            (FENCE.to_string(), after_fence + 1)
        } else {
            (FENCE.to_string(), after_fence)
        };

        match text[body_start..].find(FENCE) {
            Some(close) => {
                let end = body_start + close + FENCE.len();
                blocks.push(FencedBlock { start, body_start, end, opener, closed: true });
                pos = end;
            }
            None => {
                blocks.push(FencedBlock { start, body_start, end: text.len(), opener, closed: false });
                break;
            }
        }
    }

    blocks
}

/// The block a cut at `offset` would fall inside, if any.
pub fn block_at(blocks: &[FencedBlock], offset: usize) -> Option<&FencedBlock> {
    blocks.iter().find(|b| b.contains(offset))
}
