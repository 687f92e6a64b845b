//! Accumulates text into pages that are each one complete fenced block.

use crate::code_block::FENCE;

/// Builds pages no longer than `page_size` characters, fences included.
///
/// Sections are kept whole when they fit on a page. A longer section breaks
/// only between lines, and a single over-long line is cut by character.
#[derive(Debug, Clone)]
pub struct Paginator {
    lang: String,
    page_size: usize,
    pages: Vec<String>,
    current: String,
}

impl Paginator {
    pub fn new(lang: impl Into<String>, page_size: usize) -> Self {
        let lang = lang.into();
        // Always leave room for at least a few characters of body.
        let min = Self::overhead_for(&lang) + 8;
        Self {
            lang,
            page_size: page_size.max(min),
            pages: Vec::new(),
            current: String::new(),
        }
    }

    fn overhead_for(lang: &str) -> usize {
        // "```lang\n" + body + "\n```"
        FENCE.len() * 2 + lang.chars().count() + 2
    }

    /// Body characters available per page.
    pub fn capacity(&self) -> usize {
        self.page_size - Self::overhead_for(&self.lang)
    }

    fn fits(&self, extra: &str, separator: &str) -> bool {
        let sep = if self.current.is_empty() { 0 } else { separator.chars().count() };
        self.current.chars().count() + sep + extra.chars().count() <= self.capacity()
    }

    fn push(&mut self, text: &str, separator: &str) {
        if !self.current.is_empty() {
            self.current.push_str(separator);
        }
        self.current.push_str(text);
    }

    /// Close the current page, if it holds anything.
    pub fn close_page(&mut self) {
        if self.current.is_empty() {
            return;
        }
        let body = std::mem::take(&mut self.current);
        self.pages.push(format!("{FENCE}{}\n{body}\n{FENCE}", self.lang));
    }

    /// Add a multi-line section, separated from the previous one by a blank line.
    pub fn add_section(&mut self, section: &str) {
        let section = escape_fences(section.trim_end_matches('\n'));
        if section.is_empty() {
            return;
        }
        if self.fits(&section, "\n\n") {
            self.push(&section, "\n\n");
            return;
        }
        self.close_page();
        if self.fits(&section, "") {
            self.push(&section, "");
            return;
        }
        for line in section.lines() {
            self.add_escaped_line(line);
        }
    }

    /// Add one line directly below the previous content.
    pub fn add_line(&mut self, line: &str) {
        let line = escape_fences(line);
        self.add_escaped_line(&line);
    }

    fn add_escaped_line(&mut self, line: &str) {
        if self.fits(line, "\n") {
            self.push(line, "\n");
            return;
        }
        self.close_page();
        let capacity = self.capacity();
        let chars: Vec<char> = line.chars().collect();
        if chars.is_empty() {
            return;
        }
        let mut pieces = chars.chunks(capacity).peekable();
        while let Some(piece) = pieces.next() {
            self.current = piece.iter().collect();
            if pieces.peek().is_some() {
                self.close_page();
            }
        }
    }

    pub fn pages(mut self) -> Vec<String> {
        self.close_page();
        self.pages
    }
}

/// Break literal fences so page content cannot terminate its own block.
fn escape_fences(text: &str) -> String {
    text.replace(FENCE, "`\u{200b}``")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sections_share_a_page_when_they_fit() {
        let mut p = Paginator::new("md", 200);
        p.add_section("Basic:\n  ping");
        p.add_section("Core:\n  help");
        let pages = p.pages();
        assert_eq!(pages, vec!["```md\nBasic:\n  ping\n\nCore:\n  help\n```".to_string()]);
    }

    #[test]
    fn test_section_moves_to_next_page_whole() {
        let mut p = Paginator::new("", 30);
        p.add_section("aaaaaaaaaa");
        p.add_section("bbbbbbbbbb\ncc");
        let pages = p.pages();
        assert_eq!(pages.len(), 2);
        assert_eq!(pages[1], "```\nbbbbbbbbbb\ncc\n```");
    }

    #[test]
    fn test_every_page_is_a_complete_block_under_size() {
        let mut p = Paginator::new("md", 50);
        let long: Vec<String> = (0..40).map(|i| format!("entry number {i}")).collect();
        p.add_section(&long.join("\n"));
        let pages = p.pages();
        assert!(pages.len() > 1);
        for page in &pages {
            assert!(page.chars().count() <= 50);
            assert!(page.starts_with("```md\n"));
            assert!(page.ends_with("\n```"));
            assert_eq!(page.matches(FENCE).count(), 2);
        }
        let entries: usize = pages.iter().map(|p| p.matches("entry number").count()).sum();
        assert_eq!(entries, 40);
    }

    #[test]
    fn test_overlong_line_is_cut() {
        let mut p = Paginator::new("", 20);
        p.add_line(&"z".repeat(30));
        let pages = p.pages();
        assert_eq!(pages.len(), 3);
        assert!(pages.iter().all(|page| page.chars().count() <= 20));
    }

    #[test]
    fn test_fences_in_content_are_neutralised() {
        let mut p = Paginator::new("", 100);
        p.add_line("use ``` carefully");
        let pages = p.pages();
        assert_eq!(pages[0].matches(FENCE).count(), 2);
    }
}
