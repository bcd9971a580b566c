//! Line and column lookup for failure reporting
//!
//! Lines are separated by `\n` only. Columns count characters, not bytes, so
//! that a caret rendered under a source line points at the right glyph.

/// A zero-based line and character column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LineCol {
    /// Zero-based line number
    pub line: usize,
    /// Zero-based column, counted in characters
    pub column: usize,
}

impl LineCol {
    #[must_use]
    pub const fn new(line: usize, column: usize) -> Self {
        Self { line, column }
    }
}

/// Cached line start offsets for repeated offset to line/column conversion
///
/// Built once per report; lookups are a binary search over line starts.
#[derive(Debug, Clone)]
pub struct LineIndex {
    /// Byte offsets of line starts (the first line starts at 0)
    line_starts: Vec<usize>,
    text_len: usize,
}

impl LineIndex {
    /// Scan `text` once and record where each line begins
    ///
    /// ```rust
    /// use tessel::syntax::LineIndex;
    ///
    /// let index = LineIndex::new("ab\ncd");
    /// assert_eq!(index.line_count(), 2);
    /// assert_eq!(index.line_start(1), Some(3));
    /// ```
    #[must_use]
    pub fn new(text: &str) -> Self {
        let mut line_starts = vec![0];
        line_starts.extend(
            text.bytes()
                .enumerate()
                .filter(|&(_, b)| b == b'\n')
                .map(|(i, _)| i + 1),
        );
        Self {
            line_starts,
            text_len: text.len(),
        }
    }

    /// Convert a byte offset to a line/column position
    ///
    /// Offsets past the end of the text are clamped to the end.
    #[must_use]
    pub fn line_col(&self, text: &str, offset: usize) -> LineCol {
        let offset = offset.min(self.text_len);
        let line = match self.line_starts.binary_search(&offset) {
            Ok(idx) => idx,
            Err(idx) => idx.saturating_sub(1),
        };
        let start = self.line_starts[line];
        let column = text
            .get(start..offset)
            .map_or(offset - start, |prefix| prefix.chars().count());
        LineCol { line, column }
    }

    #[must_use]
    pub fn line_count(&self) -> usize {
        self.line_starts.len()
    }

    /// Byte offset where `line` starts, or `None` if out of bounds
    #[must_use]
    pub fn line_start(&self, line: usize) -> Option<usize> {
        self.line_starts.get(line).copied()
    }

    /// The text of `line` without its trailing newline
    #[must_use]
    pub fn line_text<'t>(&self, text: &'t str, line: usize) -> &'t str {
        let Some(start) = self.line_start(line) else {
            return "";
        };
        let end = self
            .line_start(line + 1)
            .map_or(self.text_len, |next| next - 1);
        text.get(start..end).unwrap_or("")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_col_unix_line_endings() {
        let text = "line 1\nline 2\nline 3";
        let index = LineIndex::new(text);

        assert_eq!(index.line_col(text, 0), LineCol::new(0, 0));
        assert_eq!(index.line_col(text, 6), LineCol::new(0, 6));
        assert_eq!(index.line_col(text, 7), LineCol::new(1, 0));
        assert_eq!(index.line_col(text, 14), LineCol::new(2, 0));
    }

    #[test]
    fn test_line_col_counts_characters() {
        let text = "café bar";
        let index = LineIndex::new(text);
        // 'é' is two bytes; "bar" starts at byte 6 but column 5
        assert_eq!(index.line_col(text, 6), LineCol::new(0, 5));
    }

    #[test]
    fn test_line_col_clamps_past_end() {
        let text = "abc";
        let index = LineIndex::new(text);
        assert_eq!(index.line_col(text, 99), LineCol::new(0, 3));
    }

    #[test]
    fn test_line_col_empty_text() {
        let index = LineIndex::new("");
        assert_eq!(index.line_col("", 0), LineCol::new(0, 0));
        assert_eq!(index.line_count(), 1);
    }

    #[test]
    fn test_line_text() {
        let text = "first\nsecond\n";
        let index = LineIndex::new(text);
        assert_eq!(index.line_text(text, 0), "first");
        assert_eq!(index.line_text(text, 1), "second");
        assert_eq!(index.line_text(text, 2), "");
        assert_eq!(index.line_text(text, 3), "");
    }
}
