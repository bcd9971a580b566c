use super::Diagnostic;
use crate::syntax::{LineIndex, Span};
use std::fmt;

/// A [`Diagnostic`] resolved against the text it failed on
///
/// Line and column are 1-based; the column counts characters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Report {
    diagnostic: Diagnostic,
    char_index: usize,
    line: usize,
    column: usize,
    line_text: String,
    /// Byte offset of the failure within `line_text`
    line_offset: usize,
    found: Option<char>,
}

impl Report {
    /// Resolve `diagnostic` against `text`
    #[must_use]
    pub fn new(text: &str, diagnostic: Diagnostic) -> Self {
        let index = LineIndex::new(text);
        let position = diagnostic.position.min(text.len());
        let lc = index.line_col(text, position);
        let line_start = index.line_start(lc.line).unwrap_or(0);
        Self {
            char_index: text.get(..position).map_or(position, |s| s.chars().count()),
            line: lc.line + 1,
            column: lc.column + 1,
            line_text: index.line_text(text, lc.line).to_string(),
            line_offset: position - line_start,
            found: text.get(position..).and_then(|rest| rest.chars().next()),
            diagnostic,
        }
    }

    #[must_use]
    pub const fn diagnostic(&self) -> &Diagnostic {
        &self.diagnostic
    }

    /// Byte offset of the failure
    #[must_use]
    pub const fn position(&self) -> usize {
        self.diagnostic.position
    }

    /// Index of the failure counted in characters, as shown by `Display`
    #[must_use]
    pub const fn char_index(&self) -> usize {
        self.char_index
    }

    /// What was expected, e.g. `Expected ','`
    #[must_use]
    pub fn expected(&self) -> &str {
        &self.diagnostic.message
    }

    /// The character found at the failure position, `None` at end of text
    #[must_use]
    pub const fn found(&self) -> Option<char> {
        self.found
    }

    #[must_use]
    pub const fn line(&self) -> usize {
        self.line
    }

    #[must_use]
    pub const fn column(&self) -> usize {
        self.column
    }

    /// The full source line containing the failure
    #[must_use]
    pub fn line_text(&self) -> &str {
        &self.line_text
    }

    /// The source line with `marker` inserted at the failure column
    ///
    /// ```rust
    /// use tessel::error::{Diagnostic, Report};
    ///
    /// let report = Report::new("Hello World!", Diagnostic::new(6, "Expected ','"));
    /// assert_eq!(report.mark_input_line(">!<"), "Hello >!<World!");
    /// ```
    #[must_use]
    pub fn mark_input_line(&self, marker: &str) -> String {
        let (before, after) = self
            .line_text
            .split_at(self.line_offset.min(self.line_text.len()));
        format!("{before}{marker}{after}")
    }

    /// Three-line explanation: source line, caret, message
    ///
    /// ```rust
    /// use tessel::error::{Diagnostic, Report};
    ///
    /// let report = Report::new("Hello World!", Diagnostic::new(6, "Expected ','"));
    /// let text = report.explain();
    /// let lines: Vec<&str> = text.lines().collect();
    /// assert_eq!(lines[0], "Hello World!");
    /// assert_eq!(lines[1], "      ^");
    /// ```
    #[must_use]
    pub fn explain(&self) -> String {
        format!(
            "{}\n{}^\n{}",
            self.line_text,
            " ".repeat(self.column - 1),
            self
        )
    }

    #[cfg(feature = "diagnostics")]
    pub(crate) fn miette_source(&self) -> &dyn miette::SourceCode {
        &self.line_text
    }

    /// The offending character's byte range, empty at end of text
    #[must_use]
    pub fn span(&self) -> Span {
        let start = self.position();
        Span::new(start, start + self.found.map_or(0, char::len_utf8))
    }

    /// [`span`](Self::span) relative to the start of [`line_text`](Self::line_text)
    #[cfg(feature = "diagnostics")]
    pub(crate) fn line_span(&self) -> miette::SourceSpan {
        let len = self.span().len();
        Span::new(self.line_offset, self.line_offset + len).into()
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.diagnostic.message)?;
        match self.found {
            Some(c) => write!(f, ", found {}", super::diagnostics::quote_char(c))?,
            None => f.write_str(", found end of text")?,
        }
        write!(
            f,
            "  (at char {}), (line:{}, col:{})",
            self.char_index, self.line, self.column
        )
    }
}
