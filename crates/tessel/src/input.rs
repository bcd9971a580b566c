//! Input text as seen by the matcher

use crate::grammar::CharSet;
use crate::peg::ParseConfig;
use std::borrow::Cow;

/// Source text after tab expansion, with positions as byte offsets
#[derive(Debug, Clone)]
pub(crate) struct InputView<'i> {
    text: Cow<'i, str>,
}

impl<'i> InputView<'i> {
    pub(crate) fn new(text: &'i str, config: &ParseConfig) -> Self {
        let text = if config.keep_tabs {
            Cow::Borrowed(text)
        } else {
            expand_tabs(text, config.tab_size)
        };
        Self { text }
    }

    /// Use `text` exactly as given
    pub(crate) const fn verbatim(text: &'i str) -> Self {
        Self {
            text: Cow::Borrowed(text),
        }
    }

    pub(crate) fn text(&self) -> &str {
        &self.text
    }

    pub(crate) fn into_owned(self) -> InputView<'static> {
        InputView {
            text: Cow::Owned(self.text.into_owned()),
        }
    }
}

/// Replace each tab with spaces up to the next multiple of `tab_size`
///
/// Columns restart after every `\n` or `\r`.
pub(crate) fn expand_tabs(text: &str, tab_size: usize) -> Cow<'_, str> {
    if !text.contains('\t') {
        return Cow::Borrowed(text);
    }
    let mut out = String::with_capacity(text.len() + 8);
    let mut column = 0usize;
    for c in text.chars() {
        match c {
            '\t' => {
                let pad = if tab_size == 0 {
                    0
                } else {
                    tab_size - column % tab_size
                };
                out.extend(std::iter::repeat(' ').take(pad));
                column += pad;
            }
            '\n' | '\r' => {
                out.push(c);
                column = 0;
            }
            _ => {
                out.push(c);
                column += 1;
            }
        }
    }
    Cow::Owned(out)
}

/// First position at or after `pos` whose character is not in `set`
pub(crate) fn skip_chars(text: &str, pos: usize, set: &CharSet) -> usize {
    let rest = &text[pos..];
    rest.char_indices()
        .find(|&(_, c)| !set.matches(c))
        .map_or(text.len(), |(i, _)| pos + i)
}

/// Offset just past the character at `pos`
pub(crate) fn next_boundary(text: &str, pos: usize) -> usize {
    text[pos..]
        .chars()
        .next()
        .map_or(pos + 1, |c| pos + c.len_utf8())
}

/// The character ending at `pos`, if any
pub(crate) fn char_before(text: &str, pos: usize) -> Option<char> {
    text[..pos].chars().next_back()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expand_tabs_is_column_aware() {
        assert_eq!(expand_tabs("a\tb", 4), "a   b");
        assert_eq!(expand_tabs("abcd\tb", 4), "abcd    b");
        assert_eq!(expand_tabs("x\n\ty", 2), "x\n  y");
    }

    #[test]
    fn test_expand_tabs_borrows_without_tabs() {
        assert!(matches!(expand_tabs("plain", 8), Cow::Borrowed(_)));
    }

    #[test]
    fn test_keep_tabs() {
        let config = ParseConfig {
            keep_tabs: true,
            ..ParseConfig::default()
        };
        assert_eq!(InputView::new("a\tb", &config).text(), "a\tb");
        assert_eq!(InputView::new("a\tb", &ParseConfig::default()).text(), "a       b");
    }

    #[test]
    fn test_skip_chars() {
        let ws = CharSet::from_chars(" \n");
        assert_eq!(skip_chars("  \n x", 0, &ws), 4);
        assert_eq!(skip_chars("   ", 1, &ws), 3);
        assert_eq!(skip_chars("x", 0, &ws), 0);
    }

    #[test]
    fn test_boundaries() {
        assert_eq!(next_boundary("é!", 0), 2);
        assert_eq!(next_boundary("a", 1), 2);
        assert_eq!(char_before("aé", 3), Some('é'));
        assert_eq!(char_before("a", 0), None);
    }
}
