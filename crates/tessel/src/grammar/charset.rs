//! Character classes for word-like and excluded-character nodes

#[cfg(feature = "serialize")]
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;

/// A set of characters stored as sorted, non-overlapping inclusive ranges
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serialize", derive(Serialize, Deserialize))]
pub struct CharSet {
    ranges: Vec<(char, char)>,
}

impl CharSet {
    /// Create a character set from inclusive ranges
    ///
    /// Ranges are sorted and merged; reversed ranges are swapped.
    #[must_use]
    pub fn new(ranges: impl IntoIterator<Item = (char, char)>) -> Self {
        let mut ranges: Vec<(char, char)> = ranges
            .into_iter()
            .map(|(a, b)| if a <= b { (a, b) } else { (b, a) })
            .collect();
        ranges.sort_unstable();
        let mut merged: Vec<(char, char)> = Vec::with_capacity(ranges.len());
        for (start, end) in ranges {
            match merged.last_mut() {
                Some(last) if u32::from(start) <= u32::from(last.1).saturating_add(1) => {
                    if end > last.1 {
                        last.1 = end;
                    }
                }
                _ => merged.push((start, end)),
            }
        }
        Self { ranges: merged }
    }

    /// Every character of `chars`, each as its own range
    #[must_use]
    pub fn from_chars(chars: &str) -> Self {
        Self::new(chars.chars().map(|c| (c, c)))
    }

    #[must_use]
    pub fn digits() -> Self {
        Self::new([('0', '9')])
    }

    #[must_use]
    pub fn hex_digits() -> Self {
        Self::new([('0', '9'), ('a', 'f'), ('A', 'F')])
    }

    #[must_use]
    pub fn alphas() -> Self {
        Self::new([('a', 'z'), ('A', 'Z')])
    }

    #[must_use]
    pub fn alphanums() -> Self {
        Self::new([('a', 'z'), ('A', 'Z'), ('0', '9')])
    }

    /// ASCII letters, digits, and `_`
    #[must_use]
    pub fn identifier() -> Self {
        Self::new([('a', 'z'), ('A', 'Z'), ('0', '9'), ('_', '_')])
    }

    /// Printable, non-space ASCII
    #[must_use]
    pub fn printables() -> Self {
        Self::new([('!', '~')])
    }

    #[must_use]
    pub fn whitespace() -> Self {
        Self::from_chars(" \t\r\n")
    }

    #[must_use]
    pub fn union(&self, other: &Self) -> Self {
        Self::new(self.ranges.iter().chain(other.ranges.iter()).copied())
    }

    #[must_use]
    pub fn matches(&self, c: char) -> bool {
        self.ranges
            .binary_search_by(|&(start, end)| {
                if c < start {
                    std::cmp::Ordering::Greater
                } else if c > end {
                    std::cmp::Ordering::Less
                } else {
                    std::cmp::Ordering::Equal
                }
            })
            .is_ok()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }

    #[must_use]
    pub fn ranges(&self) -> &[(char, char)] {
        &self.ranges
    }

    /// Compact rendering used in default display names
    ///
    /// Runs of three or more consecutive characters collapse to `a-z`.
    ///
    /// ```rust
    /// use tessel::grammar::CharSet;
    ///
    /// assert_eq!(CharSet::alphas().describe(), "A-Za-z");
    /// assert_eq!(CharSet::from_chars("+-").describe(), "+-");
    /// ```
    #[must_use]
    pub fn describe(&self) -> String {
        let mut out = String::new();
        for &(start, end) in &self.ranges {
            let span = u32::from(end) - u32::from(start);
            match span {
                0 => push_escaped(&mut out, start),
                1 => {
                    push_escaped(&mut out, start);
                    push_escaped(&mut out, end);
                }
                _ => {
                    push_escaped(&mut out, start);
                    out.push('-');
                    push_escaped(&mut out, end);
                }
            }
        }
        out
    }
}

fn push_escaped(out: &mut String, c: char) {
    match c {
        '\n' => out.push_str("\\n"),
        '\t' => out.push_str("\\t"),
        '\r' => out.push_str("\\r"),
        c if c.is_control() => {
            let _ = write!(out, "\\u{{{:x}}}", u32::from(c));
        }
        c => out.push(c),
    }
}

impl From<&str> for CharSet {
    fn from(chars: &str) -> Self {
        Self::from_chars(chars)
    }
}
