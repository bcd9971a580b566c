#[cfg(feature = "serialize")]
use serde::{Deserialize, Serialize};

/// Memoization strategy used while matching
///
/// Packrat caching and left-recursion support are mutually exclusive; pick
/// one per grammar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serialize", derive(Serialize, Deserialize))]
pub enum Memoization {
    /// Every attempt is evaluated afresh
    #[default]
    Disabled,
    /// Cache the outcome of each (node, position, flags) attempt
    ///
    /// With `capacity: Some(n)` only the `n` most recently used outcomes are
    /// kept.
    Packrat { capacity: Option<usize> },
    /// Grow a seed match at forwards so left-recursive rules terminate
    LeftRecursion,
}

/// Configuration options for parsing with a [`Grammar`](crate::Grammar)
///
/// # Example
///
/// ```rust
/// use tessel::{Memoization, ParseConfig};
///
/// let config = ParseConfig {
///     memoization: Memoization::Packrat { capacity: Some(4096) },
///     ..ParseConfig::default()
/// };
/// assert!(!config.keep_tabs);
/// assert_eq!(config.tab_size, 8);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serialize", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serialize", serde(default))]
pub struct ParseConfig {
    pub memoization: Memoization,

    /// Leave tab characters in the input as they are
    ///
    /// By default tabs are expanded to spaces (up to the next multiple of
    /// `tab_size` columns) before matching, so reported columns line up with
    /// what an editor shows.
    pub keep_tabs: bool,

    pub tab_size: usize,

    /// Maximum nesting depth of node attempts, `None` for unlimited
    ///
    /// Exceeding it aborts the parse with
    /// [`GrammarError::RecursionLimit`](crate::GrammarError::RecursionLimit).
    /// The matcher grows its stack on the heap as it nests, so the limit is
    /// not tied to the thread's stack size.
    pub recursion_limit: Option<usize>,

    /// Growth rounds allowed for one left-recursive seed
    ///
    /// `None` allows one more round than there are bytes left, which a
    /// productive rule never needs. Exceeding the bound aborts the parse
    /// with
    /// [`GrammarError::LeftRecursionBound`](crate::GrammarError::LeftRecursionBound).
    pub left_recursion_bound: Option<usize>,
}

impl Default for ParseConfig {
    fn default() -> Self {
        Self {
            memoization: Memoization::Disabled,
            keep_tabs: false,
            tab_size: 8,
            recursion_limit: Some(1_000),
            left_recursion_bound: None,
        }
    }
}

impl ParseConfig {
    /// Default configuration with unbounded packrat caching
    #[must_use]
    pub fn packrat() -> Self {
        Self {
            memoization: Memoization::Packrat { capacity: None },
            ..Self::default()
        }
    }

    /// Default configuration with left-recursion support
    #[must_use]
    pub fn left_recursion() -> Self {
        Self {
            memoization: Memoization::LeftRecursion,
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_disables_memoization() {
        let config = ParseConfig::default();
        assert_eq!(config.memoization, Memoization::Disabled);
        assert_eq!(config.tab_size, 8);
        assert!(!config.keep_tabs);
        assert_eq!(config.recursion_limit, Some(1_000));
        assert_eq!(config.left_recursion_bound, None);
    }

    #[test]
    fn test_presets() {
        assert_eq!(
            ParseConfig::packrat().memoization,
            Memoization::Packrat { capacity: None }
        );
        assert_eq!(
            ParseConfig::left_recursion().memoization,
            Memoization::LeftRecursion
        );
    }
}
