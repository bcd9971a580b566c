//! # Matching Backend
//!
//! Packrat-capable recursive-descent matching over a [`Grammar`].
//!
//! A [`Parser`] pairs a grammar with the mutable state of a parse: the memo
//! tables and the metrics. The convenience methods on [`Grammar`]
//! (`parse_string`, `scan_string`, `search_string`, `transform_string`)
//! create a fresh parser for each call, so a shared grammar can be used from
//! many threads at once.
//!
//! ## Memoization
//!
//! Chosen per grammar through [`ParseConfig::memoization`]:
//!
//! - [`Memoization::Disabled`]: plain backtracking.
//! - [`Memoization::Packrat`]: each (node, position) outcome is cached for
//!   the duration of one parse. Results are identical to the uncached run.
//! - [`Memoization::LeftRecursion`]: forwards grow a seed match so rules
//!   like `expr := expr '+' term | term` terminate.
//!
//! Caches are cleared at the start of every top-level invocation.

mod config;
mod parser;
mod scan;
mod state;
mod trace;

pub use config::{Memoization, ParseConfig};
pub use scan::ScanIter;
pub use state::ParseMetrics;
pub use trace::{LogTracer, Tracer};

use crate::error::{Diagnostic, ParseError, Report};
use crate::grammar::Grammar;
use crate::input::{skip_chars, InputView};
use crate::results::MatchResults;
use parser::{Matcher, Outcome, Step};
use state::ParserState;
use std::fmt;
use std::sync::Arc;

/// A grammar together with reusable parse state
///
/// # Example
///
/// ```rust
/// use tessel::{CharSet, GrammarBuilder, ParseConfig, Parser};
///
/// let mut g = GrammarBuilder::new();
/// let digits = g.word(CharSet::digits())?;
/// let grammar = g.build(digits)?.with_config(ParseConfig::packrat());
///
/// let mut parser = Parser::new(&grammar);
/// let results = parser.parse("123abc", false)?;
/// assert_eq!(results[0], "123");
/// assert!(parser.parse("123abc", true).is_err());
/// assert!(parser.metrics().attempts > 0);
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub struct Parser {
    grammar: Grammar,
    state: ParserState,
    tracer: Option<Arc<dyn Tracer>>,
}

impl fmt::Debug for Parser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Parser")
            .field("grammar", &self.grammar)
            .field("state", &self.state)
            .field("tracer", &self.tracer.is_some())
            .finish()
    }
}

impl Parser {
    #[must_use]
    pub fn new(grammar: &Grammar) -> Self {
        grammar.warn_unsupported_left_recursion();
        Self {
            grammar: grammar.clone(),
            state: ParserState::new(grammar.config()),
            tracer: None,
        }
    }

    /// Report node attempts to `tracer`
    #[must_use]
    pub fn with_tracer(mut self, tracer: Arc<dyn Tracer>) -> Self {
        self.tracer = Some(tracer);
        self
    }

    #[must_use]
    pub const fn grammar(&self) -> &Grammar {
        &self.grammar
    }

    /// Match the grammar's root at the start of `text`
    ///
    /// With `parse_all`, anything but trailing whitespace left after the
    /// match is an error (`Expected end of text`).
    ///
    /// # Errors
    ///
    /// [`ParseError::Mismatch`] with the furthest failure when the grammar
    /// does not match; the other variants for syntax failures, grammar
    /// problems, and action errors.
    pub fn parse(&mut self, text: &str, parse_all: bool) -> Result<MatchResults, ParseError> {
        let view = InputView::new(text, self.grammar.config());
        self.parse_text(view.text(), parse_all)
    }

    fn parse_text(&mut self, text: &str, parse_all: bool) -> Result<MatchResults, ParseError> {
        log::debug!(
            "parse of {} chars with {:?} memoization",
            text.len(),
            self.grammar.config().memoization
        );
        self.state.clear_memo();
        let grammar = &self.grammar;
        let mut matcher = Matcher::new(grammar, text, &mut self.state, self.tracer.as_deref());
        let outcome = match_root(&mut matcher, grammar, text, parse_all);
        let results = match outcome {
            Ok(Step::Matched { results, .. }) => Ok(results),
            Ok(Step::Failed(diagnostic)) => {
                Err(ParseError::Mismatch(Report::new(text, diagnostic)))
            }
            Err(halt) => Err(halt.into_error(text)),
        };
        log::debug!(
            "parse finished: {} ({:?})",
            if results.is_ok() { "matched" } else { "failed" },
            self.state.metrics
        );
        results
    }

    /// Drop all cached outcomes and zero the metrics
    pub fn reset(&mut self) {
        self.state.clear_memo();
        self.state.metrics = ParseMetrics::default();
    }

    /// Counters accumulated since creation or the last [`reset`](Self::reset)
    #[must_use]
    pub const fn metrics(&self) -> ParseMetrics {
        self.state.metrics
    }

    /// Number of outcomes currently cached
    #[must_use]
    pub fn cached_entries(&self) -> usize {
        self.state.memo_len()
    }
}

/// Match the root at 0 and, with `parse_all`, require the end of text
fn match_root(matcher: &mut Matcher<'_>, grammar: &Grammar, text: &str, parse_all: bool) -> Outcome {
    let root = grammar.root();
    let step = matcher.match_expr(root, 0, true, true)?;
    let Step::Matched { end, results } = step else {
        return Ok(step);
    };
    if !parse_all {
        return Ok(Step::Matched { end, results });
    }
    let loc = matcher.skip_leading(grammar.node_ref(root), end)?;
    let loc = skip_chars(text, loc, grammar.default_whitespace());
    if loc < text.len() {
        return Ok(Step::Failed(Diagnostic::new(loc, "Expected end of text")));
    }
    Ok(Step::Matched { end: loc, results })
}

impl Grammar {
    /// Parse `text` from its start
    ///
    /// See [`Parser::parse`].
    ///
    /// # Errors
    ///
    /// As for [`Parser::parse`].
    pub fn parse_string(&self, text: &str, parse_all: bool) -> Result<MatchResults, ParseError> {
        Parser::new(self).parse(text, parse_all)
    }

    /// Whether `text` matches, discarding results and diagnostics
    #[must_use]
    pub fn matches(&self, text: &str, parse_all: bool) -> bool {
        self.parse_string(text, parse_all).is_ok()
    }

    /// Lazily find every non-overlapping match in `text`
    ///
    /// Items are `(results, start, end)` with byte offsets into the text
    /// after tab expansion. A syntax, grammar, or action error is yielded
    /// once and ends the scan.
    #[must_use]
    pub fn scan_string<'t>(&self, text: &'t str) -> ScanIter<'t> {
        ScanIter::new(self, InputView::new(text, self.config()))
    }

    /// Every match [`scan_string`](Self::scan_string) finds, eagerly
    ///
    /// # Errors
    ///
    /// The first error the scan yields.
    pub fn search_string(&self, text: &str) -> Result<Vec<MatchResults>, ParseError> {
        self.scan_string(text)
            .map(|item| item.map(|(results, _, _)| results))
            .collect()
    }

    /// Replace each match in `text` with its flattened tokens
    ///
    /// Text between matches is copied unchanged; tabs are never expanded.
    ///
    /// # Errors
    ///
    /// The first error the scan yields.
    pub fn transform_string(&self, text: &str) -> Result<String, ParseError> {
        let mut out = String::with_capacity(text.len());
        let mut last = 0;
        for item in ScanIter::new(self, InputView::verbatim(text)) {
            let (results, start, end) = item?;
            out.push_str(&text[last..start]);
            out.push_str(&results.joined());
            last = end;
        }
        out.push_str(&text[last..]);
        Ok(out)
    }
}
