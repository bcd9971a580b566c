//! Parse actions attached to expressions
//!
//! An action runs after its expression matches and may rewrite the match
//! results in place, reject the match, or fail with an error of its own.
//! Actions only run on the final, committed evaluation of a node: probes made
//! by longest-choice comparison, lookahead, and left-recursion growth skip
//! them.
//!
//! # Example
//!
//! ```rust
//! use tessel::grammar::{ActionError, GrammarBuilder};
//! use tessel::Value;
//!
//! let mut g = GrammarBuilder::new();
//! let digits = g.word("0123456789")?;
//! let number = g.action(digits, |_ctx, results| {
//!     let text = results.joined();
//!     let n: i64 = text
//!         .parse()
//!         .map_err(|e| ActionError::failed(e))?;
//!     results.set_tokens([Value::Int(n)]);
//!     Ok(())
//! });
//! let grammar = g.build(number)?;
//! let results = grammar.parse_string("42", true)?;
//! assert_eq!(results[0], Value::Int(42));
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

use crate::results::MatchResults;
use crate::syntax::Span;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// Where an action's match happened
#[derive(Debug, Clone, Copy)]
pub struct ActionContext<'i> {
    /// The full text being parsed
    pub input: &'i str,
    /// Byte offset where the match starts, after whitespace skipping
    pub start: usize,
    /// Byte offset just past the match
    pub end: usize,
}

impl<'i> ActionContext<'i> {
    /// The matched slice of the input
    #[must_use]
    pub fn matched_text(&self) -> &'i str {
        self.span().slice(self.input)
    }

    #[must_use]
    pub const fn span(&self) -> Span {
        Span::new(self.start, self.end)
    }
}

/// Why an action refused its match
#[derive(Debug, Error)]
pub enum ActionError {
    /// Treat the match as an ordinary failure; alternatives are still tried
    #[error("{0}")]
    Reject(String),

    /// Treat the match as a syntax failure that no alternative may recover
    #[error("{0}")]
    Fatal(String),

    /// Caller error, passed out of the parse unchanged
    #[error(transparent)]
    Failed(Box<dyn std::error::Error + Send + Sync>),
}

impl ActionError {
    pub fn reject(message: impl Into<String>) -> Self {
        Self::Reject(message.into())
    }

    pub fn fatal(message: impl Into<String>) -> Self {
        Self::Fatal(message.into())
    }

    pub fn failed<E>(error: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Failed(Box::new(error))
    }
}

type ActionFn =
    dyn Fn(&ActionContext<'_>, &mut MatchResults) -> Result<(), ActionError> + Send + Sync;

/// A shareable parse action
#[derive(Clone)]
pub struct Action(Arc<ActionFn>);

impl Action {
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&ActionContext<'_>, &mut MatchResults) -> Result<(), ActionError>
            + Send
            + Sync
            + 'static,
    {
        Self(Arc::new(f))
    }

    pub(crate) fn call(
        &self,
        ctx: &ActionContext<'_>,
        results: &mut MatchResults,
    ) -> Result<(), ActionError> {
        (self.0)(ctx, results)
    }
}

impl fmt::Debug for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Action(..)")
    }
}
