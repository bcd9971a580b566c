//! # Error Types
//!
//! Failures come in four kinds:
//!
//! - **Mismatch**: the grammar did not match. Ordinary backtracking failure,
//!   reported with the furthest position any alternative reached.
//! - **Syntax**: a committed sequence failed after its commit point, or an
//!   action rejected a match fatally. Never retried by enclosing choices.
//! - **Grammar**: the grammar itself is unusable ([`GrammarError`]), either at
//!   construction or when a left-recursive rule fails to converge.
//! - **Action**: an error returned by caller code inside a parse action,
//!   passed through unchanged.
//!
//! Mismatch and syntax failures carry a [`Report`] with line, column, and a
//! renderable source excerpt.
//!
//! ## Diagnostics Support
//!
//! When the `diagnostics` feature is enabled, [`ParseError`] and
//! [`GrammarError`] implement [`miette::Diagnostic`].

pub mod diagnostics;
mod report;

pub use report::Report;

use crate::grammar::ExprId;
use std::sync::Arc;
use thiserror::Error;

#[cfg(feature = "diagnostics")]
use miette::Diagnostic as MietteDiagnostic;

/// A grammar that cannot be built or cannot be run
#[derive(Debug, Clone, Error)]
#[cfg_attr(feature = "diagnostics", derive(MietteDiagnostic))]
pub enum GrammarError {
    #[error("invalid repetition bounds: min {min} exceeds max {max}")]
    #[cfg_attr(feature = "diagnostics", diagnostic(code(grammar::invalid_bounds)))]
    InvalidBounds { min: usize, max: usize },

    #[error("character set for {what} is empty")]
    #[cfg_attr(feature = "diagnostics", diagnostic(code(grammar::empty_charset)))]
    EmptyCharSet { what: &'static str },

    #[error("minimum length of {what} must be at least 1")]
    #[cfg_attr(feature = "diagnostics", diagnostic(code(grammar::zero_minimum)))]
    ZeroMinimum { what: &'static str },

    #[error("literal text must not be empty")]
    #[cfg_attr(
        feature = "diagnostics",
        diagnostic(code(grammar::empty_literal), help("use `empty()` to match nothing"))
    )]
    EmptyLiteral,

    #[error("invalid regular expression: {0}")]
    #[cfg_attr(feature = "diagnostics", diagnostic(code(grammar::invalid_regex)))]
    InvalidRegex(#[from] regex::Error),

    #[error("forward `{name}` is already bound")]
    #[cfg_attr(feature = "diagnostics", diagnostic(code(grammar::forward_rebound)))]
    ForwardRebound { name: String },

    #[error("forward `{name}` is used but never bound")]
    #[cfg_attr(feature = "diagnostics", diagnostic(code(grammar::unbound_forward)))]
    UnboundForward { name: String },

    #[error("{0:?} is not a forward")]
    #[cfg_attr(feature = "diagnostics", diagnostic(code(grammar::not_a_forward)))]
    NotAForward(ExprId),

    #[error("{0:?} does not belong to this grammar")]
    #[cfg_attr(feature = "diagnostics", diagnostic(code(grammar::unknown_expr)))]
    UnknownExpr(ExprId),

    #[error("commit marker {0:?} is only valid as a direct child of a sequence")]
    #[cfg_attr(feature = "diagnostics", diagnostic(code(grammar::misplaced_commit)))]
    MisplacedCommit(ExprId),

    #[error("left-recursive rule `{name}` did not converge within {limit} growth iterations at offset {position}")]
    #[cfg_attr(
        feature = "diagnostics",
        diagnostic(
            code(grammar::left_recursion_bound),
            help("the rule is unproductively left-recursive")
        )
    )]
    LeftRecursionBound {
        name: String,
        position: usize,
        limit: usize,
    },

    #[error("recursion depth limit of {limit} exceeded at offset {position}")]
    #[cfg_attr(feature = "diagnostics", diagnostic(code(grammar::recursion_limit)))]
    RecursionLimit { limit: usize, position: usize },
}

/// A failed match attempt: where it happened and what was expected there
///
/// The offending text is derived from the input when a [`Report`] is built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    /// Byte offset of the failure
    pub position: usize,
    /// Human-readable description, e.g. `Expected ','`
    pub message: Arc<str>,
}

impl Diagnostic {
    #[must_use]
    pub fn new(position: usize, message: impl Into<Arc<str>>) -> Self {
        Self {
            position,
            message: message.into(),
        }
    }

    /// Keep whichever diagnostic progressed further; `self` wins ties
    #[must_use]
    pub fn furthest(self, other: Self) -> Self {
        if other.position > self.position {
            other
        } else {
            self
        }
    }
}

/// Errors returned by the invocation API
#[derive(Debug, Error)]
pub enum ParseError {
    /// The grammar did not match the input
    #[error("{0}")]
    Mismatch(Report),

    /// A committed rule failed, or an action rejected its match fatally
    #[error("{0}")]
    Syntax(Report),

    #[error(transparent)]
    Grammar(#[from] GrammarError),

    /// A parse action returned an error of its own
    #[error("parse action failed at offset {position}: {source}")]
    Action {
        position: usize,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

impl ParseError {
    /// The failure report, for mismatch and syntax failures
    #[must_use]
    pub const fn report(&self) -> Option<&Report> {
        match self {
            Self::Mismatch(report) | Self::Syntax(report) => Some(report),
            Self::Grammar(_) | Self::Action { .. } => None,
        }
    }

    /// Byte offset of the failure, when it has one
    #[must_use]
    pub fn position(&self) -> Option<usize> {
        match self {
            Self::Mismatch(report) | Self::Syntax(report) => Some(report.position()),
            Self::Action { position, .. } => Some(*position),
            Self::Grammar(GrammarError::LeftRecursionBound { position, .. })
            | Self::Grammar(GrammarError::RecursionLimit { position, .. }) => Some(*position),
            Self::Grammar(_) => None,
        }
    }

    #[must_use]
    pub const fn is_mismatch(&self) -> bool {
        matches!(self, Self::Mismatch(_))
    }

    #[must_use]
    pub const fn is_syntax(&self) -> bool {
        matches!(self, Self::Syntax(_))
    }
}

#[cfg(feature = "diagnostics")]
impl MietteDiagnostic for ParseError {
    fn code<'a>(&'a self) -> Option<Box<dyn std::fmt::Display + 'a>> {
        let code = match self {
            Self::Mismatch(_) => "parser::mismatch",
            Self::Syntax(_) => "parser::syntax",
            Self::Grammar(inner) => return inner.code(),
            Self::Action { .. } => "parser::action",
        };
        Some(Box::new(code))
    }

    fn source_code(&self) -> Option<&dyn miette::SourceCode> {
        self.report().map(Report::miette_source)
    }

    fn labels(&self) -> Option<Box<dyn Iterator<Item = miette::LabeledSpan> + '_>> {
        let report = self.report()?;
        let label = miette::LabeledSpan::new_with_span(
            Some(report.diagnostic().message.to_string()),
            report.line_span(),
        );
        Some(Box::new(std::iter::once(label)))
    }
}
