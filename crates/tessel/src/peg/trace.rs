//! Observation hooks for match attempts
//!
//! A [`Tracer`] attached to a [`Parser`](super::Parser) is told about each
//! attempt, success, and failure of the nodes it selects. Tracing never
//! changes the outcome of a parse.

use crate::error::Diagnostic;
use crate::grammar::{ExprId, Grammar, Node};
use crate::results::MatchResults;

/// Callbacks invoked around node attempts
pub trait Tracer: Send + Sync {
    /// Whether attempts of `node` should be reported
    ///
    /// Defaults to nodes given a name with
    /// [`GrammarBuilder::set_name`](crate::GrammarBuilder::set_name).
    fn wants(&self, node: &Node) -> bool {
        node.custom_name().is_some()
    }

    fn on_try(&self, grammar: &Grammar, id: ExprId, position: usize);

    fn on_match(
        &self,
        grammar: &Grammar,
        id: ExprId,
        start: usize,
        end: usize,
        results: &MatchResults,
    );

    fn on_fail(&self, grammar: &Grammar, id: ExprId, diagnostic: &Diagnostic);
}

/// Writes each traced event through the `log` facade at debug level
#[derive(Debug, Clone, Copy, Default)]
pub struct LogTracer {
    all_nodes: bool,
}

impl LogTracer {
    /// Trace only named nodes
    #[must_use]
    pub const fn new() -> Self {
        Self { all_nodes: false }
    }

    /// Trace every node, named or not
    #[must_use]
    pub const fn all_nodes() -> Self {
        Self { all_nodes: true }
    }
}

impl Tracer for LogTracer {
    fn wants(&self, node: &Node) -> bool {
        self.all_nodes || node.custom_name().is_some()
    }

    fn on_try(&self, grammar: &Grammar, id: ExprId, position: usize) {
        log::debug!(
            "match {} at offset {position}",
            grammar.display_name(id).unwrap_or("?")
        );
    }

    fn on_match(
        &self,
        grammar: &Grammar,
        id: ExprId,
        start: usize,
        end: usize,
        results: &MatchResults,
    ) {
        log::debug!(
            "matched {} at {start}..{end} -> {results}",
            grammar.display_name(id).unwrap_or("?")
        );
    }

    fn on_fail(&self, grammar: &Grammar, id: ExprId, diagnostic: &Diagnostic) {
        log::debug!(
            "match {} failed at offset {}: {}",
            grammar.display_name(id).unwrap_or("?"),
            diagnostic.position,
            diagnostic.message
        );
    }
}
