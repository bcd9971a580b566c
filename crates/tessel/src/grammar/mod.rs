//! # Grammar
//!
//! Expression nodes live in an arena owned by a [`GrammarBuilder`] and are
//! addressed by [`ExprId`] handles. Recursive grammars are written with
//! forwards: [`GrammarBuilder::forward`] allocates a placeholder and
//! [`GrammarBuilder::bind`] attaches its body exactly once.
//!
//! [`GrammarBuilder::build`] validates the arena and freezes it into an
//! immutable, cheaply clonable [`Grammar`] that can be shared across threads.
//!
//! ## Example
//!
//! ```rust
//! use tessel::grammar::{CharSet, GrammarBuilder};
//!
//! let mut g = GrammarBuilder::new();
//! let number = g.word(CharSet::digits())?;
//! let house_number = g.named(number, "house_number");
//! let word = g.word(CharSet::alphas())?;
//! let words = g.one_or_more(word);
//! let street = g.original_text(words);
//! let street_name = g.named(street, "street_name");
//! let address = g.seq([house_number, street_name]);
//!
//! let grammar = g.build(address)?;
//! let results = grammar.parse_string("123 Main St", true)?;
//! assert_eq!(results.get_str("house_number"), Some("123"));
//! assert_eq!(results.get_str("street_name"), Some("Main St"));
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

mod action;
mod builder;
mod charset;
mod display;
pub mod validate;

pub use action::{Action, ActionContext, ActionError};
pub use builder::{GrammarBuilder, RegexFlags};
pub use charset::CharSet;

use crate::peg::ParseConfig;
use crate::results::Value;
use compact_str::CompactString;
use smallvec::SmallVec;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Handle to an expression node
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ExprId(u32);

impl ExprId {
    pub(crate) fn from_index(index: usize) -> Self {
        Self(u32::try_from(index).unwrap_or(u32::MAX))
    }

    /// Position of this node in its grammar's arena
    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Debug for ExprId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ExprId({})", self.0)
    }
}

pub type Children = SmallVec<[ExprId; 4]>;

/// The expression variants
#[derive(Debug, Clone)]
pub enum NodeKind {
    /// Exact text, optionally compared case-insensitively
    Literal { text: CompactString, caseless: bool },
    /// Literal that may not touch identifier characters on either side
    Keyword {
        text: CompactString,
        caseless: bool,
        ident_chars: CharSet,
    },
    /// A run of characters: first from `init`, the rest from `body`
    Word {
        init: CharSet,
        body: CharSet,
        min: usize,
        max: Option<usize>,
    },
    /// A run of characters not in `excluded`
    CharsNotIn {
        excluded: CharSet,
        min: usize,
        max: Option<usize>,
    },
    Regex {
        pattern: CompactString,
        regex: regex::Regex,
    },
    /// All children in order; a [`NodeKind::Commit`] child forbids
    /// backtracking out of the children after it
    Sequence(Children),
    /// First child to match wins
    OrderedChoice(Children),
    /// Longest match wins; ties go to the earliest child
    LongestChoice(Children),
    /// Every child, in any order
    Each(Children),
    Repeat {
        child: ExprId,
        min: usize,
        max: Option<usize>,
        stop: Option<ExprId>,
    },
    Optional {
        child: ExprId,
        default: Option<Value>,
    },
    /// Match `child` without consuming; named fields are kept, tokens dropped
    Lookahead(ExprId),
    /// Succeed, consuming nothing, only if `child` fails
    NotAhead(ExprId),
    /// Succeed, consuming nothing, if `child` matches text ending here
    ///
    /// `retreat` bounds how many characters back the match may start.
    PrecededBy {
        child: ExprId,
        retreat: Option<usize>,
    },
    Forward {
        label: CompactString,
        target: Option<ExprId>,
    },
    /// Run `action` on the child's results
    Transform { child: ExprId, action: Action },
    /// Record the child's tokens under `name`
    Named {
        child: ExprId,
        name: CompactString,
        accumulate: bool,
    },
    /// Wrap the child's tokens into one nested result
    Group(ExprId),
    /// Turn each grouped `[key, value...]` token into a field named `key`
    Dict(ExprId),
    /// Match the child but keep no tokens
    Suppress(ExprId),
    /// Join the child's tokens into one string; no whitespace inside
    Combine { child: ExprId, joiner: CompactString },
    /// The exact input text the child spanned
    OriginalText(ExprId),
    /// Consume input up to the next match of `target`
    SkipTo {
        target: ExprId,
        include: bool,
        fail_on: Option<ExprId>,
    },
    Empty,
    NoMatch,
    StringStart,
    StringEnd,
    /// Match at the first column of a line
    LineStart,
    LineEnd,
    /// Match where a run of `chars` begins
    WordStart(CharSet),
    /// Match where a run of `chars` ends
    WordEnd(CharSet),
    /// Sequence marker: failures after this point are syntax failures
    Commit,
}

impl NodeKind {
    /// Direct children, in evaluation order
    #[must_use]
    pub fn children(&self) -> Children {
        match self {
            Self::Sequence(cs)
            | Self::OrderedChoice(cs)
            | Self::LongestChoice(cs)
            | Self::Each(cs) => cs.clone(),
            Self::Repeat { child, stop, .. } => {
                let mut out: Children = smallvec::smallvec![*child];
                out.extend(*stop);
                out
            }
            Self::SkipTo {
                target, fail_on, ..
            } => {
                let mut out: Children = smallvec::smallvec![*target];
                out.extend(*fail_on);
                out
            }
            Self::Optional { child, .. }
            | Self::Transform { child, .. }
            | Self::Named { child, .. }
            | Self::Combine { child, .. }
            | Self::PrecededBy { child, .. } => smallvec::smallvec![*child],
            Self::Lookahead(child)
            | Self::NotAhead(child)
            | Self::Group(child)
            | Self::Dict(child)
            | Self::Suppress(child)
            | Self::OriginalText(child) => smallvec::smallvec![*child],
            Self::Forward { target, .. } => target.iter().copied().collect(),
            Self::Literal { .. }
            | Self::Keyword { .. }
            | Self::Word { .. }
            | Self::CharsNotIn { .. }
            | Self::Regex { .. }
            | Self::Empty
            | Self::NoMatch
            | Self::StringStart
            | Self::StringEnd
            | Self::LineStart
            | Self::LineEnd
            | Self::WordStart(_)
            | Self::WordEnd(_)
            | Self::Commit => Children::new(),
        }
    }
}

/// One expression in the arena
#[derive(Debug, Clone)]
pub struct Node {
    pub(crate) kind: NodeKind,
    pub(crate) custom_name: Option<CompactString>,
    pub(crate) skip_whitespace: bool,
    pub(crate) whitespace: CharSet,
    pub(crate) ignores: SmallVec<[ExprId; 1]>,
    /// Filled in by `build`
    pub(crate) display: Arc<str>,
    /// Filled in by `build`
    pub(crate) message: Arc<str>,
    /// Filled in by `build`: a name on this node records all its tokens
    /// as one list
    pub(crate) saves_list: bool,
}

impl Node {
    pub(crate) fn new(kind: NodeKind, whitespace: CharSet) -> Self {
        Self {
            kind,
            custom_name: None,
            skip_whitespace: true,
            whitespace,
            ignores: SmallVec::new(),
            display: Arc::from(""),
            message: Arc::from(""),
            saves_list: false,
        }
    }

    #[must_use]
    pub const fn kind(&self) -> &NodeKind {
        &self.kind
    }

    /// The name shown in failure messages
    #[must_use]
    pub fn display_name(&self) -> &str {
        &self.display
    }

    /// The name set with [`GrammarBuilder::set_name`], if any
    #[must_use]
    pub fn custom_name(&self) -> Option<&str> {
        self.custom_name.as_deref()
    }

    /// The failure description, e.g. `Expected W:(0-9)`
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Whether leading whitespace is skipped before this node matches
    #[must_use]
    pub const fn skips_whitespace(&self) -> bool {
        self.skip_whitespace
    }

    /// Characters skipped before this node matches
    #[must_use]
    pub const fn whitespace(&self) -> &CharSet {
        &self.whitespace
    }

    /// Expressions skipped, together with whitespace, before this node
    #[must_use]
    pub fn ignores(&self) -> &[ExprId] {
        &self.ignores
    }

    #[must_use]
    pub fn children(&self) -> Children {
        self.kind.children()
    }
}

#[derive(Debug)]
pub(crate) struct GrammarInner {
    pub(crate) nodes: Vec<Node>,
    pub(crate) root: ExprId,
    pub(crate) default_whitespace: CharSet,
    /// Forwards that can reach themselves without consuming input
    pub(crate) left_recursive: Vec<ExprId>,
    /// Set once the missing left-recursion memoization has been logged
    pub(crate) left_recursion_warned: AtomicBool,
}

/// A validated, immutable grammar
///
/// Cloning is cheap; clones share the node arena. A grammar is `Send + Sync`
/// as long as its actions are, which [`Action`] requires.
#[derive(Debug, Clone)]
pub struct Grammar {
    pub(crate) inner: Arc<GrammarInner>,
    pub(crate) config: ParseConfig,
}

impl Grammar {
    /// The node parsing starts from
    #[must_use]
    pub fn root(&self) -> ExprId {
        self.inner.root
    }

    /// Look up a node by handle
    #[must_use]
    pub fn node(&self, id: ExprId) -> Option<&Node> {
        self.inner.nodes.get(id.index())
    }

    pub(crate) fn node_ref(&self, id: ExprId) -> &Node {
        &self.inner.nodes[id.index()]
    }

    /// Number of nodes in the arena
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.nodes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.nodes.is_empty()
    }

    #[must_use]
    pub fn display_name(&self, id: ExprId) -> Option<&str> {
        self.node(id).map(Node::display_name)
    }

    #[must_use]
    pub fn children(&self, id: ExprId) -> Children {
        self.node(id).map(Node::children).unwrap_or_default()
    }

    /// Every node reachable from `start`, depth-first, each visited once
    ///
    /// Cycles through forwards are cut by a visited set keyed on node index.
    #[must_use]
    pub fn walk(&self, start: ExprId) -> Vec<ExprId> {
        walk_nodes(&self.inner.nodes, start)
    }

    /// Characters skipped before checking for end of text
    #[must_use]
    pub fn default_whitespace(&self) -> &CharSet {
        &self.inner.default_whitespace
    }

    #[must_use]
    pub const fn config(&self) -> &ParseConfig {
        &self.config
    }

    /// Use `config` for every parse started from this grammar
    #[must_use]
    pub fn with_config(mut self, config: ParseConfig) -> Self {
        self.config = config;
        self
    }

    /// Forwards that can reach themselves without consuming input
    #[must_use]
    pub fn left_recursive_forwards(&self) -> &[ExprId] {
        &self.inner.left_recursive
    }

    /// Log left-recursive forwards parsed without left-recursion
    /// memoization, once per grammar and its clones
    pub(crate) fn warn_unsupported_left_recursion(&self) {
        if self.config.memoization == crate::peg::Memoization::LeftRecursion
            || self.inner.left_recursive.is_empty()
            || self.inner.left_recursion_warned.swap(true, Ordering::Relaxed)
        {
            return;
        }
        for &id in &self.inner.left_recursive {
            log::warn!(
                "{} is left-recursive but left-recursion memoization is off; parsing it will hit the recursion limit",
                self.node_ref(id).display_name()
            );
        }
    }
}

pub(crate) fn walk_nodes(nodes: &[Node], start: ExprId) -> Vec<ExprId> {
    let mut visited = vec![false; nodes.len()];
    let mut order = Vec::new();
    let mut stack = vec![start];
    while let Some(id) = stack.pop() {
        let Some(node) = nodes.get(id.index()) else {
            continue;
        };
        if std::mem::replace(&mut visited[id.index()], true) {
            continue;
        }
        order.push(id);
        let mut next: Children = node.children();
        next.extend(node.ignores.iter().copied());
        stack.extend(next.into_iter().rev());
    }
    order
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_walk_visits_cycle_once() {
        let mut g = GrammarBuilder::new();
        let expr = g.forward("expr");
        let open = g.literal("(").expect("literal");
        let close = g.literal(")").expect("literal");
        let nested = g.seq([open, expr, close]);
        let atom = g.literal("x").expect("literal");
        let body = g.first_of([nested, atom]);
        g.bind(expr, body).expect("bind");
        let grammar = g.build(expr).expect("build");

        let order = grammar.walk(expr);
        assert_eq!(order.len(), 6);
        assert_eq!(order[0], expr);
        assert_eq!(order[1], body);
    }

    #[test]
    fn test_node_accessors() {
        let mut g = GrammarBuilder::new();
        let lit = g.literal("if").expect("literal");
        let grammar = g.build(lit).expect("build");
        let node = grammar.node(lit).expect("node");
        assert_eq!(node.display_name(), "'if'");
        assert_eq!(node.message(), "Expected 'if'");
        assert!(node.skips_whitespace());
        assert!(node.children().is_empty());
    }

    #[test]
    fn test_left_recursion_warning_is_logged_once() {
        let mut g = GrammarBuilder::new();
        let rule = g.forward("rule");
        let x = g.literal("x").expect("literal");
        let y = g.literal("y").expect("literal");
        let grow = g.seq([rule, x]);
        let body = g.first_of([grow, y]);
        g.bind(rule, body).expect("bind");
        let grammar = g.build(rule).expect("build");
        let warned = || grammar.inner.left_recursion_warned.load(Ordering::Relaxed);

        grammar
            .clone()
            .with_config(ParseConfig::left_recursion())
            .warn_unsupported_left_recursion();
        assert!(!warned());
        grammar.warn_unsupported_left_recursion();
        assert!(warned());
    }

    #[test]
    fn test_grammar_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Grammar>();
    }
}
