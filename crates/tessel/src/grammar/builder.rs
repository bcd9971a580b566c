use super::display::assign_names;
use super::validate;
use super::{Action, ActionContext, ActionError, CharSet, ExprId, Grammar, GrammarInner, Node, NodeKind};
use crate::error::GrammarError;
use crate::peg::ParseConfig;
use crate::results::{MatchResults, Value};
use compact_str::CompactString;
use std::ops::{Bound, RangeBounds};
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

/// Whitespace skipped by default before each node
pub const DEFAULT_WHITESPACE: &str = " \n\t\r";

/// Flags for [`GrammarBuilder::regex_with`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RegexFlags {
    pub case_insensitive: bool,
    /// `^` and `$` match at line boundaries
    pub multi_line: bool,
    /// `.` also matches `\n`
    pub dot_matches_new_line: bool,
    /// Whitespace and `#` comments in the pattern are ignored
    pub ignore_whitespace: bool,
}

/// Arena for constructing a [`Grammar`]
///
/// Every constructor validates its static arguments immediately and returns
/// a handle to the new node. The default whitespace set is read when a node
/// is created and frozen into it; changing it later only affects nodes
/// created afterwards.
#[derive(Debug, Clone)]
pub struct GrammarBuilder {
    nodes: Vec<Node>,
    default_whitespace: CharSet,
}

impl Default for GrammarBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl GrammarBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self {
            nodes: Vec::new(),
            default_whitespace: CharSet::from_chars(DEFAULT_WHITESPACE),
        }
    }

    /// Whitespace for nodes created from now on
    pub fn set_default_whitespace(&mut self, chars: impl Into<CharSet>) {
        self.default_whitespace = chars.into();
    }

    #[must_use]
    pub const fn default_whitespace(&self) -> &CharSet {
        &self.default_whitespace
    }

    /// Number of nodes allocated so far
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    fn push(&mut self, kind: NodeKind) -> ExprId {
        let id = ExprId::from_index(self.nodes.len());
        self.nodes.push(Node::new(kind, self.default_whitespace.clone()));
        id
    }

    /// Push a node that takes its whitespace policy from `from`
    fn push_inheriting(&mut self, kind: NodeKind, from: Option<ExprId>) -> ExprId {
        let inherited = from
            .and_then(|c| self.nodes.get(c.index()))
            .map(|c| (c.skip_whitespace, c.whitespace.clone()));
        let id = self.push(kind);
        if let Some((skip, whitespace)) = inherited {
            let node = &mut self.nodes[id.index()];
            node.skip_whitespace = skip;
            node.whitespace = whitespace;
        }
        id
    }

    fn push_without_skip(&mut self, kind: NodeKind) -> ExprId {
        let id = self.push(kind);
        self.nodes[id.index()].skip_whitespace = false;
        id
    }

    fn node_mut(&mut self, id: ExprId) -> Result<&mut Node, GrammarError> {
        self.nodes
            .get_mut(id.index())
            .ok_or(GrammarError::UnknownExpr(id))
    }

    // ---- terminals ----

    /// Match `text` exactly
    ///
    /// # Errors
    ///
    /// [`GrammarError::EmptyLiteral`] if `text` is empty.
    pub fn literal(&mut self, text: &str) -> Result<ExprId, GrammarError> {
        self.literal_node(text, false)
    }

    /// Match `text` ignoring case; the grammar's spelling is returned
    ///
    /// # Errors
    ///
    /// [`GrammarError::EmptyLiteral`] if `text` is empty.
    pub fn caseless_literal(&mut self, text: &str) -> Result<ExprId, GrammarError> {
        self.literal_node(text, true)
    }

    fn literal_node(&mut self, text: &str, caseless: bool) -> Result<ExprId, GrammarError> {
        if text.is_empty() {
            return Err(GrammarError::EmptyLiteral);
        }
        Ok(self.push(NodeKind::Literal {
            text: CompactString::from(text),
            caseless,
        }))
    }

    /// Match `text` when not adjacent to identifier characters
    ///
    /// Identifier characters are ASCII letters, digits, `_`, and `$`.
    ///
    /// # Errors
    ///
    /// [`GrammarError::EmptyLiteral`] if `text` is empty.
    pub fn keyword(&mut self, text: &str) -> Result<ExprId, GrammarError> {
        self.keyword_with(text, default_keyword_chars(), false)
    }

    /// # Errors
    ///
    /// [`GrammarError::EmptyLiteral`] if `text` is empty.
    pub fn caseless_keyword(&mut self, text: &str) -> Result<ExprId, GrammarError> {
        self.keyword_with(text, default_keyword_chars(), true)
    }

    /// # Errors
    ///
    /// [`GrammarError::EmptyLiteral`] if `text` is empty.
    pub fn keyword_with(
        &mut self,
        text: &str,
        ident_chars: impl Into<CharSet>,
        caseless: bool,
    ) -> Result<ExprId, GrammarError> {
        if text.is_empty() {
            return Err(GrammarError::EmptyLiteral);
        }
        Ok(self.push(NodeKind::Keyword {
            text: CompactString::from(text),
            caseless,
            ident_chars: ident_chars.into(),
        }))
    }

    /// One or more characters from `chars`
    ///
    /// # Errors
    ///
    /// [`GrammarError::EmptyCharSet`] if `chars` is empty.
    pub fn word(&mut self, chars: impl Into<CharSet>) -> Result<ExprId, GrammarError> {
        let chars = chars.into();
        self.word_bounded(chars.clone(), chars, 1..)
    }

    /// A character from `init` followed by any number from `body`
    ///
    /// # Errors
    ///
    /// [`GrammarError::EmptyCharSet`] if either set is empty.
    pub fn word_with(
        &mut self,
        init: impl Into<CharSet>,
        body: impl Into<CharSet>,
    ) -> Result<ExprId, GrammarError> {
        self.word_bounded(init, body, 1..)
    }

    /// Word whose total length in characters lies within `len`
    ///
    /// # Errors
    ///
    /// [`GrammarError::EmptyCharSet`] for an empty set,
    /// [`GrammarError::ZeroMinimum`] if `len` admits zero characters, and
    /// [`GrammarError::InvalidBounds`] for an empty range.
    pub fn word_bounded(
        &mut self,
        init: impl Into<CharSet>,
        body: impl Into<CharSet>,
        len: impl RangeBounds<usize>,
    ) -> Result<ExprId, GrammarError> {
        let (init, body) = (init.into(), body.into());
        if init.is_empty() {
            return Err(GrammarError::EmptyCharSet { what: "word start" });
        }
        if body.is_empty() {
            return Err(GrammarError::EmptyCharSet { what: "word body" });
        }
        let (min, max) = bounds(&len)?;
        if min == 0 {
            return Err(GrammarError::ZeroMinimum { what: "word" });
        }
        Ok(self.push(NodeKind::Word {
            init,
            body,
            min,
            max,
        }))
    }

    /// A run of characters not in `excluded`, of length within `len`
    ///
    /// Never skips leading whitespace.
    ///
    /// # Errors
    ///
    /// [`GrammarError::EmptyCharSet`] for an empty set,
    /// [`GrammarError::ZeroMinimum`] if `len` admits zero characters, and
    /// [`GrammarError::InvalidBounds`] for an empty range.
    pub fn chars_not_in(
        &mut self,
        excluded: impl Into<CharSet>,
        len: impl RangeBounds<usize>,
    ) -> Result<ExprId, GrammarError> {
        let excluded = excluded.into();
        if excluded.is_empty() {
            return Err(GrammarError::EmptyCharSet { what: "excluded characters" });
        }
        let (min, max) = bounds(&len)?;
        if min == 0 {
            return Err(GrammarError::ZeroMinimum { what: "excluded-character run" });
        }
        Ok(self.push_without_skip(NodeKind::CharsNotIn { excluded, min, max }))
    }

    /// Match a regular expression anchored at the current position
    ///
    /// Named capture groups that participate in the match are recorded as
    /// fields.
    ///
    /// # Errors
    ///
    /// [`GrammarError::InvalidRegex`] if `pattern` does not compile.
    pub fn regex(&mut self, pattern: &str) -> Result<ExprId, GrammarError> {
        self.regex_with(pattern, RegexFlags::default())
    }

    /// # Errors
    ///
    /// [`GrammarError::InvalidRegex`] if `pattern` does not compile.
    pub fn regex_with(&mut self, pattern: &str, flags: RegexFlags) -> Result<ExprId, GrammarError> {
        let regex = regex::RegexBuilder::new(&format!(r"\A(?:{pattern})"))
            .case_insensitive(flags.case_insensitive)
            .multi_line(flags.multi_line)
            .dot_matches_new_line(flags.dot_matches_new_line)
            .ignore_whitespace(flags.ignore_whitespace)
            .build()?;
        Ok(self.push(NodeKind::Regex {
            pattern: CompactString::from(pattern),
            regex,
        }))
    }

    // ---- combinators ----

    /// All of `children`, in order
    pub fn seq(&mut self, children: impl IntoIterator<Item = ExprId>) -> ExprId {
        let children: super::Children = children.into_iter().collect();
        let first = children.first().copied();
        self.push_inheriting(NodeKind::Sequence(children), first)
    }

    /// Commit marker for use inside [`seq`](Self::seq)
    ///
    /// Once the sequence gets past this marker, a failure of any later child
    /// is a syntax failure that enclosing choices will not recover from.
    pub fn commit(&mut self) -> ExprId {
        self.push_without_skip(NodeKind::Commit)
    }

    /// The first of `children` that matches
    pub fn first_of(&mut self, children: impl IntoIterator<Item = ExprId>) -> ExprId {
        let children: super::Children = children.into_iter().collect();
        let skip = self.all_skip(&children);
        let id = self.push(NodeKind::OrderedChoice(children));
        self.nodes[id.index()].skip_whitespace = skip;
        id
    }

    /// Whichever of `children` matches the most input
    pub fn longest_of(&mut self, children: impl IntoIterator<Item = ExprId>) -> ExprId {
        let children: super::Children = children.into_iter().collect();
        let skip = self.all_skip(&children);
        let id = self.push(NodeKind::LongestChoice(children));
        self.nodes[id.index()].skip_whitespace = skip;
        id
    }

    /// All of `children`, in any order
    ///
    /// Children built with [`optional`](Self::optional) may be absent;
    /// children built with [`zero_or_more`](Self::zero_or_more) or
    /// [`one_or_more`](Self::one_or_more) may match several times.
    pub fn each(&mut self, children: impl IntoIterator<Item = ExprId>) -> ExprId {
        let children: super::Children = children.into_iter().collect();
        let skip = self.all_skip(&children);
        let id = self.push(NodeKind::Each(children));
        self.nodes[id.index()].skip_whitespace = skip;
        id
    }

    fn all_skip(&self, children: &[ExprId]) -> bool {
        children
            .iter()
            .filter_map(|c| self.nodes.get(c.index()))
            .all(|n| n.skip_whitespace)
    }

    /// Repeat `child` a number of times within `count`
    ///
    /// # Errors
    ///
    /// [`GrammarError::InvalidBounds`] when the range is empty.
    pub fn repeat(
        &mut self,
        child: ExprId,
        count: impl RangeBounds<usize>,
    ) -> Result<ExprId, GrammarError> {
        let (min, max) = bounds(&count)?;
        Ok(self.repeat_node(child, min, max, None))
    }

    /// Repeat `child` within `count`, stopping early where `stop` would match
    ///
    /// # Errors
    ///
    /// [`GrammarError::InvalidBounds`] when the range is empty.
    pub fn repeat_until(
        &mut self,
        child: ExprId,
        count: impl RangeBounds<usize>,
        stop: ExprId,
    ) -> Result<ExprId, GrammarError> {
        let (min, max) = bounds(&count)?;
        Ok(self.repeat_node(child, min, max, Some(stop)))
    }

    pub fn zero_or_more(&mut self, child: ExprId) -> ExprId {
        self.repeat_node(child, 0, None, None)
    }

    pub fn one_or_more(&mut self, child: ExprId) -> ExprId {
        self.repeat_node(child, 1, None, None)
    }

    fn repeat_node(
        &mut self,
        child: ExprId,
        min: usize,
        max: Option<usize>,
        stop: Option<ExprId>,
    ) -> ExprId {
        self.push_inheriting(
            NodeKind::Repeat {
                child,
                min,
                max,
                stop,
            },
            Some(child),
        )
    }

    pub fn optional(&mut self, child: ExprId) -> ExprId {
        self.push_inheriting(
            NodeKind::Optional {
                child,
                default: None,
            },
            Some(child),
        )
    }

    /// Optional `child` that yields `default` when absent
    pub fn optional_or(&mut self, child: ExprId, default: impl Into<Value>) -> ExprId {
        self.push_inheriting(
            NodeKind::Optional {
                child,
                default: Some(default.into()),
            },
            Some(child),
        )
    }

    /// Succeed if `child` matches here, without consuming input
    pub fn followed_by(&mut self, child: ExprId) -> ExprId {
        self.push_without_skip(NodeKind::Lookahead(child))
    }

    /// Succeed if `child` does not match here, without consuming input
    pub fn not_followed_by(&mut self, child: ExprId) -> ExprId {
        self.push_without_skip(NodeKind::NotAhead(child))
    }

    /// Succeed if `child` matches text that ends at the current position
    ///
    /// The child is matched against the text before the position only, so
    /// it cannot look past it. Consumes nothing; tokens are dropped and
    /// named fields kept.
    pub fn preceded_by(&mut self, child: ExprId) -> ExprId {
        self.push_without_skip(NodeKind::PrecededBy {
            child,
            retreat: None,
        })
    }

    /// Like [`preceded_by`](Self::preceded_by), with the match starting at
    /// most `retreat` characters back
    pub fn preceded_by_within(&mut self, child: ExprId, retreat: usize) -> ExprId {
        self.push_without_skip(NodeKind::PrecededBy {
            child,
            retreat: Some(retreat),
        })
    }

    /// Placeholder for a rule bound later with [`bind`](Self::bind)
    pub fn forward(&mut self, label: &str) -> ExprId {
        self.push(NodeKind::Forward {
            label: CompactString::from(label),
            target: None,
        })
    }

    /// Attach `target` to `forward`; a forward can be bound only once
    ///
    /// # Errors
    ///
    /// [`GrammarError::ForwardRebound`] if already bound,
    /// [`GrammarError::NotAForward`] if `forward` is some other node, and
    /// [`GrammarError::UnknownExpr`] for a handle from another builder.
    pub fn bind(&mut self, forward: ExprId, target: ExprId) -> Result<(), GrammarError> {
        let inherited = self
            .nodes
            .get(target.index())
            .map(|t| (t.skip_whitespace, t.whitespace.clone()))
            .ok_or(GrammarError::UnknownExpr(target))?;
        let node = self.node_mut(forward)?;
        match &mut node.kind {
            NodeKind::Forward {
                target: Some(_),
                label,
            } => {
                log::warn!("forward `{label}` bound more than once; keeping the first binding");
                Err(GrammarError::ForwardRebound {
                    name: label.to_string(),
                })
            }
            NodeKind::Forward { target: slot, .. } => {
                *slot = Some(target);
                node.skip_whitespace = inherited.0;
                node.whitespace = inherited.1;
                Ok(())
            }
            _ => Err(GrammarError::NotAForward(forward)),
        }
    }

    /// Run `f` on the results each time `child` matches
    pub fn action<F>(&mut self, child: ExprId, f: F) -> ExprId
    where
        F: Fn(&ActionContext<'_>, &mut MatchResults) -> Result<(), ActionError>
            + Send
            + Sync
            + 'static,
    {
        self.transform(child, Action::new(f))
    }

    /// Attach an existing [`Action`] to `child`
    pub fn transform(&mut self, child: ExprId, action: Action) -> ExprId {
        self.push_inheriting(NodeKind::Transform { child, action }, Some(child))
    }

    /// Reject matches of `child` for which `predicate` is false
    pub fn condition<P>(&mut self, child: ExprId, predicate: P, message: &str) -> ExprId
    where
        P: Fn(&MatchResults) -> bool + Send + Sync + 'static,
    {
        let message: Arc<str> = Arc::from(message);
        self.action(child, move |_, results| {
            if predicate(results) {
                Ok(())
            } else {
                Err(ActionError::Reject(message.to_string()))
            }
        })
    }

    /// Replace the tokens of `child` with a single constant
    pub fn replace_with(&mut self, child: ExprId, value: impl Into<Value>) -> ExprId {
        let value = value.into();
        self.action(child, move |_, results| {
            results.set_tokens([value.clone()]);
            Ok(())
        })
    }

    /// Record the tokens of `child` under `name`
    ///
    /// A trailing `*` (as in `"item*"`) makes the field accumulate every
    /// value instead of keeping only the last.
    pub fn named(&mut self, child: ExprId, name: &str) -> ExprId {
        let (name, accumulate) = match name.strip_suffix('*') {
            Some(stripped) => (stripped, true),
            None => (name, false),
        };
        self.push_inheriting(
            NodeKind::Named {
                child,
                name: CompactString::from(name),
                accumulate,
            },
            Some(child),
        )
    }

    /// Like [`named`](Self::named) with accumulation always on
    pub fn named_list(&mut self, child: ExprId, name: &str) -> ExprId {
        self.push_inheriting(
            NodeKind::Named {
                child,
                name: CompactString::from(name),
                accumulate: true,
            },
            Some(child),
        )
    }

    pub fn group(&mut self, child: ExprId) -> ExprId {
        self.push_inheriting(NodeKind::Group(child), Some(child))
    }

    /// Record each grouped `[key, value...]` token of `child` as a field
    ///
    /// The key is the group's first token rendered as text. One remaining
    /// token becomes the value as is, several become a nested group, and
    /// none records an empty string. Tokens are kept.
    pub fn dict_of(&mut self, child: ExprId) -> ExprId {
        self.push_inheriting(NodeKind::Dict(child), Some(child))
    }

    pub fn suppress(&mut self, child: ExprId) -> ExprId {
        self.push_inheriting(NodeKind::Suppress(child), Some(child))
    }

    /// Join the tokens of `child` into one string
    ///
    /// Nothing inside the combined expression skips whitespace, so the
    /// pieces must be adjacent in the input.
    pub fn combine(&mut self, child: ExprId) -> ExprId {
        self.combine_with(child, "")
    }

    pub fn combine_with(&mut self, child: ExprId, joiner: &str) -> ExprId {
        self.push_inheriting(
            NodeKind::Combine {
                child,
                joiner: CompactString::from(joiner),
            },
            Some(child),
        )
    }

    /// Return the exact input text `child` spanned as one token
    pub fn original_text(&mut self, child: ExprId) -> ExprId {
        self.push_inheriting(NodeKind::OriginalText(child), Some(child))
    }

    /// Skip ahead to the next match of `target`
    pub fn skip_to(&mut self, target: ExprId) -> ExprId {
        self.skip_to_with(target, false, None)
    }

    /// Skip ahead to `target`, optionally consuming it too
    ///
    /// Skipping stops early, successfully, at the first position where
    /// `fail_on` matches.
    pub fn skip_to_with(&mut self, target: ExprId, include: bool, fail_on: Option<ExprId>) -> ExprId {
        self.push(NodeKind::SkipTo {
            target,
            include,
            fail_on,
        })
    }

    pub fn empty(&mut self) -> ExprId {
        self.push(NodeKind::Empty)
    }

    pub fn no_match(&mut self) -> ExprId {
        self.push(NodeKind::NoMatch)
    }

    /// Match only at the beginning of the text, after leading whitespace
    pub fn string_start(&mut self) -> ExprId {
        self.push(NodeKind::StringStart)
    }

    pub fn string_end(&mut self) -> ExprId {
        self.push(NodeKind::StringEnd)
    }

    /// Match at the start of the text or just after a newline
    pub fn line_start(&mut self) -> ExprId {
        self.push(NodeKind::LineStart)
    }

    /// Match a newline, or the end of the text
    pub fn line_end(&mut self) -> ExprId {
        let id = self.push(NodeKind::LineEnd);
        let node = &mut self.nodes[id.index()];
        node.whitespace = CharSet::new(
            node.whitespace
                .ranges()
                .iter()
                .flat_map(|&(a, b)| split_out(a, b, '\n')),
        );
        id
    }

    /// Match where a run of `chars` begins: not preceded by one of them,
    /// and followed by one
    pub fn word_start(&mut self, chars: impl Into<CharSet>) -> ExprId {
        self.push(NodeKind::WordStart(chars.into()))
    }

    /// Match where a run of `chars` ends: preceded by one of them, and not
    /// followed by one
    ///
    /// Never skips leading whitespace.
    pub fn word_end(&mut self, chars: impl Into<CharSet>) -> ExprId {
        self.push_without_skip(NodeKind::WordEnd(chars.into()))
    }

    // ---- per-node settings ----

    /// Override the display name used in failure messages
    ///
    /// # Errors
    ///
    /// [`GrammarError::UnknownExpr`] for a handle from another builder.
    pub fn set_name(&mut self, id: ExprId, name: &str) -> Result<(), GrammarError> {
        self.node_mut(id)?.custom_name = Some(CompactString::from(name));
        Ok(())
    }

    /// Stop `id` from skipping leading whitespace
    ///
    /// # Errors
    ///
    /// [`GrammarError::UnknownExpr`] for a handle from another builder.
    pub fn leave_whitespace(&mut self, id: ExprId) -> Result<(), GrammarError> {
        self.node_mut(id)?.skip_whitespace = false;
        Ok(())
    }

    /// Skip exactly `chars` before `id`
    ///
    /// # Errors
    ///
    /// [`GrammarError::UnknownExpr`] for a handle from another builder.
    pub fn with_whitespace(&mut self, id: ExprId, chars: impl Into<CharSet>) -> Result<(), GrammarError> {
        let node = self.node_mut(id)?;
        node.whitespace = chars.into();
        node.skip_whitespace = true;
        Ok(())
    }

    /// Skip matches of `ignorable` (such as comments) before `id` and,
    /// once built, before everything beneath it
    ///
    /// # Errors
    ///
    /// [`GrammarError::UnknownExpr`] for a handle from another builder.
    pub fn ignore(&mut self, id: ExprId, ignorable: ExprId) -> Result<(), GrammarError> {
        if ignorable.index() >= self.nodes.len() {
            return Err(GrammarError::UnknownExpr(ignorable));
        }
        let node = self.node_mut(id)?;
        if !node.ignores.contains(&ignorable) {
            node.ignores.push(ignorable);
        }
        Ok(())
    }

    /// Validate the arena and freeze it into a [`Grammar`] rooted at `root`
    ///
    /// # Errors
    ///
    /// Fails on handles from another builder, unbound forwards reachable
    /// from `root`, and commit markers outside sequences.
    pub fn build(&self, root: ExprId) -> Result<Grammar, GrammarError> {
        if root.index() >= self.nodes.len() {
            return Err(GrammarError::UnknownExpr(root));
        }
        validate::check_references(&self.nodes)?;
        validate::check_forwards(&self.nodes, root)?;
        validate::check_commits(&self.nodes, root)?;

        let mut nodes = self.nodes.clone();
        validate::propagate_ignores(&mut nodes);
        assign_names(&mut nodes);
        let saves_list = validate::saves_list(&nodes);
        for (node, saves) in nodes.iter_mut().zip(saves_list) {
            node.saves_list = saves;
        }

        for id in validate::shadowed_names(&nodes, root) {
            log::warn!(
                "{} repeats a named expression; only the last value is kept unless the name ends with '*' or the child is grouped",
                nodes[id.index()].display
            );
        }

        let left_recursive = validate::left_recursive_forwards(&nodes);
        for id in &left_recursive {
            log::debug!(
                "{} is left-recursive; it needs left-recursion memoization to terminate",
                nodes[id.index()].display
            );
        }
        log::debug!("built grammar with {} nodes rooted at {root:?}", nodes.len());

        Ok(Grammar {
            inner: Arc::new(GrammarInner {
                nodes,
                root,
                default_whitespace: self.default_whitespace.clone(),
                left_recursive,
                left_recursion_warned: AtomicBool::new(false),
            }),
            config: ParseConfig::default(),
        })
    }
}

fn default_keyword_chars() -> CharSet {
    CharSet::identifier().union(&CharSet::from_chars("$"))
}

/// Split the inclusive range `a..=b` around `hole`
fn split_out(a: char, b: char, hole: char) -> Vec<(char, char)> {
    if hole < a || hole > b {
        return vec![(a, b)];
    }
    let mut out = Vec::with_capacity(2);
    if let Some(before) = u32::from(hole)
        .checked_sub(1)
        .and_then(char::from_u32)
        .filter(|&c| hole > a && c >= a)
    {
        out.push((a, before));
    }
    if let Some(after) = char::from_u32(u32::from(hole) + 1).filter(|&c| hole < b && c <= b) {
        out.push((after, b));
    }
    out
}

/// Convert a range to inclusive `(min, max)` bounds
fn bounds(range: &impl RangeBounds<usize>) -> Result<(usize, Option<usize>), GrammarError> {
    let min = match range.start_bound() {
        Bound::Included(&n) => n,
        Bound::Excluded(&n) => n.saturating_add(1),
        Bound::Unbounded => 0,
    };
    let max = match range.end_bound() {
        Bound::Included(&n) => Some(n),
        Bound::Excluded(&n) => Some(
            n.checked_sub(1)
                .ok_or(GrammarError::InvalidBounds { min, max: 0 })?,
        ),
        Bound::Unbounded => None,
    };
    match max {
        Some(max) if min > max => Err(GrammarError::InvalidBounds { min, max }),
        _ => Ok((min, max)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bounds() {
        assert_eq!(bounds(&(1..)).expect("bounds"), (1, None));
        assert_eq!(bounds(&(2..=4)).expect("bounds"), (2, Some(4)));
        assert_eq!(bounds(&(2..5)).expect("bounds"), (2, Some(4)));
        assert_eq!(bounds(&..).expect("bounds"), (0, None));
        assert!(matches!(
            bounds(&(3..=1)),
            Err(GrammarError::InvalidBounds { min: 3, max: 1 })
        ));
        assert!(bounds(&(0..0)).is_err());
    }

    #[test]
    fn test_constructors_validate_eagerly() {
        let mut g = GrammarBuilder::new();
        assert!(matches!(g.literal(""), Err(GrammarError::EmptyLiteral)));
        assert!(matches!(
            g.word(""),
            Err(GrammarError::EmptyCharSet { .. })
        ));
        assert!(matches!(
            g.word_bounded(CharSet::digits(), CharSet::digits(), 4..=2),
            Err(GrammarError::InvalidBounds { min: 4, max: 2 })
        ));
        assert!(matches!(
            g.word_bounded(CharSet::digits(), CharSet::digits(), 0..),
            Err(GrammarError::ZeroMinimum { .. })
        ));
        assert!(matches!(g.regex("("), Err(GrammarError::InvalidRegex(_))));
        let a = g.literal("a").expect("literal");
        assert!(matches!(
            g.repeat(a, 5..2),
            Err(GrammarError::InvalidBounds { .. })
        ));
        assert_eq!(g.len(), 1);
    }

    #[test]
    fn test_forward_rebind_is_rejected() {
        let mut g = GrammarBuilder::new();
        let fwd = g.forward("rule");
        let a = g.literal("a").expect("literal");
        let b = g.literal("b").expect("literal");
        g.bind(fwd, a).expect("first bind");
        assert!(matches!(
            g.bind(fwd, b),
            Err(GrammarError::ForwardRebound { ref name }) if name == "rule"
        ));
        assert!(matches!(g.bind(a, b), Err(GrammarError::NotAForward(_))));
    }

    #[test]
    fn test_unbound_forward_fails_build() {
        let mut g = GrammarBuilder::new();
        let fwd = g.forward("rule");
        let a = g.literal("a").expect("literal");
        let root = g.seq([a, fwd]);
        assert!(matches!(
            g.build(root),
            Err(GrammarError::UnboundForward { ref name }) if name == "rule"
        ));
    }

    #[test]
    fn test_default_whitespace_is_frozen_at_construction() {
        let mut g = GrammarBuilder::new();
        let before = g.literal("a").expect("literal");
        g.set_default_whitespace(" ");
        let after = g.literal("b").expect("literal");
        let root = g.seq([before, after]);
        let grammar = g.build(root).expect("build");
        assert!(grammar.node(before).expect("node").whitespace().matches('\n'));
        assert!(!grammar.node(after).expect("node").whitespace().matches('\n'));
    }

    #[test]
    fn test_named_trailing_star_accumulates() {
        let mut g = GrammarBuilder::new();
        let a = g.literal("a").expect("literal");
        let named = g.named(a, "items*");
        let grammar = g.build(named).expect("build");
        match grammar.node(named).expect("node").kind() {
            NodeKind::Named {
                name, accumulate, ..
            } => {
                assert_eq!(name, "items");
                assert!(*accumulate);
            }
            other => panic!("unexpected node {other:?}"),
        }
    }

    #[test]
    fn test_line_end_does_not_skip_newlines() {
        let mut g = GrammarBuilder::new();
        let eol = g.line_end();
        let grammar = g.build(eol).expect("build");
        let ws = grammar.node(eol).expect("node").whitespace();
        assert!(!ws.matches('\n'));
        assert!(ws.matches(' '));
        assert!(ws.matches('\t'));
    }

    #[test]
    fn test_split_out() {
        assert_eq!(split_out('\t', '\n', '\n'), vec![('\t', '\t')]);
        assert_eq!(split_out('a', 'c', 'b'), vec![('a', 'a'), ('c', 'c')]);
        assert_eq!(split_out('a', 'c', 'z'), vec![('a', 'c')]);
    }
}
