//! The recursive-descent matcher
//!
//! Every node attempt goes through [`Matcher::match_expr`], which applies
//! the recursion limit, consults the packrat cache, skips leading
//! ignorables and whitespace, and then dispatches on the node kind.
//!
//! An attempt has three kinds of outcome:
//!
//! - `Ok(Step::Matched)`: the node matched and produced results.
//! - `Ok(Step::Failed)`: an ordinary failure that enclosing choices,
//!   optionals, and repetitions may recover from.
//! - `Err(Halt)`: a failure nothing recovers from (a committed sequence,
//!   a fatal action, a grammar problem, or a caller's action error). It
//!   unwinds straight to the top level through `?`.

use super::state::{MemoKey, ParserState, SeedKey};
use super::trace::Tracer;
use crate::error::{Diagnostic, GrammarError, ParseError, Report};
use crate::grammar::{Action, ActionContext, ActionError, ExprId, Grammar, Node, NodeKind};
use crate::input::{char_before, next_boundary, skip_chars};
use crate::results::{MatchResults, Value};
use std::sync::Arc;

/// Result of one node attempt
#[derive(Debug, Clone)]
pub(crate) enum Step {
    Matched { end: usize, results: MatchResults },
    Failed(Diagnostic),
}

/// A failure that unwinds the whole parse
#[derive(Debug)]
pub(crate) enum Halt {
    Syntax(Diagnostic),
    Grammar(GrammarError),
    Action {
        position: usize,
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

impl Halt {
    /// Resolve against the text that was being matched
    pub(crate) fn into_error(self, text: &str) -> ParseError {
        match self {
            Self::Syntax(diagnostic) => ParseError::Syntax(Report::new(text, diagnostic)),
            Self::Grammar(error) => ParseError::Grammar(error),
            Self::Action { position, source } => ParseError::Action { position, source },
        }
    }
}

pub(crate) type Outcome = Result<Step, Halt>;

/// Stack left below which a nested attempt moves to a fresh segment
const STACK_RED_ZONE: usize = 128 * 1024;
/// Size of each heap-allocated stack segment
const STACK_SEGMENT: usize = 2 * 1024 * 1024;

const fn matched(end: usize, results: MatchResults) -> Outcome {
    Ok(Step::Matched { end, results })
}

fn fail_at(position: usize, node: &Node) -> Outcome {
    Ok(Step::Failed(Diagnostic::new(position, Arc::clone(&node.message))))
}

/// Keep the furthest of two optional diagnostics; the earlier wins ties
fn furthest(best: Option<Diagnostic>, next: Diagnostic) -> Option<Diagnostic> {
    Some(match best {
        Some(best) => best.furthest(next),
        None => next,
    })
}

/// Choice failure: the deepest child failure, or the node's own
/// description when no child got past the start
fn choice_failure(best: Option<Diagnostic>, start: usize, node: &Node) -> Outcome {
    match best {
        Some(diagnostic) if diagnostic.position > start => Ok(Step::Failed(diagnostic)),
        _ => fail_at(start, node),
    }
}

/// Byte length of the prefix of `rest` equal to `text`
fn match_text(rest: &str, text: &str, caseless: bool) -> Option<usize> {
    if !caseless {
        return rest.starts_with(text).then_some(text.len());
    }
    let mut input = rest.char_indices();
    let mut end = 0;
    for expected in text.chars() {
        let (i, found) = input.next()?;
        if !(found == expected || found.to_lowercase().eq(expected.to_lowercase())) {
            return None;
        }
        end = i + found.len_utf8();
    }
    Some(end)
}

/// Match a terminal node at `start`
#[inline(never)]
fn match_token(node: &Node, input: &str, start: usize) -> Outcome {
    let rest = &input[start..];
    match &node.kind {
        NodeKind::Literal { text, caseless } => match match_text(rest, text, *caseless) {
            Some(len) => matched(start + len, MatchResults::single(text.clone())),
            None => fail_at(start, node),
        },

        NodeKind::Keyword {
            text,
            caseless,
            ident_chars,
        } => {
            let Some(len) = match_text(rest, text, *caseless) else {
                return fail_at(start, node);
            };
            let touches = |c: Option<char>| c.is_some_and(|c| ident_chars.matches(c));
            if touches(rest[len..].chars().next()) || touches(char_before(input, start)) {
                return fail_at(start, node);
            }
            matched(start + len, MatchResults::single(text.clone()))
        }

        NodeKind::Word {
            init,
            body,
            min,
            max,
        } => {
            let mut chars = rest.char_indices();
            let Some((_, first)) = chars.next().filter(|&(_, c)| init.matches(c)) else {
                return fail_at(start, node);
            };
            let mut count = 1;
            let mut len = first.len_utf8();
            for (i, c) in chars {
                if max.is_some_and(|max| count >= max) || !body.matches(c) {
                    break;
                }
                count += 1;
                len = i + c.len_utf8();
            }
            let overlong = max.is_some_and(|max| {
                count >= max && rest[len..].chars().next().is_some_and(|c| body.matches(c))
            });
            if count < *min || overlong {
                return fail_at(start, node);
            }
            matched(start + len, MatchResults::single(&rest[..len]))
        }

        NodeKind::CharsNotIn { excluded, min, max } => {
            let mut count = 0;
            let mut len = 0;
            for (i, c) in rest.char_indices() {
                if max.is_some_and(|max| count >= max) || excluded.matches(c) {
                    break;
                }
                count += 1;
                len = i + c.len_utf8();
            }
            if count < *min {
                return fail_at(start, node);
            }
            matched(start + len, MatchResults::single(&rest[..len]))
        }

        NodeKind::Regex { regex, .. } => {
            let has_names = regex.capture_names().flatten().next().is_some();
            if !has_names {
                return match regex.find(rest) {
                    Some(m) => matched(start + m.end(), MatchResults::single(m.as_str())),
                    None => fail_at(start, node),
                };
            }
            let Some(caps) = regex.captures(rest) else {
                return fail_at(start, node);
            };
            let Some(whole) = caps.get(0) else {
                return fail_at(start, node);
            };
            let mut results = MatchResults::single(whole.as_str());
            for name in regex.capture_names().flatten() {
                if let Some(group) = caps.name(name) {
                    results.set_field(name, group.as_str());
                }
            }
            matched(start + whole.end(), results)
        }

        _ => fail_at(start, node),
    }
}

/// Match a zero-width position test at `start`
#[inline(never)]
fn match_position(node: &Node, input: &str, start: usize) -> Outcome {
    let next = input[start..].chars().next();
    let prev = char_before(input, start);
    let at = match &node.kind {
        NodeKind::StringEnd => start >= input.len(),
        NodeKind::LineStart => start == 0 || prev == Some('\n'),
        NodeKind::LineEnd => {
            if next == Some('\n') {
                return matched(start + 1, MatchResults::single("\n"));
            }
            next.is_none()
        }
        NodeKind::WordStart(chars) => {
            start == 0
                || (!prev.is_some_and(|c| chars.matches(c))
                    && next.is_some_and(|c| chars.matches(c)))
        }
        NodeKind::WordEnd(chars) => {
            next.is_none()
                || (prev.is_some_and(|c| chars.matches(c))
                    && !next.is_some_and(|c| chars.matches(c)))
        }
        _ => false,
    };
    if at {
        matched(start, MatchResults::new())
    } else {
        fail_at(start, node)
    }
}

/// Run a parse action on a completed match
#[inline(never)]
fn run_action(
    action: &Action,
    input: &str,
    start: usize,
    end: usize,
    mut results: MatchResults,
) -> Outcome {
    let ctx = ActionContext { input, start, end };
    match action.call(&ctx, &mut results) {
        Ok(()) => matched(end, results),
        Err(ActionError::Reject(message)) => Ok(Step::Failed(Diagnostic::new(start, message))),
        Err(ActionError::Fatal(message)) => Err(Halt::Syntax(Diagnostic::new(start, message))),
        Err(ActionError::Failed(source)) => Err(Halt::Action {
            position: start,
            source,
        }),
    }
}

/// How an `each` child takes part in matching
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EachRole {
    Required,
    Optional,
    Multi { required: bool },
}

#[derive(Debug, Clone, Copy)]
struct EachItem {
    /// Probed to find out whether the item can match here
    test: ExprId,
    /// Run for real once the order is known
    run: ExprId,
    role: EachRole,
}

/// Matches nodes of one grammar against one input text
pub(crate) struct Matcher<'a> {
    grammar: &'a Grammar,
    input: &'a str,
    state: &'a mut ParserState,
    tracer: Option<&'a dyn Tracer>,
    depth: usize,
    /// Nesting depth of combined regions; nothing skips inside one
    adjacent: usize,
}

impl<'a> Matcher<'a> {
    pub(crate) fn new(
        grammar: &'a Grammar,
        input: &'a str,
        state: &'a mut ParserState,
        tracer: Option<&'a dyn Tracer>,
    ) -> Self {
        Self {
            grammar,
            input,
            state,
            tracer,
            depth: 0,
            adjacent: 0,
        }
    }

    /// Attempt `id` at `position`
    ///
    /// `pre_skip` asks the node to skip its ignorables and whitespace first;
    /// `do_actions` is false for lookahead probes, which must not run
    /// caller code.
    pub(crate) fn match_expr(
        &mut self,
        id: ExprId,
        position: usize,
        do_actions: bool,
        pre_skip: bool,
    ) -> Outcome {
        if let Some(limit) = self.grammar.config().recursion_limit {
            if self.depth >= limit {
                return Err(Halt::Grammar(GrammarError::RecursionLimit { limit, position }));
            }
        }
        self.depth += 1;
        let outcome = stacker::maybe_grow(STACK_RED_ZONE, STACK_SEGMENT, || {
            self.match_memoized(id, position, do_actions, pre_skip)
        });
        self.depth -= 1;
        outcome
    }

    fn match_memoized(
        &mut self,
        id: ExprId,
        position: usize,
        do_actions: bool,
        pre_skip: bool,
    ) -> Outcome {
        self.state.metrics.attempts += 1;
        let pre_skip = pre_skip && self.adjacent == 0;
        if !self.state.packrat_enabled() {
            return self.match_traced(id, position, do_actions, pre_skip);
        }
        let key = MemoKey {
            expr: id,
            position,
            do_actions,
            pre_skip,
            adjacent: self.adjacent > 0,
        };
        if let Some(step) = self.state.memo_get(&key) {
            return Ok(step);
        }
        let step = self.match_traced(id, position, do_actions, pre_skip)?;
        self.state.memo_put(key, step.clone());
        Ok(step)
    }

    fn match_traced(
        &mut self,
        id: ExprId,
        position: usize,
        do_actions: bool,
        pre_skip: bool,
    ) -> Outcome {
        let grammar = self.grammar;
        let node = grammar.node_ref(id);
        let tracer = self.tracer.filter(|t| t.wants(node));
        if let Some(tracer) = tracer {
            tracer.on_try(grammar, id, position);
        } else if log::log_enabled!(log::Level::Trace) {
            log::trace!("try {} at offset {position}", node.display_name());
        }

        let start = if pre_skip {
            self.skip_leading(node, position)?
        } else {
            position
        };
        let mut step = self.match_node(id, node, start, do_actions)?;
        if let Step::Matched { results, .. } = &mut step {
            results.set_origin(id);
        }

        if let Some(tracer) = tracer {
            match &step {
                Step::Matched { end, results } => {
                    tracer.on_match(grammar, id, start, *end, results);
                }
                Step::Failed(diagnostic) => tracer.on_fail(grammar, id, diagnostic),
            }
        }
        Ok(step)
    }

    /// Skip `node`'s ignorables, interleaved, then its whitespace
    pub(crate) fn skip_leading(&mut self, node: &Node, position: usize) -> Result<usize, Halt> {
        let mut loc = position;
        if !node.ignores.is_empty() {
            loc = self.skip_ignorables(&node.ignores, loc)?;
        }
        if node.skip_whitespace {
            loc = skip_chars(self.input, loc, &node.whitespace);
        }
        Ok(loc)
    }

    fn skip_ignorables(&mut self, ignores: &[ExprId], position: usize) -> Result<usize, Halt> {
        let mut loc = position;
        loop {
            let before = loc;
            for &ignorable in ignores {
                while let Step::Matched { end, .. } = self.probe(ignorable, loc)? {
                    if end <= loc {
                        break;
                    }
                    loc = end;
                }
            }
            if loc == before {
                return Ok(loc);
            }
        }
    }

    /// Attempt without actions, treating syntax failures as ordinary ones
    fn probe(&mut self, id: ExprId, position: usize) -> Outcome {
        self.probe_with(id, position, false)
    }

    fn probe_with(&mut self, id: ExprId, position: usize, do_actions: bool) -> Outcome {
        match self.match_expr(id, position, do_actions, true) {
            Err(Halt::Syntax(diagnostic)) => Ok(Step::Failed(diagnostic)),
            other => other,
        }
    }

    fn match_node(
        &mut self,
        id: ExprId,
        node: &'a Node,
        start: usize,
        do_actions: bool,
    ) -> Outcome {
        match &node.kind {
            NodeKind::Literal { .. }
            | NodeKind::Keyword { .. }
            | NodeKind::Word { .. }
            | NodeKind::CharsNotIn { .. }
            | NodeKind::Regex { .. } => match_token(node, self.input, start),

            NodeKind::Sequence(children) => self.match_sequence(children, start, do_actions),

            NodeKind::OrderedChoice(children) => {
                let mut best = None;
                for &child in children {
                    match self.match_expr(child, start, do_actions, true)? {
                        step @ Step::Matched { .. } => return Ok(step),
                        Step::Failed(diagnostic) => best = furthest(best, diagnostic),
                    }
                }
                choice_failure(best, start, node)
            }

            NodeKind::LongestChoice(children) => {
                self.match_longest(node, children, start, do_actions)
            }

            NodeKind::Each(children) => self.match_each(children, start, do_actions),

            NodeKind::Repeat {
                child,
                min,
                max,
                stop,
            } => self.match_repeat(node, *child, *min, *max, *stop, start, do_actions),

            NodeKind::Optional { child, default } => {
                match self.match_expr(*child, start, do_actions, false)? {
                    step @ Step::Matched { .. } => Ok(step),
                    Step::Failed(_) => {
                        let mut results = MatchResults::new();
                        if let Some(default) = default {
                            results.push(default.clone());
                            if let NodeKind::Named {
                                name, accumulate, ..
                            } = &self.grammar.node_ref(*child).kind
                            {
                                results.name_tokens(name, *accumulate, false);
                            }
                        }
                        matched(start, results)
                    }
                }
            }

            NodeKind::Lookahead(child) => match self.probe_with(*child, start, do_actions)? {
                Step::Matched { mut results, .. } => {
                    results.clear_tokens();
                    matched(start, results)
                }
                failed @ Step::Failed(_) => Ok(failed),
            },

            NodeKind::NotAhead(child) => match self.probe(*child, start)? {
                Step::Matched { .. } => fail_at(start, node),
                Step::Failed(_) => matched(start, MatchResults::new()),
            },

            NodeKind::PrecededBy { child, retreat } => {
                self.match_preceded_by(node, *child, *retreat, start, do_actions)
            }

            NodeKind::Forward { label, target } => {
                let Some(target) = *target else {
                    return Err(Halt::Grammar(GrammarError::UnboundForward {
                        name: label.to_string(),
                    }));
                };
                if self.state.left_recursion_enabled() {
                    self.grow_seed(id, node, target, start, do_actions)
                } else {
                    self.match_expr(target, start, do_actions, false)
                }
            }

            NodeKind::Transform { child, action } => {
                let step = self.match_expr(*child, start, do_actions, false)?;
                let Step::Matched { end, results } = step else {
                    return Ok(step);
                };
                if !do_actions {
                    return matched(end, results);
                }
                run_action(action, self.input, start, end, results)
            }

            NodeKind::Named {
                child,
                name,
                accumulate,
            } => {
                let step = self.match_expr(*child, start, do_actions, false)?;
                let Step::Matched { end, mut results } = step else {
                    return Ok(step);
                };
                let as_list = self.grammar.node_ref(*child).saves_list;
                results.name_tokens(name, *accumulate, as_list);
                matched(end, results)
            }

            NodeKind::Group(child) => match self.match_expr(*child, start, do_actions, false)? {
                Step::Matched { end, results } => {
                    matched(end, MatchResults::single(Value::group(results)))
                }
                failed @ Step::Failed(_) => Ok(failed),
            },

            NodeKind::Dict(child) => match self.match_expr(*child, start, do_actions, false)? {
                Step::Matched { end, mut results } => {
                    results.name_groups_by_key();
                    matched(end, results)
                }
                failed @ Step::Failed(_) => Ok(failed),
            },

            NodeKind::Suppress(child) => match self.match_expr(*child, start, do_actions, false)? {
                Step::Matched { end, .. } => matched(end, MatchResults::new()),
                failed @ Step::Failed(_) => Ok(failed),
            },

            NodeKind::Combine { child, joiner } => {
                self.adjacent += 1;
                let step = self.match_expr(*child, start, do_actions, false);
                self.adjacent -= 1;
                match step? {
                    Step::Matched { end, mut results } => {
                        let joined = results.to_strings().join(joiner.as_str());
                        results.set_tokens([joined]);
                        matched(end, results)
                    }
                    failed @ Step::Failed(_) => Ok(failed),
                }
            }

            NodeKind::OriginalText(child) => {
                match self.match_expr(*child, start, do_actions, false)? {
                    Step::Matched { end, mut results } => {
                        results.set_tokens([&self.input[start..end]]);
                        matched(end, results)
                    }
                    failed @ Step::Failed(_) => Ok(failed),
                }
            }

            NodeKind::SkipTo {
                target,
                include,
                fail_on,
            } => self.match_skip_to(node, *target, *include, *fail_on, start, do_actions),

            NodeKind::Empty => matched(start, MatchResults::new()),

            NodeKind::NoMatch => fail_at(start, node),

            NodeKind::StringStart => {
                let at_start = start == 0 || start == self.skip_leading(node, 0)?;
                if at_start {
                    matched(start, MatchResults::new())
                } else {
                    fail_at(start, node)
                }
            }

            NodeKind::StringEnd
            | NodeKind::LineStart
            | NodeKind::LineEnd
            | NodeKind::WordStart(_)
            | NodeKind::WordEnd(_) => match_position(node, self.input, start),

            // Consumed by `match_sequence`; a commit reached any other way
            // was rejected when the grammar was built.
            NodeKind::Commit => matched(start, MatchResults::new()),
        }
    }

    fn match_sequence(&mut self, children: &[ExprId], start: usize, do_actions: bool) -> Outcome {
        let mut loc = start;
        let mut results = MatchResults::new();
        let mut committed = false;
        for (i, &child) in children.iter().enumerate() {
            if matches!(self.grammar.node_ref(child).kind, NodeKind::Commit) {
                committed = true;
                continue;
            }
            match self.match_expr(child, loc, do_actions, i > 0)? {
                Step::Matched { end, results: part } => {
                    loc = end;
                    results.extend(part);
                }
                Step::Failed(diagnostic) if committed => return Err(Halt::Syntax(diagnostic)),
                failed @ Step::Failed(_) => return Ok(failed),
            }
        }
        matched(loc, results)
    }

    fn match_longest(
        &mut self,
        node: &Node,
        children: &[ExprId],
        start: usize,
        do_actions: bool,
    ) -> Outcome {
        let mut best = None;
        let mut candidates: Vec<(usize, ExprId, MatchResults)> = Vec::new();
        for &child in children {
            match self.match_expr(child, start, false, true)? {
                Step::Matched { end, results } => candidates.push((end, child, results)),
                Step::Failed(diagnostic) => best = furthest(best, diagnostic),
            }
        }
        // Stable: equal lengths keep declaration order
        candidates.sort_by(|a, b| b.0.cmp(&a.0));

        if !do_actions {
            return match candidates.into_iter().next() {
                Some((end, _, results)) => matched(end, results),
                None => choice_failure(best, start, node),
            };
        }

        let mut longest: Option<(usize, MatchResults)> = None;
        for (probe_end, child, _) in candidates {
            if longest.as_ref().is_some_and(|(end, _)| probe_end <= *end) {
                break;
            }
            match self.match_expr(child, start, true, true)? {
                Step::Matched { end, results } => {
                    if end >= probe_end {
                        return matched(end, results);
                    }
                    if longest.as_ref().map_or(true, |(longest, _)| end > *longest) {
                        longest = Some((end, results));
                    }
                }
                Step::Failed(diagnostic) => best = furthest(best, diagnostic),
            }
        }
        match longest {
            Some((end, results)) => matched(end, results),
            None => choice_failure(best, start, node),
        }
    }

    fn each_item(&self, child: ExprId) -> EachItem {
        match &self.grammar.node_ref(child).kind {
            NodeKind::Optional { child: inner, .. } => EachItem {
                test: *inner,
                run: child,
                role: EachRole::Optional,
            },
            NodeKind::Repeat {
                child: inner,
                min,
                max: None,
                stop: None,
            } => EachItem {
                test: *inner,
                run: *inner,
                role: EachRole::Multi { required: *min > 0 },
            },
            _ => EachItem {
                test: child,
                run: child,
                role: EachRole::Required,
            },
        }
    }

    fn match_each(&mut self, children: &[ExprId], start: usize, do_actions: bool) -> Outcome {
        let grammar = self.grammar;
        let items: Vec<EachItem> = children.iter().map(|&c| self.each_item(c)).collect();
        let mut seen = vec![false; items.len()];
        let mut order = Vec::new();
        let mut loc = start;

        loop {
            let mut progressed = false;
            for (i, item) in items.iter().enumerate() {
                let single = !matches!(item.role, EachRole::Multi { .. });
                if single && seen[i] {
                    continue;
                }
                if let Step::Matched { end, .. } = self.match_expr(item.test, loc, false, true)? {
                    if single || end > loc {
                        seen[i] = true;
                        order.push(item.run);
                        loc = end;
                        progressed = true;
                    }
                }
            }
            if !progressed {
                break;
            }
        }

        let missing: Vec<&str> = items
            .iter()
            .zip(&seen)
            .filter(|(item, seen)| {
                !**seen
                    && matches!(
                        item.role,
                        EachRole::Required | EachRole::Multi { required: true }
                    )
            })
            .map(|(item, _)| grammar.node_ref(item.test).display_name())
            .collect();
        if !missing.is_empty() {
            return Ok(Step::Failed(Diagnostic::new(
                start,
                format!(
                    "Missing one or more required elements ({})",
                    missing.join(", ")
                ),
            )));
        }

        // Absent optionals still contribute their defaults
        for (item, seen) in items.iter().zip(&seen) {
            if item.role == EachRole::Optional && !*seen {
                if let NodeKind::Optional {
                    default: Some(_), ..
                } = grammar.node_ref(item.run).kind
                {
                    order.push(item.run);
                }
            }
        }

        let mut loc = start;
        let mut results = MatchResults::new();
        for run in order {
            match self.match_expr(run, loc, do_actions, true)? {
                Step::Matched { end, results: part } => {
                    loc = end;
                    results.extend(part);
                }
                failed @ Step::Failed(_) => return Ok(failed),
            }
        }
        matched(loc, results)
    }

    #[allow(clippy::too_many_arguments)]
    fn match_repeat(
        &mut self,
        node: &Node,
        child: ExprId,
        min: usize,
        max: Option<usize>,
        stop: Option<ExprId>,
        start: usize,
        do_actions: bool,
    ) -> Outcome {
        let mut loc = start;
        let mut count = 0;
        let mut results = MatchResults::new();
        let mut last_failure = None;
        while max.map_or(true, |max| count < max) {
            if let Some(stop) = stop {
                if let Step::Matched { .. } = self.probe(stop, loc)? {
                    let name = self.grammar.node_ref(stop).display_name();
                    last_failure = Some(Diagnostic::new(
                        loc,
                        format!("Found unwanted token, {name}"),
                    ));
                    break;
                }
            }
            match self.match_expr(child, loc, do_actions, true)? {
                Step::Matched { end, results: part } => {
                    count += 1;
                    results.extend(part);
                    let advanced = end > loc;
                    loc = end;
                    if !advanced {
                        break;
                    }
                }
                Step::Failed(diagnostic) => {
                    last_failure = Some(diagnostic);
                    break;
                }
            }
        }
        if count < min {
            return match last_failure {
                Some(diagnostic) => Ok(Step::Failed(diagnostic)),
                None => fail_at(loc, node),
            };
        }
        matched(loc, results)
    }

    /// Lookbehind: try `child` at each earlier start, nearest first, against
    /// the text before `start` only, until one match ends exactly there
    fn match_preceded_by(
        &mut self,
        node: &Node,
        child: ExprId,
        retreat: Option<usize>,
        start: usize,
        do_actions: bool,
    ) -> Outcome {
        let input: &'a str = self.input;
        let before = &input[..start];
        let mut state = ParserState::new(self.grammar.config());
        let mut behind = Matcher {
            grammar: self.grammar,
            input: before,
            state: &mut state,
            tracer: self.tracer,
            depth: self.depth,
            adjacent: 0,
        };
        let mut found = None;
        for (taken, (offset, _)) in before.char_indices().rev().enumerate() {
            if retreat.is_some_and(|retreat| taken >= retreat) {
                break;
            }
            match behind.match_expr(child, offset, do_actions, false) {
                Ok(Step::Matched { end, results }) if end == before.len() => {
                    found = Some(results);
                    break;
                }
                Ok(_) | Err(Halt::Syntax(_)) => {}
                Err(halt) => return Err(halt),
            }
        }
        self.state.metrics.attempts += state.metrics.attempts;
        match found {
            Some(mut results) => {
                results.clear_tokens();
                matched(start, results)
            }
            None => fail_at(start, node),
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn match_skip_to(
        &mut self,
        node: &Node,
        target: ExprId,
        include: bool,
        fail_on: Option<ExprId>,
        start: usize,
        do_actions: bool,
    ) -> Outcome {
        let input = self.input;
        let grammar = self.grammar;
        let ignores = &grammar.node_ref(target).ignores;
        let mut loc = start;
        let found = loop {
            if loc > input.len() {
                break false;
            }
            if let Some(fail_on) = fail_on {
                if let Step::Matched { .. } = self.probe(fail_on, loc)? {
                    break true;
                }
            }
            if !ignores.is_empty() {
                loc = self.skip_ignorables(ignores, loc)?;
            }
            match self.match_expr(target, loc, false, false) {
                Ok(Step::Matched { .. }) => break true,
                Ok(Step::Failed(_)) | Err(Halt::Syntax(_)) => loc = next_boundary(input, loc),
                Err(halt) => return Err(halt),
            }
        };
        if !found {
            return fail_at(start, node);
        }
        let mut results = MatchResults::single(&input[start..loc]);
        if !include {
            return matched(loc, results);
        }
        match self.match_expr(target, loc, do_actions, false)? {
            Step::Matched { end, results: part } => {
                results.extend(part);
                matched(end, results)
            }
            failed @ Step::Failed(_) => Ok(failed),
        }
    }

    /// Left-recursive forward: grow a seed match until it stops improving
    ///
    /// The first attempt at `(position, forward)` sees a failing seed, so
    /// only the non-recursive alternatives match. Each round re-runs the
    /// body with the previous round's match as the answer for the inner
    /// recursive call; growth stops when the match no longer gets longer.
    fn grow_seed(
        &mut self,
        id: ExprId,
        node: &Node,
        target: ExprId,
        position: usize,
        do_actions: bool,
    ) -> Outcome {
        let key: SeedKey = (position, id, do_actions);
        if let Some(step) = self.state.seed_get(&key) {
            return Ok(step);
        }
        let peek_key: SeedKey = (position, id, false);
        let act_key: SeedKey = (position, id, true);

        let seed = Step::Failed(Diagnostic::new(
            position,
            "Forward recursion without base case",
        ));
        self.state.seed_put(peek_key, seed.clone());
        if do_actions {
            self.state.seed_put(act_key, seed.clone());
        }

        let limit = self
            .grammar
            .config()
            .left_recursion_bound
            .unwrap_or_else(|| self.input.len().saturating_sub(position) + 1);
        let mut rounds = 0;
        let mut prev_end: Option<usize> = None;
        let mut prev = seed;
        loop {
            let (new_end, new) = match self.match_expr(target, position, false, false)? {
                Step::Matched { end, results } => (Some(end), Step::Matched { end, results }),
                Step::Failed(diagnostic) => {
                    if let Step::Failed(_) = prev {
                        let failed = Step::Failed(diagnostic);
                        self.state.seed_put(peek_key, failed.clone());
                        if do_actions {
                            self.state.seed_put(act_key, failed.clone());
                        }
                        return Ok(failed);
                    }
                    (prev_end, prev.clone())
                }
            };

            if new_end <= prev_end {
                self.state.seed_take(&peek_key);
                if do_actions {
                    return Ok(self.state.seed_take(&act_key).unwrap_or(prev));
                }
                return Ok(prev);
            }

            rounds += 1;
            if rounds > limit {
                return Err(Halt::Grammar(GrammarError::LeftRecursionBound {
                    name: node.display_name().to_string(),
                    position,
                    limit,
                }));
            }
            self.state.metrics.growth_iterations += 1;

            if do_actions {
                match self.match_expr(target, position, true, false)? {
                    step @ Step::Matched { .. } => self.state.seed_put(act_key, step),
                    Step::Failed(diagnostic) => {
                        let failed = Step::Failed(diagnostic);
                        self.state.seed_put(peek_key, failed.clone());
                        self.state.seed_put(act_key, failed.clone());
                        return Ok(failed);
                    }
                }
            }

            prev_end = new_end;
            prev = new.clone();
            self.state.seed_put(peek_key, new);
        }
    }
}
