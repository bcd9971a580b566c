//! Static checks run when a grammar is built
//!
//! Beyond the hard errors (dangling handles, unbound forwards, misplaced
//! commit markers), this module answers two analysis questions about a node
//! arena: which nodes can match without consuming input, and which forwards
//! can re-enter themselves at the same position.

use super::{walk_nodes, ExprId, Node, NodeKind};
use crate::error::GrammarError;

/// Every handle stored in the arena must point into it
pub(crate) fn check_references(nodes: &[Node]) -> Result<(), GrammarError> {
    for node in nodes {
        for id in node.children().into_iter().chain(node.ignores.iter().copied()) {
            if id.index() >= nodes.len() {
                return Err(GrammarError::UnknownExpr(id));
            }
        }
    }
    Ok(())
}

/// Forwards reachable from `root` must be bound
pub(crate) fn check_forwards(nodes: &[Node], root: ExprId) -> Result<(), GrammarError> {
    for id in walk_nodes(nodes, root) {
        if let NodeKind::Forward {
            label,
            target: None,
        } = &nodes[id.index()].kind
        {
            return Err(GrammarError::UnboundForward {
                name: label.to_string(),
            });
        }
    }
    Ok(())
}

/// Repetitions whose direct child is a non-accumulating name
///
/// Each repetition overwrites the field, so only the last value survives.
pub(crate) fn shadowed_names(nodes: &[Node], root: ExprId) -> Vec<ExprId> {
    walk_nodes(nodes, root)
        .into_iter()
        .filter(|id| match &nodes[id.index()].kind {
            NodeKind::Repeat { child, .. } => matches!(
                nodes[child.index()].kind,
                NodeKind::Named {
                    accumulate: false,
                    ..
                }
            ),
            _ => false,
        })
        .collect()
}

/// Commit markers may only appear as direct children of sequences
pub(crate) fn check_commits(nodes: &[Node], root: ExprId) -> Result<(), GrammarError> {
    let is_commit = |id: ExprId| matches!(nodes[id.index()].kind, NodeKind::Commit);
    if is_commit(root) {
        return Err(GrammarError::MisplacedCommit(root));
    }
    for node in nodes {
        if matches!(node.kind, NodeKind::Sequence(_)) {
            continue;
        }
        if let Some(id) = node
            .children()
            .into_iter()
            .chain(node.ignores.iter().copied())
            .find(|&id| is_commit(id))
        {
            return Err(GrammarError::MisplacedCommit(id));
        }
    }
    Ok(())
}

/// Push each node's ignorables down to everything beneath it
///
/// Ignorables themselves are not descended into, and a node never ignores
/// itself.
pub(crate) fn propagate_ignores(nodes: &mut [Node]) {
    let sources: Vec<(ExprId, Vec<ExprId>)> = nodes
        .iter()
        .enumerate()
        .filter(|(_, n)| !n.ignores.is_empty())
        .map(|(i, n)| (ExprId::from_index(i), n.ignores.to_vec()))
        .collect();

    for (source, ignores) in sources {
        let mut visited = vec![false; nodes.len()];
        let mut stack: Vec<ExprId> = nodes[source.index()].children().into_vec();
        while let Some(id) = stack.pop() {
            if std::mem::replace(&mut visited[id.index()], true) {
                continue;
            }
            let node = &mut nodes[id.index()];
            for &ignorable in &ignores {
                if ignorable != id && !node.ignores.contains(&ignorable) {
                    node.ignores.push(ignorable);
                }
            }
            stack.extend(node.children());
        }
    }
}

/// Which nodes can succeed without consuming input, by fixpoint iteration
#[must_use]
pub fn nullable(nodes: &[Node]) -> Vec<bool> {
    let mut nullable = vec![false; nodes.len()];
    let mut changed = true;
    while changed {
        changed = false;
        for (index, node) in nodes.iter().enumerate() {
            if nullable[index] {
                continue;
            }
            let is = |id: &ExprId| nullable.get(id.index()).copied().unwrap_or(false);
            let now = match &node.kind {
                NodeKind::Literal { .. }
                | NodeKind::Keyword { .. }
                | NodeKind::Word { .. }
                | NodeKind::NoMatch => false,
                NodeKind::CharsNotIn { min, .. } => *min == 0,
                NodeKind::Regex { regex, .. } => regex.is_match(""),
                NodeKind::Sequence(cs) | NodeKind::Each(cs) => cs.iter().all(is),
                NodeKind::OrderedChoice(cs) | NodeKind::LongestChoice(cs) => cs.iter().any(is),
                NodeKind::Repeat { child, min, .. } => *min == 0 || is(child),
                NodeKind::Forward { target, .. } => target.as_ref().is_some_and(is),
                NodeKind::Transform { child, .. }
                | NodeKind::Named { child, .. }
                | NodeKind::Combine { child, .. } => is(child),
                NodeKind::Group(child)
                | NodeKind::Dict(child)
                | NodeKind::Suppress(child)
                | NodeKind::OriginalText(child) => is(child),
                NodeKind::Optional { .. }
                | NodeKind::Lookahead(_)
                | NodeKind::NotAhead(_)
                | NodeKind::PrecededBy { .. }
                | NodeKind::SkipTo { .. }
                | NodeKind::Empty
                | NodeKind::StringStart
                | NodeKind::StringEnd
                | NodeKind::LineStart
                | NodeKind::LineEnd
                | NodeKind::WordStart(_)
                | NodeKind::WordEnd(_)
                | NodeKind::Commit => true,
            };
            if now {
                nullable[index] = true;
                changed = true;
            }
        }
    }
    nullable
}

/// Nodes that `node` may invoke at its own starting position
fn left_calls(node: &Node, nullable: &[bool]) -> Vec<ExprId> {
    match &node.kind {
        NodeKind::Sequence(cs) => {
            let mut out = Vec::new();
            for &c in cs {
                out.push(c);
                if !nullable[c.index()] {
                    break;
                }
            }
            out
        }
        // Matched against the text before the position, never at it
        NodeKind::PrecededBy { .. } => Vec::new(),
        _ => node.children().into_vec(),
    }
}

/// Which nodes hand a name every token as one list, by fixpoint iteration
///
/// Sequences, repetitions, `each`, and dicts always do; choices do when any
/// alternative does; wrappers that keep their child's tokens follow the
/// child.
pub(crate) fn saves_list(nodes: &[Node]) -> Vec<bool> {
    let mut saves = vec![false; nodes.len()];
    let mut changed = true;
    while changed {
        changed = false;
        for (index, node) in nodes.iter().enumerate() {
            if saves[index] {
                continue;
            }
            let is = |id: &ExprId| saves.get(id.index()).copied().unwrap_or(false);
            let now = match &node.kind {
                NodeKind::Sequence(_)
                | NodeKind::Each(_)
                | NodeKind::Repeat { .. }
                | NodeKind::Dict(_) => true,
                NodeKind::OrderedChoice(cs) | NodeKind::LongestChoice(cs) => cs.iter().any(is),
                NodeKind::Forward { target, .. } => target.as_ref().is_some_and(is),
                NodeKind::Optional { child, .. }
                | NodeKind::Transform { child, .. }
                | NodeKind::Named { child, .. } => is(child),
                _ => false,
            };
            if now {
                saves[index] = true;
                changed = true;
            }
        }
    }
    saves
}

/// Forwards that can reach themselves without consuming input
///
/// Such forwards diverge unless left-recursion memoization is enabled.
#[must_use]
pub fn left_recursive_forwards(nodes: &[Node]) -> Vec<ExprId> {
    let nullable = nullable(nodes);
    let mut found = Vec::new();
    for (index, node) in nodes.iter().enumerate() {
        let NodeKind::Forward {
            target: Some(target),
            ..
        } = &node.kind
        else {
            continue;
        };
        let me = ExprId::from_index(index);
        let mut visited = vec![false; nodes.len()];
        let mut stack = vec![*target];
        while let Some(id) = stack.pop() {
            if id == me {
                found.push(me);
                break;
            }
            if std::mem::replace(&mut visited[id.index()], true) {
                continue;
            }
            stack.extend(left_calls(&nodes[id.index()], &nullable));
        }
    }
    found
}

#[cfg(test)]
mod tests {
    use crate::grammar::{CharSet, GrammarBuilder, NodeKind};
    use crate::error::GrammarError;

    #[test]
    fn test_detects_direct_left_recursion() {
        let mut g = GrammarBuilder::new();
        let expr = g.forward("expr");
        let plus = g.literal("+").expect("literal");
        let num = g.word(CharSet::digits()).expect("word");
        let add = g.seq([expr, plus, num]);
        let body = g.first_of([add, num]);
        g.bind(expr, body).expect("bind");
        let grammar = g.build(expr).expect("build");
        assert_eq!(grammar.left_recursive_forwards(), &[expr]);
    }

    #[test]
    fn test_detects_recursion_behind_nullable_prefix() {
        let mut g = GrammarBuilder::new();
        let expr = g.forward("expr");
        let sign = g.literal("-").expect("literal");
        let opt_sign = g.optional(sign);
        let x = g.literal("x").expect("literal");
        let rec = g.seq([opt_sign, expr, x]);
        let body = g.first_of([rec, x]);
        g.bind(expr, body).expect("bind");
        let grammar = g.build(expr).expect("build");
        assert_eq!(grammar.left_recursive_forwards(), &[expr]);
    }

    #[test]
    fn test_finds_names_shadowed_by_repetition() {
        let mut g = GrammarBuilder::new();
        let word = g.word(CharSet::alphas()).expect("word");
        let last = g.named(word, "last");
        let all = g.named(word, "all*");
        let shadowed = g.one_or_more(last);
        let kept = g.one_or_more(all);
        let root = g.seq([shadowed, kept]);
        let grammar = g.build(root).expect("build");
        assert_eq!(
            super::shadowed_names(&grammar.inner.nodes, root),
            vec![shadowed]
        );
    }

    #[test]
    fn test_list_saving_passes_through_wrappers() {
        let mut g = GrammarBuilder::new();
        let a = g.literal("a").expect("literal");
        let b = g.literal("b").expect("literal");
        let pair = g.seq([a, b]);
        let either = g.first_of([pair, a]);
        let maybe = g.optional(either);
        let rule = g.forward("rule");
        g.bind(rule, maybe).expect("bind");
        let grouped = g.group(pair);
        let root = g.seq([rule, grouped]);
        let grammar = g.build(root).expect("build");

        let saves = super::saves_list(&grammar.inner.nodes);
        assert!(!saves[a.index()]);
        assert!(saves[either.index()]);
        assert!(saves[maybe.index()]);
        assert!(saves[rule.index()]);
        assert!(!saves[grouped.index()]);
    }

    #[test]
    fn test_lookbehind_is_not_left_recursion() {
        let mut g = GrammarBuilder::new();
        let expr = g.forward("expr");
        let x = g.literal("x").expect("literal");
        let behind = g.preceded_by(expr);
        let rec = g.seq([behind, x]);
        let body = g.first_of([rec, x]);
        g.bind(expr, body).expect("bind");
        let grammar = g.build(expr).expect("build");
        assert!(grammar.left_recursive_forwards().is_empty());
    }

    #[test]
    fn test_right_recursion_is_not_left_recursive() {
        let mut g = GrammarBuilder::new();
        let list = g.forward("list");
        let item = g.literal("a").expect("literal");
        let comma = g.literal(",").expect("literal");
        let more = g.seq([item, comma, list]);
        let body = g.first_of([more, item]);
        g.bind(list, body).expect("bind");
        let grammar = g.build(list).expect("build");
        assert!(grammar.left_recursive_forwards().is_empty());
    }

    #[test]
    fn test_commit_outside_sequence_is_rejected() {
        let mut g = GrammarBuilder::new();
        let a = g.literal("a").expect("literal");
        let commit = g.commit();
        let choice = g.first_of([a, commit]);
        assert!(matches!(
            g.build(choice),
            Err(GrammarError::MisplacedCommit(id)) if id == commit
        ));
    }

    #[test]
    fn test_ignores_propagate_to_descendants() {
        let mut g = GrammarBuilder::new();
        let comment = g.regex(r"#[^\n]*").expect("regex");
        let a = g.literal("a").expect("literal");
        let b = g.literal("b").expect("literal");
        let root = g.seq([a, b]);
        g.ignore(root, comment).expect("ignore");
        let grammar = g.build(root).expect("build");
        assert_eq!(grammar.node(b).expect("node").ignores(), &[comment]);
        assert!(grammar.node(comment).expect("node").ignores().is_empty());
        assert!(matches!(
            grammar.node(root).expect("node").kind(),
            NodeKind::Sequence(_)
        ));
    }
}
