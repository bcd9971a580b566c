//! Default display names and failure messages

use super::{CharSet, ExprId, Node, NodeKind};
use std::sync::Arc;

const MAX_CHARSET_LEN: usize = 16;

/// Fill in `display` and `message` for every node
pub(crate) fn assign_names(nodes: &mut [Node]) {
    let mut cache: Vec<Option<Arc<str>>> = vec![None; nodes.len()];
    for index in 0..nodes.len() {
        display_name(nodes, ExprId::from_index(index), &mut cache);
    }
    for (node, display) in nodes.iter_mut().zip(cache) {
        let display = display.unwrap_or_else(|| Arc::from(""));
        node.message = message_for(node, &display).into();
        node.display = display;
    }
}

fn display_name(nodes: &[Node], id: ExprId, cache: &mut Vec<Option<Arc<str>>>) -> Arc<str> {
    if let Some(Some(name)) = cache.get(id.index()) {
        return Arc::clone(name);
    }
    let Some(node) = nodes.get(id.index()) else {
        return Arc::from("?");
    };
    let name: Arc<str> = match &node.custom_name {
        Some(custom) => Arc::from(custom.as_str()),
        None => default_name(nodes, &node.kind, cache).into(),
    };
    cache[id.index()] = Some(Arc::clone(&name));
    name
}

fn default_name(nodes: &[Node], kind: &NodeKind, cache: &mut Vec<Option<Arc<str>>>) -> String {
    let mut child = |id: ExprId| display_name(nodes, id, cache);
    match kind {
        NodeKind::Literal { text, .. } | NodeKind::Keyword { text, .. } => quote(text),
        NodeKind::Word { init, body, .. } => {
            if init == body {
                format!("W:({})", charset_repr(init))
            } else {
                format!("W:({}, {})", charset_repr(init), charset_repr(body))
            }
        }
        NodeKind::CharsNotIn { excluded, .. } => format!("!W:({})", charset_repr(excluded)),
        NodeKind::Regex { pattern, .. } => format!("Re:({})", quote(pattern)),
        NodeKind::Sequence(children) => {
            let mut inner = children.iter().map(|&c| child(c).to_string()).collect::<Vec<_>>().join(" ");
            while inner.len() > 1 && inner.starts_with('{') && inner.ends_with('}') {
                inner = inner[1..inner.len() - 1].to_string();
            }
            format!("{{{inner}}}")
        }
        NodeKind::OrderedChoice(children) => join_braced(children, " | ", &mut child),
        NodeKind::LongestChoice(children) => join_braced(children, " ^ ", &mut child),
        NodeKind::Each(children) => join_braced(children, " & ", &mut child),
        NodeKind::Repeat {
            child: inner,
            min,
            max,
            ..
        } => {
            let inner = child(*inner);
            match (min, max) {
                (0, None) => format!("[{inner}]..."),
                (1, None) => format!("{{{inner}}}..."),
                (m, None) => format!("{inner}{{{m},}}"),
                (m, Some(n)) if m == n => format!("{inner}{{{m}}}"),
                (m, Some(n)) => format!("{inner}{{{m},{n}}}"),
            }
        }
        NodeKind::Optional { child: inner, .. } => format!("[{}]", child(*inner)),
        NodeKind::Lookahead(inner) => format!("FollowedBy:({})", child(*inner)),
        NodeKind::NotAhead(inner) => format!("~{{{}}}", child(*inner)),
        NodeKind::PrecededBy { child: inner, .. } => format!("PrecededBy:({})", child(*inner)),
        NodeKind::Forward { label, .. } => format!("Forward: {label}"),
        NodeKind::Transform { child: inner, .. } | NodeKind::Named { child: inner, .. } => {
            child(*inner).to_string()
        }
        NodeKind::Group(inner) => format!("Group:({})", child(*inner)),
        NodeKind::Dict(inner) => format!("Dict:({})", child(*inner)),
        NodeKind::Suppress(inner) => format!("Suppress:({})", child(*inner)),
        NodeKind::Combine { child: inner, .. } => format!("Combine:({})", child(*inner)),
        NodeKind::OriginalText(inner) => format!("OriginalText:({})", child(*inner)),
        NodeKind::SkipTo { target, .. } => format!("SkipTo:({})", child(*target)),
        NodeKind::Empty => "Empty".to_string(),
        NodeKind::NoMatch => "NoMatch".to_string(),
        NodeKind::StringStart => "start of text".to_string(),
        NodeKind::StringEnd => "end of text".to_string(),
        NodeKind::LineStart => "start of line".to_string(),
        NodeKind::LineEnd => "end of line".to_string(),
        NodeKind::WordStart(_) => "start of a word".to_string(),
        NodeKind::WordEnd(_) => "end of a word".to_string(),
        NodeKind::Commit => "-".to_string(),
    }
}

fn message_for(node: &Node, display: &str) -> String {
    if node.custom_name.is_none() {
        match &node.kind {
            NodeKind::NoMatch => return "Unmatchable token".to_string(),
            NodeKind::NotAhead(_) => {
                let inner = display.strip_prefix("~{").and_then(|s| s.strip_suffix('}'));
                return format!("Found unwanted token, {}", inner.unwrap_or(display));
            }
            NodeKind::PrecededBy { .. } => {
                let inner = display
                    .strip_prefix("PrecededBy:(")
                    .and_then(|s| s.strip_suffix(')'));
                return format!("Not preceded by {}", inner.unwrap_or(display));
            }
            NodeKind::SkipTo { .. } => {
                let inner = display
                    .strip_prefix("SkipTo:(")
                    .and_then(|s| s.strip_suffix(')'));
                return format!("No match found for {}", inner.unwrap_or(display));
            }
            _ => {}
        }
    }
    format!("Expected {display}")
}

fn join_braced(
    children: &[ExprId],
    separator: &str,
    child: &mut impl FnMut(ExprId) -> Arc<str>,
) -> String {
    let parts: Vec<String> = children.iter().map(|&c| child(c).to_string()).collect();
    format!("{{{}}}", parts.join(separator))
}

fn charset_repr(set: &CharSet) -> String {
    let described = set.describe();
    if described.chars().count() > MAX_CHARSET_LEN {
        let truncated: String = described.chars().take(MAX_CHARSET_LEN - 3).collect();
        format!("{truncated}...")
    } else {
        described
    }
}

fn quote(text: &str) -> String {
    if text.contains('\'') && !text.contains('"') {
        format!("\"{text}\"")
    } else {
        format!("'{}'", text.replace('\'', "\\'"))
    }
}

#[cfg(test)]
mod tests {
    use crate::grammar::{CharSet, GrammarBuilder};

    fn name_of(build: impl FnOnce(&mut GrammarBuilder) -> crate::grammar::ExprId) -> String {
        let mut g = GrammarBuilder::new();
        let root = build(&mut g);
        let grammar = g.build(root).expect("build");
        grammar.display_name(root).expect("node").to_string()
    }

    #[test]
    fn test_word_names() {
        assert_eq!(name_of(|g| g.word(CharSet::digits()).expect("word")), "W:(0-9)");
        assert_eq!(
            name_of(|g| g
                .word_with(CharSet::alphas(), CharSet::identifier())
                .expect("word")),
            "W:(A-Za-z, 0-9A-Z_a-z)"
        );
    }

    #[test]
    fn test_combinator_names() {
        assert_eq!(
            name_of(|g| {
                let a = g.literal("a").expect("literal");
                let b = g.literal("b").expect("literal");
                g.seq([a, b])
            }),
            "{'a' 'b'}"
        );
        assert_eq!(
            name_of(|g| {
                let a = g.literal("a").expect("literal");
                let b = g.literal("b").expect("literal");
                g.longest_of([a, b])
            }),
            "{'a' ^ 'b'}"
        );
        assert_eq!(
            name_of(|g| {
                let a = g.literal("a").expect("literal");
                g.zero_or_more(a)
            }),
            "['a']..."
        );
        assert_eq!(
            name_of(|g| {
                let a = g.literal("a").expect("literal");
                g.repeat(a, 2..=3).expect("repeat")
            }),
            "'a'{2,3}"
        );
    }

    #[test]
    fn test_nested_sequence_braces_are_stripped() {
        assert_eq!(
            name_of(|g| {
                let a = g.literal("a").expect("literal");
                let b = g.literal("b").expect("literal");
                let inner = g.seq([a, b]);
                g.seq([inner])
            }),
            "{'a' 'b'}"
        );
    }

    #[test]
    fn test_custom_name_overrides() {
        let mut g = GrammarBuilder::new();
        let digits = g.word(CharSet::digits()).expect("word");
        g.set_name(digits, "integer").expect("name");
        let plus = g.literal("+").expect("literal");
        let sum = g.seq([digits, plus, digits]);
        let grammar = g.build(sum).expect("build");
        assert_eq!(grammar.display_name(sum), Some("{integer '+' integer}"));
        assert_eq!(grammar.node(digits).expect("node").message(), "Expected integer");
    }

    #[test]
    fn test_not_ahead_message() {
        let mut g = GrammarBuilder::new();
        let end = g.keyword("end").expect("keyword");
        let not_end = g.not_followed_by(end);
        let grammar = g.build(not_end).expect("build");
        assert_eq!(
            grammar.node(not_end).expect("node").message(),
            "Found unwanted token, 'end'"
        );
    }
}
