#![no_main]
use libfuzzer_sys::fuzz_target;
use tessel::grammar::{CharSet, GrammarBuilder};
use tessel::{Grammar, ParseConfig};

fn build() -> Option<Grammar> {
    let mut g = GrammarBuilder::new();
    let expr = g.forward("expr");
    let number = g.word(CharSet::digits()).ok()?;
    let name = g.word(CharSet::identifier()).ok()?;
    let open = g.literal("(").ok()?;
    let close = g.literal(")").ok()?;
    let parens = g.seq([open, expr, close]);
    let atom = g.first_of([number, name, parens]);
    let op = g.regex(r"[-+*/]").ok()?;
    let grow = g.seq([expr, op, atom]);
    let body = g.longest_of([grow, atom]);
    g.bind(expr, body).ok()?;
    let comment = g.regex(r"#[^\n]*").ok()?;
    g.ignore(expr, comment).ok()?;
    g.build(expr).ok()
}

fuzz_target!(|data: &[u8]| {
    let Ok(input) = std::str::from_utf8(data) else {
        return;
    };
    let Some(grammar) = build() else {
        return;
    };
    let grammar = grammar.with_config(ParseConfig {
        recursion_limit: Some(256),
        ..ParseConfig::left_recursion()
    });

    // Must not panic, and must agree with itself
    let first = grammar.parse_string(input, true).map_err(|e| e.position());
    let second = grammar.parse_string(input, true).map_err(|e| e.position());
    assert_eq!(first, second);
});
