#![cfg(test)]
//! Property-based checks of determinism and memoization transparency

use proptest::prelude::*;
use tessel::grammar::{CharSet, GrammarBuilder};
use tessel::{Grammar, MatchResults, ParseConfig, ParseError};

/// A small expression language exercising choice, repetition, and recursion
fn expression_grammar() -> Grammar {
    let mut g = GrammarBuilder::new();
    let expr = g.forward("expr");
    let number = g.word(CharSet::digits()).expect("word");
    let name = g.word(CharSet::alphas()).expect("word");
    let name = g.named(name, "name*");
    let open = g.literal("(").expect("literal");
    let close = g.literal(")").expect("literal");
    let parens = g.seq([open, expr, close]);
    let parens = g.group(parens);
    let atom = g.first_of([number, name, parens]);
    let plus = g.literal("+").expect("literal");
    let minus = g.literal("-").expect("literal");
    let op = g.first_of([plus, minus]);
    let tail = g.seq([op, atom]);
    let tails = g.zero_or_more(tail);
    let body = g.seq([atom, tails]);
    g.bind(expr, body).expect("bind");
    g.build(expr).expect("Failed to build grammar")
}

/// Comparable summary of a parse outcome
fn outcome(result: Result<MatchResults, ParseError>) -> Result<MatchResults, (Option<usize>, String)> {
    result.map_err(|e| (e.position(), e.to_string()))
}

fn input_strategy() -> impl Strategy<Value = String> {
    proptest::string::string_regex("[a-c0-9 +()-]{0,24}").expect("regex")
}

proptest! {
    #[test]
    fn test_parse_is_deterministic(text in input_strategy()) {
        let grammar = expression_grammar();
        let first = outcome(grammar.parse_string(&text, true));
        let second = outcome(grammar.parse_string(&text, true));
        prop_assert_eq!(first, second);
    }

    #[test]
    fn test_packrat_is_transparent(text in input_strategy(), parse_all in any::<bool>()) {
        let plain = expression_grammar();
        let packrat = plain.clone().with_config(ParseConfig::packrat());
        let bounded = plain.clone().with_config(ParseConfig {
            memoization: tessel::Memoization::Packrat { capacity: Some(8) },
            ..ParseConfig::default()
        });
        let expected = outcome(plain.parse_string(&text, parse_all));
        prop_assert_eq!(&outcome(packrat.parse_string(&text, parse_all)), &expected);
        prop_assert_eq!(&outcome(bounded.parse_string(&text, parse_all)), &expected);
    }

    #[test]
    fn test_scan_is_idempotent(text in input_strategy()) {
        let grammar = expression_grammar();
        let spans = |g: &Grammar| -> Vec<(usize, usize)> {
            g.scan_string(&text)
                .filter_map(Result::ok)
                .map(|(_, start, end)| (start, end))
                .collect()
        };
        let first = spans(&grammar);
        prop_assert_eq!(&first, &spans(&grammar));
        for pair in first.windows(2) {
            prop_assert!(pair[0].1 <= pair[1].0);
        }
    }

    #[test]
    fn test_failure_position_within_input(text in input_strategy()) {
        let grammar = expression_grammar();
        if let Err(err) = grammar.parse_string(&text, true) {
            let position = err.position().expect("mismatch has a position");
            prop_assert!(position <= text.len());
        }
    }
}
