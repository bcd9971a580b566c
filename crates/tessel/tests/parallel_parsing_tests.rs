//! A built grammar shared across threads

use rayon::prelude::*;
use std::sync::Arc;
use tessel::grammar::{CharSet, GrammarBuilder};
use tessel::{Grammar, ParseConfig, Parser};

fn csv_row() -> Grammar {
    let mut g = GrammarBuilder::new();
    let cell = g.word(CharSet::alphanums()).expect("word");
    let cell = g.named(cell, "cell*");
    let comma = g.literal(",").expect("literal");
    let comma = g.suppress(comma);
    let more = g.seq([comma, cell]);
    let rest = g.zero_or_more(more);
    let row = g.seq([cell, rest]);
    g.build(row).expect("Failed to build grammar")
}

fn assert_send_sync<T: Send + Sync>() {}

#[test]
fn test_grammar_is_send_and_sync() {
    assert_send_sync::<Grammar>();
    assert_send_sync::<tessel::ParseError>();
}

#[test]
fn test_parallel_parse_matches_sequential() {
    let grammar = csv_row().with_config(ParseConfig::packrat());
    let rows: Vec<String> = (0..64)
        .map(|i| format!("r{i}, a{i}, {i}, z"))
        .collect();

    let sequential: Vec<Vec<String>> = rows
        .iter()
        .map(|row| grammar.parse_string(row, true).expect("parse").to_strings())
        .collect();
    let parallel: Vec<Vec<String>> = rows
        .par_iter()
        .map(|row| grammar.parse_string(row, true).expect("parse").to_strings())
        .collect();

    assert_eq!(sequential, parallel);
    assert_eq!(parallel[3], vec!["r3", "a3", "3", "z"]);
}

#[test]
fn test_parser_per_thread() {
    let grammar = Arc::new(csv_row());
    let handles: Vec<_> = (0..4)
        .map(|t| {
            let grammar = Arc::clone(&grammar);
            std::thread::spawn(move || {
                let mut parser = Parser::new(&grammar);
                (0..10)
                    .filter(|i| {
                        let row = if i % 2 == 0 {
                            format!("t{t}, {i}")
                        } else {
                            format!("t{t},, {i}")
                        };
                        parser.parse(&row, true).is_ok()
                    })
                    .count()
            })
        })
        .collect();

    for handle in handles {
        assert_eq!(handle.join().expect("thread panicked"), 5);
    }
}

#[test]
fn test_parallel_errors_are_independent() {
    let grammar = csv_row();
    let inputs: &[&str] = &["a,b", "a,,b", "a, b, c", ",a"];
    let positions: Vec<Option<usize>> = inputs
        .par_iter()
        .map(|text| grammar.parse_string(text, true).err().and_then(|e| e.position()))
        .collect();
    assert_eq!(positions, vec![None, Some(1), None, Some(0)]);
}
