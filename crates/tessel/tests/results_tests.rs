//! Token lists, named fields, and copies of match results

use tessel::grammar::{CharSet, GrammarBuilder};
use tessel::{FieldValue, MatchResults, Nested, Value};

#[test]
fn test_later_field_shadows_earlier() {
    let mut g = GrammarBuilder::new();
    let word = g.word(CharSet::alphas()).expect("word");
    let item = g.named(word, "item");
    let items = g.one_or_more(item);
    let grammar = g.build(items).expect("build");

    let results = grammar.parse_string("a b c", true).expect("parse");
    assert_eq!(results.get_str("item"), Some("c"));
    assert!(matches!(results.field("item"), Some(FieldValue::Single(v)) if *v == "c"));
    assert_eq!(results.field_values("item").len(), 3);
}

#[test]
fn test_accumulating_field_keeps_every_value() {
    let mut g = GrammarBuilder::new();
    let word = g.word(CharSet::alphas()).expect("word");
    let item = g.named(word, "item*");
    let items = g.one_or_more(item);
    let grammar = g.build(items).expect("build");

    let results = grammar.parse_string("a b c", true).expect("parse");
    match results.field("item") {
        Some(FieldValue::List(values)) => {
            let values: Vec<String> = values.iter().map(ToString::to_string).collect();
            assert_eq!(values, vec!["a", "b", "c"]);
        }
        other => panic!("Expected a list field, got {other:?}"),
    }
    assert_eq!(
        results.field("item").and_then(|f| f.last()),
        Some(&Value::from("c"))
    );
}

#[test]
fn test_named_list_always_accumulates() {
    let mut g = GrammarBuilder::new();
    let digits = g.word(CharSet::digits()).expect("word");
    let one = g.named_list(digits, "values");
    let grammar = g.build(one).expect("build");

    let results = grammar.parse_string("42", true).expect("parse");
    assert_eq!(
        results.field("values"),
        Some(FieldValue::List(vec![&Value::from("42")]))
    );
    assert_eq!(results.dump(), "[\"42\"]\n- values: [\"42\"]");
}

#[test]
fn test_named_repetition_records_all_tokens() {
    let mut g = GrammarBuilder::new();
    let digits = g.word(CharSet::digits()).expect("word");
    let many = g.one_or_more(digits);
    let values = g.named(many, "values");
    let grammar = g.build(values).expect("build");

    let results = grammar.parse_string("1 2 3", true).expect("parse");
    assert_eq!(results.to_strings(), vec!["1", "2", "3"]);
    let group = results.get("values").and_then(Value::as_group).expect("group");
    assert_eq!(group.to_strings(), vec!["1", "2", "3"]);
}

#[test]
fn test_group_scopes_fields() {
    let mut g = GrammarBuilder::new();
    let key = g.word(CharSet::alphas()).expect("word");
    let key = g.named(key, "key");
    let eq = g.literal("=").expect("literal");
    let eq = g.suppress(eq);
    let value = g.word(CharSet::digits()).expect("word");
    let value = g.named(value, "value");
    let pair = g.seq([key, eq, value]);
    let pair = g.group(pair);
    let pairs = g.one_or_more(pair);
    let grammar = g.build(pairs).expect("build");

    let results = grammar.parse_string("a=1 b=2", true).expect("parse");
    assert_eq!(results.len(), 2);
    assert!(!results.has_field("key"));
    let second = results[1].as_group().expect("group");
    assert_eq!(second.get_str("key"), Some("b"));
    assert_eq!(second.get_str("value"), Some("2"));
    assert_eq!(
        results.as_list(),
        vec![
            Nested::List(vec![Nested::Leaf("a".into()), Nested::Leaf("1".into())]),
            Nested::List(vec![Nested::Leaf("b".into()), Nested::Leaf("2".into())]),
        ]
    );
}

#[test]
fn test_extend_keeps_order_and_fields() {
    let mut left = MatchResults::from_tokens(["a", "b"]);
    left.set_field("x", "a");
    let mut right = MatchResults::from_tokens(["c"]);
    right.set_field("x", "c");
    right.append_field("all", "c");

    left.extend(right);
    assert_eq!(left.to_strings(), vec!["a", "b", "c"]);
    assert_eq!(left.get_str("x"), Some("c"));
    assert_eq!(left.field_values("x").len(), 2);
    assert_eq!(left.names().collect::<Vec<_>>(), vec!["x", "all"]);
}

#[test]
fn test_shallow_copy_shares_until_written() {
    let mut original = MatchResults::new();
    original.push(Value::group(MatchResults::from_tokens(["1", "2"])));

    let mut copy = original.copy();
    assert!(copy.shares_group_with(&original, 0));

    copy.group_mut(0).expect("group").push("3");
    assert!(!copy.shares_group_with(&original, 0));
    assert_eq!(original.to_strings(), vec!["1", "2"]);
    assert_eq!(copy.to_strings(), vec!["1", "2", "3"]);
}

#[test]
fn test_deep_copy_is_independent() {
    let mut original = MatchResults::new();
    original.push(Value::group(MatchResults::from_tokens(["1"])));
    let group = original[0].clone();
    original.set_field("g", group);

    let deep = original.deep_copy();
    assert_eq!(deep, original);
    assert!(!deep.shares_group_with(&original, 0));
}

#[test]
fn test_token_editing() {
    let mut results = MatchResults::from_tokens(["b"]);
    results.insert(0, "a");
    results.push(3_i64);
    assert_eq!(results.to_strings(), vec!["a", "b", "3"]);
    assert_eq!(results.pop(), Some(Value::Int(3)));
    assert_eq!(results.first(), Some(&Value::from("a")));
    results.clear();
    assert!(results.is_empty());
}

#[test]
fn test_remove_field() {
    let mut results = MatchResults::from_tokens(["x"]);
    results.set_field("name", "x");
    assert_eq!(results.remove_field("name"), Some(Value::from("x")));
    assert!(!results.has_field("name"));
    assert_eq!(results.remove_field("name"), None);
}

#[test]
fn test_dump_lists_fields() {
    let mut g = GrammarBuilder::new();
    let number = g.word(CharSet::digits()).expect("word");
    let house_number = g.named(number, "house_number");
    let word = g.word(CharSet::alphas()).expect("word");
    let words = g.one_or_more(word);
    let street = g.original_text(words);
    let street_name = g.named(street, "street_name");
    let address = g.seq([house_number, street_name]);
    let grammar = g.build(address).expect("build");

    let results = grammar.parse_string("123 Main St", true).expect("parse");
    assert_eq!(
        results.dump(),
        "[\"123\", \"Main St\"]\n- house_number: \"123\"\n- street_name: \"Main St\""
    );
    assert_eq!(results.joined(), "123Main St");
}

#[test]
fn test_named_empty_match_is_recorded() {
    let mut g = GrammarBuilder::new();
    let digits = g.regex("[0-9]*").expect("regex");
    let n = g.named(digits, "n");
    let grammar = g.build(n).expect("build");

    let results = grammar.parse_string("abc", false).expect("parse");
    assert_eq!(results.to_strings(), vec![""]);
    assert_eq!(results.get_str("n"), Some(""));
}

#[test]
fn test_named_choice_keeps_sequence_as_group() {
    let mut g = GrammarBuilder::new();
    let a = g.literal("a").expect("literal");
    let b = g.literal("b").expect("literal");
    let c = g.literal("c").expect("literal");
    let pair = g.seq([a, b]);
    let either = g.first_of([pair, c]);
    let named = g.named(either, "pair");
    let grammar = g.build(named).expect("build");

    let results = grammar.parse_string("a b", true).expect("parse");
    let group = results.get("pair").and_then(Value::as_group).expect("group");
    assert_eq!(group.to_strings(), vec!["a", "b"]);

    let results = grammar.parse_string("c", true).expect("parse");
    let group = results.get("pair").and_then(Value::as_group).expect("group");
    assert_eq!(group.to_strings(), vec!["c"]);
}

#[test]
fn test_named_optional_sequence_is_a_group() {
    let mut g = GrammarBuilder::new();
    let a = g.literal("a").expect("literal");
    let b = g.literal("b").expect("literal");
    let pair = g.seq([a, b]);
    let maybe = g.optional(pair);
    let named = g.named(maybe, "maybe");
    let grammar = g.build(named).expect("build");

    let results = grammar.parse_string("a b", true).expect("parse");
    let group = results.get("maybe").and_then(Value::as_group).expect("group");
    assert_eq!(group.to_strings(), vec!["a", "b"]);
    assert!(!grammar.parse_string("", true).expect("parse").has_field("maybe"));
}

#[test]
fn test_as_map_from_keyed_groups() {
    let mut g = GrammarBuilder::new();
    let key = g.word(CharSet::alphas()).expect("word");
    let value = g.word(CharSet::digits()).expect("word");
    let values = g.one_or_more(value);
    let entry = g.seq([key, values]);
    let entry = g.group(entry);
    let entries = g.one_or_more(entry);
    let table = g.dict_of(entries);
    let grammar = g.build(table).expect("build");

    let results = grammar.parse_string("w 1 size 3 4", true).expect("parse");
    let map = results.as_map();
    assert_eq!(map.keys().collect::<Vec<_>>(), vec!["size", "w"]);
    assert_eq!(map["w"], Nested::Leaf(Value::from("1")));
    assert_eq!(
        map["size"],
        Nested::List(vec![
            Nested::Leaf(Value::from("3")),
            Nested::Leaf(Value::from("4"))
        ])
    );
}
