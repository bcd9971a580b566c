#![no_main]
use libfuzzer_sys::fuzz_target;
use tessel::grammar::{CharSet, GrammarBuilder};

fuzz_target!(|data: &[u8]| {
    let Ok(input) = std::str::from_utf8(data) else {
        return;
    };
    let mut g = GrammarBuilder::new();
    let Ok(word) = g.word(CharSet::alphanums()) else {
        return;
    };
    let Ok(eq) = g.literal("=") else {
        return;
    };
    let Ok(value) = g.chars_not_in(";\n", 1..) else {
        return;
    };
    let pair = g.seq([word, eq, value]);
    let Ok(grammar) = g.build(pair) else {
        return;
    };

    let mut last_end = 0;
    for (_, start, end) in grammar.scan_string(input).flatten() {
        assert!(start >= last_end && end >= start);
        last_end = end;
    }
    let _ = grammar.transform_string(input);
});
