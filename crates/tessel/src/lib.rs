//! # Tessel
//!
//! A parser-combinator library: grammars are assembled at runtime from small
//! expression nodes and matched directly against text, producing tokens and
//! named fields.
//!
//! ## Overview
//!
//! - **Grammar construction**: literals, keywords, character-set words,
//!   regular expressions, sequences, ordered and longest-match choices,
//!   repetition, lookahead, and forwards for recursion, built through
//!   [`GrammarBuilder`]
//! - **Whitespace and comments**: each node skips its own whitespace set
//!   (frozen when the node is built) and any attached ignorable expressions
//! - **Results**: [`MatchResults`] holds an ordered token list and a field
//!   map, with shallow and deep copies
//! - **Memoization**: optional packrat caching, or seed growing so
//!   left-recursive rules terminate
//! - **Diagnostics**: the furthest failure wins and is reported with line,
//!   column, and a caret-marked source line
//!
//! ## Quick Start
//!
//! ```rust
//! use tessel::{CharSet, GrammarBuilder};
//!
//! let mut g = GrammarBuilder::new();
//! let word = g.word(CharSet::alphas())?;
//! let comma = g.literal(",")?;
//! let bang = g.literal("!")?;
//! let greeting = g.seq([word, comma, word, bang]);
//! let grammar = g.build(greeting)?;
//!
//! let results = grammar.parse_string("Hello, World!", true)?;
//! assert_eq!(results.to_strings(), ["Hello", ",", "World", "!"]);
//!
//! let err = grammar.parse_string("Hello World!", true).unwrap_err();
//! assert_eq!(err.position(), Some(6));
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ## Feature flags
//!
//! - `diagnostics`: [`miette`](https://docs.rs/miette) integration for
//!   [`ParseError`] and [`GrammarError`]
//! - `serialize`: serde support for [`ParseConfig`], [`CharSet`], and
//!   position types

pub mod error;
pub mod grammar;
mod input;
pub mod peg;
pub mod results;
pub mod syntax;

// Re-export commonly used types
pub use error::{Diagnostic, GrammarError, ParseError, Report};
pub use grammar::{
    Action, ActionContext, ActionError, CharSet, ExprId, Grammar, GrammarBuilder, Node, NodeKind,
};
pub use peg::{LogTracer, Memoization, ParseConfig, ParseMetrics, Parser, ScanIter, Tracer};
pub use results::{FieldValue, MatchResults, Nested, Value};
pub use syntax::{LineCol, LineIndex, Span};
