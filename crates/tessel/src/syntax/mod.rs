//! Positions within parsed text
//!
//! [`Span`] is the byte range a match covers; [`LineIndex`] maps byte offsets
//! back to human-facing line and column numbers for failure reports.

pub mod line_col;
mod text;

pub use line_col::{LineCol, LineIndex};
pub use text::Span;
