//! Formatting helpers shared by failure messages

use super::ParseError;
use std::fmt::Write as _;

/// Render a character the way failure messages quote found text
#[must_use]
pub fn quote_char(c: char) -> String {
    match c {
        '\n' => "'\\n'".to_string(),
        '\t' => "'\\t'".to_string(),
        '\r' => "'\\r'".to_string(),
        '\'' => "\"'\"".to_string(),
        c => format!("'{c}'"),
    }
}

/// Prefix an error with `file:line:col: ` when it carries a position
#[must_use]
pub fn format_error_with_location(error: &ParseError, filename: Option<&str>) -> String {
    let mut out = String::new();
    if let Some(report) = error.report() {
        if let Some(filename) = filename {
            let _ = write!(out, "{filename}:");
        }
        let _ = write!(out, "{}:{}: ", report.line(), report.column());
    }
    let _ = write!(out, "{error}");
    out
}
