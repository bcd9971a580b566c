use super::parser::{Matcher, Step};
use super::state::ParserState;
use crate::error::ParseError;
use crate::grammar::Grammar;
use crate::input::{next_boundary, InputView};
use crate::results::MatchResults;

/// Lazy iterator over the matches of a grammar within a text
///
/// Created by [`Grammar::scan_string`]. Each item is `(results, start,
/// end)`. After a match the scan resumes at its end; after a miss, or an
/// empty match, it moves one character on. Once an error has been yielded
/// the iterator is exhausted.
#[derive(Debug)]
pub struct ScanIter<'t> {
    grammar: Grammar,
    view: InputView<'t>,
    state: ParserState,
    position: usize,
    done: bool,
}

impl<'t> ScanIter<'t> {
    pub(crate) fn new(grammar: &Grammar, view: InputView<'t>) -> Self {
        log::debug!("scan of {} chars", view.text().len());
        grammar.warn_unsupported_left_recursion();
        Self {
            state: ParserState::new(grammar.config()),
            grammar: grammar.clone(),
            view,
            position: 0,
            done: false,
        }
    }

    /// Byte offset the next attempt starts from
    #[must_use]
    pub const fn position(&self) -> usize {
        self.position
    }

    /// Detach from the borrowed text
    #[must_use]
    pub fn into_owned(self) -> ScanIter<'static> {
        ScanIter {
            grammar: self.grammar,
            view: self.view.into_owned(),
            state: self.state,
            position: self.position,
            done: self.done,
        }
    }
}

impl Iterator for ScanIter<'_> {
    type Item = Result<(MatchResults, usize, usize), ParseError>;

    fn next(&mut self) -> Option<Self::Item> {
        let text = self.view.text();
        let root = self.grammar.root();
        while !self.done && self.position <= text.len() {
            let loc = self.position;
            let mut matcher = Matcher::new(&self.grammar, text, &mut self.state, None);
            let attempt = matcher
                .skip_leading(self.grammar.node_ref(root), loc)
                .and_then(|start| Ok((start, matcher.match_expr(root, start, true, false)?)));
            match attempt {
                Ok((start, Step::Matched { end, results })) if end > loc => {
                    self.position = end;
                    return Some(Ok((results, start, end)));
                }
                Ok((start, _)) => self.position = next_boundary(text, start),
                Err(halt) => {
                    self.done = true;
                    return Some(Err(halt.into_error(text)));
                }
            }
        }
        self.done = true;
        None
    }
}

impl std::iter::FusedIterator for ScanIter<'_> {}
