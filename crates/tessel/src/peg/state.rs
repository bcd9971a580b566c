use super::config::{Memoization, ParseConfig};
use super::parser::Step;
use crate::grammar::ExprId;
use hashbrown::HashMap;
use lru::LruCache;
use std::num::NonZeroUsize;

/// Counters collected while parsing
///
/// Counters accumulate across parses until [`Parser::reset`](super::Parser::reset).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ParseMetrics {
    /// Node attempts, including ones answered from the cache
    pub attempts: usize,
    pub cache_hits: usize,
    pub cache_misses: usize,
    /// Times a left-recursive seed match was successfully grown
    pub growth_iterations: usize,
}

/// Key for packrat cache entries
///
/// Outcomes depend on whether actions run, whether leading whitespace is
/// skipped, and whether the attempt happens inside a combined (adjacent)
/// region, so all three are part of the key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct MemoKey {
    pub(crate) expr: ExprId,
    pub(crate) position: usize,
    pub(crate) do_actions: bool,
    pub(crate) pre_skip: bool,
    pub(crate) adjacent: bool,
}

/// Key for left-recursion seeds: (position, forward, with actions)
pub(crate) type SeedKey = (usize, ExprId, bool);

#[derive(Debug)]
enum MemoTable {
    Unbounded(HashMap<MemoKey, Step, ahash::RandomState>),
    Bounded(LruCache<MemoKey, Step, ahash::RandomState>),
}

/// Mutable state threaded through one parse
#[derive(Debug)]
pub(crate) struct ParserState {
    memo: Option<MemoTable>,
    left_recursion: bool,
    seeds: HashMap<SeedKey, Step, ahash::RandomState>,
    pub(crate) metrics: ParseMetrics,
}

impl ParserState {
    pub(crate) fn new(config: &ParseConfig) -> Self {
        let memo = match config.memoization {
            Memoization::Packrat { capacity: None } => Some(MemoTable::Unbounded(
                HashMap::with_hasher(ahash::RandomState::new()),
            )),
            Memoization::Packrat {
                capacity: Some(capacity),
            } => NonZeroUsize::new(capacity).map(|cap| {
                MemoTable::Bounded(LruCache::with_hasher(cap, ahash::RandomState::new()))
            }),
            Memoization::Disabled | Memoization::LeftRecursion => None,
        };
        Self {
            memo,
            left_recursion: config.memoization == Memoization::LeftRecursion,
            seeds: HashMap::with_hasher(ahash::RandomState::new()),
            metrics: ParseMetrics::default(),
        }
    }

    pub(crate) const fn packrat_enabled(&self) -> bool {
        self.memo.is_some()
    }

    pub(crate) const fn left_recursion_enabled(&self) -> bool {
        self.left_recursion
    }

    pub(crate) fn memo_get(&mut self, key: &MemoKey) -> Option<Step> {
        let hit = match self.memo.as_mut()? {
            MemoTable::Unbounded(table) => table.get(key).cloned(),
            MemoTable::Bounded(table) => table.get(key).cloned(),
        };
        if hit.is_some() {
            self.metrics.cache_hits += 1;
        } else {
            self.metrics.cache_misses += 1;
        }
        hit
    }

    pub(crate) fn memo_put(&mut self, key: MemoKey, step: Step) {
        match self.memo.as_mut() {
            Some(MemoTable::Unbounded(table)) => {
                table.insert(key, step);
            }
            Some(MemoTable::Bounded(table)) => {
                table.put(key, step);
            }
            None => {}
        }
    }

    pub(crate) fn seed_get(&self, key: &SeedKey) -> Option<Step> {
        self.seeds.get(key).cloned()
    }

    pub(crate) fn seed_put(&mut self, key: SeedKey, step: Step) {
        self.seeds.insert(key, step);
    }

    pub(crate) fn seed_take(&mut self, key: &SeedKey) -> Option<Step> {
        self.seeds.remove(key)
    }

    /// Drop cached outcomes; they are only valid for one input text
    pub(crate) fn clear_memo(&mut self) {
        match self.memo.as_mut() {
            Some(MemoTable::Unbounded(table)) => table.clear(),
            Some(MemoTable::Bounded(table)) => table.clear(),
            None => {}
        }
        self.seeds.clear();
    }

    /// Number of cached outcomes currently held
    pub(crate) fn memo_len(&self) -> usize {
        let cached = match &self.memo {
            Some(MemoTable::Unbounded(table)) => table.len(),
            Some(MemoTable::Bounded(table)) => table.len(),
            None => 0,
        };
        cached + self.seeds.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Diagnostic;

    fn key(position: usize) -> MemoKey {
        MemoKey {
            expr: ExprId::from_index(0),
            position,
            do_actions: true,
            pre_skip: true,
            adjacent: false,
        }
    }

    #[test]
    fn test_disabled_state_caches_nothing() {
        let mut state = ParserState::new(&ParseConfig::default());
        assert!(!state.packrat_enabled());
        state.memo_put(key(0), Step::Failed(Diagnostic::new(0, "x")));
        assert!(state.memo_get(&key(0)).is_none());
        assert_eq!(state.memo_len(), 0);
    }

    #[test]
    fn test_bounded_cache_evicts_least_recent() {
        let config = ParseConfig {
            memoization: Memoization::Packrat { capacity: Some(2) },
            ..ParseConfig::default()
        };
        let mut state = ParserState::new(&config);
        for pos in 0..3 {
            state.memo_put(key(pos), Step::Failed(Diagnostic::new(pos, "x")));
        }
        assert!(state.memo_get(&key(0)).is_none());
        assert!(state.memo_get(&key(2)).is_some());
        assert_eq!(state.metrics.cache_hits, 1);
        assert_eq!(state.metrics.cache_misses, 1);
    }

    #[test]
    fn test_clear_memo() {
        let mut state = ParserState::new(&ParseConfig::packrat());
        state.memo_put(key(1), Step::Failed(Diagnostic::new(1, "x")));
        assert_eq!(state.memo_len(), 1);
        state.clear_memo();
        assert_eq!(state.memo_len(), 0);
    }
}
