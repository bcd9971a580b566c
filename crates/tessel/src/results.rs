//! # Match Results
//!
//! The structured output of a successful match: an ordered token list plus a
//! mapping from field names to the values recorded under them.
//!
//! ## Field semantics
//!
//! Every value recorded under a name is kept, together with the token offset
//! it was recorded at. Lookup through [`MatchResults::get`] returns the most
//! recent value for ordinary fields; fields created with `accumulate` (the
//! trailing `*` naming convention) return every value through
//! [`MatchResults::field`]. Concatenation ([`MatchResults::extend`]) keeps the
//! token order of both operands and appends the right operand's field entries
//! after the left's, shifting their offsets.
//!
//! ## Copies
//!
//! Nested groups are stored behind [`Arc`]. [`MatchResults::copy`] shares
//! them with the original; mutation through [`MatchResults::group_mut`] is
//! copy-on-write, so neither side observes the other's edits.
//! [`MatchResults::deep_copy`] allocates fresh groups all the way down.

use crate::grammar::ExprId;
use compact_str::CompactString;
use smallvec::SmallVec;
use std::collections::BTreeMap;
use std::fmt::{self, Write as _};
use std::sync::Arc;

/// A single token value
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Str(CompactString),
    Int(i64),
    Float(f64),
    /// Nested results produced by grouping constructs
    Group(Arc<MatchResults>),
}

impl Value {
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(i) => Some(*i),
            _ => None,
        }
    }

    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Self::Float(f) => Some(*f),
            Self::Int(i) => Some(*i as f64),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_group(&self) -> Option<&MatchResults> {
        match self {
            Self::Group(g) => Some(g),
            _ => None,
        }
    }

    #[must_use]
    pub const fn is_group(&self) -> bool {
        matches!(self, Self::Group(_))
    }

    /// Wrap `results` as a nested group value
    #[must_use]
    pub fn group(results: MatchResults) -> Self {
        Self::Group(Arc::new(results))
    }

    fn deep_copy(&self) -> Self {
        match self {
            Self::Group(g) => Self::Group(Arc::new(g.deep_copy())),
            other => other.clone(),
        }
    }

    fn to_nested(&self) -> Nested {
        match self {
            Self::Group(g) if !g.fields.is_empty() => Nested::Map(g.as_map()),
            Self::Group(g) => Nested::List(g.as_list()),
            leaf => Nested::Leaf(leaf.clone()),
        }
    }

    fn fmt_repr(&self, f: &mut impl fmt::Write) -> fmt::Result {
        match self {
            Self::Str(s) => write!(f, "{s:?}"),
            Self::Int(i) => write!(f, "{i}"),
            Self::Float(x) => write!(f, "{x:?}"),
            Self::Group(g) => g.fmt_list(f),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Str(s) => f.write_str(s),
            Self::Int(i) => write!(f, "{i}"),
            Self::Float(x) => write!(f, "{x}"),
            Self::Group(g) => g.fmt_list(f),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::Str(CompactString::from(s))
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::Str(CompactString::from(s))
    }
}

impl From<CompactString> for Value {
    fn from(s: CompactString) -> Self {
        Self::Str(s)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Self::Int(i)
    }
}

impl From<f64> for Value {
    fn from(x: f64) -> Self {
        Self::Float(x)
    }
}

impl From<MatchResults> for Value {
    fn from(results: MatchResults) -> Self {
        Self::group(results)
    }
}

impl PartialEq<&str> for Value {
    fn eq(&self, other: &&str) -> bool {
        self.as_str() == Some(*other)
    }
}

/// What a field lookup found
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue<'r> {
    /// The most recent value of an ordinary field
    Single(&'r Value),
    /// Every value of an accumulating field, in match order
    List(Vec<&'r Value>),
}

impl<'r> FieldValue<'r> {
    /// The single value, or the last element of a list
    #[must_use]
    pub fn last(&self) -> Option<&'r Value> {
        match self {
            Self::Single(v) => Some(v),
            Self::List(vs) => vs.last().copied(),
        }
    }
}

/// A nested token tree, as returned by [`MatchResults::as_list`] and
/// [`MatchResults::as_map`]
#[derive(Debug, Clone, PartialEq)]
pub enum Nested {
    Leaf(Value),
    List(Vec<Nested>),
    /// A group's named fields
    Map(BTreeMap<String, Nested>),
}

#[derive(Debug, Clone, PartialEq)]
struct FieldEntry {
    value: Value,
    offset: usize,
}

#[derive(Debug, Clone, PartialEq)]
struct Field {
    name: CompactString,
    accumulate: bool,
    entries: SmallVec<[FieldEntry; 1]>,
}

/// Tokens and named fields collected by a successful match
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MatchResults {
    tokens: SmallVec<[Value; 4]>,
    fields: SmallVec<[Field; 2]>,
    origin: Option<ExprId>,
}

impl MatchResults {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_tokens<I, V>(tokens: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        Self {
            tokens: tokens.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    pub(crate) fn single(value: impl Into<Value>) -> Self {
        let mut results = Self::new();
        results.tokens.push(value.into());
        results
    }

    /// The expression whose match produced these results
    #[must_use]
    pub const fn origin(&self) -> Option<ExprId> {
        self.origin
    }

    pub(crate) fn set_origin(&mut self, origin: ExprId) {
        self.origin = Some(origin);
    }

    #[must_use]
    pub fn tokens(&self) -> &[Value] {
        &self.tokens
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Value> {
        self.tokens.iter()
    }

    #[must_use]
    pub fn first(&self) -> Option<&Value> {
        self.tokens.first()
    }

    pub fn push(&mut self, value: impl Into<Value>) {
        self.tokens.push(value.into());
    }

    /// Insert a token at `index`, shifting the offsets of later field entries
    ///
    /// # Panics
    ///
    /// Panics if `index > len`.
    pub fn insert(&mut self, index: usize, value: impl Into<Value>) {
        self.tokens.insert(index, value.into());
        for entry in self.fields.iter_mut().flat_map(|f| f.entries.iter_mut()) {
            if entry.offset >= index {
                entry.offset += 1;
            }
        }
    }

    /// Remove the last token
    pub fn pop(&mut self) -> Option<Value> {
        self.tokens.pop()
    }

    /// Replace every token, keeping fields
    pub fn set_tokens<I, V>(&mut self, tokens: I)
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        self.tokens = tokens.into_iter().map(Into::into).collect();
    }

    pub(crate) fn clear_tokens(&mut self) {
        self.tokens.clear();
    }

    /// Drop all tokens and fields
    pub fn clear(&mut self) {
        self.tokens.clear();
        self.fields.clear();
    }

    /// Append `other`, preserving its token order and field entries
    ///
    /// Field entries from `other` land after existing entries of the same
    /// name, so a later ordinary field shadows an earlier one while an
    /// accumulating field keeps both.
    pub fn extend(&mut self, other: Self) {
        let shift = self.tokens.len();
        self.tokens.extend(other.tokens);
        for mut field in other.fields {
            for entry in &mut field.entries {
                entry.offset += shift;
            }
            match self.fields.iter_mut().find(|f| f.name == field.name) {
                Some(existing) => {
                    existing.accumulate |= field.accumulate;
                    existing.entries.extend(field.entries);
                }
                None => self.fields.push(field),
            }
        }
    }

    /// Record the current tokens under `name`
    ///
    /// Nothing is recorded when there are no tokens. A single token is stored
    /// as a scalar unless `as_list` is set; several tokens are stored as a
    /// group. An empty-string token is a real match and is recorded.
    pub(crate) fn name_tokens(&mut self, name: &str, accumulate: bool, as_list: bool) {
        let value = match self.tokens.as_slice() {
            [] => return,
            [only] if !as_list => only.clone(),
            tokens => Value::group(Self::from_tokens(tokens.iter().cloned())),
        };
        self.record(name, accumulate, value, 0);
    }

    /// Record each group token `[key, value...]` as a field named `key`
    pub(crate) fn name_groups_by_key(&mut self) {
        let mut entries = Vec::new();
        for (offset, token) in self.tokens.iter().enumerate() {
            let Value::Group(group) = token else {
                continue;
            };
            let Some((key, rest)) = group.tokens.split_first() else {
                continue;
            };
            let value = match rest {
                [] => Value::from(""),
                [only] if group.fields.is_empty() => only.clone(),
                _ => {
                    let mut inner = (**group).clone();
                    inner.tokens.remove(0);
                    for entry in inner.fields.iter_mut().flat_map(|f| f.entries.iter_mut()) {
                        entry.offset = entry.offset.saturating_sub(1);
                    }
                    Value::group(inner)
                }
            };
            entries.push((key.to_string(), value, offset));
        }
        for (key, value, offset) in entries {
            self.record(&key, false, value, offset);
        }
    }

    fn record(&mut self, name: &str, accumulate: bool, value: Value, offset: usize) {
        let entry = FieldEntry { value, offset };
        match self.fields.iter_mut().find(|f| f.name == name) {
            Some(field) => {
                field.accumulate |= accumulate;
                field.entries.push(entry);
            }
            None => self.fields.push(Field {
                name: CompactString::from(name),
                accumulate,
                entries: smallvec::smallvec![entry],
            }),
        }
    }

    /// Assign `value` to `name`, replacing any earlier values
    pub fn set_field(&mut self, name: &str, value: impl Into<Value>) {
        let offset = self.tokens.len();
        self.fields.retain(|f| f.name != name);
        self.record(name, false, value.into(), offset);
    }

    /// Append `value` to the accumulating field `name`
    pub fn append_field(&mut self, name: &str, value: impl Into<Value>) {
        let offset = self.tokens.len();
        self.record(name, true, value.into(), offset);
    }

    /// Remove `name`, returning its most recent value
    pub fn remove_field(&mut self, name: &str) -> Option<Value> {
        let idx = self.fields.iter().position(|f| f.name == name)?;
        let field = self.fields.remove(idx);
        field.entries.into_iter().last().map(|e| e.value)
    }

    #[must_use]
    pub fn has_field(&self, name: &str) -> bool {
        self.fields.iter().any(|f| f.name == name)
    }

    /// Field names in first-recorded order
    pub fn names(&self) -> impl Iterator<Item = &str> + '_ {
        self.fields.iter().map(|f| f.name.as_str())
    }

    /// The most recent value recorded under `name`
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.find(name)?.entries.last().map(|e| &e.value)
    }

    /// Look up `name`, honouring its accumulate flag
    #[must_use]
    pub fn field(&self, name: &str) -> Option<FieldValue<'_>> {
        let field = self.find(name)?;
        if field.accumulate {
            Some(FieldValue::List(field.entries.iter().map(|e| &e.value).collect()))
        } else {
            field.entries.last().map(|e| FieldValue::Single(&e.value))
        }
    }

    /// Every value ever recorded under `name`, in match order
    #[must_use]
    pub fn field_values(&self, name: &str) -> Vec<&Value> {
        self.find(name)
            .map(|f| f.entries.iter().map(|e| &e.value).collect())
            .unwrap_or_default()
    }

    /// The most recent value of `name` as a string
    #[must_use]
    pub fn get_str(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(Value::as_str)
    }

    fn find(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Mutable access to the nested group at token `index`
    ///
    /// Groups shared with a shallow copy are cloned first.
    pub fn group_mut(&mut self, index: usize) -> Option<&mut Self> {
        match self.tokens.get_mut(index)? {
            Value::Group(g) => Some(Arc::make_mut(g)),
            _ => None,
        }
    }

    /// Shallow copy: nested groups are shared with `self`
    #[must_use]
    pub fn copy(&self) -> Self {
        self.clone()
    }

    /// Deep copy: every nested group is copied independently
    #[must_use]
    pub fn deep_copy(&self) -> Self {
        Self {
            tokens: self.tokens.iter().map(Value::deep_copy).collect(),
            fields: self
                .fields
                .iter()
                .map(|f| Field {
                    name: f.name.clone(),
                    accumulate: f.accumulate,
                    entries: f
                        .entries
                        .iter()
                        .map(|e| FieldEntry {
                            value: e.value.deep_copy(),
                            offset: e.offset,
                        })
                        .collect(),
                })
                .collect(),
            origin: self.origin,
        }
    }

    /// Whether the group at `index` is the same allocation in `other`
    #[must_use]
    pub fn shares_group_with(&self, other: &Self, index: usize) -> bool {
        match (self.tokens.get(index), other.tokens.get(index)) {
            (Some(Value::Group(a)), Some(Value::Group(b))) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }

    /// Tokens as a nested tree, groups becoming sublists
    #[must_use]
    pub fn as_list(&self) -> Vec<Nested> {
        self.tokens
            .iter()
            .map(|v| match v {
                Value::Group(g) => Nested::List(g.as_list()),
                leaf => Nested::Leaf(leaf.clone()),
            })
            .collect()
    }

    /// Fields as a map; nested groups with fields become maps themselves
    ///
    /// Ordinary fields map to their most recent value, accumulating fields
    /// to the list of all their values.
    ///
    /// ```rust
    /// use tessel::{MatchResults, Nested, Value};
    ///
    /// let mut r = MatchResults::from_tokens(["x", "1"]);
    /// r.set_field("name", "x");
    /// r.append_field("ids", "1");
    /// let map = r.as_map();
    /// assert_eq!(map["name"], Nested::Leaf(Value::from("x")));
    /// assert_eq!(map["ids"], Nested::List(vec![Nested::Leaf(Value::from("1"))]));
    /// ```
    #[must_use]
    pub fn as_map(&self) -> BTreeMap<String, Nested> {
        self.fields
            .iter()
            .filter_map(|field| {
                let value = if field.accumulate {
                    Nested::List(field.entries.iter().map(|e| e.value.to_nested()).collect())
                } else {
                    field.entries.last()?.value.to_nested()
                };
                Some((field.name.to_string(), value))
            })
            .collect()
    }

    /// Leaf values in order, with groups flattened away
    #[must_use]
    pub fn flattened(&self) -> Vec<&Value> {
        let mut out = Vec::with_capacity(self.tokens.len());
        self.collect_leaves(&mut out);
        out
    }

    fn collect_leaves<'r>(&'r self, out: &mut Vec<&'r Value>) {
        for value in &self.tokens {
            match value {
                Value::Group(g) => g.collect_leaves(out),
                leaf => out.push(leaf),
            }
        }
    }

    /// Flattened leaves rendered as strings
    #[must_use]
    pub fn to_strings(&self) -> Vec<String> {
        self.flattened().into_iter().map(ToString::to_string).collect()
    }

    /// Flattened leaves concatenated without separators
    #[must_use]
    pub fn joined(&self) -> String {
        self.flattened().into_iter().map(ToString::to_string).collect()
    }

    /// Multi-line rendering of tokens and fields
    ///
    /// ```rust
    /// use tessel::MatchResults;
    ///
    /// let mut r = MatchResults::from_tokens(["123", "Main St"]);
    /// r.set_field("house_number", "123");
    /// assert_eq!(r.dump(), "[\"123\", \"Main St\"]\n- house_number: \"123\"");
    /// ```
    #[must_use]
    pub fn dump(&self) -> String {
        let mut out = String::new();
        let _ = self.fmt_list(&mut out);
        self.dump_fields(&mut out, 0);
        out
    }

    fn dump_fields(&self, out: &mut String, depth: usize) {
        let indent = "  ".repeat(depth);
        for field in &self.fields {
            let _ = write!(out, "\n{indent}- {}: ", field.name);
            if field.accumulate {
                out.push('[');
                for (i, entry) in field.entries.iter().enumerate() {
                    if i > 0 {
                        out.push_str(", ");
                    }
                    let _ = entry.value.fmt_repr(out);
                }
                out.push(']');
            } else if let Some(entry) = field.entries.last() {
                let _ = entry.value.fmt_repr(out);
                if let Value::Group(g) = &entry.value {
                    g.dump_fields(out, depth + 1);
                }
            }
        }
    }

    fn fmt_list(&self, f: &mut impl fmt::Write) -> fmt::Result {
        f.write_char('[')?;
        for (i, value) in self.tokens.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            value.fmt_repr(f)?;
        }
        f.write_char(']')
    }
}

impl fmt::Display for MatchResults {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.fmt_list(f)
    }
}

impl std::ops::Index<usize> for MatchResults {
    type Output = Value;

    fn index(&self, index: usize) -> &Value {
        &self.tokens[index]
    }
}

impl<'r> IntoIterator for &'r MatchResults {
    type Item = &'r Value;
    type IntoIter = std::slice::Iter<'r, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.tokens.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_name_single_token_is_scalar() {
        let mut r = MatchResults::from_tokens(["123"]);
        r.name_tokens("n", false, false);
        assert_eq!(r.get_str("n"), Some("123"));
    }

    #[test]
    fn test_name_many_tokens_is_group() {
        let mut r = MatchResults::from_tokens(["a", "b"]);
        r.name_tokens("n", false, false);
        let group = r.get("n").and_then(Value::as_group).expect("group");
        assert_eq!(group.to_strings(), vec!["a", "b"]);
    }

    #[test]
    fn test_name_without_tokens_records_nothing() {
        let mut r = MatchResults::new();
        r.name_tokens("n", false, false);
        assert!(!r.has_field("n"));
    }

    #[test]
    fn test_name_empty_string_is_recorded() {
        let mut r = MatchResults::from_tokens([""]);
        r.name_tokens("n", false, false);
        assert_eq!(r.get_str("n"), Some(""));
    }

    #[test]
    fn test_extend_replaces_ordinary_field() {
        let mut left = MatchResults::from_tokens(["a"]);
        left.name_tokens("x", false, false);
        let mut right = MatchResults::from_tokens(["b"]);
        right.name_tokens("x", false, false);
        left.extend(right);
        assert_eq!(left.get_str("x"), Some("b"));
        assert_eq!(left.field("x"), Some(FieldValue::Single(&Value::from("b"))));
        assert_eq!(left.to_strings(), vec!["a", "b"]);
    }

    #[test]
    fn test_extend_accumulates_list_field() {
        let mut left = MatchResults::from_tokens(["a"]);
        left.name_tokens("x", true, false);
        let mut right = MatchResults::from_tokens(["b"]);
        right.name_tokens("x", true, false);
        left.extend(right);
        match left.field("x") {
            Some(FieldValue::List(values)) => {
                assert_eq!(values, vec![&Value::from("a"), &Value::from("b")]);
            }
            other => panic!("expected list, got {other:?}"),
        }
    }

    #[test]
    fn test_set_field_replaces_history() {
        let mut r = MatchResults::new();
        r.append_field("x", 1_i64);
        r.append_field("x", 2_i64);
        r.set_field("x", 3_i64);
        assert_eq!(r.field_values("x"), vec![&Value::Int(3)]);
    }

    #[test]
    fn test_insert_and_pop() {
        let mut r = MatchResults::from_tokens(["b", "c"]);
        r.insert(0, "a");
        assert_eq!(r.to_strings(), vec!["a", "b", "c"]);
        assert_eq!(r.pop(), Some(Value::from("c")));
        assert_eq!(r.len(), 2);
    }

    #[test]
    fn test_shallow_copy_is_copy_on_write() {
        let mut original = MatchResults::new();
        original.push(MatchResults::from_tokens(["inner"]));
        let mut copy = original.copy();
        assert!(copy.shares_group_with(&original, 0));

        copy.group_mut(0).expect("group").push("added");
        assert!(!copy.shares_group_with(&original, 0));
        assert_eq!(original.to_strings(), vec!["inner"]);
        assert_eq!(copy.to_strings(), vec!["inner", "added"]);
    }

    #[test]
    fn test_deep_copy_does_not_share() {
        let mut original = MatchResults::new();
        original.push(MatchResults::from_tokens(["inner"]));
        let copy = original.deep_copy();
        assert!(!copy.shares_group_with(&original, 0));
        assert_eq!(copy, original);
    }

    #[test]
    fn test_as_list_and_flattened() {
        let mut r = MatchResults::from_tokens(["a"]);
        r.push(MatchResults::from_tokens(["b", "c"]));
        assert_eq!(
            r.as_list(),
            vec![
                Nested::Leaf(Value::from("a")),
                Nested::List(vec![Nested::Leaf(Value::from("b")), Nested::Leaf(Value::from("c"))]),
            ]
        );
        assert_eq!(r.to_strings(), vec!["a", "b", "c"]);
        assert_eq!(r.joined(), "abc");
    }

    #[test]
    fn test_groups_by_key() {
        let mut r = MatchResults::new();
        r.push(MatchResults::from_tokens(["width", "10"]));
        r.push(MatchResults::from_tokens(["flag"]));
        r.push(MatchResults::from_tokens(["size", "3", "4"]));
        r.push("loose");
        r.name_groups_by_key();

        assert_eq!(r.get_str("width"), Some("10"));
        assert_eq!(r.get_str("flag"), Some(""));
        let size = r.get("size").and_then(Value::as_group).expect("group");
        assert_eq!(size.to_strings(), vec!["3", "4"]);
        assert!(!r.has_field("loose"));
        assert_eq!(r.len(), 4);
    }

    #[test]
    fn test_as_map_nests_named_groups() {
        let mut inner = MatchResults::from_tokens(["1", "2"]);
        inner.set_field("x", "1");
        let mut r = MatchResults::new();
        r.push(inner.clone());
        r.set_field("point", inner);
        r.set_field("label", MatchResults::from_tokens(["a", "b"]));

        let map = r.as_map();
        let mut point = BTreeMap::new();
        point.insert("x".to_string(), Nested::Leaf(Value::from("1")));
        assert_eq!(map["point"], Nested::Map(point));
        assert_eq!(
            map["label"],
            Nested::List(vec![Nested::Leaf(Value::from("a")), Nested::Leaf(Value::from("b"))])
        );
    }

    #[test]
    fn test_display() {
        let mut r = MatchResults::from_tokens(["a"]);
        r.push(3_i64);
        r.push(MatchResults::from_tokens(["b"]));
        assert_eq!(r.to_string(), "[\"a\", 3, [\"b\"]]");
    }
}
