//! Delta construction and the change algebra: compose, index transform,
//! lengths, chop.
//!
//! A [`Delta`] is an ordered run of [`Op`]s. Builder methods normalize as
//! they go, so two deltas describing the same change compare equal: adjacent
//! compatible operations merge, zero-length operations disappear, and an
//! insert next to a delete always sits in front of it.

use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

use crate::attributes::Attributes;
use crate::op::{Embed, InsertContent, Op};

/// Which side of a tied position a mapped index sticks to.
///
/// When content is inserted exactly at an index being transformed, `Before`
/// keeps the index in front of the inserted run and `After` moves it past.
/// Everywhere a caret should hold its ground against concurrent or
/// decorative inserts, `Before` is the right choice.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum Affinity {
    #[default]
    Before,
    After,
}

/// An ordered sequence of operations describing a change to content, or
/// (when it is inserts only) content itself.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct Delta {
    ops: Vec<Op>,
}

impl Delta {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn with_capacity(capacity: usize) -> Self {
        Self {
            ops: Vec::with_capacity(capacity),
        }
    }

    pub fn ops(&self) -> &[Op] {
        &self.ops
    }

    pub fn into_ops(self) -> Vec<Op> {
        self.ops
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    /// Whether applying this delta changes nothing: no operations, or
    /// nothing but attribute-less retains.
    pub fn is_identity(&self) -> bool {
        self.ops.iter().all(|op| matches!(op, Op::Retain(_, None)))
    }

    /// Units of existing content this delta covers (retained plus deleted).
    ///
    /// A delta meant to transform a document in place accounts for every
    /// unit of it, so this equals the document length for such deltas.
    pub fn base_len(&self) -> usize {
        self.ops
            .iter()
            .map(|op| match op {
                Op::Retain(units, _) | Op::Delete(units) => *units,
                Op::Insert(..) => 0,
            })
            .sum()
    }

    /// Length of the content this delta produces when applied.
    pub fn target_len(&self) -> usize {
        self.ops
            .iter()
            .map(|op| match op {
                Op::Retain(units, _) => *units,
                Op::Insert(content, _) => content.unit_len(),
                Op::Delete(_) => 0,
            })
            .sum()
    }

    // === Builder ===

    pub fn retain(mut self, units: usize) -> Self {
        self.push(Op::retain(units));
        self
    }

    pub fn retain_attr(mut self, units: usize, attrs: Attributes) -> Self {
        self.push(Op::retain_attr(units, attrs));
        self
    }

    pub fn insert(mut self, text: impl Into<SmolStr>) -> Self {
        self.push(Op::insert(text));
        self
    }

    pub fn insert_attr(mut self, text: impl Into<SmolStr>, attrs: Attributes) -> Self {
        self.push(Op::insert_attr(text, attrs));
        self
    }

    pub fn insert_embed(mut self, embed: Embed) -> Self {
        self.push(Op::embed(embed));
        self
    }

    pub fn insert_embed_attr(mut self, embed: Embed, attrs: Attributes) -> Self {
        self.push(Op::embed_attr(embed, attrs));
        self
    }

    pub fn delete(mut self, units: usize) -> Self {
        self.push(Op::delete(units));
        self
    }

    /// Append an operation, keeping the delta normalized.
    ///
    /// Zero-length operations are dropped. Deletes merge with a trailing
    /// delete. Retains merge when their attributes match. An insert pushed
    /// right after a delete goes in front of it (it does not matter which
    /// happens first at the same position, and putting inserts first keeps
    /// the form canonical), merging with a preceding compatible insert.
    pub fn push(&mut self, op: Op) {
        if op.is_empty() {
            return;
        }
        match op {
            Op::Delete(units) => {
                if let Some(Op::Delete(last)) = self.ops.last_mut() {
                    *last += units;
                } else {
                    self.ops.push(Op::Delete(units));
                }
            }
            Op::Retain(units, attrs) => {
                if let Some(Op::Retain(last, last_attrs)) = self.ops.last_mut() {
                    if *last_attrs == attrs {
                        *last += units;
                        return;
                    }
                }
                self.ops.push(Op::Retain(units, attrs));
            }
            Op::Insert(content, attrs) => {
                let at = if matches!(self.ops.last(), Some(Op::Delete(_))) {
                    self.ops.len() - 1
                } else {
                    self.ops.len()
                };
                if at > 0 {
                    if let (Op::Insert(InsertContent::Text(prev), prev_attrs), InsertContent::Text(text)) =
                        (&mut self.ops[at - 1], &content)
                    {
                        if *prev_attrs == attrs {
                            let mut merged = String::from(prev.as_str());
                            merged.push_str(text);
                            *prev = SmolStr::from(merged);
                            return;
                        }
                    }
                }
                self.ops.insert(at, Op::Insert(content, attrs));
            }
        }
    }

    /// Drop a single trailing attribute-less retain; such a tail never
    /// changes what the delta does.
    pub fn chop(mut self) -> Self {
        if let Some(Op::Retain(_, None)) = self.ops.last() {
            self.ops.pop();
        }
        self
    }

    // === Algebra ===

    /// Combine two sequential deltas into one.
    ///
    /// `self` applies first, `other` applies to its output; the result
    /// applied once is equivalent to applying both in order. Operation
    /// boundaries in either input never matter, runs are split wherever the
    /// two sides disagree. Content past the end of the shorter side passes
    /// through unchanged.
    pub fn compose(&self, other: &Delta) -> Delta {
        if self.ops.is_empty() {
            return other.clone().chop();
        }
        if other.ops.is_empty() {
            return self.clone().chop();
        }

        let mut ops_a = self.ops.iter().cloned();
        let mut ops_b = other.ops.iter().cloned();
        let mut head_a = ops_a.next();
        let mut head_b = ops_b.next();
        let mut out = Delta::with_capacity(self.ops.len() + other.ops.len());

        loop {
            use std::cmp::Ordering;

            match (head_a.take(), head_b.take()) {
                (None, None) => break,
                // Deletes in the first delta concern content the second
                // delta never saw.
                (Some(Op::Delete(units)), b) => {
                    out.push(Op::Delete(units));
                    head_a = ops_a.next();
                    head_b = b;
                }
                // Inserts in the second delta land in front of whatever the
                // first produced at this point.
                (a, Some(op @ Op::Insert(..))) => {
                    out.push(op);
                    head_a = a;
                    head_b = ops_b.next();
                }
                // One side ran out; the rest of the other passes through.
                (None, Some(op)) => {
                    out.push(op);
                    head_b = ops_b.next();
                }
                (Some(op), None) => {
                    out.push(op);
                    head_a = ops_a.next();
                }
                (Some(Op::Retain(i, attrs_a)), Some(Op::Retain(j, attrs_b))) => {
                    let attrs =
                        Attributes::compose_opt(attrs_a.as_ref(), attrs_b.as_ref(), true);
                    match i.cmp(&j) {
                        Ordering::Less => {
                            out.push(Op::Retain(i, attrs));
                            head_a = ops_a.next();
                            head_b = Some(Op::Retain(j - i, attrs_b));
                        }
                        Ordering::Equal => {
                            out.push(Op::Retain(i, attrs));
                            head_a = ops_a.next();
                            head_b = ops_b.next();
                        }
                        Ordering::Greater => {
                            out.push(Op::Retain(j, attrs));
                            head_a = Some(Op::Retain(i - j, attrs_a));
                            head_b = ops_b.next();
                        }
                    }
                }
                (Some(Op::Insert(content, attrs_a)), Some(Op::Retain(j, attrs_b))) => {
                    // A retain over an insert formats the inserted content;
                    // removal markers take effect here rather than surviving.
                    let attrs =
                        Attributes::compose_opt(attrs_a.as_ref(), attrs_b.as_ref(), false);
                    let len = content.unit_len();
                    match len.cmp(&j) {
                        Ordering::Less => {
                            out.push(Op::Insert(content, attrs));
                            head_a = ops_a.next();
                            head_b = Some(Op::Retain(j - len, attrs_b));
                        }
                        Ordering::Equal => {
                            out.push(Op::Insert(content, attrs));
                            head_a = ops_a.next();
                            head_b = ops_b.next();
                        }
                        Ordering::Greater => {
                            let (front, rest) = content.split_front(j);
                            out.push(Op::Insert(front, attrs));
                            head_a = Some(Op::Insert(rest, attrs_a));
                            head_b = ops_b.next();
                        }
                    }
                }
                (Some(Op::Insert(content, attrs_a)), Some(Op::Delete(j))) => {
                    // Content inserted by the first delta and deleted by the
                    // second cancels out entirely.
                    let len = content.unit_len();
                    match len.cmp(&j) {
                        Ordering::Less => {
                            head_a = ops_a.next();
                            head_b = Some(Op::Delete(j - len));
                        }
                        Ordering::Equal => {
                            head_a = ops_a.next();
                            head_b = ops_b.next();
                        }
                        Ordering::Greater => {
                            let (_, rest) = content.split_front(j);
                            head_a = Some(Op::Insert(rest, attrs_a));
                            head_b = ops_b.next();
                        }
                    }
                }
                (Some(Op::Retain(i, attrs_a)), Some(Op::Delete(j))) => match i.cmp(&j) {
                    Ordering::Less => {
                        out.push(Op::Delete(i));
                        head_a = ops_a.next();
                        head_b = Some(Op::Delete(j - i));
                    }
                    Ordering::Equal => {
                        out.push(Op::Delete(j));
                        head_a = ops_a.next();
                        head_b = ops_b.next();
                    }
                    Ordering::Greater => {
                        out.push(Op::Delete(j));
                        head_a = Some(Op::Retain(i - j, attrs_a));
                        head_b = ops_b.next();
                    }
                },
            }
        }

        out.chop()
    }

    /// Map an index on this delta's base content to where it lands after
    /// the delta applies.
    ///
    /// Inserts before the index shift it forward; an insert exactly at the
    /// index is the tie `affinity` breaks. Deletes shift it backward by
    /// however much of the gap they removed. Pure, order-independent, and
    /// the identity for an empty delta.
    pub fn transform_index(&self, index: usize, affinity: Affinity) -> usize {
        let mut index = index;
        let mut offset = 0;
        for op in &self.ops {
            if offset > index {
                break;
            }
            match op {
                Op::Delete(units) => {
                    index -= (*units).min(index - offset);
                }
                Op::Insert(content, _) => {
                    let len = content.unit_len();
                    if offset < index || affinity == Affinity::After {
                        index += len;
                    }
                    offset += len;
                }
                Op::Retain(units, _) => {
                    offset += units;
                }
            }
        }
        index
    }
}

impl FromIterator<Op> for Delta {
    fn from_iter<I: IntoIterator<Item = Op>>(iter: I) -> Self {
        let mut delta = Delta::new();
        for op in iter {
            delta.push(op);
        }
        delta
    }
}

/// Deserializing rebuilds the delta through [`push`](Delta::push), so wire
/// input carries the builder's normalization: empty operations dropped,
/// adjacent compatible operations merged.
impl<'de> Deserialize<'de> for Delta {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        #[derive(Deserialize)]
        struct Raw {
            ops: Vec<Op>,
        }
        Ok(Raw::deserialize(deserializer)?.ops.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn bold() -> Attributes {
        Attributes::from_iter([("bold", json!(true))])
    }

    #[test]
    fn test_builder_merges_adjacent_ops() {
        let delta = Delta::new().insert("ab").insert("cd").retain(2).retain(3);
        assert_eq!(delta.ops(), &[Op::insert("abcd"), Op::retain(5)]);
    }

    #[test]
    fn test_builder_drops_empty_ops() {
        let delta = Delta::new().retain(0).insert("").delete(0);
        assert!(delta.is_empty());
    }

    #[test]
    fn test_deserialize_renormalizes_wire_ops() {
        // A hand-assembled payload no builder would produce: mergeable
        // retains and an empty insert.
        let wire = json!({
            "ops": [
                serde_json::to_value(Op::retain(1)).unwrap(),
                serde_json::to_value(Op::retain(2)).unwrap(),
                serde_json::to_value(Op::insert("")).unwrap(),
            ]
        });
        let delta: Delta = serde_json::from_value(wire).unwrap();
        assert_eq!(delta.ops(), &[Op::retain(3)]);
    }

    #[test]
    fn test_insert_goes_before_trailing_delete() {
        let delta = Delta::new().retain(1).delete(2).insert("x");
        assert_eq!(
            delta.ops(),
            &[Op::retain(1), Op::insert("x"), Op::delete(2)]
        );
    }

    #[test]
    fn test_insert_before_delete_merges_with_prior_insert() {
        let delta = Delta::new().insert("a").delete(2).insert("b");
        assert_eq!(delta.ops(), &[Op::insert("ab"), Op::delete(2)]);
    }

    #[test]
    fn test_retains_with_different_attrs_stay_apart() {
        let delta = Delta::new().retain_attr(2, bold()).retain(3);
        assert_eq!(
            delta.ops(),
            &[Op::retain_attr(2, bold()), Op::retain(3)]
        );
    }

    #[test]
    fn test_chop_drops_plain_trailing_retain_only() {
        let delta = Delta::new().insert("a").retain(3).chop();
        assert_eq!(delta.ops(), &[Op::insert("a")]);

        let delta = Delta::new().insert("a").retain_attr(3, bold()).chop();
        assert_eq!(
            delta.ops(),
            &[Op::insert("a"), Op::retain_attr(3, bold())]
        );
    }

    #[test]
    fn test_lengths() {
        let delta = Delta::new().retain(3).insert("ab").delete(4);
        assert_eq!(delta.base_len(), 7);
        assert_eq!(delta.target_len(), 5);
    }

    #[test]
    fn test_is_identity() {
        assert!(Delta::new().is_identity());
        assert!(Delta::new().retain(5).is_identity());
        assert!(!Delta::new().retain_attr(5, bold()).is_identity());
        assert!(!Delta::new().insert("a").is_identity());
    }

    #[test]
    fn test_compose_retain_formats_insert() {
        let first = Delta::new().insert("ab");
        let second = Delta::new().retain_attr(2, bold());
        assert_eq!(
            first.compose(&second).ops(),
            &[Op::insert_attr("ab", bold())]
        );
    }

    #[test]
    fn test_compose_removal_marker_resolves_over_insert() {
        let removal = Attributes::from_iter([("bold", serde_json::Value::Null)]);
        let first = Delta::new().insert_attr("ab", bold());
        let second = Delta::new().retain_attr(2, removal);
        assert_eq!(first.compose(&second).ops(), &[Op::insert("ab")]);
    }

    #[test]
    fn test_compose_removal_marker_survives_over_retain() {
        let removal = Attributes::from_iter([("bold", serde_json::Value::Null)]);
        let first = Delta::new().retain(2);
        let second = Delta::new().retain_attr(2, removal.clone());
        assert_eq!(
            first.compose(&second).ops(),
            &[Op::retain_attr(2, removal)]
        );
    }

    #[test]
    fn test_compose_insert_then_delete_cancels() {
        let first = Delta::new().insert("abc");
        let second = Delta::new().delete(3);
        assert!(first.compose(&second).is_empty());

        let partial = Delta::new().delete(2);
        assert_eq!(
            first.compose(&partial).ops(),
            &[Op::insert("c")]
        );
    }

    #[test]
    fn test_compose_splits_across_boundaries() {
        // The first delta fragments what the second delta spans in one op.
        let first = Delta::new().insert("He").insert_attr("llo", bold());
        let second = Delta::new().retain(1).delete(3).insert("i");
        let composed = first.compose(&second);
        assert_eq!(
            composed.ops(),
            &[Op::insert("Hi"), Op::insert_attr("o", bold())]
        );
    }

    #[test]
    fn test_compose_passes_unmatched_tail_through() {
        let first = Delta::new().retain(2);
        let second = Delta::new().retain(1).insert("x").retain(4);
        let composed = first.compose(&second);
        assert_eq!(composed.ops(), &[Op::retain(1), Op::insert("x")]);
    }

    #[test]
    fn test_compose_delete_then_insert_at_same_spot() {
        let first = Delta::new().delete(1);
        let second = Delta::new().insert("x");
        assert_eq!(
            first.compose(&second).ops(),
            &[Op::insert("x"), Op::delete(1)]
        );
    }

    #[test]
    fn test_transform_index_empty_delta_is_identity() {
        let empty = Delta::new();
        for index in [0, 1, 5, 100] {
            assert_eq!(empty.transform_index(index, Affinity::Before), index);
            assert_eq!(empty.transform_index(index, Affinity::After), index);
        }
    }

    #[test]
    fn test_transform_index_insert_tie_break() {
        // Insert of length 2 at position 4.
        let delta = Delta::new().retain(4).insert("!!");
        assert_eq!(delta.transform_index(4, Affinity::Before), 4);
        assert_eq!(delta.transform_index(4, Affinity::After), 6);
        // Strictly before or after the insertion point, affinity is moot.
        assert_eq!(delta.transform_index(0, Affinity::After), 0);
        assert_eq!(delta.transform_index(5, Affinity::Before), 7);
    }

    #[test]
    fn test_transform_index_through_deletes() {
        let delta = Delta::new().retain(4).delete(4).retain(4);
        assert_eq!(delta.transform_index(4, Affinity::Before), 4);
        assert_eq!(delta.transform_index(5, Affinity::Before), 4);
        assert_eq!(delta.transform_index(8, Affinity::After), 4);
        assert_eq!(delta.transform_index(10, Affinity::Before), 6);
    }

    #[test]
    fn test_transform_index_embed_counts_one_unit() {
        let delta = Delta::new()
            .retain(2)
            .insert_embed(Embed::new("image", json!({"src": "a.png"})));
        assert_eq!(delta.transform_index(2, Affinity::After), 3);
        assert_eq!(delta.transform_index(2, Affinity::Before), 2);
    }
}
