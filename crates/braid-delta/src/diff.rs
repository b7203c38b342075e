//! Diffing: change deltas between two documents, and between plain strings.

use similar::{DiffOp, TextDiff};
use smol_str::SmolStr;

use crate::attributes::Attributes;
use crate::content::Content;
use crate::delta::Delta;
use crate::op::{byte_of_char, InsertContent, Op};

impl Content {
    /// The change that turns this document into `other`:
    /// `self.apply(&self.diff(other)) == *other`.
    ///
    /// Runs a character diff over the flattened documents, then walks the
    /// matched regions to recover attributes and embeds. Text that only
    /// changed formatting comes out as an attributed retain. Embeds flatten
    /// to the same placeholder character, so matched positions are checked
    /// by value; an embed replaced by a different one diffs as insert plus
    /// delete.
    pub fn diff(&self, other: &Content) -> Delta {
        if self == other {
            return Delta::new();
        }

        let old_text = self.plain_text();
        let new_text = other.plain_text();
        let diff = TextDiff::from_chars(old_text.as_str(), new_text.as_str());

        let mut old_cursor = InsertCursor::new(self);
        let mut new_cursor = InsertCursor::new(other);
        let mut out = Delta::new();

        for op in diff.ops() {
            match *op {
                DiffOp::Equal { len, .. } => {
                    retain_matched(&mut out, &mut old_cursor, &mut new_cursor, len);
                }
                DiffOp::Delete { old_len, .. } => {
                    old_cursor.skip(old_len);
                    out.push(Op::delete(old_len));
                }
                DiffOp::Insert { new_len, .. } => {
                    insert_from(&mut out, &mut new_cursor, new_len);
                }
                DiffOp::Replace {
                    old_len, new_len, ..
                } => {
                    old_cursor.skip(old_len);
                    out.push(Op::delete(old_len));
                    insert_from(&mut out, &mut new_cursor, new_len);
                }
            }
        }

        out.chop()
    }
}

fn retain_matched(
    out: &mut Delta,
    old: &mut InsertCursor<'_>,
    new: &mut InsertCursor<'_>,
    mut units: usize,
) {
    while units > 0 {
        let take = units.min(old.peek_len()).min(new.peek_len());
        let (old_chunk, old_attrs) = old.take(take);
        let (new_chunk, new_attrs) = new.take(take);
        if old_chunk == new_chunk {
            out.push(Op::Retain(take, Attributes::diff_opt(old_attrs, new_attrs)));
        } else {
            out.push(Op::Insert(new_chunk, new_attrs.cloned()));
            out.push(Op::delete(take));
        }
        units -= take;
    }
}

fn insert_from(out: &mut Delta, cursor: &mut InsertCursor<'_>, mut units: usize) {
    while units > 0 {
        let take = units.min(cursor.peek_len());
        let (chunk, attrs) = cursor.take(take);
        out.push(Op::Insert(chunk, attrs.cloned()));
        units -= take;
    }
}

/// Diff two plain strings into a change delta, folding characters before
/// comparison.
///
/// `fold` maps each character on both sides before they are compared, so
/// presentation-only substitutions (a nonbreaking space standing in for a
/// space, say) do not register as changes. Inserted runs are taken from
/// `new` unfolded and carry `attrs`. Two strings that fold to the same
/// sequence diff to an empty delta.
pub fn text_diff_with(
    old: &str,
    new: &str,
    attrs: Option<&Attributes>,
    fold: impl Fn(char) -> char,
) -> Delta {
    let attrs = attrs.filter(|attrs| !attrs.is_empty());
    let folded_old: String = old.chars().map(&fold).collect();
    let folded_new: String = new.chars().map(&fold).collect();
    let diff = TextDiff::from_chars(folded_old.as_str(), folded_new.as_str());

    let mut out = Delta::new();
    for op in diff.ops() {
        match *op {
            DiffOp::Equal { len, .. } => out.push(Op::retain(len)),
            DiffOp::Delete { old_len, .. } => out.push(Op::delete(old_len)),
            DiffOp::Insert {
                new_index, new_len, ..
            } => push_raw(&mut out, new, new_index, new_len, attrs),
            DiffOp::Replace {
                old_len,
                new_index,
                new_len,
                ..
            } => {
                out.push(Op::delete(old_len));
                push_raw(&mut out, new, new_index, new_len, attrs);
            }
        }
    }
    out.chop()
}

fn push_raw(out: &mut Delta, new: &str, index: usize, units: usize, attrs: Option<&Attributes>) {
    let start = byte_of_char(new, index);
    let end = byte_of_char(new, index + units);
    out.push(Op::Insert(
        InsertContent::Text(SmolStr::from(&new[start..end])),
        attrs.cloned(),
    ));
}

/// Walks a document's inserts in unit-sized steps.
struct InsertCursor<'a> {
    ops: &'a [Op],
    next: usize,
    consumed: usize,
}

impl<'a> InsertCursor<'a> {
    fn new(content: &'a Content) -> Self {
        Self {
            ops: content.ops(),
            next: 0,
            consumed: 0,
        }
    }

    /// Units left in the operation under the cursor, zero at the end.
    fn peek_len(&self) -> usize {
        match self.ops.get(self.next) {
            Some(op) => op.len() - self.consumed,
            None => 0,
        }
    }

    /// Take `units` from the operation under the cursor. Never crosses an
    /// operation boundary; callers clamp to [`peek_len`](Self::peek_len).
    fn take(&mut self, units: usize) -> (InsertContent, Option<&'a Attributes>) {
        let (content, attrs) = match &self.ops[self.next] {
            Op::Insert(content, attrs) => (content, attrs.as_ref()),
            _ => unreachable!("document content holds inserts only"),
        };
        let remaining = content.unit_len() - self.consumed;
        debug_assert!(units > 0 && units <= remaining);

        let chunk = match content {
            InsertContent::Text(text) => {
                let start = byte_of_char(text, self.consumed);
                let end = byte_of_char(text, self.consumed + units);
                InsertContent::Text(SmolStr::from(&text[start..end]))
            }
            InsertContent::Embed(embed) => InsertContent::Embed(embed.clone()),
        };

        if units == remaining {
            self.next += 1;
            self.consumed = 0;
        } else {
            self.consumed += units;
        }
        (chunk, attrs)
    }

    fn skip(&mut self, mut units: usize) {
        while units > 0 {
            let remaining = self.peek_len();
            debug_assert!(remaining > 0);
            if units < remaining {
                self.consumed += units;
                return;
            }
            units -= remaining;
            self.next += 1;
            self.consumed = 0;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::op::Embed;
    use serde_json::json;

    fn bold() -> Attributes {
        Attributes::from_iter([("bold", json!(true))])
    }

    #[test]
    fn test_diff_equal_documents_is_empty() {
        let content = Content::from_text("same");
        assert!(content.diff(&content.clone()).is_empty());
    }

    #[test]
    fn test_diff_append() {
        let old = Content::from_text("Hello");
        let new = Content::from_text("Hello!");
        assert_eq!(
            old.diff(&new).ops(),
            &[Op::retain(5), Op::insert("!")]
        );
    }

    #[test]
    fn test_diff_delete_word() {
        let old = Content::from_text("Hello World");
        let new = Content::from_text("Hello ");
        assert_eq!(old.diff(&new).ops(), &[Op::retain(6), Op::delete(5)]);
    }

    #[test]
    fn test_diff_attribute_only_change() {
        let old = Content::from_text("Hello");
        let new = Content::from_delta(
            Delta::new().insert("He").insert_attr("llo", bold()),
        )
        .unwrap();
        assert_eq!(
            old.diff(&new).ops(),
            &[Op::retain(2), Op::retain_attr(3, bold())]
        );
    }

    #[test]
    fn test_diff_attribute_removal_marks_null() {
        let old = Content::from_delta(Delta::new().insert_attr("hi", bold())).unwrap();
        let new = Content::from_text("hi");
        let removal = Attributes::from_iter([("bold", serde_json::Value::Null)]);
        assert_eq!(old.diff(&new).ops(), &[Op::retain_attr(2, removal)]);
    }

    #[test]
    fn test_diff_embeds_compare_by_value() {
        let image = |src: &str| Embed::new("image", json!({ "src": src }));
        let old = Content::from_delta(
            Delta::new().insert("ab").insert_embed(image("a.png")),
        )
        .unwrap();
        let same = Content::from_delta(
            Delta::new().insert("ab").insert_embed(image("a.png")),
        )
        .unwrap();
        let swapped = Content::from_delta(
            Delta::new().insert("ab").insert_embed(image("b.png")),
        )
        .unwrap();

        assert!(old.diff(&same).is_empty());
        assert_eq!(
            old.diff(&swapped).ops(),
            &[
                Op::retain(2),
                Op::embed(image("b.png")),
                Op::delete(1),
            ]
        );
    }

    #[test]
    fn test_diff_embed_attribute_change_retains() {
        let image = Embed::new("image", json!({ "src": "a.png" }));
        let old = Content::from_delta(Delta::new().insert_embed(image.clone())).unwrap();
        let new = Content::from_delta(
            Delta::new().insert_embed_attr(image, bold()),
        )
        .unwrap();
        assert_eq!(old.diff(&new).ops(), &[Op::retain_attr(1, bold())]);
    }

    #[test]
    fn test_diff_applies_back() {
        let pairs = [
            ("café au lait", "café table"),
            ("one two three", "two three four"),
            ("", "fresh"),
        ];
        for (old, new) in pairs {
            let old = Content::from_text(old);
            let new = Content::from_text(new);
            assert_eq!(old.apply(&old.diff(&new)), new);
        }
    }

    #[test]
    fn test_text_diff_appends() {
        let delta = text_diff_with("Hello", "Hello!", None, |c| c);
        assert_eq!(delta.ops(), &[Op::retain(5), Op::insert("!")]);
    }

    #[test]
    fn test_text_diff_inserts_carry_attrs() {
        let delta = text_diff_with("Hi", "Hi!", Some(&bold()), |c| c);
        assert_eq!(
            delta.ops(),
            &[Op::retain(2), Op::insert_attr("!", bold())]
        );
    }

    #[test]
    fn test_text_diff_fold_only_difference_is_empty() {
        let fold = |c: char| if c == '\u{a0}' { ' ' } else { c };
        assert!(text_diff_with("a\u{a0}b", "a b", None, fold).is_empty());
    }

    #[test]
    fn test_text_diff_emits_unfolded_text() {
        let fold = |c: char| if c == '\u{a0}' { ' ' } else { c };
        let delta = text_diff_with("ab", "a\u{a0}b", None, fold);
        assert_eq!(delta.ops(), &[Op::retain(1), Op::insert("\u{a0}")]);
    }

    #[test]
    fn test_text_diff_replacement() {
        let delta = text_diff_with("the cat", "the dog", None, |c| c);
        assert_eq!(
            delta.ops(),
            &[Op::retain(4), Op::insert("dog"), Op::delete(3)]
        );
    }
}
