//! Content schema: which embeds and attributes a document admits.

use braid_delta::{Delta, Embed, InsertContent, Op};

/// Admission policy for document content.
///
/// The controller checks every reconciled change against the schema before
/// submitting it; one disallowed operation rejects the change as a unit and
/// the surface snaps back to canonical content.
pub trait Schema {
    fn is_embed_allowed(&self, embed: &Embed) -> bool;

    /// Whether `name` may appear as a block-level attribute.
    fn is_block_attribute_allowed(&self, name: &str) -> bool;

    /// Whether `name` may appear as an inline markup attribute.
    fn is_markup_attribute_allowed(&self, name: &str) -> bool;

    /// Whether every operation in `change` is admissible.
    ///
    /// An attribute passes if either attribute check admits it. Removal
    /// markers (null values) always pass; stripping formatting cannot
    /// violate a schema.
    fn validate(&self, change: &Delta) -> bool {
        change.ops().iter().all(|op| {
            let attrs = match op {
                Op::Insert(InsertContent::Embed(embed), attrs) => {
                    if !self.is_embed_allowed(embed) {
                        return false;
                    }
                    attrs.as_ref()
                }
                Op::Insert(_, attrs) | Op::Retain(_, attrs) => attrs.as_ref(),
                Op::Delete(_) => None,
            };
            attrs.is_none_or(|attrs| {
                attrs.iter().all(|(name, value)| {
                    value.is_null()
                        || self.is_block_attribute_allowed(name)
                        || self.is_markup_attribute_allowed(name)
                })
            })
        })
    }
}

/// Admits everything. The default schema.
#[derive(Clone, Copy, Debug, Default)]
pub struct Permissive;

impl Schema for Permissive {
    fn is_embed_allowed(&self, _embed: &Embed) -> bool {
        true
    }

    fn is_block_attribute_allowed(&self, _name: &str) -> bool {
        true
    }

    fn is_markup_attribute_allowed(&self, _name: &str) -> bool {
        true
    }
}
