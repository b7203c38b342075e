//! The operation sum type deltas are made of.
//!
//! Exactly one of insert/retain/delete is ever populated; working code
//! matches on the variant instead of probing optional fields. Lengths are
//! content units: one unit per character of text, one unit per embedded
//! object.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use smol_str::SmolStr;

use crate::attributes::Attributes;

/// An embedded object occupying exactly one content unit.
///
/// Equality is by value: two embeds are the same when kind and payload
/// match, never by identity.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Embed {
    /// What kind of object this is ("image", "mention", ...).
    pub kind: SmolStr,
    /// Kind-specific payload.
    pub value: Value,
}

impl Embed {
    pub fn new(kind: impl Into<SmolStr>, value: Value) -> Self {
        Self {
            kind: kind.into(),
            value,
        }
    }
}

/// What an insert carries: a text run or a single embedded object.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InsertContent {
    Text(SmolStr),
    Embed(Embed),
}

impl InsertContent {
    /// Content units this insert occupies.
    pub fn unit_len(&self) -> usize {
        match self {
            InsertContent::Text(text) => text.chars().count(),
            InsertContent::Embed(_) => 1,
        }
    }

    /// Split text content after `units`, returning the front and the rest.
    ///
    /// Out-of-range splits return the whole content up front. Embeds are
    /// one indivisible unit, so they always come back whole.
    pub(crate) fn split_front(self, units: usize) -> (InsertContent, InsertContent) {
        match self {
            InsertContent::Text(text) => {
                let boundary = byte_of_char(&text, units);
                (
                    InsertContent::Text(SmolStr::new(&text[..boundary])),
                    InsertContent::Text(SmolStr::new(&text[boundary..])),
                )
            }
            embed @ InsertContent::Embed(_) => (embed, InsertContent::Text(SmolStr::default())),
        }
    }
}

/// Byte offset of the `index`th character, or the string's end.
pub(crate) fn byte_of_char(text: &str, index: usize) -> usize {
    text.char_indices()
        .nth(index)
        .map(|(byte, _)| byte)
        .unwrap_or(text.len())
}

/// One step of a delta.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Op {
    /// Add content, optionally formatted.
    Insert(InsertContent, Option<Attributes>),
    /// Keep existing content; with attributes this is a format-only change,
    /// without it is a no-op skip.
    Retain(usize, Option<Attributes>),
    /// Remove existing content.
    Delete(usize),
}

impl Op {
    pub fn insert(text: impl Into<SmolStr>) -> Self {
        Op::Insert(InsertContent::Text(text.into()), None)
    }

    /// An insert with attributes; an empty set normalizes to none.
    pub fn insert_attr(text: impl Into<SmolStr>, attrs: Attributes) -> Self {
        Op::Insert(InsertContent::Text(text.into()), attrs.into_option())
    }

    pub fn embed(embed: Embed) -> Self {
        Op::Insert(InsertContent::Embed(embed), None)
    }

    pub fn embed_attr(embed: Embed, attrs: Attributes) -> Self {
        Op::Insert(InsertContent::Embed(embed), attrs.into_option())
    }

    pub fn retain(units: usize) -> Self {
        Op::Retain(units, None)
    }

    pub fn retain_attr(units: usize, attrs: Attributes) -> Self {
        Op::Retain(units, attrs.into_option())
    }

    pub fn delete(units: usize) -> Self {
        Op::Delete(units)
    }

    /// Content units this operation covers.
    pub fn len(&self) -> usize {
        match self {
            Op::Insert(content, _) => content.unit_len(),
            Op::Retain(units, _) | Op::Delete(units) => *units,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn attributes(&self) -> Option<&Attributes> {
        match self {
            Op::Insert(_, attrs) | Op::Retain(_, attrs) => attrs.as_ref(),
            Op::Delete(_) => None,
        }
    }
}
