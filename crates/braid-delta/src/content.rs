//! Document content as an insert-only delta.

use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

use crate::delta::Delta;
use crate::error::DeltaError;
use crate::op::Op;

/// Stand-in character for one embed when content is flattened to a string.
///
/// U+FFFC OBJECT REPLACEMENT CHARACTER, the same placeholder text layout
/// systems use. One embed is one unit, so flattened strings keep the unit
/// arithmetic of the content they came from.
pub const EMBED_UNIT: char = '\u{FFFC}';

/// A document: a delta holding nothing but inserts.
///
/// All of the change algebra applies, with the extra guarantee that every
/// operation carries content. [`Content::apply`] keeps the guarantee while
/// running an arbitrary delta against the document. Deserializing goes
/// through [`Content::from_delta`], so a wire payload that retains or
/// deletes is rejected rather than wrapped.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Delta")]
pub struct Content(Delta);

impl Content {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_text(text: impl Into<SmolStr>) -> Self {
        Self(Delta::new().insert(text))
    }

    /// Wrap a delta as content, failing on the first operation that is not
    /// an insert.
    pub fn from_delta(delta: Delta) -> Result<Self, DeltaError> {
        if let Some(index) = delta
            .ops()
            .iter()
            .position(|op| !matches!(op, Op::Insert(..)))
        {
            return Err(DeltaError::NotContent { index });
        }
        Ok(Self(delta))
    }

    /// Wrap a delta as content, dropping any operation that is not an
    /// insert.
    pub fn from_delta_lossy(delta: Delta) -> Self {
        let mut out = Delta::with_capacity(delta.ops().len());
        for op in delta.into_ops() {
            if matches!(op, Op::Insert(..)) {
                out.push(op);
            }
        }
        Self(out)
    }

    pub fn as_delta(&self) -> &Delta {
        &self.0
    }

    pub fn into_delta(self) -> Delta {
        self.0
    }

    pub fn ops(&self) -> &[Op] {
        self.0.ops()
    }

    /// Length in content units: characters for text, one per embed.
    pub fn len(&self) -> usize {
        self.0.target_len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The document flattened to a string, embeds rendered as
    /// [`EMBED_UNIT`]. `plain_text().chars().count()` equals [`len`].
    ///
    /// [`len`]: Content::len
    pub fn plain_text(&self) -> String {
        let mut out = String::new();
        for op in self.ops() {
            if let Op::Insert(content, _) = op {
                match content {
                    crate::op::InsertContent::Text(text) => out.push_str(text),
                    crate::op::InsertContent::Embed(_) => out.push(EMBED_UNIT),
                }
            }
        }
        out
    }

    /// Run a change against this document and return the updated document.
    ///
    /// The change is expected to fit: its base length must not exceed the
    /// document length. Content past the change's reach is kept as is.
    pub fn apply(&self, delta: &Delta) -> Content {
        debug_assert!(
            delta.base_len() <= self.len(),
            "change covers {} units but content holds {}",
            delta.base_len(),
            self.len(),
        );
        Self::from_delta_lossy(self.0.compose(delta))
    }
}

impl TryFrom<Delta> for Content {
    type Error = DeltaError;

    fn try_from(delta: Delta) -> Result<Self, Self::Error> {
        Self::from_delta(delta)
    }
}
