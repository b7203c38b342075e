//! braid-delta: Operation-based rich text content and changes.
//!
//! This crate provides:
//! - `Delta` - ordered insert/retain/delete runs with a normalizing builder
//! - `Content` - a document as an insert-only delta
//! - Compose, diff, and index transform over both
//! - `Attributes` - formatting maps with null-marker removal semantics

pub mod attributes;
pub mod content;
pub mod delta;
pub mod diff;
pub mod error;
pub mod op;

pub use attributes::Attributes;
pub use content::{Content, EMBED_UNIT};
pub use delta::{Affinity, Delta};
pub use diff::text_diff_with;
pub use error::DeltaError;
pub use op::{Embed, InsertContent, Op};
pub use smol_str::SmolStr;
