//! The document host: canonical content, decoration intake, change intake.

use braid_delta::{Attributes, Content, Delta};

use crate::types::{Origin, Selection};

/// A decoration contributor.
///
/// Receives canonical content and the decoration delta accumulated by the
/// contributors before it, and returns the delta with its own presentation
/// changes composed on. Contributors must only add: attribute retains and
/// inserts, never deletes.
///
/// Implemented for plain closures, so hosts can register
/// `|content, delta| ...` directly.
pub trait Decorate {
    fn decorate(&self, content: &Content, delta: Delta) -> Delta;
}

impl<F> Decorate for F
where
    F: Fn(&Content, Delta) -> Delta,
{
    fn decorate(&self, content: &Content, delta: Delta) -> Delta {
        self(content, delta)
    }
}

/// The document side of the editing loop: owns canonical content, collects
/// decorations, and accepts reconciled changes.
///
/// Delivery in the other direction (content or selection changed under the
/// controller) is wired by the embedding, which calls
/// [`ViewController::document_changed`] and
/// [`ViewController::document_selection_changed`] when its host announces.
///
/// [`ViewController::document_changed`]: crate::controller::ViewController::document_changed
/// [`ViewController::document_selection_changed`]: crate::controller::ViewController::document_selection_changed
pub trait DocumentHost {
    /// Current canonical content.
    fn content(&self) -> Content;

    /// Fold every registered decoration contributor over `content` and
    /// return the combined decoration delta. Identity when nothing
    /// decorates.
    fn decorations(&self, content: &Content) -> Delta;

    /// Accept a change against canonical content. `prior_selection` is the
    /// logical selection captured before the change was reconciled, so the
    /// host can restore or adjust the cursor consistently with the change.
    fn submit(&mut self, change: Delta, origin: Origin, prior_selection: Option<Selection>);

    /// Current logical selection, in canonical content units.
    fn selection(&self) -> Option<Selection>;

    /// Update the logical selection without a content change.
    fn set_selection(&mut self, selection: Option<Selection>, origin: Origin);

    /// Formatting that should apply to the next typed text, if any is
    /// pending (a toggled-on style with a collapsed selection).
    fn active_attributes(&self) -> Option<Attributes>;
}
