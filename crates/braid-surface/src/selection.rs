//! Mapping selections between logical (canonical) and surface (decorated)
//! coordinates.

use braid_delta::Affinity;

use crate::decorations::Decorations;
use crate::types::Selection;

/// Map a logical selection to surface coordinates.
///
/// Anchor and head map independently, each with [`Affinity::Before`]: a
/// caret sitting exactly where a decoration inserts stays in front of the
/// inserted run, so decorations never push the caret around.
pub fn to_surface(selection: Selection, decorations: &Decorations) -> Selection {
    map(selection, decorations.decoration())
}

/// Map a surface selection back to logical coordinates.
///
/// A caret inside decoration-inserted content snaps to the logical
/// position the decoration occupies.
pub fn to_logical(selection: Selection, decorations: &Decorations) -> Selection {
    map(selection, decorations.reverse())
}

fn map(selection: Selection, delta: &braid_delta::Delta) -> Selection {
    if delta.is_empty() {
        return selection;
    }
    Selection::new(
        delta.transform_index(selection.anchor, Affinity::Before),
        delta.transform_index(selection.head, Affinity::Before),
    )
}
