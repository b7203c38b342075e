//! The decoration layer: presentation changes composed over canonical
//! content, with the reverse map back.

use braid_delta::{Content, Delta, Op};
use tracing::debug;

use crate::host::DocumentHost;

/// One update cycle's decoration state.
///
/// `decoration` maps canonical content to what the surface shows;
/// `reverse` maps shown content back. Both are recomputed from the host's
/// contributors every cycle and never persist across one, so a contributor
/// is free to decorate differently each time.
///
/// When nothing decorates, all three parts are guaranteed trivial: empty
/// deltas and a composed document equal to canonical. Reconciliation leans
/// on that to skip mapping entirely.
#[derive(Clone, Debug, Default)]
pub struct Decorations {
    decoration: Delta,
    reverse: Delta,
    composed: Content,
}

impl Decorations {
    /// Collect the host's contributors over `canonical` and build the
    /// cycle's decoration state.
    pub fn compute<H: DocumentHost + ?Sized>(host: &H, canonical: &Content) -> Self {
        Self::from_delta(canonical, host.decorations(canonical))
    }

    /// Build decoration state from an already-collected decoration delta.
    ///
    /// An identity delta (empty, or nothing but plain retains) normalizes
    /// to the trivial state. Decorations only add: attribute retains and
    /// inserts. Deletes would make shown content unrecoverable and are a
    /// contributor bug.
    pub fn from_delta(canonical: &Content, decoration: Delta) -> Self {
        if decoration.is_identity() {
            return Self {
                decoration: Delta::new(),
                reverse: Delta::new(),
                composed: canonical.clone(),
            };
        }
        debug_assert!(
            !decoration.ops().iter().any(|op| matches!(op, Op::Delete(_))),
            "decoration deltas must not delete content",
        );

        let composed = canonical.apply(&decoration);
        let reverse = composed.diff(canonical);
        debug!(
            target: "braid::decorations",
            decoration_ops = decoration.ops().len(),
            canonical_len = canonical.len(),
            composed_len = composed.len(),
            "decorations computed"
        );
        Self {
            decoration,
            reverse,
            composed,
        }
    }

    /// Canonical-to-shown delta.
    pub fn decoration(&self) -> &Delta {
        &self.decoration
    }

    /// Shown-to-canonical delta.
    pub fn reverse(&self) -> &Delta {
        &self.reverse
    }

    /// The content the surface should be showing.
    pub fn composed(&self) -> &Content {
        &self.composed
    }

    /// Whether this cycle carries no decorations at all.
    pub fn is_identity(&self) -> bool {
        self.decoration.is_empty()
    }
}
