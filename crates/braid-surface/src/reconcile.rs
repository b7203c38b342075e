//! Turning observed surface mutations back into canonical-coordinate
//! changes.

use std::collections::BTreeSet;

use braid_delta::{text_diff_with, Affinity, Attributes, Content, Delta, InsertContent, Op};
use tracing::debug;

use crate::decorations::Decorations;
use crate::error::ReconcileError;
use crate::surface::{MutationKind, NodeId, Surface, SurfaceMutation};

/// What reconciling one mutation batch concluded.
#[derive(Clone, Debug, PartialEq)]
pub enum Reconciled {
    /// The surface only differs from rendered content in presentation;
    /// nothing to submit.
    Clean,
    /// The user changed content. The delta is in canonical coordinates,
    /// decorations already stripped.
    Change(Delta),
}

/// Everything one reconciliation pass reads, borrowed from the controller
/// for the duration of the batch.
pub struct ReconcileContext<'a, S: Surface + ?Sized> {
    pub surface: &'a S,
    pub decorations: &'a Decorations,
    /// Canonical content as of the last render.
    pub canonical: &'a Content,
    /// Formatting pending for the next typed text.
    pub active_attributes: Option<&'a Attributes>,
    /// Skip the fast paths and diff the whole surface, set after a batch
    /// that failed to reconcile.
    pub force_full: bool,
}

/// Reconcile a batch of observed mutations.
///
/// Two single-mutation shapes are handled by diffing just the touched
/// node: an edit inside one text node, and one added text node. Everything
/// else reads the whole surface back, strips decorations through the
/// reverse delta, and diffs against canonical content. Either way the
/// result is canonical-coordinate, or `Clean` when the surface turns out
/// to agree with what was rendered.
pub fn reconcile<S: Surface + ?Sized>(
    batch: Vec<SurfaceMutation>,
    ctx: &ReconcileContext<'_, S>,
) -> Result<Reconciled, ReconcileError> {
    let batch = dedup(batch);
    let plan = classify(&batch, ctx);
    debug!(
        target: "braid::reconcile",
        mutations = batch.len(),
        plan = plan.name(),
        force_full = ctx.force_full,
        "reconciling batch"
    );

    let change = match plan {
        Plan::Text(mutation) => text_change(mutation, ctx)?,
        Plan::NodeAdded(node) => node_added(node, ctx)?,
        Plan::Full => full_diff(ctx),
    };

    if change.is_identity() {
        Ok(Reconciled::Clean)
    } else {
        Ok(Reconciled::Change(change))
    }
}

/// Collapse repeated records for one node to the first.
///
/// The first record's `previous_text` is the oldest, so the surviving
/// record spans every change the batch saw on that node.
fn dedup(batch: Vec<SurfaceMutation>) -> Vec<SurfaceMutation> {
    let mut seen = BTreeSet::new();
    let mut out = Vec::with_capacity(batch.len());
    for mutation in batch {
        if seen.insert(mutation.target) {
            out.push(mutation);
        }
    }
    out
}

enum Plan<'a> {
    Text(&'a SurfaceMutation),
    NodeAdded(NodeId),
    Full,
}

impl Plan<'_> {
    fn name(&self) -> &'static str {
        match self {
            Plan::Text(_) => "text",
            Plan::NodeAdded(_) => "node-added",
            Plan::Full => "full",
        }
    }
}

fn classify<'a, S: Surface + ?Sized>(
    batch: &'a [SurfaceMutation],
    ctx: &ReconcileContext<'_, S>,
) -> Plan<'a> {
    if ctx.force_full {
        return Plan::Full;
    }
    match batch {
        [m] if m.kind == MutationKind::Text && m.previous_text.is_some() => Plan::Text(m),
        [m] if m.kind == MutationKind::Structure
            && m.added.len() == 1
            && ctx.surface.node_text(m.added[0]).is_some() =>
        {
            Plan::NodeAdded(m.added[0])
        }
        _ => Plan::Full,
    }
}

/// Fast path: one text node changed its character data.
///
/// Diffs the node's old and new text, then positions the local delta at
/// the node's offset mapped back through the reverse decoration delta.
/// Surfaces keep text runs uniform (a decoration's inserts are styled and
/// live in their own nodes), so the inside of the node needs no mapping.
fn text_change<S: Surface + ?Sized>(
    mutation: &SurfaceMutation,
    ctx: &ReconcileContext<'_, S>,
) -> Result<Delta, ReconcileError> {
    let node = mutation.target;
    let offset = ctx
        .surface
        .node_offset(node)
        .ok_or(ReconcileError::StaleNode(node))?;
    let current = ctx
        .surface
        .node_text(node)
        .ok_or(ReconcileError::MissingText(node))?;
    let previous = mutation.previous_text.as_deref().unwrap_or("");

    let local = text_diff_with(previous, &current, ctx.active_attributes, fold_nbsp);
    if local.is_identity() {
        return Ok(Delta::new());
    }

    let mapped = ctx
        .decorations
        .reverse()
        .transform_index(offset, Affinity::Before);
    let mut change = Delta::new().retain(mapped);
    for op in local.into_ops() {
        change.push(op);
    }
    Ok(change.chop())
}

/// Fast path: one text node appeared.
fn node_added<S: Surface + ?Sized>(
    node: NodeId,
    ctx: &ReconcileContext<'_, S>,
) -> Result<Delta, ReconcileError> {
    let offset = ctx
        .surface
        .node_offset(node)
        .ok_or(ReconcileError::StaleNode(node))?;
    let text = ctx
        .surface
        .node_text(node)
        .ok_or(ReconcileError::MissingText(node))?;
    if text.is_empty() {
        return Ok(Delta::new());
    }

    let mapped = ctx
        .decorations
        .reverse()
        .transform_index(offset, Affinity::Before);
    let attrs = ctx
        .active_attributes
        .filter(|attrs| !attrs.is_empty())
        .cloned();
    let mut change = Delta::new().retain(mapped);
    change.push(Op::Insert(InsertContent::Text(text.into()), attrs));
    Ok(change)
}

/// Slow path: read the whole surface back, strip decorations, diff.
///
/// Stripping composes the observed content with the reverse delta. When
/// an edit shortened the surface past a decoration's reach, the reverse
/// keeps tail operations nothing consumes; they cover exactly the shown
/// content the user removed, so the lossy wrap drops them and what
/// remains is the net document.
fn full_diff<S: Surface + ?Sized>(ctx: &ReconcileContext<'_, S>) -> Delta {
    let observed = ctx.surface.read_content();
    let stripped = if ctx.decorations.is_identity() {
        observed
    } else {
        Content::from_delta_lossy(observed.into_delta().compose(ctx.decorations.reverse()))
    };
    ctx.canonical.diff(&stripped)
}

/// U+00A0. Surfaces swap nonbreaking spaces in for plain spaces to keep
/// whitespace from collapsing; the two compare equal here. Comparison
/// only, reconciled text keeps whatever the surface holds.
fn fold_nbsp(c: char) -> char {
    if c == '\u{a0}' { ' ' } else { c }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plain::MemorySurface;
    use serde_json::json;

    fn context<'a>(
        surface: &'a MemorySurface,
        decorations: &'a Decorations,
        canonical: &'a Content,
    ) -> ReconcileContext<'a, MemorySurface> {
        ReconcileContext {
            surface,
            decorations,
            canonical,
            active_attributes: None,
            force_full: false,
        }
    }

    fn highlight() -> Attributes {
        Attributes::from_iter([("highlight", json!(true))])
    }

    #[test]
    fn test_typing_reconciles_via_text_fast_path() {
        let canonical = Content::from_text("Hello");
        let decorations = Decorations::from_delta(&canonical, Delta::new());
        let mut surface = MemorySurface::new();
        surface.render(decorations.composed(), true);
        surface.start_observing();

        let node = surface.node_ids()[0];
        surface.edit_text(node, "Hello!");

        let batch = surface.take_mutations();
        let result = reconcile(batch, &context(&surface, &decorations, &canonical)).unwrap();
        assert_eq!(
            result,
            Reconciled::Change(Delta::new().retain(5).insert("!"))
        );
    }

    #[test]
    fn test_repeat_edits_collapse_to_oldest_previous_text() {
        let canonical = Content::from_text("Hello");
        let decorations = Decorations::from_delta(&canonical, Delta::new());
        let mut surface = MemorySurface::new();
        surface.render(decorations.composed(), true);
        surface.start_observing();

        let node = surface.node_ids()[0];
        surface.edit_text(node, "Hellooo");
        surface.edit_text(node, "Hello!!");

        let batch = surface.take_mutations();
        assert_eq!(batch.len(), 2);
        let result = reconcile(batch, &context(&surface, &decorations, &canonical)).unwrap();
        assert_eq!(
            result,
            Reconciled::Change(Delta::new().retain(5).insert("!!"))
        );
    }

    #[test]
    fn test_fast_path_maps_offset_through_decorations() {
        let canonical = Content::from_text("see docs");
        let decorations = Decorations::from_delta(
            &canonical,
            Delta::new().retain(4).insert_attr("[link]", highlight()),
        );
        let mut surface = MemorySurface::new();
        surface.render(decorations.composed(), true);
        surface.start_observing();

        // Nodes: "see " / "[link]" / "docs". Edit the run past the
        // decoration.
        let node = surface.node_ids()[2];
        assert_eq!(surface.node_text(node).as_deref(), Some("docs"));
        surface.edit_text(node, "docs!");

        let batch = surface.take_mutations();
        let result = reconcile(batch, &context(&surface, &decorations, &canonical)).unwrap();
        assert_eq!(
            result,
            Reconciled::Change(Delta::new().retain(8).insert("!"))
        );
    }

    #[test]
    fn test_typing_carries_active_attributes() {
        let canonical = Content::from_text("ab");
        let decorations = Decorations::from_delta(&canonical, Delta::new());
        let mut surface = MemorySurface::new();
        surface.render(decorations.composed(), true);
        surface.start_observing();

        let node = surface.node_ids()[0];
        surface.edit_text(node, "abc");

        let bold = Attributes::from_iter([("bold", json!(true))]);
        let batch = surface.take_mutations();
        let mut ctx = context(&surface, &decorations, &canonical);
        ctx.active_attributes = Some(&bold);
        let result = reconcile(batch, &ctx).unwrap();
        assert_eq!(
            result,
            Reconciled::Change(Delta::new().retain(2).insert_attr("c", bold))
        );
    }

    #[test]
    fn test_nbsp_presentation_swap_is_clean() {
        let canonical = Content::from_text("a b");
        let decorations = Decorations::from_delta(&canonical, Delta::new());
        let mut surface = MemorySurface::new();
        surface.render(decorations.composed(), true);
        surface.start_observing();

        let node = surface.node_ids()[0];
        surface.edit_text(node, "a\u{a0}b");

        let batch = surface.take_mutations();
        let result = reconcile(batch, &context(&surface, &decorations, &canonical)).unwrap();
        assert_eq!(result, Reconciled::Clean);
    }

    #[test]
    fn test_added_text_node_fast_path() {
        let canonical = Content::from_text("Hello");
        let decorations = Decorations::from_delta(&canonical, Delta::new());
        let mut surface = MemorySurface::new();
        surface.render(decorations.composed(), true);
        surface.start_observing();

        surface.insert_text_node(" world");

        let batch = surface.take_mutations();
        assert_eq!(batch.len(), 1);
        assert_eq!(batch[0].kind, MutationKind::Structure);
        let result = reconcile(batch, &context(&surface, &decorations, &canonical)).unwrap();
        assert_eq!(
            result,
            Reconciled::Change(Delta::new().retain(5).insert(" world"))
        );
    }

    #[test]
    fn test_full_diff_matches_fast_path() {
        let canonical = Content::from_text("Hello");
        let decorations = Decorations::from_delta(&canonical, Delta::new());
        let mut surface = MemorySurface::new();
        surface.render(decorations.composed(), true);
        surface.start_observing();

        let node = surface.node_ids()[0];
        surface.edit_text(node, "Hello!");
        let batch = surface.take_mutations();

        let fast = reconcile(batch.clone(), &context(&surface, &decorations, &canonical));
        let mut ctx = context(&surface, &decorations, &canonical);
        ctx.force_full = true;
        let full = reconcile(batch, &ctx);
        assert_eq!(fast.unwrap(), full.unwrap());
    }

    #[test]
    fn test_full_diff_strips_decorations() {
        let canonical = Content::from_text("see docs");
        let decorations = Decorations::from_delta(
            &canonical,
            Delta::new().retain(4).insert_attr("[link]", highlight()),
        );
        let mut surface = MemorySurface::new();
        surface.render(decorations.composed(), true);
        surface.start_observing();

        // Edit two runs at once so classification falls back to the full
        // read.
        let nodes = surface.node_ids();
        surface.edit_text(nodes[0], "See ");
        surface.edit_text(nodes[2], "docs!");

        let batch = surface.take_mutations();
        let result = reconcile(batch, &context(&surface, &decorations, &canonical)).unwrap();
        assert_eq!(
            result,
            Reconciled::Change(
                Delta::new().insert("S").delete(1).retain(7).insert("!")
            )
        );
    }

    #[test]
    fn test_full_diff_survives_shortening_past_a_decoration() {
        // Select-all plus Delete with a highlight active: the observed
        // surface is shorter than the reverse delta's base, so the
        // reverse's attributed retain has nothing left to consume.
        let canonical = Content::from_text("Hello");
        let decorations = Decorations::from_delta(
            &canonical,
            Delta::new().retain_attr(2, highlight()),
        );
        let mut surface = MemorySurface::new();
        surface.render(decorations.composed(), true);
        surface.start_observing();

        for node in surface.node_ids() {
            surface.remove_node(node);
        }

        let batch = surface.take_mutations();
        let result = reconcile(batch, &context(&surface, &decorations, &canonical)).unwrap();
        assert_eq!(result, Reconciled::Change(Delta::new().delete(5)));
    }

    #[test]
    fn test_full_diff_survives_deleting_a_decorated_insert() {
        // The user deletes from the badge through the end; the reverse's
        // trailing delete outlives the observed content.
        let canonical = Content::from_text("see docs");
        let decorations = Decorations::from_delta(
            &canonical,
            Delta::new().retain(4).insert_attr("[link]", highlight()),
        );
        let mut surface = MemorySurface::new();
        surface.render(decorations.composed(), true);
        surface.start_observing();

        let nodes = surface.node_ids();
        surface.remove_node(nodes[1]);
        surface.remove_node(nodes[2]);

        let batch = surface.take_mutations();
        let result = reconcile(batch, &context(&surface, &decorations, &canonical)).unwrap();
        assert_eq!(
            result,
            Reconciled::Change(Delta::new().retain(4).delete(4))
        );
    }

    #[test]
    fn test_attribute_echo_reconciles_clean() {
        let canonical = Content::from_text("Hello");
        let decorations = Decorations::from_delta(
            &canonical,
            Delta::new().retain_attr(5, highlight()),
        );
        let mut surface = MemorySurface::new();
        surface.render(decorations.composed(), true);
        surface.start_observing();

        let node = surface.node_ids()[0];
        let batch = vec![SurfaceMutation::attribute(node)];
        let result = reconcile(batch, &context(&surface, &decorations, &canonical)).unwrap();
        assert_eq!(result, Reconciled::Clean);
    }

    #[test]
    fn test_stale_node_is_an_error() {
        let canonical = Content::from_text("Hello");
        let decorations = Decorations::from_delta(&canonical, Delta::new());
        let mut surface = MemorySurface::new();
        surface.render(decorations.composed(), true);

        let batch = vec![SurfaceMutation::text(NodeId(999), "gone")];
        let result = reconcile(batch, &context(&surface, &decorations, &canonical));
        assert_eq!(result, Err(ReconcileError::StaleNode(NodeId(999))));
    }
}
