//! The rendering surface: what the controller draws into and observes.

use braid_delta::{Content, SmolStr};

use crate::types::Selection;

/// Identity of one node in the surface's content tree.
///
/// Identities are assigned by the surface and stay stable for the lifetime
/// of the node. A render may replace nodes wholesale, so an id captured
/// before a render can be gone after it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(pub u64);

impl NodeId {
    /// The surface root. Mutations that cannot be pinned to a finer-grained
    /// node report against the root.
    pub const ROOT: NodeId = NodeId(0);
}

/// What kind of change a mutation record describes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MutationKind {
    /// Character data inside one text node changed.
    Text,
    /// Children were added to or removed from the target node.
    Structure,
    /// A presentation attribute changed on the target node.
    Attribute,
}

/// One observed change to the surface tree, reported in document order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SurfaceMutation {
    /// The node the change happened on (for text mutations, the text node
    /// itself; for structure mutations, the parent).
    pub target: NodeId,
    pub kind: MutationKind,
    /// Nodes added under the target, for structure mutations.
    pub added: Vec<NodeId>,
    /// Character data before the change, for text mutations.
    pub previous_text: Option<SmolStr>,
}

impl SurfaceMutation {
    pub fn text(target: NodeId, previous_text: impl Into<SmolStr>) -> Self {
        Self {
            target,
            kind: MutationKind::Text,
            added: Vec::new(),
            previous_text: Some(previous_text.into()),
        }
    }

    pub fn structure(target: NodeId, added: Vec<NodeId>) -> Self {
        Self {
            target,
            kind: MutationKind::Structure,
            added,
            previous_text: None,
        }
    }

    pub fn attribute(target: NodeId) -> Self {
        Self {
            target,
            kind: MutationKind::Attribute,
            added: Vec::new(),
            previous_text: None,
        }
    }
}

/// A rendering surface the controller writes to, reads back, and observes.
///
/// The controller is the only writer while it runs; the surface's own user
/// (keyboard, pointer, IME) is the other. Mutation observation is how the
/// second writer's work reaches the controller.
pub trait Surface {
    // === Rendering ===

    /// Replace the rendered tree with `content`. `enabled` conveys whether
    /// the surface should accept user input.
    fn render(&mut self, content: &Content, enabled: bool);

    /// Read the currently rendered tree back as content, decorations and
    /// user edits included.
    fn read_content(&self) -> Content;

    // === Addressing ===

    /// Content-unit offset of the start of `node` within the rendered tree,
    /// or `None` if the surface no longer knows the node.
    fn node_offset(&self, node: NodeId) -> Option<usize>;

    /// Current character data of `node`, or `None` if it is not a text node
    /// the surface knows.
    fn node_text(&self, node: NodeId) -> Option<String>;

    // === Selection ===

    fn selection(&self) -> Option<Selection>;

    fn set_selection(&mut self, selection: Option<Selection>);

    // === Observation ===

    /// Begin recording mutations. Idempotent.
    fn start_observing(&mut self);

    /// Stop recording mutations. Idempotent; already-recorded mutations
    /// stay queued.
    fn stop_observing(&mut self);

    /// Drain the recorded mutation queue, oldest first.
    fn take_mutations(&mut self) -> Vec<SurfaceMutation>;
}
