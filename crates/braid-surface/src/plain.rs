//! In-memory implementations of the host and surface traits.
//!
//! `PlainHost` owns canonical content the way a document module would;
//! `MemorySurface` renders content into a flat run list and records
//! mutations the way a tree observer would. Both back the test suites and
//! double as working examples of the contracts.

use braid_delta::{Affinity, Attributes, Content, Delta, InsertContent, Op, SmolStr, EMBED_UNIT};

use crate::host::{Decorate, DocumentHost};
use crate::surface::{NodeId, Surface, SurfaceMutation};
use crate::types::{Origin, Selection};

/// One change accepted by [`PlainHost`], kept for inspection.
#[derive(Clone, Debug, PartialEq)]
pub struct Submission {
    pub change: Delta,
    pub origin: Origin,
    pub prior_selection: Option<Selection>,
}

/// A document host holding content and selection in memory.
///
/// Submitted changes apply immediately; the prior selection travels
/// through the change so the cursor lands where the edit left it.
pub struct PlainHost {
    content: Content,
    selection: Option<Selection>,
    active_attributes: Option<Attributes>,
    decorators: Vec<Box<dyn Decorate>>,
    submissions: Vec<Submission>,
}

impl PlainHost {
    pub fn new(content: Content) -> Self {
        Self {
            content,
            selection: None,
            active_attributes: None,
            decorators: Vec::new(),
            submissions: Vec::new(),
        }
    }

    pub fn with_text(text: &str) -> Self {
        Self::new(Content::from_text(text))
    }

    pub fn add_decorator(&mut self, decorator: impl Decorate + 'static) {
        self.decorators.push(Box::new(decorator));
    }

    pub fn set_active_attributes(&mut self, attrs: Option<Attributes>) {
        self.active_attributes = attrs;
    }

    /// Every change accepted so far, oldest first.
    pub fn submissions(&self) -> &[Submission] {
        &self.submissions
    }
}

impl DocumentHost for PlainHost {
    fn content(&self) -> Content {
        self.content.clone()
    }

    fn decorations(&self, content: &Content) -> Delta {
        let mut delta = Delta::new();
        for decorator in &self.decorators {
            delta = decorator.decorate(content, delta);
        }
        delta
    }

    fn submit(&mut self, change: Delta, origin: Origin, prior_selection: Option<Selection>) {
        self.content = self.content.apply(&change);
        if let Some(selection) = prior_selection {
            self.selection = Some(Selection::new(
                change.transform_index(selection.anchor, Affinity::After),
                change.transform_index(selection.head, Affinity::After),
            ));
        }
        self.submissions.push(Submission {
            change,
            origin,
            prior_selection,
        });
    }

    fn selection(&self) -> Option<Selection> {
        self.selection
    }

    fn set_selection(&mut self, selection: Option<Selection>, _origin: Origin) {
        self.selection = selection;
    }

    fn active_attributes(&self) -> Option<Attributes> {
        self.active_attributes.clone()
    }
}

struct MemoryNode {
    id: NodeId,
    /// Always an insert; one node per uniform run.
    op: Op,
}

/// A surface holding rendered content as a flat list of run nodes.
///
/// Each render replaces every node and assigns fresh ids, the way a
/// renderer rebuilding a tree does. The edit helpers model a user (or
/// another agent) touching the surface directly: they change a node and,
/// while observation is on, queue the matching mutation record.
pub struct MemorySurface {
    nodes: Vec<MemoryNode>,
    selection: Option<Selection>,
    observing: bool,
    mutations: Vec<SurfaceMutation>,
    next_id: u64,
    enabled: bool,
}

impl MemorySurface {
    pub fn new() -> Self {
        Self {
            nodes: Vec::new(),
            selection: None,
            observing: false,
            mutations: Vec::new(),
            // Node 0 is the root.
            next_id: 1,
            enabled: true,
        }
    }

    pub fn node_ids(&self) -> Vec<NodeId> {
        self.nodes.iter().map(|node| node.id).collect()
    }

    /// The rendered tree flattened to a string, embeds as [`EMBED_UNIT`].
    pub fn text(&self) -> String {
        let mut out = String::new();
        for node in &self.nodes {
            match &node.op {
                Op::Insert(InsertContent::Text(text), _) => out.push_str(text),
                Op::Insert(InsertContent::Embed(_), _) => out.push(EMBED_UNIT),
                _ => {}
            }
        }
        out
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn is_observing(&self) -> bool {
        self.observing
    }

    /// Replace a text node's character data, as a user edit would.
    pub fn edit_text(&mut self, node: NodeId, text: impl Into<SmolStr>) -> bool {
        let Some(found) = self.nodes.iter_mut().find(|n| n.id == node) else {
            return false;
        };
        let Op::Insert(InsertContent::Text(current), _) = &mut found.op else {
            return false;
        };
        let previous = std::mem::replace(current, text.into());
        self.record(SurfaceMutation::text(node, previous));
        true
    }

    /// Append a new text node, as an outside agent would.
    pub fn insert_text_node(&mut self, text: impl Into<SmolStr>) -> NodeId {
        let id = self.fresh_id();
        self.nodes.push(MemoryNode {
            id,
            op: Op::insert(text),
        });
        self.record(SurfaceMutation::structure(NodeId::ROOT, vec![id]));
        id
    }

    pub fn remove_node(&mut self, node: NodeId) -> bool {
        let Some(index) = self.nodes.iter().position(|n| n.id == node) else {
            return false;
        };
        self.nodes.remove(index);
        self.record(SurfaceMutation::structure(NodeId::ROOT, Vec::new()));
        true
    }

    /// Replace a node's formatting attributes.
    pub fn edit_attributes(&mut self, node: NodeId, attrs: Option<Attributes>) -> bool {
        let Some(found) = self.nodes.iter_mut().find(|n| n.id == node) else {
            return false;
        };
        let Op::Insert(_, node_attrs) = &mut found.op else {
            return false;
        };
        *node_attrs = attrs.and_then(Attributes::into_option);
        self.record(SurfaceMutation::attribute(node));
        true
    }

    fn fresh_id(&mut self) -> NodeId {
        let id = NodeId(self.next_id);
        self.next_id += 1;
        id
    }

    fn record(&mut self, mutation: SurfaceMutation) {
        if self.observing {
            self.mutations.push(mutation);
        }
    }
}

impl Default for MemorySurface {
    fn default() -> Self {
        Self::new()
    }
}

impl Surface for MemorySurface {
    fn render(&mut self, content: &Content, enabled: bool) {
        self.enabled = enabled;
        let mut nodes = Vec::with_capacity(content.ops().len());
        let mut added = Vec::with_capacity(content.ops().len());
        for op in content.ops() {
            let id = self.fresh_id();
            nodes.push(MemoryNode { id, op: op.clone() });
            added.push(id);
        }
        self.nodes = nodes;
        // A render under observation reports its churn like any other
        // structural change; callers wanting silence suspend first.
        self.record(SurfaceMutation::structure(NodeId::ROOT, added));
    }

    fn read_content(&self) -> Content {
        let mut delta = Delta::new();
        for node in &self.nodes {
            delta.push(node.op.clone());
        }
        Content::from_delta_lossy(delta)
    }

    fn node_offset(&self, node: NodeId) -> Option<usize> {
        let mut offset = 0;
        for n in &self.nodes {
            if n.id == node {
                return Some(offset);
            }
            offset += n.op.len();
        }
        None
    }

    fn node_text(&self, node: NodeId) -> Option<String> {
        self.nodes.iter().find(|n| n.id == node).and_then(|n| match &n.op {
            Op::Insert(InsertContent::Text(text), _) => Some(text.to_string()),
            _ => None,
        })
    }

    fn selection(&self) -> Option<Selection> {
        self.selection
    }

    fn set_selection(&mut self, selection: Option<Selection>) {
        self.selection = selection;
    }

    fn start_observing(&mut self) {
        self.observing = true;
    }

    fn stop_observing(&mut self) {
        self.observing = false;
    }

    fn take_mutations(&mut self) -> Vec<SurfaceMutation> {
        std::mem::take(&mut self.mutations)
    }
}
