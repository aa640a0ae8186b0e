//! Node arena - generational index allocation for document nodes.
//!
//! Nodes are indices into a slot vector, not objects:
//! - Freed slots are pooled and reused
//! - Every reuse bumps the slot generation, so a stale `NodeId` held by a
//!   registry or listener never aliases the node that replaced it

use std::collections::BTreeMap;

use crate::types::Rect;

// =============================================================================
// Node Identity
// =============================================================================

/// Handle to a node in a [`Document`](super::Document).
///
/// Cheap to copy. Becomes stale once the node is discarded.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId {
    index: u32,
    generation: u32,
}

impl NodeId {
    /// Slot index (stable while the node lives).
    pub fn index(self) -> u32 {
        self.index
    }
}

// =============================================================================
// Node Data
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum NodeKind {
    Document,
    Element { tag: String },
}

#[derive(Debug, Clone)]
pub(crate) struct NodeData {
    pub kind: NodeKind,
    pub attributes: Vec<(String, String)>,
    pub style: BTreeMap<String, String>,
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,
    pub rect: Rect,
    /// Set while a `<dialog>` is shown through `show_modal`.
    pub dialog_modal: bool,
}

impl NodeData {
    pub fn document() -> Self {
        Self::with_kind(NodeKind::Document)
    }

    pub fn element(tag: &str) -> Self {
        Self::with_kind(NodeKind::Element {
            tag: tag.to_ascii_lowercase(),
        })
    }

    fn with_kind(kind: NodeKind) -> Self {
        Self {
            kind,
            attributes: Vec::new(),
            style: BTreeMap::new(),
            parent: None,
            children: Vec::new(),
            rect: Rect::default(),
            dialog_modal: false,
        }
    }

    pub fn tag(&self) -> Option<&str> {
        match &self.kind {
            NodeKind::Element { tag } => Some(tag),
            NodeKind::Document => None,
        }
    }

    pub fn is_element(&self) -> bool {
        matches!(self.kind, NodeKind::Element { .. })
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn set_attr(&mut self, name: &str, value: &str) {
        match self
            .attributes
            .iter_mut()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
        {
            Some((_, v)) => *v = value.to_string(),
            None => self
                .attributes
                .push((name.to_ascii_lowercase(), value.to_string())),
        }
    }

    pub fn remove_attr(&mut self, name: &str) -> bool {
        let before = self.attributes.len();
        self.attributes.retain(|(n, _)| !n.eq_ignore_ascii_case(name));
        before != self.attributes.len()
    }

    /// Whether this node hides itself with `display: none`.
    pub fn display_none(&self) -> bool {
        self.style.get("display").map(String::as_str) == Some("none")
    }
}

// =============================================================================
// Arena
// =============================================================================

struct Slot {
    generation: u32,
    node: Option<NodeData>,
}

pub(crate) struct Tree {
    slots: Vec<Slot>,
    free: Vec<u32>,
}

impl Tree {
    pub fn new() -> Self {
        Self {
            slots: Vec::new(),
            free: Vec::new(),
        }
    }

    /// Allocate a node, reusing a freed slot when one is pooled.
    pub fn insert(&mut self, data: NodeData) -> NodeId {
        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index as usize];
            slot.node = Some(data);
            return NodeId {
                index,
                generation: slot.generation,
            };
        }

        let index = self.slots.len() as u32;
        self.slots.push(Slot {
            generation: 0,
            node: Some(data),
        });
        NodeId {
            index,
            generation: 0,
        }
    }

    pub fn get(&self, id: NodeId) -> Option<&NodeData> {
        self.slots
            .get(id.index as usize)
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.node.as_ref())
    }

    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut NodeData> {
        self.slots
            .get_mut(id.index as usize)
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.node.as_mut())
    }

    pub fn exists(&self, id: NodeId) -> bool {
        self.get(id).is_some()
    }

    /// Release a slot back to the pool. The caller detaches first.
    pub fn free(&mut self, id: NodeId) -> Option<NodeData> {
        let slot = self
            .slots
            .get_mut(id.index as usize)
            .filter(|slot| slot.generation == id.generation)?;
        let data = slot.node.take()?;
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(id.index);
        Some(data)
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.get(id).and_then(|n| n.parent)
    }

    /// Parent only if it is an element (the document node is excluded).
    pub fn parent_element(&self, id: NodeId) -> Option<NodeId> {
        self.parent(id)
            .filter(|p| self.get(*p).is_some_and(NodeData::is_element))
    }

    /// Walk from `id` (inclusive) up to its root.
    pub fn inclusive_ancestors(&self, id: NodeId) -> Vec<NodeId> {
        let mut chain = Vec::new();
        let mut current = self.exists(id).then_some(id);
        while let Some(node) = current {
            chain.push(node);
            current = self.parent(node);
        }
        chain
    }

    /// True if `ancestor` is `node` or one of its ancestors.
    pub fn is_inclusive_ancestor(&self, ancestor: NodeId, node: NodeId) -> bool {
        let mut current = self.exists(node).then_some(node);
        while let Some(n) = current {
            if n == ancestor {
                return true;
            }
            current = self.parent(n);
        }
        false
    }

    /// All descendants of `id` in document (pre-)order, excluding `id`.
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = match self.get(id) {
            Some(node) => node.children.iter().rev().copied().collect(),
            None => return out,
        };
        while let Some(node) = stack.pop() {
            out.push(node);
            if let Some(data) = self.get(node) {
                stack.extend(data.children.iter().rev().copied());
            }
        }
        out
    }

    /// Unlink `id` from its parent. The subtree stays intact.
    pub fn detach(&mut self, id: NodeId) {
        let Some(parent) = self.parent(id) else { return };
        if let Some(p) = self.get_mut(parent) {
            p.children.retain(|c| *c != id);
        }
        if let Some(node) = self.get_mut(id) {
            node.parent = None;
        }
    }

    pub fn live_count(&self) -> usize {
        self.slots.iter().filter(|s| s.node.is_some()).count()
    }
}
