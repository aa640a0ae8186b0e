//! Document - shared handle to the node tree, focus, and task queues.
//!
//! The document is the host side of the framework: behaviors read and write
//! attributes and styles, listen for events, and move focus through it.
//! Layout and painting are not modelled; integrators assign rectangles.

use std::cell::{Cell, RefCell};
use std::collections::{HashMap, VecDeque};
use std::rc::{Rc, Weak};

use tracing::trace;

use super::dialog::DialogSupport;
use super::event::{Event, EventInit};
use super::events::ListenerEntry;
use super::selector::Selector;
use super::tree::{NodeData, NodeId, Tree};
use crate::error::{DomError, SelectorError};
use crate::types::Rect;

pub(crate) type Task = Box<dyn FnOnce()>;

pub(crate) struct DocumentInner {
    pub(crate) tree: RefCell<Tree>,
    root: NodeId,
    html: NodeId,
    body: NodeId,
    pub(crate) active: Cell<Option<NodeId>>,
    pub(crate) listeners: RefCell<HashMap<NodeId, Vec<Rc<ListenerEntry>>>>,
    pub(crate) next_listener: Cell<u64>,
    microtasks: RefCell<VecDeque<Task>>,
    tasks: RefCell<VecDeque<Task>>,
    draining_microtasks: Cell<bool>,
    pub(crate) dispatch_depth: Cell<usize>,
    pub(crate) top_layer: RefCell<Vec<NodeId>>,
    pub(crate) dialog_support: Cell<DialogSupport>,
    viewport: Cell<(f64, f64)>,
}

/// Shared handle to a document. Cloning is cheap.
#[derive(Clone)]
pub struct Document {
    pub(crate) inner: Rc<DocumentInner>,
}

/// Non-owning document handle for listeners that must not keep it alive.
#[derive(Clone)]
pub struct WeakDocument {
    inner: Weak<DocumentInner>,
}

impl WeakDocument {
    pub fn upgrade(&self) -> Option<Document> {
        self.inner.upgrade().map(|inner| Document { inner })
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Document {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Document")
            .field("nodes", &self.inner.tree.borrow().live_count())
            .field("active", &self.inner.active.get())
            .finish()
    }
}

impl PartialEq for Document {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Document {
    /// Create a document with `<html>` and `<body>` in place.
    pub fn new() -> Self {
        let mut tree = Tree::new();
        let root = tree.insert(NodeData::document());
        let html = tree.insert(NodeData::element("html"));
        let body = tree.insert(NodeData::element("body"));
        link(&mut tree, root, html);
        link(&mut tree, html, body);

        Self {
            inner: Rc::new(DocumentInner {
                tree: RefCell::new(tree),
                root,
                html,
                body,
                active: Cell::new(None),
                listeners: RefCell::new(HashMap::new()),
                next_listener: Cell::new(0),
                microtasks: RefCell::new(VecDeque::new()),
                tasks: RefCell::new(VecDeque::new()),
                draining_microtasks: Cell::new(false),
                dispatch_depth: Cell::new(0),
                top_layer: RefCell::new(Vec::new()),
                dialog_support: Cell::new(DialogSupport::Full),
                viewport: Cell::new((0.0, 0.0)),
            }),
        }
    }

    pub fn downgrade(&self) -> WeakDocument {
        WeakDocument {
            inner: Rc::downgrade(&self.inner),
        }
    }

    /// The document node (tree root, not an element).
    pub fn root(&self) -> NodeId {
        self.inner.root
    }

    /// The `<html>` element.
    pub fn document_element(&self) -> NodeId {
        self.inner.html
    }

    pub fn body(&self) -> NodeId {
        self.inner.body
    }

    // =========================================================================
    // Tree
    // =========================================================================

    pub fn create_element(&self, tag: &str) -> NodeId {
        self.inner.tree.borrow_mut().insert(NodeData::element(tag))
    }

    /// Append `child` to `parent`, moving it if it already has a parent.
    pub fn append_child(&self, parent: NodeId, child: NodeId) -> Result<(), DomError> {
        let mut tree = self.inner.tree.borrow_mut();
        if !tree.exists(parent) {
            return Err(DomError::StaleNode(parent));
        }
        let child_is_element = tree
            .get(child)
            .ok_or(DomError::StaleNode(child))?
            .is_element();
        if !child_is_element || tree.is_inclusive_ancestor(child, parent) {
            return Err(DomError::HierarchyRequest { parent, child });
        }
        tree.detach(child);
        link(&mut tree, parent, child);
        Ok(())
    }

    /// Detach `node` from its parent. The node and its subtree stay usable.
    pub fn remove(&self, node: NodeId) {
        self.inner.tree.borrow_mut().detach(node);
        self.forget_subtree_state(node);
    }

    /// Detach `node` and free it and its subtree, dropping their listeners.
    pub fn discard(&self, node: NodeId) {
        if node == self.inner.root || node == self.inner.html || node == self.inner.body {
            return;
        }
        self.remove(node);
        let doomed = {
            let tree = self.inner.tree.borrow();
            let mut doomed = vec![node];
            doomed.extend(tree.descendants(node));
            doomed
        };
        {
            let mut tree = self.inner.tree.borrow_mut();
            for id in &doomed {
                tree.free(*id);
            }
        }
        let mut listeners = self.inner.listeners.borrow_mut();
        for id in &doomed {
            if let Some(entries) = listeners.remove(id) {
                for entry in entries {
                    entry.removed.set(true);
                }
            }
        }
        trace!(?node, freed = doomed.len(), "discarded subtree");
    }

    /// Drop focus and top-layer membership held by a detached subtree.
    fn forget_subtree_state(&self, node: NodeId) {
        let tree = self.inner.tree.borrow();
        if let Some(active) = self.inner.active.get() {
            if tree.is_inclusive_ancestor(node, active) || !tree.exists(active) {
                self.inner.active.set(None);
            }
        }
        self.inner
            .top_layer
            .borrow_mut()
            .retain(|d| !tree.is_inclusive_ancestor(node, *d));
    }

    pub fn exists(&self, node: NodeId) -> bool {
        self.inner.tree.borrow().exists(node)
    }

    pub fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.inner.tree.borrow().parent(node)
    }

    pub fn children(&self, node: NodeId) -> Vec<NodeId> {
        self.inner
            .tree
            .borrow()
            .get(node)
            .map(|n| n.children.clone())
            .unwrap_or_default()
    }

    /// Descendants of `node` in document order.
    pub fn descendants(&self, node: NodeId) -> Vec<NodeId> {
        self.inner.tree.borrow().descendants(node)
    }

    /// Inclusive containment: a node contains itself.
    pub fn contains(&self, ancestor: NodeId, node: NodeId) -> bool {
        self.inner.tree.borrow().is_inclusive_ancestor(ancestor, node)
    }

    /// Whether the node is attached to this document's tree.
    pub fn is_connected(&self, node: NodeId) -> bool {
        self.contains(self.inner.root, node)
    }

    pub fn is_element(&self, node: NodeId) -> bool {
        self.inner
            .tree
            .borrow()
            .get(node)
            .is_some_and(NodeData::is_element)
    }

    pub fn tag_name(&self, node: NodeId) -> Option<String> {
        self.inner
            .tree
            .borrow()
            .get(node)
            .and_then(|n| n.tag().map(str::to_string))
    }

    // =========================================================================
    // Attributes
    // =========================================================================

    pub fn get_attribute(&self, node: NodeId, name: &str) -> Option<String> {
        self.inner
            .tree
            .borrow()
            .get(node)
            .and_then(|n| n.attr(name).map(str::to_string))
    }

    pub fn has_attribute(&self, node: NodeId, name: &str) -> bool {
        self.inner
            .tree
            .borrow()
            .get(node)
            .is_some_and(|n| n.attr(name).is_some())
    }

    pub fn set_attribute(&self, node: NodeId, name: &str, value: &str) {
        if let Some(n) = self.inner.tree.borrow_mut().get_mut(node) {
            n.set_attr(name, value);
        }
    }

    pub fn remove_attribute(&self, node: NodeId, name: &str) {
        if let Some(n) = self.inner.tree.borrow_mut().get_mut(node) {
            n.remove_attr(name);
        }
    }

    /// The element's `id`, if set and non-empty.
    pub fn id_of(&self, node: NodeId) -> Option<String> {
        self.get_attribute(node, "id").filter(|id| !id.is_empty())
    }

    /// First connected element with the given id, in document order.
    pub fn element_by_id(&self, id: &str) -> Option<NodeId> {
        let tree = self.inner.tree.borrow();
        tree.descendants(self.inner.root)
            .into_iter()
            .find(|n| tree.get(*n).and_then(|d| d.attr("id")) == Some(id))
    }

    // =========================================================================
    // Inline Style
    // =========================================================================

    /// Inline style property; unset reads as an empty string.
    pub fn style(&self, node: NodeId, property: &str) -> String {
        self.inner
            .tree
            .borrow()
            .get(node)
            .and_then(|n| n.style.get(property).cloned())
            .unwrap_or_default()
    }

    /// Set an inline style property. An empty value removes it.
    pub fn set_style(&self, node: NodeId, property: &str, value: &str) {
        if let Some(n) = self.inner.tree.borrow_mut().get_mut(node) {
            if value.is_empty() {
                n.style.remove(property);
            } else {
                n.style.insert(property.to_string(), value.to_string());
            }
        }
    }

    /// Hidden by `display: none` on the node or any ancestor.
    pub fn is_hidden(&self, node: NodeId) -> bool {
        let tree = self.inner.tree.borrow();
        tree.inclusive_ancestors(node)
            .into_iter()
            .any(|n| tree.get(n).is_some_and(NodeData::display_none))
    }

    /// Not hidden, and not inside a closed `<dialog>`.
    pub fn is_rendered(&self, node: NodeId) -> bool {
        if self.is_hidden(node) {
            return false;
        }
        let tree = self.inner.tree.borrow();
        tree.inclusive_ancestors(node).into_iter().all(|n| {
            tree.get(n)
                .is_none_or(|d| d.tag() != Some("dialog") || d.attr("open").is_some())
        })
    }

    // =========================================================================
    // Geometry
    // =========================================================================

    pub fn set_rect(&self, node: NodeId, rect: Rect) {
        if let Some(n) = self.inner.tree.borrow_mut().get_mut(node) {
            n.rect = rect;
        }
    }

    pub fn bounding_rect(&self, node: NodeId) -> Rect {
        self.inner
            .tree
            .borrow()
            .get(node)
            .map(|n| n.rect)
            .unwrap_or_default()
    }

    /// Viewport width and the document element's client width.
    pub fn set_viewport(&self, inner_width: f64, client_width: f64) {
        self.inner.viewport.set((inner_width, client_width));
    }

    /// Width taken by the vertical scrollbar, if any.
    pub fn scrollbar_width(&self) -> f64 {
        let (inner, client) = self.inner.viewport.get();
        (inner - client).max(0.0)
    }

    /// Topmost visible element under a client point.
    ///
    /// While a modal dialog is in the top layer, everything outside it is
    /// inert: points outside its content resolve to the dialog itself.
    pub fn element_at(&self, x: f64, y: f64) -> Option<NodeId> {
        let top_modal = self.top_modal();
        let scope = top_modal.unwrap_or(self.inner.root);
        let candidates = self.descendants(scope);
        let hit = candidates.into_iter().rev().find(|n| {
            let rect = self.bounding_rect(*n);
            !rect.is_empty() && rect.contains(x, y) && self.is_rendered(*n)
        });
        match (hit, top_modal) {
            (Some(node), _) => Some(node),
            (None, Some(dialog)) => Some(dialog),
            (None, None) => Some(self.inner.body),
        }
    }

    // =========================================================================
    // Selectors
    // =========================================================================

    pub fn matches(&self, node: NodeId, selector: &Selector) -> bool {
        selector.matches_in(&self.inner.tree.borrow(), node)
    }

    /// Nearest inclusive ancestor element matching `selector`.
    pub fn closest(&self, node: NodeId, selector: &Selector) -> Option<NodeId> {
        let tree = self.inner.tree.borrow();
        tree.inclusive_ancestors(node)
            .into_iter()
            .find(|n| selector.matches_in(&tree, *n))
    }

    /// Matching descendants of `root` in document order (root excluded).
    pub fn query_selector_all(&self, root: NodeId, selector: &Selector) -> Vec<NodeId> {
        let tree = self.inner.tree.borrow();
        tree.descendants(root)
            .into_iter()
            .filter(|n| selector.matches_in(&tree, *n))
            .collect()
    }

    pub fn query_selector(&self, root: NodeId, selector: &Selector) -> Option<NodeId> {
        let tree = self.inner.tree.borrow();
        tree.descendants(root)
            .into_iter()
            .find(|n| selector.matches_in(&tree, *n))
    }

    /// Parse-and-query convenience.
    pub fn select_all(&self, root: NodeId, selector: &str) -> Result<Vec<NodeId>, SelectorError> {
        let selector = Selector::parse(selector)?;
        Ok(self.query_selector_all(root, &selector))
    }

    // =========================================================================
    // Focus
    // =========================================================================

    pub fn active_element(&self) -> Option<NodeId> {
        self.inner
            .active
            .get()
            .filter(|n| self.is_connected(*n))
    }

    /// Whether `focus(node)` would succeed.
    pub fn is_focusable(&self, node: NodeId) -> bool {
        if !self.is_connected(node) || self.is_hidden(node) {
            return false;
        }
        let tree = self.inner.tree.borrow();
        let Some(data) = tree.get(node) else {
            return false;
        };
        let Some(tag) = data.tag() else {
            return false;
        };
        let disabled = data.attr("disabled").is_some();
        match tag {
            "button" | "input" | "select" | "textarea" => !disabled,
            "a" | "area" => data.attr("href").is_some() || data.attr("tabindex").is_some(),
            "dialog" => true,
            _ => data.attr("tabindex").is_some(),
        }
    }

    /// Move focus to `node`, firing `blur` and `focus`.
    pub fn focus(&self, node: NodeId) -> Result<(), DomError> {
        if !self.exists(node) {
            return Err(DomError::StaleNode(node));
        }
        if !self.is_focusable(node) {
            return Err(DomError::NotFocusable(node));
        }
        let previous = self.active_element();
        if previous == Some(node) {
            return Ok(());
        }
        self.inner.active.set(Some(node));
        if let Some(prev) = previous {
            self.dispatch_event(prev, Event::new("blur", EventInit::default()));
        }
        self.dispatch_event(node, Event::new("focus", EventInit::default()));
        Ok(())
    }

    /// Clear focus.
    pub fn blur(&self) {
        if let Some(prev) = self.active_element() {
            self.inner.active.set(None);
            self.dispatch_event(prev, Event::new("blur", EventInit::default()));
        }
    }

    // =========================================================================
    // Scheduling
    // =========================================================================

    /// Queue a microtask. It runs at the next checkpoint: after the outermost
    /// event dispatch returns, or on an explicit
    /// [`perform_microtask_checkpoint`](Self::perform_microtask_checkpoint).
    pub fn queue_microtask(&self, task: impl FnOnce() + 'static) {
        self.inner.microtasks.borrow_mut().push_back(Box::new(task));
    }

    /// Drain the microtask queue, including microtasks queued while draining.
    pub fn perform_microtask_checkpoint(&self) {
        if self.inner.draining_microtasks.replace(true) {
            return;
        }
        let _reset = ResetOnDrop(&self.inner.draining_microtasks);
        loop {
            let next = self.inner.microtasks.borrow_mut().pop_front();
            match next {
                Some(task) => task(),
                None => break,
            }
        }
    }

    pub fn pending_microtasks(&self) -> usize {
        self.inner.microtasks.borrow().len()
    }

    /// Queue a task for [`run_pending_tasks`](Self::run_pending_tasks).
    pub fn queue_task(&self, task: impl FnOnce() + 'static) {
        self.inner.tasks.borrow_mut().push_back(Box::new(task));
    }

    /// Run queued tasks until the queue is empty. Each task is followed by a
    /// microtask checkpoint. Returns how many tasks ran.
    pub fn run_pending_tasks(&self) -> usize {
        let mut ran = 0;
        loop {
            let next = self.inner.tasks.borrow_mut().pop_front();
            let Some(task) = next else { break };
            task();
            self.perform_microtask_checkpoint();
            ran += 1;
        }
        ran
    }

    pub fn pending_tasks(&self) -> usize {
        self.inner.tasks.borrow().len()
    }
}

struct ResetOnDrop<'a>(&'a Cell<bool>);

impl Drop for ResetOnDrop<'_> {
    fn drop(&mut self) {
        self.0.set(false);
    }
}

fn link(tree: &mut Tree, parent: NodeId, child: NodeId) {
    if let Some(c) = tree.get_mut(child) {
        c.parent = Some(parent);
    }
    if let Some(p) = tree.get_mut(parent) {
        p.children.push(child);
    }
}
