//! Mount Registry - live plugin instances keyed by (element, plugin name).
//!
//! Manages the lifecycle of mounted instances:
//! - At most one instance per (element, name); repeated mounts are no-ops
//! - Creation-ordered set for destroy-all traversal
//! - Element → (name → instance) side table, dropped as soon as it is empty
//! - Destroy runs abort, controller teardown, then cleanups, each isolated
//!
//! Elements are generational [`NodeId`]s, so an entry can never alias a
//! recycled node, and every destroy path removes its entry synchronously.

use std::cell::{Cell, RefCell};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::rc::Rc;

use tracing::{debug, warn};

use super::context::PluginContext;
use super::plugin::{Plugin, PluginInstance};
use crate::dom::{Document, NodeId};
use crate::error::PluginError;

// =============================================================================
// Mounted Instance
// =============================================================================

/// A plugin mounted on one element.
pub(crate) struct MountedInstance {
    plugin_name: String,
    element: NodeId,
    context: PluginContext,
    controller: Option<Rc<dyn PluginInstance>>,
}

impl MountedInstance {
    pub(crate) fn plugin_name(&self) -> &str {
        &self.plugin_name
    }

    pub(crate) fn element(&self) -> NodeId {
        self.element
    }

    pub(crate) fn controller(&self) -> Option<&Rc<dyn PluginInstance>> {
        self.controller.as_ref()
    }

    /// Abort the context, then the controller's `destroy`, then every
    /// cleanup in order. A panic in one step never skips the rest.
    pub(crate) fn destroy(&self) {
        if catch_unwind(AssertUnwindSafe(|| self.context.abort())).is_err() {
            warn!(plugin = %self.plugin_name, element = ?self.element, "listener removal panicked");
        }
        if let Some(controller) = &self.controller {
            if catch_unwind(AssertUnwindSafe(|| controller.destroy())).is_err() {
                warn!(plugin = %self.plugin_name, element = ?self.element, "controller destroy panicked");
            }
        }
        run_cleanups(&self.context, &self.plugin_name, self.element);
        debug!(plugin = %self.plugin_name, element = ?self.element, "instance destroyed");
    }
}

fn run_cleanups(context: &PluginContext, plugin: &str, element: NodeId) {
    for cleanup in context.take_cleanups() {
        if catch_unwind(AssertUnwindSafe(cleanup)).is_err() {
            warn!(plugin, ?element, "cleanup panicked");
        }
    }
}

// =============================================================================
// Registry State
// =============================================================================

/// Owner of every live instance.
pub struct MountRegistry {
    document: Document,
    /// element → name → creation sequence number
    by_element: RefCell<HashMap<NodeId, HashMap<String, u64>>>,
    /// creation sequence number → instance
    instances: RefCell<BTreeMap<u64, Rc<MountedInstance>>>,
    /// Mounts currently running, so a re-entrant mount stays a no-op.
    pending: RefCell<HashSet<(NodeId, String)>>,
    next_seq: Cell<u64>,
}

/// Clears the in-flight marker even if `mount` unwinds.
struct PendingGuard<'a> {
    pending: &'a RefCell<HashSet<(NodeId, String)>>,
    key: (NodeId, String),
}

impl Drop for PendingGuard<'_> {
    fn drop(&mut self) {
        self.pending.borrow_mut().remove(&self.key);
    }
}

impl MountRegistry {
    pub fn new(document: Document) -> Self {
        Self {
            document,
            by_element: RefCell::new(HashMap::new()),
            instances: RefCell::new(BTreeMap::new()),
            pending: RefCell::new(HashSet::new()),
            next_seq: Cell::new(0),
        }
    }

    // =========================================================================
    // Mounting
    // =========================================================================

    /// Mount `plugin` on `element`.
    ///
    /// Returns `Ok(false)` when an instance (or an in-flight mount) already
    /// exists for the pair. A failed mount has its context aborted and its
    /// cleanups run before the error is returned.
    pub fn mount(&self, plugin: &dyn Plugin, element: NodeId) -> Result<bool, PluginError> {
        let name = plugin.name().to_string();
        if self.is_mounted(element, &name) {
            return Ok(false);
        }
        let key = (element, name.clone());
        if !self.pending.borrow_mut().insert(key.clone()) {
            return Ok(false);
        }
        let _guard = PendingGuard {
            pending: &self.pending,
            key,
        };

        let context = PluginContext::new(self.document.clone(), element);
        let controller = match plugin.mount(element, &context) {
            Ok(controller) => controller,
            Err(err) => {
                context.abort();
                run_cleanups(&context, &name, element);
                debug!(plugin = %name, ?element, error = %err, "mount failed");
                return Err(err);
            }
        };

        let seq = self.next_seq.get();
        self.next_seq.set(seq + 1);
        self.by_element
            .borrow_mut()
            .entry(element)
            .or_default()
            .insert(name.clone(), seq);
        self.instances.borrow_mut().insert(
            seq,
            Rc::new(MountedInstance {
                plugin_name: name.clone(),
                element,
                context,
                controller,
            }),
        );
        debug!(plugin = %name, ?element, seq, "instance mounted");
        Ok(true)
    }

    // =========================================================================
    // Teardown
    // =========================================================================

    /// Destroy every live instance in creation order.
    pub fn destroy_all(&self) -> usize {
        let seqs: Vec<u64> = self.instances.borrow().keys().copied().collect();
        self.destroy_seqs(seqs)
    }

    /// Destroy instances whose element is `root` or inside it.
    pub fn destroy_within(&self, root: NodeId) -> usize {
        let seqs: Vec<u64> = self
            .instances
            .borrow()
            .iter()
            .filter(|(_, inst)| inst.element == root || self.document.contains(root, inst.element))
            .map(|(seq, _)| *seq)
            .collect();
        self.destroy_seqs(seqs)
    }

    /// Destroy one instance. Returns false if there was none.
    pub fn destroy_one(&self, element: NodeId, name: &str) -> bool {
        let seq = self
            .by_element
            .borrow()
            .get(&element)
            .and_then(|names| names.get(name).copied());
        match seq {
            Some(seq) => self.destroy_seqs(vec![seq]) == 1,
            None => false,
        }
    }

    fn destroy_seqs(&self, seqs: Vec<u64>) -> usize {
        let mut destroyed = 0;
        for seq in seqs {
            // Unregister before tearing down so teardown code sees a
            // consistent registry.
            let Some(instance) = self.instances.borrow_mut().remove(&seq) else {
                continue;
            };
            self.forget(&instance);
            instance.destroy();
            destroyed += 1;
        }
        destroyed
    }

    fn forget(&self, instance: &MountedInstance) {
        let mut by_element = self.by_element.borrow_mut();
        if let Some(names) = by_element.get_mut(&instance.element) {
            names.remove(&instance.plugin_name);
            if names.is_empty() {
                by_element.remove(&instance.element);
            }
        }
    }

    // =========================================================================
    // Lookups
    // =========================================================================

    pub fn is_mounted(&self, element: NodeId, name: &str) -> bool {
        self.by_element
            .borrow()
            .get(&element)
            .is_some_and(|names| names.contains_key(name))
    }

    /// Controller returned by the instance's `mount`, if any.
    pub fn controller(&self, element: NodeId, name: &str) -> Option<Rc<dyn PluginInstance>> {
        let seq = self
            .by_element
            .borrow()
            .get(&element)
            .and_then(|names| names.get(name).copied())?;
        self.instances
            .borrow()
            .get(&seq)
            .and_then(|inst| inst.controller().cloned())
    }

    /// Plugin names mounted on `element`, in creation order.
    pub fn names_on(&self, element: NodeId) -> Vec<String> {
        self.instances
            .borrow()
            .values()
            .filter(|inst| inst.element() == element)
            .map(|inst| inst.plugin_name().to_string())
            .collect()
    }

    /// Number of live instances.
    pub fn len(&self) -> usize {
        self.instances.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.instances.borrow().is_empty()
    }

    /// Number of elements with at least one live instance.
    pub fn element_count(&self) -> usize {
        self.by_element.borrow().len()
    }
}

impl std::fmt::Debug for MountRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MountRegistry")
            .field("instances", &self.len())
            .field("elements", &self.element_count())
            .finish()
    }
}
