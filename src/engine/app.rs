//! Lifecycle engine.
//!
//! [`Foundation`] owns the ordered plugin list and the [`MountRegistry`]:
//! - `init` / `init_at` scan for matching elements and mount
//! - `destroy` / `destroy_at` tear instances down
//! - `plugin` / `use_plugins` append descriptors (no retroactive mount)
//!
//! # Example
//!
//! ```ignore
//! use std::rc::Rc;
//! use spark_foundation::{Document, Foundation, ScrollLock};
//! use spark_foundation::plugins::reveal::{reveal, RevealOptions};
//!
//! let doc = Document::new();
//! let lock = Rc::new(ScrollLock::new(&doc));
//! let app = Foundation::new(doc.clone());
//! app.plugin(reveal(RevealOptions::default(), lock));
//! app.init()?;
//! ```

use std::cell::RefCell;
use std::rc::Rc;

use tracing::debug;

use super::plugin::Plugin;
use super::registry::MountRegistry;
use crate::dom::{Document, NodeId, Selector};
use crate::error::FoundationError;

/// The application: plugins plus their live instances on one document.
pub struct Foundation {
    document: Document,
    plugins: RefCell<Vec<Rc<dyn Plugin>>>,
    registry: MountRegistry,
}

impl Foundation {
    pub fn new(document: Document) -> Self {
        Self {
            registry: MountRegistry::new(document.clone()),
            document,
            plugins: RefCell::new(Vec::new()),
        }
    }

    pub fn with_plugins(document: Document, plugins: impl IntoIterator<Item = Rc<dyn Plugin>>) -> Self {
        let app = Self::new(document);
        app.use_plugins(plugins);
        app
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn registry(&self) -> &MountRegistry {
        &self.registry
    }

    // =========================================================================
    // Plugins
    // =========================================================================

    /// Append one plugin.
    pub fn plugin(&self, plugin: Rc<dyn Plugin>) -> &Self {
        self.plugins.borrow_mut().push(plugin);
        self
    }

    /// Append plugins in order.
    pub fn use_plugins(&self, plugins: impl IntoIterator<Item = Rc<dyn Plugin>>) -> &Self {
        self.plugins.borrow_mut().extend(plugins);
        self
    }

    /// Snapshot of the registered plugins.
    pub fn plugins(&self) -> Vec<Rc<dyn Plugin>> {
        self.plugins.borrow().clone()
    }

    // =========================================================================
    // Init
    // =========================================================================

    /// Mount every plugin across the whole document.
    pub fn init(&self) -> Result<(), FoundationError> {
        self.init_at(self.document.root())
    }

    /// Mount every plugin on `root` (if it matches) and its matching
    /// descendants, plugin by plugin, selector by selector, in document
    /// order. Already-mounted pairs are skipped.
    ///
    /// On a mount failure the error is returned immediately; instances
    /// mounted before it stay live.
    pub fn init_at(&self, root: NodeId) -> Result<(), FoundationError> {
        let plugins = self.plugins();
        let mut mounted = 0;
        for plugin in &plugins {
            let name = plugin.name();
            for pattern in plugin.selector().patterns() {
                let selector = Selector::parse(pattern).map_err(|source| FoundationError::Selector {
                    plugin: name.to_string(),
                    source,
                })?;

                let mut candidates = Vec::new();
                if self.document.is_element(root) && self.document.matches(root, &selector) {
                    candidates.push(root);
                }
                candidates.extend(self.document.query_selector_all(root, &selector));

                for element in candidates {
                    // Discarded by an earlier mount in this pass
                    if !self.document.exists(element) {
                        continue;
                    }
                    let created = self
                        .registry
                        .mount(plugin.as_ref(), element)
                        .map_err(|source| FoundationError::Mount {
                            plugin: name.to_string(),
                            element,
                            source,
                        })?;
                    if created {
                        mounted += 1;
                    }
                }
            }
        }
        debug!(?root, mounted, "init");
        Ok(())
    }

    // =========================================================================
    // Destroy
    // =========================================================================

    /// Tear down every live instance in creation order.
    pub fn destroy(&self) {
        let destroyed = self.registry.destroy_all();
        debug!(destroyed, "destroy");
    }

    /// Tear down instances on `root` and its descendants.
    pub fn destroy_at(&self, root: NodeId) {
        let destroyed = self.registry.destroy_within(root);
        debug!(?root, destroyed, "destroy subtree");
    }

    // =========================================================================
    // Instances
    // =========================================================================

    pub fn is_mounted(&self, element: NodeId, plugin: &str) -> bool {
        self.registry.is_mounted(element, plugin)
    }

    /// The controller mounted by `plugin` on `element`, downcast to `T`.
    pub fn instance<T: Clone + 'static>(&self, element: NodeId, plugin: &str) -> Option<T> {
        let controller = self.registry.controller(element, plugin)?;
        controller.as_any().downcast_ref::<T>().cloned()
    }

    /// Number of live instances.
    pub fn instance_count(&self) -> usize {
        self.registry.len()
    }
}

impl std::fmt::Debug for Foundation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names: Vec<String> = self.plugins.borrow().iter().map(|p| p.name().to_string()).collect();
        f.debug_struct("Foundation")
            .field("plugins", &names)
            .field("registry", &self.registry)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::plugin::define_plugin;
    use crate::error::PluginError;
    use std::cell::Cell;

    fn counting_plugin(name: &'static str, selector: &'static str, count: &Rc<Cell<usize>>) -> Rc<dyn Plugin> {
        let count = count.clone();
        define_plugin(name, selector, move |_, _| {
            count.set(count.get() + 1);
            Ok(None)
        })
    }

    #[test]
    fn test_init_twice_mounts_once() {
        let doc = Document::new();
        let el = doc.create_element("div");
        doc.set_attribute(el, "data-x", "");
        doc.append_child(doc.body(), el).expect("append");

        let count = Rc::new(Cell::new(0));
        let app = Foundation::new(doc.clone());
        app.plugin(counting_plugin("x", "[data-x]", &count));

        app.init().expect("init");
        app.init().expect("init");
        app.init_at(el).expect("init");
        assert_eq!(count.get(), 1);
        assert_eq!(app.instance_count(), 1);
    }

    #[test]
    fn test_init_at_includes_matching_root() {
        let doc = Document::new();
        let el = doc.create_element("section");
        doc.set_attribute(el, "data-x", "");
        let app = Foundation::new(doc.clone());
        let count = Rc::new(Cell::new(0));
        app.plugin(counting_plugin("x", "[data-x]", &count));

        // Detached root still gets mounted
        app.init_at(el).expect("init");
        assert!(app.is_mounted(el, "x"));
    }

    #[test]
    fn test_use_plugins_is_not_retroactive() {
        let doc = Document::new();
        let el = doc.create_element("div");
        doc.append_child(doc.body(), el).expect("append");
        let app = Foundation::new(doc.clone());
        app.init().expect("init");

        let count = Rc::new(Cell::new(0));
        app.use_plugins([counting_plugin("late", "div", &count)]);
        assert_eq!(count.get(), 0);
        app.init().expect("init");
        assert_eq!(count.get(), 1);
    }

    #[test]
    fn test_plugins_snapshot_is_defensive() {
        let app = Foundation::new(Document::new());
        let count = Rc::new(Cell::new(0));
        app.plugin(counting_plugin("a", "div", &count))
            .plugin(counting_plugin("b", "div", &count));

        let mut snapshot = app.plugins();
        snapshot.clear();
        assert_eq!(app.plugins().len(), 2);
        assert_eq!(app.plugins()[1].name(), "b");
    }

    #[test]
    fn test_invalid_selector_is_reported() {
        let app = Foundation::new(Document::new());
        app.plugin(define_plugin("bad", "[[", |_, _| Ok(None)));
        let err = app.init().expect_err("invalid selector");
        assert!(matches!(err, FoundationError::Selector { .. }));
        assert_eq!(err.plugin(), "bad");
    }

    #[test]
    fn test_mount_error_keeps_earlier_instances() {
        let doc = Document::new();
        let first = doc.create_element("div");
        let second = doc.create_element("div");
        doc.set_attribute(second, "data-fail", "");
        doc.append_child(doc.body(), first).expect("append");
        doc.append_child(doc.body(), second).expect("append");

        let app = Foundation::new(doc.clone());
        app.plugin(define_plugin("flaky", "div", |element, ctx| {
            if ctx.document().has_attribute(element, "data-fail") {
                return Err(PluginError::msg("refused"));
            }
            Ok(None)
        }));

        let err = app.init().expect_err("mount failure");
        match err {
            FoundationError::Mount { plugin, element, .. } => {
                assert_eq!(plugin, "flaky");
                assert_eq!(element, second);
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(app.is_mounted(first, "flaky"));
        assert!(!app.is_mounted(second, "flaky"));
    }

    #[test]
    fn test_candidates_discarded_mid_scan_are_skipped() {
        let doc = Document::new();
        let first = doc.create_element("div");
        let second = doc.create_element("div");
        doc.append_child(doc.body(), first).expect("append");
        doc.append_child(doc.body(), second).expect("append");

        let count = Rc::new(Cell::new(0));
        let count_clone = count.clone();
        let app = Foundation::new(doc.clone());
        app.plugin(define_plugin("eater", "div", move |element, ctx| {
            count_clone.set(count_clone.get() + 1);
            if element == first {
                ctx.document().discard(second);
            }
            Ok(None)
        }));

        app.init().expect("init");
        assert_eq!(count.get(), 1);
    }
}
