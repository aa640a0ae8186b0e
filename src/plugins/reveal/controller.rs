//! Reveal controller - the open/closed state machine.
//!
//! Two states, `Closed` and `Open`. Transitions are guarded so repeated
//! `open` / `close` calls are no-ops, and every resource taken on open
//! (backdrop, scroll lock, opener) is released by the single finalize step.

use std::any::Any;
use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

use tracing::debug;
use uuid::Uuid;

use super::options::{ResolvedRevealOptions, RevealOptions};
use super::surface::{Surface, surface_for};
use super::{
    ATTR_CLOSE_FOR, ATTR_OPEN_FOR, ATTR_TOGGLE_FOR, EVENT_CLOSE, EVENT_CLOSED, EVENT_OPEN,
    EVENT_OPENED, EVENT_TOGGLE, ID_PREFIX,
};
use crate::dom::{
    AbortController, Document, Event, EventInit, Listener, ListenerOptions, NodeId, listener,
};
use crate::engine::{PluginContext, PluginInstance};
use crate::state::ScrollLock;
use crate::state::focus;

/// Payload of the `opened` / `closed` notifications.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RevealDetail {
    pub id: String,
    /// Element focused (or explicitly passed) when the instance opened.
    pub opener: Option<NodeId>,
    pub element: NodeId,
}

#[derive(Debug, Default)]
struct RevealState {
    is_open: bool,
    opener: Option<NodeId>,
    /// Only for overlays, only while open.
    backdrop: Option<NodeId>,
    /// Revokes listeners that live for one open cycle.
    cycle: Option<AbortController>,
}

struct RevealInner {
    ctx: PluginContext,
    element: NodeId,
    id: String,
    options: ResolvedRevealOptions,
    surface: Box<dyn Surface>,
    scroll_lock: Rc<ScrollLock>,
    state: RefCell<RevealState>,
}

/// Handle to one mounted reveal instance. Cloning is cheap and shares state.
#[derive(Clone)]
pub struct RevealController {
    inner: Rc<RevealInner>,
}

impl RevealController {
    // =========================================================================
    // Mount
    // =========================================================================

    pub(crate) fn mount(
        element: NodeId,
        ctx: &PluginContext,
        defaults: &RevealOptions,
        scroll_lock: Rc<ScrollLock>,
    ) -> Self {
        let doc = ctx.document();
        let id = ensure_id(doc, element);
        let options = defaults.resolve(doc, element);
        let surface = surface_for(doc, element);
        let is_open = surface.initially_open(doc, element);

        if is_open && options.locks_scroll() {
            scroll_lock.lock();
        }
        surface.prepare(doc, element, &options, is_open);

        let controller = Self {
            inner: Rc::new(RevealInner {
                ctx: ctx.clone(),
                element,
                id,
                options,
                surface,
                scroll_lock,
                state: RefCell::new(RevealState {
                    is_open,
                    ..RevealState::default()
                }),
            }),
        };
        controller.wire();
        debug!(id = %controller.id(), native = controller.is_native(), is_open, "reveal mounted");
        controller
    }

    fn wire(&self) {
        let ctx = &self.inner.ctx;
        let root = ctx.document().root();
        let element = self.inner.element;

        // Direct control events, only when aimed at the element itself
        ctx.on(
            element,
            EVENT_OPEN,
            self.handler(move |c, e| {
                if e.target() == Some(element) {
                    c.open(None);
                }
            }),
            false,
        );
        ctx.on(
            element,
            EVENT_CLOSE,
            self.handler(move |c, e| {
                if e.target() == Some(element) {
                    c.close();
                }
            }),
            false,
        );
        ctx.on(
            element,
            EVENT_TOGGLE,
            self.handler(move |c, e| {
                if e.target() == Some(element) {
                    c.toggle(None);
                }
            }),
            false,
        );

        ctx.on(root, "click", self.handler(|c, e| c.delegate_click(e)), false);
        ctx.on(
            root,
            "keydown",
            self.handler(|c, e| {
                if !c.is_open() || c.is_native() || !c.inner.options.close_on_esc {
                    return;
                }
                if e.key() != Some("Escape") {
                    return;
                }
                e.prevent_default();
                c.close();
            }),
            false,
        );

        if self.is_native() {
            ctx.on(
                element,
                "cancel",
                self.handler(|c, e| {
                    if !c.inner.options.close_on_esc {
                        e.prevent_default();
                    }
                }),
                false,
            );
            // A close event queued before a re-open must not finalize it.
            ctx.on(
                element,
                "close",
                self.handler(move |c, _| {
                    if !c.document().dialog_open(element) {
                        c.finalize();
                    }
                }),
                false,
            );
            ctx.on(
                element,
                "click",
                self.handler(move |c, e| c.native_backdrop_click(e)),
                false,
            );
        } else {
            ctx.on(
                element,
                "click",
                self.handler(move |c, e| {
                    if c.inner.options.close_on_backdrop && c.is_open() && e.target() == Some(element) {
                        c.close();
                    }
                }),
                false,
            );
        }
    }

    /// Listener that runs `f` while the controller is alive.
    fn handler(&self, f: impl Fn(&RevealController, &mut Event) + 'static) -> Listener {
        let weak: Weak<RevealInner> = Rc::downgrade(&self.inner);
        listener(move |event| {
            if let Some(inner) = weak.upgrade() {
                f(&RevealController { inner }, event);
            }
        })
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    pub fn id(&self) -> &str {
        &self.inner.id
    }

    pub fn element(&self) -> NodeId {
        self.inner.element
    }

    pub fn is_open(&self) -> bool {
        self.inner.state.borrow().is_open
    }

    pub fn opener(&self) -> Option<NodeId> {
        self.inner.state.borrow().opener
    }

    pub fn backdrop(&self) -> Option<NodeId> {
        self.inner.state.borrow().backdrop
    }

    pub fn options(&self) -> &ResolvedRevealOptions {
        &self.inner.options
    }

    /// Whether the element is a native `<dialog>`.
    pub fn is_native(&self) -> bool {
        self.inner.surface.is_native()
    }

    fn document(&self) -> &Document {
        self.inner.ctx.document()
    }

    fn detail(&self, opener: Option<NodeId>) -> RevealDetail {
        RevealDetail {
            id: self.inner.id.clone(),
            opener,
            element: self.inner.element,
        }
    }

    // =========================================================================
    // Transitions
    // =========================================================================

    /// Open. `opener` defaults to the focused element.
    pub fn open(&self, opener: Option<NodeId>) {
        if self.is_open() {
            return;
        }
        let inner = &self.inner;
        if inner.ctx.signal().aborted() {
            debug!(id = %inner.id, "open ignored on destroyed instance");
            return;
        }
        let doc = self.document();
        let opener = opener.or_else(|| doc.active_element());

        let backdrop = match inner.surface.present(doc, inner.element, &inner.id, &inner.options) {
            Ok(backdrop) => backdrop,
            Err(err) => {
                debug!(id = %inner.id, %err, "open aborted");
                return;
            }
        };
        let cycle = AbortController::new();
        if let Some(backdrop) = backdrop {
            doc.add_event_listener(
                backdrop,
                "click",
                self.handler(|c, _| c.close()),
                ListenerOptions::new().signal(cycle.signal().clone()),
            );
        }

        {
            let mut state = inner.state.borrow_mut();
            state.is_open = true;
            state.opener = opener;
            state.backdrop = backdrop;
            state.cycle = Some(cycle);
        }
        if inner.options.locks_scroll() {
            inner.scroll_lock.lock();
        }
        self.schedule_initial_focus();

        debug!(id = %inner.id, ?opener, "reveal opened");
        inner
            .ctx
            .emit(inner.element, EVENT_OPENED, self.detail(opener), EventInit::default());
    }

    /// Close. Native dialogs are closed through the platform first.
    pub fn close(&self) {
        if !self.is_open() {
            return;
        }
        self.inner.surface.dismiss(self.document(), self.inner.element);
        self.finalize();
    }

    pub fn toggle(&self, opener: Option<NodeId>) {
        if self.is_open() {
            self.close();
        } else {
            self.open(opener);
        }
    }

    fn finalize(&self) {
        let (opener, backdrop, cycle) = {
            let mut state = self.inner.state.borrow_mut();
            if !state.is_open {
                return;
            }
            state.is_open = false;
            (state.opener.take(), state.backdrop.take(), state.cycle.take())
        };
        let inner = &self.inner;
        let doc = self.document();

        if let Some(cycle) = cycle {
            cycle.abort();
        }
        if let Some(backdrop) = backdrop {
            doc.discard(backdrop);
        }
        inner.surface.conceal(doc, inner.element);
        if inner.options.locks_scroll() {
            inner.scroll_lock.unlock();
        }
        if inner.options.return_focus {
            if let Some(opener) = opener {
                focus::restore_focus(doc, opener);
            }
        }

        debug!(id = %inner.id, ?opener, "reveal closed");
        inner
            .ctx
            .emit(inner.element, EVENT_CLOSED, self.detail(opener), EventInit::default());
    }

    fn schedule_initial_focus(&self) {
        let weak = Rc::downgrade(&self.inner);
        self.document().queue_microtask(move || {
            let Some(inner) = weak.upgrade() else {
                return;
            };
            if !inner.state.borrow().is_open {
                return;
            }
            focus::focus_initial(inner.ctx.document(), inner.element, &inner.options.initial_focus);
        });
    }

    // =========================================================================
    // Event Handling
    // =========================================================================

    /// Document-level trigger delegation. The first trigger kind found wins
    /// (open, then toggle, then close) even if its id names another
    /// instance.
    fn delegate_click(&self, event: &mut Event) {
        let Some(target) = event.target() else {
            return;
        };
        let doc = self.document();

        if let Some(trigger) = closest_with_attribute(doc, target, ATTR_OPEN_FOR) {
            if doc.get_attribute(trigger, ATTR_OPEN_FOR).as_deref() == Some(self.id()) {
                event.prevent_default();
                self.open(Some(trigger));
            }
            return;
        }

        if let Some(trigger) = closest_with_attribute(doc, target, ATTR_TOGGLE_FOR) {
            if doc.get_attribute(trigger, ATTR_TOGGLE_FOR).as_deref() == Some(self.id()) {
                event.prevent_default();
                self.toggle(Some(trigger));
            }
            return;
        }

        let Some(trigger) = closest_with_attribute(doc, target, ATTR_CLOSE_FOR) else {
            return;
        };
        let value = doc.get_attribute(trigger, ATTR_CLOSE_FOR).unwrap_or_default();
        let inside = doc.contains(self.inner.element, trigger);
        if inside || value.is_empty() || value == self.id() {
            event.prevent_default();
            self.close();
        }
    }

    /// A click on the dialog box itself whose point lies outside its
    /// rectangle landed on the `::backdrop`.
    fn native_backdrop_click(&self, event: &mut Event) {
        let element = self.inner.element;
        let doc = self.document();
        if !self.inner.options.close_on_backdrop || !doc.dialog_open(element) {
            return;
        }
        if event.target() != Some(element) {
            return;
        }
        let Some((x, y)) = event.client_point() else {
            return;
        };
        let rect = doc.bounding_rect(element);
        let outside = x < rect.left() || x > rect.right() || y < rect.top() || y > rect.bottom();
        if outside {
            self.close();
        }
    }
}

impl PluginInstance for RevealController {
    fn destroy(&self) {
        self.close();
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl fmt::Debug for RevealController {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.inner.state.borrow();
        f.debug_struct("RevealController")
            .field("id", &self.inner.id)
            .field("element", &self.inner.element)
            .field("native", &self.is_native())
            .field("state", &*state)
            .finish()
    }
}

/// Existing non-empty id, or a generated one written back to the element.
fn ensure_id(doc: &Document, element: NodeId) -> String {
    if let Some(id) = doc.id_of(element) {
        return id;
    }
    let id = format!("{ID_PREFIX}-{}", Uuid::new_v4());
    doc.set_attribute(element, "id", &id);
    id
}

fn closest_with_attribute(doc: &Document, node: NodeId, attr: &str) -> Option<NodeId> {
    let mut current = Some(node);
    while let Some(n) = current {
        if doc.has_attribute(n, attr) {
            return Some(n);
        }
        current = doc.parent(n);
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::DialogSupport;
    use std::cell::Cell;

    fn mount(doc: &Document, tag: &str, defaults: RevealOptions) -> (RevealController, Rc<ScrollLock>) {
        let el = doc.create_element(tag);
        doc.append_child(doc.body(), el).expect("append");
        let lock = Rc::new(ScrollLock::new(doc));
        let ctx = PluginContext::new(doc.clone(), el);
        (RevealController::mount(el, &ctx, &defaults, lock.clone()), lock)
    }

    #[test]
    fn test_generated_id_is_written_back() {
        let doc = Document::new();
        let (controller, _) = mount(&doc, "div", RevealOptions::default());
        assert!(controller.id().starts_with("foundation-reveal-"));
        assert_eq!(doc.id_of(controller.element()).as_deref(), Some(controller.id()));
    }

    #[test]
    fn test_existing_id_is_kept() {
        let doc = Document::new();
        let el = doc.create_element("div");
        doc.set_attribute(el, "id", "menu");
        let ctx = PluginContext::new(doc.clone(), el);
        let lock = Rc::new(ScrollLock::new(&doc));
        let controller = RevealController::mount(el, &ctx, &RevealOptions::default(), lock);
        assert_eq!(controller.id(), "menu");
    }

    #[test]
    fn test_open_close_are_idempotent() {
        let doc = Document::new();
        let (controller, lock) = mount(&doc, "div", RevealOptions::default());

        controller.open(None);
        let backdrop = controller.backdrop();
        controller.open(None);
        assert_eq!(controller.backdrop(), backdrop);
        assert_eq!(lock.count(), 1);

        controller.close();
        controller.close();
        assert_eq!(lock.count(), 0);
        assert!(controller.backdrop().is_none());
    }

    #[test]
    fn test_repeated_transitions_notify_once() {
        let doc = Document::new();
        let (controller, _) = mount(&doc, "div", RevealOptions::default());
        let opened = Rc::new(Cell::new(0));
        let closed = Rc::new(Cell::new(0));
        for (event_type, counter) in [(EVENT_OPENED, &opened), (EVENT_CLOSED, &closed)] {
            let counter = counter.clone();
            doc.add_event_listener(
                controller.element(),
                event_type,
                listener(move |_| counter.set(counter.get() + 1)),
                false,
            );
        }

        controller.close();
        controller.open(None);
        controller.open(None);
        controller.close();
        controller.close();
        assert_eq!(opened.get(), 1);
        assert_eq!(closed.get(), 1);
    }

    #[test]
    fn test_open_close_cycles_keep_context_bounded() {
        let doc = Document::new();
        let (controller, _) = mount(&doc, "div", RevealOptions::default());
        let ctx = controller.inner.ctx.clone();
        let pending = ctx.signal().pending();
        let cleanups = ctx.cleanup_count();
        let listeners = doc.total_listener_count();

        for _ in 0..100 {
            controller.open(None);
            controller.close();
        }
        assert_eq!(ctx.signal().pending(), pending);
        assert_eq!(ctx.cleanup_count(), cleanups);
        assert_eq!(doc.total_listener_count(), listeners);
    }

    #[test]
    fn test_backdrop_listener_lives_for_one_cycle() {
        let doc = Document::new();
        let (controller, _) = mount(&doc, "div", RevealOptions::default());

        controller.open(None);
        let backdrop = controller.backdrop().expect("backdrop");
        assert_eq!(doc.listener_count(backdrop), 1);
        doc.click(backdrop, 0.0, 0.0);
        assert!(!controller.is_open());
        assert!(!doc.exists(backdrop));
    }

    #[test]
    fn test_open_after_teardown_is_ignored() {
        let doc = Document::new();
        let (controller, lock) = mount(&doc, "div", RevealOptions::default());
        controller.inner.ctx.abort();

        controller.open(None);
        assert!(!controller.is_open());
        assert!(controller.backdrop().is_none());
        assert_eq!(lock.count(), 0);
    }

    #[test]
    fn test_aborted_native_open_leaves_state_closed() {
        let doc = Document::new();
        doc.set_dialog_support(DialogSupport::Unsupported);
        let (controller, lock) = mount(&doc, "dialog", RevealOptions::default());
        let opener = doc.create_element("button");
        doc.append_child(doc.body(), opener).expect("append");

        controller.open(Some(opener));
        assert!(!controller.is_open());
        assert!(controller.opener().is_none());
        assert_eq!(lock.count(), 0);
    }

    #[test]
    fn test_initially_open_overlay_takes_lock() {
        let doc = Document::new();
        let el = doc.create_element("div");
        doc.set_attribute(el, "data-reveal-open", "");
        doc.append_child(doc.body(), el).expect("append");
        let lock = Rc::new(ScrollLock::new(&doc));
        let ctx = PluginContext::new(doc.clone(), el);

        let controller = RevealController::mount(el, &ctx, &RevealOptions::default(), lock.clone());
        assert!(controller.is_open());
        assert_eq!(lock.count(), 1);
        assert_eq!(doc.get_attribute(el, "aria-hidden").as_deref(), Some("false"));

        controller.close();
        assert_eq!(lock.count(), 0);
        assert_eq!(doc.style(el, "display"), "none");
    }

    #[test]
    fn test_non_modal_skips_scroll_lock() {
        let doc = Document::new();
        let (controller, lock) = mount(&doc, "div", RevealOptions::default().modal(false));
        controller.open(None);
        assert_eq!(lock.count(), 0);
        assert_eq!(doc.get_attribute(controller.element(), "aria-modal").as_deref(), Some("false"));
    }

    #[test]
    fn test_closest_with_attribute_walks_up() {
        let doc = Document::new();
        let outer = doc.create_element("div");
        doc.set_attribute(outer, "data-x", "");
        let inner = doc.create_element("span");
        doc.append_child(doc.body(), outer).expect("append");
        doc.append_child(outer, inner).expect("append");
        assert_eq!(closest_with_attribute(&doc, inner, "data-x"), Some(outer));
        assert_eq!(closest_with_attribute(&doc, inner, "data-y"), None);
    }
}
