//! Event listener registry and dispatch.
//!
//! - `add_event_listener` / `remove_event_listener` - per-node handler lists
//! - `dispatch_event` - capture, target, bubble
//! - `press_key`, `click`, `click_at` - platform input with default actions
//!
//! Listener lists are snapshotted before a phase runs, so handlers may add or
//! remove listeners (or mutate the tree) freely. A listener removed mid
//! dispatch is never invoked afterwards.

use std::cell::Cell;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::rc::Rc;

use tracing::{error, trace};

use super::document::Document;
use super::event::{Event, EventInit, EventPhase, Listener, ListenerFlags, ListenerId, ListenerOptions};
use super::tree::NodeId;
use crate::types::Modifiers;

pub(crate) struct ListenerEntry {
    pub id: ListenerId,
    pub event_type: String,
    pub callback: Listener,
    pub flags: ListenerFlags,
    pub removed: Cell<bool>,
}

impl ListenerEntry {
    fn capture(&self) -> bool {
        self.flags.contains(ListenerFlags::CAPTURE)
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum PhaseFilter {
    CaptureOnly,
    All,
    BubbleOnly,
}

impl Document {
    // =========================================================================
    // Registration
    // =========================================================================

    /// Register `listener` for `event_type` on `target`.
    ///
    /// Returns `None` when the target is gone or the options carry an
    /// already-aborted signal (nothing is registered in either case).
    pub fn add_event_listener(
        &self,
        target: NodeId,
        event_type: &str,
        listener: Listener,
        options: impl Into<ListenerOptions>,
    ) -> Option<ListenerId> {
        let options = options.into();
        if !self.exists(target) {
            return None;
        }
        if options.signal.as_ref().is_some_and(|s| s.aborted()) {
            return None;
        }

        let id = ListenerId(self.inner.next_listener.get());
        self.inner.next_listener.set(id.0 + 1);

        let capture = options.is_capture();
        self.inner
            .listeners
            .borrow_mut()
            .entry(target)
            .or_default()
            .push(Rc::new(ListenerEntry {
                id,
                event_type: event_type.to_string(),
                callback: listener,
                flags: options.flags,
                removed: Cell::new(false),
            }));

        if let Some(signal) = options.signal {
            let weak = self.downgrade();
            let event_type = event_type.to_string();
            signal.on_abort(move || {
                if let Some(doc) = weak.upgrade() {
                    doc.remove_event_listener(target, &event_type, id, capture);
                }
            });
        }

        trace!(?target, event_type, ?id, capture, "listener added");
        Some(id)
    }

    /// Remove a listener. All of target, type, id and capture flag must match.
    pub fn remove_event_listener(
        &self,
        target: NodeId,
        event_type: &str,
        id: ListenerId,
        capture: bool,
    ) -> bool {
        let mut listeners = self.inner.listeners.borrow_mut();
        let Some(entries) = listeners.get_mut(&target) else {
            return false;
        };
        let Some(pos) = entries
            .iter()
            .position(|e| e.id == id && e.event_type == event_type && e.capture() == capture)
        else {
            return false;
        };
        let entry = entries.remove(pos);
        entry.removed.set(true);
        if entries.is_empty() {
            listeners.remove(&target);
        }
        true
    }

    /// Number of listeners registered on `target`.
    pub fn listener_count(&self, target: NodeId) -> usize {
        self.inner
            .listeners
            .borrow()
            .get(&target)
            .map_or(0, Vec::len)
    }

    /// Number of listeners registered across the whole document.
    pub fn total_listener_count(&self) -> usize {
        self.inner.listeners.borrow().values().map(Vec::len).sum()
    }

    // =========================================================================
    // Dispatch
    // =========================================================================

    /// Dispatch `event` at `target`. Returns false if the default was
    /// prevented.
    ///
    /// The outermost dispatch performs a microtask checkpoint before
    /// returning.
    pub fn dispatch_event(&self, target: NodeId, mut event: Event) -> bool {
        if !self.exists(target) {
            return true;
        }
        event.target = Some(target);
        let path = self.inner.tree.borrow().inclusive_ancestors(target);

        self.inner
            .dispatch_depth
            .set(self.inner.dispatch_depth.get() + 1);

        // Capture: root down to the target's parent
        event.phase = EventPhase::Capturing;
        for node in path.iter().skip(1).rev() {
            self.invoke(*node, &mut event, PhaseFilter::CaptureOnly);
            if event.propagation_stopped {
                break;
            }
        }

        if !event.propagation_stopped {
            event.phase = EventPhase::AtTarget;
            self.invoke(target, &mut event, PhaseFilter::All);
        }

        if event.bubbles() && !event.propagation_stopped {
            event.phase = EventPhase::Bubbling;
            for node in path.iter().skip(1) {
                self.invoke(*node, &mut event, PhaseFilter::BubbleOnly);
                if event.propagation_stopped {
                    break;
                }
            }
        }

        event.phase = EventPhase::None;
        event.current_target = None;

        let depth = self.inner.dispatch_depth.get() - 1;
        self.inner.dispatch_depth.set(depth);
        if depth == 0 {
            self.perform_microtask_checkpoint();
        }

        !event.default_prevented()
    }

    fn invoke(&self, node: NodeId, event: &mut Event, filter: PhaseFilter) {
        let snapshot: Vec<Rc<ListenerEntry>> = {
            let listeners = self.inner.listeners.borrow();
            let Some(entries) = listeners.get(&node) else {
                return;
            };
            entries
                .iter()
                .filter(|e| e.event_type == event.event_type())
                .filter(|e| match filter {
                    PhaseFilter::CaptureOnly => e.capture(),
                    PhaseFilter::BubbleOnly => !e.capture(),
                    PhaseFilter::All => true,
                })
                .cloned()
                .collect()
        };

        event.current_target = Some(node);
        for entry in snapshot {
            if entry.removed.get() {
                continue;
            }
            if entry.flags.contains(ListenerFlags::ONCE) {
                self.remove_event_listener(node, &entry.event_type, entry.id, entry.capture());
            }

            event.in_passive_listener = entry.flags.contains(ListenerFlags::PASSIVE);
            let callback = entry.callback.clone();
            let outcome = catch_unwind(AssertUnwindSafe(|| callback(&mut *event)));
            event.in_passive_listener = false;

            // A throwing listener is reported; dispatch carries on.
            if outcome.is_err() {
                error!(?node, event_type = event.event_type(), "event listener panicked");
            }
            if event.immediate_stopped {
                break;
            }
        }
    }

    // =========================================================================
    // Platform Input
    // =========================================================================

    /// Press a key at the focused element (or body).
    ///
    /// Default action for `Escape`: the topmost modal dialog receives a
    /// cancelable `cancel` and closes unless it is prevented.
    pub fn press_key(&self, key: &str) -> bool {
        self.press_key_with(key, Modifiers::default())
    }

    pub fn press_key_with(&self, key: &str, modifiers: Modifiers) -> bool {
        let target = self.active_element().unwrap_or_else(|| self.body());
        let not_prevented = self.dispatch_event(target, Event::keyboard("keydown", key, modifiers));
        if not_prevented && key == "Escape" {
            if let Some(dialog) = self.top_modal() {
                self.request_dialog_cancel(dialog);
            }
        }
        not_prevented
    }

    /// Click `target` at client coordinates.
    pub fn click(&self, target: NodeId, client_x: f64, client_y: f64) -> bool {
        self.dispatch_event(target, Event::mouse("click", client_x, client_y))
    }

    /// Hit-test the point and click whatever is there.
    pub fn click_at(&self, client_x: f64, client_y: f64) -> Option<bool> {
        let target = self.element_at(client_x, client_y)?;
        Some(self.click(target, client_x, client_y))
    }

    /// Dispatch a plain non-bubbling event (e.g. `close`, `cancel`).
    pub fn fire(&self, target: NodeId, event_type: &str, cancelable: bool) -> bool {
        self.dispatch_event(
            target,
            Event::new(event_type, EventInit::default().cancelable(cancelable)),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::abort::AbortController;
    use crate::dom::event::listener;
    use std::cell::RefCell;

    fn setup() -> (Document, NodeId, NodeId) {
        let doc = Document::new();
        let outer = doc.create_element("div");
        let inner = doc.create_element("button");
        doc.append_child(doc.body(), outer).expect("append");
        doc.append_child(outer, inner).expect("append");
        (doc, outer, inner)
    }

    fn recorder(log: &Rc<RefCell<Vec<String>>>, label: &'static str) -> Listener {
        let log = log.clone();
        listener(move |e: &mut Event| log.borrow_mut().push(format!("{label}:{:?}", e.phase())))
    }

    #[test]
    fn test_capture_target_bubble_order() {
        let (doc, outer, inner) = setup();
        let log = Rc::new(RefCell::new(Vec::new()));

        doc.add_event_listener(outer, "click", recorder(&log, "outer-bubble"), false);
        doc.add_event_listener(outer, "click", recorder(&log, "outer-capture"), true);
        doc.add_event_listener(inner, "click", recorder(&log, "inner"), false);
        doc.add_event_listener(doc.root(), "click", recorder(&log, "doc"), false);

        assert!(doc.click(inner, 0.0, 0.0));
        assert_eq!(
            *log.borrow(),
            vec![
                "outer-capture:Capturing",
                "inner:AtTarget",
                "outer-bubble:Bubbling",
                "doc:Bubbling",
            ]
        );
    }

    #[test]
    fn test_non_bubbling_event_stays_at_target() {
        let (doc, outer, inner) = setup();
        let log = Rc::new(RefCell::new(Vec::new()));
        doc.add_event_listener(outer, "close", recorder(&log, "outer"), false);
        doc.add_event_listener(inner, "close", recorder(&log, "inner"), false);

        doc.fire(inner, "close", false);
        assert_eq!(*log.borrow(), vec!["inner:AtTarget"]);
    }

    #[test]
    fn test_stop_propagation() {
        let (doc, outer, inner) = setup();
        let reached = Rc::new(Cell::new(false));
        let reached_clone = reached.clone();

        doc.add_event_listener(inner, "click", listener(|e| e.stop_propagation()), false);
        doc.add_event_listener(
            outer,
            "click",
            listener(move |_| reached_clone.set(true)),
            false,
        );

        doc.click(inner, 0.0, 0.0);
        assert!(!reached.get());
    }

    #[test]
    fn test_prevent_default_reported() {
        let (doc, _outer, inner) = setup();
        doc.add_event_listener(doc.root(), "click", listener(|e| e.prevent_default()), false);
        assert!(!doc.click(inner, 0.0, 0.0));
    }

    #[test]
    fn test_once_listener() {
        let (doc, _outer, inner) = setup();
        let count = Rc::new(Cell::new(0));
        let count_clone = count.clone();
        doc.add_event_listener(
            inner,
            "click",
            listener(move |_| count_clone.set(count_clone.get() + 1)),
            ListenerOptions::new().once(),
        );
        doc.click(inner, 0.0, 0.0);
        doc.click(inner, 0.0, 0.0);
        assert_eq!(count.get(), 1);
        assert_eq!(doc.listener_count(inner), 0);
    }

    #[test]
    fn test_removal_requires_matching_capture() {
        let (doc, _outer, inner) = setup();
        let id = doc
            .add_event_listener(inner, "click", listener(|_| {}), true)
            .expect("registered");
        assert!(!doc.remove_event_listener(inner, "click", id, false));
        assert!(!doc.remove_event_listener(inner, "keydown", id, true));
        assert!(doc.remove_event_listener(inner, "click", id, true));
        assert_eq!(doc.listener_count(inner), 0);
    }

    #[test]
    fn test_abort_signal_removes_all_bound_listeners() {
        let (doc, outer, inner) = setup();
        let controller = AbortController::new();
        let count = Rc::new(Cell::new(0));

        for target in [outer, inner, doc.root()] {
            let count = count.clone();
            doc.add_event_listener(
                target,
                "click",
                listener(move |_| count.set(count.get() + 1)),
                ListenerOptions::new().signal(controller.signal().clone()),
            );
        }
        doc.click(inner, 0.0, 0.0);
        assert_eq!(count.get(), 3);

        controller.abort();
        assert_eq!(doc.total_listener_count(), 0);
        doc.click(inner, 0.0, 0.0);
        assert_eq!(count.get(), 3);

        // Already aborted: nothing registers
        let late = doc.add_event_listener(
            inner,
            "click",
            listener(|_| {}),
            ListenerOptions::new().signal(controller.signal().clone()),
        );
        assert!(late.is_none());
    }

    #[test]
    fn test_listener_removed_mid_dispatch_is_skipped() {
        let (doc, outer, inner) = setup();
        let fired = Rc::new(Cell::new(false));
        let fired_clone = fired.clone();

        let victim = doc
            .add_event_listener(outer, "click", listener(move |_| fired_clone.set(true)), false)
            .expect("registered");
        let doc_clone = doc.clone();
        doc.add_event_listener(
            inner,
            "click",
            listener(move |_| {
                doc_clone.remove_event_listener(outer, "click", victim, false);
            }),
            false,
        );

        doc.click(inner, 0.0, 0.0);
        assert!(!fired.get());
    }

    #[test]
    fn test_panicking_listener_does_not_stop_dispatch() {
        let (doc, outer, inner) = setup();
        let reached = Rc::new(Cell::new(false));
        let reached_clone = reached.clone();

        doc.add_event_listener(inner, "click", listener(|_| panic!("listener failure")), false);
        doc.add_event_listener(outer, "click", listener(move |_| reached_clone.set(true)), false);

        doc.click(inner, 0.0, 0.0);
        assert!(reached.get());
    }

    #[test]
    fn test_press_key_targets_focused_element() {
        let (doc, _outer, inner) = setup();
        let seen = Rc::new(RefCell::new(None));
        let seen_clone = seen.clone();
        doc.add_event_listener(
            doc.root(),
            "keydown",
            listener(move |e| {
                *seen_clone.borrow_mut() = e.target().zip(e.key().map(str::to_string));
            }),
            false,
        );

        doc.press_key("a");
        assert_eq!(*seen.borrow(), Some((doc.body(), "a".to_string())));

        doc.focus(inner).expect("focus");
        doc.press_key("Enter");
        assert_eq!(*seen.borrow(), Some((inner, "Enter".to_string())));
    }

    #[test]
    fn test_dispatch_flushes_microtasks() {
        let (doc, _outer, inner) = setup();
        let ran = Rc::new(Cell::new(false));
        let ran_clone = ran.clone();
        let doc_clone = doc.clone();
        doc.add_event_listener(
            inner,
            "click",
            listener(move |_| {
                let ran = ran_clone.clone();
                doc_clone.queue_microtask(move || ran.set(true));
            }),
            false,
        );
        doc.click(inner, 0.0, 0.0);
        assert!(ran.get());
    }
}
