//! Per-mount interaction context.
//!
//! Every listener registered through [`PluginContext::on`] is bound to the
//! context's abort signal, so tearing the mount down removes all of them in
//! one step regardless of how many targets they were spread over.

use std::any::Any;
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use tracing::trace;

use crate::dom::{
    AbortController, AbortSignal, Document, Event, EventInit, Listener, ListenerId,
    ListenerOptions, NodeId,
};

type Cleanup = Box<dyn FnOnce()>;

struct ContextInner {
    document: Document,
    element: NodeId,
    controller: AbortController,
    cleanups: RefCell<Vec<Cleanup>>,
}

/// Handle given to a plugin's `mount`. Cloning shares the same context.
#[derive(Clone)]
pub struct PluginContext {
    inner: Rc<ContextInner>,
}

impl PluginContext {
    pub(crate) fn new(document: Document, element: NodeId) -> Self {
        Self {
            inner: Rc::new(ContextInner {
                document,
                element,
                controller: AbortController::new(),
                cleanups: RefCell::new(Vec::new()),
            }),
        }
    }

    /// Aborts when the instance is destroyed. Plugins can observe it but
    /// cannot trigger it.
    pub fn signal(&self) -> AbortSignal {
        self.inner.controller.signal().clone()
    }

    pub fn document(&self) -> &Document {
        &self.inner.document
    }

    /// The element this context was created for.
    pub fn element(&self) -> NodeId {
        self.inner.element
    }

    /// Register an extra teardown step. Steps run in registration order.
    pub fn add_cleanup(&self, cleanup: impl FnOnce() + 'static) {
        self.inner.cleanups.borrow_mut().push(Box::new(cleanup));
    }

    /// Add a listener that is removed when the context is torn down.
    ///
    /// `options` may be a bare `bool` (capture) or [`ListenerOptions`]. A
    /// caller-supplied signal keeps working alongside the context's own.
    pub fn on(
        &self,
        target: NodeId,
        event_type: &str,
        listener: Listener,
        options: impl Into<ListenerOptions>,
    ) -> Option<ListenerId> {
        let mut options = options.into();
        let capture = options.is_capture();
        let caller_signal = options.signal.replace(self.signal());
        if caller_signal.as_ref().is_some_and(AbortSignal::aborted) {
            return None;
        }

        let doc = &self.inner.document;
        let id = doc.add_event_listener(target, event_type, listener, options)?;

        if let Some(signal) = caller_signal {
            let weak = doc.downgrade();
            let event_type = event_type.to_string();
            signal.on_abort(move || {
                if let Some(doc) = weak.upgrade() {
                    doc.remove_event_listener(target, &event_type, id, capture);
                }
            });
        }

        let weak = doc.downgrade();
        let event_type = event_type.to_string();
        self.add_cleanup(move || {
            if let Some(doc) = weak.upgrade() {
                doc.remove_event_listener(target, &event_type, id, capture);
            }
        });
        Some(id)
    }

    /// Dispatch a custom event carrying `detail`.
    ///
    /// Bubbles and is not cancelable unless `init` says otherwise. Returns
    /// false if a listener prevented the default.
    pub fn emit<T: Any>(&self, target: NodeId, event_type: &str, detail: T, init: EventInit) -> bool {
        let init = EventInit {
            bubbles: Some(init.bubbles.unwrap_or(true)),
            cancelable: Some(init.cancelable.unwrap_or(false)),
        };
        trace!(?target, event_type, "emit");
        self.inner
            .document
            .dispatch_event(target, Event::custom(event_type, detail, init))
    }

    pub(crate) fn abort(&self) {
        self.inner.controller.abort();
    }

    #[cfg(test)]
    pub(crate) fn cleanup_count(&self) -> usize {
        self.inner.cleanups.borrow().len()
    }

    pub(crate) fn take_cleanups(&self) -> Vec<Cleanup> {
        std::mem::take(&mut *self.inner.cleanups.borrow_mut())
    }
}

impl fmt::Debug for PluginContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PluginContext")
            .field("element", &self.inner.element)
            .field("aborted", &self.inner.controller.signal().aborted())
            .field("cleanups", &self.inner.cleanups.borrow().len())
            .finish()
    }
}
