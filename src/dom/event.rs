//! Event types and listener options.

use std::any::Any;
use std::fmt;
use std::rc::Rc;

use bitflags::bitflags;

use super::abort::AbortSignal;
use super::tree::NodeId;
use crate::types::Modifiers;

// =============================================================================
// LISTENERS
// =============================================================================

/// Event listener callback.
pub type Listener = Rc<dyn Fn(&mut Event)>;

/// Wrap a closure as a [`Listener`].
pub fn listener(f: impl Fn(&mut Event) + 'static) -> Listener {
    Rc::new(f)
}

/// Identity of a registered listener, used for removal.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(pub(crate) u64);

bitflags! {
    /// Listener registration flags.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct ListenerFlags: u8 {
        /// Invoke during the capture phase instead of the bubble phase.
        const CAPTURE = 1 << 0;
        /// Remove after the first invocation.
        const ONCE = 1 << 1;
        /// `prevent_default` is ignored while this listener runs.
        const PASSIVE = 1 << 2;
    }
}

/// Options for `Document::add_event_listener`.
///
/// A bare `bool` converts to the capture flag, mirroring the platform's
/// `useCapture` shorthand.
#[derive(Debug, Clone, Default)]
pub struct ListenerOptions {
    pub flags: ListenerFlags,
    /// Remove the listener when this signal aborts.
    pub signal: Option<AbortSignal>,
}

impl ListenerOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn capture(mut self, capture: bool) -> Self {
        self.flags.set(ListenerFlags::CAPTURE, capture);
        self
    }

    pub fn once(mut self) -> Self {
        self.flags.insert(ListenerFlags::ONCE);
        self
    }

    pub fn passive(mut self) -> Self {
        self.flags.insert(ListenerFlags::PASSIVE);
        self
    }

    pub fn signal(mut self, signal: AbortSignal) -> Self {
        self.signal = Some(signal);
        self
    }

    pub fn is_capture(&self) -> bool {
        self.flags.contains(ListenerFlags::CAPTURE)
    }
}

impl From<bool> for ListenerOptions {
    fn from(capture: bool) -> Self {
        Self::new().capture(capture)
    }
}

impl From<ListenerFlags> for ListenerOptions {
    fn from(flags: ListenerFlags) -> Self {
        Self {
            flags,
            signal: None,
        }
    }
}

// =============================================================================
// EVENT PAYLOADS
// =============================================================================

/// Mouse button
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MouseButton {
    #[default]
    Left,
    Middle,
    Right,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MouseData {
    pub client_x: f64,
    pub client_y: f64,
    pub button: MouseButton,
    pub modifiers: Modifiers,
}

#[derive(Debug, Clone, PartialEq)]
pub struct KeyData {
    /// DOM key name (e.g. "a", "Enter", "Escape")
    pub key: String,
    pub modifiers: Modifiers,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub enum EventKind {
    #[default]
    Basic,
    Mouse(MouseData),
    Keyboard(KeyData),
}

/// Construction flags. `None` falls back to the constructor's default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EventInit {
    pub bubbles: Option<bool>,
    pub cancelable: Option<bool>,
}

impl EventInit {
    pub fn bubbles(mut self, bubbles: bool) -> Self {
        self.bubbles = Some(bubbles);
        self
    }

    pub fn cancelable(mut self, cancelable: bool) -> Self {
        self.cancelable = Some(cancelable);
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EventPhase {
    #[default]
    None,
    Capturing,
    AtTarget,
    Bubbling,
}

// =============================================================================
// EVENT
// =============================================================================

/// A dispatched event.
pub struct Event {
    event_type: String,
    bubbles: bool,
    cancelable: bool,
    kind: EventKind,
    detail: Option<Rc<dyn Any>>,
    pub(crate) target: Option<NodeId>,
    pub(crate) current_target: Option<NodeId>,
    pub(crate) phase: EventPhase,
    pub(crate) in_passive_listener: bool,
    pub(crate) propagation_stopped: bool,
    pub(crate) immediate_stopped: bool,
    default_prevented: bool,
}

impl Event {
    /// Plain event; bubbles and cancelable default to false.
    pub fn new(event_type: impl Into<String>, init: EventInit) -> Self {
        Self {
            event_type: event_type.into(),
            bubbles: init.bubbles.unwrap_or(false),
            cancelable: init.cancelable.unwrap_or(false),
            kind: EventKind::Basic,
            detail: None,
            target: None,
            current_target: None,
            phase: EventPhase::None,
            in_passive_listener: false,
            propagation_stopped: false,
            immediate_stopped: false,
            default_prevented: false,
        }
    }

    /// Custom event carrying a typed `detail`.
    pub fn custom<T: Any>(event_type: impl Into<String>, detail: T, init: EventInit) -> Self {
        let mut event = Self::new(event_type, init);
        event.detail = Some(Rc::new(detail));
        event
    }

    /// Bubbling, cancelable mouse event.
    pub fn mouse(event_type: impl Into<String>, client_x: f64, client_y: f64) -> Self {
        let mut event = Self::new(event_type, EventInit::default().bubbles(true).cancelable(true));
        event.kind = EventKind::Mouse(MouseData {
            client_x,
            client_y,
            button: MouseButton::Left,
            modifiers: Modifiers::default(),
        });
        event
    }

    /// Bubbling, cancelable keyboard event.
    pub fn keyboard(event_type: impl Into<String>, key: impl Into<String>, modifiers: Modifiers) -> Self {
        let mut event = Self::new(event_type, EventInit::default().bubbles(true).cancelable(true));
        event.kind = EventKind::Keyboard(KeyData {
            key: key.into(),
            modifiers,
        });
        event
    }

    pub fn event_type(&self) -> &str {
        &self.event_type
    }

    pub fn bubbles(&self) -> bool {
        self.bubbles
    }

    pub fn cancelable(&self) -> bool {
        self.cancelable
    }

    pub fn kind(&self) -> &EventKind {
        &self.kind
    }

    pub fn target(&self) -> Option<NodeId> {
        self.target
    }

    pub fn current_target(&self) -> Option<NodeId> {
        self.current_target
    }

    pub fn phase(&self) -> EventPhase {
        self.phase
    }

    /// Downcast the custom-event detail.
    pub fn detail<T: Any>(&self) -> Option<&T> {
        self.detail.as_deref().and_then(|d| d.downcast_ref::<T>())
    }

    pub fn has_detail(&self) -> bool {
        self.detail.is_some()
    }

    /// Key name for keyboard events.
    pub fn key(&self) -> Option<&str> {
        match &self.kind {
            EventKind::Keyboard(data) => Some(&data.key),
            _ => None,
        }
    }

    /// Client coordinates for mouse events.
    pub fn client_point(&self) -> Option<(f64, f64)> {
        match &self.kind {
            EventKind::Mouse(data) => Some((data.client_x, data.client_y)),
            _ => None,
        }
    }

    pub fn prevent_default(&mut self) {
        if self.cancelable && !self.in_passive_listener {
            self.default_prevented = true;
        }
    }

    pub fn default_prevented(&self) -> bool {
        self.default_prevented
    }

    pub fn stop_propagation(&mut self) {
        self.propagation_stopped = true;
    }

    pub fn stop_immediate_propagation(&mut self) {
        self.propagation_stopped = true;
        self.immediate_stopped = true;
    }
}

impl fmt::Debug for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Event")
            .field("type", &self.event_type)
            .field("bubbles", &self.bubbles)
            .field("cancelable", &self.cancelable)
            .field("kind", &self.kind)
            .field("has_detail", &self.detail.is_some())
            .field("target", &self.target)
            .field("phase", &self.phase)
            .field("default_prevented", &self.default_prevented)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prevent_default_requires_cancelable() {
        let mut plain = Event::new("x", EventInit::default());
        plain.prevent_default();
        assert!(!plain.default_prevented());

        let mut cancelable = Event::new("x", EventInit::default().cancelable(true));
        cancelable.prevent_default();
        assert!(cancelable.default_prevented());
    }

    #[test]
    fn test_passive_listener_ignores_prevent_default() {
        let mut event = Event::new("x", EventInit::default().cancelable(true));
        event.in_passive_listener = true;
        event.prevent_default();
        assert!(!event.default_prevented());
    }

    #[test]
    fn test_detail_downcast() {
        let event = Event::custom("x", 42u32, EventInit::default());
        assert_eq!(event.detail::<u32>(), Some(&42));
        assert!(event.detail::<String>().is_none());
    }

    #[test]
    fn test_bool_options_set_capture() {
        assert!(ListenerOptions::from(true).is_capture());
        assert!(!ListenerOptions::from(false).is_capture());
        let opts = ListenerOptions::new().once().passive();
        assert!(opts.flags.contains(ListenerFlags::ONCE | ListenerFlags::PASSIVE));
    }
}
