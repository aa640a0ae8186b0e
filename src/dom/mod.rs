//! Host document model.
//!
//! A single-threaded document tree the framework attaches behaviors to:
//! - Tree: generational node arena, attributes, inline styles, rectangles
//! - Selectors: parsing and matching for plugin discovery and focus queries
//! - Events: capture/target/bubble dispatch with abortable listeners
//! - Dialogs: native `<dialog>` presentation and the top layer
//! - Scheduling: microtask and task queues
//!
//! # Architecture
//!
//! Nodes are NOT objects. They are indices into an arena owned by the
//! [`Document`]:
//!
//! ```text
//! NodeId(0): #document (parent=None)
//! NodeId(1): <html>    (parent=0)
//! NodeId(2): <body>    (parent=1)
//! NodeId(3): <dialog>  (parent=2, open, modal)
//! ```

pub mod abort;
mod dialog;
mod document;
pub mod event;
mod events;
pub mod selector;
mod tree;

pub use abort::{AbortController, AbortSignal};
pub use dialog::DialogSupport;
pub use document::{Document, WeakDocument};
pub use event::{
    Event, EventInit, EventKind, EventPhase, KeyData, Listener, ListenerFlags, ListenerId,
    ListenerOptions, MouseButton, MouseData, listener,
};
pub use selector::Selector;
pub use tree::NodeId;
