//! # spark-foundation
//!
//! Plugin lifecycle manager and reveal/modal behavior for retained document
//! trees.
//!
//! ## Architecture
//!
//! Behaviors are plugins: a name, selectors, and a `mount` routine. The
//! [`Foundation`] scans a [`Document`] for matching elements and mounts each
//! plugin at most once per element. Everything a mount wires up goes through
//! its [`PluginContext`], so teardown removes it all in one step:
//!
//! ```text
//! Foundation::init → MountRegistry::mount → Plugin::mount(element, ctx)
//! Foundation::destroy → abort ctx → controller.destroy() → cleanups
//! ```
//!
//! ## Modules
//!
//! - [`dom`] - In-memory document: tree, selectors, events, dialogs, tasks
//! - [`engine`] - Plugins, contexts, mount registry, the `Foundation` app
//! - [`plugins`] - Built-in behaviors (`reveal`)
//! - [`state`] - Focus helpers, scroll lock, terminal input
//! - [`error`] - Error types
//! - [`types`] - Geometry and modifier types

pub mod dom;
pub mod engine;
pub mod error;
pub mod plugins;
pub mod state;
pub mod types;

// Re-export commonly used items
pub use types::*;

pub use dom::{
    AbortController, AbortSignal, DialogSupport, Document, Event, EventInit, ListenerFlags,
    ListenerOptions, NodeId, Selector, listener,
};

pub use engine::{
    Foundation, MountRegistry, Plugin, PluginContext, PluginInstance, PluginSelector, define_plugin,
};

pub use error::{DomError, FoundationError, PluginError, SelectorError};

pub use plugins::{RevealController, RevealDetail, RevealOptions, reveal};

pub use state::ScrollLock;
