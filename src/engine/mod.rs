//! Plugin Engine - Lifecycle, mount registry and interaction contexts.
//!
//! The engine manages behavior attachment:
//! - Plugin: descriptor trait (name, selectors, mount)
//! - Context: per-mount abort signal, cleanups, listener registration, emit
//! - Registry: at most one live instance per (element, plugin name)
//! - App: `Foundation`, scanning the document and driving teardown
//!
//! # Architecture
//!
//! Instances are NOT stored on elements. The registry keeps a side table
//! keyed by generational node ids:
//!
//! ```text
//! NodeId(5) -> { "reveal" -> #0, "tooltip" -> #3 }
//! NodeId(9) -> { "reveal" -> #1 }
//! ```
//!
//! Destroy-all walks the instance sequence numbers in creation order.

mod app;
mod context;
mod plugin;
mod registry;

pub use app::Foundation;
pub use context::PluginContext;
pub use plugin::{FnPlugin, MountResult, Plugin, PluginInstance, PluginSelector, define_plugin};
pub use registry::MountRegistry;
