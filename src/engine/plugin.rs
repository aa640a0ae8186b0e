//! Plugin descriptors.
//!
//! A plugin is a name, one or more selectors, and a `mount` routine. Mount
//! wires listeners through the [`PluginContext`] and may hand back a
//! controller implementing [`PluginInstance`].
//!
//! # Example
//!
//! ```ignore
//! use spark_foundation::engine::define_plugin;
//!
//! let tooltip = define_plugin("tooltip", "[data-tooltip]", |element, ctx| {
//!     ctx.on(element, "focus", listener(|_| { /* ... */ }), false);
//!     Ok(None)
//! });
//! ```

use std::any::Any;
use std::fmt;
use std::rc::Rc;

use super::context::PluginContext;
use crate::dom::NodeId;
use crate::error::PluginError;

/// Result of a plugin's `mount`.
pub type MountResult = Result<Option<Rc<dyn PluginInstance>>, PluginError>;

// =============================================================================
// SELECTORS
// =============================================================================

/// One or more selector patterns a plugin mounts on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PluginSelector {
    One(String),
    Many(Vec<String>),
}

impl PluginSelector {
    /// Patterns in scan order.
    pub fn patterns(&self) -> &[String] {
        match self {
            Self::One(pattern) => std::slice::from_ref(pattern),
            Self::Many(patterns) => patterns,
        }
    }
}

impl From<&str> for PluginSelector {
    fn from(pattern: &str) -> Self {
        Self::One(pattern.to_string())
    }
}

impl From<String> for PluginSelector {
    fn from(pattern: String) -> Self {
        Self::One(pattern)
    }
}

impl From<Vec<String>> for PluginSelector {
    fn from(patterns: Vec<String>) -> Self {
        Self::Many(patterns)
    }
}

impl<const N: usize> From<[&str; N]> for PluginSelector {
    fn from(patterns: [&str; N]) -> Self {
        Self::Many(patterns.iter().map(|p| p.to_string()).collect())
    }
}

// =============================================================================
// TRAITS
// =============================================================================

/// Controller handed back from `mount`.
///
/// `destroy` runs after the context's listeners are gone.
pub trait PluginInstance {
    fn destroy(&self) {}

    /// Downcast hook for `Foundation::instance`.
    fn as_any(&self) -> &dyn Any;
}

/// A reusable behavior attached to matching elements.
pub trait Plugin {
    /// Unique key. At most one instance per (element, name).
    fn name(&self) -> &str;

    fn selector(&self) -> PluginSelector;

    fn mount(&self, element: NodeId, ctx: &PluginContext) -> MountResult;
}

// =============================================================================
// CLOSURE-BACKED PLUGIN
// =============================================================================

type MountFn = dyn Fn(NodeId, &PluginContext) -> MountResult;

/// Plugin built from a closure. See [`define_plugin`].
pub struct FnPlugin {
    name: String,
    selector: PluginSelector,
    mount: Box<MountFn>,
}

impl Plugin for FnPlugin {
    fn name(&self) -> &str {
        &self.name
    }

    fn selector(&self) -> PluginSelector {
        self.selector.clone()
    }

    fn mount(&self, element: NodeId, ctx: &PluginContext) -> MountResult {
        (self.mount)(element, ctx)
    }
}

impl fmt::Debug for FnPlugin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnPlugin")
            .field("name", &self.name)
            .field("selector", &self.selector)
            .finish()
    }
}

/// Build a plugin from a name, selector(s) and mount closure.
pub fn define_plugin(
    name: impl Into<String>,
    selector: impl Into<PluginSelector>,
    mount: impl Fn(NodeId, &PluginContext) -> MountResult + 'static,
) -> Rc<dyn Plugin> {
    Rc::new(FnPlugin {
        name: name.into(),
        selector: selector.into(),
        mount: Box::new(mount),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_selector_patterns() {
        assert_eq!(PluginSelector::from("[a]").patterns(), ["[a]".to_string()]);
        let many = PluginSelector::from(["[a]", ".b"]);
        assert_eq!(many.patterns().len(), 2);
        assert_eq!(many.patterns()[1], ".b");
    }

    #[test]
    fn test_define_plugin_keeps_name_and_selector() {
        let plugin = define_plugin("noop", "[data-noop]", |_, _| Ok(None));
        assert_eq!(plugin.name(), "noop");
        assert_eq!(plugin.selector(), PluginSelector::One("[data-noop]".into()));
    }
}
