//! Error types.
//!
//! Three layers:
//! - [`DomError`] - document operations refused by the host model
//! - [`PluginError`] - a plugin's mount routine failed
//! - [`FoundationError`] - what `Foundation::init` hands back to the integrator
//!
//! Teardown and focus-restoration failures never surface here; they are
//! absorbed where they happen and logged.

use std::error::Error as StdError;
use std::fmt;

use crate::dom::NodeId;

/// A selector string that could not be parsed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid selector `{selector}`")]
pub struct SelectorError {
    pub selector: String,
}

impl SelectorError {
    pub fn new(selector: impl Into<String>) -> Self {
        Self {
            selector: selector.into(),
        }
    }
}

/// Document operation failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DomError {
    /// The node id refers to a slot that was freed or reused.
    #[error("node {0:?} no longer exists")]
    StaleNode(NodeId),

    /// Inserting the node would create a cycle or target a non-element.
    #[error("cannot insert {child:?} under {parent:?}")]
    HierarchyRequest { parent: NodeId, child: NodeId },

    /// The operation is not valid in the node's current state.
    #[error("invalid state: {0}")]
    InvalidState(&'static str),

    /// The platform does not support the operation.
    #[error("not supported: {0}")]
    NotSupported(&'static str),

    /// Focus was requested on a node that cannot take it.
    #[error("node {0:?} is not focusable")]
    NotFocusable(NodeId),

    #[error(transparent)]
    Selector(#[from] SelectorError),
}

/// Failure raised by a plugin's `mount`.
#[derive(Debug, thiserror::Error)]
#[error("{message}")]
pub struct PluginError {
    message: String,
    #[source]
    source: Option<Box<dyn StdError + 'static>>,
}

impl PluginError {
    /// Wrap an underlying error with a message.
    pub fn new(message: impl Into<String>, source: impl StdError + 'static) -> Self {
        Self {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// A plain message with no underlying cause.
    pub fn msg(message: impl fmt::Display) -> Self {
        Self {
            message: message.to_string(),
            source: None,
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl From<DomError> for PluginError {
    fn from(err: DomError) -> Self {
        Self::new("document operation failed during mount", err)
    }
}

/// Errors returned from the lifecycle engine.
#[derive(Debug, thiserror::Error)]
pub enum FoundationError {
    #[error("plugin `{plugin}` failed to mount on {element:?}")]
    Mount {
        plugin: String,
        element: NodeId,
        #[source]
        source: PluginError,
    },

    #[error("plugin `{plugin}` has an invalid selector")]
    Selector {
        plugin: String,
        #[source]
        source: SelectorError,
    },
}

impl FoundationError {
    /// Name of the plugin that caused the failure.
    pub fn plugin(&self) -> &str {
        match self {
            Self::Mount { plugin, .. } | Self::Selector { plugin, .. } => plugin,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plugin_error_keeps_source() {
        let err = PluginError::new("boom", SelectorError::new("[["));
        assert_eq!(err.to_string(), "boom");
        let source = err.source().map(|s| s.to_string());
        assert_eq!(source.as_deref(), Some("invalid selector `[[`"));
    }

    #[test]
    fn test_plugin_error_msg_has_no_source() {
        let err = PluginError::msg("nope");
        assert_eq!(err.message(), "nope");
        assert!(err.source().is_none());
    }
}
