//! Native `<dialog>` semantics.
//!
//! - `show` / `show_modal` / `close_dialog` with platform failure modes
//! - modal dialogs join the top layer (hit testing and Escape handling)
//! - closing queues a non-bubbling `close` event as a task

use tracing::trace;

use super::document::Document;
use super::tree::NodeId;
use crate::error::DomError;

/// How much of the dialog API the host platform provides.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DialogSupport {
    #[default]
    Full,
    /// `show` works, `show_modal` does not.
    NonModalOnly,
    /// Neither presentation call works.
    Unsupported,
}

impl Document {
    pub fn set_dialog_support(&self, support: DialogSupport) {
        self.inner.dialog_support.set(support);
    }

    pub fn dialog_support(&self) -> DialogSupport {
        self.inner.dialog_support.get()
    }

    /// Whether `node` is a `<dialog>` element.
    pub fn is_dialog(&self, node: NodeId) -> bool {
        self.tag_name(node).as_deref() == Some("dialog")
    }

    /// The dialog's open state (reflects the `open` attribute).
    pub fn dialog_open(&self, node: NodeId) -> bool {
        self.is_dialog(node) && self.has_attribute(node, "open")
    }

    pub fn dialog_is_modal(&self, node: NodeId) -> bool {
        self.inner
            .tree
            .borrow()
            .get(node)
            .is_some_and(|n| n.dialog_modal)
    }

    /// Topmost modal dialog, if any.
    pub fn top_modal(&self) -> Option<NodeId> {
        self.inner.top_layer.borrow().last().copied()
    }

    fn check_dialog(&self, node: NodeId) -> Result<(), DomError> {
        if !self.exists(node) {
            return Err(DomError::StaleNode(node));
        }
        if !self.is_dialog(node) {
            return Err(DomError::NotSupported("element is not a dialog"));
        }
        Ok(())
    }

    /// Show non-modally.
    pub fn show(&self, node: NodeId) -> Result<(), DomError> {
        self.check_dialog(node)?;
        if self.dialog_support() == DialogSupport::Unsupported {
            return Err(DomError::NotSupported("dialogs"));
        }
        if self.dialog_open(node) {
            if self.dialog_is_modal(node) {
                return Err(DomError::InvalidState("dialog is open modally"));
            }
            return Ok(());
        }
        self.set_attribute(node, "open", "");
        trace!(?node, "dialog shown");
        Ok(())
    }

    /// Show modally, entering the top layer.
    pub fn show_modal(&self, node: NodeId) -> Result<(), DomError> {
        self.check_dialog(node)?;
        if self.dialog_support() != DialogSupport::Full {
            return Err(DomError::NotSupported("modal dialogs"));
        }
        if self.dialog_open(node) {
            if self.dialog_is_modal(node) {
                return Ok(());
            }
            return Err(DomError::InvalidState("dialog is already open"));
        }
        if !self.is_connected(node) {
            return Err(DomError::InvalidState("dialog is not connected"));
        }
        self.set_attribute(node, "open", "");
        if let Some(n) = self.inner.tree.borrow_mut().get_mut(node) {
            n.dialog_modal = true;
        }
        self.inner.top_layer.borrow_mut().push(node);
        trace!(?node, "dialog shown modally");
        Ok(())
    }

    /// Close the dialog. The `close` event follows as a queued task.
    pub fn close_dialog(&self, node: NodeId) {
        if !self.dialog_open(node) {
            return;
        }
        self.remove_attribute(node, "open");
        if let Some(n) = self.inner.tree.borrow_mut().get_mut(node) {
            n.dialog_modal = false;
        }
        self.inner.top_layer.borrow_mut().retain(|d| *d != node);

        let weak = self.downgrade();
        self.queue_task(move || {
            if let Some(doc) = weak.upgrade() {
                doc.fire(node, "close", false);
            }
        });
        trace!(?node, "dialog closed");
    }

    /// Platform dismissal request (Escape): `cancel`, then close unless
    /// the cancel was prevented.
    pub(crate) fn request_dialog_cancel(&self, node: NodeId) {
        if !self.dialog_open(node) {
            return;
        }
        if self.fire(node, "cancel", true) {
            self.close_dialog(node);
        }
    }
}
