//! Presentation surfaces.
//!
//! The controller's state machine is the same for every element; only the
//! mechanics of showing and hiding differ:
//! - [`NativeDialog`] drives a `<dialog>` through `show_modal` / `show`
//! - [`Overlay`] toggles attributes and styles on a plain element and
//!   synthesizes a backdrop

use tracing::debug;

use super::options::ResolvedRevealOptions;
use super::{ATTR_BACKDROP_FOR, ATTR_OPEN};
use crate::dom::{Document, NodeId};
use crate::error::DomError;

pub(crate) trait Surface {
    /// True for native dialogs.
    fn is_native(&self) -> bool;

    /// Open state found at mount time.
    fn initially_open(&self, doc: &Document, element: NodeId) -> bool;

    /// Mount-time ARIA and visibility setup.
    fn prepare(&self, doc: &Document, element: NodeId, options: &ResolvedRevealOptions, open: bool);

    /// Show the element. Returns the backdrop, if one was created.
    fn present(
        &self,
        doc: &Document,
        element: NodeId,
        id: &str,
        options: &ResolvedRevealOptions,
    ) -> Result<Option<NodeId>, DomError>;

    /// Ask the platform to dismiss. Best effort.
    fn dismiss(&self, doc: &Document, element: NodeId);

    /// Visual state after a close has been finalized.
    fn conceal(&self, doc: &Document, element: NodeId);
}

/// Pick the surface for `element`.
pub(crate) fn surface_for(doc: &Document, element: NodeId) -> Box<dyn Surface> {
    if doc.is_dialog(element) {
        Box::new(NativeDialog)
    } else {
        Box::new(Overlay)
    }
}

fn aria_bool(value: bool) -> &'static str {
    if value { "true" } else { "false" }
}

// =============================================================================
// NATIVE DIALOG
// =============================================================================

pub(crate) struct NativeDialog;

impl Surface for NativeDialog {
    fn is_native(&self) -> bool {
        true
    }

    fn initially_open(&self, doc: &Document, element: NodeId) -> bool {
        doc.dialog_open(element)
    }

    fn prepare(&self, doc: &Document, element: NodeId, options: &ResolvedRevealOptions, _open: bool) {
        doc.set_attribute(element, "aria-modal", aria_bool(options.modal));
    }

    fn present(
        &self,
        doc: &Document,
        element: NodeId,
        _id: &str,
        options: &ResolvedRevealOptions,
    ) -> Result<Option<NodeId>, DomError> {
        let shown = if options.modal {
            doc.show_modal(element).or_else(|err| {
                debug!(?element, %err, "modal presentation failed, trying non-modal");
                doc.show(element)
            })
        } else {
            doc.show(element)
        };
        shown.map(|()| None)
    }

    fn dismiss(&self, doc: &Document, element: NodeId) {
        doc.close_dialog(element);
    }

    fn conceal(&self, _doc: &Document, _element: NodeId) {}
}

// =============================================================================
// OVERLAY
// =============================================================================

pub(crate) struct Overlay;

impl Overlay {
    fn create_backdrop(doc: &Document, id: &str) -> Result<NodeId, DomError> {
        let backdrop = doc.create_element("div");
        doc.set_attribute(backdrop, ATTR_BACKDROP_FOR, id);
        doc.set_style(backdrop, "position", "fixed");
        doc.set_style(backdrop, "inset", "0");
        doc.set_style(backdrop, "background", "rgba(0,0,0,0.5)");
        doc.set_style(backdrop, "z-index", "1000");
        if let Err(err) = doc.append_child(doc.body(), backdrop) {
            doc.discard(backdrop);
            return Err(err);
        }
        Ok(backdrop)
    }

    /// Centre the element unless the integrator positioned it already.
    fn position(doc: &Document, element: NodeId) {
        for (property, value) in [
            ("position", "fixed"),
            ("left", "50%"),
            ("top", "50%"),
            ("transform", "translate(-50%, -50%)"),
        ] {
            if doc.style(element, property).is_empty() {
                doc.set_style(element, property, value);
            }
        }
        doc.set_style(element, "z-index", "1001");
    }
}

impl Surface for Overlay {
    fn is_native(&self) -> bool {
        false
    }

    fn initially_open(&self, doc: &Document, element: NodeId) -> bool {
        doc.has_attribute(element, ATTR_OPEN)
    }

    fn prepare(&self, doc: &Document, element: NodeId, options: &ResolvedRevealOptions, open: bool) {
        if !doc.has_attribute(element, "role") {
            doc.set_attribute(element, "role", "dialog");
        }
        doc.set_attribute(element, "aria-modal", aria_bool(options.modal));
        doc.set_attribute(element, "aria-hidden", aria_bool(!open));
        if !open {
            doc.set_style(element, "display", "none");
        }
    }

    fn present(
        &self,
        doc: &Document,
        element: NodeId,
        id: &str,
        _options: &ResolvedRevealOptions,
    ) -> Result<Option<NodeId>, DomError> {
        let backdrop = Self::create_backdrop(doc, id)?;
        doc.set_attribute(element, ATTR_OPEN, "");
        doc.set_attribute(element, "aria-hidden", "false");
        doc.set_style(element, "display", "");
        Self::position(doc, element);
        Ok(Some(backdrop))
    }

    fn dismiss(&self, _doc: &Document, _element: NodeId) {}

    fn conceal(&self, doc: &Document, element: NodeId) {
        doc.remove_attribute(element, ATTR_OPEN);
        doc.set_attribute(element, "aria-hidden", "true");
        doc.set_style(element, "display", "none");
    }
}
