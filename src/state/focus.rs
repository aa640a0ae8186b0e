//! Focus System - focusable queries and focus placement
//!
//! Helpers behaviors use to move focus inside a container:
//! - `focusable_elements` (document order, hidden and disabled skipped)
//! - `focus_first_match` for an integrator-supplied selector
//! - `focus_initial` for the open-time placement chain
//! - `restore_focus` for best-effort return to an opener
//!
//! # Example
//!
//! ```ignore
//! use spark_foundation::state::focus;
//!
//! // Focus `[autofocus]` inside the dialog, else its first focusable
//! // descendant, else the dialog itself.
//! focus::focus_initial(&doc, dialog, "[autofocus]");
//! ```

use tracing::trace;

use crate::dom::{Document, NodeId, Selector};

/// Candidates for initial focus inside a container.
pub const FOCUSABLE_SELECTOR: &str = "button:not([disabled]), [href], input:not([disabled]), \
     select:not([disabled]), textarea:not([disabled]), [tabindex]:not([tabindex=\"-1\"])";

thread_local! {
    static FOCUSABLE: Option<Selector> = Selector::parse(FOCUSABLE_SELECTOR).ok();
}

// =============================================================================
// FOCUSABLE QUERIES
// =============================================================================

/// Focusable descendants of `container`, in document order.
pub fn focusable_elements(doc: &Document, container: NodeId) -> Vec<NodeId> {
    FOCUSABLE.with(|selector| match selector {
        Some(selector) => doc
            .query_selector_all(container, selector)
            .into_iter()
            .filter(|n| doc.is_focusable(*n))
            .collect(),
        None => Vec::new(),
    })
}

/// First focusable descendant of `container`.
pub fn first_focusable(doc: &Document, container: NodeId) -> Option<NodeId> {
    focusable_elements(doc, container).into_iter().next()
}

// =============================================================================
// FOCUS PLACEMENT
// =============================================================================

/// Focus the first descendant of `container` matching `selector`.
///
/// Returns the match even when it refuses focus, so callers can tell
/// "nothing matched" apart from "matched but not focusable". An invalid
/// selector matches nothing.
pub fn focus_first_match(doc: &Document, container: NodeId, selector: &str) -> Option<NodeId> {
    let selector = match Selector::parse(selector) {
        Ok(selector) => selector,
        Err(err) => {
            trace!(%err, "focus selector ignored");
            return None;
        }
    };
    let target = doc.query_selector(container, &selector)?;
    if let Err(err) = doc.focus(target) {
        trace!(?target, %err, "focus refused");
    }
    Some(target)
}

/// Place focus inside a freshly shown container.
///
/// Tries `initial` (when non-empty), then the first focusable descendant,
/// then the container itself. Returns whatever ended up focused.
pub fn focus_initial(doc: &Document, container: NodeId, initial: &str) -> Option<NodeId> {
    if !initial.is_empty() && focus_first_match(doc, container, initial).is_some() {
        return doc.active_element();
    }
    let target = first_focusable(doc, container).unwrap_or(container);
    if let Err(err) = doc.focus(target) {
        trace!(?target, %err, "initial focus refused");
    }
    doc.active_element()
}

/// Return focus to `node` if it is still in the document. Failures are
/// swallowed.
pub fn restore_focus(doc: &Document, node: NodeId) -> bool {
    if !doc.is_connected(node) {
        return false;
    }
    match doc.focus(node) {
        Ok(()) => true,
        Err(err) => {
            trace!(?node, %err, "focus restoration skipped");
            false
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn child(doc: &Document, parent: NodeId, tag: &str) -> NodeId {
        let el = doc.create_element(tag);
        doc.append_child(parent, el).expect("append");
        el
    }

    #[test]
    fn test_focusable_elements_skip_disabled_and_negative_tabindex() {
        let doc = Document::new();
        let container = child(&doc, doc.body(), "div");
        let disabled = child(&doc, container, "button");
        doc.set_attribute(disabled, "disabled", "");
        let skipped = child(&doc, container, "div");
        doc.set_attribute(skipped, "tabindex", "-1");
        let input = child(&doc, container, "input");
        let link = child(&doc, container, "a");
        doc.set_attribute(link, "href", "#top");

        assert_eq!(focusable_elements(&doc, container), vec![input, link]);
    }

    #[test]
    fn test_hidden_candidates_are_skipped() {
        let doc = Document::new();
        let container = child(&doc, doc.body(), "div");
        let hidden = child(&doc, container, "button");
        doc.set_style(hidden, "display", "none");
        let visible = child(&doc, container, "button");
        assert_eq!(first_focusable(&doc, container), Some(visible));
    }

    #[test]
    fn test_focus_initial_chain() {
        let doc = Document::new();
        let container = child(&doc, doc.body(), "div");
        doc.set_attribute(container, "tabindex", "-1");

        // Nothing inside: the container itself
        assert_eq!(focus_initial(&doc, container, ""), Some(container));

        let first = child(&doc, container, "button");
        let special = child(&doc, container, "input");
        doc.set_attribute(special, "data-autofocus", "");

        assert_eq!(focus_initial(&doc, container, ""), Some(first));
        assert_eq!(focus_initial(&doc, container, "[data-autofocus]"), Some(special));
        // Unmatched selector falls through
        doc.blur();
        assert_eq!(focus_initial(&doc, container, ".missing"), Some(first));
    }

    #[test]
    fn test_invalid_initial_selector_falls_back() {
        let doc = Document::new();
        let container = child(&doc, doc.body(), "div");
        let button = child(&doc, container, "button");
        assert_eq!(focus_initial(&doc, container, "[[["), Some(button));
    }

    #[test]
    fn test_restore_focus_requires_connection() {
        let doc = Document::new();
        let button = child(&doc, doc.body(), "button");
        assert!(restore_focus(&doc, button));

        doc.remove(button);
        assert!(!restore_focus(&doc, button));
    }
}
