//! Scroll Lock - reference-counted page scroll suppression.
//!
//! Manages the document element's overflow while modal surfaces are open:
//! - First `lock` saves `overflow` / `padding-right` and hides overflow
//! - Scrollbar width is compensated with `padding-right`
//! - Last `unlock` restores the saved values exactly
//!
//! One instance is shared by every controller on a document. It is injected
//! rather than global, so independent documents (and tests) get
//! independent counts.

use std::cell::{Cell, RefCell};

use tracing::{debug, warn};

use crate::dom::Document;

/// Inline styles of the document element before the first lock.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct SavedStyle {
    overflow: String,
    padding_right: String,
}

/// Shared scroll-lock resource.
#[derive(Debug)]
pub struct ScrollLock {
    document: Document,
    count: Cell<usize>,
    saved: RefCell<Option<SavedStyle>>,
}

impl ScrollLock {
    pub fn new(document: &Document) -> Self {
        Self {
            document: document.clone(),
            count: Cell::new(0),
            saved: RefCell::new(None),
        }
    }

    /// Current number of outstanding locks.
    pub fn count(&self) -> usize {
        self.count.get()
    }

    pub fn is_locked(&self) -> bool {
        self.count.get() > 0
    }

    /// Acquire one lock.
    pub fn lock(&self) {
        let count = self.count.get() + 1;
        self.count.set(count);
        if count != 1 {
            return;
        }

        let doc = &self.document;
        let root = doc.document_element();
        *self.saved.borrow_mut() = Some(SavedStyle {
            overflow: doc.style(root, "overflow"),
            padding_right: doc.style(root, "padding-right"),
        });

        let scrollbar = doc.scrollbar_width();
        if scrollbar > 0.0 {
            doc.set_style(root, "padding-right", &format!("{scrollbar}px"));
        }
        doc.set_style(root, "overflow", "hidden");
        debug!(scrollbar, "scroll locked");
    }

    /// Release one lock. Unbalanced calls are ignored.
    pub fn unlock(&self) {
        let count = self.count.get();
        if count == 0 {
            warn!("scroll unlock without a matching lock");
            return;
        }
        self.count.set(count - 1);
        if count != 1 {
            return;
        }

        let saved = self.saved.borrow_mut().take().unwrap_or_default();
        let doc = &self.document;
        let root = doc.document_element();
        doc.set_style(root, "overflow", &saved.overflow);
        doc.set_style(root, "padding-right", &saved.padding_right);
        debug!("scroll unlocked");
    }
}
