//! Reveal configuration: constructor defaults plus per-element attribute
//! overrides.

use crate::dom::{Document, NodeId};

/// Constructor defaults for every reveal instance.
///
/// Unset fields fall back to the built-in defaults (`true` for every flag,
/// empty `initial_focus`). Per-element `data-reveal-*` attributes override
/// these.
///
/// # Example
///
/// ```ignore
/// let defaults = RevealOptions::default().modal(false).initial_focus("[autofocus]");
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default, rename_all = "camelCase"))]
pub struct RevealOptions {
    // =========================================================================
    // Presentation
    // =========================================================================

    /// Present modally (default: true).
    pub modal: Option<bool>,

    /// Lock page scroll while a modal instance is open (default: true).
    pub lock_scroll: Option<bool>,

    // =========================================================================
    // Dismissal
    // =========================================================================

    /// Close on a backdrop click (default: true).
    pub close_on_backdrop: Option<bool>,

    /// Close on Escape (default: true).
    pub close_on_esc: Option<bool>,

    // =========================================================================
    // Focus
    // =========================================================================

    /// Return focus to the opener on close (default: true).
    pub return_focus: Option<bool>,

    /// Selector for the element to focus on open (default: none).
    pub initial_focus: Option<String>,
}

impl RevealOptions {
    pub fn modal(mut self, modal: bool) -> Self {
        self.modal = Some(modal);
        self
    }

    pub fn lock_scroll(mut self, lock_scroll: bool) -> Self {
        self.lock_scroll = Some(lock_scroll);
        self
    }

    pub fn close_on_backdrop(mut self, close_on_backdrop: bool) -> Self {
        self.close_on_backdrop = Some(close_on_backdrop);
        self
    }

    pub fn close_on_esc(mut self, close_on_esc: bool) -> Self {
        self.close_on_esc = Some(close_on_esc);
        self
    }

    pub fn return_focus(mut self, return_focus: bool) -> Self {
        self.return_focus = Some(return_focus);
        self
    }

    pub fn initial_focus(mut self, selector: impl Into<String>) -> Self {
        self.initial_focus = Some(selector.into());
        self
    }

    /// Resolve against `element`'s attributes.
    pub fn resolve(&self, doc: &Document, element: NodeId) -> ResolvedRevealOptions {
        let flag = |attr: &str, default: Option<bool>| {
            parse_bool_attribute(doc.get_attribute(element, attr).as_deref(), default.unwrap_or(true))
        };
        ResolvedRevealOptions {
            modal: flag(super::ATTR_MODAL, self.modal),
            close_on_backdrop: flag(super::ATTR_CLOSE_ON_BACKDROP, self.close_on_backdrop),
            close_on_esc: flag(super::ATTR_CLOSE_ON_ESC, self.close_on_esc),
            lock_scroll: flag(super::ATTR_LOCK_SCROLL, self.lock_scroll),
            return_focus: flag(super::ATTR_RETURN_FOCUS, self.return_focus),
            initial_focus: parse_string_attribute(
                doc.get_attribute(element, super::ATTR_INITIAL_FOCUS).as_deref(),
            )
            .or_else(|| self.initial_focus.clone())
            .unwrap_or_default(),
        }
    }
}

/// Options in effect for one mounted instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedRevealOptions {
    pub modal: bool,
    pub close_on_backdrop: bool,
    pub close_on_esc: bool,
    pub lock_scroll: bool,
    pub return_focus: bool,
    /// Empty when unset.
    pub initial_focus: String,
}

impl ResolvedRevealOptions {
    /// Whether opening this instance takes a scroll lock.
    pub fn locks_scroll(&self) -> bool {
        self.lock_scroll && self.modal
    }
}

/// Boolean attribute coercion.
///
/// Absent keeps `default`. Present is true unless the trimmed value is
/// `false`, `0`, `no` or `off` in any case.
pub fn parse_bool_attribute(value: Option<&str>, default: bool) -> bool {
    let Some(raw) = value else {
        return default;
    };
    let normalized = raw.trim().to_ascii_lowercase();
    !matches!(normalized.as_str(), "false" | "0" | "no" | "off")
}

/// Free-text attribute coercion: trimmed, `None` when empty or absent.
pub fn parse_string_attribute(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_absent_keeps_default() {
        assert!(parse_bool_attribute(None, true));
        assert!(!parse_bool_attribute(None, false));
    }

    #[test]
    fn test_present_empty_is_true() {
        assert!(parse_bool_attribute(Some(""), false));
        assert!(parse_bool_attribute(Some("   "), false));
    }

    #[test]
    fn test_negative_tokens() {
        for token in ["false", "0", "no", "off", "OFF", " No ", "False"] {
            assert!(!parse_bool_attribute(Some(token), true), "{token}");
        }
    }

    #[test]
    fn test_anything_else_is_true() {
        for token in ["true", "1", "yes", "on", "modal", "nope"] {
            assert!(parse_bool_attribute(Some(token), false), "{token}");
        }
    }

    #[test]
    fn test_string_attribute() {
        assert_eq!(parse_string_attribute(None), None);
        assert_eq!(parse_string_attribute(Some("  ")), None);
        assert_eq!(parse_string_attribute(Some(" #name ")).as_deref(), Some("#name"));
    }

    #[test]
    fn test_resolve_precedence() {
        let doc = Document::new();
        let el = doc.create_element("div");
        doc.set_attribute(el, "data-reveal-close-on-esc", "off");
        doc.set_attribute(el, "data-reveal-initial-focus", " .first ");

        let defaults = RevealOptions::default()
            .modal(false)
            .close_on_esc(true)
            .initial_focus(".ignored");
        let resolved = defaults.resolve(&doc, el);

        assert!(!resolved.modal, "absent attribute keeps the constructor default");
        assert!(!resolved.close_on_esc, "negative token beats default true");
        assert!(resolved.close_on_backdrop);
        assert!(resolved.lock_scroll);
        assert!(!resolved.locks_scroll());
        assert_eq!(resolved.initial_focus, ".first");
    }

    #[test]
    fn test_initial_focus_falls_back_to_default() {
        let doc = Document::new();
        let el = doc.create_element("div");
        let resolved = RevealOptions::default().initial_focus("#ok").resolve(&doc, el);
        assert_eq!(resolved.initial_focus, "#ok");
        assert_eq!(RevealOptions::default().resolve(&doc, el).initial_focus, "");
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_options_from_json() {
        let options: RevealOptions =
            serde_json::from_str(r#"{"modal": false, "initialFocus": "[autofocus]"}"#).expect("json");
        assert_eq!(options.modal, Some(false));
        assert_eq!(options.close_on_esc, None);
        assert_eq!(options.initial_focus.as_deref(), Some("[autofocus]"));
    }
}
