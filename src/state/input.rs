//! Input Module - Terminal event conversion and routing
//!
//! Bridges crossterm's event system with the document's platform input.
//!
//! # API
//!
//! - `convert_key_event` - crossterm KeyEvent to a DOM key name
//! - `convert_mouse_event` - crossterm MouseEvent to a click point
//! - `poll_event` / `read_event` - read and convert terminal events
//! - `route_event` - deliver to `Document::press_key` / `click_at`
//! - `enable_mouse` / `disable_mouse` - control mouse capture
//!
//! # Example
//!
//! ```ignore
//! use spark_foundation::state::input::{poll_event, route_event};
//! use std::time::Duration;
//!
//! loop {
//!     if let Ok(Some(event)) = poll_event(Duration::from_millis(16)) {
//!         route_event(&doc, event);
//!     }
//! }
//! ```

use crossterm::event::{
    DisableMouseCapture, EnableMouseCapture, Event as CrosstermEvent, KeyCode, KeyEventKind,
    KeyEvent as CrosstermKeyEvent, KeyModifiers, MouseButton as CrosstermMouseButton,
    MouseEvent as CrosstermMouseEvent, MouseEventKind, poll, read,
};
use crossterm::execute;
use std::io::stdout;
use std::time::Duration;

use tracing::trace;

use crate::dom::Document;
use crate::types::Modifiers;

// =============================================================================
// INPUT EVENT ENUM
// =============================================================================

/// Terminal input the document understands.
#[derive(Debug, Clone, PartialEq)]
pub enum InputEvent {
    /// Key press (or auto-repeat) by DOM key name
    Key { key: String, modifiers: Modifiers },
    /// Primary-button press at a cell
    Click { x: f64, y: f64 },
    /// Anything else
    None,
}

// =============================================================================
// KEY EVENT CONVERSION
// =============================================================================

/// DOM key name for a crossterm key. Releases and unnamed keys give `None`.
pub fn convert_key_event(event: CrosstermKeyEvent) -> Option<(String, Modifiers)> {
    if event.kind == KeyEventKind::Release {
        return None;
    }
    let key = match event.code {
        KeyCode::Char(c) => c.to_string(),
        KeyCode::Enter => "Enter".to_string(),
        KeyCode::Tab | KeyCode::BackTab => "Tab".to_string(),
        KeyCode::Backspace => "Backspace".to_string(),
        KeyCode::Delete => "Delete".to_string(),
        KeyCode::Esc => "Escape".to_string(),
        KeyCode::Up => "ArrowUp".to_string(),
        KeyCode::Down => "ArrowDown".to_string(),
        KeyCode::Left => "ArrowLeft".to_string(),
        KeyCode::Right => "ArrowRight".to_string(),
        KeyCode::Home => "Home".to_string(),
        KeyCode::End => "End".to_string(),
        KeyCode::PageUp => "PageUp".to_string(),
        KeyCode::PageDown => "PageDown".to_string(),
        KeyCode::Insert => "Insert".to_string(),
        KeyCode::F(n) => format!("F{n}"),
        _ => return None,
    };
    let mut modifiers = convert_modifiers(event.modifiers);
    if event.code == KeyCode::BackTab {
        modifiers.shift = true;
    }
    Some((key, modifiers))
}

// =============================================================================
// MOUSE EVENT CONVERSION
// =============================================================================

/// Click point for a left-button press. Everything else gives `None`.
pub fn convert_mouse_event(event: CrosstermMouseEvent) -> Option<(f64, f64)> {
    match event.kind {
        MouseEventKind::Down(CrosstermMouseButton::Left) => {
            Some((f64::from(event.column), f64::from(event.row)))
        }
        _ => None,
    }
}

// =============================================================================
// MODIFIER CONVERSION
// =============================================================================

fn convert_modifiers(mods: KeyModifiers) -> Modifiers {
    Modifiers {
        ctrl: mods.contains(KeyModifiers::CONTROL),
        alt: mods.contains(KeyModifiers::ALT),
        shift: mods.contains(KeyModifiers::SHIFT),
        meta: mods.contains(KeyModifiers::META) || mods.contains(KeyModifiers::SUPER),
    }
}

/// Convert any crossterm event.
pub fn convert_event(event: CrosstermEvent) -> InputEvent {
    match event {
        CrosstermEvent::Key(key) => match convert_key_event(key) {
            Some((key, modifiers)) => InputEvent::Key { key, modifiers },
            None => InputEvent::None,
        },
        CrosstermEvent::Mouse(mouse) => match convert_mouse_event(mouse) {
            Some((x, y)) => InputEvent::Click { x, y },
            None => InputEvent::None,
        },
        _ => InputEvent::None,
    }
}

// =============================================================================
// EVENT POLLING
// =============================================================================

/// Poll for an event with timeout.
/// Returns None if no event within timeout.
pub fn poll_event(timeout: Duration) -> std::io::Result<Option<InputEvent>> {
    if poll(timeout)? {
        Ok(Some(read_event()?))
    } else {
        Ok(None)
    }
}

/// Read the next event (blocking).
pub fn read_event() -> std::io::Result<InputEvent> {
    Ok(convert_event(read()?))
}

// =============================================================================
// EVENT ROUTING
// =============================================================================

/// Deliver an event to the document.
/// Returns true if it was dispatched and not prevented.
pub fn route_event(doc: &Document, event: InputEvent) -> bool {
    trace!(?event, "route");
    match event {
        InputEvent::Key { key, modifiers } => doc.press_key_with(&key, modifiers),
        InputEvent::Click { x, y } => doc.click_at(x, y).unwrap_or(false),
        InputEvent::None => false,
    }
}

// =============================================================================
// MOUSE CAPTURE
// =============================================================================

/// Enable mouse capture.
pub fn enable_mouse() -> std::io::Result<()> {
    execute!(stdout(), EnableMouseCapture)
}

/// Disable mouse capture.
pub fn disable_mouse() -> std::io::Result<()> {
    execute!(stdout(), DisableMouseCapture)
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::listener;
    use crate::types::Rect;
    use crossterm::event::KeyEventState;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn key(code: KeyCode, modifiers: KeyModifiers, kind: KeyEventKind) -> CrosstermKeyEvent {
        CrosstermKeyEvent {
            code,
            modifiers,
            kind,
            state: KeyEventState::NONE,
        }
    }

    fn mouse(kind: MouseEventKind, column: u16, row: u16) -> CrosstermMouseEvent {
        CrosstermMouseEvent {
            kind,
            column,
            row,
            modifiers: KeyModifiers::empty(),
        }
    }

    #[test]
    fn test_convert_key_names() {
        let keys = [
            (KeyCode::Esc, "Escape"),
            (KeyCode::Enter, "Enter"),
            (KeyCode::Tab, "Tab"),
            (KeyCode::Up, "ArrowUp"),
            (KeyCode::Char('q'), "q"),
            (KeyCode::F(5), "F5"),
        ];
        for (code, expected) in keys {
            let (name, _) = convert_key_event(key(code, KeyModifiers::empty(), KeyEventKind::Press))
                .expect("named key");
            assert_eq!(name, expected);
        }
    }

    #[test]
    fn test_release_is_ignored() {
        let event = key(KeyCode::Esc, KeyModifiers::empty(), KeyEventKind::Release);
        assert!(convert_key_event(event).is_none());
    }

    #[test]
    fn test_back_tab_is_shift_tab() {
        let (name, mods) = convert_key_event(key(KeyCode::BackTab, KeyModifiers::empty(), KeyEventKind::Press))
            .expect("named key");
        assert_eq!(name, "Tab");
        assert!(mods.shift);
    }

    #[test]
    fn test_convert_key_with_modifiers() {
        let (_, mods) = convert_key_event(key(
            KeyCode::Char('c'),
            KeyModifiers::CONTROL | KeyModifiers::ALT,
            KeyEventKind::Press,
        ))
        .expect("named key");
        assert!(mods.ctrl);
        assert!(mods.alt);
        assert!(!mods.shift);
    }

    #[test]
    fn test_only_left_press_clicks() {
        assert_eq!(
            convert_mouse_event(mouse(MouseEventKind::Down(CrosstermMouseButton::Left), 10, 5)),
            Some((10.0, 5.0))
        );
        assert_eq!(
            convert_mouse_event(mouse(MouseEventKind::Down(CrosstermMouseButton::Right), 1, 1)),
            None
        );
        assert_eq!(convert_mouse_event(mouse(MouseEventKind::Moved, 1, 1)), None);
        assert_eq!(convert_event(CrosstermEvent::Resize(80, 24)), InputEvent::None);
    }

    #[test]
    fn test_route_key_and_click() {
        let doc = Document::new();
        let button = doc.create_element("button");
        doc.append_child(doc.body(), button).expect("append");
        doc.set_rect(button, Rect::new(0.0, 0.0, 10.0, 1.0));

        let log = Rc::new(RefCell::new(Vec::new()));
        for event_type in ["keydown", "click"] {
            let log = log.clone();
            doc.add_event_listener(
                doc.root(),
                event_type,
                listener(move |e| log.borrow_mut().push((e.event_type().to_string(), e.target()))),
                false,
            );
        }

        let esc = convert_event(CrosstermEvent::Key(key(
            KeyCode::Esc,
            KeyModifiers::empty(),
            KeyEventKind::Press,
        )));
        assert!(route_event(&doc, esc));
        let click = convert_event(CrosstermEvent::Mouse(mouse(
            MouseEventKind::Down(CrosstermMouseButton::Left),
            3,
            0,
        )));
        assert!(route_event(&doc, click));
        assert!(!route_event(&doc, InputEvent::None));

        assert_eq!(
            *log.borrow(),
            vec![
                ("keydown".to_string(), Some(doc.body())),
                ("click".to_string(), Some(button)),
            ]
        );
    }
}
