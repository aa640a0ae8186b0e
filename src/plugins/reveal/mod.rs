//! Reveal - modal and non-modal disclosure behavior.
//!
//! Mounts on `[data-reveal]`. Native `<dialog>` elements are presented with
//! the platform dialog API; any other element is shown as an overlay with a
//! synthesized backdrop. Both expose the same [`RevealController`].
//!
//! # Markup
//!
//! ```text
//! <button data-reveal-open-for="menu">Menu</button>
//! <div id="menu" data-reveal data-reveal-close-on-esc="off">
//!   <button data-reveal-close-for>Close</button>
//! </div>
//! ```
//!
//! # Events
//!
//! - consumed on the element: `foundation:reveal:open|close|toggle`
//! - emitted on the element: `foundation:reveal:opened|closed`, carrying a
//!   [`RevealDetail`]

mod controller;
mod options;
mod surface;

use std::rc::Rc;

pub use controller::{RevealController, RevealDetail};
pub use options::{ResolvedRevealOptions, RevealOptions, parse_bool_attribute, parse_string_attribute};

use crate::dom::NodeId;
use crate::engine::{MountResult, Plugin, PluginContext, PluginInstance, PluginSelector};
use crate::state::ScrollLock;

pub const PLUGIN_NAME: &str = "reveal";
pub const SELECTOR: &str = "[data-reveal]";

// Configuration
pub const ATTR_MODAL: &str = "data-reveal-modal";
pub const ATTR_CLOSE_ON_BACKDROP: &str = "data-reveal-close-on-backdrop";
pub const ATTR_CLOSE_ON_ESC: &str = "data-reveal-close-on-esc";
pub const ATTR_LOCK_SCROLL: &str = "data-reveal-lock-scroll";
pub const ATTR_RETURN_FOCUS: &str = "data-reveal-return-focus";
pub const ATTR_INITIAL_FOCUS: &str = "data-reveal-initial-focus";

/// Open-state marker on overlay elements.
pub const ATTR_OPEN: &str = "data-reveal-open";
pub const ATTR_BACKDROP_FOR: &str = "data-reveal-backdrop-for";

// Triggers
pub const ATTR_OPEN_FOR: &str = "data-reveal-open-for";
pub const ATTR_TOGGLE_FOR: &str = "data-reveal-toggle-for";
pub const ATTR_CLOSE_FOR: &str = "data-reveal-close-for";

// Events
pub const EVENT_OPEN: &str = "foundation:reveal:open";
pub const EVENT_CLOSE: &str = "foundation:reveal:close";
pub const EVENT_TOGGLE: &str = "foundation:reveal:toggle";
pub const EVENT_OPENED: &str = "foundation:reveal:opened";
pub const EVENT_CLOSED: &str = "foundation:reveal:closed";

/// Prefix of generated element ids.
pub const ID_PREFIX: &str = "foundation-reveal";

/// The reveal plugin descriptor.
pub struct RevealPlugin {
    defaults: RevealOptions,
    scroll_lock: Rc<ScrollLock>,
}

impl RevealPlugin {
    pub fn new(defaults: RevealOptions, scroll_lock: Rc<ScrollLock>) -> Self {
        Self {
            defaults,
            scroll_lock,
        }
    }
}

impl Plugin for RevealPlugin {
    fn name(&self) -> &str {
        PLUGIN_NAME
    }

    fn selector(&self) -> PluginSelector {
        PluginSelector::from(SELECTOR)
    }

    fn mount(&self, element: NodeId, ctx: &PluginContext) -> MountResult {
        let controller = RevealController::mount(element, ctx, &self.defaults, self.scroll_lock.clone());
        Ok(Some(Rc::new(controller) as Rc<dyn PluginInstance>))
    }
}

/// Build the reveal plugin. Every instance shares `scroll_lock`.
pub fn reveal(defaults: RevealOptions, scroll_lock: Rc<ScrollLock>) -> Rc<dyn Plugin> {
    Rc::new(RevealPlugin::new(defaults, scroll_lock))
}
