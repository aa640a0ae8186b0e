//! State Module - Runtime services shared by behaviors
//!
//! - **Focus** - focusable queries, initial placement, restoration
//! - **ScrollLock** - reference-counted page scroll suppression
//! - **Input** - crossterm events routed into a document

pub mod focus;
pub mod input;
mod scroll_lock;

pub use scroll_lock::ScrollLock;
