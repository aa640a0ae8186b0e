//! Built-in behaviors.

pub mod reveal;

pub use reveal::{RevealController, RevealDetail, RevealOptions, reveal};
