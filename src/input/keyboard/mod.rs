//! The keyboard device: scan code tracking, modifier state and text input.

mod codes;
mod event;
mod keyboard;

pub use codes::*;
pub use event::*;
pub use keyboard::*;
