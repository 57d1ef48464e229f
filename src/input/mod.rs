//! Device abstraction, event dispatch and the reference devices.

mod blocking;
mod device;
mod devices;
mod event;
mod hold;
mod keys;
mod listener;
mod poller;
mod queue;
mod symbol;
mod system;

pub mod gamepad;
pub mod keyboard;

pub use blocking::*;
pub use device::*;
pub use devices::*;
pub use event::*;
pub use hold::*;
pub use keys::*;
pub use listener::*;
pub use poller::*;
pub use queue::*;
pub use symbol::*;
pub use system::*;
