//! Device-independent input dispatch for game engines.
//!
//! Devices translate raw platform samples into [`InputEvent`]s, one per
//! symbol whose state changed. The [`InputSystem`] polls every device once per
//! tick and offers each event to an exclusive listener, console listeners and
//! priority ordered regular listeners, while tracking which symbols are held
//! and which keys are temporarily blocked. Motion sensors are aggregated
//! separately by a [`MotionSensorHub`].
//!
//! [`InputEvent`]: input::InputEvent
//! [`InputSystem`]: input::InputSystem
//! [`MotionSensorHub`]: motion::MotionSensorHub

pub mod config;
pub mod errors;
pub mod input;
pub mod motion;
