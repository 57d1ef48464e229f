//! Motion sensor aggregation.
//!
//! A [`MotionSensorHub`] owns the platform [`MotionSensorProvider`], switches
//! channels on and off as listeners come and go, derives magnetic north and
//! orientation deltas, and forwards each tick's changes to the listeners
//! interested in them.

mod hub;
mod sensor;

pub use hub::*;
pub use sensor::*;
