//! Process-wide input configuration.
//!
//! The configuration is an immutable value constructed once by whatever owns
//! the [`InputSystem`] and handed to each device during initialization.
//!
//! [`InputSystem`]: crate::input::InputSystem

use crate::errors::{Error, Result};

use ::std::time::Duration;

/// Default radial dead zone applied to gamepad thumbsticks. Matches the
/// conventional 7849 / 32767 XInput left thumbstick threshold.
pub const DEFAULT_GAMEPAD_DEAD_ZONE: f32 = 0.24;

/// Default threshold above which an analog trigger is also reported as a
/// pressed button. Matches the conventional 30 / 255 XInput threshold.
pub const DEFAULT_TRIGGER_BUTTON_THRESHOLD: f32 = 30.0 / 255.0;

/// Immutable input configuration.
///
/// ```
/// use ::switchboard::config::InputConfig;
///
/// let config = InputConfig::builder()
///     .with_gamepad_dead_zone(0.2)
///     .with_adapter_queue_capacity(128)
///     .build()
///     .expect("valid configuration");
///
/// assert_eq!(config.adapter_queue_capacity(), 128);
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct InputConfig {
    gamepad_dead_zone: f32,
    trigger_button_threshold: f32,
    thumb_button_threshold: f32,
    gamepad_poll_interval: Duration,
    adapter_queue_capacity: usize,
    motion_update_interval: Duration,
    clear_on_focus_loss: bool,
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            gamepad_dead_zone: DEFAULT_GAMEPAD_DEAD_ZONE,
            trigger_button_threshold: DEFAULT_TRIGGER_BUTTON_THRESHOLD,
            thumb_button_threshold: 0.5,
            gamepad_poll_interval: Duration::from_millis(8),
            adapter_queue_capacity: 64,
            motion_update_interval: Duration::from_secs_f32(1.0 / 30.0),
            clear_on_focus_loss: true,
        }
    }
}

impl InputConfig {
    /// Start building a configuration from the default values.
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::new()
    }

    /// Radial dead zone applied to gamepad thumbsticks, in `[0, 1)`.
    pub fn gamepad_dead_zone(&self) -> f32 {
        self.gamepad_dead_zone
    }

    /// Analog value above which a trigger also reports a button press.
    pub fn trigger_button_threshold(&self) -> f32 {
        self.trigger_button_threshold
    }

    /// Axis deflection above which a thumbstick direction reports a button
    /// press.
    pub fn thumb_button_threshold(&self) -> f32 {
        self.thumb_button_threshold
    }

    /// Interval at which background gamepad pollers sample their backend.
    pub fn gamepad_poll_interval(&self) -> Duration {
        self.gamepad_poll_interval
    }

    /// Number of raw samples an adapter queue buffers between ticks before
    /// the oldest are dropped.
    pub fn adapter_queue_capacity(&self) -> usize {
        self.adapter_queue_capacity
    }

    /// Requested refresh interval for motion sensors.
    pub fn motion_update_interval(&self) -> Duration {
        self.motion_update_interval
    }

    /// Whether key state is cleared when the application loses focus.
    pub fn clear_on_focus_loss(&self) -> bool {
        self.clear_on_focus_loss
    }
}

/// A builder pattern object which simplifies the process of creating an
/// [`InputConfig`]. Default values are used for all properties until
/// explicitly set.
#[derive(Clone, Debug, Default)]
pub struct ConfigBuilder {
    config: InputConfig,
}

impl ConfigBuilder {
    /// Construct a new builder seeded with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the gamepad thumbstick dead zone.
    ///
    /// Defaults to [`DEFAULT_GAMEPAD_DEAD_ZONE`] if not set.
    pub fn with_gamepad_dead_zone(mut self, dead_zone: f32) -> Self {
        self.config.gamepad_dead_zone = dead_zone;
        self
    }

    /// Set the analog trigger button threshold.
    ///
    /// Defaults to [`DEFAULT_TRIGGER_BUTTON_THRESHOLD`] if not set.
    pub fn with_trigger_button_threshold(mut self, threshold: f32) -> Self {
        self.config.trigger_button_threshold = threshold;
        self
    }

    /// Set the thumbstick direction button threshold.
    ///
    /// Defaults to 0.5 if not set.
    pub fn with_thumb_button_threshold(mut self, threshold: f32) -> Self {
        self.config.thumb_button_threshold = threshold;
        self
    }

    /// Set the background gamepad poll interval.
    ///
    /// Defaults to 8ms if not set.
    pub fn with_gamepad_poll_interval(mut self, interval: Duration) -> Self {
        self.config.gamepad_poll_interval = interval;
        self
    }

    /// Set the adapter queue capacity.
    ///
    /// Defaults to 64 if not set.
    pub fn with_adapter_queue_capacity(mut self, capacity: usize) -> Self {
        self.config.adapter_queue_capacity = capacity;
        self
    }

    /// Set the motion sensor refresh interval.
    ///
    /// Defaults to 1/30th of a second if not set.
    pub fn with_motion_update_interval(mut self, interval: Duration) -> Self {
        self.config.motion_update_interval = interval;
        self
    }

    /// Set whether key state is cleared when focus is lost.
    ///
    /// Defaults to `true` if not set.
    pub fn with_clear_on_focus_loss(mut self, clear: bool) -> Self {
        self.config.clear_on_focus_loss = clear;
        self
    }

    /// Validate and build the configuration.
    pub fn build(self) -> Result<InputConfig> {
        let config = self.config;

        if !(0.0..1.0).contains(&config.gamepad_dead_zone) {
            return Err(Error::invalid_config(format!(
                "gamepad dead zone {} must be in [0, 1)",
                config.gamepad_dead_zone
            )));
        }
        for (name, threshold) in [
            ("trigger button threshold", config.trigger_button_threshold),
            ("thumb button threshold", config.thumb_button_threshold),
        ] {
            if !(threshold > 0.0 && threshold <= 1.0) {
                return Err(Error::invalid_config(format!(
                    "{name} {threshold} must be in (0, 1]"
                )));
            }
        }
        if config.adapter_queue_capacity == 0 {
            return Err(Error::invalid_config(
                "adapter queue capacity must be non-zero",
            ));
        }

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ErrorKind;

    use ::pretty_assertions::assert_eq;

    #[test]
    fn test_defaults_are_valid() {
        let config = ConfigBuilder::new().build().expect("defaults validate");
        assert_eq!(config, InputConfig::default());
    }

    #[test]
    fn test_rejects_dead_zone_out_of_range() {
        let err = InputConfig::builder()
            .with_gamepad_dead_zone(1.0)
            .build()
            .unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::InvalidConfig(_)));
    }

    #[test]
    fn test_rejects_zero_queue_capacity() {
        assert!(InputConfig::builder()
            .with_adapter_queue_capacity(0)
            .build()
            .is_err());
    }

    #[test]
    fn test_rejects_zero_threshold() {
        assert!(InputConfig::builder()
            .with_thumb_button_threshold(0.0)
            .build()
            .is_err());
    }
}
