//! Motion sensor channels, samples and the listener, filter and provider
//! capabilities.

use ::bitflags::bitflags;
use ::glam::{Quat, Vec3};
use ::std::time::Duration;

bitflags! {
    /// Motion sensor channels.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct MotionSensorFlags: u32 {
        const ACCELERATION_RAW = 1 << 0;
        const ACCELERATION_USER = 1 << 1;
        const ACCELERATION_GRAVITY = 1 << 2;
        const ROTATION_RATE_RAW = 1 << 3;
        const ROTATION_RATE_UNBIASED = 1 << 4;
        const MAGNETIC_FIELD_RAW = 1 << 5;
        const MAGNETIC_FIELD_UNBIASED = 1 << 6;
        /// Derived from gravity and the unbiased magnetic field.
        const MAGNETIC_NORTH = 1 << 7;
        const ORIENTATION = 1 << 8;
        /// Derived from consecutive orientations.
        const ORIENTATION_DELTA = 1 << 9;
    }
}

impl MotionSensorFlags {
    /// Every raw channel plus magnetic north. Orientation and its delta are
    /// left out and must be asked for explicitly. The usual argument when
    /// adding or removing a listener or activating channels wholesale.
    pub const ALL_AVAILABLE: Self = Self::ACCELERATION_RAW
        .union(Self::ACCELERATION_USER)
        .union(Self::ACCELERATION_GRAVITY)
        .union(Self::ROTATION_RATE_RAW)
        .union(Self::ROTATION_RATE_UNBIASED)
        .union(Self::MAGNETIC_FIELD_RAW)
        .union(Self::MAGNETIC_FIELD_UNBIASED)
        .union(Self::MAGNETIC_NORTH);

    /// Add the channels the derived channels in `self` are computed from.
    pub fn with_dependencies(self) -> Self {
        let mut flags = self;
        if flags.contains(Self::ORIENTATION_DELTA) {
            flags |= Self::ORIENTATION;
        }
        if flags.contains(Self::MAGNETIC_NORTH) {
            flags |= Self::ACCELERATION_GRAVITY | Self::MAGNETIC_FIELD_UNBIASED;
        }
        flags
    }

    /// Add the derived channels which can be computed from `self`.
    pub fn with_derived(self) -> Self {
        let mut flags = self;
        if flags.contains(Self::ORIENTATION) {
            flags |= Self::ORIENTATION_DELTA;
        }
        if flags.contains(Self::ACCELERATION_GRAVITY | Self::MAGNETIC_FIELD_UNBIASED) {
            flags |= Self::MAGNETIC_NORTH;
        }
        flags
    }
}

/// The aggregate of the most recent value of every channel.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MotionSensorData {
    pub acceleration_raw: Vec3,
    pub acceleration_user: Vec3,
    pub acceleration_gravity: Vec3,
    pub rotation_rate_raw: Vec3,
    pub rotation_rate_unbiased: Vec3,
    pub magnetic_field_raw: Vec3,
    pub magnetic_field_unbiased: Vec3,
    pub magnetic_north: Vec3,
    pub orientation: Quat,
    pub orientation_delta: Quat,
}

impl Default for MotionSensorData {
    fn default() -> Self {
        Self {
            acceleration_raw: Vec3::ZERO,
            acceleration_user: Vec3::ZERO,
            acceleration_gravity: Vec3::ZERO,
            rotation_rate_raw: Vec3::ZERO,
            rotation_rate_unbiased: Vec3::ZERO,
            magnetic_field_raw: Vec3::ZERO,
            magnetic_field_unbiased: Vec3::ZERO,
            magnetic_north: Vec3::ZERO,
            orientation: Quat::IDENTITY,
            orientation_delta: Quat::IDENTITY,
        }
    }
}

/// Direction of magnetic north, perpendicular to gravity.
///
/// Degenerate inputs (zero or parallel vectors) yield zero.
pub fn magnetic_north(gravity: Vec3, magnetic_field: Vec3) -> Vec3 {
    let east = gravity.cross(magnetic_field).normalize_or_zero();
    east.cross(gravity).normalize_or_zero()
}

macro_rules! motion_channels {
    ($($field:ident: $ty:ty => $flag:ident),* $(,)?) => {
        ::paste::paste! {
            /// Channel values read from a provider in one poll. `None` means
            /// the channel was not updated.
            #[derive(Clone, Copy, Debug, Default, PartialEq)]
            pub struct MotionSensorReadings {
                $(pub $field: Option<$ty>,)*
            }

            impl MotionSensorReadings {
                $(
                    #[doc = "Set the `" $field "` reading."]
                    pub fn [<with_ $field>](self, value: $ty) -> Self {
                        Self {
                            $field: Some(value),
                            ..self
                        }
                    }
                )*

                /// Overlay `newer` onto these readings. Channels updated in
                /// `newer` win.
                pub fn merge(self, newer: Self) -> Self {
                    Self {
                        $($field: newer.$field.or(self.$field),)*
                    }
                }

                /// The channels with a reading.
                pub fn flags(&self) -> MotionSensorFlags {
                    let mut flags = MotionSensorFlags::empty();
                    $(
                        if self.$field.is_some() {
                            flags |= MotionSensorFlags::$flag;
                        }
                    )*
                    flags
                }

                /// Copy every reading whose channel is in `mask` into `data`.
                /// Returns the channels copied.
                pub fn apply_to(&self, data: &mut MotionSensorData, mask: MotionSensorFlags) -> MotionSensorFlags {
                    let mut updated = MotionSensorFlags::empty();
                    $(
                        if let Some(value) = self.$field {
                            if mask.contains(MotionSensorFlags::$flag) {
                                data.$field = value;
                                updated |= MotionSensorFlags::$flag;
                            }
                        }
                    )*
                    updated
                }
            }
        }
    };
}

motion_channels! {
    acceleration_raw: Vec3 => ACCELERATION_RAW,
    acceleration_user: Vec3 => ACCELERATION_USER,
    acceleration_gravity: Vec3 => ACCELERATION_GRAVITY,
    rotation_rate_raw: Vec3 => ROTATION_RATE_RAW,
    rotation_rate_unbiased: Vec3 => ROTATION_RATE_UNBIASED,
    magnetic_field_raw: Vec3 => MAGNETIC_FIELD_RAW,
    magnetic_field_unbiased: Vec3 => MAGNETIC_FIELD_UNBIASED,
    orientation: Quat => ORIENTATION,
}

/// Notification that some channels changed this tick.
#[derive(Clone, Copy, Debug)]
pub struct MotionSensorEvent<'a> {
    pub data: &'a MotionSensorData,
    pub updated: MotionSensorFlags,
}

pub trait MotionSensorListener {
    fn on_motion_sensor_event(&mut self, event: &MotionSensorEvent<'_>);
}

/// Smoothing applied to the aggregate sample before listeners see it.
/// Implementations keep whatever history they need between calls.
pub trait MotionSensorFilter {
    fn filter(&mut self, sample: &mut MotionSensorData, updated: MotionSensorFlags);
}

/// Platform source of raw motion readings.
pub trait MotionSensorProvider {
    /// Channels the hardware can supply.
    fn available(&self) -> MotionSensorFlags;

    /// Turn channels on or off. Channels not in `flags` should be powered
    /// down.
    fn set_active(&mut self, flags: MotionSensorFlags);

    fn set_update_interval(&mut self, interval: Duration);

    /// Readings which arrived since the previous poll.
    fn poll(&mut self) -> MotionSensorReadings;
}
