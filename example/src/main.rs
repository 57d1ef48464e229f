//! Drives the input tick loop with simulated keyboard, gamepad and motion
//! sensor input and logs what listeners see.
//!
//! Run with `RUST_LOG=info` (or `debug`/`trace` for the dispatcher's own
//! logging).

use ::glam::{Quat, Vec2, Vec3};
use ::std::{cell::RefCell, rc::Rc, thread, time::Duration};
use ::switchboard::{
    config::InputConfig,
    errors::Result,
    input::{
        gamepad::{GamepadBackend, GamepadButtons, GamepadDevice, GamepadSample, Vibration},
        keyboard::{KeyEvent, KeyboardDevice},
        DeviceKind, ForceFeedback, InputBlock, InputEvent, InputEventListener, InputState, InputSystem, KeyId,
        UnicodeEvent,
    },
    motion::{
        MotionSensorEvent, MotionSensorFlags, MotionSensorListener, MotionSensorProvider, MotionSensorReadings,
    },
};
use ::tracing::{info, warn};
use ::tracing_subscriber::{fmt, prelude::*, EnvFilter};

const FRAME: Duration = Duration::from_millis(16);
const TICKS: u32 = 120;

/// Logs every event and swallows nothing.
struct Printer;

impl InputEventListener for Printer {
    fn on_input_event(&mut self, event: &InputEvent) -> bool {
        if event.key_id != KeyId::SysCommit && event.state != InputState::Down {
            info!(
                key = %event.key_name,
                state = %event.state,
                value = event.value,
                device = %event.device_kind,
                "Input"
            );
        }
        false
    }

    fn on_unicode_event(&mut self, event: &UnicodeEvent) -> bool {
        info!(input_char = ?event.input_char, "Text");
        false
    }
}

/// A console which takes escape for itself.
struct Console;

impl InputEventListener for Console {
    fn on_input_event(&mut self, event: &InputEvent) -> bool {
        event.key_id == KeyId::Escape
    }

    fn priority(&self) -> i32 {
        100
    }
}

/// A controller that presses A for a while, then pushes the left stick.
struct SimulatedPad {
    polls: u32,
}

impl GamepadBackend for SimulatedPad {
    fn poll(&mut self, _index: u8) -> Result<Option<GamepadSample>> {
        self.polls += 1;
        let sample = match self.polls {
            0..=20 => GamepadSample::default(),
            21..=60 => GamepadSample::default().with_buttons(GamepadButtons::A),
            61..=120 => GamepadSample::default().with_left_thumb(Vec2::new(0.0, 1.0)),
            _ => return Ok(None),
        };
        Ok(Some(sample))
    }

    fn set_vibration(&mut self, index: u8, vibration: Vibration) -> Result<()> {
        info!(index, ?vibration, "Vibration");
        Ok(())
    }
}

/// A phone lying flat and slowly turning.
struct SimulatedSensors {
    angle: f32,
    active: MotionSensorFlags,
}

impl MotionSensorProvider for SimulatedSensors {
    fn available(&self) -> MotionSensorFlags {
        MotionSensorFlags::ACCELERATION_GRAVITY | MotionSensorFlags::MAGNETIC_FIELD_UNBIASED | MotionSensorFlags::ORIENTATION
    }

    fn set_active(&mut self, flags: MotionSensorFlags) {
        self.active = flags;
    }

    fn set_update_interval(&mut self, _interval: Duration) {}

    fn poll(&mut self) -> MotionSensorReadings {
        if self.active.is_empty() {
            return MotionSensorReadings::default();
        }
        self.angle += 0.05;
        let orientation = Quat::from_rotation_z(self.angle);
        MotionSensorReadings::default()
            .with_acceleration_gravity(Vec3::NEG_Z)
            .with_magnetic_field_unbiased(orientation * Vec3::Y)
            .with_orientation(orientation)
    }
}

struct Compass;

impl MotionSensorListener for Compass {
    fn on_motion_sensor_event(&mut self, event: &MotionSensorEvent<'_>) {
        if event.updated.contains(MotionSensorFlags::MAGNETIC_NORTH) {
            info!(north = ?event.data.magnetic_north, "Heading");
        }
    }
}

pub fn main() {
    ::tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env())
        .init();

    let config = InputConfig::builder()
        .with_gamepad_poll_interval(FRAME)
        .build()
        .expect("Default configuration should be valid");
    let mut system = InputSystem::new(config.clone());

    let keyboard = KeyboardDevice::new(&config);
    let keys = keyboard.producer();
    system.add_input_device(Box::new(keyboard));

    let pad = GamepadDevice::new(0, &config).with_backend(Box::new(SimulatedPad { polls: 0 }));
    if !system.add_input_device(Box::new(pad)) {
        warn!("Continuing without a gamepad");
    }

    system.add_event_listener(Rc::new(RefCell::new(Printer)));
    system.add_console_event_listener(Rc::new(RefCell::new(Console)));

    system.motion_mut().set_provider(Some(Box::new(SimulatedSensors {
        angle: 0.0,
        active: MotionSensorFlags::empty(),
    })));
    system
        .motion_mut()
        .add_listener(Rc::new(RefCell::new(Compass)), MotionSensorFlags::MAGNETIC_NORTH);

    for tick in 0..TICKS {
        match tick {
            5 => {
                keys.push(KeyEvent::key_down(0x2A, false, false));
                keys.push(KeyEvent::key_down(0x23, false, false));
                keys.extend(KeyEvent::text("H"));
            }
            6 => {
                keys.push(KeyEvent::key_up(0x23, false));
                keys.push(KeyEvent::key_up(0x2A, false));
                keys.push(KeyEvent::key_down(0x01, false, false));
                keys.push(KeyEvent::key_up(0x01, false));
            }
            10 => {
                system.set_blocking_input(InputBlock::all_devices(KeyId::XiA, 0.5));
            }
            30 => {
                system.force_feedback_event(&ForceFeedback::rumble(DeviceKind::Gamepad, 0.5, 0.5, 0.25));
            }
            _ => {}
        }

        system.update(true, FRAME);
        thread::sleep(FRAME);
    }

    system.shutdown();
}
