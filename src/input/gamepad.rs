//! The gamepad device: buttons, sticks and triggers of one controller slot.
//!
//! Samples reach the device through an [`AdapterQueue`] of [`GamepadInput`].
//! They are pushed either by a platform adapter directly or, when the device
//! is constructed with a [`GamepadBackend`], by a [`BackgroundPoller`] which
//! polls the backend and turns connection changes into
//! [`GamepadInput::Connected`] and [`GamepadInput::Disconnected`].

use crate::{
    config::InputConfig,
    errors::Result,
    input::{
        AdapterQueue, BackgroundPoller, DeviceBase, DeviceKind, EffectId, ForceFeedback, InputDevice, InputEvent,
        KeyId, QueueProducer, SymbolId, SymbolKind, TriggerFeedback, UpdateContext,
    },
};

use ::bitflags::bitflags;
use ::glam::Vec2;
use ::lazy_static::lazy_static;
use ::maplit::btreemap;
use ::num_traits::clamp;
use ::parking_lot::Mutex;
use ::std::{collections::BTreeMap, sync::Arc, time::Duration};
use ::tracing::{debug, trace, warn};

bitflags! {
    /// Digital buttons of a controller, laid out like the XInput button word.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct GamepadButtons: u16 {
        const DPAD_UP = 0x0001;
        const DPAD_DOWN = 0x0002;
        const DPAD_LEFT = 0x0004;
        const DPAD_RIGHT = 0x0008;
        const START = 0x0010;
        const BACK = 0x0020;
        const LEFT_THUMB = 0x0040;
        const RIGHT_THUMB = 0x0080;
        const LEFT_SHOULDER = 0x0100;
        const RIGHT_SHOULDER = 0x0200;
        const A = 0x1000;
        const B = 0x2000;
        const X = 0x4000;
        const Y = 0x8000;
    }
}

lazy_static! {
    /// Key produced by each digital button, ordered by button bit.
    static ref BUTTON_KEYS: BTreeMap<u16, KeyId> = btreemap! {
        GamepadButtons::DPAD_UP.bits() => KeyId::XiDPadUp,
        GamepadButtons::DPAD_DOWN.bits() => KeyId::XiDPadDown,
        GamepadButtons::DPAD_LEFT.bits() => KeyId::XiDPadLeft,
        GamepadButtons::DPAD_RIGHT.bits() => KeyId::XiDPadRight,
        GamepadButtons::START.bits() => KeyId::XiStart,
        GamepadButtons::BACK.bits() => KeyId::XiBack,
        GamepadButtons::LEFT_THUMB.bits() => KeyId::XiThumbL,
        GamepadButtons::RIGHT_THUMB.bits() => KeyId::XiThumbR,
        GamepadButtons::LEFT_SHOULDER.bits() => KeyId::XiShoulderL,
        GamepadButtons::RIGHT_SHOULDER.bits() => KeyId::XiShoulderR,
        GamepadButtons::A.bits() => KeyId::XiA,
        GamepadButtons::B.bits() => KeyId::XiB,
        GamepadButtons::X.bits() => KeyId::XiX,
        GamepadButtons::Y.bits() => KeyId::XiY,
    };
}

const TRIGGERS: [KeyId; 2] = [KeyId::XiTriggerL, KeyId::XiTriggerR];

const AXES: [KeyId; 4] = [KeyId::XiThumbLX, KeyId::XiThumbLY, KeyId::XiThumbRX, KeyId::XiThumbRY];

/// Buttons derived from analog values: trigger buttons, then up, down, left
/// and right of each stick.
const DERIVED_BUTTONS: [KeyId; 10] = [
    KeyId::XiTriggerLBtn,
    KeyId::XiTriggerRBtn,
    KeyId::XiThumbLUp,
    KeyId::XiThumbLDown,
    KeyId::XiThumbLLeft,
    KeyId::XiThumbLRight,
    KeyId::XiThumbRUp,
    KeyId::XiThumbRDown,
    KeyId::XiThumbRLeft,
    KeyId::XiThumbRRight,
];

/// Upper bound for the dead zone so the rescale never divides by zero.
const MAX_DEAD_ZONE: f32 = 0.99;

/// Raw controller state in normalized units: triggers in `0.0..=1.0`, stick
/// axes in `-1.0..=1.0` with positive Y pointing up.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct GamepadSample {
    pub buttons: GamepadButtons,
    pub left_trigger: f32,
    pub right_trigger: f32,
    pub left_thumb: Vec2,
    pub right_thumb: Vec2,
}

impl GamepadSample {
    pub fn with_buttons(self, buttons: GamepadButtons) -> Self {
        Self { buttons, ..self }
    }

    pub fn with_triggers(self, left_trigger: f32, right_trigger: f32) -> Self {
        Self {
            left_trigger,
            right_trigger,
            ..self
        }
    }

    pub fn with_left_thumb(self, left_thumb: Vec2) -> Self {
        Self { left_thumb, ..self }
    }

    pub fn with_right_thumb(self, right_thumb: Vec2) -> Self {
        Self { right_thumb, ..self }
    }
}

/// One item in a gamepad's adapter queue.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum GamepadInput {
    Connected,
    Sample(GamepadSample),
    Disconnected,
}

/// Motor speeds in `0.0..=1.0`, plus the trigger motors on controllers which
/// have them.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Vibration {
    pub low_frequency: f32,
    pub high_frequency: f32,
    pub trigger: TriggerFeedback,
}

impl Vibration {
    pub const OFF: Self = Self {
        low_frequency: 0.0,
        high_frequency: 0.0,
        trigger: TriggerFeedback::NONE,
    };

    pub fn rumble(low_frequency: f32, high_frequency: f32) -> Self {
        Self {
            low_frequency,
            high_frequency,
            ..Self::OFF
        }
    }

    pub fn with_trigger(self, trigger: TriggerFeedback) -> Self {
        Self { trigger, ..self }
    }
}

/// Platform access to a controller slot, polled from a background thread.
pub trait GamepadBackend: Send {
    /// Current state of controller `index`, or `None` while nothing is
    /// connected to that slot.
    fn poll(&mut self, index: u8) -> Result<Option<GamepadSample>>;

    fn set_vibration(&mut self, index: u8, vibration: Vibration) -> Result<()>;
}

/// Turns successive backend polls into connection transitions and changed
/// samples.
#[derive(Debug, Default)]
pub struct ConnectionWatcher {
    last: Option<GamepadSample>,
}

impl ConnectionWatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_connected(&self) -> bool {
        self.last.is_some()
    }

    /// Queue items describing the change from the previous poll to `sample`.
    /// Unchanged samples produce nothing.
    pub fn observe(&mut self, sample: Option<GamepadSample>) -> Vec<GamepadInput> {
        let mut changes = Vec::new();
        match (self.last, sample) {
            (None, Some(sample)) => {
                changes.push(GamepadInput::Connected);
                changes.push(GamepadInput::Sample(sample));
            }
            (Some(last), Some(sample)) if last != sample => changes.push(GamepadInput::Sample(sample)),
            (Some(_), None) => changes.push(GamepadInput::Disconnected),
            _ => (),
        }
        self.last = sample;
        changes
    }
}

/// Scale a stick position so the dead zone maps to zero and the remaining
/// range stretches back over `0.0..=1.0`.
pub fn radial_dead_zone(position: Vec2, dead_zone: f32) -> Vec2 {
    let magnitude = position.length();
    if magnitude <= dead_zone {
        return Vec2::ZERO;
    }
    let scaled = clamp((magnitude - dead_zone) / (1.0 - dead_zone), 0.0, 1.0);
    position / magnitude * scaled
}

/// A controller slot.
///
/// ```
/// use ::std::time::Duration;
/// use ::switchboard::{
///     config::InputConfig,
///     input::{
///         gamepad::{GamepadButtons, GamepadDevice, GamepadInput, GamepadSample},
///         InputDevice, KeyId, ModifierMask, UpdateContext,
///     },
/// };
///
/// let config = InputConfig::default();
/// let mut pad = GamepadDevice::new(0, &config);
/// pad.init(&config).unwrap();
///
/// let producer = pad.producer();
/// producer.push(GamepadInput::Connected);
/// producer.push(GamepadInput::Sample(GamepadSample::default().with_buttons(GamepadButtons::A)));
///
/// let mut ctx = UpdateContext::new(true, Duration::from_millis(16), ModifierMask::empty());
/// pad.update(&mut ctx);
///
/// let keys: Vec<_> = ctx.input_events().map(|event| event.key_id).collect();
/// assert_eq!(keys, [KeyId::SysConnectDevice, KeyId::XiA]);
/// ```
pub struct GamepadDevice {
    base: DeviceBase,
    input: AdapterQueue<GamepadInput>,
    /// Latest motor request, taken by the poller or the platform adapter.
    vibration: Arc<Mutex<Option<Vibration>>>,
    backend: Option<Box<dyn GamepadBackend>>,
    poller: Option<BackgroundPoller>,
    poll_interval: Duration,
    connected: bool,
    dead_zone: f32,
    default_dead_zone: f32,
    trigger_threshold: f32,
    thumb_threshold: f32,
    /// Time left before the current vibration is silenced. `None` while
    /// silent or vibrating until stopped.
    vibration_remaining: Option<Duration>,
    resend_analog: bool,
}

impl GamepadDevice {
    /// Construct the device for controller slot `index`.
    pub fn new(index: u8, config: &InputConfig) -> Self {
        Self {
            base: DeviceBase::new(format!("Gamepad #{index}"), DeviceKind::Gamepad, index).with_common_name("gamepad"),
            input: AdapterQueue::new(config.adapter_queue_capacity())
                .with_pinned(|input| !matches!(input, GamepadInput::Sample(_))),
            vibration: Arc::new(Mutex::new(None)),
            backend: None,
            poller: None,
            poll_interval: config.gamepad_poll_interval(),
            connected: false,
            dead_zone: config.gamepad_dead_zone(),
            default_dead_zone: config.gamepad_dead_zone(),
            trigger_threshold: config.trigger_button_threshold(),
            thumb_threshold: config.thumb_button_threshold(),
            vibration_remaining: None,
            resend_analog: false,
        }
    }

    /// Poll `backend` from a background thread once the device initializes.
    pub fn with_backend(self, backend: Box<dyn GamepadBackend>) -> Self {
        Self {
            backend: Some(backend),
            ..self
        }
    }

    /// A handle through which a platform adapter feeds samples.
    pub fn producer(&self) -> QueueProducer<GamepadInput> {
        self.input.producer()
    }

    /// Take the most recent motor request, if one is pending.
    pub fn take_vibration(&self) -> Option<Vibration> {
        self.vibration.lock().take()
    }

    pub fn is_connected(&self) -> bool {
        self.connected
    }

    pub fn dead_zone(&self) -> f32 {
        self.dead_zone
    }

    fn request_vibration(&self, vibration: Vibration) {
        *self.vibration.lock() = Some(vibration);
    }

    fn spawn_poller(&mut self, mut backend: Box<dyn GamepadBackend>) -> Result<()> {
        let index = self.base.index();
        let producer = self.input.producer();
        let vibration = Arc::clone(&self.vibration);
        let mut watcher = ConnectionWatcher::new();

        let poller = BackgroundPoller::spawn(format!("gamepad-{index}"), self.poll_interval, move || {
            if let Some(request) = vibration.lock().take() {
                if let Err(e) = backend.set_vibration(index, request) {
                    warn!(error = %e, index, "Failed to set gamepad vibration");
                }
            }
            let sample = backend.poll(index).unwrap_or_else(|e| {
                warn!(error = %e, index, "Failed to poll gamepad");
                None
            });
            producer.extend(watcher.observe(sample));
        })?;

        self.poller = Some(poller);
        Ok(())
    }

    fn process_input(&mut self, input: GamepadInput, ctx: &mut UpdateContext) {
        match input {
            GamepadInput::Connected => self.set_connected(true, ctx),
            GamepadInput::Disconnected => self.set_connected(false, ctx),
            GamepadInput::Sample(sample) => {
                if !self.connected {
                    self.set_connected(true, ctx);
                }
                self.process_sample(&sample, ctx);
            }
        }
    }

    fn set_connected(&mut self, connected: bool, ctx: &mut UpdateContext) {
        if self.connected == connected {
            return;
        }
        self.connected = connected;

        let (kind, index) = (self.base.kind(), self.base.index());
        debug!(device = %self.base.name(), connected, "Gamepad connection changed");
        if connected {
            ctx.post_forced(InputEvent::connect_device(kind, index));
        } else {
            self.vibration_remaining = None;
            self.request_vibration(Vibration::OFF);
            ctx.post_forced(InputEvent::disconnect_device(kind, index));
        }
    }

    fn process_sample(&mut self, sample: &GamepadSample, ctx: &mut UpdateContext) {
        for (&bit, &key) in BUTTON_KEYS.iter() {
            let pressed = sample.buttons.contains(GamepadButtons::from_bits_retain(bit));
            self.set_button(key, pressed, ctx);
        }

        let left_trigger = clamp(sample.left_trigger, 0.0, 1.0);
        let right_trigger = clamp(sample.right_trigger, 0.0, 1.0);
        self.set_analog(KeyId::XiTriggerL, left_trigger, ctx);
        self.set_analog(KeyId::XiTriggerR, right_trigger, ctx);
        self.set_button(KeyId::XiTriggerLBtn, left_trigger > self.trigger_threshold, ctx);
        self.set_button(KeyId::XiTriggerRBtn, right_trigger > self.trigger_threshold, ctx);

        let left = radial_dead_zone(sample.left_thumb, self.dead_zone);
        let right = radial_dead_zone(sample.right_thumb, self.dead_zone);
        self.set_analog(KeyId::XiThumbLX, left.x, ctx);
        self.set_analog(KeyId::XiThumbLY, left.y, ctx);
        self.set_analog(KeyId::XiThumbRX, right.x, ctx);
        self.set_analog(KeyId::XiThumbRY, right.y, ctx);

        let threshold = self.thumb_threshold;
        self.set_button(KeyId::XiThumbLUp, left.y > threshold, ctx);
        self.set_button(KeyId::XiThumbLDown, left.y < -threshold, ctx);
        self.set_button(KeyId::XiThumbLLeft, left.x < -threshold, ctx);
        self.set_button(KeyId::XiThumbLRight, left.x > threshold, ctx);
        self.set_button(KeyId::XiThumbRUp, right.y > threshold, ctx);
        self.set_button(KeyId::XiThumbRDown, right.y < -threshold, ctx);
        self.set_button(KeyId::XiThumbRLeft, right.x < -threshold, ctx);
        self.set_button(KeyId::XiThumbRRight, right.x > threshold, ctx);
    }

    fn set_button(&mut self, key: KeyId, pressed: bool, ctx: &mut UpdateContext) {
        let Some(id) = self.base.symbols().id_by_key_id(key) else {
            return;
        };
        let Some(symbol) = self.base.symbols_mut().get_mut(id) else {
            return;
        };
        if (symbol.value != 0.0) == pressed {
            return;
        }
        symbol.press_event(pressed);
        self.base.post_symbol(id, ctx);
    }

    fn set_analog(&mut self, key: KeyId, value: f32, ctx: &mut UpdateContext) {
        let Some(id) = self.base.symbols().id_by_key_id(key) else {
            return;
        };
        let Some(symbol) = self.base.symbols_mut().get_mut(id) else {
            return;
        };
        if symbol.value == value {
            return;
        }
        symbol.change_event(value);
        self.base.post_symbol(id, ctx);
    }

    fn active_analog_symbols(&self) -> Vec<SymbolId> {
        self.base
            .symbols()
            .iter()
            .filter(|(_, symbol)| symbol.kind.is_analog() && symbol.value != 0.0)
            .map(|(id, _)| id)
            .collect()
    }

    fn tick_vibration(&mut self, frame_time: Duration) {
        let Some(remaining) = self.vibration_remaining else {
            return;
        };
        match remaining.checked_sub(frame_time) {
            Some(remaining) if !remaining.is_zero() => self.vibration_remaining = Some(remaining),
            _ => {
                trace!(device = %self.base.name(), "Vibration expired");
                self.vibration_remaining = None;
                self.request_vibration(Vibration::OFF);
            }
        }
    }
}

impl InputDevice for GamepadDevice {
    fn base(&self) -> &DeviceBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut DeviceBase {
        &mut self.base
    }

    fn init(&mut self, _config: &InputConfig) -> Result<()> {
        self.base
            .reserve_symbols(BUTTON_KEYS.len() + TRIGGERS.len() + AXES.len() + DERIVED_BUTTONS.len());
        for &key in BUTTON_KEYS.values() {
            self.base.map_symbol(key.value(), key, SymbolKind::Button, 0);
        }
        for key in TRIGGERS {
            self.base.map_symbol(key.value(), key, SymbolKind::Trigger, 0);
        }
        for key in AXES {
            self.base.map_symbol(key.value(), key, SymbolKind::Axis, 0);
        }
        for key in DERIVED_BUTTONS {
            self.base.map_symbol(key.value(), key, SymbolKind::Button, 0);
        }

        if let Some(backend) = self.backend.take() {
            self.spawn_poller(backend)?;
        }
        Ok(())
    }

    fn update(&mut self, ctx: &mut UpdateContext) {
        self.tick_vibration(ctx.frame_time());

        if ::std::mem::take(&mut self.resend_analog) && self.connected {
            for id in self.active_analog_symbols() {
                if let Some(symbol) = self.base.symbols_mut().get_mut(id) {
                    symbol.change_event(symbol.value);
                }
                self.base.post_symbol(id, ctx);
            }
        }

        for input in self.input.drain() {
            self.process_input(input, ctx);
        }
    }

    fn clear_analog_key_state(&mut self, cleared: &mut Vec<SymbolId>) {
        let active = self.active_analog_symbols();
        if !active.is_empty() {
            self.resend_analog = true;
        }
        cleared.extend(active);
    }

    fn set_force_feedback(&mut self, params: &ForceFeedback) -> bool {
        if !self.connected {
            return false;
        }

        let vibration = Vibration::rumble(clamp(params.strength_a, 0.0, 1.0), clamp(params.strength_b, 0.0, 1.0))
            .with_trigger(params.trigger.clamped());
        self.vibration_remaining = if params.is_silent() {
            None
        } else if params.effect == EffectId::RumbleFrame {
            Some(Duration::ZERO)
        } else {
            // Zero, negative, non-finite and out of range times vibrate until stopped.
            Some(params.time_in_seconds)
                .filter(|secs| *secs > 0.0)
                .and_then(|secs| Duration::try_from_secs_f32(secs).ok())
        };
        trace!(device = %self.base.name(), ?vibration, effect = ?params.effect, "Vibration requested");
        self.request_vibration(vibration);
        true
    }

    fn set_dead_zone(&mut self, threshold: f32) {
        self.dead_zone = clamp(threshold, 0.0, MAX_DEAD_ZONE);
    }

    fn restore_default_dead_zone(&mut self) {
        self.dead_zone = self.default_dead_zone;
    }

    fn shutdown(&mut self) {
        if let Some(mut poller) = self.poller.take() {
            poller.stop();
        }
        self.input.clear();
        self.vibration_remaining = None;
    }
}
