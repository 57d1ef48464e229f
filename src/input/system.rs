//! The input system: device polling, listener dispatch, hold tracking and
//! input blocking tied together into one tick.

use super::{
    blocking::{BlockingRegistry, InputBlock},
    device::{InputDevice, Posted, UpdateContext},
    devices::DeviceManager,
    event::{ForceFeedback, InputEvent, SymbolRef, UnicodeEvent},
    hold::HoldSet,
    keys::{DeviceKind, InputState, KeyId, ModifierMask},
    listener::{same_listener, ListenerHandle, ListenerList},
    symbol::{InputSymbol, SymbolId},
};
use crate::{config::InputConfig, motion::MotionSensorHub};

use ::glam::Vec2;
use ::std::time::Duration;
use ::tracing::{debug, trace};

/// Owner of every device and listener, driven once per frame by
/// [`update`].
///
/// All work happens synchronously on the thread calling [`update`]. Within a
/// tick, events for held symbols are posted first, then each enabled device
/// is polled in registration order and its events dispatched in the order it
/// posted them, and finally a `commit` event marks the frame boundary.
///
/// # Example
///
/// ```
/// use ::std::{cell::RefCell, rc::Rc, time::Duration};
/// use ::switchboard::{
///     config::InputConfig,
///     input::{InputEvent, InputEventListener, InputSystem, KeyId},
/// };
///
/// #[derive(Default)]
/// struct FrameCounter {
///     frames: usize,
/// }
///
/// impl InputEventListener for FrameCounter {
///     fn on_input_event(&mut self, event: &InputEvent) -> bool {
///         if event.key_id == KeyId::SysCommit {
///             self.frames += 1;
///         }
///         false
///     }
/// }
///
/// let mut input = InputSystem::new(InputConfig::default());
/// let counter = Rc::new(RefCell::new(FrameCounter::default()));
/// input.add_event_listener(counter.clone());
///
/// for _ in 0..3 {
///     input.update(true, Duration::from_millis(16));
/// }
/// assert_eq!(counter.borrow().frames, 3);
/// ```
///
/// [`update`]: Self::update
pub struct InputSystem {
    config: InputConfig,
    devices: DeviceManager,
    listeners: ListenerList,
    console_listeners: ListenerList,
    exclusive_listener: Option<ListenerHandle>,
    hold: HoldSet,
    blocking: BlockingRegistry,
    motion: MotionSensorHub,
    modifiers: ModifierMask,
    pointer_position: Option<Vec2>,
    posting_enabled: bool,
    retriggering: bool,
    had_focus: bool,
}

impl ::std::fmt::Debug for InputSystem {
    fn fmt(&self, f: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
        f.debug_struct("InputSystem")
            .field("devices", &self.devices)
            .field("listeners", &self.listeners.len())
            .field("console_listeners", &self.console_listeners.len())
            .field("exclusive_listener", &self.exclusive_listener.is_some())
            .field("held", &self.hold.len())
            .field("blocking", &self.blocking.len())
            .field("modifiers", &self.modifiers)
            .field("posting_enabled", &self.posting_enabled)
            .finish()
    }
}

impl InputSystem {
    pub fn new(config: InputConfig) -> Self {
        let motion = MotionSensorHub::new(config.motion_update_interval());
        Self {
            config,
            devices: DeviceManager::new(),
            listeners: ListenerList::new(),
            console_listeners: ListenerList::new(),
            exclusive_listener: None,
            hold: HoldSet::new(),
            blocking: BlockingRegistry::new(),
            motion,
            modifiers: ModifierMask::empty(),
            pointer_position: None,
            posting_enabled: true,
            retriggering: false,
            had_focus: true,
        }
    }

    pub fn config(&self) -> &InputConfig {
        &self.config
    }

    // Listeners

    /// Register a listener. Returns `false` if it was already registered.
    pub fn add_event_listener(&mut self, listener: ListenerHandle) -> bool {
        self.listeners.add(listener)
    }

    pub fn remove_event_listener(&mut self, listener: &ListenerHandle) -> bool {
        self.listeners.remove(listener)
    }

    /// Register a console listener. Console listeners are offered events
    /// after the exclusive listener and ahead of the regular listeners, and
    /// are never subject to input blocking.
    pub fn add_console_event_listener(&mut self, listener: ListenerHandle) -> bool {
        self.console_listeners.add(listener)
    }

    pub fn remove_console_event_listener(&mut self, listener: &ListenerHandle) -> bool {
        self.console_listeners.remove(listener)
    }

    /// Install (or with `None`, remove) the listener offered every event
    /// first. Replaces any previous exclusive listener.
    pub fn set_exclusive_listener(&mut self, listener: Option<ListenerHandle>) {
        self.exclusive_listener = listener;
    }

    pub fn exclusive_listener(&self) -> Option<&ListenerHandle> {
        self.exclusive_listener.as_ref()
    }

    /// Whether `listener` is the installed exclusive listener.
    pub fn is_exclusive_listener(&self, listener: &ListenerHandle) -> bool {
        self.exclusive_listener
            .as_ref()
            .map_or(false, |exclusive| same_listener(exclusive, listener))
    }

    // Devices

    /// Initialize and register a device. Returns `false` (and drops the
    /// device) if initialization failed.
    pub fn add_input_device(&mut self, device: Box<dyn InputDevice>) -> bool {
        self.devices.add_device(device, &self.config)
    }

    pub fn enable_device(&mut self, kind: DeviceKind, enable: bool) {
        self.devices.enable_device(kind, enable);
    }

    pub fn has_input_device_of_type(&self, kind: DeviceKind) -> bool {
        self.devices.has_device_of_kind(kind)
    }

    pub fn device(&self, index: u8, kind: DeviceKind) -> Option<&dyn InputDevice> {
        self.devices.device(index, kind)
    }

    pub fn device_mut(&mut self, index: u8, kind: DeviceKind) -> Option<&mut Box<dyn InputDevice>> {
        self.devices.device_mut(index, kind)
    }

    /// Registered devices in polling order.
    pub fn input_devices(&self) -> impl Iterator<Item = &dyn InputDevice> + '_ {
        self.devices.devices()
    }

    pub fn registered_device_names(&self) -> Vec<&str> {
        self.devices.registered_device_names()
    }

    pub fn input_list_by_device(&self, name: &str) -> Option<&[String]> {
        self.devices.input_list_by_device(name)
    }

    /// Request exclusive OS capture for every device of `kind`. Key state is
    /// cleared first. Returns whether every device accepted.
    pub fn set_exclusive_mode(&mut self, kind: DeviceKind, exclusive: bool) -> bool {
        self.clear_key_state();
        self.devices
            .devices_mut()
            .filter(|d| d.kind() == kind)
            .fold(true, |ok, d| d.set_exclusive_mode(exclusive) && ok)
    }

    pub fn set_dead_zone(&mut self, threshold: f32) {
        for device in self.devices.devices_mut() {
            device.set_dead_zone(threshold);
        }
    }

    pub fn restore_default_dead_zone(&mut self) {
        for device in self.devices.devices_mut() {
            device.restore_default_dead_zone();
        }
    }

    // Force feedback

    /// Route a force feedback request. See
    /// [`DeviceManager::force_feedback_event`].
    pub fn force_feedback_event(&mut self, params: &ForceFeedback) -> bool {
        self.devices.force_feedback_event(params)
    }

    /// Change which device index receives force feedback (`None` for all).
    /// The previous target is silenced.
    pub fn force_feedback_set_device_index(&mut self, index: Option<u8>) {
        self.devices.set_force_feedback_device_index(index);
    }

    pub fn force_feedback_device_index(&self) -> Option<u8> {
        self.devices.force_feedback_device_index()
    }

    // Posting

    /// Globally enable or disable event posting. While disabled only forced
    /// events are dispatched.
    pub fn enable_event_posting(&mut self, enable: bool) {
        debug!(enable, "Event posting");
        self.posting_enabled = enable;
    }

    pub fn is_event_posting_enabled(&self) -> bool {
        self.posting_enabled
    }

    /// Dispatch an event.
    ///
    /// Ignored if posting is disabled and `force` is not set, or if the key
    /// is [`KeyId::Unknown`]. A `disconnect` event first releases everything
    /// held on the disconnected device and clears all key state.
    pub fn post_input_event(&mut self, event: &InputEvent, force: bool) {
        if (!force && !self.posting_enabled) || event.key_id == KeyId::Unknown {
            return;
        }
        trace!(
            key = %event.key_name,
            state = %event.state,
            value = event.value,
            device = %event.device_kind,
            index = event.device_index,
            "Posting input event"
        );

        self.track_event_context(event);

        if event.key_id == KeyId::SysDisconnectDevice {
            self.release_held_on_device(event.device_kind, event.device_index);
            self.clear_key_state();
            self.clear_analog_key_state();
        }

        let blocked = self
            .blocking
            .should_block(event.key_id, event.device_kind, event.device_index);
        if self.deliver(event, blocked) {
            self.update_hold(event);
        }
    }

    /// Dispatch text input. Text input is offered to console listeners, then
    /// the exclusive listener, then regular listeners, and is never blocked.
    pub fn post_unicode_event(&mut self, event: &UnicodeEvent, force: bool) {
        if !force && !self.posting_enabled {
            return;
        }
        trace!(input_char = ?event.input_char, "Posting unicode event");

        if self.console_listeners.dispatch_unicode(event) {
            return;
        }
        if let Some(exclusive) = self.exclusive_listener.clone() {
            if exclusive.borrow_mut().on_unicode_event(event) {
                return;
            }
        }
        self.listeners.dispatch_unicode(event);
    }

    /// Offer an event to the listener chain. Returns whether the hold state
    /// should follow the event.
    fn deliver(&mut self, event: &InputEvent, blocked: bool) -> bool {
        if !blocked {
            if let Some(exclusive) = self.exclusive_listener.clone() {
                if exclusive.borrow_mut().on_input_event(event) {
                    return true;
                }
            }
        }
        if self.console_listeners.dispatch(event) {
            return false;
        }
        if !blocked {
            self.listeners.dispatch(event);
        }
        true
    }

    fn track_event_context(&mut self, event: &InputEvent) {
        match event.device_kind {
            DeviceKind::Keyboard => self.modifiers = event.modifiers,
            DeviceKind::Mouse => {
                if let Some(position) = event.screen_position {
                    self.pointer_position = Some(position);
                }
            }
            _ => {}
        }
    }

    fn update_hold(&mut self, event: &InputEvent) {
        if self.retriggering {
            return;
        }
        let Some(symbol_ref) = event.symbol else {
            return;
        };

        match event.state {
            InputState::Pressed => {
                if let Some(symbol) = self.symbol_mut(symbol_ref) {
                    if symbol.state == InputState::Pressed {
                        symbol.state = InputState::Down;
                    }
                }
                self.hold.insert(symbol_ref);
            }
            InputState::Released => {
                self.hold.remove(&symbol_ref);
            }
            _ => {}
        }
    }

    /// Release every held symbol of the given device, delivering the release
    /// events straight to listeners without consulting input blocking.
    fn release_held_on_device(&mut self, kind: DeviceKind, index: u8) {
        let devices = &self.devices;
        let released = self.hold.drain_where(|symbol_ref| {
            devices
                .device_by_unique_id(symbol_ref.device)
                .map_or(false, |d| d.kind() == kind && d.index() == index)
        });
        debug!(device = %kind, index, released = released.len(), "Device disconnected");

        let modifiers = self.modifiers;
        for symbol_ref in released {
            let Some(symbol) = self.symbol_mut(symbol_ref) else {
                continue;
            };
            symbol.press_event(false);
            let event = InputEvent::from_symbol(symbol, symbol_ref, modifiers);
            self.deliver(&event, false);
        }
    }

    // Key state

    /// Release every active symbol on every device and empty the hold set.
    pub fn clear_key_state(&mut self) {
        for position in 0..self.devices.len() {
            let posted = {
                let Some(device) = self.devices.device_at_mut(position) else {
                    break;
                };
                let mut ctx = UpdateContext::new(self.had_focus, Duration::ZERO, self.modifiers);
                device.clear_key_state(&mut ctx);
                ctx.into_posted()
            };
            self.dispatch_posted(posted);
        }
        self.hold.clear();
    }

    /// Drop held analog symbols from the hold set. Devices re-send their
    /// values on the next update.
    pub fn clear_analog_key_state(&mut self) {
        for device in self.devices.devices_mut() {
            let mut cleared = Vec::new();
            device.clear_analog_key_state(&mut cleared);
            for symbol in cleared {
                self.hold.remove(&SymbolRef {
                    device: device.unique_id(),
                    symbol,
                });
            }
        }
    }

    /// Post one `Pressed` event for every held symbol, so that a newly
    /// registered listener learns what is already held. Symbol state is
    /// restored afterwards and the hold set is left untouched.
    pub fn retrigger_key_state(&mut self) {
        self.retriggering = true;

        let count = self.hold.len();
        for i in 0..count {
            let Some(symbol_ref) = self.hold.get(i) else {
                break;
            };
            let modifiers = self.modifiers;
            let Some(symbol) = self.symbol_mut(symbol_ref) else {
                continue;
            };
            let saved = symbol.state;
            symbol.state = InputState::Pressed;
            let event = InputEvent::from_symbol(symbol, symbol_ref, modifiers);

            self.post_input_event(&event, false);

            if let Some(symbol) = self.symbol_mut(symbol_ref) {
                symbol.state = saved;
            }
        }

        self.retriggering = false;
    }

    /// Whether a [`retrigger_key_state`] pass is in progress.
    ///
    /// [`retrigger_key_state`]: Self::retrigger_key_state
    pub fn is_retriggering(&self) -> bool {
        self.retriggering
    }

    /// Current keyboard modifier state.
    pub fn modifiers(&self) -> ModifierMask {
        self.modifiers
    }

    // Tick

    /// Advance one frame.
    ///
    /// `frame_time` is the wall time since the previous call and drives
    /// blocking expiry and device timers.
    pub fn update(&mut self, has_focus: bool, frame_time: Duration) {
        if self.had_focus && !has_focus && self.config.clear_on_focus_loss() {
            debug!("Focus lost, clearing key state");
            self.clear_key_state();
        }
        self.had_focus = has_focus;

        self.blocking.update(frame_time);
        self.post_hold_events();

        for position in 0..self.devices.len() {
            let posted = {
                let Some(device) = self.devices.device_at_mut(position) else {
                    break;
                };
                if !device.is_enabled() {
                    continue;
                }
                let mut ctx = UpdateContext::new(has_focus, frame_time, self.modifiers);
                device.update(&mut ctx);
                ctx.into_posted()
            };
            self.dispatch_posted(posted);
        }

        self.motion.update();

        let commit = InputEvent::commit(self.modifiers);
        self.post_input_event(&commit, false);
    }

    fn post_hold_events(&mut self) {
        let count = self.hold.len();
        for i in 0..count {
            let Some(symbol_ref) = self.hold.get(i) else {
                break;
            };
            let Some(mut event) = self.event_for(symbol_ref) else {
                continue;
            };
            event.state = InputState::Down;
            event.modifiers = self.modifiers;
            if event.device_kind != DeviceKind::TouchScreen {
                if let Some(position) = self.pointer_position {
                    event.screen_position = Some(position);
                }
            }
            self.post_input_event(&event, false);
        }
    }

    fn dispatch_posted(&mut self, posted: Vec<Posted>) {
        for posted in posted {
            match posted {
                Posted::Input { event, force } => self.post_input_event(&event, force),
                Posted::Unicode(event) => self.post_unicode_event(&event, false),
            }
        }
    }

    /// Shut down every device and drop all listeners, holds and blocks.
    pub fn shutdown(&mut self) {
        debug!("Shutting down input system");
        self.devices.shutdown();
        self.listeners.clear();
        self.console_listeners.clear();
        self.exclusive_listener = None;
        self.hold.clear();
        self.blocking.clear();
        self.motion.shutdown();
    }

    // Queries

    /// The default name of a key.
    pub fn key_name(&self, key_id: KeyId) -> &'static str {
        key_id.name()
    }

    /// The name an event was posted with.
    pub fn event_key_name<'a>(&self, event: &'a InputEvent) -> &'a str {
        &event.key_name
    }

    /// The symbol for `key_id` on the device of `kind` with the given index.
    pub fn lookup_symbol(&self, kind: DeviceKind, index: u8, key_id: KeyId) -> Option<&InputSymbol> {
        self.devices
            .device(index, kind)
            .and_then(|d| d.symbols().lookup_by_key_id(key_id))
    }

    /// The first symbol called `name` on any device, in registration order.
    pub fn symbol_by_name(&self, name: &str) -> Option<&InputSymbol> {
        self.devices
            .devices()
            .find_map(|d| d.symbols().lookup_by_name(name))
    }

    /// Resolve a symbol back-reference.
    pub fn symbol(&self, symbol_ref: SymbolRef) -> Option<&InputSymbol> {
        self.devices
            .device_by_unique_id(symbol_ref.device)
            .and_then(|d| d.symbols().get(symbol_ref.symbol))
    }

    /// Whether any device's symbol called `name` is in exactly `state`.
    pub fn input_state(&self, name: &str, state: InputState) -> bool {
        self.devices.devices().any(|d| d.input_state(name, state))
    }

    pub fn is_held(&self, symbol_ref: &SymbolRef) -> bool {
        self.hold.contains(symbol_ref)
    }

    /// Currently held symbols.
    pub fn held_symbols(&self) -> impl Iterator<Item = SymbolRef> + '_ {
        self.hold.iter()
    }

    /// The back-reference of the symbol for `key_id` on the given device.
    pub fn symbol_ref(&self, kind: DeviceKind, index: u8, key_id: KeyId) -> Option<SymbolRef> {
        let device = self.devices.device(index, kind)?;
        let symbol: SymbolId = device.symbols().id_by_key_id(key_id)?;
        Some(SymbolRef {
            device: device.unique_id(),
            symbol,
        })
    }

    fn symbol_mut(&mut self, symbol_ref: SymbolRef) -> Option<&mut InputSymbol> {
        self.devices
            .device_by_unique_id_mut(symbol_ref.device)
            .and_then(|d| d.base_mut().symbols_mut().get_mut(symbol_ref.symbol))
    }

    fn event_for(&self, symbol_ref: SymbolRef) -> Option<InputEvent> {
        self.symbol(symbol_ref)
            .map(|symbol| InputEvent::from_symbol(symbol, symbol_ref, self.modifiers))
    }

    // Blocking

    /// See [`BlockingRegistry::set`].
    pub fn set_blocking_input(&mut self, block: InputBlock) -> bool {
        self.blocking.set(block)
    }

    pub fn remove_blocking_input(&mut self, block: &InputBlock) -> bool {
        self.blocking.remove(block)
    }

    pub fn has_blocking_input(&self, block: &InputBlock) -> bool {
        self.blocking.contains(block)
    }

    pub fn num_blocking_inputs(&self) -> usize {
        self.blocking.len()
    }

    pub fn clear_blocking_inputs(&mut self) {
        self.blocking.clear();
    }

    pub fn should_block_input(&self, key: KeyId, kind: DeviceKind, index: u8) -> bool {
        self.blocking.should_block(key, kind, index)
    }

    // Motion

    pub fn motion(&self) -> &MotionSensorHub {
        &self.motion
    }

    pub fn motion_mut(&mut self) -> &mut MotionSensorHub {
        &mut self.motion
    }
}

impl Drop for InputSystem {
    fn drop(&mut self) {
        self.devices.shutdown();
    }
}
