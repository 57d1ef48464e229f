//! The device capability interface and the state shared by every device.
//!
//! Platform variants do not inherit from one another. Each implements
//! [`InputDevice`] and composes a [`DeviceBase`] for the bookkeeping every
//! device needs (identity, enabled flag, symbol table).

use super::{
    event::{ForceFeedback, InputEvent, SymbolRef, UnicodeEvent},
    keys::{DeviceKind, InputState, KeyId, ModifierMask},
    symbol::{InputSymbol, KeyName, SymbolId, SymbolKind, SymbolTable},
};
use crate::{config::InputConfig, errors::Result};

use ::std::time::Duration;

/// Something a device posted during a call into it. Drained by the
/// [`InputSystem`] in the order it was posted.
///
/// [`InputSystem`]: crate::input::InputSystem
#[derive(Clone, Debug, PartialEq)]
pub(crate) enum Posted {
    Input { event: InputEvent, force: bool },
    Unicode(UnicodeEvent),
}

/// Per-call context handed to a device. Devices read the tick parameters from
/// it and post their events into it.
#[derive(Debug)]
pub struct UpdateContext {
    has_focus: bool,
    frame_time: Duration,
    modifiers: ModifierMask,
    posted: Vec<Posted>,
}

impl UpdateContext {
    pub fn new(has_focus: bool, frame_time: Duration, modifiers: ModifierMask) -> Self {
        Self {
            has_focus,
            frame_time,
            modifiers,
            posted: Vec::new(),
        }
    }

    /// Whether the application has input focus this tick.
    pub fn has_focus(&self) -> bool {
        self.has_focus
    }

    /// Wall time elapsed since the previous tick.
    pub fn frame_time(&self) -> Duration {
        self.frame_time
    }

    /// Modifier state to stamp onto synthesized events.
    pub fn modifiers(&self) -> ModifierMask {
        self.modifiers
    }

    pub fn set_modifiers(&mut self, modifiers: ModifierMask) {
        self.modifiers = modifiers;
    }

    /// Queue an input event for dispatch.
    pub fn post(&mut self, event: InputEvent) {
        self.posted.push(Posted::Input {
            event,
            force: false,
        });
    }

    /// Queue an input event which is dispatched even while event posting is
    /// disabled.
    pub fn post_forced(&mut self, event: InputEvent) {
        self.posted.push(Posted::Input { event, force: true });
    }

    /// Queue a text input event.
    pub fn post_unicode(&mut self, event: UnicodeEvent) {
        self.posted.push(Posted::Unicode(event));
    }

    /// Number of queued items.
    pub fn len(&self) -> usize {
        self.posted.len()
    }

    pub fn is_empty(&self) -> bool {
        self.posted.is_empty()
    }

    /// The queued input events, in posting order.
    pub fn input_events(&self) -> impl Iterator<Item = &InputEvent> + '_ {
        self.posted.iter().filter_map(|posted| match posted {
            Posted::Input { event, .. } => Some(event),
            Posted::Unicode(_) => None,
        })
    }

    /// The queued text input, in posting order.
    pub fn unicode_events(&self) -> impl Iterator<Item = &UnicodeEvent> + '_ {
        self.posted.iter().filter_map(|posted| match posted {
            Posted::Unicode(event) => Some(event),
            Posted::Input { .. } => None,
        })
    }

    pub(crate) fn into_posted(self) -> Vec<Posted> {
        self.posted
    }
}

/// Identity, enablement and the symbol table of one device.
#[derive(Clone, Debug)]
pub struct DeviceBase {
    name: String,
    common_name: String,
    kind: DeviceKind,
    index: u8,
    unique_id: u8,
    enabled: bool,
    symbols: SymbolTable,
}

impl DeviceBase {
    /// Construct the base for a device. The common name defaults to the
    /// device name.
    pub fn new(name: impl Into<String>, kind: DeviceKind, index: u8) -> Self {
        let name = name.into();
        Self {
            common_name: name.clone(),
            name,
            kind,
            index,
            unique_id: 0,
            enabled: true,
            symbols: SymbolTable::new(),
        }
    }

    /// Set the category name shared by every instance of this type of device.
    pub fn with_common_name(self, common_name: impl Into<String>) -> Self {
        Self {
            common_name: common_name.into(),
            ..self
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn common_name(&self) -> &str {
        &self.common_name
    }

    pub fn kind(&self) -> DeviceKind {
        self.kind
    }

    pub fn index(&self) -> u8 {
        self.index
    }

    pub fn unique_id(&self) -> u8 {
        self.unique_id
    }

    pub(crate) fn set_unique_id(&mut self, unique_id: u8) {
        self.unique_id = unique_id;
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    pub fn symbols(&self) -> &SymbolTable {
        &self.symbols
    }

    pub fn symbols_mut(&mut self) -> &mut SymbolTable {
        &mut self.symbols
    }

    /// Size the symbol arena ahead of registering `capacity` symbols.
    pub fn reserve_symbols(&mut self, capacity: usize) {
        if self.symbols.is_empty() {
            self.symbols = SymbolTable::with_capacity(capacity);
        }
    }

    /// Register a symbol named after its key id.
    pub fn map_symbol(&mut self, raw_id: u32, key_id: KeyId, kind: SymbolKind, user: u32) -> SymbolId {
        self.map_named_symbol(raw_id, key_id, key_id.name(), kind, user)
    }

    /// Register a symbol with an explicit name, stamped with this device's
    /// kind and index.
    pub fn map_named_symbol(
        &mut self,
        raw_id: u32,
        key_id: KeyId,
        name: impl Into<KeyName>,
        kind: SymbolKind,
        user: u32,
    ) -> SymbolId {
        let mut symbol = InputSymbol::new(raw_id, key_id, name, kind, user);
        symbol.device_kind = self.kind;
        symbol.device_index = self.index;
        self.symbols.insert(symbol)
    }

    /// Build an event from the current state of a symbol.
    pub fn event_for(&self, id: SymbolId, modifiers: ModifierMask) -> Option<InputEvent> {
        let symbol_ref = SymbolRef {
            device: self.unique_id,
            symbol: id,
        };
        self.symbols
            .get(id)
            .map(|symbol| InputEvent::from_symbol(symbol, symbol_ref, modifiers))
    }

    /// Post the current state of a symbol.
    pub fn post_symbol(&self, id: SymbolId, ctx: &mut UpdateContext) {
        if let Some(event) = self.event_for(id, ctx.modifiers()) {
            ctx.post(event);
        }
    }

    /// Release every symbol with a non-zero value and post a release event for
    /// each.
    pub fn clear_key_state(&mut self, ctx: &mut UpdateContext) {
        let active: Vec<SymbolId> = self
            .symbols
            .iter()
            .filter(|(_, symbol)| symbol.value != 0.0)
            .map(|(id, _)| id)
            .collect();

        for id in active {
            if let Some(symbol) = self.symbols.get_mut(id) {
                symbol.press_event(false);
            }
            self.post_symbol(id, ctx);
        }
    }

    /// Whether the symbol called `name` is currently in exactly `state`.
    pub fn input_state(&self, name: &str, state: InputState) -> bool {
        self.symbols
            .lookup_by_name(name)
            .map_or(false, |symbol| symbol.state == state)
    }
}

/// The capability set every input device provides.
///
/// Only [`base`], [`base_mut`], [`init`] and [`update`] are required; the
/// remaining methods have defaults suitable for a device without haptics,
/// exclusive capture or analog inputs.
///
/// [`base`]: Self::base
/// [`base_mut`]: Self::base_mut
/// [`init`]: Self::init
/// [`update`]: Self::update
pub trait InputDevice {
    fn base(&self) -> &DeviceBase;

    fn base_mut(&mut self) -> &mut DeviceBase;

    /// Acquire platform resources and populate the symbol table. A failed
    /// device is dropped by the device manager.
    fn init(&mut self, config: &InputConfig) -> Result<()>;

    /// Read this tick's platform samples and post one event per symbol whose
    /// observable state changed. Symbols whose state did not change must not
    /// be posted.
    fn update(&mut self, ctx: &mut UpdateContext);

    /// Release every active symbol, posting a release event for each.
    fn clear_key_state(&mut self, ctx: &mut UpdateContext) {
        self.base_mut().clear_key_state(ctx);
    }

    /// Drop continuously held analog symbols, appending their ids to
    /// `cleared`, and arrange for their current values to be re-sent on the
    /// next update.
    fn clear_analog_key_state(&mut self, cleared: &mut Vec<SymbolId>) {
        let _ = cleared;
    }

    /// Request OS level exclusive capture.
    fn set_exclusive_mode(&mut self, exclusive: bool) -> bool {
        let _ = exclusive;
        true
    }

    /// Drive the device's haptics. Devices without haptics return `false`.
    fn set_force_feedback(&mut self, params: &ForceFeedback) -> bool {
        let _ = params;
        false
    }

    /// Set the analog dead zone, in `[0, 1]`.
    fn set_dead_zone(&mut self, threshold: f32) {
        let _ = threshold;
    }

    fn restore_default_dead_zone(&mut self) {}

    /// Release platform resources. Called once before the device is dropped.
    fn shutdown(&mut self) {}

    fn name(&self) -> &str {
        self.base().name()
    }

    fn common_name(&self) -> &str {
        self.base().common_name()
    }

    fn kind(&self) -> DeviceKind {
        self.base().kind()
    }

    fn index(&self) -> u8 {
        self.base().index()
    }

    fn unique_id(&self) -> u8 {
        self.base().unique_id()
    }

    fn is_enabled(&self) -> bool {
        self.base().is_enabled()
    }

    fn enable(&mut self, enabled: bool) {
        self.base_mut().set_enabled(enabled);
    }

    fn symbols(&self) -> &SymbolTable {
        self.base().symbols()
    }

    fn input_state(&self, name: &str, state: InputState) -> bool {
        self.base().input_state(name, state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use ::pretty_assertions::assert_eq;

    fn gamepad_base() -> DeviceBase {
        let mut base = DeviceBase::new("Gamepad #2", DeviceKind::Gamepad, 2).with_common_name("gamepad");
        base.set_unique_id(5);
        base.map_symbol(0, KeyId::XiA, SymbolKind::Button, 0);
        base.map_symbol(1, KeyId::XiThumbLX, SymbolKind::Axis, 0);
        base.map_symbol(2, KeyId::XiB, SymbolKind::Button, 0);
        base
    }

    #[test]
    fn test_symbols_are_stamped_with_device() {
        let base = gamepad_base();
        let symbol = base.symbols().lookup_by_key_id(KeyId::XiA).unwrap();
        assert_eq!(symbol.device_kind, DeviceKind::Gamepad);
        assert_eq!(symbol.device_index, 2);
        assert_eq!(symbol.name, "xi_a");
        assert_eq!(base.common_name(), "gamepad");
    }

    #[test]
    fn test_clear_key_state_releases_active_symbols() {
        let mut base = gamepad_base();
        let a = base.symbols().id_by_key_id(KeyId::XiA).unwrap();
        let x = base.symbols().id_by_key_id(KeyId::XiThumbLX).unwrap();
        base.symbols_mut().get_mut(a).unwrap().press_event(true);
        base.symbols_mut().get_mut(x).unwrap().change_event(-0.5);

        let mut ctx = UpdateContext::new(true, Duration::ZERO, ModifierMask::empty());
        base.clear_key_state(&mut ctx);

        let released: Vec<_> = ctx
            .input_events()
            .map(|event| (event.key_id, event.state, event.value))
            .collect();
        assert_eq!(
            released,
            [
                (KeyId::XiA, InputState::Released, 0.0),
                (KeyId::XiThumbLX, InputState::Released, 0.0),
            ]
        );
        assert!(ctx.input_events().all(|event| event.device_unique_id == 5));
    }

    #[test]
    fn test_input_state_matches_exact_state() {
        let mut base = gamepad_base();
        let b = base.symbols().id_by_key_id(KeyId::XiB).unwrap();
        base.symbols_mut().get_mut(b).unwrap().press_event(true);

        assert!(base.input_state("XI_B", InputState::Pressed));
        assert!(!base.input_state("xi_b", InputState::Down));
        assert!(!base.input_state("xi_nothing", InputState::Pressed));
    }
}
