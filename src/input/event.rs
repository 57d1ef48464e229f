//! Events dispatched to listeners and force feedback requests sent to devices.

use super::{
    keys::{DeviceKind, InputState, KeyId, ModifierMask},
    symbol::{InputSymbol, KeyName, SymbolId},
};

use ::glam::Vec2;

/// Back-reference from an event to the symbol it was emitted from.
///
/// Only the hold tracker resolves these; listeners must not retain them past
/// the current tick.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SymbolRef {
    /// Process-unique id of the owning device.
    pub device: u8,
    pub symbol: SymbolId,
}

/// Snapshot of one symbol's state change plus routing metadata.
#[derive(Clone, Debug, PartialEq)]
pub struct InputEvent {
    pub device_kind: DeviceKind,
    /// Disambiguates multiple devices of the same kind (controller 1, 2...).
    pub device_index: u8,
    /// Process-unique id of the originating device.
    pub device_unique_id: u8,
    pub key_id: KeyId,
    pub key_name: KeyName,
    pub state: InputState,
    pub value: f32,
    pub modifiers: ModifierMask,
    pub screen_position: Option<Vec2>,
    pub symbol: Option<SymbolRef>,
}

impl Default for InputEvent {
    fn default() -> Self {
        Self {
            device_kind: DeviceKind::Unknown,
            device_index: 0,
            device_unique_id: 0,
            key_id: KeyId::Unknown,
            key_name: KeyName::Borrowed(""),
            state: InputState::Unknown,
            value: 0.0,
            modifiers: ModifierMask::empty(),
            screen_position: None,
            symbol: None,
        }
    }
}

impl InputEvent {
    /// An event for `key_id` on the given device kind, with the key's default
    /// name and every other field at its default.
    pub fn new(device_kind: DeviceKind, key_id: KeyId) -> Self {
        Self {
            device_kind,
            key_id,
            key_name: KeyName::Borrowed(key_id.name()),
            ..Default::default()
        }
    }

    /// Copy the current state of `symbol` into a new event.
    pub fn from_symbol(symbol: &InputSymbol, symbol_ref: SymbolRef, modifiers: ModifierMask) -> Self {
        Self {
            device_kind: symbol.device_kind,
            device_index: symbol.device_index,
            device_unique_id: symbol_ref.device,
            key_id: symbol.key_id,
            key_name: symbol.name.clone(),
            state: symbol.state,
            value: symbol.value,
            modifiers,
            screen_position: symbol.screen_position,
            symbol: Some(symbol_ref),
        }
    }

    /// The end-of-tick frame boundary marker.
    pub fn commit(modifiers: ModifierMask) -> Self {
        Self {
            modifiers,
            ..Self::new(DeviceKind::Unknown, KeyId::SysCommit)
        }
    }

    /// Announces that device `kind`/`index` became available.
    pub fn connect_device(kind: DeviceKind, index: u8) -> Self {
        Self::new(kind, KeyId::SysConnectDevice).with_device_index(index)
    }

    /// Announces that device `kind`/`index` went away. Posting this event
    /// releases everything held on that device.
    pub fn disconnect_device(kind: DeviceKind, index: u8) -> Self {
        Self::new(kind, KeyId::SysDisconnectDevice).with_device_index(index)
    }

    pub fn with_device_index(self, device_index: u8) -> Self {
        Self {
            device_index,
            ..self
        }
    }

    pub fn with_state(self, state: InputState) -> Self {
        Self { state, ..self }
    }

    pub fn with_value(self, value: f32) -> Self {
        Self { value, ..self }
    }

    pub fn with_modifiers(self, modifiers: ModifierMask) -> Self {
        Self { modifiers, ..self }
    }

    pub fn with_screen_position(self, position: Vec2) -> Self {
        Self {
            screen_position: Some(position),
            ..self
        }
    }
}

/// A unicode code point entered as text. Text input is a separate stream from
/// key events and must be used for anything that edits text.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct UnicodeEvent {
    pub input_char: char,
}

impl UnicodeEvent {
    pub fn new(input_char: char) -> Self {
        Self { input_char }
    }
}

/// Force feedback effect identifier.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum EffectId {
    #[default]
    RumbleBasic,
    /// Rumble for a single frame only.
    RumbleFrame,
}

/// Force feedback for controller triggers.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct TriggerFeedback {
    pub left_gain: f32,
    pub right_gain: f32,
    pub left_envelope: u16,
    pub right_envelope: u16,
    pub left_touch_to_activate: bool,
    pub right_touch_to_activate: bool,
}

impl TriggerFeedback {
    pub const NONE: Self = Self {
        left_gain: 0.0,
        right_gain: 0.0,
        left_envelope: 0,
        right_envelope: 0,
        left_touch_to_activate: false,
        right_touch_to_activate: false,
    };

    /// Full gain on both triggers with a short envelope.
    pub fn full() -> Self {
        Self {
            left_gain: 1.0,
            right_gain: 1.0,
            left_envelope: 4,
            right_envelope: 4,
            ..Self::default()
        }
    }

    pub fn clamped_left_gain(&self) -> f32 {
        ::num_traits::clamp(self.left_gain, 0.0, 1.0)
    }

    pub fn clamped_right_gain(&self) -> f32 {
        ::num_traits::clamp(self.right_gain, 0.0, 1.0)
    }

    /// Copy with both gains clamped to `0.0..=1.0`.
    pub fn clamped(&self) -> Self {
        Self {
            left_gain: self.clamped_left_gain(),
            right_gain: self.clamped_right_gain(),
            ..*self
        }
    }
}

/// A request to drive the haptics of one device.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ForceFeedback {
    pub device_kind: DeviceKind,
    pub effect: EffectId,
    /// Low frequency motor strength.
    pub strength_a: f32,
    /// High frequency motor strength.
    pub strength_b: f32,
    /// Time after which the effect is cleared automatically.
    pub time_in_seconds: f32,
    pub trigger: TriggerFeedback,
}

impl ForceFeedback {
    pub fn rumble(device_kind: DeviceKind, strength_a: f32, strength_b: f32, time_in_seconds: f32) -> Self {
        Self {
            device_kind,
            effect: EffectId::RumbleBasic,
            strength_a,
            strength_b,
            time_in_seconds,
            trigger: TriggerFeedback::default(),
        }
    }

    pub fn with_effect(self, effect: EffectId) -> Self {
        Self { effect, ..self }
    }

    pub fn with_trigger(self, trigger: TriggerFeedback) -> Self {
        Self { trigger, ..self }
    }

    /// A zero strength request, used to silence a device.
    pub fn stop(device_kind: DeviceKind) -> Self {
        Self::rumble(device_kind, 0.0, 0.0, 0.0)
    }

    /// Whether this request turns every motor off.
    pub fn is_silent(&self) -> bool {
        self.strength_a <= 0.0
            && self.strength_b <= 0.0
            && self.trigger.left_gain <= 0.0
            && self.trigger.right_gain <= 0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::symbol::SymbolKind;

    use ::pretty_assertions::assert_eq;

    #[test]
    fn test_new_uses_key_name() {
        let event = InputEvent::new(DeviceKind::Keyboard, KeyId::Space);
        assert_eq!(event.key_name, "space");
        assert_eq!(event.state, InputState::Unknown);
        assert!(event.symbol.is_none());
    }

    #[test]
    fn test_from_symbol_snapshots_state() {
        let mut symbol = InputSymbol::new(3, KeyId::XiB, "xi_b", SymbolKind::Button, 0);
        symbol.device_kind = DeviceKind::Gamepad;
        symbol.device_index = 2;
        symbol.press_event(true);

        let symbol_ref = SymbolRef {
            device: 7,
            symbol: SymbolId(0),
        };
        let event = InputEvent::from_symbol(&symbol, symbol_ref, ModifierMask::LSHIFT);
        symbol.press_event(false);

        assert_eq!(event.state, InputState::Pressed);
        assert_eq!(event.value, 1.0);
        assert_eq!(event.device_index, 2);
        assert_eq!(event.device_unique_id, 7);
        assert_eq!(event.symbol, Some(symbol_ref));
    }

    #[test]
    fn test_system_events() {
        let event = InputEvent::disconnect_device(DeviceKind::Gamepad, 2);
        assert_eq!(event.key_id, KeyId::SysDisconnectDevice);
        assert_eq!(event.device_index, 2);
        assert_eq!(InputEvent::commit(ModifierMask::empty()).key_name, "commit");
    }

    #[test]
    fn test_trigger_gain_is_clamped() {
        let trigger = TriggerFeedback {
            left_gain: 1.5,
            right_gain: -0.5,
            ..TriggerFeedback::default()
        };
        assert_eq!(trigger.clamped_left_gain(), 1.0);
        assert_eq!(trigger.clamped_right_gain(), 0.0);
        assert_eq!(trigger.clamped().left_gain, 1.0);
        assert!(ForceFeedback::stop(DeviceKind::Gamepad).is_silent());

        let triggers_only = ForceFeedback::stop(DeviceKind::Gamepad).with_trigger(TriggerFeedback::full());
        assert!(!triggers_only.is_silent());
    }
}
