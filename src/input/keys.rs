//! Canonical key identifiers, device kinds, input states and modifier masks.
//!
//! Key ids are stable across devices: every physical "A button" on every
//! gamepad reports [`KeyId::XiA`], and listeners disambiguate controllers via
//! the device index carried on the event.

use ::lazy_static::lazy_static;
use ::std::{collections::HashMap, str::FromStr};
use ::strum::{Display, EnumIter, EnumString, IntoEnumIterator, IntoStaticStr};

/// First id of the keyboard range.
pub const KEYBOARD_BASE: u32 = 0;
/// First id of the mouse and touch range.
pub const MOUSE_BASE: u32 = 256;
/// First id of the gamepad range.
pub const GAMEPAD_BASE: u32 = 512;
/// First id of the reserved system range.
pub const SYS_BASE: u32 = 4096;

/// The kind of device an event or symbol originates from.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Display, EnumIter, IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
pub enum DeviceKind {
    Keyboard,
    Mouse,
    Joystick,
    Gamepad,
    TouchScreen,
    MotionSensor,
    VirtualKeyboard,
    /// Synthesized events which belong to no device (e.g. `commit`).
    #[default]
    Unknown,
}

/// State of an input symbol, and of the event emitted from it.
///
/// Buttons move through `Pressed -> Down -> Released`. `Changed` is reserved
/// for continuously varying inputs and never enters the hold set on its own.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Display)]
#[strum(serialize_all = "snake_case")]
pub enum InputState {
    #[default]
    Unknown,
    Pressed,
    Released,
    Down,
    Changed,
}

::bitflags::bitflags! {
    /// Modifier and lock keys active at the time of an event.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct ModifierMask: u32 {
        const LCTRL = 1 << 0;
        const LSHIFT = 1 << 1;
        const LALT = 1 << 2;
        const LWIN = 1 << 3;
        const RCTRL = 1 << 4;
        const RSHIFT = 1 << 5;
        const RALT = 1 << 6;
        const RWIN = 1 << 7;
        const NUM_LOCK = 1 << 8;
        const CAPS_LOCK = 1 << 9;
        const SCROLL_LOCK = 1 << 10;

        const CTRL = Self::LCTRL.bits() | Self::RCTRL.bits();
        const SHIFT = Self::LSHIFT.bits() | Self::RSHIFT.bits();
        const ALT = Self::LALT.bits() | Self::RALT.bits();
        const WIN = Self::LWIN.bits() | Self::RWIN.bits();
        const MODIFIERS = Self::CTRL.bits() | Self::SHIFT.bits() | Self::ALT.bits() | Self::WIN.bits();
        const LOCK_KEYS = Self::NUM_LOCK.bits() | Self::CAPS_LOCK.bits() | Self::SCROLL_LOCK.bits();
    }
}

/// Canonical logical key id.
///
/// The string form of each id is its human readable key name, e.g.
/// `KeyId::NpEnter` is `"np_enter"`. Parsing is case-insensitive.
///
/// ```
/// use ::switchboard::input::KeyId;
///
/// assert_eq!(KeyId::XiA.name(), "xi_a");
/// assert_eq!("LShift".parse::<KeyId>(), Ok(KeyId::LShift));
/// assert!(KeyId::SysCommit.is_system());
/// ```
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Display, EnumIter, EnumString, IntoStaticStr,
)]
#[strum(ascii_case_insensitive)]
#[repr(u32)]
pub enum KeyId {
    // Keyboard.
    #[strum(serialize = "escape")]
    Escape = KEYBOARD_BASE,
    #[strum(serialize = "1")]
    Key1,
    #[strum(serialize = "2")]
    Key2,
    #[strum(serialize = "3")]
    Key3,
    #[strum(serialize = "4")]
    Key4,
    #[strum(serialize = "5")]
    Key5,
    #[strum(serialize = "6")]
    Key6,
    #[strum(serialize = "7")]
    Key7,
    #[strum(serialize = "8")]
    Key8,
    #[strum(serialize = "9")]
    Key9,
    #[strum(serialize = "0")]
    Key0,
    #[strum(serialize = "minus")]
    Minus,
    #[strum(serialize = "equals")]
    Equals,
    #[strum(serialize = "backspace")]
    Backspace,
    #[strum(serialize = "tab")]
    Tab,
    #[strum(serialize = "q")]
    Q,
    #[strum(serialize = "w")]
    W,
    #[strum(serialize = "e")]
    E,
    #[strum(serialize = "r")]
    R,
    #[strum(serialize = "t")]
    T,
    #[strum(serialize = "y")]
    Y,
    #[strum(serialize = "u")]
    U,
    #[strum(serialize = "i")]
    I,
    #[strum(serialize = "o")]
    O,
    #[strum(serialize = "p")]
    P,
    #[strum(serialize = "lbracket")]
    LBracket,
    #[strum(serialize = "rbracket")]
    RBracket,
    #[strum(serialize = "enter")]
    Enter,
    #[strum(serialize = "lctrl")]
    LCtrl,
    #[strum(serialize = "a")]
    A,
    #[strum(serialize = "s")]
    S,
    #[strum(serialize = "d")]
    D,
    #[strum(serialize = "f")]
    F,
    #[strum(serialize = "g")]
    G,
    #[strum(serialize = "h")]
    H,
    #[strum(serialize = "j")]
    J,
    #[strum(serialize = "k")]
    K,
    #[strum(serialize = "l")]
    L,
    #[strum(serialize = "semicolon")]
    Semicolon,
    #[strum(serialize = "apostrophe")]
    Apostrophe,
    #[strum(serialize = "tilde")]
    Tilde,
    #[strum(serialize = "lshift")]
    LShift,
    #[strum(serialize = "backslash")]
    Backslash,
    #[strum(serialize = "z")]
    Z,
    #[strum(serialize = "x")]
    X,
    #[strum(serialize = "c")]
    C,
    #[strum(serialize = "v")]
    V,
    #[strum(serialize = "b")]
    B,
    #[strum(serialize = "n")]
    N,
    #[strum(serialize = "m")]
    M,
    #[strum(serialize = "comma")]
    Comma,
    #[strum(serialize = "period")]
    Period,
    #[strum(serialize = "slash")]
    Slash,
    #[strum(serialize = "rshift")]
    RShift,
    #[strum(serialize = "np_multiply")]
    NpMultiply,
    #[strum(serialize = "lalt")]
    LAlt,
    #[strum(serialize = "space")]
    Space,
    #[strum(serialize = "capslock")]
    CapsLock,
    #[strum(serialize = "f1")]
    F1,
    #[strum(serialize = "f2")]
    F2,
    #[strum(serialize = "f3")]
    F3,
    #[strum(serialize = "f4")]
    F4,
    #[strum(serialize = "f5")]
    F5,
    #[strum(serialize = "f6")]
    F6,
    #[strum(serialize = "f7")]
    F7,
    #[strum(serialize = "f8")]
    F8,
    #[strum(serialize = "f9")]
    F9,
    #[strum(serialize = "f10")]
    F10,
    #[strum(serialize = "numlock")]
    NumLock,
    #[strum(serialize = "scrolllock")]
    ScrollLock,
    #[strum(serialize = "np_7")]
    Np7,
    #[strum(serialize = "np_8")]
    Np8,
    #[strum(serialize = "np_9")]
    Np9,
    #[strum(serialize = "np_subtract")]
    NpSubtract,
    #[strum(serialize = "np_4")]
    Np4,
    #[strum(serialize = "np_5")]
    Np5,
    #[strum(serialize = "np_6")]
    Np6,
    #[strum(serialize = "np_add")]
    NpAdd,
    #[strum(serialize = "np_1")]
    Np1,
    #[strum(serialize = "np_2")]
    Np2,
    #[strum(serialize = "np_3")]
    Np3,
    #[strum(serialize = "np_0")]
    Np0,
    #[strum(serialize = "f11")]
    F11,
    #[strum(serialize = "f12")]
    F12,
    #[strum(serialize = "f13")]
    F13,
    #[strum(serialize = "f14")]
    F14,
    #[strum(serialize = "f15")]
    F15,
    #[strum(serialize = "colon")]
    Colon,
    #[strum(serialize = "underline")]
    Underline,
    #[strum(serialize = "np_enter")]
    NpEnter,
    #[strum(serialize = "rctrl")]
    RCtrl,
    #[strum(serialize = "np_period")]
    NpPeriod,
    #[strum(serialize = "np_divide")]
    NpDivide,
    #[strum(serialize = "print")]
    Print,
    #[strum(serialize = "ralt")]
    RAlt,
    #[strum(serialize = "pause")]
    Pause,
    #[strum(serialize = "home")]
    Home,
    #[strum(serialize = "up")]
    Up,
    #[strum(serialize = "pgup")]
    PgUp,
    #[strum(serialize = "left")]
    Left,
    #[strum(serialize = "right")]
    Right,
    #[strum(serialize = "end")]
    End,
    #[strum(serialize = "down")]
    Down,
    #[strum(serialize = "pgdn")]
    PgDn,
    #[strum(serialize = "insert")]
    Insert,
    #[strum(serialize = "delete")]
    Delete,
    #[strum(serialize = "lwin")]
    LWin,
    #[strum(serialize = "rwin")]
    RWin,
    #[strum(serialize = "apps")]
    Apps,
    #[strum(serialize = "oem_102")]
    Oem102,
    #[strum(serialize = "android_back")]
    AndroidBack,
    // Mouse and touch.
    #[strum(serialize = "mouse1")]
    Mouse1 = MOUSE_BASE,
    #[strum(serialize = "mouse2")]
    Mouse2,
    #[strum(serialize = "mouse3")]
    Mouse3,
    #[strum(serialize = "mouse4")]
    Mouse4,
    #[strum(serialize = "mouse5")]
    Mouse5,
    #[strum(serialize = "mouse6")]
    Mouse6,
    #[strum(serialize = "mouse7")]
    Mouse7,
    #[strum(serialize = "mouse8")]
    Mouse8,
    #[strum(serialize = "mwheel_up")]
    MouseWheelUp,
    #[strum(serialize = "mwheel_down")]
    MouseWheelDown,
    #[strum(serialize = "maxis_x")]
    MouseX,
    #[strum(serialize = "maxis_y")]
    MouseY,
    #[strum(serialize = "maxis_z")]
    MouseZ,
    #[strum(serialize = "mouse_pos")]
    MousePosition,
    #[strum(serialize = "mouse_last")]
    MouseLast,
    #[strum(serialize = "touch0")]
    Touch0,
    #[strum(serialize = "touch1")]
    Touch1,
    #[strum(serialize = "touch2")]
    Touch2,
    #[strum(serialize = "touch3")]
    Touch3,
    #[strum(serialize = "touch4")]
    Touch4,
    #[strum(serialize = "touch5")]
    Touch5,
    #[strum(serialize = "touch6")]
    Touch6,
    #[strum(serialize = "touch7")]
    Touch7,
    #[strum(serialize = "touch8")]
    Touch8,
    #[strum(serialize = "touch9")]
    Touch9,
    #[strum(serialize = "touch_last")]
    TouchLast,
    // Gamepad.
    #[strum(serialize = "xi_dpad_up")]
    XiDPadUp = GAMEPAD_BASE,
    #[strum(serialize = "xi_dpad_down")]
    XiDPadDown,
    #[strum(serialize = "xi_dpad_left")]
    XiDPadLeft,
    #[strum(serialize = "xi_dpad_right")]
    XiDPadRight,
    #[strum(serialize = "xi_start")]
    XiStart,
    #[strum(serialize = "xi_back")]
    XiBack,
    #[strum(serialize = "xi_thumbl")]
    XiThumbL,
    #[strum(serialize = "xi_thumbr")]
    XiThumbR,
    #[strum(serialize = "xi_shoulderl")]
    XiShoulderL,
    #[strum(serialize = "xi_shoulderr")]
    XiShoulderR,
    #[strum(serialize = "xi_a")]
    XiA,
    #[strum(serialize = "xi_b")]
    XiB,
    #[strum(serialize = "xi_x")]
    XiX,
    #[strum(serialize = "xi_y")]
    XiY,
    #[strum(serialize = "xi_triggerl")]
    XiTriggerL,
    #[strum(serialize = "xi_triggerr")]
    XiTriggerR,
    #[strum(serialize = "xi_thumblx")]
    XiThumbLX,
    #[strum(serialize = "xi_thumbly")]
    XiThumbLY,
    #[strum(serialize = "xi_thumbl_up")]
    XiThumbLUp,
    #[strum(serialize = "xi_thumbl_down")]
    XiThumbLDown,
    #[strum(serialize = "xi_thumbl_left")]
    XiThumbLLeft,
    #[strum(serialize = "xi_thumbl_right")]
    XiThumbLRight,
    #[strum(serialize = "xi_thumbrx")]
    XiThumbRX,
    #[strum(serialize = "xi_thumbry")]
    XiThumbRY,
    #[strum(serialize = "xi_thumbr_up")]
    XiThumbRUp,
    #[strum(serialize = "xi_thumbr_down")]
    XiThumbRDown,
    #[strum(serialize = "xi_thumbr_left")]
    XiThumbRLeft,
    #[strum(serialize = "xi_thumbr_right")]
    XiThumbRRight,
    #[strum(serialize = "xi_triggerl_btn")]
    XiTriggerLBtn,
    #[strum(serialize = "xi_triggerr_btn")]
    XiTriggerRBtn,
    // System events. Ids from `SysCommit` upwards are never subject to input
    // blocking.
    #[strum(serialize = "commit")]
    SysCommit = SYS_BASE,
    #[strum(serialize = "connect")]
    SysConnectDevice,
    #[strum(serialize = "disconnect")]
    SysDisconnectDevice,
    /// Sentinel for input the device could not classify. Events carrying this
    /// id are dropped on posting.
    #[strum(serialize = "unknown")]
    Unknown = 0xffff_ffff,
}

lazy_static! {
    static ref KEYS_BY_VALUE: HashMap<u32, KeyId> =
        KeyId::iter().map(|key| (key.value(), key)).collect();
}

impl KeyId {
    /// The numeric value of the id.
    pub const fn value(self) -> u32 {
        self as u32
    }

    /// Look up a key id from its numeric value.
    pub fn from_value(value: u32) -> Option<Self> {
        KEYS_BY_VALUE.get(&value).copied()
    }

    /// Look up a key id from its (case-insensitive) name.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::from_str(name).ok()
    }

    /// The human readable name of the key.
    pub fn name(self) -> &'static str {
        self.into()
    }

    /// Whether this id is in the reserved system range (`commit`, `connect`,
    /// `disconnect`, `unknown`). System ids can never be blocked.
    pub const fn is_system(self) -> bool {
        self.value() >= Self::SysCommit.value()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use ::pretty_assertions::assert_eq;
    use ::std::collections::HashSet;

    #[test]
    fn test_range_bases() {
        assert_eq!(KeyId::Escape.value(), KEYBOARD_BASE);
        assert_eq!(KeyId::Mouse1.value(), MOUSE_BASE);
        assert_eq!(KeyId::XiDPadUp.value(), GAMEPAD_BASE);
        assert_eq!(KeyId::SysCommit.value(), SYS_BASE);
        assert_eq!(KeyId::SysDisconnectDevice.value(), SYS_BASE + 2);
    }

    #[test]
    fn test_names_are_unique() {
        let mut seen = HashSet::new();
        for key in KeyId::iter() {
            assert!(seen.insert(key.name()), "{key:?} reuses name {}", key.name());
        }
    }

    #[test]
    fn test_name_and_value_round_trip() {
        for key in KeyId::iter() {
            assert_eq!(KeyId::from_name(key.name()), Some(key));
            assert_eq!(KeyId::from_value(key.value()), Some(key));
        }
    }

    #[test]
    fn test_name_lookup_ignores_case() {
        assert_eq!(KeyId::from_name("NP_ENTER"), Some(KeyId::NpEnter));
        assert_eq!(KeyId::from_name("no_such_key"), None);
    }

    #[test]
    fn test_system_range() {
        assert!(!KeyId::AndroidBack.is_system());
        assert!(!KeyId::XiTriggerRBtn.is_system());
        assert!(KeyId::SysConnectDevice.is_system());
        assert!(KeyId::Unknown.is_system());
    }

    #[test]
    fn test_modifier_groups() {
        assert!(ModifierMask::SHIFT.contains(ModifierMask::RSHIFT));
        assert!(!ModifierMask::MODIFIERS.intersects(ModifierMask::LOCK_KEYS));
    }
}
