//! Keyboard scan codes and the modifier bits keys control.

use crate::input::{KeyId, ModifierMask, SymbolKind};

use ::lazy_static::lazy_static;
use ::maplit::hashmap;
use ::std::collections::HashMap;

/// DirectInput style scan codes (set 1, with extended keys folded into the
/// high bit) and the key each produces.
pub const SCAN_CODES: &[(u8, KeyId)] = &[
    (0x01, KeyId::Escape),
    (0x02, KeyId::Key1),
    (0x03, KeyId::Key2),
    (0x04, KeyId::Key3),
    (0x05, KeyId::Key4),
    (0x06, KeyId::Key5),
    (0x07, KeyId::Key6),
    (0x08, KeyId::Key7),
    (0x09, KeyId::Key8),
    (0x0A, KeyId::Key9),
    (0x0B, KeyId::Key0),
    (0x0C, KeyId::Minus),
    (0x0D, KeyId::Equals),
    (0x0E, KeyId::Backspace),
    (0x0F, KeyId::Tab),
    (0x10, KeyId::Q),
    (0x11, KeyId::W),
    (0x12, KeyId::E),
    (0x13, KeyId::R),
    (0x14, KeyId::T),
    (0x15, KeyId::Y),
    (0x16, KeyId::U),
    (0x17, KeyId::I),
    (0x18, KeyId::O),
    (0x19, KeyId::P),
    (0x1A, KeyId::LBracket),
    (0x1B, KeyId::RBracket),
    (0x1C, KeyId::Enter),
    (0x1D, KeyId::LCtrl),
    (0x1E, KeyId::A),
    (0x1F, KeyId::S),
    (0x20, KeyId::D),
    (0x21, KeyId::F),
    (0x22, KeyId::G),
    (0x23, KeyId::H),
    (0x24, KeyId::J),
    (0x25, KeyId::K),
    (0x26, KeyId::L),
    (0x27, KeyId::Semicolon),
    (0x28, KeyId::Apostrophe),
    (0x29, KeyId::Tilde),
    (0x2A, KeyId::LShift),
    (0x2B, KeyId::Backslash),
    (0x2C, KeyId::Z),
    (0x2D, KeyId::X),
    (0x2E, KeyId::C),
    (0x2F, KeyId::V),
    (0x30, KeyId::B),
    (0x31, KeyId::N),
    (0x32, KeyId::M),
    (0x33, KeyId::Comma),
    (0x34, KeyId::Period),
    (0x35, KeyId::Slash),
    (0x36, KeyId::RShift),
    (0x37, KeyId::NpMultiply),
    (0x38, KeyId::LAlt),
    (0x39, KeyId::Space),
    (0x3A, KeyId::CapsLock),
    (0x3B, KeyId::F1),
    (0x3C, KeyId::F2),
    (0x3D, KeyId::F3),
    (0x3E, KeyId::F4),
    (0x3F, KeyId::F5),
    (0x40, KeyId::F6),
    (0x41, KeyId::F7),
    (0x42, KeyId::F8),
    (0x43, KeyId::F9),
    (0x44, KeyId::F10),
    (0x45, KeyId::NumLock),
    (0x46, KeyId::ScrollLock),
    (0x47, KeyId::Np7),
    (0x48, KeyId::Np8),
    (0x49, KeyId::Np9),
    (0x4A, KeyId::NpSubtract),
    (0x4B, KeyId::Np4),
    (0x4C, KeyId::Np5),
    (0x4D, KeyId::Np6),
    (0x4E, KeyId::NpAdd),
    (0x4F, KeyId::Np1),
    (0x50, KeyId::Np2),
    (0x51, KeyId::Np3),
    (0x52, KeyId::Np0),
    (0x53, KeyId::NpPeriod),
    (0x56, KeyId::Oem102),
    (0x57, KeyId::F11),
    (0x58, KeyId::F12),
    (0x64, KeyId::F13),
    (0x65, KeyId::F14),
    (0x66, KeyId::F15),
    (0x92, KeyId::Colon),
    (0x93, KeyId::Underline),
    (0x9C, KeyId::NpEnter),
    (0x9D, KeyId::RCtrl),
    (0xB5, KeyId::NpDivide),
    (0xB7, KeyId::Print),
    (0xB8, KeyId::RAlt),
    (0xC5, KeyId::Pause),
    (0xC7, KeyId::Home),
    (0xC8, KeyId::Up),
    (0xC9, KeyId::PgUp),
    (0xCB, KeyId::Left),
    (0xCD, KeyId::Right),
    (0xCF, KeyId::End),
    (0xD0, KeyId::Down),
    (0xD1, KeyId::PgDn),
    (0xD2, KeyId::Insert),
    (0xD3, KeyId::Delete),
    (0xDB, KeyId::LWin),
    (0xDC, KeyId::RWin),
    (0xDD, KeyId::Apps),
];

/// Bit marking an extended (E0 prefixed) key in a folded scan code.
pub const EXTENDED_KEY: u8 = 0x80;

lazy_static! {
    /// Modifier and lock bits controlled by each key. Lock keys toggle
    /// their bit on press; modifier keys hold theirs while down.
    static ref MODIFIER_KEYS: HashMap<KeyId, ModifierMask> = hashmap! {
        KeyId::LCtrl => ModifierMask::LCTRL,
        KeyId::LShift => ModifierMask::LSHIFT,
        KeyId::LAlt => ModifierMask::LALT,
        KeyId::LWin => ModifierMask::LWIN,
        KeyId::RCtrl => ModifierMask::RCTRL,
        KeyId::RShift => ModifierMask::RSHIFT,
        KeyId::RAlt => ModifierMask::RALT,
        KeyId::RWin => ModifierMask::RWIN,
        KeyId::NumLock => ModifierMask::NUM_LOCK,
        KeyId::CapsLock => ModifierMask::CAPS_LOCK,
        KeyId::ScrollLock => ModifierMask::SCROLL_LOCK,
    };
}

/// The modifier or lock bits `key` controls.
pub fn modifier_for(key: KeyId) -> ModifierMask {
    MODIFIER_KEYS
        .get(&key)
        .copied()
        .unwrap_or_else(ModifierMask::empty)
}

/// Lock keys are toggles; everything else is a momentary button.
pub fn symbol_kind_for(key: KeyId) -> SymbolKind {
    if ModifierMask::LOCK_KEYS.intersects(modifier_for(key)) {
        SymbolKind::Toggle
    } else {
        SymbolKind::Button
    }
}

/// Fold a set 1 scan code and its extended flag into a single byte.
pub const fn fold_scan_code(scan_code: u8, extended: bool) -> u8 {
    if extended {
        scan_code | EXTENDED_KEY
    } else {
        scan_code & !EXTENDED_KEY
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::MOUSE_BASE;

    use ::pretty_assertions::assert_eq;
    use ::std::collections::HashSet;
    use ::strum::IntoEnumIterator;

    #[test]
    fn test_scan_codes_are_unique() {
        let codes: HashSet<_> = SCAN_CODES.iter().map(|(code, _)| *code).collect();
        let keys: HashSet<_> = SCAN_CODES.iter().map(|(_, key)| *key).collect();
        assert_eq!(codes.len(), SCAN_CODES.len());
        assert_eq!(keys.len(), SCAN_CODES.len());
    }

    #[test]
    fn test_every_desktop_key_has_a_scan_code() {
        let mapped: HashSet<_> = SCAN_CODES.iter().map(|(_, key)| *key).collect();
        for key in KeyId::iter().filter(|key| key.value() < MOUSE_BASE && *key != KeyId::AndroidBack) {
            assert!(mapped.contains(&key), "{key:?} has no scan code");
        }
    }

    #[test]
    fn test_modifier_kinds() {
        assert_eq!(symbol_kind_for(KeyId::CapsLock), SymbolKind::Toggle);
        assert_eq!(symbol_kind_for(KeyId::LShift), SymbolKind::Button);
        assert_eq!(modifier_for(KeyId::RAlt), ModifierMask::RALT);
        assert_eq!(modifier_for(KeyId::A), ModifierMask::empty());
    }

    #[test]
    fn test_fold_extended() {
        // Right control is left control's scan code with the E0 prefix.
        assert_eq!(fold_scan_code(0x1D, true), 0x9D);
        assert_eq!(fold_scan_code(0x1D, false), 0x1D);
    }
}
