//! Raw keyboard samples as delivered by a platform adapter.

use ::widestring::U16Str;

use super::codes::fold_scan_code;

/// A keystroke or text input unit queued by a platform adapter and consumed
/// by the [`KeyboardDevice`] on its next update.
///
/// [`KeyboardDevice`]: super::KeyboardDevice
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum KeyEvent {
    /// A key went down. `repeat` is set for auto-repeat strokes of a key
    /// which is already held.
    KeyDown { scan_code: u8, repeat: bool },
    KeyUp { scan_code: u8 },
    /// One UTF-16 code unit of text input. Surrogate pairs arrive as two
    /// consecutive events.
    Input { wchar: u16 },
}

impl KeyEvent {
    /// A key down for a set 1 scan code plus its extended (E0) flag.
    pub const fn key_down(scan_code: u8, extended: bool, repeat: bool) -> Self {
        Self::KeyDown {
            scan_code: fold_scan_code(scan_code, extended),
            repeat,
        }
    }

    /// A key up for a set 1 scan code plus its extended (E0) flag.
    pub const fn key_up(scan_code: u8, extended: bool) -> Self {
        Self::KeyUp {
            scan_code: fold_scan_code(scan_code, extended),
        }
    }

    /// The text input events for `text`, one per UTF-16 code unit.
    pub fn text(text: &str) -> impl Iterator<Item = Self> + '_ {
        text.encode_utf16().map(|wchar| Self::Input { wchar })
    }

    /// The text input events for UTF-16 text straight from a platform
    /// adapter. Unpaired surrogates are passed through unchanged.
    pub fn utf16_text(text: &U16Str) -> impl Iterator<Item = Self> + '_ {
        text.as_slice().iter().map(|&wchar| Self::Input { wchar })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use ::pretty_assertions::assert_eq;
    use ::widestring::u16str;

    /// Right alt is the extended variant of left alt.
    #[test]
    fn test_extended_key_down() {
        assert_eq!(
            KeyEvent::key_down(0x38, true, false),
            KeyEvent::KeyDown {
                scan_code: 0xB8,
                repeat: false
            }
        );
        assert_eq!(KeyEvent::key_up(0x38, false), KeyEvent::KeyUp { scan_code: 0x38 });
    }

    #[test]
    fn test_text_splits_surrogates() {
        let events: Vec<_> = KeyEvent::text("a𝄞").collect();
        assert_eq!(
            events,
            [
                KeyEvent::Input { wchar: 0x61 },
                KeyEvent::Input { wchar: 0xD834 },
                KeyEvent::Input { wchar: 0xDD1E },
            ]
        );
    }

    #[test]
    fn test_utf16_text_matches_str_text() {
        let from_wide: Vec<_> = KeyEvent::utf16_text(u16str!("ü𝄞")).collect();
        let from_str: Vec<_> = KeyEvent::text("ü𝄞").collect();
        assert_eq!(from_wide, from_str);
        assert_eq!(from_wide.len(), 3);
    }
}
