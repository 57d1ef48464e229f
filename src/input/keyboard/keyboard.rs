//! Keyboard state and text input tracking.

use ::bitvec::prelude::*;
use ::std::char::REPLACEMENT_CHARACTER;
use ::tap::Pipe;
use ::tracing::{debug, trace};

use super::{
    codes::{modifier_for, symbol_kind_for, SCAN_CODES},
    KeyEvent,
};
use crate::{
    config::InputConfig,
    errors::Result,
    input::{
        AdapterQueue, DeviceBase, DeviceKind, InputDevice, KeyId, ModifierMask, QueueProducer, SymbolKind,
        UnicodeEvent, UpdateContext,
    },
};

/// The keyboard device.
///
/// # Key Pressed Tracking
///
/// Platform keyboard messages arrive whenever the OS delivers them, which is
/// rarely a convenient point in a game loop. A platform adapter pushes each
/// message into the device's queue through a [`QueueProducer`] and the device
/// turns the backlog into input events on its next update. A bitfield tracks
/// which scan codes are down so auto-repeat strokes and duplicate key downs
/// produce no events.
///
/// # Modifiers
///
/// Each modifier key carries the modifier bit it controls in its symbol's
/// user tag. Shift, control, alt and the OS keys set their bit while held.
/// Caps, num and scroll lock toggle theirs on each press and keep it across
/// [`clear_key_state`].
///
/// # Text Input
///
/// Text input has no 1:1 relationship to key strokes: layouts, dead keys and
/// IMEs all produce characters independently of which keys are down. Text
/// arrives as UTF-16 code units and is posted as one [`UnicodeEvent`] per
/// character. A high surrogate is held back until its low surrogate arrives.
/// Invalid sequences are posted as the unicode replacement character. Control
/// characters other than whitespace are dropped.
///
/// # Example
///
/// ```
/// use ::std::time::Duration;
/// use ::switchboard::{
///     config::InputConfig,
///     input::{keyboard::{KeyboardDevice, KeyEvent}, InputDevice, ModifierMask, UpdateContext},
/// };
///
/// let config = InputConfig::default();
/// let mut keyboard = KeyboardDevice::new(&config);
/// keyboard.init(&config).unwrap();
///
/// // A platform adapter holds on to the producer.
/// let producer = keyboard.producer();
/// producer.push(KeyEvent::key_down(0x1E, false, false));
/// producer.extend(KeyEvent::text("a"));
///
/// let mut ctx = UpdateContext::new(true, Duration::from_millis(16), ModifierMask::empty());
/// keyboard.update(&mut ctx);
///
/// assert_eq!(ctx.input_events().count(), 1);
/// assert_eq!(ctx.unicode_events().next().map(|e| e.input_char), Some('a'));
/// ```
///
/// [`clear_key_state`]: InputDevice::clear_key_state
pub struct KeyboardDevice {
    base: DeviceBase,
    /// Samples pushed by the platform adapter since the last update.
    queue: AdapterQueue<KeyEvent>,
    /// Bitfield which tracks the press state for every scan code.
    pressed: BitArr!(for 256, in usize, Lsb0),
    modifiers: ModifierMask,
    /// High surrogate entry from a surrogate pair. This is `Some` pending
    /// receipt of the following low surrogate.
    pending_surrogate: Option<u16>,
    exclusive: bool,
}

impl KeyboardDevice {
    /// Constructs a keyboard whose adapter queue holds
    /// [`InputConfig::adapter_queue_capacity`] samples.
    pub fn new(config: &InputConfig) -> Self {
        Self {
            base: DeviceBase::new("keyboard", DeviceKind::Keyboard, 0),
            queue: AdapterQueue::new(config.adapter_queue_capacity())
                .with_pinned(|event| matches!(event, KeyEvent::KeyUp { .. })),
            pressed: bitarr![usize, Lsb0; 0; 256],
            modifiers: ModifierMask::empty(),
            pending_surrogate: None,
            exclusive: false,
        }
    }

    /// A handle through which a platform adapter feeds key events, possibly
    /// from another thread.
    pub fn producer(&self) -> QueueProducer<KeyEvent> {
        self.queue.producer()
    }

    /// Returns `true` if the key with the given folded scan code is down.
    pub fn is_scan_code_pressed(&self, scan_code: u8) -> bool {
        usize::from(scan_code)
            .pipe(|bit| self.pressed.get(bit))
            .map_or(false, |bit| *bit)
    }

    /// Returns `true` if the given key is currently down.
    pub fn is_key_pressed(&self, key: KeyId) -> bool {
        self.base
            .symbols()
            .lookup_by_key_id(key)
            .and_then(|symbol| u8::try_from(symbol.raw_id).ok())
            .map_or(false, |scan_code| self.is_scan_code_pressed(scan_code))
    }

    /// The current modifier and lock key state.
    pub fn modifiers(&self) -> ModifierMask {
        self.modifiers
    }

    /// Whether the last exclusive mode request asked for exclusive capture.
    pub fn is_exclusive(&self) -> bool {
        self.exclusive
    }

    fn process_evt(&mut self, evt: KeyEvent, ctx: &mut UpdateContext) {
        match evt {
            KeyEvent::KeyDown { scan_code, repeat } => {
                if repeat || self.is_scan_code_pressed(scan_code) {
                    return;
                }
                self.pressed.set(usize::from(scan_code), true);
                self.process_key(scan_code, true, ctx);
            }
            KeyEvent::KeyUp { scan_code } => {
                if !self.is_scan_code_pressed(scan_code) {
                    return;
                }
                self.pressed.set(usize::from(scan_code), false);
                self.process_key(scan_code, false, ctx);
            }
            KeyEvent::Input { wchar } => match self.pending_surrogate.take() {
                Some(high) => {
                    let low = wchar;
                    // Nothing can be recovered from a broken pair; take the
                    // replacement character instead.
                    Self::process_char_input(
                        char::decode_utf16([high, low]).map(|r| r.unwrap_or(REPLACEMENT_CHARACTER)),
                        ctx,
                    );
                }
                None => match char::decode_utf16([wchar]).next() {
                    // A high surrogate waits for the low surrogate which follows.
                    Some(Err(err)) if is_high_surrogate(err.unpaired_surrogate()) => {
                        self.pending_surrogate = Some(err.unpaired_surrogate());
                    }
                    Some(Err(_)) => Self::process_char_input([REPLACEMENT_CHARACTER], ctx),
                    Some(Ok(ch)) => Self::process_char_input([ch], ctx),
                    None => (),
                },
            },
        }
    }

    fn process_key(&mut self, scan_code: u8, pressed: bool, ctx: &mut UpdateContext) {
        let Some(id) = self.base.symbols().id_by_raw_id(u32::from(scan_code)) else {
            trace!(scan_code, "Ignoring unmapped scan code");
            return;
        };
        let Some(symbol) = self.base.symbols_mut().get_mut(id) else {
            return;
        };

        symbol.press_event(pressed);
        let bits = ModifierMask::from_bits_truncate(symbol.user);
        match symbol.kind {
            SymbolKind::Toggle if pressed => self.modifiers.toggle(bits),
            SymbolKind::Toggle => (),
            _ if pressed => self.modifiers.insert(bits),
            _ => self.modifiers.remove(bits),
        }

        ctx.set_modifiers(self.modifiers);
        self.base.post_symbol(id, ctx);
    }

    fn process_char_input<I>(chars: I, ctx: &mut UpdateContext)
    where
        I: IntoIterator<Item = char>,
    {
        for c in chars {
            // Drop any control characters that are not whitespace
            if c.is_control() && !c.is_whitespace() {
                continue;
            }
            ctx.post_unicode(UnicodeEvent::new(c));
        }
    }
}

fn is_high_surrogate(wchar: u16) -> bool {
    (0xD800..0xDC00).contains(&wchar)
}

impl InputDevice for KeyboardDevice {
    fn base(&self) -> &DeviceBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut DeviceBase {
        &mut self.base
    }

    fn init(&mut self, _config: &InputConfig) -> Result<()> {
        self.base.reserve_symbols(SCAN_CODES.len());
        for &(scan_code, key) in SCAN_CODES {
            self.base
                .map_symbol(u32::from(scan_code), key, symbol_kind_for(key), modifier_for(key).bits());
        }
        debug!(symbols = SCAN_CODES.len(), "Keyboard initialized");
        Ok(())
    }

    fn update(&mut self, ctx: &mut UpdateContext) {
        let backlog = self.queue.drain();
        if !ctx.has_focus() {
            if !backlog.is_empty() {
                trace!(dropped = backlog.len(), "Dropping keyboard input without focus");
            }
            return;
        }

        ctx.set_modifiers(self.modifiers);
        for evt in backlog {
            self.process_evt(evt, ctx);
        }
    }

    fn clear_key_state(&mut self, ctx: &mut UpdateContext) {
        self.pressed = BitArray::ZERO;
        self.pending_surrogate = None;
        self.modifiers &= ModifierMask::LOCK_KEYS;
        ctx.set_modifiers(self.modifiers);
        self.base.clear_key_state(ctx);
    }

    fn set_exclusive_mode(&mut self, exclusive: bool) -> bool {
        debug!(exclusive, "Keyboard exclusive mode");
        self.exclusive = exclusive;
        true
    }

    fn shutdown(&mut self) {
        self.queue.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::{InputState, SymbolId, MOUSE_BASE};

    use ::pretty_assertions::assert_eq;
    use ::std::{ops::Not, time::Duration};
    use ::strum::IntoEnumIterator;
    use ::widestring::u16str;

    mod event_samples {
        use super::*;

        /// Press and release "a" character.
        pub const PRESS_RELEASE_A: &[KeyEvent] = &[
            KeyEvent::key_down(0x1E, false, false),
            KeyEvent::Input { wchar: 0x61 },
            KeyEvent::key_up(0x1E, false),
        ];

        /// Hold shift while typing "A".
        pub const SHIFT_A: &[KeyEvent] = &[
            KeyEvent::key_down(0x2A, false, false),
            KeyEvent::key_down(0x1E, false, false),
            KeyEvent::Input { wchar: 0x41 },
            KeyEvent::key_up(0x1E, false),
            KeyEvent::key_up(0x2A, false),
        ];

        /// Press and release "backspace" key.
        pub const PRESS_RELEASE_BACKSPACE: &[KeyEvent] = &[
            KeyEvent::key_down(0x0E, false, false),
            KeyEvent::Input { wchar: 0x08 },
            KeyEvent::key_up(0x0E, false),
        ];

        /// Text entry for 'ö' ('"' + 'o' combo on international keyboard).
        /// The dead key produces no text of its own.
        pub const PRESS_RELEASE_INTERNATIONAL_UMLAUT: &[KeyEvent] = &[
            KeyEvent::key_down(0x2A, false, false),
            KeyEvent::key_down(0x28, false, false),
            KeyEvent::key_up(0x28, false),
            KeyEvent::key_up(0x2A, false),
            KeyEvent::key_down(0x18, false, false),
            KeyEvent::Input { wchar: 0xF6 },
            KeyEvent::key_up(0x18, false),
        ];

        /// Emoji input for 👌 using emoji keyboard ("win-.")
        pub const EMOJI_INPUT_OK_HAND: &[KeyEvent] = &[
            KeyEvent::key_down(0x5B, true, false),
            KeyEvent::key_down(0x34, false, false),
            KeyEvent::key_up(0x34, false),
            KeyEvent::key_up(0x5B, true),
            KeyEvent::Input { wchar: 0xD83D },
            KeyEvent::Input { wchar: 0xDC4C },
        ];
    }

    fn keyboard() -> KeyboardDevice {
        let config = InputConfig::default();
        let mut keyboard = KeyboardDevice::new(&config);
        keyboard.init(&config).unwrap();
        keyboard
    }

    fn update_with(keyboard: &mut KeyboardDevice, events: &[KeyEvent]) -> UpdateContext {
        keyboard.producer().extend(events.iter().copied());
        let mut ctx = UpdateContext::new(true, Duration::from_millis(16), ModifierMask::empty());
        keyboard.update(&mut ctx);
        ctx
    }

    fn symbol_ids(keyboard: &KeyboardDevice, keys: &[KeyId]) -> Vec<SymbolId> {
        keys.iter()
            .filter_map(|key| keyboard.symbols().id_by_key_id(*key))
            .collect()
    }

    fn key_transitions(ctx: &UpdateContext) -> Vec<(KeyId, InputState)> {
        ctx.input_events()
            .map(|event| (event.key_id, event.state))
            .collect()
    }

    fn text(ctx: &UpdateContext) -> String {
        ctx.unicode_events().map(|event| event.input_char).collect()
    }

    /// A basic smoke test for key pressed events.
    #[test]
    fn test_key_pressed_basic() {
        let mut kbd = keyboard();

        assert!(!kbd.is_key_pressed(KeyId::Up));
        update_with(&mut kbd, &[KeyEvent::key_down(0x48, true, false)]);
        assert!(kbd.is_key_pressed(KeyId::Up));
    }

    /// Tests correct handling of a series of key down and key up events.
    #[test]
    fn test_key_pressed() {
        let mut kbd = keyboard();

        let desktop_keys = || KeyId::iter().filter(|key| key.value() < MOUSE_BASE);
        for key in desktop_keys() {
            assert!(!kbd.is_key_pressed(key));
        }

        let ctx = update_with(
            &mut kbd,
            &[
                KeyEvent::key_down(0x1E, false, false),
                KeyEvent::key_down(0x4B, true, false),
                KeyEvent::key_down(0x39, false, false),
                KeyEvent::key_down(0x4B, true, true),
                KeyEvent::key_up(0x1E, false),
                KeyEvent::key_down(0x4B, true, true),
            ],
        );

        assert_eq!(
            key_transitions(&ctx),
            [
                (KeyId::A, InputState::Pressed),
                (KeyId::Left, InputState::Pressed),
                (KeyId::Space, InputState::Pressed),
                (KeyId::A, InputState::Released),
            ]
        );

        let expected_pressed = [KeyId::Space, KeyId::Left];
        for key in expected_pressed {
            assert!(kbd.is_key_pressed(key));
        }
        for key in desktop_keys().filter(|key| expected_pressed.contains(key).not()) {
            assert!(!kbd.is_key_pressed(key));
        }
    }

    /// A key down for a key which is already held posts nothing.
    #[test]
    fn test_duplicate_key_down_is_silent() {
        let mut kbd = keyboard();
        update_with(&mut kbd, &[KeyEvent::key_down(0x1E, false, false)]);

        let ctx = update_with(&mut kbd, &[KeyEvent::key_down(0x1E, false, false)]);
        assert!(ctx.is_empty());

        let ctx = update_with(&mut kbd, &[KeyEvent::key_up(0x1E, false), KeyEvent::key_up(0x1E, false)]);
        assert_eq!(key_transitions(&ctx), [(KeyId::A, InputState::Released)]);
    }

    #[test]
    fn test_press_release_a() {
        let mut kbd = keyboard();
        let ctx = update_with(&mut kbd, event_samples::PRESS_RELEASE_A);

        assert_eq!(
            key_transitions(&ctx),
            [(KeyId::A, InputState::Pressed), (KeyId::A, InputState::Released)]
        );
        assert_eq!(text(&ctx), "a");
        let values: Vec<f32> = ctx.input_events().map(|event| event.value).collect();
        assert_eq!(values, [1.0, 0.0]);
    }

    /// A release survives a flood of text input which overflows the queue.
    #[test]
    fn test_key_up_survives_queue_overflow() {
        let config = InputConfig::builder().with_adapter_queue_capacity(4).build().unwrap();
        let mut kbd = KeyboardDevice::new(&config);
        kbd.init(&config).unwrap();

        update_with(&mut kbd, &[KeyEvent::key_down(0x1E, false, false)]);
        assert!(kbd.is_key_pressed(KeyId::A));

        let flood: Vec<_> = ::std::iter::once(KeyEvent::key_up(0x1E, false))
            .chain(KeyEvent::text(&"x".repeat(10)))
            .collect();
        let ctx = update_with(&mut kbd, &flood);

        assert_eq!(key_transitions(&ctx), [(KeyId::A, InputState::Released)]);
        assert_eq!(text(&ctx), "xxx");
        assert!(!kbd.is_key_pressed(KeyId::A));
    }

    #[test]
    fn test_shift_modifier_is_stamped() {
        let mut kbd = keyboard();
        let ctx = update_with(&mut kbd, event_samples::SHIFT_A);

        let modifiers: Vec<_> = ctx
            .input_events()
            .map(|event| (event.key_id, event.state, event.modifiers))
            .collect();
        assert_eq!(
            modifiers,
            [
                (KeyId::LShift, InputState::Pressed, ModifierMask::LSHIFT),
                (KeyId::A, InputState::Pressed, ModifierMask::LSHIFT),
                (KeyId::A, InputState::Released, ModifierMask::LSHIFT),
                (KeyId::LShift, InputState::Released, ModifierMask::empty()),
            ]
        );
        assert_eq!(text(&ctx), "A");
        assert_eq!(kbd.modifiers(), ModifierMask::empty());
    }

    #[test]
    fn test_caps_lock_toggles() {
        let mut kbd = keyboard();
        let tap = [KeyEvent::key_down(0x3A, false, false), KeyEvent::key_up(0x3A, false)];

        let ctx = update_with(&mut kbd, &tap);
        assert_eq!(
            key_transitions(&ctx),
            [
                (KeyId::CapsLock, InputState::Pressed),
                (KeyId::CapsLock, InputState::Released),
            ]
        );
        assert_eq!(kbd.modifiers(), ModifierMask::CAPS_LOCK);

        update_with(&mut kbd, &tap);
        assert_eq!(kbd.modifiers(), ModifierMask::empty());
    }

    #[test]
    fn test_clear_key_state_keeps_lock_keys() {
        let mut kbd = keyboard();
        update_with(
            &mut kbd,
            &[
                KeyEvent::key_down(0x45, false, false),
                KeyEvent::key_up(0x45, false),
                KeyEvent::key_down(0x1D, true, false),
                KeyEvent::key_down(0x2C, false, false),
            ],
        );
        assert_eq!(kbd.modifiers(), ModifierMask::NUM_LOCK | ModifierMask::RCTRL);

        let mut ctx = UpdateContext::new(true, Duration::ZERO, ModifierMask::empty());
        kbd.clear_key_state(&mut ctx);

        assert_eq!(
            key_transitions(&ctx),
            [(KeyId::Z, InputState::Released), (KeyId::RCtrl, InputState::Released)]
        );
        assert_eq!(kbd.modifiers(), ModifierMask::NUM_LOCK);
        assert_eq!(ctx.modifiers(), ModifierMask::NUM_LOCK);
        assert!(!kbd.is_key_pressed(KeyId::Z));
        assert!(!kbd.is_key_pressed(KeyId::RCtrl));
    }

    #[test]
    fn test_unmapped_scan_code_is_ignored() {
        let mut kbd = keyboard();
        let ctx = update_with(&mut kbd, &[KeyEvent::key_down(0x7F, false, false)]);

        assert!(ctx.is_empty());
        assert!(kbd.is_scan_code_pressed(0x7F));
    }

    #[test]
    fn test_input_dropped_without_focus() {
        let mut kbd = keyboard();
        kbd.producer().extend(event_samples::PRESS_RELEASE_A.iter().copied());

        let mut ctx = UpdateContext::new(false, Duration::from_millis(16), ModifierMask::empty());
        kbd.update(&mut ctx);

        assert!(ctx.is_empty());
        assert!(!kbd.is_key_pressed(KeyId::A));
    }

    /// We expect that a basic stream of ASCII characters should be posted
    /// in order.
    #[test]
    fn test_input_basic() {
        let mut kbd = keyboard();

        let ctx = update_with(&mut kbd, &[]);
        assert!(ctx.is_empty(), "Nothing should be posted before input arrives");

        let events: Vec<_> = KeyEvent::text("Hello, world!").collect();
        let ctx = update_with(&mut kbd, &events);
        assert_eq!(&text(&ctx), "Hello, world!");

        let ctx = update_with(&mut kbd, &[]);
        assert!(ctx.is_empty(), "Input should only be posted once");
    }

    /// Test that valid unicode is handled correctly.
    ///
    /// We use a "Musical Symbol G Clef" character which requires surrogate
    /// pairs to encode in UTF16.
    #[test]
    fn test_input_unicode() {
        let mut kbd = keyboard();

        let events: Vec<_> = [0xD834_u16, 0xDD1E, 0x006d, 0x0075, 0x0073, 0x0069, 0x0063]
            .into_iter()
            .map(|wchar| KeyEvent::Input { wchar })
            .collect();
        let ctx = update_with(&mut kbd, &events);

        assert_eq!(&text(&ctx), "𝄞music");
    }

    /// A surrogate pair split across two updates is still combined.
    #[test]
    fn test_input_surrogate_across_updates() {
        let mut kbd = keyboard();
        let clef = u16str!("𝄞").as_slice();

        let ctx = update_with(&mut kbd, &[KeyEvent::Input { wchar: clef[0] }]);
        assert!(ctx.is_empty());

        let ctx = update_with(&mut kbd, &[KeyEvent::Input { wchar: clef[1] }]);
        assert_eq!(&text(&ctx), "𝄞");
    }

    /// Test that invalid unicode is replaced with the unicode replacement
    /// character.
    #[test]
    fn test_input_invalid_unicode() {
        let mut kbd = keyboard();

        // A lone low surrogate followed by 'm'.
        let ctx = update_with(
            &mut kbd,
            &[KeyEvent::Input { wchar: 0xDD1E }, KeyEvent::Input { wchar: 0x006d }],
        );
        assert_eq!(&text(&ctx), "\u{FFFD}m");

        // A high surrogate followed by 'm'.
        let ctx = update_with(
            &mut kbd,
            &[KeyEvent::Input { wchar: 0xD834 }, KeyEvent::Input { wchar: 0x006d }],
        );
        assert_eq!(&text(&ctx), "\u{FFFD}m");
    }

    #[test]
    fn test_control_characters_are_dropped() {
        let mut kbd = keyboard();
        let ctx = update_with(&mut kbd, event_samples::PRESS_RELEASE_BACKSPACE);

        assert_eq!(
            key_transitions(&ctx),
            [
                (KeyId::Backspace, InputState::Pressed),
                (KeyId::Backspace, InputState::Released),
            ]
        );
        assert_eq!(text(&ctx), "");

        let events: Vec<_> = KeyEvent::text("a\tb\u{1b}\n").collect();
        let ctx = update_with(&mut kbd, &events);
        assert_eq!(text(&ctx), "a\tb\n");
    }

    #[test]
    fn test_international_umlaut() {
        let mut kbd = keyboard();
        let ctx = update_with(&mut kbd, event_samples::PRESS_RELEASE_INTERNATIONAL_UMLAUT);

        assert_eq!(text(&ctx), "ö");
        assert_eq!(ctx.input_events().count(), 6);
    }

    #[test]
    fn test_emoji_input() {
        let mut kbd = keyboard();
        let ctx = update_with(&mut kbd, event_samples::EMOJI_INPUT_OK_HAND);

        assert_eq!(text(&ctx), "👌");
        assert_eq!(
            key_transitions(&ctx),
            [
                (KeyId::LWin, InputState::Pressed),
                (KeyId::Period, InputState::Pressed),
                (KeyId::Period, InputState::Released),
                (KeyId::LWin, InputState::Released),
            ]
        );
    }

    #[test]
    fn test_symbols_carry_modifier_bits() {
        let kbd = keyboard();
        let ids = symbol_ids(&kbd, &[KeyId::LShift, KeyId::CapsLock, KeyId::A]);
        let users: Vec<_> = ids
            .iter()
            .filter_map(|id| kbd.symbols().get(*id))
            .map(|symbol| (symbol.kind, symbol.user))
            .collect();

        assert_eq!(
            users,
            [
                (SymbolKind::Button, ModifierMask::LSHIFT.bits()),
                (SymbolKind::Toggle, ModifierMask::CAPS_LOCK.bits()),
                (SymbolKind::Button, 0),
            ]
        );
    }
}
