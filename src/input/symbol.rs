//! Per-device registry of input symbols.
//!
//! A symbol is the canonical representation of one physical element (button,
//! axis, trigger) on one device. The [`SymbolTable`] owns every symbol of a
//! device in a single arena; lookups by raw id, by key id and by name are
//! indices into that arena.

use super::keys::{DeviceKind, InputState, KeyId};

use ::glam::Vec2;
use ::std::{borrow::Cow, collections::HashMap};

/// Human readable name of a key or symbol.
pub type KeyName = Cow<'static, str>;

/// Behavior of a symbol.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SymbolKind {
    /// Momentary button. State is pressed/down/released, value is 0 or 1.
    Button,
    /// Button whose press flips a latched state (caps lock and friends).
    Toggle,
    /// Unbounded relative movement, e.g. mouse deltas.
    RawAxis,
    /// Bounded axis, value in `-1.0..=1.0`.
    Axis,
    /// Bounded trigger, value in `0.0..=1.0`.
    Trigger,
}

impl SymbolKind {
    /// Whether the symbol reports a continuously varying value.
    pub fn is_analog(self) -> bool {
        matches!(self, Self::RawAxis | Self::Axis | Self::Trigger)
    }
}

/// Index of a symbol within its device's [`SymbolTable`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SymbolId(pub(crate) u32);

impl SymbolId {
    /// Position of the symbol in the table.
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// One logical input element of a device together with its current state.
#[derive(Clone, Debug, PartialEq)]
pub struct InputSymbol {
    /// Device internal id of this symbol (scan code, button bit...).
    pub raw_id: u32,
    /// Cross-device logical id.
    pub key_id: KeyId,
    /// Human readable name.
    pub name: KeyName,
    pub kind: SymbolKind,
    pub state: InputState,
    pub value: f32,
    /// Kind dependent tag. Keyboards store the modifier bits a key controls.
    pub user: u32,
    pub device_kind: DeviceKind,
    /// Index of the owning device, cached for routing hold events.
    pub device_index: u8,
    /// Pointer position for mouse and touch symbols.
    pub screen_position: Option<Vec2>,
}

impl InputSymbol {
    /// Construct a symbol in the [`InputState::Unknown`] state.
    pub fn new(raw_id: u32, key_id: KeyId, name: impl Into<KeyName>, kind: SymbolKind, user: u32) -> Self {
        Self {
            raw_id,
            key_id,
            name: name.into(),
            kind,
            state: InputState::Unknown,
            value: 0.0,
            user,
            device_kind: DeviceKind::Unknown,
            device_index: 0,
            screen_position: None,
        }
    }

    /// Apply a button transition. Pressing sets the value to 1, releasing to 0.
    pub fn press_event(&mut self, pressed: bool) {
        if pressed {
            self.state = InputState::Pressed;
            self.value = 1.0;
        } else {
            self.state = InputState::Released;
            self.value = 0.0;
        }
    }

    /// Apply a new analog value.
    pub fn change_event(&mut self, value: f32) {
        self.state = InputState::Changed;
        self.value = value;
    }
}

/// Append-only arena of the symbols of one device.
///
/// ```
/// use ::switchboard::input::{KeyId, SymbolKind, SymbolTable};
///
/// let mut table = SymbolTable::new();
/// let id = table.map_symbol(0x1E, KeyId::A, "a", SymbolKind::Button, 0);
///
/// let by_raw = table.lookup_by_raw_id(0x1E).unwrap();
/// let by_name = table.lookup_by_name("A").unwrap();
/// assert!(::std::ptr::eq(by_raw, by_name));
/// assert_eq!(table.get(id).map(|s| s.key_id), Some(KeyId::A));
/// ```
#[derive(Clone, Debug, Default)]
pub struct SymbolTable {
    symbols: Vec<InputSymbol>,
    by_raw_id: HashMap<u32, SymbolId>,
    by_key_id: HashMap<KeyId, SymbolId>,
    by_name: HashMap<String, SymbolId>,
}

impl SymbolTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-size the arena for `capacity` symbols.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            symbols: Vec::with_capacity(capacity),
            by_raw_id: HashMap::with_capacity(capacity),
            by_key_id: HashMap::with_capacity(capacity),
            by_name: HashMap::with_capacity(capacity),
        }
    }

    /// Register a symbol.
    ///
    /// Registering a key id a second time overwrites the existing symbol in
    /// place (last write wins), so there is never more than one symbol per
    /// key id. A raw id or name registered again simply points at the newer
    /// symbol.
    pub fn map_symbol(
        &mut self,
        raw_id: u32,
        key_id: KeyId,
        name: impl Into<KeyName>,
        kind: SymbolKind,
        user: u32,
    ) -> SymbolId {
        self.insert(InputSymbol::new(raw_id, key_id, name, kind, user))
    }

    /// Register a fully constructed symbol. See [`map_symbol`].
    ///
    /// [`map_symbol`]: Self::map_symbol
    pub fn insert(&mut self, symbol: InputSymbol) -> SymbolId {
        let id = match self.by_key_id.get(&symbol.key_id).copied() {
            Some(existing) => {
                let stale = &self.symbols[existing.index()];
                if self.by_raw_id.get(&stale.raw_id) == Some(&existing) {
                    self.by_raw_id.remove(&stale.raw_id);
                }
                let stale_name = stale.name.to_ascii_lowercase();
                if self.by_name.get(&stale_name) == Some(&existing) {
                    self.by_name.remove(&stale_name);
                }
                self.symbols[existing.index()] = symbol;
                existing
            }
            None => {
                let id = SymbolId(self.symbols.len() as u32);
                self.symbols.push(symbol);
                id
            }
        };

        let symbol = &self.symbols[id.index()];
        self.by_raw_id.insert(symbol.raw_id, id);
        self.by_key_id.insert(symbol.key_id, id);
        self.by_name.insert(symbol.name.to_ascii_lowercase(), id);
        id
    }

    pub fn get(&self, id: SymbolId) -> Option<&InputSymbol> {
        self.symbols.get(id.index())
    }

    pub fn get_mut(&mut self, id: SymbolId) -> Option<&mut InputSymbol> {
        self.symbols.get_mut(id.index())
    }

    pub fn id_by_raw_id(&self, raw_id: u32) -> Option<SymbolId> {
        self.by_raw_id.get(&raw_id).copied()
    }

    pub fn id_by_key_id(&self, key_id: KeyId) -> Option<SymbolId> {
        self.by_key_id.get(&key_id).copied()
    }

    pub fn id_by_name(&self, name: &str) -> Option<SymbolId> {
        self.by_name.get(&name.to_ascii_lowercase()).copied()
    }

    pub fn lookup_by_raw_id(&self, raw_id: u32) -> Option<&InputSymbol> {
        self.id_by_raw_id(raw_id).and_then(|id| self.get(id))
    }

    pub fn lookup_by_key_id(&self, key_id: KeyId) -> Option<&InputSymbol> {
        self.id_by_key_id(key_id).and_then(|id| self.get(id))
    }

    /// Case-insensitive lookup by symbol name.
    pub fn lookup_by_name(&self, name: &str) -> Option<&InputSymbol> {
        self.id_by_name(name).and_then(|id| self.get(id))
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    /// Iterate over all symbols together with their ids, in registration
    /// order.
    pub fn iter(&self) -> impl Iterator<Item = (SymbolId, &InputSymbol)> + '_ {
        self.symbols
            .iter()
            .enumerate()
            .map(|(i, symbol)| (SymbolId(i as u32), symbol))
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (SymbolId, &mut InputSymbol)> + '_ {
        self.symbols
            .iter_mut()
            .enumerate()
            .map(|(i, symbol)| (SymbolId(i as u32), symbol))
    }

    /// Names of all symbols, in registration order.
    pub fn names(&self) -> impl Iterator<Item = &str> + '_ {
        self.symbols.iter().map(|symbol| symbol.name.as_ref())
    }
}
