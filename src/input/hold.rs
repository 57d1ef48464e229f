//! The set of symbols currently held down.

use super::event::SymbolRef;

use ::std::collections::HashMap;

/// Symbols between a `Pressed` and the matching `Released` transition, in the
/// order they were pressed (until a removal swaps the last entry forward).
///
/// Insertion, removal and membership are all O(1).
#[derive(Clone, Debug, Default)]
pub struct HoldSet {
    held: Vec<SymbolRef>,
    positions: HashMap<SymbolRef, usize>,
}

impl HoldSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a symbol. Returns `false` if it is already held.
    pub fn insert(&mut self, symbol: SymbolRef) -> bool {
        if self.positions.contains_key(&symbol) {
            return false;
        }
        self.positions.insert(symbol, self.held.len());
        self.held.push(symbol);
        true
    }

    /// Remove a symbol by swapping it with the last entry.
    pub fn remove(&mut self, symbol: &SymbolRef) -> bool {
        let Some(pos) = self.positions.remove(symbol) else {
            return false;
        };
        self.held.swap_remove(pos);
        if let Some(moved) = self.held.get(pos) {
            self.positions.insert(*moved, pos);
        }
        true
    }

    pub fn contains(&self, symbol: &SymbolRef) -> bool {
        self.positions.contains_key(symbol)
    }

    pub fn get(&self, index: usize) -> Option<SymbolRef> {
        self.held.get(index).copied()
    }

    pub fn len(&self) -> usize {
        self.held.len()
    }

    pub fn is_empty(&self) -> bool {
        self.held.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = SymbolRef> + '_ {
        self.held.iter().copied()
    }

    /// Remove every held symbol matching `predicate`, returning them in hold
    /// order.
    pub fn drain_where(&mut self, mut predicate: impl FnMut(&SymbolRef) -> bool) -> Vec<SymbolRef> {
        let (drained, kept): (Vec<_>, Vec<_>) = self.held.drain(..).partition(|s| predicate(s));
        self.positions = kept.iter().enumerate().map(|(i, s)| (*s, i)).collect();
        self.held = kept;
        drained
    }

    pub fn clear(&mut self) {
        self.held.clear();
        self.positions.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::symbol::SymbolId;

    use ::pretty_assertions::assert_eq;

    fn sym(device: u8, symbol: u32) -> SymbolRef {
        SymbolRef {
            device,
            symbol: SymbolId(symbol),
        }
    }

    #[test]
    fn test_insert_is_unique() {
        let mut set = HoldSet::new();
        assert!(set.insert(sym(0, 1)));
        assert!(!set.insert(sym(0, 1)));
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn test_remove_swaps_last_forward() {
        let mut set = HoldSet::new();
        for i in 0..4 {
            set.insert(sym(0, i));
        }

        assert!(set.remove(&sym(0, 1)));
        assert!(!set.remove(&sym(0, 1)));
        assert_eq!(set.iter().collect::<Vec<_>>(), [sym(0, 0), sym(0, 3), sym(0, 2)]);

        // The moved entry must still be removable through its new position.
        assert!(set.remove(&sym(0, 3)));
        assert_eq!(set.iter().collect::<Vec<_>>(), [sym(0, 0), sym(0, 2)]);
        assert!(set.contains(&sym(0, 2)));
    }

    #[test]
    fn test_drain_where() {
        let mut set = HoldSet::new();
        set.insert(sym(1, 0));
        set.insert(sym(2, 0));
        set.insert(sym(1, 1));
        set.insert(sym(2, 1));

        let drained = set.drain_where(|s| s.device == 2);
        assert_eq!(drained, [sym(2, 0), sym(2, 1)]);
        assert_eq!(set.iter().collect::<Vec<_>>(), [sym(1, 0), sym(1, 1)]);
        assert!(set.remove(&sym(1, 1)));
        assert_eq!(set.len(), 1);
    }
}
