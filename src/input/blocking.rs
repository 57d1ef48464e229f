//! Temporary suppression of events for specific keys.

use super::keys::{DeviceKind, KeyId};

use ::std::time::Duration;
use ::tracing::{debug, trace};

/// Which devices a blocking entry applies to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BlockScope {
    /// Every device.
    All,
    /// Only the device with this index.
    Device(u8),
}

impl BlockScope {
    fn matches(self, device_index: u8) -> bool {
        match self {
            Self::All => true,
            Self::Device(index) => index == device_index,
        }
    }
}

/// A rule suppressing delivery of `key` to listeners for `duration` seconds.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct InputBlock {
    pub key: KeyId,
    /// Remaining time in seconds.
    pub duration: f32,
    pub scope: BlockScope,
}

impl InputBlock {
    pub fn new(key: KeyId, duration: f32, scope: BlockScope) -> Self {
        Self {
            key,
            duration,
            scope,
        }
    }

    /// Block `key` on every device.
    pub fn all_devices(key: KeyId, duration: f32) -> Self {
        Self::new(key, duration, BlockScope::All)
    }

    fn same_rule(&self, other: &Self) -> bool {
        self.key == other.key && self.scope == other.scope
    }
}

/// The set of active blocking entries, unique per (key, scope).
#[derive(Clone, Debug, Default)]
pub struct BlockingRegistry {
    entries: Vec<InputBlock>,
}

impl BlockingRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or extend an entry.
    ///
    /// System keys cannot be blocked. If an entry for the same key and scope
    /// exists its duration grows to the larger of the two, and `true` is
    /// returned only if that changed it.
    pub fn set(&mut self, block: InputBlock) -> bool {
        if block.key.is_system() {
            debug!(key = %block.key, "Refusing to block system key");
            return false;
        }

        match self.entries.iter_mut().find(|e| e.same_rule(&block)) {
            Some(existing) if block.duration > existing.duration => {
                existing.duration = block.duration;
                debug!(key = %block.key, duration = block.duration, "Extended input block");
                true
            }
            Some(_) => false,
            None => {
                debug!(key = %block.key, duration = block.duration, scope = ?block.scope, "Added input block");
                self.entries.push(block);
                true
            }
        }
    }

    /// Remove the entry with the same key and scope as `block`.
    pub fn remove(&mut self, block: &InputBlock) -> bool {
        let len = self.entries.len();
        self.entries.retain(|e| !e.same_rule(block));
        self.entries.len() != len
    }

    /// Whether an entry with the same key and scope as `block` exists.
    pub fn contains(&self, block: &InputBlock) -> bool {
        self.entries.iter().any(|e| e.same_rule(block))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Remaining duration of the entry matching `block`.
    pub fn remaining(&self, block: &InputBlock) -> Option<f32> {
        self.entries
            .iter()
            .find(|e| e.same_rule(block))
            .map(|e| e.duration)
    }

    /// Whether events for `key` from the given device are suppressed.
    pub fn should_block(&self, key: KeyId, device_kind: DeviceKind, device_index: u8) -> bool {
        let blocked = self
            .entries
            .iter()
            .any(|e| e.key == key && e.scope.matches(device_index));
        if blocked {
            trace!(key = %key, device = %device_kind, device_index, "Blocked input");
        }
        blocked
    }

    /// Count every entry down by `elapsed` and drop those which reach zero.
    /// An entry added with a zero duration therefore lives until the next
    /// update.
    pub fn update(&mut self, elapsed: Duration) {
        let elapsed = elapsed.as_secs_f32();
        self.entries.retain_mut(|e| {
            e.duration -= elapsed;
            if e.duration <= 0.0 {
                debug!(key = %e.key, "Input block expired");
                return false;
            }
            true
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use ::pretty_assertions::assert_eq;

    const TICK: Duration = Duration::from_millis(250);

    #[test]
    fn test_rejects_system_keys() {
        let mut blocks = BlockingRegistry::new();
        assert!(!blocks.set(InputBlock::all_devices(KeyId::SysCommit, 1.0)));
        assert!(!blocks.set(InputBlock::all_devices(KeyId::Unknown, 1.0)));
        assert!(blocks.is_empty());
    }

    #[test]
    fn test_duration_only_extends() {
        let mut blocks = BlockingRegistry::new();
        let long = InputBlock::all_devices(KeyId::Space, 1.0);
        let short = InputBlock::all_devices(KeyId::Space, 0.5);

        assert!(blocks.set(long));
        assert!(!blocks.set(short));
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks.remaining(&short), Some(1.0));
    }

    #[test]
    fn test_expires_after_duration() {
        let mut blocks = BlockingRegistry::new();
        blocks.set(InputBlock::all_devices(KeyId::Space, 1.0));
        blocks.set(InputBlock::all_devices(KeyId::Space, 0.5));

        for _ in 0..3 {
            blocks.update(TICK);
            assert!(blocks.should_block(KeyId::Space, DeviceKind::Keyboard, 0));
        }
        blocks.update(TICK);
        assert!(blocks.is_empty());
        assert!(!blocks.should_block(KeyId::Space, DeviceKind::Keyboard, 0));
    }

    #[test]
    fn test_zero_duration_survives_until_next_update() {
        let mut blocks = BlockingRegistry::new();
        blocks.set(InputBlock::all_devices(KeyId::Escape, 0.0));
        assert!(blocks.should_block(KeyId::Escape, DeviceKind::Keyboard, 0));

        blocks.update(TICK);
        assert!(blocks.is_empty());
    }

    #[test]
    fn test_scope_matching() {
        let mut blocks = BlockingRegistry::new();
        blocks.set(InputBlock::new(KeyId::XiA, 5.0, BlockScope::Device(2)));

        assert!(blocks.should_block(KeyId::XiA, DeviceKind::Gamepad, 2));
        assert!(!blocks.should_block(KeyId::XiA, DeviceKind::Gamepad, 1));
        assert!(!blocks.should_block(KeyId::XiB, DeviceKind::Gamepad, 2));

        // Same key, different scope is a separate entry.
        assert!(blocks.set(InputBlock::all_devices(KeyId::XiA, 5.0)));
        assert_eq!(blocks.len(), 2);
        assert!(blocks.should_block(KeyId::XiA, DeviceKind::Gamepad, 1));

        assert!(blocks.remove(&InputBlock::all_devices(KeyId::XiA, 0.0)));
        assert!(!blocks.contains(&InputBlock::all_devices(KeyId::XiA, 0.0)));
        assert!(blocks.contains(&InputBlock::new(KeyId::XiA, 0.0, BlockScope::Device(2))));
    }
}
