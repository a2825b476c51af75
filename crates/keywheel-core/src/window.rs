//! The bounded key window.

use std::{
    collections::VecDeque,
    sync::{Arc, RwLock},
};

use crate::key::{Key, KeyName};

/// Shared handle to a [`KeyWindow`].
///
/// The rotator owns all writes; query readers take the read side and copy.
/// The lock is a std `RwLock` and must never be held across an `.await` —
/// both sides copy what they need and release before doing I/O.
pub type SharedKeyWindow = Arc<RwLock<KeyWindow>>;

/// Ordered, bounded collection of keys, newest first.
///
/// Index 0 is the newest key, index `len - 1` the oldest. Capacity is
/// `ahead + 1 + behind`; installing past capacity evicts the oldest entry,
/// wiping its material first. Once `ahead + 1` keys are present, the key at
/// index `ahead` is the default.
///
/// # Invariants
///
/// - `len() <= capacity()` after every operation
/// - `default_key()` is `Some` iff `len() >= ahead + 1`, and then always
///   names the key at index `ahead`
/// - an evicted key's material is all zeros before the value is discarded
#[derive(Debug)]
pub struct KeyWindow {
    keys: VecDeque<Key>,
    ahead: usize,
    behind: usize,
}

impl KeyWindow {
    /// Create an empty window with the given shape.
    pub fn new(ahead: usize, behind: usize) -> Self {
        let capacity = ahead + 1 + behind;
        Self { keys: VecDeque::with_capacity(capacity), ahead, behind }
    }

    /// Number of keys kept ahead of (newer than) the default.
    pub fn ahead(&self) -> usize {
        self.ahead
    }

    /// Maximum number of keys the window holds.
    pub fn capacity(&self) -> usize {
        self.ahead + 1 + self.behind
    }

    /// Current number of keys.
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// Whether the window holds no keys.
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Whether the window is populated enough to have a default key.
    pub fn is_ready(&self) -> bool {
        self.keys.len() > self.ahead
    }

    /// Prepend `key` as the newest entry.
    ///
    /// If the insertion pushes the window past capacity, the oldest entry
    /// is wiped and removed, and its name is returned so the caller can
    /// announce the retirement.
    pub fn install(&mut self, key: Key) -> Option<KeyName> {
        tracing::debug!(key = %key.name(), len = self.keys.len() + 1, "installing key");
        self.keys.push_front(key);

        if self.keys.len() <= self.capacity() {
            return None;
        }

        let mut oldest = self.keys.pop_back()?;
        let name = *oldest.name();
        oldest.wipe();
        debug_assert!(oldest.is_wiped());
        tracing::debug!(key = %name, "evicted oldest key");
        Some(name)
    }

    /// The current default key, or `None` while the window is still
    /// populating.
    ///
    /// An under-populated window is a benign pre-bootstrap condition, not
    /// an error; callers answer queries with an absent default until
    /// installation catches up.
    pub fn default_key(&self) -> Option<&Key> {
        if self.is_ready() { self.keys.get(self.ahead) } else { None }
    }

    /// Point-in-time copy of the window for serialization.
    ///
    /// The copy is taken in one pass while the caller holds the lock, so it
    /// can never straddle an in-progress install.
    pub fn snapshot(&self) -> KeySnapshot {
        KeySnapshot {
            default: self.default_key().map(|k| *k.name()),
            keys: self.keys.iter().map(Key::wire_bytes).collect(),
        }
    }
}

/// Immutable point-in-time copy of the window.
///
/// `keys` holds full wire bytes (name ‖ material) in window order, newest
/// first; `default` is the active key's name when the window is ready.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeySnapshot {
    /// Name of the default key, if bootstrap has populated far enough.
    pub default: Option<KeyName>,
    /// Full key bytes, newest first.
    pub keys: Vec<Vec<u8>>,
}

impl KeySnapshot {
    /// Convert into the wire reply payload.
    pub fn into_response(self) -> keywheel_proto::SnapshotResponse {
        keywheel_proto::SnapshotResponse {
            default: self.default.map(|name| name.as_bytes().to_vec()),
            keys: self.keys,
        }
    }
}

#[cfg(test)]
mod tests {
    use keywheel_proto::NAME_LEN;

    use super::*;
    use crate::env::testing::TestEnv;

    const MATERIAL_LEN: usize = 16;

    fn fresh_key(env: &TestEnv) -> Key {
        Key::generate(env, MATERIAL_LEN)
    }

    #[test]
    fn empty_window_has_no_default() {
        let window = KeyWindow::new(2, 3);
        assert!(window.is_empty());
        assert!(window.default_key().is_none());
        assert!(!window.is_ready());
    }

    #[test]
    fn install_prepends_newest_first() {
        let env = TestEnv::seeded(10);
        let mut window = KeyWindow::new(1, 1);

        let first = fresh_key(&env);
        let first_name = *first.name();
        assert_eq!(window.install(first), None);

        let second = fresh_key(&env);
        assert_eq!(window.install(second), None);

        // After two installs the default (index 1) is the first-installed key.
        assert_eq!(*window.default_key().unwrap().name(), first_name);
    }

    #[test]
    fn default_appears_at_ahead_plus_one_keys() {
        let env = TestEnv::seeded(11);
        let mut window = KeyWindow::new(2, 3);

        window.install(fresh_key(&env));
        window.install(fresh_key(&env));
        assert!(window.default_key().is_none(), "2 keys < ahead+1");

        window.install(fresh_key(&env));
        assert!(window.is_ready());
        assert!(window.default_key().is_some());
    }

    #[test]
    fn eviction_starts_past_capacity_and_reports_oldest() {
        let env = TestEnv::seeded(12);
        let mut window = KeyWindow::new(1, 1); // capacity 3

        let oldest = fresh_key(&env);
        let oldest_name = *oldest.name();
        assert_eq!(window.install(oldest), None);
        assert_eq!(window.install(fresh_key(&env)), None);
        assert_eq!(window.install(fresh_key(&env)), None);
        assert_eq!(window.len(), 3);

        // Fourth install pushes the first one out.
        let evicted = window.install(fresh_key(&env));
        assert_eq!(evicted, Some(oldest_name));
        assert_eq!(window.len(), 3);
    }

    #[test]
    fn capacity_one_window_always_defaults_to_latest() {
        let env = TestEnv::seeded(13);
        let mut window = KeyWindow::new(0, 0);

        let mut previous: Option<KeyName> = None;
        for _ in 0..5 {
            let key = fresh_key(&env);
            let name = *key.name();
            let evicted = window.install(key);

            assert_eq!(evicted, previous, "each install evicts the previous key");
            assert_eq!(window.len(), 1);
            assert_eq!(*window.default_key().unwrap().name(), name);
            previous = Some(name);
        }
    }

    #[test]
    fn snapshot_is_consistent_and_idempotent() {
        let env = TestEnv::seeded(14);
        let mut window = KeyWindow::new(1, 2);

        for _ in 0..3 {
            window.install(fresh_key(&env));
        }

        let a = window.snapshot();
        let b = window.snapshot();
        assert_eq!(a, b, "no intervening install, snapshots must match");

        assert_eq!(a.keys.len(), 3);
        for bytes in &a.keys {
            assert_eq!(bytes.len(), NAME_LEN + MATERIAL_LEN);
        }
        // Default name matches the name portion of the entry at index `ahead`.
        let default = a.default.unwrap();
        assert_eq!(default.as_bytes(), &a.keys[1][..NAME_LEN]);
    }

    #[test]
    fn snapshot_before_ready_has_no_default() {
        let env = TestEnv::seeded(15);
        let mut window = KeyWindow::new(2, 0);
        window.install(fresh_key(&env));

        let snap = window.snapshot();
        assert_eq!(snap.default, None);
        assert_eq!(snap.keys.len(), 1);
    }

    #[test]
    fn into_response_preserves_order_and_default() {
        let env = TestEnv::seeded(16);
        let mut window = KeyWindow::new(0, 1);
        window.install(fresh_key(&env));
        window.install(fresh_key(&env));

        let snap = window.snapshot();
        let expected_keys = snap.keys.clone();
        let expected_default = snap.default.map(|n| n.as_bytes().to_vec());

        let resp = snap.into_response();
        assert_eq!(resp.keys, expected_keys);
        assert_eq!(resp.default, expected_default);
    }
}
