//! The rotation state machine.
//!
//! The [`Rotator`] owns all writes to the key window and produces the
//! ordered list of [`ClusterEvent`]s the runtime must broadcast after each
//! transition. No I/O happens here: the write lock covers only the
//! in-memory mutation, and announcements (which may block on the network)
//! are the caller's job once the lock is released.

use std::fmt;

use keywheel_proto::{
    INSTALL_KEY_EVENT, REMOVE_KEY_EVENT, SET_DEFAULT_KEY_EVENT, WIPE_KEYS_EVENT,
};
use zeroize::Zeroize;

use crate::{
    env::Environment,
    error::RotateError,
    key::{Key, KeyName},
    window::SharedKeyWindow,
};

/// Rotator lifecycle phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Initial population: wipe, install `ahead + 1` keys, announce the
    /// first default.
    Bootstrap,
    /// Terminal phase: one fresh key per tick, forever.
    SteadyState,
}

/// A key-lifecycle event to broadcast on the cluster bus.
///
/// Event order within one transition is significant: install precedes any
/// eviction, which precedes the default announcement, so every
/// previously-announced default still exists in member views before being
/// retired.
#[derive(PartialEq, Eq)]
pub enum ClusterEvent {
    /// A new key is valid cluster-wide (payload: name ‖ material).
    InstallKey {
        /// Public name, for audit lines.
        name: KeyName,
        /// Full wire bytes. Zeroized when the event is dropped.
        key_bytes: Vec<u8>,
    },
    /// A key was evicted (payload: name only; material never travels).
    RemoveKey {
        /// Name of the retired key.
        name: KeyName,
    },
    /// The named key is now the default for new encryption/signing.
    SetDefaultKey {
        /// Name of the new default key.
        name: KeyName,
    },
    /// Reset signal preceding a fresh bootstrap (empty, coalesced).
    WipeKeys,
}

impl ClusterEvent {
    /// Unprefixed bus event name.
    pub fn event_name(&self) -> &'static str {
        match self {
            Self::InstallKey { .. } => INSTALL_KEY_EVENT,
            Self::RemoveKey { .. } => REMOVE_KEY_EVENT,
            Self::SetDefaultKey { .. } => SET_DEFAULT_KEY_EVENT,
            Self::WipeKeys => WIPE_KEYS_EVENT,
        }
    }

    /// Event payload bytes.
    pub fn payload(&self) -> &[u8] {
        match self {
            Self::InstallKey { key_bytes, .. } => key_bytes,
            Self::RemoveKey { name } | Self::SetDefaultKey { name } => name.as_bytes(),
            Self::WipeKeys => &[],
        }
    }

    /// Whether the bus may coalesce this event.
    ///
    /// Only the reset signal tolerates duplicate suppression; lifecycle
    /// events need ordered reliable-effort delivery.
    pub fn coalesce(&self) -> bool {
        matches!(self, Self::WipeKeys)
    }

    /// The key name this event concerns, if any. Used for audit lines.
    pub fn key_name(&self) -> Option<&KeyName> {
        match self {
            Self::InstallKey { name, .. }
            | Self::RemoveKey { name }
            | Self::SetDefaultKey { name } => Some(name),
            Self::WipeKeys => None,
        }
    }
}

impl Drop for ClusterEvent {
    fn drop(&mut self) {
        if let Self::InstallKey { key_bytes, .. } = self {
            key_bytes.zeroize();
        }
    }
}

impl fmt::Debug for ClusterEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.key_name() {
            Some(name) => write!(f, "{}({})", self.event_name(), name),
            None => f.write_str(self.event_name()),
        }
    }
}

/// Drives the key window through bootstrap and steady-state rotation.
///
/// Exactly one rotator exists per window, and it is the only writer. Each
/// method mutates under the write lock, releases, and returns the events to
/// broadcast — callers must publish them in order before the next
/// transition.
///
/// # Panics
///
/// Methods panic if the window lock is poisoned (a reader panicked while
/// holding it). The daemon treats that as unrecoverable.
#[derive(Debug)]
pub struct Rotator {
    window: SharedKeyWindow,
    phase: Phase,
    material_len: usize,
}

impl Rotator {
    /// Create a rotator over `window`, generating keys with `material_len`
    /// secret bytes.
    pub fn new(window: SharedKeyWindow, material_len: usize) -> Self {
        Self { window, phase: Phase::Bootstrap, material_len }
    }

    /// Current lifecycle phase.
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// First bootstrap step: announce the cluster-wide reset.
    pub fn begin_bootstrap(&mut self) -> Result<Vec<ClusterEvent>, RotateError> {
        if self.phase != Phase::Bootstrap {
            return Err(RotateError::Phase { op: "begin_bootstrap", phase: self.phase });
        }
        Ok(vec![ClusterEvent::WipeKeys])
    }

    /// Second bootstrap step: generate and install `ahead + 1` keys.
    ///
    /// Returns one install event per key, in install order. The runtime
    /// should let the bus settle after these before announcing the default.
    #[allow(clippy::expect_used)]
    pub fn install_initial<E: Environment>(
        &mut self,
        env: &E,
    ) -> Result<Vec<ClusterEvent>, RotateError> {
        if self.phase != Phase::Bootstrap {
            return Err(RotateError::Phase { op: "install_initial", phase: self.phase });
        }

        let mut events = Vec::new();
        {
            let mut window = self.window.write().expect("window lock poisoned");
            let needed = window.ahead() + 1;

            for _ in 0..needed {
                let key = Key::generate(env, self.material_len);
                events.push(ClusterEvent::InstallKey {
                    name: *key.name(),
                    key_bytes: key.wire_bytes(),
                });

                let evicted = window.install(key);
                debug_assert!(evicted.is_none(), "bootstrap cannot overflow the window");
            }
        }

        tracing::info!(keys = events.len(), "bootstrap keys installed");
        Ok(events)
    }

    /// Final bootstrap step: announce the key at index `ahead` as default
    /// and enter steady state.
    ///
    /// Fails with [`RotateError::NotReady`] if the window is still
    /// under-populated (installation was skipped or incomplete).
    #[allow(clippy::expect_used)]
    pub fn announce_default(&mut self) -> Result<Vec<ClusterEvent>, RotateError> {
        if self.phase != Phase::Bootstrap {
            return Err(RotateError::Phase { op: "announce_default", phase: self.phase });
        }

        let name = {
            let window = self.window.read().expect("window lock poisoned");
            let default = window.default_key().ok_or(RotateError::NotReady {
                len: window.len(),
                needed: window.ahead() + 1,
            })?;
            *default.name()
        };

        self.phase = Phase::SteadyState;
        tracing::info!(key = %name, "bootstrap complete, default announced");
        Ok(vec![ClusterEvent::SetDefaultKey { name }])
    }

    /// One steady-state rotation: generate, install, evict if past
    /// capacity, re-announce the default.
    ///
    /// The returned events are ordered install → remove (when an eviction
    /// occurred) → set-default. Key generation happens before the lock is
    /// taken; the write lock covers only the window mutation.
    #[allow(clippy::expect_used)]
    pub fn tick<E: Environment>(&mut self, env: &E) -> Result<Vec<ClusterEvent>, RotateError> {
        if self.phase != Phase::SteadyState {
            return Err(RotateError::Phase { op: "tick", phase: self.phase });
        }

        let key = Key::generate(env, self.material_len);
        let name = *key.name();
        let key_bytes = key.wire_bytes();

        let (evicted, default) = {
            let mut window = self.window.write().expect("window lock poisoned");
            let evicted = window.install(key);
            let default = window
                .default_key()
                .map(|k| *k.name())
                .ok_or(RotateError::NotReady { len: window.len(), needed: window.ahead() + 1 })?;
            (evicted, default)
        };

        let mut events = Vec::with_capacity(3);
        events.push(ClusterEvent::InstallKey { name, key_bytes });
        if let Some(old) = evicted {
            events.push(ClusterEvent::RemoveKey { name: old });
        }
        events.push(ClusterEvent::SetDefaultKey { name: default });
        Ok(events)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, RwLock};

    use super::*;
    use crate::{env::testing::TestEnv, window::KeyWindow};

    const MATERIAL_LEN: usize = 16;

    fn rotator(ahead: usize, behind: usize) -> (Rotator, SharedKeyWindow) {
        let window = Arc::new(RwLock::new(KeyWindow::new(ahead, behind)));
        (Rotator::new(Arc::clone(&window), MATERIAL_LEN), window)
    }

    fn bootstrap(rot: &mut Rotator, env: &TestEnv) {
        rot.begin_bootstrap().unwrap();
        rot.install_initial(env).unwrap();
        rot.announce_default().unwrap();
    }

    #[test]
    fn begin_bootstrap_emits_coalesced_wipe() {
        let (mut rot, _) = rotator(2, 3);
        let events = rot.begin_bootstrap().unwrap();

        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event_name(), "wipe-keys");
        assert!(events[0].coalesce());
        assert!(events[0].payload().is_empty());
    }

    #[test]
    fn install_initial_emits_one_install_per_key() {
        let env = TestEnv::seeded(20);
        let (mut rot, window) = rotator(2, 3);

        rot.begin_bootstrap().unwrap();
        let events = rot.install_initial(&env).unwrap();

        assert_eq!(events.len(), 3);
        assert!(events.iter().all(|e| e.event_name() == "install-key"));
        assert!(events.iter().all(|e| !e.coalesce()));
        assert_eq!(window.read().unwrap().len(), 3);
    }

    #[test]
    fn announce_default_names_window_ahead_and_enters_steady_state() {
        let env = TestEnv::seeded(21);
        let (mut rot, window) = rotator(2, 3);

        rot.begin_bootstrap().unwrap();
        let installs = rot.install_initial(&env).unwrap();
        // Default is the first-installed key: index `ahead` counting from the
        // newest, which is the oldest of the ahead+1 bootstrap keys.
        let expected = *installs[0].key_name().unwrap();

        let events = rot.announce_default().unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event_name(), "set-default-key");
        assert_eq!(*events[0].key_name().unwrap(), expected);
        assert_eq!(rot.phase(), Phase::SteadyState);

        let window = window.read().unwrap();
        assert_eq!(*window.default_key().unwrap().name(), expected);
    }

    #[test]
    fn announce_default_on_empty_window_is_not_ready() {
        let (mut rot, _) = rotator(2, 3);
        rot.begin_bootstrap().unwrap();

        let err = rot.announce_default().unwrap_err();
        assert_eq!(err, RotateError::NotReady { len: 0, needed: 3 });
        assert_eq!(rot.phase(), Phase::Bootstrap);
    }

    #[test]
    fn tick_before_bootstrap_is_a_phase_error() {
        let env = TestEnv::seeded(22);
        let (mut rot, _) = rotator(1, 1);

        let err = rot.tick(&env).unwrap_err();
        assert_eq!(err, RotateError::Phase { op: "tick", phase: Phase::Bootstrap });
    }

    #[test]
    fn bootstrap_steps_rejected_in_steady_state() {
        let env = TestEnv::seeded(23);
        let (mut rot, _) = rotator(1, 1);
        bootstrap(&mut rot, &env);

        assert!(matches!(rot.begin_bootstrap(), Err(RotateError::Phase { .. })));
        assert!(matches!(rot.install_initial(&env), Err(RotateError::Phase { .. })));
        assert!(matches!(rot.announce_default(), Err(RotateError::Phase { .. })));
    }

    #[test]
    fn tick_below_capacity_emits_install_then_default() {
        let env = TestEnv::seeded(24);
        let (mut rot, _) = rotator(2, 3);
        bootstrap(&mut rot, &env);

        let events = rot.tick(&env).unwrap();
        let names: Vec<&str> = events.iter().map(ClusterEvent::event_name).collect();
        assert_eq!(names, vec!["install-key", "set-default-key"]);
    }

    #[test]
    fn tick_at_capacity_emits_install_remove_default_in_order() {
        let env = TestEnv::seeded(25);
        let (mut rot, window) = rotator(0, 0); // capacity 1
        bootstrap(&mut rot, &env);

        let events = rot.tick(&env).unwrap();
        let names: Vec<&str> = events.iter().map(ClusterEvent::event_name).collect();
        assert_eq!(names, vec!["install-key", "remove-key", "set-default-key"]);

        // The just-installed key is both the newest entry and the default.
        assert_eq!(events[0].key_name(), events[2].key_name());
        assert_eq!(window.read().unwrap().len(), 1);
    }

    #[test]
    fn tick_default_trails_install_by_ahead() {
        let env = TestEnv::seeded(26);
        let (mut rot, _) = rotator(2, 3);
        bootstrap(&mut rot, &env);

        let mut installed = Vec::new();
        for _ in 0..4 {
            let events = rot.tick(&env).unwrap();
            installed.push(*events[0].key_name().unwrap());

            let default = *events.last().unwrap().key_name().unwrap();
            if installed.len() >= 3 {
                // Default is the key installed two ticks ago.
                assert_eq!(default, installed[installed.len() - 3]);
            }
        }
    }

    #[test]
    fn install_event_payload_carries_name_and_material() {
        let env = TestEnv::seeded(27);
        let (mut rot, _) = rotator(0, 0);
        bootstrap(&mut rot, &env);

        let events = rot.tick(&env).unwrap();
        let install = &events[0];
        assert_eq!(install.payload().len(), keywheel_proto::NAME_LEN + MATERIAL_LEN);
        assert_eq!(
            &install.payload()[..keywheel_proto::NAME_LEN],
            install.key_name().unwrap().as_bytes()
        );

        // Name-only events never include material.
        for event in &events[1..] {
            assert_eq!(event.payload().len(), keywheel_proto::NAME_LEN);
        }
    }

    #[test]
    fn debug_output_shows_name_never_material() {
        let env = TestEnv::seeded(28);
        let (mut rot, _) = rotator(0, 0);
        bootstrap(&mut rot, &env);

        let events = rot.tick(&env).unwrap();
        let install = &events[0];
        let material_hex = hex::encode(&install.payload()[keywheel_proto::NAME_LEN..]);

        let rendered = format!("{install:?}");
        assert!(rendered.starts_with("install-key("));
        assert!(!rendered.contains(&material_hex));
    }
}
