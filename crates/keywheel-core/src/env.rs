//! Environment abstraction for deterministic testing.
//!
//! Decouples rotation logic from system resources (randomness, timers).
//! Production code implements this with the OS CSPRNG and tokio timers;
//! tests use a seeded RNG and instant sleeps.

use std::time::Duration;

/// Abstract environment providing randomness and async sleeping.
///
/// # Safety
///
/// Implementations MUST guarantee:
///
/// - `random_bytes()` uses cryptographically secure entropy in production
/// - Methods are infallible except in exceptional circumstances (e.g., OS
///   entropy exhaustion) — entropy failure is unrecoverable for a key
///   generator and implementations may abort rather than return weak bytes
pub trait Environment: Clone + Send + Sync + 'static {
    /// Fills the provided buffer with random bytes.
    ///
    /// # Invariants
    ///
    /// - Given the same RNG seed, this produces the same sequence of bytes
    /// - Uses cryptographically secure RNG in production
    fn random_bytes(&self, buffer: &mut [u8]);

    /// Sleeps for the specified duration.
    ///
    /// This is the ONLY async method in the trait, and it should only be
    /// used by runtime code (not window logic).
    fn sleep(&self, duration: Duration) -> impl std::future::Future<Output = ()> + Send;
}

#[cfg(test)]
pub(crate) mod testing {
    use std::{
        sync::{Arc, Mutex},
        time::Duration,
    };

    use rand::{RngCore, SeedableRng};
    use rand_chacha::ChaCha20Rng;

    use super::Environment;

    /// Deterministic environment: seeded ChaCha RNG, no-op sleep.
    #[derive(Clone)]
    pub struct TestEnv {
        rng: Arc<Mutex<ChaCha20Rng>>,
    }

    impl TestEnv {
        pub fn seeded(seed: u64) -> Self {
            Self { rng: Arc::new(Mutex::new(ChaCha20Rng::seed_from_u64(seed))) }
        }
    }

    impl Environment for TestEnv {
        #[allow(clippy::expect_used)]
        fn random_bytes(&self, buffer: &mut [u8]) {
            self.rng.lock().expect("RNG mutex poisoned").fill_bytes(buffer);
        }

        fn sleep(&self, _duration: Duration) -> impl std::future::Future<Output = ()> + Send {
            async {}
        }
    }
}
