//! Production Environment implementation using the OS CSPRNG.

use std::time::Duration;

use keywheel_core::Environment;

/// Production environment: OS cryptographic RNG and tokio timers.
///
/// # Security
///
/// Randomness comes from getrandom, which provides OS-level cryptographic
/// entropy (e.g., /dev/urandom on Linux, `BCryptGenRandom` on Windows) —
/// required for key material and names.
///
/// # Panics
///
/// Panics if the OS RNG fails. This is intentional: a key generator without
/// functioning cryptographic randomness cannot operate, and continuing
/// would distribute predictable keys to the whole cluster. RNG failure is
/// extremely rare and indicates OS-level problems.
#[derive(Clone, Default)]
pub struct SystemEnv;

impl SystemEnv {
    /// Create a new system environment.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Environment for SystemEnv {
    #[allow(clippy::expect_used)]
    fn random_bytes(&self, buffer: &mut [u8]) {
        getrandom::fill(buffer)
            .expect("invariant: OS RNG failure is unrecoverable for a key generator");
    }

    fn sleep(&self, duration: Duration) -> impl std::future::Future<Output = ()> + Send {
        tokio::time::sleep(duration)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn random_bytes_fills_buffer() {
        let env = SystemEnv::new();

        let mut bytes = [0u8; 64];
        env.random_bytes(&mut bytes);

        let non_zero = bytes.iter().filter(|&&b| b != 0).count();
        assert!(non_zero > 32, "most bytes should be non-zero");
    }

    #[test]
    fn random_bytes_are_random() {
        let env = SystemEnv::new();

        let mut a = [0u8; 32];
        let mut b = [0u8; 32];
        env.random_bytes(&mut a);
        env.random_bytes(&mut b);

        assert_ne!(a, b, "independent draws should differ");
    }

    #[tokio::test]
    async fn sleep_waits_at_least_the_duration() {
        let env = SystemEnv::new();

        let start = tokio::time::Instant::now();
        env.sleep(Duration::from_millis(50)).await;
        assert!(start.elapsed() >= Duration::from_millis(50));
    }
}
