//! Keywheel production agent.
//!
//! Wires the [`keywheel_core`] rotation logic to real I/O: a TCP client
//! for the cluster-bus endpoint, a file/stderr audit trail, the OS CSPRNG,
//! and tokio timers. The [`Daemon`] drives bootstrap and the steady-state
//! tick loop; the [`QueryResponder`] serves concurrent snapshot queries
//! against the same shared window.
//!
//! # Components
//!
//! - [`Daemon`]: bootstrap sequence + tick loop over a [`Rotator`]
//! - [`Announcer`]: audit-then-publish with bounded retry
//! - [`QueryResponder`]: bounded-concurrency snapshot serving
//! - [`TcpBus`] / [`MemoryBus`]: production and test bus clients
//! - [`AuditLog`] / [`MemoryAudit`]: production and test audit sinks
//! - [`SystemEnv`]: OS randomness and tokio sleep

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod announcer;
mod audit;
mod bus;
mod error;
mod query;
mod system_env;

use std::{sync::Arc, time::Duration};

pub use announcer::{Announcer, RetryPolicy};
pub use audit::{AuditLog, MemoryAudit};
pub use bus::{MemoryBus, PublishedEvent, TcpBus};
pub use error::AgentError;
use keywheel_core::{AuditSink, ClusterBus, Environment, Rotator, SharedKeyWindow};
pub use query::QueryResponder;
pub use system_env::SystemEnv;

/// Rotation timing and window shape.
#[derive(Debug, Clone)]
pub struct RotationConfig {
    /// Keys created ahead of the default.
    pub ahead: usize,
    /// Keys retained behind the default.
    pub behind: usize,
    /// Secret material size in bytes.
    pub material_len: usize,
    /// Steady-state rotation period.
    pub tick: Duration,
    /// Settle delay after the wipe announcement.
    pub wipe_settle: Duration,
    /// Settle delay before the first default announcement.
    pub default_settle: Duration,
    /// Event-name prefix.
    pub prefix: String,
}

impl Default for RotationConfig {
    fn default() -> Self {
        Self {
            ahead: 2,
            behind: 104,
            material_len: 16,
            tick: Duration::from_secs(15 * 60),
            wipe_settle: Duration::from_secs(30),
            default_settle: Duration::from_secs(15),
            prefix: "keywheel:".to_string(),
        }
    }
}

/// The rotation daemon: bootstrap, then tick forever.
pub struct Daemon<B, A, E> {
    rotator: Rotator,
    announcer: Announcer<B, A, E>,
    env: E,
    tick: Duration,
    wipe_settle: Duration,
    default_settle: Duration,
}

impl<B, A, E> Daemon<B, A, E>
where
    B: ClusterBus,
    A: AuditSink,
    E: Environment,
{
    /// Build a daemon over the shared `window`.
    ///
    /// The daemon's rotator is the window's only writer; hand clones of the
    /// `window` handle to readers (the [`QueryResponder`]) before starting.
    pub fn new(
        config: &RotationConfig,
        window: SharedKeyWindow,
        bus: Arc<B>,
        audit: Arc<A>,
        env: E,
        retry: RetryPolicy,
    ) -> Self {
        let rotator = Rotator::new(window, config.material_len);
        let announcer = Announcer::new(bus, audit, env.clone(), config.prefix.clone(), retry);
        Self {
            rotator,
            announcer,
            env,
            tick: config.tick,
            wipe_settle: config.wipe_settle,
            default_settle: config.default_settle,
        }
    }

    /// Run the one-time bootstrap: wipe, settle, install `ahead + 1` keys,
    /// settle, announce the first default.
    pub async fn bootstrap(&mut self) -> Result<(), AgentError> {
        let wipe = self.rotator.begin_bootstrap()?;
        self.announcer.announce(wipe).await?;
        self.env.sleep(self.wipe_settle).await;

        let installs = self.rotator.install_initial(&self.env)?;
        self.announcer.announce(installs).await?;
        self.env.sleep(self.default_settle).await;

        let default = self.rotator.announce_default()?;
        self.announcer.announce(default).await
    }

    /// One steady-state rotation: generate, install, announce.
    pub async fn tick_once(&mut self) -> Result<(), AgentError> {
        let events = self.rotator.tick(&self.env)?;
        self.announcer.announce(events).await
    }

    /// Bootstrap, then rotate on every tick until a fatal error.
    pub async fn run(mut self) -> Result<(), AgentError> {
        self.bootstrap().await?;

        let mut interval = tokio::time::interval(self.tick);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        // The first tick of a fresh interval completes immediately; the
        // bootstrap already announced, so consume it.
        interval.tick().await;

        loop {
            interval.tick().await;
            self.tick_once().await?;
        }
    }
}
