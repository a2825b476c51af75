//! Keywheel agent binary.
//!
//! # Usage
//!
//! ```bash
//! # Rotate a fresh key every 15 minutes, keeping 2 ahead and 104 behind
//! keywheel-agent --addr 127.0.0.1:7373
//!
//! # Faster rotation with a dedicated audit trail
//! keywheel-agent --tick 5m --behind 12 --log /var/log/keywheel.log
//! ```

use std::{
    path::PathBuf,
    sync::{Arc, RwLock},
    time::Duration,
};

use clap::Parser;
use keywheel_agent::{
    AgentError, AuditLog, Daemon, QueryResponder, RetryPolicy, RotationConfig, SystemEnv, TcpBus,
};
use keywheel_core::{KeyWindow, SharedKeyWindow};
use keywheel_proto::{RETRIEVE_KEYS_QUERY, prefixed};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Keywheel rotation agent
#[derive(Parser, Debug)]
#[command(name = "keywheel-agent")]
#[command(about = "Rotating symmetric-key distribution agent")]
#[command(version)]
struct Args {
    /// Cluster bus endpoint to connect to
    #[arg(long, default_value = "127.0.0.1:7373")]
    addr: String,

    /// RPC auth token
    #[arg(long)]
    auth: Option<String>,

    /// RPC timeout (0 disables deadlines)
    #[arg(long, default_value = "0s", value_parser = humantime::parse_duration)]
    rpc_timeout: Duration,

    /// Time each key spends as the newest before the next rotation
    #[arg(long, default_value = "15m", value_parser = humantime::parse_duration)]
    tick: Duration,

    /// Number of keys to create ahead of time
    #[arg(long, default_value_t = 2)]
    ahead: usize,

    /// Number of keys to keep behind the default
    #[arg(long, default_value_t = 104)]
    behind: usize,

    /// Key material size in bits
    #[arg(long, default_value_t = 128)]
    key_bits: usize,

    /// Event name prefix
    #[arg(long, default_value = "keywheel:")]
    prefix: String,

    /// Audit log file; empty disables the file (stderr still receives it)
    #[arg(long, default_value = "/var/log/keywheel.log")]
    log: String,

    /// Settle delay between the wipe announcement and the first installs
    #[arg(long, default_value = "30s", value_parser = humantime::parse_duration)]
    wipe_settle: Duration,

    /// Settle delay before the first default announcement
    #[arg(long, default_value = "15s", value_parser = humantime::parse_duration)]
    default_settle: Duration,

    /// Maximum concurrent query handlers
    #[arg(long, default_value_t = 64)]
    max_queries: usize,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,
}

impl Args {
    fn rotation_config(&self) -> Result<RotationConfig, AgentError> {
        if self.key_bits == 0 || self.key_bits % 8 != 0 {
            return Err(AgentError::Config(format!(
                "key size must be a positive multiple of 8 bits, got {}",
                self.key_bits
            )));
        }
        if self.tick.is_zero() {
            return Err(AgentError::Config("tick interval must be non-zero".to_string()));
        }
        if self.max_queries == 0 {
            return Err(AgentError::Config("max queries must be non-zero".to_string()));
        }

        Ok(RotationConfig {
            ahead: self.ahead,
            behind: self.behind,
            material_len: self.key_bits / 8,
            tick: self.tick,
            wipe_settle: self.wipe_settle,
            default_settle: self.default_settle,
            prefix: self.prefix.clone(),
        })
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    tracing_subscriber::registry().with(fmt::layer()).with(filter).init();

    let config = args.rotation_config()?;
    tracing::info!(
        "storing {} keys ahead ({}), {} behind ({}); using each key for {}",
        config.ahead,
        humantime::format_duration(config.tick * config.ahead as u32),
        config.behind,
        humantime::format_duration(config.tick * config.behind as u32),
        humantime::format_duration(config.tick),
    );

    let audit_path = (!args.log.is_empty()).then(|| PathBuf::from(&args.log));
    let audit = Arc::new(AuditLog::open(audit_path.as_deref())?);

    let timeout = (!args.rpc_timeout.is_zero()).then_some(args.rpc_timeout);
    let (bus, queries) = TcpBus::connect(&args.addr, args.auth.clone(), timeout).await?;
    tracing::info!("connected to cluster bus at {}", args.addr);

    let window: SharedKeyWindow =
        Arc::new(RwLock::new(KeyWindow::new(config.ahead, config.behind)));
    let env = SystemEnv::new();

    let responder = QueryResponder::new(
        Arc::clone(&window),
        Arc::clone(&bus),
        Arc::clone(&audit),
        prefixed(&config.prefix, RETRIEVE_KEYS_QUERY),
        args.max_queries,
    );

    let daemon = Daemon::new(&config, window, bus, audit, env, RetryPolicy::default());

    // Both arms run forever; the first fatal error terminates the agent.
    let result = tokio::select! {
        result = daemon.run() => result,
        result = responder.run(queries) => result,
    };

    if let Err(e) = &result {
        tracing::error!(error = %e, "agent terminating");
    }
    result.map_err(Into::into)
}
