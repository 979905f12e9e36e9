// # geopingd - Device Reachability Daemon
//
// The geopingd daemon is responsible for:
// 1. Reading configuration from environment variables
// 2. Opening the ICMP sockets (fails at startup without privilege)
// 3. Loading the inventory once before serving anything
// 4. Running the refresh engine and the query service until a signal arrives
//
// All probing, persistence and filtering logic lives in geoping-core and the
// adapter crates; this binary only wires them together.
//
// ## Configuration
//
// All configuration is done via environment variables:
//
// ### Inventory
// - `GEOPING_INVENTORY_PATH`: Path to the inventory JSON array
//   (default: `~/geoping/devices.json`, using `SUDO_USER`'s home under sudo)
// - `GEOPING_SCHEMA`: Record shape, `basic`, `owned` or `full` (default: full)
//
// ### Probing
// - `GEOPING_PROBE_TIMEOUT_MS`: Echo reply timeout (default: 300)
// - `GEOPING_REFRESH_INTERVAL_SECS`: Pause between cycles (default: 30)
// - `GEOPING_PROBE_CONCURRENCY`: Probes in flight per cycle (default: 32)
// - `GEOPING_MAX_STORE_FAILURES`: Consecutive failed cycles before exiting (default: 3)
//
// ### Query Service
// - `GEOPING_LISTEN_ADDR`: Listen address (default: 127.0.0.1:3333)
// - `GEOPING_QUERY_PATH`: Endpoint path served besides `/` (default: /mikromap)
// - `GEOPING_ADMIN_IDENTITY`: `user` value that sees every device (default: admin)
//
// ### Logging
// - `GEOPING_LOG_LEVEL`: trace, debug, info, warn or error (default: info)
//
// ## Example
//
// ```bash
// export GEOPING_INVENTORY_PATH=/var/lib/geoping/devices.json
// export GEOPING_PROBE_TIMEOUT_MS=500
//
// sudo -E geopingd
// ```

mod config;
mod supervisor;

use std::process::ExitCode;
use std::sync::Arc;

use geoping_core::FileSnapshotStore;
use geoping_core::config::WEAK_PROBE_TIMEOUT_MS;
use geoping_icmp::{IcmpProber, privilege};
use tokio_util::sync::CancellationToken;
use tracing::{Level, debug, error, info, warn};
use tracing_subscriber::FmtSubscriber;

#[cfg(unix)]
use tokio::signal::unix::{SignalKind, signal};

use crate::config::Config;
use crate::supervisor::SupervisorError;

/// Exit codes for different termination scenarios
///
/// These codes follow systemd conventions:
/// - 0: Clean shutdown
/// - 1: Configuration or startup error
/// - 2: Runtime error (unexpected)
#[derive(Debug, Clone, Copy)]
enum GeopingExitCode {
    /// Clean shutdown (normal exit)
    CleanShutdown = 0,
    /// Configuration error or startup failure
    ConfigError = 1,
    /// Runtime error (unexpected failure)
    RuntimeError = 2,
}

impl From<GeopingExitCode> for ExitCode {
    fn from(code: GeopingExitCode) -> Self {
        ExitCode::from(code as u8)
    }
}

fn main() -> ExitCode {
    // Load configuration from environment
    let config = match Config::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Configuration error: {:#}", e);
            return GeopingExitCode::ConfigError.into();
        }
    };

    // Validate configuration
    if let Err(e) = config.validate() {
        eprintln!("Configuration validation error: {}", e);
        return GeopingExitCode::ConfigError.into();
    }

    // Initialize tracing
    let log_level = match config.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder().with_max_level(log_level).finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
        return GeopingExitCode::ConfigError.into();
    }

    info!("Starting geopingd daemon");
    info!(
        "Inventory: {} (schema {})",
        config.geoping.inventory.path.display(),
        config.geoping.schema
    );
    if config.geoping.probe.is_weak_timeout() {
        warn!(
            "Probe timeout of {}ms is below {}ms; distant devices may be reported down",
            config.geoping.probe.timeout_ms, WEAK_PROBE_TIMEOUT_MS
        );
    }

    // Enter tokio runtime
    let rt = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to create tokio runtime: {}", e);
            return GeopingExitCode::RuntimeError.into();
        }
    };

    let result = rt.block_on(async {
        match run_daemon(config).await {
            Ok(()) => GeopingExitCode::CleanShutdown,
            Err(SupervisorError::Startup(e)) => {
                error!("Startup failed: {}", e);
                GeopingExitCode::ConfigError
            }
            Err(SupervisorError::Runtime(e)) => {
                error!("Daemon error: {}", e);
                GeopingExitCode::RuntimeError
            }
        }
    });

    result.into()
}

/// Run the daemon
async fn run_daemon(config: Config) -> Result<(), SupervisorError> {
    debug!("Effective uid is root: {}", privilege::is_elevated());

    // Opening the sockets is the privilege check
    let prober = IcmpProber::from_config(&config.geoping.probe).map_err(SupervisorError::Startup)?;
    info!("ICMP prober ready (timeout {:?})", prober.timeout());

    let store = FileSnapshotStore::with_backup(
        &config.geoping.inventory.path,
        config.geoping.inventory.keep_backup,
    );

    let shutdown = CancellationToken::new();
    let signal_token = shutdown.clone();
    tokio::spawn(async move {
        match wait_for_shutdown().await {
            Ok(signal) => info!("Received shutdown signal: {}", signal),
            Err(e) => error!("Signal handling failed, shutting down: {}", e),
        }
        signal_token.cancel();
    });

    supervisor::run(config.geoping, Arc::new(prober), Arc::new(store), shutdown).await
}

/// Wait for shutdown signals (SIGTERM, SIGINT)
///
/// # Returns
///
/// Returns the name of the signal received.
#[cfg(unix)]
async fn wait_for_shutdown() -> anyhow::Result<&'static str> {
    let mut sigterm = signal(SignalKind::terminate())
        .map_err(|e| anyhow::anyhow!("Failed to setup SIGTERM handler: {}", e))?;
    let mut sigint = signal(SignalKind::interrupt())
        .map_err(|e| anyhow::anyhow!("Failed to setup SIGINT handler: {}", e))?;

    let signal = tokio::select! {
        _ = sigterm.recv() => "SIGTERM",
        _ = sigint.recv() => "SIGINT",
    };
    Ok(signal)
}

/// Wait for shutdown signals (SIGINT only)
///
/// Fallback implementation for non-Unix platforms.
#[cfg(not(unix))]
async fn wait_for_shutdown() -> anyhow::Result<&'static str> {
    tokio::signal::ctrl_c()
        .await
        .map_err(|e| anyhow::anyhow!("Failed to wait for CTRL-C: {}", e))?;
    Ok("SIGINT")
}
