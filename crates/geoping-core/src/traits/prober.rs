// # Prober Trait
//
// Defines the interface for checking whether a single device answers.
//
// ## Implementations
//
// - ICMP echo: `geoping-icmp` crate
// - Scripted probers in the contract tests
//
// ## Usage
//
// ```rust,ignore
// use geoping_core::Prober;
//
// #[tokio::main]
// async fn main() -> anyhow::Result<()> {
//     let prober = /* Prober implementation */;
//
//     let outcome = prober.probe("10.0.0.1").await?;
//     println!("up={} rtt={}ms", outcome.reachable, outcome.latency_ms);
//
//     Ok(())
// }
// ```

use async_trait::async_trait;

/// Result of one reachability check
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProbeOutcome {
    /// A reply arrived within the timeout
    pub reachable: bool,
    /// Round-trip time of that reply, `0.0` when none arrived
    pub latency_ms: f64,
}

impl ProbeOutcome {
    /// A reply arrived after `latency_ms`
    pub fn reachable(latency_ms: f64) -> Self {
        Self {
            reachable: true,
            latency_ms,
        }
    }

    /// Timeout, loss, or an address that cannot be probed
    pub fn unreachable() -> Self {
        Self {
            reachable: false,
            latency_ms: 0.0,
        }
    }
}

/// Trait for reachability probers
///
/// A prober sends exactly one echo per call and waits at most its configured
/// timeout. Implementations must be usable from many tasks at once: the
/// refresh engine probes devices of one cycle concurrently.
///
/// # Failure Model
///
/// - Timeout, packet loss, a malformed address or a name that does not
///   resolve are **outcomes**, not errors: return
///   [`ProbeOutcome::unreachable()`].
/// - `Err` is reserved for systemic failures (lost privilege, socket torn
///   down). The engine treats any `Err` as fatal for the whole process.
///
/// Probers never retry. One cycle, one echo per device.
#[async_trait]
pub trait Prober: Send + Sync {
    /// Probe `address` once
    ///
    /// # Parameters
    ///
    /// - `address`: IP literal or host name, as stored in the inventory
    ///
    /// # Returns
    ///
    /// - `Ok(ProbeOutcome)`: reachable with latency, or unreachable
    /// - `Err(Error)`: the prober itself is no longer usable
    async fn probe(&self, address: &str) -> Result<ProbeOutcome, crate::Error>;

    /// Name used in logs
    fn prober_name(&self) -> &'static str;
}
