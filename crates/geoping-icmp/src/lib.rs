// # ICMP Prober
//
// This crate provides the ICMP echo prober for the geoping system.
//
// ## Behavior
//
// - Exactly one echo request per probe, never retried
// - A reply within the timeout is reachable, with its round-trip time in ms
// - Timeout, loss, a malformed address or an unresolvable name is unreachable
// - Only a transport that can no longer send anything is an error
//
// ## Privilege
//
// Opening the socket needs privilege. [`SurgeTransport::new`] reports a
// refusal as `Error::Privilege` so the daemon can fail at startup instead of
// marking every device down.

pub mod privilege;
pub mod transport;

pub use transport::{EchoTransport, SurgeTransport, TransportError};

use std::net::IpAddr;
use std::time::Duration;

use async_trait::async_trait;
use geoping_core::config::ProbeConfig;
use geoping_core::traits::{ProbeOutcome, Prober};
use geoping_core::{Error, Result};
use tracing::debug;

/// Upper bound on host name resolution before a probe
const RESOLVE_TIMEOUT: Duration = Duration::from_secs(2);

/// Prober sending one ICMP echo per call through an [`EchoTransport`]
pub struct IcmpProber<T = SurgeTransport> {
    transport: T,
    timeout: Duration,
}

impl IcmpProber<SurgeTransport> {
    /// Open ICMP sockets and build a prober from `config`
    pub fn from_config(config: &ProbeConfig) -> Result<Self> {
        let transport = SurgeTransport::new(config.payload_size)?;
        Ok(Self::new(transport, config.timeout()))
    }
}

impl<T: EchoTransport> IcmpProber<T> {
    pub fn new(transport: T, timeout: Duration) -> Self {
        Self { transport, timeout }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

/// Resolve an inventory address to an IP
///
/// IP literals are used as is. Dotted-decimal strings that do not parse are
/// malformed and never sent to the resolver.
async fn resolve(address: &str) -> Option<IpAddr> {
    let address = address.trim();
    if address.is_empty() {
        return None;
    }
    if let Ok(ip) = address.parse::<IpAddr>() {
        return Some(ip);
    }
    if address.chars().all(|c| c.is_ascii_digit() || c == '.') {
        return None;
    }

    match tokio::time::timeout(RESOLVE_TIMEOUT, tokio::net::lookup_host((address, 0))).await {
        Ok(Ok(mut addrs)) => addrs.next().map(|sa| sa.ip()),
        Ok(Err(e)) => {
            debug!("Cannot resolve {}: {}", address, e);
            None
        }
        Err(_) => {
            debug!("Resolving {} timed out", address);
            None
        }
    }
}

#[async_trait]
impl<T: EchoTransport> Prober for IcmpProber<T> {
    async fn probe(&self, address: &str) -> Result<ProbeOutcome> {
        let Some(ip) = resolve(address).await else {
            debug!("{} is not a probeable address", address);
            return Ok(ProbeOutcome::unreachable());
        };

        match tokio::time::timeout(self.timeout, self.transport.echo(ip, self.timeout)).await {
            Ok(Ok(rtt)) => Ok(ProbeOutcome::reachable(rtt.as_secs_f64() * 1000.0)),
            Ok(Err(TransportError::Fatal(msg))) => Err(Error::probe(format!(
                "{} transport failed: {}",
                self.transport.transport_name(),
                msg
            ))),
            Ok(Err(e)) => {
                debug!("{} ({}): {}", address, ip, e);
                Ok(ProbeOutcome::unreachable())
            }
            Err(_) => Ok(ProbeOutcome::unreachable()),
        }
    }

    fn prober_name(&self) -> &'static str {
        "icmp"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Transport answering after `delay` with a scripted result
    struct FakeTransport {
        delay: Duration,
        reply: Mutex<Option<std::result::Result<Duration, TransportError>>>,
        seen: Mutex<Vec<IpAddr>>,
    }

    impl FakeTransport {
        fn replying(rtt: Duration, delay: Duration) -> Self {
            Self {
                delay,
                reply: Mutex::new(Some(Ok(rtt))),
                seen: Mutex::new(Vec::new()),
            }
        }

        fn silent() -> Self {
            Self {
                delay: Duration::from_secs(3600),
                reply: Mutex::new(None),
                seen: Mutex::new(Vec::new()),
            }
        }

        fn erroring(err: TransportError) -> Self {
            Self {
                delay: Duration::ZERO,
                reply: Mutex::new(Some(Err(err))),
                seen: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl EchoTransport for FakeTransport {
        async fn echo(&self, ip: IpAddr, _timeout: Duration) -> std::result::Result<Duration, TransportError> {
            self.seen.lock().unwrap().push(ip);
            tokio::time::sleep(self.delay).await;
            self.reply.lock().unwrap().take().unwrap_or(Err(TransportError::Timeout))
        }

        fn transport_name(&self) -> &'static str {
            "fake"
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_reply_in_time_is_reachable() {
        let transport = FakeTransport::replying(Duration::from_millis(5), Duration::from_millis(5));
        let prober = IcmpProber::new(transport, Duration::from_millis(300));

        let outcome = prober.probe("10.0.0.1").await.unwrap();
        assert!(outcome.reachable);
        assert!(outcome.latency_ms > 0.0);
        assert!((outcome.latency_ms - 5.0).abs() < 1e-9);
    }

    #[tokio::test(start_paused = true)]
    async fn test_late_reply_is_unreachable() {
        let transport = FakeTransport::replying(Duration::from_millis(500), Duration::from_millis(500));
        let prober = IcmpProber::new(transport, Duration::from_millis(300));

        let outcome = prober.probe("10.0.0.1").await.unwrap();
        assert_eq!(outcome, ProbeOutcome::unreachable());
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_reply_is_unreachable() {
        let prober = IcmpProber::new(FakeTransport::silent(), Duration::from_millis(300));
        let outcome = prober.probe("10.0.0.1").await.unwrap();
        assert!(!outcome.reachable);
        assert_eq!(outcome.latency_ms, 0.0);
    }

    #[tokio::test]
    async fn test_per_destination_failure_is_unreachable() {
        let transport = FakeTransport::erroring(TransportError::Failed("network unreachable".into()));
        let prober = IcmpProber::new(transport, Duration::from_millis(300));
        assert_eq!(prober.probe("10.0.0.1").await.unwrap(), ProbeOutcome::unreachable());
    }

    #[tokio::test]
    async fn test_fatal_transport_is_error() {
        let transport = FakeTransport::erroring(TransportError::Fatal("socket closed".into()));
        let prober = IcmpProber::new(transport, Duration::from_millis(300));
        assert!(matches!(prober.probe("10.0.0.1").await, Err(Error::Probe(_))));
    }

    #[tokio::test]
    async fn test_malformed_address_never_reaches_transport() {
        let prober = IcmpProber::new(FakeTransport::silent(), Duration::from_millis(300));

        for address in ["", "   ", "10.0.0.999", "300.1.1.1"] {
            let outcome = prober.probe(address).await.unwrap();
            assert_eq!(outcome, ProbeOutcome::unreachable(), "address {:?}", address);
        }
        assert!(prober.transport.seen.lock().unwrap().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_ipv6_literal_is_probed() {
        let transport = FakeTransport::replying(Duration::from_millis(2), Duration::ZERO);
        let prober = IcmpProber::new(transport, Duration::from_millis(300));

        assert!(prober.probe("::1").await.unwrap().reachable);
        assert_eq!(prober.transport.seen.lock().unwrap()[0], "::1".parse::<IpAddr>().unwrap());
    }
}
