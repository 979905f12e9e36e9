// # Echo Transport
//
// The seam between the prober and the network. `SurgeTransport` sends real
// ICMP echo requests through `surge-ping`; tests substitute a transport whose
// replies are scripted.

use std::io;
use std::net::IpAddr;
use std::sync::atomic::{AtomicU16, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use geoping_core::{Error, Result};
use surge_ping::{Client, Config, ICMP, PingIdentifier, PingSequence, SurgeError};

use crate::privilege;

/// Why an echo did not produce a reply
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// No reply arrived in time
    #[error("no reply within the timeout")]
    Timeout,

    /// No socket for this address family
    #[error("address family not supported")]
    Unsupported,

    /// The echo failed for this destination only
    #[error("echo failed: {0}")]
    Failed(String),

    /// The transport can no longer send anything
    #[error("transport unusable: {0}")]
    Fatal(String),
}

/// Sends one echo request and waits for its reply
#[async_trait]
pub trait EchoTransport: Send + Sync {
    /// Round-trip time of a single echo to `ip`
    ///
    /// Implementations should give up after `timeout`; the prober enforces
    /// it as well.
    async fn echo(&self, ip: IpAddr, timeout: Duration) -> std::result::Result<Duration, TransportError>;

    /// Name used in logs
    fn transport_name(&self) -> &'static str;
}

/// ICMP echo over `surge-ping` sockets
pub struct SurgeTransport {
    v4: Client,
    v6: Option<Client>,
    payload: Vec<u8>,
    next_ident: AtomicU16,
}

impl SurgeTransport {
    /// Open the ICMP sockets
    ///
    /// # Errors
    ///
    /// - [`Error::Privilege`] when the IPv4 socket is refused for lack of privilege
    /// - [`Error::ProbeSetup`] for any other socket failure
    ///
    /// An IPv6 socket that cannot be opened only disables IPv6 probing.
    pub fn new(payload_size: usize) -> Result<Self> {
        let v4 = Client::new(&Config::default()).map_err(socket_error)?;

        let v6 = match Client::new(&Config::builder().kind(ICMP::V6).build()) {
            Ok(client) => Some(client),
            Err(e) => {
                tracing::warn!("IPv6 ICMP socket unavailable, IPv6 devices will report down: {}", e);
                None
            }
        };

        Ok(Self {
            v4,
            v6,
            payload: vec![0; payload_size],
            next_ident: AtomicU16::new(std::process::id() as u16),
        })
    }

    fn next_identifier(&self) -> PingIdentifier {
        PingIdentifier(self.next_ident.fetch_add(1, Ordering::Relaxed))
    }
}

#[async_trait]
impl EchoTransport for SurgeTransport {
    async fn echo(&self, ip: IpAddr, timeout: Duration) -> std::result::Result<Duration, TransportError> {
        let client = match ip {
            IpAddr::V4(_) => &self.v4,
            IpAddr::V6(_) => self.v6.as_ref().ok_or(TransportError::Unsupported)?,
        };

        let mut pinger = client.pinger(ip, self.next_identifier()).await;
        pinger.timeout(timeout);

        match pinger.ping(PingSequence(0), &self.payload).await {
            Ok((_packet, rtt)) => Ok(rtt),
            Err(SurgeError::Timeout { .. }) => Err(TransportError::Timeout),
            Err(SurgeError::IOError(e)) if e.kind() == io::ErrorKind::PermissionDenied => {
                Err(TransportError::Fatal(e.to_string()))
            }
            Err(e) => Err(TransportError::Failed(e.to_string())),
        }
    }

    fn transport_name(&self) -> &'static str {
        "surge-ping"
    }
}

fn socket_error(e: io::Error) -> Error {
    if e.kind() == io::ErrorKind::PermissionDenied {
        Error::privilege(format!(
            "cannot open ICMP socket: {}\n\n{}",
            e,
            privilege::elevation_instructions()
        ))
    } else {
        Error::probe_setup(format!("cannot open ICMP socket: {}", e))
    }
}
