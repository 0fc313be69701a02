//! ICMP echo prober.
//!
//! Sends one echo request per call using `surge-ping`.

use std::collections::HashMap;
use std::net::IpAddr;
use std::sync::atomic::{AtomicU16, Ordering};

use surge_ping::{Client, Config, ICMP, PingIdentifier, PingSequence, SurgeError};
use tokio::sync::Mutex;
use tokio::time::timeout;

use super::traits::{ProbeError, ProbeOutcome, ProbeRequest, Prober};

/// Resolve hostname to IP address.
pub async fn resolve_host(host: &str) -> Result<IpAddr, std::io::Error> {
    // First, try to parse as an IP address directly
    if let Ok(ip) = host.parse::<IpAddr>() {
        return Ok(ip);
    }

    let addrs = tokio::net::lookup_host(format!("{host}:0")).await?;
    addrs
        .into_iter()
        .next()
        .map(|addr| addr.ip())
        .ok_or_else(|| std::io::Error::new(std::io::ErrorKind::NotFound, "no addresses found"))
}

/// ICMP echo prober backed by `surge-ping`.
///
/// Clients (one socket each) are created lazily per address family and TTL
/// and reused across probes.
///
/// Unprivileged datagram sockets on Linux replace the echo identifier with
/// the socket's own, so the identifier cannot tell two targets on the same
/// host apart. The wire sequence is therefore drawn from one counter shared
/// by every probe this prober sends, rather than from the target's sequence.
#[derive(Default)]
pub struct IcmpProber {
    clients: Mutex<HashMap<(bool, u8), Client>>,
    wire_sequence: AtomicU16,
}

impl IcmpProber {
    /// Create a new prober. No socket is opened until the first probe.
    pub fn new() -> Self {
        Self::default()
    }

    /// Next echo sequence number; wraps after 65535.
    fn next_wire_sequence(&self) -> PingSequence {
        PingSequence(self.wire_sequence.fetch_add(1, Ordering::Relaxed))
    }

    async fn client(&self, ip: IpAddr, ttl: u8) -> Result<Client, ProbeError> {
        let key = (ip.is_ipv6(), ttl);
        let mut clients = self.clients.lock().await;
        if let Some(client) = clients.get(&key) {
            return Ok(client.clone());
        }

        let config = match ip {
            IpAddr::V4(_) => Config::builder().ttl(u32::from(ttl)).build(),
            IpAddr::V6(_) => Config::builder().kind(ICMP::V6).ttl(u32::from(ttl)).build(),
        };
        let client = Client::new(&config).map_err(|e| ProbeError::Socket(e.to_string()))?;
        clients.insert(key, client.clone());
        Ok(client)
    }
}

impl std::fmt::Debug for IcmpProber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IcmpProber")
            .field(
                "client_count",
                &self.clients.try_lock().map(|c| c.len()).unwrap_or(0),
            )
            .finish()
    }
}

#[async_trait::async_trait]
impl Prober for IcmpProber {
    async fn probe(&self, request: &ProbeRequest<'_>) -> ProbeOutcome {
        let ip_addr = match resolve_host(request.address).await {
            Ok(ip) => ip,
            Err(e) => {
                return ProbeOutcome::Error(ProbeError::Resolve {
                    address: request.address.to_string(),
                    reason: e.to_string(),
                });
            }
        };

        let client = match self.client(ip_addr, request.ttl).await {
            Ok(c) => c,
            Err(e) => return ProbeOutcome::Error(e),
        };

        let mut pinger = client.pinger(ip_addr, PingIdentifier(rand::random())).await;
        pinger.timeout(request.timeout);

        let sequence = self.next_wire_sequence();
        tracing::trace!(address = %ip_addr, seq = request.sequence, wire_seq = sequence.0, "Sending echo request");
        let payload = vec![0u8; request.payload_size];

        match timeout(request.timeout, pinger.ping(sequence, &payload)).await {
            Ok(Ok((_, rtt))) => ProbeOutcome::Success(rtt),
            Ok(Err(SurgeError::Timeout { .. })) | Err(_) => ProbeOutcome::Timeout,
            Ok(Err(e)) => ProbeOutcome::Error(ProbeError::Network(e.to_string())),
        }
    }
}
