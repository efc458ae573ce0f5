/*!
 * Address resolution shared by the worker (connecting) and the coordinator
 * (binding). Grounded in the reference implementation's `convert_address`,
 * which tries `inet_pton` against `AF_INET` then `AF_INET6` before giving
 * up — the dual-stack behavior `std::net` gives us for free via `IpAddr`'s
 * `FromStr`, with a DNS fallback for non-numeric hosts that the reference
 * implementation didn't need because it only ever took numeric addresses.
 */
use std::net::{SocketAddr, ToSocketAddrs};

use crate::cracker_error;
use crate::error::CrackerError;

/// Resolves `host:port` to a concrete socket address. Numeric IPv4 and
/// IPv6 literals resolve without a DNS round trip; anything else falls
/// through to the system resolver.
pub fn resolve(host: &str, port: u16) -> Result<SocketAddr, CrackerError> {
    if let Ok(ip) = host.parse::<std::net::IpAddr>() {
        return Ok(SocketAddr::new(ip, port));
    }

    (host, port)
        .to_socket_addrs()
        .map_err(|e| cracker_error!(Resolution, "failed to resolve {host}:{port}: {e}"))?
        .next()
        .ok_or_else(|| cracker_error!(Resolution, "{host}:{port} resolved to no addresses"))
}

/// Numeric `host:port` form of a socket address, matching the reference
/// implementation's `get_sockaddr_info` (`getnameinfo` with
/// `NI_NUMERICHOST | NI_NUMERICSERV`) rather than a reverse-DNS lookup.
pub fn numeric_peer(addr: &SocketAddr) -> String {
    format!("{}:{}", addr.ip(), addr.port())
}
