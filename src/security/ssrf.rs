//! Private-destination checks for outbound requests.
//!
//! Two levels:
//! - [`is_forbidden_host`] classifies the hostname string from a URL. It
//!   catches loopback aliases and IPv4 literals in private ranges, and
//!   nothing else.
//! - [`is_private_addr`] classifies an address a hostname resolved to. The
//!   image client's resolver applies it to every answer, so a public name
//!   pointing at an internal address is refused before connecting.

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

/// Hostnames that always refer to the local machine.
const LOOPBACK_ALIASES: &[&str] = &["localhost", "127.0.0.1", "::1", "[::1]", "0.0.0.0"];

/// Whether a URL hostname must not be contacted.
pub fn is_forbidden_host(hostname: &str) -> bool {
    let host = hostname.trim().trim_end_matches('.').to_ascii_lowercase();

    if LOOPBACK_ALIASES.contains(&host.as_str()) {
        return true;
    }

    match host.parse::<Ipv4Addr>() {
        Ok(ip) => is_private_v4(ip),
        Err(_) => false,
    }
}

/// 10/8, 172.16/12, 192.168/16, 127/8.
fn is_private_v4(ip: Ipv4Addr) -> bool {
    ip.is_private() || ip.is_loopback()
}

/// Whether a resolved address is internal.
///
/// Broader than [`is_forbidden_host`]: adds IPv4 link-local and unspecified
/// addresses, IPv6 loopback, unique-local and link-local ranges, and
/// IPv4-mapped IPv6 forms of any blocked IPv4 address.
pub fn is_private_addr(ip: IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => is_private_v4(v4) || v4.is_link_local() || v4.is_unspecified(),
        IpAddr::V6(v6) => {
            if let Some(mapped) = v6.to_ipv4_mapped() {
                return is_private_addr(IpAddr::V4(mapped));
            }
            v6.is_loopback() || v6.is_unspecified() || is_unique_local(v6) || is_link_local_v6(v6)
        }
    }
}

fn is_unique_local(ip: Ipv6Addr) -> bool {
    (ip.segments()[0] & 0xfe00) == 0xfc00
}

fn is_link_local_v6(ip: Ipv6Addr) -> bool {
    (ip.segments()[0] & 0xffc0) == 0xfe80
}
