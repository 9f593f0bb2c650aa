//! IPv4 arithmetic helpers
//!
//! Candidate subnets are generated by bumping the second octet of the
//! block address (carrying into the first), so every candidate for a given
//! base lives in its own /16.

use crate::error::{AllocError, Result};
use ipnet::Ipv4Net;
use std::net::Ipv4Addr;

/// Distance between two consecutive candidate blocks (one /16)
pub const SUBNET_STRIDE: u32 = 1 << 16;

/// Offset from a /16 network address to the first usable multicast address (x.y.1.1)
const MULTICAST_START_OFFSET: u32 = (1 << 8) + 1;

/// Add `by` to an IPv4 address
///
/// Fails when `by` is zero or when the result would leave the 32-bit
/// address space.
pub fn increment_ip(addr: Ipv4Addr, by: u32) -> Result<Ipv4Addr> {
    if by == 0 {
        return Err(AllocError::InvalidIp(format!(
            "increment value must be > 0 (got 0 for {})",
            addr
        )));
    }

    u32::from(addr)
        .checked_add(by)
        .map(Ipv4Addr::from)
        .ok_or_else(|| AllocError::InvalidIp(format!("IP {} can't be incremented by {}", addr, by)))
}

/// Next candidate block after `subnet`
///
/// `10.0.0.0/24` becomes `10.1.0.0/24` and `10.255.0.0/24` becomes
/// `11.0.0.0/24`. The prefix length and any host bits of the address are
/// kept as given, so `10.50.0.1/16` becomes `10.51.0.1/16`.
pub fn next_subnet(subnet: Ipv4Net) -> Result<Ipv4Net> {
    let addr = increment_ip(subnet.addr(), SUBNET_STRIDE)?;
    Ipv4Net::new(addr, subnet.prefix_len()).map_err(|e| AllocError::InvalidIp(e.to_string()))
}

/// Usable start and end addresses of a multicast block
///
/// The start skips the `x.y.0.*` addresses (`x.y.0.0/16` starts at
/// `x.y.1.1`); the end is the last address of the block.
pub fn multicast_bounds(range: Ipv4Net) -> Result<(Ipv4Addr, Ipv4Addr)> {
    let start = increment_ip(range.network(), MULTICAST_START_OFFSET)?;
    Ok((start, range.broadcast()))
}

/// First two octets of an address, i.e. the /16 it belongs to
pub fn slash16(addr: Ipv4Addr) -> [u8; 2] {
    let [a, b, _, _] = addr.octets();
    [a, b]
}

/// How many times `base` can be advanced before running out of address space
pub fn headroom(base: Ipv4Net) -> u32 {
    (u32::MAX - u32::from(base.addr())) / SUBNET_STRIDE
}

/// Walk candidates from `base` until `in_use` rejects one, trying at most
/// `attempts` candidates
///
/// Returns `None` when the attempt budget runs out or the next candidate
/// would overflow the address space.
pub fn probe_free<F>(base: Ipv4Net, attempts: u32, in_use: F) -> Option<Ipv4Net>
where
    F: Fn(&Ipv4Net) -> bool,
{
    let mut candidate = base;
    for _ in 0..attempts {
        if !in_use(&candidate) {
            return Some(candidate);
        }
        candidate = next_subnet(candidate).ok()?;
    }
    None
}
