//! Allocator configuration

use crate::error::{AllocError, Result};
use crate::net;
use ipnet::Ipv4Net;
use serde::{Deserialize, Serialize};
use std::net::Ipv4Addr;

/// Lowest VLAN id a fabric accepts
pub const VLAN_ID_MIN: u16 = 1;

/// Highest VLAN id a fabric accepts
pub const VLAN_ID_MAX: u16 = 4094;

/// Every multicast range handed out is a whole /16
pub const MULTICAST_PREFIX_LEN: u8 = 16;

pub const DEFAULT_VLAN_MIN: u16 = 2120;
pub const DEFAULT_VLAN_MAX: u16 = 4000;

/// Resolved allocator settings
///
/// Immutable for the lifetime of an [`Allocator`](crate::Allocator). Every
/// field falls back to its default when missing from a settings file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AllocatorConfig {
    /// First VLAN id handed out
    pub vlan_min: u16,

    /// Last VLAN id handed out (inclusive)
    pub vlan_max: u16,

    /// First multicast /16 tried
    pub multicast_range: Ipv4Net,

    /// First service subnet tried
    pub service_subnet: Ipv4Net,

    /// First pod subnet tried. Conventionally the gateway address (ends with `.1`).
    pub pod_subnet: Ipv4Net,
}

impl Default for AllocatorConfig {
    fn default() -> Self {
        Self {
            vlan_min: DEFAULT_VLAN_MIN,
            vlan_max: DEFAULT_VLAN_MAX,
            multicast_range: block(Ipv4Addr::new(225, 32, 0, 0), 16),
            service_subnet: block(Ipv4Addr::new(10, 5, 0, 0), 24),
            pod_subnet: block(Ipv4Addr::new(10, 50, 0, 1), 16),
        }
    }
}

fn block(addr: Ipv4Addr, prefix_len: u8) -> Ipv4Net {
    Ipv4Net::new(addr, prefix_len).expect("default prefix lengths are at most 32")
}

impl AllocatorConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_vlan_range(mut self, vlan_min: u16, vlan_max: u16) -> Self {
        self.vlan_min = vlan_min;
        self.vlan_max = vlan_max;
        self
    }

    pub fn with_multicast_range(mut self, range: Ipv4Net) -> Self {
        self.multicast_range = range;
        self
    }

    pub fn with_service_subnet(mut self, subnet: Ipv4Net) -> Self {
        self.service_subnet = subnet;
        self
    }

    pub fn with_pod_subnet(mut self, subnet: Ipv4Net) -> Self {
        self.pod_subnet = subnet;
        self
    }

    /// Size of the VLAN pool minus one; also the probe budget for subnets
    /// and multicast ranges
    pub fn max_vlans(&self) -> u32 {
        u32::from(self.vlan_max).saturating_sub(u32::from(self.vlan_min))
    }

    /// Check VLAN bounds
    ///
    /// A reservation takes two ids, so the range must hold at least two.
    pub fn validate(&self) -> Result<()> {
        if self.vlan_min < VLAN_ID_MIN {
            return Err(AllocError::InvalidConfig(format!(
                "vlan_min must be >= {} (got {})",
                VLAN_ID_MIN, self.vlan_min
            )));
        }

        if self.vlan_max > VLAN_ID_MAX {
            return Err(AllocError::InvalidConfig(format!(
                "vlan_max must be <= {} (got {})",
                VLAN_ID_MAX, self.vlan_max
            )));
        }

        if u32::from(self.vlan_min) + 1 > u32::from(self.vlan_max) {
            return Err(AllocError::InvalidConfig(format!(
                "vlan_max must be at least 1 id higher than vlan_min (got {} and {} respectively)",
                self.vlan_min, self.vlan_max
            )));
        }

        if self.multicast_range.prefix_len() != MULTICAST_PREFIX_LEN {
            return Err(AllocError::InvalidConfig(format!(
                "multicast_range must be a /{} (got {})",
                MULTICAST_PREFIX_LEN, self.multicast_range
            )));
        }

        Ok(())
    }

    /// Probing bases that cannot be advanced `max_vlans` times before the
    /// address space runs out
    pub fn short_bases(&self) -> Vec<(&'static str, Ipv4Net)> {
        let budget = self.max_vlans();
        [
            ("service_subnet", self.service_subnet),
            ("multicast_range", self.multicast_range),
            ("pod_subnet", self.pod_subnet),
        ]
        .into_iter()
        .filter(|(_, base)| net::headroom(*base) < budget)
        .collect()
    }
}
