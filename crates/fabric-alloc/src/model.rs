//! Tenant records and the allocation table
//!
//! The whole table is persisted as one JSON object keyed by tenant name.
//! Record field names are the dotted paths the provisioning payload uses,
//! and must stay stable since the stored document outlives the process.

use ipnet::Ipv4Net;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::net::Ipv4Addr;

use crate::net;

/// Network resources reserved for a single tenant
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TenantRecord {
    /// Tenant name
    #[serde(rename = "aci_config.system_id")]
    pub system_id: String,

    /// VLAN carrying the tenant's Kubernetes API traffic
    #[serde(rename = "net_config.kubeapi_vlan")]
    pub kubeapi_vlan: u16,

    /// VLAN carrying the tenant's service traffic
    #[serde(rename = "net_config.service_vlan")]
    pub service_vlan: u16,

    #[serde(rename = "net_config.node_svc_subnet")]
    pub service_subnet: Ipv4Net,

    /// First usable multicast address (x.y.1.1)
    #[serde(rename = "aci_config.vmm_domain.mcast_range.start")]
    pub multicast_range_start: Ipv4Addr,

    /// Last multicast address of the /16 (x.y.255.255)
    #[serde(rename = "aci_config.vmm_domain.mcast_range.end")]
    pub multicast_range_end: Ipv4Addr,

    #[serde(rename = "net_config.pod_subnet")]
    pub pod_subnet: Ipv4Net,
}

impl TenantRecord {
    /// Both VLAN ids held by this tenant
    pub fn vlans(&self) -> [u16; 2] {
        [self.kubeapi_vlan, self.service_vlan]
    }

    /// The /16 the tenant's multicast range was carved from
    pub fn multicast_prefix(&self) -> [u8; 2] {
        net::slash16(self.multicast_range_start)
    }
}

/// The complete allocation table, tenant name to record
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AllocatorState {
    tenants: BTreeMap<String, TenantRecord>,
}

impl AllocatorState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&TenantRecord> {
        self.tenants.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tenants.contains_key(name)
    }

    /// Add a record, keyed by its `system_id`
    pub fn insert(&mut self, record: TenantRecord) {
        self.tenants.insert(record.system_id.clone(), record);
    }

    pub fn remove(&mut self, name: &str) -> Option<TenantRecord> {
        self.tenants.remove(name)
    }

    pub fn len(&self) -> usize {
        self.tenants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tenants.is_empty()
    }

    /// Records ordered by tenant name
    pub fn records(&self) -> impl Iterator<Item = &TenantRecord> {
        self.tenants.values()
    }

    /// Every VLAN id held by any tenant
    pub fn used_vlans(&self) -> BTreeSet<u16> {
        self.records().flat_map(TenantRecord::vlans).collect()
    }

    pub fn service_subnets(&self) -> HashSet<Ipv4Net> {
        self.records().map(|r| r.service_subnet).collect()
    }

    pub fn pod_subnets(&self) -> HashSet<Ipv4Net> {
        self.records().map(|r| r.pod_subnet).collect()
    }

    /// The /16 prefixes already claimed by multicast ranges
    pub fn multicast_prefixes(&self) -> HashSet<[u8; 2]> {
        self.records().map(TenantRecord::multicast_prefix).collect()
    }

    pub fn into_records(self) -> Vec<TenantRecord> {
        self.tenants.into_values().collect()
    }
}
