//! Tenant resource allocation
//!
//! Every operation takes the table-wide lock, reads the whole table, and
//! (for `reserve`/`free`) writes the whole table back before releasing the
//! lock. Cross-tenant uniqueness is checked against the full table, so there
//! is no per-tenant fast path.

use crate::config::AllocatorConfig;
use crate::error::{AllocError, Result};
use crate::model::{AllocatorState, TenantRecord};
use crate::net;
use crate::store::Store;

/// Key the allocation table is stored under
pub const DB_KEY: &str = "/fabric_alloc/tenants";

/// Name of the lock serializing all access to the table
pub const LOCK_NAME: &str = "fabric_alloc_lock";

/// Check that a tenant name is non-empty and free of whitespace
pub fn validate_tenant_name(name: &str) -> Result<()> {
    if name.is_empty() || name.chars().any(char::is_whitespace) {
        return Err(AllocError::InvalidName(name.to_string()));
    }
    Ok(())
}

/// Allocates VLAN pairs, service subnets, multicast ranges and pod subnets
/// to tenants
///
/// The allocator holds no table state of its own; the store owns the
/// canonical copy. Allocators in different processes sharing one store see
/// a single, totally ordered history of reservations.
pub struct Allocator<S> {
    store: S,
    config: AllocatorConfig,
}

impl<S: Store> Allocator<S> {
    /// Create an allocator, rejecting invalid VLAN bounds
    pub fn new(store: S, config: AllocatorConfig) -> Result<Self> {
        config.validate()?;

        for (field, base) in config.short_bases() {
            tracing::warn!(
                "{} {} leaves room for only {} of {} candidates before the address space runs out",
                field,
                base,
                net::headroom(base) + 1,
                config.max_vlans()
            );
        }

        Ok(Self { store, config })
    }

    /// Settings this allocator was built with
    pub fn config(&self) -> &AllocatorConfig {
        &self.config
    }

    /// Store holding the allocation table
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Reserve a unique set of network resources for `tenant_name`
    pub async fn reserve(&self, tenant_name: &str) -> Result<TenantRecord> {
        validate_tenant_name(tenant_name)?;

        let _lock = self.store.lock(LOCK_NAME).await?;
        let mut state = self.load().await?;

        if state.contains(tenant_name) {
            return Err(AllocError::TenantAlreadyExists(tenant_name.to_string()));
        }

        let record = self.plan(&state, tenant_name)?;
        state.insert(record.clone());
        self.save(&state).await?;

        tracing::info!(
            "Reserved tenant {}: vlans {}/{}, service subnet {}, multicast {}-{}, pod subnet {}",
            record.system_id,
            record.kubeapi_vlan,
            record.service_vlan,
            record.service_subnet,
            record.multicast_range_start,
            record.multicast_range_end,
            record.pod_subnet
        );
        Ok(record)
    }

    /// Release everything held by `tenant_name`
    pub async fn free(&self, tenant_name: &str) -> Result<()> {
        let _lock = self.store.lock(LOCK_NAME).await?;
        let mut state = self.load().await?;

        if state.remove(tenant_name).is_none() {
            return Err(AllocError::TenantDoesNotExist(tenant_name.to_string()));
        }

        self.save(&state).await?;
        tracing::info!("Freed tenant {}", tenant_name);
        Ok(())
    }

    /// Look up a tenant; `None` if it has no reservation
    pub async fn get(&self, tenant_name: &str) -> Result<Option<TenantRecord>> {
        let _lock = self.store.lock(LOCK_NAME).await?;
        Ok(self.load().await?.get(tenant_name).cloned())
    }

    /// All reservations, ordered by tenant name
    pub async fn list(&self) -> Result<Vec<TenantRecord>> {
        let _lock = self.store.lock(LOCK_NAME).await?;
        Ok(self.load().await?.into_records())
    }

    /// Pick resources for a new tenant without touching the store
    fn plan(&self, state: &AllocatorState, tenant_name: &str) -> Result<TenantRecord> {
        let config = &self.config;
        let attempts = config.max_vlans();

        let used_vlans = state.used_vlans();
        let free_vlans: Vec<u16> = (config.vlan_min..=config.vlan_max)
            .filter(|id| !used_vlans.contains(id))
            .take(2)
            .collect();
        let (kubeapi_vlan, service_vlan) = match free_vlans.as_slice() {
            [kubeapi, service] => (*kubeapi, *service),
            _ => {
                return Err(AllocError::InsufficientVlans {
                    available: free_vlans.len(),
                });
            }
        };

        let service_subnets = state.service_subnets();
        let service_subnet = net::probe_free(config.service_subnet, attempts, |candidate| {
            service_subnets.contains(candidate)
        })
        .ok_or(AllocError::NoServiceSubnetsAvailable {
            allocated: service_subnets.len(),
        })?;

        let multicast_prefixes = state.multicast_prefixes();
        let mcast_exhausted = || AllocError::NoMulticastRangesAvailable {
            allocated: multicast_prefixes.len(),
        };
        let multicast_range = net::probe_free(config.multicast_range, attempts, |candidate| {
            multicast_prefixes.contains(&net::slash16(candidate.network()))
        })
        .ok_or_else(mcast_exhausted)?;
        let (multicast_range_start, multicast_range_end) =
            net::multicast_bounds(multicast_range).map_err(|_| mcast_exhausted())?;

        let pod_subnets = state.pod_subnets();
        let pod_subnet = net::probe_free(config.pod_subnet, attempts, |candidate| {
            pod_subnets.contains(candidate)
        })
        .ok_or(AllocError::NoPodSubnetsAvailable {
            allocated: pod_subnets.len(),
        })?;

        Ok(TenantRecord {
            system_id: tenant_name.to_string(),
            kubeapi_vlan,
            service_vlan,
            service_subnet,
            multicast_range_start,
            multicast_range_end,
            pod_subnet,
        })
    }

    async fn load(&self) -> Result<AllocatorState> {
        match self.store.get(DB_KEY).await? {
            Some(content) if !content.trim().is_empty() => {
                let state: AllocatorState = serde_json::from_str(&content)?;
                tracing::debug!("Loaded allocation table with {} tenants", state.len());
                Ok(state)
            }
            _ => {
                tracing::debug!("Allocation table not found, starting empty");
                Ok(AllocatorState::new())
            }
        }
    }

    async fn save(&self, state: &AllocatorState) -> Result<()> {
        let content = serde_json::to_string_pretty(state)?;
        self.store.put(DB_KEY, &content).await?;
        tracing::debug!("Saved allocation table with {} tenants", state.len());
        Ok(())
    }
}
