#![allow(dead_code)]

use async_trait::async_trait;
use fabric_alloc::{AllocError, MemoryStore, Result, Store, TenantRecord};
use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Assert that no two records share a VLAN, subnet or multicast /16
pub fn assert_disjoint(records: &[TenantRecord]) {
    let mut vlans = HashSet::new();
    let mut service_subnets = HashSet::new();
    let mut pod_subnets = HashSet::new();
    let mut multicast = HashSet::new();
    let mut names = HashSet::new();

    for record in records {
        assert!(names.insert(record.system_id.clone()), "duplicate name {}", record.system_id);
        assert!(record.kubeapi_vlan < record.service_vlan, "{:?}", record);
        for vlan in record.vlans() {
            assert!(vlans.insert(vlan), "vlan {} handed out twice", vlan);
        }
        assert!(
            service_subnets.insert(record.service_subnet),
            "service subnet {} handed out twice",
            record.service_subnet
        );
        assert!(
            pod_subnets.insert(record.pod_subnet),
            "pod subnet {} handed out twice",
            record.pod_subnet
        );
        assert!(
            multicast.insert(record.multicast_prefix()),
            "multicast /16 {:?} handed out twice",
            record.multicast_prefix()
        );
    }
}

/// Memory store whose writes can be switched to fail
#[derive(Clone, Default)]
pub struct FlakyStore {
    pub inner: MemoryStore,
    fail_puts: Arc<AtomicBool>,
}

impl FlakyStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_puts(&self, fail: bool) {
        self.fail_puts.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl Store for FlakyStore {
    type Guard = <MemoryStore as Store>::Guard;

    async fn get(&self, key: &str) -> Result<Option<String>> {
        self.inner.get(key).await
    }

    async fn put(&self, key: &str, value: &str) -> Result<()> {
        if self.fail_puts.load(Ordering::SeqCst) {
            return Err(AllocError::Store("write rejected".to_string()));
        }
        self.inner.put(key, value).await
    }

    async fn lock(&self, name: &str) -> Result<Self::Guard> {
        self.inner.lock(name).await
    }
}
