//! Fabric tenant resource allocation
//!
//! This crate hands out disjoint network resources to named tenants of a
//! multi-tenant fabric: a pair of VLAN ids, a service subnet, a multicast
//! range and a pod subnet per tenant. No two tenants ever share a resource,
//! and everything is returned to the pool when a tenant is freed.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────┐
//! │          orchestration layer / fabctl            │
//! │           reserve · free · get · list            │
//! └─────────────────┬───────────────────────────────┘
//!                   │
//! ┌─────────────────▼───────────────────────────────┐
//! │                 fabric-alloc                     │
//! │  ┌──────────────────────────────────────────┐   │
//! │  │  Allocator (whole-table read-modify-write │   │
//! │  │  under one named lock)                    │   │
//! │  └──────────────────────────────────────────┘   │
//! │  ┌──────────────┐  ┌──────────────────────┐     │
//! │  │ net helpers  │  │ trait Store { .. }   │     │
//! │  └──────────────┘  └──────────────────────┘     │
//! └───────────────────────┬─────────────────────────┘
//!                         │
//!            ┌────────────┴────────────┐
//!    ┌───────▼───────┐         ┌───────▼───────┐
//!    │  MemoryStore  │         │   FileStore   │
//!    └───────────────┘         └───────────────┘
//! ```

pub mod allocator;
pub mod config;
pub mod error;
pub mod model;
pub mod net;
pub mod store;

// Re-exports
pub use allocator::{Allocator, DB_KEY, LOCK_NAME, validate_tenant_name};
pub use config::AllocatorConfig;
pub use error::{AllocError, Result};
pub use model::{AllocatorState, TenantRecord};
pub use store::{FileLock, FileStore, MemoryStore, Store};
