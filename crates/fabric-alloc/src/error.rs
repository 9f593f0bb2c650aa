//! Allocator error types

use thiserror::Error;

/// Allocator errors
///
/// Every failure mode maps to exactly one variant so callers can branch on
/// the cause (e.g. to pick an HTTP status upstream).
#[derive(Error, Debug)]
pub enum AllocError {
    #[error("Invalid tenant name {0:?}: name must be one or more characters without whitespace")]
    InvalidName(String),

    #[error("Tenant already exists: {0}")]
    TenantAlreadyExists(String),

    #[error("Tenant does not exist: {0}")]
    TenantDoesNotExist(String),

    #[error("Unable to allocate 2 VLAN ids, only {available} ids available")]
    InsufficientVlans { available: usize },

    #[error("Unable to find a free service subnet, {allocated} are already allocated")]
    NoServiceSubnetsAvailable { allocated: usize },

    #[error("Unable to find a free multicast range, {allocated} are already allocated")]
    NoMulticastRangesAvailable { allocated: usize },

    #[error("Unable to find a free pod subnet, {allocated} are already allocated")]
    NoPodSubnetsAvailable { allocated: usize },

    #[error("Invalid IP address: {0}")]
    InvalidIp(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Store error: {0}")]
    Store(String),

    #[error("Lock acquisition failed: {0}")]
    LockError(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl AllocError {
    /// Whether this error reports an exhausted resource pool
    pub fn is_exhausted(&self) -> bool {
        matches!(
            self,
            AllocError::InsufficientVlans { .. }
                | AllocError::NoServiceSubnetsAvailable { .. }
                | AllocError::NoMulticastRangesAvailable { .. }
                | AllocError::NoPodSubnetsAvailable { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, AllocError>;
