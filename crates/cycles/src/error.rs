//! Configuration intake errors.

use cadence_core::{TenantId, Timestamp};
use thiserror::Error;

/// Rejections reported by [`CycleStore::configure`](crate::CycleStore::configure).
/// The store is never modified when one is returned.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CycleError {
    #[error("invalid duration {duration}: exceeds maximum {max}")]
    InvalidDuration { duration: u128, max: u64 },

    #[error("invalid discount rate {rate}: exceeds maximum {max}")]
    InvalidDiscountRate { rate: u64, max: u64 },

    #[error("invalid weight {weight}: exceeds maximum {max}")]
    InvalidWeight { weight: u128, max: u128 },

    #[error("invalid governance oracle {name}: {reason}")]
    InvalidGovernanceOracle { name: String, reason: String },

    #[error("{tenant} was last configured at {latest}; cannot configure again at {now}")]
    StaleConfiguration {
        tenant: TenantId,
        latest: Timestamp,
        now: Timestamp,
    },
}
