use serde::{Deserialize, Serialize};

/// Seconds on the scheduler clock. Zero doubles as "no configuration".
pub type Timestamp = u64;

/// Owner of a cycle history (a "project").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TenantId(pub u64);

impl std::fmt::Display for TenantId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "tenant#{}", self.0)
    }
}
