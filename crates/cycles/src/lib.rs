//! Per-tenant cycle scheduling with governance-gated reconfiguration.
//!
//! This crate provides:
//! - The [`CycleStore`]: configuration intake and current/queued/latest resolution
//! - Closed-form rollover and discounted weight derivation
//! - The [`GovernanceOracle`] seam plus a reconfiguration-delay oracle
//! - Structured configuration events via an [`EventSink`]

pub mod clock;
pub mod cycle;
pub mod error;
pub mod events;
pub mod math;
pub mod oracle;
pub mod store;

pub use clock::{Clock, ManualClock};
pub use cycle::{Ballot, BallotState, Cycle, CycleData, Metadata, Weight};
pub use error::CycleError;
pub use events::{CycleEvent, EventLog, EventSink, LoggedEvent, NullSink};
pub use math::MAX_DISCOUNT_RATE;
pub use oracle::{DelayOracle, GovernanceOracle, OracleError};
pub use store::{new_shared_store, CycleStore, SharedCycleStore};

pub use cadence_core::{TenantId, Timestamp};
