//! Cycle records, proposals and ballot handles.

use std::fmt;
use std::sync::Arc;

use cadence_core::Timestamp;
use serde::ser::SerializeStruct;
use serde::{Deserialize, Serialize, Serializer};

use crate::oracle::GovernanceOracle;

/// Opaque bit-packed payload carried through unchanged.
pub type Metadata = u128;

/// Outcome of the governance window for a configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BallotState {
    /// Window open, outcome undetermined.
    Active,
    /// The configuration takes effect once its start arrives.
    Approved,
    /// Rejected; resolution behaves as if the configuration never happened.
    Failed,
}

impl fmt::Display for BallotState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BallotState::Active => write!(f, "active"),
            BallotState::Approved => write!(f, "approved"),
            BallotState::Failed => write!(f, "failed"),
        }
    }
}

/// Requested weight for a new configuration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Weight {
    /// Carry the base cycle's weight forward, discounted once per elapsed step.
    #[default]
    Inherit,
    /// Store exactly this value.
    Explicit(u128),
}

impl Weight {
    /// Decode the packed form: `0` inherits, `1` stores zero, anything else is literal.
    pub fn from_raw(raw: u128) -> Self {
        match raw {
            0 => Weight::Inherit,
            1 => Weight::Explicit(0),
            n => Weight::Explicit(n),
        }
    }
}

/// An accepted governance oracle together with the approval window it
/// reported when the compliance check passed.
#[derive(Clone)]
pub struct Ballot {
    oracle: Arc<dyn GovernanceOracle>,
    approval_window: u64,
}

impl Ballot {
    pub(crate) fn new(oracle: Arc<dyn GovernanceOracle>, approval_window: u64) -> Self {
        Self {
            oracle,
            approval_window,
        }
    }

    pub fn oracle(&self) -> &Arc<dyn GovernanceOracle> {
        &self.oracle
    }

    pub fn name(&self) -> &str {
        self.oracle.name()
    }

    /// Seconds after a proposal before its governing window closes.
    pub fn approval_window(&self) -> u64 {
        self.approval_window
    }
}

impl fmt::Debug for Ballot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Ballot")
            .field("oracle", &self.oracle.name())
            .field("approval_window", &self.approval_window)
            .finish()
    }
}

impl PartialEq for Ballot {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.oracle, &other.oracle) && self.approval_window == other.approval_window
    }
}

impl Serialize for Ballot {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut s = serializer.serialize_struct("Ballot", 2)?;
        s.serialize_field("oracle", self.oracle.name())?;
        s.serialize_field("approval_window", &self.approval_window)?;
        s.end()
    }
}

/// One scheduled configuration record. Immutable once stored.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Cycle {
    /// 1-based position in the tenant's history, advanced by elapsed durations.
    pub number: u64,
    /// Clock time the record was created; primary key within a tenant.
    pub configuration: Timestamp,
    /// Configuration this record derives from, 0 for a first cycle.
    pub based_on: Timestamp,
    pub start: Timestamp,
    /// 0 means open-ended: the cycle never rolls over on its own.
    pub duration: u64,
    pub weight: u128,
    /// Fraction of `MAX_DISCOUNT_RATE` removed from the weight per step.
    pub discount_rate: u64,
    pub ballot: Option<Ballot>,
    pub metadata: Metadata,
}

impl Cycle {
    /// The zero-valued sentinel returned when nothing applies.
    pub fn empty() -> Self {
        Self {
            number: 0,
            configuration: 0,
            based_on: 0,
            start: 0,
            duration: 0,
            weight: 0,
            discount_rate: 0,
            ballot: None,
            metadata: 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.number == 0
    }

    /// First instant after this cycle, or `None` for open-ended cycles.
    pub fn end(&self) -> Option<Timestamp> {
        if self.duration == 0 {
            None
        } else {
            Some(self.start.saturating_add(self.duration))
        }
    }
}

impl Default for Cycle {
    fn default() -> Self {
        Self::empty()
    }
}

/// A reconfiguration proposal as submitted by the caller.
///
/// `duration` is wider than the stored field so that out-of-range requests
/// can be represented and rejected.
#[derive(Debug, Clone, Default)]
pub struct CycleData {
    pub duration: u128,
    pub weight: Weight,
    pub discount_rate: u64,
    pub ballot: Option<Arc<dyn GovernanceOracle>>,
}

impl CycleData {
    pub fn new(duration: u64, weight: Weight, discount_rate: u64) -> Self {
        Self {
            duration: duration as u128,
            weight,
            discount_rate,
            ballot: None,
        }
    }

    pub fn with_ballot(mut self, oracle: Arc<dyn GovernanceOracle>) -> Self {
        self.ballot = Some(oracle);
        self
    }
}
