//! Governance oracle seam.
//!
//! A cycle may carry a ballot: a handle to an external oracle that decides
//! whether reconfigurations proposed while that cycle is the base take
//! effect. The store only ever reads from an oracle.

use std::collections::HashMap;
use std::fmt;
use std::sync::RwLock;

use cadence_core::{TenantId, Timestamp};
use thiserror::Error;

use crate::cycle::BallotState;

/// Error type for oracle calls.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OracleError {
    #[error("oracle unavailable: {0}")]
    Unavailable(String),
    #[error("oracle query failed: {0}")]
    Query(String),
    #[error("ballot for configuration {configuration} of tenant {tenant} has already failed")]
    AlreadyFailed {
        tenant: TenantId,
        configuration: Timestamp,
    },
}

/// External approval mechanism consulted by the store.
///
/// Implementations must be deterministic in their arguments: the store passes
/// the evaluation time explicitly instead of letting the oracle read a clock.
pub trait GovernanceOracle: Send + Sync + fmt::Debug {
    /// Human-readable name for logs and serialized output.
    fn name(&self) -> &str;

    /// Compliance check. A ballot is accepted only when this returns `Ok(true)`.
    fn is_compliant(&self) -> Result<bool, OracleError>;

    /// Seconds after a proposal during which the outcome may still change.
    fn approval_window(&self) -> Result<u64, OracleError>;

    /// Outcome for the proposal identified by `configuration` that would
    /// start at `start`, evaluated at `now`.
    fn outcome_of(
        &self,
        tenant: TenantId,
        configuration: Timestamp,
        start: Timestamp,
        now: Timestamp,
    ) -> Result<BallotState, OracleError>;
}

/// Reconfiguration buffer: a proposal is approved once `window` seconds have
/// passed since it was made, and fails if its cycle would start first.
/// A failed proposal stays failed.
///
/// Outcomes can also be decided explicitly with [`DelayOracle::finalize`].
#[derive(Debug)]
pub struct DelayOracle {
    name: String,
    window: u64,
    decisions: RwLock<HashMap<(TenantId, Timestamp), BallotState>>,
}

impl DelayOracle {
    pub fn new(name: impl Into<String>, window: u64) -> Self {
        Self {
            name: name.into(),
            window,
            decisions: RwLock::new(HashMap::new()),
        }
    }

    pub fn window(&self) -> u64 {
        self.window
    }

    /// Pin the outcome of one proposal. `Active` clears a previous decision.
    ///
    /// A proposal finalized as `Failed` can not be changed afterwards;
    /// finalizing it as `Failed` again is a no-op.
    pub fn finalize(
        &self,
        tenant: TenantId,
        configuration: Timestamp,
        state: BallotState,
    ) -> Result<(), OracleError> {
        let mut guard = match self.decisions.write() {
            Ok(g) => g,
            Err(poisoned) => poisoned.into_inner(),
        };
        let key = (tenant, configuration);
        if guard.get(&key) == Some(&BallotState::Failed) {
            if state == BallotState::Failed {
                return Ok(());
            }
            return Err(OracleError::AlreadyFailed {
                tenant,
                configuration,
            });
        }
        match state {
            BallotState::Active => {
                guard.remove(&key);
            }
            decided => {
                guard.insert(key, decided);
            }
        }
        Ok(())
    }

    fn decision(&self, tenant: TenantId, configuration: Timestamp) -> Option<BallotState> {
        let guard = match self.decisions.read() {
            Ok(g) => g,
            Err(poisoned) => poisoned.into_inner(),
        };
        guard.get(&(tenant, configuration)).copied()
    }
}

impl GovernanceOracle for DelayOracle {
    fn name(&self) -> &str {
        &self.name
    }

    fn is_compliant(&self) -> Result<bool, OracleError> {
        Ok(true)
    }

    fn approval_window(&self) -> Result<u64, OracleError> {
        Ok(self.window)
    }

    fn outcome_of(
        &self,
        tenant: TenantId,
        configuration: Timestamp,
        start: Timestamp,
        now: Timestamp,
    ) -> Result<BallotState, OracleError> {
        if let Some(decided) = self.decision(tenant, configuration) {
            return Ok(decided);
        }
        let approved_at = configuration.saturating_add(self.window);
        if start < approved_at {
            return Ok(BallotState::Failed);
        }
        if now < approved_at {
            return Ok(BallotState::Active);
        }
        Ok(BallotState::Approved)
    }
}
