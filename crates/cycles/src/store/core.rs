//! [`CycleStore`]: configuration intake and cycle resolution for all tenants.

use std::collections::HashMap;
use std::sync::Arc;

use cadence_core::{SchedulerConfig, TenantId, Timestamp};
use tracing::{debug, info, warn};

use crate::cycle::{Ballot, BallotState, Cycle, CycleData, Metadata, Weight};
use crate::error::CycleError;
use crate::events::{CycleEvent, EventSink, NullSink};
use crate::math::{discounted_weight, elapsed_steps, next_grid_start, MAX_DISCOUNT_RATE};
use crate::oracle::GovernanceOracle;

use super::history::TenantHistory;

/// Owns every tenant's cycle history.
///
/// Use [`configure`](CycleStore::configure) to record proposals and
/// [`current_of`](CycleStore::current_of) / [`queued_of`](CycleStore::queued_of)
/// to resolve what governs a given instant.
pub struct CycleStore {
    histories: HashMap<TenantId, TenantHistory>,
    limits: SchedulerConfig,
    sink: Arc<dyn EventSink>,
}

impl CycleStore {
    /// Create an empty store with default field widths and no event sink.
    pub fn new() -> Self {
        Self::with_config(SchedulerConfig::default())
    }

    pub fn with_config(limits: SchedulerConfig) -> Self {
        Self {
            histories: HashMap::new(),
            limits,
            sink: Arc::new(NullSink),
        }
    }

    /// Route configuration events to `sink`.
    pub fn with_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.sink = sink;
        self
    }

    pub fn limits(&self) -> &SchedulerConfig {
        &self.limits
    }

    // ── Intake ──────────────────────────────────────────────────

    /// Record a new configuration for `tenant` proposed at `now`.
    ///
    /// The new cycle is based on the latest cycle approved and started as of
    /// `now`. It starts on that base's duration grid, no earlier than
    /// `must_start_at_or_after`, `now`, and the end of the base ballot's
    /// approval window. Nothing is stored when an error is returned.
    pub fn configure(
        &mut self,
        tenant: TenantId,
        data: CycleData,
        metadata: Metadata,
        must_start_at_or_after: Timestamp,
        now: Timestamp,
    ) -> Result<Cycle, CycleError> {
        let (duration, ballot) = self.validate(&data)?;

        if let Some(latest) = self.histories.get(&tenant).and_then(TenantHistory::latest) {
            if now <= latest.configuration {
                return Err(CycleError::StaleConfiguration {
                    tenant,
                    latest: latest.configuration,
                    now,
                });
            }
        }

        let earliest = now.max(must_start_at_or_after);
        let history = self.histories.entry(tenant).or_default();
        let base_idx = approved_index(tenant, history, now);

        let (number, based_on, start, weight) = match base_idx {
            None => {
                let weight = match data.weight {
                    Weight::Inherit => 0,
                    Weight::Explicit(w) => w,
                };
                (1, 0, earliest, weight)
            }
            Some(idx) => {
                let base = history.cycle(idx);
                let window = base.ballot.as_ref().map_or(0, Ballot::approval_window);
                let not_before = earliest.max(now.saturating_add(window));
                let (start, steps) = if base.duration == 0 {
                    (not_before, 1)
                } else {
                    next_grid_start(base.start, base.duration, not_before)
                };
                let weight = match data.weight {
                    Weight::Inherit => discounted_weight(base.weight, base.discount_rate, steps),
                    Weight::Explicit(w) => w,
                };
                (
                    base.number.saturating_add(steps),
                    base.configuration,
                    start,
                    weight,
                )
            }
        };

        let cycle = Cycle {
            number,
            configuration: now,
            based_on,
            start,
            duration,
            weight,
            discount_rate: data.discount_rate,
            ballot,
            metadata,
        };
        history.push(cycle.clone(), base_idx);

        info!(
            tenant = %tenant,
            configuration = now,
            number,
            based_on,
            start,
            duration,
            "cycle configured"
        );

        self.sink.emit(CycleEvent::Configured {
            configuration: now,
            tenant,
            duration,
            weight: data.weight,
            discount_rate: data.discount_rate,
            ballot: cycle.ballot.as_ref().map(|b| b.name().to_string()),
            metadata,
            must_start_at_or_after,
        });
        self.sink.emit(CycleEvent::Initialized {
            configuration: now,
            tenant,
            based_on,
        });

        Ok(cycle)
    }

    fn validate(&self, data: &CycleData) -> Result<(u64, Option<Ballot>), CycleError> {
        let max_duration = self.limits.max_duration();
        let duration = u64::try_from(data.duration)
            .ok()
            .filter(|d| *d <= max_duration)
            .ok_or(CycleError::InvalidDuration {
                duration: data.duration,
                max: max_duration,
            })?;

        if data.discount_rate > MAX_DISCOUNT_RATE {
            return Err(CycleError::InvalidDiscountRate {
                rate: data.discount_rate,
                max: MAX_DISCOUNT_RATE,
            });
        }

        if let Weight::Explicit(weight) = data.weight {
            let max = self.limits.max_weight();
            if weight > max {
                return Err(CycleError::InvalidWeight { weight, max });
            }
        }

        let ballot = match &data.ballot {
            None => None,
            Some(oracle) => Some(check_oracle(oracle)?),
        };

        Ok((duration, ballot))
    }

    // ── Resolution ──────────────────────────────────────────────

    /// The cycle in effect at `now`, rolled forward over elapsed durations,
    /// or the empty cycle if none has started.
    pub fn current_of(&self, tenant: TenantId, now: Timestamp) -> Cycle {
        let Some(history) = self.histories.get(&tenant) else {
            return Cycle::empty();
        };
        match approved_index(tenant, history, now) {
            Some(idx) => rolled_over(history.cycle(idx), now),
            None => Cycle::empty(),
        }
    }

    /// The cycle that follows the current one.
    ///
    /// A pending configuration due to take over when the current cycle ends
    /// is returned as-is unless its ballot has failed. Otherwise this is the
    /// current cycle projected one duration ahead, and the empty cycle when
    /// the current one is open-ended or absent.
    pub fn queued_of(&self, tenant: TenantId, now: Timestamp) -> Cycle {
        let Some(history) = self.histories.get(&tenant) else {
            return Cycle::empty();
        };

        if let Some(idx) = standby_index(history, now) {
            match ballot_state(tenant, history, idx, now) {
                BallotState::Failed => debug!(
                    tenant = %tenant,
                    configuration = history.cycle(idx).configuration,
                    "standby configuration failed its ballot; projecting rollover"
                ),
                _ => return history.cycle(idx).clone(),
            }
        }

        match approved_index(tenant, history, now) {
            Some(idx) => projected_next(history.cycle(idx), now),
            None => Cycle::empty(),
        }
    }

    /// The most recently created configuration, whether or not it has taken
    /// effect, with its ballot state at `now`.
    pub fn latest_configured_of(&self, tenant: TenantId, now: Timestamp) -> (Cycle, BallotState) {
        let Some(history) = self.histories.get(&tenant) else {
            return (Cycle::empty(), BallotState::Approved);
        };
        match history.latest_index() {
            Some(idx) => (
                history.cycle(idx).clone(),
                ballot_state(tenant, history, idx, now),
            ),
            None => (Cycle::empty(), BallotState::Approved),
        }
    }

    /// Ballot state of the latest configuration.
    pub fn current_ballot_state_of(&self, tenant: TenantId, now: Timestamp) -> BallotState {
        self.latest_configured_of(tenant, now).1
    }

    /// The stored record for `configuration`, or the empty cycle.
    pub fn get(&self, tenant: TenantId, configuration: Timestamp) -> Cycle {
        self.histories
            .get(&tenant)
            .and_then(|h| h.find(configuration))
            .cloned()
            .unwrap_or_else(Cycle::empty)
    }

    /// Every stored record for `tenant`, oldest first.
    pub fn history_of(&self, tenant: TenantId) -> &[Cycle] {
        self.histories
            .get(&tenant)
            .map(TenantHistory::cycles)
            .unwrap_or(&[])
    }

    /// Configuration id of the latest record, 0 when there is none.
    pub fn latest_configuration_of(&self, tenant: TenantId) -> Timestamp {
        self.histories
            .get(&tenant)
            .and_then(TenantHistory::latest)
            .map_or(0, |c| c.configuration)
    }

    /// Number of tenants with at least one configuration.
    pub fn tenant_count(&self) -> usize {
        self.histories.values().filter(|h| h.len() > 0).count()
    }
}

impl Default for CycleStore {
    fn default() -> Self {
        Self::new()
    }
}

// ── Helpers ─────────────────────────────────────────────────────

/// Run the compliance check and capture the approval window.
fn check_oracle(oracle: &Arc<dyn GovernanceOracle>) -> Result<Ballot, CycleError> {
    let invalid = |reason: String| CycleError::InvalidGovernanceOracle {
        name: oracle.name().to_string(),
        reason,
    };
    match oracle.is_compliant() {
        Ok(true) => {}
        Ok(false) => return Err(invalid("interface not supported".to_string())),
        Err(e) => return Err(invalid(e.to_string())),
    }
    let window = oracle.approval_window().map_err(|e| invalid(e.to_string()))?;
    Ok(Ballot::new(Arc::clone(oracle), window))
}

/// Ballot state of the record at `idx`, decided by its base's ballot.
fn ballot_state(tenant: TenantId, history: &TenantHistory, idx: usize, now: Timestamp) -> BallotState {
    let Some(parent) = history.parent(idx) else {
        return BallotState::Approved;
    };
    let Some(ballot) = history.cycle(parent).ballot.as_ref() else {
        return BallotState::Approved;
    };
    let cycle = history.cycle(idx);
    match ballot
        .oracle()
        .outcome_of(tenant, cycle.configuration, cycle.start, now)
    {
        Ok(state) => state,
        Err(e) => {
            warn!(
                tenant = %tenant,
                configuration = cycle.configuration,
                oracle = %ballot.name(),
                error = %e,
                "oracle query failed; treating ballot as active"
            );
            BallotState::Active
        }
    }
}

/// Latest record that has started by `t` and is approved at `t`.
///
/// Walks base links from the newest record, so the cost is bounded by the
/// tenant's configuration count rather than by elapsed time.
fn approved_index(tenant: TenantId, history: &TenantHistory, t: Timestamp) -> Option<usize> {
    let mut cursor = history.latest_index();
    while let Some(idx) = cursor {
        let cycle = history.cycle(idx);
        if cycle.start <= t {
            let state = ballot_state(tenant, history, idx, t);
            if state == BallotState::Approved {
                return Some(idx);
            }
            debug!(
                tenant = %tenant,
                configuration = cycle.configuration,
                state = %state,
                "skipping unapproved configuration"
            );
        }
        cursor = history.parent(idx);
    }
    None
}

/// The latest record if it has not started and is next in line: a first
/// cycle, or one starting no later than one base duration from `now`.
fn standby_index(history: &TenantHistory, now: Timestamp) -> Option<usize> {
    let idx = history.latest_index()?;
    let latest = history.cycle(idx);
    if now >= latest.start {
        return None;
    }
    let Some(parent) = history.parent(idx) else {
        return Some(idx);
    };
    let base = history.cycle(parent);
    if base.duration != 0 && now < latest.start.saturating_sub(base.duration) {
        return None;
    }
    Some(idx)
}

/// `cycle` advanced over the whole durations elapsed by `now`. The weight is
/// carried unchanged.
fn rolled_over(cycle: &Cycle, now: Timestamp) -> Cycle {
    let steps = elapsed_steps(cycle.start, cycle.duration, now);
    if steps == 0 {
        return cycle.clone();
    }
    Cycle {
        number: cycle.number.saturating_add(steps),
        start: cycle.start + steps * cycle.duration,
        ..cycle.clone()
    }
}

/// The repetition of `cycle` that starts strictly after `now`.
fn projected_next(cycle: &Cycle, now: Timestamp) -> Cycle {
    if cycle.duration == 0 {
        return Cycle::empty();
    }
    let (start, steps) = next_grid_start(cycle.start, cycle.duration, now.saturating_add(1));
    Cycle {
        number: cycle.number.saturating_add(steps),
        start,
        ..cycle.clone()
    }
}
