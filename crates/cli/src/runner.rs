//! Replays a [`Scenario`] against a fresh store on a manual clock.

use std::collections::BTreeMap;
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use cadence_core::{SchedulerConfig, TenantId, Timestamp};
use cadence_cycles::{
    BallotState, Clock, Cycle, CycleData, CycleStore, DelayOracle, EventLog, GovernanceOracle,
    LoggedEvent, ManualClock,
};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::scenario::{metadata_of, weight_of, Op, Scenario, Step};

/// Result of one step. Rejected configurations and finalizations carry `error`.
#[derive(Debug, Clone, Serialize)]
pub struct StepOutcome {
    pub step: usize,
    pub at: Timestamp,
    pub tenant: TenantId,
    pub op: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cycle: Option<Cycle>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ballot_state: Option<BallotState>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl StepOutcome {
    fn new(step: usize, at: Timestamp, tenant: TenantId, op: &'static str) -> Self {
        Self {
            step,
            at,
            tenant,
            op,
            cycle: None,
            ballot_state: None,
            error: None,
        }
    }
}

/// Everything a run produced.
#[derive(Debug, Clone, Serialize)]
pub struct Report {
    pub steps: Vec<StepOutcome>,
    pub events: Vec<LoggedEvent>,
}

pub struct Runner {
    store: CycleStore,
    clock: ManualClock,
    oracles: BTreeMap<String, Arc<DelayOracle>>,
    events: EventLog,
}

impl Runner {
    /// Build a runner for `scenario`. The scenario's own `[scheduler]`
    /// section overrides `limits`.
    pub fn new(scenario: &Scenario, limits: SchedulerConfig) -> Self {
        let events = EventLog::new();
        let limits = scenario.scheduler.unwrap_or(limits);
        let store = CycleStore::with_config(limits).with_sink(Arc::new(events.clone()));
        let oracles = scenario
            .oracles
            .iter()
            .map(|(name, oracle)| {
                let delay = DelayOracle::new(name.clone(), oracle.window);
                (name.clone(), Arc::new(delay))
            })
            .collect();
        Self {
            store,
            clock: ManualClock::default(),
            oracles,
            events,
        }
    }

    /// Check and replay every step in order.
    pub fn run(scenario: &Scenario, limits: SchedulerConfig) -> Result<Report> {
        scenario.check()?;
        let mut runner = Self::new(scenario, limits);
        let limits = runner.store.limits();
        info!(
            steps = scenario.steps.len(),
            oracles = scenario.oracles.len(),
            duration_bits = limits.duration_bits,
            weight_bits = limits.weight_bits,
            "Replaying scenario"
        );

        let mut steps = Vec::with_capacity(scenario.steps.len());
        for (index, step) in scenario.steps.iter().enumerate() {
            let outcome = runner
                .apply(index + 1, step)
                .with_context(|| format!("step {} ({})", index + 1, step.op.name()))?;
            steps.push(outcome);
        }

        Ok(Report {
            steps,
            events: runner.events.all(),
        })
    }

    fn oracle(&self, name: &str) -> Result<&Arc<DelayOracle>> {
        self.oracles
            .get(name)
            .ok_or_else(|| anyhow!("unknown oracle '{name}'"))
    }

    fn apply(&mut self, index: usize, step: &Step) -> Result<StepOutcome> {
        self.clock.set(step.at.resolve()?);
        let now = self.clock.now();
        let tenant = step.tenant;
        let mut outcome = StepOutcome::new(index, now, tenant, step.op.name());
        debug!(step = index, at = now, tenant = %tenant, op = outcome.op, "Applying step");

        match &step.op {
            Op::Configure {
                duration,
                weight,
                discount_rate,
                ballot,
                metadata,
                must_start_at_or_after,
            } => {
                let ballot = match ballot {
                    Some(name) => {
                        Some(Arc::clone(self.oracle(name)?) as Arc<dyn GovernanceOracle>)
                    }
                    None => None,
                };
                let data = CycleData {
                    duration: duration.value()?,
                    weight: weight_of(weight.as_ref())?,
                    discount_rate: *discount_rate,
                    ballot,
                };
                let must = match must_start_at_or_after {
                    Some(t) => t.resolve()?,
                    None => 0,
                };
                match self
                    .store
                    .configure(tenant, data, metadata_of(metadata.as_ref())?, must, now)
                {
                    Ok(cycle) => outcome.cycle = Some(cycle),
                    Err(e) => {
                        warn!(step = index, tenant = %tenant, error = %e, "Configuration rejected");
                        outcome.error = Some(e.to_string());
                    }
                }
            }
            Op::Current => outcome.cycle = Some(self.store.current_of(tenant, now)),
            Op::Queued => outcome.cycle = Some(self.store.queued_of(tenant, now)),
            Op::Latest => {
                let (cycle, state) = self.store.latest_configured_of(tenant, now);
                outcome.cycle = Some(cycle);
                outcome.ballot_state = Some(state);
            }
            Op::Ballot => {
                outcome.ballot_state = Some(self.store.current_ballot_state_of(tenant, now));
            }
            Op::Get { configuration } => {
                outcome.cycle = Some(self.store.get(tenant, configuration.resolve()?));
            }
            Op::Finalize {
                oracle,
                configuration,
                state,
            } => {
                let configuration = configuration.resolve()?;
                match self.oracle(oracle)?.finalize(tenant, configuration, *state) {
                    Ok(()) => outcome.ballot_state = Some(*state),
                    Err(e) => {
                        warn!(step = index, tenant = %tenant, error = %e, "Finalization rejected");
                        outcome.error = Some(e.to_string());
                    }
                }
            }
        }

        Ok(outcome)
    }
}

/// One JSON document per step, then one per recorded event.
pub fn render(report: &Report, pretty: bool) -> Result<String> {
    fn encode<T: Serialize>(value: &T, pretty: bool) -> Result<String> {
        let text = if pretty {
            serde_json::to_string_pretty(value)?
        } else {
            serde_json::to_string(value)?
        };
        Ok(text)
    }

    let mut lines = Vec::with_capacity(report.steps.len() + report.events.len());
    for outcome in &report.steps {
        lines.push(encode(outcome, pretty)?);
    }
    for event in &report.events {
        lines.push(encode(event, pretty)?);
    }
    Ok(lines.join("\n"))
}
