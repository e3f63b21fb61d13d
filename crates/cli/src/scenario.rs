//! Scenario files: a TOML description of oracles and timed store operations.
//!
//! ```toml
//! [oracles.three-day]
//! window = 259200
//!
//! [[steps]]
//! at = "2023-11-14T22:13:20Z"
//! tenant = 1
//! op = "configure"
//! duration = 604800
//! weight = "1000000000000000000000000"
//! ballot = "three-day"
//!
//! [[steps]]
//! at = 1700604800
//! tenant = 1
//! op = "current"
//! ```

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{anyhow, bail, Context, Result};
use cadence_core::{SchedulerConfig, TenantId, Timestamp};
use cadence_cycles::{BallotState, Metadata, Weight};
use chrono::DateTime;
use serde::Deserialize;
use tracing::debug;

/// A point in time: Unix seconds or an RFC 3339 string.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum TimeSpec {
    Seconds(u64),
    Rfc3339(String),
}

impl TimeSpec {
    pub fn resolve(&self) -> Result<Timestamp> {
        match self {
            TimeSpec::Seconds(s) => Ok(*s),
            TimeSpec::Rfc3339(text) => {
                let parsed = DateTime::parse_from_rfc3339(text)
                    .with_context(|| format!("invalid timestamp '{text}'"))?;
                u64::try_from(parsed.timestamp())
                    .map_err(|_| anyhow!("timestamp '{text}' is before the Unix epoch"))
            }
        }
    }
}

/// An unsigned value wider than TOML integers. Large values are written as
/// decimal strings.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum Wide {
    Int(u64),
    Text(String),
}

impl Wide {
    pub fn value(&self) -> Result<u128> {
        match self {
            Wide::Int(n) => Ok(u128::from(*n)),
            Wide::Text(text) => text
                .trim()
                .replace('_', "")
                .parse()
                .with_context(|| format!("'{text}' is not an unsigned integer")),
        }
    }
}

/// Decode a step's weight: absent or `"inherit"` inherits, otherwise the
/// packed form where 1 means an explicit zero.
pub fn weight_of(raw: Option<&Wide>) -> Result<Weight> {
    match raw {
        None => Ok(Weight::Inherit),
        Some(Wide::Text(text)) if text.trim().eq_ignore_ascii_case("inherit") => Ok(Weight::Inherit),
        Some(raw) => Ok(Weight::from_raw(raw.value()?)),
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct OracleSpec {
    /// Approval window in seconds.
    pub window: u64,
}

/// One store operation.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Op {
    Configure {
        #[serde(default = "zero")]
        duration: Wide,
        #[serde(default)]
        weight: Option<Wide>,
        #[serde(default)]
        discount_rate: u64,
        #[serde(default)]
        ballot: Option<String>,
        #[serde(default)]
        metadata: Option<Wide>,
        #[serde(default)]
        must_start_at_or_after: Option<TimeSpec>,
    },
    Current,
    Queued,
    Latest,
    Ballot,
    Get {
        configuration: TimeSpec,
    },
    /// Pin the outcome of a proposal on a named delay oracle.
    Finalize {
        oracle: String,
        configuration: TimeSpec,
        state: BallotState,
    },
}

fn zero() -> Wide {
    Wide::Int(0)
}

impl Op {
    pub fn name(&self) -> &'static str {
        match self {
            Op::Configure { .. } => "configure",
            Op::Current => "current",
            Op::Queued => "queued",
            Op::Latest => "latest",
            Op::Ballot => "ballot",
            Op::Get { .. } => "get",
            Op::Finalize { .. } => "finalize",
        }
    }

    /// Oracle name this operation refers to, if any.
    fn oracle(&self) -> Option<&str> {
        match self {
            Op::Configure { ballot, .. } => ballot.as_deref(),
            Op::Finalize { oracle, .. } => Some(oracle),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Step {
    pub at: TimeSpec,
    pub tenant: TenantId,
    #[serde(flatten)]
    pub op: Op,
}

/// Parsed scenario file.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Scenario {
    /// Field widths for this run. Falls back to the environment config.
    #[serde(default)]
    pub scheduler: Option<SchedulerConfig>,
    #[serde(default)]
    pub oracles: BTreeMap<String, OracleSpec>,
    #[serde(default)]
    pub steps: Vec<Step>,
}

impl Scenario {
    pub fn load(path: &Path) -> Result<Self> {
        debug!(path = %path.display(), "Loading scenario");
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read scenario: {}", path.display()))?;
        Self::from_toml_str(&content)
            .with_context(|| format!("failed to parse scenario: {}", path.display()))
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Validate everything that can be checked without running the steps:
    /// widths, timestamps, numeric fields, oracle references and step order.
    pub fn check(&self) -> Result<()> {
        if let Some(scheduler) = &self.scheduler {
            scheduler.validate().context("invalid [scheduler] section")?;
        }

        let mut previous: Timestamp = 0;
        for (index, step) in self.steps.iter().enumerate() {
            self.check_step(step, previous)
                .with_context(|| format!("step {} ({})", index + 1, step.op.name()))?;
            previous = step.at.resolve()?;
        }
        Ok(())
    }

    fn check_step(&self, step: &Step, previous: Timestamp) -> Result<()> {
        let at = step.at.resolve()?;
        if at < previous {
            bail!("time goes backwards: {at} is before {previous}");
        }
        if let Some(name) = step.op.oracle() {
            if !self.oracles.contains_key(name) {
                bail!("unknown oracle '{name}'");
            }
        }
        match &step.op {
            Op::Configure {
                duration,
                weight,
                metadata,
                must_start_at_or_after,
                ..
            } => {
                duration.value().context("duration")?;
                weight_of(weight.as_ref()).context("weight")?;
                metadata_of(metadata.as_ref()).context("metadata")?;
                if let Some(must) = must_start_at_or_after {
                    must.resolve().context("must_start_at_or_after")?;
                }
            }
            Op::Get { configuration } | Op::Finalize { configuration, .. } => {
                configuration.resolve().context("configuration")?;
            }
            Op::Current | Op::Queued | Op::Latest | Op::Ballot => {}
        }
        Ok(())
    }
}

pub fn metadata_of(raw: Option<&Wide>) -> Result<Metadata> {
    raw.map_or(Ok(0), Wide::value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timestamps_accept_seconds_and_rfc3339() {
        assert_eq!(TimeSpec::Seconds(42).resolve().unwrap(), 42);
        let t = TimeSpec::Rfc3339("2023-11-14T22:13:20Z".to_string());
        assert_eq!(t.resolve().unwrap(), 1_700_000_000);
        let offset = TimeSpec::Rfc3339("2023-11-15T00:13:20+02:00".to_string());
        assert_eq!(offset.resolve().unwrap(), 1_700_000_000);
        assert!(TimeSpec::Rfc3339("1969-12-31T23:59:59Z".to_string()).resolve().is_err());
        assert!(TimeSpec::Rfc3339("tomorrow".to_string()).resolve().is_err());
    }

    #[test]
    fn weights_decode_packed_form() {
        assert_eq!(weight_of(None).unwrap(), Weight::Inherit);
        assert_eq!(weight_of(Some(&Wide::Text("Inherit".into()))).unwrap(), Weight::Inherit);
        assert_eq!(weight_of(Some(&Wide::Int(0))).unwrap(), Weight::Inherit);
        assert_eq!(weight_of(Some(&Wide::Int(1))).unwrap(), Weight::Explicit(0));
        assert_eq!(
            weight_of(Some(&Wide::Text("1_000_000_000_000_000_000_000_000".into()))).unwrap(),
            Weight::Explicit(10u128.pow(24))
        );
        assert!(weight_of(Some(&Wide::Text("lots".into()))).is_err());
    }

    #[test]
    fn steps_parse_by_op_tag() {
        let scenario = Scenario::from_toml_str(
            r#"
            [oracles.buffer]
            window = 259200

            [[steps]]
            at = 1700000000
            tenant = 1
            op = "configure"
            duration = 604800
            weight = "1000000000000000000000000"
            ballot = "buffer"

            [[steps]]
            at = "2023-11-15T00:00:00Z"
            tenant = 1
            op = "queued"

            [[steps]]
            at = 1700100000
            tenant = 1
            op = "finalize"
            oracle = "buffer"
            configuration = 1700000000
            state = "failed"
            "#,
        )
        .unwrap();

        assert_eq!(scenario.oracles["buffer"].window, 259_200);
        assert_eq!(scenario.steps.len(), 3);
        match &scenario.steps[0].op {
            Op::Configure {
                duration,
                weight,
                ballot,
                discount_rate,
                ..
            } => {
                assert_eq!(duration.value().unwrap(), 604_800);
                assert_eq!(
                    weight_of(weight.as_ref()).unwrap(),
                    Weight::Explicit(10u128.pow(24))
                );
                assert_eq!(ballot.as_deref(), Some("buffer"));
                assert_eq!(*discount_rate, 0);
            }
            other => panic!("expected configure, got {other:?}"),
        }
        assert_eq!(scenario.steps[1].op, Op::Queued);
        assert_eq!(scenario.steps[2].op.name(), "finalize");
        scenario.check().unwrap();
    }

    #[test]
    fn check_rejects_unknown_oracle() {
        let scenario = Scenario::from_toml_str(
            r#"
            [[steps]]
            at = 10
            tenant = 1
            op = "configure"
            duration = 5
            ballot = "missing"
            "#,
        )
        .unwrap();
        let err = scenario.check().unwrap_err();
        assert!(format!("{err:#}").contains("unknown oracle 'missing'"));
    }

    #[test]
    fn check_rejects_time_going_backwards() {
        let scenario = Scenario::from_toml_str(
            r#"
            [[steps]]
            at = 100
            tenant = 1
            op = "current"

            [[steps]]
            at = 99
            tenant = 2
            op = "current"
            "#,
        )
        .unwrap();
        let err = format!("{:#}", scenario.check().unwrap_err());
        assert!(err.contains("step 2"), "{err}");
        assert!(err.contains("backwards"), "{err}");
    }

    #[test]
    fn check_rejects_bad_scheduler_widths() {
        let scenario = Scenario::from_toml_str(
            r#"
            [scheduler]
            duration_bits = 80
            weight_bits = 88
            "#,
        )
        .unwrap();
        assert!(scenario.check().is_err());
    }

    #[test]
    fn unknown_op_fails_to_parse() {
        let result = Scenario::from_toml_str(
            r#"
            [[steps]]
            at = 1
            tenant = 1
            op = "explode"
            "#,
        );
        assert!(result.is_err());
    }
}
