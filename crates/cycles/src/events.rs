//! Configuration events and in-memory event sinks.
//!
//! The store emits a [`CycleEvent::Configured`] and a
//! [`CycleEvent::Initialized`] for every accepted configuration. Events are
//! additive: nothing in the store reads them back.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, RwLock};

use cadence_core::{TenantId, Timestamp};
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::cycle::{Metadata, Weight};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum CycleEvent {
    /// A proposal was accepted, as submitted.
    Configured {
        configuration: Timestamp,
        tenant: TenantId,
        duration: u64,
        weight: Weight,
        discount_rate: u64,
        #[serde(skip_serializing_if = "Option::is_none")]
        ballot: Option<String>,
        metadata: Metadata,
        must_start_at_or_after: Timestamp,
    },
    /// A cycle record was created with the given base.
    Initialized {
        configuration: Timestamp,
        tenant: TenantId,
        based_on: Timestamp,
    },
}

impl CycleEvent {
    pub fn tenant(&self) -> TenantId {
        match self {
            CycleEvent::Configured { tenant, .. } | CycleEvent::Initialized { tenant, .. } => *tenant,
        }
    }

    pub fn configuration(&self) -> Timestamp {
        match self {
            CycleEvent::Configured { configuration, .. }
            | CycleEvent::Initialized { configuration, .. } => *configuration,
        }
    }
}

/// Receiver for store events.
pub trait EventSink: Send + Sync {
    fn emit(&self, event: CycleEvent);
}

/// Discards every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl EventSink for NullSink {
    fn emit(&self, _event: CycleEvent) {}
}

/// An event with the wall-clock time it was recorded.
#[derive(Debug, Clone, Serialize)]
pub struct LoggedEvent {
    pub recorded_at: DateTime<Utc>,
    #[serde(flatten)]
    pub event: CycleEvent,
}

/// In-memory per-tenant event log with FIFO eviction.
///
/// Cloning shares the underlying storage, so a clone handed to the store and
/// one kept by the caller observe the same events.
#[derive(Clone)]
pub struct EventLog {
    entries: Arc<RwLock<HashMap<TenantId, VecDeque<LoggedEvent>>>>,
    max_entries_per_tenant: usize,
}

impl EventLog {
    /// Create a log with the default cap of 500 events per tenant.
    pub fn new() -> Self {
        Self::with_max_entries(500)
    }

    pub fn with_max_entries(max: usize) -> Self {
        Self {
            entries: Arc::new(RwLock::new(HashMap::new())),
            max_entries_per_tenant: max,
        }
    }

    /// Events for one tenant, oldest first.
    pub fn events_for(&self, tenant: TenantId) -> Vec<LoggedEvent> {
        let guard = match self.entries.read() {
            Ok(g) => g,
            Err(poisoned) => poisoned.into_inner(),
        };
        guard
            .get(&tenant)
            .map(|d| d.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// All retained events ordered by tenant, then by arrival.
    pub fn all(&self) -> Vec<LoggedEvent> {
        let guard = match self.entries.read() {
            Ok(g) => g,
            Err(poisoned) => poisoned.into_inner(),
        };
        let mut tenants: Vec<&TenantId> = guard.keys().collect();
        tenants.sort();
        tenants
            .into_iter()
            .flat_map(|t| guard[t].iter().cloned())
            .collect()
    }

    pub fn len(&self) -> usize {
        let guard = match self.entries.read() {
            Ok(g) => g,
            Err(poisoned) => poisoned.into_inner(),
        };
        guard.values().map(VecDeque::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        let mut guard = match self.entries.write() {
            Ok(g) => g,
            Err(poisoned) => poisoned.into_inner(),
        };
        guard.clear();
    }
}

impl Default for EventLog {
    fn default() -> Self {
        Self::new()
    }
}

impl EventSink for EventLog {
    fn emit(&self, event: CycleEvent) {
        let entry = LoggedEvent {
            recorded_at: Utc::now(),
            event,
        };
        let mut guard = match self.entries.write() {
            Ok(g) => g,
            Err(poisoned) => poisoned.into_inner(),
        };
        let deque = guard.entry(entry.event.tenant()).or_default();
        deque.push_back(entry);
        while deque.len() > self.max_entries_per_tenant {
            deque.pop_front();
        }
    }
}
