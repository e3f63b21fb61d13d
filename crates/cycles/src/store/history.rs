//! Arena of one tenant's cycles.

use cadence_core::Timestamp;

use crate::cycle::Cycle;

/// Cycles in insertion order, with each record's base stored as an arena
/// index so chain walks never search.
#[derive(Debug, Default)]
pub(crate) struct TenantHistory {
    cycles: Vec<Cycle>,
    parents: Vec<Option<usize>>,
}

impl TenantHistory {
    pub(crate) fn latest_index(&self) -> Option<usize> {
        self.cycles.len().checked_sub(1)
    }

    pub(crate) fn latest(&self) -> Option<&Cycle> {
        self.cycles.last()
    }

    pub(crate) fn cycle(&self, idx: usize) -> &Cycle {
        &self.cycles[idx]
    }

    pub(crate) fn parent(&self, idx: usize) -> Option<usize> {
        self.parents[idx]
    }

    /// Configurations strictly increase, so lookup is a binary search.
    pub(crate) fn find(&self, configuration: Timestamp) -> Option<&Cycle> {
        self.cycles
            .binary_search_by_key(&configuration, |c| c.configuration)
            .ok()
            .map(|idx| &self.cycles[idx])
    }

    pub(crate) fn push(&mut self, cycle: Cycle, parent: Option<usize>) {
        debug_assert!(self.latest().map_or(true, |l| l.configuration < cycle.configuration));
        debug_assert!(parent.map_or(true, |p| p < self.cycles.len()));
        self.cycles.push(cycle);
        self.parents.push(parent);
    }

    pub(crate) fn cycles(&self) -> &[Cycle] {
        &self.cycles
    }

    pub(crate) fn len(&self) -> usize {
        self.cycles.len()
    }
}
