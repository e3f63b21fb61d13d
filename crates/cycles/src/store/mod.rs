//! Per-tenant cycle history and resolution.
//!
//! The [`CycleStore`] owns every tenant's append-only history. Writes go
//! through [`configure`](CycleStore::configure); every read is a pure function
//! of the stored history, the supplied `now` and the answers of the governance
//! oracles involved. Rollover is computed in closed form, so resolving a
//! tenant that has not been touched for years costs the same as one
//! configured a moment ago.

mod core;
mod history;


use std::sync::{Arc, RwLock};

pub use self::core::CycleStore;

/// Thread-safe handle to a store shared between callers.
pub type SharedCycleStore = Arc<RwLock<CycleStore>>;

/// Wrap a store for sharing.
pub fn new_shared_store(store: CycleStore) -> SharedCycleStore {
    Arc::new(RwLock::new(store))
}
