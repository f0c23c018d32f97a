//! Identity cache: at most one live wrapper per engine container.
//!
//! Entries hold weak handles, so a wrapper the application dropped leaves a dead entry
//! behind. Dead entries are swept once enough insertions have accumulated.

use std::collections::HashMap;
use std::rc::{Rc, Weak};

use yrs::branch::BranchID;
use yrs::{ArrayRef, MapRef};

use crate::proxy::Binding;

/// Weak handle to the wrapper built for one container.
pub(crate) enum CachedWrapper {
    Map(Weak<Binding<MapRef>>),
    Array(Weak<Binding<ArrayRef>>),
}

impl CachedWrapper {
    fn is_live(&self) -> bool {
        match self {
            CachedWrapper::Map(weak) => weak.strong_count() > 0,
            CachedWrapper::Array(weak) => weak.strong_count() > 0,
        }
    }

    pub(crate) fn map(&self) -> Option<Rc<Binding<MapRef>>> {
        match self {
            CachedWrapper::Map(weak) => weak.upgrade(),
            _ => None,
        }
    }

    pub(crate) fn array(&self) -> Option<Rc<Binding<ArrayRef>>> {
        match self {
            CachedWrapper::Array(weak) => weak.upgrade(),
            _ => None,
        }
    }
}

pub(crate) struct IdentityCache {
    entries: HashMap<BranchID, CachedWrapper>,
    inserts_since_sweep: usize,
    sweep_threshold: usize,
}

impl IdentityCache {
    pub(crate) fn new(sweep_threshold: usize) -> Self {
        Self {
            entries: HashMap::new(),
            inserts_since_sweep: 0,
            sweep_threshold: sweep_threshold.max(1),
        }
    }

    pub(crate) fn get(&self, id: &BranchID) -> Option<&CachedWrapper> {
        self.entries.get(id)
    }

    /// Registers a freshly built wrapper, replacing any stale entry for the same container.
    ///
    /// Returns true when enough insertions accumulated that a sweep is due.
    pub(crate) fn insert(&mut self, id: BranchID, wrapper: CachedWrapper) -> bool {
        self.entries.insert(id, wrapper);
        self.inserts_since_sweep += 1;
        self.inserts_since_sweep >= self.sweep_threshold
    }

    pub(crate) fn remove(&mut self, id: &BranchID) -> bool {
        self.entries.remove(id).is_some()
    }

    /// Check if a live wrapper is cached for `id`.
    pub(crate) fn contains_live(&self, id: &BranchID) -> bool {
        self.entries.get(id).is_some_and(CachedWrapper::is_live)
    }

    /// Drops entries whose wrapper is gone. Returns the number removed.
    pub(crate) fn sweep(&mut self) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, wrapper| wrapper.is_live());
        self.inserts_since_sweep = 0;
        before - self.entries.len()
    }

    /// Number of live wrappers.
    pub(crate) fn live(&self) -> usize {
        self.entries.values().filter(|wrapper| wrapper.is_live()).count()
    }
}
