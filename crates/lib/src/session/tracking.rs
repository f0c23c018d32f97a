//! Per-container tracking metadata and the revocation cascade.
//!
//! Metadata is created on the first wrap of a container and reused afterwards: a
//! rewrap after revocation bumps the generation and clears the revoked flag while the
//! listener set survives. Parent links are plain ids; a link whose metadata is gone
//! ends the cascade.
//!
//! Engine observers only record work here. The revoked nodes of one transaction are
//! queued in `pending` and handed out by [`TrackingTable::drain`] once the transaction
//! has committed, so every node notifies its listeners at most once per transaction.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::rc::Rc;

use yrs::Subscription;
use yrs::branch::BranchID;

use super::cache::IdentityCache;

/// A subscriber callback registered through a [`Store`](crate::Store).
pub(crate) type Listener = Rc<dyn Fn()>;

/// Read-only view of the tracking metadata of one container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackingInfo {
    /// Whether an engine observer is currently attached.
    pub observing: bool,
    /// Whether the last wrapper built for the container has been revoked.
    pub revoked: bool,
    /// Number of wrappers built for the container so far.
    pub generation: u64,
    /// Number of registered listeners.
    pub listeners: usize,
    /// Container the wrapper was last reached through, if any.
    pub parent: Option<BranchID>,
}

#[derive(Default)]
struct NodeMeta {
    observer: Option<Subscription>,
    listeners: BTreeMap<u64, Listener>,
    revoked: bool,
    generation: u64,
    parent: Option<BranchID>,
    /// Notification pass that last visited this node.
    visited: Option<u64>,
}

impl NodeMeta {
    fn is_idle(&self) -> bool {
        self.observer.is_none() && self.listeners.is_empty()
    }
}

#[derive(Default)]
pub(crate) struct TrackingTable {
    nodes: HashMap<BranchID, NodeMeta>,
    pass: u64,
    next_listener: u64,
    pending: Vec<BranchID>,
    retired: Vec<Subscription>,
}

impl TrackingTable {
    /// Prepares metadata for a freshly built wrapper and returns its generation.
    pub(crate) fn activate(&mut self, id: &BranchID, parent: Option<BranchID>) -> u64 {
        let meta = self.nodes.entry(id.clone()).or_default();
        meta.generation += 1;
        meta.revoked = false;
        if parent.is_some() {
            meta.parent = parent;
        }
        meta.generation
    }

    pub(crate) fn is_observing(&self, id: &BranchID) -> bool {
        self.nodes
            .get(id)
            .is_some_and(|meta| meta.observer.is_some())
    }

    pub(crate) fn attach(&mut self, id: &BranchID, observer: Subscription) {
        self.nodes.entry(id.clone()).or_default().observer = Some(observer);
    }

    /// Revokes `origin` and every ancestor reachable through parent links.
    ///
    /// The origin's observer is retired; ancestors keep theirs since their own contents
    /// did not change. Returns the number of wrappers evicted from `cache`.
    pub(crate) fn revoke(&mut self, origin: &BranchID, cache: &mut IdentityCache) -> usize {
        if let Some(observer) = self
            .nodes
            .get_mut(origin)
            .and_then(|meta| meta.observer.take())
        {
            self.retired.push(observer);
        }

        let mut evicted = 0;
        let mut next = Some(origin.clone());
        while let Some(id) = next.take() {
            let Some(meta) = self.nodes.get_mut(&id) else {
                break;
            };
            if meta.visited == Some(self.pass) {
                break;
            }
            meta.visited = Some(self.pass);
            if !meta.revoked {
                meta.revoked = true;
                if cache.remove(&id) {
                    evicted += 1;
                }
            }
            next = meta.parent.clone();
            self.pending.push(id);
        }
        evicted
    }

    /// Ends the current notification pass.
    ///
    /// Returns the listeners of every node revoked during the pass and the observers
    /// retired by it. Both must be used after the session state is released.
    pub(crate) fn drain(&mut self) -> (Vec<Listener>, Vec<Subscription>) {
        let pending = std::mem::take(&mut self.pending);
        let listeners = pending
            .iter()
            .filter_map(|id| self.nodes.get(id))
            .flat_map(|meta| meta.listeners.values().cloned())
            .collect();
        self.pass += 1;
        (listeners, std::mem::take(&mut self.retired))
    }

    pub(crate) fn add_listener(&mut self, id: &BranchID, listener: Listener) -> u64 {
        let key = self.next_listener;
        self.next_listener += 1;
        self.nodes
            .entry(id.clone())
            .or_default()
            .listeners
            .insert(key, listener);
        key
    }

    pub(crate) fn remove_listener(&mut self, id: &BranchID, key: u64) -> bool {
        self.nodes
            .get_mut(id)
            .is_some_and(|meta| meta.listeners.remove(&key).is_some())
    }

    /// Drops metadata nobody needs anymore: no observer, no listeners, no live wrapper,
    /// and not an ancestor of metadata that is kept. Returns the number of entries removed.
    pub(crate) fn prune(&mut self, cache: &IdentityCache) -> usize {
        let mut keep: HashSet<BranchID> = self
            .nodes
            .iter()
            .filter(|(id, meta)| !meta.is_idle() || cache.contains_live(id))
            .map(|(id, _)| id.clone())
            .collect();

        let roots: Vec<BranchID> = keep.iter().cloned().collect();
        for id in roots {
            let mut parent = self.nodes.get(&id).and_then(|meta| meta.parent.clone());
            while let Some(id) = parent {
                if !self.nodes.contains_key(&id) || !keep.insert(id.clone()) {
                    break;
                }
                parent = self.nodes.get(&id).and_then(|meta| meta.parent.clone());
            }
        }

        let before = self.nodes.len();
        self.nodes.retain(|id, _| keep.contains(id));
        before - self.nodes.len()
    }

    pub(crate) fn info(&self, id: &BranchID) -> Option<TrackingInfo> {
        self.nodes.get(id).map(|meta| TrackingInfo {
            observing: meta.observer.is_some(),
            revoked: meta.revoked,
            generation: meta.generation,
            listeners: meta.listeners.len(),
            parent: meta.parent.clone(),
        })
    }
}
