//! Reactive store binding: a subscribe/snapshot pair per container.
//!
//! Rendering schedulers (React's `useSyncExternalStore` and similar) need two things:
//! a way to be told that something changed, and a snapshot whose identity changes
//! exactly when the data behind it did. A [`Store`] provides both for one container
//! and everything below it.

use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

use tracing::{debug, warn};
use yrs::branch::BranchID;

use crate::{
    Result,
    proxy::Proxy,
    session::{Session, SessionInner},
    value::Node,
};

/// Subscribe/snapshot binding for one container.
///
/// The store always tracks its root: snapshots are built with tracking enabled, so
/// every wrapper reached through a snapshot observes its container too.
///
/// # Example
///
/// ```
/// use std::{cell::Cell, rc::Rc};
/// use yproxy::{Session, Wrapper, y_crdt::Doc};
///
/// # fn main() -> yproxy::Result<()> {
/// let doc = Doc::new();
/// let session = Session::new(&doc)?;
/// let store = session.store(doc.get_or_insert_map("root"));
///
/// let renders = Rc::new(Cell::new(0));
/// let counter = renders.clone();
/// let _subscription = store.subscribe(move || counter.set(counter.get() + 1))?;
///
/// let before = store.snapshot();
/// before.set("title", "hello")?;
/// assert_eq!(renders.get(), 1);
/// assert!(!store.snapshot().ptr_eq(&before));
/// # Ok(())
/// # }
/// ```
pub struct Store {
    session: Session,
    node: Node,
    current: RefCell<Option<Proxy>>,
}

impl Store {
    pub(crate) fn new(session: Session, node: Node) -> Self {
        Self {
            session,
            node,
            current: RefCell::new(None),
        }
    }

    /// The current wrapper for the root container.
    ///
    /// Successive calls return the same wrapper until the container or one of its
    /// descendants changes.
    pub fn snapshot(&self) -> Proxy {
        let proxy = self.session.proxy(self.node.clone(), Some(true));
        if let Ok(mut current) = self.current.try_borrow_mut() {
            *current = Some(proxy.clone());
        }
        proxy
    }

    /// Registers `on_change` to run once per committed transaction that changed the
    /// root container or anything below it.
    ///
    /// The callback runs while the engine is still finishing the transaction. It may
    /// take a new [`snapshot`](Self::snapshot), but reading through wrappers fails
    /// with a transaction error until the engine is done.
    pub fn subscribe<F>(&self, on_change: F) -> Result<Subscription>
    where
        F: Fn() + 'static,
    {
        self.snapshot();
        let node = self.node.id();
        let key = self.session.add_listener(&node, Rc::new(on_change))?;
        debug!(?node, key, "store subscribed");
        Ok(Subscription {
            session: self.session.downgrade(),
            node,
            key,
            active: true,
        })
    }

    /// The root container.
    pub fn node(&self) -> &Node {
        &self.node
    }

    pub fn session(&self) -> &Session {
        &self.session
    }
}

impl fmt::Debug for Store {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Store")
            .field("node", &self.node.id())
            .finish_non_exhaustive()
    }
}

/// A registered store listener. Dropping it unsubscribes.
#[must_use = "dropping a Subscription unsubscribes immediately"]
pub struct Subscription {
    session: Weak<SessionInner>,
    node: BranchID,
    key: u64,
    active: bool,
}

impl Subscription {
    /// Removes the listener now.
    pub fn unsubscribe(mut self) {
        self.release();
    }

    fn release(&mut self) {
        if !std::mem::take(&mut self.active) {
            return;
        }
        let Some(session) = Session::upgrade(&self.session) else {
            return;
        };
        match session.remove_listener(&self.node, self.key) {
            Ok(_) => debug!(node = ?self.node, key = self.key, "store unsubscribed"),
            Err(err) => warn!(node = ?self.node, error = %err, "could not release subscription"),
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.release();
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("node", &self.node)
            .field("key", &self.key)
            .field("active", &self.active)
            .finish()
    }
}
