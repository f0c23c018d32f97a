//! Sessions: identity cache, tracking metadata and notification delivery for one document.
//!
//! A [`Session`] is a cheap handle; clones share state. Wrappers keep their session
//! alive, while the session refers to wrappers only weakly and engine callbacks refer to
//! the session only weakly, so dropping every handle tears everything down, including
//! the engine observers.
//!
//! Change notification works in two phases. Engine observers fire while a transaction
//! commits; they revoke the changed container and its ancestors and queue the affected
//! nodes. A document-level transaction-cleanup hook, emitted after the type observers,
//! then drains the queue and invokes the listeners once per affected node, with no
//! session state borrowed.

use std::cell::{OnceCell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

use tracing::{debug, trace, warn};
use yrs::branch::{Branch, BranchID};
use yrs::{ArrayRef, Doc, MapRef, Observable, Out, Subscription};

use crate::{
    Result,
    config::SessionConfig,
    proxy::{ArrayProxy, Binding, MapProxy, Proxy, ProxyError},
    store::Store,
    value::{Item, Node, node_id},
};

mod cache;
mod tracking;

use cache::{CachedWrapper, IdentityCache};
pub use tracking::TrackingInfo;
use tracking::{Listener, TrackingTable};

struct State {
    tracking: bool,
    cache: IdentityCache,
    table: TrackingTable,
}

pub(crate) struct SessionInner {
    doc: Doc,
    state: RefCell<State>,
    hook: OnceCell<Subscription>,
}

/// Entry point for wrapping the containers of one document.
///
/// # Example
///
/// ```
/// use yproxy::{Session, Wrapper, y_crdt::Doc};
///
/// # fn main() -> yproxy::Result<()> {
/// let doc = Doc::new();
/// let session = Session::new(&doc)?;
/// let root = session.proxy(doc.get_or_insert_map("root"), None);
/// root.set("count", 1)?;
/// assert!(root.ptr_eq(&session.proxy(doc.get_or_insert_map("root"), None)));
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct Session(Rc<SessionInner>);

impl Session {
    /// Creates a session with the default configuration.
    pub fn new(doc: &Doc) -> Result<Self> {
        Self::with_config(doc, SessionConfig::default())
    }

    /// Creates a session and registers its transaction-cleanup hook on `doc`.
    ///
    /// # Errors
    ///
    /// [`ProxyError::Hook`] if the document refuses the hook registration.
    pub fn with_config(doc: &Doc, config: SessionConfig) -> Result<Self> {
        let inner = Rc::new(SessionInner {
            doc: doc.clone(),
            state: RefCell::new(State {
                tracking: config.tracking,
                cache: IdentityCache::new(config.sweep_threshold),
                table: TrackingTable::default(),
            }),
            hook: OnceCell::new(),
        });

        let weak = Rc::downgrade(&inner);
        let hook = doc
            .observe_transaction_cleanup(move |_txn, _event| {
                if let Some(inner) = weak.upgrade() {
                    Session(inner).flush();
                }
            })
            .map_err(|err| ProxyError::Hook {
                reason: format!("{err:?}"),
            })?;
        let _ = inner.hook.set(hook);

        debug!(tracking = config.tracking, "session created");
        Ok(Session(inner))
    }

    /// The document this session wraps.
    pub fn doc(&self) -> &Doc {
        &self.0.doc
    }

    /// Sets the session-wide tracking toggle.
    ///
    /// Only wrappers built afterwards are affected; observers already attached stay.
    pub fn set_tracking(&self, tracking: bool) {
        self.0.state.borrow_mut().tracking = tracking;
    }

    pub fn tracking(&self) -> bool {
        self.0.state.borrow().tracking
    }

    /// Wraps a root container.
    ///
    /// `tracking` overrides the session toggle for this wrapper and every wrapper reached
    /// through it. Repeated calls for an unchanged container return the same wrapper.
    pub fn proxy(&self, node: impl Into<Node>, tracking: Option<bool>) -> Proxy {
        match node.into() {
            Node::Map(map) => Proxy::Map(MapProxy::from_binding(self.bind(map, tracking, None))),
            Node::Array(array) => {
                Proxy::Array(ArrayProxy::from_binding(self.bind(array, tracking, None)))
            }
        }
    }

    /// Wraps an engine value that must be a container.
    ///
    /// # Errors
    ///
    /// [`ProxyError::TypeMismatch`] for primitives and other engine types.
    pub fn proxy_out(&self, out: Out, tracking: Option<bool>) -> Result<Proxy> {
        let node = Node::try_from(out)?;
        Ok(self.proxy(node, tracking))
    }

    /// Passes any engine value through the identity cache.
    ///
    /// Containers come back wrapped; everything else is returned unchanged.
    pub fn wrap(&self, out: Out, tracking: Option<bool>) -> Item {
        self.wrap_with_parent(out, tracking, None)
    }

    pub(crate) fn wrap_child(&self, out: Out, tracking: Option<bool>, parent: &BranchID) -> Item {
        self.wrap_with_parent(out, tracking, Some(parent))
    }

    fn wrap_with_parent(
        &self,
        out: Out,
        tracking: Option<bool>,
        parent: Option<&BranchID>,
    ) -> Item {
        match out {
            Out::Any(any) => Item::Value(any),
            Out::YMap(map) => Item::Map(MapProxy::from_binding(self.bind(
                map,
                tracking,
                parent.cloned(),
            ))),
            Out::YArray(array) => Item::Array(ArrayProxy::from_binding(self.bind(
                array,
                tracking,
                parent.cloned(),
            ))),
            other => Item::Native(other),
        }
    }

    /// A reactive store rooted at `node`.
    pub fn store(&self, node: impl Into<Node>) -> Store {
        Store::new(self.clone(), node.into())
    }

    /// Delivers pending change notifications.
    ///
    /// Runs automatically after every committed transaction; calling it with nothing
    /// pending does nothing. Listeners run after the session state is released.
    pub fn flush(&self) {
        let (listeners, retired) = match self.0.state.try_borrow_mut() {
            Ok(mut state) => state.table.drain(),
            Err(_) => {
                warn!("session state busy, notifications deferred");
                return;
            }
        };
        if listeners.is_empty() && retired.is_empty() {
            return;
        }
        debug!(observers = retired.len(), "detaching observers");
        drop(retired);
        debug!(listeners = listeners.len(), "flushing change notifications");
        for listener in listeners {
            listener();
        }
    }

    /// Tracking metadata of `node`, if it has ever been wrapped and not yet pruned.
    pub fn tracking_info(&self, node: impl Into<Node>) -> Option<TrackingInfo> {
        self.tracking_info_for(&node.into().id())
    }

    pub(crate) fn tracking_info_for(&self, id: &BranchID) -> Option<TrackingInfo> {
        self.0.state.borrow().table.info(id)
    }

    /// Number of live wrappers in the identity cache.
    pub fn cached_wrappers(&self) -> usize {
        self.0.state.borrow().cache.live()
    }

    pub(crate) fn add_listener(&self, id: &BranchID, listener: Listener) -> Result<u64> {
        let mut state = self
            .0
            .state
            .try_borrow_mut()
            .map_err(|_| ProxyError::Transaction {
                reason: "session state is busy".to_string(),
            })?;
        Ok(state.table.add_listener(id, listener))
    }

    pub(crate) fn remove_listener(&self, id: &BranchID, key: u64) -> Result<bool> {
        let mut state = self
            .0
            .state
            .try_borrow_mut()
            .map_err(|_| ProxyError::Transaction {
                reason: "session state is busy".to_string(),
            })?;
        Ok(state.table.remove_listener(id, key))
    }

    pub(crate) fn downgrade(&self) -> Weak<SessionInner> {
        Rc::downgrade(&self.0)
    }

    pub(crate) fn upgrade(weak: &Weak<SessionInner>) -> Option<Session> {
        weak.upgrade().map(Session)
    }

    /// Returns the cached wrapper of `node` or builds a new one.
    fn bind<N: Bindable>(
        &self,
        node: N,
        tracking: Option<bool>,
        parent: Option<BranchID>,
    ) -> Rc<Binding<N>> {
        let id = node_id(&node);
        let mut state = self.0.state.borrow_mut();

        if let Some(binding) = state.cache.get(&id).and_then(N::lookup) {
            trace!(?id, "identity cache hit");
            if tracking == Some(true) {
                binding.tracking.set(Some(true));
            }
            let observe = binding.tracking.get().unwrap_or(state.tracking);
            if observe && !state.table.is_observing(&id) {
                state.table.attach(&id, self.observe(&node, id.clone()));
            }
            return binding;
        }

        let generation = state.table.activate(&id, parent);
        trace!(?id, generation, "identity cache miss, building wrapper");
        if tracking.unwrap_or(state.tracking) && !state.table.is_observing(&id) {
            state.table.attach(&id, self.observe(&node, id.clone()));
        }
        let binding = Rc::new(Binding {
            node,
            id: id.clone(),
            session: self.clone(),
            tracking: tracking.into(),
            generation,
        });

        let state = &mut *state;
        if state.cache.insert(id, N::cache(&binding)) {
            let swept = state.cache.sweep();
            let pruned = state.table.prune(&state.cache);
            debug!(swept, pruned, "swept identity cache");
        }
        binding
    }

    fn observe<N: Bindable>(&self, node: &N, id: BranchID) -> Subscription {
        debug!(?id, "attaching observer");
        let weak = Rc::downgrade(&self.0);
        node.on_change(move || {
            if let Some(inner) = weak.upgrade() {
                Session(inner).revoke(&id);
            }
        })
    }

    /// Observer body: runs inside the engine's commit.
    fn revoke(&self, id: &BranchID) {
        match self.0.state.try_borrow_mut() {
            Ok(mut state) => {
                let state = &mut *state;
                let evicted = state.table.revoke(id, &mut state.cache);
                debug!(?id, evicted, "container changed, revoked wrappers");
            }
            Err(_) => warn!(?id, "session state busy, change not tracked"),
        }
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut debug = f.debug_struct("Session");
        if let Ok(state) = self.0.state.try_borrow() {
            debug
                .field("tracking", &state.tracking)
                .field("cached_wrappers", &state.cache.live());
        }
        debug.finish_non_exhaustive()
    }
}

/// Engine containers the session knows how to wrap.
pub(crate) trait Bindable: AsRef<Branch> + Clone + Sized + 'static {
    fn lookup(entry: &CachedWrapper) -> Option<Rc<Binding<Self>>>;

    fn cache(binding: &Rc<Binding<Self>>) -> CachedWrapper;

    fn on_change(&self, callback: impl Fn() + 'static) -> Subscription;
}

impl Bindable for MapRef {
    fn lookup(entry: &CachedWrapper) -> Option<Rc<Binding<Self>>> {
        entry.map()
    }

    fn cache(binding: &Rc<Binding<Self>>) -> CachedWrapper {
        CachedWrapper::Map(Rc::downgrade(binding))
    }

    fn on_change(&self, callback: impl Fn() + 'static) -> Subscription {
        self.observe(move |_txn, _event| callback())
    }
}

impl Bindable for ArrayRef {
    fn lookup(entry: &CachedWrapper) -> Option<Rc<Binding<Self>>> {
        entry.array()
    }

    fn cache(binding: &Rc<Binding<Self>>) -> CachedWrapper {
        CachedWrapper::Array(Rc::downgrade(binding))
    }

    fn on_change(&self, callback: impl Fn() + 'static) -> Subscription {
        self.observe(move |_txn, _event| callback())
    }
}
