//! Wrappers over engine containers.
//!
//! A wrapper exposes one keyed or ordered container through the [`Wrapper`] capability
//! set (`get`, `set`, `delete`, `keys`, `has`) plus JSON materialization. Reads pass
//! nested containers through the session's identity cache, so repeated reads of an
//! unchanged container return the same wrapper instance; writes normalize plain values
//! into engine containers and go straight to the engine.
//!
//! Rust has no dynamic member interception, so property access is spelled out as
//! method calls: `store.get("todos")` instead of `store.todos`.

use std::cell::Cell;
use std::fmt;

use serde_json::Value as JsonValue;
use yrs::branch::BranchID;
use yrs::{Out, Transact, Transaction, TransactionMut};

use crate::{
    Result,
    session::{Session, TrackingInfo},
    value::{Item, Node, Value},
};

mod array;
mod errors;
mod map;

pub use array::{ArrayProxy, Iter};
pub use errors::ProxyError;
pub use map::MapProxy;

/// The capability set shared by every wrapper.
///
/// Keys are strings for both container kinds. Ordered containers accept decimal indices
/// and the read-only `"length"` key; any other key is rejected on write.
pub trait Wrapper: fmt::Display {
    /// Reads `key`, wrapping nested containers. `None` means the key is absent.
    fn get(&self, key: &str) -> Result<Option<Item>>;

    /// Normalizes `value` and writes it under `key`.
    fn set(&self, key: &str, value: impl Into<Value>) -> Result<()>;

    /// Removes `key`.
    fn delete(&self, key: &str) -> Result<()>;

    /// The live key set at call time.
    fn keys(&self) -> Result<Vec<String>>;

    /// Check if `key` is present at call time.
    fn has(&self, key: &str) -> Result<bool>;

    /// Fully materialized JSON snapshot of the wrapped subtree.
    fn to_json(&self) -> Result<JsonValue>;

    /// The wrapped engine container.
    fn node(&self) -> Node;

    /// JSON snapshot rendered as a compact string.
    fn to_json_string(&self) -> Result<String> {
        Ok(serde_json::to_string(&self.to_json()?)?)
    }
}

/// State shared by all clones of one wrapper.
pub(crate) struct Binding<N> {
    pub(crate) node: N,
    pub(crate) id: BranchID,
    pub(crate) session: Session,
    /// Explicit tracking flag inherited by nested wrappers; `None` follows the session toggle.
    pub(crate) tracking: Cell<Option<bool>>,
    pub(crate) generation: u64,
}

impl<N> Binding<N> {
    pub(crate) fn read(&self) -> Result<Transaction<'_>> {
        self.session
            .doc()
            .try_transact()
            .map_err(|err| ProxyError::Transaction {
                reason: err.to_string(),
            })
            .map_err(Into::into)
    }

    pub(crate) fn write(&self) -> Result<TransactionMut<'_>> {
        self.session
            .doc()
            .try_transact_mut()
            .map_err(|err| ProxyError::Transaction {
                reason: err.to_string(),
            })
            .map_err(Into::into)
    }

    /// Passes a value read from this container through the identity cache.
    pub(crate) fn wrap(&self, out: Out) -> Item {
        self.session.wrap_child(out, self.tracking.get(), &self.id)
    }

    pub(crate) fn tracking_info(&self) -> Option<TrackingInfo> {
        self.session.tracking_info_for(&self.id)
    }
}

impl<N> fmt::Debug for Binding<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Binding")
            .field("id", &self.id)
            .field("tracking", &self.tracking)
            .field("generation", &self.generation)
            .finish()
    }
}

/// A wrapper of either container kind.
#[derive(Debug, Clone, PartialEq)]
pub enum Proxy {
    Map(MapProxy),
    Array(ArrayProxy),
}

impl Proxy {
    pub fn as_map(&self) -> Option<&MapProxy> {
        match self {
            Proxy::Map(proxy) => Some(proxy),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&ArrayProxy> {
        match self {
            Proxy::Array(proxy) => Some(proxy),
            _ => None,
        }
    }

    /// Check if both handles refer to the same wrapper instance.
    pub fn ptr_eq(&self, other: &Proxy) -> bool {
        self == other
    }

    /// Tracking metadata of the wrapped container, if the session still holds it.
    pub fn tracking_info(&self) -> Option<TrackingInfo> {
        match self {
            Proxy::Map(proxy) => proxy.tracking_info(),
            Proxy::Array(proxy) => proxy.tracking_info(),
        }
    }
}

impl From<MapProxy> for Proxy {
    fn from(proxy: MapProxy) -> Self {
        Proxy::Map(proxy)
    }
}

impl From<ArrayProxy> for Proxy {
    fn from(proxy: ArrayProxy) -> Self {
        Proxy::Array(proxy)
    }
}

impl Wrapper for Proxy {
    fn get(&self, key: &str) -> Result<Option<Item>> {
        match self {
            Proxy::Map(proxy) => proxy.get(key),
            Proxy::Array(proxy) => proxy.get(key),
        }
    }

    fn set(&self, key: &str, value: impl Into<Value>) -> Result<()> {
        match self {
            Proxy::Map(proxy) => proxy.set(key, value),
            Proxy::Array(proxy) => proxy.set(key, value),
        }
    }

    fn delete(&self, key: &str) -> Result<()> {
        match self {
            Proxy::Map(proxy) => proxy.delete(key),
            Proxy::Array(proxy) => proxy.delete(key),
        }
    }

    fn keys(&self) -> Result<Vec<String>> {
        match self {
            Proxy::Map(proxy) => proxy.keys(),
            Proxy::Array(proxy) => proxy.keys(),
        }
    }

    fn has(&self, key: &str) -> Result<bool> {
        match self {
            Proxy::Map(proxy) => proxy.has(key),
            Proxy::Array(proxy) => proxy.has(key),
        }
    }

    fn to_json(&self) -> Result<JsonValue> {
        match self {
            Proxy::Map(proxy) => proxy.to_json(),
            Proxy::Array(proxy) => proxy.to_json(),
        }
    }

    fn node(&self) -> Node {
        match self {
            Proxy::Map(proxy) => proxy.node(),
            Proxy::Array(proxy) => proxy.node(),
        }
    }
}

impl fmt::Display for Proxy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Proxy::Map(proxy) => fmt::Display::fmt(proxy, f),
            Proxy::Array(proxy) => fmt::Display::fmt(proxy, f),
        }
    }
}

/// Renders a JSON snapshot for `Display`, surfacing engine errors as `fmt::Error`.
pub(crate) fn display_json(
    f: &mut fmt::Formatter<'_>,
    json: Result<JsonValue>,
) -> fmt::Result {
    match json {
        Ok(json) => write!(f, "{json}"),
        Err(err) => {
            tracing::warn!(error = %err, "could not render wrapper");
            Err(fmt::Error)
        }
    }
}
