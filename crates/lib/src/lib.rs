//!
//! yproxy: plain get/set views over Y-CRDT documents.
//! This library lets application code read and mutate a `yrs` document tree through
//! ordinary keyed and indexed access while every write becomes an engine operation
//! and every engine change invalidates the affected views.
//!
//! ## Core Concepts
//!
//! * **Session (`session::Session`)**: Owns the identity cache, per-node tracking metadata and
//!   the tracking toggle for one `yrs::Doc`. All wrappers are created through a session.
//! * **Wrappers (`proxy::MapProxy`, `proxy::ArrayProxy`)**: Views over exactly one engine
//!   container. Two reads of the same unchanged container return the same wrapper
//!   (reference equality); a read after the container changed returns a fresh one.
//! * **Normalization (`normalize::normalize`)**: Plain nested values (`value::Value`) are turned
//!   into engine preliminaries before insertion, recursively.
//! * **Tracking**: With tracking enabled, each wrapped container carries one engine observer.
//!   A change revokes the container's wrapper and cascades up through its parents.
//! * **Reactive stores (`store::Store`)**: A subscribe/snapshot pair per container for render
//!   schedulers that compare snapshots by reference.
//!
//! ## Example
//!
//! ```
//! use yproxy::{Session, Wrapper, y_crdt::Doc};
//!
//! # fn main() -> yproxy::Result<()> {
//! let doc = Doc::new();
//! let root = doc.get_or_insert_map("root");
//! let session = Session::new(&doc)?;
//! let store = session.proxy(root, Some(true));
//!
//! store.set("user", serde_json::json!({ "name": "Ada", "tags": ["crdt"] }))?;
//! let user = store.get("user")?.and_then(|item| item.into_proxy()).unwrap();
//! assert_eq!(user.get("name")?.unwrap().as_str(), Some("Ada"));
//! assert_eq!(store.to_json()?["user"]["tags"][0], "crdt");
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod normalize;
pub mod proxy;
pub mod session;
pub mod store;
pub mod value;

pub use config::SessionConfig;
pub use normalize::normalize;
pub use proxy::{ArrayProxy, MapProxy, Proxy, ProxyError, Wrapper};
pub use session::{Session, TrackingInfo};
pub use store::{Store, Subscription};
pub use value::{Item, Node, Value, any_to_json};

/// Y-CRDT types re-exported for convenience.
///
/// This module re-exports the `yrs` crate so that client code doesn't need to add
/// `yrs` as a separate dependency to build documents and issue external edits.
pub mod y_crdt {
    pub use yrs::*;
}

/// Result type used throughout the library.
pub type Result<T> = std::result::Result<T, Error>;

/// Common error type for the library.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Serialization error: {0}")]
    Serialize(#[from] serde_json::Error),

    /// Structured wrapper errors from the proxy module
    #[error(transparent)]
    Proxy(proxy::ProxyError),
}

impl Error {
    /// Get the originating module for this error.
    pub fn module(&self) -> &'static str {
        match self {
            Error::Proxy(_) => "proxy",
            Error::Serialize(_) => "serialize",
        }
    }

    /// Check if this error rejected an invalid mutation.
    pub fn is_invalid_mutation(&self) -> bool {
        match self {
            Error::Proxy(proxy_err) => proxy_err.is_invalid_mutation(),
            _ => false,
        }
    }

    /// Check if this error is type-related.
    pub fn is_type_error(&self) -> bool {
        match self {
            Error::Proxy(proxy_err) => proxy_err.is_type_error(),
            _ => false,
        }
    }

    /// Check if this error came from inserting a container owned by a document.
    pub fn is_cross_document(&self) -> bool {
        match self {
            Error::Proxy(proxy_err) => proxy_err.is_cross_document(),
            _ => false,
        }
    }

    /// Check if the engine could not open a transaction.
    pub fn is_transaction_error(&self) -> bool {
        match self {
            Error::Proxy(proxy_err) => proxy_err.is_transaction_error(),
            _ => false,
        }
    }

    /// Check if a session could not register its document hook.
    pub fn is_hook_error(&self) -> bool {
        match self {
            Error::Proxy(proxy_err) => proxy_err.is_hook_error(),
            _ => false,
        }
    }

    /// Check if this error is a serialization failure.
    pub fn is_serialization_error(&self) -> bool {
        matches!(self, Error::Serialize(_))
    }
}
