//! Map adapter: keyed access over a `yrs::MapRef`.

use std::fmt;
use std::rc::Rc;

use serde_json::Value as JsonValue;
use tracing::trace;
use yrs::types::ToJson;
use yrs::{Map, MapRef, Out};

use super::{Binding, Wrapper, display_json};
use crate::{
    Result,
    normalize::normalize,
    session::TrackingInfo,
    value::{Item, Node, Value, any_to_json},
};

/// A wrapper over a keyed container.
///
/// Clones share one identity: `a == b` holds only for handles to the same wrapper
/// instance, which is what a render layer compares to decide whether a subtree changed.
/// Every write goes through the engine; the adapter never invalidates its own cache
/// entry, the engine's change notification does.
#[derive(Clone)]
pub struct MapProxy(pub(crate) Rc<Binding<MapRef>>);

impl MapProxy {
    pub(crate) fn from_binding(binding: Rc<Binding<MapRef>>) -> Self {
        Self(binding)
    }

    /// The underlying engine container.
    pub fn map_ref(&self) -> &MapRef {
        &self.0.node
    }

    /// Wrapper generation: incremented each time a fresh wrapper is built for this container.
    pub fn generation(&self) -> u64 {
        self.0.generation
    }

    /// Tracking metadata of the wrapped container.
    pub fn tracking_info(&self) -> Option<TrackingInfo> {
        self.0.tracking_info()
    }

    /// Number of keys at call time.
    pub fn len(&self) -> Result<u32> {
        let txn = self.0.read()?;
        Ok(self.0.node.len(&txn))
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    /// All live entries, nested containers wrapped.
    pub fn entries(&self) -> Result<Vec<(String, Item)>> {
        let raw: Vec<(String, Out)> = {
            let txn = self.0.read()?;
            self.0
                .node
                .iter(&txn)
                .map(|(key, out)| (key.to_string(), out))
                .collect()
        };
        Ok(raw
            .into_iter()
            .map(|(key, out)| (key, self.0.wrap(out)))
            .collect())
    }

    /// Writes several keys in one engine transaction, producing a single change notification.
    pub fn update<I, K, V>(&self, entries: I) -> Result<()>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        let prelims = entries
            .into_iter()
            .map(|(key, value)| Ok((Into::<String>::into(key), normalize(value.into())?)))
            .collect::<Result<Vec<_>>>()?;
        if prelims.is_empty() {
            return Ok(());
        }
        let mut txn = self.0.write()?;
        for (key, prelim) in prelims {
            self.0.node.insert(&mut txn, key, prelim);
        }
        Ok(())
    }

    /// Removes every key in one engine transaction.
    pub fn clear(&self) -> Result<()> {
        let mut txn = self.0.write()?;
        self.0.node.clear(&mut txn);
        Ok(())
    }
}

impl Wrapper for MapProxy {
    fn get(&self, key: &str) -> Result<Option<Item>> {
        let out = {
            let txn = self.0.read()?;
            self.0.node.get(&txn, key)
        };
        trace!(key, present = out.is_some(), "map read");
        Ok(out.map(|out| self.0.wrap(out)))
    }

    fn set(&self, key: &str, value: impl Into<Value>) -> Result<()> {
        let prelim = normalize(value.into())?;
        let mut txn = self.0.write()?;
        self.0.node.insert(&mut txn, key, prelim);
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<()> {
        let mut txn = self.0.write()?;
        self.0.node.remove(&mut txn, key);
        Ok(())
    }

    fn keys(&self) -> Result<Vec<String>> {
        let txn = self.0.read()?;
        Ok(self.0.node.keys(&txn).map(|key| key.to_string()).collect())
    }

    fn has(&self, key: &str) -> Result<bool> {
        let txn = self.0.read()?;
        Ok(self.0.node.contains_key(&txn, key))
    }

    fn to_json(&self) -> Result<JsonValue> {
        let txn = self.0.read()?;
        Ok(any_to_json(&self.0.node.to_json(&txn)))
    }

    fn node(&self) -> Node {
        Node::Map(self.0.node.clone())
    }
}

impl PartialEq for MapProxy {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl Eq for MapProxy {}

impl fmt::Debug for MapProxy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("MapProxy").field(&self.0).finish()
    }
}

impl fmt::Display for MapProxy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        display_json(f, self.to_json())
    }
}
