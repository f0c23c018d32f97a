//! Array adapter: indexed access and sequence methods over a `yrs::ArrayRef`.
//!
//! The engine offers insert and remove-range only, so replacing an element is a removal
//! followed by an insertion. Composite operations (`splice`, `set_at`, multi-item
//! `push`/`unshift`) run inside one engine transaction so observers see a single change.

use std::fmt;
use std::rc::Rc;

use serde_json::Value as JsonValue;
use tracing::{debug, warn};
use yrs::types::ToJson;
use yrs::{Any, Array, ArrayRef, In, Out, ReadTxn, TransactionMut};

use super::{Binding, ProxyError, Wrapper, display_json};
use crate::{
    Result,
    normalize::{normalize, normalize_all},
    session::TrackingInfo,
    value::{Item, Node, Value, any_to_json},
};

const LENGTH_KEY: &str = "length";

/// Copies a container out of the document before it is deleted.
///
/// A deleted branch keeps its id but loses its contents, so it must not reach the
/// identity cache.
fn detach<T: ReadTxn>(out: Out, txn: &T) -> Out {
    match out {
        Out::Any(_) => out,
        other => Out::Any(other.to_json(txn)),
    }
}

/// A wrapper over an ordered container.
///
/// Clones share one identity; see [`MapProxy`](super::MapProxy).
#[derive(Clone)]
pub struct ArrayProxy(pub(crate) Rc<Binding<ArrayRef>>);

impl ArrayProxy {
    pub(crate) fn from_binding(binding: Rc<Binding<ArrayRef>>) -> Self {
        Self(binding)
    }

    /// The underlying engine container.
    pub fn array_ref(&self) -> &ArrayRef {
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

    pub fn len(&self) -> Result<u32> {
        let txn = self.0.read()?;
        Ok(self.0.node.len(&txn))
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    /// Reads the element at `index`; `None` past the end.
    pub fn at(&self, index: u32) -> Result<Option<Item>> {
        let out = {
            let txn = self.0.read()?;
            self.0.node.get(&txn, index)
        };
        Ok(out.map(|out| self.0.wrap(out)))
    }

    /// Replaces the element at `index`, or appends when `index` equals the length.
    ///
    /// # Errors
    ///
    /// [`ProxyError::IndexOutOfBounds`] when `index` is past the end; the engine has no
    /// holes to fill.
    pub fn set_at(&self, index: u32, value: impl Into<Value>) -> Result<()> {
        let prelim = normalize(value.into())?;
        let mut txn = self.0.write()?;
        let len = self.0.node.len(&txn);
        if index > len {
            warn!(index, len, "rejected write past the end of an array");
            return Err(ProxyError::IndexOutOfBounds { index, len }.into());
        }
        if index < len {
            self.0.node.remove_range(&mut txn, index, 1);
        }
        self.0.node.insert(&mut txn, index, prelim);
        Ok(())
    }

    /// Removes exactly one element at `index`.
    pub fn remove_at(&self, index: u32) -> Result<()> {
        let mut txn = self.0.write()?;
        let len = self.0.node.len(&txn);
        if index >= len {
            return Err(ProxyError::IndexOutOfBounds { index, len }.into());
        }
        self.0.node.remove_range(&mut txn, index, 1);
        Ok(())
    }

    /// Appends `items` and returns the new length.
    pub fn push<I, V>(&self, items: I) -> Result<u32>
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        let prelims = normalize_all(items)?;
        let mut txn = self.0.write()?;
        let len = self.0.node.len(&txn);
        self.insert_prelims(&mut txn, len, prelims);
        Ok(self.0.node.len(&txn))
    }

    /// Prepends `items` (keeping their order) and returns the new length.
    pub fn unshift<I, V>(&self, items: I) -> Result<u32>
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        let prelims = normalize_all(items)?;
        let mut txn = self.0.write()?;
        self.insert_prelims(&mut txn, 0, prelims);
        Ok(self.0.node.len(&txn))
    }

    /// Removes and returns the last element; `None` when empty.
    ///
    /// A removed container comes back as a plain value holding its last contents.
    pub fn pop(&self) -> Result<Option<Item>> {
        let removed = {
            let mut txn = self.0.write()?;
            let len = self.0.node.len(&txn);
            if len == 0 {
                return Ok(None);
            }
            let out = self.0.node.get(&txn, len - 1).map(|out| detach(out, &txn));
            self.0.node.remove_range(&mut txn, len - 1, 1);
            out
        };
        Ok(removed.map(|out| self.0.wrap(out)))
    }

    /// Removes and returns the first element; `None` when empty.
    ///
    /// A removed container comes back as a plain value, as with [`pop`](Self::pop).
    pub fn shift(&self) -> Result<Option<Item>> {
        let removed = {
            let mut txn = self.0.write()?;
            if self.0.node.len(&txn) == 0 {
                return Ok(None);
            }
            let out = self.0.node.get(&txn, 0).map(|out| detach(out, &txn));
            self.0.node.remove_range(&mut txn, 0, 1);
            out
        };
        Ok(removed.map(|out| self.0.wrap(out)))
    }

    /// Removes `delete_count` elements at `start`, inserts `items` there, and returns the
    /// removed elements. Both steps share one transaction. Removed containers come back
    /// as plain values.
    ///
    /// `start` and `delete_count` are clamped to the current length the way
    /// `Array.prototype.splice` clamps them.
    pub fn splice<I, V>(&self, start: u32, delete_count: u32, items: I) -> Result<Vec<Item>>
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        let prelims = normalize_all(items)?;
        let removed = {
            let mut txn = self.0.write()?;
            let len = self.0.node.len(&txn);
            let start = start.min(len);
            let count = delete_count.min(len - start);
            let removed: Vec<Out> = (start..start + count)
                .filter_map(|index| self.0.node.get(&txn, index))
                .map(|out| detach(out, &txn))
                .collect();
            if count > 0 {
                self.0.node.remove_range(&mut txn, start, count);
            }
            debug!(start, removed = count, inserted = prelims.len(), "array splice");
            self.insert_prelims(&mut txn, start, prelims);
            removed
        };
        Ok(removed.into_iter().map(|out| self.0.wrap(out)).collect())
    }

    /// Removes every element in one transaction.
    pub fn clear(&self) -> Result<()> {
        let mut txn = self.0.write()?;
        let len = self.0.node.len(&txn);
        if len > 0 {
            self.0.node.remove_range(&mut txn, 0, len);
        }
        Ok(())
    }

    /// Maps every element (wrapped) through `callback`.
    ///
    /// The elements are read in one pass before the callback runs, so the callback may
    /// freely write through the wrappers it receives.
    pub fn map<R, F>(&self, mut callback: F) -> Result<Vec<R>>
    where
        F: FnMut(Item, u32) -> R,
    {
        Ok(self
            .to_vec()?
            .into_iter()
            .zip(0..)
            .map(|(item, index)| callback(item, index))
            .collect())
    }

    /// Elements for which `predicate` holds.
    pub fn filter<F>(&self, mut predicate: F) -> Result<Vec<Item>>
    where
        F: FnMut(&Item, u32) -> bool,
    {
        Ok(self
            .to_vec()?
            .into_iter()
            .zip(0..)
            .filter(|(item, index)| predicate(item, *index))
            .map(|(item, _)| item)
            .collect())
    }

    /// First element for which `predicate` holds.
    pub fn find<F>(&self, mut predicate: F) -> Result<Option<Item>>
    where
        F: FnMut(&Item, u32) -> bool,
    {
        Ok(self
            .to_vec()?
            .into_iter()
            .zip(0..)
            .find(|(item, index)| predicate(item, *index))
            .map(|(item, _)| item))
    }

    /// Index of the first element at or after `from_index` that is `search`.
    ///
    /// Primitives compare by value; containers compare by identity, so searching for a
    /// wrapper finds the element holding that very container.
    pub fn index_of(&self, search: impl Into<Value>, from_index: u32) -> Result<Option<u32>> {
        let search = search.into();
        let txn = self.0.read()?;
        let len = self.0.node.len(&txn);
        Ok((from_index..len).find(|&index| {
            self.0
                .node
                .get(&txn, index)
                .is_some_and(|out| search.matches(&out))
        }))
    }

    pub fn contains(&self, search: impl Into<Value>) -> Result<bool> {
        Ok(self.index_of(search, 0)?.is_some())
    }

    /// All current elements, wrapped.
    pub fn to_vec(&self) -> Result<Vec<Item>> {
        let raw: Vec<Out> = {
            let txn = self.0.read()?;
            self.0.node.iter(&txn).collect()
        };
        Ok(raw.into_iter().map(|out| self.0.wrap(out)).collect())
    }

    /// A lazy iterator over the current contents.
    ///
    /// Each step reads one element in its own short transaction and wraps it, so the
    /// iterator observes edits made while iterating. Calling `iter` again restarts from
    /// the first element.
    pub fn iter(&self) -> Iter {
        Iter {
            array: self.clone(),
            index: 0,
            done: false,
        }
    }

    fn insert_prelims(&self, txn: &mut TransactionMut<'_>, start: u32, prelims: Vec<In>) {
        for (index, prelim) in (start..).zip(prelims) {
            self.0.node.insert(txn, index, prelim);
        }
    }

    fn index_key(operation: &str, key: &str) -> std::result::Result<u32, ProxyError> {
        if key == LENGTH_KEY {
            return Err(ProxyError::invalid_mutation(
                operation,
                "array length is read-only",
            ));
        }
        key.parse::<u32>().map_err(|_| {
            ProxyError::invalid_mutation(
                operation,
                format!("array keys must be integer indices, got {key:?}"),
            )
        })
    }
}

impl Wrapper for ArrayProxy {
    fn get(&self, key: &str) -> Result<Option<Item>> {
        if key == LENGTH_KEY {
            return Ok(Some(Item::Value(Any::Number(self.len()? as f64))));
        }
        match key.parse::<u32>() {
            Ok(index) => self.at(index),
            Err(_) => Ok(None),
        }
    }

    fn set(&self, key: &str, value: impl Into<Value>) -> Result<()> {
        let index = Self::index_key("set", key).inspect_err(|err| {
            warn!(key, error = %err, "rejected array write");
        })?;
        self.set_at(index, value)
    }

    fn delete(&self, key: &str) -> Result<()> {
        let index = Self::index_key("delete", key)?;
        self.remove_at(index)
    }

    fn keys(&self) -> Result<Vec<String>> {
        Ok((0..self.len()?).map(|index| index.to_string()).collect())
    }

    fn has(&self, key: &str) -> Result<bool> {
        match key.parse::<u32>() {
            Ok(index) => Ok(index < self.len()?),
            Err(_) => Ok(false),
        }
    }

    fn to_json(&self) -> Result<JsonValue> {
        let txn = self.0.read()?;
        Ok(any_to_json(&self.0.node.to_json(&txn)))
    }

    fn node(&self) -> Node {
        Node::Array(self.0.node.clone())
    }
}

impl<'a> IntoIterator for &'a ArrayProxy {
    type Item = Result<Item>;
    type IntoIter = Iter;

    fn into_iter(self) -> Iter {
        self.iter()
    }
}

/// Lazy iterator returned by [`ArrayProxy::iter`].
///
/// Yields `Err` once and stops if the engine refuses a read transaction.
pub struct Iter {
    array: ArrayProxy,
    index: u32,
    done: bool,
}

impl Iterator for Iter {
    type Item = Result<Item>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.array.at(self.index) {
            Ok(Some(item)) => {
                self.index += 1;
                Some(Ok(item))
            }
            Ok(None) => {
                self.done = true;
                None
            }
            Err(err) => {
                self.done = true;
                Some(Err(err))
            }
        }
    }
}

impl PartialEq for ArrayProxy {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl Eq for ArrayProxy {}

impl fmt::Debug for ArrayProxy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ArrayProxy").field(&self.0).finish()
    }
}

impl fmt::Display for ArrayProxy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        display_json(f, self.to_json())
    }
}
