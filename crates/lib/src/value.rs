//! Value types crossing the wrapper boundary.
//!
//! - [`Value`] is what application code writes. Plain nested values are normalized into
//!   engine containers before insertion.
//! - [`Item`] is what reads return: primitives pass through as [`yrs::Any`], nested
//!   containers come back wrapped.
//! - [`Node`] names an engine container that can be wrapped.

use std::collections::{BTreeMap, HashMap};

use serde_json::Value as JsonValue;
use yrs::branch::{Branch, BranchID};
use yrs::{Any, ArrayPrelim, ArrayRef, In, MapPrelim, MapRef, Out};

use crate::{
    Result,
    proxy::{ArrayProxy, MapProxy, Proxy, ProxyError, Wrapper},
};

/// Largest integer an `f64` represents exactly.
const MAX_SAFE_INTEGER: f64 = 9_007_199_254_740_991.0;

/// Returns the engine identity of a container.
pub(crate) fn node_id<N: AsRef<Branch>>(node: &N) -> BranchID {
    node.as_ref().id()
}

/// Short description of an engine output, used in type-mismatch errors.
pub(crate) fn kind_of(out: &Out) -> &'static str {
    match out {
        Out::Any(_) => "primitive",
        Out::YMap(_) => "map",
        Out::YArray(_) => "array",
        Out::YText(_) => "text",
        _ => "engine type",
    }
}

/// An engine container that can be wrapped.
#[derive(Debug, Clone)]
pub enum Node {
    /// Keyed container
    Map(MapRef),
    /// Ordered container
    Array(ArrayRef),
}

impl Node {
    /// Engine identity of this container. Stable across mutation of its contents.
    pub fn id(&self) -> BranchID {
        match self {
            Node::Map(map) => node_id(map),
            Node::Array(array) => node_id(array),
        }
    }

    /// Returns "map" or "array".
    pub fn kind(&self) -> &'static str {
        match self {
            Node::Map(_) => "map",
            Node::Array(_) => "array",
        }
    }

    pub fn as_map(&self) -> Option<&MapRef> {
        match self {
            Node::Map(map) => Some(map),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&ArrayRef> {
        match self {
            Node::Array(array) => Some(array),
            _ => None,
        }
    }
}

impl From<MapRef> for Node {
    fn from(map: MapRef) -> Self {
        Node::Map(map)
    }
}

impl From<ArrayRef> for Node {
    fn from(array: ArrayRef) -> Self {
        Node::Array(array)
    }
}

impl TryFrom<Out> for Node {
    type Error = ProxyError;

    fn try_from(out: Out) -> std::result::Result<Self, Self::Error> {
        match out {
            Out::YMap(map) => Ok(Node::Map(map)),
            Out::YArray(array) => Ok(Node::Array(array)),
            other => Err(ProxyError::TypeMismatch {
                expected: "map or array".to_string(),
                actual: kind_of(&other).to_string(),
            }),
        }
    }
}

/// A value written through a wrapper.
///
/// Plain variants (`Array`, `Object` and the primitives) are converted by
/// [`normalize`](crate::normalize()) into engine values. `Prelim` carries an engine-native
/// value that is not yet part of any document and is inserted as is. `Node` refers to a
/// container that already belongs to a document; inserting it is rejected.
#[derive(Debug, Clone)]
pub enum Value {
    Null,
    Bool(bool),
    Number(f64),
    String(String),
    Bytes(Vec<u8>),
    Array(Vec<Value>),
    Object(HashMap<String, Value>),
    Node(Node),
    Prelim(In),
}

impl Value {
    /// Check if this value is a nested plain structure.
    pub fn is_plain_container(&self) -> bool {
        matches!(self, Value::Array(_) | Value::Object(_))
    }

    /// Check whether a stored engine value is the same thing as this search value.
    ///
    /// Primitives compare by value, containers by node identity. Plain nested values
    /// never match anything stored, as a freshly built structure is never the same
    /// object as an existing one.
    pub(crate) fn matches(&self, out: &Out) -> bool {
        match (self, out) {
            (Value::Node(Node::Map(wanted)), Out::YMap(map)) => node_id(wanted) == node_id(map),
            (Value::Node(Node::Array(wanted)), Out::YArray(array)) => {
                node_id(wanted) == node_id(array)
            }
            (Value::Null, Out::Any(Any::Null)) => true,
            (Value::Bool(wanted), Out::Any(Any::Bool(b))) => wanted == b,
            (Value::Number(wanted), Out::Any(Any::Number(n))) => wanted == n,
            (Value::Number(wanted), Out::Any(Any::BigInt(i))) => *wanted == *i as f64,
            (Value::String(wanted), Out::Any(Any::String(s))) => wanted.as_str() == &**s,
            (Value::Bytes(wanted), Out::Any(Any::Buffer(b))) => wanted.as_slice() == &**b,
            _ => false,
        }
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Number(value)
    }
}

impl From<f32> for Value {
    fn from(value: f32) -> Self {
        Value::Number(value as f64)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Value::Number(value as f64)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Number(value as f64)
    }
}

impl From<u32> for Value {
    fn from(value: u32) -> Self {
        Value::Number(value as f64)
    }
}

impl From<u64> for Value {
    fn from(value: u64) -> Self {
        Value::Number(value as f64)
    }
}

impl From<usize> for Value {
    fn from(value: usize) -> Self {
        Value::Number(value as f64)
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::String(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::String(value.to_string())
    }
}

impl From<&String> for Value {
    fn from(value: &String) -> Self {
        Value::String(value.clone())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Value::Null, Into::into)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(items: Vec<T>) -> Self {
        Value::Array(items.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<Value>> From<HashMap<String, T>> for Value {
    fn from(entries: HashMap<String, T>) -> Self {
        Value::Object(entries.into_iter().map(|(k, v)| (k, v.into())).collect())
    }
}

impl<T: Into<Value>> From<BTreeMap<String, T>> for Value {
    fn from(entries: BTreeMap<String, T>) -> Self {
        Value::Object(entries.into_iter().map(|(k, v)| (k, v.into())).collect())
    }
}

impl From<JsonValue> for Value {
    fn from(json: JsonValue) -> Self {
        match json {
            JsonValue::Null => Value::Null,
            JsonValue::Bool(b) => Value::Bool(b),
            JsonValue::Number(n) => Value::Number(n.as_f64().unwrap_or_default()),
            JsonValue::String(s) => Value::String(s),
            JsonValue::Array(items) => Value::Array(items.into_iter().map(Value::from).collect()),
            JsonValue::Object(entries) => {
                Value::Object(entries.into_iter().map(|(k, v)| (k, v.into())).collect())
            }
        }
    }
}

impl From<Any> for Value {
    fn from(any: Any) -> Self {
        match any {
            Any::Null | Any::Undefined => Value::Null,
            Any::Bool(b) => Value::Bool(b),
            Any::Number(n) => Value::Number(n),
            Any::BigInt(i) => Value::Number(i as f64),
            Any::String(s) => Value::String(s.to_string()),
            Any::Buffer(b) => Value::Bytes(b.to_vec()),
            Any::Array(items) => Value::Array(items.iter().cloned().map(Value::from).collect()),
            Any::Map(entries) => Value::Object(
                entries
                    .iter()
                    .map(|(k, v)| (k.to_string(), Value::from(v.clone())))
                    .collect(),
            ),
        }
    }
}

impl From<In> for Value {
    fn from(prelim: In) -> Self {
        Value::Prelim(prelim)
    }
}

impl From<MapPrelim> for Value {
    fn from(prelim: MapPrelim) -> Self {
        Value::Prelim(In::Map(prelim))
    }
}

impl From<ArrayPrelim> for Value {
    fn from(prelim: ArrayPrelim) -> Self {
        Value::Prelim(In::Array(prelim))
    }
}

impl From<Node> for Value {
    fn from(node: Node) -> Self {
        Value::Node(node)
    }
}

impl From<MapRef> for Value {
    fn from(map: MapRef) -> Self {
        Value::Node(Node::Map(map))
    }
}

impl From<ArrayRef> for Value {
    fn from(array: ArrayRef) -> Self {
        Value::Node(Node::Array(array))
    }
}

impl From<&MapProxy> for Value {
    fn from(proxy: &MapProxy) -> Self {
        Value::Node(Node::Map(proxy.map_ref().clone()))
    }
}

impl From<&ArrayProxy> for Value {
    fn from(proxy: &ArrayProxy) -> Self {
        Value::Node(Node::Array(proxy.array_ref().clone()))
    }
}

impl From<&Proxy> for Value {
    fn from(proxy: &Proxy) -> Self {
        Value::Node(proxy.node())
    }
}

impl From<&Item> for Value {
    fn from(item: &Item) -> Self {
        match item {
            Item::Value(any) => Value::from(any.clone()),
            Item::Map(proxy) => proxy.into(),
            Item::Array(proxy) => proxy.into(),
            Item::Native(_) => Value::Null,
        }
    }
}

/// A value read through a wrapper.
///
/// Equality compares primitives by value and wrappers by identity, so two `Item`s
/// holding wrappers are equal only when they hold the very same wrapper instance.
#[derive(Debug, Clone)]
pub enum Item {
    /// A primitive stored in the document
    Value(Any),
    /// A wrapped keyed container
    Map(MapProxy),
    /// A wrapped ordered container
    Array(ArrayProxy),
    /// Any other engine type (text, XML, sub-documents), passed through unwrapped
    Native(Out),
}

impl Item {
    pub fn as_any(&self) -> Option<&Any> {
        match self {
            Item::Value(any) => Some(any),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Item::Value(Any::String(s)) => Some(&**s),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Item::Value(Any::Number(n)) => Some(*n),
            Item::Value(Any::BigInt(i)) => Some(*i as f64),
            _ => None,
        }
    }

    /// Returns the number as an integer when it has no fractional part.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Item::Value(Any::Number(n)) if n.fract() == 0.0 && n.abs() <= MAX_SAFE_INTEGER => {
                Some(*n as i64)
            }
            Item::Value(Any::BigInt(i)) => Some(*i),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Item::Value(Any::Bool(b)) => Some(*b),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Item::Value(Any::Null | Any::Undefined))
    }

    pub fn as_map(&self) -> Option<&MapProxy> {
        match self {
            Item::Map(proxy) => Some(proxy),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&ArrayProxy> {
        match self {
            Item::Array(proxy) => Some(proxy),
            _ => None,
        }
    }

    /// Converts a wrapped container into a [`Proxy`]; primitives yield `None`.
    pub fn into_proxy(self) -> Option<Proxy> {
        match self {
            Item::Map(proxy) => Some(Proxy::Map(proxy)),
            Item::Array(proxy) => Some(Proxy::Array(proxy)),
            _ => None,
        }
    }

    /// Materializes this item as JSON.
    ///
    /// Engine types other than maps and arrays have no JSON form here and yield `null`.
    pub fn to_json(&self) -> Result<JsonValue> {
        match self {
            Item::Value(any) => Ok(any_to_json(any)),
            Item::Map(proxy) => proxy.to_json(),
            Item::Array(proxy) => proxy.to_json(),
            Item::Native(_) => Ok(JsonValue::Null),
        }
    }
}

impl PartialEq for Item {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Item::Value(a), Item::Value(b)) => a == b,
            (Item::Map(a), Item::Map(b)) => a == b,
            (Item::Array(a), Item::Array(b)) => a == b,
            _ => false,
        }
    }
}

/// Converts an engine primitive into JSON.
///
/// Integral numbers within the exactly-representable range become JSON integers so that
/// `10.0` stored by one peer reads back as `10`, matching how JavaScript peers print it.
pub fn any_to_json(any: &Any) -> JsonValue {
    match any {
        Any::Null | Any::Undefined => JsonValue::Null,
        Any::Bool(b) => JsonValue::Bool(*b),
        Any::Number(n) => number_to_json(*n),
        Any::BigInt(i) => JsonValue::from(*i),
        Any::String(s) => JsonValue::String(s.to_string()),
        Any::Buffer(bytes) => JsonValue::Array(bytes.iter().map(|b| JsonValue::from(*b)).collect()),
        Any::Array(items) => JsonValue::Array(items.iter().map(any_to_json).collect()),
        Any::Map(entries) => JsonValue::Object(
            entries
                .iter()
                .map(|(k, v)| (k.to_string(), any_to_json(v)))
                .collect(),
        ),
    }
}

fn number_to_json(n: f64) -> JsonValue {
    if n.fract() == 0.0 && n.abs() <= MAX_SAFE_INTEGER {
        JsonValue::from(n as i64)
    } else {
        // NaN and infinities have no JSON form
        serde_json::Number::from_f64(n)
            .map(JsonValue::Number)
            .unwrap_or(JsonValue::Null)
    }
}
