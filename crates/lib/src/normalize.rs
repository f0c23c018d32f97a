//! Conversion of plain values into engine-native values.
//!
//! Plain arrays become ordered containers, plain objects become keyed containers, and
//! the conversion recurses to any depth. Primitives and values that are already
//! engine preliminaries pass through unchanged. Containers that already belong to a
//! document cannot be inserted again; the engine has no move primitive, so they are
//! rejected here with a cross-document error before any engine call is made.

use yrs::{Any, ArrayPrelim, In, MapPrelim};

use crate::{proxy::ProxyError, value::Value};

/// Converts `value` into an engine value ready for insertion.
///
/// # Errors
///
/// Returns [`ProxyError::CrossDocument`] if `value` (or anything nested inside it)
/// refers to a container already integrated into a document.
///
/// # Example
///
/// ```
/// use yproxy::{normalize, Value};
/// use yproxy::y_crdt::In;
///
/// let prelim = normalize(Value::from(vec![1, 2, 3])).unwrap();
/// assert!(matches!(prelim, In::Array(_)));
/// ```
pub fn normalize(value: Value) -> Result<In, ProxyError> {
    let normalized = match value {
        Value::Null => In::Any(Any::Null),
        Value::Bool(b) => In::Any(Any::Bool(b)),
        Value::Number(n) => In::Any(Any::Number(n)),
        Value::String(s) => In::Any(Any::String(s.into())),
        Value::Bytes(bytes) => In::Any(Any::Buffer(bytes.into())),
        Value::Array(items) => In::Array(
            items
                .into_iter()
                .map(normalize)
                .collect::<Result<ArrayPrelim, _>>()?,
        ),
        Value::Object(entries) => In::Map(
            entries
                .into_iter()
                .map(|(key, value)| Ok((key, normalize(value)?)))
                .collect::<Result<MapPrelim, ProxyError>>()?,
        ),
        Value::Prelim(prelim) => prelim,
        Value::Node(node) => {
            return Err(ProxyError::CrossDocument {
                reason: format!(
                    "{} {:?} is already integrated into a document",
                    node.kind(),
                    node.id()
                ),
            });
        }
    };
    Ok(normalized)
}

/// Normalizes every item, failing before anything is inserted if one item is rejected.
pub(crate) fn normalize_all<I, V>(items: I) -> Result<Vec<In>, ProxyError>
where
    I: IntoIterator<Item = V>,
    V: Into<Value>,
{
    items.into_iter().map(|item| normalize(item.into())).collect()
}
