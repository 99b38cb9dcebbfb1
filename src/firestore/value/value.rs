use std::collections::BTreeMap;

use chrono::{DateTime, Utc};

use crate::firestore::model::{GeoPoint, ResourcePath, Timestamp, VectorValue};
use crate::firestore::value::{ArrayValue, BytesValue, MapValue};

/// A dynamically typed document value.
///
/// Every shape an application can store in a document has a variant here,
/// including `Undefined` (a field that was never assigned) and the write-only
/// sentinels.
#[derive(Clone, Debug, PartialEq)]
pub struct FirestoreValue {
    kind: ValueKind,
}

/// Server-side transforms applied while a write is committed.
#[derive(Clone, Debug, PartialEq)]
pub enum SentinelValue {
    Delete,
    ServerTimestamp,
    ArrayUnion(Vec<FirestoreValue>),
    ArrayRemove(Vec<FirestoreValue>),
    NumericIncrement(Box<FirestoreValue>),
}

#[derive(Clone, Debug, PartialEq)]
pub enum ValueKind {
    Undefined,
    Null,
    Boolean(bool),
    Integer(i64),
    Double(f64),
    Timestamp(Timestamp),
    String(String),
    Bytes(BytesValue),
    Reference(ResourcePath),
    GeoPoint(GeoPoint),
    Array(ArrayValue),
    Map(MapValue),
    Vector(VectorValue),
    Sentinel(SentinelValue),
    /// Placeholder for the document identifier, usable as a query value.
    DocumentId,
    /// Payload of a wire tag this crate does not know, kept as received.
    Unknown(serde_json::Value),
}

impl FirestoreValue {
    pub fn from_kind(kind: ValueKind) -> Self {
        Self { kind }
    }

    pub fn undefined() -> Self {
        Self {
            kind: ValueKind::Undefined,
        }
    }

    pub fn null() -> Self {
        Self {
            kind: ValueKind::Null,
        }
    }

    pub fn from_bool(value: bool) -> Self {
        Self {
            kind: ValueKind::Boolean(value),
        }
    }

    pub fn from_integer(value: i64) -> Self {
        Self {
            kind: ValueKind::Integer(value),
        }
    }

    pub fn from_double(value: f64) -> Self {
        Self {
            kind: ValueKind::Double(value),
        }
    }

    pub fn from_timestamp(value: Timestamp) -> Self {
        Self {
            kind: ValueKind::Timestamp(value),
        }
    }

    pub fn from_string(value: impl Into<String>) -> Self {
        Self {
            kind: ValueKind::String(value.into()),
        }
    }

    pub fn from_bytes(value: BytesValue) -> Self {
        Self {
            kind: ValueKind::Bytes(value),
        }
    }

    pub fn from_reference(path: ResourcePath) -> Self {
        Self {
            kind: ValueKind::Reference(path),
        }
    }

    pub fn from_geo_point(value: GeoPoint) -> Self {
        Self {
            kind: ValueKind::GeoPoint(value),
        }
    }

    pub fn from_array(values: Vec<FirestoreValue>) -> Self {
        Self {
            kind: ValueKind::Array(ArrayValue::new(values)),
        }
    }

    pub fn from_map(map: BTreeMap<String, FirestoreValue>) -> Self {
        Self {
            kind: ValueKind::Map(MapValue::new(map)),
        }
    }

    pub fn from_vector(values: Vec<f64>) -> Self {
        Self {
            kind: ValueKind::Vector(VectorValue::new(values)),
        }
    }

    pub fn document_id() -> Self {
        Self {
            kind: ValueKind::DocumentId,
        }
    }

    /// Returns a sentinel that removes the field it is written to.
    pub fn delete_field() -> Self {
        Self {
            kind: ValueKind::Sentinel(SentinelValue::Delete),
        }
    }

    /// Returns a sentinel that instructs Firestore to populate the field with the server timestamp.
    pub fn server_timestamp() -> Self {
        Self {
            kind: ValueKind::Sentinel(SentinelValue::ServerTimestamp),
        }
    }

    /// Returns a sentinel that unions the provided elements with an existing array field.
    pub fn array_union(elements: Vec<FirestoreValue>) -> Self {
        Self {
            kind: ValueKind::Sentinel(SentinelValue::ArrayUnion(elements)),
        }
    }

    /// Returns a sentinel that removes the provided elements from an existing array field.
    pub fn array_remove(elements: Vec<FirestoreValue>) -> Self {
        Self {
            kind: ValueKind::Sentinel(SentinelValue::ArrayRemove(elements)),
        }
    }

    /// Returns a sentinel that increments the targeted numeric field by `operand`.
    ///
    /// The operand must be an integer or double; anything else is rejected
    /// when the write is encoded.
    pub fn numeric_increment(operand: FirestoreValue) -> Self {
        Self {
            kind: ValueKind::Sentinel(SentinelValue::NumericIncrement(Box::new(operand))),
        }
    }

    pub fn kind(&self) -> &ValueKind {
        &self.kind
    }

    pub fn into_kind(self) -> ValueKind {
        self.kind
    }

    pub fn is_undefined(&self) -> bool {
        matches!(self.kind, ValueKind::Undefined)
    }

    pub fn is_null(&self) -> bool {
        matches!(self.kind, ValueKind::Null)
    }

    pub fn as_str(&self) -> Option<&str> {
        match &self.kind {
            ValueKind::String(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self.kind {
            ValueKind::Boolean(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self.kind {
            ValueKind::Integer(value) => Some(value),
            _ => None,
        }
    }

    /// Numeric view over both integers and doubles.
    pub fn as_f64(&self) -> Option<f64> {
        match self.kind {
            ValueKind::Integer(value) => Some(value as f64),
            ValueKind::Double(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[FirestoreValue]> {
        match &self.kind {
            ValueKind::Array(array) => Some(array.values()),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&BTreeMap<String, FirestoreValue>> {
        match &self.kind {
            ValueKind::Map(map) => Some(map.fields()),
            _ => None,
        }
    }
}

impl From<ValueKind> for FirestoreValue {
    fn from(kind: ValueKind) -> Self {
        Self::from_kind(kind)
    }
}

impl From<bool> for FirestoreValue {
    fn from(value: bool) -> Self {
        Self::from_bool(value)
    }
}

impl From<i64> for FirestoreValue {
    fn from(value: i64) -> Self {
        Self::from_integer(value)
    }
}

impl From<i32> for FirestoreValue {
    fn from(value: i32) -> Self {
        Self::from_integer(i64::from(value))
    }
}

impl From<u32> for FirestoreValue {
    fn from(value: u32) -> Self {
        Self::from_integer(i64::from(value))
    }
}

impl From<f64> for FirestoreValue {
    fn from(value: f64) -> Self {
        Self::from_double(value)
    }
}

impl From<&str> for FirestoreValue {
    fn from(value: &str) -> Self {
        Self::from_string(value)
    }
}

impl From<String> for FirestoreValue {
    fn from(value: String) -> Self {
        Self::from_string(value)
    }
}

impl From<Timestamp> for FirestoreValue {
    fn from(value: Timestamp) -> Self {
        Self::from_timestamp(value)
    }
}

impl From<DateTime<Utc>> for FirestoreValue {
    fn from(value: DateTime<Utc>) -> Self {
        Self::from_timestamp(Timestamp::from(value))
    }
}

impl From<GeoPoint> for FirestoreValue {
    fn from(value: GeoPoint) -> Self {
        Self::from_geo_point(value)
    }
}

impl From<BytesValue> for FirestoreValue {
    fn from(value: BytesValue) -> Self {
        Self::from_bytes(value)
    }
}

impl From<VectorValue> for FirestoreValue {
    fn from(value: VectorValue) -> Self {
        Self {
            kind: ValueKind::Vector(value),
        }
    }
}

impl<T> From<Option<T>> for FirestoreValue
where
    T: Into<FirestoreValue>,
{
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or_else(Self::null)
    }
}

impl<T> From<Vec<T>> for FirestoreValue
where
    T: Into<FirestoreValue>,
{
    fn from(values: Vec<T>) -> Self {
        Self::from_array(values.into_iter().map(Into::into).collect())
    }
}

impl From<BTreeMap<String, FirestoreValue>> for FirestoreValue {
    fn from(value: BTreeMap<String, FirestoreValue>) -> Self {
        Self::from_map(value)
    }
}
