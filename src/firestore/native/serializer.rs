use std::collections::BTreeMap;

use serde_json::Number;

use crate::firestore::error::{invalid_argument, FirestoreResult};
use crate::firestore::model::{GeoPoint, ResourcePath, Timestamp, VectorValue};
use crate::firestore::native::type_map::{TypeTag, WireFieldValue, WireValue};
use crate::firestore::value::{BytesValue, FirestoreValue, MapValue, SentinelValue, ValueKind};

/// Largest integer magnitude a double represents exactly (2^53 - 1).
///
/// Only `Integer` values inside this range get the `integer` tag. A `Double`
/// always keeps the `double` tag, even when it is integral (`3.0`), so the
/// Rust-side number type decides the tag rather than the value.
pub const MAX_SAFE_INTEGER: i64 = 9_007_199_254_740_991;

const UNDEFINED_MESSAGE: &str = "Unsupported field value: undefined";

/// Converts between [`FirestoreValue`] and the tagged [`WireValue`] form.
///
/// `ignore_undefined` controls what happens to `Undefined` entries found in
/// maps and arrays: rejected when `false`, silently dropped when `true`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct NativeSerializer {
    ignore_undefined: bool,
}

impl NativeSerializer {
    pub fn new(ignore_undefined: bool) -> Self {
        Self { ignore_undefined }
    }

    /// Serializer that drops undefined entries.
    pub fn lenient() -> Self {
        Self::new(true)
    }

    pub fn ignore_undefined(&self) -> bool {
        self.ignore_undefined
    }

    pub fn encode_value(&self, value: &FirestoreValue) -> FirestoreResult<WireValue> {
        let encoded = match value.kind() {
            ValueKind::Double(number) if number.is_nan() => WireValue::Nan,
            ValueKind::Double(number) if *number == f64::NEG_INFINITY => WireValue::NegativeInfinity,
            ValueKind::Double(number) if *number == f64::INFINITY => WireValue::PositiveInfinity,
            ValueKind::Null | ValueKind::Undefined => WireValue::Null,
            ValueKind::DocumentId => WireValue::DocumentId,
            ValueKind::Boolean(true) => WireValue::BooleanTrue,
            ValueKind::Boolean(false) => WireValue::BooleanFalse,
            ValueKind::Double(number) if *number == 0.0 && number.is_sign_negative() => {
                WireValue::NegativeZero
            }
            ValueKind::Double(number) => WireValue::Double(*number),
            ValueKind::Integer(number) if (-MAX_SAFE_INTEGER..=MAX_SAFE_INTEGER).contains(number) => {
                WireValue::Integer(*number)
            }
            ValueKind::Integer(number) => WireValue::Double(*number as f64),
            ValueKind::String(text) if text.is_empty() => WireValue::StringEmpty,
            ValueKind::String(text) => WireValue::String(text.clone()),
            ValueKind::Array(array) => WireValue::Array(self.encode_array(array.values())?),
            ValueKind::Reference(path) => WireValue::Reference(path.relative_name()),
            ValueKind::GeoPoint(point) => WireValue::GeoPoint(point.latitude(), point.longitude()),
            ValueKind::Timestamp(timestamp) => {
                WireValue::Timestamp(timestamp.seconds, timestamp.nanos)
            }
            ValueKind::Bytes(bytes) => WireValue::Blob(bytes.to_base64()),
            ValueKind::Sentinel(sentinel) => WireValue::FieldValue(self.encode_sentinel(sentinel)?),
            ValueKind::Vector(vector) => WireValue::Vector(vector.to_array().to_vec()),
            ValueKind::Map(map) => WireValue::Object(self.encode_map(map.fields())?),
            ValueKind::Unknown(raw) => {
                log::warn!("Unknown data type received {raw}");
                WireValue::Unknown {
                    tag: i64::from(TypeTag::Unknown.as_i32()),
                    payload: raw.clone(),
                }
            }
        };
        Ok(encoded)
    }

    pub fn encode_map(
        &self,
        fields: &BTreeMap<String, FirestoreValue>,
    ) -> FirestoreResult<BTreeMap<String, WireValue>> {
        let mut encoded = BTreeMap::new();
        for (key, value) in fields {
            if value.is_undefined() {
                if !self.ignore_undefined {
                    return Err(invalid_argument(UNDEFINED_MESSAGE));
                }
                continue;
            }
            encoded.insert(key.clone(), self.encode_value(value)?);
        }
        Ok(encoded)
    }

    pub fn encode_array(&self, values: &[FirestoreValue]) -> FirestoreResult<Vec<WireValue>> {
        let mut encoded = Vec::with_capacity(values.len());
        for value in values {
            if value.is_undefined() {
                if !self.ignore_undefined {
                    return Err(invalid_argument(UNDEFINED_MESSAGE));
                }
                continue;
            }
            encoded.push(self.encode_value(value)?);
        }
        Ok(encoded)
    }

    fn encode_sentinel(&self, sentinel: &SentinelValue) -> FirestoreResult<WireFieldValue> {
        let encoded = match sentinel {
            SentinelValue::Delete => WireFieldValue::Delete,
            SentinelValue::ServerTimestamp => WireFieldValue::ServerTimestamp,
            SentinelValue::ArrayUnion(elements) => {
                WireFieldValue::ArrayUnion(self.encode_array(elements)?)
            }
            SentinelValue::ArrayRemove(elements) => {
                WireFieldValue::ArrayRemove(self.encode_array(elements)?)
            }
            SentinelValue::NumericIncrement(operand) => {
                let number = match operand.kind() {
                    ValueKind::Integer(value) => Some(Number::from(*value)),
                    ValueKind::Double(value) => Number::from_f64(*value),
                    _ => None,
                };
                let number = number.ok_or_else(|| {
                    invalid_argument(
                        "firebase.firestore.FieldValue.increment() 'n' expected a finite number value.",
                    )
                })?;
                WireFieldValue::Increment(number)
            }
        };
        Ok(encoded)
    }

    /// Rebuilds an application value from its tagged form.
    pub fn decode_value(&self, value: WireValue) -> FirestoreResult<FirestoreValue> {
        let kind = match value {
            WireValue::Nan => ValueKind::Double(f64::NAN),
            WireValue::NegativeInfinity => ValueKind::Double(f64::NEG_INFINITY),
            WireValue::PositiveInfinity => ValueKind::Double(f64::INFINITY),
            WireValue::Null => ValueKind::Null,
            WireValue::DocumentId => ValueKind::DocumentId,
            WireValue::BooleanTrue => ValueKind::Boolean(true),
            WireValue::BooleanFalse => ValueKind::Boolean(false),
            WireValue::NegativeZero => ValueKind::Double(-0.0),
            WireValue::Double(number) => ValueKind::Double(number),
            WireValue::Integer(number) => ValueKind::Integer(number),
            WireValue::String(text) => ValueKind::String(text),
            WireValue::StringEmpty => ValueKind::String(String::new()),
            WireValue::Array(values) => {
                return Ok(FirestoreValue::from_array(self.decode_array(values)?))
            }
            WireValue::Object(map) => ValueKind::Map(self.decode_map(map)?),
            WireValue::Reference(path) => ValueKind::Reference(ResourcePath::from_name(&path)?),
            WireValue::GeoPoint(latitude, longitude) => {
                ValueKind::GeoPoint(GeoPoint::new(latitude, longitude)?)
            }
            WireValue::Timestamp(seconds, nanos) => {
                ValueKind::Timestamp(Timestamp::new(seconds, nanos))
            }
            WireValue::Blob(encoded) => ValueKind::Bytes(BytesValue::from_base64(&encoded)?),
            WireValue::Vector(values) => ValueKind::Vector(VectorValue::new(values)),
            WireValue::FieldValue(field_value) => {
                ValueKind::Sentinel(self.decode_field_value(field_value)?)
            }
            WireValue::Unknown { tag, payload } => {
                log::warn!("Unknown data type received from native channel: {tag}");
                ValueKind::Unknown(payload)
            }
        };
        Ok(FirestoreValue::from_kind(kind))
    }

    pub fn decode_map(&self, fields: BTreeMap<String, WireValue>) -> FirestoreResult<MapValue> {
        let mut decoded = BTreeMap::new();
        for (key, value) in fields {
            decoded.insert(key, self.decode_value(value)?);
        }
        Ok(MapValue::new(decoded))
    }

    pub fn decode_array(&self, values: Vec<WireValue>) -> FirestoreResult<Vec<FirestoreValue>> {
        values
            .into_iter()
            .map(|value| self.decode_value(value))
            .collect()
    }

    fn decode_field_value(&self, field_value: WireFieldValue) -> FirestoreResult<SentinelValue> {
        let sentinel = match field_value {
            WireFieldValue::Delete => SentinelValue::Delete,
            WireFieldValue::ServerTimestamp => SentinelValue::ServerTimestamp,
            WireFieldValue::Increment(number) => {
                let operand = match number.as_i64() {
                    Some(value) => FirestoreValue::from_integer(value),
                    None => FirestoreValue::from_double(number.as_f64().unwrap_or_default()),
                };
                SentinelValue::NumericIncrement(Box::new(operand))
            }
            WireFieldValue::ArrayUnion(elements) => {
                SentinelValue::ArrayUnion(self.decode_array(elements)?)
            }
            WireFieldValue::ArrayRemove(elements) => {
                SentinelValue::ArrayRemove(self.decode_array(elements)?)
            }
        };
        Ok(sentinel)
    }
}
