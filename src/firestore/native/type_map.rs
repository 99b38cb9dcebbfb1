//! The tagged wire representation exchanged with native engines.
//!
//! Every value crossing the bridge is a JSON array `[tag, payload?]`. The
//! tag numbers are fixed by the engines and must never be renumbered.

use std::collections::BTreeMap;
use std::fmt;

use serde::de::{self, Deserializer};
use serde::ser::{SerializeSeq, Serializer};
use serde::{Deserialize, Serialize};
use serde_json::{Number, Value as JsonValue};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum TypeTag {
    Nan = 0,
    NegativeInfinity = 1,
    PositiveInfinity = 2,
    Null = 3,
    DocumentId = 4,
    BooleanTrue = 5,
    BooleanFalse = 6,
    Double = 7,
    String = 8,
    StringEmpty = 9,
    Array = 10,
    Reference = 11,
    GeoPoint = 12,
    Timestamp = 13,
    Blob = 14,
    FieldValue = 15,
    Object = 16,
    Integer = 17,
    NegativeZero = 18,
    Vector = 19,
    Unknown = -999,
}

impl TypeTag {
    pub fn from_i64(value: i64) -> Option<Self> {
        let tag = match value {
            0 => TypeTag::Nan,
            1 => TypeTag::NegativeInfinity,
            2 => TypeTag::PositiveInfinity,
            3 => TypeTag::Null,
            4 => TypeTag::DocumentId,
            5 => TypeTag::BooleanTrue,
            6 => TypeTag::BooleanFalse,
            7 => TypeTag::Double,
            8 => TypeTag::String,
            9 => TypeTag::StringEmpty,
            10 => TypeTag::Array,
            11 => TypeTag::Reference,
            12 => TypeTag::GeoPoint,
            13 => TypeTag::Timestamp,
            14 => TypeTag::Blob,
            15 => TypeTag::FieldValue,
            16 => TypeTag::Object,
            17 => TypeTag::Integer,
            18 => TypeTag::NegativeZero,
            19 => TypeTag::Vector,
            -999 => TypeTag::Unknown,
            _ => return None,
        };
        Some(tag)
    }

    pub fn as_i32(self) -> i32 {
        self as i32
    }

    /// Name used by the engines' type tables.
    pub fn name(self) -> &'static str {
        match self {
            TypeTag::Nan => "nan",
            TypeTag::NegativeInfinity => "-infinity",
            TypeTag::PositiveInfinity => "infinity",
            TypeTag::Null => "null",
            TypeTag::DocumentId => "documentid",
            TypeTag::BooleanTrue => "booleanTrue",
            TypeTag::BooleanFalse => "booleanFalse",
            TypeTag::Double => "double",
            TypeTag::String => "string",
            TypeTag::StringEmpty => "stringEmpty",
            TypeTag::Array => "array",
            TypeTag::Reference => "reference",
            TypeTag::GeoPoint => "geopoint",
            TypeTag::Timestamp => "timestamp",
            TypeTag::Blob => "blob",
            TypeTag::FieldValue => "fieldvalue",
            TypeTag::Object => "object",
            TypeTag::Integer => "integer",
            TypeTag::NegativeZero => "negativeZero",
            TypeTag::Vector => "vector",
            TypeTag::Unknown => "unknown",
        }
    }
}

/// Write transform carried by the `fieldvalue` tag as `[kind, operand]`.
#[derive(Clone, Debug, PartialEq)]
pub enum WireFieldValue {
    Delete,
    ServerTimestamp,
    Increment(Number),
    ArrayUnion(Vec<WireValue>),
    ArrayRemove(Vec<WireValue>),
}

impl WireFieldValue {
    pub fn kind(&self) -> &'static str {
        match self {
            WireFieldValue::Delete => "delete",
            WireFieldValue::ServerTimestamp => "timestamp",
            WireFieldValue::Increment(_) => "increment",
            WireFieldValue::ArrayUnion(_) => "array_union",
            WireFieldValue::ArrayRemove(_) => "array_remove",
        }
    }
}

/// One tagged value. `Unknown` keeps tags this crate cannot interpret.
#[derive(Clone, Debug, PartialEq)]
pub enum WireValue {
    Nan,
    NegativeInfinity,
    PositiveInfinity,
    Null,
    DocumentId,
    BooleanTrue,
    BooleanFalse,
    Double(f64),
    String(String),
    StringEmpty,
    Array(Vec<WireValue>),
    Reference(String),
    GeoPoint(f64, f64),
    Timestamp(i64, i32),
    Blob(String),
    FieldValue(WireFieldValue),
    Object(BTreeMap<String, WireValue>),
    Integer(i64),
    NegativeZero,
    Vector(Vec<f64>),
    Unknown { tag: i64, payload: JsonValue },
}

impl WireValue {
    /// Tag of this value. `Unknown` values report [`TypeTag::Unknown`]
    /// whatever number they arrived with.
    pub fn tag(&self) -> TypeTag {
        match self {
            WireValue::Nan => TypeTag::Nan,
            WireValue::NegativeInfinity => TypeTag::NegativeInfinity,
            WireValue::PositiveInfinity => TypeTag::PositiveInfinity,
            WireValue::Null => TypeTag::Null,
            WireValue::DocumentId => TypeTag::DocumentId,
            WireValue::BooleanTrue => TypeTag::BooleanTrue,
            WireValue::BooleanFalse => TypeTag::BooleanFalse,
            WireValue::Double(_) => TypeTag::Double,
            WireValue::String(_) => TypeTag::String,
            WireValue::StringEmpty => TypeTag::StringEmpty,
            WireValue::Array(_) => TypeTag::Array,
            WireValue::Reference(_) => TypeTag::Reference,
            WireValue::GeoPoint(_, _) => TypeTag::GeoPoint,
            WireValue::Timestamp(_, _) => TypeTag::Timestamp,
            WireValue::Blob(_) => TypeTag::Blob,
            WireValue::FieldValue(_) => TypeTag::FieldValue,
            WireValue::Object(_) => TypeTag::Object,
            WireValue::Integer(_) => TypeTag::Integer,
            WireValue::NegativeZero => TypeTag::NegativeZero,
            WireValue::Vector(_) => TypeTag::Vector,
            WireValue::Unknown { .. } => TypeTag::Unknown,
        }
    }

    pub fn to_json(&self) -> JsonValue {
        // Serializing into a `serde_json::Value` cannot fail for this type.
        serde_json::to_value(self).unwrap_or(JsonValue::Null)
    }

    pub fn from_json(value: JsonValue) -> Result<Self, WireFormatError> {
        let mut items = match value {
            JsonValue::Array(items) if !items.is_empty() => items,
            other => {
                return Err(WireFormatError::new(format!(
                    "expected a non-empty [tag, payload] array, got {other}"
                )))
            }
        };
        let payload = if items.len() > 1 {
            items.swap_remove(1)
        } else {
            JsonValue::Null
        };
        let tag = items[0]
            .as_i64()
            .ok_or_else(|| WireFormatError::new(format!("type tag {} is not an integer", items[0])))?;

        let Some(known) = TypeTag::from_i64(tag) else {
            return Ok(WireValue::Unknown { tag, payload });
        };

        let value = match known {
            TypeTag::Nan => WireValue::Nan,
            TypeTag::NegativeInfinity => WireValue::NegativeInfinity,
            TypeTag::PositiveInfinity => WireValue::PositiveInfinity,
            TypeTag::Null => WireValue::Null,
            TypeTag::DocumentId => WireValue::DocumentId,
            TypeTag::BooleanTrue => WireValue::BooleanTrue,
            TypeTag::BooleanFalse => WireValue::BooleanFalse,
            TypeTag::NegativeZero => WireValue::NegativeZero,
            TypeTag::StringEmpty => WireValue::StringEmpty,
            TypeTag::Double => WireValue::Double(expect_f64(&payload, known)?),
            TypeTag::Integer => WireValue::Integer(expect_integer(&payload, known)?),
            TypeTag::String => WireValue::String(expect_string(payload, known)?),
            TypeTag::Reference => WireValue::Reference(expect_string(payload, known)?),
            TypeTag::Blob => WireValue::Blob(expect_string(payload, known)?),
            TypeTag::Array => WireValue::Array(parse_list(payload)?),
            TypeTag::Object => WireValue::Object(parse_object(payload)?),
            TypeTag::GeoPoint => {
                let pair = expect_pair(&payload, known)?;
                WireValue::GeoPoint(expect_f64(&pair[0], known)?, expect_f64(&pair[1], known)?)
            }
            TypeTag::Timestamp => {
                let pair = expect_pair(&payload, known)?;
                let seconds = expect_integer(&pair[0], known)?;
                let nanos = i32::try_from(expect_integer(&pair[1], known)?)
                    .map_err(|_| mismatch(known, &payload))?;
                WireValue::Timestamp(seconds, nanos)
            }
            TypeTag::Vector => {
                let values = match payload {
                    JsonValue::Array(values) => values,
                    JsonValue::Null => Vec::new(),
                    other => return Err(mismatch(known, &other)),
                };
                WireValue::Vector(values.iter().filter_map(JsonValue::as_f64).collect())
            }
            TypeTag::FieldValue => WireValue::FieldValue(parse_field_value(payload)?),
            TypeTag::Unknown => WireValue::Unknown { tag, payload },
        };
        Ok(value)
    }
}

impl Serialize for WireValue {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let tag = match self {
            WireValue::Unknown { tag, .. } => *tag,
            other => i64::from(other.tag().as_i32()),
        };
        let has_payload = !matches!(
            self,
            WireValue::Nan
                | WireValue::NegativeInfinity
                | WireValue::PositiveInfinity
                | WireValue::Null
                | WireValue::DocumentId
                | WireValue::BooleanTrue
                | WireValue::BooleanFalse
                | WireValue::StringEmpty
                | WireValue::NegativeZero
        ) && !matches!(self, WireValue::Unknown { payload: JsonValue::Null, .. });

        let mut seq = serializer.serialize_seq(Some(if has_payload { 2 } else { 1 }))?;
        seq.serialize_element(&tag)?;
        match self {
            WireValue::Double(value) => seq.serialize_element(value)?,
            WireValue::Integer(value) => seq.serialize_element(value)?,
            WireValue::String(value) | WireValue::Reference(value) | WireValue::Blob(value) => {
                seq.serialize_element(value)?
            }
            WireValue::Array(values) => seq.serialize_element(values)?,
            WireValue::Object(map) => seq.serialize_element(map)?,
            WireValue::GeoPoint(latitude, longitude) => {
                seq.serialize_element(&[*latitude, *longitude])?
            }
            WireValue::Timestamp(seconds, nanos) => {
                seq.serialize_element(&(*seconds, *nanos))?
            }
            WireValue::Vector(values) => seq.serialize_element(values)?,
            WireValue::FieldValue(field_value) => {
                let kind = field_value.kind();
                match field_value {
                    WireFieldValue::Delete | WireFieldValue::ServerTimestamp => {
                        seq.serialize_element(&(kind, JsonValue::Null))?
                    }
                    WireFieldValue::Increment(operand) => seq.serialize_element(&(kind, operand))?,
                    WireFieldValue::ArrayUnion(elements) | WireFieldValue::ArrayRemove(elements) => {
                        seq.serialize_element(&(kind, elements))?
                    }
                }
            }
            WireValue::Unknown { payload, .. } if has_payload => seq.serialize_element(payload)?,
            _ => {}
        }
        seq.end()
    }
}

impl<'de> Deserialize<'de> for WireValue {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = JsonValue::deserialize(deserializer)?;
        WireValue::from_json(raw).map_err(de::Error::custom)
    }
}

/// Raised when a tagged value does not have the layout its tag requires.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WireFormatError {
    message: String,
}

impl WireFormatError {
    fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl fmt::Display for WireFormatError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "malformed wire value: {}", self.message)
    }
}

impl std::error::Error for WireFormatError {}

fn mismatch(tag: TypeTag, payload: &JsonValue) -> WireFormatError {
    WireFormatError::new(format!("tag '{}' cannot carry payload {payload}", tag.name()))
}

fn expect_f64(payload: &JsonValue, tag: TypeTag) -> Result<f64, WireFormatError> {
    payload.as_f64().ok_or_else(|| mismatch(tag, payload))
}

/// Integral numbers only. Some engines report integer fields as integral
/// doubles, which are accepted when they fit in an `i64`.
fn expect_integer(payload: &JsonValue, tag: TypeTag) -> Result<i64, WireFormatError> {
    if let Some(value) = payload.as_i64() {
        return Ok(value);
    }
    match payload.as_f64() {
        Some(value) if value.fract() == 0.0 && value >= i64::MIN as f64 && value < i64::MAX as f64 => {
            Ok(value as i64)
        }
        _ => Err(mismatch(tag, payload)),
    }
}

fn expect_string(payload: JsonValue, tag: TypeTag) -> Result<String, WireFormatError> {
    match payload {
        JsonValue::String(value) => Ok(value),
        other => Err(mismatch(tag, &other)),
    }
}

fn expect_pair(payload: &JsonValue, tag: TypeTag) -> Result<[JsonValue; 2], WireFormatError> {
    match payload {
        JsonValue::Array(items) if items.len() == 2 => Ok([items[0].clone(), items[1].clone()]),
        other => Err(mismatch(tag, other)),
    }
}

fn parse_list(payload: JsonValue) -> Result<Vec<WireValue>, WireFormatError> {
    match payload {
        JsonValue::Array(items) => items.into_iter().map(WireValue::from_json).collect(),
        JsonValue::Null => Ok(Vec::new()),
        other => Err(mismatch(TypeTag::Array, &other)),
    }
}

fn parse_object(payload: JsonValue) -> Result<BTreeMap<String, WireValue>, WireFormatError> {
    match payload {
        JsonValue::Object(entries) => entries
            .into_iter()
            .map(|(key, value)| WireValue::from_json(value).map(|value| (key, value)))
            .collect(),
        JsonValue::Null => Ok(BTreeMap::new()),
        other => Err(mismatch(TypeTag::Object, &other)),
    }
}

fn parse_field_value(payload: JsonValue) -> Result<WireFieldValue, WireFormatError> {
    let mut items = match payload {
        JsonValue::Array(items) if !items.is_empty() => items,
        other => return Err(mismatch(TypeTag::FieldValue, &other)),
    };
    let operand = if items.len() > 1 {
        items.swap_remove(1)
    } else {
        JsonValue::Null
    };
    match items[0].as_str() {
        Some("delete") => Ok(WireFieldValue::Delete),
        Some("timestamp") => Ok(WireFieldValue::ServerTimestamp),
        Some("increment") => match operand {
            JsonValue::Number(number) => Ok(WireFieldValue::Increment(number)),
            other => Err(mismatch(TypeTag::FieldValue, &other)),
        },
        Some("array_union") => Ok(WireFieldValue::ArrayUnion(parse_list(operand)?)),
        Some("array_remove") => Ok(WireFieldValue::ArrayRemove(parse_list(operand)?)),
        _ => Err(WireFormatError::new(format!(
            "unknown field value kind {}",
            items[0]
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn tag_numbers_are_stable() {
        assert_eq!(TypeTag::Nan.as_i32(), 0);
        assert_eq!(TypeTag::Null.as_i32(), 3);
        assert_eq!(TypeTag::Object.as_i32(), 16);
        assert_eq!(TypeTag::Integer.as_i32(), 17);
        assert_eq!(TypeTag::Vector.as_i32(), 19);
        assert_eq!(TypeTag::Unknown.as_i32(), -999);
        for tag in -1000..30 {
            if let Some(known) = TypeTag::from_i64(tag) {
                assert_eq!(i64::from(known.as_i32()), tag);
            }
        }
    }

    #[test]
    fn numeric_payloads_are_not_truncated() {
        assert_eq!(WireValue::from_json(json!([17, 4.0])).unwrap(), WireValue::Integer(4));
        assert!(WireValue::from_json(json!([17, 4.5])).is_err());
        assert!(WireValue::from_json(json!([17, 1e300])).is_err());

        assert_eq!(
            WireValue::from_json(json!([13, [10, 500]])).unwrap(),
            WireValue::Timestamp(10, 500)
        );
        let err = WireValue::from_json(json!([13, [10, 4_294_967_296_i64]])).unwrap_err();
        assert!(err.to_string().contains("timestamp"), "{err}");
        assert!(WireValue::from_json(json!([12, ["north", 1.0]])).is_err());
    }

    #[test]
    fn unit_tags_serialize_without_payload() {
        assert_eq!(WireValue::Null.to_json(), json!([3]));
        assert_eq!(WireValue::StringEmpty.to_json(), json!([9]));
        assert_eq!(WireValue::BooleanTrue.to_json(), json!([5]));
    }

    #[test]
    fn compound_payloads() {
        let mut object = BTreeMap::new();
        object.insert("n".to_string(), WireValue::Integer(1));
        object.insert("tags".to_string(), WireValue::Array(vec![WireValue::String("a".into())]));
        assert_eq!(
            WireValue::Object(object).to_json(),
            json!([16, {"n": [17, 1], "tags": [10, [[8, "a"]]]}])
        );
        assert_eq!(WireValue::Timestamp(10, 5).to_json(), json!([13, [10, 5]]));
        assert_eq!(WireValue::GeoPoint(1.5, -2.0).to_json(), json!([12, [1.5, -2.0]]));
    }

    #[test]
    fn field_values_carry_kind_and_operand() {
        let delete = WireValue::FieldValue(WireFieldValue::Delete);
        assert_eq!(delete.to_json(), json!([15, ["delete", null]]));

        let union = WireValue::FieldValue(WireFieldValue::ArrayUnion(vec![WireValue::Integer(2)]));
        assert_eq!(union.to_json(), json!([15, ["array_union", [[17, 2]]]]));

        let parsed = WireValue::from_json(json!([15, ["increment", 3]])).unwrap();
        assert_eq!(parsed, WireValue::FieldValue(WireFieldValue::Increment(3.into())));
    }

    #[test]
    fn unknown_tags_keep_their_payload() {
        let value = WireValue::from_json(json!([42, {"x": 1}])).unwrap();
        assert_eq!(
            value,
            WireValue::Unknown {
                tag: 42,
                payload: json!({"x": 1})
            }
        );
        assert_eq!(value.tag(), TypeTag::Unknown);
        assert_eq!(value.to_json(), json!([42, {"x": 1}]));
    }

    #[test]
    fn rejects_malformed_layouts() {
        assert!(WireValue::from_json(json!([])).is_err());
        assert!(WireValue::from_json(json!(["8", "x"])).is_err());
        assert!(WireValue::from_json(json!([8, 5])).is_err());
        assert!(WireValue::from_json(json!([13, [1]])).is_err());
    }

    #[test]
    fn deserializes_through_serde() {
        let value: WireValue = serde_json::from_str(r#"[10, [[7, 1.5], [9]]]"#).unwrap();
        assert_eq!(
            value,
            WireValue::Array(vec![WireValue::Double(1.5), WireValue::StringEmpty])
        );
    }
}
