use crate::error::CodecError;

use std::collections::BTreeMap;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Map as JsonMap, Number, Value as JsonValue};

/// Latest instant RFC 3339 can express (9999-12-31T23:59:59Z).
const MAX_RFC3339_SECS: u64 = 253_402_300_799;

/// RFC 3339 text for `time`, or `None` if it falls outside 1970..=9999.
pub(crate) fn format_date(time: SystemTime) -> Option<String> {
    let since_epoch = time.duration_since(UNIX_EPOCH).ok()?;
    if since_epoch.as_secs() > MAX_RFC3339_SECS {
        return None;
    }
    Some(humantime::format_rfc3339_millis(time).to_string())
}

/// A value as seen by procedure handlers and facade callers.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum RichValue {
    /// Absent input or output (distinct from `Null`).
    #[default]
    Undefined,
    Null,
    Bool(bool),
    Integer(i64),
    Float(f64),
    BigInt(i128),
    String(String),
    Date(SystemTime),
    Array(Vec<RichValue>),
    Set(Vec<RichValue>),
    /// Insertion-ordered entries; keys may be any value.
    Map(Vec<(RichValue, RichValue)>),
    Object(BTreeMap<String, RichValue>),
}

impl RichValue {
    /// Build an object from `(key, value)` pairs.
    pub fn object<K, V>(entries: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<RichValue>,
    {
        RichValue::Object(
            entries
                .into_iter()
                .map(|(key, value)| (key.into(), value.into()))
                .collect(),
        )
    }

    /// Convert any serializable value (through its JSON form).
    pub fn from_serialize<T: Serialize>(value: &T) -> Result<Self, CodecError> {
        serde_json::to_value(value)
            .map(RichValue::from)
            .map_err(|e| CodecError::conversion(e.to_string()))
    }

    /// Deserialize into a typed value through the plain JSON projection.
    pub fn decode_into<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_value(self.to_plain_json())
    }

    /// Lossy projection to plain JSON.
    ///
    /// Dates become RFC 3339 strings, sets become arrays, maps with string
    /// keys become objects (otherwise `[key, value]` pairs), big integers
    /// become numbers when they fit in 64 bits.
    pub fn to_plain_json(&self) -> JsonValue {
        match self {
            RichValue::Undefined | RichValue::Null => JsonValue::Null,
            RichValue::Bool(b) => JsonValue::Bool(*b),
            RichValue::Integer(i) => JsonValue::Number(Number::from(*i)),
            RichValue::Float(f) => Number::from_f64(*f)
                .map(JsonValue::Number)
                .unwrap_or(JsonValue::Null),
            RichValue::BigInt(n) => {
                if let Ok(small) = i64::try_from(*n) {
                    JsonValue::Number(Number::from(small))
                } else if let Ok(unsigned) = u64::try_from(*n) {
                    JsonValue::Number(Number::from(unsigned))
                } else {
                    JsonValue::String(n.to_string())
                }
            }
            RichValue::String(s) => JsonValue::String(s.clone()),
            RichValue::Date(t) => format_date(*t)
                .map(JsonValue::String)
                .unwrap_or(JsonValue::Null),
            RichValue::Array(items) | RichValue::Set(items) => {
                JsonValue::Array(items.iter().map(RichValue::to_plain_json).collect())
            }
            RichValue::Map(entries) => {
                let all_string_keys = entries
                    .iter()
                    .all(|(key, _)| matches!(key, RichValue::String(_)));
                if all_string_keys {
                    let mut object = JsonMap::new();
                    for (key, value) in entries {
                        if let RichValue::String(key) = key {
                            object.insert(key.clone(), value.to_plain_json());
                        }
                    }
                    JsonValue::Object(object)
                } else {
                    JsonValue::Array(
                        entries
                            .iter()
                            .map(|(key, value)| {
                                JsonValue::Array(vec![key.to_plain_json(), value.to_plain_json()])
                            })
                            .collect(),
                    )
                }
            }
            RichValue::Object(fields) => JsonValue::Object(
                fields
                    .iter()
                    .map(|(key, value)| (key.clone(), value.to_plain_json()))
                    .collect(),
            ),
        }
    }

    pub fn get(&self, key: &str) -> Option<&RichValue> {
        match self {
            RichValue::Object(fields) => fields.get(key),
            RichValue::Map(entries) => entries
                .iter()
                .find(|(k, _)| matches!(k, RichValue::String(s) if s == key))
                .map(|(_, v)| v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            RichValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            RichValue::Integer(i) => Some(*i),
            RichValue::BigInt(n) => i64::try_from(*n).ok(),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            RichValue::Float(f) => Some(*f),
            RichValue::Integer(i) => Some(*i as f64),
            _ => None,
        }
    }

    pub fn is_undefined(&self) -> bool {
        matches!(self, RichValue::Undefined)
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            RichValue::Undefined => "undefined",
            RichValue::Null => "null",
            RichValue::Bool(_) => "boolean",
            RichValue::Integer(_) | RichValue::Float(_) => "number",
            RichValue::BigInt(_) => "bigint",
            RichValue::String(_) => "string",
            RichValue::Date(_) => "Date",
            RichValue::Array(_) => "array",
            RichValue::Set(_) => "set",
            RichValue::Map(_) => "map",
            RichValue::Object(_) => "object",
        }
    }
}

impl From<JsonValue> for RichValue {
    fn from(value: JsonValue) -> Self {
        match value {
            JsonValue::Null => RichValue::Null,
            JsonValue::Bool(b) => RichValue::Bool(b),
            JsonValue::Number(n) => {
                if let Some(i) = n.as_i64() {
                    RichValue::Integer(i)
                } else if let Some(u) = n.as_u64() {
                    RichValue::BigInt(i128::from(u))
                } else {
                    RichValue::Float(n.as_f64().unwrap_or(f64::NAN))
                }
            }
            JsonValue::String(s) => RichValue::String(s),
            JsonValue::Array(items) => {
                RichValue::Array(items.into_iter().map(RichValue::from).collect())
            }
            JsonValue::Object(fields) => RichValue::Object(
                fields
                    .into_iter()
                    .map(|(key, value)| (key, RichValue::from(value)))
                    .collect(),
            ),
        }
    }
}

impl From<()> for RichValue {
    fn from(_: ()) -> Self {
        RichValue::Undefined
    }
}

impl From<bool> for RichValue {
    fn from(value: bool) -> Self {
        RichValue::Bool(value)
    }
}

impl From<i32> for RichValue {
    fn from(value: i32) -> Self {
        RichValue::Integer(i64::from(value))
    }
}

impl From<i64> for RichValue {
    fn from(value: i64) -> Self {
        RichValue::Integer(value)
    }
}

impl From<u32> for RichValue {
    fn from(value: u32) -> Self {
        RichValue::Integer(i64::from(value))
    }
}

impl From<u64> for RichValue {
    fn from(value: u64) -> Self {
        i64::try_from(value)
            .map(RichValue::Integer)
            .unwrap_or(RichValue::BigInt(i128::from(value)))
    }
}

impl From<i128> for RichValue {
    fn from(value: i128) -> Self {
        RichValue::BigInt(value)
    }
}

impl From<f64> for RichValue {
    fn from(value: f64) -> Self {
        RichValue::Float(value)
    }
}

impl From<String> for RichValue {
    fn from(value: String) -> Self {
        RichValue::String(value)
    }
}

impl From<&str> for RichValue {
    fn from(value: &str) -> Self {
        RichValue::String(value.to_string())
    }
}

impl From<SystemTime> for RichValue {
    fn from(value: SystemTime) -> Self {
        RichValue::Date(value)
    }
}

impl<T: Into<RichValue>> From<Vec<T>> for RichValue {
    fn from(items: Vec<T>) -> Self {
        RichValue::Array(items.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<RichValue>> From<Option<T>> for RichValue {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(RichValue::Null)
    }
}

impl<T: Into<RichValue>> From<BTreeMap<String, T>> for RichValue {
    fn from(fields: BTreeMap<String, T>) -> Self {
        RichValue::Object(
            fields
                .into_iter()
                .map(|(key, value)| (key, value.into()))
                .collect(),
        )
    }
}
