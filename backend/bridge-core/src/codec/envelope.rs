use crate::codec::value::{RichValue, format_date};
use crate::error::CodecError;

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map as JsonMap, Number, Value as JsonValue};

const TAG_UNDEFINED: &str = "undefined";
const TAG_BIGINT: &str = "bigint";
const TAG_DATE: &str = "Date";
const TAG_NUMBER: &str = "number";
const TAG_SET: &str = "set";
const TAG_MAP: &str = "map";

/// Wire form of a [`RichValue`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    pub json: JsonValue,
    #[serde(default, skip_serializing_if = "EnvelopeMeta::is_empty")]
    pub meta: EnvelopeMeta,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct EnvelopeMeta {
    /// Tag for the top-level value itself.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub root: Option<String>,
    /// Escaped dot path -> tag.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub values: BTreeMap<String, String>,
}

impl EnvelopeMeta {
    pub fn is_empty(&self) -> bool {
        self.root.is_none() && self.values.is_empty()
    }
}

/// Encode to envelope text.
pub fn encode(value: &RichValue) -> Result<String, CodecError> {
    let envelope = encode_envelope(value)?;
    Ok(serde_json::to_string(&envelope)?)
}

/// Decode envelope text.
pub fn decode(text: &str) -> Result<RichValue, CodecError> {
    let envelope: Envelope = serde_json::from_str(text)?;
    decode_envelope(envelope)
}

pub fn encode_envelope(value: &RichValue) -> Result<Envelope, CodecError> {
    let mut encoder = Encoder::default();
    let json = encoder.walk(value)?;
    Ok(Envelope {
        json,
        meta: EnvelopeMeta {
            root: encoder.root,
            values: encoder.values,
        },
    })
}

pub fn decode_envelope(envelope: Envelope) -> Result<RichValue, CodecError> {
    let mut value = RichValue::from(envelope.json);

    let mut annotations = envelope
        .meta
        .values
        .iter()
        .map(|(path, tag)| (split_path(path), path.as_str(), tag.as_str()))
        .collect::<Vec<_>>();

    // Deepest first: paths into a map or set still address plain arrays.
    annotations.sort_by(|a, b| b.0.len().cmp(&a.0.len()));

    for (segments, raw_path, tag) in annotations {
        let node = navigate_mut(&mut value, &segments)
            .ok_or_else(|| CodecError::annotation(raw_path, "path does not exist in payload"))?;
        apply_tag(node, tag, raw_path)?;
    }

    if let Some(tag) = envelope.meta.root.as_deref() {
        apply_tag(&mut value, tag, "")?;
    }

    Ok(value)
}

#[derive(Default)]
struct Encoder {
    path: Vec<String>,
    root: Option<String>,
    values: BTreeMap<String, String>,
}

impl Encoder {
    fn annotate(&mut self, tag: &str) {
        if self.path.is_empty() {
            self.root = Some(tag.to_string());
        } else {
            self.values.insert(join_path(&self.path), tag.to_string());
        }
    }

    fn walk_child(&mut self, segment: String, value: &RichValue) -> Result<JsonValue, CodecError> {
        self.path.push(segment);
        let result = self.walk(value);
        self.path.pop();
        result
    }

    fn walk(&mut self, value: &RichValue) -> Result<JsonValue, CodecError> {
        Ok(match value {
            RichValue::Undefined => {
                self.annotate(TAG_UNDEFINED);
                JsonValue::Null
            }
            RichValue::Null => JsonValue::Null,
            RichValue::Bool(b) => JsonValue::Bool(*b),
            RichValue::Integer(i) => JsonValue::Number(Number::from(*i)),
            RichValue::Float(f) => match Number::from_f64(*f) {
                Some(number) => JsonValue::Number(number),
                None => {
                    self.annotate(TAG_NUMBER);
                    JsonValue::String(non_finite_text(*f).to_string())
                }
            },
            RichValue::BigInt(n) => {
                self.annotate(TAG_BIGINT);
                JsonValue::String(n.to_string())
            }
            RichValue::String(s) => JsonValue::String(s.clone()),
            RichValue::Date(t) => {
                let text = format_date(*t).ok_or_else(|| {
                    CodecError::conversion("date is outside the representable range 1970..=9999")
                })?;
                self.annotate(TAG_DATE);
                JsonValue::String(text)
            }
            RichValue::Array(items) => self.walk_items(items)?,
            RichValue::Set(items) => {
                self.annotate(TAG_SET);
                self.walk_items(items)?
            }
            RichValue::Map(entries) => {
                self.annotate(TAG_MAP);
                let mut pairs = Vec::with_capacity(entries.len());
                for (index, (key, entry)) in entries.iter().enumerate() {
                    self.path.push(index.to_string());
                    let key_json = self.walk_child(String::from("0"), key);
                    let value_json = self.walk_child(String::from("1"), entry);
                    self.path.pop();
                    pairs.push(JsonValue::Array(vec![key_json?, value_json?]));
                }
                JsonValue::Array(pairs)
            }
            RichValue::Object(fields) => {
                let mut object = JsonMap::new();
                for (key, field) in fields {
                    let json = self.walk_child(key.clone(), field)?;
                    object.insert(key.clone(), json);
                }
                JsonValue::Object(object)
            }
        })
    }

    fn walk_items(&mut self, items: &[RichValue]) -> Result<JsonValue, CodecError> {
        let mut out = Vec::with_capacity(items.len());
        for (index, item) in items.iter().enumerate() {
            out.push(self.walk_child(index.to_string(), item)?);
        }
        Ok(JsonValue::Array(out))
    }
}

fn non_finite_text(f: f64) -> &'static str {
    if f.is_nan() {
        "NaN"
    } else if f.is_sign_positive() {
        "Infinity"
    } else {
        "-Infinity"
    }
}

fn apply_tag(node: &mut RichValue, tag: &str, path: &str) -> Result<(), CodecError> {
    let current = std::mem::take(node);
    *node = match (tag, current) {
        (TAG_UNDEFINED, RichValue::Null) => RichValue::Undefined,
        (TAG_BIGINT, RichValue::String(text)) => text
            .parse::<i128>()
            .map(RichValue::BigInt)
            .map_err(|e| CodecError::annotation(path, format!("invalid bigint '{text}': {e}")))?,
        (TAG_DATE, RichValue::String(text)) => humantime::parse_rfc3339_weak(&text)
            .map(RichValue::Date)
            .map_err(|e| CodecError::annotation(path, format!("invalid date '{text}': {e}")))?,
        (TAG_NUMBER, RichValue::String(text)) => match text.as_str() {
            "NaN" => RichValue::Float(f64::NAN),
            "Infinity" => RichValue::Float(f64::INFINITY),
            "-Infinity" => RichValue::Float(f64::NEG_INFINITY),
            other => {
                return Err(CodecError::annotation(
                    path,
                    format!("invalid special number '{other}'"),
                ));
            }
        },
        (TAG_SET, RichValue::Array(items)) => RichValue::Set(items),
        (TAG_MAP, RichValue::Array(pairs)) => {
            let mut entries = Vec::with_capacity(pairs.len());
            for pair in pairs {
                match pair {
                    RichValue::Array(mut kv) if kv.len() == 2 => {
                        let value = kv.pop().unwrap_or_default();
                        let key = kv.pop().unwrap_or_default();
                        entries.push((key, value));
                    }
                    other => {
                        return Err(CodecError::annotation(
                            path,
                            format!("map entry must be a [key, value] pair, got {}", other.type_name()),
                        ));
                    }
                }
            }
            RichValue::Map(entries)
        }
        (tag, other) => {
            return Err(CodecError::annotation(
                path,
                format!("tag '{tag}' cannot apply to {}", other.type_name()),
            ));
        }
    };
    Ok(())
}

fn navigate_mut<'a>(value: &'a mut RichValue, segments: &[String]) -> Option<&'a mut RichValue> {
    let mut node = value;
    for segment in segments {
        let current = node;
        node = match current {
            RichValue::Object(fields) => fields.get_mut(segment)?,
            RichValue::Array(items) | RichValue::Set(items) => {
                let index = segment.parse::<usize>().ok()?;
                items.get_mut(index)?
            }
            _ => return None,
        };
    }
    Some(node)
}

fn join_path(segments: &[String]) -> String {
    segments
        .iter()
        .map(|segment| segment.replace('\\', "\\\\").replace('.', "\\."))
        .collect::<Vec<_>>()
        .join(".")
}

fn split_path(path: &str) -> Vec<String> {
    let mut segments = Vec::new();
    let mut current = String::new();
    let mut chars = path.chars();
    while let Some(ch) = chars.next() {
        match ch {
            '\\' => {
                if let Some(escaped) = chars.next() {
                    current.push(escaped);
                }
            }
            '.' => segments.push(std::mem::take(&mut current)),
            other => current.push(other),
        }
    }
    segments.push(current);
    segments
}
