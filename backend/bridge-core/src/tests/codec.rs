// Unit tests for the envelope codec
// Tests type tags, path escaping and rejection of malformed envelopes

use crate::codec::{RichValue, decode, encode};
use crate::error::CodecError;

use std::time::{Duration, UNIX_EPOCH};

use serde::Deserialize;
use serde_json::json;

/// 2024-01-02T03:04:05Z
const SAMPLE_SECS: u64 = 1_704_164_645;

// ============================================
// ENCODING
// ============================================

/// **VALUE**: Verifies dates and sets are projected to plain JSON with one tag
/// per non-JSON value, addressed by dot path.
///
/// **WHY THIS MATTERS**: The view reconstructs rich values only from these tags.
/// A missing tag silently turns a Date into a string on the other side.
///
/// **BUG THIS CATCHES**: Would catch if nested values were tagged at the wrong
/// path or if plain values picked up spurious tags.
#[test]
fn given_object_with_date_and_set_when_encode_then_tags_each_path() {
    // GIVEN: An object with a date, a set and a plain number
    let value = RichValue::object([
        ("when", RichValue::Date(UNIX_EPOCH + Duration::from_secs(SAMPLE_SECS))),
        ("ids", RichValue::Set(vec![1.into(), 2.into()])),
        ("count", 3.into()),
    ]);

    // WHEN: Encoding
    let text = encode(&value).expect("Should encode");

    // THEN: JSON is plain and meta tags only the rich values
    let envelope: serde_json::Value = serde_json::from_str(&text).expect("Valid JSON");
    assert_eq!(
        envelope,
        json!({
            "json": {"when": "2024-01-02T03:04:05.000Z", "ids": [1, 2], "count": 3},
            "meta": {"values": {"when": "Date", "ids": "set"}}
        })
    );
}

/// **VALUE**: Verifies `undefined` and `null` stay distinguishable on the wire.
///
/// **WHY THIS MATTERS**: Procedures without input receive `undefined`. Turning
/// it into `null` would make `NoInput` handlers and optional fields disagree
/// with the view.
///
/// **BUG THIS CATCHES**: Would catch if the root tag were dropped for top-level
/// values or if `null` started carrying a tag.
#[test]
fn given_undefined_and_null_when_encode_then_only_undefined_is_tagged() {
    // WHEN: Encoding both
    let undefined = encode(&RichValue::Undefined).expect("Should encode");
    let null = encode(&RichValue::Null).expect("Should encode");

    // THEN: Only undefined carries a root tag, and both decode back to themselves
    assert_eq!(undefined, r#"{"json":null,"meta":{"root":"undefined"}}"#);
    assert_eq!(null, r#"{"json":null}"#);
    assert_eq!(decode(&undefined).expect("Should decode"), RichValue::Undefined);
    assert_eq!(decode(&null).expect("Should decode"), RichValue::Null);
}

/// **VALUE**: Verifies object keys containing dots are escaped in tag paths.
///
/// **WHY THIS MATTERS**: Keys come from user data. An unescaped `a.b` key would
/// point the tag at a nested `a -> b` path that does not exist.
///
/// **BUG THIS CATCHES**: Would catch a join/split mismatch between encoder and
/// decoder.
#[test]
fn given_key_with_dot_when_encode_then_path_is_escaped_and_decodes_back() {
    // GIVEN: A date under a dotted key
    let when = UNIX_EPOCH + Duration::from_secs(SAMPLE_SECS);
    let value = RichValue::object([("a.b", RichValue::Date(when))]);

    // WHEN: Encoding
    let text = encode(&value).expect("Should encode");

    // THEN: The path is escaped and decoding restores the date
    let envelope: serde_json::Value = serde_json::from_str(&text).expect("Valid JSON");
    assert_eq!(envelope["meta"]["values"]["a\\.b"], "Date");
    assert_eq!(decode(&text).expect("Should decode"), value);
}

/// **VALUE**: Verifies dates outside 1970..=9999 are refused instead of being
/// sent as garbage.
///
/// **WHY THIS MATTERS**: RFC 3339 text cannot express them and the view would
/// parse an invalid date.
///
/// **BUG THIS CATCHES**: Would catch a silent fallback to `null` or to epoch.
#[test]
fn given_date_before_epoch_when_encode_then_conversion_error() {
    // GIVEN: A date one day before the epoch
    let value = RichValue::Date(UNIX_EPOCH - Duration::from_secs(86_400));

    // WHEN: Encoding
    let result = encode(&value);

    // THEN: Conversion error
    assert!(matches!(result, Err(CodecError::Conversion { .. })));
}

// ============================================
// DECODING
// ============================================

/// **VALUE**: Verifies a map with non-string keys, nested rich values inside it,
/// a big integer and a non-finite float all survive the wire.
///
/// **WHY THIS MATTERS**: Tags inside a map address the `[key, value]` pair
/// arrays. They must be applied before the map tag turns those arrays into
/// entries, otherwise the paths no longer resolve.
///
/// **BUG THIS CATCHES**: Would catch shallow-first tag application and broken
/// special-number handling.
#[test]
fn given_map_with_rich_keys_when_round_tripped_then_structure_is_preserved() {
    // GIVEN: A map keyed by number and date, plus a bigint and NaN
    let when = UNIX_EPOCH + Duration::from_secs(SAMPLE_SECS);
    let big = i128::from(i64::MAX) * 4;
    let value = RichValue::object([
        (
            "lookup",
            RichValue::Map(vec![
                (1.into(), "one".into()),
                (RichValue::Date(when), RichValue::Undefined),
            ]),
        ),
        ("big", RichValue::BigInt(big)),
        ("ratio", RichValue::Float(f64::NAN)),
    ]);

    // WHEN: Encoding then decoding
    let decoded = decode(&encode(&value).expect("Should encode")).expect("Should decode");

    // THEN: Map entries, bigint and NaN come back
    assert_eq!(
        decoded.get("lookup"),
        Some(&RichValue::Map(vec![
            (1.into(), "one".into()),
            (RichValue::Date(when), RichValue::Undefined),
        ]))
    );
    assert_eq!(decoded.get("big"), Some(&RichValue::BigInt(big)));
    assert!(matches!(decoded.get("ratio"), Some(RichValue::Float(f)) if f.is_nan()));
}

/// **VALUE**: Verifies an envelope without `meta` is accepted as plain JSON.
///
/// **WHY THIS MATTERS**: Most payloads have no rich values and the encoder omits
/// the empty meta block.
///
/// **BUG THIS CATCHES**: Would catch `meta` being required by the decoder.
#[test]
fn given_envelope_without_meta_when_decode_then_plain_values() {
    let decoded = decode(r#"{"json":{"message":"hi","n":2}}"#).expect("Should decode");

    assert_eq!(decoded.get("message").and_then(RichValue::as_str), Some("hi"));
    assert_eq!(decoded.get("n").and_then(RichValue::as_i64), Some(2));
}

/// **VALUE**: Verifies broken envelopes fail with a descriptive error instead of
/// producing a partial value.
///
/// **WHY THIS MATTERS**: Whatever the view sends, the host must not hand a
/// half-decoded value to a handler.
///
/// **BUG THIS CATCHES**: Would catch tags being skipped when their path is
/// missing or when they do not fit the value they point at.
#[test]
fn given_malformed_envelopes_when_decode_then_errors() {
    // Not JSON at all
    assert!(matches!(
        decode("not json"),
        Err(CodecError::MalformedEnvelope { .. })
    ));

    // Tag points at a path that does not exist
    assert!(matches!(
        decode(r#"{"json":{"a":1},"meta":{"values":{"b":"Date"}}}"#),
        Err(CodecError::Annotation { .. })
    ));

    // Tag does not fit the value
    assert!(matches!(
        decode(r#"{"json":5,"meta":{"root":"set"}}"#),
        Err(CodecError::Annotation { .. })
    ));

    // Unparseable date text
    assert!(matches!(
        decode(r#"{"json":"yesterday","meta":{"root":"Date"}}"#),
        Err(CodecError::Annotation { .. })
    ));
}

/// **VALUE**: Verifies typed decoding goes through the plain JSON projection.
///
/// **WHY THIS MATTERS**: Handlers receive typed inputs built with
/// `decode_into`. Dates must arrive as RFC 3339 text that serde can read.
///
/// **BUG THIS CATCHES**: Would catch the projection dropping fields or emitting
/// dates in a different format.
#[test]
fn given_rich_object_when_decode_into_then_typed_struct() {
    #[derive(Debug, Deserialize, PartialEq)]
    struct Reminder {
        text: String,
        at: String,
        tags: Vec<String>,
    }

    // GIVEN: An object with a date and a set
    let value = RichValue::object([
        ("text", RichValue::from("stand up")),
        ("at", RichValue::Date(UNIX_EPOCH + Duration::from_secs(SAMPLE_SECS))),
        ("tags", RichValue::Set(vec!["daily".into()])),
    ]);

    // WHEN: Decoding into a struct
    let reminder: Reminder = value.decode_into().expect("Should decode");

    // THEN: Fields are the plain projections
    assert_eq!(
        reminder,
        Reminder {
            text: "stand up".to_string(),
            at: "2024-01-02T03:04:05.000Z".to_string(),
            tags: vec!["daily".to_string()],
        }
    );
}
