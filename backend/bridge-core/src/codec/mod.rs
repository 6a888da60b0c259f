//! Serialization codec for everything that crosses the view boundary.
//!
//! In-process values are [`RichValue`]s, which can hold things plain JSON
//! cannot (`undefined`, big integers, dates, sets, maps with non-string
//! keys, non-finite floats). On the wire they travel as an envelope:
//!
//! ```text
//! {"json": {"when": "2024-01-02T03:04:05.000Z", "ids": [1, 2]},
//!  "meta": {"values": {"when": "Date", "ids": "set"}}}
//! ```
//!
//! `json` is the plain projection; `meta.values` maps escaped dot paths to
//! type tags (`meta.root` tags the top-level value). Decoding applies the
//! tags deepest-first, so paths into a map or set are resolved while the
//! container is still a plain array.

mod envelope;
mod value;

pub use envelope::{Envelope, EnvelopeMeta, decode, decode_envelope, encode, encode_envelope};
pub use value::RichValue;
