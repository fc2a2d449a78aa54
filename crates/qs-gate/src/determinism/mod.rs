//! Canonical serialization for hashing and signing.
//!
//! Every hash this crate computes (request fingerprints, state fingerprints,
//! receipt body hashes) is taken over the output of this module, so the
//! encoding must be a pure function of the logical value:
//!
//! - **Sorted keys**: object keys are emitted in byte-lexicographic order
//! - **No whitespace** between tokens
//! - **Finite numbers only**: `NaN` and `±Infinity` are rejected; finite
//!   floats use the ECMAScript shortest round-trip format (RFC 8785 section
//!   3.2.2.3), integers are plain decimal
//! - **Minimal string escaping**: only `"`, `\` and U+0000..=U+001F
//! - **Plain structures only**: enum variants carrying data (an implicit type
//!   tag), raw bytes, 128-bit integers and non-string map keys have no
//!   canonical form
//! - **No silent drops**: a struct field skipped by `skip_serializing_if` is
//!   an absent value and fails the whole serialization
//! - **Bounded nesting**: at most [`MAX_DEPTH`] levels
//!
//! Any violation is a [`CanonicalError`]; nothing is ever best-effort encoded.
//!
//! # Example
//!
//! ```
//! use qs_gate::determinism::{canonicalize_json, to_canonical_string};
//! use serde_json::json;
//!
//! let canonical = to_canonical_string(&json!({"z": 1, "a": [true, null]})).unwrap();
//! assert_eq!(canonical, r#"{"a":[true,null],"z":1}"#);
//!
//! // The string-level entry point parses, validates and re-emits.
//! assert_eq!(canonicalize_json(r#"{ "b": 0.5, "a": 1e21 }"#).unwrap(), r#"{"a":1e+21,"b":0.5}"#);
//!
//! // Non-finite numbers are rejected.
//! assert!(to_canonical_string(&f64::NAN).is_err());
//! ```
//!
//! # Module Structure
//!
//! - `serializer`: `serde::Serializer` that builds a validated JSON value
//! - `emit`: canonical text emission from a validated value
//! - `number`: ECMAScript number formatting
//! - `canonicalize_json`: string-level canonicalization with duplicate-key
//!   detection

mod canonicalize_json;
mod emit;
mod number;
mod serializer;

use serde::Serialize;
use serde_json::Value;

pub use canonicalize_json::{canonicalize_json, is_canonical, parse_canonical};
pub use number::format_f64;
pub use serializer::CanonicalError;

/// Maximum nesting depth accepted by the canonicalizer.
///
/// Canonical text must re-parse with `serde_json`, including when a signed
/// body is stored inside a receipt envelope, so this stays well under the
/// parser's recursion limit.
pub const MAX_DEPTH: usize = 64;

/// `serde_json`'s parser recursion limit.
const PARSER_RECURSION_LIMIT: usize = 128;

const _: () = assert!(MAX_DEPTH * 2 <= PARSER_RECURSION_LIMIT);

/// A JSON value proven to have a canonical encoding.
///
/// The only way to obtain one is through [`to_canonical_value`] (or the
/// string parsers), so holding a `CanonicalJson` is evidence that the value
/// passed every canonicalization rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CanonicalJson {
    value: Value,
}

impl CanonicalJson {
    const fn new(value: Value) -> Self {
        Self { value }
    }

    /// Returns a reference to the inner value.
    #[must_use]
    pub const fn value(&self) -> &Value {
        &self.value
    }

    /// Consumes self and returns the inner value.
    #[must_use]
    pub fn into_value(self) -> Value {
        self.value
    }

    /// Produces the canonical text.
    #[must_use]
    pub fn to_canonical_string(&self) -> String {
        let mut output = String::new();
        emit::emit_value(&self.value, &mut output);
        output
    }
}

/// Converts any serializable value into a validated [`CanonicalJson`].
///
/// # Errors
///
/// Returns [`CanonicalError`] if the value, or any value nested inside it,
/// has no canonical representation.
pub fn to_canonical_value<T>(value: &T) -> Result<CanonicalJson, CanonicalError>
where
    T: ?Sized + Serialize,
{
    value
        .serialize(serializer::ValueSerializer::root())
        .map(CanonicalJson::new)
}

/// Serializes a value directly to its canonical text.
///
/// # Errors
///
/// Returns [`CanonicalError`] under the same conditions as
/// [`to_canonical_value`].
pub fn to_canonical_string<T>(value: &T) -> Result<String, CanonicalError>
where
    T: ?Sized + Serialize,
{
    to_canonical_value(value).map(|canonical| canonical.to_canonical_string())
}
