//! String-level canonicalization.
//!
//! Parses JSON text, rejecting duplicate keys (which ordinary parsers
//! silently resolve last-wins), then re-emits it through the canonical
//! serializer. Used to verify stored receipts and to check idempotence.

use std::cell::RefCell;
use std::fmt;

use serde::de::{self, DeserializeSeed, Deserializer, MapAccess, SeqAccess, Visitor};
use serde_json::{Map, Number, Value};

use super::{CanonicalError, CanonicalJson, to_canonical_value};

/// Canonicalizes JSON text.
///
/// # Errors
///
/// Returns [`CanonicalError`] if the text is not valid JSON, contains a
/// duplicate key, or violates any canonicalization rule.
///
/// # Example
///
/// ```
/// use qs_gate::determinism::canonicalize_json;
///
/// let result = canonicalize_json(r#"{ "b": 1, "a": [2, 3] }"#).unwrap();
/// assert_eq!(result, r#"{"a":[2,3],"b":1}"#);
///
/// assert!(canonicalize_json(r#"{"a": 1, "a": 2}"#).is_err());
/// ```
pub fn canonicalize_json(input: &str) -> Result<String, CanonicalError> {
    parse_canonical(input).map(|canonical| canonical.to_canonical_string())
}

/// Parses and validates JSON text into a [`CanonicalJson`].
///
/// # Errors
///
/// Returns [`CanonicalError::ParseError`] for malformed text,
/// [`CanonicalError::DuplicateKey`] for repeated keys, and any other
/// variant the canonical serializer raises.
pub fn parse_canonical(input: &str) -> Result<CanonicalJson, CanonicalError> {
    let value = parse_with_duplicate_detection(input)?;
    to_canonical_value(&value)
}

/// Returns `true` if `input` is already byte-identical to its canonical form.
#[must_use]
pub fn is_canonical(input: &str) -> bool {
    canonicalize_json(input).is_ok_and(|canonical| canonical == input)
}

fn parse_with_duplicate_detection(input: &str) -> Result<Value, CanonicalError> {
    let duplicate = RefCell::new(None);
    let mut deserializer = serde_json::Deserializer::from_str(input);
    let parsed = StrictValue {
        path: "$".to_string(),
        duplicate: &duplicate,
    }
    .deserialize(&mut deserializer)
    .and_then(|value| deserializer.end().map(|()| value));

    parsed.map_err(|e| {
        duplicate.into_inner().unwrap_or_else(|| CanonicalError::ParseError {
            message: e.to_string(),
        })
    })
}

/// Parses one JSON value, tracking its location so a repeated key can be
/// reported where it occurs. Keys are compared after unescaping, so `"a"`
/// and `"\u0061"` collide.
struct StrictValue<'a> {
    path: String,
    duplicate: &'a RefCell<Option<CanonicalError>>,
}

impl StrictValue<'_> {
    fn child(&self, path: String) -> Self {
        Self {
            path,
            duplicate: self.duplicate,
        }
    }
}

impl<'de> DeserializeSeed<'de> for StrictValue<'_> {
    type Value = Value;

    fn deserialize<D>(self, deserializer: D) -> Result<Value, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_any(self)
    }
}

impl<'de> Visitor<'de> for StrictValue<'_> {
    type Value = Value;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "a JSON value at '{}'", self.path)
    }

    fn visit_unit<E>(self) -> Result<Value, E> {
        Ok(Value::Null)
    }

    fn visit_bool<E>(self, v: bool) -> Result<Value, E> {
        Ok(Value::Bool(v))
    }

    fn visit_i64<E>(self, v: i64) -> Result<Value, E> {
        Ok(v.into())
    }

    fn visit_u64<E>(self, v: u64) -> Result<Value, E> {
        Ok(v.into())
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<Value, E> {
        Number::from_f64(v)
            .map(Value::Number)
            .ok_or_else(|| E::custom(format_args!("non-finite number at '{}'", self.path)))
    }

    fn visit_str<E>(self, v: &str) -> Result<Value, E> {
        Ok(v.into())
    }

    fn visit_string<E>(self, v: String) -> Result<Value, E> {
        Ok(v.into())
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Value, A::Error> {
        let mut items = Vec::new();
        while let Some(item) =
            seq.next_element_seed(self.child(format!("{}[{}]", self.path, items.len())))?
        {
            items.push(item);
        }
        Ok(Value::Array(items))
    }

    fn visit_map<A: MapAccess<'de>>(self, mut entries: A) -> Result<Value, A::Error> {
        let mut object = Map::new();
        while let Some(key) = entries.next_key::<String>()? {
            if object.contains_key(&key) {
                let message = format!("duplicate key '{key}' at '{}'", self.path);
                *self.duplicate.borrow_mut() = Some(CanonicalError::DuplicateKey {
                    path: self.path.clone(),
                    key,
                });
                return Err(de::Error::custom(message));
            }
            let value = entries.next_value_seed(self.child(format!("{}.{key}", self.path)))?;
            object.insert(key, value);
        }
        Ok(Value::Object(object))
    }
}
