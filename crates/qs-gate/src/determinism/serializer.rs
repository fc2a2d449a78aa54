//! A fail-closed `serde::Serializer` producing canonical JSON values.
//!
//! This mirrors `serde_json::value::Serializer` but refuses every construct
//! that has no unique canonical text, and records a JSON-path style location
//! (`$.payload.items[2]`) for diagnostics.

use std::fmt::Display;

use serde::ser::{self, Impossible, Serialize};
use serde_json::{Map, Number, Value};
use thiserror::Error;

use super::MAX_DEPTH;

/// Errors that can occur during canonical serialization.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum CanonicalError {
    /// A `NaN` or infinite floating-point number was encountered.
    #[error("non-finite number at '{path}' is not canonicalizable")]
    NonFiniteNumber {
        /// Location of the offending value.
        path: String,
        /// Rendering of the value (`NaN`, `inf`, `-inf`).
        value: String,
    },

    /// A value of a type with no canonical representation.
    #[error("unsupported type '{kind}' at '{path}' is not canonicalizable")]
    UnsupportedType {
        /// Location of the offending value.
        path: String,
        /// The serde data-model type that was rejected.
        kind: &'static str,
    },

    /// An enum variant carrying data, which would embed a type tag.
    #[error("non-plain structure at '{path}': variant {name}::{variant} carries a type tag")]
    NonPlainStructure {
        /// Location of the offending value.
        path: String,
        /// The enum name.
        name: &'static str,
        /// The variant name.
        variant: &'static str,
    },

    /// A struct field was skipped instead of serialized.
    #[error("absent value for field '{field}' at '{path}' is not canonicalizable")]
    AbsentField {
        /// Location of the enclosing structure.
        path: String,
        /// The skipped field.
        field: &'static str,
    },

    /// A map key that does not serialize as a string.
    #[error("map key at '{path}' is not a string")]
    NonStringKey {
        /// Location of the enclosing map.
        path: String,
    },

    /// A key appeared more than once in one object.
    #[error("duplicate key: '{key}' appears multiple times at '{path}'")]
    DuplicateKey {
        /// Location of the enclosing object.
        path: String,
        /// The duplicated key.
        key: String,
    },

    /// The structure is nested deeper than [`MAX_DEPTH`].
    #[error("max depth exceeded: structure nested deeper than {max_depth} levels")]
    MaxDepthExceeded {
        /// The limit that was exceeded.
        max_depth: usize,
    },

    /// Input text could not be parsed as JSON.
    #[error("JSON parse error: {message}")]
    ParseError {
        /// Description of the parse error.
        message: String,
    },

    /// A `Serialize` implementation reported its own error.
    #[error("serialization failed: {message}")]
    Custom {
        /// The implementation's message.
        message: String,
    },
}

impl CanonicalError {
    /// Structured diagnostics for refusal records.
    #[must_use]
    pub fn details(&self) -> Value {
        let mut details = Map::new();
        details.insert("error".into(), Value::String(self.to_string()));
        match self {
            Self::NonFiniteNumber { path, value } => {
                details.insert("path".into(), path.clone().into());
                details.insert("value".into(), value.clone().into());
            },
            Self::UnsupportedType { path, kind } => {
                details.insert("path".into(), path.clone().into());
                details.insert("type".into(), (*kind).into());
            },
            Self::NonPlainStructure {
                path,
                name,
                variant,
            } => {
                details.insert("path".into(), path.clone().into());
                details.insert("type".into(), format!("{name}::{variant}").into());
            },
            Self::AbsentField { path, field } => {
                details.insert("path".into(), path.clone().into());
                details.insert("key".into(), (*field).into());
            },
            Self::NonStringKey { path } => {
                details.insert("path".into(), path.clone().into());
            },
            Self::DuplicateKey { path, key } => {
                details.insert("path".into(), path.clone().into());
                details.insert("key".into(), key.clone().into());
            },
            Self::MaxDepthExceeded { max_depth } => {
                details.insert("maxDepth".into(), (*max_depth).into());
            },
            Self::ParseError { .. } | Self::Custom { .. } => {},
        }
        Value::Object(details)
    }
}

impl ser::Error for CanonicalError {
    fn custom<T: Display>(msg: T) -> Self {
        Self::Custom {
            message: msg.to_string(),
        }
    }
}

/// Serializer for a single value at a known location.
pub(super) struct ValueSerializer {
    path: String,
    depth: usize,
}

impl ValueSerializer {
    pub(super) fn root() -> Self {
        Self {
            path: "$".to_string(),
            depth: 0,
        }
    }

    fn child(&self, path: String) -> Result<Self, CanonicalError> {
        let depth = self.depth + 1;
        if depth > MAX_DEPTH {
            return Err(CanonicalError::MaxDepthExceeded {
                max_depth: MAX_DEPTH,
            });
        }
        Ok(Self { path, depth })
    }

    fn unsupported(self, kind: &'static str) -> CanonicalError {
        CanonicalError::UnsupportedType {
            path: self.path,
            kind,
        }
    }

    fn non_plain(self, name: &'static str, variant: &'static str) -> CanonicalError {
        CanonicalError::NonPlainStructure {
            path: self.path,
            name,
            variant,
        }
    }

    fn object(self) -> Result<SerializeObject, CanonicalError> {
        // The container itself must leave room for one more level of children.
        self.child(String::new())?;
        Ok(SerializeObject {
            map: Map::new(),
            pending_key: None,
            parent: self,
        })
    }

    fn array(self, len: Option<usize>) -> Result<SerializeArray, CanonicalError> {
        self.child(String::new())?;
        Ok(SerializeArray {
            items: Vec::with_capacity(len.unwrap_or(0)),
            parent: self,
        })
    }
}

macro_rules! plain_integer {
    ($($method:ident($ty:ty);)*) => {
        $(
            fn $method(self, v: $ty) -> Result<Value, CanonicalError> {
                Ok(Value::from(v))
            }
        )*
    };
}

impl ser::Serializer for ValueSerializer {
    type Ok = Value;
    type Error = CanonicalError;

    type SerializeSeq = SerializeArray;
    type SerializeTuple = SerializeArray;
    type SerializeTupleStruct = SerializeArray;
    type SerializeTupleVariant = Impossible<Value, CanonicalError>;
    type SerializeMap = SerializeObject;
    type SerializeStruct = SerializeObject;
    type SerializeStructVariant = Impossible<Value, CanonicalError>;

    fn serialize_bool(self, v: bool) -> Result<Value, CanonicalError> {
        Ok(Value::Bool(v))
    }

    plain_integer! {
        serialize_i8(i8);
        serialize_i16(i16);
        serialize_i32(i32);
        serialize_i64(i64);
        serialize_u8(u8);
        serialize_u16(u16);
        serialize_u32(u32);
        serialize_u64(u64);
    }

    fn serialize_i128(self, _v: i128) -> Result<Value, CanonicalError> {
        Err(self.unsupported("i128"))
    }

    fn serialize_u128(self, _v: u128) -> Result<Value, CanonicalError> {
        Err(self.unsupported("u128"))
    }

    fn serialize_f32(self, v: f32) -> Result<Value, CanonicalError> {
        self.serialize_f64(f64::from(v))
    }

    fn serialize_f64(self, v: f64) -> Result<Value, CanonicalError> {
        Number::from_f64(v)
            .map(Value::Number)
            .ok_or_else(|| CanonicalError::NonFiniteNumber {
                path: self.path,
                value: v.to_string(),
            })
    }

    fn serialize_char(self, v: char) -> Result<Value, CanonicalError> {
        Ok(Value::String(v.to_string()))
    }

    fn serialize_str(self, v: &str) -> Result<Value, CanonicalError> {
        Ok(Value::String(v.to_owned()))
    }

    fn serialize_bytes(self, _v: &[u8]) -> Result<Value, CanonicalError> {
        Err(self.unsupported("bytes"))
    }

    fn serialize_none(self) -> Result<Value, CanonicalError> {
        Ok(Value::Null)
    }

    fn serialize_some<T>(self, value: &T) -> Result<Value, CanonicalError>
    where
        T: ?Sized + Serialize,
    {
        value.serialize(self)
    }

    fn serialize_unit(self) -> Result<Value, CanonicalError> {
        Ok(Value::Null)
    }

    fn serialize_unit_struct(self, _name: &'static str) -> Result<Value, CanonicalError> {
        Ok(Value::Null)
    }

    fn serialize_unit_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        variant: &'static str,
    ) -> Result<Value, CanonicalError> {
        Ok(Value::String(variant.to_owned()))
    }

    fn serialize_newtype_struct<T>(
        self,
        _name: &'static str,
        value: &T,
    ) -> Result<Value, CanonicalError>
    where
        T: ?Sized + Serialize,
    {
        value.serialize(self)
    }

    fn serialize_newtype_variant<T>(
        self,
        name: &'static str,
        _variant_index: u32,
        variant: &'static str,
        _value: &T,
    ) -> Result<Value, CanonicalError>
    where
        T: ?Sized + Serialize,
    {
        Err(self.non_plain(name, variant))
    }

    fn serialize_seq(self, len: Option<usize>) -> Result<SerializeArray, CanonicalError> {
        self.array(len)
    }

    fn serialize_tuple(self, len: usize) -> Result<SerializeArray, CanonicalError> {
        self.array(Some(len))
    }

    fn serialize_tuple_struct(
        self,
        _name: &'static str,
        len: usize,
    ) -> Result<SerializeArray, CanonicalError> {
        self.array(Some(len))
    }

    fn serialize_tuple_variant(
        self,
        name: &'static str,
        _variant_index: u32,
        variant: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeTupleVariant, CanonicalError> {
        Err(self.non_plain(name, variant))
    }

    fn serialize_map(self, _len: Option<usize>) -> Result<SerializeObject, CanonicalError> {
        self.object()
    }

    fn serialize_struct(
        self,
        _name: &'static str,
        _len: usize,
    ) -> Result<SerializeObject, CanonicalError> {
        self.object()
    }

    fn serialize_struct_variant(
        self,
        name: &'static str,
        _variant_index: u32,
        variant: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeStructVariant, CanonicalError> {
        Err(self.non_plain(name, variant))
    }
}

/// In-progress sequence.
pub(super) struct SerializeArray {
    items: Vec<Value>,
    parent: ValueSerializer,
}

impl SerializeArray {
    fn push<T>(&mut self, value: &T) -> Result<(), CanonicalError>
    where
        T: ?Sized + Serialize,
    {
        let path = format!("{}[{}]", self.parent.path, self.items.len());
        let item = value.serialize(self.parent.child(path)?)?;
        self.items.push(item);
        Ok(())
    }
}

macro_rules! array_impl {
    ($($trait:ident::$method:ident;)*) => {
        $(
            impl ser::$trait for SerializeArray {
                type Ok = Value;
                type Error = CanonicalError;

                fn $method<T>(&mut self, value: &T) -> Result<(), CanonicalError>
                where
                    T: ?Sized + Serialize,
                {
                    self.push(value)
                }

                fn end(self) -> Result<Value, CanonicalError> {
                    Ok(Value::Array(self.items))
                }
            }
        )*
    };
}

array_impl! {
    SerializeSeq::serialize_element;
    SerializeTuple::serialize_element;
    SerializeTupleStruct::serialize_field;
}

/// In-progress map or struct.
pub(super) struct SerializeObject {
    map: Map<String, Value>,
    pending_key: Option<String>,
    parent: ValueSerializer,
}

impl SerializeObject {
    fn insert<T>(&mut self, key: String, value: &T) -> Result<(), CanonicalError>
    where
        T: ?Sized + Serialize,
    {
        if self.map.contains_key(&key) {
            return Err(CanonicalError::DuplicateKey {
                path: self.parent.path.clone(),
                key,
            });
        }
        let path = format!("{}.{key}", self.parent.path);
        let value = value.serialize(self.parent.child(path)?)?;
        self.map.insert(key, value);
        Ok(())
    }
}

impl ser::SerializeMap for SerializeObject {
    type Ok = Value;
    type Error = CanonicalError;

    fn serialize_key<T>(&mut self, key: &T) -> Result<(), CanonicalError>
    where
        T: ?Sized + Serialize,
    {
        let key = key.serialize(KeySerializer {
            path: &self.parent.path,
        })?;
        self.pending_key = Some(key);
        Ok(())
    }

    fn serialize_value<T>(&mut self, value: &T) -> Result<(), CanonicalError>
    where
        T: ?Sized + Serialize,
    {
        let key = self
            .pending_key
            .take()
            .ok_or_else(|| <CanonicalError as ser::Error>::custom("map value without key"))?;
        self.insert(key, value)
    }

    fn end(self) -> Result<Value, CanonicalError> {
        Ok(Value::Object(self.map))
    }
}

impl ser::SerializeStruct for SerializeObject {
    type Ok = Value;
    type Error = CanonicalError;

    fn serialize_field<T>(&mut self, key: &'static str, value: &T) -> Result<(), CanonicalError>
    where
        T: ?Sized + Serialize,
    {
        self.insert(key.to_owned(), value)
    }

    fn skip_field(&mut self, key: &'static str) -> Result<(), CanonicalError> {
        Err(CanonicalError::AbsentField {
            path: self.parent.path.clone(),
            field: key,
        })
    }

    fn end(self) -> Result<Value, CanonicalError> {
        Ok(Value::Object(self.map))
    }
}

/// Accepts only keys that are strings in the serde data model.
struct KeySerializer<'a> {
    path: &'a str,
}

impl KeySerializer<'_> {
    fn reject(&self) -> CanonicalError {
        CanonicalError::NonStringKey {
            path: self.path.to_owned(),
        }
    }
}

macro_rules! reject_key {
    ($($method:ident($($arg:ty),*) -> $ok:ty;)*) => {
        $(
            fn $method(self, $(_: $arg),*) -> Result<$ok, CanonicalError> {
                Err(self.reject())
            }
        )*
    };
}

impl ser::Serializer for KeySerializer<'_> {
    type Ok = String;
    type Error = CanonicalError;

    type SerializeSeq = Impossible<String, CanonicalError>;
    type SerializeTuple = Impossible<String, CanonicalError>;
    type SerializeTupleStruct = Impossible<String, CanonicalError>;
    type SerializeTupleVariant = Impossible<String, CanonicalError>;
    type SerializeMap = Impossible<String, CanonicalError>;
    type SerializeStruct = Impossible<String, CanonicalError>;
    type SerializeStructVariant = Impossible<String, CanonicalError>;

    reject_key! {
        serialize_bool(bool) -> String;
        serialize_i8(i8) -> String;
        serialize_i16(i16) -> String;
        serialize_i32(i32) -> String;
        serialize_i64(i64) -> String;
        serialize_i128(i128) -> String;
        serialize_u8(u8) -> String;
        serialize_u16(u16) -> String;
        serialize_u32(u32) -> String;
        serialize_u64(u64) -> String;
        serialize_u128(u128) -> String;
        serialize_f32(f32) -> String;
        serialize_f64(f64) -> String;
        serialize_bytes(&[u8]) -> String;
        serialize_none() -> String;
        serialize_unit() -> String;
        serialize_unit_struct(&'static str) -> String;
        serialize_seq(Option<usize>) -> Self::SerializeSeq;
        serialize_tuple(usize) -> Self::SerializeTuple;
        serialize_tuple_struct(&'static str, usize) -> Self::SerializeTupleStruct;
        serialize_tuple_variant(&'static str, u32, &'static str, usize) -> Self::SerializeTupleVariant;
        serialize_map(Option<usize>) -> Self::SerializeMap;
        serialize_struct(&'static str, usize) -> Self::SerializeStruct;
        serialize_struct_variant(&'static str, u32, &'static str, usize) -> Self::SerializeStructVariant;
    }

    fn serialize_char(self, v: char) -> Result<String, CanonicalError> {
        Ok(v.to_string())
    }

    fn serialize_str(self, v: &str) -> Result<String, CanonicalError> {
        Ok(v.to_owned())
    }

    fn serialize_some<T>(self, _value: &T) -> Result<String, CanonicalError>
    where
        T: ?Sized + Serialize,
    {
        Err(self.reject())
    }

    fn serialize_unit_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        variant: &'static str,
    ) -> Result<String, CanonicalError> {
        Ok(variant.to_owned())
    }

    fn serialize_newtype_struct<T>(
        self,
        _name: &'static str,
        value: &T,
    ) -> Result<String, CanonicalError>
    where
        T: ?Sized + Serialize,
    {
        value.serialize(self)
    }

    fn serialize_newtype_variant<T>(
        self,
        _name: &'static str,
        _variant_index: u32,
        _variant: &'static str,
        _value: &T,
    ) -> Result<String, CanonicalError>
    where
        T: ?Sized + Serialize,
    {
        Err(self.reject())
    }
}
