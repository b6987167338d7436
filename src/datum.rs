//! Scalar types and values.
//!
//! This module defines the engine's type system and value representation.
//! [`Type`] names the three supported scalar types, and [`Value`] is a
//! single typed column value with parsing, comparison, and on-disk
//! serialization support.

use std::cmp::Ordering;
use std::fmt;

use bytes::BufMut;
use serde::{Deserialize, Serialize};

use crate::codec::{self, CodecError};

/// Errors from schema-driven value handling.
#[derive(Debug)]
pub enum SchemaError {
    /// Row arity differs from the column count.
    ArityMismatch {
        /// Columns declared by the schema.
        expected: usize,
        /// Fields actually present.
        actual: usize,
    },
    /// A string field failed to parse as the declared type.
    Unparseable {
        /// Declared column type.
        ty: Type,
        /// Offending input field.
        field: String,
    },
    /// A value does not conform to the declared type.
    TypeMismatch {
        /// Declared column type.
        expected: Type,
        /// Type of the offending value.
        actual: Type,
    },
    /// A string value exceeds the encodable length.
    StringTooLong(usize),
}

impl fmt::Display for SchemaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SchemaError::ArityMismatch { expected, actual } => {
                write!(f, "expected {} columns, got {}", expected, actual)
            }
            SchemaError::Unparseable { ty, field } => {
                write!(f, "cannot parse {:?} as {}", field, ty)
            }
            SchemaError::TypeMismatch { expected, actual } => {
                write!(f, "expected a {} value, got {}", expected, actual)
            }
            SchemaError::StringTooLong(len) => {
                write!(
                    f,
                    "string of {} bytes exceeds the {}-byte limit",
                    len,
                    codec::MAX_STRING_LEN
                )
            }
        }
    }
}

impl std::error::Error for SchemaError {}

/// Scalar column type.
///
/// Serializes as its schema name (`"STRING"`, `"INT"`, `"FLOAT"`), which
/// is the representation used by the catalog document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Type {
    /// UTF-8 string, at most 255 encoded bytes.
    String,
    /// 32-bit signed integer.
    Int,
    /// IEEE-754 32-bit float.
    Float,
}

impl Type {
    /// Parses a string field into a value of this type.
    ///
    /// # Errors
    ///
    /// Returns `SchemaError::Unparseable` if the field is not a valid
    /// literal for the type.
    pub fn parse(self, field: &str) -> Result<Value, SchemaError> {
        match self {
            Type::String => Ok(Value::String(field.to_string())),
            Type::Int => field
                .parse::<i32>()
                .map(Value::Int)
                .map_err(|_| SchemaError::Unparseable {
                    ty: self,
                    field: field.to_string(),
                }),
            Type::Float => field
                .parse::<f32>()
                .map(Value::Float)
                .map_err(|_| SchemaError::Unparseable {
                    ty: self,
                    field: field.to_string(),
                }),
        }
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Type::String => "STRING",
            Type::Int => "INT",
            Type::Float => "FLOAT",
        };
        write!(f, "{}", name)
    }
}

/// A typed column value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// UTF-8 string.
    String(String),
    /// 32-bit signed integer.
    Int(i32),
    /// 32-bit float.
    Float(f32),
}

impl Value {
    /// Returns the type of this value.
    pub fn ty(&self) -> Type {
        match self {
            Value::String(_) => Type::String,
            Value::Int(_) => Type::Int,
            Value::Float(_) => Type::Float,
        }
    }

    /// Returns the encoded size in bytes.
    ///
    /// Strings include the one-byte length prefix; `INT` and `FLOAT` are
    /// four bytes each.
    pub fn encoded_size(&self) -> usize {
        match self {
            Value::String(s) => 1 + s.len(),
            Value::Int(_) | Value::Float(_) => 4,
        }
    }

    /// Appends this value's big-endian encoding to `dst`.
    ///
    /// # Errors
    ///
    /// Returns `CodecError::StringTooLong` for strings over 255 bytes.
    pub fn encode(&self, dst: &mut impl BufMut) -> Result<(), CodecError> {
        match self {
            Value::String(s) => codec::put_string(dst, s),
            Value::Int(n) => {
                codec::put_i32(dst, *n);
                Ok(())
            }
            Value::Float(n) => {
                codec::put_f32(dst, *n);
                Ok(())
            }
        }
    }

    /// Decodes a value of type `ty` from the start of `buf`.
    ///
    /// Returns the value and the number of bytes consumed.
    pub fn decode(buf: &[u8], ty: Type) -> Result<(Self, usize), CodecError> {
        match ty {
            Type::String => {
                let (s, consumed) = codec::get_string(buf)?;
                Ok((Value::String(s), consumed))
            }
            Type::Int => {
                let (n, consumed) = codec::get_i32(buf)?;
                Ok((Value::Int(n), consumed))
            }
            Type::Float => {
                let (n, consumed) = codec::get_f32(buf)?;
                Ok((Value::Float(n), consumed))
            }
        }
    }

    /// Compares two values, coercing across the numeric types.
    ///
    /// Strings compare in UTF-8 code-point order, numbers numerically.
    /// Returns `None` for a string/number pair, which predicate
    /// evaluation reports as a type mismatch.
    pub fn compare(&self, other: &Value) -> Option<Ordering> {
        match (self, other) {
            (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
            (Value::Int(a), Value::Int(b)) => Some(a.cmp(b)),
            (Value::Float(a), Value::Float(b)) => Some(a.total_cmp(b)),
            (Value::Int(a), Value::Float(b)) => Some((*a as f32).total_cmp(b)),
            (Value::Float(a), Value::Int(b)) => Some(a.total_cmp(&(*b as f32))),
            _ => None,
        }
    }

    /// Total order used for sort keys.
    ///
    /// Agrees with [`compare`](Self::compare) wherever that is defined;
    /// mixed string/number pairs order by type tag so that sorting never
    /// fails mid-stream.
    pub fn total_order(&self, other: &Value) -> Ordering {
        self.compare(other)
            .unwrap_or_else(|| type_rank(self.ty()).cmp(&type_rank(other.ty())))
    }
}

fn type_rank(ty: Type) -> u8 {
    match ty {
        Type::Int => 0,
        Type::Float => 1,
        Type::String => 2,
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::String(s) => write!(f, "{}", s),
            Value::Int(n) => write!(f, "{}", n),
            Value::Float(n) => write!(f, "{}", n),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::BytesMut;

    #[test]
    fn test_parse() {
        assert_eq!(
            Type::String.parse("Athens").unwrap(),
            Value::String("Athens".into())
        );
        assert_eq!(Type::Int.parse("-42").unwrap(), Value::Int(-42));
        assert_eq!(Type::Float.parse("2.5").unwrap(), Value::Float(2.5));
    }

    #[test]
    fn test_parse_rejects_bad_literals() {
        assert!(matches!(
            Type::Int.parse("forty"),
            Err(SchemaError::Unparseable { ty: Type::Int, .. })
        ));
        assert!(matches!(
            Type::Float.parse("1.2.3"),
            Err(SchemaError::Unparseable { ty: Type::Float, .. })
        ));
    }

    #[test]
    fn test_encode_decode_roundtrip() {
        let values = [
            Value::String(String::new()),
            Value::String("hello".into()),
            Value::Int(0),
            Value::Int(i32::MIN),
            Value::Float(std::f32::consts::PI),
        ];
        for value in values {
            let mut buf = BytesMut::new();
            value.encode(&mut buf).unwrap();
            assert_eq!(buf.len(), value.encoded_size());
            let (parsed, consumed) = Value::decode(&buf, value.ty()).unwrap();
            assert_eq!(parsed, value);
            assert_eq!(consumed, buf.len());
        }
    }

    #[test]
    fn test_compare_numeric_coercion() {
        assert_eq!(
            Value::Int(2).compare(&Value::Float(2.5)),
            Some(Ordering::Less)
        );
        assert_eq!(
            Value::Float(3.0).compare(&Value::Int(3)),
            Some(Ordering::Equal)
        );
        assert_eq!(Value::String("a".into()).compare(&Value::Int(1)), None);
    }

    #[test]
    fn test_total_order_is_total() {
        let mut values = vec![
            Value::String("b".into()),
            Value::Int(10),
            Value::Float(1.5),
            Value::String("a".into()),
            Value::Int(-1),
        ];
        values.sort_by(|a, b| a.total_order(b));
        assert_eq!(
            values,
            vec![
                Value::Int(-1),
                Value::Float(1.5),
                Value::Int(10),
                Value::String("a".into()),
                Value::String("b".into()),
            ]
        );
    }

    #[test]
    fn test_type_serde_names() {
        let json = serde_json::to_string(&vec![Type::String, Type::Int, Type::Float]).unwrap();
        assert_eq!(json, r#"["STRING","INT","FLOAT"]"#);
        let parsed: Vec<Type> = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, vec![Type::String, Type::Int, Type::Float]);
    }
}
