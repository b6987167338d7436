//! Positional rows and column-name resolution.
//!
//! A [`Row`] is an ordered vector of [`Value`]s whose arity always equals
//! the table's column count. A [`ColumnIndex`] maps column names to tuple
//! positions; its insertion order is the column order, so iterating the
//! names reproduces the positional layout.

use crate::datum::{SchemaError, Type, Value};

/// A row of column values.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    /// Column values in order.
    pub values: Vec<Value>,
}

impl Row {
    /// Creates a new row with the given values.
    pub fn new(values: Vec<Value>) -> Self {
        Self { values }
    }

    /// Returns the number of columns.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns true if the row has no columns.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Returns the encoded size of this row in bytes.
    pub fn encoded_size(&self) -> usize {
        self.values.iter().map(Value::encoded_size).sum()
    }

    /// Checks this row against a schema, type by type.
    ///
    /// # Errors
    ///
    /// Returns `SchemaError::ArityMismatch` for a wrong column count,
    /// `SchemaError::TypeMismatch` for a wrong value type, and
    /// `SchemaError::StringTooLong` for an unencodable string.
    pub fn check_schema(&self, schema: &[Type]) -> Result<(), SchemaError> {
        if self.values.len() != schema.len() {
            return Err(SchemaError::ArityMismatch {
                expected: schema.len(),
                actual: self.values.len(),
            });
        }
        for (value, &ty) in self.values.iter().zip(schema) {
            if value.ty() != ty {
                return Err(SchemaError::TypeMismatch {
                    expected: ty,
                    actual: value.ty(),
                });
            }
            if let Value::String(s) = value {
                if s.len() > crate::codec::MAX_STRING_LEN {
                    return Err(SchemaError::StringTooLong(s.len()));
                }
            }
        }
        Ok(())
    }
}

/// Ordered mapping from column name to tuple position.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnIndex {
    names: Vec<String>,
}

impl ColumnIndex {
    /// Creates a column index from ordered names.
    pub fn new(names: Vec<String>) -> Self {
        Self { names }
    }

    /// Returns the position of `name`, if present.
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.names.iter().position(|n| n == name)
    }

    /// Returns true if `name` is a known column.
    pub fn contains(&self, name: &str) -> bool {
        self.index_of(name).is_some()
    }

    /// Returns the ordered column names.
    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Returns the number of columns.
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Returns true if there are no columns.
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

/// Converts a record of string fields into a typed row.
///
/// Fields are parsed positionally against `schema`.
///
/// # Errors
///
/// Returns `SchemaError::ArityMismatch` if the field count differs from
/// the schema, or `SchemaError::Unparseable` for a bad literal.
pub fn row_from_strings<S: AsRef<str>>(schema: &[Type], fields: &[S]) -> Result<Row, SchemaError> {
    if fields.len() != schema.len() {
        return Err(SchemaError::ArityMismatch {
            expected: schema.len(),
            actual: fields.len(),
        });
    }
    let values = schema
        .iter()
        .zip(fields)
        .map(|(&ty, field)| ty.parse(field.as_ref()))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Row::new(values))
}
