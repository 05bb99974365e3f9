//! Typed values and records produced by the row transformer.

use chrono::NaiveDate;

use crate::{EntityKind, RecordSchema};

/// A single coerced field value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Missing or unparsable input.
    Null,
    /// Free text, stored as decoded.
    Text(String),
    /// Base-10 integer.
    Integer(i64),
    /// Decimal number.
    Float(f64),
    /// Calendar date.
    Date(NaiveDate),
}

impl Value {
    /// Whether the value is [`Value::Null`].
    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Borrow the text payload, if any.
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            _ => None,
        }
    }

    /// Return the integer payload, if any.
    #[must_use]
    pub const fn as_integer(&self) -> Option<i64> {
        match self {
            Self::Integer(value) => Some(*value),
            _ => None,
        }
    }

    /// Return the float payload, if any.
    #[must_use]
    pub const fn as_float(&self) -> Option<f64> {
        match self {
            Self::Float(value) => Some(*value),
            _ => None,
        }
    }

    /// Return the date payload, if any.
    #[must_use]
    pub const fn as_date(&self) -> Option<NaiveDate> {
        match self {
            Self::Date(value) => Some(*value),
            _ => None,
        }
    }
}

/// A row of coerced values aligned with a [`RecordSchema`].
///
/// Records are only built by [`crate::RowTransformer`], which guarantees one
/// value per schema column, so every record of a kind exposes the same keys.
#[derive(Debug, Clone, PartialEq)]
pub struct TypedRecord {
    schema: &'static RecordSchema,
    values: Vec<Value>,
}

impl TypedRecord {
    pub(crate) const fn new(schema: &'static RecordSchema, values: Vec<Value>) -> Self {
        Self { schema, values }
    }

    /// Schema describing this record.
    #[must_use]
    pub const fn schema(&self) -> &'static RecordSchema {
        self.schema
    }

    /// Entity kind the record belongs to.
    #[must_use]
    pub const fn entity_kind(&self) -> EntityKind {
        self.schema.entity_kind
    }

    /// Look up the value stored under `column`.
    #[must_use]
    pub fn get(&self, column: &str) -> Option<&Value> {
        self.schema
            .position(column)
            .and_then(|index| self.values.get(index))
    }

    /// Values in schema column order.
    #[must_use]
    pub fn values(&self) -> &[Value] {
        &self.values
    }

    /// Iterate over `(column, value)` pairs in schema order.
    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &Value)> + '_ {
        self.schema
            .columns
            .iter()
            .map(|column| column.name)
            .zip(self.values.iter())
    }
}
