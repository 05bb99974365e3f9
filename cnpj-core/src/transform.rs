//! Turning raw field lists into typed records.

use thiserror::Error;

use crate::{EntityKind, RecordSchema, TypedRecord};

/// A raw row did not carry the number of fields its entity kind requires.
///
/// The error is fatal for the file being loaded: a wrong width means the
/// tokenizer and the publisher disagree about the layout, so later rows
/// cannot be trusted either.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error(
    "{entity_kind} row {row_index} in {file} has {actual} fields but {expected} were expected"
)]
pub struct RowIntegrityError {
    /// Entity kind being loaded.
    pub entity_kind: EntityKind,
    /// Archive the row came from.
    pub file: String,
    /// Zero-based row index within the archive.
    pub row_index: u64,
    /// Column count required by the schema.
    pub expected: usize,
    /// Field count found in the row.
    pub actual: usize,
}

/// Maps raw rows of one entity kind onto its [`RecordSchema`].
///
/// # Examples
///
/// ```
/// use cnpj_core::{EntityKind, RowTransformer, Value};
///
/// let transformer = RowTransformer::for_kind(EntityKind::Pais);
/// let record = transformer
///     .transform("Paises.zip", 0, &["105", "BRASIL"])
///     .expect("two fields");
/// assert_eq!(record.get("codigo"), Some(&Value::Integer(105)));
/// assert_eq!(record.get("descricao"), Some(&Value::Text("BRASIL".into())));
/// ```
#[derive(Debug, Clone, Copy)]
pub struct RowTransformer {
    schema: &'static RecordSchema,
}

impl RowTransformer {
    /// Transformer for `kind`.
    #[must_use]
    pub const fn for_kind(kind: EntityKind) -> Self {
        Self {
            schema: RecordSchema::for_kind(kind),
        }
    }

    /// Schema the transformer produces records for.
    #[must_use]
    pub const fn schema(&self) -> &'static RecordSchema {
        self.schema
    }

    /// Field count every row must carry.
    #[must_use]
    pub const fn expected_column_count(&self) -> usize {
        self.schema.column_count()
    }

    /// Coerce `fields` into a record, rejecting rows of the wrong width.
    ///
    /// # Errors
    ///
    /// Returns [`RowIntegrityError`] when `fields.len()` differs from the
    /// schema's column count.
    pub fn transform<S>(
        &self,
        file: &str,
        row_index: u64,
        fields: &[S],
    ) -> Result<TypedRecord, RowIntegrityError>
    where
        S: AsRef<str>,
    {
        if fields.len() != self.expected_column_count() {
            return Err(RowIntegrityError {
                entity_kind: self.schema.entity_kind,
                file: file.to_owned(),
                row_index,
                expected: self.expected_column_count(),
                actual: fields.len(),
            });
        }
        let values = self
            .schema
            .columns
            .iter()
            .zip(fields)
            .map(|(column, raw)| column.coercion.apply(raw.as_ref()))
            .collect();
        Ok(TypedRecord::new(self.schema, values))
    }
}
