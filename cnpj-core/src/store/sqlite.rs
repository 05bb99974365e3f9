//! SQLite-backed record store.
//!
//! Every entity table is created up front from the static schemas. SQLite
//! serialises writers, so the store reports no concurrent-writer support and
//! load jobs run one at a time against it.

use std::{fmt, io, time::Duration};

use camino::{Utf8Path, Utf8PathBuf};
use rusqlite::{
    Connection, Error as SqliteError, params_from_iter,
    types::{ToSql, ToSqlOutput, Value as SqlValue},
};
use thiserror::Error;

use crate::{ColumnType, EntityKind, PrimaryKey, RecordSchema, TypedRecord, Value};

use super::{RecordSink, RecordStore, SinkError};

const BUSY_TIMEOUT: Duration = Duration::from_secs(30);

/// Errors raised while preparing the SQLite database.
#[derive(Debug, Error)]
pub enum SqliteStoreError {
    /// Failed to create the parent directory for the database file.
    #[error("failed to create parent directory for {path:?}")]
    CreateDirectory {
        /// Database path whose parent could not be created.
        path: Utf8PathBuf,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },
    /// Opening the SQLite database failed.
    #[error("failed to open SQLite database at {path:?}")]
    Open {
        /// Database path.
        path: Utf8PathBuf,
        /// Source error returned by `rusqlite`.
        #[source]
        source: SqliteError,
    },
    /// Creating an entity table failed.
    #[error("failed to create table {table}")]
    CreateTable {
        /// Table being created.
        table: &'static str,
        /// Source error returned by `rusqlite`.
        #[source]
        source: SqliteError,
    },
}

/// Record store backed by a SQLite database file.
///
/// # Examples
///
/// ```
/// use camino::Utf8PathBuf;
/// use cnpj_core::{RecordStore, SqliteStore};
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let dir = tempfile::tempdir()?;
/// let path = Utf8PathBuf::from_path_buf(dir.path().join("cnpj.sqlite3"))
///     .map_err(|_| "non UTF-8 temp dir")?;
/// let store = SqliteStore::initialise(&path)?;
/// assert!(!store.supports_concurrent_writers());
/// let tables: i64 = store.connect()?.query_row(
///     "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table'",
///     [],
///     |row| row.get(0),
/// )?;
/// assert_eq!(tables, 10);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct SqliteStore {
    path: Utf8PathBuf,
}

impl SqliteStore {
    /// Open or create the database at `path` and create every entity table.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError`] when the file cannot be created or a
    /// table definition is rejected.
    pub fn initialise(path: &Utf8Path) -> Result<Self, SqliteStoreError> {
        cnpj_fs::ensure_parent_dir(path).map_err(|source| SqliteStoreError::CreateDirectory {
            path: path.to_path_buf(),
            source,
        })?;
        let store = Self {
            path: path.to_path_buf(),
        };
        let connection = store.connect()?;
        for kind in EntityKind::ALL {
            let schema = RecordSchema::for_kind(kind);
            connection
                .execute_batch(&create_table_sql(schema))
                .map_err(|source| SqliteStoreError::CreateTable {
                    table: schema.table,
                    source,
                })?;
        }
        Ok(store)
    }

    /// Location of the database file.
    #[must_use]
    pub fn path(&self) -> &Utf8Path {
        &self.path
    }

    /// Open a fresh connection to the database.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError::Open`] when SQLite cannot open the file.
    pub fn connect(&self) -> Result<Connection, SqliteStoreError> {
        let open_error = |source| SqliteStoreError::Open {
            path: self.path.clone(),
            source,
        };
        let connection = Connection::open(self.path.as_std_path()).map_err(open_error)?;
        connection.busy_timeout(BUSY_TIMEOUT).map_err(open_error)?;
        Ok(connection)
    }
}

impl RecordStore for SqliteStore {
    type Sink = SqliteSink;

    fn supports_concurrent_writers(&self) -> bool {
        false
    }

    fn open_sink(&self) -> Result<SqliteSink, SinkError> {
        let connection = self
            .connect()
            .map_err(|source| SinkError::new("open SQLite sink", source))?;
        Ok(SqliteSink { connection })
    }
}

/// Sink writing through one dedicated SQLite connection.
///
/// Inserts open a transaction on demand; [`RecordSink::commit`] and
/// [`RecordSink::rollback`] close it.
pub struct SqliteSink {
    connection: Connection,
}

impl fmt::Debug for SqliteSink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SqliteSink")
            .field("in_transaction", &!self.connection.is_autocommit())
            .finish_non_exhaustive()
    }
}

impl SqliteSink {
    fn begin(&self) -> Result<(), SinkError> {
        if self.connection.is_autocommit() {
            self.connection
                .execute_batch("BEGIN")
                .map_err(|source| SinkError::new("begin transaction", source))?;
        }
        Ok(())
    }

    fn insert_all<'r, I>(&self, schema: &RecordSchema, records: I) -> Result<(), SqliteError>
    where
        I: IntoIterator<Item = &'r TypedRecord>,
    {
        let mut statement = self.connection.prepare_cached(&insert_sql(schema))?;
        for record in records {
            statement.execute(params_from_iter(record.values()))?;
        }
        Ok(())
    }
}

impl RecordSink for SqliteSink {
    fn insert_batch(
        &mut self,
        schema: &'static RecordSchema,
        records: &[TypedRecord],
    ) -> Result<(), SinkError> {
        self.begin()?;
        self.insert_all(schema, records)
            .map_err(|source| SinkError::new("insert batch", source))
    }

    fn insert_one(
        &mut self,
        schema: &'static RecordSchema,
        record: &TypedRecord,
    ) -> Result<(), SinkError> {
        self.begin()?;
        self.insert_all(schema, std::iter::once(record))
            .map_err(|source| SinkError::new("insert record", source))
    }

    fn commit(&mut self) -> Result<(), SinkError> {
        if self.connection.is_autocommit() {
            return Ok(());
        }
        self.connection
            .execute_batch("COMMIT")
            .map_err(|source| SinkError::new("commit", source))
    }

    fn rollback(&mut self) -> Result<(), SinkError> {
        if self.connection.is_autocommit() {
            return Ok(());
        }
        self.connection
            .execute_batch("ROLLBACK")
            .map_err(|source| SinkError::new("rollback", source))
    }
}

impl ToSql for Value {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        match self {
            Self::Null => Ok(ToSqlOutput::Owned(SqlValue::Null)),
            Self::Text(text) => Ok(ToSqlOutput::from(text.as_str())),
            Self::Integer(value) => Ok(ToSqlOutput::from(*value)),
            Self::Float(value) => Ok(ToSqlOutput::from(*value)),
            Self::Date(date) => date.to_sql(),
        }
    }
}

const fn sql_type(column_type: ColumnType) -> &'static str {
    match column_type {
        ColumnType::Text => "TEXT",
        ColumnType::Integer => "INTEGER",
        ColumnType::Real => "REAL",
        ColumnType::Date => "DATE",
    }
}

fn create_table_sql(schema: &RecordSchema) -> String {
    let mut definitions = Vec::with_capacity(schema.column_count() + 1);
    if schema.primary_key == PrimaryKey::Surrogate {
        definitions.push("id INTEGER PRIMARY KEY".to_owned());
    }
    for column in schema.columns {
        let key = if schema.primary_key == PrimaryKey::Column(column.name) {
            " PRIMARY KEY"
        } else {
            ""
        };
        definitions.push(format!(
            "{} {}{key}",
            column.name,
            sql_type(column.column_type())
        ));
    }
    format!(
        "CREATE TABLE IF NOT EXISTS {} ({})",
        schema.table,
        definitions.join(", ")
    )
}

fn insert_sql(schema: &RecordSchema) -> String {
    let columns: Vec<_> = schema.column_names().collect();
    let placeholders: Vec<_> = (1..=columns.len())
        .map(|position| format!("?{position}"))
        .collect();
    format!(
        "INSERT INTO {} ({}) VALUES ({})",
        schema.table,
        columns.join(", "),
        placeholders.join(", ")
    )
}
