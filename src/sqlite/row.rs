use std::sync::Arc;

use rusqlite::types::{FromSql, ValueRef};
use rusqlite::{Row, Rows, Statement};

use crate::cursor::Cursor;
use crate::datum::PrimitiveKind;
use crate::error::SqlMapperError;
use crate::row::DataRow;
use crate::schema::{ColumnInfo, ColumnSchema};
use crate::types::RowValues;

/// Column schema of a prepared statement, with declared types where `SQLite` knows them.
#[must_use]
pub fn schema_from_statement(stmt: &Statement<'_>) -> ColumnSchema {
    ColumnSchema::new(stmt.columns().iter().enumerate().map(|(ordinal, column)| {
        ColumnInfo::new(
            column.name(),
            ordinal,
            column.decl_type().map(str::to_owned),
        )
    }))
}

/// Convert a borrowed `SQLite` value into a `RowValues`.
///
/// # Errors
/// Returns `SqlMapperError::TypeMismatch` for TEXT that is not valid UTF-8.
pub fn sqlite_value_to_row_value(value: ValueRef<'_>) -> Result<RowValues, SqlMapperError> {
    Ok(match value {
        ValueRef::Null => RowValues::Null,
        ValueRef::Integer(i) => RowValues::Int(i),
        ValueRef::Real(f) => RowValues::Float(f),
        ValueRef::Text(bytes) => RowValues::Text(
            std::str::from_utf8(bytes)
                .map_err(|e| SqlMapperError::TypeMismatch(format!("invalid UTF-8 in TEXT: {e}")))?
                .to_owned(),
        ),
        ValueRef::Blob(bytes) => RowValues::Blob(bytes.to_vec()),
    })
}

fn native<T: FromSql>(row: &Row<'_>, ordinal: usize, kind: PrimitiveKind) -> Result<T, SqlMapperError> {
    row.get::<_, T>(ordinal).map_err(|err| match err {
        rusqlite::Error::InvalidColumnType(_, name, found) => SqlMapperError::TypeMismatch(
            format!("column [{name}]: expected {kind}, found {found}"),
        ),
        rusqlite::Error::IntegralValueOutOfRange(_, value) => SqlMapperError::TypeMismatch(
            format!("column {ordinal}: {value} does not fit in {kind}"),
        ),
        rusqlite::Error::FromSqlConversionFailure(_, found, cause) => SqlMapperError::TypeMismatch(
            format!("column {ordinal}: cannot read {found} as {kind}: {cause}"),
        ),
        other => SqlMapperError::SqliteError(other),
    })
}

impl DataRow for Row<'_> {
    fn get_value(&self, ordinal: usize) -> Result<RowValues, SqlMapperError> {
        sqlite_value_to_row_value(self.get_ref(ordinal)?)
    }

    fn get_bool(&self, ordinal: usize) -> Result<bool, SqlMapperError> {
        native(self, ordinal, PrimitiveKind::Bool)
    }

    fn get_i16(&self, ordinal: usize) -> Result<i16, SqlMapperError> {
        native(self, ordinal, PrimitiveKind::I16)
    }

    fn get_i32(&self, ordinal: usize) -> Result<i32, SqlMapperError> {
        native(self, ordinal, PrimitiveKind::I32)
    }

    fn get_i64(&self, ordinal: usize) -> Result<i64, SqlMapperError> {
        native(self, ordinal, PrimitiveKind::I64)
    }

    fn get_f32(&self, ordinal: usize) -> Result<f32, SqlMapperError> {
        native(self, ordinal, PrimitiveKind::F32)
    }

    fn get_f64(&self, ordinal: usize) -> Result<f64, SqlMapperError> {
        native(self, ordinal, PrimitiveKind::F64)
    }

    fn get_u8(&self, ordinal: usize) -> Result<u8, SqlMapperError> {
        native(self, ordinal, PrimitiveKind::U8)
    }

    fn get_string(&self, ordinal: usize) -> Result<String, SqlMapperError> {
        native(self, ordinal, PrimitiveKind::Text)
    }
}

/// A [`Cursor`] over the rows of an executing `SQLite` statement.
pub struct SqliteCursor<'stmt> {
    rows: Rows<'stmt>,
    schema: Arc<ColumnSchema>,
}

impl<'stmt> SqliteCursor<'stmt> {
    #[must_use]
    pub fn new(rows: Rows<'stmt>, schema: Arc<ColumnSchema>) -> Self {
        Self { rows, schema }
    }
}

impl<'stmt> Cursor for SqliteCursor<'stmt> {
    type Row<'r>
        = &'r Row<'stmt>
    where
        Self: 'r;

    fn schema(&self) -> Arc<ColumnSchema> {
        Arc::clone(&self.schema)
    }

    fn next_row(&mut self) -> Result<Option<Self::Row<'_>>, SqlMapperError> {
        Ok(self.rows.next()?)
    }
}
