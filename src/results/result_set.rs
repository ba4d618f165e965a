use std::sync::Arc;

use super::row::MemoryRow;
use crate::cursor::Cursor;
use crate::error::SqlMapperError;
use crate::schema::ColumnSchema;
use crate::types::RowValues;

/// An in-memory result set that can be walked as a [`Cursor`].
///
/// All rows share one column schema.
#[derive(Debug, Clone, Default)]
pub struct MemoryResultSet {
    schema: Arc<ColumnSchema>,
    rows: Vec<MemoryRow>,
    position: usize,
}

impl MemoryResultSet {
    /// Create an empty result set over `schema`
    #[must_use]
    pub fn new(schema: Arc<ColumnSchema>) -> Self {
        Self {
            schema,
            rows: Vec::new(),
            position: 0,
        }
    }

    /// Create an empty result set from bare column names
    pub fn with_columns<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(Arc::new(ColumnSchema::from_names(names)))
    }

    /// Add a row to the result set
    ///
    /// # Arguments
    ///
    /// * `row_values` - The values for this row, in ordinal order
    pub fn add_row_values(&mut self, row_values: Vec<RowValues>) {
        self.rows.push(MemoryRow::new(row_values));
    }

    /// Rows not yet handed out by [`Cursor::next_row`].
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.rows.len().saturating_sub(self.position)
    }

    #[must_use]
    pub fn rows(&self) -> &[MemoryRow] {
        &self.rows
    }

    /// Rewind so the rows can be walked again.
    pub fn rewind(&mut self) {
        self.position = 0;
    }
}

impl Cursor for MemoryResultSet {
    type Row<'r> = &'r MemoryRow;

    fn schema(&self) -> Arc<ColumnSchema> {
        Arc::clone(&self.schema)
    }

    fn next_row(&mut self) -> Result<Option<Self::Row<'_>>, SqlMapperError> {
        let row = self.rows.get(self.position);
        if row.is_some() {
            self.position += 1;
        }
        Ok(row)
    }
}
