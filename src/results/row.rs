use crate::error::SqlMapperError;
use crate::row::DataRow;
use crate::types::RowValues;

/// A materialised row: one [`RowValues`] per column, in ordinal order.
///
/// Column names live in the [`ColumnSchema`](crate::schema::ColumnSchema) shared by the
/// result set, not in each row.
#[derive(Debug, Clone, PartialEq)]
pub struct MemoryRow {
    /// The values for this row
    pub values: Vec<RowValues>,
}

impl MemoryRow {
    /// Create a new row
    ///
    /// # Arguments
    ///
    /// * `values` - The column values, in ordinal order
    #[must_use]
    pub fn new(values: Vec<RowValues>) -> Self {
        Self { values }
    }

    /// Get a value from the row by column ordinal
    ///
    /// # Returns
    ///
    /// The value at the ordinal, or None if the ordinal is out of bounds
    #[must_use]
    pub fn get_by_index(&self, ordinal: usize) -> Option<&RowValues> {
        self.values.get(ordinal)
    }
}

impl DataRow for MemoryRow {
    fn get_value(&self, ordinal: usize) -> Result<RowValues, SqlMapperError> {
        self.values.get(ordinal).cloned().ok_or_else(|| {
            SqlMapperError::ExecutionError(format!(
                "ordinal {ordinal} out of range for a row of {} columns",
                self.values.len()
            ))
        })
    }
}

impl From<Vec<RowValues>> for MemoryRow {
    fn from(values: Vec<RowValues>) -> Self {
        Self::new(values)
    }
}
