use std::collections::HashMap;

use crate::error::SqlMapperError;

/// One column of a result set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnInfo {
    pub name: String,
    pub ordinal: usize,
    /// Declared type as reported by the driver, if any.
    pub decl_type: Option<String>,
}

impl ColumnInfo {
    #[must_use]
    pub fn new(name: impl Into<String>, ordinal: usize, decl_type: Option<String>) -> Self {
        Self {
            name: name.into(),
            ordinal,
            decl_type,
        }
    }
}

/// Column name -> ordinal/declared type for one executed query.
///
/// Built once per execution and only read afterwards. When a result set repeats a column
/// name, the last occurrence wins.
#[derive(Debug, Clone, Default)]
pub struct ColumnSchema {
    columns: Vec<ColumnInfo>,
    by_name: HashMap<String, usize>,
}

impl ColumnSchema {
    pub fn new(columns: impl IntoIterator<Item = ColumnInfo>) -> Self {
        let columns: Vec<ColumnInfo> = columns.into_iter().collect();
        let by_name = columns
            .iter()
            .enumerate()
            .map(|(i, column)| (column.name.clone(), i))
            .collect();
        Self { columns, by_name }
    }

    /// Schema from bare column names, ordinals following iteration order.
    pub fn from_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(
            names
                .into_iter()
                .enumerate()
                .map(|(ordinal, name)| ColumnInfo::new(name, ordinal, None)),
        )
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&ColumnInfo> {
        self.by_name.get(name).map(|&i| &self.columns[i])
    }

    /// Resolve a column name to its ordinal.
    ///
    /// # Errors
    /// Returns `SqlMapperError::ColumnNotFound` when the name is not in this result set.
    pub fn ordinal(&self, name: &str) -> Result<usize, SqlMapperError> {
        self.get(name)
            .map(|column| column.ordinal)
            .ok_or_else(|| SqlMapperError::ColumnNotFound(name.to_owned()))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ColumnInfo> {
        self.columns.iter()
    }

    /// Column names in ordinal order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|c| c.name.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_ordinals_by_name() {
        let schema = ColumnSchema::from_names(["value", "id"]);
        assert_eq!(schema.ordinal("id").unwrap(), 1);
        assert_eq!(schema.ordinal("value").unwrap(), 0);
        assert_eq!(schema.len(), 2);
    }

    #[test]
    fn missing_column_is_reported_by_name() {
        let schema = ColumnSchema::from_names(["id"]);
        let err = schema.ordinal("created_at").unwrap_err();
        assert!(matches!(err, SqlMapperError::ColumnNotFound(ref c) if c == "created_at"));
        assert_eq!(
            err.to_string(),
            "Column [created_at] not present in the result set"
        );
    }

    #[test]
    fn duplicate_names_resolve_to_last_occurrence() {
        let schema = ColumnSchema::from_names(["id", "id"]);
        assert_eq!(schema.ordinal("id").unwrap(), 1);
        assert_eq!(schema.names().collect::<Vec<_>>(), vec!["id", "id"]);
    }
}
