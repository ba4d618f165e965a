//! Driving a cursor through a read plan.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::accumulator::{ResultAccumulator, ResultList};
use crate::error::{CardinalityError, SqlMapperError};
use crate::plan::ReadPlan;
use crate::row::DataRow;
use crate::schema::ColumnSchema;

/// A forward-only sequence of rows produced by executing a query.
///
/// The schema is available before the first row. Each row borrows the cursor, so it must
/// be dropped before the next one is fetched.
pub trait Cursor {
    type Row<'r>: DataRow
    where
        Self: 'r;

    fn schema(&self) -> Arc<ColumnSchema>;

    /// Advance to the next row.
    ///
    /// # Errors
    /// Returns `SqlMapperError` if the underlying driver fails while stepping.
    fn next_row(&mut self) -> Result<Option<Self::Row<'_>>, SqlMapperError>;
}

fn check_cancelled(cancel: &CancellationToken) -> Result<(), SqlMapperError> {
    if cancel.is_cancelled() {
        Err(SqlMapperError::Cancelled)
    } else {
        Ok(())
    }
}

/// Map every remaining row, in cursor order.
///
/// Cancellation is checked before each row; a cancelled run discards what it collected.
///
/// # Errors
/// Returns `SqlMapperError::Cancelled` when `cancel` fires, or the first mapping error.
pub fn collect_records<T, C>(
    cursor: &mut C,
    plan: &ReadPlan<T>,
    cancel: &CancellationToken,
) -> Result<ResultList<T>, SqlMapperError>
where
    C: Cursor,
{
    let schema = cursor.schema();
    let mut acc = ResultAccumulator::new();
    loop {
        check_cancelled(cancel)?;
        let Some(row) = cursor.next_row()? else {
            break;
        };
        acc.push(plan.map_row(&row, &schema)?);
    }
    Ok(acc.freeze())
}

/// Map exactly one row.
///
/// # Errors
/// Returns `CardinalityError::NoResult` for an empty cursor and
/// `CardinalityError::MultipleResults` when a second row follows the first.
pub fn single_record<T, C>(
    cursor: &mut C,
    plan: &ReadPlan<T>,
    cancel: &CancellationToken,
) -> Result<T, SqlMapperError>
where
    C: Cursor,
{
    let schema = cursor.schema();
    check_cancelled(cancel)?;
    let first = match cursor.next_row()? {
        Some(row) => plan.map_row(&row, &schema)?,
        None => return Err(CardinalityError::NoResult(plan.type_name().to_owned()).into()),
    };
    check_cancelled(cancel)?;
    if cursor.next_row()?.is_some() {
        return Err(CardinalityError::MultipleResults(plan.type_name().to_owned()).into());
    }
    Ok(first)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::converter::ConverterRegistry;
    use crate::naming::SnakeCase;
    use crate::results::{MemoryResultSet, MemoryRow};
    use crate::types::RowValues;

    #[derive(Debug, PartialEq)]
    struct Foo {
        id: i64,
        value: String,
    }
    crate::impl_from_record!(Foo { id: i64, value: String });

    fn plan() -> ReadPlan<Foo> {
        ReadPlan::compile(&ConverterRegistry::default(), &SnakeCase).unwrap()
    }

    fn rows(n: i64) -> MemoryResultSet {
        let mut set = MemoryResultSet::with_columns(["id", "value"]);
        for i in 0..n {
            set.add_row_values(vec![RowValues::Int(i), RowValues::Text(format!("v{i}"))]);
        }
        set
    }

    #[test]
    fn collects_in_cursor_order() {
        let list = collect_records(&mut rows(40), &plan(), &CancellationToken::new()).unwrap();
        assert_eq!(list.len(), 40);
        assert_eq!(list[0], Foo { id: 0, value: "v0".into() });
        assert_eq!(list[39].value, "v39");
    }

    #[test]
    fn empty_cursor_collects_nothing() {
        let list = collect_records(&mut rows(0), &plan(), &CancellationToken::new()).unwrap();
        assert!(list.is_empty());
    }

    #[test]
    fn cancelled_token_stops_collection() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        let err = collect_records(&mut rows(3), &plan(), &cancel).unwrap_err();
        assert!(matches!(err, SqlMapperError::Cancelled));
    }

    /// Cancels the token once `cancel_at` rows have been handed out.
    struct CancelAfter {
        inner: MemoryResultSet,
        cancel: CancellationToken,
        cancel_at: usize,
        fetched: usize,
    }

    impl Cursor for CancelAfter {
        type Row<'r> = &'r MemoryRow;

        fn schema(&self) -> Arc<ColumnSchema> {
            self.inner.schema()
        }

        fn next_row(&mut self) -> Result<Option<Self::Row<'_>>, SqlMapperError> {
            self.fetched += 1;
            if self.fetched == self.cancel_at {
                self.cancel.cancel();
            }
            self.inner.next_row()
        }
    }

    #[test]
    fn cancellation_mid_iteration_stops_and_discards_rows() {
        let cancel = CancellationToken::new();
        let mut cursor = CancelAfter {
            inner: rows(10),
            cancel: cancel.clone(),
            cancel_at: 3,
            fetched: 0,
        };
        let err = collect_records(&mut cursor, &plan(), &cancel).unwrap_err();
        assert!(matches!(err, SqlMapperError::Cancelled));
        // No row is fetched after the one that observed cancellation.
        assert_eq!(cursor.fetched, 3);
    }

    #[test]
    fn cancellation_after_first_row_stops_single() {
        let cancel = CancellationToken::new();
        let mut cursor = CancelAfter {
            inner: rows(1),
            cancel: cancel.clone(),
            cancel_at: 1,
            fetched: 0,
        };
        let err = single_record(&mut cursor, &plan(), &cancel).unwrap_err();
        assert!(matches!(err, SqlMapperError::Cancelled));
        assert_eq!(cursor.fetched, 1);
    }

    #[test]
    fn single_enforces_cardinality() {
        let cancel = CancellationToken::new();
        let one = single_record(&mut rows(1), &plan(), &cancel).unwrap();
        assert_eq!(one.id, 0);

        let none = single_record(&mut rows(0), &plan(), &cancel).unwrap_err();
        assert!(matches!(
            none,
            SqlMapperError::Cardinality(CardinalityError::NoResult(_))
        ));

        let many = single_record(&mut rows(2), &plan(), &cancel).unwrap_err();
        assert!(matches!(
            many,
            SqlMapperError::Cardinality(CardinalityError::MultipleResults(_))
        ));
    }
}
