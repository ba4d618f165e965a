//! The mapping facade: one converter registry, one naming convention, two plan caches.

use std::fmt;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::accumulator::ResultList;
use crate::command::Command;
use crate::converter::{ConverterRef, ConverterRegistry, ErasedConverter};
use crate::cursor::{self, Cursor};
use crate::error::SqlMapperError;
use crate::naming::{NameConvention, SnakeCase};
use crate::plan::{PlanCache, ReadPlan, WritePlan};
use crate::record::{FromRecord, ToParams};
use crate::row::DataRow;
use crate::schema::ColumnSchema;

struct MapperInner {
    registry: ConverterRegistry,
    convention: Arc<dyn NameConvention>,
    reads: PlanCache,
    writes: PlanCache,
}

/// Compiles and memoizes read/write plans for one configuration.
///
/// Cloning is cheap; clones share the same caches.
///
/// ```rust
/// use sql_mapper::prelude::*;
///
/// struct Foo {
///     id: i64,
///     value: String,
/// }
/// sql_mapper::impl_from_record!(Foo { id: i64, value: String });
///
/// # fn main() -> Result<(), SqlMapperError> {
/// let mapper = RecordMapper::builder().build()?;
/// let schema = ColumnSchema::from_names(["value", "id"]);
/// let row = MemoryRow::new(vec![RowValues::Text("foo".into()), RowValues::Int(1)]);
/// let foo: Foo = mapper.map_row(&row, &schema)?;
/// assert_eq!((foo.id, foo.value.as_str()), (1, "foo"));
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct RecordMapper {
    inner: Arc<MapperInner>,
}

impl RecordMapper {
    #[must_use]
    pub fn new(registry: ConverterRegistry, convention: Arc<dyn NameConvention>) -> Self {
        Self {
            inner: Arc::new(MapperInner {
                registry,
                convention,
                reads: PlanCache::new("read"),
                writes: PlanCache::new("write"),
            }),
        }
    }

    #[must_use]
    pub fn builder() -> RecordMapperBuilder {
        RecordMapperBuilder::default()
    }

    #[must_use]
    pub fn registry(&self) -> &ConverterRegistry {
        &self.inner.registry
    }

    #[must_use]
    pub fn convention(&self) -> &dyn NameConvention {
        self.inner.convention.as_ref()
    }

    /// The read plan for `T`, compiled on first use.
    ///
    /// # Errors
    /// Returns `SqlMapperError::ConfigError` when `T` cannot be mapped from a row.
    pub fn compile_read<T: FromRecord>(&self) -> Result<Arc<ReadPlan<T>>, SqlMapperError> {
        self.inner.reads.get_or_compile(|| {
            ReadPlan::compile(&self.inner.registry, self.inner.convention.as_ref())
        })
    }

    /// The write plan for `P`, compiled on first use.
    ///
    /// # Errors
    /// Returns `SqlMapperError::ConfigError` when a property of `P` cannot be bound.
    pub fn compile_write<P: ToParams>(&self) -> Result<Arc<WritePlan<P>>, SqlMapperError> {
        self.inner
            .writes
            .get_or_compile(|| WritePlan::compile(&self.inner.registry))
    }

    /// Map one row into `T`.
    ///
    /// # Errors
    /// Returns compile errors for `T`, `SqlMapperError::ColumnNotFound`, or conversion errors.
    pub fn map_row<T, R>(&self, row: &R, schema: &ColumnSchema) -> Result<T, SqlMapperError>
    where
        T: FromRecord,
        R: DataRow + ?Sized,
    {
        self.compile_read::<T>()?.map_row(row, schema)
    }

    /// Append the parameters of `params` to `command`.
    ///
    /// # Errors
    /// Returns compile errors for `P` or conversion errors.
    pub fn bind_parameters<P, C>(&self, command: &mut C, params: &P) -> Result<(), SqlMapperError>
    where
        P: ToParams,
        C: Command + ?Sized,
    {
        self.compile_write::<P>()?.bind(command, params)
    }

    /// Map every row of `cursor` into `T`.
    ///
    /// # Errors
    /// Returns `SqlMapperError::Cancelled` when `cancel` fires, or the first mapping error.
    pub fn collect<T, C>(
        &self,
        cursor: &mut C,
        cancel: &CancellationToken,
    ) -> Result<ResultList<T>, SqlMapperError>
    where
        T: FromRecord,
        C: Cursor,
    {
        let plan = self.compile_read::<T>()?;
        cursor::collect_records(cursor, &plan, cancel)
    }

    /// Map the only row of `cursor` into `T`.
    ///
    /// # Errors
    /// Returns a `CardinalityError` unless the cursor yields exactly one row.
    pub fn single<T, C>(&self, cursor: &mut C, cancel: &CancellationToken) -> Result<T, SqlMapperError>
    where
        T: FromRecord,
        C: Cursor,
    {
        let plan = self.compile_read::<T>()?;
        cursor::single_record(cursor, &plan, cancel)
    }

    /// Number of (read, write) plans compiled so far.
    #[must_use]
    pub fn cached_plans(&self) -> (usize, usize) {
        (self.inner.reads.len(), self.inner.writes.len())
    }
}

impl fmt::Debug for RecordMapper {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RecordMapper")
            .field("registry", &self.inner.registry)
            .field("reads", &self.inner.reads)
            .field("writes", &self.inner.writes)
            .finish_non_exhaustive()
    }
}

/// Fluent configuration for a [`RecordMapper`].
#[derive(Default)]
pub struct RecordMapperBuilder {
    convention: Option<Arc<dyn NameConvention>>,
    converters: Vec<ConverterRef>,
}

impl RecordMapperBuilder {
    /// Naming convention for read-side column names. Defaults to [`SnakeCase`].
    #[must_use]
    pub fn name_convention<N: NameConvention + 'static>(mut self, convention: N) -> Self {
        self.convention = Some(Arc::new(convention));
        self
    }

    #[must_use]
    pub fn add_converter<C: ErasedConverter + 'static>(mut self, converter: C) -> Self {
        self.converters.push(ConverterRef::new(converter));
        self
    }

    #[must_use]
    pub fn converters(mut self, converters: impl IntoIterator<Item = ConverterRef>) -> Self {
        self.converters.extend(converters);
        self
    }

    /// Validate the converters and assemble the mapper.
    ///
    /// # Errors
    /// Returns `SqlMapperError::ConfigError` if two converters share a semantic type.
    pub fn build(self) -> Result<RecordMapper, SqlMapperError> {
        let registry = self
            .converters
            .into_iter()
            .try_fold(ConverterRegistry::builder(), |builder, converter| {
                builder.register_shared(converter)
            })?
            .build();
        let convention = self.convention.unwrap_or_else(|| Arc::new(SnakeCase));
        Ok(RecordMapper::new(registry, convention))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::SqlCommand;
    use crate::converter::ValueConverter;
    use crate::results::{MemoryResultSet, MemoryRow};
    use crate::types::RowValues;

    #[derive(Debug, Clone, Copy, PartialEq)]
    struct InnerId(i64);

    #[derive(Debug, Clone, PartialEq)]
    struct Item {
        id: InnerId,
        value: String,
    }
    crate::impl_record!(Item { id: InnerId, value: String });

    fn mapper() -> RecordMapper {
        RecordMapper::builder()
            .add_converter(ValueConverter::new(|id: InnerId| id.0, InnerId))
            .build()
            .unwrap()
    }

    #[test]
    fn write_then_read_round_trips_through_the_converter() {
        let mapper = mapper();
        let item = Item {
            id: InnerId(42),
            value: "foo".into(),
        };

        let mut command = SqlCommand::new("INSERT INTO item (id, value) VALUES (@id, @value)");
        mapper.bind_parameters(&mut command, &item).unwrap();
        let values: Vec<RowValues> = command.parameters().iter().map(|p| p.value.clone()).collect();

        let schema = ColumnSchema::from_names(["id", "value"]);
        let back: Item = mapper.map_row(&MemoryRow::new(values), &schema).unwrap();
        assert_eq!(back, item);
    }

    #[test]
    fn plans_are_memoized_per_type() {
        let mapper = mapper();
        let a = mapper.compile_read::<Item>().unwrap();
        let b = mapper.clone().compile_read::<Item>().unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        mapper.compile_write::<Item>().unwrap();
        mapper.compile_write::<()>().unwrap();
        assert_eq!(mapper.cached_plans(), (1, 2));
    }

    #[test]
    fn duplicate_converters_fail_the_build() {
        let err = RecordMapper::builder()
            .add_converter(ValueConverter::new(|id: InnerId| id.0, InnerId))
            .add_converter(ValueConverter::new(|id: InnerId| id.0.to_string(), |_: String| InnerId(0)))
            .build()
            .unwrap_err();
        assert!(err.is_config());
    }

    #[test]
    fn collects_and_singles_from_a_cursor() {
        let mapper = mapper();
        let mut set = MemoryResultSet::with_columns(["value", "id"]);
        set.add_row_values(vec![RowValues::Text("foo".into()), RowValues::Int(1)]);
        set.add_row_values(vec![RowValues::Text("baz".into()), RowValues::Int(3)]);

        let cancel = CancellationToken::new();
        let items = mapper.collect::<Item, _>(&mut set, &cancel).unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[1].id, InnerId(3));

        set.rewind();
        assert!(mapper.single::<Item, _>(&mut set, &cancel).is_err());
    }
}
