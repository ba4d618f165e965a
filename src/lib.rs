//! Mapping between SQL result rows, typed records and query parameters.
//!
//! A record type describes its single public constructor ([`FromRecord`]); a parameter
//! object describes its readable properties ([`ToParams`]). From those descriptors a
//! [`RecordMapper`] compiles a read plan (row -> record) and a write plan (record ->
//! command parameters) once per type and reuses them for every call. Column names on the
//! read side go through a [`NameConvention`]; semantic types are translated to stored
//! types by registered [`ValueConverter`]s.
//!
//! With the `sqlite` feature (on by default), [`UnitOfWorkFactory`] runs mapped queries
//! inside transactions on a pool of rusqlite connections.

mod accessor;
pub mod accumulator;
pub mod command;
pub mod converter;
pub mod cursor;
pub mod datum;
pub mod error;
pub mod mapper;
pub mod naming;
pub mod plan;
pub mod prelude;
pub mod record;
pub mod results;
pub mod row;
pub mod schema;
pub mod types;

#[cfg(feature = "sqlite")]
pub mod factory;
#[cfg(feature = "sqlite")]
pub mod sqlite;

pub use accumulator::{ResultAccumulator, ResultList};
pub use command::{Command, Parameter, SqlCommand};
pub use converter::{ConverterRef, ConverterRegistry, ErasedConverter, ValueConverter};
pub use cursor::{Cursor, collect_records, single_record};
pub use datum::{Datum, PrimitiveKind, TypeInfo};
pub use error::{CardinalityError, SqlMapperError};
pub use mapper::{RecordMapper, RecordMapperBuilder};
pub use naming::{NameConvention, SnakeCase, Verbatim};
pub use plan::{PlanCache, ReadPlan, WritePlan};
pub use record::{Args, Constructor, FromRecord, ParamInfo, Property, ToParams};
pub use results::{MemoryResultSet, MemoryRow};
pub use row::DataRow;
pub use schema::{ColumnInfo, ColumnSchema};
pub use types::RowValues;

#[cfg(feature = "sqlite")]
pub use factory::{UnitOfWorkFactory, UnitOfWorkFactoryBuilder};
#[cfg(feature = "sqlite")]
pub use sqlite::{DbAccessor, SqliteOptions, SqliteOptionsBuilder, TransactionBehavior, UnitOfWork};
