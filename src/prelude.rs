//! Convenient imports for common functionality.
//!
//! This module re-exports the most commonly used types and traits
//! to make it easier to get started with the library.

pub use crate::accumulator::{ResultAccumulator, ResultList};
pub use crate::command::{Command, Parameter, SqlCommand};
pub use crate::converter::{ConverterRef, ConverterRegistry, ValueConverter};
pub use crate::cursor::Cursor;
pub use crate::error::{CardinalityError, SqlMapperError};
pub use crate::mapper::RecordMapper;
pub use crate::naming::{NameConvention, SnakeCase, Verbatim};
pub use crate::record::{Constructor, FromRecord, Property, ToParams};
pub use crate::results::{MemoryResultSet, MemoryRow};
pub use crate::row::DataRow;
pub use crate::schema::ColumnSchema;
pub use crate::types::RowValues;
pub use crate::{impl_from_record, impl_record, impl_to_params};

pub use tokio_util::sync::CancellationToken;

#[cfg(feature = "sqlite")]
pub use crate::factory::UnitOfWorkFactory;
#[cfg(feature = "sqlite")]
pub use crate::sqlite::{DbAccessor, SqliteOptions, TransactionBehavior, UnitOfWork};
