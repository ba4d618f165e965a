// SQLite execution layer - runs mapped queries on pooled rusqlite connections
//
// - config: options, the bb8 connection manager and pool setup
// - params: binding command parameters to statement placeholders
// - row: DataRow for rusqlite rows and a Cursor over executing statements
// - unit_of_work: one transaction per unit of work, with rollback on drop

pub mod config;
pub mod params;
pub mod row;
pub mod unit_of_work;

pub use config::{SharedSqliteConnection, SqliteManager, SqliteOptions, SqliteOptionsBuilder};
pub use params::{bind_command, row_value_to_sqlite_value};
pub use row::{SqliteCursor, schema_from_statement, sqlite_value_to_row_value};
pub use unit_of_work::{DbAccessor, TransactionBehavior, UnitOfWork};
