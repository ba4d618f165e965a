// In-memory rows and result sets
//
// - row: a materialised row implementing DataRow
// - result_set: rows sharing one schema, walkable as a Cursor

pub mod result_set;
pub mod row;

pub use result_set::MemoryResultSet;
pub use row::MemoryRow;
