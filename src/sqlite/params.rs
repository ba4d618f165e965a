use std::fmt::Write;

use rusqlite::Statement;
use rusqlite::types::Value;

use crate::command::{Command, Parameter};
use crate::error::SqlMapperError;
use crate::types::RowValues;

// Thread-local buffer for timestamp formatting
thread_local! {
    static TIMESTAMP_BUF: std::cell::RefCell<String> = std::cell::RefCell::new(String::with_capacity(32));
}

/// Convert a single `RowValues` to a rusqlite `Value`.
#[must_use]
pub fn row_value_to_sqlite_value(value: &RowValues) -> Value {
    match value {
        RowValues::Int(i) => Value::Integer(*i),
        RowValues::Float(f) => Value::Real(*f),
        RowValues::Text(s) => Value::Text(s.clone()),
        RowValues::Bool(b) => Value::Integer(i64::from(*b)),
        RowValues::Timestamp(dt) => TIMESTAMP_BUF.with(|buf| {
            let mut borrow = buf.borrow_mut();
            borrow.clear();
            if write!(borrow, "{}", dt.format("%F %T%.f")).is_err() {
                return Value::Text(dt.to_string());
            }
            Value::Text(borrow.clone())
        }),
        RowValues::Null => Value::Null,
        RowValues::JSON(jval) => Value::Text(jval.to_string()),
        RowValues::Blob(bytes) => Value::Blob(bytes.clone()),
    }
}

fn strip_prefix(placeholder: &str) -> &str {
    placeholder
        .strip_prefix(['@', ':', '$'])
        .unwrap_or(placeholder)
}

fn find_parameter<'a>(parameters: &'a [Parameter], name: &str) -> Option<&'a Parameter> {
    parameters.iter().find(|p| p.name == name)
}

/// Bind a command's parameters to the placeholders of a prepared statement.
///
/// `@name`, `:name` and `$name` placeholders take the parameter of the same name (without
/// the prefix). `?` and `?NNN` placeholders take parameters by position. Parameters no
/// placeholder refers to are ignored.
///
/// # Errors
/// Returns `SqlMapperError::ParameterError` when a placeholder has no matching parameter,
/// or `SqlMapperError::SqliteError` if binding fails.
pub fn bind_command<C: Command + ?Sized>(
    stmt: &mut Statement<'_>,
    command: &C,
) -> Result<(), SqlMapperError> {
    let parameters = command.parameters();
    for index in 1..=stmt.parameter_count() {
        let placeholder = stmt.parameter_name(index).map(str::to_owned);
        let parameter = match placeholder.as_deref() {
            Some(name) if !name.starts_with('?') => {
                let key = strip_prefix(name);
                find_parameter(parameters, key).ok_or_else(|| {
                    SqlMapperError::ParameterError(format!(
                        "no parameter named `{key}` for placeholder {name}"
                    ))
                })?
            }
            positional => parameters.get(index - 1).ok_or_else(|| {
                SqlMapperError::ParameterError(format!(
                    "no parameter at position {index} for placeholder {}",
                    positional.unwrap_or("?")
                ))
            })?,
        };
        stmt.raw_bind_parameter(index, row_value_to_sqlite_value(&parameter.value))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;
    use crate::command::SqlCommand;

    #[test]
    fn encodes_each_row_value() {
        let ts = NaiveDate::from_ymd_opt(2024, 1, 1)
            .and_then(|d| d.and_hms_milli_opt(8, 0, 1, 250))
            .unwrap();
        assert_eq!(
            row_value_to_sqlite_value(&RowValues::Timestamp(ts)),
            Value::Text("2024-01-01 08:00:01.250".into())
        );
        assert_eq!(row_value_to_sqlite_value(&RowValues::Bool(true)), Value::Integer(1));
        assert_eq!(
            row_value_to_sqlite_value(&RowValues::JSON(serde_json::json!({"a": 1}))),
            Value::Text(r#"{"a":1}"#.into())
        );
        assert_eq!(row_value_to_sqlite_value(&RowValues::Null), Value::Null);
    }

    #[test]
    fn binds_named_and_positional_placeholders() -> Result<(), SqlMapperError> {
        let conn = rusqlite::Connection::open_in_memory()?;

        let mut command = SqlCommand::new("SELECT @b, :a, $b");
        command.add_parameter(Parameter::new("a", RowValues::Int(1)));
        command.add_parameter(Parameter::new("b", RowValues::Text("two".into())));
        command.add_parameter(Parameter::new("unused", RowValues::Null));
        let mut stmt = conn.prepare(command.sql())?;
        bind_command(&mut stmt, &command)?;
        let mut rows = stmt.raw_query();
        let row = rows.next()?.ok_or(SqlMapperError::ExecutionError("no row".into()))?;
        assert_eq!(row.get::<_, String>(0)?, "two");
        assert_eq!(row.get::<_, i64>(1)?, 1);
        assert_eq!(row.get::<_, String>(2)?, "two");
        drop(rows);

        let mut positional = SqlCommand::new("SELECT ?, ?");
        positional.add_parameter(Parameter::new("", RowValues::Int(5)));
        positional.add_parameter(Parameter::new("", RowValues::Float(0.5)));
        let mut stmt = conn.prepare(positional.sql())?;
        bind_command(&mut stmt, &positional)?;
        let mut rows = stmt.raw_query();
        let row = rows.next()?.ok_or(SqlMapperError::ExecutionError("no row".into()))?;
        assert_eq!(row.get::<_, i64>(0)?, 5);
        Ok(())
    }

    #[test]
    fn missing_named_parameter_is_an_error() -> Result<(), SqlMapperError> {
        let conn = rusqlite::Connection::open_in_memory()?;
        let command = SqlCommand::new("SELECT @Value");
        let mut stmt = conn.prepare(command.sql())?;
        let err = bind_command(&mut stmt, &command).unwrap_err();
        assert!(matches!(err, SqlMapperError::ParameterError(ref m) if m.contains("Value")));
        Ok(())
    }
}
