//! Row access: one concrete getter per primitive kind plus a generic getter.

use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::datum::{Datum, PrimitiveKind};
use crate::error::SqlMapperError;
use crate::types::RowValues;

fn mismatch(ordinal: usize, expected: PrimitiveKind, found: &RowValues) -> SqlMapperError {
    SqlMapperError::TypeMismatch(format!(
        "column {ordinal}: expected {expected}, found {}",
        found.kind_name()
    ))
}

fn typed<T>(
    value: RowValues,
    ordinal: usize,
    expected: PrimitiveKind,
    coerce: impl FnOnce(&RowValues) -> Option<T>,
) -> Result<T, SqlMapperError> {
    coerce(&value).ok_or_else(|| mismatch(ordinal, expected, &value))
}

/// A row positioned under a cursor.
///
/// Only [`get_value`](DataRow::get_value) is required; the typed getters fall back to it
/// and coerce. Drivers override the typed getters to read natively.
pub trait DataRow {
    /// Generic getter.
    ///
    /// # Errors
    /// Returns `SqlMapperError` if the ordinal is out of range or the driver fails.
    fn get_value(&self, ordinal: usize) -> Result<RowValues, SqlMapperError>;

    fn get_bool(&self, ordinal: usize) -> Result<bool, SqlMapperError> {
        typed(self.get_value(ordinal)?, ordinal, PrimitiveKind::Bool, RowValues::as_bool)
    }

    fn get_i16(&self, ordinal: usize) -> Result<i16, SqlMapperError> {
        typed(self.get_value(ordinal)?, ordinal, PrimitiveKind::I16, RowValues::as_i16)
    }

    fn get_i32(&self, ordinal: usize) -> Result<i32, SqlMapperError> {
        typed(self.get_value(ordinal)?, ordinal, PrimitiveKind::I32, RowValues::as_i32)
    }

    fn get_i64(&self, ordinal: usize) -> Result<i64, SqlMapperError> {
        typed(self.get_value(ordinal)?, ordinal, PrimitiveKind::I64, RowValues::as_int)
    }

    fn get_uuid(&self, ordinal: usize) -> Result<Uuid, SqlMapperError> {
        typed(self.get_value(ordinal)?, ordinal, PrimitiveKind::Uuid, RowValues::as_uuid)
    }

    #[allow(clippy::cast_possible_truncation)]
    fn get_f32(&self, ordinal: usize) -> Result<f32, SqlMapperError> {
        typed(self.get_value(ordinal)?, ordinal, PrimitiveKind::F32, |v| {
            v.as_float().map(|f| f as f32)
        })
    }

    fn get_f64(&self, ordinal: usize) -> Result<f64, SqlMapperError> {
        typed(self.get_value(ordinal)?, ordinal, PrimitiveKind::F64, RowValues::as_float)
    }

    fn get_decimal(&self, ordinal: usize) -> Result<Decimal, SqlMapperError> {
        typed(
            self.get_value(ordinal)?,
            ordinal,
            PrimitiveKind::Decimal,
            RowValues::as_decimal,
        )
    }

    fn get_datetime(&self, ordinal: usize) -> Result<NaiveDateTime, SqlMapperError> {
        typed(
            self.get_value(ordinal)?,
            ordinal,
            PrimitiveKind::DateTime,
            RowValues::as_timestamp,
        )
    }

    fn get_u8(&self, ordinal: usize) -> Result<u8, SqlMapperError> {
        typed(self.get_value(ordinal)?, ordinal, PrimitiveKind::U8, RowValues::as_u8)
    }

    fn get_char(&self, ordinal: usize) -> Result<char, SqlMapperError> {
        typed(self.get_value(ordinal)?, ordinal, PrimitiveKind::Char, RowValues::as_char)
    }

    fn get_string(&self, ordinal: usize) -> Result<String, SqlMapperError> {
        match self.get_value(ordinal)? {
            RowValues::Text(s) => Ok(s),
            other => Err(mismatch(ordinal, PrimitiveKind::Text, &other)),
        }
    }
}

impl<R: DataRow + ?Sized> DataRow for &R {
    fn get_value(&self, ordinal: usize) -> Result<RowValues, SqlMapperError> {
        (**self).get_value(ordinal)
    }
    fn get_bool(&self, ordinal: usize) -> Result<bool, SqlMapperError> {
        (**self).get_bool(ordinal)
    }
    fn get_i16(&self, ordinal: usize) -> Result<i16, SqlMapperError> {
        (**self).get_i16(ordinal)
    }
    fn get_i32(&self, ordinal: usize) -> Result<i32, SqlMapperError> {
        (**self).get_i32(ordinal)
    }
    fn get_i64(&self, ordinal: usize) -> Result<i64, SqlMapperError> {
        (**self).get_i64(ordinal)
    }
    fn get_uuid(&self, ordinal: usize) -> Result<Uuid, SqlMapperError> {
        (**self).get_uuid(ordinal)
    }
    fn get_f32(&self, ordinal: usize) -> Result<f32, SqlMapperError> {
        (**self).get_f32(ordinal)
    }
    fn get_f64(&self, ordinal: usize) -> Result<f64, SqlMapperError> {
        (**self).get_f64(ordinal)
    }
    fn get_decimal(&self, ordinal: usize) -> Result<Decimal, SqlMapperError> {
        (**self).get_decimal(ordinal)
    }
    fn get_datetime(&self, ordinal: usize) -> Result<NaiveDateTime, SqlMapperError> {
        (**self).get_datetime(ordinal)
    }
    fn get_u8(&self, ordinal: usize) -> Result<u8, SqlMapperError> {
        (**self).get_u8(ordinal)
    }
    fn get_char(&self, ordinal: usize) -> Result<char, SqlMapperError> {
        (**self).get_char(ordinal)
    }
    fn get_string(&self, ordinal: usize) -> Result<String, SqlMapperError> {
        (**self).get_string(ordinal)
    }
}

impl PrimitiveKind {
    /// Read a column through the concrete getter for this kind.
    pub(crate) fn read<R: DataRow + ?Sized>(
        self,
        row: &R,
        ordinal: usize,
    ) -> Result<Datum, SqlMapperError> {
        Ok(match self {
            PrimitiveKind::Bool => Datum::Bool(row.get_bool(ordinal)?),
            PrimitiveKind::I16 => Datum::I16(row.get_i16(ordinal)?),
            PrimitiveKind::I32 => Datum::I32(row.get_i32(ordinal)?),
            PrimitiveKind::I64 => Datum::I64(row.get_i64(ordinal)?),
            PrimitiveKind::Uuid => Datum::Uuid(row.get_uuid(ordinal)?),
            PrimitiveKind::F32 => Datum::F32(row.get_f32(ordinal)?),
            PrimitiveKind::F64 => Datum::F64(row.get_f64(ordinal)?),
            PrimitiveKind::Decimal => Datum::Decimal(row.get_decimal(ordinal)?),
            PrimitiveKind::DateTime => Datum::DateTime(row.get_datetime(ordinal)?),
            PrimitiveKind::U8 => Datum::U8(row.get_u8(ordinal)?),
            PrimitiveKind::Char => Datum::Char(row.get_char(ordinal)?),
            PrimitiveKind::Text => Datum::Text(row.get_string(ordinal)?),
        })
    }
}
