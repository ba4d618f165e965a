//! Typed values in flight between a row accessor, a converter and a constructor.
//!
//! Primitive kinds travel unboxed; everything else rides in [`Datum::Boxed`].

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::sync::LazyLock;

use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::types::RowValues;

/// Identity of a Rust type as seen by the mapping layer.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct TypeInfo {
    id: TypeId,
    name: &'static str,
}

impl TypeInfo {
    #[must_use]
    pub fn of<T: Any>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: std::any::type_name::<T>(),
        }
    }

    #[must_use]
    pub fn id(&self) -> TypeId {
        self.id
    }

    #[must_use]
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Primitive kind of this type, if it has a dedicated typed getter.
    #[must_use]
    pub fn primitive_kind(&self) -> Option<PrimitiveKind> {
        PrimitiveKind::of(self.id)
    }
}

impl fmt::Debug for TypeInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

/// The fixed set of wire types read through a concrete typed getter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrimitiveKind {
    Bool,
    I16,
    I32,
    I64,
    Uuid,
    F32,
    F64,
    Decimal,
    DateTime,
    U8,
    Char,
    Text,
}

static PRIMITIVE_KINDS: LazyLock<HashMap<TypeId, PrimitiveKind>> = LazyLock::new(|| {
    HashMap::from([
        (TypeId::of::<bool>(), PrimitiveKind::Bool),
        (TypeId::of::<i16>(), PrimitiveKind::I16),
        (TypeId::of::<i32>(), PrimitiveKind::I32),
        (TypeId::of::<i64>(), PrimitiveKind::I64),
        (TypeId::of::<Uuid>(), PrimitiveKind::Uuid),
        (TypeId::of::<f32>(), PrimitiveKind::F32),
        (TypeId::of::<f64>(), PrimitiveKind::F64),
        (TypeId::of::<Decimal>(), PrimitiveKind::Decimal),
        (TypeId::of::<NaiveDateTime>(), PrimitiveKind::DateTime),
        (TypeId::of::<u8>(), PrimitiveKind::U8),
        (TypeId::of::<char>(), PrimitiveKind::Char),
        (TypeId::of::<String>(), PrimitiveKind::Text),
    ])
});

impl PrimitiveKind {
    #[must_use]
    pub fn of(type_id: TypeId) -> Option<Self> {
        PRIMITIVE_KINDS.get(&type_id).copied()
    }

    /// Coerce a generic column value into this kind.
    #[must_use]
    pub fn coerce(self, value: &RowValues) -> Option<Datum> {
        Some(match self {
            PrimitiveKind::Bool => Datum::Bool(value.as_bool()?),
            PrimitiveKind::I16 => Datum::I16(value.as_i16()?),
            PrimitiveKind::I32 => Datum::I32(value.as_i32()?),
            PrimitiveKind::I64 => Datum::I64(value.as_int()?),
            PrimitiveKind::Uuid => Datum::Uuid(value.as_uuid()?),
            #[allow(clippy::cast_possible_truncation)]
            PrimitiveKind::F32 => Datum::F32(value.as_float()? as f32),
            PrimitiveKind::F64 => Datum::F64(value.as_float()?),
            PrimitiveKind::Decimal => Datum::Decimal(value.as_decimal()?),
            PrimitiveKind::DateTime => Datum::DateTime(value.as_timestamp()?),
            PrimitiveKind::U8 => Datum::U8(value.as_u8()?),
            PrimitiveKind::Char => Datum::Char(value.as_char()?),
            PrimitiveKind::Text => Datum::Text(value.as_text()?.to_owned()),
        })
    }
}

impl fmt::Display for PrimitiveKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PrimitiveKind::Bool => "bool",
            PrimitiveKind::I16 => "i16",
            PrimitiveKind::I32 => "i32",
            PrimitiveKind::I64 => "i64",
            PrimitiveKind::Uuid => "uuid",
            PrimitiveKind::F32 => "f32",
            PrimitiveKind::F64 => "f64",
            PrimitiveKind::Decimal => "decimal",
            PrimitiveKind::DateTime => "datetime",
            PrimitiveKind::U8 => "u8",
            PrimitiveKind::Char => "char",
            PrimitiveKind::Text => "text",
        };
        f.write_str(name)
    }
}

/// A typed value on its way into a constructor or out of a property.
pub enum Datum {
    Bool(bool),
    I16(i16),
    I32(i32),
    I64(i64),
    Uuid(Uuid),
    F32(f32),
    F64(f64),
    Decimal(Decimal),
    DateTime(NaiveDateTime),
    U8(u8),
    Char(char),
    Text(String),
    Boxed(Box<dyn Any + Send>),
}

/// Moves `value` into `U` when `T` and `U` are the same type, without allocating.
fn cast<T: Any, U: Any>(value: T) -> Result<U, T> {
    let mut slot = Some(value);
    let taken = (&mut slot as &mut dyn Any)
        .downcast_mut::<Option<U>>()
        .and_then(Option::take);
    match (taken, slot) {
        (Some(v), _) => Ok(v),
        (None, Some(v)) => Err(v),
        (None, None) => unreachable!("slot emptied without a successful cast"),
    }
}

impl Datum {
    /// Wrap a value, keeping primitive kinds unboxed.
    pub fn from_value<T: Any + Send>(value: T) -> Self {
        let Some(kind) = PrimitiveKind::of(TypeId::of::<T>()) else {
            return Datum::Boxed(Box::new(value));
        };
        let primitive = match kind {
            PrimitiveKind::Bool => cast(value).map(Datum::Bool),
            PrimitiveKind::I16 => cast(value).map(Datum::I16),
            PrimitiveKind::I32 => cast(value).map(Datum::I32),
            PrimitiveKind::I64 => cast(value).map(Datum::I64),
            PrimitiveKind::Uuid => cast(value).map(Datum::Uuid),
            PrimitiveKind::F32 => cast(value).map(Datum::F32),
            PrimitiveKind::F64 => cast(value).map(Datum::F64),
            PrimitiveKind::Decimal => cast(value).map(Datum::Decimal),
            PrimitiveKind::DateTime => cast(value).map(Datum::DateTime),
            PrimitiveKind::U8 => cast(value).map(Datum::U8),
            PrimitiveKind::Char => cast(value).map(Datum::Char),
            PrimitiveKind::Text => cast(value).map(Datum::Text),
        };
        primitive.unwrap_or_else(|value| Datum::Boxed(Box::new(value)))
    }

    /// Unwrap into `T`; hands the datum back untouched when it holds another type.
    pub fn into_value<T: Any>(self) -> Result<T, Datum> {
        match self {
            Datum::Bool(v) => cast(v).map_err(Datum::Bool),
            Datum::I16(v) => cast(v).map_err(Datum::I16),
            Datum::I32(v) => cast(v).map_err(Datum::I32),
            Datum::I64(v) => cast(v).map_err(Datum::I64),
            Datum::Uuid(v) => cast(v).map_err(Datum::Uuid),
            Datum::F32(v) => cast(v).map_err(Datum::F32),
            Datum::F64(v) => cast(v).map_err(Datum::F64),
            Datum::Decimal(v) => cast(v).map_err(Datum::Decimal),
            Datum::DateTime(v) => cast(v).map_err(Datum::DateTime),
            Datum::U8(v) => cast(v).map_err(Datum::U8),
            Datum::Char(v) => cast(v).map_err(Datum::Char),
            Datum::Text(v) => cast(v).map_err(Datum::Text),
            Datum::Boxed(b) => b.downcast::<T>().map(|b| *b).map_err(Datum::Boxed),
        }
    }

    /// The primitive kind carried, or `None` for boxed values.
    #[must_use]
    pub fn kind(&self) -> Option<PrimitiveKind> {
        Some(match self {
            Datum::Bool(_) => PrimitiveKind::Bool,
            Datum::I16(_) => PrimitiveKind::I16,
            Datum::I32(_) => PrimitiveKind::I32,
            Datum::I64(_) => PrimitiveKind::I64,
            Datum::Uuid(_) => PrimitiveKind::Uuid,
            Datum::F32(_) => PrimitiveKind::F32,
            Datum::F64(_) => PrimitiveKind::F64,
            Datum::Decimal(_) => PrimitiveKind::Decimal,
            Datum::DateTime(_) => PrimitiveKind::DateTime,
            Datum::U8(_) => PrimitiveKind::U8,
            Datum::Char(_) => PrimitiveKind::Char,
            Datum::Text(_) => PrimitiveKind::Text,
            Datum::Boxed(_) => return None,
        })
    }

    /// Convert a primitive datum into its wire representation.
    ///
    /// Boxed values are returned unchanged in `Err`; those go through the generic
    /// accessor table instead.
    pub fn into_primitive_row_value(self) -> Result<RowValues, Datum> {
        Ok(match self {
            Datum::Bool(v) => RowValues::Bool(v),
            Datum::I16(v) => RowValues::Int(i64::from(v)),
            Datum::I32(v) => RowValues::Int(i64::from(v)),
            Datum::I64(v) => RowValues::Int(v),
            Datum::U8(v) => RowValues::Int(i64::from(v)),
            Datum::F32(v) => RowValues::Float(f64::from(v)),
            Datum::F64(v) => RowValues::Float(v),
            Datum::Uuid(v) => RowValues::Text(v.hyphenated().to_string()),
            Datum::Decimal(v) => RowValues::Text(v.to_string()),
            Datum::DateTime(v) => RowValues::Timestamp(v),
            Datum::Char(v) => RowValues::Text(v.to_string()),
            Datum::Text(v) => RowValues::Text(v),
            boxed @ Datum::Boxed(_) => return Err(boxed),
        })
    }
}

impl fmt::Debug for Datum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Datum::Bool(v) => write!(f, "Bool({v})"),
            Datum::I16(v) => write!(f, "I16({v})"),
            Datum::I32(v) => write!(f, "I32({v})"),
            Datum::I64(v) => write!(f, "I64({v})"),
            Datum::Uuid(v) => write!(f, "Uuid({v})"),
            Datum::F32(v) => write!(f, "F32({v})"),
            Datum::F64(v) => write!(f, "F64({v})"),
            Datum::Decimal(v) => write!(f, "Decimal({v})"),
            Datum::DateTime(v) => write!(f, "DateTime({v})"),
            Datum::U8(v) => write!(f, "U8({v})"),
            Datum::Char(v) => write!(f, "Char({v:?})"),
            Datum::Text(v) => write!(f, "Text({v:?})"),
            Datum::Boxed(_) => f.write_str("Boxed(..)"),
        }
    }
}
