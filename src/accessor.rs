//! Accessor tables for wire types outside the primitive set.
//!
//! Each entry knows how to narrow a generic column value into the wire type and how to
//! encode a boxed wire value back into a parameter value.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::LazyLock;

use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use serde_json::Value as JsonValue;
use uuid::Uuid;

use crate::datum::{Datum, PrimitiveKind};
use crate::types::RowValues;

type BoxedValue = Box<dyn Any + Send>;

/// Conversion between a concrete Rust type and the generic `RowValues` slot.
pub(crate) trait WireValue: Sized + Any + Send {
    fn from_row_value(value: RowValues) -> Result<Self, RowValues>;
    fn into_row_value(self) -> RowValues;
}

macro_rules! primitive_wire_value {
    ($($ty:ty),+ $(,)?) => {
        $(
            impl WireValue for $ty {
                fn from_row_value(value: RowValues) -> Result<Self, RowValues> {
                    let Some(kind) = PrimitiveKind::of(TypeId::of::<$ty>()) else {
                        return Err(value);
                    };
                    match kind.coerce(&value).map(Datum::into_value::<$ty>) {
                        Some(Ok(v)) => Ok(v),
                        _ => Err(value),
                    }
                }

                fn into_row_value(self) -> RowValues {
                    match Datum::from_value(self).into_primitive_row_value() {
                        Ok(value) => value,
                        Err(_) => RowValues::Null,
                    }
                }
            }
        )+
    };
}

primitive_wire_value!(
    bool,
    i16,
    i32,
    i64,
    Uuid,
    f32,
    f64,
    Decimal,
    NaiveDateTime,
    u8,
    char,
    String,
);

impl WireValue for RowValues {
    fn from_row_value(value: RowValues) -> Result<Self, RowValues> {
        Ok(value)
    }

    fn into_row_value(self) -> RowValues {
        self
    }
}

impl WireValue for Vec<u8> {
    fn from_row_value(value: RowValues) -> Result<Self, RowValues> {
        match value {
            RowValues::Blob(bytes) => Ok(bytes),
            other => Err(other),
        }
    }

    fn into_row_value(self) -> RowValues {
        RowValues::Blob(self)
    }
}

impl WireValue for JsonValue {
    fn from_row_value(value: RowValues) -> Result<Self, RowValues> {
        match value {
            RowValues::JSON(json) => Ok(json),
            RowValues::Text(text) => serde_json::from_str(&text).map_err(|_| RowValues::Text(text)),
            other => Err(other),
        }
    }

    fn into_row_value(self) -> RowValues {
        RowValues::JSON(self)
    }
}

impl<X: WireValue> WireValue for Option<X> {
    fn from_row_value(value: RowValues) -> Result<Self, RowValues> {
        if value.is_null() {
            Ok(None)
        } else {
            X::from_row_value(value).map(Some)
        }
    }

    fn into_row_value(self) -> RowValues {
        self.map_or(RowValues::Null, WireValue::into_row_value)
    }
}

/// Narrowing/encoding pair for one non-primitive wire type.
#[derive(Clone, Copy)]
pub(crate) struct GenericAccessor {
    pub(crate) type_name: &'static str,
    narrow: fn(RowValues) -> Result<Datum, RowValues>,
    encode: fn(BoxedValue) -> Result<RowValues, BoxedValue>,
}

impl std::fmt::Debug for GenericAccessor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GenericAccessor")
            .field("type_name", &self.type_name)
            .finish_non_exhaustive()
    }
}

impl GenericAccessor {
    fn of<X: WireValue>() -> (TypeId, Self) {
        (
            TypeId::of::<X>(),
            Self {
                type_name: std::any::type_name::<X>(),
                narrow: narrow_boxed::<X>,
                encode: encode_boxed::<X>,
            },
        )
    }

    /// Narrow a generic column value into this accessor's wire type.
    pub(crate) fn narrow(&self, value: RowValues) -> Result<Datum, RowValues> {
        (self.narrow)(value)
    }

    /// Encode a boxed wire value of this accessor's type.
    pub(crate) fn encode(&self, value: BoxedValue) -> Result<RowValues, BoxedValue> {
        (self.encode)(value)
    }
}

fn narrow_boxed<X: WireValue>(value: RowValues) -> Result<Datum, RowValues> {
    X::from_row_value(value).map(|v| Datum::Boxed(Box::new(v)))
}

fn encode_boxed<X: WireValue>(value: BoxedValue) -> Result<RowValues, BoxedValue> {
    value.downcast::<X>().map(|v| v.into_row_value())
}

static GENERIC_ACCESSORS: LazyLock<HashMap<TypeId, GenericAccessor>> = LazyLock::new(|| {
    HashMap::from([
        GenericAccessor::of::<RowValues>(),
        GenericAccessor::of::<Vec<u8>>(),
        GenericAccessor::of::<JsonValue>(),
        GenericAccessor::of::<Option<bool>>(),
        GenericAccessor::of::<Option<i16>>(),
        GenericAccessor::of::<Option<i32>>(),
        GenericAccessor::of::<Option<i64>>(),
        GenericAccessor::of::<Option<Uuid>>(),
        GenericAccessor::of::<Option<f32>>(),
        GenericAccessor::of::<Option<f64>>(),
        GenericAccessor::of::<Option<Decimal>>(),
        GenericAccessor::of::<Option<NaiveDateTime>>(),
        GenericAccessor::of::<Option<u8>>(),
        GenericAccessor::of::<Option<char>>(),
        GenericAccessor::of::<Option<String>>(),
        GenericAccessor::of::<Option<Vec<u8>>>(),
        GenericAccessor::of::<Option<JsonValue>>(),
    ])
});

/// Look up the accessor for a non-primitive wire type.
pub(crate) fn generic_accessor(type_id: TypeId) -> Option<&'static GenericAccessor> {
    GENERIC_ACCESSORS.get(&type_id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn optional_primitives_map_null_to_none() {
        let accessor = generic_accessor(TypeId::of::<Option<i64>>()).unwrap();
        let none = accessor.narrow(RowValues::Null).unwrap();
        assert_eq!(none.into_value::<Option<i64>>().unwrap(), None);
        let some = accessor.narrow(RowValues::Int(12)).unwrap();
        assert_eq!(some.into_value::<Option<i64>>().unwrap(), Some(12));
        assert!(accessor.narrow(RowValues::Text("x".into())).is_err());
    }

    #[test]
    fn json_narrows_from_text() {
        let accessor = generic_accessor(TypeId::of::<JsonValue>()).unwrap();
        let json = accessor
            .narrow(RowValues::Text(r#"{"name":"Alice"}"#.into()))
            .unwrap()
            .into_value::<JsonValue>()
            .unwrap();
        assert_eq!(json["name"], "Alice");
    }

    #[test]
    fn blobs_encode_and_narrow() {
        let accessor = generic_accessor(TypeId::of::<Vec<u8>>()).unwrap();
        let encoded = accessor.encode(Box::new(b"foo".to_vec())).unwrap();
        assert_eq!(encoded, RowValues::Blob(b"foo".to_vec()));
        assert!(accessor.narrow(RowValues::Int(1)).is_err());
    }

    #[test]
    fn options_encode_to_null_or_inner_value() {
        let strings = generic_accessor(TypeId::of::<Option<String>>()).unwrap();
        assert_eq!(strings.encode(Box::new(None::<String>)).unwrap(), RowValues::Null);
        let ints = generic_accessor(TypeId::of::<Option<i32>>()).unwrap();
        assert_eq!(ints.encode(Box::new(Some(3_i32))).unwrap(), RowValues::Int(3));
        assert!(ints.encode(Box::new(3_i32)).is_err());
    }

    #[test]
    fn unknown_types_have_no_accessor() {
        struct Opaque;
        assert!(generic_accessor(TypeId::of::<Opaque>()).is_none());
    }
}
