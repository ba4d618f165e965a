//! Record descriptors: how a type is constructed from a row and read into parameters.
//!
//! A target type lists its public constructors through [`FromRecord`]; a parameter object
//! lists its properties through [`ToParams`]. The macros at the bottom of this module
//! generate both descriptors for a plain struct.

use std::any::Any;
use std::fmt;

use crate::datum::{Datum, TypeInfo};
use crate::error::SqlMapperError;

/// One constructor parameter: its member name and declared type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParamInfo {
    pub name: &'static str,
    pub ty: TypeInfo,
}

type BuildFn<T> = fn(&mut Args) -> Result<T, SqlMapperError>;

/// A public constructor of `T`: ordered parameters and the function that invokes it.
pub struct Constructor<T> {
    params: Vec<ParamInfo>,
    build: BuildFn<T>,
}

impl<T> Constructor<T> {
    /// Start a constructor whose body pulls its arguments from [`Args`] in parameter order.
    #[must_use]
    pub fn new(build: BuildFn<T>) -> Self {
        Self {
            params: Vec::new(),
            build,
        }
    }

    /// Declare the next parameter.
    #[must_use]
    pub fn param<V: Any>(mut self, name: &'static str) -> Self {
        self.params.push(ParamInfo {
            name,
            ty: TypeInfo::of::<V>(),
        });
        self
    }

    #[must_use]
    pub fn params(&self) -> &[ParamInfo] {
        &self.params
    }

    pub(crate) fn into_parts(self) -> (Vec<ParamInfo>, BuildFn<T>) {
        (self.params, self.build)
    }
}

impl<T> fmt::Debug for Constructor<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Constructor")
            .field("params", &self.params)
            .finish_non_exhaustive()
    }
}

/// The ordered argument list handed to a constructor body.
pub struct Args {
    type_name: &'static str,
    values: std::vec::IntoIter<Datum>,
    position: usize,
}

impl Args {
    pub(crate) fn new(type_name: &'static str, values: Vec<Datum>) -> Self {
        Self {
            type_name,
            values: values.into_iter(),
            position: 0,
        }
    }

    /// Take the next argument as `V`.
    ///
    /// # Errors
    /// Returns `SqlMapperError::ConfigError` when the constructor body asks for more
    /// arguments than it declared, and `SqlMapperError::TypeMismatch` when the argument is
    /// not a `V`.
    #[allow(clippy::should_implement_trait)]
    pub fn next<V: Any>(&mut self) -> Result<V, SqlMapperError> {
        let position = self.position;
        self.position += 1;
        let value = self.values.next().ok_or_else(|| {
            SqlMapperError::ConfigError(format!(
                "constructor of {} reads more than the {position} arguments it declares",
                self.type_name
            ))
        })?;
        value.into_value::<V>().map_err(|found| {
            SqlMapperError::TypeMismatch(format!(
                "argument {position} of {}: expected {}, found {found:?}",
                self.type_name,
                std::any::type_name::<V>()
            ))
        })
    }
}

/// A type that can be built from a row through a public constructor.
pub trait FromRecord: Sized + Send + 'static {
    /// Every public constructor of the type. Mapping requires exactly one.
    fn constructors() -> Vec<Constructor<Self>>;
}

type Getter<P> = Box<dyn Fn(&P) -> Datum + Send + Sync>;

/// One public property of a parameter object.
pub struct Property<P> {
    name: &'static str,
    ty: TypeInfo,
    getter: Option<Getter<P>>,
}

impl<P> Property<P> {
    /// A property with a getter; bound as a parameter named exactly `name`.
    pub fn readable<V, F>(name: &'static str, getter: F) -> Self
    where
        V: Any + Send,
        F: Fn(&P) -> V + Send + Sync + 'static,
    {
        Self {
            name,
            ty: TypeInfo::of::<V>(),
            getter: Some(Box::new(move |p: &P| Datum::from_value(getter(p)))),
        }
    }

    /// A property without a getter. Skipped when binding.
    #[must_use]
    pub fn write_only<V: Any>(name: &'static str) -> Self {
        Self {
            name,
            ty: TypeInfo::of::<V>(),
            getter: None,
        }
    }

    #[must_use]
    pub fn name(&self) -> &'static str {
        self.name
    }

    #[must_use]
    pub fn ty(&self) -> TypeInfo {
        self.ty
    }

    #[must_use]
    pub fn is_readable(&self) -> bool {
        self.getter.is_some()
    }

    pub(crate) fn into_getter(self) -> Option<Getter<P>> {
        self.getter
    }
}

impl<P> fmt::Debug for Property<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Property")
            .field("name", &self.name)
            .field("ty", &self.ty)
            .field("readable", &self.is_readable())
            .finish()
    }
}

/// A parameter object whose readable properties become named command parameters.
pub trait ToParams: Sized + Send + Sync + 'static {
    fn properties() -> Vec<Property<Self>>;
}

/// No parameter object.
impl ToParams for () {
    fn properties() -> Vec<Property<Self>> {
        Vec::new()
    }
}

/// Implement [`FromRecord`] for a struct with a single constructor taking every listed field
/// in order.
///
/// ```rust
/// use sql_mapper::impl_from_record;
///
/// struct Foo {
///     id: i64,
///     value: String,
/// }
/// impl_from_record!(Foo { id: i64, value: String });
/// ```
#[macro_export]
macro_rules! impl_from_record {
    ($ty:ident { $($field:ident : $fty:ty),* $(,)? }) => {
        impl $crate::record::FromRecord for $ty {
            fn constructors() -> ::std::vec::Vec<$crate::record::Constructor<Self>> {
                ::std::vec![
                    $crate::record::Constructor::new(|_args| {
                        ::std::result::Result::Ok($ty {
                            $($field: _args.next::<$fty>()?),*
                        })
                    })
                    $(.param::<$fty>(::std::stringify!($field)))*
                ]
            }
        }
    };
}

/// Implement [`ToParams`] with one readable property per listed field. Fields are cloned out.
#[macro_export]
macro_rules! impl_to_params {
    ($ty:ident { $($field:ident : $fty:ty),* $(,)? }) => {
        impl $crate::record::ToParams for $ty {
            fn properties() -> ::std::vec::Vec<$crate::record::Property<Self>> {
                ::std::vec![
                    $($crate::record::Property::readable(
                        ::std::stringify!($field),
                        |p: &$ty| -> $fty { ::std::clone::Clone::clone(&p.$field) },
                    )),*
                ]
            }
        }
    };
}

/// Both [`impl_from_record!`] and [`impl_to_params!`] for the same field list.
#[macro_export]
macro_rules! impl_record {
    ($ty:ident { $($field:ident : $fty:ty),* $(,)? }) => {
        $crate::impl_from_record!($ty { $($field: $fty),* });
        $crate::impl_to_params!($ty { $($field: $fty),* });
    };
}
