use std::fmt;

use tracing::debug;

use crate::accessor::{GenericAccessor, generic_accessor};
use crate::converter::{ConverterRef, ConverterRegistry, ConverterSlots};
use crate::datum::{PrimitiveKind, TypeInfo};
use crate::error::SqlMapperError;
use crate::naming::NameConvention;
use crate::record::{Args, FromRecord};
use crate::row::DataRow;
use crate::schema::ColumnSchema;

#[derive(Debug, Clone, Copy)]
enum Accessor {
    Primitive(PrimitiveKind),
    Generic(&'static GenericAccessor),
}

#[derive(Debug)]
struct FieldStep {
    member: &'static str,
    column: String,
    wire_type: TypeInfo,
    accessor: Accessor,
    converter: Option<usize>,
}

/// Compiled row -> `T` routine.
///
/// Holds no per-call state: the row and its schema are passed to every
/// [`map_row`](ReadPlan::map_row) call, so one plan serves any number of concurrent queries.
pub struct ReadPlan<T> {
    type_name: &'static str,
    steps: Vec<FieldStep>,
    converters: Vec<ConverterRef>,
    construct: fn(&mut Args) -> Result<T, SqlMapperError>,
}

impl<T: FromRecord> ReadPlan<T> {
    /// Build the plan for `T` from its single public constructor.
    ///
    /// # Errors
    /// Returns `SqlMapperError::ConfigError` when `T` does not have exactly one public
    /// constructor, when that constructor takes no parameters, or when a parameter's wire
    /// type has no accessor.
    pub fn compile(
        registry: &ConverterRegistry,
        convention: &dyn NameConvention,
    ) -> Result<Self, SqlMapperError> {
        let type_name = std::any::type_name::<T>();
        let mut constructors = T::constructors();
        let constructor = match constructors.len() {
            0 => {
                return Err(SqlMapperError::ConfigError(format!(
                    "No public constructor on {type_name}."
                )));
            }
            1 => constructors.remove(0),
            _ => {
                return Err(SqlMapperError::ConfigError(format!(
                    "{type_name} has more than 1 public constructor."
                )));
            }
        };

        let (params, construct) = constructor.into_parts();
        if params.is_empty() {
            return Err(SqlMapperError::ConfigError(format!(
                "{type_name} is required to have a non-default constructor."
            )));
        }

        let mut slots = ConverterSlots::default();
        let mut steps = Vec::with_capacity(params.len());
        for param in params {
            let converter = registry.get(param.ty.id());
            let wire_type = converter.map_or(param.ty, |c| c.wire_type());
            let accessor = match wire_type.primitive_kind() {
                Some(kind) => Accessor::Primitive(kind),
                None => Accessor::Generic(generic_accessor(wire_type.id()).ok_or_else(|| {
                    SqlMapperError::ConfigError(format!(
                        "{type_name}: parameter `{}` has wire type {wire_type:?}, which cannot be read from a row",
                        param.name
                    ))
                })?),
            };
            steps.push(FieldStep {
                member: param.name,
                column: convention.convert(param.name),
                wire_type,
                accessor,
                converter: converter.map(|c| slots.slot_for(c)),
            });
        }

        let plan = Self {
            type_name,
            steps,
            converters: slots.into_converters(),
            construct,
        };
        debug!(
            target: "sql_mapper::plan",
            type_name,
            columns = ?plan.columns().collect::<Vec<_>>(),
            converters = plan.converters.len(),
            "compiled read plan"
        );
        Ok(plan)
    }
}

impl<T> ReadPlan<T> {
    /// Map one row into a `T`.
    ///
    /// Column names are resolved against `schema` on every call.
    ///
    /// # Errors
    /// Returns `SqlMapperError::ColumnNotFound` when a resolved column is missing from the
    /// schema, `SqlMapperError::TypeMismatch` when a value does not fit its wire type, or
    /// whatever a converter or the row reports.
    pub fn map_row<R: DataRow + ?Sized>(
        &self,
        row: &R,
        schema: &ColumnSchema,
    ) -> Result<T, SqlMapperError> {
        let mut values = Vec::with_capacity(self.steps.len());
        for step in &self.steps {
            let ordinal = schema.ordinal(&step.column)?;
            let mut value = match step.accessor {
                Accessor::Primitive(kind) => kind.read(row, ordinal)?,
                Accessor::Generic(accessor) => {
                    accessor.narrow(row.get_value(ordinal)?).map_err(|found| {
                        SqlMapperError::TypeMismatch(format!(
                            "column [{}] of {}: expected {}, found {}",
                            step.column,
                            self.type_name,
                            accessor.type_name,
                            found.kind_name()
                        ))
                    })?
                }
            };
            if let Some(slot) = step.converter {
                value = self.converters[slot].backward(value)?;
            }
            values.push(value);
        }
        let mut args = Args::new(self.type_name, values);
        (self.construct)(&mut args)
    }

    /// Resolved column names, in constructor parameter order.
    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.steps.iter().map(|s| s.column.as_str())
    }

    #[must_use]
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Number of distinct converters captured by this plan.
    #[must_use]
    pub fn converter_count(&self) -> usize {
        self.converters.len()
    }
}

impl<T> fmt::Debug for ReadPlan<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let steps: Vec<_> = self
            .steps
            .iter()
            .map(|s| (s.member, s.column.as_str(), s.wire_type))
            .collect();
        f.debug_struct("ReadPlan")
            .field("type_name", &self.type_name)
            .field("steps", &steps)
            .field("converters", &self.converters.len())
            .finish()
    }
}
