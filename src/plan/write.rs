use std::fmt;

use tracing::debug;

use crate::accessor::{GenericAccessor, generic_accessor};
use crate::command::Command;
use crate::converter::{ConverterRef, ConverterRegistry, ConverterSlots};
use crate::datum::{Datum, TypeInfo};
use crate::error::SqlMapperError;
use crate::record::ToParams;
use crate::types::RowValues;

/// How a step's wire value lands in the parameter's generic value slot.
#[derive(Debug, Clone, Copy)]
enum Encoding {
    Primitive,
    Boxed(&'static GenericAccessor),
}

impl Encoding {
    fn encode(self, value: Datum) -> Result<RowValues, Datum> {
        match (self, value) {
            (Encoding::Boxed(accessor), Datum::Boxed(boxed)) => {
                accessor.encode(boxed).map_err(Datum::Boxed)
            }
            (_, value) => value.into_primitive_row_value(),
        }
    }
}

struct PropertyStep<P> {
    name: &'static str,
    wire_type: TypeInfo,
    getter: Box<dyn Fn(&P) -> Datum + Send + Sync>,
    converter: Option<usize>,
    encoding: Encoding,
}

/// Compiled `P` -> command parameters routine.
///
/// Parameter names are the property names exactly as declared; the naming convention is
/// not applied on this side.
pub struct WritePlan<P> {
    type_name: &'static str,
    steps: Vec<PropertyStep<P>>,
    converters: Vec<ConverterRef>,
}

impl<P: ToParams> WritePlan<P> {
    /// Build the plan for `P` from its readable properties.
    ///
    /// # Errors
    /// Returns `SqlMapperError::ConfigError` when a property's wire type cannot be bound.
    pub fn compile(registry: &ConverterRegistry) -> Result<Self, SqlMapperError> {
        let type_name = std::any::type_name::<P>();
        let mut slots = ConverterSlots::default();
        let mut steps = Vec::new();

        for property in P::properties() {
            let name = property.name();
            let declared = property.ty();
            let Some(getter) = property.into_getter() else {
                continue;
            };
            let converter = registry.get(declared.id());
            let wire_type = converter.map_or(declared, |c| c.wire_type());
            let encoding = if wire_type.primitive_kind().is_some() {
                Encoding::Primitive
            } else {
                Encoding::Boxed(generic_accessor(wire_type.id()).ok_or_else(|| {
                    SqlMapperError::ConfigError(format!(
                        "{type_name}: property `{name}` has wire type {wire_type:?}, which cannot be bound as a parameter"
                    ))
                })?)
            };
            steps.push(PropertyStep {
                name,
                wire_type,
                getter,
                converter: converter.map(|c| slots.slot_for(c)),
                encoding,
            });
        }

        let plan = Self {
            type_name,
            steps,
            converters: slots.into_converters(),
        };
        debug!(
            target: "sql_mapper::plan",
            type_name,
            parameters = ?plan.parameter_names().collect::<Vec<_>>(),
            converters = plan.converters.len(),
            "compiled write plan"
        );
        Ok(plan)
    }
}

impl<P> WritePlan<P> {
    /// Append one parameter per readable property of `params` to `command`.
    ///
    /// # Errors
    /// Returns `SqlMapperError::TypeMismatch` when a converter rejects a value or the
    /// converted value does not match the planned wire type.
    pub fn bind<C: Command + ?Sized>(&self, command: &mut C, params: &P) -> Result<(), SqlMapperError> {
        for step in &self.steps {
            let mut value = (step.getter)(params);
            if let Some(slot) = step.converter {
                value = self.converters[slot].forward(value)?;
            }
            let encoded = step.encoding.encode(value).map_err(|found| {
                SqlMapperError::TypeMismatch(format!(
                    "property `{}` of {}: expected {:?}, found {found:?}",
                    step.name, self.type_name, step.wire_type
                ))
            })?;
            let mut parameter = command.create_parameter();
            parameter.name = step.name.to_owned();
            parameter.value = encoded;
            command.add_parameter(parameter);
        }
        Ok(())
    }

    /// Parameter names in property order.
    pub fn parameter_names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.steps.iter().map(|s| s.name)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Number of distinct converters captured by this plan.
    #[must_use]
    pub fn converter_count(&self) -> usize {
        self.converters.len()
    }
}

impl<P> fmt::Debug for WritePlan<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let steps: Vec<_> = self.steps.iter().map(|s| (s.name, s.wire_type)).collect();
        f.debug_struct("WritePlan")
            .field("type_name", &self.type_name)
            .field("steps", &steps)
            .field("converters", &self.converters.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::command::{Command, SqlCommand};
    use crate::converter::ValueConverter;
    use crate::record::Property;

    #[derive(Debug, Clone, Copy, PartialEq)]
    struct InnerId(i64);

    #[derive(Clone)]
    struct Insert {
        id: InnerId,
        parent: InnerId,
        value: String,
        note: Option<String>,
    }
    crate::impl_to_params!(Insert {
        id: InnerId,
        parent: InnerId,
        value: String,
        note: Option<String>,
    });

    struct Mixed {
        total: i32,
    }
    impl ToParams for Mixed {
        fn properties() -> Vec<Property<Self>> {
            vec![
                Property::readable("TotalCount", |m: &Mixed| m.total),
                Property::write_only::<String>("Password"),
                Property::readable("Meta", |_: &Mixed| json!({"k": 1})),
            ]
        }
    }

    struct Opaque;
    struct HoldsOpaque;
    impl ToParams for HoldsOpaque {
        fn properties() -> Vec<Property<Self>> {
            vec![Property::readable("inner", |_: &HoldsOpaque| Opaque)]
        }
    }

    fn registry() -> ConverterRegistry {
        ConverterRegistry::builder()
            .register(ValueConverter::new(|id: InnerId| id.0, InnerId))
            .unwrap()
            .build()
    }

    #[test]
    fn binds_forward_converted_values_under_verbatim_names() {
        let plan = WritePlan::<Insert>::compile(&registry()).unwrap();
        assert_eq!(plan.converter_count(), 1);

        let mut command = SqlCommand::new("INSERT INTO foo VALUES (@id, @parent, @value, @note)");
        plan.bind(
            &mut command,
            &Insert {
                id: InnerId(5),
                parent: InnerId(1),
                value: "foo".into(),
                note: None,
            },
        )
        .unwrap();

        let bound: Vec<_> = command
            .parameters()
            .iter()
            .map(|p| (p.name.as_str(), p.value.clone()))
            .collect();
        assert_eq!(
            bound,
            vec![
                ("id", RowValues::Int(5)),
                ("parent", RowValues::Int(1)),
                ("value", RowValues::Text("foo".into())),
                ("note", RowValues::Null),
            ]
        );
    }

    #[test]
    fn skips_properties_without_getter_and_keeps_case() {
        let plan = WritePlan::<Mixed>::compile(&ConverterRegistry::default()).unwrap();
        assert_eq!(
            plan.parameter_names().collect::<Vec<_>>(),
            vec!["TotalCount", "Meta"]
        );
        let mut command = SqlCommand::new("SELECT @TotalCount, @Meta");
        plan.bind(&mut command, &Mixed { total: 4 }).unwrap();
        assert_eq!(command.parameters()[0].value, RowValues::Int(4));
        assert_eq!(command.parameters()[1].value, RowValues::JSON(json!({"k": 1})));
    }

    #[test]
    fn each_bind_appends_a_fresh_set() {
        let plan = WritePlan::<Mixed>::compile(&ConverterRegistry::default()).unwrap();
        let mut command = SqlCommand::new("SELECT 1");
        plan.bind(&mut command, &Mixed { total: 1 }).unwrap();
        plan.bind(&mut command, &Mixed { total: 2 }).unwrap();
        assert_eq!(command.parameters().len(), 4);
        assert_eq!(command.parameters()[2].value, RowValues::Int(2));
    }

    #[test]
    fn unit_parameters_compile_to_a_no_op() {
        let plan = WritePlan::<()>::compile(&registry()).unwrap();
        assert!(plan.is_empty());
        let mut command = SqlCommand::new("SELECT 1");
        plan.bind(&mut command, &()).unwrap();
        assert!(command.parameters().is_empty());
    }

    #[test]
    fn unbindable_wire_type_fails_at_compile() {
        let err = WritePlan::<HoldsOpaque>::compile(&ConverterRegistry::default()).unwrap_err();
        assert!(err.is_config());
    }
}
