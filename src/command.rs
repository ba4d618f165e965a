use crate::types::RowValues;

/// A named, bound value on a command.
#[derive(Debug, Clone, PartialEq)]
pub struct Parameter {
    pub name: String,
    pub value: RowValues,
}

impl Parameter {
    #[must_use]
    pub fn new(name: impl Into<String>, value: RowValues) -> Self {
        Self {
            name: name.into(),
            value,
        }
    }
}

impl Default for Parameter {
    fn default() -> Self {
        Self {
            name: String::new(),
            value: RowValues::Null,
        }
    }
}

/// Something that accepts named parameters before it is executed.
pub trait Command {
    /// A blank parameter, to be named and assigned before it is added.
    fn create_parameter(&self) -> Parameter {
        Parameter::default()
    }

    fn add_parameter(&mut self, parameter: Parameter);

    fn parameters(&self) -> &[Parameter];
}

/// SQL text plus the parameters bound to it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SqlCommand {
    sql: String,
    parameters: Vec<Parameter>,
}

impl SqlCommand {
    #[must_use]
    pub fn new(sql: impl Into<String>) -> Self {
        Self {
            sql: sql.into(),
            parameters: Vec::new(),
        }
    }

    #[must_use]
    pub fn sql(&self) -> &str {
        &self.sql
    }

    /// Look up a bound parameter by exact name.
    #[must_use]
    pub fn parameter(&self, name: &str) -> Option<&Parameter> {
        self.parameters.iter().find(|p| p.name == name)
    }

    #[must_use]
    pub fn into_parts(self) -> (String, Vec<Parameter>) {
        (self.sql, self.parameters)
    }
}

impl Command for SqlCommand {
    fn add_parameter(&mut self, parameter: Parameter) {
        self.parameters.push(parameter);
    }

    fn parameters(&self) -> &[Parameter] {
        &self.parameters
    }
}
