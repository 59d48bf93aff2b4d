use std::collections::BTreeMap;

use crate::bail;
use crate::error::{DriverResult, ErrorKind};

/// Value bound to a named query parameter.
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum QueryParameter {
    String(String),
    StringArray(Vec<String>),
}

/// Named parameters of a query, referenced in SQL as `@name`.
///
/// Only named parameters are supported. Names must start with a letter or underscore and
/// contain only ASCII alphanumerics and underscores, so positional names such as `0` or `1`
/// are rejected at insertion time.
#[derive(Debug, Clone, Eq, PartialEq, Default)]
pub struct QueryBindings {
    parameters: BTreeMap<String, QueryParameter>,
}

impl QueryBindings {
    pub fn new() -> QueryBindings {
        Self::default()
    }

    /// Binds `value` under `name`, replacing any previous value.
    pub fn insert(&mut self, name: impl Into<String>, value: QueryParameter) -> DriverResult<()> {
        let name = name.into();
        validate_parameter_name(&name)?;
        self.parameters.insert(name, value);

        Ok(())
    }

    /// Merges all parameters of `other` into these bindings.
    pub fn extend(&mut self, other: &QueryBindings) {
        for (name, value) in &other.parameters {
            self.parameters.insert(name.clone(), value.clone());
        }
    }

    pub fn get(&self, name: &str) -> Option<&QueryParameter> {
        self.parameters.get(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &QueryParameter)> {
        self.parameters.iter()
    }

    pub fn len(&self) -> usize {
        self.parameters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parameters.is_empty()
    }
}

fn validate_parameter_name(name: &str) -> DriverResult<()> {
    let mut chars = name.chars();
    let starts_well = chars
        .next()
        .is_some_and(|ch| ch.is_ascii_alphabetic() || ch == '_');

    if !starts_well || !chars.all(|ch| ch.is_ascii_alphanumeric() || ch == '_') {
        bail!(
            ErrorKind::ValidationError,
            "Query bindings must be named",
            format!("'{name}' is not a valid named parameter, positional bindings are not supported")
        );
    }

    Ok(())
}
