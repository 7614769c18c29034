//! Model parameters handed over by the shell.

use rb_core::composite_id;
use serde::{Deserialize, Serialize};

/// Typed parameter value. Only booleans can be written to the engine's
/// parameter file; other types are kept so they can be reported.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParameterValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl ParameterValue {
    pub fn type_name(&self) -> &'static str {
        match self {
            ParameterValue::Bool(_) => "bool",
            ParameterValue::Int(_) => "int",
            ParameterValue::Float(_) => "float",
            ParameterValue::Text(_) => "string",
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            ParameterValue::Bool(b) => Some(*b),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelParameter {
    pub parameter_id: String,
    pub parameter_name: String,
    pub value: ParameterValue,
}

impl ModelParameter {
    pub fn new(
        parameter_id: impl Into<String>,
        parameter_name: impl Into<String>,
        value: ParameterValue,
    ) -> Self {
        Self {
            parameter_id: parameter_id.into(),
            parameter_name: parameter_name.into(),
            value,
        }
    }

    /// `parameterId_parameterName`, the name used by templates and the
    /// engine parameter file.
    pub fn identifier(&self) -> String {
        composite_id(&self.parameter_id, &self.parameter_name)
    }
}

/// Ordered parameter set as delivered by the shell.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParameterSet {
    #[serde(default)]
    pub parameters: Vec<ModelParameter>,
}

impl ParameterSet {
    pub fn new(parameters: Vec<ModelParameter>) -> Self {
        Self { parameters }
    }

    pub fn iter(&self) -> impl Iterator<Item = &ModelParameter> {
        self.parameters.iter()
    }

    pub fn len(&self) -> usize {
        self.parameters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parameters.is_empty()
    }

    /// Find a parameter by its `parameterId_parameterName` identifier.
    pub fn get(&self, identifier: &str) -> Option<&ModelParameter> {
        self.parameters
            .iter()
            .find(|p| p.identifier() == identifier)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn untagged_values_pick_the_narrowest_type() {
        let json = r#"{"parameters": [
            {"parameter_id": "snow", "parameter_name": "enabled", "value": true},
            {"parameter_id": "soil", "parameter_name": "layers", "value": 3},
            {"parameter_id": "soil", "parameter_name": "depth", "value": 1.25},
            {"parameter_id": "run", "parameter_name": "label", "value": "ensemble"}
        ]}"#;
        let set: ParameterSet = serde_json::from_str(json).unwrap();
        let types: Vec<_> = set.iter().map(|p| p.value.type_name()).collect();
        assert_eq!(types, vec!["bool", "int", "float", "string"]);
    }

    #[test]
    fn lookup_by_identifier() {
        let set = ParameterSet::new(vec![ModelParameter::new(
            "snow",
            "enabled",
            ParameterValue::Bool(false),
        )]);
        assert_eq!(set.get("snow_enabled").unwrap().value.as_bool(), Some(false));
        assert!(set.get("snow").is_none());
    }
}
