//! API parameter models and value coercion

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::utils::validation::validate_param_name;
use crate::utils::{ConsoleError, ConsoleResult};

/// Where a parameter is read from in the incoming request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ParamLocation {
    #[default]
    Query,
    Header,
    Body,
}

/// Declared type of a parameter value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum DataType {
    #[default]
    String,
    Integer,
    Number,
    Boolean,
    Array,
    Object,
}

impl DataType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DataType::String => "string",
            DataType::Integer => "integer",
            DataType::Number => "number",
            DataType::Boolean => "boolean",
            DataType::Array => "array",
            DataType::Object => "object",
        }
    }

    /// Convert raw form text into a JSON value of this type.
    ///
    /// The input must be non-empty; empty handling (defaults, optional
    /// parameters) lives in [`Param::coerce`].
    pub fn coerce(&self, raw: &str) -> Result<Value, String> {
        match self {
            DataType::String => Ok(Value::String(raw.to_string())),
            DataType::Integer => raw
                .trim()
                .parse::<i64>()
                .map(Value::from)
                .map_err(|_| format!("'{}' is not an integer", raw)),
            DataType::Number => {
                let n = raw
                    .trim()
                    .parse::<f64>()
                    .map_err(|_| format!("'{}' is not a number", raw))?;
                serde_json::Number::from_f64(n)
                    .map(Value::Number)
                    .ok_or_else(|| format!("'{}' is not a finite number", raw))
            }
            DataType::Boolean => match raw.trim().to_lowercase().as_str() {
                "true" | "1" | "yes" => Ok(Value::Bool(true)),
                "false" | "0" | "no" => Ok(Value::Bool(false)),
                _ => Err(format!("'{}' is not a boolean", raw)),
            },
            DataType::Array => match serde_json::from_str::<Value>(raw) {
                Ok(v @ Value::Array(_)) => Ok(v),
                Ok(_) => Err("expected a JSON array".to_string()),
                Err(e) => Err(format!("invalid JSON array: {}", e)),
            },
            DataType::Object => match serde_json::from_str::<Value>(raw) {
                Ok(v @ Value::Object(_)) => Ok(v),
                Ok(_) => Err("expected a JSON object".to_string()),
                Err(e) => Err(format!("invalid JSON object: {}", e)),
            },
        }
    }

    /// Whether an already-typed JSON value matches this type
    pub fn accepts(&self, value: &Value) -> bool {
        match self {
            DataType::String => value.is_string(),
            DataType::Integer => value.is_i64() || value.is_u64(),
            DataType::Number => value.is_number(),
            DataType::Boolean => value.is_boolean(),
            DataType::Array => value.is_array(),
            DataType::Object => value.is_object(),
        }
    }
}

/// A declared API parameter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Param {
    pub name: String,
    #[serde(default)]
    pub location: ParamLocation,
    #[serde(default)]
    pub data_type: DataType,
    #[serde(default)]
    pub is_required: bool,
    #[serde(default)]
    pub default_value: Option<Value>,
    #[serde(default)]
    pub description: Option<String>,
}

impl Param {
    pub fn new(name: impl Into<String>, location: ParamLocation, data_type: DataType) -> Self {
        Self {
            name: name.into(),
            location,
            data_type,
            is_required: false,
            default_value: None,
            description: None,
        }
    }

    pub fn required(mut self) -> Self {
        self.is_required = true;
        self
    }

    pub fn with_default(mut self, value: Value) -> Self {
        self.default_value = Some(value);
        self
    }

    /// Coerce a raw form value for this parameter.
    ///
    /// Empty input falls back to the default value, then to `null` for
    /// optional parameters. A required parameter with neither is an error.
    pub fn coerce(&self, raw: Option<&str>) -> ConsoleResult<Value> {
        match raw.filter(|r| !r.trim().is_empty()) {
            Some(raw) => self
                .data_type
                .coerce(raw)
                .map_err(|e| ConsoleError::validation(format!("Parameter '{}': {}", self.name, e))),
            None => match &self.default_value {
                Some(Value::String(s)) if self.data_type != DataType::String => self
                    .data_type
                    .coerce(s)
                    .map_err(|e| {
                        ConsoleError::validation(format!(
                            "Parameter '{}' default: {}",
                            self.name, e
                        ))
                    }),
                Some(value) => Ok(value.clone()),
                None if self.is_required => Err(ConsoleError::validation(format!(
                    "Parameter '{}' is required",
                    self.name
                ))),
                None => Ok(Value::Null),
            },
        }
    }
}

/// A validation script attached to a parameter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParamValidate {
    /// Target parameter name
    pub name: String,
    /// Python validation script
    pub validation_script: String,
    /// Message returned when validation fails
    #[serde(default)]
    pub message: Option<String>,
}

/// Coerce a set of raw form values against a parameter list.
///
/// Values for undeclared names are rejected so typos surface before the
/// request is sent.
pub fn coerce_params(
    params: &[Param],
    raw: &HashMap<String, String>,
) -> ConsoleResult<Map<String, Value>> {
    if let Some(unknown) = raw.keys().find(|k| !params.iter().any(|p| &p.name == *k)) {
        return Err(ConsoleError::validation(format!(
            "Unknown parameter '{}'",
            unknown
        )));
    }

    let mut out = Map::new();
    for param in params {
        let value = param.coerce(raw.get(&param.name).map(String::as_str))?;
        if !value.is_null() {
            out.insert(param.name.clone(), value);
        }
    }
    Ok(out)
}

/// Check that parameter names are valid identifiers and unique within an API
pub fn check_declarations(params: &[Param]) -> ConsoleResult<()> {
    let mut seen = std::collections::HashSet::new();
    for param in params {
        if !validate_param_name(&param.name) {
            return Err(ConsoleError::validation(format!(
                "Invalid parameter name '{}'",
                param.name
            )));
        }
        if !seen.insert(param.name.as_str()) {
            return Err(ConsoleError::validation(format!(
                "Duplicate parameter name '{}'",
                param.name
            )));
        }
    }
    Ok(())
}

/// Check already-typed values against their declarations.
///
/// Undeclared names are left to the server; `null` passes for optional
/// parameters.
pub fn check_typed_values(params: &[Param], values: &Map<String, Value>) -> ConsoleResult<()> {
    for param in params {
        match values.get(&param.name) {
            Some(Value::Null) if !param.is_required => {}
            Some(value) if !param.data_type.accepts(value) => {
                return Err(ConsoleError::validation(format!(
                    "Parameter '{}' must be of type {}",
                    param.name,
                    param.data_type.as_str()
                )));
            }
            _ => {}
        }
    }
    Ok(())
}
