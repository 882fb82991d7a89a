//! JSON schema validation of build requests.

use crate::error::ConfigError;
use serde_json::Value;

/// Schema every `--json` document is checked against.
pub const BUILD_REQUEST_SCHEMA: &str = include_str!("../../schemas/build_request.schema.json");

/// Validates a parsed JSON document.
///
/// Returns the list of human-readable violations on failure.
pub trait Validator {
    fn validate(&self, document: &Value) -> Result<(), Vec<String>>;
}

/// [`Validator`] backed by the embedded build request schema.
pub struct JsonSchemaValidator {
    compiled: jsonschema::Validator,
}

impl JsonSchemaValidator {
    /// Compile the embedded build request schema.
    pub fn new() -> Result<Self, ConfigError> {
        Self::from_schema(BUILD_REQUEST_SCHEMA)
    }

    /// Compile an arbitrary schema given as JSON text.
    pub fn from_schema(schema: &str) -> Result<Self, ConfigError> {
        let schema: Value = serde_json::from_str(schema)
            .map_err(|e| ConfigError::SchemaValidation(vec![format!("schema is not JSON: {}", e)]))?;
        let compiled = jsonschema::validator_for(&schema).map_err(|e| {
            ConfigError::SchemaValidation(vec![format!("schema failed to compile: {}", e)])
        })?;
        Ok(Self { compiled })
    }
}

impl Validator for JsonSchemaValidator {
    fn validate(&self, document: &Value) -> Result<(), Vec<String>> {
        let violations: Vec<String> = self
            .compiled
            .iter_errors(document)
            .map(|error| {
                let path = error.instance_path.to_string();
                if path.is_empty() {
                    error.to_string()
                } else {
                    format!("{}: {}", path, error)
                }
            })
            .collect();

        if violations.is_empty() {
            Ok(())
        } else {
            Err(violations)
        }
    }
}
