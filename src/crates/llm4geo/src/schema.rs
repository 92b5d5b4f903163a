//! Structural validation of model output against JSON Schema.
//!
//! Model output is untrusted input. Everything produced by an extraction is
//! run through a [`SchemaValidator`] before it is handed to a caller.

use crate::error::{ProtocolError, Result};
use jsonschema::JSONSchema;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

/// A compiled JSON Schema.
///
/// Compilation happens once; validators are cheap to clone and share across
/// concurrent requests.
#[derive(Clone)]
pub struct SchemaValidator {
    schema: Value,
    compiled: Arc<JSONSchema>,
}

impl SchemaValidator {
    /// Compile a schema. Fails if the schema itself is malformed.
    pub fn compile(schema: Value) -> Result<Self> {
        let compiled = JSONSchema::compile(&schema)
            .map_err(|e| ProtocolError::Catalog(format!("Invalid JSON Schema: {}", e)))?;

        Ok(Self {
            schema,
            compiled: Arc::new(compiled),
        })
    }

    /// The schema document this validator was built from.
    pub fn schema(&self) -> &Value {
        &self.schema
    }

    /// Validate an instance.
    ///
    /// On failure returns one diagnostic line per violation, formatted as
    /// `<instance path>: <message>` and joined with `; `.
    pub fn validate(&self, instance: &Value) -> std::result::Result<(), String> {
        match self.compiled.validate(instance) {
            Ok(()) => Ok(()),
            Err(errors) => {
                let messages: Vec<String> = errors
                    .map(|e| {
                        let path = e.instance_path.to_string();
                        let path = if path.is_empty() { "/".to_string() } else { path };
                        format!("{}: {}", path, e)
                    })
                    .collect();
                Err(messages.join("; "))
            }
        }
    }

    /// Whether an instance satisfies the schema.
    pub fn is_valid(&self, instance: &Value) -> bool {
        self.compiled.is_valid(instance)
    }
}

impl fmt::Debug for SchemaValidator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SchemaValidator")
            .field("schema", &self.schema)
            .finish_non_exhaustive()
    }
}
