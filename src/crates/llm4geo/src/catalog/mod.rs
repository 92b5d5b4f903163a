//! Function catalog.
//!
//! The catalog is the fixed set of operations the desktop plugin can execute.
//! It is built once at startup, validated, and then shared read-only
//! (`Arc<FunctionCatalog>`) by the selector, the resolver and the HTTP layer.
//!
//! The built-in QGIS catalog lives in `catalog/qgis.yaml` and is embedded in
//! the binary; a different file can be supplied through configuration.

pub mod spec;

pub use spec::{FunctionSpec, JsonType, ParameterSchema, PropertySchema};

use crate::error::{ProtocolError, Result};
use crate::schema::SchemaValidator;
use serde::Deserialize;
use std::collections::HashMap;

const BUILTIN_QGIS_CATALOG: &str = include_str!("../../catalog/qgis.yaml");

/// On-disk catalog document.
#[derive(Debug, Clone, Deserialize)]
pub struct CatalogDocument {
    pub functions: Vec<FunctionSpec>,
}

/// Immutable registry of supported functions.
#[derive(Debug, Clone)]
pub struct FunctionCatalog {
    specs: Vec<FunctionSpec>,
    index: HashMap<String, usize>,
    validators: HashMap<String, SchemaValidator>,
}

impl FunctionCatalog {
    /// Build a catalog, checking that names are unique and every parameter
    /// schema compiles.
    pub fn new(specs: Vec<FunctionSpec>) -> Result<Self> {
        if specs.is_empty() {
            return Err(ProtocolError::Catalog("catalog has no functions".to_string()));
        }

        let mut index = HashMap::with_capacity(specs.len());
        let mut validators = HashMap::new();

        for (position, spec) in specs.iter().enumerate() {
            if spec.name.trim().is_empty() {
                return Err(ProtocolError::Catalog(format!(
                    "function at position {} has an empty name",
                    position
                )));
            }
            if index.insert(spec.name.clone(), position).is_some() {
                return Err(ProtocolError::Catalog(format!(
                    "duplicate function name '{}'",
                    spec.name
                )));
            }

            if let Some(schema) = &spec.parameter_schema {
                let undeclared = schema.undeclared_required();
                if !undeclared.is_empty() {
                    return Err(ProtocolError::Catalog(format!(
                        "function '{}' requires undeclared properties: {}",
                        spec.name,
                        undeclared.join(", ")
                    )));
                }

                let validator = SchemaValidator::compile(schema.to_json_schema()).map_err(|e| {
                    ProtocolError::Catalog(format!("function '{}': {}", spec.name, e))
                })?;
                validators.insert(spec.name.clone(), validator);
            }
        }

        Ok(Self {
            specs,
            index,
            validators,
        })
    }

    /// Parse a catalog from YAML text.
    pub fn from_yaml_str(content: &str) -> Result<Self> {
        let document: CatalogDocument = serde_yaml::from_str(content)
            .map_err(|e| ProtocolError::Catalog(format!("failed to parse catalog: {}", e)))?;
        Self::new(document.functions)
    }

    /// The QGIS catalog shipped with the service.
    pub fn builtin() -> Result<Self> {
        Self::from_yaml_str(BUILTIN_QGIS_CATALOG)
    }

    /// All entries, in definition order.
    pub fn list(&self) -> &[FunctionSpec] {
        &self.specs
    }

    /// Look up an entry by name.
    pub fn get(&self, name: &str) -> Result<&FunctionSpec> {
        self.index
            .get(name)
            .map(|&position| &self.specs[position])
            .ok_or_else(|| ProtocolError::NotFound(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// Function names in definition order.
    pub fn names(&self) -> Vec<String> {
        self.specs.iter().map(|s| s.name.clone()).collect()
    }

    /// Compiled validator for a function's parameters. `None` for
    /// parameterless functions.
    pub fn validator(&self, name: &str) -> Result<Option<&SchemaValidator>> {
        self.get(name)?;
        Ok(self.validators.get(name))
    }

    pub fn len(&self) -> usize {
        self.specs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }
}
