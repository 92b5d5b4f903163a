//! YAML loading for catalog files
//!
//! Catalog files may reference the environment with `${ENV_VAR:default}`,
//! which is expanded in every string value before deserialization.

use super::ConfigError;
use crate::catalog::{CatalogDocument, FunctionCatalog};
use serde::de::DeserializeOwned;
use serde_json::Value as JsonValue;
use serde_yaml::Value as YamlValue;
use std::env;
use std::fs;
use std::path::Path;

/// Load a YAML file and expand environment references.
pub fn load_yaml_file<P: AsRef<Path>>(path: P) -> Result<YamlValue, ConfigError> {
    let path = path.as_ref();
    let content = fs::read_to_string(path).map_err(|source| ConfigError::ReadError {
        path: path.to_path_buf(),
        source,
    })?;

    let mut value: YamlValue = serde_yaml::from_str(&content)
        .map_err(|e| ConfigError::YamlError(format!("{}: {}", path.display(), e)))?;

    expand_variables(&mut value);
    Ok(value)
}

/// Load and deserialize a YAML file into a specific type
pub fn load_yaml_config<T: DeserializeOwned, P: AsRef<Path>>(path: P) -> Result<T, ConfigError> {
    let yaml = load_yaml_file(path)?;
    let json = yaml_to_json(&yaml)?;

    serde_json::from_value(json)
        .map_err(|e| ConfigError::YamlError(format!("Failed to deserialize: {}", e)))
}

/// Load a function catalog from a YAML file.
pub fn load_catalog<P: AsRef<Path>>(path: P) -> Result<FunctionCatalog, ConfigError> {
    let path = path.as_ref();
    let document: CatalogDocument = load_yaml_config(path)?;
    let catalog =
        FunctionCatalog::new(document.functions).map_err(|e| ConfigError::Catalog(e.to_string()))?;

    tracing::info!(path = %path.display(), functions = catalog.len(), "Loaded function catalog");
    Ok(catalog)
}

fn expand_variables(value: &mut YamlValue) {
    match value {
        YamlValue::String(s) => {
            if let Some(expanded) = expand_env_in_string(s) {
                *s = expanded;
            }
        }
        YamlValue::Mapping(map) => {
            for (_, v) in map.iter_mut() {
                expand_variables(v);
            }
        }
        YamlValue::Sequence(seq) => {
            for item in seq.iter_mut() {
                expand_variables(item);
            }
        }
        _ => {}
    }
}

/// Expand environment variables in a string
///
/// Supports syntax: ${ENV_VAR:default_value}
fn expand_env_in_string(s: &str) -> Option<String> {
    if !s.contains("${") {
        return None;
    }

    let re = regex::Regex::new(r"\$\{([^:}]+)(?::([^}]*))?\}").ok()?;
    let expanded = re.replace_all(s, |cap: &regex::Captures<'_>| {
        let default_value = cap.get(2).map(|m| m.as_str()).unwrap_or("");
        env::var(&cap[1]).unwrap_or_else(|_| default_value.to_string())
    });

    Some(expanded.into_owned())
}

/// Convert a YAML value to JSON.
///
/// Integers stay integers so schema keywords like `minItems` survive.
pub fn yaml_to_json(yaml: &YamlValue) -> Result<JsonValue, ConfigError> {
    match yaml {
        YamlValue::Null => Ok(JsonValue::Null),
        YamlValue::Bool(b) => Ok(JsonValue::Bool(*b)),
        YamlValue::Number(n) => {
            if let Some(i) = n.as_i64() {
                Ok(JsonValue::Number(i.into()))
            } else if let Some(u) = n.as_u64() {
                Ok(JsonValue::Number(u.into()))
            } else if let Some(f) = n.as_f64() {
                serde_json::Number::from_f64(f)
                    .map(JsonValue::Number)
                    .ok_or_else(|| ConfigError::YamlError(format!("Invalid number: {}", f)))
            } else {
                Err(ConfigError::YamlError("Invalid number".to_string()))
            }
        }
        YamlValue::String(s) => Ok(JsonValue::String(s.clone())),
        YamlValue::Sequence(seq) => {
            let json_seq: Result<Vec<JsonValue>, _> = seq.iter().map(yaml_to_json).collect();
            Ok(JsonValue::Array(json_seq?))
        }
        YamlValue::Mapping(map) => {
            let mut json_map = serde_json::Map::new();
            for (k, v) in map {
                let key = match k {
                    YamlValue::String(s) => s.clone(),
                    _ => {
                        return Err(ConfigError::YamlError(
                            "Map keys must be strings".to_string(),
                        ))
                    }
                };
                json_map.insert(key, yaml_to_json(v)?);
            }
            Ok(JsonValue::Object(json_map))
        }
        YamlValue::Tagged(tagged) => yaml_to_json(&tagged.value),
    }
}
