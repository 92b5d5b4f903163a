//! Function catalog entry types.
//!
//! Parameter schemas are typed so that malformed catalog data is caught at
//! load time instead of surfacing as confusing validation errors later. They
//! serialize back to plain JSON Schema for prompts and validation.

use serde::{Deserialize, Serialize};
use serde_json::{json, Number, Value};
use std::collections::BTreeMap;

/// An immutable catalog entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionSpec {
    /// Unique key; the value the selector must produce.
    pub name: String,

    /// Model-facing documentation, embedded in prompts verbatim.
    pub description: String,

    /// `None` means the function takes no arguments.
    #[serde(default, alias = "parameters")]
    pub parameter_schema: Option<ParameterSchema>,
}

impl FunctionSpec {
    /// Create a parameterless function.
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            parameter_schema: None,
        }
    }

    /// Attach a parameter schema.
    pub fn with_parameters(mut self, schema: ParameterSchema) -> Self {
        self.parameter_schema = Some(schema);
        self
    }

    pub fn takes_parameters(&self) -> bool {
        self.parameter_schema.is_some()
    }
}

/// Object schema describing a function's arguments.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParameterSchema {
    pub properties: BTreeMap<String, PropertySchema>,

    #[serde(default)]
    pub required: Vec<String>,

    /// Whether keys outside `properties` are tolerated. Absent means the
    /// JSON Schema default (allowed).
    #[serde(
        default,
        rename = "additionalProperties",
        skip_serializing_if = "Option::is_none"
    )]
    pub additional_properties: Option<bool>,
}

impl ParameterSchema {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a required property.
    pub fn required(mut self, name: impl Into<String>, property: PropertySchema) -> Self {
        let name = name.into();
        self.required.push(name.clone());
        self.properties.insert(name, property);
        self
    }

    /// Add an optional property.
    pub fn optional(mut self, name: impl Into<String>, property: PropertySchema) -> Self {
        self.properties.insert(name.into(), property);
        self
    }

    /// Reject keys that are not declared.
    pub fn deny_additional(mut self) -> Self {
        self.additional_properties = Some(false);
        self
    }

    /// Render as a standalone JSON Schema object.
    pub fn to_json_schema(&self) -> Value {
        let mut schema = json!({
            "type": "object",
            "properties": self.properties,
            "required": self.required,
        });
        if let (Some(additional), Some(obj)) = (self.additional_properties, schema.as_object_mut()) {
            obj.insert("additionalProperties".to_string(), Value::Bool(additional));
        }
        schema
    }

    /// Required names that have no matching property.
    pub(crate) fn undeclared_required(&self) -> Vec<&str> {
        self.required
            .iter()
            .filter(|name| !self.properties.contains_key(name.as_str()))
            .map(String::as_str)
            .collect()
    }
}

/// JSON Schema primitive type names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JsonType {
    String,
    Number,
    Integer,
    Boolean,
    Array,
    Object,
}

/// Schema of a single property.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertySchema {
    #[serde(rename = "type")]
    pub kind: JsonType,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default, rename = "enum", skip_serializing_if = "Option::is_none")]
    pub allowed: Option<Vec<Value>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub items: Option<Box<PropertySchema>>,

    #[serde(default, rename = "minItems", skip_serializing_if = "Option::is_none")]
    pub min_items: Option<u64>,

    #[serde(default, rename = "maxItems", skip_serializing_if = "Option::is_none")]
    pub max_items: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub minimum: Option<Number>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub maximum: Option<Number>,
}

impl PropertySchema {
    pub fn of(kind: JsonType) -> Self {
        Self {
            kind,
            description: None,
            allowed: None,
            items: None,
            min_items: None,
            max_items: None,
            minimum: None,
            maximum: None,
        }
    }

    pub fn string() -> Self {
        Self::of(JsonType::String)
    }

    pub fn number() -> Self {
        Self::of(JsonType::Number)
    }

    pub fn integer() -> Self {
        Self::of(JsonType::Integer)
    }

    pub fn array(items: PropertySchema) -> Self {
        let mut schema = Self::of(JsonType::Array);
        schema.items = Some(Box::new(items));
        schema
    }

    pub fn describe(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Restrict to a set of string values.
    pub fn one_of<I, S>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.allowed = Some(values.into_iter().map(|v| Value::String(v.into())).collect());
        self
    }

    pub fn length(mut self, min: Option<u64>, max: Option<u64>) -> Self {
        self.min_items = min;
        self.max_items = max;
        self
    }

    pub fn range(mut self, minimum: impl Into<Number>, maximum: impl Into<Number>) -> Self {
        self.minimum = Some(minimum.into());
        self.maximum = Some(maximum.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rgb() -> PropertySchema {
        PropertySchema::array(PropertySchema::integer().range(0, 255)).length(Some(3), Some(3))
    }

    #[test]
    fn test_parameter_schema_renders_json_schema() {
        let schema = ParameterSchema::new()
            .required("layer_name", PropertySchema::string().describe("Layer"))
            .required("color", rgb());

        let json = schema.to_json_schema();
        assert_eq!(json["type"], "object");
        assert_eq!(json["required"], json!(["layer_name", "color"]));
        assert_eq!(json["properties"]["layer_name"]["description"], "Layer");
        assert_eq!(json["properties"]["color"]["minItems"], 3);
        assert_eq!(json["properties"]["color"]["items"]["maximum"], 255);
        assert!(json.get("additionalProperties").is_none());
    }

    #[test]
    fn test_deny_additional() {
        let json = ParameterSchema::new()
            .required("west", PropertySchema::number())
            .deny_additional()
            .to_json_schema();
        assert_eq!(json["additionalProperties"], false);
    }

    #[test]
    fn test_enum_roundtrips_through_yaml_names() {
        let yaml = r#"
type: string
enum: [wms]
"#;
        let property: PropertySchema = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(property, PropertySchema::string().one_of(["wms"]));
    }

    #[test]
    fn test_unknown_type_is_rejected() {
        let result: std::result::Result<PropertySchema, _> = serde_yaml::from_str("type: text");
        assert!(result.is_err());
    }

    #[test]
    fn test_undeclared_required() {
        let mut schema = ParameterSchema::new().required("uri", PropertySchema::string());
        schema.required.push("provider".to_string());
        assert_eq!(schema.undeclared_required(), vec!["provider"]);
    }

    #[test]
    fn test_parameterless_spec() {
        let spec = FunctionSpec::new("remove_all_map_layers", "Removes all map layers.");
        assert!(!spec.takes_parameters());
        let json = serde_json::to_value(&spec).unwrap();
        assert!(json["parameter_schema"].is_null());
    }
}
