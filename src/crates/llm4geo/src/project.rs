//! Project state supplied by the client.
//!
//! The description is produced by the desktop plugin and interpolated into
//! prompts as-is. It is never parsed here; [`project_description_schema`]
//! only documents the shape front-ends are expected to send.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// Opaque snapshot of the current QGIS project.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProjectDescription(Value);

impl ProjectDescription {
    pub fn new(value: Value) -> Self {
        Self(value)
    }

    /// A project with nothing in it.
    pub fn empty() -> Self {
        Self(Value::Object(Default::default()))
    }

    pub fn as_value(&self) -> &Value {
        &self.0
    }

    pub fn into_value(self) -> Value {
        self.0
    }

    /// Rendering used inside prompts.
    pub fn to_prompt_string(&self) -> String {
        match &self.0 {
            Value::Null => "{}".to_string(),
            other => serde_json::to_string_pretty(other).unwrap_or_else(|_| other.to_string()),
        }
    }
}

impl From<Value> for ProjectDescription {
    fn from(value: Value) -> Self {
        Self(value)
    }
}

/// JSON Schema describing what the plugin sends as `project_description`.
pub fn project_description_schema() -> Value {
    let names = |what: &str| {
        json!({
            "type": "array",
            "description": format!("An array of renderer {} present in the layer.", what),
            "items": {"type": "string"}
        })
    };

    json!({
        "$schema": "http://json-schema.org/draft-07/schema#",
        "type": "object",
        "properties": {
            "title": {
                "type": "string",
                "description": "The title of the QGIS project."
            },
            "file_path": {
                "type": "string",
                "description": "Path of the project file on disk."
            },
            "crs": {
                "type": "string",
                "description": "The Coordinate Reference System of the project as an EPSG code (e.g. 'EPSG:4326')."
            },
            "layers": {
                "type": "array",
                "description": "An array of layers in the QGIS project.",
                "items": {
                    "type": "object",
                    "properties": {
                        "name": {"type": "string", "description": "The name of the layer."},
                        "id": {"type": "string", "description": "The unique ID of the layer."},
                        "type": {"type": "integer", "description": "The type of the layer (0 for vector, 1 for raster)."},
                        "crs": {"type": "string", "description": "The CRS of the layer as an EPSG code."},
                        "extent": {"type": "string", "description": "The spatial extent of the layer."},
                        "feature_count": {"type": "integer", "description": "The number of features in the layer."},
                        "geometry_type": {"type": "integer", "description": "The geometry type (0 point, 1 line, 2 polygon)."},
                        "fields": {
                            "type": "array",
                            "description": "An array of field names present in the layer.",
                            "items": {"type": "string"}
                        },
                        "categories": names("categories"),
                        "ranges": names("ranges"),
                        "rules": names("rules")
                    },
                    "required": [
                        "name", "id", "type", "crs", "extent", "feature_count",
                        "geometry_type", "fields", "categories", "ranges", "rules"
                    ]
                }
            }
        },
        "required": ["title", "crs", "layers"]
    })
}
