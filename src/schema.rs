//! Normalized schema model
//!
//! The registry does not parse schema source text. An external loader yields
//! the declared concepts in this normalized form, typically as a JSON
//! document: object types with their fields, enum types with their values,
//! instance-dimension axes, and any disambiguating unit metadata.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{RegistryError, Result};

/// A complete schema snapshot in normalized form
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SchemaModel {
    /// Declared object types
    #[serde(default)]
    pub objects: Vec<ObjectType>,
    /// Declared enum types
    #[serde(default)]
    pub enums: Vec<EnumType>,
}

/// An object type declaration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObjectType {
    /// Type name (e.g., "Vehicle")
    pub name: String,
    /// Declared fields
    #[serde(default)]
    pub fields: Vec<Field>,
    /// Instance-dimension axes; empty for non-instanced types
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub instance_axes: Vec<InstanceAxis>,
}

impl ObjectType {
    /// Whether this type's identity is parameterized by an instance dimension
    pub fn has_instances(&self) -> bool {
        !self.instance_axes.is_empty()
    }
}

/// A field declaration on an object type
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Field {
    /// Field name (e.g., "speed")
    pub name: String,
    /// Normalized datatype (e.g., "float", "string", "list[string]")
    pub data_type: String,
    /// Measurement unit, if declared
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
    /// Name of the enum type this field is typed as, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enum_type: Option<String>,
    /// Name of the object type this field nests, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub object_type: Option<String>,
    /// Declared range minimum
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub minimum: Option<f64>,
    /// Declared range maximum
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub maximum: Option<f64>,
}

impl Field {
    /// Whether this field nests another object type (structural, not a leaf)
    pub fn is_object_ref(&self) -> bool {
        self.object_type.is_some()
    }

    /// Leaf fields are scalar- or enum-typed and carry a realization ID
    pub fn is_leaf(&self) -> bool {
        !self.is_object_ref()
    }

    /// Fields named "id" are identity plumbing, not concepts
    pub fn is_identity(&self) -> bool {
        self.name.eq_ignore_ascii_case("id")
    }
}

/// An enum type declaration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnumType {
    /// Enum type name (e.g., "VehicleState")
    pub name: String,
    /// Declared values, in declaration order
    pub values: Vec<String>,
}

impl EnumType {
    /// Canonical rendering of the value set, independent of declaration order
    pub fn allowed_values(&self) -> String {
        let mut values = self.values.clone();
        values.sort();
        format!("[{}]", values.join(", "))
    }
}

/// One discrete classification axis of an instance dimension
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstanceAxis {
    /// Axis name (e.g., "row")
    pub name: String,
    /// Discrete axis values (e.g., ["Row1", "Row2"])
    pub values: Vec<String>,
}

impl SchemaModel {
    /// Load a normalized schema snapshot from a JSON file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)?;
        serde_json::from_str(&content).map_err(|e| RegistryError::MalformedInput {
            path: path.display().to_string(),
            detail: e.to_string(),
        })
    }

    /// Look up an enum type by name
    pub fn enum_type(&self, name: &str) -> Option<&EnumType> {
        self.enums.iter().find(|e| e.name == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_minimal_model() {
        let json = r#"{
            "objects": [
                {
                    "name": "Vehicle",
                    "fields": [
                        { "name": "speed", "data_type": "float", "unit": "km/h" },
                        { "name": "state", "data_type": "string", "enum_type": "VehicleState" }
                    ]
                }
            ],
            "enums": [
                { "name": "VehicleState", "values": ["ON", "OFF"] }
            ]
        }"#;

        let model: SchemaModel = serde_json::from_str(json).unwrap();
        assert_eq!(model.objects.len(), 1);
        assert_eq!(model.enums.len(), 1);
        assert!(!model.objects[0].has_instances());
        assert!(model.objects[0].fields[0].is_leaf());
    }

    #[test]
    fn test_allowed_values_is_sorted() {
        let e = EnumType {
            name: "WindowState".to_string(),
            values: vec!["OPEN".to_string(), "CLOSED".to_string()],
        };
        assert_eq!(e.allowed_values(), "[CLOSED, OPEN]");
    }

    #[test]
    fn test_identity_field_detection() {
        let f = Field {
            name: "Id".to_string(),
            data_type: "string".to_string(),
            unit: None,
            enum_type: None,
            object_type: None,
            minimum: None,
            maximum: None,
        };
        assert!(f.is_identity());
    }
}
