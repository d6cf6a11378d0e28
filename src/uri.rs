//! Concept URI building
//!
//! Assigns every declared element a stable URI scoped to a namespace and
//! prefix, plus the relationship edges downstream classification-scheme
//! tooling needs to attach concepts to polyhierarchical groupings. The
//! builder has no persisted state: the document is recomputed from the
//! schema on every run.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{RegistryError, Result};
use crate::schema::SchemaModel;

/// Kind of a declared concept
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConceptKind {
    /// An object type
    Object,
    /// A scalar- or enum-typed field
    Field,
    /// A field whose type is another object
    ObjectField,
    /// An enum type
    Enum,
    /// A single enum value
    EnumValue,
}

/// One concept node in the URI export
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConceptUriNode {
    /// Compact URI (`prefix:localname`)
    pub uri: String,
    /// Concept kind
    pub kind: ConceptKind,
    /// URIs of the fields this type declares
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub declares: Vec<String>,
    /// URI of the object type this field is typed as
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub typed_as: Option<String>,
    /// URIs of the values this enum type enumerates
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub enumerates: Vec<String>,
}

/// The complete concept URI export for one schema snapshot
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConceptUriDocument {
    /// Namespace the URIs are scoped to
    pub namespace: String,
    /// Prefix used in the compact form
    pub prefix: String,
    /// One node per declared element
    pub nodes: Vec<ConceptUriNode>,
}

impl ConceptUriDocument {
    /// Look up a node by its URI
    pub fn get(&self, uri: &str) -> Option<&ConceptUriNode> {
        self.nodes.iter().find(|n| n.uri == uri)
    }

    /// Write the export document atomically (temp file, then rename)
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let content = serde_json::to_string_pretty(self)?;
        let tmp = path.with_extension("tmp");
        fs::write(&tmp, content)?;
        fs::rename(&tmp, path)?;
        Ok(())
    }
}

/// Validate an IRI local name, rejecting reserved characters outright
///
/// Escaping would silently change the addressable name, so invalid input is
/// an error naming the offending character.
pub fn validate_local_name(name: &str) -> Result<()> {
    match name
        .chars()
        .find(|c| !(c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-')))
    {
        Some(character) => Err(RegistryError::InvalidLocalName {
            name: name.to_string(),
            character,
        }),
        None => Ok(()),
    }
}

/// Build the compact URI for a local name under a prefix
pub fn concept_uri(prefix: &str, local_name: &str) -> Result<String> {
    validate_local_name(local_name)?;
    Ok(format!("{prefix}:{local_name}"))
}

/// Build the concept URI export for a schema snapshot
///
/// Namespace and prefix are explicit parameters: URI building stays
/// referentially transparent with no ambient configuration.
pub fn build_concept_uris(
    model: &SchemaModel,
    namespace: &str,
    prefix: &str,
) -> Result<ConceptUriDocument> {
    let mut nodes = Vec::new();

    for object in &model.objects {
        let mut declares = Vec::new();
        for field in &object.fields {
            if field.is_identity() {
                continue;
            }
            declares.push(concept_uri(prefix, &format!("{}.{}", object.name, field.name))?);
        }
        nodes.push(ConceptUriNode {
            uri: concept_uri(prefix, &object.name)?,
            kind: ConceptKind::Object,
            declares,
            typed_as: None,
            enumerates: Vec::new(),
        });

        for field in &object.fields {
            if field.is_identity() {
                continue;
            }
            let field_uri = concept_uri(prefix, &format!("{}.{}", object.name, field.name))?;
            if let Some(ref nested) = field.object_type {
                nodes.push(ConceptUriNode {
                    uri: field_uri,
                    kind: ConceptKind::ObjectField,
                    declares: Vec::new(),
                    typed_as: Some(concept_uri(prefix, nested)?),
                    enumerates: Vec::new(),
                });
            } else {
                nodes.push(ConceptUriNode {
                    uri: field_uri,
                    kind: ConceptKind::Field,
                    declares: Vec::new(),
                    typed_as: None,
                    enumerates: Vec::new(),
                });
            }
        }
    }

    for enum_type in &model.enums {
        let mut enumerates = Vec::new();
        for value in &enum_type.values {
            let value_uri = concept_uri(prefix, &format!("{}.{}", enum_type.name, value))?;
            nodes.push(ConceptUriNode {
                uri: value_uri.clone(),
                kind: ConceptKind::EnumValue,
                declares: Vec::new(),
                typed_as: None,
                enumerates: Vec::new(),
            });
            enumerates.push(value_uri);
        }
        nodes.push(ConceptUriNode {
            uri: concept_uri(prefix, &enum_type.name)?,
            kind: ConceptKind::Enum,
            declares: Vec::new(),
            typed_as: None,
            enumerates,
        });
    }

    Ok(ConceptUriDocument {
        namespace: namespace.to_string(),
        prefix: prefix.to_string(),
        nodes,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{EnumType, Field, ObjectType};

    fn model() -> SchemaModel {
        SchemaModel {
            objects: vec![ObjectType {
                name: "Vehicle".to_string(),
                fields: vec![
                    Field {
                        name: "speed".to_string(),
                        data_type: "float".to_string(),
                        unit: None,
                        enum_type: None,
                        object_type: None,
                        minimum: None,
                        maximum: None,
                    },
                    Field {
                        name: "cabin".to_string(),
                        data_type: "Cabin".to_string(),
                        unit: None,
                        enum_type: None,
                        object_type: Some("Cabin".to_string()),
                        minimum: None,
                        maximum: None,
                    },
                ],
                instance_axes: vec![],
            }],
            enums: vec![EnumType {
                name: "VehicleState".to_string(),
                values: vec!["ON".to_string(), "OFF".to_string()],
            }],
        }
    }

    #[test]
    fn test_object_declares_its_fields() {
        let doc = build_concept_uris(&model(), "https://example.org/vss#", "ns").unwrap();
        let vehicle = doc.get("ns:Vehicle").unwrap();
        assert_eq!(vehicle.kind, ConceptKind::Object);
        assert!(vehicle.declares.contains(&"ns:Vehicle.speed".to_string()));
    }

    #[test]
    fn test_object_field_is_typed_as_nested_object() {
        let doc = build_concept_uris(&model(), "https://example.org/vss#", "ns").unwrap();
        let cabin = doc.get("ns:Vehicle.cabin").unwrap();
        assert_eq!(cabin.kind, ConceptKind::ObjectField);
        assert_eq!(cabin.typed_as.as_deref(), Some("ns:Cabin"));
    }

    #[test]
    fn test_enum_enumerates_its_values() {
        let doc = build_concept_uris(&model(), "https://example.org/vss#", "ns").unwrap();
        let state = doc.get("ns:VehicleState").unwrap();
        assert_eq!(state.kind, ConceptKind::Enum);
        assert_eq!(state.enumerates.len(), 2);
        assert_eq!(
            doc.get("ns:VehicleState.ON").unwrap().kind,
            ConceptKind::EnumValue
        );
    }

    #[test]
    fn test_reserved_characters_are_rejected() {
        let err = concept_uri("ns", "Vehicle speed").unwrap_err();
        assert!(matches!(
            err,
            RegistryError::InvalidLocalName { character: ' ', .. }
        ));
        assert!(concept_uri("ns", "Vehicle#speed").is_err());
        assert!(concept_uri("ns", "Vehicle.speed").is_ok());
    }

    #[test]
    fn test_save_leaves_no_temp_file_behind() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("concept_uris.json");

        let doc = build_concept_uris(&model(), "https://example.org/vss#", "ns").unwrap();
        doc.save(&path).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        let loaded: ConceptUriDocument = serde_json::from_str(&content).unwrap();
        assert_eq!(loaded.nodes.len(), doc.nodes.len());
        assert!(!dir.path().join("concept_uris.tmp").exists());
    }

    #[test]
    fn test_rebuild_is_identical() {
        let a = build_concept_uris(&model(), "https://example.org/vss#", "ns").unwrap();
        let b = build_concept_uris(&model(), "https://example.org/vss#", "ns").unwrap();
        assert_eq!(
            serde_json::to_string(&a).unwrap(),
            serde_json::to_string(&b).unwrap()
        );
    }
}
