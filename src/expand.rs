//! Path expansion
//!
//! Turns a schema snapshot into the complete set of fully-qualified concept
//! paths. Types carrying an instance dimension expand into one path per
//! element of the cartesian product of their axis value sets; everything
//! else yields exactly one path.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{RegistryError, Result};
use crate::schema::{ObjectType, SchemaModel};

/// A fully-qualified, human-readable concept path
///
/// `TypeName` for a type, `TypeName.fieldName` for a field, `EnumTypeName`
/// for an enum type, `EnumTypeName.VALUE` for an enum value. Instance-expanded
/// types interleave their axis values: `Seat.Row1.DriverSide`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConceptPath(String);

impl ConceptPath {
    pub fn new(path: impl Into<String>) -> Self {
        Self(path.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The first segment: the owning type or enum name
    pub fn root(&self) -> &str {
        self.0.split('.').next().unwrap_or(&self.0)
    }

    /// Append a segment, producing a child path
    pub fn join(&self, segment: &str) -> ConceptPath {
        ConceptPath(format!("{}.{}", self.0, segment))
    }
}

impl fmt::Display for ConceptPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for ConceptPath {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// The complete set of concept paths for one schema snapshot
#[derive(Debug, Clone, Default)]
pub struct ConceptSet {
    /// Object type paths, instance-expanded where declared
    pub types: Vec<ConceptPath>,
    /// Leaf field paths (`TypePath.fieldName`)
    pub fields: Vec<ConceptPath>,
    /// Enum type paths
    pub enums: Vec<ConceptPath>,
    /// Enum value paths (`EnumName.VALUE`)
    pub enum_values: Vec<ConceptPath>,
}

impl ConceptSet {
    /// Every path in the snapshot
    pub fn all_paths(&self) -> impl Iterator<Item = &ConceptPath> {
        self.types
            .iter()
            .chain(self.fields.iter())
            .chain(self.enums.iter())
            .chain(self.enum_values.iter())
    }

    /// Paths tracked by the variant registry: types, fields, and enum types.
    /// Enum-value changes roll up to their enclosing enum, so values carry
    /// no variant entry of their own.
    pub fn registry_paths(&self) -> Vec<ConceptPath> {
        self.types
            .iter()
            .chain(self.fields.iter())
            .chain(self.enums.iter())
            .cloned()
            .collect()
    }
}

/// Expand a schema snapshot into its complete concept path set
///
/// Fails if an instance axis has zero declared values (the concept would
/// silently disappear from the expansion) or if two declarations produce the
/// same path.
pub fn expand_schema(model: &SchemaModel) -> Result<ConceptSet> {
    let mut set = ConceptSet::default();

    for object in &model.objects {
        let type_paths = expand_object(object)?;
        for type_path in &type_paths {
            for field in &object.fields {
                if field.is_identity() || !field.is_leaf() {
                    continue;
                }
                set.fields.push(type_path.join(&field.name));
            }
        }
        set.types.extend(type_paths);
    }

    for enum_type in &model.enums {
        let enum_path = ConceptPath::new(&enum_type.name);
        for value in &enum_type.values {
            set.enum_values.push(enum_path.join(value));
        }
        set.enums.push(enum_path);
    }

    let mut seen = BTreeSet::new();
    for path in set.all_paths() {
        if !seen.insert(path.clone()) {
            return Err(RegistryError::DuplicatePath(path.to_string()));
        }
    }

    Ok(set)
}

/// Expand one object type into its type-level paths
///
/// Axes are sorted by name before the product is taken so the encoding is
/// independent of declaration order.
pub fn expand_object(object: &ObjectType) -> Result<Vec<ConceptPath>> {
    if !object.has_instances() {
        return Ok(vec![ConceptPath::new(&object.name)]);
    }

    let mut axes = object.instance_axes.clone();
    axes.sort_by(|a, b| a.name.cmp(&b.name));

    for axis in &axes {
        if axis.values.is_empty() {
            return Err(RegistryError::EmptyAxis {
                concept: object.name.clone(),
                axis: axis.name.clone(),
            });
        }
    }

    let value_sets: Vec<&[String]> = axes.iter().map(|a| a.values.as_slice()).collect();
    let paths = cartesian_product(&value_sets)
        .into_iter()
        .map(|combination| ConceptPath::new(format!("{}.{}", object.name, combination.join("."))))
        .collect();

    Ok(paths)
}

/// Cartesian product of the axis value sets, in axis order
fn cartesian_product<'a>(value_sets: &[&'a [String]]) -> Vec<Vec<&'a str>> {
    let mut combinations: Vec<Vec<&str>> = vec![Vec::new()];
    for values in value_sets {
        let mut next = Vec::with_capacity(combinations.len() * values.len());
        for combination in &combinations {
            for value in *values {
                let mut extended = combination.clone();
                extended.push(value.as_str());
                next.push(extended);
            }
        }
        combinations = next;
    }
    combinations
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{EnumType, Field, InstanceAxis};

    fn leaf_field(name: &str) -> Field {
        Field {
            name: name.to_string(),
            data_type: "float".to_string(),
            unit: None,
            enum_type: None,
            object_type: None,
            minimum: None,
            maximum: None,
        }
    }

    fn seat_with_axes() -> ObjectType {
        ObjectType {
            name: "Seat".to_string(),
            fields: vec![leaf_field("position")],
            instance_axes: vec![
                InstanceAxis {
                    name: "side".to_string(),
                    values: vec!["DriverSide".to_string(), "PassengerSide".to_string()],
                },
                InstanceAxis {
                    name: "row".to_string(),
                    values: vec!["Row1".to_string(), "Row2".to_string()],
                },
            ],
        }
    }

    #[test]
    fn test_plain_type_expands_to_one_path() {
        let object = ObjectType {
            name: "Vehicle".to_string(),
            fields: vec![],
            instance_axes: vec![],
        };
        let paths = expand_object(&object).unwrap();
        assert_eq!(paths, vec![ConceptPath::new("Vehicle")]);
    }

    #[test]
    fn test_instance_expansion_is_complete() {
        let paths = expand_object(&seat_with_axes()).unwrap();
        // 2 rows x 2 sides, axes sorted by name so "row" comes first
        assert_eq!(paths.len(), 4);
        assert!(paths.contains(&ConceptPath::new("Seat.Row1.DriverSide")));
        assert!(paths.contains(&ConceptPath::new("Seat.Row2.PassengerSide")));
    }

    #[test]
    fn test_expansion_is_order_independent() {
        let mut reordered = seat_with_axes();
        reordered.instance_axes.reverse();
        assert_eq!(
            expand_object(&seat_with_axes()).unwrap(),
            expand_object(&reordered).unwrap()
        );
    }

    #[test]
    fn test_empty_axis_is_fatal() {
        let mut object = seat_with_axes();
        object.instance_axes[0].values.clear();
        let err = expand_object(&object).unwrap_err();
        assert!(matches!(err, RegistryError::EmptyAxis { .. }));
    }

    #[test]
    fn test_expand_schema_covers_all_concept_kinds() {
        let model = SchemaModel {
            objects: vec![ObjectType {
                name: "Vehicle".to_string(),
                fields: vec![leaf_field("speed"), leaf_field("id")],
                instance_axes: vec![],
            }],
            enums: vec![EnumType {
                name: "VehicleState".to_string(),
                values: vec!["ON".to_string(), "OFF".to_string()],
            }],
        };

        let set = expand_schema(&model).unwrap();
        assert_eq!(set.types, vec![ConceptPath::new("Vehicle")]);
        // "id" is identity plumbing and is skipped
        assert_eq!(set.fields, vec![ConceptPath::new("Vehicle.speed")]);
        assert_eq!(set.enums, vec![ConceptPath::new("VehicleState")]);
        assert_eq!(
            set.enum_values,
            vec![
                ConceptPath::new("VehicleState.ON"),
                ConceptPath::new("VehicleState.OFF")
            ]
        );
    }

    #[test]
    fn test_instanced_fields_expand_per_combination() {
        let model = SchemaModel {
            objects: vec![seat_with_axes()],
            enums: vec![],
        };
        let set = expand_schema(&model).unwrap();
        assert_eq!(set.types.len(), 4);
        assert_eq!(set.fields.len(), 4);
        assert!(set
            .fields
            .contains(&ConceptPath::new("Seat.Row1.DriverSide.position")));
    }

    #[test]
    fn test_duplicate_path_is_fatal() {
        let model = SchemaModel {
            objects: vec![
                ObjectType {
                    name: "Vehicle".to_string(),
                    fields: vec![],
                    instance_axes: vec![],
                },
                ObjectType {
                    name: "Vehicle".to_string(),
                    fields: vec![],
                    instance_axes: vec![],
                },
            ],
            enums: vec![],
        };
        let err = expand_schema(&model).unwrap_err();
        assert!(matches!(err, RegistryError::DuplicatePath(_)));
    }
}
