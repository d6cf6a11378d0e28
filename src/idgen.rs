//! Deterministic concept ID generation
//!
//! Each addressable concept gets a fixed-length digest computed over a
//! canonical identifier string built solely from its path and declared
//! disambiguators (datatype, unit, allowed enum values, range). The digest
//! is a 32-bit FNV-1 hash rendered as `0x`-prefixed upper-case hex, so two
//! runs over byte-identical input yield byte-identical IDs on any machine.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{RegistryError, Result};
use crate::expand::{expand_object, ConceptPath};
use crate::schema::{EnumType, Field, SchemaModel};

const FNV1_32_OFFSET_BASIS: u32 = 2_166_136_261;
const FNV1_32_PRIME: u32 = 16_777_619;

/// A deterministic, content-derived concept identifier
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConceptId(String);

impl ConceptId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ConceptId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// 32-bit FNV-1 hash
fn fnv1_32(identifier: &[u8]) -> u32 {
    let mut hash = FNV1_32_OFFSET_BASIS;
    for byte in identifier {
        hash = hash.wrapping_mul(FNV1_32_PRIME);
        hash ^= u32::from(*byte);
    }
    hash
}

/// Everything that participates in one concept's ID
///
/// The spec is a pure function of the schema's declared structure: no
/// timestamps, no memory addresses, no iteration order.
#[derive(Debug, Clone, PartialEq)]
pub struct IdSpec {
    /// Fully-qualified concept path
    pub name: ConceptPath,
    /// Normalized datatype of the realization
    pub data_type: String,
    /// Measurement unit, empty when absent
    pub unit: String,
    /// Canonical rendering of allowed enum values, empty when absent
    pub allowed: String,
    /// Declared range minimum
    pub minimum: Option<f64>,
    /// Declared range maximum
    pub maximum: Option<f64>,
}

impl IdSpec {
    /// Build the spec for a leaf field under the given (possibly
    /// instance-expanded) type path
    pub fn from_field(type_path: &ConceptPath, field: &Field, model: &SchemaModel) -> Self {
        let allowed = field
            .enum_type
            .as_deref()
            .and_then(|name| model.enum_type(name))
            .map(EnumType::allowed_values)
            .unwrap_or_default();

        Self {
            name: type_path.join(&field.name),
            data_type: field.data_type.clone(),
            unit: field.unit.clone().unwrap_or_default(),
            allowed,
            minimum: field.minimum,
            maximum: field.maximum,
        }
    }

    /// Build the spec for an enum type
    pub fn from_enum(enum_type: &EnumType) -> Self {
        Self {
            name: ConceptPath::new(&enum_type.name),
            data_type: "string".to_string(),
            unit: String::new(),
            allowed: enum_type.allowed_values(),
            minimum: None,
            maximum: None,
        }
    }

    /// Canonical identifier bytes fed to the hash
    ///
    /// Strict mode keeps case; otherwise the identifier is lowercased so
    /// renames differing only in case map to the same realization.
    pub fn identifier_bytes(&self, strict_mode: bool) -> Vec<u8> {
        let minimum = self.minimum.map(|v| v.to_string()).unwrap_or_default();
        let maximum = self.maximum.map(|v| v.to_string()).unwrap_or_default();
        let identifier = format!(
            "{}: unit: {}, datatype: {}, allowed: {}min: {}max: {}",
            self.name, self.unit, self.data_type, self.allowed, minimum, maximum
        );
        debug!(identifier, "canonical identifier");

        if strict_mode {
            identifier.into_bytes()
        } else {
            identifier.to_lowercase().into_bytes()
        }
    }

    /// Compute this spec's concept ID
    pub fn concept_id(&self, strict_mode: bool) -> ConceptId {
        ConceptId(format!("0x{:08X}", fnv1_32(&self.identifier_bytes(strict_mode))))
    }
}

/// Deterministic ID generator over a schema snapshot
#[derive(Debug, Clone, Copy, Default)]
pub struct IdGenerator {
    /// Case-sensitive canonical identifiers when true
    pub strict_mode: bool,
}

impl IdGenerator {
    pub fn new(strict_mode: bool) -> Self {
        Self { strict_mode }
    }

    /// Enumerate ID specs for every realization in the snapshot: leaf fields
    /// (instance-expanded where the type declares a dimension) and enum types
    pub fn id_specs(&self, model: &SchemaModel) -> Result<Vec<IdSpec>> {
        let mut specs = Vec::new();

        for object in &model.objects {
            let type_paths = expand_object(object)?;
            for type_path in &type_paths {
                for field in &object.fields {
                    if field.is_identity() || !field.is_leaf() {
                        continue;
                    }
                    specs.push(IdSpec::from_field(type_path, field, model));
                }
            }
        }

        for enum_type in &model.enums {
            specs.push(IdSpec::from_enum(enum_type));
        }

        Ok(specs)
    }

    /// Generate the full path → ID mapping for a snapshot
    ///
    /// Two distinct paths mapping to the same digest is a fatal error: the
    /// ID space is the external addressing scheme for downstream artifacts.
    pub fn generate(&self, model: &SchemaModel) -> Result<BTreeMap<ConceptPath, ConceptId>> {
        let mut ids = BTreeMap::new();
        let mut by_id: BTreeMap<ConceptId, ConceptPath> = BTreeMap::new();

        for spec in self.id_specs(model)? {
            let id = spec.concept_id(self.strict_mode);
            if let Some(existing) = by_id.get(&id) {
                return Err(RegistryError::IdCollision {
                    id: id.to_string(),
                    first: existing.to_string(),
                    second: spec.name.to_string(),
                });
            }
            debug!(path = %spec.name, id = %id, "generated concept id");
            by_id.insert(id.clone(), spec.name.clone());
            ids.insert(spec.name, id);
        }

        Ok(ids)
    }
}
