//! Change classification
//!
//! Consumes the change-record array produced by an external schema
//! comparison engine and rolls each record up to the concept whose variant
//! it affects. The registry is agnostic to how the comparison is computed:
//! anything that can emit `{path, criticality}` records satisfies
//! [`DiffSource`].

use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{RegistryError, Result};
use crate::expand::ConceptPath;

/// Criticality of a single change, as reported by the diff engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Criticality {
    NonBreaking,
    Dangerous,
    Breaking,
}

/// Per-concept verdict after merging all changes that roll up to it
///
/// DANGEROUS outranks NON_BREAKING and is versioned like a break: consumers
/// may already depend on the old shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    NonBreaking,
    BreakingOrDangerous,
}

impl From<Criticality> for Verdict {
    fn from(criticality: Criticality) -> Self {
        match criticality {
            Criticality::NonBreaking => Verdict::NonBreaking,
            Criticality::Dangerous | Criticality::Breaking => Verdict::BreakingOrDangerous,
        }
    }
}

/// A single change record from the external diff engine
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChangeRecord {
    /// Change kind (e.g., "FIELD_TYPE_CHANGED", "ENUM_VALUE_ADDED")
    #[serde(rename = "type")]
    pub kind: String,
    /// Criticality level
    pub criticality: Criticality,
    /// Full path to the changed element
    #[serde(default)]
    pub path: String,
    /// Human-readable description
    #[serde(default)]
    pub message: String,
    /// Concept the engine already resolved this change to, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub concept_name: Option<String>,
    /// Name of the type containing the change
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub type_name: Option<String>,
    /// Name of the field that changed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field_name: Option<String>,
}

impl ChangeRecord {
    /// Roll this record up to its owning concept
    ///
    /// Enum-value-level changes belong to the enclosing enum type; any other
    /// change under a type belongs to `TypeName.fieldName`, discarding
    /// deeper segments (arguments, directive names). Records the engine has
    /// already resolved via `concept_name` are taken as-is.
    pub fn concept(&self) -> Option<ConceptPath> {
        if let Some(name) = self.concept_name.as_deref() {
            if !name.is_empty() {
                return Some(ConceptPath::new(name));
            }
        }

        let mut segments = self.path.split('.').filter(|s| !s.is_empty());
        let root = segments.next()?;

        if self.kind.starts_with("ENUM_VALUE") {
            return Some(ConceptPath::new(root));
        }

        match segments.next() {
            Some(field) => Some(ConceptPath::new(format!("{root}.{field}"))),
            None => Some(ConceptPath::new(root)),
        }
    }

    /// Whether this record reports the removal of the concept itself
    pub fn is_removal(&self) -> bool {
        self.kind.ends_with("_REMOVED") && !self.kind.starts_with("ENUM_VALUE")
    }
}

/// Parse the diff engine's JSON array of change records
pub fn parse_change_records(raw: &str, source: &str) -> Result<Vec<ChangeRecord>> {
    serde_json::from_str(raw).map_err(|e| RegistryError::MalformedInput {
        path: source.to_string(),
        detail: format!("expected a JSON array of change records: {e}"),
    })
}

/// Merge change records into per-concept verdicts, taking the maximum
/// criticality observed for each concept
///
/// A field-level change also counts against the owning type: the type's
/// shape changed, so its variant moves together with the field's.
pub fn classify_changes(records: &[ChangeRecord]) -> BTreeMap<ConceptPath, Verdict> {
    let mut max_criticality: BTreeMap<ConceptPath, Criticality> = BTreeMap::new();
    let mut record_criticality = |concept: ConceptPath, criticality: Criticality| {
        max_criticality
            .entry(concept)
            .and_modify(|c| *c = (*c).max(criticality))
            .or_insert(criticality);
    };

    for record in records {
        let Some(concept) = record.concept() else {
            debug!(kind = %record.kind, "change record has no resolvable concept");
            continue;
        };
        let owner = ConceptPath::new(concept.root());
        if owner != concept {
            record_criticality(owner, record.criticality);
        }
        record_criticality(concept, record.criticality);
    }

    max_criticality
        .into_iter()
        .map(|(concept, criticality)| (concept, Verdict::from(criticality)))
        .collect()
}

/// Source of change records for a pair of schema snapshots
///
/// The external comparator is a polymorphic dependency; swapping engines
/// means swapping implementations of this trait.
pub trait DiffSource {
    fn changes(&self) -> Result<Vec<ChangeRecord>>;
}

/// Change records persisted as a JSON file by the external engine
#[derive(Debug, Clone)]
pub struct JsonDiffFile {
    path: PathBuf,
}

impl JsonDiffFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl DiffSource for JsonDiffFile {
    fn changes(&self) -> Result<Vec<ChangeRecord>> {
        let raw = fs::read_to_string(&self.path)?;
        parse_change_records(&raw, &self.path.display().to_string())
    }
}

/// An in-memory change list, used by callers that drive the comparator
/// themselves (and by tests)
impl DiffSource for Vec<ChangeRecord> {
    fn changes(&self) -> Result<Vec<ChangeRecord>> {
        Ok(self.clone())
    }
}

/// Convenience for reading and classifying in one step
pub fn classify_from(source: &dyn DiffSource) -> Result<BTreeMap<ConceptPath, Verdict>> {
    Ok(classify_changes(&source.changes()?))
}
