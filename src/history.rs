//! Spec history tracking
//!
//! An append-only, per-concept sequence of realization identifiers (the
//! rendered `Concept/vM.m` strings), oldest first. Initialized from a fresh
//! variant ID file and appended to whenever a concept's variant changes.
//! Updates are idempotent: re-running with no intervening schema change
//! produces no additional entries.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{RegistryError, Result};
use crate::expand::ConceptPath;
use crate::variant::VariantIdFile;

/// The complete persisted spec history document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpecHistoryModel {
    /// Snapshot tag of the last update that touched this file
    pub version_tag: String,
    /// Per-concept realization history, oldest first
    pub concepts: BTreeMap<ConceptPath, Vec<String>>,
}

/// What an update run changed
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HistoryDelta {
    /// Concepts observed for the first time
    pub new_concepts: Vec<ConceptPath>,
    /// Concepts whose latest realization changed
    pub updated: Vec<ConceptPath>,
}

impl HistoryDelta {
    pub fn is_empty(&self) -> bool {
        self.new_concepts.is_empty() && self.updated.is_empty()
    }
}

impl SpecHistoryModel {
    /// Build a first history from a freshly generated variant ID file:
    /// one single-entry sequence per concept
    pub fn initialize(variant_file: &VariantIdFile) -> Self {
        let concepts = variant_file
            .concepts
            .iter()
            .map(|(path, entry)| (path.clone(), vec![entry.id.clone()]))
            .collect();
        Self {
            version_tag: variant_file.version_tag.clone(),
            concepts,
        }
    }

    /// Merge a newly bumped variant ID file into this history
    ///
    /// Appends the rendered variant for every concept whose latest recorded
    /// entry differs, creates sequences for new concepts, and leaves
    /// everything else untouched. Existing prefixes are never modified.
    pub fn update(&self, variant_file: &VariantIdFile) -> (SpecHistoryModel, HistoryDelta) {
        let mut next = self.clone();
        let mut delta = HistoryDelta::default();

        for (path, entry) in &variant_file.concepts {
            match next.concepts.get_mut(path) {
                None => {
                    next.concepts.insert(path.clone(), vec![entry.id.clone()]);
                    delta.new_concepts.push(path.clone());
                }
                Some(history) => {
                    if history.last().map(String::as_str) != Some(entry.id.as_str()) {
                        history.push(entry.id.clone());
                        delta.updated.push(path.clone());
                    }
                }
            }
        }

        if delta.is_empty() {
            return (self.clone(), delta);
        }

        info!(
            new = delta.new_concepts.len(),
            updated = delta.updated.len(),
            "spec history updated"
        );
        next.version_tag = variant_file.version_tag.clone();
        (next, delta)
    }

    /// The latest recorded realization for a concept
    pub fn latest(&self, path: &ConceptPath) -> Option<&str> {
        self.concepts.get(path)?.last().map(String::as_str)
    }

    /// Load the prior history for an update run
    pub fn load_for_update(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(RegistryError::InconsistentState {
                operation: "history update".to_string(),
                missing: format!("previous spec history file at {}", path.display()),
            });
        }
        Self::load(path)
    }

    /// Load and validate a spec history file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)?;
        let model: SpecHistoryModel =
            serde_json::from_str(&content).map_err(|e| RegistryError::MalformedInput {
                path: path.display().to_string(),
                detail: e.to_string(),
            })?;
        for (concept, history) in &model.concepts {
            if history.is_empty() {
                return Err(RegistryError::MalformedInput {
                    path: path.display().to_string(),
                    detail: format!("concept '{concept}' has an empty history"),
                });
            }
        }
        Ok(model)
    }

    /// Write the whole file atomically (temp file, then rename)
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diff::Verdict;
    use crate::variant::{bump_variants, PrunePolicy};

    fn paths(names: &[&str]) -> Vec<ConceptPath> {
        names.iter().map(|n| ConceptPath::new(*n)).collect()
    }

    #[test]
    fn test_initialize_one_entry_per_concept() {
        let variants =
            VariantIdFile::initialize(&paths(&["Vehicle", "Vehicle.speed"]), "v1.0.0").unwrap();
        let history = SpecHistoryModel::initialize(&variants);

        assert_eq!(
            history.concepts[&ConceptPath::new("Vehicle.speed")],
            vec!["Vehicle.speed/v1.0".to_string()]
        );
        assert_eq!(history.latest(&ConceptPath::new("Vehicle")), Some("Vehicle/v1.0"));
    }

    #[test]
    fn test_update_appends_only_changed_concepts() {
        let current = paths(&["Vehicle", "Vehicle.speed"]);
        let v1 = VariantIdFile::initialize(&current, "v1.0.0").unwrap();
        let history = SpecHistoryModel::initialize(&v1);

        let verdicts = [(ConceptPath::new("Vehicle.speed"), Verdict::NonBreaking)]
            .into_iter()
            .collect();
        let v2 = bump_variants(&v1, &current, &verdicts, "v1.1.0", PrunePolicy::Retain).unwrap();

        let (updated, delta) = history.update(&v2);
        assert_eq!(delta.updated, paths(&["Vehicle.speed"]));
        assert!(delta.new_concepts.is_empty());
        assert_eq!(
            updated.concepts[&ConceptPath::new("Vehicle.speed")],
            vec!["Vehicle.speed/v1.0".to_string(), "Vehicle.speed/v1.1".to_string()]
        );
        // untouched concept gains nothing
        assert_eq!(updated.concepts[&ConceptPath::new("Vehicle")].len(), 1);
    }

    #[test]
    fn test_update_is_idempotent() {
        let current = paths(&["Vehicle.speed"]);
        let variants = VariantIdFile::initialize(&current, "v1.0.0").unwrap();
        let history = SpecHistoryModel::initialize(&variants);

        let (once, delta1) = history.update(&variants);
        let (twice, delta2) = once.update(&variants);

        assert!(delta1.is_empty());
        assert!(delta2.is_empty());
        assert_eq!(history, once);
        assert_eq!(once, twice);
    }

    #[test]
    fn test_new_concept_gets_a_fresh_sequence() {
        let v1 = VariantIdFile::initialize(&paths(&["Vehicle"]), "v1.0.0").unwrap();
        let history = SpecHistoryModel::initialize(&v1);

        let current = paths(&["Vehicle", "Vehicle.speed"]);
        let v2 = bump_variants(&v1, &current, &BTreeMap::new(), "v1.1.0", PrunePolicy::Retain)
            .unwrap();

        let (updated, delta) = history.update(&v2);
        assert_eq!(delta.new_concepts, paths(&["Vehicle.speed"]));
        assert_eq!(
            updated.concepts[&ConceptPath::new("Vehicle.speed")],
            vec!["Vehicle.speed/v1.0".to_string()]
        );
    }

    #[test]
    fn test_history_prefix_is_preserved() {
        let current = paths(&["Window.position"]);
        let v1 = VariantIdFile::initialize(&current, "v1.0.0").unwrap();
        let mut history = SpecHistoryModel::initialize(&v1);
        let mut variants = v1;

        for (i, verdict) in [Verdict::BreakingOrDangerous, Verdict::NonBreaking]
            .into_iter()
            .enumerate()
        {
            let before = history.concepts[&ConceptPath::new("Window.position")].clone();
            let verdicts = [(ConceptPath::new("Window.position"), verdict)]
                .into_iter()
                .collect();
            variants = bump_variants(
                &variants,
                &current,
                &verdicts,
                &format!("v1.{}.0", i + 1),
                PrunePolicy::Retain,
            )
            .unwrap();
            let (next, _) = history.update(&variants);
            let after = &next.concepts[&ConceptPath::new("Window.position")];
            assert_eq!(&after[..before.len()], before.as_slice());
            assert_eq!(after.len(), before.len() + 1);
            history = next;
        }

        assert_eq!(
            history.concepts[&ConceptPath::new("Window.position")],
            vec![
                "Window.position/v1.0".to_string(),
                "Window.position/v2.0".to_string(),
                "Window.position/v2.1".to_string(),
            ]
        );
    }

    #[test]
    fn test_save_and_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("spec_history.json");

        let variants = VariantIdFile::initialize(&paths(&["Vehicle.speed"]), "v1.0.0").unwrap();
        let history = SpecHistoryModel::initialize(&variants);
        history.save(&path).unwrap();

        let loaded = SpecHistoryModel::load(&path).unwrap();
        assert_eq!(loaded, history);
    }

    #[test]
    fn test_load_rejects_empty_history() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("spec_history.json");
        fs::write(
            &path,
            r#"{ "version_tag": "v1.0.0", "concepts": { "Vehicle.speed": [] } }"#,
        )
        .unwrap();

        assert!(matches!(
            SpecHistoryModel::load(&path).unwrap_err(),
            RegistryError::MalformedInput { .. }
        ));
    }

    #[test]
    fn test_update_without_previous_state_is_inconsistent() {
        let err = SpecHistoryModel::load_for_update("/nonexistent/spec_history.json").unwrap_err();
        assert!(matches!(err, RegistryError::InconsistentState { .. }));
    }
}
