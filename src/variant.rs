//! Variant registry
//!
//! Owns the persisted mapping of concept path to semantic variant
//! (`Concept/vM.m`) plus a per-concept change counter, and applies the
//! version-bump rules driven by classified diff verdicts. The whole update
//! is computed functionally from the previous file and the verdicts; the
//! old file is never mutated in place and writes are atomic.

use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::Path;
use std::sync::OnceLock;

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::diff::Verdict;
use crate::error::{RegistryError, Result};
use crate::expand::ConceptPath;

fn variant_id_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^(?P<name>.+)/v(?P<major>\d+)\.(?P<minor>\d+)$").expect("valid regex")
    })
}

/// A semantic variant: `vMajor.Minor`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Variant {
    pub major: u64,
    pub minor: u64,
}

impl Variant {
    /// The variant every concept starts at
    pub const INITIAL: Variant = Variant { major: 1, minor: 0 };

    /// Apply a verdict: breaking resets minor, non-breaking keeps major
    pub fn bumped(self, verdict: Verdict) -> Variant {
        match verdict {
            Verdict::NonBreaking => Variant {
                major: self.major,
                minor: self.minor + 1,
            },
            Verdict::BreakingOrDangerous => Variant {
                major: self.major + 1,
                minor: 0,
            },
        }
    }
}

impl fmt::Display for Variant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}.{}", self.major, self.minor)
    }
}

/// Entry for a single concept in the variant ID file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariantEntry {
    /// Rendered variant id (`Concept/vM.m`)
    pub id: String,
    /// Increments by exactly 1 on every update that touches this concept
    pub variant_counter: u64,
    /// Version tag when the concept was removed from the schema
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub removed_in_version: Option<String>,
}

impl VariantEntry {
    /// Fresh entry for a newly observed concept
    pub fn initial(path: &ConceptPath) -> Self {
        Self {
            id: format!("{}/{}", path, Variant::INITIAL),
            variant_counter: 1,
            removed_in_version: None,
        }
    }

    /// Parse the rendered id into its concept name and variant
    pub fn parse_id(&self) -> Result<(String, Variant)> {
        let captures = variant_id_regex()
            .captures(&self.id)
            .ok_or_else(|| RegistryError::InvalidVariantId(self.id.clone()))?;
        let major = captures["major"]
            .parse()
            .map_err(|_| RegistryError::InvalidVariantId(self.id.clone()))?;
        let minor = captures["minor"]
            .parse()
            .map_err(|_| RegistryError::InvalidVariantId(self.id.clone()))?;
        Ok((captures["name"].to_string(), Variant { major, minor }))
    }

    /// The semantic variant recorded in the id
    pub fn variant(&self) -> Result<Variant> {
        Ok(self.parse_id()?.1)
    }

    /// Produce the successor entry for a classified change
    pub fn bumped(&self, verdict: Verdict) -> Result<VariantEntry> {
        let (name, variant) = self.parse_id()?;
        Ok(VariantEntry {
            id: format!("{}/{}", name, variant.bumped(verdict)),
            variant_counter: self.variant_counter + 1,
            removed_in_version: self.removed_in_version.clone(),
        })
    }
}

/// Retention policy for concepts that disappeared from the schema
///
/// Removing an entry silently would lose its version lineage, so pruning is
/// an explicit caller decision, never automatic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PrunePolicy {
    /// Keep entries for removed concepts, stamped with `removed_in_version`
    #[default]
    Retain,
    /// Drop entries for concepts no longer in the schema
    Prune,
}

/// The complete persisted variant ID file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariantIdFile {
    /// Schema snapshot tag this file was generated against (e.g., "v1.2.0")
    pub version_tag: String,
    /// Generation context only; never participates in any identity
    pub generated_at: DateTime<Utc>,
    /// Per-concept variant entries
    pub concepts: BTreeMap<ConceptPath, VariantEntry>,
}

impl VariantIdFile {
    /// Fresh registry for a first snapshot: every concept at `v1.0`, counter 1
    pub fn initialize<'a>(
        paths: impl IntoIterator<Item = &'a ConceptPath>,
        version_tag: &str,
    ) -> Result<Self> {
        validate_version_tag(version_tag)?;
        let concepts = paths
            .into_iter()
            .map(|path| (path.clone(), VariantEntry::initial(path)))
            .collect();
        Ok(Self {
            version_tag: version_tag.to_string(),
            generated_at: Utc::now(),
            concepts,
        })
    }

    /// Load the prior file for an update run
    ///
    /// Update mode without a previous file is an inconsistent invocation,
    /// not a fresh start; the error names the mode and the missing input.
    pub fn load_for_update(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(RegistryError::InconsistentState {
                operation: "variant update".to_string(),
                missing: format!("previous variant ID file at {}", path.display()),
            });
        }
        Self::load(path)
    }

    /// Load and validate a variant ID file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)?;
        let file: VariantIdFile =
            serde_json::from_str(&content).map_err(|e| RegistryError::MalformedInput {
                path: path.display().to_string(),
                detail: e.to_string(),
            })?;
        file.validate()?;
        Ok(file)
    }

    /// Write the whole file atomically (temp file, then rename) so a crash
    /// mid-write cannot leave half-written state behind
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

    /// Check that every rendered id parses and names its map key
    pub fn validate(&self) -> Result<()> {
        for (path, entry) in &self.concepts {
            let (name, _) = entry.parse_id()?;
            if name != path.as_str() {
                return Err(RegistryError::MalformedInput {
                    path: path.to_string(),
                    detail: format!("entry id '{}' does not match its concept key", entry.id),
                });
            }
        }
        Ok(())
    }

    /// Rendered variant id strings, keyed by concept path
    pub fn rendered_ids(&self) -> BTreeMap<ConceptPath, String> {
        self.concepts
            .iter()
            .map(|(path, entry)| (path.clone(), entry.id.clone()))
            .collect()
    }
}

/// Validate a snapshot version tag (`v1.2.3` or `1.2.3`)
pub fn validate_version_tag(tag: &str) -> Result<semver::Version> {
    let stripped = tag.strip_prefix('v').unwrap_or(tag);
    semver::Version::parse(stripped).map_err(|e| RegistryError::InvalidVersionTag(format!("{tag}: {e}")))
}

/// Apply the variant-bump state machine to a previous file
///
/// Per concept in the current snapshot:
/// - unseen → `v1.0`, counter 1;
/// - no verdict → entry copied unchanged;
/// - `NonBreaking` → minor += 1, counter += 1;
/// - `BreakingOrDangerous` → major += 1, minor reset, counter += 1.
///
/// Concepts only present in the previous file are retained (stamped with
/// `removed_in_version` when the diff recorded the removal) unless pruning
/// was explicitly requested. A no-op diff returns the previous file
/// unchanged, metadata included.
pub fn bump_variants(
    previous: &VariantIdFile,
    current_paths: &[ConceptPath],
    verdicts: &BTreeMap<ConceptPath, Verdict>,
    version_tag: &str,
    prune: PrunePolicy,
) -> Result<VariantIdFile> {
    validate_version_tag(version_tag)?;
    previous.validate()?;

    let mut concepts = BTreeMap::new();

    for path in current_paths {
        let entry = match previous.concepts.get(path) {
            None => VariantEntry::initial(path),
            Some(prev) => match verdicts.get(path) {
                None => prev.clone(),
                Some(verdict) => {
                    let next = prev.bumped(*verdict)?;
                    info!(concept = %path, from = %prev.id, to = %next.id, "variant bumped");
                    next
                }
            },
        };
        concepts.insert(path.clone(), entry);
    }

    for (path, prev) in &previous.concepts {
        if concepts.contains_key(path) {
            continue;
        }
        match prune {
            PrunePolicy::Prune => {
                warn!(concept = %path, "pruning concept no longer present in schema");
            }
            PrunePolicy::Retain => {
                let mut entry = prev.clone();
                if verdicts.contains_key(path) && entry.removed_in_version.is_none() {
                    entry.removed_in_version = Some(version_tag.to_string());
                    info!(concept = %path, version = version_tag, "concept removed from schema");
                } else if !verdicts.contains_key(path) {
                    warn!(concept = %path, "concept absent from schema with no recorded removal");
                }
                concepts.insert(path.clone(), entry);
            }
        }
    }

    if concepts == previous.concepts {
        return Ok(previous.clone());
    }

    Ok(VariantIdFile {
        version_tag: version_tag.to_string(),
        generated_at: Utc::now(),
        concepts,
    })
}
