//! Concept Identity & Variant Versioning Registry
//!
//! Manages the identity and evolution of schema concepts (object types,
//! fields, enum types, enum values) across versioned schema snapshots. Each
//! concept keeps a stable, human-traceable identity while exposing a
//! deterministic variant marker that increases whenever its realization
//! changes.
//!
//! ## Pipeline
//!
//! ```text
//! schema snapshot ──► expand ──► idgen / uri      (current-state identity)
//!                                      │
//! previous registry + external diff ──►│
//!                                      ▼
//!                    diff ──► variant ──► history (updated registry files)
//! ```
//!
//! - **expand**: fully-qualified concept paths, with instance dimensions
//!   expanded into the cartesian product of their axis values
//! - **idgen**: deterministic, content-derived realization IDs
//! - **uri**: namespace-scoped concept URIs plus relationship edges
//! - **diff**: normalizes external change records into per-concept verdicts
//! - **variant**: the persisted `Concept/vM.m` registry and bump rules
//! - **history**: append-only realization history per concept
//!
//! The schema comparison engine and the schema loader are external
//! collaborators: the registry consumes their normalized output and never
//! parses schema source text itself.

pub mod config;
pub mod diff;
pub mod error;
pub mod expand;
pub mod history;
pub mod idgen;
pub mod schema;
pub mod uri;
pub mod variant;

pub use config::ConceptConfig;
pub use diff::{classify_changes, ChangeRecord, Criticality, DiffSource, JsonDiffFile, Verdict};
pub use error::{RegistryError, Result};
pub use expand::{expand_schema, ConceptPath, ConceptSet};
pub use history::{HistoryDelta, SpecHistoryModel};
pub use idgen::{ConceptId, IdGenerator, IdSpec};
pub use schema::{EnumType, Field, InstanceAxis, ObjectType, SchemaModel};
pub use uri::{build_concept_uris, ConceptKind, ConceptUriDocument, ConceptUriNode};
pub use variant::{bump_variants, PrunePolicy, Variant, VariantEntry, VariantIdFile};
