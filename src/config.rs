//! Configuration management for the concept registry
//!
//! Supports loading configuration from:
//! - Default values
//! - Config file (concepts.toml)
//! - Environment variables (CONCEPTS_*)
//!
//! ## Example config file (concepts.toml):
//! ```toml
//! [registry]
//! variant_ids = "./registry/variant_ids.json"
//! spec_history = "./registry/spec_history.json"
//! concept_uris = "./registry/concept_uris.json"
//!
//! [uri]
//! namespace = "https://example.org/vss#"
//! prefix = "ns"
//!
//! [idgen]
//! strict_mode = false
//!
//! [policy]
//! prune_removed = false
//! ```
//!
//! The configuration only feeds the CLI with defaults; library call
//! signatures still take namespace, prefix, and policies explicitly.

use config_crate::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::variant::PrunePolicy;

/// Main configuration for the concept registry
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConceptConfig {
    /// Registry file locations
    #[serde(default)]
    pub registry: RegistryFiles,

    /// URI builder settings
    #[serde(default)]
    pub uri: UriConfig,

    /// ID generation settings
    #[serde(default)]
    pub idgen: IdGenConfig,

    /// Retention policy settings
    #[serde(default)]
    pub policy: PolicyConfig,
}

/// Locations of the persisted registry files
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistryFiles {
    /// Variant ID file
    #[serde(default = "default_variant_ids_path")]
    pub variant_ids: PathBuf,

    /// Spec history file
    #[serde(default = "default_spec_history_path")]
    pub spec_history: PathBuf,

    /// Concept URI export
    #[serde(default = "default_concept_uris_path")]
    pub concept_uris: PathBuf,
}

/// URI builder defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UriConfig {
    /// Namespace the URIs are scoped to
    #[serde(default = "default_namespace")]
    pub namespace: String,

    /// Prefix used in the compact URI form
    #[serde(default = "default_prefix")]
    pub prefix: String,
}

/// ID generation defaults
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IdGenConfig {
    /// Case-sensitive canonical identifiers
    #[serde(default)]
    pub strict_mode: bool,
}

/// Retention policy defaults
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PolicyConfig {
    /// Drop entries for concepts removed from the schema
    #[serde(default)]
    pub prune_removed: bool,
}

impl PolicyConfig {
    /// The prune policy this configuration selects
    pub fn prune_policy(&self) -> PrunePolicy {
        if self.prune_removed {
            PrunePolicy::Prune
        } else {
            PrunePolicy::Retain
        }
    }
}

fn default_variant_ids_path() -> PathBuf {
    PathBuf::from("registry/variant_ids.json")
}

fn default_spec_history_path() -> PathBuf {
    PathBuf::from("registry/spec_history.json")
}

fn default_concept_uris_path() -> PathBuf {
    PathBuf::from("registry/concept_uris.json")
}

fn default_namespace() -> String {
    "https://example.org/vss#".to_string()
}

fn default_prefix() -> String {
    "ns".to_string()
}

impl Default for RegistryFiles {
    fn default() -> Self {
        Self {
            variant_ids: default_variant_ids_path(),
            spec_history: default_spec_history_path(),
            concept_uris: default_concept_uris_path(),
        }
    }
}

impl Default for UriConfig {
    fn default() -> Self {
        Self {
            namespace: default_namespace(),
            prefix: default_prefix(),
        }
    }
}

impl ConceptConfig {
    /// Load configuration from default locations
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(None)
    }

    /// Load configuration from a specific file
    pub fn load_from(config_path: Option<&str>) -> Result<Self, ConfigError> {
        let mut builder = Config::builder();

        let config_locations = ["concepts.toml", ".concepts.toml", "config/concepts.toml"];
        for location in config_locations {
            builder = builder.add_source(File::with_name(location).required(false));
        }

        if let Some(path) = config_path {
            builder = builder.add_source(File::with_name(path).required(true));
        }

        builder = builder.add_source(
            Environment::with_prefix("CONCEPTS")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder.build()?;
        config.try_deserialize()
    }

    /// Save configuration to a file
    pub fn save(&self, path: &str) -> std::io::Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        std::fs::write(path, content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ConceptConfig::default();
        assert_eq!(config.uri.prefix, "ns");
        assert!(!config.idgen.strict_mode);
        assert_eq!(config.policy.prune_policy(), PrunePolicy::Retain);
    }

    #[test]
    fn test_serialize_config() {
        let config = ConceptConfig::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        assert!(toml_str.contains("[registry]"));
        assert!(toml_str.contains("[uri]"));
    }

    #[test]
    fn test_prune_policy_selection() {
        let config = PolicyConfig { prune_removed: true };
        assert_eq!(config.prune_policy(), PrunePolicy::Prune);
    }
}
