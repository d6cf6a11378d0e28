//! Concept Registry CLI
//!
//! Drives the registry pipeline against a normalized schema snapshot: path
//! expansion, deterministic ID generation, concept URI export, variant
//! bumping from an external diff, and spec history maintenance.

use std::fs;
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use concept_registry::diff::{classify_from, JsonDiffFile};
use concept_registry::{
    build_concept_uris, bump_variants, expand_schema, ConceptConfig, IdGenerator, PrunePolicy,
    SchemaModel, SpecHistoryModel, VariantIdFile,
};

#[derive(Parser)]
#[command(name = "concept-registry")]
#[command(about = "Concept identity and variant versioning registry")]
struct Cli {
    /// Path to a config file (defaults: concepts.toml, CONCEPTS_* env)
    #[arg(short, long, global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List the fully-qualified concept paths of a schema snapshot
    Expand {
        /// Normalized schema snapshot (JSON)
        #[arg(short, long)]
        schema: PathBuf,
    },

    /// Generate deterministic realization IDs for a schema snapshot
    Digest {
        /// Normalized schema snapshot (JSON)
        #[arg(short, long)]
        schema: PathBuf,

        /// Output file (stdout when omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Case-sensitive canonical identifiers
        #[arg(long)]
        strict: bool,
    },

    /// Export concept URIs and relationship edges
    Uris {
        /// Normalized schema snapshot (JSON)
        #[arg(short, long)]
        schema: PathBuf,

        /// Namespace for the URIs (config default when omitted)
        #[arg(long)]
        namespace: Option<String>,

        /// Prefix for the compact URI form (config default when omitted)
        #[arg(long)]
        prefix: Option<String>,

        /// Output file (config default when omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Create or update the variant ID file
    Ids {
        /// Normalized schema snapshot (JSON)
        #[arg(short, long)]
        schema: PathBuf,

        /// Snapshot version tag (e.g., "v1.2.0")
        #[arg(short = 'V', long)]
        version_tag: String,

        /// Previous variant ID file; omit to initialize a fresh registry
        #[arg(short, long)]
        previous: Option<PathBuf>,

        /// Change-record JSON from the external diff engine
        #[arg(short, long)]
        diff: Option<PathBuf>,

        /// Output file (config default when omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Drop entries for concepts removed from the schema
        #[arg(long)]
        prune: bool,
    },

    /// Maintain the append-only spec history
    History {
        #[command(subcommand)]
        command: HistoryCommand,
    },
}

#[derive(Subcommand)]
enum HistoryCommand {
    /// Build a first history from a variant ID file
    Init {
        /// Variant ID file
        #[arg(short, long)]
        ids: PathBuf,

        /// Output file (config default when omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Append new realizations from a bumped variant ID file
    Update {
        /// Variant ID file
        #[arg(short, long)]
        ids: PathBuf,

        /// Existing spec history file (config default when omitted)
        #[arg(long)]
        history: Option<PathBuf>,

        /// Output file (defaults to rewriting the history file in place)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let config = ConceptConfig::load_from(cli.config.as_deref())?;

    match cli.command {
        Command::Expand { schema } => {
            let model = SchemaModel::from_file(&schema)?;
            let set = expand_schema(&model)?;
            println!("📐 Concept paths for {:?}", schema);
            for path in set.all_paths() {
                println!("  {}", path);
            }
            println!();
            println!(
                "  {} types, {} fields, {} enums, {} enum values",
                set.types.len(),
                set.fields.len(),
                set.enums.len(),
                set.enum_values.len()
            );
        }

        Command::Digest {
            schema,
            output,
            strict,
        } => {
            let model = SchemaModel::from_file(&schema)?;
            let strict_mode = strict || config.idgen.strict_mode;
            let ids = IdGenerator::new(strict_mode).generate(&model)?;
            println!("🔢 Generated {} realization IDs", ids.len());

            let content = serde_json::to_string_pretty(&ids)?;
            match output {
                Some(path) => {
                    fs::write(&path, content)?;
                    println!("✅ Written to {:?}", path);
                }
                None => println!("{}", content),
            }
        }

        Command::Uris {
            schema,
            namespace,
            prefix,
            output,
        } => {
            let model = SchemaModel::from_file(&schema)?;
            let namespace = namespace.unwrap_or_else(|| config.uri.namespace.clone());
            let prefix = prefix.unwrap_or_else(|| config.uri.prefix.clone());
            let document = build_concept_uris(&model, &namespace, &prefix)?;

            let out = output.unwrap_or_else(|| config.registry.concept_uris.clone());
            document.save(&out)?;
            println!("🔗 {} concept URIs written to {:?}", document.nodes.len(), out);
        }

        Command::Ids {
            schema,
            version_tag,
            previous,
            diff,
            output,
            prune,
        } => {
            let model = SchemaModel::from_file(&schema)?;
            let set = expand_schema(&model)?;
            let current = set.registry_paths();

            let file = match previous {
                None => {
                    println!("📝 Initializing fresh variant registry ({})", version_tag);
                    VariantIdFile::initialize(&current, &version_tag)?
                }
                Some(previous_path) => {
                    let previous = VariantIdFile::load_for_update(&previous_path)?;
                    let verdicts = match diff {
                        Some(diff_path) => classify_from(&JsonDiffFile::new(diff_path))?,
                        None => Default::default(),
                    };
                    let policy = if prune || config.policy.prune_removed {
                        PrunePolicy::Prune
                    } else {
                        PrunePolicy::Retain
                    };
                    println!(
                        "📝 Bumping variants {} → {} ({} classified concepts)",
                        previous.version_tag,
                        version_tag,
                        verdicts.len()
                    );
                    bump_variants(&previous, &current, &verdicts, &version_tag, policy)?
                }
            };

            let out = output.unwrap_or_else(|| config.registry.variant_ids.clone());
            file.save(&out)?;
            println!("✅ {} variant entries written to {:?}", file.concepts.len(), out);
        }

        Command::History { command } => match command {
            HistoryCommand::Init { ids, output } => {
                let variants = VariantIdFile::load(&ids)?;
                let history = SpecHistoryModel::initialize(&variants);
                let out = output.unwrap_or_else(|| config.registry.spec_history.clone());
                history.save(&out)?;
                println!(
                    "📜 Spec history initialized with {} concepts at {:?}",
                    history.concepts.len(),
                    out
                );
            }
            HistoryCommand::Update { ids, history, output } => {
                let variants = VariantIdFile::load(&ids)?;
                let history_path = history.unwrap_or_else(|| config.registry.spec_history.clone());
                let prior = SpecHistoryModel::load_for_update(&history_path)?;
                let (updated, delta) = prior.update(&variants);

                if delta.is_empty() {
                    println!("📜 Spec history already up to date");
                } else {
                    println!(
                        "📜 Spec history: {} new, {} updated",
                        delta.new_concepts.len(),
                        delta.updated.len()
                    );
                    for path in &delta.new_concepts {
                        println!("  + {}", path);
                    }
                    for path in &delta.updated {
                        println!("  ~ {}", path);
                    }
                }

                let out = output.unwrap_or(history_path);
                updated.save(&out)?;
                println!("✅ Written to {:?}", out);
            }
        },
    }

    Ok(())
}
