//! Manifest Codec CLI - operator tooling
//!
//! Commands: kinds, roundtrip, inspect, fingerprint, lint
//! Outputs JSON to stdout, logs to stderr
//! Returns 2 when a check fails, 1 on errors

use clap::{Parser, Subcommand};
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

use iiif_manifest_codec::{canonical, lint, Codec, CodecOptions, Entity, EntityRegistry, Linter};

#[derive(Parser)]
#[command(name = "manifest-codec-cli")]
#[command(about = "IIIF Manifest Codec CLI - lossless Presentation document tooling")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to a JSON codec options file
    #[arg(short, long, global = true)]
    options: Option<PathBuf>,

    /// Print compact JSON instead of pretty JSON
    #[arg(long, global = true)]
    compact: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// List registered entity kinds
    Kinds,

    /// Decode and re-encode a document
    Roundtrip {
        /// Input document, or `-` for stdin
        input: PathBuf,

        /// Fail unless the output is structurally equal to the input
        #[arg(long)]
        check: bool,
    },

    /// Summarize a decoded document graph
    Inspect {
        /// Input document, or `-` for stdin
        input: PathBuf,
    },

    /// SHA-256 of a document's canonical form
    Fingerprint {
        /// Input document, or `-` for stdin
        input: PathBuf,

        /// Fingerprint the re-encoded document instead of the raw input
        #[arg(long)]
        normalized: bool,
    },

    /// Check a document against a target Presentation version
    Lint {
        /// Input document, or `-` for stdin
        input: PathBuf,

        /// Target version, e.g. 2.1 or 3.0
        #[arg(short, long, default_value = "3.0")]
        target: String,
    },
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

fn read_input(path: &Path) -> Result<String, std::io::Error> {
    if path == Path::new("-") {
        let mut buf = String::new();
        std::io::stdin().read_to_string(&mut buf)?;
        Ok(buf)
    } else {
        std::fs::read_to_string(path)
    }
}

fn print_json(value: &Value, compact: bool) {
    let rendered = if compact {
        serde_json::to_string(value)
    } else {
        serde_json::to_string_pretty(value)
    };
    match rendered {
        Ok(text) => println!("{}", text),
        Err(e) => println!(r#"{{"success": false, "error": "{}"}}"#, e),
    }
}

fn failure(message: impl std::fmt::Display, compact: bool) -> ExitCode {
    print_json(&json!({"success": false, "error": message.to_string()}), compact);
    ExitCode::FAILURE
}

fn kinds_listing(registry: &EntityRegistry) -> Value {
    let kinds: Vec<_> = registry
        .list()
        .into_iter()
        .map(|spec| {
            json!({
                "name": spec.name,
                "abstract": spec.is_abstract,
                "mandatory": spec.mandatory,
                "tiers": spec.tiers.iter().map(|t| format!("{t:?}")).collect::<Vec<_>>(),
                "fields": spec.fields.iter().map(|d| d.name).collect::<Vec<_>>(),
                "subtypes": spec.subtypes.iter().map(|r| r.describe()).collect::<Vec<_>>(),
                "exclusive": spec.exclusive,
            })
        })
        .collect();
    let aliases: BTreeMap<_, _> = registry.aliases().into_iter().collect();
    json!({"kinds": kinds, "deprecatedAliases": aliases})
}

fn inspect(root: &Entity) -> Value {
    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
    let mut overflow = Vec::new();

    for entity in root.walk() {
        *counts.entry(entity.kind()).or_default() += 1;
        if !entity.additional().is_empty() {
            overflow.push(json!({
                "kind": entity.kind(),
                "id": entity.id(),
                "keys": entity.additional().keys().collect::<Vec<_>>(),
            }));
        }
    }

    json!({
        "kind": root.kind(),
        "id": root.id(),
        "type": root.type_name(),
        "label": root.label().first().map(|v| v.value.as_str()),
        "entities": counts,
        "overflow": overflow,
    })
}

fn main() -> ExitCode {
    init_tracing();
    let cli = Cli::parse();

    let options = match &cli.options {
        Some(path) => match CodecOptions::load(path) {
            Ok(o) => o,
            Err(e) => return failure(e, cli.compact),
        },
        None => CodecOptions::default(),
    };
    let codec = Codec::new(EntityRegistry::presentation(), options);

    match cli.command {
        Commands::Kinds => {
            print_json(&kinds_listing(codec.registry()), cli.compact);
            ExitCode::SUCCESS
        }

        Commands::Roundtrip { input, check } => {
            let raw: Value = match read_input(&input)
                .map_err(|e| e.to_string())
                .and_then(|text| serde_json::from_str(&text).map_err(|e| e.to_string()))
            {
                Ok(v) => v,
                Err(e) => return failure(format!("Invalid input: {}", e), cli.compact),
            };

            let encoded = match codec.decode_document(&raw).and_then(|entity| codec.encode(&entity)) {
                Ok(v) => v,
                Err(e) => return failure(e, cli.compact),
            };

            if check && !canonical::structurally_equal(&raw, &encoded) {
                print_json(
                    &json!({"success": false, "error": "Round-trip output differs from input", "output": encoded}),
                    cli.compact,
                );
                return ExitCode::from(2);
            }

            print_json(&encoded, cli.compact);
            ExitCode::SUCCESS
        }

        Commands::Inspect { input } => {
            let entity = match read_input(&input) {
                Ok(text) => codec.decode_str(&text),
                Err(e) => return failure(e, cli.compact),
            };
            match entity {
                Ok(entity) => {
                    print_json(&inspect(&entity), cli.compact);
                    ExitCode::SUCCESS
                }
                Err(e) => failure(e, cli.compact),
            }
        }

        Commands::Fingerprint { input, normalized } => {
            let raw: Value = match read_input(&input)
                .map_err(|e| e.to_string())
                .and_then(|text| serde_json::from_str(&text).map_err(|e| e.to_string()))
            {
                Ok(v) => v,
                Err(e) => return failure(format!("Invalid input: {}", e), cli.compact),
            };

            let subject = if normalized {
                match codec.decode_document(&raw).and_then(|entity| codec.encode(&entity)) {
                    Ok(v) => v,
                    Err(e) => return failure(e, cli.compact),
                }
            } else {
                raw
            };

            match canonical::fingerprint(&subject) {
                Ok(hash) => {
                    print_json(&json!({"sha256": hash, "normalized": normalized}), cli.compact);
                    ExitCode::SUCCESS
                }
                Err(e) => failure(e, cli.compact),
            }
        }

        Commands::Lint { input, target } => {
            let target = match lint::parse_target(&target) {
                Ok(v) => v,
                Err(e) => return failure(format!("Invalid target version: {}", e), cli.compact),
            };
            let entity = match read_input(&input) {
                Ok(text) => codec.decode_str(&text),
                Err(e) => return failure(e, cli.compact),
            };
            match entity {
                Ok(entity) => {
                    let report = Linter::new().lint(&entity, &target);
                    match serde_json::to_value(&report) {
                        Ok(v) => print_json(&v, cli.compact),
                        Err(e) => return failure(e, cli.compact),
                    }
                    if report.has_errors() {
                        ExitCode::from(2)
                    } else {
                        ExitCode::SUCCESS
                    }
                }
                Err(e) => failure(e, cli.compact),
            }
        }
    }
}
