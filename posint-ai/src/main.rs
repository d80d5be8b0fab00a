//! posint-ai - Political post extraction CLI
//!
//! - `parse`: run the consensus engine over one post (optionally resolving
//!   its locations) and print the result as JSON
//! - `resolve`: resolve one place name against the geography dataset
//!
//! Logs go to stderr so stdout stays machine-readable.

use std::io::Read;
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use chrono::{Local, NaiveDate};
use clap::{Parser, Subcommand};
use posint_ai::config::build_resolver;
use posint_ai::consensus::ConsensusEngine;
use posint_ai::geo::{GeoResolver, ResolutionHints};
use posint_ai::pipeline::ingest_post;
use posint_common::config::TomlConfig;
use serde::Serialize;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Command-line arguments for posint-ai
#[derive(Parser, Debug)]
#[command(name = "posint-ai")]
#[command(about = "Structured extraction and geo resolution for political posts")]
#[command(version)]
struct Args {
    /// Configuration file (overrides POSINT_CONFIG and the per-user default)
    #[arg(short, long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Extract event type, places, people, organizations and schemes from a post
    Parse {
        /// Post text (read from stdin when omitted)
        #[arg(long)]
        text: Option<String>,

        /// Item identifier (random UUID when omitted)
        #[arg(long)]
        id: Option<String>,

        /// Reference date, YYYY-MM-DD (today when omitted)
        #[arg(long)]
        date: Option<NaiveDate>,

        /// Resolve extracted locations against the geography dataset
        #[arg(long)]
        resolve_geo: bool,
    },

    /// Resolve a place name to the administrative hierarchy
    Resolve {
        /// Place name as written
        name: String,

        /// Declared district (repeatable)
        #[arg(long)]
        district: Vec<String>,

        /// Declared block (repeatable)
        #[arg(long)]
        block: Vec<String>,

        /// Free text used for context scoring
        #[arg(long)]
        context: Option<String>,

        /// Never guess: no match is an error, ambiguity returns all candidates
        #[arg(long)]
        strict: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut config =
        TomlConfig::load(args.config.as_deref()).context("Failed to load configuration")?;

    init_tracing(&config.logging.level);

    info!(
        "Starting posint-ai v{} ({} built {}, {})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );

    match args.command {
        Command::Parse {
            text,
            id,
            date,
            resolve_geo,
        } => {
            let text = match text {
                Some(text) => text,
                None => read_stdin()?,
            };
            let id = id.unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
            let date = date.unwrap_or_else(|| Local::now().date_naive());

            let resolver = build_resolver(&config.geo).context("Failed to load geography")?;
            if resolve_geo && !resolver.is_initialized() {
                bail!("--resolve-geo needs [geo] dataset_path in the configuration");
            }

            let engine = ConsensusEngine::from_config(&config, gazetteer(&resolver))
                .context("Failed to configure classifier layers")?;
            info!(layers = ?engine.layer_ids(), "Consensus engine ready");

            if resolve_geo {
                let post = ingest_post(&engine, &resolver, &text, &id, date).await;
                print_json(&post)?;
            } else {
                let result = engine.parse_tweet(&text, &id, date).await;
                print_json(&result)?;
            }
        }

        Command::Resolve {
            name,
            district,
            block,
            context,
            strict,
        } => {
            config.geo.strict_mode |= strict;
            let resolver = build_resolver(&config.geo).context("Failed to load geography")?;
            if !resolver.is_initialized() {
                bail!("resolve needs [geo] dataset_path in the configuration");
            }

            let hints = ResolutionHints {
                districts: district,
                blocks: block,
                context,
            };
            let outcome = resolver
                .resolve_deterministic(&name, Some(&hints))
                .with_context(|| format!("Failed to resolve '{}'", name))?;
            print_json(&outcome)?;
        }
    }

    Ok(())
}

/// RUST_LOG wins over the configured level
fn init_tracing(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!("posint_ai={level},posint_common={level}", level = level))
    });

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

/// Village names from the loaded index (empty without a dataset)
fn gazetteer(resolver: &GeoResolver) -> Vec<String> {
    resolver
        .index()
        .map(|index| index.place_names().map(str::to_string).collect())
        .unwrap_or_default()
}

fn read_stdin() -> Result<String> {
    let mut text = String::new();
    std::io::stdin()
        .read_to_string(&mut text)
        .context("Failed to read post text from stdin")?;
    Ok(text)
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
