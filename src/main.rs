//! # News Store CLI (`nstore`)
//!
//! Operator interface over the storage layer: save batches produced by the
//! collectors, search the index, and inspect or convert archives.
//!
//! ## Usage
//!
//! ```bash
//! nstore --config ./config/nstore.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `nstore init` | Create data directories and the index schema |
//! | `nstore validate <file>` | Report validation errors for a JSON batch |
//! | `nstore save <file>` | Validate, persist, compress and index a batch |
//! | `nstore index <file>` | Index an existing canonical file |
//! | `nstore search` | Search the index |
//! | `nstore compress <file>` | Compress a JSON file (gzip or xz) |
//! | `nstore decompress <file>` | Print the JSON inside an archive |
//! | `nstore stats` | Show index statistics |
//!
//! Logs go to stderr and honour `RUST_LOG` (default `info`).

use anyhow::{bail, Context};
use chrono::{DateTime, NaiveDate, Utc};
use clap::{Parser, Subcommand};
use serde_json::Value;
use std::path::{Path, PathBuf};
use tracing_subscriber::{fmt as tfmt, EnvFilter};

use news_store::compressor::{self, Codec};
use news_store::config::{self, Config};
use news_store::stats;
use news_store::validator;
use news_store::{Area, NewsStorage, SearchQuery, StoreError};

const DEFAULT_CONFIG_PATH: &str = "./config/nstore.toml";

/// News Store CLI: validated, compressed and indexed storage for
/// collected news items.
#[derive(Parser)]
#[command(
    name = "nstore",
    about = "News Store — validated, compressed and indexed storage for collected news items",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    ///
    /// Defaults to `./config/nstore.toml` when that file exists, otherwise
    /// built-in defaults (`data/` and `data/news_index.db`) are used.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

/// Top-level CLI commands.
#[derive(Subcommand)]
enum Commands {
    /// Create the data directories and the index schema.
    ///
    /// Idempotent; running it multiple times is safe.
    Init,

    /// Check a JSON array of items without writing anything.
    ///
    /// Exits non-zero if any item is invalid.
    Validate {
        /// JSON file holding an array of items.
        file: PathBuf,
    },

    /// Validate, clean, persist, compress and index a batch.
    Save {
        /// JSON file holding an array of items.
        file: PathBuf,

        /// Store under `raw/` instead of `processed/`.
        #[arg(long)]
        raw: bool,
    },

    /// Index an existing canonical JSON file.
    ///
    /// Indexing the same file twice creates duplicate rows.
    Index {
        /// Canonical JSON file.
        file: PathBuf,
    },

    /// Search indexed items.
    Search {
        /// Substring of the title.
        #[arg(long)]
        query: Option<String>,

        /// Exact source name.
        #[arg(long)]
        source: Option<String>,

        /// Exact category.
        #[arg(long)]
        category: Option<String>,

        /// Minimum relevance (inclusive).
        #[arg(long)]
        min_relevance: Option<f64>,

        /// Published on or after (RFC 3339 or YYYY-MM-DD).
        #[arg(long)]
        since: Option<String>,

        /// Published on or before (RFC 3339 or YYYY-MM-DD, whole day).
        #[arg(long)]
        until: Option<String>,

        /// Maximum number of results.
        #[arg(long)]
        limit: Option<i64>,

        /// Print results as a JSON array.
        #[arg(long)]
        json: bool,
    },

    /// Compress a JSON file.
    Compress {
        /// Input JSON file.
        input: PathBuf,

        /// Output path (defaults to the input with `.json.gz`/`.json.xz`).
        #[arg(long)]
        output: Option<PathBuf>,

        /// Codec: `gzip` or `xz`. Defaults to `[storage].codec`.
        #[arg(long)]
        codec: Option<String>,
    },

    /// Print the JSON stored in an archive.
    Decompress {
        /// Archive path.
        input: PathBuf,

        /// Codec: `gzip` or `xz`. Inferred from the extension when omitted.
        #[arg(long)]
        codec: Option<String>,
    },

    /// Show index statistics.
    Stats {
        /// Print as JSON.
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let cli = Cli::parse();
    let cfg = resolve_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Init => {
            let storage = NewsStorage::open(&cfg).await?;
            println!(
                "Initialized data root {} and index {}.",
                storage.data_root().display(),
                storage.index().db_path().display()
            );
        }
        Commands::Validate { file } => {
            let items = read_items(&file)?;
            let errors = validator::validate_items(&items);
            if errors.is_empty() {
                println!("{} items valid.", items.len());
            } else {
                for (index, item_errors) in errors.iter() {
                    println!("item {}:", index);
                    for e in item_errors {
                        println!("  - {}", e);
                    }
                }
                println!("{} of {} items invalid.", errors.len(), items.len());
                std::process::exit(1);
            }
        }
        Commands::Save { file, raw } => {
            let items = read_items(&file)?;
            let storage = NewsStorage::open(&cfg).await?;
            let area = if raw { Area::Raw } else { Area::Processed };
            let report = match storage.save(&items, area).await {
                Ok(r) => r,
                Err(StoreError::Validation(errors)) => {
                    for (index, item_errors) in errors.iter() {
                        eprintln!("item {}: {}", index, item_errors.join("; "));
                    }
                    bail!("{} item(s) failed validation; nothing saved", errors.len());
                }
                Err(e) => return Err(e.into()),
            };
            println!("saved {} items", report.item_count);
            println!("  file:       {}", report.path.display());
            println!("  compressed: {}", report.compressed_path.display());
            println!("  ratio:      {:.2}%", report.compression_ratio * 100.0);
        }
        Commands::Index { file } => {
            let storage = NewsStorage::open(&cfg).await?;
            let count = storage.index().index_file(&file).await?;
            println!("indexed {} items from {}", count, file.display());
        }
        Commands::Search {
            query,
            source,
            category,
            min_relevance,
            since,
            until,
            limit,
            json,
        } => {
            let search = SearchQuery {
                query,
                source,
                category,
                min_relevance,
                start_date: since.as_deref().map(|s| parse_bound(s, false)).transpose()?,
                end_date: until.as_deref().map(|s| parse_bound(s, true)).transpose()?,
                limit: Some(limit.unwrap_or(cfg.search.default_limit)),
            };

            let storage = NewsStorage::open(&cfg).await?;
            let results = storage.search(&search).await?;

            if json {
                println!("{}", serde_json::to_string_pretty(&results)?);
            } else if results.is_empty() {
                println!("No results.");
            } else {
                for (i, item) in results.iter().enumerate() {
                    println!("{}. {} / {}", i + 1, item.source, item.title);
                    println!(
                        "    published: {}",
                        item.published.as_deref().unwrap_or("(unknown)")
                    );
                    if let Some(r) = item.relevance {
                        println!("    relevance: {:.1}", r);
                    }
                    if !item.categories.is_empty() {
                        let cats: Vec<&str> = item.categories.keys().map(String::as_str).collect();
                        println!("    categories: {}", cats.join(", "));
                    }
                    println!("    link: {}", item.link);
                    println!();
                }
            }
        }
        Commands::Compress {
            input,
            output,
            codec,
        } => {
            let codec = match codec {
                Some(name) => name.parse::<Codec>()?,
                None => cfg.storage.codec,
            };
            let written = compressor::compress_file(&input, output.as_deref(), codec)?;
            let ratio = compressor::compression_ratio(&input, &written)?;
            println!("{} -> {} ({})", input.display(), written.display(), codec);
            println!("  ratio: {:.2}%", ratio * 100.0);
        }
        Commands::Decompress { input, codec } => {
            let codec = codec.map(|name| name.parse::<Codec>()).transpose()?;
            let data: Value = compressor::decompress(&input, codec)?;
            println!("{}", serde_json::to_string_pretty(&data)?);
        }
        Commands::Stats { json } => {
            let storage = NewsStorage::open(&cfg).await?;
            let summary = storage.index().stats().await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&summary)?);
            } else {
                stats::print_stats(&summary);
            }
        }
    }

    Ok(())
}

/// Explicit `--config` must exist; otherwise fall back to the default path,
/// then to built-in defaults.
fn resolve_config(explicit: Option<&Path>) -> anyhow::Result<Config> {
    if let Some(path) = explicit {
        return Ok(config::load_config(path)?);
    }
    let default_path = Path::new(DEFAULT_CONFIG_PATH);
    if default_path.exists() {
        return Ok(config::load_config(default_path)?);
    }
    tracing::debug!("no config file found, using defaults");
    Ok(Config::default())
}

fn read_items(path: &Path) -> anyhow::Result<Vec<Value>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let items: Vec<Value> = serde_json::from_str(&content)
        .with_context(|| format!("{} is not a JSON array", path.display()))?;
    Ok(items)
}

/// Parse a date bound. A bare `YYYY-MM-DD` means the start of that day, or
/// its last nanosecond when `end_of_day` is set.
fn parse_bound(raw: &str, end_of_day: bool) -> anyhow::Result<DateTime<Utc>> {
    if let Ok(date) = NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d") {
        let naive = if end_of_day {
            date.and_hms_nano_opt(23, 59, 59, 999_999_999)
        } else {
            date.and_hms_opt(0, 0, 0)
        };
        if let Some(naive) = naive {
            return Ok(naive.and_utc());
        }
    }
    match validator::parse_timestamp(raw) {
        Some(dt) => Ok(dt.with_timezone(&Utc)),
        None => bail!("Invalid date '{}': expected RFC 3339 or YYYY-MM-DD", raw),
    }
}
