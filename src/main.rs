use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;
use trq::cache::ShardCache;
use trq::config::{self, AppConfig};
use trq::corpus::HttpShardFetcher;
use trq::query::{self, CompileOptions};
use trq::scan::{CancelFlag, ScanCoordinator, ScanOptions, ScanOutcome};
use trq::{output, progress};

#[derive(Parser)]
#[command(name = "trq")]
#[command(about = "Transcript query engine for sharded record corpora")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Query to scan for (when no subcommand is given)
    #[arg(trailing_var_arg = true)]
    query: Vec<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Scan the corpus for records matching a query
    Scan {
        /// Query string
        query: String,

        /// Corpus base URL (overrides config)
        #[arg(long)]
        base_url: Option<String>,

        /// Match terms as substrings instead of whole words
        #[arg(long)]
        no_whole_words: bool,

        /// Skip the per-term frequency table
        #[arg(long)]
        no_term_frequency: bool,

        /// Bypass the persistent shard cache
        #[arg(long)]
        no_cache: bool,

        /// Maximum matching records to print
        #[arg(short, long, default_value = "20")]
        limit: usize,

        /// Disable colored output
        #[arg(long)]
        no_color: bool,
    },
    /// Parse a query and print its structure and counting pattern
    Parse {
        /// Query string
        query: String,

        /// Match terms as substrings instead of whole words
        #[arg(long)]
        no_whole_words: bool,
    },
    /// Inspect or clear the shard cache
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },
    /// Show or modify configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum CacheAction {
    /// Show cached shard count and corpus version
    Status,
    /// Remove all cached shards
    Clear,
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Print the current configuration
    Show,
    /// Set a configuration value
    Set {
        /// One of: base_url, track_term_frequency, cache_enabled, whole_words
        key: String,
        value: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Scan {
            query,
            base_url,
            no_whole_words,
            no_term_frequency,
            no_cache,
            limit,
            no_color,
        }) => {
            run_scan(
                &query,
                base_url,
                no_whole_words,
                no_term_frequency,
                no_cache,
                limit,
                !no_color,
            )
            .await?;
        }
        Some(Commands::Parse {
            query,
            no_whole_words,
        }) => {
            let node = query::parse(&query);
            println!("{node:#?}");
            let matcher = query::parse_and_compile(
                &query,
                CompileOptions {
                    whole_words: !no_whole_words,
                },
            )?;
            println!("pattern: {}", matcher.regex_source);
        }
        Some(Commands::Cache { action }) => {
            let cache = ShardCache::open(config::get_cache_dir()?)?;
            match action {
                CacheAction::Status => {
                    println!("cache dir: {}", cache.root().display());
                    println!("cached shards: {}", cache.entry_count());
                    match cache.version() {
                        Some(v) => println!("corpus version: {v}"),
                        None => println!("corpus version: (none)"),
                    }
                }
                CacheAction::Clear => {
                    cache.clear();
                    println!("cache cleared");
                }
            }
        }
        Some(Commands::Config { action }) => match action {
            ConfigAction::Show => {
                let cfg = AppConfig::load()?;
                println!("{}", serde_json::to_string_pretty(&cfg)?);
            }
            ConfigAction::Set { key, value } => {
                let mut cfg = AppConfig::load()?;
                match key.as_str() {
                    "base_url" => cfg.base_url = Some(value),
                    "track_term_frequency" => {
                        cfg.track_term_frequency = parse_bool(&key, &value)?
                    }
                    "cache_enabled" => cfg.cache_enabled = parse_bool(&key, &value)?,
                    "whole_words" => cfg.whole_words = parse_bool(&key, &value)?,
                    other => bail!("unknown config key: {other}"),
                }
                cfg.save()?;
                println!("saved");
            }
        },
        None => {
            if cli.query.is_empty() {
                bail!("no query given; try `trq scan <query>` or `trq --help`");
            }
            let raw = cli.query.join(" ");
            run_scan(&raw, None, false, false, false, 20, true).await?;
        }
    }

    Ok(())
}

async fn run_scan(
    raw: &str,
    base_url: Option<String>,
    no_whole_words: bool,
    no_term_frequency: bool,
    no_cache: bool,
    limit: usize,
    color: bool,
) -> Result<()> {
    let cfg = AppConfig::load()?;

    let base_url = base_url
        .or(cfg.base_url)
        .context("no corpus base URL; pass --base-url or run `trq config set base_url <url>`")?;

    let matcher = query::parse_and_compile(
        raw,
        CompileOptions {
            whole_words: cfg.whole_words && !no_whole_words,
        },
    )?;

    let fetcher = Arc::new(HttpShardFetcher::new(&base_url));
    let meta = fetcher.fetch_meta().await?;

    let cache = Arc::new(ShardCache::open(config::get_cache_dir()?)?);
    let options = ScanOptions {
        track_term_frequency: cfg.track_term_frequency && !no_term_frequency,
        cache_enabled: cfg.cache_enabled && !no_cache,
    };
    let coordinator = ScanCoordinator::new(cache, fetcher, options);

    let bar = progress::scan_bar();
    let outcome = coordinator
        .scan(&matcher, &meta, &CancelFlag::new(), |p| {
            bar.set_position(p.percent as u64);
            bar.set_message(p.status.clone());
        })
        .await;
    bar.finish_and_clear();

    match outcome {
        ScanOutcome::Complete(result) => {
            output::print_scan_result(&result, limit, color)?;
        }
        ScanOutcome::Cancelled => {
            println!("scan cancelled");
        }
    }

    Ok(())
}

fn parse_bool(key: &str, value: &str) -> Result<bool> {
    match value {
        "true" | "on" | "1" => Ok(true),
        "false" | "off" | "0" => Ok(false),
        _ => bail!("expected true/false for {key}, got {value:?}"),
    }
}
