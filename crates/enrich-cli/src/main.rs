//! `enrich`: drive the fragment enrichment engine over a record store.
//!
//! # Usage
//!
//! ```
//! enrich register --record 3456789 --code 29200100101 --group KARNATAKA
//! enrich run --group KARNATAKA --limit 50
//! enrich show --record 3456789
//! enrich --config ~/.config/enrich/enrich.toml config
//! ```
//!
//! Settings come from the TOML file given with `--config` (default
//! `enrich.toml`, optional), overridden by `ENRICH_*` environment variables,
//! overridden in turn by command-line flags.

use std::{
  path::{Path, PathBuf},
  sync::Arc,
};

use anyhow::{Context as _, Result, bail};
use clap::{Parser, Subcommand};
use enrich_core::{
  record::{NewRecord, Period, RecordKey, RecordStatus},
  store::{EntityStore as _, WorklistQuery},
};
use enrich_engine::{BatchRunner, EngineConfig, FragmentFetcher, HttpTransport, Orchestrator};
use enrich_store_sqlite::SqliteStore;
use tracing::{info, level_filters::LevelFilter, warn};
use tracing_subscriber::EnvFilter;

// ─── CLI args ─────────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "enrich", author, version, about = "Fragment enrichment engine")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, global = true, value_name = "FILE", default_value = "enrich.toml")]
  config: PathBuf,

  /// SQLite database path (overrides `database_path`).
  #[arg(long, global = true, value_name = "PATH")]
  database: Option<PathBuf>,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
  /// Enrich every eligible record of a group.
  Run {
    /// Record group to select (e.g. a state name).
    #[arg(long)]
    group:  String,
    /// Process at most this many records; 0 means no limit.
    #[arg(long)]
    limit:  Option<usize>,
    /// Reporting period (overrides `current_period`).
    #[arg(long)]
    period: Option<u32>,
  },

  /// Print a record with its manifest and summary as JSON.
  Show {
    #[arg(long)]
    record: i64,
    #[arg(long)]
    period: Option<u32>,
  },

  /// Register or refresh a record so it enters the worklist.
  Register {
    #[arg(long)]
    record: i64,
    /// Public registry code.
    #[arg(long)]
    code:   String,
    #[arg(long)]
    group:  String,
    /// Display name; defaults to the code.
    #[arg(long)]
    name:   Option<String>,
    #[arg(long)]
    period: Option<u32>,
    /// Mark the record administratively closed.
    #[arg(long)]
    closed: bool,
  },

  /// Print the effective configuration as TOML.
  Config,
}

// ─── Entry point ──────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
  tracing_subscriber::fmt()
    .with_writer(std::io::stderr)
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();
  let config = load_config(&cli)?;

  match cli.command {
    Command::Run { group, limit, period } => {
      let config = retarget(config, period);
      run(config, group, limit).await
    }
    Command::Show { record, period } => {
      let config = retarget(config, period);
      show(config, record).await
    }
    Command::Register { record, code, group, name, period, closed } => {
      let config = retarget(config, period);
      let store = open_store(&config).await?;
      let mut input = NewRecord::pending(RecordKey::new(record, config.period()), code, group);
      if let Some(name) = name {
        input.display_name = name;
      }
      if closed {
        input.status = RecordStatus::Closed;
      }
      let record = store.upsert_record(input).await.context("failed to register record")?;
      println!("{}", serde_json::to_string_pretty(&record)?);
      Ok(())
    }
    Command::Config => {
      print!("{}", toml::to_string_pretty(&config).context("failed to serialise config")?);
      Ok(())
    }
  }
}

// ─── Commands ─────────────────────────────────────────────────────────────────

async fn run(config: EngineConfig, group: String, limit: Option<usize>) -> Result<()> {
  let store = Arc::new(open_store(&config).await?);
  let transport = HttpTransport::new(config.http_config()).context("failed to build HTTP client")?;
  let fetcher = FragmentFetcher::new(Arc::new(transport), config.retry_policy());
  let runner = BatchRunner::new(Orchestrator::new(store, fetcher), config.pacing());

  let query = WorklistQuery { group, period: config.period(), limit };

  tokio::select! {
    report = runner.run(&query) => {
      let report = report.context("batch run failed")?;
      println!("{}", serde_json::to_string_pretty(&report)?);
    }
    _ = tokio::signal::ctrl_c() => {
      warn!("interrupted; committed fragments are kept, rerun to resume");
    }
  }
  Ok(())
}

async fn show(config: EngineConfig, record_id: i64) -> Result<()> {
  let store = open_store(&config).await?;
  let key = RecordKey::new(record_id, config.period());

  let Some(record) = store.get_record(key).await.context("failed to read record")? else {
    bail!("record {key} not found");
  };
  let manifest = store.read_manifest(key).await.context("failed to read manifest")?;
  let summary = store.read_summary(key).await.context("failed to read summary")?;

  let out = serde_json::json!({
    "record":   record,
    "manifest": manifest,
    "summary":  summary,
  });
  println!("{}", serde_json::to_string_pretty(&out)?);
  Ok(())
}

// ─── Setup helpers ────────────────────────────────────────────────────────────

fn load_config(cli: &Cli) -> Result<EngineConfig> {
  let settings = config::Config::builder()
    .add_source(config::File::from(cli.config.clone()).required(false))
    .add_source(config::Environment::with_prefix("ENRICH"))
    .build()
    .context("failed to read config file")?;

  let mut config: EngineConfig = settings
    .try_deserialize()
    .context("failed to deserialise EngineConfig")?;

  if let Some(database) = &cli.database {
    config.database_path = database.clone();
  }
  Ok(config)
}

fn retarget(config: EngineConfig, period: Option<u32>) -> EngineConfig {
  match period {
    Some(p) => config.at_period(Period(p)),
    None => config,
  }
}

async fn open_store(config: &EngineConfig) -> Result<SqliteStore> {
  let path = expand_tilde(&config.database_path);
  info!(path = %path.display(), "opening store");
  SqliteStore::open(&path)
    .await
    .with_context(|| format!("failed to open store at {path:?}"))
}

/// Expand a leading `~` to the user's home directory.
fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}
