//! `arsenal` server binary.
//!
//! Reads `arsenal.toml` (or the path given with `--config`), opens the
//! SQLite catalogue, and either serves the HTTP API or runs one of the
//! maintenance procedures and exits.
//!
//! # Password hash generation
//!
//! To generate the argon2 PHC string for `admin_password_hash`:
//!
//! ```text
//! cargo run -p arsenal-server -- hash-password
//! ```

mod settings;

use std::path::PathBuf;

use anyhow::Context as _;
use arsenal_api::{
  AppState, AuthConfig,
  auth::{self, bootstrap_admin},
};
use arsenal_core::{maintenance::HealthReport, store::ArsenalStore as _};
use arsenal_store_sqlite::{SqliteStore, StoreOptions};
use clap::{Parser, Subcommand};
use serde::Serialize;
use tokio::net::TcpListener;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

use crate::settings::ServerConfig;

#[derive(Parser)]
#[command(author, version, about = "Arsenal weapons encyclopedia server")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "arsenal.toml")]
  config: PathBuf,

  #[command(subcommand)]
  command: Option<Command>,
}

#[derive(Subcommand, Clone, Copy)]
enum Command {
  /// Serve the HTTP API (the default).
  Serve,
  /// Print join-table integrity and row counts; exits non-zero when unhealthy.
  Health,
  /// Rebuild `weapon_manufacturers` with cascading foreign keys.
  Repair {
    /// Only delete dangling rows; keep the existing table definition.
    #[arg(long)]
    prune_only: bool,
  },
  /// Infer and insert missing weapon → manufacturer links.
  LinkManufacturers,
  /// Delete duplicate weapons, keeping the lowest id per name.
  Dedupe,
  /// Insert reference data and sample weapons.
  Seed,
  /// Print the argon2 hash for a password entered on stdin and exit.
  HashPassword,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();
  let command = cli.command.unwrap_or(Command::Serve);

  if let Command::HashPassword = command {
    let password = read_password()?;
    let hash = auth::hash_password(&password)?;
    println!("{hash}");
    return Ok(());
  }

  let cfg = ServerConfig::load(&cli.config)?;
  let store = open_store(&cfg).await?;

  match command {
    Command::Serve => serve(cfg, store).await,
    Command::Health => {
      let report = HealthReport {
        integrity: store.integrity_report().await?,
        counts:    store.table_counts().await?,
      };
      print_json(&report)?;
      if !report.is_healthy() {
        anyhow::bail!("catalogue is unhealthy; run `arsenal repair`");
      }
      Ok(())
    }
    Command::Repair { prune_only: true } => {
      let removed = store.prune_dangling_links().await.context("prune failed")?;
      tracing::info!(removed, "pruned dangling links");
      Ok(())
    }
    Command::Repair { prune_only: false } => {
      let report = store.repair_links().await.context("repair failed")?;
      print_json(&report)
    }
    Command::LinkManufacturers => {
      let report = store.link_manufacturers().await.context("linking failed")?;
      tracing::info!(
        processed = report.processed,
        inserted = report.inserted,
        unmatched = report.unmatched(),
        "linked manufacturers"
      );
      print_json(&report)
    }
    Command::Dedupe => {
      let report = store.remove_duplicate_weapons().await.context("dedupe failed")?;
      print_json(&report)
    }
    Command::Seed => {
      let report = store.seed_sample_data().await.context("seeding failed")?;
      print_json(&report)
    }
    Command::HashPassword => Ok(()),
  }
}

async fn open_store(cfg: &ServerConfig) -> anyhow::Result<SqliteStore> {
  let store_path = cfg.resolved_store_path();
  if let Some(parent) = store_path.parent().filter(|p| !p.as_os_str().is_empty()) {
    std::fs::create_dir_all(parent)
      .with_context(|| format!("failed to create {}", parent.display()))?;
  }

  let options = StoreOptions { enforce_foreign_keys: cfg.enforce_foreign_keys };
  SqliteStore::open_with(&store_path, options)
    .await
    .with_context(|| format!("failed to open store at {store_path:?}"))
}

async fn serve(cfg: ServerConfig, store: SqliteStore) -> anyhow::Result<()> {
  if cfg.seed_sample_data {
    let seeded = store.seed_sample_data().await.context("seeding failed")?;
    tracing::info!(?seeded, "sample data checked");
  }

  match cfg.admin()? {
    Some((username, hash)) => {
      bootstrap_admin(&store, username, hash).await.context("admin bootstrap failed")?;
    }
    None => tracing::warn!("no admin account configured; admin endpoints are unreachable"),
  }

  let integrity = store.integrity_report().await?;
  if !integrity.is_healthy() {
    tracing::warn!(
      dangling_weapons = integrity.dangling_weapon_links,
      dangling_manufacturers = integrity.dangling_manufacturer_links,
      "weapon_manufacturers has dangling rows; run `arsenal repair`"
    );
  }

  let state = AppState::new(store, AuthConfig::with_ttl_hours(cfg.session_ttl_hours));
  let app = arsenal_api::router_with_cors(state, &cfg.cors_origins);
  let address = cfg.address();

  tracing::info!("Listening on http://{address}");
  let listener = TcpListener::bind(&address)
    .await
    .with_context(|| format!("failed to bind {address}"))?;

  axum::serve(listener, app).await.context("server error")?;
  Ok(())
}

fn print_json(value: &impl Serialize) -> anyhow::Result<()> {
  println!("{}", serde_json::to_string_pretty(value)?);
  Ok(())
}

/// Read a password from stdin.
fn read_password() -> anyhow::Result<String> {
  use std::io::{self, BufRead, Write};
  print!("Password: ");
  io::stdout().flush().ok();
  let mut line = String::new();
  io::stdin().lock().read_line(&mut line)?;
  Ok(line.trim_end_matches(['\r', '\n']).to_owned())
}
