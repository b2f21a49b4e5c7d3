use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use circledesk::bridge::Bridge;
use circledesk::cache::{CacheLayer, CacheStorage, MemoryStorage, SqliteStorage};
use circledesk::circles::{CircleAccessor, CircleApiClient};
use circledesk::commands;
use circledesk::config::{CacheBackend, Config};
use circledesk::db::Database;
use circledesk::logging;
use circledesk::vehicles::VehicleRepository;
use clap::{Parser, Subcommand};
use color_eyre::Result;
use serde_json::Value;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "circledesk")]
#[command(about = "Vehicle store and circle client for the circledesk desktop app")]
#[command(version)]
struct Args {
  /// Path to config file (default: $XDG_CONFIG_HOME/circledesk/config.yaml)
  #[arg(short, long)]
  config: Option<PathBuf>,

  /// Circle service base URL (overrides config and CIRCLEDESK_API_URL)
  #[arg(long)]
  api_url: Option<String>,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
  /// Invoke a channel; each argument is parsed as JSON, or taken as a string
  Call {
    channel: String,
    args: Vec<String>,
  },
  /// List channels, best matches for FILTER first
  Channels { filter: Option<String> },
  /// Insert the sample vehicles into an empty database
  Seed,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
  color_eyre::install()?;

  let args = Args::parse();

  // Load configuration
  let mut config = Config::load(args.config.as_deref())?;
  if let Some(url) = args.api_url {
    config.remote.base_url = url;
  }

  let _log_guard = logging::init(&config.log)?;
  info!(api = %config.remote.base_url, "circledesk starting");

  if let Command::Channels { filter } = &args.command {
    print_channels(filter.as_deref().unwrap_or(""));
    return Ok(ExitCode::SUCCESS);
  }

  let db = Arc::new(Database::open(config.database.path.as_deref())?);
  let vehicles = VehicleRepository::new(db);
  if config.database.seed_samples {
    vehicles.seed_samples()?;
  }

  match args.command {
    Command::Seed => {
      let inserted = vehicles.seed_samples()?;
      println!("Inserted {} sample vehicles", inserted);
      Ok(ExitCode::SUCCESS)
    }
    Command::Call { channel, args } => {
      let args: Vec<Value> = args.into_iter().map(parse_arg).collect();
      match config.cache.backend {
        CacheBackend::Memory => call(&config, vehicles, MemoryStorage::new(), &channel, &args).await,
        CacheBackend::Sqlite => {
          let storage = SqliteStorage::open(&config.cache_path()?)?;
          call(&config, vehicles, storage, &channel, &args).await
        }
      }
    }
    Command::Channels { .. } => Ok(ExitCode::SUCCESS),
  }
}

async fn call<S: CacheStorage + 'static>(
  config: &Config,
  vehicles: VehicleRepository,
  storage: S,
  channel: &str,
  args: &[Value],
) -> Result<ExitCode> {
  let client = CircleApiClient::new(
    &config.remote.base_url,
    config.remote.timeout(),
    config.remote.token.clone(),
  )?;
  let cache = CacheLayer::new(storage).with_policy(config.remote.fallback);
  let bridge = Bridge::new(vehicles, CircleAccessor::new(client, cache));

  let envelope = bridge.handle(channel, args).await;
  println!("{}", serde_json::to_string_pretty(&envelope)?);

  // Seeded circles are still being sent to the remote
  let synced = bridge.drain().await;
  if synced > 0 {
    info!(synced, "Background creates finished");
  }

  Ok(match envelope.into_result() {
    Ok(_) => ExitCode::SUCCESS,
    Err(_) => ExitCode::FAILURE,
  })
}

/// Arguments that are not valid JSON are passed as plain strings.
fn parse_arg(raw: String) -> Value {
  serde_json::from_str(&raw).unwrap_or(Value::String(raw))
}

fn print_channels(filter: &str) {
  let channels = commands::get_suggestions(filter);
  let width = channels
    .iter()
    .map(|ch| ch.usage().len())
    .max()
    .unwrap_or(0);
  for ch in channels {
    println!("{:width$}  {}", ch.usage(), ch.description, width = width);
  }
}
