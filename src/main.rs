mod config;

use clap::{Parser, Subcommand};
use color_eyre::{eyre::eyre, Result};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use medstore::{
  CacheLayer, MemoryStorage, NotificationService, RecordStore, SqliteStorage, StatisticsService,
};

const LOG_FILE: &str = "medstore.log";

#[derive(Parser, Debug)]
#[command(name = "medstore")]
#[command(about = "Inspect and maintain the local data of the medical scheduling app")]
#[command(version)]
struct Args {
  /// Path to config file (default: $XDG_CONFIG_HOME/medstore/config.yaml)
  #[arg(short, long, global = true)]
  config: Option<PathBuf>,

  /// Use a throwaway in-memory store instead of the database file
  #[arg(long, global = true)]
  memory: bool,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
  /// Appointment statistics, overall or for one doctor or patient
  Stats {
    #[arg(long, conflicts_with = "patient")]
    doctor: Option<String>,
    #[arg(long)]
    patient: Option<String>,
  },
  /// Write a backup of every collection (stdout by default)
  Backup {
    #[arg(short, long)]
    output: Option<PathBuf>,
  },
  /// Replace every collection with the contents of a backup file
  Restore { file: PathBuf },
  /// List a user's notifications
  Notifications {
    user_id: String,
    #[arg(long)]
    mark_all_read: bool,
  },
  /// Show cache and storage counters
  Info,
  /// Delete all stored data
  Reset {
    /// Confirm the reset
    #[arg(long)]
    yes: bool,
  },
}

fn init_tracing(config: &config::Config) -> Result<WorkerGuard> {
  std::fs::create_dir_all(&config.log_dir)
    .map_err(|e| eyre!("Failed to create log dir {}: {}", config.log_dir.display(), e))?;
  let file_appender = tracing_appender::rolling::never(&config.log_dir, LOG_FILE);
  let (writer, guard) = tracing_appender::non_blocking(file_appender);

  // RUST_LOG wins over the configured level
  let filter =
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

  tracing_subscriber::registry()
    .with(fmt::layer().with_writer(writer).with_ansi(false))
    .with(filter)
    .init();
  Ok(guard)
}

fn open_store(config: &config::Config, memory: bool) -> Result<RecordStore> {
  let cache = if memory {
    CacheLayer::new(MemoryStorage::new())
  } else {
    CacheLayer::new(SqliteStorage::open(&config.database_path)?)
  };
  Ok(RecordStore::new(cache).with_ttl_minutes(config.cache.default_ttl_minutes))
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
  println!("{}", serde_json::to_string_pretty(value)?);
  Ok(())
}

async fn run(command: Command, store: RecordStore) -> Result<()> {
  match command {
    Command::Stats { doctor, patient } => {
      let stats = StatisticsService::new(store);
      match (doctor, patient) {
        (Some(id), _) => print_json(&stats.for_doctor(&id).await),
        (None, Some(id)) => print_json(&stats.for_patient(&id).await),
        (None, None) => print_json(&stats.general().await),
      }
    }
    Command::Backup { output } => {
      let blob = store.create_backup().await?;
      match output {
        Some(path) => {
          write_file(&path, &blob)?;
          info!(path = %path.display(), "Backup written");
          eprintln!("Backup written to {}", path.display());
        }
        None => println!("{}", blob),
      }
      Ok(())
    }
    Command::Restore { file } => {
      let blob = std::fs::read_to_string(&file)
        .map_err(|e| eyre!("Failed to read backup {}: {}", file.display(), e))?;
      store.restore_from_backup(&blob).await?;
      eprintln!("Restored from {}", file.display());
      Ok(())
    }
    Command::Notifications {
      user_id,
      mark_all_read,
    } => {
      let notifications = NotificationService::new(store);
      if mark_all_read {
        let marked = notifications.mark_all_read(&user_id).await?;
        eprintln!("Marked {} notification(s) read", marked);
      }
      for n in notifications.list(&user_id).await {
        println!(
          "{} {} [{}] {}: {}",
          if n.read { " " } else { "*" },
          n.created_at.format("%Y-%m-%d %H:%M"),
          n.kind.as_str(),
          n.title,
          n.message
        );
      }
      Ok(())
    }
    Command::Info => print_json(&store.cache().info().await?),
    Command::Reset { yes } => {
      if !yes {
        return Err(eyre!("Refusing to delete all data without --yes"));
      }
      store.cache().clear_all().await?;
      info!("All data deleted");
      eprintln!("All data deleted");
      Ok(())
    }
  }
}

fn write_file(path: &Path, contents: &str) -> Result<()> {
  if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
    std::fs::create_dir_all(parent)?;
  }
  std::fs::write(path, contents)
    .map_err(|e| eyre!("Failed to write {}: {}", path.display(), e))
}

#[tokio::main]
async fn main() -> Result<()> {
  color_eyre::install()?;

  let args = Args::parse();
  let config = config::Config::load(args.config.as_deref())?;
  let _guard = init_tracing(&config)?;
  info!(command = ?args.command, memory = args.memory, "Starting");

  let store = open_store(&config, args.memory)?;
  run(args.command, store).await
}
