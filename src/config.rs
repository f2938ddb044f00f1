use color_eyre::{eyre::eyre, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

const APP_DIR: &str = "medstore";

/// Longest accepted `cache.default_ttl_minutes` (one year).
const MAX_TTL_MINUTES: i64 = 60 * 24 * 366;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
  /// SQLite file backing the durable store
  pub database_path: PathBuf,
  /// Directory for the log file
  pub log_dir: PathBuf,
  /// Filter used when RUST_LOG is not set
  pub log_level: String,
  pub cache: CacheConfig,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
  /// TTL applied to collection writes. Unset means entries never expire.
  pub default_ttl_minutes: Option<i64>,
}

fn data_dir() -> PathBuf {
  dirs::data_dir()
    .unwrap_or_else(|| PathBuf::from("."))
    .join(APP_DIR)
}

impl Default for Config {
  fn default() -> Self {
    Self {
      database_path: data_dir().join("store.db"),
      log_dir: data_dir().join("logs"),
      log_level: "info".to_string(),
      cache: CacheConfig::default(),
    }
  }
}

impl Config {
  /// Load configuration from file.
  ///
  /// Search order:
  /// 1. Explicit path if provided
  /// 2. ./medstore.yaml (current directory)
  /// 3. $XDG_CONFIG_HOME/medstore/config.yaml
  ///
  /// Without a file every field takes its default.
  pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
    let path = if let Some(p) = explicit_path {
      if p.exists() {
        Some(p.to_path_buf())
      } else {
        return Err(eyre!("Config file not found: {}", p.display()));
      }
    } else {
      Self::find_config_file()
    };

    match path {
      Some(p) => Self::load_from_path(&p),
      None => Ok(Self::default()),
    }
  }

  fn find_config_file() -> Option<PathBuf> {
    let local = PathBuf::from("medstore.yaml");
    if local.exists() {
      return Some(local);
    }

    if let Some(config_dir) = dirs::config_dir() {
      let xdg_path = config_dir.join(APP_DIR).join("config.yaml");
      if xdg_path.exists() {
        return Some(xdg_path);
      }
    }

    None
  }

  fn load_from_path(path: &Path) -> Result<Self> {
    let contents = std::fs::read_to_string(path)
      .map_err(|e| eyre!("Failed to read config file {}: {}", path.display(), e))?;
    Self::parse(&contents).map_err(|e| eyre!("Failed to parse config file {}: {}", path.display(), e))
  }

  fn parse(contents: &str) -> Result<Self> {
    let config: Config = serde_yaml::from_str(contents)?;
    if let Some(ttl) = config.cache.default_ttl_minutes {
      if !(1..=MAX_TTL_MINUTES).contains(&ttl) {
        return Err(eyre!(
          "cache.default_ttl_minutes must be between 1 and {}, got {}",
          MAX_TTL_MINUTES,
          ttl
        ));
      }
    }
    Ok(config)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_partial_file_keeps_defaults() {
    let config = Config::parse("log_level: debug\n").unwrap();
    assert_eq!(config.log_level, "debug");
    assert_eq!(config.database_path, Config::default().database_path);
    assert_eq!(config.cache.default_ttl_minutes, None);
  }

  #[test]
  fn test_full_file() {
    let yaml = "\
database_path: /tmp/m/store.db
log_dir: /tmp/m/logs
log_level: warn
cache:
  default_ttl_minutes: 30
";
    let config = Config::parse(yaml).unwrap();
    assert_eq!(config.database_path, PathBuf::from("/tmp/m/store.db"));
    assert_eq!(config.log_dir, PathBuf::from("/tmp/m/logs"));
    assert_eq!(config.cache.default_ttl_minutes, Some(30));
  }

  #[test]
  fn test_rejects_out_of_range_ttl() {
    assert!(Config::parse("cache:\n  default_ttl_minutes: 0\n").is_err());
    assert!(Config::parse("cache:\n  default_ttl_minutes: 1000000000000\n").is_err());
    let max = format!("cache:\n  default_ttl_minutes: {}\n", MAX_TTL_MINUTES);
    assert_eq!(
      Config::parse(&max).unwrap().cache.default_ttl_minutes,
      Some(MAX_TTL_MINUTES)
    );
  }

  #[test]
  fn test_missing_explicit_path_is_an_error() {
    let err = Config::load(Some(Path::new("/nonexistent/medstore.yaml"))).unwrap_err();
    assert!(err.to_string().contains("Config file not found"));
  }

  #[test]
  fn test_default_paths_live_under_app_dir() {
    let config = Config::default();
    assert!(config.database_path.ends_with("medstore/store.db"));
    assert!(config.log_dir.ends_with("medstore/logs"));
  }
}
