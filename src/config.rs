use color_eyre::{eyre::eyre, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
  #[serde(default)]
  pub api: ApiConfig,
  /// Custom title for header (defaults to the API host if not set)
  pub title: Option<String>,
  #[serde(default)]
  pub lists: ListsConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
  /// Base URL of the API, e.g. "http://127.0.0.1:4200/api"
  #[serde(default = "default_api_url")]
  pub url: String,
  /// Per-request timeout
  #[serde(default = "default_timeout_secs")]
  pub timeout_secs: u64,
}

impl Default for ApiConfig {
  fn default() -> Self {
    Self {
      url: default_api_url(),
      timeout_secs: default_timeout_secs(),
    }
  }
}

fn default_api_url() -> String {
  "http://127.0.0.1:4200/api".to_string()
}

fn default_timeout_secs() -> u64 {
  30
}

#[derive(Debug, Clone, Deserialize)]
pub struct ListsConfig {
  /// Page sizes offered by the list views, smallest first
  #[serde(default = "default_page_sizes", deserialize_with = "deserialize_page_sizes")]
  pub page_sizes: Vec<u32>,
  /// How long a fetched page or count is served without refetching
  #[serde(default = "default_stale_time_ms")]
  pub stale_time_ms: u64,
}

impl Default for ListsConfig {
  fn default() -> Self {
    Self {
      page_sizes: default_page_sizes(),
      stale_time_ms: default_stale_time_ms(),
    }
  }
}

impl ListsConfig {
  pub fn stale_time(&self) -> Duration {
    Duration::from_millis(self.stale_time_ms)
  }

  /// The next larger (or smaller) configured page size
  pub fn step_page_size(&self, current: u32, larger: bool) -> u32 {
    let next = if larger {
      self.page_sizes.iter().copied().find(|s| *s > current)
    } else {
      self.page_sizes.iter().rev().copied().find(|s| *s < current)
    };
    next.unwrap_or(current)
  }
}

fn default_page_sizes() -> Vec<u32> {
  vec![10, 25, 50, 100]
}

fn default_stale_time_ms() -> u64 {
  1000
}

fn deserialize_page_sizes<'de, D>(deserializer: D) -> Result<Vec<u32>, D::Error>
where
  D: serde::Deserializer<'de>,
{
  let mut sizes: Vec<u32> = Vec::deserialize(deserializer)?;
  sizes.retain(|s| *s > 0);
  sizes.sort_unstable();
  sizes.dedup();
  if sizes.is_empty() {
    return Ok(default_page_sizes());
  }
  Ok(sizes)
}

impl Config {
  /// Load configuration from file.
  ///
  /// Search order:
  /// 1. Explicit path if provided
  /// 2. ./listsync.yaml (current directory)
  /// 3. $XDG_CONFIG_HOME/listsync/config.yaml
  ///
  /// Without any file the defaults are used.
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
      None => {
        info!("no config file found, using defaults");
        Ok(Self::default())
      }
    }
  }

  fn find_config_file() -> Option<PathBuf> {
    // Check current directory
    let local = PathBuf::from("listsync.yaml");
    if local.exists() {
      return Some(local);
    }

    // Check XDG config directory
    if let Some(config_dir) = dirs::config_dir() {
      let xdg_path = config_dir.join("listsync").join("config.yaml");
      if xdg_path.exists() {
        return Some(xdg_path);
      }
    }

    None
  }

  fn load_from_path(path: &Path) -> Result<Self> {
    let contents = std::fs::read_to_string(path)
      .map_err(|e| eyre!("Failed to read config file {}: {}", path.display(), e))?;

    let config = Self::from_yaml(&contents)
      .map_err(|e| eyre!("Failed to parse config file {}: {}", path.display(), e))?;

    info!(path = %path.display(), "loaded config");
    Ok(config)
  }

  pub fn from_yaml(contents: &str) -> Result<Self, serde_yaml::Error> {
    serde_yaml::from_str(contents)
  }

  /// Header title: the configured one, or the API host
  pub fn display_title(&self) -> String {
    if let Some(title) = &self.title {
      return title.clone();
    }
    url::Url::parse(&self.api.url)
      .ok()
      .and_then(|u| {
        let host = u.host_str()?.to_string();
        Some(match u.port() {
          Some(port) => format!("{}:{}", host, port),
          None => host,
        })
      })
      .unwrap_or_else(|| self.api.url.clone())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_empty_file_uses_defaults() {
    let config = Config::from_yaml("{}").unwrap();
    assert_eq!(config.api.url, "http://127.0.0.1:4200/api");
    assert_eq!(config.api.timeout_secs, 30);
    assert_eq!(config.lists.page_sizes, vec![10, 25, 50, 100]);
    assert_eq!(config.lists.stale_time(), Duration::from_secs(1));
  }

  #[test]
  fn test_full_file() {
    let config = Config::from_yaml(
      r#"
api:
  url: https://prefect.example.com/api
  timeout_secs: 5
title: staging
lists:
  page_sizes: [50, 0, 20, 50]
  stale_time_ms: 250
"#,
    )
    .unwrap();
    assert_eq!(config.api.timeout_secs, 5);
    assert_eq!(config.lists.page_sizes, vec![20, 50]);
    assert_eq!(config.lists.stale_time(), Duration::from_millis(250));
    assert_eq!(config.display_title(), "staging");
  }

  #[test]
  fn test_display_title_falls_back_to_host() {
    let config = Config::default();
    assert_eq!(config.display_title(), "127.0.0.1:4200");
  }

  #[test]
  fn test_step_page_size() {
    let lists = ListsConfig::default();
    assert_eq!(lists.step_page_size(10, true), 25);
    assert_eq!(lists.step_page_size(25, false), 10);
    assert_eq!(lists.step_page_size(100, true), 100);
    assert_eq!(lists.step_page_size(10, false), 10);
    // Sizes that are not configured snap to the neighbours
    assert_eq!(lists.step_page_size(30, false), 25);
  }

  #[test]
  fn test_missing_explicit_path_is_error() {
    assert!(Config::load(Some(Path::new("/nonexistent/listsync.yaml"))).is_err());
  }
}
