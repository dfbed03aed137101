use color_eyre::{eyre::eyre, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Environment variable holding the remote API key. Takes precedence over
/// the config file so the key can stay out of version control.
const ANON_KEY_ENV: &str = "SYNCPRESS_ANON_KEY";
/// Environment variable for the remote store URL, for file-less setups.
const REMOTE_URL_ENV: &str = "SYNCPRESS_REMOTE_URL";

/// Connection settings for the hosted store.
#[derive(Debug, Clone)]
pub struct RemoteConfig {
  pub url: String,
  pub anon_key: String,
}

/// Application configuration.
///
/// `remote: None` is not an error state: it selects local-only operation,
/// where every record lives in the fallback store.
#[derive(Debug, Clone, Default)]
pub struct Config {
  pub remote: Option<RemoteConfig>,
  /// Override for the fallback store directory (defaults to the XDG data
  /// directory).
  pub data_dir: Option<PathBuf>,
}

#[derive(Debug, Deserialize)]
struct FileConfig {
  remote: Option<FileRemote>,
  data_dir: Option<PathBuf>,
}

#[derive(Debug, Deserialize)]
struct FileRemote {
  url: String,
  /// May be omitted in the file and supplied via SYNCPRESS_ANON_KEY.
  anon_key: Option<String>,
}

impl Config {
  /// Load configuration.
  ///
  /// Search order:
  /// 1. Explicit path if provided
  /// 2. ./syncpress.yaml (current directory)
  /// 3. $XDG_CONFIG_HOME/syncpress/config.yaml
  ///
  /// No file found means local-only mode, unless both remote environment
  /// variables are set.
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

    let mut config = match path {
      Some(p) => Self::load_from_path(&p)?,
      None => Config::default(),
    };

    // Environment completes or overrides the file
    if let Ok(url) = std::env::var(REMOTE_URL_ENV) {
      let anon_key = config
        .remote
        .as_ref()
        .map(|r| r.anon_key.clone())
        .unwrap_or_default();
      config.remote = Some(RemoteConfig { url, anon_key });
    }
    if let Ok(key) = std::env::var(ANON_KEY_ENV) {
      if let Some(remote) = &mut config.remote {
        remote.anon_key = key;
      }
    }

    if let Some(remote) = &config.remote {
      if remote.anon_key.is_empty() {
        return Err(eyre!(
          "Remote store configured without an API key. Set anon_key in the config file or the {} environment variable.",
          ANON_KEY_ENV
        ));
      }
    }

    Ok(config)
  }

  fn find_config_file() -> Option<PathBuf> {
    let local = PathBuf::from("syncpress.yaml");
    if local.exists() {
      return Some(local);
    }

    if let Some(config_dir) = dirs::config_dir() {
      let xdg_path = config_dir.join("syncpress").join("config.yaml");
      if xdg_path.exists() {
        return Some(xdg_path);
      }
    }

    None
  }

  fn load_from_path(path: &Path) -> Result<Self> {
    let contents = std::fs::read_to_string(path)
      .map_err(|e| eyre!("Failed to read config file {}: {}", path.display(), e))?;

    let file: FileConfig = serde_yaml::from_str(&contents)
      .map_err(|e| eyre!("Failed to parse config file {}: {}", path.display(), e))?;

    Ok(Config {
      remote: file.remote.map(|r| RemoteConfig {
        url: r.url,
        anon_key: r.anon_key.unwrap_or_default(),
      }),
      data_dir: file.data_dir,
    })
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn yaml_without_remote_selects_local_only() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.yaml");
    std::fs::write(&path, "data_dir: /tmp/syncpress-test\n").unwrap();

    let config = Config::load_from_path(&path).unwrap();
    assert!(config.remote.is_none());
    assert_eq!(config.data_dir.as_deref(), Some(Path::new("/tmp/syncpress-test")));
  }

  #[test]
  fn yaml_remote_section_parses() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.yaml");
    std::fs::write(
      &path,
      "remote:\n  url: https://example.supabase.co\n  anon_key: abc\n",
    )
    .unwrap();

    let config = Config::load_from_path(&path).unwrap();
    let remote = config.remote.unwrap();
    assert_eq!(remote.url, "https://example.supabase.co");
    assert_eq!(remote.anon_key, "abc");
  }
}
