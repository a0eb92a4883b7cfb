use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct HostConfig {
    /// Directory every `list` and `save` runs against.
    pub store_dir: PathBuf,
    pub log_level: String,
    pub log_dir: Option<PathBuf>,
    /// Native messaging host name, as registered with the browser.
    pub host_name: String,
    pub description: String,
    /// Firefox extension ids allowed to talk to the host.
    pub allowed_extensions: Vec<String>,
    /// Chromium `chrome-extension://<id>/` origins allowed to talk to the host.
    pub allowed_origins: Vec<String>,
}

impl Default for HostConfig {
    fn default() -> Self {
        HostConfig {
            store_dir: PathBuf::from("/tmp"),
            log_level: String::from("warn"),
            log_dir: None,
            host_name: String::from("com.bookmark.store"),
            description: String::from("Native messaging host for the bookmark store extension."),
            allowed_extensions: Vec::new(),
            allowed_origins: Vec::new(),
        }
    }
}

impl HostConfig {
    /// Loads the config at `config_path`, falling back to defaults when the
    /// file does not exist. Keys missing from the file take their defaults.
    pub fn load_config(config_path: &Path) -> Result<Self> {
        if !config_path.exists() {
            return Ok(Self::default());
        }

        let config_str = fs::read_to_string(config_path)
            .with_context(|| format!("failed to read {}", config_path.display()))?;
        let config: HostConfig = toml::from_str(&config_str)
            .with_context(|| format!("failed to parse {}", config_path.display()))?;

        Ok(config)
    }

    pub fn save_config(&self, config_path: &Path) -> Result<()> {
        let toml_string = toml::to_string(self)?;

        if let Some(parent) = config_path.parent() {
            fs::create_dir_all(parent)?;
        }

        let mut file = fs::File::create(config_path)?;
        file.write_all(toml_string.as_bytes())?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_missing_file_gives_defaults() -> Result<()> {
        let dir = tempdir()?;
        let config = HostConfig::load_config(&dir.path().join("absent.toml"))?;

        assert_eq!(config, HostConfig::default());
        assert_eq!(config.store_dir, PathBuf::from("/tmp"));
        Ok(())
    }

    #[test]
    fn test_partial_file_keeps_other_defaults() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("host.toml");
        fs::write(&path, "store_dir = \"/var/lib/bookmarks\"\nlog_level = \"debug\"\n")?;

        let config = HostConfig::load_config(&path)?;

        assert_eq!(config.store_dir, PathBuf::from("/var/lib/bookmarks"));
        assert_eq!(config.log_level, "debug");
        assert_eq!(config.host_name, "com.bookmark.store");
        Ok(())
    }

    #[test]
    fn test_save_then_load() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("nested").join("host.toml");
        let config = HostConfig {
            log_dir: Some(dir.path().join("logs")),
            allowed_extensions: vec!["bookmarks@example.com".into()],
            ..Default::default()
        };

        config.save_config(&path)?;

        assert_eq!(HostConfig::load_config(&path)?, config);
        Ok(())
    }

    #[test]
    fn test_invalid_toml_is_an_error() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("host.toml");
        fs::write(&path, "store_dir = [")?;

        assert!(HostConfig::load_config(&path).is_err());
        Ok(())
    }
}
