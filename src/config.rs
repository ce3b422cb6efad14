use crate::builder::{IndexBuilder, LabelMode};
use anyhow::{anyhow, Result};
use config::Config;
use serde::Serialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Git remote of the country CIDR dataset
pub const DEFAULT_DATASET_URL: &str = "https://github.com/herrbischoff/country-ip-blocks.git";

pub const DEFAULT_PORT: u16 = 1234;

#[derive(Debug, Clone, Serialize)]
pub struct IpblocksConfig {
    /// Directory holding the dataset tree (one CIDR file per country)
    pub data_dir: String,

    /// Git remote to clone/pull the dataset from; `None` disables syncing
    pub dataset_url: Option<String>,

    /// Sub-directory of `data_dir` to index, e.g. "ipv4"; whole tree when absent
    pub dataset_subdir: Option<String>,

    /// Only index files with this extension, e.g. "cidr"
    pub file_extension: Option<String>,

    /// File name to label strategy
    pub label_mode: LabelMode,

    /// Periodic rebuild interval for the server; disabled when absent
    #[serde(with = "humantime_opt")]
    pub refresh_interval: Option<Duration>,

    /// Server bind address
    pub address: String,

    /// Server port
    pub port: u16,
}

const EMPTY_CONFIG: &str = r#"### ipblocks configuration file

### directory holding the country CIDR files
# data_dir = "~/.ipblocks/cidr"

### git remote the dataset is cloned from (set to "" to disable syncing)
# dataset_url = "https://github.com/herrbischoff/country-ip-blocks.git"

### index only a part of the tree, and only files with this extension
# dataset_subdir = "ipv4"
# file_extension = "cidr"

### label derivation: "strip-extension" (default) or "trim-chars"
# label_mode = "strip-extension"

### rebuild the index periodically while serving (humantime, e.g. "6h")
# refresh_interval = "24h"

### HTTP server
# address = "0.0.0.0"
# port = 1234
"#;

impl Default for IpblocksConfig {
    fn default() -> Self {
        let home_dir = dirs::home_dir()
            .map(|h| h.to_string_lossy().to_string())
            .unwrap_or_else(|| ".".to_string());

        Self {
            data_dir: format!("{}/.ipblocks/cidr", home_dir),
            dataset_url: Some(DEFAULT_DATASET_URL.to_string()),
            dataset_subdir: None,
            file_extension: None,
            label_mode: LabelMode::default(),
            refresh_interval: None,
            address: "0.0.0.0".to_string(),
            port: DEFAULT_PORT,
        }
    }
}

impl IpblocksConfig {
    /// Function to create and initialize a new configuration
    pub fn new(path: &Option<String>) -> Result<IpblocksConfig> {
        let mut builder = Config::builder();

        // Add in toml configuration file
        match path {
            Some(p) => {
                let path = Path::new(p.as_str());
                if path.exists() {
                    let path_str = path
                        .to_str()
                        .ok_or_else(|| anyhow!("Could not convert path to string"))?;
                    builder = builder.add_source(config::File::with_name(path_str));
                } else {
                    std::fs::write(p.as_str(), EMPTY_CONFIG)
                        .map_err(|e| anyhow!("Unable to create config file: {}", e))?;
                }
            }
            None => {
                // By default use $HOME/.ipblocks/ipblocks.toml as the configuration file path
                let ipblocks_dir = Self::config_dir()?;
                std::fs::create_dir_all(ipblocks_dir.as_str())
                    .map_err(|e| anyhow!("Unable to create ipblocks directory: {}", e))?;
                let p = format!("{}/ipblocks.toml", ipblocks_dir.as_str());
                if Path::new(p.as_str()).exists() {
                    builder = builder.add_source(config::File::with_name(p.as_str()));
                } else {
                    std::fs::write(p.as_str(), EMPTY_CONFIG).map_err(|e| {
                        anyhow!("Unable to create config file {}: {}", p.as_str(), e)
                    })?;
                }
            }
        }

        // Add in settings from the environment (with a prefix of IPBLOCKS)
        // E.g., `IPBLOCKS_DATA_DIR=/srv/cidr ./ipblocks serve` would set the data directory
        builder = builder.add_source(config::Environment::with_prefix("IPBLOCKS"));

        let settings = builder
            .build()
            .map_err(|e| anyhow!("Failed to build configuration: {}", e))?;

        let config = settings
            .try_deserialize::<HashMap<String, String>>()
            .map_err(|e| anyhow!("Failed to deserialize configuration: {}", e))?;

        Self::from_map(&config)
    }

    /// Resolve settings from flat key/value pairs, falling back to defaults
    pub fn from_map(config: &HashMap<String, String>) -> Result<IpblocksConfig> {
        let defaults = IpblocksConfig::default();

        let data_dir = match config.get("data_dir") {
            Some(p) => expand_home(p),
            None => defaults.data_dir,
        };

        // an empty string disables syncing
        let dataset_url = match config.get("dataset_url") {
            Some(url) if url.trim().is_empty() => None,
            Some(url) => Some(url.trim().to_string()),
            None => defaults.dataset_url,
        };

        let non_empty = |key: &str| {
            config
                .get(key)
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
        };
        let dataset_subdir = non_empty("dataset_subdir");
        let file_extension = non_empty("file_extension");

        let label_mode = match config.get("label_mode") {
            Some(m) => m.parse::<LabelMode>().map_err(|e| anyhow!(e))?,
            None => defaults.label_mode,
        };

        let refresh_interval = match non_empty("refresh_interval") {
            Some(s) => Some(
                humantime::parse_duration(&s)
                    .map_err(|e| anyhow!("Invalid refresh_interval '{}': {}", s, e))?,
            ),
            None => None,
        };

        let address = non_empty("address").unwrap_or(defaults.address);

        let port = match config.get("port") {
            Some(p) => p
                .trim()
                .parse::<u16>()
                .map_err(|e| anyhow!("Invalid port '{}': {}", p, e))?,
            None => defaults.port,
        };

        Ok(IpblocksConfig {
            data_dir,
            dataset_url,
            dataset_subdir,
            file_extension,
            label_mode,
            refresh_interval,
            address,
            port,
        })
    }

    /// Directory actually walked by the index builder
    pub fn build_root(&self) -> PathBuf {
        let root = PathBuf::from(&self.data_dir);
        match &self.dataset_subdir {
            Some(sub) => root.join(sub),
            None => root,
        }
    }

    /// Index builder configured from these settings
    pub fn index_builder(&self) -> IndexBuilder {
        IndexBuilder::new(self.build_root())
            .label_mode(self.label_mode)
            .only_extension(self.file_extension.clone())
            .require_entries(true)
    }

    /// Display configuration summary
    pub fn summary(&self) -> String {
        let lines = [
            format!("Config File:        {}", Self::config_file_path()),
            format!("Data Directory:     {}", self.data_dir),
            format!("Build Root:         {}", self.build_root().display()),
            format!(
                "Dataset URL:        {}",
                self.dataset_url.as_deref().unwrap_or("(sync disabled)")
            ),
            format!(
                "File Extension:     {}",
                self.file_extension.as_deref().unwrap_or("(any)")
            ),
            format!("Label Mode:         {}", self.label_mode),
            format!(
                "Refresh Interval:   {}",
                self.refresh_interval
                    .map(|d| humantime::format_duration(d).to_string())
                    .unwrap_or_else(|| "(disabled)".to_string())
            ),
            format!("Listen Address:     {}:{}", self.address, self.port),
        ];
        lines.join("\n")
    }

    fn config_dir() -> Result<String> {
        let home_dir = dirs::home_dir()
            .ok_or_else(|| anyhow!("Could not find home directory"))?
            .to_str()
            .ok_or_else(|| anyhow!("Could not convert home directory path to string"))?
            .to_owned();
        Ok(format!("{}/.ipblocks", home_dir))
    }

    /// Get the config file path
    pub fn config_file_path() -> String {
        let home_dir = dirs::home_dir()
            .map(|h| h.to_string_lossy().to_string())
            .unwrap_or_else(|| "~".to_string());
        format!("{}/.ipblocks/ipblocks.toml", home_dir)
    }
}

fn expand_home(path: &str) -> String {
    match (path.strip_prefix("~/"), dirs::home_dir()) {
        (Some(rest), Some(home)) => home.join(rest).to_string_lossy().to_string(),
        _ => path.to_string(),
    }
}

mod humantime_opt {
    use serde::Serializer;
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Option<Duration>, s: S) -> Result<S::Ok, S::Error> {
        match value {
            Some(d) => s.collect_str(&humantime::format_duration(*d)),
            None => s.serialize_none(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn map(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_default_config() {
        let config = IpblocksConfig::default();
        assert!(config.data_dir.ends_with("/.ipblocks/cidr"));
        assert_eq!(config.dataset_url.as_deref(), Some(DEFAULT_DATASET_URL));
        assert_eq!(config.port, 1234);
        assert_eq!(config.label_mode, LabelMode::StripExtension);
        assert!(config.refresh_interval.is_none());
    }

    #[test]
    fn test_from_map() {
        let config = IpblocksConfig::from_map(&map(&[
            ("data_dir", "/srv/cidr"),
            ("dataset_url", ""),
            ("dataset_subdir", "ipv4"),
            ("file_extension", "cidr"),
            ("label_mode", "trim-chars"),
            ("refresh_interval", "6h"),
            ("port", "8080"),
        ]))
        .unwrap();

        assert_eq!(config.data_dir, "/srv/cidr");
        assert!(config.dataset_url.is_none());
        assert_eq!(config.build_root(), PathBuf::from("/srv/cidr/ipv4"));
        assert_eq!(config.file_extension.as_deref(), Some("cidr"));
        assert_eq!(config.label_mode, LabelMode::TrimExtensionChars);
        assert_eq!(config.refresh_interval, Some(Duration::from_secs(6 * 3600)));
        assert_eq!(config.port, 8080);
        assert_eq!(config.address, "0.0.0.0");
    }

    #[test]
    fn test_from_map_rejects_bad_values() {
        assert!(IpblocksConfig::from_map(&map(&[("port", "http")])).is_err());
        assert!(IpblocksConfig::from_map(&map(&[("label_mode", "guess")])).is_err());
        assert!(IpblocksConfig::from_map(&map(&[("refresh_interval", "soon")])).is_err());
    }

    #[test]
    fn test_new_with_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ipblocks.toml");
        std::fs::write(
            &path,
            "data_dir = \"/tmp/blocks\"\nport = 9000\nlabel_mode = \"strip-extension\"\n",
        )
        .unwrap();

        let config = IpblocksConfig::new(&Some(path.to_string_lossy().to_string())).unwrap();
        assert_eq!(config.data_dir, "/tmp/blocks");
        assert_eq!(config.port, 9000);
    }

    #[test]
    fn test_new_creates_missing_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fresh.toml");
        let config = IpblocksConfig::new(&Some(path.to_string_lossy().to_string())).unwrap();
        assert!(path.exists());
        assert_eq!(config.port, DEFAULT_PORT);
    }

    #[test]
    fn test_summary() {
        let summary = IpblocksConfig::default().summary();
        assert!(summary.contains("Label Mode:         strip-extension"));
        assert!(summary.contains("Refresh Interval:   (disabled)"));
    }
}
