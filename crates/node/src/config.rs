//! Node Configuration

use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::{Deserialize, Serialize};
use sidechain_consensus::ConsensusConfig;

/// Node configuration, loaded from an optional JSON file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeConfig {
    /// Directory of the sled state store
    pub data_dir: PathBuf,
    /// Log level used when `RUST_LOG` is unset
    pub log_level: String,
    pub consensus: ConsensusConfig,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./data"),
            log_level: "info".to_string(),
            consensus: ConsensusConfig::default(),
        }
    }
}

impl NodeConfig {
    /// Read the config file, or defaults when no path is given
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };

        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        serde_json::from_str(&raw)
            .with_context(|| format!("failed to parse config file {}", path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_defaults_without_file() {
        assert_eq!(NodeConfig::load(None).unwrap(), NodeConfig::default());
    }

    #[test]
    fn test_partial_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("node.json");
        std::fs::write(
            &path,
            r#"{"log_level": "debug", "consensus": {"checkpoint_interval": 16}}"#,
        )
        .unwrap();

        let config = NodeConfig::load(Some(&path)).unwrap();
        assert_eq!(config.log_level, "debug");
        assert_eq!(config.consensus.checkpoint_interval, 16);
        assert_eq!(config.data_dir, PathBuf::from("./data"));
    }

    #[test]
    fn test_malformed_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("node.json");
        std::fs::write(&path, "{not json").unwrap();

        let err = NodeConfig::load(Some(&path)).unwrap_err();
        assert!(err.to_string().contains("failed to parse"));
    }
}
