use std::fs;
use std::path::{Path, PathBuf};

use bb_action::SupervisorConfig;
use serde::{Deserialize, Serialize};

use crate::error::{SystemError, SystemResult};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SystemConfig {
    /// Root for the relative data files below.
    pub data_dir: PathBuf,
    /// Action roster, relative to `data_dir`.
    pub actions_file: PathBuf,
    /// Node list, relative to `data_dir`.
    pub nodes_file: PathBuf,
    pub supervisor: SupervisorConfig,
}

impl Default for SystemConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("."),
            actions_file: PathBuf::from("system/data/actions.data"),
            nodes_file: PathBuf::from("memory/data/nodes.data"),
            supervisor: SupervisorConfig::default(),
        }
    }
}

impl SystemConfig {
    /// Defaults rooted at `dir`.
    pub fn with_data_dir(dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: dir.into(),
            ..Default::default()
        }
    }

    /// Parse a TOML file. Missing keys take their defaults.
    pub fn load(path: &Path) -> SystemResult<Self> {
        let text = fs::read_to_string(path)?;
        toml::from_str(&text).map_err(|e| SystemError::Config(format!("{}: {e}", path.display())))
    }

    pub fn actions_path(&self) -> PathBuf {
        self.data_dir.join(&self.actions_file)
    }

    pub fn nodes_path(&self) -> PathBuf {
        self.data_dir.join(&self.nodes_file)
    }
}
