//! Replay settings that live outside any one session.

use std::fs;
use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use crate::error::ReplayError;

pub const APP_NAME: &str = "replay";

/// What playback does when the live sync seed diverges from the recording.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SyncCheckMode {
    /// Report every mismatch and keep dispatching.
    Diagnostic,
    /// Stop playback at the first mismatch.
    Strict,
}

impl Default for SyncCheckMode {
    fn default() -> Self {
        if cfg!(debug_assertions) { Self::Diagnostic } else { Self::Strict }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct ReplayConfig {
    pub user_dir: PathBuf,
    /// Optional per-game sub-directory of `user_dir`.
    pub game_name: String,
    pub log_prefix: String,
    pub record_commands: bool,
    pub sync_check: SyncCheckMode,
}

impl Default for ReplayConfig {
    fn default() -> Self {
        Self {
            user_dir: Self::default_user_dir().unwrap_or_else(|| PathBuf::from(".")),
            game_name: String::new(),
            log_prefix: "log_of_replay".to_string(),
            record_commands: true,
            sync_check: SyncCheckMode::default(),
        }
    }
}

impl ReplayConfig {
    pub fn default_user_dir() -> Option<PathBuf> {
        ProjectDirs::from("", "", APP_NAME).map(|dirs| dirs.data_dir().to_path_buf())
    }

    pub fn with_user_dir(user_dir: impl Into<PathBuf>) -> Self {
        Self { user_dir: user_dir.into(), ..Self::default() }
    }

    pub fn logs_dir(&self) -> PathBuf {
        let mut path = self.user_dir.clone();
        if !self.game_name.is_empty() {
            path.push(&self.game_name);
        }
        path.push("logs");
        path
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ReplayError> {
        Ok(toml::from_str(content)?)
    }

    pub fn load(path: &Path) -> Result<Self, ReplayError> {
        let content = fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }
}
