use crate::error::ConfigError;
use directories::UserDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// What the runner does with a tool name it does not recognize.
///
/// `Passthrough` appends the entry unchanged (state/memory carried over), so
/// unknown tools degrade to no-ops. `Error` routes them through the operator
/// diagnostic path instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum UnknownToolPolicy {
    #[default]
    Passthrough,
    Error,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Workspace directory - computed from home, not serialized
    #[serde(skip)]
    pub workspace_dir: PathBuf,
    /// Path to config.toml - computed from home, not serialized
    #[serde(skip)]
    pub config_path: PathBuf,

    /// OpenAI API key. `OPENAI_API_KEY` in the environment takes precedence.
    pub api_key: Option<String>,
    pub model: String,

    /// How many recent ledger entries the brain sees. The last entry is
    /// always retained regardless of this value.
    #[serde(default = "default_history_window")]
    pub history_window: usize,

    #[serde(default)]
    pub unknown_tool_policy: UnknownToolPolicy,
}

fn default_history_window() -> usize {
    15
}

impl Default for Config {
    fn default() -> Self {
        Self {
            workspace_dir: PathBuf::new(),
            config_path: PathBuf::new(),
            api_key: None,
            model: "gpt-5-mini".to_string(),
            history_window: default_history_window(),
            unknown_tool_policy: UnknownToolPolicy::default(),
        }
    }
}

impl Config {
    /// Load `~/.bulus/config.toml`, writing defaults on first run.
    pub fn load_or_init() -> Result<Self, ConfigError> {
        let workspace_dir = workspace_dir()?;
        Self::load_or_init_at(&workspace_dir)
    }

    /// Same as [`Config::load_or_init`] against an explicit workspace root.
    pub fn load_or_init_at(workspace_dir: &Path) -> Result<Self, ConfigError> {
        let config_path = workspace_dir.join("config.toml");

        let mut config = if config_path.exists() {
            let raw = fs::read_to_string(&config_path)?;
            toml::from_str::<Self>(&raw)
                .map_err(|e| ConfigError::Load(format!("parse {}: {e}", config_path.display())))?
        } else {
            let config = Self::default();
            fs::create_dir_all(workspace_dir)?;
            let serialized =
                toml::to_string_pretty(&config).map_err(|e| ConfigError::Load(e.to_string()))?;
            fs::write(&config_path, serialized)?;
            config
        };

        config.workspace_dir = workspace_dir.to_path_buf();
        config.config_path = config_path;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.history_window == 0 {
            return Err(ConfigError::Validation(
                "history_window must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Where session documents live.
    pub fn sessions_dir(&self) -> PathBuf {
        self.workspace_dir.join("sessions")
    }

    /// Resolved API key: environment first, then config file.
    pub fn resolve_api_key(&self) -> Option<String> {
        std::env::var("OPENAI_API_KEY")
            .ok()
            .filter(|key| !key.trim().is_empty())
            .or_else(|| self.api_key.clone())
    }
}

fn workspace_dir() -> Result<PathBuf, ConfigError> {
    let user_dirs = UserDirs::new()
        .ok_or_else(|| ConfigError::Load("cannot determine home directory".to_string()))?;
    Ok(user_dirs.home_dir().join(".bulus"))
}
