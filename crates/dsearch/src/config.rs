//! Plugin identity and runtime settings
//!
//! Settings resolve in order: command-line flag or environment variable,
//! then `settings.yaml` in the plugin home, then built-in defaults.

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{DsError, Result};

pub const PLUGIN_NAME: &str = "Deep Search";
pub const PLUGIN_KEY: &str = "deep_search";
pub const PLUGIN_NAMESPACE: &str = "ds";

pub const CREDENTIALS_FILE: &str = "deepsearch_api.cred";
pub const SESSION_CACHE_FILE: &str = "deepsearch_session.json";
pub const SETTINGS_FILE: &str = "settings.yaml";

/// Plugin identity as shipped in `plugin_metadata.yaml`
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PluginMetadata {
  pub name: String,
  pub namespace: String,
  #[serde(default)]
  pub description: String,
}

impl Default for PluginMetadata {
  fn default() -> Self {
    Self {
      name: PLUGIN_NAME.to_string(),
      namespace: PLUGIN_NAMESPACE.to_string(),
      description: String::new(),
    }
  }
}

static METADATA: Lazy<PluginMetadata> = Lazy::new(|| {
  serde_yaml::from_str(include_str!("../plugin_metadata.yaml")).unwrap_or_else(|e| {
    tracing::warn!("invalid plugin metadata: {e}");
    PluginMetadata::default()
  })
});

pub fn metadata() -> &'static PluginMetadata {
  &METADATA
}

/// How results reach the caller
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum DisplayMode {
  /// Styled tables in the terminal
  #[default]
  Terminal,
  /// HTML tables and clickable links
  Notebook,
  /// Raw JSON on stdout, no prompts
  Api,
}

impl DisplayMode {
  /// Interactive modes may prompt and draw progress bars
  pub fn is_interactive(self) -> bool {
    self != DisplayMode::Api
  }
}

#[derive(Debug, Default, Deserialize)]
struct SettingsFile {
  #[serde(default)]
  display: Option<DisplayMode>,
  #[serde(default)]
  workspace: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
  pub display: DisplayMode,
  /// Directory holding credentials, session cache and settings
  pub home_dir: PathBuf,
  /// Directory that `--save-as` files are written to and batch files read from
  pub workspace_dir: PathBuf,
}

impl Settings {
  pub fn new(display: DisplayMode, home_dir: PathBuf, workspace_dir: PathBuf) -> Self {
    Self { display, home_dir, workspace_dir }
  }

  /// Resolve settings from explicit overrides, the settings file and defaults
  pub fn resolve(
    display: Option<DisplayMode>,
    home_dir: Option<PathBuf>,
    workspace_dir: Option<PathBuf>,
  ) -> Result<Self> {
    let home_dir = home_dir.unwrap_or_else(default_home);
    let file = load_settings_file(&home_dir.join(SETTINGS_FILE))?;

    let display = display.or(file.display).unwrap_or_default();
    let workspace_dir = match workspace_dir.or(file.workspace) {
      Some(dir) => dir,
      None => std::env::current_dir()?,
    };

    let mode = display;
    tracing::debug!(
      home = %home_dir.display(),
      workspace = %workspace_dir.display(),
      mode = ?mode,
      "resolved settings"
    );
    Ok(Self { display, home_dir, workspace_dir })
  }

  pub fn credentials_path(&self) -> PathBuf {
    self.home_dir.join(CREDENTIALS_FILE)
  }

  pub fn session_cache_path(&self) -> PathBuf {
    self.home_dir.join(SESSION_CACHE_FILE)
  }

  /// Resolve a user-supplied file name against the workspace
  pub fn workspace_file(&self, name: &str) -> PathBuf {
    let path = Path::new(name);
    if path.is_absolute() {
      path.to_path_buf()
    } else {
      self.workspace_dir.join(path)
    }
  }
}

fn default_home() -> PathBuf {
  if let Ok(dir) = std::env::var("DS_HOME") {
    return PathBuf::from(dir);
  }
  dirs::home_dir().unwrap_or_else(|| PathBuf::from(".")).join(".openad")
}

fn load_settings_file(path: &Path) -> Result<SettingsFile> {
  if !path.exists() {
    return Ok(SettingsFile::default());
  }
  let content = fs::read_to_string(path)?;
  serde_yaml::from_str(&content).map_err(|e| {
    DsError::invalid_parameter(format!("Failed to parse {}: {e}", path.display()))
  })
}
