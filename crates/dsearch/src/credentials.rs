use serde::{Deserialize, Deserializer, Serialize};
use std::fs;
use std::path::Path;

use crate::config::PLUGIN_NAME;
use crate::error::{DsError, Result};
use crate::prompt::Prompter;

pub const DEFAULT_HOST: &str = "https://sds.app.accelerate.science/";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Auth {
  pub username: String,
  pub api_key: String,
}

/// Contents of `deepsearch_api.cred`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Credentials {
  pub host: String,
  pub auth: Auth,
  #[serde(default, deserialize_with = "flag")]
  pub verify_ssl: bool,
}

/// Accept `true`, `"True"`, `"false"` and friends, as written by older tools
fn flag<'de, D>(deserializer: D) -> std::result::Result<bool, D::Error>
where
  D: Deserializer<'de>,
{
  #[derive(Deserialize)]
  #[serde(untagged)]
  enum Flag {
    Bool(bool),
    Text(String),
  }

  Ok(match Flag::deserialize(deserializer)? {
    Flag::Bool(b) => b,
    Flag::Text(s) => matches!(s.trim().to_lowercase().as_str(), "true" | "yes" | "1"),
  })
}

impl Credentials {
  pub fn new(
    host: impl Into<String>,
    username: impl Into<String>,
    api_key: impl Into<String>,
  ) -> Self {
    Self {
      host: host.into(),
      auth: Auth { username: username.into(), api_key: api_key.into() },
      verify_ssl: false,
    }
  }

  pub fn load(path: &Path) -> Result<Option<Self>> {
    if !path.exists() {
      return Ok(None);
    }
    let content = fs::read_to_string(path)?;
    let credentials = serde_json::from_str(&content).map_err(|e| {
      DsError::credential(format!("Unreadable credentials file {}: {e}", path.display()))
    })?;
    Ok(Some(credentials))
  }

  pub fn save(&self, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
      fs::create_dir_all(parent)?;
    }
    let content = serde_json::to_string_pretty(self)
      .map_err(|e| DsError::credential(format!("Failed to serialize credentials: {e}")))?;
    fs::write(path, content)?;

    #[cfg(unix)]
    {
      use std::os::unix::fs::PermissionsExt;
      let mut perms = fs::metadata(path)?.permissions();
      perms.set_mode(0o600);
      fs::set_permissions(path, perms)?;
    }

    tracing::debug!(path = %path.display(), "saved credentials");
    Ok(())
  }

  /// Delete the credentials file, returning whether one existed
  pub fn remove(path: &Path) -> Result<bool> {
    if !path.exists() {
      return Ok(false);
    }
    fs::remove_file(path)?;
    Ok(true)
  }

  /// Blank or `None` hosts fall back to the public service
  pub fn normalized(mut self) -> Self {
    let host = self.host.trim();
    if host.is_empty() || host == "None" {
      self.host = DEFAULT_HOST.to_string();
    } else {
      self.host = host.to_string();
    }
    self
  }

  /// Host without a trailing slash, for building URLs
  pub fn base_url(&self) -> String {
    self.host.trim_end_matches('/').to_string()
  }

  /// Reject credentials that can never log in
  pub fn validate(&self) -> Result<()> {
    url::Url::parse(&self.host)
      .map_err(|_| DsError::credential(format!("Invalid host '{}', try again", self.host)))?;
    if self.auth.username.trim().is_empty() || self.auth.username.trim() == "None" {
      return Err(DsError::credential("Invalid username, try again"));
    }
    if self.auth.api_key.trim().is_empty() || self.auth.api_key.trim() == "None" {
      return Err(DsError::credential("Invalid API key, try again"));
    }
    Ok(())
  }

  /// Ask for a fresh host, username and API key
  pub fn prompt(prompter: &dyn Prompter) -> Result<Self> {
    marquee::text(&format!(
      "\n<h1>{PLUGIN_NAME} Authentication</h1>\n\
       To obtain your API key, visit:\n<link>ds4sd.github.io</link>\n\n\
       For instructions, visit:\n\
       <link>github.com/acceleratedscience/openad-plugin-ds#login</link>\n"
    ));
    marquee::warning_block(&[
      &format!("Please provide your {PLUGIN_NAME} credentials"),
      &format!("Leave the host blank to use the default: {DEFAULT_HOST}"),
    ]);

    let host = prompter.input("Host")?;
    let username = prompter.input("Username")?;
    let api_key = prompter.secret("API key")?;
    Ok(Self::new(host, username, api_key))
  }
}
