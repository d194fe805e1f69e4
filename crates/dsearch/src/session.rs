//! Login and session lifecycle
//!
//! A session moves `LoggedOut → LoggingIn → LoggedIn` and drops back to
//! `LoggedOut` when its token expires or the credentials are reset. Live
//! sessions sit in the [`SessionRegistry`] owned by the command context; the
//! token is also cached on disk so the next process can skip the round trip.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{Local, TimeZone};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::sync::Arc;

use crate::backend::{Connection, SearchBackend};
use crate::config::{PLUGIN_KEY, PLUGIN_NAME};
use crate::context::CommandContext;
use crate::credentials::Credentials;
use crate::error::{DsError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginState {
  LoggedOut,
  LoggingIn,
  LoggedIn,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginMode {
  /// Reuse a live or cached session when one exists
  Normal,
  /// Ignore any session and ask for credentials again
  Reset,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoginOutcome {
  /// A live or cached session was reused
  AlreadyLoggedIn { expiry: i64 },
  /// A new token was issued
  LoggedIn { username: String, expiry: i64 },
  /// Login failed and the user kept the credentials
  Failed { message: String },
  /// The user chose not to log in
  LoggedOut,
}

/// An authenticated backend handle
#[derive(Clone)]
pub struct Session {
  pub backend: Arc<dyn SearchBackend>,
  pub expiry: i64,
  pub username: String,
  pub host: String,
}

impl Session {
  pub fn is_valid(&self, now: i64) -> bool {
    self.expiry > now
  }
}

struct SessionSlot {
  state: LoginState,
  session: Option<Session>,
}

/// Sessions keyed by plugin key
#[derive(Default)]
pub struct SessionRegistry {
  slots: HashMap<String, SessionSlot>,
}

impl SessionRegistry {
  pub fn new() -> Self {
    Self::default()
  }

  /// Current state, treating expired sessions as logged out
  pub fn state(&self, key: &str, now: i64) -> LoginState {
    match self.slots.get(key) {
      Some(SessionSlot { state: LoginState::LoggedIn, session: Some(session) })
        if !session.is_valid(now) =>
      {
        LoginState::LoggedOut
      }
      Some(slot) => slot.state,
      None => LoginState::LoggedOut,
    }
  }

  pub fn begin_login(&mut self, key: &str) {
    let slot = self
      .slots
      .entry(key.to_string())
      .or_insert(SessionSlot { state: LoginState::LoggedOut, session: None });
    slot.state = LoginState::LoggingIn;
  }

  pub fn insert(&mut self, key: &str, session: Session) {
    self
      .slots
      .insert(key.to_string(), SessionSlot { state: LoginState::LoggedIn, session: Some(session) });
  }

  pub fn invalidate(&mut self, key: &str) {
    self.slots.remove(key);
  }

  /// The session for `key` if it has not expired
  pub fn active(&self, key: &str, now: i64) -> Option<&Session> {
    if self.state(key, now) != LoginState::LoggedIn {
      return None;
    }
    self.slots.get(key).and_then(|slot| slot.session.as_ref())
  }
}

/// Token cached between processes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionCache {
  pub host: String,
  pub username: String,
  pub token: String,
  pub expiry: i64,
}

impl SessionCache {
  pub fn load(path: &Path) -> Result<Option<Self>> {
    if !path.exists() {
      return Ok(None);
    }
    let content = fs::read_to_string(path)?;
    match serde_json::from_str(&content) {
      Ok(cache) => Ok(Some(cache)),
      Err(e) => {
        tracing::warn!(path = %path.display(), error = %e, "ignoring unreadable session cache");
        Ok(None)
      }
    }
  }

  pub fn save(&self, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
      fs::create_dir_all(parent)?;
    }
    let content = serde_json::to_string_pretty(self)
      .map_err(|e| DsError::credential(format!("Failed to serialize session cache: {e}")))?;
    fs::write(path, content)?;

    #[cfg(unix)]
    {
      use std::os::unix::fs::PermissionsExt;
      let mut perms = fs::metadata(path)?.permissions();
      perms.set_mode(0o600);
      fs::set_permissions(path, perms)?;
    }
    Ok(())
  }

  pub fn remove(path: &Path) -> Result<()> {
    if path.exists() {
      fs::remove_file(path)?;
    }
    Ok(())
  }

  fn matches(&self, credentials: &Credentials) -> bool {
    self.host == credentials.host && self.username == credentials.auth.username
  }
}

/// Read the `exp` claim of a JWT without verifying its signature
pub fn decode_token_expiry(token: &str) -> Result<i64> {
  let payload = token
    .split('.')
    .nth(1)
    .ok_or_else(|| DsError::credential("Malformed bearer token"))?;
  let bytes = URL_SAFE_NO_PAD
    .decode(payload.trim_end_matches('='))
    .map_err(|e| DsError::credential(format!("Malformed bearer token: {e}")))?;
  let claims: serde_json::Value = serde_json::from_slice(&bytes)
    .map_err(|e| DsError::credential(format!("Malformed bearer token: {e}")))?;

  match &claims["exp"] {
    serde_json::Value::Number(n) => n
      .as_i64()
      .or_else(|| n.as_f64().map(|f| f as i64))
      .ok_or_else(|| DsError::credential("Bearer token has an invalid expiry")),
    _ => Err(DsError::credential("Bearer token has no expiry")),
  }
}

fn date_str(timestamp: i64) -> String {
  match Local.timestamp_opt(timestamp, 0).single() {
    Some(date) => date.format("%a %b %d, %Y at %H:%M").to_string(),
    None => timestamp.to_string(),
  }
}

/// "on <date>" more than a day out, otherwise the remaining duration
pub fn expiration_str(expiry: i64, now: i64) -> String {
  // Rounds up to the next minute
  let difference = (expiry - now + 30).max(0);
  if difference > 86400 {
    return format!("on {}", date_str(expiry));
  }

  let days = difference / 86400;
  let hours = (difference % 86400) / 3600;
  let minutes = (difference % 3600) / 60;
  let seconds = difference % 60;

  let mut parts = Vec::new();
  if days > 0 {
    parts.push(format!("{days} days"));
  }
  if hours > 0 {
    parts.push(format!("{hours} hours"));
  }

  match (parts.is_empty(), minutes > 0) {
    (false, true) => format!("in {} and {minutes} minutes", parts.join(", ")),
    (false, false) => format!("in {}", parts.join(", ")),
    (true, true) => format!("in {minutes} minutes"),
    (true, false) => format!("in {seconds} seconds"),
  }
}

pub fn print_login_status(username: Option<&str>, expiry: i64, now: i64) {
  let headline = match username {
    Some(user) => format!("You are now logged in to {PLUGIN_NAME} as <reset>{user}</reset>"),
    None => format!("You are already logged in to {PLUGIN_NAME}"),
  };
  let expires = format!("Token expires {}", expiration_str(expiry, now));
  marquee::success_block(&[&headline, &expires]);
}

pub fn now() -> i64 {
  chrono::Utc::now().timestamp()
}

/// Reuse the registry session or the on-disk cache if either is still valid
fn short_circuit(ctx: &mut CommandContext, now: i64) -> Result<Option<i64>> {
  if let Some(session) = ctx.sessions.active(PLUGIN_KEY, now) {
    return Ok(Some(session.expiry));
  }

  let Some(credentials) = Credentials::load(&ctx.settings.credentials_path())? else {
    return Ok(None);
  };
  let credentials = credentials.normalized();
  let Some(cache) = SessionCache::load(&ctx.settings.session_cache_path())? else {
    return Ok(None);
  };
  if cache.expiry <= now || !cache.matches(&credentials) {
    return Ok(None);
  }

  let backend = ctx.connector.resume(&credentials, &cache.token)?;
  ctx.sessions.insert(
    PLUGIN_KEY,
    Session { backend, expiry: cache.expiry, username: cache.username, host: cache.host },
  );
  tracing::debug!(expiry = cache.expiry, "resumed cached session");
  Ok(Some(cache.expiry))
}

fn load_or_prompt(ctx: &CommandContext, mode: LoginMode) -> Result<Credentials> {
  let path = ctx.settings.credentials_path();
  if mode == LoginMode::Normal {
    if let Some(credentials) = Credentials::load(&path)? {
      return Ok(credentials);
    }
  }
  if !ctx.display().is_interactive() {
    return Err(DsError::credential(format!("You are not logged in to {PLUGIN_NAME}")));
  }
  let credentials = Credentials::prompt(ctx.prompter.as_ref())?;
  credentials.save(&path)?;
  Ok(credentials)
}

async fn authenticate(ctx: &mut CommandContext, credentials: &Credentials) -> Result<i64> {
  credentials.validate()?;
  if !ctx.connector.check_host(&credentials.host).await {
    return Err(DsError::credential("Invalid host, try again"));
  }

  let Connection { backend, token } = ctx.connector.connect(credentials).await?;
  let expiry = decode_token_expiry(&token)?;

  ctx.sessions.insert(
    PLUGIN_KEY,
    Session {
      backend,
      expiry,
      username: credentials.auth.username.clone(),
      host: credentials.host.clone(),
    },
  );
  let cache = SessionCache {
    host: credentials.host.clone(),
    username: credentials.auth.username.clone(),
    token,
    expiry,
  };
  cache.save(&ctx.settings.session_cache_path())?;
  Ok(expiry)
}

/// Remove stored credentials and any session, returning whether credentials existed
pub fn clear_credentials(ctx: &mut CommandContext) -> Result<bool> {
  ctx.sessions.invalidate(PLUGIN_KEY);
  SessionCache::remove(&ctx.settings.session_cache_path())?;
  Credentials::remove(&ctx.settings.credentials_path())
}

/// Log in at a given time, reusing a valid session unless a reset is requested
pub async fn login_at(ctx: &mut CommandContext, mode: LoginMode, now: i64) -> Result<LoginOutcome> {
  let mut mode = mode;
  if !ctx.settings.credentials_path().exists() {
    mode = LoginMode::Reset;
  }

  loop {
    if mode == LoginMode::Normal {
      if let Some(expiry) = short_circuit(ctx, now)? {
        return Ok(LoginOutcome::AlreadyLoggedIn { expiry });
      }
    }

    ctx.sessions.begin_login(PLUGIN_KEY);
    let credentials = load_or_prompt(ctx, mode)?.normalized();
    let username = credentials.auth.username.clone();

    match authenticate(ctx, &credentials).await {
      Ok(expiry) => {
        tracing::info!(user = %username, expiry, "logged in");
        return Ok(LoginOutcome::LoggedIn { username, expiry });
      }
      Err(err) => {
        ctx.sessions.invalidate(PLUGIN_KEY);
        marquee::error_block(&[
          &format!("Failed to log in to {PLUGIN_NAME} as <reset>{username}</reset>"),
          &err.to_string(),
        ]);
        if !ctx.prompter.confirm("Reset credentials?")? {
          return Ok(LoginOutcome::Failed { message: err.to_string() });
        }
        clear_credentials(ctx)?;
        if !ctx.prompter.confirm("Would you like to log in again?")? {
          return Ok(LoginOutcome::LoggedOut);
        }
        mode = LoginMode::Reset;
      }
    }
  }
}

pub async fn login(ctx: &mut CommandContext, mode: LoginMode) -> Result<LoginOutcome> {
  login_at(ctx, mode, now()).await
}

/// Log out, then offer to log in again
pub async fn reset_login(ctx: &mut CommandContext) -> Result<LoginOutcome> {
  let removed = clear_credentials(ctx)?;
  if removed {
    marquee::success(&format!("You are logged out from {PLUGIN_NAME}"));
  } else {
    marquee::warn("No login credentials found");
  }

  let question =
    if removed { "Would you like to log in again?" } else { "Would you like to log in?" };
  if !ctx.prompter.confirm(question)? {
    return Ok(LoginOutcome::LoggedOut);
  }
  login(ctx, LoginMode::Reset).await
}

/// Backend handle for a command, logging in first when needed
pub async fn ensure_backend(ctx: &mut CommandContext) -> Result<Arc<dyn SearchBackend>> {
  let now = now();
  match login_at(ctx, LoginMode::Normal, now).await? {
    LoginOutcome::LoggedIn { username, expiry } => print_login_status(Some(&username), expiry, now),
    LoginOutcome::AlreadyLoggedIn { .. } => {}
    LoginOutcome::Failed { .. } | LoginOutcome::LoggedOut => {
      return Err(DsError::credential(format!("You are not logged in to {PLUGIN_NAME}")));
    }
  }

  ctx
    .sessions
    .active(PLUGIN_KEY, now)
    .map(|session| session.backend.clone())
    .ok_or_else(|| DsError::credential(format!("You are not logged in to {PLUGIN_NAME}")))
}

/// Host of the current credentials, for building deep links
pub fn current_host(ctx: &CommandContext) -> Result<String> {
  let credentials = Credentials::load(&ctx.settings.credentials_path())?
    .ok_or_else(|| DsError::credential(format!("You are not logged in to {PLUGIN_NAME}")))?;
  Ok(credentials.normalized().base_url())
}
