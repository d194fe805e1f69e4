#![allow(dead_code)]

use async_trait::async_trait;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use serde_json::{json, Map, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

use dsearch::backend::{ChemistryQuery, PageCursor, ResultPage};
use dsearch::credentials::Credentials;
use dsearch::prompt::{NonInteractivePrompter, Prompter};
use dsearch::query::DataQuery;
use dsearch::record::Record;
use dsearch::session::{self, SessionCache};
use dsearch::{
  Collection, CommandContext, Connection, Connector, DisplayMode, Result, SearchBackend, Settings,
};

pub const HOST: &str = "https://ds.example/";
pub const USERNAME: &str = "ada";

/// JWT-shaped token whose payload carries the given expiry
pub fn make_token(exp: i64) -> String {
  format!("e30.{}.sig", URL_SAFE_NO_PAD.encode(json!({ "exp": exp }).to_string()))
}

pub fn record(source: Value) -> Record {
  serde_json::from_value(json!({ "_id": "doc", "_source": source })).unwrap()
}

/// In-memory backend that counts every call
#[derive(Default)]
pub struct FakeBackend {
  pub collections: Vec<Collection>,
  pub total: u64,
  pub pages: Vec<ResultPage>,
  pub chemistry: Vec<Map<String, Value>>,
  pub counts: AtomicUsize,
  pub fetches: AtomicUsize,
  pub chemistry_queries: Mutex<Vec<(ChemistryQuery, Option<usize>)>>,
}

impl FakeBackend {
  pub fn with_collections(collections: Vec<Collection>) -> Self {
    Self { collections, ..Default::default() }
  }

  pub fn count_calls(&self) -> usize {
    self.counts.load(Ordering::SeqCst)
  }

  pub fn fetch_calls(&self) -> usize {
    self.fetches.load(Ordering::SeqCst)
  }
}

#[async_trait]
impl SearchBackend for FakeBackend {
  async fn list_collections(&self) -> Result<Vec<Collection>> {
    Ok(self.collections.clone())
  }

  async fn count(&self, _query: &DataQuery) -> Result<u64> {
    self.counts.fetch_add(1, Ordering::SeqCst);
    Ok(self.total)
  }

  async fn fetch_page(
    &self,
    _query: &DataQuery,
    _cursor: Option<PageCursor>,
  ) -> Result<ResultPage> {
    let n = self.fetches.fetch_add(1, Ordering::SeqCst);
    Ok(self.pages.get(n).cloned().unwrap_or_default())
  }

  async fn query_chemistry(
    &self,
    query: &ChemistryQuery,
    limit: Option<usize>,
  ) -> Result<Vec<Map<String, Value>>> {
    self.chemistry_queries.lock().unwrap().push((query.clone(), limit));
    Ok(self.chemistry.clone())
  }
}

/// Connector handing out one shared fake backend
pub struct FakeConnector {
  pub backend: Arc<FakeBackend>,
  pub token: String,
  pub host_ok: bool,
  pub connects: Arc<AtomicUsize>,
}

impl FakeConnector {
  pub fn new(backend: Arc<FakeBackend>, token: String) -> Self {
    Self { backend, token, host_ok: true, connects: Arc::new(AtomicUsize::new(0)) }
  }
}

#[async_trait]
impl Connector for FakeConnector {
  async fn check_host(&self, _host: &str) -> bool {
    self.host_ok
  }

  async fn connect(&self, _credentials: &Credentials) -> Result<Connection> {
    self.connects.fetch_add(1, Ordering::SeqCst);
    Ok(Connection { backend: self.backend.clone(), token: self.token.clone() })
  }

  fn resume(&self, _credentials: &Credentials, _token: &str) -> Result<Arc<dyn SearchBackend>> {
    Ok(self.backend.clone())
  }
}

/// Credential home and workspace for one test
pub struct Sandbox {
  pub dir: TempDir,
}

impl Sandbox {
  pub fn new() -> Self {
    Self { dir: TempDir::new().unwrap() }
  }

  pub fn settings(&self, display: DisplayMode) -> Settings {
    Settings::new(display, self.dir.path().join("home"), self.dir.path().join("workspace"))
  }

  /// Store credentials and a cached token valid until `expiry`
  pub fn logged_in(&self, settings: &Settings, expiry: i64) {
    Credentials::new(HOST, USERNAME, "key").save(&settings.credentials_path()).unwrap();
    let cache = SessionCache {
      host: HOST.to_string(),
      username: USERNAME.to_string(),
      token: make_token(expiry),
      expiry,
    };
    cache.save(&settings.session_cache_path()).unwrap();
  }
}

/// Context already holding a valid cached session against `backend`
pub fn logged_in_context(
  sandbox: &Sandbox,
  display: DisplayMode,
  backend: Arc<FakeBackend>,
  prompter: Box<dyn Prompter>,
) -> CommandContext {
  let settings = sandbox.settings(display);
  sandbox.logged_in(&settings, session::now() + 3600);
  let connector = FakeConnector::new(backend, make_token(session::now() + 3600));
  CommandContext::new(settings, prompter, Box::new(connector))
}

/// Logged-in API-mode context that never prompts
pub fn api_context(sandbox: &Sandbox, backend: Arc<FakeBackend>) -> CommandContext {
  logged_in_context(sandbox, DisplayMode::Api, backend, Box::new(NonInteractivePrompter))
}
