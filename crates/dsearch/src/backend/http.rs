use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use std::sync::Arc;
use std::time::Duration;

use crate::backend::{
  ChemistryQuery, Collection, Connection, Connector, PageCursor, ResultPage, SearchBackend,
  YearBucket,
};
use crate::credentials::Credentials;
use crate::error::{DsError, Result};
use crate::query::DataQuery;
use crate::record::Record;

const USER_AGENT: &str = concat!("dsearch/", env!("CARGO_PKG_VERSION"));
const HOST_CHECK_TIMEOUT: Duration = Duration::from_secs(10);

const TOKEN_PATH: &str = "/api/cps/user/v1/user/token";
const ELASTIC_PATH: &str = "/api/cps/public/v1/elastic";
const CHEMISTRY_PATH: &str = "/api/cps/public/v1/chemistry/query";

#[derive(Debug, Deserialize)]
struct ElasticEntry {
  name: String,
  source: ElasticSource,
  #[serde(default)]
  documents: u64,
  #[serde(default)]
  metadata: ElasticMetadata,
}

#[derive(Debug, Deserialize)]
struct ElasticSource {
  elastic_id: String,
  index_key: String,
}

#[derive(Debug, Default, Deserialize)]
struct ElasticMetadata {
  #[serde(default)]
  domain: Vec<String>,
  #[serde(rename = "type", default)]
  kind: String,
  #[serde(default)]
  created: Option<String>,
  #[serde(default)]
  description: String,
}

impl From<ElasticEntry> for Collection {
  fn from(entry: ElasticEntry) -> Self {
    Collection {
      name: entry.name,
      index_key: entry.source.index_key,
      elastic_id: entry.source.elastic_id,
      domain: entry.metadata.domain,
      kind: entry.metadata.kind,
      documents: entry.documents,
      created: entry.metadata.created,
      description: entry.metadata.description,
    }
  }
}

#[derive(Debug, Default, Deserialize)]
struct QueryResponse {
  #[serde(default)]
  data_count: u64,
  #[serde(default)]
  data_outputs: Vec<Record>,
  #[serde(default)]
  data_aggs: Option<Aggregations>,
  #[serde(default)]
  search_after: Option<Vec<Value>>,
}

#[derive(Debug, Deserialize)]
struct Aggregations {
  by_year: Option<BucketList>,
}

#[derive(Debug, Deserialize)]
struct BucketList {
  #[serde(default)]
  buckets: Vec<YearBucket>,
}

#[derive(Debug, Deserialize)]
struct ChemistryResponse {
  #[serde(default)]
  results: Vec<Map<String, Value>>,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
  access_token: String,
}

async fn read_json<T: DeserializeOwned>(response: Response, what: &str) -> Result<T> {
  let status = response.status();
  if !status.is_success() {
    let body = response.text().await.unwrap_or_default();
    let body: String = body.chars().take(200).collect();
    return Err(DsError::backend(format!("{what} returned {status}: {body}")));
  }
  response
    .json()
    .await
    .map_err(|e| DsError::backend(format!("failed to parse {what} response: {e}")))
}

fn build_client(verify_ssl: bool) -> Result<Client> {
  Ok(
    Client::builder()
      .user_agent(USER_AGENT)
      .danger_accept_invalid_certs(!verify_ssl)
      .build()?,
  )
}

/// Deep Search REST client authenticated with a bearer token
pub struct HttpBackend {
  client: Client,
  base_url: String,
  token: String,
}

impl HttpBackend {
  pub fn new(base_url: &str, token: impl Into<String>, verify_ssl: bool) -> Result<Self> {
    Ok(Self {
      client: build_client(verify_ssl)?,
      base_url: base_url.trim_end_matches('/').to_string(),
      token: token.into(),
    })
  }

  fn get(&self, path: &str) -> RequestBuilder {
    self.client.get(format!("{}{path}", self.base_url)).bearer_auth(&self.token)
  }

  fn post(&self, path: &str) -> RequestBuilder {
    self.client.post(format!("{}{path}", self.base_url)).bearer_auth(&self.token)
  }

  async fn run_query(
    &self,
    query: &DataQuery,
    cursor: Option<PageCursor>,
  ) -> Result<QueryResponse> {
    let coords = &query.coordinates;
    let path = format!("{ELASTIC_PATH}/{}/indices/{}/query", coords.elastic_id, coords.index_key);

    let mut body = serde_json::to_value(query)
      .map_err(|e| DsError::backend(format!("failed to encode query: {e}")))?;
    if let (Some(cursor), Some(object)) = (cursor, body.as_object_mut()) {
      object.insert("search_after".to_string(), Value::Array(cursor.0));
    }

    tracing::debug!(%path, limit = query.limit, "running data query");
    let response = self.post(&path).json(&body).send().await?;
    read_json(response, "data query").await
  }
}

#[async_trait]
impl SearchBackend for HttpBackend {
  async fn list_collections(&self) -> Result<Vec<Collection>> {
    let response = self.get(ELASTIC_PATH).send().await?;
    let entries: Vec<ElasticEntry> = read_json(response, "collection list").await?;
    Ok(entries.into_iter().map(Collection::from).collect())
  }

  async fn count(&self, query: &DataQuery) -> Result<u64> {
    Ok(self.run_query(query, None).await?.data_count)
  }

  async fn fetch_page(&self, query: &DataQuery, cursor: Option<PageCursor>) -> Result<ResultPage> {
    let response = self.run_query(query, cursor).await?;
    let year_buckets = response
      .data_aggs
      .and_then(|aggs| aggs.by_year)
      .map(|list| list.buckets)
      .unwrap_or_default();
    let cursor = match response.search_after {
      Some(after) if !after.is_empty() && !response.data_outputs.is_empty() => {
        Some(PageCursor(after))
      }
      _ => None,
    };
    Ok(ResultPage { records: response.data_outputs, year_buckets, cursor })
  }

  async fn query_chemistry(
    &self,
    query: &ChemistryQuery,
    limit: Option<usize>,
  ) -> Result<Vec<Map<String, Value>>> {
    let body = json!({ "query": query.to_json(), "limit": limit });
    tracing::debug!(?query, ?limit, "running chemistry query");
    let response = self.post(CHEMISTRY_PATH).json(&body).send().await?;
    let parsed: ChemistryResponse = read_json(response, "chemistry query").await?;
    Ok(parsed.results)
  }
}

/// Logs in over HTTP and hands out [`HttpBackend`]s
#[derive(Debug, Default)]
pub struct HttpConnector;

#[async_trait]
impl Connector for HttpConnector {
  async fn check_host(&self, host: &str) -> bool {
    let builder = Client::builder().user_agent(USER_AGENT).timeout(HOST_CHECK_TIMEOUT);
    let client = match builder.build() {
      Ok(client) => client,
      Err(_) => return false,
    };
    match client.get(host).send().await {
      Ok(response) => response.status() == reqwest::StatusCode::OK,
      Err(e) => {
        tracing::debug!(host, error = %e, "host check failed");
        false
      }
    }
  }

  async fn connect(&self, credentials: &Credentials) -> Result<Connection> {
    let base_url = credentials.base_url();
    let client = build_client(credentials.verify_ssl)?;
    let response = client
      .post(format!("{base_url}{TOKEN_PATH}"))
      .basic_auth(&credentials.auth.username, Some(&credentials.auth.api_key))
      .send()
      .await?;
    let token: TokenResponse = read_json(response, "login").await?;

    let backend = HttpBackend::new(&base_url, token.access_token.clone(), credentials.verify_ssl)?;
    Ok(Connection { backend: Arc::new(backend), token: token.access_token })
  }

  fn resume(&self, credentials: &Credentials, token: &str) -> Result<Arc<dyn SearchBackend>> {
    let backend = HttpBackend::new(&credentials.base_url(), token, credentials.verify_ssl)?;
    Ok(Arc::new(backend))
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::query::Coordinates;
  use mockito::{Matcher, Server};

  fn query() -> DataQuery {
    let mut query = DataQuery::new(
      "aspirin ~3",
      Coordinates { elastic_id: "default".to_string(), index_key: "pubchem".to_string() },
    );
    query.limit = 2;
    query
  }

  #[tokio::test]
  async fn test_list_collections() {
    let mut server = Server::new_async().await;
    let _mock = server
      .mock("GET", "/api/cps/public/v1/elastic")
      .match_header("authorization", "Bearer tok")
      .with_status(200)
      .with_header("content-type", "application/json")
      .with_body(
        r#"[{
          "name": "PubChem",
          "source": { "elastic_id": "default", "index_key": "pubchem" },
          "documents": 1200,
          "metadata": {
            "domain": ["Chemistry"],
            "type": "Record",
            "created": "2023-01-02T00:00:00",
            "description": "Compounds"
          }
        }]"#,
      )
      .create_async()
      .await;

    let backend = HttpBackend::new(&server.url(), "tok", true).unwrap();
    let collections = backend.list_collections().await.unwrap();

    assert_eq!(collections.len(), 1);
    assert_eq!(collections[0].index_key, "pubchem");
    assert_eq!(collections[0].domain, vec!["Chemistry"]);
    assert_eq!(collections[0].kind, "Record");
    assert_eq!(collections[0].documents, 1200);
  }

  #[tokio::test]
  async fn test_count_sends_zero_limit() {
    let mut server = Server::new_async().await;
    let _mock = server
      .mock("POST", "/api/cps/public/v1/elastic/default/indices/pubchem/query")
      .match_body(Matcher::PartialJson(json!({ "query": "aspirin ~3", "limit": 0 })))
      .with_status(200)
      .with_body(r#"{ "data_count": 7 }"#)
      .create_async()
      .await;

    let backend = HttpBackend::new(&server.url(), "tok", true).unwrap();
    assert_eq!(backend.count(&query().count_only()).await.unwrap(), 7);
  }

  #[tokio::test]
  async fn test_fetch_page_forwards_cursor() {
    let mut server = Server::new_async().await;
    let _mock = server
      .mock("POST", "/api/cps/public/v1/elastic/default/indices/pubchem/query")
      .match_body(Matcher::PartialJson(json!({ "search_after": [1.5, "abc"] })))
      .with_status(200)
      .with_body(
        r#"{
          "data_count": 3,
          "data_outputs": [{ "_id": "h1", "_source": { "description": { "title": "T" } } }],
          "data_aggs": { "by_year": { "buckets": [{ "key_as_string": "2020", "doc_count": 1 }] } },
          "search_after": [2.5, "def"]
        }"#,
      )
      .create_async()
      .await;

    let backend = HttpBackend::new(&server.url(), "tok", true).unwrap();
    let page =
      backend.fetch_page(&query(), Some(PageCursor(vec![json!(1.5), json!("abc")]))).await.unwrap();

    assert_eq!(page.records.len(), 1);
    assert_eq!(page.records[0].id.as_deref(), Some("h1"));
    assert_eq!(page.year_buckets[0].key_as_string, "2020");
    assert_eq!(page.cursor, Some(PageCursor(vec![json!(2.5), json!("def")])));
  }

  #[tokio::test]
  async fn test_empty_page_has_no_cursor() {
    let mut server = Server::new_async().await;
    let _mock = server
      .mock("POST", "/api/cps/public/v1/elastic/default/indices/pubchem/query")
      .with_status(200)
      .with_body(r#"{ "data_outputs": [], "search_after": [1] }"#)
      .create_async()
      .await;

    let backend = HttpBackend::new(&server.url(), "tok", true).unwrap();
    let page = backend.fetch_page(&query(), None).await.unwrap();
    assert!(page.cursor.is_none());
    assert!(page.year_buckets.is_empty());
  }

  #[tokio::test]
  async fn test_error_status_is_backend_error() {
    let mut server = Server::new_async().await;
    let _mock = server
      .mock("GET", "/api/cps/public/v1/elastic")
      .with_status(502)
      .with_body("bad gateway")
      .create_async()
      .await;

    let backend = HttpBackend::new(&server.url(), "tok", true).unwrap();
    let err = backend.list_collections().await.unwrap_err();
    match err {
      DsError::Backend { message } => assert!(message.contains("502")),
      other => panic!("Expected Backend error, got: {other:?}"),
    }
  }

  #[tokio::test]
  async fn test_chemistry_query() {
    let mut server = Server::new_async().await;
    let _mock = server
      .mock("POST", "/api/cps/public/v1/chemistry/query")
      .match_body(Matcher::PartialJson(json!({
        "query": { "type": "CompoundsBySubstructure", "structure": "CCO" },
        "limit": 20
      })))
      .with_status(200)
      .with_body(r#"{ "results": [{ "persistent_id": "p1", "SMILES": "CCO" }] }"#)
      .create_async()
      .await;

    let backend = HttpBackend::new(&server.url(), "tok", true).unwrap();
    let query = ChemistryQuery::CompoundsBySubstructure { structure: "CCO".to_string() };
    let rows = backend.query_chemistry(&query, Some(20)).await.unwrap();
    assert_eq!(rows[0]["SMILES"], "CCO");
  }

  #[tokio::test]
  async fn test_connect_exchanges_api_key_for_token() {
    let mut server = Server::new_async().await;
    let _mock = server
      .mock("POST", "/api/cps/user/v1/user/token")
      .match_header("authorization", Matcher::Regex("^Basic ".to_string()))
      .with_status(200)
      .with_body(r#"{ "access_token": "jwt-token" }"#)
      .create_async()
      .await;

    let credentials = Credentials::new(format!("{}/", server.url()), "ada", "key");
    let connection = HttpConnector.connect(&credentials).await.unwrap();
    assert_eq!(connection.token, "jwt-token");
  }

  #[tokio::test]
  async fn test_connect_rejected() {
    let mut server = Server::new_async().await;
    let _mock =
      server.mock("POST", "/api/cps/user/v1/user/token").with_status(401).create_async().await;

    let credentials = Credentials::new(server.url(), "ada", "wrong");
    assert!(matches!(HttpConnector.connect(&credentials).await, Err(DsError::Backend { .. })));
  }

  #[tokio::test]
  async fn test_check_host() {
    let mut server = Server::new_async().await;
    let _ok = server.mock("GET", "/").with_status(200).create_async().await;
    let _missing = server.mock("GET", "/missing").with_status(404).create_async().await;

    assert!(HttpConnector.check_host(&format!("{}/", server.url())).await);
    assert!(!HttpConnector.check_host(&format!("{}/missing", server.url())).await);
    assert!(!HttpConnector.check_host("http://127.0.0.1:1/").await);
  }
}
