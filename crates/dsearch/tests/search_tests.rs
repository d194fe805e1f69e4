mod common;

use common::*;
use serde_json::json;
use std::sync::Arc;

use dsearch::backend::{ChemistryQuery, PageCursor, ResultPage, YearBucket};
use dsearch::commands::find_molecules::{self, MoleculeSearch};
use dsearch::commands::{collections_for_domain, patents_containing, search_collection};
use dsearch::prompt::{Answer, ScriptedPrompter};
use dsearch::query::SearchRequest;
use dsearch::{Collection, DisplayMode, DsError, Table};

fn collections() -> Vec<Collection> {
  vec![
    Collection::new("PubChem", "pubchem").with_domains(&["Chemistry"]),
    Collection::new("Patents from USPTO", "patent-uspto").with_domains(&["IP", "Chemistry"]),
  ]
}

fn titled_page(titles: &[&str], more: bool) -> ResultPage {
  ResultPage {
    records: titles.iter().map(|t| record(json!({ "description": { "title": t } }))).collect(),
    year_buckets: vec![YearBucket {
      key_as_string: "2020".to_string(),
      doc_count: titles.len() as u64,
    }],
    cursor: more.then(|| PageCursor(vec![json!(titles.len())])),
  }
}

fn request(collection: &str, query: &str) -> SearchRequest {
  SearchRequest {
    collection: Some(collection.to_string()),
    query: query.to_string(),
    ..Default::default()
  }
}

#[tokio::test]
async fn test_unknown_collection_never_searches() {
  let sandbox = Sandbox::new();
  let backend = Arc::new(FakeBackend::with_collections(collections()));
  let mut ctx = api_context(&sandbox, backend.clone());

  for name in ["nope", "PUBCHEM", "pubchem "] {
    let err = search_collection::handle(&mut ctx, &request(name, "aspirin")).await.unwrap_err();
    assert!(matches!(err, DsError::InvalidCollection { .. }));
    assert_eq!(err.collections().map(|c| c.len()), Some(2));
  }
  assert_eq!(backend.count_calls(), 0);
  assert_eq!(backend.fetch_calls(), 0);
}

#[tokio::test]
async fn test_unknown_elastic_id_is_rejected() {
  let sandbox = Sandbox::new();
  let backend = Arc::new(FakeBackend::with_collections(collections()));
  let mut ctx = api_context(&sandbox, backend.clone());

  let mut req = request("pubchem", "aspirin");
  req.using = vec!["system_id=elsewhere".to_string()];
  let err = search_collection::handle(&mut ctx, &req).await.unwrap_err();

  assert!(matches!(err, DsError::InvalidSystemId { .. }));
  assert_eq!(backend.count_calls(), 0);
}

#[tokio::test]
async fn test_title_only_record_gives_title_only_row() {
  let sandbox = Sandbox::new();
  let backend = Arc::new(FakeBackend {
    collections: collections(),
    total: 1,
    pages: vec![titled_page(&["Aspirin and you"], false)],
    ..Default::default()
  });
  let mut ctx = api_context(&sandbox, backend.clone());

  let table =
    search_collection::handle(&mut ctx, &request("PubChem", "aspirin")).await.unwrap().unwrap();

  assert_eq!(table.columns(), &["Title"]);
  assert_eq!(table.rows(), &[vec!["Aspirin and you".to_string()]]);
}

#[tokio::test]
async fn test_fetches_every_expected_page() {
  let sandbox = Sandbox::new();
  let backend = Arc::new(FakeBackend {
    collections: collections(),
    total: 120,
    pages: vec![
      titled_page(&["a", "b"], true),
      titled_page(&["c"], true),
      titled_page(&["d"], true),
      titled_page(&["never"], true),
    ],
    ..Default::default()
  });
  let mut ctx = api_context(&sandbox, backend.clone());

  let mut req = request("pubchem", "aspirin");
  req.using = vec!["elastic_page_size=50".to_string()];
  let table = search_collection::handle(&mut ctx, &req).await.unwrap().unwrap();

  assert_eq!(backend.count_calls(), 1);
  assert_eq!(backend.fetch_calls(), 3);
  assert_eq!(table.column_values("Title").unwrap(), vec!["a", "b", "c", "d"]);
}

#[tokio::test]
async fn test_estimate_only_skips_fetching() {
  let sandbox = Sandbox::new();
  let backend =
    Arc::new(FakeBackend { collections: collections(), total: 5000, ..Default::default() });
  let mut ctx = api_context(&sandbox, backend.clone());

  let mut req = request("pubchem", "aspirin");
  req.estimate_only = true;
  let output = search_collection::handle(&mut ctx, &req).await.unwrap();

  assert!(output.is_none());
  assert_eq!(backend.count_calls(), 1);
  assert_eq!(backend.fetch_calls(), 0);
}

#[tokio::test]
async fn test_declined_confirmation_skips_fetching() {
  let sandbox = Sandbox::new();
  let backend =
    Arc::new(FakeBackend { collections: collections(), total: 101, ..Default::default() });
  let prompter = Arc::new(ScriptedPrompter::new(vec![Answer::No]));
  let mut ctx =
    logged_in_context(&sandbox, DisplayMode::Terminal, backend.clone(), Box::new(prompter.clone()));

  let output = search_collection::handle(&mut ctx, &request("pubchem", "aspirin")).await.unwrap();

  assert!(output.is_none());
  assert_eq!(prompter.asked(), vec!["Your query may take some time, do you wish to proceed?"]);
  assert_eq!(backend.fetch_calls(), 0);
}

#[tokio::test]
async fn test_empty_search_is_reported_as_no_results() {
  let sandbox = Sandbox::new();
  let backend =
    Arc::new(FakeBackend { collections: collections(), total: 0, ..Default::default() });
  let mut ctx = api_context(&sandbox, backend.clone());

  let err = search_collection::handle(&mut ctx, &request("pubchem", "zzz")).await.unwrap_err();
  assert!(err.is_warning());
  assert_eq!(err.to_string(), "Search returned no result");
}

#[tokio::test]
async fn test_limit_results_and_save_as() {
  let sandbox = Sandbox::new();
  let backend = Arc::new(FakeBackend {
    collections: collections(),
    total: 3,
    pages: vec![titled_page(&["a", "b", "c"], false)],
    ..Default::default()
  });
  let mut ctx = api_context(&sandbox, backend.clone());

  let mut req = request("pubchem", "aspirin");
  req.using = vec!["limit_results=2".to_string()];
  req.save_as = Some("hits".to_string());
  let table = search_collection::handle(&mut ctx, &req).await.unwrap().unwrap();

  assert_eq!(table.len(), 2);
  let saved = Table::read_csv(&ctx.settings.workspace_file("hits.csv")).unwrap();
  assert_eq!(saved, table);
}

#[tokio::test]
async fn test_invalid_smiles_is_rejected_before_querying() {
  let sandbox = Sandbox::new();
  let backend = Arc::new(FakeBackend::with_collections(collections()));
  let mut ctx = api_context(&sandbox, backend.clone());

  let err =
    find_molecules::handle(&mut ctx, MoleculeSearch::Similar, "C1CC(", None).await.unwrap_err();

  assert!(matches!(err, DsError::InvalidMoleculeIdentifier { .. }));
  assert!(backend.chemistry_queries.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_substructure_rows_drop_persistent_id() {
  let sandbox = Sandbox::new();
  let mut backend = FakeBackend::with_collections(collections());
  backend.chemistry = vec![
    json!({ "persistent_id": "p1", "SMILES": "CCO", "name": "ethanol" })
      .as_object()
      .unwrap()
      .clone(),
    json!({ "persistent_id": "p2", "SMILES": "CCCO" }).as_object().unwrap().clone(),
  ];
  let backend = Arc::new(backend);
  let mut ctx = api_context(&sandbox, backend.clone());

  let table = find_molecules::handle(&mut ctx, MoleculeSearch::Substructure, "CCO", None)
    .await
    .unwrap()
    .unwrap();

  assert_eq!(table.columns(), &["SMILES", "name"]);
  assert_eq!(table.cell(1, "name"), Some(""));
  let queries = backend.chemistry_queries.lock().unwrap();
  let expected = ChemistryQuery::CompoundsBySubstructure { structure: "CCO".to_string() };
  assert_eq!(queries[0], (expected, None));
}

#[tokio::test]
async fn test_patents_containing_uses_limit_and_reports_empty() {
  let sandbox = Sandbox::new();
  let backend = Arc::new(FakeBackend::with_collections(collections()));
  let mut ctx = api_context(&sandbox, backend.clone());

  let err = patents_containing::handle(&mut ctx, "c1ccccc1", None).await.unwrap_err();

  assert!(err.is_warning());
  let queries = backend.chemistry_queries.lock().unwrap();
  assert_eq!(queries[0].1, Some(20));
}

#[tokio::test]
async fn test_collections_for_domain_in_api_mode() {
  let sandbox = Sandbox::new();
  let backend = Arc::new(FakeBackend::with_collections(collections()));
  let mut ctx = api_context(&sandbox, backend.clone());

  let table =
    collections_for_domain::handle(&mut ctx, &["ip".to_string()], None).await.unwrap().unwrap();

  assert_eq!(table.column_values("Collection Key").unwrap(), vec!["patent-uspto"]);
}
