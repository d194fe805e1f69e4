mod common;

use common::*;
use std::sync::atomic::Ordering;
use std::sync::Arc;

use dsearch::credentials::Credentials;
use dsearch::prompt::{Answer, NonInteractivePrompter, ScriptedPrompter};
use dsearch::session::{self, LoginMode, LoginOutcome, SessionCache};
use dsearch::{CommandContext, DisplayMode};

const NOW: i64 = 1_700_000_000;

fn text(s: &str) -> Answer {
  Answer::Text(s.to_string())
}

#[tokio::test]
async fn test_reset_forces_fresh_login_despite_valid_cache() {
  let sandbox = Sandbox::new();
  let settings = sandbox.settings(DisplayMode::Terminal);
  sandbox.logged_in(&settings, NOW + 300);

  let prompter = Arc::new(ScriptedPrompter::new(vec![text(HOST), text("grace"), text("new-key")]));
  let connector = FakeConnector::new(Arc::new(FakeBackend::default()), make_token(NOW + 7200));
  let connects = connector.connects.clone();
  let mut ctx =
    CommandContext::new(settings.clone(), Box::new(prompter.clone()), Box::new(connector));

  let outcome = session::login_at(&mut ctx, LoginMode::Reset, NOW).await.unwrap();

  assert_eq!(outcome, LoginOutcome::LoggedIn { username: "grace".to_string(), expiry: NOW + 7200 });
  assert_eq!(prompter.asked(), vec!["Host", "Username", "API key"]);
  assert_eq!(connects.load(Ordering::SeqCst), 1);

  let saved = Credentials::load(&settings.credentials_path()).unwrap().unwrap();
  assert_eq!(saved.auth.username, "grace");
  let cache = SessionCache::load(&settings.session_cache_path()).unwrap().unwrap();
  assert_eq!(cache.expiry, NOW + 7200);
}

#[tokio::test]
async fn test_valid_cache_short_circuits_without_backend() {
  let sandbox = Sandbox::new();
  let settings = sandbox.settings(DisplayMode::Terminal);
  sandbox.logged_in(&settings, NOW + 300);

  let connector = FakeConnector::new(Arc::new(FakeBackend::default()), make_token(NOW + 7200));
  let connects = connector.connects.clone();
  let mut ctx =
    CommandContext::new(settings, Box::new(NonInteractivePrompter), Box::new(connector));

  let outcome = session::login_at(&mut ctx, LoginMode::Normal, NOW).await.unwrap();

  assert_eq!(outcome, LoginOutcome::AlreadyLoggedIn { expiry: NOW + 300 });
  assert_eq!(connects.load(Ordering::SeqCst), 0);
  assert!(ctx.sessions.active("deep_search", NOW).is_some());
}

#[tokio::test]
async fn test_expired_cache_logs_in_with_stored_credentials() {
  let sandbox = Sandbox::new();
  let settings = sandbox.settings(DisplayMode::Terminal);
  sandbox.logged_in(&settings, NOW - 10);

  let connector = FakeConnector::new(Arc::new(FakeBackend::default()), make_token(NOW + 3600));
  let connects = connector.connects.clone();
  let mut ctx =
    CommandContext::new(settings, Box::new(NonInteractivePrompter), Box::new(connector));

  let outcome = session::login_at(&mut ctx, LoginMode::Normal, NOW).await.unwrap();

  assert_eq!(
    outcome,
    LoginOutcome::LoggedIn { username: USERNAME.to_string(), expiry: NOW + 3600 }
  );
  assert_eq!(connects.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_missing_credentials_prompt_for_new_ones() {
  let sandbox = Sandbox::new();
  let settings = sandbox.settings(DisplayMode::Terminal);

  let prompter = Arc::new(ScriptedPrompter::new(vec![text(""), text("ada"), text("key")]));
  let connector = FakeConnector::new(Arc::new(FakeBackend::default()), make_token(NOW + 3600));
  let mut ctx =
    CommandContext::new(settings.clone(), Box::new(prompter.clone()), Box::new(connector));

  let outcome = session::login_at(&mut ctx, LoginMode::Normal, NOW).await.unwrap();

  assert!(matches!(outcome, LoginOutcome::LoggedIn { .. }));
  assert_eq!(prompter.asked().len(), 3);
  let saved = Credentials::load(&settings.credentials_path()).unwrap().unwrap();
  assert_eq!(saved.normalized().host, "https://sds.app.accelerate.science/");
}

#[tokio::test]
async fn test_unreachable_host_offers_reset_and_keeps_credentials_when_declined() {
  let sandbox = Sandbox::new();
  let settings = sandbox.settings(DisplayMode::Terminal);
  sandbox.logged_in(&settings, NOW - 10);

  let prompter = Arc::new(ScriptedPrompter::new(vec![Answer::No]));
  let mut connector = FakeConnector::new(Arc::new(FakeBackend::default()), make_token(NOW + 3600));
  connector.host_ok = false;
  let connects = connector.connects.clone();
  let mut ctx =
    CommandContext::new(settings.clone(), Box::new(prompter.clone()), Box::new(connector));

  let outcome = session::login_at(&mut ctx, LoginMode::Normal, NOW).await.unwrap();

  assert_eq!(outcome, LoginOutcome::Failed { message: "Invalid host, try again".to_string() });
  assert_eq!(prompter.asked(), vec!["Reset credentials?"]);
  assert_eq!(connects.load(Ordering::SeqCst), 0);
  assert!(settings.credentials_path().exists());
}

#[tokio::test]
async fn test_failed_login_reset_then_decline_logs_out() {
  let sandbox = Sandbox::new();
  let settings = sandbox.settings(DisplayMode::Terminal);
  Credentials::new(HOST, "", "key").save(&settings.credentials_path()).unwrap();

  let prompter = Arc::new(ScriptedPrompter::new(vec![Answer::Yes, Answer::No]));
  let connector = FakeConnector::new(Arc::new(FakeBackend::default()), make_token(NOW + 3600));
  let mut ctx =
    CommandContext::new(settings.clone(), Box::new(prompter.clone()), Box::new(connector));

  let outcome = session::login_at(&mut ctx, LoginMode::Normal, NOW).await.unwrap();

  assert_eq!(outcome, LoginOutcome::LoggedOut);
  assert_eq!(prompter.asked(), vec!["Reset credentials?", "Would you like to log in again?"]);
  assert!(!settings.credentials_path().exists());
}

#[tokio::test]
async fn test_reset_login_without_credentials_can_be_declined() {
  let sandbox = Sandbox::new();
  let settings = sandbox.settings(DisplayMode::Terminal);

  let prompter = Arc::new(ScriptedPrompter::new(vec![Answer::No]));
  let connector = FakeConnector::new(Arc::new(FakeBackend::default()), make_token(NOW + 3600));
  let mut ctx = CommandContext::new(settings, Box::new(prompter.clone()), Box::new(connector));

  let outcome = session::reset_login(&mut ctx).await.unwrap();

  assert_eq!(outcome, LoginOutcome::LoggedOut);
  assert_eq!(prompter.asked(), vec!["Would you like to log in?"]);
}

#[tokio::test]
async fn test_api_mode_without_credentials_is_not_logged_in() {
  let sandbox = Sandbox::new();
  let settings = sandbox.settings(DisplayMode::Api);
  let connector = FakeConnector::new(Arc::new(FakeBackend::default()), make_token(NOW + 3600));
  let mut ctx =
    CommandContext::new(settings, Box::new(NonInteractivePrompter), Box::new(connector));

  let err = session::ensure_backend(&mut ctx).await.err().unwrap();
  assert_eq!(err.to_string(), "You are not logged in to Deep Search");
}
