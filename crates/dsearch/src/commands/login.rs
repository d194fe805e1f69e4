use crate::commands::Output;
use crate::context::CommandContext;
use crate::error::Result;
use crate::session::{self, print_login_status, LoginMode, LoginOutcome};

pub async fn handle(ctx: &mut CommandContext, reset: bool) -> Result<Output> {
  let now = session::now();
  let outcome = if reset {
    session::reset_login(ctx).await?
  } else {
    session::login_at(ctx, LoginMode::Normal, now).await?
  };

  match outcome {
    LoginOutcome::LoggedIn { username, expiry } => print_login_status(Some(&username), expiry, now),
    LoginOutcome::AlreadyLoggedIn { expiry } => print_login_status(None, expiry, now),
    LoginOutcome::Failed { message } => tracing::debug!(%message, "login failed"),
    LoginOutcome::LoggedOut => {}
  }
  Ok(None)
}
