use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{filter::EnvFilter, fmt, prelude::*};

use dsearch::cli::{execute, Cli};
use dsearch::commands::collections_table;
use dsearch::{CommandContext, DsError, Settings};

/// Turn a command failure into user-facing output; none of them end the process
fn report(err: &DsError, ctx: &CommandContext) {
  if err.is_warning() {
    marquee::warn(&err.to_string());
    return;
  }
  marquee::error(&err.to_string());
  if let Some(collections) = err.collections() {
    marquee::text("\n<bold>Available collections</bold>");
    ctx.presenter().show(&collections_table(collections), false);
  }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
  let filter = EnvFilter::try_from_env("DS_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
  tracing_subscriber::registry()
    .with(fmt::layer().with_writer(std::io::stderr))
    .with(filter)
    .init();

  let cli = Cli::parse();
  let meta = dsearch::config::metadata();
  tracing::debug!(plugin = %meta.name, namespace = %meta.namespace, "starting");

  let settings = match Settings::resolve(cli.display, cli.home, cli.workspace) {
    Ok(settings) => settings,
    Err(err) => {
      marquee::error(&err.to_string());
      return Ok(());
    }
  };
  let mut ctx = CommandContext::from_settings(settings);

  match execute(&mut ctx, cli.command).await {
    Ok(Some(table)) => println!("{}", serde_json::to_string_pretty(&table.to_json())?),
    Ok(None) => {}
    Err(err) => report(&err, &ctx),
  }
  Ok(())
}
