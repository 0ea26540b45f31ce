mod api;
mod app;
mod cache;
mod commands;
mod config;
mod controller;
mod event;
mod logging;
mod query;
mod search;
mod sync;
mod ui;

use api::{ApiClient, Endpoint, Entity};
use cache::QueryCache;
use clap::Parser;
use color_eyre::Result;
use controller::ListController;
use logging::LogTarget;
use query::{QueryBinder, QueryClient};
use serde::Serialize;
use std::path::PathBuf;
use sync::{MemoryLocation, ViewStateSync};
use tracing::warn;

#[derive(Parser, Debug)]
#[command(name = "listsync")]
#[command(about = "Paginated, filterable list views over a REST API, kept in sync with the location")]
#[command(version)]
struct Args {
  /// Path to config file (default: $XDG_CONFIG_HOME/listsync/config.yaml)
  #[arg(short, long)]
  config: Option<PathBuf>,

  /// API base URL, overrides the config file
  #[arg(short, long)]
  url: Option<String>,

  /// Initial view state as a query string, e.g. "offset=20&limit=10&name=db"
  #[arg(short, long, default_value = "")]
  search: String,

  /// Load one page, print it as JSON and exit
  #[arg(long)]
  once: bool,

  /// List to open
  #[arg(value_enum, default_value_t = Endpoint::Variables)]
  entity: Endpoint,
}

/// Output of `--once`
#[derive(Serialize)]
struct PageReport<E> {
  location: String,
  items: Vec<E>,
  row_count: usize,
  current_count: u64,
  total_count: u64,
}

#[tokio::main]
async fn main() -> Result<()> {
  color_eyre::install()?;

  let args = Args::parse();

  let target = if args.once {
    LogTarget::Stderr
  } else {
    LogTarget::File(logging::default_log_dir())
  };
  let _guard = logging::init(target)?;

  // Invalid fields still open with their defaults
  if let Err(e) = search::decode(&args.search) {
    warn!(error = %e, search = %args.search, "invalid initial search");
  }

  let mut config = config::Config::load(args.config.as_deref())?;
  if let Some(url) = args.url {
    config.api.url = url;
  }

  let api = ApiClient::new(&config.api)?;
  let binder = QueryBinder::new(api).with_stale_after(config.lists.stale_time());
  let client = QueryClient::new(binder);

  if args.once {
    return match args.entity {
      Endpoint::Variables => print_page(&client, client.variables(), &args.search).await,
      Endpoint::WorkPools => print_page(&client, client.work_pools(), &args.search).await,
    };
  }

  let mut app = app::App::new(config, client, args.entity, &args.search);
  app.run().await?;

  Ok(())
}

async fn print_page<E: Entity>(
  client: &QueryClient,
  cache: &QueryCache<Vec<E>>,
  search: &str,
) -> Result<()> {
  let location = MemoryLocation::new(E::ENDPOINT.route(), search);
  let controller = ListController::new(
    ViewStateSync::new(location),
    client.binder().clone(),
    cache.clone(),
    client.counts().clone(),
  );

  let page = controller.load().await?;
  let report = PageReport {
    location: controller.location().href(),
    row_count: page.items.len(),
    items: page.items,
    current_count: page.current_count,
    total_count: page.total_count,
  };
  println!("{}", serde_json::to_string_pretty(&report)?);
  Ok(())
}
