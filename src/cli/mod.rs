use std::net::SocketAddr;
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;
use tokio_util::sync::CancellationToken;

use crate::cnf::{API_SCHEMA, DEFAULT_BIND, PKG_VERSION, SCHEMA_EXPORT_PATH, SERVER_TITLE};
use crate::dbs::{DatabaseOptions, Datastore};
use crate::env;
use crate::gql::{SchemaCache, Watcher};
use crate::net::{self, AppState};
use crate::telemetry::{self, LogFormat};
use crate::tier::{Features, TIER_ENV, Tier};

const TARGET: &str = "mediatum::cli";

const INFO: &str = "
Serves a read-only GraphQL API over the relations of the mediaTUM view schema.

The deployment environment is taken from MEDIATUM_ENVIRONMENT and must be
either 'development' or 'production'.
";

#[derive(Parser, Debug)]
#[command(name = SERVER_TITLE, bin_name = "mediatum-api", version = PKG_VERSION.as_str(), about = INFO)]
pub struct Cli {
	#[arg(help = "The deployment environment, either 'development' or 'production'")]
	#[arg(env = TIER_ENV, long = "environment")]
	environment: Option<String>,
	#[arg(help = "The hostname or ip address to listen for connections on")]
	#[arg(env = "MEDIATUM_BIND", short = 'b', long = "bind")]
	#[arg(default_value = DEFAULT_BIND)]
	bind: SocketAddr,
	#[arg(help = "The logging level or a list of filter directives")]
	#[arg(env = "MEDIATUM_LOG", short = 'l', long = "log")]
	#[arg(default_value = "info")]
	log: String,
	#[arg(help = "Where the GraphQL schema is exported in development")]
	#[arg(env = "MEDIATUM_SCHEMA_EXPORT", long = "export-path")]
	#[arg(default_value = SCHEMA_EXPORT_PATH)]
	export_path: PathBuf,
	#[command(flatten)]
	database: DatabaseOptions,
}

pub async fn init() -> ExitCode {
	let args = Cli::parse();
	let tier = Tier::select(args.environment.as_deref());
	// Log as production would until the tier is known to be development
	let format = match tier {
		Ok(tier) => LogFormat::from(tier),
		Err(_) => LogFormat::Json,
	};
	let _guards = match telemetry::builder()
		.with_log_level(&args.log)
		.and_then(|builder| builder.with_format(format).init())
	{
		Ok(guards) => guards,
		Err(e) => {
			eprintln!("{e}");
			return ExitCode::FAILURE;
		}
	};
	let tier = match tier {
		Ok(tier) => tier,
		Err(e) => {
			error!(target: TARGET, "{e}");
			return ExitCode::FAILURE;
		}
	};
	match start(args, tier).await {
		Ok(()) => ExitCode::SUCCESS,
		Err(e) => {
			error!(target: TARGET, "{e:#}");
			ExitCode::FAILURE
		}
	}
}

async fn start(args: Cli, tier: Tier) -> anyhow::Result<()> {
	env::init(tier);
	let features = Features::for_tier(tier).with_export_path(args.export_path);

	let ds = Datastore::connect(&args.database).await.context("Failed to connect to the database")?;
	let (cache, catalog) = SchemaCache::load(&ds, &API_SCHEMA)
		.await
		.with_context(|| format!("Failed to build the GraphQL schema of '{}'", *API_SCHEMA))?;

	let token = CancellationToken::new();
	let watcher = features
		.watch
		.clone()
		.map(|watch| Watcher::new(ds.clone(), cache.clone(), catalog, watch).spawn(token.clone()));

	let state = AppState::new(ds.clone(), cache, features);
	let served = net::init(args.bind, state, token.clone()).await;

	token.cancel();
	if let Some(watcher) = watcher {
		if let Err(e) = watcher.await {
			warn!(target: TARGET, "The schema watcher did not stop cleanly: {e}");
		}
	}
	ds.close().await;
	served.context("The web server failed")
}
