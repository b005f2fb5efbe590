use std::sync::LazyLock;
use std::time::Duration;

/// The publicly visible name of the server
pub const PKG_NAME: &str = "mediatum-api";

/// The name shown in log lines announcing the server
pub const SERVER_TITLE: &str = "mediaTUM View - API";

/// The address the HTTP server binds to by default
pub const DEFAULT_BIND: &str = "0.0.0.0:5000";

/// The PostgreSQL user used to connect. Watching the schema needs superuser rights
/// for the catalog queries to see every relation.
pub const DEFAULT_DATABASE_SUPERUSER: &str = "postgres";

pub const DEFAULT_DATABASE_HOST: &str = "localhost";

pub const DEFAULT_DATABASE_PORT: u16 = 5432;

/// Where the SDL of the derived schema is written in development
pub const SCHEMA_EXPORT_PATH: &str = "export/schema-export.graphql";

/// The message returned to clients in place of any error in production
pub const GENERIC_ERROR_MESSAGE: &str = "API error";

/// The PostgreSQL schema whose relations are exposed through GraphQL
pub static API_SCHEMA: LazyLock<String> =
	lazy_env_parse!("MEDIATUM_API_SCHEMA", String, "api".to_owned());

/// The statement timeout applied to every GraphQL transaction (PostgreSQL interval syntax)
pub static STATEMENT_TIMEOUT: LazyLock<String> =
	lazy_env_parse!("MEDIATUM_STATEMENT_TIMEOUT", String, "30s".to_owned());

/// The maximum number of pooled database connections
pub static DATABASE_MAX_CONNECTIONS: LazyLock<u32> =
	lazy_env_parse!("MEDIATUM_DATABASE_MAX_CONNECTIONS", u32, 10);

/// How often the catalog is re-read when watching the schema (defaults to 2 seconds)
pub static WATCH_INTERVAL: LazyLock<Duration> =
	lazy_env_parse!(duration, "MEDIATUM_WATCH_INTERVAL", Duration::from_secs(2));

/// The length of a rate limiting window (defaults to 10 minutes)
pub static RATE_LIMIT_WINDOW: LazyLock<Duration> =
	lazy_env_parse!(duration, "MEDIATUM_RATE_LIMIT_WINDOW", Duration::from_secs(10 * 60));

/// How many requests a client may make within one rate limiting window
pub static RATE_LIMIT_MAX: LazyLock<u64> = lazy_env_parse!("MEDIATUM_RATE_LIMIT_MAX", u64, 500);

/// The length of a slow down window (defaults to 30 minutes)
pub static SLOW_DOWN_WINDOW: LazyLock<Duration> =
	lazy_env_parse!(duration, "MEDIATUM_SLOW_DOWN_WINDOW", Duration::from_secs(30 * 60));

/// How many requests a client may make within one slow down window before being delayed
pub static SLOW_DOWN_AFTER: LazyLock<u64> = lazy_env_parse!("MEDIATUM_SLOW_DOWN_AFTER", u64, 100);

/// The delay added for every request beyond the slow down threshold
pub static SLOW_DOWN_DELAY: LazyLock<Duration> =
	lazy_env_parse!(duration, "MEDIATUM_SLOW_DOWN_DELAY", Duration::from_millis(2));

/// The version identifier of this build
pub static PKG_VERSION: LazyLock<String> =
	LazyLock::new(|| match option_env!("MEDIATUM_BUILD_METADATA") {
		Some(metadata) if !metadata.trim().is_empty() => {
			let version = env!("CARGO_PKG_VERSION");
			format!("{version}+{metadata}")
		}
		_ => env!("CARGO_PKG_VERSION").to_owned(),
	});
