use std::fmt;

use clap::Args;
use sqlx::postgres::{PgConnectOptions, PgPool, PgPoolOptions};
use sqlx::{Postgres, Transaction};

use crate::cnf::{
	DATABASE_MAX_CONNECTIONS, DEFAULT_DATABASE_HOST, DEFAULT_DATABASE_PORT,
	DEFAULT_DATABASE_SUPERUSER, STATEMENT_TIMEOUT,
};
use crate::err::Error;

const TARGET: &str = "mediatum::dbs";

#[derive(Args, Debug, Clone)]
pub struct DatabaseOptions {
	#[arg(help = "The name of the mediaTUM database")]
	#[arg(env = "MEDIATUM_DATABASE_NAME", long = "database-name")]
	pub name: String,
	#[arg(help = "The database role GraphQL requests are executed as")]
	#[arg(env = "MEDIATUM_DATABASE_USER_VIEW_API", long = "database-role")]
	pub role: String,
	#[arg(help = "The database user used to connect")]
	#[arg(env = "MEDIATUM_DATABASE_SUPERUSER", long = "database-user")]
	#[arg(default_value = DEFAULT_DATABASE_SUPERUSER)]
	pub user: String,
	#[arg(help = "The host of the database server")]
	#[arg(env = "MEDIATUM_DATABASE_HOST", long = "database-host")]
	#[arg(default_value = DEFAULT_DATABASE_HOST)]
	pub host: String,
	#[arg(help = "The port of the database server")]
	#[arg(env = "MEDIATUM_DATABASE_PORT", long = "database-port")]
	#[arg(default_value_t = DEFAULT_DATABASE_PORT)]
	pub port: u16,
}

impl DatabaseOptions {
	/// The connection target without credentials, as shown in logs.
	pub fn display_url(&self) -> String {
		format!("postgres://{}@{}:{}/{}", self.user, self.host, self.port, self.name)
	}

	fn connect_options(&self) -> PgConnectOptions {
		PgConnectOptions::new()
			.host(&self.host)
			.port(self.port)
			.username(&self.user)
			.database(&self.name)
			.application_name(crate::cnf::PKG_NAME)
	}
}

/// The pooled connection to the mediaTUM database.
#[derive(Clone)]
pub struct Datastore {
	pool: PgPool,
	role: String,
	statement_timeout: String,
}

impl fmt::Debug for Datastore {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Datastore")
			.field("role", &self.role)
			.field("statement_timeout", &self.statement_timeout)
			.finish_non_exhaustive()
	}
}

impl Datastore {
	/// Connects to the database and checks that it answers.
	pub async fn connect(opts: &DatabaseOptions) -> Result<Self, Error> {
		info!(target: TARGET, "Connecting to {}", opts.display_url());
		let pool = PgPoolOptions::new()
			.max_connections(*DATABASE_MAX_CONNECTIONS)
			.connect_with(opts.connect_options())
			.await?;
		let ds = Self::from_pool(pool, &opts.role);
		ds.health().await?;
		info!(target: TARGET, "Connected, requests run as role '{}'", ds.role);
		Ok(ds)
	}

	/// Wraps a pool that may not have connected yet.
	pub fn from_pool(pool: PgPool, role: impl Into<String>) -> Self {
		Self {
			pool,
			role: role.into(),
			statement_timeout: STATEMENT_TIMEOUT.clone(),
		}
	}

	/// Creates a datastore whose connections are only opened on first use.
	pub fn lazy(url: &str, role: impl Into<String>) -> Result<Self, Error> {
		let pool = PgPoolOptions::new().max_connections(1).connect_lazy(url)?;
		Ok(Self::from_pool(pool, role))
	}

	pub fn pool(&self) -> &PgPool {
		&self.pool
	}

	pub fn role(&self) -> &str {
		&self.role
	}

	/// Starts a transaction scoped to the API role and the statement timeout.
	/// Both settings are transaction local and vanish on commit or rollback.
	pub async fn transaction(&self) -> Result<Transaction<'static, Postgres>, sqlx::Error> {
		let mut tx = self.pool.begin().await?;
		sqlx::query("select set_config('role', $1, true), set_config('statement_timeout', $2, true)")
			.bind(&self.role)
			.bind(&self.statement_timeout)
			.execute(&mut *tx)
			.await?;
		Ok(tx)
	}

	pub async fn health(&self) -> Result<(), sqlx::Error> {
		sqlx::query("select 1").execute(&self.pool).await.map(|_| ())
	}

	/// Stops handing out connections and waits for the open ones to close.
	pub async fn close(&self) {
		trace!(target: TARGET, "Closing the connection pool");
		self.pool.close().await;
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn options() -> DatabaseOptions {
		DatabaseOptions {
			name: "mediatum".into(),
			role: "view_api".into(),
			user: DEFAULT_DATABASE_SUPERUSER.into(),
			host: DEFAULT_DATABASE_HOST.into(),
			port: DEFAULT_DATABASE_PORT,
		}
	}

	#[test]
	fn display_url_has_no_credentials() {
		assert_eq!(options().display_url(), "postgres://postgres@localhost:5432/mediatum");
	}

	#[tokio::test]
	async fn lazy_datastore_does_not_connect() {
		let ds = Datastore::lazy("postgres://postgres@127.0.0.1:1/none", "view_api").unwrap();
		assert_eq!(ds.role(), "view_api");
		assert_eq!(ds.statement_timeout, *STATEMENT_TIMEOUT);
		assert_eq!(ds.pool().size(), 0);
	}
}
