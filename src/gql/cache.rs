use std::sync::Arc;

use arc_swap::ArcSwap;
use async_graphql::dynamic::Schema;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use super::catalog::Catalog;
use super::error::GqlError;
use super::export::export_schema;
use super::schema::generate_schema;
use crate::dbs::Datastore;
use crate::tier::Watch;

const TARGET: &str = "mediatum::gql::cache";

/// Holds the schema requests are executed against. Readers never wait for a
/// rebuild, they keep the schema that was current when they started.
#[derive(Clone)]
pub struct SchemaCache {
	inner: Arc<ArcSwap<Schema>>,
}

impl std::fmt::Debug for SchemaCache {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("SchemaCache").finish_non_exhaustive()
	}
}

impl SchemaCache {
	pub fn new(schema: Schema) -> Self {
		Self {
			inner: Arc::new(ArcSwap::from_pointee(schema)),
		}
	}

	/// Reflects the catalog of `schema` and builds the first schema from it.
	pub async fn load(ds: &Datastore, schema: &str) -> Result<(Self, Catalog), GqlError> {
		let catalog = Catalog::read(ds, schema).await?;
		let generated = generate_schema(&catalog, ds)?;
		info!(target: TARGET, "Serving {} relations of schema '{schema}'", catalog.tables.len());
		Ok((Self::new(generated), catalog))
	}

	pub fn get(&self) -> Schema {
		self.inner.load().as_ref().clone()
	}

	pub fn replace(&self, schema: Schema) {
		self.inner.store(Arc::new(schema));
	}
}

/// Rebuilds the schema whenever the exposed part of the database changes.
pub struct Watcher {
	ds: Datastore,
	cache: SchemaCache,
	catalog: Catalog,
	watch: Watch,
}

impl Watcher {
	pub fn new(ds: Datastore, cache: SchemaCache, catalog: Catalog, watch: Watch) -> Self {
		Self {
			ds,
			cache,
			catalog,
			watch,
		}
	}

	/// Compares the database catalog with the served one and swaps in a new
	/// schema if they differ. Returns whether the schema changed.
	pub async fn refresh(&mut self) -> Result<bool, GqlError> {
		let catalog = Catalog::read(&self.ds, &self.catalog.schema).await?;
		if catalog == self.catalog {
			return Ok(false);
		}
		let schema = generate_schema(&catalog, &self.ds)?;
		self.cache.replace(schema);
		self.catalog = catalog;
		info!(target: TARGET, "Schema '{}' changed, now serving {} relations", self.catalog.schema, self.catalog.tables.len());
		self.export().await;
		Ok(true)
	}

	/// Writes the current schema to the export path. Failures are logged only.
	pub async fn export(&self) {
		if let Err(e) = export_schema(&self.cache.get(), &self.watch.export_path).await {
			error!(target: TARGET, "Failed to export the schema to {}: {e}", self.watch.export_path.display());
		}
	}

	/// Exports the schema once and then keeps it in sync until `token` is cancelled.
	pub fn spawn(mut self, token: CancellationToken) -> JoinHandle<()> {
		tokio::spawn(async move {
			self.export().await;
			info!(target: TARGET, "Watching schema '{}' every {:?}", self.catalog.schema, self.watch.interval);
			let mut interval = tokio::time::interval(self.watch.interval);
			interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
			// The first tick completes immediately and the schema was just built
			interval.tick().await;
			loop {
				tokio::select! {
					_ = token.cancelled() => break,
					_ = interval.tick() => {
						if let Err(e) = self.refresh().await {
							warn!(target: TARGET, "Failed to refresh the schema: {e}");
						}
					}
				}
			}
			debug!(target: TARGET, "Stopped watching the schema");
		})
	}
}
