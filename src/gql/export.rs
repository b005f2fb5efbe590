use std::path::Path;

use async_graphql::dynamic::Schema;
use tokio::fs;

use super::error::GqlError;

const TARGET: &str = "mediatum::gql::export";

/// Writes the SDL of `schema` to `path`, creating missing parent directories.
/// Returns whether the file changed.
pub async fn export_schema(schema: &Schema, path: &Path) -> Result<bool, GqlError> {
	let sdl = schema.sdl();
	if let Ok(existing) = fs::read_to_string(path).await {
		if existing == sdl {
			trace!(target: TARGET, "Schema export at {} is up to date", path.display());
			return Ok(false);
		}
	}
	if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
		fs::create_dir_all(parent).await?;
	}
	fs::write(path, sdl).await?;
	info!(target: TARGET, "Exported the GraphQL schema to {}", path.display());
	Ok(true)
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::dbs::Datastore;
	use crate::gql::catalog::Catalog;
	use crate::gql::catalog::tests::row;
	use crate::gql::schema::generate_schema;

	#[tokio::test]
	async fn writes_sdl_once() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("export").join("schema-export.graphql");
		let ds = Datastore::lazy("postgres://postgres@127.0.0.1:1/none", "view_api").unwrap();
		let catalog = Catalog::from_rows("api", vec![row("nodes", "id", "int4")]).unwrap();
		let schema = generate_schema(&catalog, &ds).unwrap();

		assert!(export_schema(&schema, &path).await.unwrap());
		let written = std::fs::read_to_string(&path).unwrap();
		assert_eq!(written, schema.sdl());
		assert!(written.contains("allNodes"));

		assert!(!export_schema(&schema, &path).await.unwrap());
	}
}
