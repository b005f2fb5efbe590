//! The view of the exposed PostgreSQL schema the GraphQL schema is generated from.

use sqlx::Row;
use sqlx::postgres::PgRow;

use super::error::{GqlError, schema_error};
use crate::dbs::Datastore;

const TARGET: &str = "mediatum::gql::catalog";

/// Reads every selectable relation of a schema with its columns. Only relations the
/// API role may select from are returned, so the schema never advertises fields the
/// role would be refused.
const CATALOG_QUERY: &str = r#"
select c.relname::text as table_name,
       c.relkind::text as kind,
       obj_description(c.oid, 'pg_class') as table_comment,
       a.attname::text as column_name,
       coalesce(et.typname, t.typname)::text as type_name,
       format_type(coalesce(et.oid, t.oid), null) as sql_type,
       (t.typcategory = 'A') as is_array,
       a.attnotnull as not_null,
       col_description(c.oid, a.attnum) as column_comment
  from pg_catalog.pg_class c
  join pg_catalog.pg_namespace n on n.oid = c.relnamespace
  join pg_catalog.pg_attribute a on a.attrelid = c.oid and a.attnum > 0 and not a.attisdropped
  join pg_catalog.pg_type t on t.oid = a.atttypid
  left join pg_catalog.pg_type et on et.oid = t.typelem and t.typcategory = 'A'
 where n.nspname = $1
   and c.relkind in ('r', 'v', 'm', 'f', 'p')
   and has_table_privilege($2, c.oid, 'SELECT')
 order by c.relname, a.attnum
"#;

/// The smart tag hiding a relation or column from the API.
const OMIT_TAG: &str = "@omit";

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum RelationKind {
	Table,
	View,
	MaterializedView,
	ForeignTable,
	PartitionedTable,
}

impl RelationKind {
	fn from_relkind(kind: &str) -> Option<Self> {
		match kind {
			"r" => Some(Self::Table),
			"v" => Some(Self::View),
			"m" => Some(Self::MaterializedView),
			"f" => Some(Self::ForeignTable),
			"p" => Some(Self::PartitionedTable),
			_ => None,
		}
	}

	pub fn describe(&self) -> &'static str {
		match self {
			Self::Table => "table",
			Self::View => "view",
			Self::MaterializedView => "materialized view",
			Self::ForeignTable => "foreign table",
			Self::PartitionedTable => "partitioned table",
		}
	}
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ColumnDef {
	pub name: String,
	/// The type name, or the element type name for array columns
	pub type_name: String,
	/// The type as written in SQL, qualified when it is not on the search path
	pub sql_type: String,
	pub is_array: bool,
	pub not_null: bool,
	pub comment: Option<String>,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct TableDef {
	pub name: String,
	pub kind: RelationKind,
	pub comment: Option<String>,
	pub columns: Vec<ColumnDef>,
}

/// One row of the catalog query.
#[derive(Clone, Debug)]
pub struct CatalogRow {
	pub table_name: String,
	pub kind: String,
	pub table_comment: Option<String>,
	pub column_name: String,
	pub type_name: String,
	pub sql_type: String,
	pub is_array: bool,
	pub not_null: bool,
	pub column_comment: Option<String>,
}

impl CatalogRow {
	fn from_row(row: &PgRow) -> Result<Self, sqlx::Error> {
		Ok(Self {
			table_name: row.try_get("table_name")?,
			kind: row.try_get("kind")?,
			table_comment: row.try_get("table_comment")?,
			column_name: row.try_get("column_name")?,
			type_name: row.try_get("type_name")?,
			sql_type: row.try_get("sql_type")?,
			is_array: row.try_get("is_array")?,
			not_null: row.try_get("not_null")?,
			column_comment: row.try_get("column_comment")?,
		})
	}
}

/// Everything the API exposes from one PostgreSQL schema. Two catalogs are equal
/// exactly when they produce the same GraphQL schema.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Catalog {
	pub schema: String,
	pub tables: Vec<TableDef>,
}

/// Splits a comment into its smart tags and its description.
fn parse_comment(comment: Option<&str>) -> (bool, Option<String>) {
	let Some(comment) = comment else {
		return (false, None);
	};
	let mut omit = false;
	let mut lines = Vec::new();
	for line in comment.lines() {
		let trimmed = line.trim();
		if trimmed.starts_with('@') {
			omit |= trimmed.split_whitespace().next() == Some(OMIT_TAG);
		} else {
			lines.push(line);
		}
	}
	let description = lines.join("\n").trim().to_owned();
	(omit, (!description.is_empty()).then_some(description))
}

impl Catalog {
	/// Reads the catalog of `schema` as seen by `ds.role()`.
	pub async fn read(ds: &Datastore, schema: &str) -> Result<Self, GqlError> {
		let rows = sqlx::query(CATALOG_QUERY)
			.bind(schema)
			.bind(ds.role())
			.fetch_all(ds.pool())
			.await?;
		let rows = rows.iter().map(CatalogRow::from_row).collect::<Result<Vec<_>, _>>()?;
		trace!(target: TARGET, "Read {} catalog rows from schema '{schema}'", rows.len());
		Self::from_rows(schema, rows)
	}

	/// Groups catalog rows, which arrive ordered by relation, into relations.
	pub fn from_rows(
		schema: &str,
		rows: impl IntoIterator<Item = CatalogRow>,
	) -> Result<Self, GqlError> {
		let mut tables: Vec<TableDef> = Vec::new();
		let mut omitted: Option<String> = None;
		for row in rows {
			if omitted.as_deref() == Some(row.table_name.as_str()) {
				continue;
			}
			if tables.last().is_none_or(|t| t.name != row.table_name) {
				let (omit, comment) = parse_comment(row.table_comment.as_deref());
				if omit {
					debug!(target: TARGET, "Omitting relation '{}'", row.table_name);
					omitted = Some(row.table_name);
					continue;
				}
				let kind = RelationKind::from_relkind(&row.kind).ok_or_else(|| {
					schema_error(format!(
						"relation '{}' has unsupported kind '{}'",
						row.table_name, row.kind
					))
				})?;
				tables.push(TableDef {
					name: row.table_name.clone(),
					kind,
					comment,
					columns: Vec::new(),
				});
			}
			let (omit, comment) = parse_comment(row.column_comment.as_deref());
			if omit {
				continue;
			}
			if let Some(table) = tables.last_mut() {
				table.columns.push(ColumnDef {
					name: row.column_name,
					type_name: row.type_name,
					sql_type: row.sql_type,
					is_array: row.is_array,
					not_null: row.not_null,
					comment,
				});
			}
		}
		// A relation whose columns are all omitted has nothing to offer
		tables.retain(|t| !t.columns.is_empty());
		Ok(Self {
			schema: schema.to_owned(),
			tables,
		})
	}

	pub fn is_empty(&self) -> bool {
		self.tables.is_empty()
	}
}

#[cfg(test)]
pub(crate) mod tests {
	use super::*;

	pub(crate) fn row(table: &str, column: &str, ty: &str) -> CatalogRow {
		CatalogRow {
			table_name: table.into(),
			kind: "r".into(),
			table_comment: None,
			column_name: column.into(),
			type_name: ty.into(),
			sql_type: ty.into(),
			is_array: false,
			not_null: false,
			column_comment: None,
		}
	}

	#[test]
	fn groups_rows_by_relation() {
		let rows = vec![
			row("node", "id", "int4"),
			row("node", "name", "text"),
			CatalogRow {
				kind: "v".into(),
				..row("node_attributes", "key", "text")
			},
		];
		let catalog = Catalog::from_rows("api", rows).unwrap();
		assert_eq!(catalog.schema, "api");
		assert_eq!(catalog.tables.len(), 2);
		assert_eq!(catalog.tables[0].name, "node");
		assert_eq!(catalog.tables[0].columns.len(), 2);
		assert_eq!(catalog.tables[1].kind, RelationKind::View);
	}

	#[test]
	fn honours_omit_smart_tags() {
		let rows = vec![
			CatalogRow {
				table_comment: Some("@omit\nInternal bookkeeping".into()),
				..row("audit", "id", "int4")
			},
			CatalogRow {
				table_comment: Some("@omit\nInternal bookkeeping".into()),
				..row("audit", "who", "text")
			},
			row("node", "id", "int4"),
			CatalogRow {
				column_comment: Some("@omit".into()),
				..row("node", "secret", "text")
			},
		];
		let catalog = Catalog::from_rows("api", rows).unwrap();
		assert_eq!(catalog.tables.len(), 1);
		assert_eq!(catalog.tables[0].name, "node");
		let columns: Vec<_> = catalog.tables[0].columns.iter().map(|c| c.name.as_str()).collect();
		assert_eq!(columns, ["id"]);
	}

	#[test]
	fn comments_become_descriptions() {
		let (omit, description) = parse_comment(Some("@name foo\nA mediaTUM node"));
		assert!(!omit);
		assert_eq!(description.as_deref(), Some("A mediaTUM node"));
		assert_eq!(parse_comment(Some("@omit")), (true, None));
		assert_eq!(parse_comment(None), (false, None));
	}

	#[test]
	fn rejects_unknown_relation_kinds() {
		let rows = vec![CatalogRow {
			kind: "S".into(),
			..row("seq", "last_value", "int8")
		}];
		assert!(matches!(Catalog::from_rows("api", rows), Err(GqlError::SchemaError(_))));
	}

	#[test]
	fn equal_rows_give_equal_catalogs() {
		let a = Catalog::from_rows("api", vec![row("node", "id", "int4")]).unwrap();
		let b = Catalog::from_rows("api", vec![row("node", "id", "int4")]).unwrap();
		let c = Catalog::from_rows("api", vec![row("node", "id", "int8")]).unwrap();
		assert_eq!(a, b);
		assert_ne!(a, c);
	}
}
