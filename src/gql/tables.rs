use std::collections::{HashMap, HashSet};
use std::fmt::Write;
use std::sync::Arc;

use async_graphql::Value as GqlValue;
use async_graphql::dynamic::{
	Enum, EnumItem, Field, FieldFuture, FieldValue, InputObject, InputValue, Object,
	ResolverContext, Type, TypeRef,
};
use serde_json::Value as JsonValue;
use sqlx::types::Json;

use super::catalog::{Catalog, ColumnDef, TableDef};
use super::error::{GqlError, resolver_error};
use super::inflect;
use crate::dbs::Datastore;

const TARGET: &str = "mediatum::gql::tables";

/// The root field re-exposing the query type.
pub const ROOT_QUERY_FIELD: &str = "query";

/// Types without a default b-tree ordering, which therefore cannot appear in `orderBy`.
const UNORDERABLE: [&str; 8] = ["json", "xml", "point", "line", "lseg", "box", "path", "polygon"];

/// Types whose values do not fit a JSON number, and are therefore returned as strings.
const PRECISE: [&str; 2] = ["int8", "numeric"];

/// Pairs per `jsonb_build_object` call, which takes at most 100 arguments.
const PAIRS_PER_OBJECT: usize = 50;

const NATURAL: &str = "NATURAL";

/// Maps a PostgreSQL type to the GraphQL scalar representing it.
pub fn scalar_for(type_name: &str) -> &'static str {
	match type_name {
		"int2" | "int4" => TypeRef::INT,
		"int8" => "BigInt",
		"float4" | "float8" => TypeRef::FLOAT,
		"numeric" => "BigFloat",
		"bool" => TypeRef::BOOLEAN,
		"uuid" => "UUID",
		"date" => "Date",
		"timestamp" | "timestamptz" => "Datetime",
		"time" | "timetz" => "Time",
		"json" | "jsonb" => "JSON",
		_ => TypeRef::STRING,
	}
}

pub fn quote_ident(ident: &str) -> String {
	format!("\"{}\"", ident.replace('"', "\"\""))
}

pub fn quote_literal(value: &str) -> String {
	format!("'{}'", value.replace('\'', "''"))
}

#[derive(Debug)]
struct Column {
	name: String,
	field: String,
	scalar: &'static str,
	sql_type: String,
	is_json: bool,
	is_array: bool,
	not_null: bool,
	orderable: bool,
	precise: bool,
	description: Option<String>,
}

impl Column {
	fn new(def: &ColumnDef) -> Self {
		Self {
			name: def.name.clone(),
			field: inflect::column_field(&def.name),
			scalar: scalar_for(&def.type_name),
			sql_type: def.sql_type.clone(),
			is_json: matches!(def.type_name.as_str(), "json" | "jsonb"),
			is_array: def.is_array,
			not_null: def.not_null,
			orderable: !UNORDERABLE.contains(&def.type_name.as_str()),
			precise: PRECISE.contains(&def.type_name.as_str()),
			description: def.comment.clone(),
		}
	}

	/// Compares the column with a `jsonb` parameter holding a GraphQL input value.
	fn equals(&self, column: &str, param: &str) -> String {
		if self.is_array {
			format!("{column} = array(select jsonb_array_elements_text({param}))::{}[]", self.sql_type)
		} else if self.is_json {
			format!("{column}::jsonb = {param}")
		} else {
			format!("{column} = ({param} #>> '{{}}')::{}", self.sql_type)
		}
	}

	fn output_type(&self) -> TypeRef {
		let base = if self.is_array {
			TypeRef::List(Box::new(TypeRef::named(self.scalar)))
		} else {
			TypeRef::named(self.scalar)
		};
		if self.not_null {
			TypeRef::NonNull(Box::new(base))
		} else {
			base
		}
	}

	fn input_type(&self) -> TypeRef {
		if self.is_array {
			TypeRef::named_list(self.scalar)
		} else {
			TypeRef::named(self.scalar)
		}
	}
}

/// The arguments of a connection field, resolved against the relation's columns.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct QueryArgs {
	pub first: Option<i64>,
	pub offset: Option<i64>,
	/// Column index and whether the ordering is ascending
	pub order: Vec<(usize, bool)>,
	/// Column index and the value it must equal, `None` meaning `IS NULL`
	pub condition: Vec<(usize, Option<JsonValue>)>,
}

/// One page of a connection.
#[derive(Debug, Default)]
pub struct Page {
	pub rows: Vec<GqlValue>,
	pub total: Option<i64>,
}

/// A relation exposed through the API, and the SQL it is queried with.
#[derive(Debug)]
pub struct Relation {
	schema: String,
	name: String,
	columns: Vec<Column>,
	order_values: HashMap<String, (usize, bool)>,
}

impl Relation {
	fn new(schema: &str, def: &TableDef) -> Self {
		let mut fields = HashSet::new();
		let mut columns: Vec<Column> = Vec::with_capacity(def.columns.len());
		for column in def.columns.iter().map(Column::new) {
			if !fields.insert(column.field.clone()) {
				warn!(target: TARGET, "Skipping column '{}' of '{}', its field name {} is already taken", column.name, def.name, column.field);
				continue;
			}
			columns.push(column);
		}
		let mut order_values: HashMap<String, (usize, bool)> = HashMap::new();
		for (i, c) in columns.iter().enumerate().filter(|(_, c)| c.orderable) {
			let asc = inflect::order_by_value(&c.name, true);
			let desc = inflect::order_by_value(&c.name, false);
			if [&asc, &desc].into_iter().any(|v| v == NATURAL || order_values.contains_key(v)) {
				warn!(target: TARGET, "Column '{}' of '{}' cannot be ordered by, {asc} is already taken", c.name, def.name);
				continue;
			}
			order_values.insert(asc, (i, true));
			order_values.insert(desc, (i, false));
		}
		Self {
			schema: schema.to_owned(),
			name: def.name.clone(),
			columns,
			order_values,
		}
	}

	fn qualified_name(&self) -> String {
		format!("{}.{}", quote_ident(&self.schema), quote_ident(&self.name))
	}

	fn column_ref(&self, idx: usize) -> String {
		format!("t.{}", quote_ident(&self.columns[idx].name))
	}

	/// The row as a JSON object, with the values of precise columns as strings.
	fn row_json(&self) -> String {
		let precise: Vec<String> = self
			.columns
			.iter()
			.enumerate()
			.filter(|(_, c)| c.precise)
			.map(|(i, c)| {
				let cast = if c.is_array { "text[]" } else { "text" };
				format!("{}, {}::{cast}", quote_literal(&c.name), self.column_ref(i))
			})
			.collect();
		let mut sql = "to_jsonb(t)".to_owned();
		for pairs in precise.chunks(PAIRS_PER_OBJECT) {
			let _ = write!(sql, " || jsonb_build_object({})", pairs.join(", "));
		}
		sql
	}

	fn where_clause(&self, args: &QueryArgs, params: &mut Vec<JsonValue>) -> String {
		let mut parts = Vec::with_capacity(args.condition.len());
		for (idx, value) in &args.condition {
			match value {
				None => parts.push(format!("{} is null", self.column_ref(*idx))),
				Some(value) => {
					params.push(value.clone());
					let param = format!("${}::jsonb", params.len());
					parts.push(self.columns[*idx].equals(&self.column_ref(*idx), &param));
				}
			}
		}
		if parts.is_empty() {
			String::new()
		} else {
			format!(" where {}", parts.join(" and "))
		}
	}

	/// Builds the query fetching one page of rows as JSON objects.
	pub fn select_sql(&self, args: &QueryArgs) -> (String, Vec<JsonValue>) {
		let mut params = Vec::new();
		let mut sql = format!("select {} from {} as t", self.row_json(), self.qualified_name());
		sql.push_str(&self.where_clause(args, &mut params));
		if !args.order.is_empty() {
			let order: Vec<String> = args
				.order
				.iter()
				.map(|(idx, asc)| {
					format!("{} {}", self.column_ref(*idx), if *asc { "asc" } else { "desc" })
				})
				.collect();
			let _ = write!(sql, " order by {}", order.join(", "));
		}
		if let Some(first) = args.first {
			let _ = write!(sql, " limit {first}");
		}
		if let Some(offset) = args.offset {
			let _ = write!(sql, " offset {offset}");
		}
		(sql, params)
	}

	/// Builds the query counting every row matching the condition.
	pub fn count_sql(&self, args: &QueryArgs) -> (String, Vec<JsonValue>) {
		let mut params = Vec::new();
		let mut sql = format!("select count(*) from {} as t", self.qualified_name());
		sql.push_str(&self.where_clause(args, &mut params));
		(sql, params)
	}

	/// Resolves the field arguments of a connection field.
	pub fn parse_args(&self, ctx: &ResolverContext<'_>) -> Result<QueryArgs, GqlError> {
		let mut args = QueryArgs::default();
		let present = |name: &str| ctx.args.get(name).filter(|v| !v.is_null());
		if let Some(first) = present("first") {
			let first = first.i64()?;
			if first < 0 {
				return Err(resolver_error("`first` must not be negative"));
			}
			args.first = Some(first);
		}
		if let Some(offset) = present("offset") {
			let offset = offset.i64()?;
			if offset < 0 {
				return Err(resolver_error("`offset` must not be negative"));
			}
			args.offset = Some(offset);
		}
		if let Some(order) = present("orderBy") {
			for item in order.list()?.iter() {
				let name = item.enum_name()?;
				if name == NATURAL {
					continue;
				}
				match self.order_values.get(name) {
					Some(o) => args.order.push(*o),
					None => return Err(resolver_error(format!("unknown ordering {name}"))),
				}
			}
		}
		if let Some(condition) = present("condition") {
			let condition = condition.object()?;
			for (idx, column) in self.columns.iter().enumerate() {
				let Some(value) = condition.get(&column.field) else {
					continue;
				};
				if value.is_null() {
					args.condition.push((idx, None));
				} else {
					let json = value.as_value().clone().into_json().map_err(|e| {
						resolver_error(format!("invalid value for {}: {e}", column.field))
					})?;
					args.condition.push((idx, Some(json)));
				}
			}
		}
		Ok(args)
	}

	/// Fetches the requested parts of a page in a single transaction.
	pub async fn fetch(
		&self,
		ds: &Datastore,
		args: &QueryArgs,
		nodes: bool,
		total: bool,
	) -> Result<Page, GqlError> {
		let mut tx = ds.transaction().await?;
		let mut page = Page::default();
		if nodes {
			let (sql, params) = self.select_sql(args);
			trace!(target: TARGET, "{sql}");
			let mut query = sqlx::query_scalar::<_, Json<JsonValue>>(&sql);
			for param in params {
				query = query.bind(Json(param));
			}
			for Json(row) in query.fetch_all(&mut *tx).await? {
				let row = GqlValue::from_json(row)
					.map_err(|e| resolver_error(format!("unreadable row in {}: {e}", self.name)))?;
				page.rows.push(row);
			}
		}
		if total {
			let (sql, params) = self.count_sql(args);
			trace!(target: TARGET, "{sql}");
			let mut query = sqlx::query_scalar::<_, i64>(&sql);
			for param in params {
				query = query.bind(Json(param));
			}
			page.total = Some(query.fetch_one(&mut *tx).await?);
		}
		tx.commit().await?;
		Ok(page)
	}
}

fn column_field(column: &Column) -> Field {
	let name = column.name.clone();
	let mut field = Field::new(&column.field, column.output_type(), move |ctx| {
		let name = name.clone();
		FieldFuture::new(async move {
			let value = match ctx.parent_value.as_value() {
				Some(GqlValue::Object(row)) => row.get(name.as_str()).cloned(),
				_ => None,
			};
			Ok(value.map(FieldValue::value))
		})
	});
	if let Some(description) = &column.description {
		field = field.description(description);
	}
	field
}

fn connection_object(def: &TableDef, type_name: &str) -> Object {
	Object::new(inflect::connection_type(&def.name))
		.description(format!("A connection to a list of `{type_name}` values."))
		.field(
			Field::new("nodes", TypeRef::named_nn_list_nn(type_name), |ctx| {
				FieldFuture::new(async move {
					let page = ctx.parent_value.try_downcast_ref::<Page>()?;
					Ok(Some(FieldValue::list(page.rows.iter().cloned().map(FieldValue::value))))
				})
			})
			.description(format!("A list of `{type_name}` objects.")),
		)
		.field(
			Field::new("totalCount", TypeRef::named_nn(TypeRef::INT), |ctx| {
				FieldFuture::new(async move {
					let page = ctx.parent_value.try_downcast_ref::<Page>()?;
					Ok(page.total.map(|t| FieldValue::value(GqlValue::from(t))))
				})
			})
			.description("The count of *all* rows matching the condition, ignoring pagination."),
		)
}

fn condition_input(def: &TableDef, relation: &Relation, type_name: &str) -> InputObject {
	let mut input = InputObject::new(inflect::condition_type(&def.name)).description(format!(
		"A condition to be used against `{type_name}` object types. All fields are tested for equality and combined with a logical ‘and.’"
	));
	for column in &relation.columns {
		input = input.field(
			InputValue::new(&column.field, column.input_type())
				.description(format!("Checks for equality with the object’s `{}` field.", column.field)),
		);
	}
	input
}

fn order_by_enum(def: &TableDef, relation: &Relation, type_name: &str) -> Enum {
	let mut items = vec![EnumItem::new(NATURAL)];
	for (i, column) in relation.columns.iter().enumerate() {
		for asc in [true, false] {
			let value = inflect::order_by_value(&column.name, asc);
			if relation.order_values.get(&value) == Some(&(i, asc)) {
				items.push(EnumItem::new(value));
			}
		}
	}
	Enum::new(inflect::order_by_type(&def.name))
		.description(format!("Methods to use when ordering `{type_name}`."))
		.items(items)
}

/// Adds one connection field per relation to the root query, and registers the
/// object, connection, condition and ordering types it needs.
///
/// `names` holds the type names already in use. A relation needing a type or
/// root field name which is taken is skipped.
pub fn process_tables(
	catalog: &Catalog,
	mut query: Object,
	types: &mut Vec<Type>,
	names: &mut HashSet<String>,
	ds: &Datastore,
) -> Result<Object, GqlError> {
	let mut fields = HashSet::from([ROOT_QUERY_FIELD.to_owned()]);
	for def in &catalog.tables {
		let type_name = inflect::type_name(&def.name);
		let all_rows = inflect::all_rows_field(&def.name);
		let generated = [
			type_name.clone(),
			inflect::connection_type(&def.name),
			inflect::condition_type(&def.name),
			inflect::order_by_type(&def.name),
		];
		let taken = generated
			.iter()
			.find(|name| names.contains(*name))
			.or_else(|| fields.contains(&all_rows).then_some(&all_rows));
		if let Some(taken) = taken {
			warn!(target: TARGET, "Skipping {} '{}', the name {taken} is already taken", def.kind.describe(), def.name);
			continue;
		}
		names.extend(generated);
		fields.insert(all_rows.clone());
		trace!(target: TARGET, "Adding {} '{}' as {type_name}", def.kind.describe(), def.name);
		let relation = Arc::new(Relation::new(&catalog.schema, def));

		let mut node = Object::new(&type_name);
		if let Some(comment) = &def.comment {
			node = node.description(comment);
		}
		for column in &relation.columns {
			node = node.field(column_field(column));
		}
		types.push(Type::Object(node));
		types.push(Type::Object(connection_object(def, &type_name)));
		types.push(Type::InputObject(condition_input(def, &relation, &type_name)));
		types.push(Type::Enum(order_by_enum(def, &relation, &type_name)));

		let ds = ds.clone();
		let rel = relation.clone();
		let field = Field::new(
			all_rows,
			TypeRef::named(inflect::connection_type(&def.name)),
			move |ctx| {
				let ds = ds.clone();
				let rel = rel.clone();
				FieldFuture::new(async move {
					let args = rel.parse_args(&ctx).map_err(GqlError::into_field_error)?;
					let look_ahead = ctx.look_ahead();
					let nodes = look_ahead.field("nodes").exists();
					let total = look_ahead.field("totalCount").exists();
					let page = rel
						.fetch(&ds, &args, nodes, total)
						.await
						.map_err(GqlError::into_field_error)?;
					Ok(Some(FieldValue::owned_any(page)))
				})
			},
		)
		.description(format!("Reads and enables pagination through a set of `{type_name}`."))
		.argument(
			InputValue::new("first", TypeRef::named(TypeRef::INT))
				.description("Only read the first `n` values of the set."),
		)
		.argument(
			InputValue::new("offset", TypeRef::named(TypeRef::INT))
				.description("Skip the first `n` values."),
		)
		.argument(
			InputValue::new("orderBy", TypeRef::named_nn_list(inflect::order_by_type(&def.name)))
				.description(format!("The method to use when ordering `{type_name}`.")),
		)
		.argument(
			InputValue::new("condition", TypeRef::named(inflect::condition_type(&def.name)))
				.description("A condition to be used in determining which values should be returned by the collection."),
		);
		query = query.field(field);
	}
	Ok(query)
}
