use std::collections::HashSet;

use async_graphql::dynamic::{Field, FieldFuture, FieldValue, Object, Scalar, Schema, TypeRef};

use super::catalog::Catalog;
use super::error::{GqlError, schema_error};
use super::path::ErrorPath;
use super::tables::{ROOT_QUERY_FIELD, process_tables};
use crate::dbs::Datastore;

const TARGET: &str = "mediatum::gql::schema";

/// Custom scalars which PostgreSQL columns can be mapped onto.
const SCALARS: [(&str, &str); 7] = [
	("BigInt", "A signed eight-byte integer."),
	("BigFloat", "A floating point number that requires more precision than IEEE 754 binary 64"),
	("UUID", "A universally unique identifier as defined by [RFC 4122](https://tools.ietf.org/html/rfc4122)."),
	("Date", "The day, does not include a time."),
	("Datetime", "A point in time as described by the [ISO 8601](https://en.wikipedia.org/wiki/ISO_8601) standard. May or may not include a timezone."),
	("Time", "The exact time of day, does not include the date. May or may not have a timezone offset."),
	("JSON", "A JavaScript object encoded in the JSON format as specified by [ECMA-404](http://www.ecma-international.org/publications/files/ECMA-ST/ECMA-404.pdf)."),
];

/// Scalars every GraphQL schema has.
const BUILTIN_SCALARS: [&str; 5] =
	[TypeRef::INT, TypeRef::FLOAT, TypeRef::STRING, TypeRef::BOOLEAN, TypeRef::ID];

/// Generates the GraphQL schema serving the relations of a catalog.
pub fn generate_schema(catalog: &Catalog, ds: &Datastore) -> Result<Schema, GqlError> {
	if catalog.is_empty() {
		warn!(target: TARGET, "No selectable relations found in schema '{}'", catalog.schema);
	}

	// The query field re-exposes the root type, so Query is never empty
	let mut query = Object::new("Query")
		.description("The root query type which gives access points into the data universe.")
		.field(
			Field::new(ROOT_QUERY_FIELD, TypeRef::named_nn("Query"), |_| {
				FieldFuture::new(async { Ok(Some(FieldValue::owned_any(()))) })
			})
			.description("Exposes the root query type nested one level down."),
		);
	let mut types = Vec::new();
	let mut names: HashSet<String> = BUILTIN_SCALARS
		.into_iter()
		.chain(SCALARS.map(|(name, _)| name))
		.chain(["Query"])
		.map(str::to_owned)
		.collect();

	query = process_tables(catalog, query, &mut types, &mut names, ds)?;

	let mut schema = Schema::build("Query", None, None).extension(ErrorPath).register(query);
	for ty in types {
		schema = schema.register(ty);
	}
	for (name, description) in SCALARS {
		schema = schema.register(Scalar::new(name).description(description));
	}

	debug!(target: TARGET, "Generated a schema for {} relations of '{}'", catalog.tables.len(), catalog.schema);

	schema.finish().map_err(|e| schema_error(format!("there was an error generating schema: {e:?}")))
}
