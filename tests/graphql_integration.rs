// MEDIATUM_TEST_DATABASE_URL=postgres://postgres@localhost/mediatum cargo test --test graphql_integration
mod graphql_integration {
	use async_graphql::dynamic::Schema;
	use mediatum_api::cnf::GENERIC_ERROR_MESSAGE;
	use mediatum_api::dbs::Datastore;
	use mediatum_api::gql::{Catalog, SchemaCache, Watcher, generate_schema};
	use mediatum_api::tier::{ErrorPolicy, Watch};
	use serde_json::{Value, json};
	use serial_test::serial;
	use sqlx::postgres::PgPoolOptions;
	use test_log::test;

	/// A throwaway schema, dropped when the fixture is.
	struct Fixture {
		ds: Datastore,
		schema: String,
	}

	impl Fixture {
		async fn new() -> Option<Self> {
			let Ok(url) = std::env::var("MEDIATUM_TEST_DATABASE_URL") else {
				eprintln!("MEDIATUM_TEST_DATABASE_URL is not set, skipping");
				return None;
			};
			let pool = PgPoolOptions::new().max_connections(2).connect(&url).await.unwrap();
			let role: String = sqlx::query_scalar("select current_user::text").fetch_one(&pool).await.unwrap();
			let schema = format!("api_it_{}", uuid::Uuid::new_v4().simple());
			let ds = Datastore::from_pool(pool, role);
			let fixture = Self {
				ds,
				schema,
			};
			fixture
				.exec(&[
					"create schema {s}",
					"create table {s}.nodes (id int4 primary key, name text, secret text, attrs jsonb)",
					"comment on column {s}.nodes.secret is '@omit'",
					"comment on table {s}.nodes is 'Every node of the tree'",
					"insert into {s}.nodes values (1, 'root', 'x', '{\"a\": 1}'), (2, 'collection', 'y', null), (3, 'document', 'z', null)",
					"create table {s}.internal (id int4)",
					"comment on table {s}.internal is E'@omit\nNot for clients'",
					"create view {s}.broken as select 1 / (id - id) as ratio from {s}.nodes",
				])
				.await;
			Some(fixture)
		}

		async fn exec(&self, statements: &[&str]) {
			for statement in statements {
				let sql = statement.replace("{s}", &self.schema);
				sqlx::query(&sql).execute(self.ds.pool()).await.unwrap();
			}
		}

		async fn schema(&self) -> (Catalog, Schema) {
			let catalog = Catalog::read(&self.ds, &self.schema).await.unwrap();
			let schema = generate_schema(&catalog, &self.ds).unwrap();
			(catalog, schema)
		}

		async fn drop(self) {
			self.exec(&["drop schema {s} cascade"]).await;
			self.ds.close().await;
		}
	}

	async fn execute(schema: &Schema, query: &str) -> Value {
		let res = schema.execute(query).await;
		serde_json::to_value(&res).unwrap()
	}

	#[test(tokio::test)]
	#[serial]
	async fn reflects_selectable_relations() {
		let Some(fixture) = Fixture::new().await else {
			return;
		};
		let (catalog, schema) = fixture.schema().await;
		let names: Vec<_> = catalog.tables.iter().map(|t| t.name.as_str()).collect();
		assert_eq!(names, ["broken", "nodes"]);

		let sdl = schema.sdl();
		assert!(sdl.contains("allNodes"), "{sdl}");
		assert!(sdl.contains("Every node of the tree"), "{sdl}");
		assert!(!sdl.contains("secret"), "{sdl}");
		assert!(!sdl.contains("internal"), "{sdl}");
		fixture.drop().await;
	}

	#[test(tokio::test)]
	#[serial]
	async fn pages_orders_and_filters_rows() {
		let Some(fixture) = Fixture::new().await else {
			return;
		};
		let (_, schema) = fixture.schema().await;

		let body = execute(&schema, "{ allNodes(orderBy: [ID_DESC], first: 2) { totalCount nodes { id name } } }").await;
		assert_eq!(
			body["data"],
			json!({ "allNodes": { "totalCount": 3, "nodes": [
				{ "id": 3, "name": "document" },
				{ "id": 2, "name": "collection" },
			] } })
		);

		let body = execute(&schema, "{ allNodes(orderBy: [ID_ASC], offset: 1, first: 1) { nodes { name } } }").await;
		assert_eq!(body["data"]["allNodes"]["nodes"], json!([{ "name": "collection" }]));

		let body = execute(&schema, r#"{ allNodes(condition: { name: "root" }) { totalCount nodes { id attrs } } }"#).await;
		assert_eq!(
			body["data"]["allNodes"],
			json!({ "totalCount": 1, "nodes": [{ "id": 1, "attrs": { "a": 1 } }] })
		);

		let body = execute(&schema, "{ allNodes(condition: { attrs: null }) { totalCount } }").await;
		assert_eq!(body["data"]["allNodes"]["totalCount"], 2);
		fixture.drop().await;
	}

	#[test(tokio::test)]
	#[serial]
	async fn precise_and_temporal_values_survive_the_round_trip() {
		let Some(fixture) = Fixture::new().await else {
			return;
		};
		fixture
			.exec(&[
				"create table {s}.measurements (id int8, amount numeric, at timestamptz, tags text[])",
				"insert into {s}.measurements values \
					(9007199254740993, 12345678901234567890.123456789, '2020-01-01 00:00+00', '{a,b}'), \
					(2, 0.1, '2021-06-01 12:00+02', null)",
			])
			.await;
		let (_, schema) = fixture.schema().await;

		let body = execute(
			&schema,
			r#"{ allMeasurements(condition: { at: "2020-01-01T00:00:00Z" }) { nodes { id amount tags } } }"#,
		)
		.await;
		assert_eq!(
			body["data"]["allMeasurements"]["nodes"],
			json!([{ "id": "9007199254740993", "amount": "12345678901234567890.123456789", "tags": ["a", "b"] }])
		);

		for query in [
			r#"{ allMeasurements(condition: { id: "9007199254740993" }) { totalCount } }"#,
			r#"{ allMeasurements(condition: { id: 9007199254740993 }) { totalCount } }"#,
			r#"{ allMeasurements(condition: { amount: "12345678901234567890.123456789" }) { totalCount } }"#,
			r#"{ allMeasurements(condition: { at: "2021-06-01T10:00:00Z" }) { totalCount } }"#,
			r#"{ allMeasurements(condition: { tags: ["a", "b"] }) { totalCount } }"#,
		] {
			let body = execute(&schema, query).await;
			assert_eq!(body["data"]["allMeasurements"]["totalCount"], 1, "{query}: {body}");
		}
		fixture.drop().await;
	}

	#[test(tokio::test)]
	#[serial]
	async fn database_errors_carry_detail_until_redacted() {
		let Some(fixture) = Fixture::new().await else {
			return;
		};
		let (_, schema) = fixture.schema().await;

		let res = schema.execute("{ allBrokens { nodes { ratio } } }").await;
		assert_eq!(res.errors.len(), 1, "{:?}", res.errors);
		let detailed = serde_json::to_value(ErrorPolicy::Detailed.apply(res)).unwrap();
		assert!(detailed["errors"][0]["message"].as_str().unwrap().contains("division by zero"));
		assert_eq!(detailed["errors"][0]["extensions"]["errcode"], "22012");

		let res = schema.execute("{ allBrokens { nodes { ratio } } }").await;
		let redacted = serde_json::to_value(ErrorPolicy::Redacted.apply(res)).unwrap();
		assert_eq!(redacted["errors"], json!([{ "message": GENERIC_ERROR_MESSAGE }]));
		fixture.drop().await;
	}

	#[test(tokio::test)]
	#[serial]
	async fn watcher_picks_up_new_relations() {
		let Some(fixture) = Fixture::new().await else {
			return;
		};
		let (catalog, schema) = fixture.schema().await;
		let cache = SchemaCache::new(schema);
		let dir = tempfile::tempdir().unwrap();
		let watch = Watch {
			interval: std::time::Duration::from_secs(3600),
			export_path: dir.path().join("schema.graphql"),
		};
		let mut watcher = Watcher::new(fixture.ds.clone(), cache.clone(), catalog, watch);
		assert!(!watcher.refresh().await.unwrap());

		fixture.exec(&["create table {s}.files (id int4, mimetype text)"]).await;
		assert!(watcher.refresh().await.unwrap());
		assert!(cache.get().sdl().contains("allFiles"));
		let exported = std::fs::read_to_string(dir.path().join("schema.graphql")).unwrap();
		assert!(exported.contains("allFiles"));
		fixture.drop().await;
	}
}
