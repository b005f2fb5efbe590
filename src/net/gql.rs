use async_graphql::http::GraphiQLSource;
use axum::Router;
use axum::response::{Html, IntoResponse};
use axum::routing::{get, post_service};

use crate::cnf::SERVER_TITLE;
use crate::gql::{GraphQL, SchemaCache};
use crate::tier::Features;

pub(super) fn router<S>(cache: SchemaCache, features: &Features) -> Router<S>
where
	S: Clone + Send + Sync + 'static,
{
	let service = GraphQL::new(cache, features.errors);
	if features.graphiql {
		Router::new()
			.route("/graphql", get(graphiql).post_service(service))
			.route("/graphiql", get(graphiql))
	} else {
		Router::new().route("/graphql", post_service(service))
	}
}

pub async fn graphiql() -> impl IntoResponse {
	Html(GraphiQLSource::build().endpoint("/graphql").title(SERVER_TITLE).finish())
}
