use std::convert::Infallible;
use std::task::{Context, Poll};

use async_graphql::Executor;
use async_graphql_axum::rejection::GraphQLRejection;
use async_graphql_axum::{GraphQLBatchRequest, GraphQLResponse};
use axum::BoxError;
use axum::body::{Body, HttpBody};
use axum::extract::FromRequest;
use axum::http::{Request as HttpRequest, Response as HttpResponse};
use axum::response::IntoResponse;
use bytes::Bytes;
use futures_util::future::BoxFuture;
use tower_service::Service;

use super::cache::SchemaCache;
use crate::tier::ErrorPolicy;

/// A GraphQL service executing requests against the currently cached schema.
#[derive(Clone)]
pub struct GraphQL {
	cache: SchemaCache,
	errors: ErrorPolicy,
}

impl GraphQL {
	/// Create a GraphQL handler.
	pub fn new(cache: SchemaCache, errors: ErrorPolicy) -> Self {
		Self {
			cache,
			errors,
		}
	}
}

impl<B> Service<HttpRequest<B>> for GraphQL
where
	B: HttpBody<Data = Bytes> + Send + 'static,
	B::Data: Into<Bytes>,
	B::Error: Into<BoxError>,
{
	type Response = HttpResponse<Body>;
	type Error = Infallible;
	type Future = BoxFuture<'static, Result<Self::Response, Self::Error>>;

	fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
		Poll::Ready(Ok(()))
	}

	fn call(&mut self, req: HttpRequest<B>) -> Self::Future {
		let schema = self.cache.get();
		let errors = self.errors;
		let req = req.map(Body::new);
		Box::pin(async move {
			let req = match GraphQLBatchRequest::<GraphQLRejection>::from_request(req, &()).await {
				Ok(req) => req,
				Err(err) => return Ok(err.into_response()),
			};
			let res = errors.apply_batch(Executor::execute_batch(&schema, req.into_inner()).await);
			Ok(GraphQLResponse::from(res).into_response())
		})
	}
}
