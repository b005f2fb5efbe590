use std::sync::Arc;

use async_graphql::extensions::{
	Extension, ExtensionContext, ExtensionFactory, NextResolve, ResolveInfo,
};
use async_graphql::{PathSegment, QueryPathNode, QueryPathSegment, ServerResult, Value};

/// Fills in the path of errors raised by field resolvers.
///
/// Resolvers of a dynamic schema report their errors with a location only,
/// so the field they failed on is recorded here before the error leaves the
/// field.
pub struct ErrorPath;

impl ExtensionFactory for ErrorPath {
	fn create(&self) -> Arc<dyn Extension> {
		Arc::new(ErrorPathExtension)
	}
}

struct ErrorPathExtension;

#[async_trait::async_trait]
impl Extension for ErrorPathExtension {
	async fn resolve(
		&self,
		ctx: &ExtensionContext<'_>,
		info: ResolveInfo<'_>,
		next: NextResolve<'_>,
	) -> ServerResult<Option<Value>> {
		let node = info.path_node;
		next.run(ctx, info).await.map_err(|mut err| {
			// The innermost field sees the error first
			if err.path.is_empty() {
				err.path = segments(node);
			}
			err
		})
	}
}

fn segments(node: &QueryPathNode<'_>) -> Vec<PathSegment> {
	let mut path: Vec<_> = std::iter::once(node)
		.chain(node.parents())
		.map(|node| match node.segment {
			QueryPathSegment::Name(name) => PathSegment::Field(name.to_owned()),
			QueryPathSegment::Index(idx) => PathSegment::Index(idx),
		})
		.collect();
	path.reverse();
	path
}
