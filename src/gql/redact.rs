use async_graphql::{BatchResponse, PathSegment, Response, ServerError};

use crate::cnf::GENERIC_ERROR_MESSAGE;
use crate::tier::ErrorPolicy;

const TARGET: &str = "mediatum::gql";

fn format_path(path: &[PathSegment]) -> String {
	path.iter()
		.map(|segment| match segment {
			PathSegment::Field(name) => name.clone(),
			PathSegment::Index(idx) => idx.to_string(),
		})
		.collect::<Vec<_>>()
		.join(".")
}

/// Logs every error with the field path it originated from, and replaces
/// them all by one generic error carrying no location, path or extension.
pub fn redact_errors(errors: Vec<ServerError>) -> Vec<ServerError> {
	if errors.is_empty() {
		return errors;
	}
	for err in &errors {
		error!(target: TARGET, path = %format_path(&err.path), "{}", err.message);
	}
	vec![ServerError::new(GENERIC_ERROR_MESSAGE, None)]
}

impl ErrorPolicy {
	pub fn apply(&self, mut response: Response) -> Response {
		if *self == ErrorPolicy::Redacted {
			response.errors = redact_errors(std::mem::take(&mut response.errors));
		}
		response
	}

	pub fn apply_batch(&self, response: BatchResponse) -> BatchResponse {
		match response {
			BatchResponse::Single(res) => BatchResponse::Single(self.apply(res)),
			BatchResponse::Batch(all) => {
				BatchResponse::Batch(all.into_iter().map(|res| self.apply(res)).collect())
			}
		}
	}
}

#[cfg(test)]
mod tests {
	use std::io;
	use std::sync::Arc;

	use async_graphql::{ErrorExtensionValues, Pos};
	use parking_lot::Mutex;
	use test_log::test;

	use super::*;
	use crate::dbs::Datastore;
	use crate::gql::catalog::Catalog;
	use crate::gql::catalog::tests::row;
	use crate::gql::schema::generate_schema;

	/// A log writer keeping everything written to it.
	#[derive(Clone, Default)]
	struct Captured(Arc<Mutex<Vec<u8>>>);

	impl io::Write for Captured {
		fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
			self.0.lock().extend_from_slice(buf);
			Ok(buf.len())
		}

		fn flush(&mut self) -> io::Result<()> {
			Ok(())
		}
	}

	impl Captured {
		fn text(&self) -> String {
			String::from_utf8_lossy(&self.0.lock()).into_owned()
		}
	}

	fn internal_error() -> ServerError {
		let mut err = ServerError::new(
			"permission denied for table node_secret",
			Some(Pos {
				line: 1,
				column: 3,
			}),
		);
		err.path = vec![PathSegment::Field("allNodes".into()), PathSegment::Index(2)];
		let mut ext = ErrorExtensionValues::default();
		ext.set("errcode", "42501");
		err.extensions = Some(ext);
		err
	}

	#[test]
	fn formats_paths() {
		assert_eq!(format_path(&internal_error().path), "allNodes.2");
		assert_eq!(format_path(&[]), "");
	}

	#[test]
	fn no_errors_stay_no_errors() {
		assert!(redact_errors(vec![]).is_empty());
	}

	#[test]
	fn errors_collapse_into_one_generic_error() {
		let redacted = redact_errors(vec![internal_error(), internal_error()]);
		assert_eq!(redacted.len(), 1);
		let err = &redacted[0];
		assert_eq!(err.message, GENERIC_ERROR_MESSAGE);
		assert!(err.path.is_empty());
		assert!(err.locations.is_empty());
		assert!(err.extensions.is_none());
	}

	#[test]
	fn redacted_response_hides_detail() {
		let response = Response::from_errors(vec![internal_error()]);
		let response = ErrorPolicy::Redacted.apply(response);
		let body = serde_json::to_string(&response).unwrap();
		assert!(!body.contains("permission denied"), "{body}");
		assert!(!body.contains("allNodes"), "{body}");
		assert!(!body.contains("42501"), "{body}");
		assert!(body.contains(GENERIC_ERROR_MESSAGE), "{body}");
	}

	#[test]
	fn detailed_response_is_untouched() {
		let response = Response::from_errors(vec![internal_error()]);
		let response = ErrorPolicy::Detailed.apply(response);
		let body = serde_json::to_string(&response).unwrap();
		assert!(body.contains("permission denied"), "{body}");
		assert!(body.contains("allNodes"), "{body}");
		assert!(body.contains("42501"), "{body}");
	}

	#[tokio::test]
	async fn redaction_logs_the_failing_field_path() {
		let logs = Captured::default();
		let writer = logs.clone();
		let subscriber = tracing_subscriber::fmt()
			.with_writer(move || writer.clone())
			.with_ansi(false)
			.finish();
		let _guard = tracing::subscriber::set_default(subscriber);

		let ds = Datastore::lazy("postgres://postgres@127.0.0.1:1/none", "view_api").unwrap();
		let catalog = Catalog::from_rows("api", vec![row("documents", "id", "int4")]).unwrap();
		let schema = generate_schema(&catalog, &ds).unwrap();
		let res = schema.execute("{ allDocuments(offset: -5) { totalCount } }").await;
		let res = ErrorPolicy::Redacted.apply(res);
		assert_eq!(res.errors[0].message, GENERIC_ERROR_MESSAGE);

		let logs = logs.text();
		assert!(logs.contains("path=allDocuments"), "{logs}");
		assert!(logs.contains("`offset` must not be negative"), "{logs}");
	}

	#[test]
	fn batches_are_redacted_per_response() {
		let batch = BatchResponse::Batch(vec![
			Response::from_errors(vec![internal_error()]),
			Response::new(async_graphql::Value::Null),
		]);
		let BatchResponse::Batch(all) = ErrorPolicy::Redacted.apply_batch(batch) else {
			panic!("expected a batch");
		};
		assert_eq!(all[0].errors.len(), 1);
		assert_eq!(all[0].errors[0].message, GENERIC_ERROR_MESSAGE);
		assert!(all[1].errors.is_empty());
	}
}
