use axum::Json;
use axum::response::{IntoResponse, Response};
use http::header::RETRY_AFTER;
use http::{HeaderValue, StatusCode};
use serde::{Serialize, Serializer};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
	#[error("Too many requests, please try again later.")]
	TooManyRequests(u64),

	#[error("There was a problem connecting with the database")]
	InvalidStorage,

	#[error("The HTTP route '{0}' is not found")]
	NotFound(String),
}

impl IntoResponse for Error {
	fn into_response(self) -> Response {
		match self {
			Error::TooManyRequests(retry_after) => {
				let mut res = ErrorMessage {
					code: StatusCode::TOO_MANY_REQUESTS,
					details: Some("Too many requests".to_string()),
					description: Some(self.to_string()),
					information: None,
				}
				.into_response();
				res.headers_mut().insert(RETRY_AFTER, HeaderValue::from(retry_after));
				res
			}
			Error::InvalidStorage => ErrorMessage {
				code: StatusCode::INTERNAL_SERVER_ERROR,
				details: Some("Health check failed".to_string()),
				description: Some("The database health check for this instance failed.".to_string()),
				information: Some(self.to_string()),
			}
			.into_response(),
			Error::NotFound(_) => ErrorMessage {
				code: StatusCode::NOT_FOUND,
				details: Some("Not found".to_string()),
				description: Some(
					"The request was made to an endpoint which does not exist.".to_string(),
				),
				information: Some(self.to_string()),
			}
			.into_response(),
		}
	}
}

#[derive(Serialize)]
pub(super) struct ErrorMessage {
	#[serde(serialize_with = "serialize_status_code")]
	code: StatusCode,
	details: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	description: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	information: Option<String>,
}

fn serialize_status_code<S>(code: &StatusCode, s: S) -> Result<S::Ok, S::Error>
where
	S: Serializer,
{
	code.as_u16().serialize(s)
}

impl IntoResponse for ErrorMessage {
	fn into_response(self) -> Response {
		(self.code, Json(self)).into_response()
	}
}
