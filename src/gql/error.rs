use async_graphql::ErrorExtensions;
use sqlx::postgres::PgDatabaseError;
use thiserror::Error;

const TARGET: &str = "mediatum::gql";

#[derive(Debug, Error)]
pub enum GqlError {
	#[error("Database error: {0}")]
	DbError(#[from] sqlx::Error),
	#[error("Error generating schema: {0}")]
	SchemaError(String),
	#[error("Error resolving request: {0}")]
	ResolverError(String),
	#[error("Error exporting schema: {0}")]
	ExportError(#[from] std::io::Error),
}

pub fn schema_error(msg: impl Into<String>) -> GqlError {
	GqlError::SchemaError(msg.into())
}

pub fn resolver_error(msg: impl Into<String>) -> GqlError {
	GqlError::ResolverError(msg.into())
}

impl GqlError {
	/// Converts the error into a field error. Database errors keep the `hint`,
	/// `detail` and `errcode` reported by PostgreSQL as error extensions.
	pub fn into_field_error(self) -> async_graphql::Error {
		match self {
			GqlError::DbError(sqlx::Error::Database(db)) => {
				let message = db.message().to_owned();
				match db.try_downcast_ref::<PgDatabaseError>() {
					Some(pg) => {
						let hint = pg.hint().map(str::to_owned);
						let detail = pg.detail().map(str::to_owned);
						let code = pg.code().to_owned();
						async_graphql::Error::new(message).extend_with(|_, ext| {
							if let Some(hint) = hint {
								ext.set("hint", hint);
							}
							if let Some(detail) = detail {
								ext.set("detail", detail);
							}
							ext.set("errcode", code);
						})
					}
					None => async_graphql::Error::new(message),
				}
			}
			GqlError::DbError(e) => {
				debug!(target: TARGET, "Database error without diagnostics: {e:?}");
				async_graphql::Error::new(e.to_string())
			}
			e => async_graphql::Error::new(e.to_string()),
		}
	}
}

impl From<async_graphql::Error> for GqlError {
	fn from(value: async_graphql::Error) -> Self {
		GqlError::ResolverError(value.message)
	}
}
