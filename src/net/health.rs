use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Extension, Router};

use super::AppState;
use super::error::Error;

pub(super) fn router<S>() -> Router<S>
where
	S: Clone + Send + Sync + 'static,
{
	Router::new().route("/health", get(handler))
}

async fn handler(Extension(state): Extension<AppState>) -> impl IntoResponse {
	match state.datastore.health().await {
		Err(e) => {
			warn!(target: super::LOG, "Health check failed: {e}");
			Err(Error::InvalidStorage)
		}
		Ok(()) => Ok(()),
	}
}
