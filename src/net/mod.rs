mod error;
mod gql;
mod headers;
mod health;
pub mod limiter;
mod signals;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::Request;
use axum::{Extension, Router, middleware};
use axum_server::Handle;
use http::header::{ACCEPT, AUTHORIZATION, CONTENT_LENGTH, CONTENT_TYPE, ORIGIN};
use http::{HeaderName, Method};
use tokio_util::sync::CancellationToken;
use tower::ServiceBuilder;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::compression::CompressionLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;

pub use self::error::Error as NetError;
pub use self::limiter::Limits;
use crate::cnf::SERVER_TITLE;
use crate::dbs::Datastore;
use crate::err::Error;
use crate::gql::SchemaCache;
use crate::tier::Features;

const LOG: &str = "mediatum::net";

/// Everything request handlers share.
#[derive(Clone)]
pub struct AppState {
	pub datastore: Datastore,
	pub cache: SchemaCache,
	pub features: Arc<Features>,
	pub limits: Arc<Limits>,
}

impl AppState {
	pub fn new(datastore: Datastore, cache: SchemaCache, features: Features) -> Self {
		Self {
			datastore,
			cache,
			features: Arc::new(features),
			limits: Arc::new(Limits::from_env()),
		}
	}

	pub fn with_limits(mut self, limits: Limits) -> Self {
		self.limits = Arc::new(limits);
		self
	}
}

/// Builds the HTTP application for the feature set in `state`.
pub fn router(state: AppState) -> Router {
	let features = state.features.clone();

	let mut api = gql::router(state.cache.clone(), &features);
	if features.rate_limit {
		// Rejected requests are never delayed
		api = api
			.layer(middleware::from_fn_with_state(state.limits.clone(), limiter::slow_down))
			.layer(middleware::from_fn_with_state(state.limits.clone(), limiter::rate_limit));
	}

	let mut app = api.merge(health::router()).fallback(fallback);
	if features.compression {
		app = app.layer(CompressionLayer::new());
	}

	let service = ServiceBuilder::new()
		.layer(CatchPanicLayer::new())
		.layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
		.layer(TraceLayer::new_for_http())
		.layer(PropagateRequestIdLayer::x_request_id())
		.layer(headers::add_server_header())
		.layer(cors());

	app.layer(service).layer(Extension(state))
}

fn cors() -> CorsLayer {
	CorsLayer::new()
		.allow_methods([Method::GET, Method::HEAD, Method::POST, Method::OPTIONS])
		.allow_headers([
			ACCEPT,
			AUTHORIZATION,
			CONTENT_LENGTH,
			CONTENT_TYPE,
			ORIGIN,
			HeaderName::from_static("x-requested-with"),
		])
		.allow_origin(Any)
		.max_age(Duration::from_secs(86400))
}

async fn fallback(req: Request) -> NetError {
	NetError::NotFound(req.uri().path().to_owned())
}

/// Serves the application on `bind` until a shutdown signal arrives.
pub async fn init(bind: SocketAddr, state: AppState, token: CancellationToken) -> Result<(), Error> {
	let app = router(state);

	let handle = Handle::new();
	let shutdown = signals::graceful_shutdown(handle.clone(), token.clone());

	tokio::spawn({
		let handle = handle.clone();
		async move {
			if let Some(addr) = handle.listening().await {
				info!(target: LOG, "{SERVER_TITLE} listening on port {}", addr.port());
			}
		}
	});

	let served = axum_server::bind(bind)
		.handle(handle)
		.serve(app.into_make_service_with_connect_info::<SocketAddr>())
		.await;

	shutdown.abort();
	token.cancel();
	served?;

	info!(target: LOG, "Web server stopped. Bye!");
	Ok(())
}
