use http::HeaderValue;
use http::header::SERVER;
use tower_http::set_header::SetResponseHeaderLayer;

use crate::cnf::{PKG_NAME, PKG_VERSION};

pub fn server_header() -> HeaderValue {
	HeaderValue::try_from(format!("{PKG_NAME}/{}", *PKG_VERSION))
		.unwrap_or_else(|_| HeaderValue::from_static(PKG_NAME))
}

pub fn add_server_header() -> SetResponseHeaderLayer<HeaderValue> {
	SetResponseHeaderLayer::if_not_present(SERVER, server_header())
}
