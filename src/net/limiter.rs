use std::collections::HashMap;
use std::net::{IpAddr, Ipv6Addr, SocketAddr};
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::extract::{ConnectInfo, Request, State};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use http::{HeaderMap, HeaderName, HeaderValue};
use parking_lot::Mutex;

use super::error::Error;
use crate::cnf::{
	RATE_LIMIT_MAX, RATE_LIMIT_WINDOW, SLOW_DOWN_AFTER, SLOW_DOWN_DELAY, SLOW_DOWN_WINDOW,
};

const TARGET: &str = "mediatum::net::limiter";

static RATELIMIT_LIMIT: HeaderName = HeaderName::from_static("ratelimit-limit");
static RATELIMIT_REMAINING: HeaderName = HeaderName::from_static("ratelimit-remaining");
static RATELIMIT_RESET: HeaderName = HeaderName::from_static("ratelimit-reset");

/// The unit requests are counted against.
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub enum ClientKey {
	/// IPv4 address or IPv6 /48 prefix
	Ip(IpAddr),
	/// The peer address was not available
	Unknown,
}

impl ClientKey {
	pub fn from_ip(ip: IpAddr) -> Self {
		let ip = match ip {
			IpAddr::V6(v6) => match v6.to_ipv4_mapped() {
				Some(v4) => IpAddr::V4(v4),
				None => {
					let mut octets = v6.octets();
					// Ignore parts of the address that are easily rotated
					octets[6..].iter_mut().for_each(|o| *o = 0);
					IpAddr::V6(Ipv6Addr::from(octets))
				}
			},
			v4 => v4,
		};
		ClientKey::Ip(ip)
	}

	fn from_request(req: &Request) -> Self {
		match req.extensions().get::<ConnectInfo<SocketAddr>>() {
			Some(ConnectInfo(addr)) => Self::from_ip(addr.ip()),
			None => {
				debug!(target: TARGET, "No peer address on request, counting it as unknown client");
				ClientKey::Unknown
			}
		}
	}
}

struct Counter {
	started: Instant,
	hits: u64,
}

struct Inner {
	counters: HashMap<ClientKey, Counter>,
	last_prune: Instant,
}

/// The state of a client's window after counting a request.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Hit {
	/// Requests in the current window, including this one
	pub hits: u64,
	/// Time left until the current window ends
	pub reset_after: Duration,
}

/// Counts requests per client in fixed windows starting at each client's first request.
pub struct FixedWindow {
	window: Duration,
	inner: Mutex<Inner>,
}

impl FixedWindow {
	pub fn new(window: Duration) -> Self {
		Self {
			window,
			inner: Mutex::new(Inner {
				counters: HashMap::new(),
				last_prune: Instant::now(),
			}),
		}
	}

	pub fn hit(&self, key: &ClientKey, now: Instant) -> Hit {
		let window = self.window;
		let mut inner = self.inner.lock();
		// Drop the windows that have ended. Elapsed time is compared rather
		// than adding the window to an instant, which overflows for huge windows.
		if now.saturating_duration_since(inner.last_prune) > window {
			inner.last_prune = now;
			inner.counters.retain(|_, c| now.saturating_duration_since(c.started) < window);
		}
		let counter = inner.counters.entry(key.clone()).or_insert(Counter {
			started: now,
			hits: 0,
		});
		if now.saturating_duration_since(counter.started) >= window {
			counter.started = now;
			counter.hits = 0;
		}
		counter.hits = counter.hits.saturating_add(1);
		Hit {
			hits: counter.hits,
			reset_after: window.saturating_sub(now.saturating_duration_since(counter.started)),
		}
	}

	#[cfg(test)]
	fn len(&self) -> usize {
		self.inner.lock().counters.len()
	}
}

/// The outcome of counting a request against the rate limit.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Quota {
	pub limit: u64,
	pub remaining: u64,
	pub reset_after: Duration,
	pub allowed: bool,
}

impl Quota {
	fn write_headers(&self, headers: &mut HeaderMap) {
		headers.insert(RATELIMIT_LIMIT.clone(), HeaderValue::from(self.limit));
		headers.insert(RATELIMIT_REMAINING.clone(), HeaderValue::from(self.remaining));
		headers.insert(RATELIMIT_RESET.clone(), HeaderValue::from(ceil_secs(self.reset_after)));
	}
}

fn ceil_secs(d: Duration) -> u64 {
	d.as_secs().saturating_add(u64::from(d.subsec_nanos() > 0))
}

/// Rejects clients making more than `max` requests within one window.
pub struct RateLimiter {
	counter: FixedWindow,
	max: u64,
}

impl RateLimiter {
	pub fn new(window: Duration, max: u64) -> Self {
		Self {
			counter: FixedWindow::new(window),
			max,
		}
	}

	pub fn check(&self, key: &ClientKey, now: Instant) -> Quota {
		let hit = self.counter.hit(key, now);
		Quota {
			limit: self.max,
			remaining: self.max.saturating_sub(hit.hits),
			reset_after: hit.reset_after,
			allowed: hit.hits <= self.max,
		}
	}
}

/// Delays clients by a growing amount once they pass `after` requests within one window.
pub struct SlowDown {
	counter: FixedWindow,
	after: u64,
	delay: Duration,
}

impl SlowDown {
	pub fn new(window: Duration, after: u64, delay: Duration) -> Self {
		Self {
			counter: FixedWindow::new(window),
			after,
			delay,
		}
	}

	pub fn delay(&self, key: &ClientKey, now: Instant) -> Duration {
		let hit = self.counter.hit(key, now);
		let beyond = hit.hits.saturating_sub(self.after);
		self.delay.saturating_mul(u32::try_from(beyond).unwrap_or(u32::MAX))
	}
}

/// The request limits applied in production.
pub struct Limits {
	pub rate: RateLimiter,
	pub slow: SlowDown,
}

impl Limits {
	pub fn new(rate: RateLimiter, slow: SlowDown) -> Self {
		Self {
			rate,
			slow,
		}
	}

	/// The limits configured through the environment.
	pub fn from_env() -> Self {
		Self::new(
			RateLimiter::new(*RATE_LIMIT_WINDOW, *RATE_LIMIT_MAX),
			SlowDown::new(*SLOW_DOWN_WINDOW, *SLOW_DOWN_AFTER, *SLOW_DOWN_DELAY),
		)
	}
}

pub async fn rate_limit(State(limits): State<Arc<Limits>>, req: Request, next: Next) -> Response {
	let key = ClientKey::from_request(&req);
	let quota = limits.rate.check(&key, Instant::now());
	if !quota.allowed {
		warn!(target: TARGET, "Rate limit exceeded by {key:?}");
		let mut res = Error::TooManyRequests(ceil_secs(quota.reset_after)).into_response();
		quota.write_headers(res.headers_mut());
		return res;
	}
	let mut res = next.run(req).await;
	quota.write_headers(res.headers_mut());
	res
}

pub async fn slow_down(State(limits): State<Arc<Limits>>, req: Request, next: Next) -> Response {
	let key = ClientKey::from_request(&req);
	let delay = limits.slow.delay(&key, Instant::now());
	if !delay.is_zero() {
		trace!(target: TARGET, "Delaying request of {key:?} by {delay:?}");
		tokio::time::sleep(delay).await;
	}
	next.run(req).await
}
