//! Selection of the deployment tier and of the feature set that goes with it.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::cnf::{SCHEMA_EXPORT_PATH, WATCH_INTERVAL};
use crate::err::Error;

/// The environment variable holding the deployment tier
pub const TIER_ENV: &str = "MEDIATUM_ENVIRONMENT";

/// The deployment tier the server runs in.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum Tier {
	Development,
	Production,
}

impl Tier {
	/// The accepted spellings, in the order they are reported to the user.
	pub const ALLOWED: [&'static str; 2] = ["development", "production"];

	pub fn as_str(&self) -> &'static str {
		match self {
			Tier::Development => "development",
			Tier::Production => "production",
		}
	}

	/// Validates an optional raw value read from the environment or the command line.
	pub fn select(raw: Option<&str>) -> Result<Tier, Error> {
		match raw {
			None => Err(Error::MissingTier),
			Some(raw) => raw.parse(),
		}
	}
}

impl FromStr for Tier {
	type Err = Error;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s {
			"development" => Ok(Tier::Development),
			"production" => Ok(Tier::Production),
			_ => Err(Error::InvalidTier(s.to_owned())),
		}
	}
}

impl fmt::Display for Tier {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

/// How execution errors are presented to GraphQL clients.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ErrorPolicy {
	/// Errors keep their message, path and the `hint`, `detail` and `errcode`
	/// of the underlying database error.
	Detailed,
	/// Errors are logged and replaced by a single generic error.
	Redacted,
}

/// Schema watching options, only present in development.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Watch {
	/// How often the database catalog is compared against the served schema
	pub interval: Duration,
	/// Where the SDL is written whenever the schema changes
	pub export_path: PathBuf,
}

/// The feature set of a tier. Development and production features never overlap.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Features {
	pub tier: Tier,
	pub watch: Option<Watch>,
	pub graphiql: bool,
	pub errors: ErrorPolicy,
	pub rate_limit: bool,
	pub compression: bool,
}

impl Features {
	pub fn for_tier(tier: Tier) -> Self {
		match tier {
			Tier::Development => Features {
				tier,
				watch: Some(Watch {
					interval: *WATCH_INTERVAL,
					export_path: PathBuf::from(SCHEMA_EXPORT_PATH),
				}),
				graphiql: true,
				errors: ErrorPolicy::Detailed,
				rate_limit: false,
				compression: false,
			},
			Tier::Production => Features {
				tier,
				watch: None,
				graphiql: false,
				errors: ErrorPolicy::Redacted,
				rate_limit: true,
				compression: true,
			},
		}
	}

	/// Overrides where the schema is exported. Has no effect outside development.
	pub fn with_export_path(mut self, path: impl Into<PathBuf>) -> Self {
		if let Some(watch) = self.watch.as_mut() {
			watch.export_path = path.into();
		}
		self
	}
}
