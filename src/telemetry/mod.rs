mod logs;

use tracing::Subscriber;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::prelude::*;

use crate::err::Error;
use crate::tier::Tier;

/// The log levels accepted as shorthands for a full filter.
const LEVELS: [&str; 5] = ["error", "warn", "info", "debug", "trace"];

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum LogFormat {
	/// Human readable single line output
	#[default]
	Compact,
	/// One JSON object per line
	Json,
}

impl From<Tier> for LogFormat {
	fn from(tier: Tier) -> Self {
		match tier {
			Tier::Development => LogFormat::Compact,
			Tier::Production => LogFormat::Json,
		}
	}
}

/// Keeps the non-blocking writers flushing until dropped.
#[must_use]
pub struct Guards {
	_stdout: WorkerGuard,
	_stderr: WorkerGuard,
}

#[derive(Debug, Default)]
pub struct Builder {
	filter: Option<EnvFilter>,
	format: LogFormat,
}

pub fn builder() -> Builder {
	Builder::default()
}

/// Turns a log level shorthand or a full directive string into a filter.
///
/// A bare level applies to this server and to the HTTP tracing, while other
/// crates only report warnings.
pub fn filter_from_value(v: &str) -> Result<EnvFilter, Error> {
	let directives = match v {
		"none" => "off".to_owned(),
		"full" => "trace".to_owned(),
		level if LEVELS.contains(&level) => format!("warn,mediatum={level},tower_http={level}"),
		custom => custom.to_owned(),
	};
	EnvFilter::builder().parse(directives).map_err(|e| Error::Logger(e.to_string()))
}

impl Builder {
	/// Set the log level on the builder
	pub fn with_log_level(mut self, log_level: &str) -> Result<Self, Error> {
		self.filter = Some(filter_from_value(log_level)?);
		Ok(self)
	}

	pub fn with_format(mut self, format: LogFormat) -> Self {
		self.format = format;
		self
	}

	/// Build a subscriber writing logs through non-blocking stdout and stderr writers
	pub fn build(self) -> Result<(Box<dyn Subscriber + Send + Sync + 'static>, Guards), Error> {
		let filter = match self.filter {
			Some(filter) => filter,
			None => filter_from_value("info")?,
		};
		let (stdout, stdout_guard) = tracing_appender::non_blocking(std::io::stdout());
		let (stderr, stderr_guard) = tracing_appender::non_blocking(std::io::stderr());
		let registry =
			tracing_subscriber::registry().with(logs::new(filter, self.format, stdout, stderr));
		let guards = Guards {
			_stdout: stdout_guard,
			_stderr: stderr_guard,
		};
		Ok((Box::new(registry), guards))
	}

	/// Install the subscriber globally
	pub fn init(self) -> Result<Guards, Error> {
		let (subscriber, guards) = self.build()?;
		tracing::subscriber::set_global_default(subscriber)
			.map_err(|e| Error::Logger(e.to_string()))?;
		Ok(guards)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn shorthands_expand() {
		assert_eq!(filter_from_value("none").unwrap().to_string(), "off");
		assert_eq!(filter_from_value("full").unwrap().to_string(), "trace");
		let info = filter_from_value("info").unwrap().to_string();
		assert!(info.contains("mediatum=info"), "{info}");
		assert!(info.contains("tower_http=info"), "{info}");
	}

	#[test]
	fn custom_directives_are_kept() {
		let filter = filter_from_value("mediatum::net=debug").unwrap().to_string();
		assert_eq!(filter, "mediatum::net=debug");
	}

	#[test]
	fn invalid_directives_are_rejected() {
		assert!(matches!(filter_from_value("mediatum=loud"), Err(Error::Logger(_))));
	}

	#[test]
	fn format_follows_tier() {
		assert_eq!(LogFormat::from(Tier::Development), LogFormat::Compact);
		assert_eq!(LogFormat::from(Tier::Production), LogFormat::Json);
	}

	#[test]
	fn builds_a_scoped_subscriber() {
		let (subscriber, _guards) =
			builder().with_log_level("debug").unwrap().with_format(LogFormat::Json).build().unwrap();
		tracing::subscriber::with_default(subscriber, || {
			info!(target: "mediatum::test", "hello");
		});
	}
}
