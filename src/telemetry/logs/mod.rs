use tracing::{Level, Subscriber};
use tracing_appender::non_blocking::NonBlocking;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::fmt::writer::MakeWriterExt;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::{EnvFilter, Layer};

use super::LogFormat;

pub fn new<S>(
	filter: EnvFilter,
	format: LogFormat,
	stdout: NonBlocking,
	stderr: NonBlocking,
) -> Box<dyn Layer<S> + Send + Sync>
where
	S: Subscriber + for<'a> LookupSpan<'a> + Send + Sync,
{
	// Only log INFO, DEBUG, TRACE to stdout
	let stdout = stdout.with_min_level(Level::INFO);
	// Only log WARN, ERROR to stderr
	let stderr = stderr.with_max_level(Level::WARN);
	let layer = tracing_subscriber::fmt::layer()
		.with_target(true)
		.with_thread_ids(false)
		.with_thread_names(false)
		.with_span_events(FmtSpan::NONE)
		.with_writer(stdout.and(stderr));
	match format {
		LogFormat::Compact => layer
			.compact()
			.with_ansi(true)
			.with_file(cfg!(debug_assertions))
			.with_line_number(cfg!(debug_assertions))
			.with_filter(filter)
			.boxed(),
		LogFormat::Json => layer
			.json()
			.with_ansi(false)
			.with_current_span(false)
			.with_filter(filter)
			.boxed(),
	}
}
