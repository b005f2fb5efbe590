/// Lazily parses a value from an environment variable, falling back to a
/// default when the variable is unset or does not parse.
///
/// # Parameters
///
/// - `$key`: the name of the environment variable.
/// - `$t`: the type to parse the value into.
/// - `$default`: the value used when the variable is missing or invalid.
///
/// The `duration` form parses human readable durations such as `10m` or `2s`.
macro_rules! lazy_env_parse {
	(duration, $key:expr_2021, $default:expr_2021) => {
		std::sync::LazyLock::new(|| {
			std::env::var($key)
				.ok()
				.and_then(|s| humantime::parse_duration(s.trim()).ok())
				.unwrap_or($default)
		})
	};
	($key:expr_2021, $t:ty, $default:expr_2021) => {
		std::sync::LazyLock::new(|| {
			std::env::var($key).ok().and_then(|s| s.parse::<$t>().ok()).unwrap_or($default)
		})
	};
}
