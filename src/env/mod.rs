use std::sync::LazyLock;

use crate::cnf::{PKG_NAME, PKG_VERSION};
use crate::tier::Tier;

const TARGET: &str = "mediatum::env";

/// Stores the current release identifier
pub static RELEASE: LazyLock<String> = LazyLock::new(|| {
	format!("{PKG_NAME} {} for {} on {}", *PKG_VERSION, std::env::consts::OS, std::env::consts::ARCH)
});

pub fn init(tier: Tier) {
	info!(target: TARGET, "Running {}", *RELEASE);
	info!(target: TARGET, "Selected the {tier} environment");
	if tier == Tier::Development {
		warn!(target: TARGET, "Development mode exposes GraphiQL and detailed database errors. Do not use it in production.");
	}
}
