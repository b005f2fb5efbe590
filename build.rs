use std::env;
use std::process::Command;

use semver::BuildMetadata;

const BUILD_METADATA: &str = "MEDIATUM_BUILD_METADATA";

fn main() {
	println!("cargo:rerun-if-env-changed={BUILD_METADATA}");
	println!("cargo:rerun-if-changed=build.rs");
	println!("cargo:rerun-if-changed=Cargo.toml");
	if let Some(metadata) = metadata() {
		println!("cargo:rustc-env={BUILD_METADATA}={metadata}");
	}
}

/// Explicit metadata wins, otherwise the short git revision of the checkout is used.
fn metadata() -> Option<String> {
	if let Ok(input) = env::var(BUILD_METADATA) {
		let metadata = input.trim();
		if let Err(error) = BuildMetadata::new(metadata) {
			panic!("invalid {BUILD_METADATA} `{input}`: {error}");
		}
		return Some(metadata.to_owned());
	}
	let output = Command::new("git").args(["rev-parse", "--short", "HEAD"]).output().ok()?;
	if !output.status.success() {
		return None;
	}
	let rev = String::from_utf8(output.stdout).ok()?;
	let rev = rev.trim();
	(!rev.is_empty()).then(|| format!("git.{rev}"))
}
