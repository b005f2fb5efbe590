use std::process::ExitCode;

fn main() -> ExitCode {
	mediatum_api::init()
}
