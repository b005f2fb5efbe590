//! A read-only GraphQL API over the relations of the mediaTUM view schema
//! in PostgreSQL, served in a development or a production configuration.

#[macro_use]
extern crate tracing;

#[macro_use]
mod mac;

pub mod cli;
pub mod cnf;
pub mod dbs;
pub mod env;
pub mod err;
pub mod gql;
pub mod net;
pub mod telemetry;
pub mod tier;

use std::process::ExitCode;

/// Runs the server to completion on a multi-threaded runtime.
pub fn init() -> ExitCode {
	let runtime = match tokio::runtime::Builder::new_multi_thread()
		.enable_all()
		.thread_name("mediatum-api")
		.build()
	{
		Ok(runtime) => runtime,
		Err(e) => {
			eprintln!("Failed to start the async runtime: {e}");
			return ExitCode::FAILURE;
		}
	};
	runtime.block_on(cli::init())
}
