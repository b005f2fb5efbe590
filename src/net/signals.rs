use axum_server::Handle;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::err::Error;

/// Start a graceful shutdown once a shutdown signal is received:
/// * Stop accepting new HTTP requests and let pending ones finish.
/// * Cancel `token`, stopping background tasks such as the schema watcher.
///
/// A second signal forces an immediate shutdown.
pub fn graceful_shutdown(http_handle: Handle, token: CancellationToken) -> JoinHandle<()> {
	tokio::spawn(async move {
		let signal = match listen().await {
			Ok(signal) => signal,
			Err(e) => {
				error!(target: super::LOG, "Failed to listen to shutdown signal: {e}");
				return;
			}
		};
		info!(target: super::LOG, "{signal} received. Waiting for graceful shutdown... A second signal will force an immediate shutdown");
		token.cancel();
		http_handle.graceful_shutdown(None);

		match listen().await {
			Ok(signal) => {
				warn!(target: super::LOG, "{signal} received during graceful shutdown. Terminate immediately...");
			}
			Err(e) => {
				error!(target: super::LOG, "Failed to listen to shutdown signal: {e}. Terminate immediately...");
			}
		}
		http_handle.shutdown();
	})
}

#[cfg(unix)]
pub async fn listen() -> Result<&'static str, Error> {
	use tokio::signal::unix::{SignalKind, signal};
	let mut sighup = signal(SignalKind::hangup())?;
	let mut sigint = signal(SignalKind::interrupt())?;
	let mut sigquit = signal(SignalKind::quit())?;
	let mut sigterm = signal(SignalKind::terminate())?;
	tokio::select! {
		_ = sighup.recv() => Ok("SIGHUP"),
		_ = sigint.recv() => Ok("SIGINT"),
		_ = sigquit.recv() => Ok("SIGQUIT"),
		_ = sigterm.recv() => Ok("SIGTERM"),
	}
}

#[cfg(windows)]
pub async fn listen() -> Result<&'static str, Error> {
	use tokio::signal::windows;
	let mut exit = windows::ctrl_c()?;
	let mut leave = windows::ctrl_break()?;
	let mut close = windows::ctrl_close()?;
	let mut shutdown = windows::ctrl_shutdown()?;
	tokio::select! {
		_ = exit.recv() => Ok("CTRL-C"),
		_ = leave.recv() => Ok("CTRL-BREAK"),
		_ = close.recv() => Ok("CTRL-CLOSE"),
		_ = shutdown.recv() => Ok("CTRL-SHUTDOWN"),
	}
}
