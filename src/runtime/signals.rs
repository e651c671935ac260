//! OS signal handlers used for graceful shutdown.

use tokio::signal;

/// Resolves once the process receives `SIGINT` or, on unix, `SIGTERM`.
///
/// Container runtimes stop processes with `SIGTERM`, so both are treated as a
/// request to drain in-flight requests and exit.
#[tracing::instrument]
pub async fn shutdown()
{
	let ctrl_c = async {
		match signal::ctrl_c().await {
			Ok(()) => tracing::warn!("received SIGINT, shutting down"),
			Err(error) => tracing::error!(%error, "failed to listen for SIGINT"),
		}
	};

	#[cfg(unix)]
	let terminate = async {
		match signal::unix::signal(signal::unix::SignalKind::terminate()) {
			Ok(mut stream) => {
				stream.recv().await;
				tracing::warn!("received SIGTERM, shutting down");
			}
			Err(error) => {
				tracing::error!(%error, "failed to listen for SIGTERM");
				std::future::pending::<()>().await;
			}
		}
	};

	#[cfg(not(unix))]
	let terminate = std::future::pending::<()>();

	tokio::select! {
		() = ctrl_c => {}
		() = terminate => {}
	}
}
