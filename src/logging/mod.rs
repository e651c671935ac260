//! Log-capturing facilities.
//!
//! Logs always go to STDERR; if a log directory is configured, audit logs and
//! everything the gateway itself emits are additionally written to daily log
//! files.

use std::path::Path;

use anyhow::Context;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

mod stderr;
mod files;

/// Initializes [`tracing-subscriber`].
///
/// NOTE: the returned [`WorkerGuard`] will perform cleanup for the tracing layer that emits logs
///       to files, which means it has to stay alive until the program exits!
///
/// [`tracing-subscriber`]: tracing_subscriber
pub fn init(log_dir: Option<&Path>) -> anyhow::Result<Option<WorkerGuard>>
{
	let files = log_dir
		.map(files::layer)
		.transpose()
		.context("files layer")?;

	let (files_layer, guard, log_dir) = match files {
		Some((layer, guard, dir)) => (Some(layer), Some(guard), Some(dir)),
		None => (None, None, None),
	};

	tracing_subscriber::registry()
		.with(stderr::layer())
		.with(files_layer)
		.try_init()
		.context("set global subscriber")?;

	tracing::info! {
		target: "auth_gateway::audit_log",
		dir = ?log_dir.as_deref().map(Path::display),
		"initialized logging",
	};

	Ok(guard)
}
