//! A very basic service that acts as a healthcheck.

use std::fmt;

use axum::extract::FromRef;
use serde::Serialize;

pub(crate) mod http;

/// A service that simply responds if the gateway is healthy.
#[derive(Clone, Copy, FromRef)]
#[allow(clippy::missing_docs_in_private_items)]
pub struct HealthService {}

/// Response payload for `GET /health`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, utoipa::ToSchema)]
pub struct HealthReport
{
	/// Always `true`.
	pub ok: bool,
}

impl fmt::Debug for HealthService
{
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
	{
		f.debug_struct("HealthService").finish_non_exhaustive()
	}
}

impl HealthService
{
	/// Create a new [`HealthService`].
	#[tracing::instrument]
	pub fn new() -> Self
	{
		Self {}
	}

	/// Reports that we are up.
	#[tracing::instrument(level = "debug")]
	pub async fn report(&self) -> HealthReport
	{
		HealthReport { ok: true }
	}
}
