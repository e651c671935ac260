//! HTTP handlers for this service.

use axum::extract::State;
use axum::{routing, Json, Router};

use super::{HealthReport, HealthService};

impl From<HealthService> for Router
{
	fn from(svc: HealthService) -> Self
	{
		Router::new().route("/", routing::get(get)).with_state(svc)
	}
}

/// Check whether the gateway is up.
#[tracing::instrument]
#[utoipa::path(get, path = "/health", tag = "Health", responses(
  (status = OK, description = "The gateway is healthy.", body = HealthReport),
))]
pub(crate) async fn get(State(svc): State<HealthService>) -> Json<HealthReport>
{
	Json(svc.report().await)
}
