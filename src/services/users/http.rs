//! HTTP handlers for this service.

use axum::body::Bytes;
use axum::extract::State;
use axum::{routing, Router};

use super::{RegisterRequest, RegisterResponse, UserService};
use crate::http::ProblemDetails;

impl From<UserService> for Router
{
	fn from(svc: UserService) -> Self
	{
		Router::new()
			.route("/register", routing::post(register))
			.with_state(svc)
	}
}

/// Register a new user with an email and password.
///
/// The body is parsed leniently; no `Content-Type` is required. The new user
/// is not signed in.
#[tracing::instrument(skip(body), err(Debug, level = "debug"))]
#[utoipa::path(
  post,
  path = "/api/auth/register",
  tag = "Users",
  request_body = RegisterRequest,
  responses(
    RegisterResponse,
    (status = BAD_REQUEST, description = "Invalid payload or email already registered"),
  ),
)]
pub(crate) async fn register(
	State(svc): State<UserService>,
	body: Bytes,
) -> Result<RegisterResponse, ProblemDetails>
{
	let req = RegisterRequest::from_json(&body)?;
	let res = svc.register(req).await?;

	Ok(res)
}
