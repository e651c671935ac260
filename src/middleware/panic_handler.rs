//! This module contains a configured [`CatchPanicLayer`], which will catch
//! panics and produce a proper HTTP response from them.
//!
//! Normally, if an HTTP handler panics, the connection will simply be closed.

use std::any::Any;

use axum::response::IntoResponse;
use thiserror::Error;
use tower_http::catch_panic::{CatchPanicLayer, ResponseForPanic};

use crate::http::problem_details::{IntoProblemDetails, ProblemType};
use crate::http::ProblemDetails;

/// Creates a middleware layer for catching panics and turning them into
/// responses.
pub fn layer() -> CatchPanicLayer<PanicHandler>
{
	CatchPanicLayer::custom(PanicHandler)
}

/// A custom panic handler for [`CatchPanicLayer`].
#[derive(Debug, Clone)]
pub struct PanicHandler;

/// An HTTP handler panicked.
#[derive(Debug, Clone, Error)]
#[error("something unexpected happened; please report this incident")]
struct HandlerPanicked;

impl IntoProblemDetails for HandlerPanicked
{
	fn problem_type(&self) -> ProblemType
	{
		ProblemType::Internal
	}
}

impl ResponseForPanic for PanicHandler
{
	type ResponseBody = axum::body::Body;

	#[tracing::instrument(target = "auth_gateway::http::middleware", name = "panic_handler", skip_all)]
	fn response_for_panic(
		&mut self,
		payload: Box<dyn Any + Send + 'static>,
	) -> http::Response<Self::ResponseBody>
	{
		let message = payload
			.downcast_ref::<&str>()
			.copied()
			.or_else(|| payload.downcast_ref::<String>().map(String::as_str))
			.unwrap_or("<non-string payload>");

		tracing::error!(target: "auth_gateway::audit_log", %message, "handler panicked");

		ProblemDetails::from(HandlerPanicked).into_response()
	}
}

#[cfg(test)]
mod tests
{
	use axum::body::Body;
	use axum::routing;
	use http::{Request, StatusCode};
	use tower::ServiceExt;

	use crate::testing;

	#[tokio::test]
	async fn panics_become_internal_errors() -> color_eyre::Result<()>
	{
		#[allow(clippy::panic)]
		async fn boom() -> &'static str
		{
			panic!("boom")
		}

		let app = axum::Router::new()
			.route("/", routing::get(boom))
			.layer(super::layer());

		let response = app.oneshot(Request::get("/").body(Body::empty())?).await?;

		testing::assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
		testing::assert_eq!(
			response.headers().get(http::header::CONTENT_TYPE).map(|v| v.as_bytes()),
			Some(b"application/problem+json".as_slice()),
		);

		Ok(())
	}
}
