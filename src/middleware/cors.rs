//! CORS middleware.

use axum::http::{header, HeaderValue, Method};
use tower_http::cors::{AllowOrigin, CorsLayer};

/// Creates a CORS layer that lets the client application at `origin` make
/// credentialed requests.
///
/// `Access-Control-Allow-Origin` is only sent back to requests coming from
/// `origin`.
///
/// Without an origin (or with one that is not a valid header value), no
/// cross-origin requests are allowed.
pub fn client(origin: Option<&str>) -> CorsLayer
{
	let allow_origin = match origin.map(HeaderValue::from_str) {
		Some(Ok(origin)) => AllowOrigin::list([origin]),
		Some(Err(error)) => {
			tracing::warn!(%error, "`CORS_ORIGIN` is not a valid header value; disabling CORS");
			AllowOrigin::list([])
		}
		None => AllowOrigin::list([]),
	};

	CorsLayer::new()
		.allow_origin(allow_origin)
		.allow_credentials(true)
		.allow_methods([Method::GET, Method::POST, Method::OPTIONS])
		.allow_headers([
			header::CONTENT_TYPE,
			header::HeaderName::from_static(crate::services::auth::RETURN_REDIRECT_HEADER),
		])
}

#[cfg(test)]
mod tests
{
	use axum::body::Body;
	use axum::routing;
	use http::{header, Request};
	use tower::ServiceExt;

	use crate::testing;

	#[tokio::test]
	async fn only_the_client_origin_is_allowed() -> color_eyre::Result<()>
	{
		let app = axum::Router::new()
			.route("/", routing::get(|| async { "hi" }))
			.layer(super::client(Some("http://localhost:5173")));

		let allowed = app
			.clone()
			.oneshot(
				Request::get("/")
					.header(header::ORIGIN, "http://localhost:5173")
					.body(Body::empty())?,
			)
			.await?;

		testing::assert_eq!(
			allowed.headers().get(header::ACCESS_CONTROL_ALLOW_ORIGIN).map(|v| v.as_bytes()),
			Some(b"http://localhost:5173".as_slice()),
		);
		testing::assert_eq!(
			allowed.headers().get(header::ACCESS_CONTROL_ALLOW_CREDENTIALS).map(|v| v.as_bytes()),
			Some(b"true".as_slice()),
		);

		let denied = app
			.oneshot(
				Request::get("/")
					.header(header::ORIGIN, "https://evil.test")
					.body(Body::empty())?,
			)
			.await?;

		testing::assert!(denied.headers().get(header::ACCESS_CONTROL_ALLOW_ORIGIN).is_none());

		Ok(())
	}

	#[tokio::test]
	async fn no_origin_allows_nobody() -> color_eyre::Result<()>
	{
		let app = axum::Router::new()
			.route("/", routing::get(|| async { "hi" }))
			.layer(super::client(None));

		let response = app
			.oneshot(
				Request::get("/")
					.header(header::ORIGIN, "http://localhost:5173")
					.body(Body::empty())?,
			)
			.await?;

		testing::assert!(response.headers().get(header::ACCESS_CONTROL_ALLOW_ORIGIN).is_none());

		Ok(())
	}
}
