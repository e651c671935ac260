//! This module contains configuration for the [`Trace`] middleware from
//! [`tower_http`].
//!
//! The resulting type contains unique function types, and as such cannot be
//! spelled out in code. This is why we export a macro instead, which will just
//! expand to the final expression. The `pub(crate)` functions in this module
//! only exist for that macro.
//!
//! [`Trace`]: tower_http::trace::Trace

use std::time::Duration;

use axum::extract::Request;
use axum::response::Response;
use tower_http::classify::ServerErrorsFailureClass;
use uuid::Uuid;

/// Creates a middleware that will log incoming HTTP requests.
///
/// Every request gets its own span with a unique ID.
macro_rules! layer {
	() => {
		tower_http::trace::TraceLayer::new_for_http()
			.make_span_with($crate::middleware::logging::make_span)
			.on_response($crate::middleware::logging::on_response)
			.on_failure($crate::middleware::logging::on_failure)
	};
}

pub(crate) use layer;

/// Creates the span for a request.
///
/// Headers are not recorded, since they carry session cookies.
#[doc(hidden)]
pub(crate) fn make_span(request: &Request) -> tracing::Span
{
	tracing::info_span! {
		target: "auth_gateway::http",
		"request",
		request.id = %Uuid::now_v7(),
		request.method = %request.method(),
		request.path = %request.uri().path(),
		request.version = ?request.version(),
		response.status = tracing::field::Empty,
		latency = tracing::field::Empty,
	}
}

#[doc(hidden)]
pub(crate) fn on_response(response: &Response, latency: Duration, span: &tracing::Span)
{
	span.record("response.status", format_args!("{}", response.status()))
		.record("latency", format_args!("{latency:?}"));

	tracing::debug!(target: "auth_gateway::http", "finished processing request");
}

#[doc(hidden)]
pub(crate) fn on_failure(failure: ServerErrorsFailureClass, latency: Duration, _span: &tracing::Span)
{
	match failure {
		ServerErrorsFailureClass::Error(error) => {
			tracing::error!(target: "auth_gateway::audit_log", %error, ?latency, "request failed");
		}
		ServerErrorsFailureClass::StatusCode(status) => {
			tracing::error!(target: "auth_gateway::audit_log", %status, ?latency, "request failed");
		}
	}
}
