//! Everything related to [OpenAPI].
//!
//! This project uses the [`utoipa`] crate for generating an OpenAPI
//! specification from code. The [`Spec`] struct in this module lists out all
//! the relevant types and routes that will be included in the document.
//!
//! [OpenAPI]: https://spec.openapis.org/oas/latest.html

use utoipa::OpenApi;

/// The gateway's OpenAPI document.
#[derive(Debug, Clone, Copy, OpenApi)]
#[openapi(
  info(
    title = "Auth Gateway",
    description = "Email / password and Google sign-in for the client application.",
  ),
  paths(
    crate::services::health::http::get,
    crate::services::users::http::register,
    crate::services::auth::http::get_csrf,
    crate::services::auth::http::get_providers,
    crate::services::auth::http::get_session,
    crate::services::auth::http::callback_credentials,
    crate::services::auth::http::signin_google,
    crate::services::auth::http::callback_google,
    crate::services::auth::http::signout,
    crate::services::auth::http::get_error,
  ),
  components(
    schemas(
      crate::services::health::HealthReport,
      crate::services::users::RegisterRequest,
      crate::services::users::RegisterResponse,
      crate::services::auth::CsrfResponse,
      crate::services::auth::ProviderInfo,
      crate::services::auth::ProviderKind,
      crate::services::auth::ClientSession,
      crate::services::auth::SessionUser,
      crate::services::auth::AuthErrorCode,
      crate::services::auth::ErrorResponse,
      crate::services::auth::RedirectBody,
    ),
  ),
  tags(
    (name = "Health", description = "Liveness"),
    (name = "Users", description = "Account registration"),
    (name = "Auth", description = "Sign-in, sessions, and sign-out"),
  ),
)]
pub struct Spec;

impl Spec
{
	/// Renders the document as pretty-printed JSON.
	pub fn json() -> serde_json::Result<String>
	{
		Self::openapi().to_pretty_json()
	}
}

#[cfg(test)]
mod tests
{
	use super::*;
	use crate::testing;

	#[test]
	fn lists_every_route() -> color_eyre::Result<()>
	{
		let spec = Spec::openapi();

		for path in [
			"/health",
			"/api/auth/register",
			"/auth/csrf",
			"/auth/providers",
			"/auth/session",
			"/auth/callback/credentials",
			"/auth/signin/google",
			"/auth/callback/google",
			"/auth/signout",
			"/auth/error",
		] {
			testing::assert!(spec.paths.paths.contains_key(path), "`{path}` is missing");
		}

		Ok(())
	}
}
