//! Request / Response types for this service.

use std::collections::BTreeMap;
use std::fmt;

use axum::response::{IntoResponse, Response};
use axum::Json;
use axum_extra::extract::CookieJar;
use http::{header, HeaderMap, StatusCode};
use serde::{Deserialize, Serialize};

use super::providers::ProviderInfo;
use super::token::Audience;

/// Header clients send to receive redirect targets as JSON.
pub const RETURN_REDIRECT_HEADER: &str = "x-auth-return-redirect";

/// Response payload for `GET /auth/csrf`.
#[derive(Debug, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CsrfResponse
{
	/// The token to submit with every `POST` action.
	pub csrf_token: String,
}

/// Response payload for `GET /auth/providers`.
pub type ProvidersResponse = BTreeMap<&'static str, ProviderInfo>;

/// Form submitted to `POST /auth/callback/credentials`.
#[derive(Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CredentialsForm
{
	/// The submitted email.
	pub email: Option<String>,

	/// The submitted password.
	pub password: Option<String>,

	/// The CSRF token from `GET /auth/csrf`.
	pub csrf_token: Option<String>,

	/// Where to go after signing in.
	pub callback_url: Option<String>,
}

impl fmt::Debug for CredentialsForm
{
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
	{
		f.debug_struct("CredentialsForm")
			.field("email", &self.email)
			.field("callback_url", &self.callback_url)
			.finish_non_exhaustive()
	}
}

/// Form submitted to `POST /auth/signin/:provider` and `POST /auth/signout`.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionForm
{
	/// The CSRF token from `GET /auth/csrf`.
	pub csrf_token: Option<String>,

	/// Where to go afterwards.
	pub callback_url: Option<String>,
}

/// Query parameters Google redirects back with.
#[derive(Debug, Default, Deserialize, utoipa::IntoParams)]
pub struct OAuthCallbackQuery
{
	/// The authorization code.
	pub code: Option<String>,

	/// The `state` we sent.
	pub state: Option<String>,

	/// Set if the user declined, or something went wrong at the provider.
	pub error: Option<String>,
}

/// Query parameters for `GET /auth/error`.
#[derive(Debug, Default, Deserialize, utoipa::IntoParams)]
pub struct ErrorQuery
{
	/// The error code.
	pub error: Option<String>,
}

/// What is kept in the OAuth state cookie between the redirect to the
/// provider and its callback.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OAuthState
{
	/// The `state` parameter sent to the provider.
	pub state: String,

	/// The PKCE verifier.
	pub pkce_verifier: String,

	/// Where to go after signing in.
	pub callback_url: String,
}

impl Audience for OAuthState
{
	const AUDIENCE: &'static str = "oauth-state";
}

/// Error codes the engine redirects to `/auth/error` with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, utoipa::ToSchema)]
pub enum AuthErrorCode
{
	/// Email and password sign-in failed.
	CredentialsSignin,

	/// A `POST` action was missing a valid CSRF token.
	#[serde(rename = "MissingCSRF")]
	MissingCsrf,

	/// Starting an OAuth sign-in failed.
	OAuthSignin,

	/// Completing an OAuth sign-in failed.
	OAuthCallbackError,

	/// The provider account's email belongs to a user that is not linked to
	/// it.
	OAuthAccountNotLinked,

	/// The user declined at the provider.
	AccessDenied,

	/// The server is misconfigured.
	Configuration,

	/// Any other code.
	Default,
}

impl AuthErrorCode
{
	/// The code as it appears in URLs.
	pub const fn as_str(&self) -> &'static str
	{
		match self {
			Self::CredentialsSignin => "CredentialsSignin",
			Self::MissingCsrf => "MissingCSRF",
			Self::OAuthSignin => "OAuthSignin",
			Self::OAuthCallbackError => "OAuthCallbackError",
			Self::OAuthAccountNotLinked => "OAuthAccountNotLinked",
			Self::AccessDenied => "AccessDenied",
			Self::Configuration => "Configuration",
			Self::Default => "Default",
		}
	}

	/// Parses a code from a URL; unknown codes become [`Default`].
	///
	/// [`Default`]: AuthErrorCode::Default
	pub fn parse(code: &str) -> Self
	{
		[
			Self::CredentialsSignin,
			Self::MissingCsrf,
			Self::OAuthSignin,
			Self::OAuthCallbackError,
			Self::OAuthAccountNotLinked,
			Self::AccessDenied,
			Self::Configuration,
		]
		.into_iter()
		.find(|known| known.as_str() == code)
		.unwrap_or(Self::Default)
	}

	/// The status `GET /auth/error` responds with.
	pub const fn status(&self) -> StatusCode
	{
		match self {
			Self::Configuration => StatusCode::INTERNAL_SERVER_ERROR,
			Self::AccessDenied => StatusCode::FORBIDDEN,
			Self::CredentialsSignin => StatusCode::UNAUTHORIZED,
			Self::MissingCsrf
			| Self::OAuthSignin
			| Self::OAuthCallbackError
			| Self::OAuthAccountNotLinked
			| Self::Default => StatusCode::BAD_REQUEST,
		}
	}
}

/// Response payload for `GET /auth/error`.
#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct ErrorResponse
{
	/// The error code.
	pub error: AuthErrorCode,
}

impl IntoResponse for ErrorResponse
{
	fn into_response(self) -> Response
	{
		(self.error.status(), Json(self)).into_response()
	}
}

/// The JSON body of a redirect the client asked to receive as data.
#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct RedirectBody
{
	/// Where the client should navigate to.
	pub url: String,
}

/// The response of every action that ends in a redirect.
///
/// Clients that send `X-Auth-Return-Redirect: 1` get `200 {url}` instead of a
/// `302`, so they can navigate themselves.
#[derive(Debug)]
pub struct ActionResponse
{
	/// Cookies to set or remove.
	pub cookies: CookieJar,

	/// Where to go.
	pub url: String,

	/// Whether to answer with JSON.
	pub as_json: bool,
}

impl ActionResponse
{
	/// Creates a new [`ActionResponse`], honoring the request's preference
	/// for JSON.
	pub fn new(headers: &HeaderMap, cookies: CookieJar, url: String) -> Self
	{
		let as_json = headers
			.get(RETURN_REDIRECT_HEADER)
			.is_some_and(|value| value.as_bytes() == b"1" || value.as_bytes() == b"true");

		Self { cookies, url, as_json }
	}
}

impl IntoResponse for ActionResponse
{
	fn into_response(self) -> Response
	{
		if self.as_json {
			return (self.cookies, Json(RedirectBody { url: self.url })).into_response();
		}

		(StatusCode::FOUND, self.cookies, [(header::LOCATION, self.url)]).into_response()
	}
}
