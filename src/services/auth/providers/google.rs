//! Google sign-in.
//!
//! This is the OAuth 2.0 authorization code flow with PKCE. The user is
//! redirected to [`GoogleProvider::authorization_request()`]'s URL, and
//! Google sends them back to `/auth/callback/google` with a code, which
//! [`GoogleProvider::exchange()`] turns into a profile.

use std::fmt;

use oauth2::basic::BasicClient;
use oauth2::{
	AuthUrl,
	AuthorizationCode,
	ClientId,
	ClientSecret,
	CsrfToken,
	EndpointNotSet,
	EndpointSet,
	PkceCodeChallenge,
	PkceCodeVerifier,
	RedirectUrl,
	Scope,
	TokenResponse,
	TokenUrl,
};
use serde::Deserialize;
use thiserror::Error;
use url::Url;

use crate::runtime::config::GoogleCredentials;
use crate::services::users::{AccountTokens, OAuthProfile};

/// The provider ID.
pub const ID: &str = "google";

/// Google's authorization endpoint.
const AUTH_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";

/// Google's token endpoint.
const TOKEN_URL: &str = "https://oauth2.googleapis.com/token";

/// Google's userinfo endpoint.
const USERINFO_URL: &str = "https://www.googleapis.com/oauth2/v2/userinfo";

/// OAuth client type with auth URL and token URL set.
type ConfiguredClient = oauth2::Client<
	oauth2::basic::BasicErrorResponse,
	oauth2::basic::BasicTokenResponse,
	oauth2::basic::BasicTokenIntrospectionResponse,
	oauth2::StandardRevocableToken,
	oauth2::basic::BasicRevocationErrorResponse,
	EndpointSet,
	EndpointNotSet,
	EndpointNotSet,
	EndpointNotSet,
	EndpointSet,
>;

/// The errors that can occur during Google sign-in.
#[derive(Debug, Error)]
pub enum Error
{
	/// A hardcoded or configured URL did not parse.
	#[error("invalid oauth url: {0}")]
	Url(#[from] oauth2::url::ParseError),

	/// Building the HTTP client failed.
	#[error("failed to build http client")]
	HttpClient(#[source] reqwest::Error),

	/// Google rejected the authorization code.
	#[error("failed to exchange authorization code: {0}")]
	Exchange(String),

	/// Fetching the user's profile failed.
	#[error("failed to fetch google profile")]
	Userinfo(#[from] reqwest::Error),
}

/// The profile returned by Google's userinfo endpoint.
#[derive(Debug, Deserialize)]
struct GoogleUser
{
	/// The user's Google ID.
	id: String,

	/// The user's email.
	email: String,

	/// Whether Google verified the email.
	#[serde(default)]
	verified_email: bool,

	/// The user's display name.
	name: Option<String>,

	/// The user's avatar URL.
	picture: Option<String>,
}

/// A started authorization request.
#[derive(Debug)]
pub struct AuthorizationRequest
{
	/// Where to send the user.
	pub url: Url,

	/// The `state` parameter Google will echo back.
	pub state: CsrfToken,

	/// The PKCE verifier for the code exchange.
	pub pkce_verifier: PkceCodeVerifier,
}

/// Google as an OAuth provider.
#[derive(Clone)]
pub struct GoogleProvider
{
	/// The OAuth client.
	client: ConfiguredClient,

	/// HTTP client for the code exchange. Does not follow redirects.
	http_client: reqwest::Client,

	/// HTTP client for the userinfo endpoint.
	api_client: reqwest::Client,

	/// The URL Google redirects back to.
	callback_url: Url,
}

impl fmt::Debug for GoogleProvider
{
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
	{
		f.debug_struct("GoogleProvider")
			.field("callback_url", &format_args!("{}", self.callback_url))
			.finish_non_exhaustive()
	}
}

impl GoogleProvider
{
	/// Creates a new [`GoogleProvider`] that redirects back to
	/// `callback_url`.
	#[tracing::instrument(err(Debug))]
	pub fn new(
		credentials: &GoogleCredentials,
		callback_url: Url,
		api_client: reqwest::Client,
	) -> Result<Self, Error>
	{
		let client = BasicClient::new(ClientId::new(credentials.client_id.clone()))
			.set_client_secret(ClientSecret::new(credentials.client_secret.clone()))
			.set_auth_uri(AuthUrl::new(AUTH_URL.to_owned())?)
			.set_token_uri(TokenUrl::new(TOKEN_URL.to_owned())?)
			.set_redirect_uri(RedirectUrl::new(callback_url.to_string())?);

		let http_client = reqwest::ClientBuilder::new()
			.redirect(reqwest::redirect::Policy::none())
			.build()
			.map_err(Error::HttpClient)?;

		Ok(Self { client, http_client, api_client, callback_url })
	}

	/// Builds the URL that starts the sign-in, with fresh state and PKCE.
	#[tracing::instrument(level = "debug")]
	pub fn authorization_request(&self) -> AuthorizationRequest
	{
		let (pkce_challenge, pkce_verifier) = PkceCodeChallenge::new_random_sha256();
		let (url, state) = self
			.client
			.authorize_url(CsrfToken::new_random)
			.add_scope(Scope::new(String::from("openid")))
			.add_scope(Scope::new(String::from("email")))
			.add_scope(Scope::new(String::from("profile")))
			.set_pkce_challenge(pkce_challenge)
			.url();

		AuthorizationRequest { url, state, pkce_verifier }
	}

	/// Exchanges an authorization code and fetches the user's profile.
	#[tracing::instrument(level = "debug", skip_all, err(Debug, level = "debug"))]
	pub async fn exchange(&self, code: String, pkce_verifier: String) -> Result<OAuthProfile, Error>
	{
		let token = self
			.client
			.exchange_code(AuthorizationCode::new(code))
			.set_pkce_verifier(PkceCodeVerifier::new(pkce_verifier))
			.request_async(&self.http_client)
			.await
			.map_err(|error| Error::Exchange(error.to_string()))?;

		let user = self
			.api_client
			.get(USERINFO_URL)
			.bearer_auth(token.access_token().secret())
			.send()
			.await?
			.error_for_status()?
			.json::<GoogleUser>()
			.await?;

		let expires_at = token
			.expires_in()
			.and_then(|expires_in| i64::try_from(expires_in.as_secs()).ok())
			.map(|secs| chrono::Utc::now().timestamp().saturating_add(secs));

		let tokens = AccountTokens {
			access_token: Some(token.access_token().secret().clone()),
			refresh_token: token.refresh_token().map(|token| token.secret().clone()),
			expires_at,
			token_type: Some(token.token_type().as_ref().to_owned()),
			scope: token.scopes().map(|scopes| {
				scopes
					.iter()
					.map(|scope| scope.as_str())
					.collect::<Vec<_>>()
					.join(" ")
			}),
			id_token: None,
		};

		Ok(OAuthProfile {
			provider: ID,
			provider_account_id: user.id,
			email: user.email,
			email_verified: user.verified_email,
			name: user.name,
			image: user.picture,
			tokens,
		})
	}
}
