//! The [`AuthService`] is the auth engine behind the `/auth` routes.
//!
//! Sessions are stateless: a signed [JWT] holding [`SessionClaims`] lives in
//! the session cookie, and is re-issued with a fresh expiry whenever a client
//! reads its session. Users sign in either with an email and password (see
//! [`CredentialAuthorizer`]) or through Google (see [`GoogleProvider`]).
//!
//! Every `POST` action is protected by a double-submit CSRF token obtained
//! from `GET /auth/csrf`. Cookie names and attributes come from the
//! [`CookiePolicy`]; the shape of tokens, sessions and redirect targets is
//! decided by the configured [`AuthCallbacks`].
//!
//! [JWT]: https://jwt.io

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use axum_extra::extract::cookie::Cookie;
use subtle::ConstantTimeEq;
use url::Url;

use crate::runtime::Config;
use crate::services::{PasswordService, UserService};

pub(crate) mod http;

mod error;
pub use error::{Error, Result, SetupError};

mod models;
pub use models::{
	ActionForm,
	ActionResponse,
	AuthErrorCode,
	CredentialsForm,
	CsrfResponse,
	ErrorQuery,
	ErrorResponse,
	OAuthCallbackQuery,
	OAuthState,
	ProvidersResponse,
	RedirectBody,
	RETURN_REDIRECT_HEADER,
};

pub mod cookies;
pub use cookies::{CookiePolicy, CookieSpec};

pub mod csrf;
pub use csrf::CsrfToken;

pub mod claims;
pub use claims::{AccountInfo, ClientSession, Identity, SessionClaims, SessionUser};

pub mod callbacks;
pub use callbacks::{AuthCallbacks, GatewayCallbacks};

pub mod redirect;
pub use redirect::resolve_redirect;

pub mod credentials;
pub use credentials::{CredentialAttempt, CredentialAuthorizer};

pub mod token;
pub use token::{Audience, Jwt, JwtCodec};

pub mod providers;
pub use providers::{GoogleProvider, ProviderInfo, ProviderKind};

/// How long the OAuth state cookie stays valid.
const OAUTH_STATE_MAX_AGE: Duration = Duration::from_secs(15 * 60);

/// A service for signing users in and out.
#[derive(Clone)]
pub struct AuthService
{
	/// Immutable engine configuration.
	state: Arc<EngineState>,

	/// Validates email and password sign-ins.
	credentials: CredentialAuthorizer,

	/// For creating users on their first OAuth sign-in.
	users: UserService,

	/// Google sign-in, if configured.
	google: Option<GoogleProvider>,
}

/// The parts of [`AuthService`] that never change after startup.
struct EngineState
{
	/// The canonical origin of the gateway.
	base_url: String,

	/// `{base_url}/auth`.
	auth_base: String,

	/// Secret for hashing CSRF tokens.
	secret: String,

	/// Cookie names and attributes.
	cookies: CookiePolicy,

	/// Signs and verifies session and state tokens.
	tokens: JwtCodec,

	/// How long a session lasts after it was last read.
	session_max_age: Duration,

	/// Shapes tokens, sessions and redirects.
	callbacks: Arc<dyn AuthCallbacks>,
}

impl fmt::Debug for AuthService
{
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
	{
		f.debug_struct("AuthService")
			.field("base_url", &self.state.base_url)
			.field("cookies", &self.state.cookies)
			.field("callbacks", &self.state.callbacks)
			.field("google", &self.google.is_some())
			.finish_non_exhaustive()
	}
}

impl AuthService
{
	/// Create a new [`AuthService`].
	#[tracing::instrument(skip(config, callbacks), err(Debug))]
	pub fn new(
		config: &Config,
		users: UserService,
		passwords: PasswordService,
		http_client: reqwest::Client,
		callbacks: Arc<dyn AuthCallbacks>,
	) -> Result<Self, SetupError>
	{
		let base_url = config.base_url();
		let auth_base = providers::auth_base(&base_url);

		let google = match &config.google {
			None => None,
			Some(credentials) => {
				let callback_url = providers::google_callback_url(&base_url)?;
				Some(GoogleProvider::new(credentials, callback_url, http_client)?)
			}
		};

		let cookies = CookiePolicy::resolve(
			config.auth_url.as_str(),
			config.cors_origin.as_deref(),
			config.cookie_domain.as_deref(),
		);

		tracing::debug!(?cookies, google = google.is_some(), "resolved auth configuration");

		let state = Arc::new(EngineState {
			base_url,
			auth_base,
			secret: config.auth_secret.clone(),
			cookies,
			tokens: JwtCodec::new(&config.auth_secret),
			session_max_age: config.session_max_age,
			callbacks,
		});

		Ok(Self {
			state,
			credentials: CredentialAuthorizer::new(users.clone(), passwords),
			users,
			google,
		})
	}

	/// The resolved cookie policy.
	pub fn cookies(&self) -> &CookiePolicy
	{
		&self.state.cookies
	}

	/// A session cookie carrying `token`.
	pub fn session_cookie(&self, token: String) -> Cookie<'static>
	{
		self.state
			.cookies
			.session
			.build_with_max_age(token, max_age(self.state.session_max_age))
	}

	/// An OAuth state cookie carrying `value`.
	pub fn oauth_state_cookie(&self, value: String) -> Cookie<'static>
	{
		self.state
			.cookies
			.oauth_state
			.build_with_max_age(value, max_age(OAUTH_STATE_MAX_AGE))
	}

	/// Whether Google sign-in is configured.
	pub fn has_google(&self) -> bool
	{
		self.google.is_some()
	}

	/// The URL of the error endpoint for `code`.
	pub fn error_url(&self, code: AuthErrorCode) -> String
	{
		format!("{}/error?error={}", self.state.auth_base, code.as_str())
	}

	/// Returns the CSRF token from `cookie_value` if it is valid, or a new
	/// one.
	///
	/// The flag is `true` if the token is new and has to be set as a cookie.
	pub fn csrf_token(&self, cookie_value: Option<&str>) -> (CsrfToken, bool)
	{
		match cookie_value.and_then(|value| CsrfToken::from_cookie(value, &self.state.secret)) {
			Some(token) => (token, false),
			None => (CsrfToken::generate(&self.state.secret), true),
		}
	}

	/// Checks a submitted CSRF token against the CSRF cookie.
	#[tracing::instrument(level = "debug", skip_all, ret(level = "debug"))]
	pub fn verify_csrf(&self, cookie_value: Option<&str>, submitted: Option<&str>) -> bool
	{
		let Some(submitted) = submitted.filter(|token| !token.is_empty()) else {
			return false;
		};

		cookie_value
			.and_then(|value| CsrfToken::from_cookie(value, &self.state.secret))
			.is_some_and(|token| token.matches(submitted))
	}

	/// Lists the configured sign-in providers.
	pub fn providers(&self) -> ProvidersResponse
	{
		let auth_base = &self.state.auth_base;
		let mut listed = BTreeMap::new();

		listed.insert(
			providers::CREDENTIALS,
			ProviderInfo::new(providers::CREDENTIALS, "Credentials", ProviderKind::Credentials, auth_base),
		);

		if self.google.is_some() {
			listed.insert(
				providers::google::ID,
				ProviderInfo::new(providers::google::ID, "Google", ProviderKind::Oauth, auth_base),
			);
		}

		listed
	}

	/// Resolves where to redirect to after an action.
	///
	/// Without a requested URL, this is the base URL.
	pub fn redirect_target(&self, url: Option<&str>) -> String
	{
		let base_url = &self.state.base_url;
		let url = url.filter(|url| !url.is_empty()).unwrap_or(base_url);

		self.state.callbacks.redirect(url, base_url)
	}

	/// Authenticates an email and password.
	#[tracing::instrument(level = "debug", skip(self), ret(level = "debug"))]
	pub async fn sign_in_with_credentials(&self, attempt: &CredentialAttempt) -> Option<Identity>
	{
		let identity = self.credentials.authorize(attempt).await;

		match &identity {
			Some(identity) => tracing::info! {
				target: "auth_gateway::audit_log",
				{ user.id = %identity.id, provider = providers::CREDENTIALS },
				"user signed in",
			},
			None => tracing::info! {
				target: "auth_gateway::audit_log",
				provider = providers::CREDENTIALS,
				"rejected sign-in attempt",
			},
		}

		identity
	}

	/// Issues a session token for a freshly signed in user.
	#[tracing::instrument(level = "debug", skip(self), err(Debug, level = "debug"))]
	pub fn issue_session(&self, identity: &Identity, account: Option<&AccountInfo>) -> Result<String>
	{
		let claims = self.state.callbacks.jwt(
			SessionClaims::for_identity(identity),
			Some(identity),
			account,
		);

		self.encode(&Jwt::new(claims, self.state.session_max_age))
	}

	/// Reads a session token.
	///
	/// Returns the client's view of the session and a re-issued token with a
	/// fresh expiry, or [`None`] if the token is invalid or expired.
	#[tracing::instrument(level = "debug", skip_all)]
	pub fn read_session(&self, token: &str) -> Option<(ClientSession, String)>
	{
		let claims = match self.state.tokens.decode::<SessionClaims>(token) {
			Ok(jwt) => jwt.into_payload(),
			Err(error) => {
				tracing::debug!(%error, "rejecting session token");
				return None;
			}
		};

		if !claims.identifies_user() {
			tracing::debug!("rejecting session token without a user");
			return None;
		}

		let claims = self.state.callbacks.jwt(claims, None, None);
		let refreshed = Jwt::new(claims, self.state.session_max_age);
		let token = match self.encode(&refreshed) {
			Ok(token) => token,
			Err(error) => {
				tracing::error!(%error, "failed to refresh session token");
				return None;
			}
		};

		let session = ClientSession::from_claims(refreshed.payload(), refreshed.expires_on());
		let session = self.state.callbacks.session(session, refreshed.payload());

		Some((session, token))
	}

	/// Returns the user ID in a session token, if it is valid.
	pub fn session_user_id(&self, token: &str) -> Option<String>
	{
		self.state
			.tokens
			.decode::<SessionClaims>(token)
			.ok()
			.and_then(|jwt| jwt.into_payload().user_id)
	}

	/// Starts a Google sign-in.
	///
	/// Returns the URL to send the user to, and the value of the OAuth state
	/// cookie.
	#[tracing::instrument(level = "debug", skip(self), err(Debug, level = "debug"))]
	pub fn start_google_sign_in(&self, callback_url: String) -> Result<(Url, String)>
	{
		let google = self.google()?;
		let request = google.authorization_request();
		let state = OAuthState {
			state: request.state.secret().clone(),
			pkce_verifier: request.pkce_verifier.secret().clone(),
			callback_url,
		};

		let cookie = self.encode(&Jwt::new(state, OAUTH_STATE_MAX_AGE))?;

		Ok((request.url, cookie))
	}

	/// Completes a Google sign-in.
	///
	/// `state_cookie` is the value of the OAuth state cookie set by
	/// [`start_google_sign_in()`]. Returns the session token and where to
	/// redirect to.
	///
	/// [`start_google_sign_in()`]: AuthService::start_google_sign_in
	#[tracing::instrument(level = "debug", skip_all, err(Debug, level = "debug"))]
	pub async fn finish_google_sign_in(
		&self,
		query: OAuthCallbackQuery,
		state_cookie: Option<&str>,
	) -> Result<(String, String), AuthErrorCode>
	{
		let google = self.google().map_err(|_| AuthErrorCode::Configuration)?;

		if let Some(error) = query.error {
			tracing::debug!(%error, "provider returned an error");

			return Err(if error == "access_denied" {
				AuthErrorCode::AccessDenied
			} else {
				AuthErrorCode::OAuthCallbackError
			});
		}

		let (Some(code), Some(returned_state), Some(state_cookie)) =
			(query.code, query.state, state_cookie)
		else {
			return Err(AuthErrorCode::OAuthCallbackError);
		};

		let state = self
			.state
			.tokens
			.decode::<OAuthState>(state_cookie)
			.map_err(|_| AuthErrorCode::OAuthCallbackError)?
			.into_payload();

		if !bool::from(state.state.as_bytes().ct_eq(returned_state.as_bytes())) {
			tracing::debug!("oauth state mismatch");
			return Err(AuthErrorCode::OAuthCallbackError);
		}

		let profile = google
			.exchange(code, state.pkce_verifier)
			.await
			.map_err(|error| {
				tracing::warn!(%error, "google sign-in failed");
				AuthErrorCode::OAuthCallbackError
			})?;

		let account = AccountInfo {
			provider: String::from(profile.provider),
			provider_account_id: profile.provider_account_id.clone(),
		};

		let user = self
			.users
			.sign_in_with_provider(profile)
			.await
			.map_err(|error| match error {
				crate::services::users::Error::AccountNotLinked => AuthErrorCode::OAuthAccountNotLinked,
				error => {
					tracing::error!(%error, "failed to resolve provider account");
					AuthErrorCode::OAuthCallbackError
				}
			})?;

		let identity = Identity::from(user);
		let token = self.issue_session(&identity, Some(&account)).map_err(|error| {
			tracing::error!(%error, "failed to issue session");
			AuthErrorCode::Configuration
		})?;

		tracing::info! {
			target: "auth_gateway::audit_log",
			{ user.id = %identity.id, provider = %account.provider },
			"user signed in",
		};

		Ok((token, self.redirect_target(Some(&state.callback_url))))
	}

	/// Returns the Google provider, or [`Error::UnknownAction`].
	fn google(&self) -> Result<&GoogleProvider>
	{
		self.google.as_ref().ok_or_else(|| Error::UnknownAction {
			action: String::from("signin/google"),
		})
	}

	/// Signs a token.
	fn encode<T>(&self, jwt: &Jwt<T>) -> Result<String>
	where
		T: serde::Serialize,
	{
		self.state
			.tokens
			.encode(jwt)
			.map_err(|source| Error::EncodeJwt { source })
	}
}

/// Converts a [`std::time::Duration`] into a cookie `Max-Age`.
fn max_age(duration: Duration) -> time::Duration
{
	time::Duration::try_from(duration).unwrap_or(time::Duration::MAX)
}

#[cfg(test)]
mod tests
{
	use super::*;
	use crate::testing;

	#[tokio::test]
	async fn sessions_refresh_and_keep_their_claims() -> color_eyre::Result<()>
	{
		let svc = testing::auth_svc(testing::database().await?, testing::config("http://localhost:8787"))?;
		let identity = Identity {
			id: String::from("u-1"),
			name: Some(String::from("Alice")),
			email: Some(String::from("alice@example.com")),
			image: None,
		};

		let token = svc.issue_session(&identity, None)?;
		let Some((session, refreshed)) = svc.read_session(&token) else {
			color_eyre::eyre::bail!("valid token was rejected");
		};

		let user = session.user.unwrap_or_default();

		testing::assert_eq!(user.id.as_deref(), Some("u-1"));
		testing::assert_eq!(user.provider.as_deref(), Some("credentials"));
		testing::assert_eq!(user.email.as_deref(), Some("alice@example.com"));
		testing::assert_eq!(svc.session_user_id(&refreshed).as_deref(), Some("u-1"));

		Ok(())
	}

	#[tokio::test]
	async fn garbage_sessions_are_rejected() -> color_eyre::Result<()>
	{
		let svc = testing::auth_svc(testing::database().await?, testing::config("http://localhost:8787"))?;

		testing::assert!(svc.read_session("not.a.token").is_none());
		testing::assert!(svc.read_session("").is_none());

		Ok(())
	}

	#[tokio::test]
	async fn only_session_tokens_for_a_user_are_sessions() -> color_eyre::Result<()>
	{
		let mut config = testing::config("http://localhost:8787");
		config.google = Some(crate::runtime::config::GoogleCredentials {
			client_id: String::from("client-id"),
			client_secret: String::from("client-secret"),
		});

		let svc = testing::auth_svc(testing::database().await?, config)?;
		let (_, state_cookie) = svc.start_google_sign_in(String::from("/x"))?;

		testing::assert!(svc.read_session(&state_cookie).is_none());
		testing::assert!(svc.session_user_id(&state_cookie).is_none());

		let anonymous = svc.encode(&Jwt::new(SessionClaims::default(), Duration::from_secs(60)))?;

		testing::assert!(svc.read_session(&anonymous).is_none());

		Ok(())
	}

	#[tokio::test]
	async fn providers_are_listed_per_configuration() -> color_eyre::Result<()>
	{
		let database = testing::database().await?;
		let mut config = testing::config("http://localhost:8787");
		let without_google = testing::auth_svc(database.clone(), config.clone())?;

		testing::assert_eq!(without_google.providers().keys().copied().collect::<Vec<_>>(), vec!["credentials"]);

		config.google = Some(crate::runtime::config::GoogleCredentials {
			client_id: String::from("client-id"),
			client_secret: String::from("client-secret"),
		});

		let with_google = testing::auth_svc(database, config)?;
		let providers = with_google.providers();

		testing::assert_eq!(providers.keys().copied().collect::<Vec<_>>(), vec!["credentials", "google"]);
		testing::assert_eq!(with_google.providers(), providers);

		Ok(())
	}

	#[tokio::test]
	async fn csrf_tokens_are_reused_while_valid() -> color_eyre::Result<()>
	{
		let svc = testing::auth_svc(testing::database().await?, testing::config("http://localhost:8787"))?;
		let (issued, is_new) = svc.csrf_token(None);

		testing::assert!(is_new);

		let (reused, is_new) = svc.csrf_token(Some(issued.cookie_value()));

		testing::assert!(!is_new);
		testing::assert_eq!(reused.token(), issued.token());
		testing::assert!(svc.verify_csrf(Some(issued.cookie_value()), Some(issued.token())));
		testing::assert!(!svc.verify_csrf(Some(issued.cookie_value()), None));
		testing::assert!(!svc.verify_csrf(None, Some(issued.token())));

		Ok(())
	}

	#[tokio::test]
	async fn google_state_is_checked() -> color_eyre::Result<()>
	{
		let mut config = testing::config("http://localhost:8787");
		config.google = Some(crate::runtime::config::GoogleCredentials {
			client_id: String::from("client-id"),
			client_secret: String::from("client-secret"),
		});

		let svc = testing::auth_svc(testing::database().await?, config)?;
		let (url, cookie) = svc.start_google_sign_in(String::from("/after"))?;

		testing::assert!(url.as_str().starts_with("https://accounts.google.com/"));
		testing::assert!(url.query_pairs().any(|(key, _)| key == "code_challenge"));

		let query = OAuthCallbackQuery {
			code: Some(String::from("code")),
			state: Some(String::from("forged")),
			error: None,
		};

		let result = svc.finish_google_sign_in(query, Some(cookie.as_str())).await;

		testing::assert_matches!(result, Err(AuthErrorCode::OAuthCallbackError));

		let declined = OAuthCallbackQuery {
			error: Some(String::from("access_denied")),
			..Default::default()
		};

		let result = svc.finish_google_sign_in(declined, Some(cookie.as_str())).await;

		testing::assert_matches!(result, Err(AuthErrorCode::AccessDenied));

		Ok(())
	}
}
