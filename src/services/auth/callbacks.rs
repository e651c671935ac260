//! Hooks the auth engine calls at fixed points of every flow.

use std::fmt;

use super::claims::{self, AccountInfo, ClientSession, Identity, SessionClaims};
use super::redirect::resolve_redirect;

/// Customization points of the auth engine.
pub trait AuthCallbacks: fmt::Debug + Send + Sync + 'static
{
	/// Shapes token claims.
	///
	/// Called with an identity (and, for OAuth, an account) on sign-in, and
	/// with neither whenever an existing token is refreshed.
	fn jwt(
		&self,
		claims: SessionClaims,
		identity: Option<&Identity>,
		account: Option<&AccountInfo>,
	) -> SessionClaims;

	/// Shapes the session view returned to clients.
	fn session(&self, session: ClientSession, claims: &SessionClaims) -> ClientSession;

	/// Decides where to redirect to after an action.
	fn redirect(&self, url: &str, base_url: &str) -> String;
}

/// The gateway's own [`AuthCallbacks`].
#[derive(Debug, Clone)]
pub struct GatewayCallbacks
{
	/// The client application's origin, which redirects may point to.
	cors_origin: Option<String>,
}

impl GatewayCallbacks
{
	/// Creates a new [`GatewayCallbacks`].
	pub fn new(cors_origin: Option<String>) -> Self
	{
		Self { cors_origin }
	}
}

impl AuthCallbacks for GatewayCallbacks
{
	fn jwt(
		&self,
		claims: SessionClaims,
		identity: Option<&Identity>,
		account: Option<&AccountInfo>,
	) -> SessionClaims
	{
		claims::enrich_token(claims, identity, account)
	}

	fn session(&self, session: ClientSession, claims: &SessionClaims) -> ClientSession
	{
		claims::project_session(session, claims)
	}

	fn redirect(&self, url: &str, base_url: &str) -> String
	{
		resolve_redirect(url, base_url, self.cors_origin.as_deref())
	}
}
