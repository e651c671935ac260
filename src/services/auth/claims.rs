//! The claims carried inside session tokens, and the session view handed to
//! clients.
//!
//! Two functions shape them:
//!
//! - [`enrich_token()`] runs whenever a token is issued or refreshed, and
//!   records who the user is and how they signed in.
//! - [`project_session()`] runs whenever a client reads its session, and
//!   copies those facts into the [`ClientSession`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::token::Audience;

/// The provider recorded for users that signed in with email and password.
pub const CREDENTIALS_PROVIDER: &str = "credentials";

/// The payload of a session token.
///
/// Fields this type does not know about are kept in [`extra`] and survive
/// every refresh.
///
/// [`extra`]: SessionClaims::extra
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionClaims
{
	/// The user's display name.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub name: Option<String>,

	/// The user's email.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub email: Option<String>,

	/// The user's avatar URL.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub picture: Option<String>,

	/// The subject, i.e. the user's ID.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub sub: Option<String>,

	/// The user's ID.
	#[serde(rename = "userId", default, skip_serializing_if = "Option::is_none")]
	pub user_id: Option<String>,

	/// The provider the user signed in with.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub provider: Option<String>,

	/// Any other claims.
	#[serde(flatten)]
	pub extra: serde_json::Map<String, serde_json::Value>,
}

impl SessionClaims
{
	/// The default claims for a freshly signed in user.
	pub fn for_identity(identity: &Identity) -> Self
	{
		Self {
			name: identity.name.clone(),
			email: identity.email.clone(),
			picture: identity.image.clone(),
			sub: Some(identity.id.clone()),
			..Default::default()
		}
	}

	/// Whether these claims name a user.
	pub fn identifies_user(&self) -> bool
	{
		[&self.user_id, &self.sub]
			.into_iter()
			.flatten()
			.any(|id| !id.is_empty())
	}
}

impl Audience for SessionClaims
{
	const AUDIENCE: &'static str = "session";
}

/// A successfully authenticated user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity
{
	/// The user's ID.
	pub id: String,

	/// The user's display name.
	pub name: Option<String>,

	/// The user's email.
	pub email: Option<String>,

	/// The user's avatar URL.
	pub image: Option<String>,
}

impl From<crate::services::users::User> for Identity
{
	fn from(user: crate::services::users::User) -> Self
	{
		Self {
			id: user.id,
			name: Some(user.name),
			email: Some(user.email),
			image: user.image,
		}
	}
}

/// The external account a user signed in with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountInfo
{
	/// The provider's ID, e.g. `google`.
	pub provider: String,

	/// The user's ID at the provider.
	pub provider_account_id: String,
}

/// The session as seen by clients.
#[derive(Debug, Clone, PartialEq, Serialize, utoipa::ToSchema)]
pub struct ClientSession
{
	/// The signed in user.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub user: Option<SessionUser>,

	/// When the session expires.
	pub expires: DateTime<Utc>,
}

impl ClientSession
{
	/// The default view of a session with the given claims.
	pub fn from_claims(claims: &SessionClaims, expires: DateTime<Utc>) -> Self
	{
		let user = SessionUser {
			name: claims.name.clone(),
			email: claims.email.clone(),
			image: claims.picture.clone(),
			..Default::default()
		};

		Self { user: Some(user), expires }
	}
}

/// The user part of a [`ClientSession`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, utoipa::ToSchema)]
pub struct SessionUser
{
	/// The user's ID.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub id: Option<String>,

	/// The user's display name.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub name: Option<String>,

	/// The user's email.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub email: Option<String>,

	/// The user's avatar URL.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub image: Option<String>,

	/// The provider the user signed in with.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub provider: Option<String>,
}

/// Records the user's ID and provider on a token.
///
/// Nothing is ever removed. Without an account, a token that belongs to an
/// authenticated identity but has no provider yet is attributed to
/// [`CREDENTIALS_PROVIDER`].
pub fn enrich_token(
	mut claims: SessionClaims,
	identity: Option<&Identity>,
	account: Option<&AccountInfo>,
) -> SessionClaims
{
	if let Some(identity) = identity {
		claims.user_id = Some(identity.id.clone());
	}

	if let Some(account) = account {
		claims.provider = Some(account.provider.clone());
	} else if identity.is_some() && claims.provider.is_none() {
		claims.provider = Some(String::from(CREDENTIALS_PROVIDER));
	}

	claims
}

/// Copies the user's ID and provider from the token into the session.
///
/// Sessions without a user are returned untouched.
pub fn project_session(mut session: ClientSession, claims: &SessionClaims) -> ClientSession
{
	if let Some(user) = &mut session.user {
		if let Some(user_id) = &claims.user_id {
			user.id = Some(user_id.clone());
		}

		if let Some(provider) = &claims.provider {
			user.provider = Some(provider.clone());
		}
	}

	session
}

#[cfg(test)]
mod tests
{
	use super::*;

	fn identity() -> Identity
	{
		Identity {
			id: String::from("u-1"),
			name: Some(String::from("Alice")),
			email: Some(String::from("alice@example.com")),
			image: None,
		}
	}

	fn google() -> AccountInfo
	{
		AccountInfo {
			provider: String::from("google"),
			provider_account_id: String::from("g-1"),
		}
	}

	#[test]
	fn credentials_sign_in_is_attributed()
	{
		let claims = enrich_token(SessionClaims::for_identity(&identity()), Some(&identity()), None);

		assert_eq!(claims.user_id.as_deref(), Some("u-1"));
		assert_eq!(claims.provider.as_deref(), Some(CREDENTIALS_PROVIDER));
		assert_eq!(claims.sub.as_deref(), Some("u-1"));
	}

	#[test]
	fn provider_sign_in_records_the_provider()
	{
		let claims = enrich_token(SessionClaims::default(), Some(&identity()), Some(&google()));

		assert_eq!(claims.provider.as_deref(), Some("google"));
	}

	#[test]
	fn refresh_keeps_the_provider()
	{
		let signed_in = enrich_token(SessionClaims::default(), Some(&identity()), Some(&google()));
		let refreshed = enrich_token(signed_in.clone(), None, None);

		assert_eq!(refreshed, signed_in);
	}

	#[test]
	fn enrichment_never_removes_claims()
	{
		let mut claims = SessionClaims {
			provider: Some(String::from("google")),
			..Default::default()
		};

		claims
			.extra
			.insert(String::from("role"), serde_json::json!("admin"));

		let enriched = enrich_token(claims, Some(&identity()), None);

		assert_eq!(enriched.provider.as_deref(), Some("google"));
		assert_eq!(enriched.extra.get("role"), Some(&serde_json::json!("admin")));
	}

	#[test]
	fn unknown_claims_survive_a_round_trip()
	{
		let json = serde_json::json!({
			"name": "Alice",
			"userId": "u-1",
			"provider": "credentials",
			"theme": "dark",
		});

		let claims = serde_json::from_value::<SessionClaims>(json.clone()).map_err(|e| e.to_string());

		assert_eq!(claims.clone().map(|c| c.user_id), Ok(Some(String::from("u-1"))));
		assert_eq!(claims.and_then(|c| serde_json::to_value(c).map_err(|e| e.to_string())), Ok(json));
	}

	#[test]
	fn projection_attaches_id_and_provider()
	{
		let claims = enrich_token(SessionClaims::for_identity(&identity()), Some(&identity()), None);
		let session = project_session(ClientSession::from_claims(&claims, Utc::now()), &claims);
		let user = session.user.unwrap_or_default();

		assert_eq!(user.id.as_deref(), Some("u-1"));
		assert_eq!(user.provider.as_deref(), Some(CREDENTIALS_PROVIDER));
		assert_eq!(user.name.as_deref(), Some("Alice"));
	}

	#[test]
	fn projection_leaves_userless_sessions_alone()
	{
		let claims = enrich_token(SessionClaims::default(), Some(&identity()), None);
		let session = ClientSession { user: None, expires: Utc::now() };

		assert_eq!(project_session(session.clone(), &claims), session);
	}
}
