//! Request / Response types for this service.

use std::fmt;

use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::{DateTime, Utc};
use serde::Serialize;

use super::Error;

/// Request payload for registering a new user.
#[derive(Clone, utoipa::ToSchema)]
pub struct RegisterRequest
{
	/// The user's email address.
	///
	/// This is compared exactly; no case folding happens.
	pub email: String,

	/// The plaintext password.
	pub password: String,

	/// The display name.
	///
	/// Defaults to the local part of the email.
	pub name: Option<String>,
}

impl RegisterRequest
{
	/// Parses a registration body.
	///
	/// Anything other than a JSON object with non-empty string `email` and
	/// `password` fields is rejected. A `name` that is not a non-empty string
	/// is treated as absent.
	pub fn from_json(body: &[u8]) -> Result<Self, Error>
	{
		let Ok(serde_json::Value::Object(mut fields)) = serde_json::from_slice(body) else {
			return Err(Error::InvalidPayload);
		};

		let mut take = |field: &str| match fields.remove(field) {
			Some(serde_json::Value::String(value)) if !value.is_empty() => Some(value),
			_ => None,
		};

		let email = take("email").ok_or(Error::InvalidPayload)?;
		let password = take("password").ok_or(Error::InvalidPayload)?;
		let name = take("name");

		Ok(Self { email, password, name })
	}

	/// The name to store for this user.
	pub fn display_name(&self) -> String
	{
		self.name
			.clone()
			.unwrap_or_else(|| default_name(&self.email))
	}
}

impl fmt::Debug for RegisterRequest
{
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
	{
		f.debug_struct("RegisterRequest")
			.field("email", &self.email)
			.field("password", &"*****")
			.field("name", &self.name)
			.finish()
	}
}

/// Response payload for registering a new user.
#[derive(Debug, PartialEq, Eq, Serialize, utoipa::ToSchema, utoipa::IntoResponses)]
#[response(status = OK)]
pub struct RegisterResponse
{
	/// The new user's ID.
	pub id: String,

	/// The email the user registered with.
	pub email: String,

	/// The stored display name.
	pub name: String,
}

impl IntoResponse for RegisterResponse
{
	fn into_response(self) -> Response
	{
		Json(self).into_response()
	}
}

/// A row of the `users` table.
#[derive(Clone, sqlx::FromRow)]
pub struct User
{
	/// The user's ID.
	pub id: String,

	/// The user's email address.
	pub email: String,

	/// The user's display name.
	pub name: String,

	/// When the user's email was verified, if ever.
	pub email_verified: Option<DateTime<Utc>>,

	/// A URL to the user's avatar.
	pub image: Option<String>,

	/// The user's Argon2 password hash.
	///
	/// Users that only ever signed in through an OAuth provider do not have
	/// one.
	pub hashed_password: Option<String>,
}

impl fmt::Debug for User
{
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
	{
		f.debug_struct("User")
			.field("id", &self.id)
			.field("email", &self.email)
			.field("name", &self.name)
			.field("has_password", &self.hashed_password.is_some())
			.finish_non_exhaustive()
	}
}

/// An identity returned by an OAuth provider.
#[derive(Debug, Clone)]
pub struct OAuthProfile
{
	/// The provider's ID, e.g. `google`.
	pub provider: &'static str,

	/// The user's ID at the provider.
	pub provider_account_id: String,

	/// The email the provider reported.
	pub email: String,

	/// Whether the provider vouches for the email.
	pub email_verified: bool,

	/// The display name the provider reported.
	pub name: Option<String>,

	/// The avatar URL the provider reported.
	pub image: Option<String>,

	/// Tokens issued by the provider.
	pub tokens: AccountTokens,
}

/// OAuth tokens stored alongside an account link.
#[derive(Clone, Default)]
pub struct AccountTokens
{
	/// The access token.
	pub access_token: Option<String>,

	/// The refresh token.
	pub refresh_token: Option<String>,

	/// Unix timestamp of when the access token expires.
	pub expires_at: Option<i64>,

	/// The token type, usually `bearer`.
	pub token_type: Option<String>,

	/// The granted scopes.
	pub scope: Option<String>,

	/// The OpenID Connect ID token.
	pub id_token: Option<String>,
}

impl fmt::Debug for AccountTokens
{
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
	{
		f.debug_struct("AccountTokens")
			.field("token_type", &self.token_type)
			.field("scope", &self.scope)
			.field("expires_at", &self.expires_at)
			.finish_non_exhaustive()
	}
}

/// Derives a display name from an email address.
///
/// This is everything before the first `@`.
pub fn default_name(email: &str) -> String
{
	email
		.split_once('@')
		.map_or(email, |(local, _)| local)
		.to_owned()
}

#[cfg(test)]
mod tests
{
	use super::*;

	#[test]
	fn default_name_is_the_local_part()
	{
		assert_eq!(default_name("alice@example.com"), "alice");
		assert_eq!(default_name("a@b@c"), "a");
		assert_eq!(default_name("no-at-sign"), "no-at-sign");
	}

	#[test]
	fn payload_requires_email_and_password()
	{
		let rejected: &[&[u8]] = &[
			b"",
			b"not json",
			b"[]",
			b"null",
			br#"{"email":"a@b.c"}"#,
			br#"{"password":"pw"}"#,
			br#"{"email":"","password":"pw"}"#,
			br#"{"email":"a@b.c","password":""}"#,
			br#"{"email":42,"password":"pw"}"#,
		];

		for body in rejected {
			assert!(
				matches!(RegisterRequest::from_json(body), Err(Error::InvalidPayload)),
				"accepted {:?}",
				String::from_utf8_lossy(body),
			);
		}
	}

	#[test]
	fn empty_or_odd_names_are_ignored()
	{
		let req = RegisterRequest::from_json(br#"{"email":"bob@x.io","password":"pw","name":""}"#)
			.map_err(|error| error.to_string());

		assert_eq!(req.map(|req| req.display_name()), Ok(String::from("bob")));

		let req = RegisterRequest::from_json(br#"{"email":"bob@x.io","password":"pw","name":7}"#)
			.map_err(|error| error.to_string());

		assert_eq!(req.map(|req| req.display_name()), Ok(String::from("bob")));
	}
}
