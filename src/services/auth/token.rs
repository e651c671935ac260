//! Signed tokens.
//!
//! Session tokens, and the short-lived OAuth state, are [JWT]s signed with
//! HS256 using the auth secret. Every payload type has its own [`Audience`],
//! so a token of one kind never decodes as another.
//!
//! [JWT]: https://jwt.io

use std::time::Duration;
use std::{fmt, ops};

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A payload that can be carried in a [`Jwt`].
pub trait Audience
{
	/// The `aud` claim of tokens carrying this payload.
	const AUDIENCE: &'static str;
}

/// A JWT.
#[derive(Clone, Serialize, Deserialize)]
pub struct Jwt<T>
{
	/// The payload to encode in the token.
	#[serde(flatten)]
	payload: T,

	/// Timestamp (in seconds) of when this token was issued.
	#[serde(rename = "iat")]
	issued_at: u64,

	/// Timestamp (in seconds) of when this token will expire.
	#[serde(rename = "exp")]
	expiration_timestamp: u64,

	/// Unique token ID.
	jti: Uuid,

	/// What kind of token this is.
	#[serde(rename = "aud")]
	audience: String,
}

impl<T> Jwt<T>
where
	T: Audience,
{
	/// Creates a new [`Jwt`] that is valid for `expires_after`.
	pub fn new(payload: T, expires_after: Duration) -> Self
	{
		let now = jwt::get_current_timestamp();

		Self {
			payload,
			issued_at: now,
			expiration_timestamp: now.saturating_add(expires_after.as_secs()),
			jti: Uuid::new_v4(),
			audience: String::from(T::AUDIENCE),
		}
	}
}

impl<T> Jwt<T>
{
	/// Returns a reference to the inner payload.
	pub fn payload(&self) -> &T
	{
		&self.payload
	}

	/// Returns the inner payload.
	pub fn into_payload(self) -> T
	{
		self.payload
	}

	/// Returns a [`chrono::DateTime`] of when this token will expire.
	pub fn expires_on(&self) -> DateTime<Utc>
	{
		i64::try_from(self.expiration_timestamp)
			.ok()
			.and_then(|secs| DateTime::from_timestamp(secs, 0))
			.unwrap_or_default()
	}
}

impl<T> fmt::Debug for Jwt<T>
where
	T: fmt::Debug,
{
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
	{
		f.debug_struct("Jwt")
			.field("payload", self.payload())
			.field("jti", &format_args!("{}", self.jti))
			.field("expires_on", &format_args!("{}", self.expires_on().format("%Y/%m/%d %H:%M:%S")))
			.finish()
	}
}

impl<T> ops::Deref for Jwt<T>
{
	type Target = T;

	fn deref(&self) -> &Self::Target
	{
		self.payload()
	}
}

/// Keys and settings for signing and verifying [`Jwt`]s.
#[derive(Clone)]
pub struct JwtCodec
{
	/// Header of every token we sign.
	header: jwt::Header,

	/// Key for signing.
	encoding_key: jwt::EncodingKey,

	/// Key for verifying.
	decoding_key: jwt::DecodingKey,

	/// Validation rules for decoding.
	validation: jwt::Validation,
}

impl fmt::Debug for JwtCodec
{
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
	{
		f.debug_struct("JwtCodec")
			.field("algorithm", &self.header.alg)
			.finish_non_exhaustive()
	}
}

impl JwtCodec
{
	/// Creates a new [`JwtCodec`] from the raw bytes of `secret`.
	pub fn new(secret: &str) -> Self
	{
		let algorithm = jwt::Algorithm::HS256;
		let mut validation = jwt::Validation::new(algorithm);
		validation.leeway = 0;
		validation.set_required_spec_claims(&["exp", "iat", "aud"]);

		Self {
			header: jwt::Header::new(algorithm),
			encoding_key: jwt::EncodingKey::from_secret(secret.as_bytes()),
			decoding_key: jwt::DecodingKey::from_secret(secret.as_bytes()),
			validation,
		}
	}

	/// Encode a JWT into a string.
	#[tracing::instrument(level = "debug", skip_all, err(Debug, level = "debug"))]
	pub fn encode<T>(&self, token: &Jwt<T>) -> jwt::errors::Result<String>
	where
		T: Serialize,
	{
		jwt::encode(&self.header, token, &self.encoding_key)
	}

	/// Decode and verify a string as a JWT.
	///
	/// Expired tokens, tokens signed with another key, and tokens issued for
	/// another [`Audience`] are rejected.
	#[tracing::instrument(level = "debug", skip_all, fields(aud = T::AUDIENCE), err(Debug, level = "debug"))]
	pub fn decode<T>(&self, token: &str) -> jwt::errors::Result<Jwt<T>>
	where
		T: DeserializeOwned + Audience,
	{
		let mut validation = self.validation.clone();
		validation.set_audience(&[T::AUDIENCE]);

		jwt::decode(token, &self.decoding_key, &validation).map(|data| data.claims)
	}
}

#[cfg(test)]
mod tests
{
	use super::*;
	use crate::services::auth::{OAuthState, SessionClaims};
	use crate::testing;

	#[test]
	fn tokens_verify_with_the_same_secret() -> color_eyre::Result<()>
	{
		let codec = JwtCodec::new("secret");
		let claims = SessionClaims {
			user_id: Some(String::from("u-1")),
			..Default::default()
		};

		let token = codec.encode(&Jwt::new(claims.clone(), Duration::from_secs(60)))?;
		let decoded = codec.decode::<SessionClaims>(&token)?;

		testing::assert_eq!(decoded.payload(), &claims);
		testing::assert!(JwtCodec::new("other").decode::<SessionClaims>(&token).is_err());

		Ok(())
	}

	#[test]
	fn reserved_claims_stay_out_of_the_payload() -> color_eyre::Result<()>
	{
		let codec = JwtCodec::new("secret");
		let token = codec.encode(&Jwt::new(SessionClaims::default(), Duration::from_secs(60)))?;
		let decoded = codec.decode::<SessionClaims>(&token)?;

		testing::assert!(decoded.extra.is_empty(), "{:?}", decoded.extra);

		Ok(())
	}

	#[test]
	fn expired_tokens_are_rejected() -> color_eyre::Result<()>
	{
		let codec = JwtCodec::new("secret");
		let mut expired = Jwt::new(SessionClaims::default(), Duration::ZERO);
		expired.expiration_timestamp = expired.issued_at.saturating_sub(10);

		let token = codec.encode(&expired)?;

		testing::assert!(codec.decode::<SessionClaims>(&token).is_err());

		Ok(())
	}

	#[test]
	fn tokens_only_decode_as_their_own_kind() -> color_eyre::Result<()>
	{
		let codec = JwtCodec::new("secret");
		let state = OAuthState {
			state: String::from("state"),
			pkce_verifier: String::from("verifier"),
			callback_url: String::from("/x"),
		};

		let token = codec.encode(&Jwt::new(state, Duration::from_secs(60)))?;

		testing::assert!(codec.decode::<OAuthState>(&token).is_ok());
		testing::assert!(codec.decode::<SessionClaims>(&token).is_err());

		Ok(())
	}
}
