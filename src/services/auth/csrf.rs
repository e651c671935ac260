//! Double-submit CSRF tokens.
//!
//! The CSRF cookie holds `token|hash`, where `hash` is the hex-encoded SHA-256
//! of the token concatenated with the auth secret. Forms submit the bare
//! token, which must match the one in a cookie whose hash checks out.

use std::fmt;

use rand::RngCore;
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

/// Number of random bytes in a token.
const TOKEN_BYTES: usize = 32;

/// A CSRF token together with its cookie value.
#[derive(Clone, PartialEq, Eq)]
pub struct CsrfToken
{
	/// The token that is handed to clients.
	token: String,

	/// `token|hash`.
	cookie_value: String,
}

impl fmt::Debug for CsrfToken
{
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
	{
		f.debug_struct("CsrfToken").finish_non_exhaustive()
	}
}

impl CsrfToken
{
	/// Generates a fresh token.
	pub fn generate(secret: &str) -> Self
	{
		let mut bytes = [0_u8; TOKEN_BYTES];
		rand::thread_rng().fill_bytes(&mut bytes);

		let token = hex::encode(bytes);
		let cookie_value = format!("{token}|{}", hash(&token, secret));

		Self { token, cookie_value }
	}

	/// Restores a token from a cookie value.
	///
	/// Returns [`None`] if the cookie is malformed or was not produced with
	/// `secret`.
	pub fn from_cookie(cookie_value: &str, secret: &str) -> Option<Self>
	{
		let (token, cookie_hash) = cookie_value.split_once('|')?;
		let expected = hash(token, secret);

		if !bool::from(expected.as_bytes().ct_eq(cookie_hash.as_bytes())) {
			return None;
		}

		Some(Self {
			token: token.to_owned(),
			cookie_value: cookie_value.to_owned(),
		})
	}

	/// The token to hand to clients.
	pub fn token(&self) -> &str
	{
		&self.token
	}

	/// The value to store in the CSRF cookie.
	pub fn cookie_value(&self) -> &str
	{
		&self.cookie_value
	}

	/// Checks a submitted token against this one.
	pub fn matches(&self, submitted: &str) -> bool
	{
		self.token.as_bytes().ct_eq(submitted.as_bytes()).into()
	}
}

/// Hashes a token with the auth secret.
fn hash(token: &str, secret: &str) -> String
{
	let mut hasher = Sha256::new();
	hasher.update(token.as_bytes());
	hasher.update(secret.as_bytes());

	hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests
{
	use super::*;

	const SECRET: &str = "test-secret";

	#[test]
	fn issued_tokens_verify()
	{
		let issued = CsrfToken::generate(SECRET);
		let restored = CsrfToken::from_cookie(issued.cookie_value(), SECRET);

		assert_eq!(restored.as_ref(), Some(&issued));
		assert!(issued.matches(issued.token()));
		assert_eq!(issued.token().len(), TOKEN_BYTES * 2);
	}

	#[test]
	fn tampered_cookies_are_rejected()
	{
		let issued = CsrfToken::generate(SECRET);
		let (_, hash) = issued.cookie_value().split_once('|').unwrap_or_default();
		let forged = format!("{}|{hash}", "0".repeat(TOKEN_BYTES * 2));

		assert!(CsrfToken::from_cookie(&forged, SECRET).is_none());
		assert!(CsrfToken::from_cookie(issued.cookie_value(), "other-secret").is_none());
		assert!(CsrfToken::from_cookie("no-separator", SECRET).is_none());
	}

	#[test]
	fn wrong_submissions_do_not_match()
	{
		let issued = CsrfToken::generate(SECRET);

		assert!(!issued.matches(""));
		assert!(!issued.matches(CsrfToken::generate(SECRET).token()));
	}
}
