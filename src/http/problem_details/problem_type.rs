//! This module contains the [`ProblemType`] enum.
//!
//! It represents an exhaustive list of all the possible error conditions the
//! gateway might return from its own endpoints.

use std::sync::OnceLock;

use serde::{Serialize, Serializer};
use tap::Tap;
use url::Url;

/// The base URL for the problem type documentation.
static BASE_URL: OnceLock<Url> = OnceLock::new();

/// Sets the base URL problem types are resolved against.
///
/// Only the first call has any effect.
#[doc(hidden)]
pub(crate) fn set_base_url(url: Url)
{
	if BASE_URL.set(url).is_err() {
		tracing::debug!("problem type base url already set");
	}
}

/// A problem type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProblemType
{
	/// The request body was missing required fields, or was not valid JSON.
	InvalidPayload,

	/// Somebody already registered an account with the submitted email.
	EmailTaken,

	/// The path under `/auth` does not correspond to any known action.
	UnknownAuthAction,

	/// The request did not carry valid credentials.
	Unauthorized,

	/// An internal failure occurred.
	///
	/// Any occurrence of this problem type is considered a bug!
	Internal,
}

impl ProblemType
{
	/// Every problem type.
	pub const fn all() -> &'static [Self]
	{
		&[
			Self::InvalidPayload,
			Self::EmailTaken,
			Self::UnknownAuthAction,
			Self::Unauthorized,
			Self::Internal,
		]
	}

	/// The HTTP status code for this problem type.
	pub const fn status(&self) -> http::StatusCode
	{
		match self {
			Self::InvalidPayload | Self::EmailTaken | Self::UnknownAuthAction => {
				http::StatusCode::BAD_REQUEST
			}
			Self::Unauthorized => http::StatusCode::UNAUTHORIZED,
			Self::Internal => http::StatusCode::INTERNAL_SERVER_ERROR,
		}
	}

	/// A short, human-readable, summary of this problem type.
	pub const fn title(&self) -> &'static str
	{
		match self {
			Self::InvalidPayload => "invalid payload",
			Self::EmailTaken => "email already registered",
			Self::UnknownAuthAction => "unknown auth action",
			Self::Unauthorized => "unauthorized",
			Self::Internal => "internal server error",
		}
	}

	/// The URL fragment identifying this problem type.
	pub const fn slug(&self) -> &'static str
	{
		match self {
			Self::InvalidPayload => "invalid-payload",
			Self::EmailTaken => "email-taken",
			Self::UnknownAuthAction => "unknown-auth-action",
			Self::Unauthorized => "unauthorized",
			Self::Internal => "internal",
		}
	}
}

impl Serialize for ProblemType
{
	// Serialize as a URI as specified by the RFC.
	fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
	where
		S: Serializer,
	{
		let Some(base_url) = BASE_URL.get() else {
			return serializer.serialize_str(&format!("about:blank#{}", self.slug()));
		};

		base_url
			.join("/docs/problem-types")
			.map_err(serde::ser::Error::custom)?
			.tap_mut(|url| url.set_fragment(Some(self.slug())))
			.serialize(serializer)
	}
}

#[cfg(test)]
mod tests
{
	use super::*;

	#[test]
	fn slugs_are_unique()
	{
		let all = ProblemType::all();

		for (idx, problem) in all.iter().enumerate() {
			let duplicates = all
				.iter()
				.skip(idx + 1)
				.filter(|other| other.slug() == problem.slug())
				.count();

			assert_eq!(duplicates, 0, "duplicate slug for {problem:?}");
		}
	}

	#[test]
	fn client_errors_are_bad_requests()
	{
		assert_eq!(ProblemType::InvalidPayload.status(), http::StatusCode::BAD_REQUEST);
		assert_eq!(ProblemType::EmailTaken.status(), http::StatusCode::BAD_REQUEST);
	}
}
