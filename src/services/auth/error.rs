//! The errors that can occur when interacting with this service.

use thiserror::Error;

use super::providers::google;
use crate::http::problem_details::{ExtensionMembers, IntoProblemDetails, ProblemType};

/// Type alias with a default `Err` type of [`Error`].
///
/// [`Error`]: enum@Error
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// The errors that can occur when interacting with the auth service.
#[derive(Debug, Error)]
pub enum Error
{
	/// A request was made to a path under `/auth` that does not name an
	/// action, or names a provider that is not configured.
	#[error("unknown auth action `{action}`")]
	UnknownAction
	{
		/// The requested path.
		action: String,
	},

	/// Signing a token failed.
	#[error("failed to sign token")]
	EncodeJwt
	{
		/// The original error.
		source: jwt::errors::Error,
	},
}

/// Errors that can occur while setting up the auth service.
#[derive(Debug, Error)]
pub enum SetupError
{
	/// The Google provider could not be configured.
	#[error("failed to configure google sign-in")]
	Google(#[from] google::Error),

	/// The Google callback URL could not be derived from `AUTH_URL`.
	#[error("failed to build callback url")]
	CallbackUrl(#[from] url::ParseError),
}

impl IntoProblemDetails for Error
{
	fn problem_type(&self) -> ProblemType
	{
		match self {
			Self::UnknownAction { .. } => ProblemType::UnknownAuthAction,
			Self::EncodeJwt { .. } => ProblemType::Internal,
		}
	}

	fn add_extension_members(&self, ext: &mut ExtensionMembers)
	{
		if let Self::UnknownAction { action } = self {
			ext.add("action", action);
		}
	}
}
