//! The errors that can occur when interacting with this service.

use thiserror::Error;

use crate::http::problem_details::{IntoProblemDetails, ProblemType};
use crate::services::passwords;

/// Type alias with a default `Err` type of [`Error`].
///
/// [`Error`]: enum@Error
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// The errors that can occur when interacting with the user service.
#[derive(Debug, Error)]
pub enum Error
{
	/// The registration body was not a JSON object with a non-empty `email`
	/// and `password`.
	#[error("Invalid payload")]
	InvalidPayload,

	/// A user with the submitted email already exists.
	#[error("Email already registered")]
	EmailTaken,

	/// An OAuth sign-in carried the email of an existing user that is not
	/// linked to that provider account.
	#[error("email is already used by another account")]
	AccountNotLinked,

	/// Hashing the password failed.
	#[error("something went wrong")]
	Passwords(#[from] passwords::Error),

	/// Something went wrong communicating with the database.
	#[error("something went wrong")]
	Database(#[from] sqlx::Error),
}

impl IntoProblemDetails for Error
{
	fn problem_type(&self) -> ProblemType
	{
		match self {
			Self::InvalidPayload => ProblemType::InvalidPayload,
			Self::EmailTaken => ProblemType::EmailTaken,
			Self::AccountNotLinked => ProblemType::Unauthorized,
			Self::Passwords(_) => ProblemType::Internal,
			Self::Database(source) => source.problem_type(),
		}
	}
}
