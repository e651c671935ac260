//! This module contains the [`SqlErrorExt`] trait.

/// Extension trait for [`sqlx::Error`].
///
/// This makes it easier to check for common error conditions that are
/// recoverable.
pub trait SqlErrorExt
{
	/// Checks if the error is a unique constraint violation on `column`.
	fn is_unique_violation_of(&self, column: &str) -> bool;
}

impl SqlErrorExt for sqlx::Error
{
	fn is_unique_violation_of(&self, column: &str) -> bool
	{
		self.as_database_error()
			.is_some_and(|e| e.is_unique_violation() && e.message().contains(column))
	}
}
