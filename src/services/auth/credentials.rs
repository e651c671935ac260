//! Email and password sign-in.

use std::fmt;

use super::Identity;
use crate::services::{PasswordService, UserService};

/// An email and password submitted by a client.
#[derive(Clone, Default)]
pub struct CredentialAttempt
{
	/// The submitted email.
	pub email: Option<String>,

	/// The submitted password.
	pub password: Option<String>,
}

impl fmt::Debug for CredentialAttempt
{
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
	{
		f.debug_struct("CredentialAttempt")
			.field("email", &self.email)
			.finish_non_exhaustive()
	}
}

/// Checks credential attempts against the credential store.
#[derive(Clone)]
pub struct CredentialAuthorizer
{
	/// For looking up users.
	users: UserService,

	/// For verifying passwords.
	passwords: PasswordService,
}

impl fmt::Debug for CredentialAuthorizer
{
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
	{
		f.debug_struct("CredentialAuthorizer").finish_non_exhaustive()
	}
}

impl CredentialAuthorizer
{
	/// Creates a new [`CredentialAuthorizer`].
	pub fn new(users: UserService, passwords: PasswordService) -> Self
	{
		Self { users, passwords }
	}

	/// Authenticates a credential attempt.
	///
	/// Returns [`None`] for every kind of failure; callers cannot tell an
	/// unknown email from a wrong password. Unknown emails and users without
	/// a password still cost one hash verification.
	#[tracing::instrument(level = "debug", skip(self), ret(level = "debug"))]
	pub async fn authorize(&self, attempt: &CredentialAttempt) -> Option<Identity>
	{
		let email = attempt.email.as_deref().filter(|email| !email.is_empty())?;
		let password = attempt.password.as_deref().filter(|password| !password.is_empty())?;

		let user = match self.users.find_by_email(email).await {
			Ok(user) => user,
			Err(error) => {
				tracing::error!(?error, "failed to look up user");
				return None;
			}
		};

		let Some((user, hash)) =
			user.and_then(|user| user.hashed_password.clone().map(|hash| (user, hash)))
		else {
			self.passwords.verify_dummy(password).await;
			return None;
		};

		match self.passwords.verify(password, &hash).await {
			Ok(true) => Some(Identity {
				id: user.id,
				name: Some(user.name),
				email: Some(user.email),
				image: None,
			}),
			Ok(false) => None,
			Err(error) => {
				tracing::error!(?error, user.id = %user.id, "failed to verify password");
				None
			}
		}
	}
}

#[cfg(test)]
mod tests
{
	use super::*;
	use crate::services::users::RegisterRequest;
	use crate::testing;

	fn attempt(email: Option<&str>, password: Option<&str>) -> CredentialAttempt
	{
		CredentialAttempt {
			email: email.map(ToOwned::to_owned),
			password: password.map(ToOwned::to_owned),
		}
	}

	async fn authorizer() -> color_eyre::Result<CredentialAuthorizer>
	{
		let database = testing::database().await?;
		let passwords = PasswordService::new()?;
		let users = UserService::new(database.clone(), passwords.clone());

		users
			.register(RegisterRequest {
				email: String::from("alice@example.com"),
				password: String::from("hunter2"),
				name: Some(String::from("Alice")),
			})
			.await?;

		sqlx::query("INSERT INTO users (id, email, name) VALUES ('oauth-only', 'oauth@example.com', 'o')")
			.execute(&database)
			.await?;

		Ok(CredentialAuthorizer::new(users, passwords))
	}

	#[tokio::test]
	async fn correct_password_yields_identity() -> color_eyre::Result<()>
	{
		let authorizer = authorizer().await?;
		let identity = authorizer
			.authorize(&attempt(Some("alice@example.com"), Some("hunter2")))
			.await;

		testing::assert_matches!(
			identity,
			Some(Identity { ref name, ref email, image: None, .. })
				if name.as_deref() == Some("Alice") && email.as_deref() == Some("alice@example.com")
		);

		Ok(())
	}

	#[tokio::test]
	async fn every_failure_is_indistinguishable() -> color_eyre::Result<()>
	{
		let authorizer = authorizer().await?;
		let attempts = [
			attempt(Some("alice@example.com"), Some("wrong")),
			attempt(Some("nobody@example.com"), Some("hunter2")),
			attempt(Some("oauth@example.com"), Some("hunter2")),
			attempt(Some("ALICE@example.com"), Some("hunter2")),
			attempt(None, Some("hunter2")),
			attempt(Some("alice@example.com"), None),
			attempt(Some(""), Some("hunter2")),
			attempt(Some("alice@example.com"), Some("")),
		];

		for attempt in &attempts {
			testing::assert!(authorizer.authorize(attempt).await.is_none(), "accepted {attempt:?}");
		}

		Ok(())
	}
}
