//! A service for managing users and the credential store.
//!
//! Users register with an email and password through
//! [`UserService::register()`], or are created implicitly on their first
//! OAuth sign-in through [`UserService::sign_in_with_provider()`].

use std::fmt;

use axum::extract::FromRef;
use chrono::Utc;
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::database::SqlErrorExt;
use crate::services::PasswordService;

pub(crate) mod http;

mod error;
pub use error::{Error, Result};

mod models;
pub use models::{
	default_name,
	AccountTokens,
	OAuthProfile,
	RegisterRequest,
	RegisterResponse,
	User,
};

/// The column guarded by the `UNIQUE(email)` constraint.
const EMAIL_COLUMN: &str = "users.email";

/// A service for managing users.
#[derive(Clone, FromRef)]
#[allow(clippy::missing_docs_in_private_items)]
pub struct UserService
{
	database: SqlitePool,
	passwords: PasswordService,
}

impl fmt::Debug for UserService
{
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
	{
		f.debug_struct("UserService").finish_non_exhaustive()
	}
}

impl UserService
{
	/// Create a new [`UserService`].
	#[tracing::instrument]
	pub fn new(database: SqlitePool, passwords: PasswordService) -> Self
	{
		Self { database, passwords }
	}

	/// Registers a new user with an email and password.
	///
	/// This does not sign the user in.
	#[tracing::instrument(level = "debug", err(Debug, level = "debug"))]
	pub async fn register(&self, req: RegisterRequest) -> Result<RegisterResponse>
	{
		if self.find_by_email(&req.email).await?.is_some() {
			return Err(Error::EmailTaken);
		}

		let id = Uuid::new_v4().to_string();
		let name = req.display_name();
		let hashed_password = self.passwords.hash(&req.password).await?;

		sqlx::query(
			r"
			INSERT INTO
			  users (id, email, name, hashed_password)
			VALUES
			  (?, ?, ?, ?)
			",
		)
		.bind(&id)
		.bind(&req.email)
		.bind(&name)
		.bind(&hashed_password)
		.execute(&self.database)
		.await
		.map_err(|error| {
			if error.is_unique_violation_of(EMAIL_COLUMN) {
				Error::EmailTaken
			} else {
				Error::Database(error)
			}
		})?;

		tracing::info!(target: "auth_gateway::audit_log", { user.id = %id }, "registered new user");

		Ok(RegisterResponse { id, email: req.email, name })
	}

	/// Looks up a user by their exact email.
	#[tracing::instrument(level = "debug", err(Debug, level = "debug"))]
	pub async fn find_by_email(&self, email: &str) -> Result<Option<User>>
	{
		let user = sqlx::query_as::<_, User>(
			r"
			SELECT
			  id,
			  email,
			  name,
			  email_verified,
			  image,
			  hashed_password
			FROM
			  users
			WHERE
			  email = ?
			",
		)
		.bind(email)
		.fetch_optional(&self.database)
		.await?;

		Ok(user)
	}

	/// Resolves the user behind an OAuth identity.
	///
	/// If the provider account is already linked, the linked user is
	/// returned. Otherwise a new user is created together with the link.
	/// An existing user with the same email that is not linked to this
	/// provider account results in [`Error::AccountNotLinked`].
	#[tracing::instrument(level = "debug", skip_all, err(Debug, level = "debug"), fields(
		provider = profile.provider,
		user.id = tracing::field::Empty,
	))]
	pub async fn sign_in_with_provider(&self, profile: OAuthProfile) -> Result<User>
	{
		if let Some(user) = self
			.find_by_account(profile.provider, &profile.provider_account_id)
			.await?
		{
			tracing::Span::current().record("user.id", user.id.as_str());
			return Ok(user);
		}

		if self.find_by_email(&profile.email).await?.is_some() {
			return Err(Error::AccountNotLinked);
		}

		let user = User {
			id: Uuid::new_v4().to_string(),
			name: profile
				.name
				.clone()
				.filter(|name| !name.is_empty())
				.unwrap_or_else(|| default_name(&profile.email)),
			email: profile.email,
			email_verified: profile.email_verified.then(Utc::now),
			image: profile.image,
			hashed_password: None,
		};

		tracing::Span::current().record("user.id", user.id.as_str());

		let mut txn = self.database.begin().await?;

		sqlx::query(
			r"
			INSERT INTO
			  users (id, email, name, email_verified, image)
			VALUES
			  (?, ?, ?, ?, ?)
			",
		)
		.bind(&user.id)
		.bind(&user.email)
		.bind(&user.name)
		.bind(user.email_verified)
		.bind(&user.image)
		.execute(txn.as_mut())
		.await
		.map_err(|error| {
			if error.is_unique_violation_of(EMAIL_COLUMN) {
				Error::AccountNotLinked
			} else {
				Error::Database(error)
			}
		})?;

		let AccountTokens {
			access_token,
			refresh_token,
			expires_at,
			token_type,
			scope,
			id_token,
		} = profile.tokens;

		sqlx::query(
			r"
			INSERT INTO
			  accounts (
			    user_id,
			    type,
			    provider,
			    provider_account_id,
			    access_token,
			    refresh_token,
			    expires_at,
			    token_type,
			    scope,
			    id_token
			  )
			VALUES
			  (?, 'oauth', ?, ?, ?, ?, ?, ?, ?, ?)
			",
		)
		.bind(&user.id)
		.bind(profile.provider)
		.bind(&profile.provider_account_id)
		.bind(access_token)
		.bind(refresh_token)
		.bind(expires_at)
		.bind(token_type)
		.bind(scope)
		.bind(id_token)
		.execute(txn.as_mut())
		.await?;

		txn.commit().await?;

		tracing::info! {
			target: "auth_gateway::audit_log",
			{ user.id = %user.id, provider = profile.provider },
			"created user from provider account",
		};

		Ok(user)
	}

	/// Looks up the user linked to a provider account.
	#[tracing::instrument(level = "debug", err(Debug, level = "debug"))]
	async fn find_by_account(&self, provider: &str, provider_account_id: &str) -> Result<Option<User>>
	{
		let user = sqlx::query_as::<_, User>(
			r"
			SELECT
			  u.id,
			  u.email,
			  u.name,
			  u.email_verified,
			  u.image,
			  u.hashed_password
			FROM
			  accounts a
			  JOIN users u ON u.id = a.user_id
			WHERE
			  a.provider = ?
			  AND a.provider_account_id = ?
			",
		)
		.bind(provider)
		.bind(provider_account_id)
		.fetch_optional(&self.database)
		.await?;

		Ok(user)
	}
}

#[cfg(test)]
mod tests
{
	use super::*;
	use crate::testing;

	fn request(email: &str, password: &str, name: Option<&str>) -> RegisterRequest
	{
		RegisterRequest {
			email: email.to_owned(),
			password: password.to_owned(),
			name: name.map(ToOwned::to_owned),
		}
	}

	async fn users_with_email(database: &SqlitePool, email: &str) -> color_eyre::Result<i64>
	{
		let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM users WHERE email = ?")
			.bind(email)
			.fetch_one(database)
			.await?;

		Ok(count)
	}

	fn google_profile(account_id: &str, email: &str) -> OAuthProfile
	{
		OAuthProfile {
			provider: "google",
			provider_account_id: account_id.to_owned(),
			email: email.to_owned(),
			email_verified: true,
			name: Some(String::from("Grace Hopper")),
			image: None,
			tokens: AccountTokens::default(),
		}
	}

	#[tokio::test]
	async fn register_stores_a_hashed_password() -> color_eyre::Result<()>
	{
		let svc = testing::user_svc(testing::database().await?)?;
		let res = svc
			.register(request("alice@example.com", "hunter2", Some("Alice")))
			.await?;

		testing::assert_eq!(res.email, "alice@example.com");
		testing::assert_eq!(res.name, "Alice");
		testing::assert!(Uuid::parse_str(&res.id).is_ok_and(|id| id.get_version_num() == 4));

		let stored = svc.find_by_email("alice@example.com").await?;

		testing::assert_matches!(
			stored,
			Some(User { hashed_password: Some(ref hash), .. }) if hash.starts_with("$argon2id$")
		);

		Ok(())
	}

	#[tokio::test]
	async fn register_defaults_the_name() -> color_eyre::Result<()>
	{
		let svc = testing::user_svc(testing::database().await?)?;
		let res = svc.register(request("bob@x.io", "pw", None)).await?;

		testing::assert_eq!(res.name, "bob");

		Ok(())
	}

	#[tokio::test]
	async fn register_twice_fails() -> color_eyre::Result<()>
	{
		let database = testing::database().await?;
		let svc = testing::user_svc(database.clone())?;

		svc.register(request("carol@example.com", "first", None)).await?;

		let second = svc.register(request("carol@example.com", "second", None)).await;

		testing::assert_matches!(second, Err(Error::EmailTaken));
		testing::assert_eq!(users_with_email(&database, "carol@example.com").await?, 1);

		Ok(())
	}

	#[tokio::test]
	async fn concurrent_registrations_store_one_user() -> color_eyre::Result<()>
	{
		let database = testing::database().await?;
		let svc = testing::user_svc(database.clone())?;

		// both pass the existence check while the other is still hashing
		let (first, second) = tokio::join!(
			svc.register(request("frank@example.com", "first", None)),
			svc.register(request("frank@example.com", "second", None)),
		);

		let results = [first.is_ok(), second.is_ok()];

		testing::assert_eq!(results.iter().filter(|ok| **ok).count(), 1);
		testing::assert!(
			matches!(first, Err(Error::EmailTaken)) || matches!(second, Err(Error::EmailTaken)),
			"expected one `EmailTaken`, got {first:?} and {second:?}",
		);
		testing::assert_eq!(users_with_email(&database, "frank@example.com").await?, 1);

		Ok(())
	}

	#[tokio::test]
	async fn emails_are_case_sensitive() -> color_eyre::Result<()>
	{
		let svc = testing::user_svc(testing::database().await?)?;

		svc.register(request("dave@example.com", "pw", None)).await?;
		svc.register(request("Dave@example.com", "pw", None)).await?;

		testing::assert!(svc.find_by_email("DAVE@example.com").await?.is_none());

		Ok(())
	}

	#[tokio::test]
	async fn unique_constraint_maps_to_email_taken() -> color_eyre::Result<()>
	{
		let database = testing::database().await?;

		sqlx::query("INSERT INTO users (id, email, name) VALUES ('x', 'erin@example.com', 'erin')")
			.execute(&database)
			.await?;

		let error = sqlx::query("INSERT INTO users (id, email, name) VALUES ('y', 'erin@example.com', 'erin')")
			.execute(&database)
			.await
			.err();

		testing::assert!(error.is_some_and(|error| error.is_unique_violation_of(EMAIL_COLUMN)));

		Ok(())
	}

	#[tokio::test]
	async fn provider_sign_in_creates_and_reuses_the_user() -> color_eyre::Result<()>
	{
		let svc = testing::user_svc(testing::database().await?)?;
		let first = svc
			.sign_in_with_provider(google_profile("g-1", "grace@example.com"))
			.await?;

		testing::assert_eq!(first.name, "Grace Hopper");
		testing::assert!(first.email_verified.is_some());
		testing::assert!(first.hashed_password.is_none());

		let second = svc
			.sign_in_with_provider(google_profile("g-1", "grace@example.com"))
			.await?;

		testing::assert_eq!(first.id, second.id);

		Ok(())
	}

	#[tokio::test]
	async fn provider_sign_in_does_not_take_over_existing_emails() -> color_eyre::Result<()>
	{
		let svc = testing::user_svc(testing::database().await?)?;

		svc.register(request("grace@example.com", "pw", None)).await?;

		let result = svc
			.sign_in_with_provider(google_profile("g-2", "grace@example.com"))
			.await;

		testing::assert_matches!(result, Err(Error::AccountNotLinked));

		Ok(())
	}
}
