//! A service for hashing and verifying passwords.
//!
//! Hashes are produced with Argon2id and stored as PHC strings
//! (`$argon2id$v=19$m=19456,t=2,p=1$...`). Both hashing and verification are
//! CPU-bound, so they run on tokio's blocking thread pool.

use std::fmt;
use std::sync::Arc;

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{self, PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use thiserror::Error;
use tokio::task;

/// Input for the dummy hash computed on startup.
const DUMMY_PASSWORD: &str = "auth-gateway dummy password";

/// Type alias with a default `Err` type of [`Error`].
///
/// [`Error`]: enum@Error
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// The errors that can occur when interacting with the password service.
#[derive(Debug, Error)]
pub enum Error
{
	/// Argon2 rejected the input or the stored hash.
	#[error("password hashing failed: {0}")]
	Hash(password_hash::Error),

	/// The blocking task running the hash computation was cancelled or
	/// panicked.
	#[error("password hashing task failed")]
	Join(#[from] task::JoinError),
}

/// A service for hashing and verifying passwords.
#[derive(Clone)]
pub struct PasswordService
{
	/// A hash of [`DUMMY_PASSWORD`], verified against whenever there is no
	/// real hash to verify against.
	dummy_hash: Arc<str>,
}

impl fmt::Debug for PasswordService
{
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
	{
		f.debug_struct("PasswordService").finish_non_exhaustive()
	}
}

impl PasswordService
{
	/// Create a new [`PasswordService`].
	#[tracing::instrument(err(Debug))]
	pub fn new() -> Result<Self>
	{
		let dummy_hash = hash_blocking(DUMMY_PASSWORD)?.into();

		Ok(Self { dummy_hash })
	}

	/// Hashes a plaintext password with a fresh random salt.
	#[tracing::instrument(level = "debug", skip_all, err(Debug, level = "debug"))]
	pub async fn hash(&self, password: &str) -> Result<String>
	{
		let password = password.to_owned();

		task::spawn_blocking(move || hash_blocking(&password)).await?
	}

	/// Checks whether `password` matches the PHC-format `hash`.
	///
	/// A mismatch is `Ok(false)`; a malformed `hash` is an error.
	#[tracing::instrument(level = "debug", skip_all, err(Debug, level = "debug"))]
	pub async fn verify(&self, password: &str, hash: &str) -> Result<bool>
	{
		let password = password.to_owned();
		let hash = hash.to_owned();

		task::spawn_blocking(move || verify_blocking(&password, &hash)).await?
	}

	/// Performs a verification that always fails, at the same cost as
	/// [`verify()`].
	///
	/// Used on rejection paths that have no stored hash, so that they take as
	/// long as a wrong password would.
	///
	/// [`verify()`]: PasswordService::verify
	#[tracing::instrument(level = "debug", skip_all)]
	pub async fn verify_dummy(&self, password: &str)
	{
		let password = format!("{password}\0");
		let hash = Arc::clone(&self.dummy_hash);

		if let Err(error) =
			task::spawn_blocking(move || verify_blocking(&password, &hash)).await
		{
			tracing::warn!(%error, "dummy password verification failed");
		}
	}
}

/// Hashes `password` on the current thread.
fn hash_blocking(password: &str) -> Result<String>
{
	let salt = SaltString::generate(&mut OsRng);

	Argon2::default()
		.hash_password(password.as_bytes(), &salt)
		.map(|hash| hash.to_string())
		.map_err(Error::Hash)
}

/// Verifies `password` against `hash` on the current thread.
fn verify_blocking(password: &str, hash: &str) -> Result<bool>
{
	let parsed = PasswordHash::new(hash).map_err(Error::Hash)?;

	match Argon2::default().verify_password(password.as_bytes(), &parsed) {
		Ok(()) => Ok(true),
		Err(password_hash::Error::Password) => Ok(false),
		Err(error) => Err(Error::Hash(error)),
	}
}
