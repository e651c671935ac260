//! This module contains the [`Config`] struct - a set of configuration options
//! that will be read from the environment on startup.
//!
//! See the `.env.example` file in the root of the repository for all the
//! relevant variables and example values.

use std::net::{Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use std::{env, fmt};

use thiserror::Error;
use url::Url;

/// The default lifetime of a session token (30 days).
pub const DEFAULT_SESSION_MAX_AGE: Duration = Duration::from_secs(30 * 24 * 60 * 60);

/// The gateway's runtime configuration.
///
/// This is constructed once on startup and then handed to every service that
/// needs it.
#[derive(Clone)]
pub struct Config
{
	/// The address the HTTP server will listen on.
	pub addr: SocketAddr,

	/// Database connection URL.
	pub database_url: String,

	/// The URL under which the auth endpoints are served.
	pub auth_url: Url,

	/// The origin of the client application, if it is served from a
	/// different origin than [`auth_url`].
	///
	/// This is kept as a raw string; it is only ever parsed by the cookie
	/// policy and compared by prefix in the redirect policy.
	///
	/// [`auth_url`]: Config::auth_url
	pub cors_origin: Option<String>,

	/// Secret used for signing session tokens and hashing CSRF tokens.
	pub auth_secret: String,

	/// An explicit value for the `Domain` attribute on auth cookies.
	pub cookie_domain: Option<String>,

	/// Google OAuth client credentials.
	///
	/// Google sign-in is only enabled if both the client ID and secret are
	/// present.
	pub google: Option<GoogleCredentials>,

	/// How long a session token stays valid after it was last refreshed.
	pub session_max_age: Duration,

	/// Directory to write log files into.
	pub log_dir: Option<PathBuf>,
}

/// OAuth client credentials for Google.
#[derive(Clone)]
pub struct GoogleCredentials
{
	/// The OAuth client ID.
	pub client_id: String,

	/// The OAuth client secret.
	pub client_secret: String,
}

/// Error that can occur while initializing the gateway's [`Config`].
#[derive(Debug, Error)]
pub enum ConfigurationError
{
	/// A required environment variable was not found or invalid
	/// UTF-8.
	#[error("failed to read environment variable `{var}`: {source}")]
	Env
	{
		/// The environment variable we tried to read.
		var: &'static str,

		/// The original error we got from [`std::env::var()`] when we tried to
		/// read a value.
		source: env::VarError,
	},

	/// A required configuration option was empty.
	#[error("`{var}` cannot be empty")]
	EmptyValue
	{
		/// The environment variable we read.
		var: &'static str,
	},

	/// A required configuration option could not be parsed into the required
	/// type.
	#[error("failed to parse configuration value `{var}`: {source}")]
	Parse
	{
		/// The environment variable containing the value.
		var: &'static str,

		/// The parsing error.
		source: Box<dyn std::error::Error + Send + Sync + 'static>,
	},

	/// A configuration value parsed fine, but makes no sense.
	#[error("invalid configuration value `{var}`: {reason}")]
	Invalid
	{
		/// The environment variable containing the value.
		var: &'static str,

		/// Why the value was rejected.
		reason: &'static str,
	},
}

impl Config
{
	/// Initializes a [`Config`] by reading and parsing environment variables.
	#[tracing::instrument(err(Debug))]
	pub fn new() -> Result<Self, ConfigurationError>
	{
		let addr = parse_from_env_opt::<SocketAddr>("AUTH_GATEWAY_ADDR")?
			.unwrap_or_else(|| SocketAddr::from((Ipv4Addr::LOCALHOST, 8787)));

		let database_url = parse_from_env::<String>("DATABASE_URL")?;
		let auth_url = parse_from_env::<Url>("AUTH_URL")?;

		if !matches!(auth_url.scheme(), "http" | "https") {
			return Err(ConfigurationError::Invalid {
				var: "AUTH_URL",
				reason: "must be an http(s) URL",
			});
		}

		let cors_origin = parse_from_env_opt::<String>("CORS_ORIGIN")?;
		let auth_secret = parse_from_env::<String>("AUTH_SECRET")?;
		let cookie_domain = parse_from_env_opt::<String>("AUTH_COOKIE_DOMAIN")?;

		let google = match (
			parse_from_env_opt::<String>("GOOGLE_CLIENT_ID")?,
			parse_from_env_opt::<String>("GOOGLE_CLIENT_SECRET")?,
		) {
			(Some(client_id), Some(client_secret)) => {
				Some(GoogleCredentials { client_id, client_secret })
			}
			(None, None) => None,
			(Some(_), None) | (None, Some(_)) => {
				tracing::warn!("only one of `GOOGLE_CLIENT_ID` / `GOOGLE_CLIENT_SECRET` is set; google sign-in disabled");
				None
			}
		};

		let session_max_age = parse_from_env_opt::<u64>("AUTH_SESSION_MAX_AGE")?
			.map_or(DEFAULT_SESSION_MAX_AGE, Duration::from_secs);

		if session_max_age.is_zero() {
			return Err(ConfigurationError::Invalid {
				var: "AUTH_SESSION_MAX_AGE",
				reason: "sessions must live for at least 1 second",
			});
		}

		let log_dir = parse_from_env_opt::<PathBuf>("AUTH_GATEWAY_LOG_DIR")?;

		Ok(Self {
			addr,
			database_url,
			auth_url,
			cors_origin,
			auth_secret,
			cookie_domain,
			google,
			session_max_age,
			log_dir,
		})
	}

	/// The canonical base URL used by the redirect policy.
	///
	/// This is the origin of [`auth_url`], without a trailing slash.
	///
	/// [`auth_url`]: Config::auth_url
	pub fn base_url(&self) -> String
	{
		self.auth_url.origin().ascii_serialization()
	}
}

impl fmt::Debug for Config
{
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
	{
		f.debug_struct("Config")
			.field("addr", &format_args!("{}", self.addr))
			.field("database_url", &"*****")
			.field("auth_url", &format_args!("{:?}", self.auth_url.as_str()))
			.field("cors_origin", &self.cors_origin)
			.field("auth_secret", &"*****")
			.field("cookie_domain", &self.cookie_domain)
			.field("google", &self.google)
			.field("session_max_age", &self.session_max_age)
			.field("log_dir", &self.log_dir)
			.finish()
	}
}

impl fmt::Debug for GoogleCredentials
{
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
	{
		f.debug_struct("GoogleCredentials")
			.field("client_id", &self.client_id)
			.field("client_secret", &"*****")
			.finish()
	}
}

/// Reads and parses an environment variable.
fn parse_from_env<T>(var: &'static str) -> Result<T, ConfigurationError>
where
	T: FromStr<Err: std::error::Error + Send + Sync + 'static>,
{
	let value = env::var(var).map_err(|source| ConfigurationError::Env { var, source })?;

	if value.is_empty() {
		return Err(ConfigurationError::EmptyValue { var });
	}

	value
		.parse::<T>()
		.map_err(|error| ConfigurationError::Parse { var, source: Box::new(error) })
}

/// Reads and parses an environment variable.
///
/// Returns [`None`] if a variable does not exist or is empty.
fn parse_from_env_opt<T>(var: &'static str) -> Result<Option<T>, ConfigurationError>
where
	T: FromStr<Err: std::error::Error + Send + Sync + 'static>,
{
	let Some(value) = env::var(var).ok() else {
		return Ok(None);
	};

	if value.is_empty() {
		return Ok(None);
	}

	value
		.parse::<T>()
		.map(Some)
		.map_err(|error| ConfigurationError::Parse { var, source: Box::new(error) })
}

#[cfg(test)]
mod tests
{
	use super::*;

	#[test]
	fn base_url_is_the_auth_origin()
	{
		let config = crate::testing::config("https://auth.example/some/path");

		assert_eq!(config.base_url(), "https://auth.example");
	}

	#[test]
	fn debug_output_hides_secrets()
	{
		let mut config = crate::testing::config("http://localhost:8787");
		config.google = Some(GoogleCredentials {
			client_id: String::from("client-id"),
			client_secret: String::from("super-secret-client"),
		});

		let debug = format!("{config:?}");

		assert!(!debug.contains(&config.auth_secret), "auth secret leaked: {debug}");
		assert!(!debug.contains("super-secret-client"), "client secret leaked: {debug}");
		assert!(debug.contains("client-id"), "client id missing: {debug}");
	}
}
