//! This module contains helpers for unit/integration tests.

use std::net::{Ipv4Addr, SocketAddr};
use std::sync::Arc;

use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;

use crate::runtime::config::DEFAULT_SESSION_MAX_AGE;
use crate::runtime::Config;
use crate::services::auth::GatewayCallbacks;
use crate::services::{AuthService, PasswordService, UserService};

/// A configuration suitable for tests, serving the auth endpoints at
/// `auth_url`.
pub fn config(auth_url: &str) -> Config
{
	Config {
		addr: SocketAddr::from((Ipv4Addr::LOCALHOST, 0)),
		database_url: String::from("sqlite::memory:"),
		auth_url: auth_url.parse().unwrap(),
		cors_origin: None,
		auth_secret: String::from("dGhpcyBpcyBhIHRlc3Qgc2VjcmV0"),
		cookie_domain: None,
		google: None,
		session_max_age: DEFAULT_SESSION_MAX_AGE,
		log_dir: None,
	}
}

/// Creates a fresh in-memory database with all migrations applied.
///
/// Every call returns a separate database.
pub async fn database() -> color_eyre::Result<SqlitePool>
{
	let pool = SqlitePoolOptions::new()
		.max_connections(1)
		.idle_timeout(None)
		.max_lifetime(None)
		.connect("sqlite::memory:")
		.await?;

	sqlx::migrate!("./database/migrations").run(&pool).await?;

	Ok(pool)
}

/// A [`UserService`] backed by `database`.
pub fn user_svc(database: SqlitePool) -> color_eyre::Result<UserService>
{
	Ok(UserService::new(database, PasswordService::new()?))
}

/// An [`AuthService`] backed by `database`, configured with `config`.
pub fn auth_svc(database: SqlitePool, config: Config) -> color_eyre::Result<AuthService>
{
	let passwords = PasswordService::new()?;
	let users = UserService::new(database, passwords.clone());
	let callbacks = Arc::new(GatewayCallbacks::new(config.cors_origin.clone()));

	Ok(AuthService::new(&config, users, passwords, reqwest::Client::new(), callbacks)?)
}

/// Global constructor that will run before tests.
#[ctor::ctor]
fn ctor()
{
	use tracing_subscriber::fmt::format::FmtSpan;
	use tracing_subscriber::EnvFilter;

	color_eyre::install().expect("failed to install color-eyre");
	tracing_subscriber::fmt()
		.compact()
		.with_ansi(true)
		.with_file(true)
		.with_level(true)
		.with_line_number(true)
		.with_span_events(FmtSpan::NEW | FmtSpan::CLOSE)
		.with_target(true)
		.with_test_writer()
		.with_thread_ids(true)
		.with_thread_names(true)
		.with_env_filter(EnvFilter::from_default_env())
		.init();
}

macro_rules! assert {
	($expr:expr $(, $($msg:tt)*)?) => {
		::color_eyre::eyre::ensure!($expr $(, $($msg)*)?)
	};
}

macro_rules! assert_eq {
	($lhs:expr, $rhs:expr $(,)?) => {
		match (&$lhs, &$rhs) {
			(lhs, rhs) => {
				if lhs != rhs {
					::color_eyre::eyre::bail!(
						"assertion `{} == {}` failed\n  lhs: {:?}\n  rhs: {:?}",
						stringify!($lhs),
						stringify!($rhs),
						lhs,
						rhs,
					);
				}
			}
		}
	};
	($lhs:expr, $rhs:expr, $($msg:tt)+) => {
		match (&$lhs, &$rhs) {
			(lhs, rhs) => {
				::color_eyre::eyre::ensure!(lhs == rhs, $($msg)+);
			}
		}
	};
}

macro_rules! assert_matches {
	($expr:expr, $pat:pat $(if $cond:expr)? $(, $($msg:tt)*)?) => {
		::color_eyre::eyre::ensure!(matches!($expr, $pat $(if $cond)?) $(, $($msg)*)?)
	};
}

pub(crate) use {assert, assert_eq, assert_matches};
