//! This module contains general database utilities.
//!
//! The credential store is a SQLite database accessed through [`sqlx`]. The
//! schema lives in `database/migrations` and is applied on startup.

use std::str::FromStr;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;

mod error;
pub use error::SqlErrorExt;

/// Creates a database connection pool and runs migrations.
#[tracing::instrument(skip_all, err(Debug))]
pub async fn create_pool(database_url: &str) -> sqlx::Result<SqlitePool>
{
	let options = SqliteConnectOptions::from_str(database_url)?
		.create_if_missing(true)
		.foreign_keys(true);

	let pool = SqlitePoolOptions::new().connect_with(options).await?;

	sqlx::migrate!("./database/migrations").run(&pool).await?;

	tracing::debug!("database ready");

	Ok(pool)
}
