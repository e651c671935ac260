#![doc = include_str!("../README.md")]
// TODO: remove once https://github.com/tokio-rs/tracing/issues/2912 lands
#![allow(clippy::blocks_in_conditions)]

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use axum::{routing, Json, Router};
use tokio::net::TcpListener;
use utoipa::OpenApi;

pub mod runtime;
pub use runtime::Config;

pub mod database;
pub mod http;
pub mod services;
pub mod middleware;
pub mod logging;
pub mod openapi;

#[cfg(test)]
mod testing;

use crate::services::auth::GatewayCallbacks;
use crate::services::{AuthService, HealthService, PasswordService, UserService};

/// Run the gateway.
///
/// This function will not exit until a SIGINT or SIGTERM signal is received.
/// If you want to supply a custom signal for graceful shutdown, use
/// [`run_until()`] instead.
pub async fn run(config: Config) -> anyhow::Result<()>
{
	run_until(config, std::future::pending()).await
}

/// Run the gateway until a given future completes.
///
/// This function is the same as [`run()`], except that it also waits for the
/// provided `until` future, and shuts down the server when that future
/// resolves.
pub async fn run_until<Until>(config: Config, until: Until) -> anyhow::Result<()>
where
	Until: Future<Output = ()> + Send + 'static,
{
	let (tcp_listener, app) = server(config).await.context("build http server")?;

	axum::serve(tcp_listener, app.into_make_service_with_connect_info::<SocketAddr>())
		.with_graceful_shutdown(async move {
			tokio::select! {
				() = until => {}
				() = runtime::signals::shutdown() => {}
			}
		})
		.await
		.context("run http server")
}

/// Runs the necessary setup for the gateway and returns the bound listener
/// together with the application.
async fn server(config: Config) -> anyhow::Result<(TcpListener, Router)>
{
	tracing::debug!(addr = %config.addr, "establishing TCP connection");

	let tcp_listener = TcpListener::bind(config.addr)
		.await
		.context("bind tcp socket")?;

	let addr = tcp_listener.local_addr().context("get tcp addr")?;
	tracing::info!(%addr, prod = cfg!(feature = "production"), "listening for requests");

	http::problem_details::problem_type::set_base_url(config.auth_url.clone());

	let database = database::create_pool(&config.database_url)
		.await
		.context("connect to database")?;

	let http_client = reqwest::Client::new();
	let passwords = PasswordService::new().context("initialize password service")?;
	let users = UserService::new(database, passwords.clone());
	let callbacks = Arc::new(GatewayCallbacks::new(config.cors_origin.clone()));
	let auth = AuthService::new(&config, users.clone(), passwords, http_client, callbacks)
		.context("initialize auth service")?;

	if !auth.has_google() {
		tracing::warn!("google sign-in is not configured");
	}

	tracing::debug!("initializing gateway service");

	let app = Router::new()
		.nest("/health", Router::from(HealthService::new()))
		.nest("/api/auth", Router::from(users))
		.nest("/auth", Router::from(auth))
		.route("/docs/openapi.json", routing::get(|| async { Json(openapi::Spec::openapi()) }))
		.layer(middleware::logging::layer!())
		.layer(middleware::cors::client(config.cors_origin.as_deref()))
		.layer(middleware::panic_handler::layer());

	Ok((tcp_listener, app))
}
