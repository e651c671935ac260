use anyhow::Context;
use auth_gateway::runtime::panic_hook;
use auth_gateway::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()>
{
	if let Err(error) = dotenvy::dotenv() {
		eprintln!("WARNING: no `.env` file found ({error})");
	}

	let config = Config::new().context("load config")?;
	let _guard = auth_gateway::logging::init(config.log_dir.as_deref()).context("initialize logging")?;

	panic_hook::install();

	if cfg!(not(feature = "production")) {
		tracing::warn!("running in development mode");
	}

	auth_gateway::run(config).await
}
