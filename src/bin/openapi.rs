//! Emits the gateway's OpenAPI document.
//!
//! Running it without any arguments prints the document to stdout; passing a
//! path writes it into that file instead.

use std::{env, fs};

use anyhow::Context;
use auth_gateway::openapi::Spec;

fn main() -> anyhow::Result<()>
{
	let spec = Spec::json().context("serialize spec")?;

	let Some(output) = env::args_os().nth(1) else {
		println!("{spec}");
		return Ok(());
	};

	fs::write(&output, spec.into_bytes())
		.with_context(|| format!("failed to write spec to `{}`", output.to_string_lossy()))?;

	Ok(())
}
