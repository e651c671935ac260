//! This module contains a function that will install a global panic hook.
//!
//! See [`std::panic::set_hook()`] for more details.

use std::backtrace::Backtrace;
use std::panic;

/// Installs a panic hook that reports panics through [`tracing`] before
/// handing over to the previously installed hook.
#[tracing::instrument(target = "auth_gateway::runtime", name = "panic_hook")]
pub fn install()
{
	let old_hook = panic::take_hook();

	panic::set_hook(Box::new(move |info| {
		let payload = info
			.payload()
			.downcast_ref::<&str>()
			.copied()
			.or_else(|| info.payload().downcast_ref::<String>().map(String::as_str))
			.unwrap_or("<non-string payload>");

		let location = info
			.location()
			.map(|location| location.to_string())
			.unwrap_or_default();

		tracing::error! {
			target: "auth_gateway::audit_log",
			%payload,
			%location,
			backtrace = %Backtrace::force_capture(),
			"thread panicked",
		};

		old_hook(info)
	}));

	tracing::debug!("installed panic hook");
}
