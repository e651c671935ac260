//! This module contains general purpose middleware.
//!
//! Middlewares are mostly configured versions of what [`tower_http`]
//! provides.

pub(crate) mod logging;
pub(crate) mod panic_handler;
pub(crate) mod cors;
