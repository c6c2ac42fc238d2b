// SPDX-License-Identifier: MIT OR Apache-2.0

//! Structured logging setup.
//!
//! Installs a single text `fmt` layer filtered by `STRONGBOX_LOG`, or by
//! a verbosity count when the env var is unset.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initialize the global tracing subscriber. `verbosity` is the number
/// of `-v` flags on the CLI; 0 maps to `warn`, 1 to `info`, 2+ to `debug`.
pub fn init(verbosity: u8) {
    let default_level = match verbosity {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };

    let filter =
        EnvFilter::try_from_env("STRONGBOX_LOG").unwrap_or_else(|_| EnvFilter::new(default_level));

    let fmt_layer = fmt::layer().with_target(false).without_time();

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .try_init();
}
