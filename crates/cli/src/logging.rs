use std::env;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

pub const LOG_ENV: &str = "NAMNBYTE_LOG";

/// Installs the stderr subscriber. `NAMNBYTE_LOG` wins over `--verbose`.
pub fn init_logger(verbose: bool) {
    let default_filter = if verbose { "info" } else { "warn" };
    let filter = env::var(LOG_ENV).unwrap_or_else(|_| default_filter.to_string());
    let filter_layer = EnvFilter::try_new(&filter).unwrap_or_else(|_| EnvFilter::new(default_filter));

    let _ = tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .without_time(),
        )
        .with(filter_layer)
        .try_init();
}
