use tracing::debug;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

// Default filter when neither RUST_LOG nor the configuration set one
pub fn default_level() -> &'static str {
    if cfg!(debug_assertions) { "debug" } else { "warn" }
}

// Log to standard error, standard output only carries the command output
pub fn init_logging(configured_level: Option<&str>) {
    let level = configured_level.unwrap_or(default_level());

    let (filter, from_env) = match EnvFilter::try_from_default_env() {
        Ok(f) => (f, true),
        Err(_) => (EnvFilter::new(level), false),
    };

    let fmt_layer = fmt::layer().with_writer(std::io::stderr);

    tracing_subscriber::registry()
        .with(fmt_layer)
        .with(filter)
        .init();

    if !from_env {
        debug!("\"RUST_LOG\" variable not set, defaulting to {level}");
    }
}
