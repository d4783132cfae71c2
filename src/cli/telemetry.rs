use crate::cli::commands::logging::ENV_LOG_FILTER;
use anyhow::Result;
use tracing::Level;
use tracing_subscriber::{fmt, layer::SubscriberExt, EnvFilter, Registry};

/// Install the global subscriber. Everything goes to standard error so the
/// launched command's standard output stays untouched.
///
/// # Errors
/// Returns an error if a subscriber is already installed.
pub fn init(verbosity_level: Option<Level>) -> Result<()> {
    let verbosity_level = verbosity_level.unwrap_or(Level::ERROR);

    let fmt_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_file(false)
        .with_line_number(false)
        .with_thread_ids(false)
        .with_thread_names(false)
        .with_target(false)
        .compact();

    // RDO_LOG=
    let filter = EnvFilter::builder()
        .with_default_directive(verbosity_level.into())
        .with_env_var(ENV_LOG_FILTER)
        .from_env_lossy();

    let subscriber = Registry::default().with(fmt_layer).with(filter);
    tracing::subscriber::set_global_default(subscriber)?;

    Ok(())
}
