use std::path::PathBuf;

use tracing_subscriber::{layer::SubscriberExt as _, util::SubscriberInitExt as _, EnvFilter};
use tracing_tree::HierarchicalLayer;

/// Which dotenv file to read for the current environment
pub fn env_file_name() -> &'static str {
    match std::env::var("APP_ENV").as_deref() {
        Ok("production") => ".env",
        _ => ".env.dev",
    }
}

/// Load the dotenv file for this environment into the process environment
///
/// A missing file is not an error; variables may come from the real environment.
pub fn load_env_file() -> color_eyre::Result<Option<PathBuf>> {
    match dotenvy::from_filename(env_file_name()) {
        Ok(path) => Ok(Some(path)),
        Err(err) if err.not_found() => Ok(None),
        Err(err) => Err(err.into()),
    }
}

/// Initialize Sentry when a DSN is configured
pub fn setup_sentry() -> Option<sentry::ClientInitGuard> {
    let dsn = std::env::var("SENTRY_DSN").ok().filter(|dsn| !dsn.is_empty())?;

    Some(sentry::init((
        dsn,
        sentry::ClientOptions {
            release: sentry::release_name!(),
            ..Default::default()
        },
    )))
}

pub fn setup_tracing(crate_name: &str) -> color_eyre::Result<()> {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("warn,{crate_name}=info,tower_http=debug")));

    tracing_subscriber::registry()
        .with(
            HierarchicalLayer::new(2)
                .with_targets(true)
                .with_bracketed_fields(true),
        )
        .with(env_filter)
        .try_init()?;

    Ok(())
}
