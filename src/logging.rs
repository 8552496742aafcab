use anyhow::{Context, Result};
use tracing_subscriber::filter::{self, LevelFilter};
use tracing_subscriber::prelude::*;

/// Installs a stderr `fmt` subscriber that only shows this crate's events.
pub fn init_logging(verbose: bool) -> Result<()> {
    let level = if verbose {
        LevelFilter::DEBUG
    } else {
        LevelFilter::INFO
    };
    let layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_filter(filter::filter_fn(move |meta| {
            meta.target().starts_with(env!("CARGO_CRATE_NAME")) && *meta.level() <= level
        }));
    let registry = tracing_subscriber::registry().with(layer);
    tracing::subscriber::set_global_default(registry).context("install tracing subscriber")
}
