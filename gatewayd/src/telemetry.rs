use anyhow::Result;
use tracing_subscriber::{filter::EnvFilter, fmt};

use crate::config::Config;

/// `RUST_LOG` wins over the configured level.
pub fn init_tracing(cfg: &Config) -> Result<()> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cfg.log_level));
    fmt().with_env_filter(filter).compact().init();
    Ok(())
}
