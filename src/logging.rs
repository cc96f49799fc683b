//! Tracing bootstrap for host applications.
//!
//! The bridge itself only emits `tracing` events. Hosts that do not install
//! their own subscriber can call [`init_tracing`] once at startup.

use tracing_subscriber::{EnvFilter, FmtSubscriber};

use crate::{config::LoggingConfig, Error, InternalResult};

/// Installs a global fmt subscriber. `RUST_LOG` wins over `config.filter`.
pub fn init_tracing(config: &LoggingConfig) -> InternalResult<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.filter))
        .map_err(|e| Error::internal(format!("Invalid log filter: {}", e)))?;

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(config.with_target)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .map_err(|e| Error::internal(format!("Failed to set tracing subscriber: {}", e)))
}
