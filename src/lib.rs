//! # rn-bridge: Native/JavaScript Message Bridge
//!
//! A transport-agnostic bridge between a native host and an embedded
//! JavaScript runtime. It carries three kinds of message (events, requests
//! and responses) and moves typed domain values across the boundary.
//!
//! ## Layers
//!
//! - Envelope: [`message`] defines [`BridgeMessage`] and its keyed wire form
//! - Dispatch: [`bridge`] routes inbound traffic, correlates responses with
//!   requests and enforces timeouts on one dispatch task
//! - Values: [`codec`] and [`model`] convert typed values to keyed maps with a
//!   checked type tag
//!
//! ## Ambient
//!
//! - Configuration ([`config`]), loaded from JSON
//! - Errors ([`error`])
//! - Logging through `tracing`; [`logging::init_tracing`] for hosts without a subscriber

pub mod bridge;
pub mod codec;
pub mod config;
pub mod error;
pub mod logging;
pub mod message;
pub mod model;

// Re-exports
pub use bridge::*;
pub use codec::{Bridgeable, KeyedMap, TYPE_TAG_KEY};
pub use config::BridgeConfig;
pub use error::*;
pub use message::{BridgeMessage, MessageType};

#[cfg(test)]
mod tests {
    use tracing_subscriber::{EnvFilter, FmtSubscriber};

    #[ctor::ctor]
    fn init_tests() {
        let subscriber = FmtSubscriber::builder()
            .with_env_filter(EnvFilter::from_default_env())
            .with_test_writer()
            .finish();
        tracing::subscriber::set_global_default(subscriber)
            .expect("Failed to set tracing subscriber");
    }
}
