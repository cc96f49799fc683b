//! # Message Bridge
//!
//! The bridge connects local (native) code with a remote (JavaScript) runtime
//! over a [`Transport`]. Three kinds of message cross it:
//!
//! - **Events** fan out to every listener registered for the event name
//! - **Requests** go to the single handler registered for the request name,
//!   which answers with exactly one response
//! - **Responses** are matched to the pending request with the same id
//!
//! ## Components
//!
//! - [`EventRegistry`]: event name to ordered listeners
//! - [`RequestHandlerRegistry`]: request name to handler
//! - [`RequestManager`]: pending requests, timeouts, response correlation
//! - [`Bridge`] / [`BridgeHandle`]: the dispatch task and its public facade
//!
//! ## Request-Response Flow
//!
//! ```text
//! ┌─────────┐ send_request ┌──────────┐ to_wire ┌────────┐
//! │Requester│─────────────▶│Dispatcher│────────▶│ Remote │
//! └────▲────┘              └────┬─────┘         └───┬────┘
//!      │ PendingResponse        │ resolve           │ response
//!      └────────────────────────┴───────────────────┘
//! ```
//!
//! ## Example
//!
//! ```rust,no_run
//! # use std::sync::Arc;
//! # use rn_bridge::{Bridge, BridgeConfig, BridgeMessage, ChannelTransport};
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let (transport, _remote) = ChannelTransport::pair();
//! let bridge = Bridge::start(&BridgeConfig::default(), Arc::new(transport));
//! let handle = bridge.handle();
//!
//! handle.add_event_listener("loggedOut", |event: &BridgeMessage| {
//!     println!("logged out: {:?}", event.data());
//! })?;
//! handle.notify_ready()?;
//!
//! match handle.send_request("getUser", None)?.await {
//!     Ok(data) => println!("user: {:?}", data),
//!     Err(e) => println!("request failed: {}", e),
//! }
//! bridge.shutdown().await?;
//! # Ok(())
//! # }
//! ```

pub mod dispatcher;
pub mod event_registry;
pub mod request_handler;
pub mod request_manager;
pub mod transport;

pub use dispatcher::{Bridge, BridgeHandle, BridgeStats};
pub use event_registry::{EventListener, EventRegistry, ListenerRegistration, RegistrationId};
pub use request_handler::{HandlerResult, RequestHandler, RequestHandlerRegistry};
pub use request_manager::{
    PendingRequest, PendingResponse, RequestId, RequestManager, RequestState, ResponseOutcome,
};
pub use transport::{ChannelTransport, InboundHandler, RemoteEndpoint, Transport};
