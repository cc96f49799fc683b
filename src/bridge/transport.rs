//! Transport boundary between the bridge and the remote runtime.

use std::sync::{Arc, RwLock};

use serde_json::Value;
use tokio::sync::mpsc;
use tracing::warn;

use crate::error::{TransportError, TransportResult};

/// Callback the transport invokes for every message received from the remote side.
pub type InboundHandler = Box<dyn Fn(Value) + Send + Sync>;

/// Duplex channel carrying serialized messages.
///
/// `send_to_remote` is called from the dispatch task only and must not block.
#[cfg_attr(test, mockall::automock)]
pub trait Transport: Send + Sync {
    fn send_to_remote(&self, message: Value) -> TransportResult<()>;

    fn on_remote_message(&self, handler: InboundHandler);
}

/// In-process transport. Outbound messages are readable from the paired
/// [`RemoteEndpoint`], which can also inject inbound messages.
pub struct ChannelTransport {
    outbound: mpsc::UnboundedSender<Value>,
    inbound: Arc<RwLock<Option<InboundHandler>>>,
}

pub struct RemoteEndpoint {
    outbound: mpsc::UnboundedReceiver<Value>,
    inbound: Arc<RwLock<Option<InboundHandler>>>,
}

impl ChannelTransport {
    pub fn pair() -> (ChannelTransport, RemoteEndpoint) {
        let (tx, rx) = mpsc::unbounded_channel();
        let inbound = Arc::new(RwLock::new(None));
        (
            ChannelTransport {
                outbound: tx,
                inbound: inbound.clone(),
            },
            RemoteEndpoint {
                outbound: rx,
                inbound,
            },
        )
    }
}

impl Transport for ChannelTransport {
    fn send_to_remote(&self, message: Value) -> TransportResult<()> {
        self.outbound
            .send(message)
            .map_err(|_| TransportError::Disconnected)
    }

    fn on_remote_message(&self, handler: InboundHandler) {
        if let Ok(mut slot) = self.inbound.write() {
            *slot = Some(handler);
        }
    }
}

impl RemoteEndpoint {
    /// Next message the bridge sent to this side, or `None` once the bridge is gone.
    pub async fn recv(&mut self) -> Option<Value> {
        self.outbound.recv().await
    }

    pub fn try_recv(&mut self) -> Option<Value> {
        self.outbound.try_recv().ok()
    }

    /// Delivers `message` to the bridge as if it came from the remote runtime.
    pub fn inject(&self, message: Value) -> TransportResult<()> {
        let slot = self
            .inbound
            .read()
            .map_err(|e| TransportError::SendFailed(e.to_string()))?;
        match slot.as_ref() {
            Some(handler) => {
                handler(message);
                Ok(())
            }
            None => {
                warn!("No inbound handler registered, message dropped");
                Err(TransportError::Disconnected)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::Mutex;

    #[tokio::test]
    async fn test_outbound_reaches_remote() {
        let (transport, mut remote) = ChannelTransport::pair();
        transport.send_to_remote(json!({"id": "1"})).unwrap();
        assert_eq!(remote.recv().await, Some(json!({"id": "1"})));
        assert_eq!(remote.try_recv(), None);
    }

    #[test]
    fn test_inject_requires_handler() {
        let (transport, remote) = ChannelTransport::pair();
        assert_eq!(
            remote.inject(json!({})),
            Err(TransportError::Disconnected)
        );

        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        transport.on_remote_message(Box::new(move |value| sink.lock().unwrap().push(value)));
        remote.inject(json!({"n": 1})).unwrap();
        assert_eq!(*seen.lock().unwrap(), vec![json!({"n": 1})]);
    }

    #[test]
    fn test_send_after_remote_dropped() {
        let (transport, remote) = ChannelTransport::pair();
        drop(remote);
        assert_eq!(
            transport.send_to_remote(json!({})),
            Err(TransportError::Disconnected)
        );
    }
}
