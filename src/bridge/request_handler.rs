use std::{collections::HashMap, future::Future, sync::Arc};

use async_trait::async_trait;
use serde_json::Value;
use tracing::warn;
use uuid::Uuid;

use crate::bridge::event_registry::RegistrationId;
use crate::error::HandlerFailure;
use crate::message::BridgeMessage;

pub type HandlerResult = Result<Option<Value>, HandlerFailure>;

/// Answers inbound requests of one name.
///
/// The returned value becomes the response data; an `Err` becomes a response
/// carrying the failure.
#[async_trait]
pub trait RequestHandler: Send + Sync {
    async fn handle(&self, request: BridgeMessage) -> HandlerResult;
}

#[async_trait]
impl<F, Fut> RequestHandler for F
where
    F: Fn(BridgeMessage) -> Fut + Send + Sync,
    Fut: Future<Output = HandlerResult> + Send + 'static,
{
    async fn handle(&self, request: BridgeMessage) -> HandlerResult {
        self(request).await
    }
}

struct HandlerRegistration {
    id: RegistrationId,
    handler: Arc<dyn RequestHandler>,
}

/// One handler per request name. Same dispatch-context contract as
/// [`crate::bridge::EventRegistry`].
#[derive(Default)]
pub struct RequestHandlerRegistry {
    handlers: HashMap<String, HandlerRegistration>,
}

impl RequestHandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(
        &mut self,
        request_name: impl Into<String>,
        handler: Arc<dyn RequestHandler>,
    ) -> RegistrationId {
        let id = Uuid::new_v4();
        self.register_with_id(id, request_name, handler);
        id
    }

    /// Replaces any handler already registered for the name.
    pub(crate) fn register_with_id(
        &mut self,
        id: RegistrationId,
        request_name: impl Into<String>,
        handler: Arc<dyn RequestHandler>,
    ) {
        let request_name = request_name.into();
        if let Some(previous) = self
            .handlers
            .insert(request_name.clone(), HandlerRegistration { id, handler })
        {
            warn!(
                name = %request_name,
                previous = %previous.id,
                "Request handler replaced"
            );
        }
    }

    pub fn unregister(&mut self, id: RegistrationId) -> bool {
        let before = self.handlers.len();
        self.handlers.retain(|_, registration| registration.id != id);
        self.handlers.len() != before
    }

    pub fn handler_for(&self, request_name: &str) -> Option<Arc<dyn RequestHandler>> {
        self.handlers
            .get(request_name)
            .map(|registration| registration.handler.clone())
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn constant(value: Value) -> Arc<dyn RequestHandler> {
        Arc::new(move |_request: BridgeMessage| {
            let value = value.clone();
            async move { Ok::<_, HandlerFailure>(Some(value)) }
        })
    }

    #[tokio::test]
    async fn test_closure_handler() {
        let mut registry = RequestHandlerRegistry::new();
        registry.register("getUser", constant(json!({"name": "Ann"})));

        let handler = registry.handler_for("getUser").unwrap();
        let request = BridgeMessage::request("getUser", None).unwrap();
        assert_eq!(handler.handle(request).await, Ok(Some(json!({"name": "Ann"}))));
        assert!(registry.handler_for("other").is_none());
    }

    #[tokio::test]
    async fn test_register_replaces() {
        let mut registry = RequestHandlerRegistry::new();
        let first = registry.register("getUser", constant(json!(1)));
        registry.register("getUser", constant(json!(2)));
        assert_eq!(registry.len(), 1);

        // The replaced registration is gone.
        assert!(!registry.unregister(first));

        let request = BridgeMessage::request("getUser", None).unwrap();
        let handler = registry.handler_for("getUser").unwrap();
        assert_eq!(handler.handle(request).await, Ok(Some(json!(2))));
    }

    #[test]
    fn test_unregister() {
        let mut registry = RequestHandlerRegistry::new();
        let id = registry.register("getUser", constant(json!(null)));
        assert!(registry.unregister(id));
        assert!(registry.is_empty());
    }
}
