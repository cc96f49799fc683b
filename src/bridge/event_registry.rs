use std::{collections::HashMap, sync::Arc};

use uuid::Uuid;

use crate::message::BridgeMessage;

pub type RegistrationId = Uuid;

pub trait EventListener: Send + Sync {
    fn on_event(&self, event: &BridgeMessage);
}

impl<F> EventListener for F
where
    F: Fn(&BridgeMessage) + Send + Sync,
{
    fn on_event(&self, event: &BridgeMessage) {
        self(event)
    }
}

#[derive(Clone)]
pub struct ListenerRegistration {
    pub id: RegistrationId,
    pub event_name: String,
    pub listener: Arc<dyn EventListener>,
}

/// Event name to listeners, in registration order.
///
/// There is no internal locking: a registry must only be read and mutated
/// from the dispatch context that owns it. The bridge dispatcher keeps its
/// registry inside the dispatch task to uphold this.
#[derive(Default)]
pub struct EventRegistry {
    listeners: HashMap<String, Vec<ListenerRegistration>>,
    names: HashMap<RegistrationId, String>,
}

impl EventRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(
        &mut self,
        event_name: impl Into<String>,
        listener: Arc<dyn EventListener>,
    ) -> RegistrationId {
        let id = Uuid::new_v4();
        self.register_with_id(id, event_name, listener);
        id
    }

    /// Registers under an id chosen by the caller (handles pre-allocate ids).
    pub(crate) fn register_with_id(
        &mut self,
        id: RegistrationId,
        event_name: impl Into<String>,
        listener: Arc<dyn EventListener>,
    ) {
        let event_name = event_name.into();
        self.names.insert(id, event_name.clone());
        self.listeners
            .entry(event_name.clone())
            .or_default()
            .push(ListenerRegistration {
                id,
                event_name,
                listener,
            });
    }

    /// Returns whether a listener was removed. Unknown ids are a no-op.
    pub fn unregister(&mut self, id: RegistrationId) -> bool {
        let Some(event_name) = self.names.remove(&id) else {
            return false;
        };
        if let Some(registrations) = self.listeners.get_mut(&event_name) {
            registrations.retain(|registration| registration.id != id);
            if registrations.is_empty() {
                self.listeners.remove(&event_name);
            }
        }
        true
    }

    /// Snapshot of the listeners for `event_name`; later (un)registrations
    /// do not change an already returned snapshot.
    pub fn listeners_for(&self, event_name: &str) -> Vec<Arc<dyn EventListener>> {
        self.listeners
            .get(event_name)
            .map(|registrations| {
                registrations
                    .iter()
                    .map(|registration| registration.listener.clone())
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}
