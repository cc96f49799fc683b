//! # Bridge Dispatcher
//!
//! A [`Bridge`] owns one dispatch task. That task is the only place where the
//! event registry, the request handler registry, the pending request map and
//! the readiness backlog are touched, and the only writer to the transport.
//! Everything else talks to it through a [`BridgeHandle`], which turns each
//! call into a [`Command`] on an unbounded queue and never blocks.
//!
//! ```text
//!  host code ──BridgeHandle──┐
//!  transport callback ───────┤   commands    ┌──────────────┐   send_to_remote
//!  request handler tasks ────┼──────────────▶│ dispatch task│─────────────────▶ remote
//!  request timers ───────────┘  (expiries)   └──────────────┘
//! ```

use std::{
    collections::VecDeque,
    panic::{self, AssertUnwindSafe},
    sync::Arc,
    time::Duration,
};

use futures::FutureExt;
use serde_json::Value;
use tokio::{
    sync::{mpsc, oneshot},
    task::JoinHandle,
};
use tracing::{debug, error, info, trace, warn};
use uuid::Uuid;

use crate::bridge::event_registry::{EventListener, EventRegistry, RegistrationId};
use crate::bridge::request_handler::{RequestHandler, RequestHandlerRegistry};
use crate::bridge::request_manager::{
    PendingResponse, RequestId, RequestManager, ResponseOutcome, ResultSender,
};
use crate::bridge::transport::Transport;
use crate::codec::Bridgeable;
use crate::config::BridgeConfig;
use crate::error::{BridgeError, BridgeResult, HandlerFailure};
use crate::message::{BridgeMessage, MessageType};
use crate::{Error, InternalResult};

pub(crate) enum Command {
    Ready,
    Inbound(Value),
    Event(BridgeMessage),
    Request {
        request: BridgeMessage,
        timeout: Duration,
        sender: ResultSender,
    },
    Reply(BridgeMessage),
    Cancel {
        request_id: RequestId,
        reason: String,
    },
    AddListener {
        id: RegistrationId,
        event_name: String,
        listener: Arc<dyn EventListener>,
    },
    RemoveListener(RegistrationId),
    AddHandler {
        id: RegistrationId,
        request_name: String,
        handler: Arc<dyn RequestHandler>,
    },
    RemoveHandler(RegistrationId),
    Stats(oneshot::Sender<BridgeStats>),
    Shutdown,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BridgeStats {
    pub pending_requests: usize,
    pub listeners: usize,
    pub request_handlers: usize,
    pub backlog: usize,
    pub ready: bool,
    /// Events discarded because the backlog was full before readiness.
    pub dropped_events: usize,
}

/// A running bridge. Dropping it stops the dispatch task; prefer
/// [`Bridge::shutdown`] to wait for it.
pub struct Bridge {
    handle: BridgeHandle,
    task: Option<JoinHandle<()>>,
}

impl Bridge {
    /// Spawns the dispatch task and hooks it to `transport`. Must be called
    /// inside a tokio runtime.
    pub fn start(config: &BridgeConfig, transport: Arc<dyn Transport>) -> Self {
        let (commands_tx, commands_rx) = mpsc::unbounded_channel();
        let (expired_tx, expired_rx) = mpsc::unbounded_channel();

        let handle = BridgeHandle {
            commands: commands_tx.clone(),
            default_timeout: config.default_request_timeout,
        };
        let inbound = handle.clone();
        transport.on_remote_message(Box::new(move |raw| {
            if inbound.receive_from_remote(raw).is_err() {
                debug!("Inbound message after shutdown, dropped");
            }
        }));

        let dispatcher = Dispatcher {
            transport,
            events: EventRegistry::new(),
            handlers: RequestHandlerRegistry::new(),
            requests: RequestManager::new(expired_tx),
            ready: false,
            backlog: VecDeque::new(),
            backlog_limit: config.ready_backlog_limit,
            dropped_events: 0,
            commands: commands_tx,
        };
        let task = tokio::spawn(dispatcher.run(commands_rx, expired_rx));
        info!("Bridge started");

        Self {
            handle,
            task: Some(task),
        }
    }

    pub fn handle(&self) -> BridgeHandle {
        self.handle.clone()
    }

    /// Stops the dispatch task. Requests still pending fail with `ShutDown`.
    pub async fn shutdown(mut self) -> InternalResult<()> {
        let _ = self.handle.submit(Command::Shutdown);
        if let Some(task) = self.task.take() {
            task.await
                .map_err(|e| Error::internal(format!("Dispatch task failed: {}", e)))?;
        }
        Ok(())
    }
}

impl Drop for Bridge {
    fn drop(&mut self) {
        if self.task.is_some() {
            let _ = self.handle.submit(Command::Shutdown);
        }
    }
}

/// Cloneable entry point to a running [`Bridge`], usable from any thread.
#[derive(Clone)]
pub struct BridgeHandle {
    commands: mpsc::UnboundedSender<Command>,
    default_timeout: Duration,
}

impl BridgeHandle {
    fn submit(&self, command: Command) -> BridgeResult<()> {
        self.commands
            .send(command)
            .map_err(|_| BridgeError::ShutDown)
    }

    /// Signals that the remote runtime is initialized; buffered traffic is flushed.
    pub fn notify_ready(&self) -> BridgeResult<()> {
        self.submit(Command::Ready)
    }

    /// Hands a raw message from the remote side to the dispatch task.
    pub fn receive_from_remote(&self, raw: Value) -> BridgeResult<()> {
        self.submit(Command::Inbound(raw))
    }

    /// Queues an event for the remote side.
    ///
    /// `Ok` means the event was accepted by the dispatch task, not delivered.
    /// Before readiness a full backlog drops the event; such drops are counted
    /// in [`BridgeStats::dropped_events`].
    pub fn send_event(&self, name: impl Into<String>, data: Option<Value>) -> BridgeResult<()> {
        let event = BridgeMessage::event(name, data)?;
        self.submit(Command::Event(event))
    }

    pub fn send_bridgeable_event<T: Bridgeable>(
        &self,
        name: impl Into<String>,
        value: &T,
    ) -> BridgeResult<()> {
        self.send_event(name, Some(value.to_payload()))
    }

    /// Sends a request with the configured default timeout.
    pub fn send_request(
        &self,
        name: impl Into<String>,
        data: Option<Value>,
    ) -> BridgeResult<PendingResponse> {
        self.send_request_with_timeout(name, data, self.default_timeout)
    }

    pub fn send_request_with_timeout(
        &self,
        name: impl Into<String>,
        data: Option<Value>,
        timeout: Duration,
    ) -> BridgeResult<PendingResponse> {
        let request = BridgeMessage::request(name, data)?;
        let (sender, pending) = PendingResponse::new(request.id().to_string());
        self.submit(Command::Request {
            request,
            timeout,
            sender,
        })?;
        Ok(pending)
    }

    /// Fails a pending request with `Cancelled`. No-op once it has settled.
    pub fn cancel_request(&self, request_id: &str, reason: &str) -> BridgeResult<()> {
        self.submit(Command::Cancel {
            request_id: request_id.to_string(),
            reason: reason.to_string(),
        })
    }

    pub fn add_event_listener(
        &self,
        event_name: impl Into<String>,
        listener: impl EventListener + 'static,
    ) -> BridgeResult<RegistrationId> {
        let event_name = non_empty(event_name.into())?;
        let id = Uuid::new_v4();
        self.submit(Command::AddListener {
            id,
            event_name,
            listener: Arc::new(listener),
        })?;
        Ok(id)
    }

    pub fn remove_event_listener(&self, id: RegistrationId) -> BridgeResult<()> {
        self.submit(Command::RemoveListener(id))
    }

    /// Registers the handler answering inbound requests named `request_name`,
    /// replacing any previous one.
    pub fn register_request_handler(
        &self,
        request_name: impl Into<String>,
        handler: impl RequestHandler + 'static,
    ) -> BridgeResult<RegistrationId> {
        let request_name = non_empty(request_name.into())?;
        let id = Uuid::new_v4();
        self.submit(Command::AddHandler {
            id,
            request_name,
            handler: Arc::new(handler),
        })?;
        Ok(id)
    }

    pub fn unregister_request_handler(&self, id: RegistrationId) -> BridgeResult<()> {
        self.submit(Command::RemoveHandler(id))
    }

    pub async fn stats(&self) -> BridgeResult<BridgeStats> {
        let (tx, rx) = oneshot::channel();
        self.submit(Command::Stats(tx))?;
        rx.await.map_err(|_| BridgeError::ShutDown)
    }
}

fn non_empty(name: String) -> BridgeResult<String> {
    if name.is_empty() {
        return Err(BridgeError::InvalidMessage(
            "name must not be empty".to_string(),
        ));
    }
    Ok(name)
}

struct Dispatcher {
    transport: Arc<dyn Transport>,
    events: EventRegistry,
    handlers: RequestHandlerRegistry,
    requests: RequestManager,
    ready: bool,
    backlog: VecDeque<BridgeMessage>,
    backlog_limit: usize,
    dropped_events: usize,
    commands: mpsc::UnboundedSender<Command>,
}

impl Dispatcher {
    async fn run(
        mut self,
        mut commands: mpsc::UnboundedReceiver<Command>,
        mut expired: mpsc::UnboundedReceiver<RequestId>,
    ) {
        loop {
            tokio::select! {
                Some(request_id) = expired.recv() => {
                    if self.requests.expire(&request_id) {
                        self.discard_buffered(&request_id);
                    }
                }
                command = commands.recv() => match command {
                    Some(Command::Shutdown) | None => break,
                    Some(command) => self.handle_command(command),
                },
            }
        }

        let cancelled = self.requests.cancel_all(BridgeError::ShutDown);
        info!(cancelled, dropped = self.backlog.len(), "Bridge stopped");
    }

    fn handle_command(&mut self, command: Command) {
        match command {
            Command::Ready => self.on_ready(),
            Command::Inbound(raw) => self.on_inbound(raw),
            Command::Event(event) => self.emit(event),
            Command::Request {
                request,
                timeout,
                sender,
            } => {
                if self.requests.track(&request, timeout, sender).is_ok() {
                    self.emit(request);
                }
            }
            Command::Reply(response) => self.emit(response),
            Command::Cancel { request_id, reason } => {
                if self.requests.cancel(&request_id, &reason) {
                    self.discard_buffered(&request_id);
                } else {
                    debug!(request_id = %request_id, "Cancel for settled request ignored");
                }
            }
            Command::AddListener {
                id,
                event_name,
                listener,
            } => {
                debug!(name = %event_name, id = %id, "Event listener added");
                self.events.register_with_id(id, event_name, listener);
            }
            Command::RemoveListener(id) => {
                self.events.unregister(id);
            }
            Command::AddHandler {
                id,
                request_name,
                handler,
            } => {
                debug!(name = %request_name, id = %id, "Request handler added");
                self.handlers.register_with_id(id, request_name, handler);
            }
            Command::RemoveHandler(id) => {
                self.handlers.unregister(id);
            }
            Command::Stats(reply) => {
                let _ = reply.send(BridgeStats {
                    pending_requests: self.requests.pending_count(),
                    listeners: self.events.len(),
                    request_handlers: self.handlers.len(),
                    backlog: self.backlog.len(),
                    ready: self.ready,
                    dropped_events: self.dropped_events,
                });
            }
            // handled by the run loop
            Command::Shutdown => {}
        }
    }

    fn on_ready(&mut self) {
        if self.ready {
            return;
        }
        self.ready = true;
        info!(flushed = self.backlog.len(), "Remote runtime ready");
        while let Some(message) = self.backlog.pop_front() {
            // Settled requests are normally discarded already; never send one.
            if message.message_type() == MessageType::Request
                && !self.requests.contains(message.id())
            {
                debug!(request_id = %message.id(), "Settled request not flushed");
                continue;
            }
            self.write(message);
        }
    }

    /// Removes a buffered request that settled before the remote side became ready.
    fn discard_buffered(&mut self, request_id: &str) {
        let before = self.backlog.len();
        self.backlog.retain(|message| {
            message.message_type() != MessageType::Request || message.id() != request_id
        });
        if self.backlog.len() != before {
            debug!(request_id, "Settled request removed from backlog");
        }
    }

    fn on_inbound(&mut self, raw: Value) {
        let message = match BridgeMessage::from_wire(&raw) {
            Ok(message) => message,
            Err(e) => {
                warn!(error = %e, "Malformed inbound message dropped");
                return;
            }
        };
        debug_message("Inbound", &message);

        match message.message_type() {
            MessageType::Event => self.dispatch_event(&message),
            MessageType::Request => self.dispatch_request(message),
            MessageType::Response => {
                if self.requests.resolve(message) == ResponseOutcome::Unmatched {
                    trace!("Response had no recipient");
                }
            }
        }
    }

    fn dispatch_event(&self, event: &BridgeMessage) {
        let listeners = self.events.listeners_for(event.name());
        if listeners.is_empty() {
            debug!(name = %event.name(), "No listeners for event, dropped");
            return;
        }
        for listener in listeners {
            if panic::catch_unwind(AssertUnwindSafe(|| listener.on_event(event))).is_err() {
                error!(name = %event.name(), "Event listener panicked");
            }
        }
    }

    fn dispatch_request(&mut self, request: BridgeMessage) {
        let Some(handler) = self.handlers.handler_for(request.name()) else {
            warn!(name = %request.name(), "No request handler registered");
            let failure = HandlerFailure::new(
                HandlerFailure::NO_HANDLER,
                format!("No registered request handler for request name {}", request.name()),
            );
            self.reply(&request, Err(failure));
            return;
        };

        let commands = self.commands.clone();
        tokio::spawn(async move {
            let outcome = match AssertUnwindSafe(handler.handle(request.clone()))
                .catch_unwind()
                .await
            {
                Ok(outcome) => outcome,
                Err(_) => {
                    error!(name = %request.name(), "Request handler panicked");
                    Err(HandlerFailure::new(
                        HandlerFailure::HANDLER_PANICKED,
                        format!("Request handler for {} panicked", request.name()),
                    ))
                }
            };
            match request.reply(outcome) {
                Ok(response) => {
                    if commands.send(Command::Reply(response)).is_err() {
                        debug!(name = %request.name(), "Bridge stopped before reply");
                    }
                }
                Err(e) => error!(error = %e, "Failed to build response"),
            }
        });
    }

    fn reply(&mut self, request: &BridgeMessage, outcome: Result<Option<Value>, HandlerFailure>) {
        match request.reply(outcome) {
            Ok(response) => self.emit(response),
            Err(e) => error!(error = %e, "Failed to build response"),
        }
    }

    /// Writes now if the remote side is ready, otherwise buffers.
    fn emit(&mut self, message: BridgeMessage) {
        if self.ready {
            self.write(message);
            return;
        }
        if self.backlog.len() >= self.backlog_limit {
            warn!(
                name = %message.name(),
                limit = self.backlog_limit,
                "Backlog full before remote ready, message rejected"
            );
            if message.message_type() == MessageType::Event {
                self.dropped_events += 1;
            }
            self.reject(&message, BridgeError::NotReady);
            return;
        }
        trace!(name = %message.name(), "Remote not ready, message buffered");
        self.backlog.push_back(message);
    }

    fn write(&mut self, message: BridgeMessage) {
        debug_message("Outbound", &message);
        if let Err(e) = self.transport.send_to_remote(message.to_wire()) {
            error!(name = %message.name(), error = %e, "Transport send failed");
            self.reject(&message, BridgeError::Transport(e));
        }
    }

    fn reject(&mut self, message: &BridgeMessage, error: BridgeError) {
        if message.message_type() == MessageType::Request {
            self.requests.fail(message.id(), error);
        }
    }
}

fn debug_message(prefix: &str, message: &BridgeMessage) {
    debug!(
        id = %message.id(),
        name = %message.name(),
        message_type = %message.message_type(),
        failed = message.is_failure(),
        "{} message",
        prefix
    );
}
