//! # Request Manager
//!
//! Correlates outbound requests with the responses that come back over the
//! bridge. Each request is registered under its message id together with a
//! oneshot sender; the caller keeps the matching [`PendingResponse`].
//!
//! ## Lifecycle
//!
//! ```text
//! Pending ──response──▶ Resolved
//!    │ ───timer──────▶ TimedOut
//!    └ ───cancel─────▶ Cancelled
//! ```
//!
//! Settling removes the entry, so whichever of response, timeout or
//! cancellation comes first wins and every later signal finds nothing to do.
//!
//! ## Timers
//!
//! The timer task never touches the pending map. On expiry it sends the
//! request id over the expiry channel, and the owner of the manager (the
//! dispatch task) calls [`RequestManager::expire`].

use std::{
    collections::HashMap,
    future::Future,
    pin::Pin,
    task::{Context, Poll},
    time::Duration,
};

use chrono::{DateTime, Utc};
use serde_json::Value;
use tokio::{
    sync::{mpsc, oneshot},
    task::JoinHandle,
};
use tracing::{debug, instrument, warn};

use crate::codec::Bridgeable;
use crate::error::{BridgeError, BridgeResult, DecodeError};
use crate::message::{BridgeMessage, MessageType};

pub type RequestId = String;

pub(crate) type ResultSender = oneshot::Sender<BridgeResult<Option<Value>>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
pub enum RequestState {
    Pending,
    Resolved,
    TimedOut,
    Cancelled,
}

/// A request awaiting its response.
pub struct PendingRequest {
    pub id: RequestId,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub timeout: Duration,
    sender: ResultSender,
    timer: JoinHandle<()>,
}

/// Deferred result of a request. Resolves exactly once.
#[derive(Debug)]
pub struct PendingResponse {
    request_id: RequestId,
    receiver: oneshot::Receiver<BridgeResult<Option<Value>>>,
}

impl PendingResponse {
    pub(crate) fn new(request_id: RequestId) -> (ResultSender, Self) {
        let (sender, receiver) = oneshot::channel();
        (
            sender,
            Self {
                request_id,
                receiver,
            },
        )
    }

    pub fn request_id(&self) -> &str {
        &self.request_id
    }

    /// Awaits the response and decodes its data as `T`.
    pub async fn decode<T: Bridgeable>(self) -> BridgeResult<T> {
        let data = self
            .await?
            .ok_or_else(|| DecodeError::MissingField("data".to_string()))?;
        Ok(T::from_payload(&data)?)
    }
}

impl Future for PendingResponse {
    type Output = BridgeResult<Option<Value>>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.receiver)
            .poll(cx)
            .map(|result| result.unwrap_or(Err(BridgeError::ShutDown)))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseOutcome {
    Delivered,
    /// No pending request with that id: unknown, late, or duplicate.
    Unmatched,
}

/// Pending requests keyed by id. Owned by the dispatch task; no internal locking.
pub struct RequestManager {
    pending: HashMap<RequestId, PendingRequest>,
    expired_tx: mpsc::UnboundedSender<RequestId>,
}

impl RequestManager {
    /// Expired request ids are sent to `expired_tx`; the receiver must feed
    /// them back into [`RequestManager::expire`].
    pub fn new(expired_tx: mpsc::UnboundedSender<RequestId>) -> Self {
        Self {
            pending: HashMap::new(),
            expired_tx,
        }
    }

    /// Registers `request` and starts its timer. Must run inside a tokio runtime.
    pub fn register(
        &mut self,
        request: &BridgeMessage,
        timeout: Duration,
    ) -> BridgeResult<PendingResponse> {
        let (sender, pending_response) = PendingResponse::new(request.id().to_string());
        self.track(request, timeout, sender)?;
        Ok(pending_response)
    }

    /// Like [`RequestManager::register`] for a result slot created by the caller.
    /// A rejected request also fails its slot.
    #[instrument(skip(self, request, sender), fields(request_id = %request.id(), name = %request.name()))]
    pub(crate) fn track(
        &mut self,
        request: &BridgeMessage,
        timeout: Duration,
        sender: ResultSender,
    ) -> BridgeResult<()> {
        let rejection = if request.message_type() != MessageType::Request {
            Some(format!("expected a request, got {}", request.message_type()))
        } else if self.pending.contains_key(request.id()) {
            Some(format!("request id already pending: {}", request.id()))
        } else {
            None
        };
        if let Some(reason) = rejection {
            let error = BridgeError::InvalidMessage(reason);
            let _ = sender.send(Err(error.clone()));
            return Err(error);
        }

        let request_id = request.id().to_string();
        let timer = {
            let expired_tx = self.expired_tx.clone();
            let request_id = request_id.clone();
            tokio::spawn(async move {
                tokio::time::sleep(timeout).await;
                let _ = expired_tx.send(request_id);
            })
        };

        self.pending.insert(
            request_id.clone(),
            PendingRequest {
                id: request_id,
                name: request.name().to_string(),
                created_at: Utc::now(),
                timeout,
                sender,
                timer,
            },
        );
        debug!("Request registered");
        Ok(())
    }

    /// Routes a response to its pending request.
    #[instrument(skip(self, response), fields(request_id = %response.id(), name = %response.name()))]
    pub fn resolve(&mut self, response: BridgeMessage) -> ResponseOutcome {
        if !self.pending.contains_key(response.id()) {
            debug!("No pending request for response, dropped");
            return ResponseOutcome::Unmatched;
        }
        let request_id = response.id().to_string();
        let outcome = response.into_outcome().map_err(BridgeError::Handler);
        self.settle(&request_id, RequestState::Resolved, outcome);
        ResponseOutcome::Delivered
    }

    /// Fails the request with `Timeout` if it is still pending.
    pub fn expire(&mut self, request_id: &str) -> bool {
        let Some(timeout) = self.pending.get(request_id).map(|p| p.timeout) else {
            debug!(request_id, "Timer fired for settled request, ignored");
            return false;
        };
        warn!(request_id, timeout_ms = timeout.as_millis() as u64, "Request timed out");
        self.settle(
            request_id,
            RequestState::TimedOut,
            Err(BridgeError::Timeout {
                request_id: request_id.to_string(),
                timeout_ms: timeout.as_millis() as u64,
            }),
        )
    }

    pub fn cancel(&mut self, request_id: &str, reason: &str) -> bool {
        self.settle(
            request_id,
            RequestState::Cancelled,
            Err(BridgeError::Cancelled(reason.to_string())),
        )
    }

    /// Fails a pending request with an arbitrary error (e.g. it could not be sent).
    pub fn fail(&mut self, request_id: &str, error: BridgeError) -> bool {
        self.settle(request_id, RequestState::Cancelled, Err(error))
    }

    /// Fails every pending request with `error`. Returns how many were pending.
    pub fn cancel_all(&mut self, error: BridgeError) -> usize {
        let ids: Vec<RequestId> = self.pending.keys().cloned().collect();
        for id in &ids {
            self.settle(id, RequestState::Cancelled, Err(error.clone()));
        }
        ids.len()
    }

    pub fn contains(&self, request_id: &str) -> bool {
        self.pending.contains_key(request_id)
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    fn settle(
        &mut self,
        request_id: &str,
        state: RequestState,
        outcome: BridgeResult<Option<Value>>,
    ) -> bool {
        let Some(pending) = self.pending.remove(request_id) else {
            return false;
        };
        pending.timer.abort();
        let elapsed_ms = (Utc::now() - pending.created_at).num_milliseconds();
        debug!(
            request_id,
            name = %pending.name,
            state = %state,
            elapsed_ms,
            "Request settled"
        );
        if pending.sender.send(outcome).is_err() {
            // Caller dropped its PendingResponse.
            debug!(request_id, "Requester no longer waiting");
        }
        true
    }
}

impl Drop for RequestManager {
    fn drop(&mut self) {
        for pending in self.pending.values() {
            pending.timer.abort();
        }
    }
}
