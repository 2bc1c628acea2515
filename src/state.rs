// Request lifecycle tracking
//
// Idle -> Pending -> {Success, Failed}. Only the newest request may move
// the state out of Pending; late results from superseded requests are
// dropped.

use serde_json::Value;
use std::sync::{Arc, Mutex, MutexGuard};
use uuid::Uuid;

use crate::cancel::CancelToken;
use crate::dispatcher::Dispatcher;
use crate::error::DispatchError;
use crate::kind::RequestKind;
use crate::params::RequestParams;

/// Identity of one dispatch attempt
pub type RequestId = Uuid;

#[derive(Debug, Clone, PartialEq)]
pub enum RequestState {
    Idle,
    Pending {
        id: RequestId,
        kind: RequestKind,
    },
    Success {
        id: RequestId,
        kind: RequestKind,
        body: Value,
    },
    Failed {
        id: RequestId,
        kind: RequestKind,
        message: String,
    },
}

impl RequestState {
    pub fn is_pending(&self) -> bool {
        matches!(self, RequestState::Pending { .. })
    }
}

/// Handed out by `RequestTracker::begin`
#[derive(Debug, Clone)]
pub struct Ticket {
    pub id: RequestId,
    pub kind: RequestKind,
    pub cancel: CancelToken,
}

struct Inner {
    state: RequestState,
    in_flight: Option<CancelToken>,
}

/// Thread-safe request state machine
pub struct RequestTracker {
    inner: Mutex<Inner>,
}

impl RequestTracker {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner {
                state: RequestState::Idle,
                in_flight: None,
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        // State is replaced wholesale, so a poisoned lock still holds a valid value
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Start a new request, superseding any pending one
    pub fn begin(&self, kind: RequestKind) -> Ticket {
        let ticket = Ticket {
            id: Uuid::new_v4(),
            kind,
            cancel: CancelToken::new(),
        };

        let mut inner = self.lock();
        if let Some(previous) = inner.in_flight.take() {
            if let RequestState::Pending { id, .. } = &inner.state {
                tracing::debug!(superseded = %id, by = %ticket.id, "Superseding pending request");
            }
            previous.cancel();
        }
        inner.state = RequestState::Pending {
            id: ticket.id,
            kind,
        };
        inner.in_flight = Some(ticket.cancel.clone());

        ticket
    }

    /// Record the outcome of a request.
    ///
    /// Returns `false` and leaves the state untouched when `id` is not the
    /// current pending request.
    pub fn finish(&self, id: RequestId, result: Result<Value, DispatchError>) -> bool {
        let mut inner = self.lock();
        let kind = match &inner.state {
            RequestState::Pending { id: current, kind } if *current == id => *kind,
            _ => {
                tracing::debug!(request = %id, "Discarding result of stale request");
                return false;
            }
        };

        inner.state = match result {
            Ok(body) => RequestState::Success { id, kind, body },
            Err(e) => RequestState::Failed {
                id,
                kind,
                message: e.user_message(),
            },
        };
        inner.in_flight = None;
        true
    }

    /// Cancel the pending request, if any, and return to `Idle`
    pub fn cancel(&self) -> bool {
        let mut inner = self.lock();
        match inner.in_flight.take() {
            Some(token) => {
                token.cancel();
                inner.state = RequestState::Idle;
                true
            }
            None => false,
        }
    }

    /// Copy of the current state
    pub fn state(&self) -> RequestState {
        self.lock().state.clone()
    }
}

impl Default for RequestTracker {
    fn default() -> Self {
        Self::new()
    }
}

/// A dispatcher paired with a tracker, for callers that show one result
/// at a time
#[derive(Clone)]
pub struct Session {
    dispatcher: Arc<Dispatcher>,
    tracker: Arc<RequestTracker>,
}

impl Session {
    pub fn new(dispatcher: Arc<Dispatcher>) -> Self {
        Self {
            dispatcher,
            tracker: Arc::new(RequestTracker::new()),
        }
    }

    /// Run one request through the state machine. Returns whether its
    /// result was applied (false if it was superseded or cancelled).
    pub async fn submit(&self, kind: RequestKind, params: &RequestParams) -> bool {
        let ticket = self.tracker.begin(kind);
        let result = self
            .dispatcher
            .dispatch_cancellable(kind, params, &ticket.cancel)
            .await;
        self.tracker.finish(ticket.id, result)
    }

    pub fn cancel(&self) -> bool {
        self.tracker.cancel()
    }

    pub fn state(&self) -> RequestState {
        self.tracker.state()
    }

    pub fn tracker(&self) -> &RequestTracker {
        &self.tracker
    }
}
