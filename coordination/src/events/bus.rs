//! Broadcast fan-out of [`SessionEvent`]s.
//!
//! One channel carries every session; receivers narrow it down with an
//! [`EventFilter`]. There is no persistence and no replay. A receiver that
//! falls more than the channel capacity behind gets `Lagged` and has to
//! re-fetch the session view.

use std::sync::Arc;

use tokio::sync::broadcast::{self, error::RecvError, error::TryRecvError};
use tracing::debug;

use super::types::{ClassroomEvent, SessionEvent, Viewer};

/// Undelivered events buffered per receiver.
pub const DEFAULT_CAPACITY: usize = 256;

#[derive(Debug, thiserror::Error)]
pub enum EventBusError {
    #[error("event bus capacity must be at least 1")]
    ZeroCapacity,
}

pub type EventBusResult<T> = Result<T, EventBusError>;

pub type SharedEventBus = Arc<EventBus>;

pub struct EventBus {
    sender: broadcast::Sender<SessionEvent>,
}

impl EventBus {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(DEFAULT_CAPACITY);
        Self { sender }
    }

    pub fn with_capacity(capacity: usize) -> EventBusResult<Self> {
        if capacity == 0 {
            return Err(EventBusError::ZeroCapacity);
        }
        let (sender, _) = broadcast::channel(capacity);
        Ok(Self { sender })
    }

    pub fn shared(self) -> SharedEventBus {
        Arc::new(self)
    }

    /// Fan `event` out and return the number of live receivers.
    ///
    /// A session nobody is watching yields 0.
    pub fn publish(&self, event: SessionEvent) -> usize {
        let kind = event.event_type();
        let session_id = event.session_id.clone();
        let delivered = self.sender.send(event).unwrap_or(0);
        debug!(event_type = kind, %session_id, receivers = delivered, "Event published");
        delivered
    }

    /// Raw receiver over every session.
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.sender.subscribe()
    }

    /// Receiver that only yields events passing `filter`.
    pub fn subscribe_filtered(&self, filter: EventFilter) -> FilteredReceiver {
        FilteredReceiver {
            receiver: self.sender.subscribe(),
            filter,
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }

    pub fn has_subscribers(&self) -> bool {
        self.subscriber_count() > 0
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

/// Narrowing applied on the receiving side. Unset fields accept anything.
#[derive(Debug, Clone, Default)]
pub struct EventFilter {
    pub session_id: Option<String>,
    /// Drop events whose audience does not reach this viewer.
    pub viewer: Option<Viewer>,
    /// Drop pair events for other pairs. Session-wide events always pass.
    pub pair_id: Option<String>,
    /// Participant the receiver belongs to. Until their pair is known,
    /// every pair event is dropped; a `pairs_formed` event fills `pair_id`.
    pub member: Option<String>,
    /// Accept only these `type` tags.
    pub event_types: Option<Vec<String>>,
}

impl EventFilter {
    pub fn new() -> Self {
        Self::default()
    }

    /// What one connected client sees: its session, its audience.
    pub fn for_viewer(session_id: &str, viewer: Viewer) -> Self {
        Self::new().session(session_id).viewer(viewer)
    }

    pub fn session(self, session_id: &str) -> Self {
        Self {
            session_id: Some(session_id.to_owned()),
            ..self
        }
    }

    pub fn viewer(self, viewer: Viewer) -> Self {
        Self {
            viewer: Some(viewer),
            ..self
        }
    }

    pub fn pair(self, pair_id: &str) -> Self {
        Self {
            pair_id: Some(pair_id.to_owned()),
            ..self
        }
    }

    pub fn member(self, participant_id: &str) -> Self {
        Self {
            member: Some(participant_id.to_owned()),
            ..self
        }
    }

    pub fn types(self, kinds: &[&str]) -> Self {
        Self {
            event_types: Some(kinds.iter().map(|k| k.to_string()).collect()),
            ..self
        }
    }

    pub fn matches(&self, event: &SessionEvent) -> bool {
        let session_ok = self
            .session_id
            .as_deref()
            .map_or(true, |sid| sid == event.session_id);
        let audience_ok = self
            .viewer
            .map_or(true, |viewer| event.audience.reaches(viewer));
        let pair_ok = match (event.event.pair_id(), self.pair_id.as_deref()) {
            (None, _) => true,
            (Some(actual), Some(wanted)) => actual == wanted,
            (Some(_), None) => self.member.is_none(),
        };
        let type_ok = self
            .event_types
            .as_ref()
            .map_or(true, |kinds| kinds.iter().any(|k| k == event.event_type()));

        session_ok && audience_ok && pair_ok && type_ok
    }

    /// Adopt the member's pair from a `pairs_formed` event of the watched session.
    fn learn_pair(&mut self, event: &SessionEvent) {
        let Some(member) = self.member.as_deref() else {
            return;
        };
        if self.pair_id.is_some()
            || self.session_id.as_deref().is_some_and(|sid| sid != event.session_id)
        {
            return;
        }
        if let ClassroomEvent::PairsFormed { pairs, .. } = &event.event {
            self.pair_id = pairs
                .iter()
                .find(|p| p.side_a.id == member || p.side_b.id == member)
                .map(|p| p.pair_id.clone());
        }
    }
}

/// Broadcast receiver that skips events its filter rejects.
///
/// `Lagged` and `Closed` pass through unchanged.
pub struct FilteredReceiver {
    receiver: broadcast::Receiver<SessionEvent>,
    filter: EventFilter,
}

impl FilteredReceiver {
    pub fn filter(&self) -> &EventFilter {
        &self.filter
    }

    /// Restrict pair events to `pair_id` from here on.
    pub fn narrow_to_pair(self, pair_id: &str) -> Self {
        Self {
            filter: self.filter.pair(pair_id),
            ..self
        }
    }

    pub async fn recv(&mut self) -> Result<SessionEvent, RecvError> {
        loop {
            let event = self.receiver.recv().await?;
            self.filter.learn_pair(&event);
            if self.filter.matches(&event) {
                return Ok(event);
            }
        }
    }

    /// Non-blocking variant of [`recv`](Self::recv).
    pub fn try_recv(&mut self) -> Result<SessionEvent, TryRecvError> {
        loop {
            let event = self.receiver.try_recv()?;
            self.filter.learn_pair(&event);
            if self.filter.matches(&event) {
                return Ok(event);
            }
        }
    }
}
