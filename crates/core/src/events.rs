// Session-owned publish/subscribe channel for player events

use crate::registry::SessionId;
use crate::time::NativeTime;
use parking_lot::Mutex;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Named player events
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PlayerEvent {
    Started,
    Paused,
    Seek,
    Ready,
}

impl PlayerEvent {
    pub fn name(&self) -> &'static str {
        match self {
            PlayerEvent::Started => "started",
            PlayerEvent::Paused => "paused",
            PlayerEvent::Seek => "seek",
            PlayerEvent::Ready => "ready",
        }
    }
}

impl fmt::Display for PlayerEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Optional payload attached to an event
#[derive(Debug, Clone, PartialEq)]
pub enum EventData {
    /// Seek target in native units
    Position(NativeTime),
    Text(String),
}

/// What subscribers receive
#[derive(Debug, Clone, PartialEq)]
pub struct EventPayload {
    pub event: PlayerEvent,
    /// Session that emitted the event
    pub source: SessionId,
    pub data: Option<EventData>,
}

/// Player event listener
/// Called synchronously on the emitting thread; keep it short
pub trait PlayerListener: Send + Sync {
    fn on_event(&self, payload: &EventPayload);
}

impl<F> PlayerListener for F
where
    F: Fn(&EventPayload) + Send + Sync,
{
    fn on_event(&self, payload: &EventPayload) {
        self(payload)
    }
}

/// Handle returned by [`EventStream::subscribe`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

/// Fan-out event channel owned by one player session.
///
/// Delivery is synchronous and in registration order. Nothing is buffered:
/// a listener only sees events emitted after it subscribed.
pub struct EventStream {
    source: SessionId,
    listeners: Mutex<Vec<(SubscriptionId, Arc<dyn PlayerListener>)>>,
    next_id: AtomicU64,
}

impl EventStream {
    pub fn new(source: SessionId) -> Self {
        Self {
            source,
            listeners: Mutex::new(Vec::new()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Session that owns this stream
    pub fn source(&self) -> SessionId {
        self.source
    }

    pub fn subscribe(&self, listener: Arc<dyn PlayerListener>) -> SubscriptionId {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.listeners.lock().push((id, listener));
        id
    }

    pub fn subscribe_fn<F>(&self, f: F) -> SubscriptionId
    where
        F: Fn(&EventPayload) + Send + Sync + 'static,
    {
        self.subscribe(Arc::new(f))
    }

    /// Returns false when the id was not subscribed.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut listeners = self.listeners.lock();
        let before = listeners.len();
        listeners.retain(|(sub, _)| *sub != id);
        listeners.len() != before
    }

    pub fn clear(&self) {
        self.listeners.lock().clear();
    }

    pub fn subscriber_count(&self) -> usize {
        self.listeners.lock().len()
    }

    pub fn emit(&self, event: PlayerEvent, data: Option<EventData>) {
        let payload = EventPayload {
            event,
            source: self.source,
            data,
        };

        // Snapshot so listeners can (un)subscribe or call back into the player.
        let snapshot: Vec<Arc<dyn PlayerListener>> = self
            .listeners
            .lock()
            .iter()
            .map(|(_, listener)| Arc::clone(listener))
            .collect();

        log::debug!("emit {} to {} listener(s)", event, snapshot.len());
        for listener in snapshot {
            listener.on_event(&payload);
        }
    }
}

/// Recording listener for tests
#[cfg(any(test, feature = "test-util"))]
#[derive(Default)]
pub struct RecordingListener {
    events: Mutex<Vec<EventPayload>>,
}

#[cfg(any(test, feature = "test-util"))]
impl RecordingListener {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn events(&self) -> Vec<EventPayload> {
        self.events.lock().clone()
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.events.lock().iter().map(|p| p.event.name()).collect()
    }

    pub fn count(&self, event: PlayerEvent) -> usize {
        self.events.lock().iter().filter(|p| p.event == event).count()
    }

    pub fn clear(&self) {
        self.events.lock().clear();
    }
}

#[cfg(any(test, feature = "test-util"))]
impl PlayerListener for RecordingListener {
    fn on_event(&self, payload: &EventPayload) {
        self.events.lock().push(payload.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delivers_in_registration_order() {
        let stream = EventStream::new(SessionId::from_raw(7));
        let order = Arc::new(Mutex::new(Vec::new()));

        for tag in ["first", "second"] {
            let order = order.clone();
            stream.subscribe_fn(move |_| order.lock().push(tag));
        }

        stream.emit(PlayerEvent::Ready, None);
        assert_eq!(*order.lock(), vec!["first", "second"]);
    }

    #[test]
    fn late_subscribers_miss_earlier_events() {
        let stream = EventStream::new(SessionId::from_raw(1));
        stream.emit(PlayerEvent::Started, None);

        let recorder = RecordingListener::new();
        stream.subscribe(recorder.clone());
        stream.emit(PlayerEvent::Paused, None);

        assert_eq!(recorder.names(), vec!["paused"]);
        assert_eq!(recorder.events()[0].source, SessionId::from_raw(1));
    }

    #[test]
    fn unsubscribe_stops_delivery() {
        let stream = EventStream::new(SessionId::from_raw(1));
        let recorder = RecordingListener::new();
        let id = stream.subscribe(recorder.clone());

        assert!(stream.unsubscribe(id));
        assert!(!stream.unsubscribe(id));
        stream.emit(PlayerEvent::Seek, None);

        assert!(recorder.events().is_empty());
        assert_eq!(stream.subscriber_count(), 0);
    }

    #[test]
    fn listener_may_unsubscribe_itself_during_emit() {
        let stream = Arc::new(EventStream::new(SessionId::from_raw(1)));
        let slot: Arc<Mutex<Option<SubscriptionId>>> = Arc::new(Mutex::new(None));

        let inner_stream = stream.clone();
        let inner_slot = slot.clone();
        let id = stream.subscribe_fn(move |_| {
            if let Some(id) = *inner_slot.lock() {
                inner_stream.unsubscribe(id);
            }
        });
        *slot.lock() = Some(id);

        stream.emit(PlayerEvent::Ready, None);
        assert_eq!(stream.subscriber_count(), 0);
    }
}
