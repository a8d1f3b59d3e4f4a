// Non-owning association between native observers and player sessions
//
// Native listeners (MediaPlayer callbacks, KVO observers, focus listeners) only
// carry a SessionId. Signals are routed through a SessionRegistry that holds weak
// references, so disposing or dropping a session turns late callbacks into no-ops.

use crate::focus::FocusChange;
use crate::options::{NativeErrorInfo, NativeInfo};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

static NEXT_SESSION_ID: AtomicU64 = AtomicU64::new(1);

/// Identifier a native observer holds instead of a reference to its owner
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SessionId(u64);

impl SessionId {
    /// Allocate a process-unique id.
    pub fn next() -> Self {
        SessionId(NEXT_SESSION_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn from_raw(raw: u64) -> Self {
        SessionId(raw)
    }

    pub fn as_raw(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "session-{}", self.0)
    }
}

/// Status of an iOS player item as reported by key-path observation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemStatus {
    Unknown,
    ReadyToPlay,
    Failed(Option<String>),
}

/// Asynchronous notifications a native engine delivers to its session
#[derive(Debug, Clone, PartialEq)]
pub enum NativeSignal {
    /// Android: asynchronous prepare finished
    Prepared,
    /// iOS: observed item status changed
    ItemStatus(ItemStatus),
    /// Current source played to its end
    EndOfMedia,
    Error(NativeErrorInfo),
    Info(NativeInfo),
    /// Android: audio focus change
    Focus(FocusChange),
    /// Android: output is about to become noisy (headphones unplugged)
    BecomingNoisy,
}

/// Receiver side of native signals, implemented by each platform session
pub trait NativeSignalSink: Send + Sync {
    fn on_signal(&self, signal: NativeSignal);
}

/// Routes native signals to live sessions by id.
#[derive(Default)]
pub struct SessionRegistry {
    sessions: Mutex<HashMap<SessionId, Weak<dyn NativeSignalSink>>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, id: SessionId, sink: &Arc<dyn NativeSignalSink>) {
        log::debug!("registering {}", id);
        self.sessions.lock().insert(id, Arc::downgrade(sink));
    }

    /// Severs the association; later signals for `id` are dropped.
    pub fn unregister(&self, id: SessionId) -> bool {
        log::debug!("unregistering {}", id);
        self.sessions.lock().remove(&id).is_some()
    }

    pub fn resolve(&self, id: SessionId) -> Option<Arc<dyn NativeSignalSink>> {
        let mut sessions = self.sessions.lock();
        match sessions.get(&id).map(Weak::upgrade) {
            Some(Some(sink)) => Some(sink),
            Some(None) => {
                // Owner was dropped without dispose
                sessions.remove(&id);
                None
            }
            None => None,
        }
    }

    /// Returns whether a live session received the signal.
    pub fn deliver(&self, id: SessionId, signal: NativeSignal) -> bool {
        match self.resolve(id) {
            Some(sink) => {
                sink.on_signal(signal);
                true
            }
            None => {
                log::debug!("dropping {:?} for detached {}", signal, id);
                false
            }
        }
    }

    pub fn contains(&self, id: SessionId) -> bool {
        self.resolve(id).is_some()
    }

    pub fn len(&self) -> usize {
        self.sessions.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct CountingSink {
        signals: Mutex<Vec<NativeSignal>>,
    }

    impl NativeSignalSink for CountingSink {
        fn on_signal(&self, signal: NativeSignal) {
            self.signals.lock().push(signal);
        }
    }

    #[test]
    fn session_ids_are_unique() {
        assert_ne!(SessionId::next(), SessionId::next());
    }

    #[test]
    fn delivers_to_registered_session() {
        let registry = SessionRegistry::new();
        let sink = Arc::new(CountingSink::default());
        let dyn_sink: Arc<dyn NativeSignalSink> = sink.clone();
        let id = SessionId::next();
        registry.register(id, &dyn_sink);

        assert!(registry.deliver(id, NativeSignal::Prepared));
        assert_eq!(*sink.signals.lock(), vec![NativeSignal::Prepared]);
    }

    #[test]
    fn unregistered_sessions_drop_signals() {
        let registry = SessionRegistry::new();
        let sink = Arc::new(CountingSink::default());
        let dyn_sink: Arc<dyn NativeSignalSink> = sink.clone();
        let id = SessionId::next();
        registry.register(id, &dyn_sink);

        assert!(registry.unregister(id));
        assert!(!registry.deliver(id, NativeSignal::EndOfMedia));
        assert!(sink.signals.lock().is_empty());
    }

    #[test]
    fn dropped_owner_is_not_kept_alive() {
        let registry = SessionRegistry::new();
        let id = SessionId::next();
        {
            let sink: Arc<dyn NativeSignalSink> = Arc::new(CountingSink::default());
            registry.register(id, &sink);
        }

        assert!(!registry.deliver(id, NativeSignal::Prepared));
        assert!(registry.is_empty());
    }
}
