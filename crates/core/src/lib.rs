// Core types shared by the Android and iOS audio player adapters

pub mod config;
pub mod error;
pub mod events;
pub mod focus;
pub mod handles;
pub mod logging;
pub mod options;
pub mod player;
pub mod readiness;
pub mod registry;
pub mod state;
pub mod time;

// Re-export commonly used types
pub use config::{FocusPolicy, PlayerConfig};
pub use error::{AudioError, Result};
pub use events::{EventData, EventPayload, EventStream, PlayerEvent, PlayerListener, SubscriptionId};
pub use focus::{
    restore_volume, AcquireOutcome, FocusAction, FocusChange, FocusNegotiator, FocusState,
    NegotiationPhase, PriorityBroker,
};
pub use handles::{flag_code, to_code, PlayerTable};
pub use logging::{init_logging, set_debug};
pub use options::{AudioPlayerOptions, AudioSource, CompletionInfo, NativeErrorInfo, NativeInfo};
pub use player::AudioPlayer;
pub use readiness::{pending_load, LoadCompleter, LoadHandle};
pub use registry::{ItemStatus, NativeSignal, NativeSignalSink, SessionId, SessionRegistry};
pub use state::{LoadToken, ReadinessState, ReadinessTracker};
pub use time::NativeTime;
