// Contract the iOS adapter needs from AVFoundation

use tandem_core::{AudioSource, ItemStatus, NativeTime, Result, SessionId};

/// Wraps one `AVPlayer` and its current `AVPlayerItem`.
///
/// Key-path status changes and `AVPlayerItemDidPlayToEndTime` notifications are
/// delivered as native signals for the session id passed to the observer calls.
pub trait AvPlayerEngine: Send {
    /// `replaceCurrentItemWithPlayerItem` with a fresh item for `source`.
    fn replace_item(&mut self, source: &AudioSource) -> Result<()>;

    /// Drop the current item; the player stops referencing any media.
    fn clear_item(&mut self) -> Result<()>;

    fn has_item(&self) -> bool;

    fn item_status(&self) -> ItemStatus;

    fn set_automatically_waits_to_minimize_stalling(&mut self, waits: bool);

    /// Observe the current item's `status` key path.
    fn add_status_observer(&mut self, session: SessionId) -> Result<()>;

    fn remove_status_observer(&mut self, session: SessionId) -> Result<()>;

    /// Observe play-to-end notifications for the current item.
    fn add_end_observer(&mut self, session: SessionId) -> Result<()>;

    fn remove_end_observer(&mut self, session: SessionId) -> Result<()>;

    fn play(&mut self) -> Result<()>;

    fn pause(&mut self) -> Result<()>;

    fn seek(&mut self, time: NativeTime) -> Result<()>;

    /// `timeControlStatus == .playing`
    fn is_playing(&self) -> bool;

    fn current_time(&self) -> NativeTime;

    /// Asset duration of the current item.
    fn duration(&self) -> NativeTime;

    fn set_rate(&mut self, rate: f32) -> Result<()>;

    fn volume(&self) -> f32;

    fn set_volume(&mut self, volume: f32) -> Result<()>;
}

/// Creates an `AVPlayer` already holding an item for `source`
pub trait AvPlayerFactory: Send + Sync {
    fn create(&self, session: SessionId, source: &AudioSource) -> Result<Box<dyn AvPlayerEngine>>;
}

impl<F> AvPlayerFactory for F
where
    F: Fn(SessionId, &AudioSource) -> Result<Box<dyn AvPlayerEngine>> + Send + Sync,
{
    fn create(&self, session: SessionId, source: &AudioSource) -> Result<Box<dyn AvPlayerEngine>> {
        self(session, source)
    }
}
