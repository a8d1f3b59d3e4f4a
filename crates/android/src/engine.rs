// Contract the Android adapter needs from the platform

use tandem_core::{Result, SessionId};

/// Wraps one `android.media.MediaPlayer` instance.
///
/// Listener callbacks (prepared, completion, error, info) are not part of this
/// trait: implementations route them by session id through the
/// [`SessionRegistry`](tandem_core::SessionRegistry).
pub trait MediaPlayerEngine: Send {
    /// Route output through the music stream.
    fn set_music_stream_type(&mut self) -> Result<()>;

    fn reset(&mut self) -> Result<()>;

    fn set_data_source(&mut self, source: &str) -> Result<()>;

    /// Blocking prepare, valid for local files and resources.
    fn prepare(&mut self) -> Result<()>;

    /// Non-blocking prepare; completion arrives as a prepared or error signal.
    fn prepare_async(&mut self) -> Result<()>;

    fn start(&mut self) -> Result<()>;

    fn pause(&mut self) -> Result<()>;

    fn stop(&mut self) -> Result<()>;

    fn release(&mut self) -> Result<()>;

    fn seek_to(&mut self, position_ms: i64) -> Result<()>;

    fn is_playing(&self) -> bool;

    fn duration_ms(&self) -> i64;

    fn current_position_ms(&self) -> i64;

    fn set_volume(&mut self, left: f32, right: f32) -> Result<()>;

    /// Requires API 23 (`setPlaybackParams`).
    fn set_playback_speed(&mut self, speed: f32) -> Result<()>;
}

/// Creates media players with their listeners bound to `session`
pub trait MediaPlayerFactory: Send + Sync {
    fn create(&self, session: SessionId) -> Result<Box<dyn MediaPlayerEngine>>;
}

impl<F> MediaPlayerFactory for F
where
    F: Fn(SessionId) -> Result<Box<dyn MediaPlayerEngine>> + Send + Sync,
{
    fn create(&self, session: SessionId) -> Result<Box<dyn MediaPlayerEngine>> {
        self(session)
    }
}
