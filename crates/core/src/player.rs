// Uniform playback control surface implemented by both platform adapters

use crate::error::Result;
use crate::events::EventStream;
use crate::focus::FocusState;
use crate::options::AudioPlayerOptions;
use crate::readiness::LoadHandle;
use crate::registry::SessionId;
use crate::state::ReadinessState;
use std::time::Duration;

/// Core audio player trait
/// All platform-specific adapters must implement this trait
pub trait AudioPlayer: Send + Sync {
    fn session_id(&self) -> SessionId;

    /// Event stream owned by this session
    fn events(&self) -> &EventStream;

    /// Load a local file and start playback once ready unless
    /// `options.auto_play` is `Some(false)`.
    fn play_from_file(&self, options: AudioPlayerOptions) -> Result<LoadHandle>;

    /// Load a remote stream; same readiness contract as [`play_from_file`](Self::play_from_file).
    fn play_from_url(&self, options: AudioPlayerOptions) -> Result<LoadHandle>;

    /// Load a local file without starting playback.
    fn init_from_file(&self, options: AudioPlayerOptions) -> Result<LoadHandle> {
        self.play_from_file(options.auto_play(false))
    }

    /// Load a remote stream without starting playback.
    fn init_from_url(&self, options: AudioPlayerOptions) -> Result<LoadHandle> {
        self.play_from_url(options.auto_play(false))
    }

    /// Start playback. Returns false when nothing happened (already playing, no player).
    fn play(&self) -> Result<bool>;

    /// Pause playback. Returns false when the player was not playing.
    fn pause(&self) -> Result<bool>;

    /// Restart the native transport without renegotiating focus.
    fn resume(&self);

    /// Seek to `seconds`. Returns false when the source is not ready.
    fn seek_to(&self, seconds: f64) -> Result<bool>;

    /// Seek to `seconds` and start playback. Returns false when the source is not ready.
    fn play_at_time(&self, seconds: f64) -> Result<bool>;

    /// Stop, release native resources and detach all observers.
    fn dispose(&self) -> Result<()>;

    fn is_playing(&self) -> bool;

    /// Zero when no source is loaded.
    fn duration(&self) -> Duration;

    /// Zero when no source is loaded.
    fn current_time(&self) -> Duration;

    fn change_playback_speed(&self, rate: f32) -> Result<()>;

    fn volume(&self) -> f32;

    /// Negative values are ignored.
    fn set_volume(&self, volume: f32);

    fn readiness(&self) -> ReadinessState;

    fn focus_state(&self) -> FocusState;

    /// Duration in milliseconds as a string.
    fn duration_string(&self) -> String {
        self.duration().as_millis().to_string()
    }
}
