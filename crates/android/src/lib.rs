// Android adapter: MediaPlayer playback with AudioManager focus negotiation

pub mod engine;
pub mod focus;
pub mod player;

#[cfg(test)]
mod testing;

pub use engine::{MediaPlayerEngine, MediaPlayerFactory};
pub use focus::AudioFocusManager;
pub use player::AndroidAudioPlayer;
