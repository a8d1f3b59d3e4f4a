// iOS adapter: AVPlayer playback with AVAudioSession route configuration

pub mod audio_session;
pub mod engine;
pub mod player;

#[cfg(test)]
mod testing;

pub use audio_session::AudioSessionControl;
pub use engine::{AvPlayerEngine, AvPlayerFactory};
pub use player::IosAudioPlayer;
