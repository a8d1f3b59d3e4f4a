// Load options and audio source classification

use crate::error::{AudioError, Result};
use std::borrow::Cow;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

const APP_RELATIVE_PREFIX: &str = "~/";
const RESOURCE_SCHEME: &str = "res://";

/// Returns true when `value` names a remote stream rather than a local file.
///
/// Anything containing a scheme separator counts as a URL, except `res://`
/// resources which are bundled with the app.
pub fn is_url(value: &str) -> bool {
    value.contains("://") && !value.contains(RESOURCE_SCHEME)
}

/// Resolved audio source handed to a native engine
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AudioSource {
    /// File (or bundled resource) on the device
    LocalFile(PathBuf),
    /// Remote stream URL
    Remote(String),
}

impl AudioSource {
    /// Classify and resolve a raw `audioFile` value.
    ///
    /// `~/` paths are joined onto `app_root` when one is configured.
    pub fn resolve(raw: &str, app_root: Option<&Path>) -> Result<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(AudioError::SourceLoad("audio file is empty".to_string()));
        }

        if is_url(trimmed) {
            return Ok(AudioSource::Remote(trimmed.to_string()));
        }

        let path = match (trimmed.strip_prefix(APP_RELATIVE_PREFIX), app_root) {
            (Some(relative), Some(root)) => root.join(relative),
            _ => PathBuf::from(trimmed),
        };
        Ok(AudioSource::LocalFile(path))
    }

    pub fn is_remote(&self) -> bool {
        matches!(self, AudioSource::Remote(_))
    }

    /// Local files and bundled resources can be prepared on the calling thread;
    /// everything else must be prepared asynchronously.
    pub fn prepares_synchronously(&self) -> bool {
        match self {
            AudioSource::LocalFile(path) => {
                let raw = path.to_string_lossy();
                path.is_absolute()
                    || raw.starts_with(APP_RELATIVE_PREFIX)
                    || raw.starts_with(RESOURCE_SCHEME)
            }
            AudioSource::Remote(_) => false,
        }
    }

    /// The string form a native data-source setter expects.
    pub fn as_native_str(&self) -> Cow<'_, str> {
        match self {
            AudioSource::LocalFile(path) => path.to_string_lossy(),
            AudioSource::Remote(url) => Cow::Borrowed(url.as_str()),
        }
    }
}

impl fmt::Display for AudioSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AudioSource::LocalFile(path) => write!(f, "file {}", path.display()),
            AudioSource::Remote(url) => write!(f, "url {}", url),
        }
    }
}

/// Passed to the completion callback each time the source reaches its end
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompletionInfo {
    /// Playback was restarted because looping is enabled
    pub looped: bool,
}

/// Native error payload forwarded to the error callback
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NativeErrorInfo {
    pub what: i32,
    pub extra: i32,
    pub message: Option<String>,
}

/// Native info/warning payload forwarded to the info callback
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NativeInfo {
    pub what: i32,
    pub extra: i32,
}

/// Host encoding of the autoplay flag: negative leaves it unset, 0 disables,
/// anything positive enables.
pub fn auto_play_from_code(code: i32) -> Option<bool> {
    match code {
        c if c < 0 => None,
        0 => Some(false),
        _ => Some(true),
    }
}

pub type CompleteCallback = Arc<dyn Fn(&CompletionInfo) + Send + Sync>;
pub type ErrorCallback = Arc<dyn Fn(&NativeErrorInfo) + Send + Sync>;
pub type InfoCallback = Arc<dyn Fn(&NativeInfo) + Send + Sync>;

/// Options for a single `play_from_*` / `init_from_*` call
#[derive(Clone)]
pub struct AudioPlayerOptions {
    pub audio_file: String,
    pub looping: bool,
    /// Autoplay once ready; unset means true
    pub auto_play: Option<bool>,
    /// Accepted for API compatibility; metering is not implemented
    pub metering: bool,
    pub complete_callback: Option<CompleteCallback>,
    pub error_callback: Option<ErrorCallback>,
    pub info_callback: Option<InfoCallback>,
}

impl AudioPlayerOptions {
    pub fn new(audio_file: impl Into<String>) -> Self {
        Self {
            audio_file: audio_file.into(),
            looping: false,
            auto_play: None,
            metering: false,
            complete_callback: None,
            error_callback: None,
            info_callback: None,
        }
    }

    pub fn looping(mut self, looping: bool) -> Self {
        self.looping = looping;
        self
    }

    pub fn auto_play(mut self, auto_play: bool) -> Self {
        self.auto_play = Some(auto_play);
        self
    }

    /// `None` keeps the platform default.
    pub fn auto_play_setting(mut self, auto_play: Option<bool>) -> Self {
        self.auto_play = auto_play;
        self
    }

    /// Apply an autoplay flag in the host's integer encoding.
    pub fn auto_play_code(self, code: i32) -> Self {
        self.auto_play_setting(auto_play_from_code(code))
    }

    pub fn metering(mut self, metering: bool) -> Self {
        self.metering = metering;
        self
    }

    pub fn on_complete(mut self, f: impl Fn(&CompletionInfo) + Send + Sync + 'static) -> Self {
        self.complete_callback = Some(Arc::new(f));
        self
    }

    pub fn on_error(mut self, f: impl Fn(&NativeErrorInfo) + Send + Sync + 'static) -> Self {
        self.error_callback = Some(Arc::new(f));
        self
    }

    pub fn on_info(mut self, f: impl Fn(&NativeInfo) + Send + Sync + 'static) -> Self {
        self.info_callback = Some(Arc::new(f));
        self
    }

    /// Effective autoplay flag: anything but an explicit `false` plays.
    pub fn should_auto_play(&self) -> bool {
        self.auto_play != Some(false)
    }
}

impl fmt::Debug for AudioPlayerOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AudioPlayerOptions")
            .field("audio_file", &self.audio_file)
            .field("looping", &self.looping)
            .field("auto_play", &self.auto_play)
            .field("metering", &self.metering)
            .field("complete_callback", &self.complete_callback.is_some())
            .field("error_callback", &self.error_callback.is_some())
            .field("info_callback", &self.info_callback.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auto_play_codes() {
        assert_eq!(auto_play_from_code(-1), None);
        assert_eq!(auto_play_from_code(0), Some(false));
        assert_eq!(auto_play_from_code(7), Some(true));

        assert!(AudioPlayerOptions::new("a.mp3").auto_play_code(-1).should_auto_play());
        assert!(!AudioPlayerOptions::new("a.mp3").auto_play_code(0).should_auto_play());
        let options = AudioPlayerOptions::new("a.mp3").auto_play(false).auto_play_setting(None);
        assert_eq!(options.auto_play, None);
    }

    #[test]
    fn url_detection_excludes_resources() {
        assert!(is_url("https://example.com/a.mp3"));
        assert!(is_url("rtsp://host/stream"));
        assert!(!is_url("res://beep"));
        assert!(!is_url("/sdcard/music/a.mp3"));
        assert!(!is_url("~/audio/a.mp3"));
    }

    #[test]
    fn app_relative_paths_join_root() {
        let source = AudioSource::resolve("  ~/audio/a.mp3 ", Some(Path::new("/data/app"))).unwrap();
        assert_eq!(source, AudioSource::LocalFile(PathBuf::from("/data/app/audio/a.mp3")));
        assert!(source.prepares_synchronously());
    }

    #[test]
    fn remote_sources_prepare_async() {
        let source = AudioSource::resolve("https://example.com/a.mp3", None).unwrap();
        assert!(source.is_remote());
        assert!(!source.prepares_synchronously());
        assert_eq!(source.as_native_str(), "https://example.com/a.mp3");
    }

    #[test]
    fn relative_paths_without_root_are_async() {
        let source = AudioSource::resolve("sounds/a.mp3", None).unwrap();
        assert!(!source.prepares_synchronously());
    }

    #[test]
    fn empty_source_is_rejected() {
        assert!(matches!(AudioSource::resolve("   ", None), Err(AudioError::SourceLoad(_))));
    }

    #[test]
    fn autoplay_defaults_to_true() {
        let options = AudioPlayerOptions::new("a.mp3");
        assert!(options.should_auto_play());
        assert!(!options.auto_play(false).should_auto_play());
    }
}
