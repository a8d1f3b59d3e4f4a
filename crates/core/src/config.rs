// Player configuration shared by both platform adapters

use std::path::PathBuf;
use std::time::Duration;

/// Fixed volume applied while another app holds transient, duckable focus.
pub const DEFAULT_DUCK_VOLUME: f32 = 0.2;

/// Saved volume at or above which a regain restores full volume.
pub const DEFAULT_FULL_RESTORE_THRESHOLD: u32 = 10;

/// Android API level that introduced `MediaPlayer.setPlaybackParams`.
pub const DEFAULT_MIN_SPEED_SDK: u32 = 23;

/// Native time units per second (milliseconds on Android, CMTime timescale on iOS).
pub const DEFAULT_NATIVE_TIMESCALE: i32 = 1000;

const DEFAULT_PREPARE_TIMEOUT: Duration = Duration::from_secs(30);

/// How a denied focus/session request affects `play()`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FocusPolicy {
    /// Denial fails the call; playback does not start
    #[default]
    Strict,
    /// Denial is logged and playback starts anyway
    BestEffort,
}

/// Tunables for a player session
#[derive(Debug, Clone)]
pub struct PlayerConfig {
    pub duck_volume: f32,
    pub full_restore_threshold: u32,
    /// Seek target used when a looping source restarts
    pub loop_restart_offset: Duration,
    /// Upper bound for [`LoadHandle::wait`](crate::readiness::LoadHandle::wait);
    /// `None` waits forever
    pub prepare_timeout: Option<Duration>,
    pub focus_policy: FocusPolicy,
    pub min_speed_sdk: u32,
    pub native_timescale: i32,
    /// Base directory for `~/` relative audio paths
    pub app_root: Option<PathBuf>,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            duck_volume: DEFAULT_DUCK_VOLUME,
            full_restore_threshold: DEFAULT_FULL_RESTORE_THRESHOLD,
            loop_restart_offset: Duration::ZERO,
            prepare_timeout: Some(DEFAULT_PREPARE_TIMEOUT),
            focus_policy: FocusPolicy::default(),
            min_speed_sdk: DEFAULT_MIN_SPEED_SDK,
            native_timescale: DEFAULT_NATIVE_TIMESCALE,
            app_root: None,
        }
    }
}

impl PlayerConfig {
    /// Defaults used by the Android adapter (restarts loops 5 ms in).
    pub fn android() -> Self {
        Self {
            loop_restart_offset: Duration::from_millis(5),
            ..Self::default()
        }
    }

    /// Defaults used by the iOS adapter.
    pub fn ios() -> Self {
        Self::default()
    }

    pub fn with_duck_volume(mut self, volume: f32) -> Self {
        self.duck_volume = volume.clamp(0.0, 1.0);
        self
    }

    pub fn with_prepare_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.prepare_timeout = timeout;
        self
    }

    pub fn with_focus_policy(mut self, policy: FocusPolicy) -> Self {
        self.focus_policy = policy;
        self
    }

    pub fn with_loop_restart_offset(mut self, offset: Duration) -> Self {
        self.loop_restart_offset = offset;
        self
    }

    pub fn with_app_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.app_root = Some(root.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn platform_defaults_differ_only_in_loop_offset() {
        let android = PlayerConfig::android();
        let ios = PlayerConfig::ios();
        assert_eq!(android.loop_restart_offset, Duration::from_millis(5));
        assert_eq!(ios.loop_restart_offset, Duration::ZERO);
        assert_eq!(android.duck_volume, ios.duck_volume);
        assert_eq!(android.focus_policy, FocusPolicy::Strict);
    }

    #[test]
    fn duck_volume_is_clamped() {
        let config = PlayerConfig::default().with_duck_volume(4.0);
        assert_eq!(config.duck_volume, 1.0);
    }
}
