// Process-wide player tables shared by every JNI entry point

use once_cell::sync::{Lazy, OnceCell};
use std::path::PathBuf;
use std::sync::Arc;
use tandem_core::{
    FocusChange, NativeSignal, PlayerConfig, PlayerTable, SessionId, SessionRegistry,
};

static SIGNALS: Lazy<Arc<SessionRegistry>> = Lazy::new(|| Arc::new(SessionRegistry::new()));

static PLAYERS: Lazy<PlayerTable> = Lazy::new(PlayerTable::new);

static APP_ROOT: OnceCell<PathBuf> = OnceCell::new();

/// Routes MediaPlayer and AudioManager callbacks to their sessions.
pub fn signals() -> Arc<SessionRegistry> {
    SIGNALS.clone()
}

pub fn players() -> &'static PlayerTable {
    &PLAYERS
}

/// Record the directory `~/` paths resolve against. Later calls are ignored.
pub fn set_app_root(root: impl Into<PathBuf>) {
    if APP_ROOT.set(root.into()).is_err() {
        log::debug!("app root already set");
    }
}

pub fn player_config() -> PlayerConfig {
    let config = PlayerConfig::android();
    match APP_ROOT.get() {
        Some(root) => config.with_app_root(root.clone()),
        None => config,
    }
}

/// Deliver a signal raised by a Java listener for `session`.
pub fn deliver(session: i64, signal: NativeSignal) -> bool {
    SIGNALS.deliver(SessionId::from_raw(session as u64), signal)
}

/// `AudioManager.AUDIOFOCUS_*` change code as a signal.
pub fn focus_signal(code: i32) -> Option<NativeSignal> {
    FocusChange::from_android(code).map(NativeSignal::Focus)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn focus_codes_map_to_signals() {
        assert_eq!(focus_signal(-3), Some(NativeSignal::Focus(FocusChange::LossTransientCanDuck)));
        assert_eq!(focus_signal(1), Some(NativeSignal::Focus(FocusChange::Gain)));
        assert_eq!(focus_signal(0), None);
    }

    #[test]
    fn signals_for_unknown_sessions_are_dropped() {
        assert!(!deliver(i64::MAX, NativeSignal::Prepared));
    }

    #[test]
    fn config_uses_android_loop_offset() {
        assert_eq!(player_config().loop_restart_offset.as_millis(), 5);
    }
}
