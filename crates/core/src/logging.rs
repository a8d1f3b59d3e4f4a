// Logging setup and the runtime debug switch

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Once;

static INIT_LOGGER: Once = Once::new();
static DEBUG: AtomicBool = AtomicBool::new(false);

/// Log target used by the Android adapter
pub const ANDROID_TARGET: &str = "tandem::android";
/// Log target used by the iOS adapter
pub const IOS_TARGET: &str = "tandem::ios";

/// Initialize logging based on platform. Safe to call repeatedly.
pub fn init_logging() {
    INIT_LOGGER.call_once(|| {
        #[cfg(target_os = "android")]
        {
            android_logger::init_once(
                android_logger::Config::default()
                    .with_max_level(log::LevelFilter::Debug)
                    .with_tag("TandemAudio"),
            );
        }

        #[cfg(target_os = "ios")]
        {
            let _ = oslog::OsLogger::new("com.tandem.audio")
                .level_filter(log::LevelFilter::Debug)
                .init();
        }

        #[cfg(not(any(target_os = "android", target_os = "ios")))]
        {
            let _ = env_logger::builder()
                .is_test(cfg!(test))
                .filter_level(log::LevelFilter::Debug)
                .try_init();
        }

        apply_level(DEBUG.load(Ordering::Relaxed));
    });
}

/// Toggle verbose output for every player in the process.
pub fn set_debug(enabled: bool) {
    DEBUG.store(enabled, Ordering::Relaxed);
    apply_level(enabled);
}

pub fn is_debug() -> bool {
    DEBUG.load(Ordering::Relaxed)
}

fn apply_level(debug: bool) {
    let level = if debug {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };
    log::set_max_level(level);
}
