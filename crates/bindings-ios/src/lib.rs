// C FFI bindings for iOS
// Provides a C-compatible interface to the AVPlayer-backed audio player
//
// The Swift host owns every AVFoundation object. It describes them through the
// `TandemHost` and `TandemAvPlayer` function tables and reports key-path and
// notification callbacks back through `tandem_ios_item_status` and
// `tandem_ios_item_did_play_to_end`.

mod host;

use host::{c_string, item_status, read_c_str, HostAudioSession, HostFactory, HostListener};
use libc::c_char;
use once_cell::sync::{Lazy, OnceCell};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use tandem_core::logging::IOS_TARGET;
use tandem_core::{
    flag_code, init_logging, set_debug, to_code, AudioPlayer, AudioPlayerOptions, NativeSignal,
    PlayerConfig, PlayerTable, SessionId, SessionRegistry,
};
use tandem_ios::IosAudioPlayer;

pub use host::{TandemAvPlayer, TandemHost};

static SIGNALS: Lazy<Arc<SessionRegistry>> = Lazy::new(|| Arc::new(SessionRegistry::new()));

static PLAYERS: Lazy<PlayerTable> = Lazy::new(PlayerTable::new);

static LISTENERS: Lazy<Mutex<HashMap<i64, Arc<HostListener>>>> =
    Lazy::new(|| Mutex::new(HashMap::new()));

static APP_ROOT: OnceCell<PathBuf> = OnceCell::new();

fn player_config() -> PlayerConfig {
    let config = PlayerConfig::ios();
    match APP_ROOT.get() {
        Some(root) => config.with_app_root(root.clone()),
        None => config,
    }
}

fn listener(player_id: i64) -> Option<Arc<HostListener>> {
    LISTENERS.lock().get(&player_id).cloned()
}

/// Route the options' completion and error callbacks to the host.
fn attach(options: AudioPlayerOptions, listener: &Arc<HostListener>) -> AudioPlayerOptions {
    let complete = listener.clone();
    let error = listener.clone();
    options
        .on_complete(move |info| complete.complete(info.looped))
        .on_error(move |info| error.error(info.what, info.message.as_deref()))
}

fn load(player_id: i64, source: *const c_char, looping: bool, auto_play: i32, remote: bool) -> i32 {
    // SAFETY: the host passes a NUL-terminated string or null
    let audio_file = match unsafe { read_c_str(source) } {
        Ok(s) => s,
        Err(e) => {
            log::error!(target: IOS_TARGET, "Invalid source: {}", e);
            return -1;
        }
    };

    let listener = listener(player_id);
    let mut options = AudioPlayerOptions::new(audio_file)
        .looping(looping)
        .auto_play_code(auto_play);
    if let Some(listener) = &listener {
        options = attach(options, listener);
    }

    let result = PLAYERS.with(player_id, |player| {
        if remote {
            player.play_from_url(options)
        } else {
            player.play_from_file(options)
        }
    });

    match result {
        Ok(handle) => {
            if let Some(listener) = listener {
                handle.on_settled(move |result| listener.load_settled(result));
            }
            0
        }
        Err(e) => {
            log::error!(target: IOS_TARGET, "Failed to load: {}", e);
            -1
        }
    }
}

/// Initialize logging and the directory `~/` paths resolve against.
/// `app_root` may be null.
#[no_mangle]
pub extern "C" fn tandem_ios_init(app_root: *const c_char, debug: bool) -> i32 {
    init_logging();
    set_debug(debug);

    if !app_root.is_null() {
        // SAFETY: non-null host strings are NUL-terminated
        match unsafe { read_c_str(app_root) } {
            Ok(root) => {
                if APP_ROOT.set(PathBuf::from(root)).is_err() {
                    log::debug!(target: IOS_TARGET, "app root already set");
                }
            }
            Err(e) => {
                log::error!(target: IOS_TARGET, "Invalid app root: {}", e);
                return -1;
            }
        }
    }
    0
}

#[no_mangle]
pub extern "C" fn tandem_ios_set_debug(debug: bool) {
    set_debug(debug);
}

/// Create a new audio player instance
/// Returns: player ID (>0) on success, -1 on error
///
/// # Safety
/// `host` must point to a fully initialized table that stays valid, along
/// with its context, until the player is disposed.
#[no_mangle]
pub unsafe extern "C" fn tandem_ios_create(host: *const TandemHost) -> i64 {
    init_logging();
    if host.is_null() {
        log::error!(target: IOS_TARGET, "Null host table provided");
        return -1;
    }
    let host = *host;

    let player = Arc::new(IosAudioPlayer::new(
        HostFactory::new(host),
        HostAudioSession::new(host),
        SIGNALS.clone(),
        player_config(),
    ));

    let listener = Arc::new(HostListener::new(host, player.session_id()));
    player.events().subscribe(listener.clone());

    let player_id = PLAYERS.insert(player);
    LISTENERS.lock().insert(player_id, listener);
    player_id
}

/// Load and play a local file. `auto_play`: 1 yes, 0 no, -1 default
/// Returns: 0 on success, -1 on error
#[no_mangle]
pub extern "C" fn tandem_ios_play_from_file(
    player_id: i64,
    path: *const c_char,
    looping: bool,
    auto_play: i32,
) -> i32 {
    load(player_id, path, looping, auto_play, false)
}

#[no_mangle]
pub extern "C" fn tandem_ios_play_from_url(
    player_id: i64,
    url: *const c_char,
    looping: bool,
    auto_play: i32,
) -> i32 {
    load(player_id, url, looping, auto_play, true)
}

#[no_mangle]
pub extern "C" fn tandem_ios_init_from_file(player_id: i64, path: *const c_char, looping: bool) -> i32 {
    load(player_id, path, looping, 0, false)
}

#[no_mangle]
pub extern "C" fn tandem_ios_init_from_url(player_id: i64, url: *const c_char, looping: bool) -> i32 {
    load(player_id, url, looping, 0, true)
}

/// Returns: 1 started, 0 nothing to do, -1 on error
#[no_mangle]
pub extern "C" fn tandem_ios_play(player_id: i64) -> i32 {
    flag_code(PLAYERS.with(player_id, |p| p.play()))
}

#[no_mangle]
pub extern "C" fn tandem_ios_pause(player_id: i64) -> i32 {
    flag_code(PLAYERS.with(player_id, |p| p.pause()))
}

#[no_mangle]
pub extern "C" fn tandem_ios_resume(player_id: i64) -> i32 {
    to_code(PLAYERS.with(player_id, |p| {
        p.resume();
        Ok(())
    }))
}

#[no_mangle]
pub extern "C" fn tandem_ios_seek_to(player_id: i64, seconds: f64) -> i32 {
    flag_code(PLAYERS.with(player_id, |p| p.seek_to(seconds)))
}

#[no_mangle]
pub extern "C" fn tandem_ios_play_at_time(player_id: i64, seconds: f64) -> i32 {
    flag_code(PLAYERS.with(player_id, |p| p.play_at_time(seconds)))
}

/// Dispose and forget the player; the ID is invalid afterwards
#[no_mangle]
pub extern "C" fn tandem_ios_dispose(player_id: i64) -> i32 {
    log::info!(target: IOS_TARGET, "Dispose player {}", player_id);
    let result = PLAYERS.with(player_id, |p| p.dispose());
    PLAYERS.remove(player_id);
    LISTENERS.lock().remove(&player_id);
    to_code(result)
}

#[no_mangle]
pub extern "C" fn tandem_ios_is_playing(player_id: i64) -> bool {
    PLAYERS.get(player_id).is_some_and(|p| p.is_playing())
}

/// Duration in milliseconds, 0 when unknown
#[no_mangle]
pub extern "C" fn tandem_ios_duration_ms(player_id: i64) -> i64 {
    PLAYERS
        .get(player_id)
        .map_or(0, |p| p.duration().as_millis() as i64)
}

#[no_mangle]
pub extern "C" fn tandem_ios_current_time_ms(player_id: i64) -> i64 {
    PLAYERS
        .get(player_id)
        .map_or(0, |p| p.current_time().as_millis() as i64)
}

/// Caller frees the result with `tandem_ios_string_free`
#[no_mangle]
pub extern "C" fn tandem_ios_duration_string(player_id: i64) -> *mut c_char {
    let duration = PLAYERS
        .get(player_id)
        .map_or_else(|| "0".to_string(), |p| p.duration_string());
    c_string(&duration).into_raw()
}

/// # Safety
/// `value` must come from this library and not be freed twice.
#[no_mangle]
pub unsafe extern "C" fn tandem_ios_string_free(value: *mut c_char) {
    if !value.is_null() {
        drop(std::ffi::CString::from_raw(value));
    }
}

#[no_mangle]
pub extern "C" fn tandem_ios_change_playback_speed(player_id: i64, rate: f32) -> i32 {
    to_code(PLAYERS.with(player_id, |p| p.change_playback_speed(rate)))
}

#[no_mangle]
pub extern "C" fn tandem_ios_get_volume(player_id: i64) -> f32 {
    PLAYERS.get(player_id).map_or(0.0, |p| p.volume())
}

#[no_mangle]
pub extern "C" fn tandem_ios_set_volume(player_id: i64, volume: f32) -> i32 {
    to_code(PLAYERS.with(player_id, |p| {
        p.set_volume(volume);
        Ok(())
    }))
}

// -------------------------------
// Observer callbacks raised by the host
// -------------------------------

/// Key-path observation of `AVPlayerItem.status`. `message` may be null.
/// Returns whether a live session received it.
#[no_mangle]
pub extern "C" fn tandem_ios_item_status(session: u64, status: i32, message: *const c_char) -> bool {
    let message = if message.is_null() {
        None
    } else {
        // SAFETY: non-null host strings are NUL-terminated
        unsafe { read_c_str(message) }.ok()
    };
    SIGNALS.deliver(
        SessionId::from_raw(session),
        NativeSignal::ItemStatus(item_status(status, message)),
    )
}

/// `AVPlayerItemDidPlayToEndTime` for the session's current item
#[no_mangle]
pub extern "C" fn tandem_ios_item_did_play_to_end(session: u64) -> bool {
    SIGNALS.deliver(SessionId::from_raw(session), NativeSignal::EndOfMedia)
}

#[cfg(test)]
mod tests {
    use super::*;
    use libc::c_void;

    #[test]
    fn unknown_handles_report_errors() {
        assert_eq!(tandem_ios_play(-5), -1);
        assert_eq!(tandem_ios_seek_to(-5, 1.0), -1);
        assert!(!tandem_ios_is_playing(-5));
        assert_eq!(tandem_ios_duration_ms(-5), 0);
        assert_eq!(tandem_ios_get_volume(-5), 0.0);
        assert_eq!(tandem_ios_dispose(-5), -1);
    }

    #[test]
    fn null_inputs_are_rejected() {
        assert_eq!(tandem_ios_play_from_file(-5, std::ptr::null(), false, -1), -1);
        assert_eq!(unsafe { tandem_ios_create(std::ptr::null()) }, -1);
    }

    #[test]
    fn signals_for_unknown_sessions_are_dropped() {
        assert!(!tandem_ios_item_status(u64::MAX, 1, std::ptr::null()));
        assert!(!tandem_ios_item_did_play_to_end(u64::MAX));
    }

    /// Host state shared through the context pointer.
    #[derive(Default)]
    struct FakeHost {
        playing: bool,
        observers: u32,
        released: bool,
        events: Vec<String>,
        settled: Vec<(i32, String)>,
        completions: Vec<bool>,
    }

    fn state(ctx: *mut c_void) -> &'static Mutex<FakeHost> {
        unsafe { &*(ctx as *const Mutex<FakeHost>) }
    }

    fn text(value: *const c_char) -> String {
        unsafe { read_c_str(value) }.unwrap_or_default()
    }

    extern "C" fn ok(_: *mut c_void) -> i32 {
        0
    }
    extern "C" fn ok_str(_: *mut c_void, _: *const c_char, _: bool) -> i32 {
        0
    }
    extern "C" fn has_item(_: *mut c_void) -> bool {
        true
    }
    extern "C" fn status(_: *mut c_void) -> i32 {
        0
    }
    extern "C" fn waits(_: *mut c_void, _: bool) {}
    extern "C" fn add_observer(ctx: *mut c_void, _: u64) -> i32 {
        state(ctx).lock().observers += 1;
        0
    }
    extern "C" fn remove_observer(ctx: *mut c_void, _: u64) -> i32 {
        state(ctx).lock().observers -= 1;
        0
    }
    extern "C" fn play(ctx: *mut c_void) -> i32 {
        state(ctx).lock().playing = true;
        0
    }
    extern "C" fn pause(ctx: *mut c_void) -> i32 {
        state(ctx).lock().playing = false;
        0
    }
    extern "C" fn seek(_: *mut c_void, _: i64, _: i32) -> i32 {
        0
    }
    extern "C" fn is_playing(ctx: *mut c_void) -> bool {
        state(ctx).lock().playing
    }
    extern "C" fn seconds(_: *mut c_void) -> f64 {
        90.5
    }
    extern "C" fn set_f32(_: *mut c_void, _: f32) -> i32 {
        0
    }
    extern "C" fn volume(_: *mut c_void) -> f32 {
        1.0
    }
    extern "C" fn release(ctx: *mut c_void) {
        state(ctx).lock().released = true;
    }
    extern "C" fn create_player(
        ctx: *mut c_void,
        _: u64,
        _: *const c_char,
        _: bool,
        out: *mut TandemAvPlayer,
    ) -> i32 {
        let player = TandemAvPlayer {
            context: ctx,
            replace_item: ok_str,
            clear_item: ok,
            has_item,
            item_status: status,
            set_waits_to_minimize_stalling: waits,
            add_status_observer: add_observer,
            remove_status_observer: remove_observer,
            add_end_observer: add_observer,
            remove_end_observer: remove_observer,
            play,
            pause,
            seek,
            is_playing,
            current_time: seconds,
            duration: seconds,
            set_rate: set_f32,
            volume,
            set_volume: set_f32,
            release,
        };
        unsafe { out.write(player) };
        0
    }
    extern "C" fn no_port(_: *mut c_void, _: *mut c_char, _: usize) -> i32 {
        -1
    }
    extern "C" fn set_active(_: *mut c_void, _: bool) -> i32 {
        0
    }
    extern "C" fn on_event(ctx: *mut c_void, _: u64, name: *const c_char, _: f64) {
        state(ctx).lock().events.push(text(name));
    }
    extern "C" fn on_load_settled(ctx: *mut c_void, _: u64, code: i32, message: *const c_char) {
        state(ctx).lock().settled.push((code, text(message)));
    }
    extern "C" fn on_complete(ctx: *mut c_void, _: u64, looped: bool) {
        state(ctx).lock().completions.push(looped);
    }
    extern "C" fn on_error(_: *mut c_void, _: u64, _: i32, _: *const c_char) {}

    fn fake_host() -> (TandemHost, &'static Mutex<FakeHost>) {
        let fake: &'static Mutex<FakeHost> = Box::leak(Box::default());
        let host = TandemHost {
            context: fake as *const Mutex<FakeHost> as *mut c_void,
            create_player,
            current_output_port: no_port,
            set_category_play_and_record: ok,
            override_output_to_speaker: ok,
            set_active,
            on_event,
            on_load_settled,
            on_complete,
            on_error,
        };
        (host, fake)
    }

    #[test]
    fn host_drives_a_full_session() {
        let (host, fake) = fake_host();
        let id = unsafe { tandem_ios_create(&host) };
        assert!(id > 0);

        let url = c_string("https://example.com/a.mp3");
        assert_eq!(tandem_ios_play_from_url(id, url.as_ptr(), true, -1), 0);
        assert_eq!(fake.lock().observers, 2);
        assert!(fake.lock().settled.is_empty());

        assert!(tandem_ios_item_status(id as u64, 1, std::ptr::null()));
        assert!(tandem_ios_is_playing(id));
        assert_eq!(fake.lock().settled, vec![(0, String::new())]);
        assert_eq!(fake.lock().events, vec!["ready", "started"]);
        assert_eq!(tandem_ios_duration_ms(id), 90_500);

        assert!(tandem_ios_item_did_play_to_end(id as u64));
        assert_eq!(fake.lock().completions, vec![true]);

        assert_eq!(tandem_ios_pause(id), 1);
        assert_eq!(tandem_ios_pause(id), 0);

        assert_eq!(tandem_ios_dispose(id), 0);
        assert!(fake.lock().released);
        assert_eq!(fake.lock().observers, 0);
        assert!(!tandem_ios_item_did_play_to_end(id as u64));
        assert_eq!(tandem_ios_play(id), -1);
    }

    #[test]
    fn failed_item_settles_with_message() {
        let (host, fake) = fake_host();
        let id = unsafe { tandem_ios_create(&host) };

        let path = c_string("/tmp/a.mp3");
        assert_eq!(tandem_ios_init_from_file(id, path.as_ptr(), false), 0);

        let message = c_string("unsupported format");
        tandem_ios_item_status(id as u64, 2, message.as_ptr());

        let settled = fake.lock().settled.clone();
        assert_eq!(settled.len(), 1);
        assert_eq!(settled[0].0, -1);
        assert!(settled[0].1.contains("unsupported format"));
        assert!(!tandem_ios_is_playing(id));
        assert_eq!(tandem_ios_dispose(id), 0);
    }

    #[test]
    fn duration_string_defaults_to_zero() {
        let value = tandem_ios_duration_string(-5);
        let text = unsafe { std::ffi::CStr::from_ptr(value) }.to_str().unwrap().to_owned();
        unsafe { tandem_ios_string_free(value) };
        assert_eq!(text, "0");
    }
}
