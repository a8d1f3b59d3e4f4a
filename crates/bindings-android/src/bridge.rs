// JNI entry points declared by com.tandem.audio.NativeBridge

use crate::audio_focus::JniAudioFocus;
use crate::callbacks::JniPlayerCallbacks;
use crate::jni_util::{forget_listener, initialize, jni_error};
use crate::media_player::JniMediaPlayerFactory;
use crate::runtime::{deliver, focus_signal, player_config, players, set_app_root, signals};
use jni::objects::{JClass, JObject, JString};
use jni::sys::{jboolean, jdouble, jfloat, jint, jlong, jstring, JNI_FALSE, JNI_TRUE};
use jni::JNIEnv;
use std::sync::Arc;
use tandem_android::AndroidAudioPlayer;
use tandem_core::logging::ANDROID_TARGET;
use tandem_core::options::auto_play_from_code;
use tandem_core::{
    flag_code, init_logging, set_debug, to_code, AudioPlayer, AudioPlayerOptions, NativeErrorInfo,
    NativeInfo, NativeSignal, Result, SessionId,
};

// Helper function to convert Java string to Rust string
fn jstring_to_string(env: &mut JNIEnv, jstr: &JString) -> Result<String> {
    let java_str = env.get_string(jstr).map_err(jni_error)?;
    Ok(java_str.into())
}

fn to_jboolean(value: bool) -> jboolean {
    if value {
        JNI_TRUE
    } else {
        JNI_FALSE
    }
}

/// Load on `player_id`, reporting the settled result to its callbacks.
fn load(
    env: &mut JNIEnv,
    player_id: jlong,
    path: &JString,
    looping: jboolean,
    auto_play: Option<bool>,
    remote: bool,
) -> jint {
    let audio_file = match jstring_to_string(env, path) {
        Ok(s) => s,
        Err(e) => {
            log::error!(target: ANDROID_TARGET, "Failed to convert path: {}", e);
            return -1;
        }
    };

    let callbacks = crate::callbacks::lookup(player_id);
    let mut options = AudioPlayerOptions::new(audio_file)
        .looping(looping != JNI_FALSE)
        .auto_play_setting(auto_play);
    if let Some(callbacks) = &callbacks {
        options = callbacks.attach(options);
    }

    let result = players().with(player_id, |player| {
        if remote {
            player.play_from_url(options)
        } else {
            player.play_from_file(options)
        }
    });

    match result {
        Ok(handle) => {
            if let Some(callbacks) = &callbacks {
                callbacks.report_load(&handle);
            }
            0
        }
        Err(e) => {
            log::error!(target: ANDROID_TARGET, "Failed to load: {}", e);
            -1
        }
    }
}

#[no_mangle]
pub extern "system" fn Java_com_tandem_audio_NativeBridge_nativeInit(
    mut env: JNIEnv,
    _class: JClass,
    context: JObject,
    app_root: JString,
    debug: jboolean,
) -> jint {
    init_logging();
    set_debug(debug != JNI_FALSE);

    match jstring_to_string(&mut env, &app_root) {
        Ok(root) if !root.is_empty() => set_app_root(root),
        Ok(_) => {}
        Err(e) => log::warn!(target: ANDROID_TARGET, "Failed to read app root: {}", e),
    }

    to_code(initialize(&mut env, &context))
}

#[no_mangle]
pub extern "system" fn Java_com_tandem_audio_NativeBridge_nativeSetDebug(
    _env: JNIEnv,
    _class: JClass,
    debug: jboolean,
) {
    set_debug(debug != JNI_FALSE);
}

/// Create a new audio player instance
/// Returns a player ID (handle) for subsequent operations, -1 on error
#[no_mangle]
pub extern "system" fn Java_com_tandem_audio_NativeBridge_nativeCreate(
    mut env: JNIEnv,
    _class: JClass,
    callbacks: JObject,
) -> jlong {
    init_logging();
    log::info!(target: ANDROID_TARGET, "Creating native audio player");

    let focus = match JniAudioFocus::new() {
        Ok(focus) => focus,
        Err(e) => {
            log::error!(target: ANDROID_TARGET, "Failed to create audio player: {}", e);
            return -1;
        }
    };

    let player = Arc::new(AndroidAudioPlayer::new(
        JniMediaPlayerFactory,
        focus,
        signals(),
        player_config(),
    ));

    if !callbacks.is_null() {
        match JniPlayerCallbacks::new(&mut env, &callbacks) {
            Ok(callbacks) => {
                player.events().subscribe(callbacks.clone());
                crate::callbacks::register(player.session_id().as_raw() as i64, callbacks);
            }
            Err(e) => log::error!(target: ANDROID_TARGET, "Failed to bind callbacks: {}", e),
        }
    }

    players().insert(player)
}

#[no_mangle]
pub extern "system" fn Java_com_tandem_audio_NativeBridge_nativePlayFromFile(
    mut env: JNIEnv,
    _class: JClass,
    player_id: jlong,
    path: JString,
    looping: jboolean,
    auto_play: jint,
) -> jint {
    load(&mut env, player_id, &path, looping, auto_play_from_code(auto_play), false)
}

#[no_mangle]
pub extern "system" fn Java_com_tandem_audio_NativeBridge_nativePlayFromUrl(
    mut env: JNIEnv,
    _class: JClass,
    player_id: jlong,
    url: JString,
    looping: jboolean,
    auto_play: jint,
) -> jint {
    load(&mut env, player_id, &url, looping, auto_play_from_code(auto_play), true)
}

#[no_mangle]
pub extern "system" fn Java_com_tandem_audio_NativeBridge_nativeInitFromFile(
    mut env: JNIEnv,
    _class: JClass,
    player_id: jlong,
    path: JString,
    looping: jboolean,
) -> jint {
    load(&mut env, player_id, &path, looping, Some(false), false)
}

#[no_mangle]
pub extern "system" fn Java_com_tandem_audio_NativeBridge_nativeInitFromUrl(
    mut env: JNIEnv,
    _class: JClass,
    player_id: jlong,
    url: JString,
    looping: jboolean,
) -> jint {
    load(&mut env, player_id, &url, looping, Some(false), true)
}

/// Start playback: 1 started, 0 nothing to do, -1 error
#[no_mangle]
pub extern "system" fn Java_com_tandem_audio_NativeBridge_nativePlay(
    _env: JNIEnv,
    _class: JClass,
    player_id: jlong,
) -> jint {
    flag_code(players().with(player_id, |p| p.play()))
}

#[no_mangle]
pub extern "system" fn Java_com_tandem_audio_NativeBridge_nativePause(
    _env: JNIEnv,
    _class: JClass,
    player_id: jlong,
) -> jint {
    flag_code(players().with(player_id, |p| p.pause()))
}

#[no_mangle]
pub extern "system" fn Java_com_tandem_audio_NativeBridge_nativeResume(
    _env: JNIEnv,
    _class: JClass,
    player_id: jlong,
) -> jint {
    to_code(players().with(player_id, |p| {
        p.resume();
        Ok(())
    }))
}

#[no_mangle]
pub extern "system" fn Java_com_tandem_audio_NativeBridge_nativeSeekTo(
    _env: JNIEnv,
    _class: JClass,
    player_id: jlong,
    seconds: jdouble,
) -> jint {
    flag_code(players().with(player_id, |p| p.seek_to(seconds)))
}

#[no_mangle]
pub extern "system" fn Java_com_tandem_audio_NativeBridge_nativePlayAtTime(
    _env: JNIEnv,
    _class: JClass,
    player_id: jlong,
    seconds: jdouble,
) -> jint {
    flag_code(players().with(player_id, |p| p.play_at_time(seconds)))
}

/// Dispose and forget the player; the handle is invalid afterwards
#[no_mangle]
pub extern "system" fn Java_com_tandem_audio_NativeBridge_nativeDispose(
    _env: JNIEnv,
    _class: JClass,
    player_id: jlong,
) -> jint {
    log::info!(target: ANDROID_TARGET, "Dispose player {}", player_id);
    let result = players().with(player_id, |p| p.dispose());

    players().remove(player_id);
    crate::callbacks::unregister(player_id);
    forget_listener(SessionId::from_raw(player_id as u64));
    to_code(result)
}

#[no_mangle]
pub extern "system" fn Java_com_tandem_audio_NativeBridge_nativeIsPlaying(
    _env: JNIEnv,
    _class: JClass,
    player_id: jlong,
) -> jboolean {
    to_jboolean(players().get(player_id).is_some_and(|p| p.is_playing()))
}

/// Duration in milliseconds, 0 when unknown
#[no_mangle]
pub extern "system" fn Java_com_tandem_audio_NativeBridge_nativeGetDuration(
    _env: JNIEnv,
    _class: JClass,
    player_id: jlong,
) -> jlong {
    players()
        .get(player_id)
        .map_or(0, |p| p.duration().as_millis() as jlong)
}

#[no_mangle]
pub extern "system" fn Java_com_tandem_audio_NativeBridge_nativeGetCurrentTime(
    _env: JNIEnv,
    _class: JClass,
    player_id: jlong,
) -> jlong {
    players()
        .get(player_id)
        .map_or(0, |p| p.current_time().as_millis() as jlong)
}

#[no_mangle]
pub extern "system" fn Java_com_tandem_audio_NativeBridge_nativeGetDurationString(
    env: JNIEnv,
    _class: JClass,
    player_id: jlong,
) -> jstring {
    let duration = players()
        .get(player_id)
        .map_or_else(|| "0".to_string(), |p| p.duration_string());

    match env.new_string(duration) {
        Ok(s) => s.into_raw(),
        Err(e) => {
            log::error!(target: ANDROID_TARGET, "Failed to create duration string: {}", e);
            std::ptr::null_mut()
        }
    }
}

#[no_mangle]
pub extern "system" fn Java_com_tandem_audio_NativeBridge_nativeChangePlaybackSpeed(
    _env: JNIEnv,
    _class: JClass,
    player_id: jlong,
    speed: jfloat,
) -> jint {
    to_code(players().with(player_id, |p| p.change_playback_speed(speed)))
}

#[no_mangle]
pub extern "system" fn Java_com_tandem_audio_NativeBridge_nativeGetVolume(
    _env: JNIEnv,
    _class: JClass,
    player_id: jlong,
) -> jfloat {
    players().get(player_id).map_or(0.0, |p| p.volume())
}

#[no_mangle]
pub extern "system" fn Java_com_tandem_audio_NativeBridge_nativeSetVolume(
    _env: JNIEnv,
    _class: JClass,
    player_id: jlong,
    volume: jfloat,
) -> jint {
    to_code(players().with(player_id, |p| {
        p.set_volume(volume);
        Ok(())
    }))
}

// -------------------------------
// Callbacks raised by NativeListener
// -------------------------------

#[no_mangle]
pub extern "system" fn Java_com_tandem_audio_NativeBridge_nativeOnPrepared(
    _env: JNIEnv,
    _class: JClass,
    session: jlong,
) {
    deliver(session, NativeSignal::Prepared);
}

#[no_mangle]
pub extern "system" fn Java_com_tandem_audio_NativeBridge_nativeOnCompletion(
    _env: JNIEnv,
    _class: JClass,
    session: jlong,
) {
    deliver(session, NativeSignal::EndOfMedia);
}

/// Returns true when the error was handled, so MediaPlayer skips onCompletion
#[no_mangle]
pub extern "system" fn Java_com_tandem_audio_NativeBridge_nativeOnError(
    _env: JNIEnv,
    _class: JClass,
    session: jlong,
    what: jint,
    extra: jint,
) -> jboolean {
    let info = NativeErrorInfo {
        what,
        extra,
        message: None,
    };
    to_jboolean(deliver(session, NativeSignal::Error(info)))
}

#[no_mangle]
pub extern "system" fn Java_com_tandem_audio_NativeBridge_nativeOnInfo(
    _env: JNIEnv,
    _class: JClass,
    session: jlong,
    what: jint,
    extra: jint,
) -> jboolean {
    to_jboolean(deliver(session, NativeSignal::Info(NativeInfo { what, extra })))
}

#[no_mangle]
pub extern "system" fn Java_com_tandem_audio_NativeBridge_nativeOnAudioFocusChange(
    _env: JNIEnv,
    _class: JClass,
    session: jlong,
    focus_change: jint,
) {
    match focus_signal(focus_change) {
        Some(signal) => {
            deliver(session, signal);
        }
        None => log::warn!(target: ANDROID_TARGET, "unknown focus change {}", focus_change),
    }
}

#[no_mangle]
pub extern "system" fn Java_com_tandem_audio_NativeBridge_nativeOnBecomingNoisy(
    _env: JNIEnv,
    _class: JClass,
    session: jlong,
) {
    deliver(session, NativeSignal::BecomingNoisy);
}
