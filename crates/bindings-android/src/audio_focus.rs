// android.media.AudioManager focus requests through JNI

use crate::jni_util::{
    app_context, call, call_listener_static, jni_error, listener, with_env, STREAM_MUSIC,
};
use jni::objects::{GlobalRef, JValue};
use tandem_android::AudioFocusManager;
use tandem_core::logging::ANDROID_TARGET;
use tandem_core::{Result, SessionId};

/// `AudioManager.AUDIOFOCUS_GAIN`
const AUDIOFOCUS_GAIN: i32 = 1;

/// `AudioManager.AUDIOFOCUS_REQUEST_GRANTED`
const AUDIOFOCUS_REQUEST_GRANTED: i32 = 1;

const FOCUS_LISTENER_SIG: &str = "(Landroid/media/AudioManager$OnAudioFocusChangeListener;)I";

pub(crate) struct JniAudioFocus {
    audio_manager: GlobalRef,
}

impl JniAudioFocus {
    pub(crate) fn new() -> Result<Self> {
        with_env(|env| {
            let context = app_context()?;
            let service = env.new_string("audio").map_err(jni_error)?;
            let manager = call(
                env,
                &context,
                "getSystemService",
                "(Ljava/lang/String;)Ljava/lang/Object;",
                &[JValue::Object(&service)],
            )?
            .l()
            .map_err(jni_error)?;
            let audio_manager = env.new_global_ref(manager).map_err(jni_error)?;
            Ok(Self { audio_manager })
        })
    }

    /// Call a `(Context)V` helper on the session's listener.
    fn listener_with_context(&self, session: SessionId, method: &str) -> Result<()> {
        with_env(|env| {
            let listener = listener(env, session)?;
            let context = app_context()?;
            call(
                env,
                listener.as_obj(),
                method,
                "(Landroid/content/Context;)V",
                &[JValue::Object(&context)],
            )?;
            Ok(())
        })
    }
}

impl AudioFocusManager for JniAudioFocus {
    fn request_focus(&mut self, session: SessionId) -> Result<bool> {
        with_env(|env| {
            let listener = listener(env, session)?;
            let result = call(
                env,
                self.audio_manager.as_obj(),
                "requestAudioFocus",
                "(Landroid/media/AudioManager$OnAudioFocusChangeListener;II)I",
                &[
                    JValue::Object(listener.as_obj()),
                    JValue::Int(STREAM_MUSIC),
                    JValue::Int(AUDIOFOCUS_GAIN),
                ],
            )?
            .i()
            .map_err(jni_error)?;
            Ok(result == AUDIOFOCUS_REQUEST_GRANTED)
        })
    }

    fn abandon_focus(&mut self, session: SessionId) -> Result<bool> {
        with_env(|env| {
            let listener = listener(env, session)?;
            let result = call(
                env,
                self.audio_manager.as_obj(),
                "abandonAudioFocus",
                FOCUS_LISTENER_SIG,
                &[JValue::Object(listener.as_obj())],
            )?
            .i()
            .map_err(jni_error)?;
            Ok(result == AUDIOFOCUS_REQUEST_GRANTED)
        })
    }

    fn music_stream_volume(&self) -> u32 {
        with_env(|env| {
            call(
                env,
                self.audio_manager.as_obj(),
                "getStreamVolume",
                "(I)I",
                &[JValue::Int(STREAM_MUSIC)],
            )?
            .i()
            .map_err(jni_error)
        })
        .map(|volume| volume.max(0) as u32)
        .unwrap_or_else(|e| {
            log::warn!(target: ANDROID_TARGET, "getStreamVolume failed: {}", e);
            0
        })
    }

    fn sdk_version(&self) -> u32 {
        with_env(|env| {
            env.get_static_field("android/os/Build$VERSION", "SDK_INT", "I")
                .and_then(|value| value.i())
                .map_err(jni_error)
        })
        .map(|sdk| sdk.max(0) as u32)
        .unwrap_or_else(|e| {
            log::warn!(target: ANDROID_TARGET, "SDK_INT unavailable: {}", e);
            0
        })
    }

    fn set_volume_control_stream(&mut self) -> Result<()> {
        // Only the Java side can reach the foreground Activity
        with_env(|env| {
            let context = app_context()?;
            call_listener_static(
                env,
                "bindVolumeControlStream",
                "(Landroid/content/Context;I)V",
                &[JValue::Object(&context), JValue::Int(STREAM_MUSIC)],
            )
        })
    }

    fn register_noisy_receiver(&mut self, session: SessionId) -> Result<()> {
        log::info!(target: ANDROID_TARGET, "registerBroadcastReceiver ACTION_AUDIO_BECOMING_NOISY");
        self.listener_with_context(session, "registerNoisyReceiver")
    }

    fn unregister_noisy_receiver(&mut self, session: SessionId) -> Result<()> {
        self.listener_with_context(session, "unregisterNoisyReceiver")
    }
}
