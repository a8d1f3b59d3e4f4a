// android.media.MediaPlayer reached through JNI

use crate::jni_util::{call, jni_error, listener, with_env, STREAM_MUSIC};
use jni::objects::{GlobalRef, JValue};
use tandem_android::{MediaPlayerEngine, MediaPlayerFactory};
use tandem_core::logging::ANDROID_TARGET;
use tandem_core::{Result, SessionId};

const LISTENER_SETTERS: [(&str, &str); 4] = [
    ("setOnPreparedListener", "(Landroid/media/MediaPlayer$OnPreparedListener;)V"),
    ("setOnCompletionListener", "(Landroid/media/MediaPlayer$OnCompletionListener;)V"),
    ("setOnErrorListener", "(Landroid/media/MediaPlayer$OnErrorListener;)V"),
    ("setOnInfoListener", "(Landroid/media/MediaPlayer$OnInfoListener;)V"),
];

pub(crate) struct JniMediaPlayer {
    player: GlobalRef,
}

impl JniMediaPlayer {
    fn void(&self, name: &str, sig: &str, args: &[JValue]) -> Result<()> {
        with_env(|env| {
            call(env, self.player.as_obj(), name, sig, args)?;
            Ok(())
        })
    }

    fn int(&self, name: &str) -> Result<i32> {
        with_env(|env| call(env, self.player.as_obj(), name, "()I", &[])?.i().map_err(jni_error))
    }
}

impl MediaPlayerEngine for JniMediaPlayer {
    fn set_music_stream_type(&mut self) -> Result<()> {
        self.void("setAudioStreamType", "(I)V", &[JValue::Int(STREAM_MUSIC)])
    }

    fn reset(&mut self) -> Result<()> {
        self.void("reset", "()V", &[])
    }

    fn set_data_source(&mut self, source: &str) -> Result<()> {
        with_env(|env| {
            let path = env.new_string(source).map_err(jni_error)?;
            call(
                env,
                self.player.as_obj(),
                "setDataSource",
                "(Ljava/lang/String;)V",
                &[JValue::Object(&path)],
            )?;
            Ok(())
        })
    }

    fn prepare(&mut self) -> Result<()> {
        self.void("prepare", "()V", &[])
    }

    fn prepare_async(&mut self) -> Result<()> {
        self.void("prepareAsync", "()V", &[])
    }

    fn start(&mut self) -> Result<()> {
        self.void("start", "()V", &[])
    }

    fn pause(&mut self) -> Result<()> {
        self.void("pause", "()V", &[])
    }

    fn stop(&mut self) -> Result<()> {
        self.void("stop", "()V", &[])
    }

    fn release(&mut self) -> Result<()> {
        self.void("release", "()V", &[])
    }

    fn seek_to(&mut self, position_ms: i64) -> Result<()> {
        let position = position_ms.clamp(0, i64::from(i32::MAX)) as i32;
        self.void("seekTo", "(I)V", &[JValue::Int(position)])
    }

    fn is_playing(&self) -> bool {
        with_env(|env| call(env, self.player.as_obj(), "isPlaying", "()Z", &[])?.z().map_err(jni_error))
            .unwrap_or_else(|e| {
                log::warn!(target: ANDROID_TARGET, "isPlaying failed: {}", e);
                false
            })
    }

    fn duration_ms(&self) -> i64 {
        self.int("getDuration").map(i64::from).unwrap_or(0)
    }

    fn current_position_ms(&self) -> i64 {
        self.int("getCurrentPosition").map(i64::from).unwrap_or(0)
    }

    fn set_volume(&mut self, left: f32, right: f32) -> Result<()> {
        self.void("setVolume", "(FF)V", &[JValue::Float(left), JValue::Float(right)])
    }

    fn set_playback_speed(&mut self, speed: f32) -> Result<()> {
        with_env(|env| {
            let player = self.player.as_obj();
            let params = call(env, player, "getPlaybackParams", "()Landroid/media/PlaybackParams;", &[])?
                .l()
                .map_err(jni_error)?;
            let params = call(
                env,
                &params,
                "setSpeed",
                "(F)Landroid/media/PlaybackParams;",
                &[JValue::Float(speed)],
            )?
            .l()
            .map_err(jni_error)?;
            call(
                env,
                player,
                "setPlaybackParams",
                "(Landroid/media/PlaybackParams;)V",
                &[JValue::Object(&params)],
            )?;
            Ok(())
        })
    }
}

/// Creates `MediaPlayer` instances wired to the session's `NativeListener`.
pub(crate) struct JniMediaPlayerFactory;

impl MediaPlayerFactory for JniMediaPlayerFactory {
    fn create(&self, session: SessionId) -> Result<Box<dyn MediaPlayerEngine>> {
        with_env(|env| {
            let player = env
                .new_object("android/media/MediaPlayer", "()V", &[])
                .map_err(jni_error)?;
            let listener = listener(env, session)?;

            for (setter, sig) in LISTENER_SETTERS {
                call(env, &player, setter, sig, &[JValue::Object(listener.as_obj())])?;
            }

            let player = env.new_global_ref(player).map_err(jni_error)?;
            log::info!(target: ANDROID_TARGET, "created MediaPlayer for {}", session);
            Ok(Box::new(JniMediaPlayer { player }) as Box<dyn MediaPlayerEngine>)
        })
    }
}
